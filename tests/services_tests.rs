use aemflow_rust::aem_core::{AemError, AwaitStatus, Instance, InstanceOutcome, InstanceSync, ProvisionPlan, SyncRequest, SyncResponse};
use aemflow_rust::{AemConfig, AemConfigOverrides, AemServices};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Consola OSGi estable; cualquier otro endpoint responde 200 vacío.
#[derive(Default)]
struct StableConsole {
    posts: AtomicUsize,
}

#[async_trait]
impl InstanceSync for StableConsole {
    async fn call(&self, _instance: &Instance, request: SyncRequest) -> Result<SyncResponse, AemError> {
        let body = match request.endpoint.as_str() {
            "/system/console/bundles.json" => {
                json!({ "data": [ { "id": 0, "symbolicName": "org.apache.felix.framework", "stateRaw": 32 } ] })
            }
            "/system/console/events.json" => json!({ "data": [] }),
            "/system/console/components.json" => {
                json!({ "data": [ { "name": "com.day.crx.packaging.impl.PackagingImpl", "state": "active" },
                                  { "name": "org.apache.sling.installer.core.impl.OsgiInstallerImpl", "state": "active" } ] })
            }
            _ => {
                self.posts.fetch_add(1, Ordering::SeqCst);
                return Ok(SyncResponse::new(200, ""));
            }
        };
        Ok(SyncResponse::new(200, body.to_string()))
    }
}

/// Toda llamada falla: prueba que el resume no toca la instancia.
struct Unreachable;

#[async_trait]
impl InstanceSync for Unreachable {
    async fn call(&self, instance: &Instance, _request: SyncRequest) -> Result<SyncResponse, AemError> {
        Err(AemError::remote(instance.name.clone(), "connection refused"))
    }
}

/// Sólo la instancia nombrada está estable; las demás tienen un bundle
/// resuelto sin activar.
struct OnlyStable(&'static str);

#[async_trait]
impl InstanceSync for OnlyStable {
    async fn call(&self, instance: &Instance, request: SyncRequest) -> Result<SyncResponse, AemError> {
        if instance.name != self.0 && request.endpoint == "/system/console/bundles.json" {
            let body = json!({ "data": [ { "id": 0, "symbolicName": "org.apache.felix.framework", "stateRaw": 32 },
                                         { "id": 7, "symbolicName": "com.example.core", "state": "Resolved", "stateRaw": 4 } ] });
            return Ok(SyncResponse::new(200, body.to_string()));
        }
        StableConsole::default().call(instance, request).await
    }
}

const BOTH: &str = "local-author=http://localhost:4502;local-publish=http://localhost:4503";

fn config(state_dir: &Path, resume: bool) -> AemConfig {
    config_for(state_dir, resume, "local-author=http://localhost:4502")
}

fn config_for(state_dir: &Path, resume: bool, instances: &str) -> AemConfig {
    let mut config = AemConfig::from_lookup(|_| None).unwrap();
    config.apply(&AemConfigOverrides { instances: Some(instances.into()),
                                       await_delay: Some(Duration::from_millis(10)),
                                       await_timeout: Some(Duration::from_secs(5)),
                                       resume: Some(resume),
                                       state_dir: Some(state_dir.to_path_buf()),
                                       download_dir: Some(state_dir.join("files")),
                                       ..Default::default() })
          .unwrap();
    config
}

#[tokio::test]
async fn stable_run_clears_await_state() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("await.json"), r#"{ "stable": ["local-author"], "updated_at": null }"#).unwrap();
    let services = AemServices::with_sync(config(dir.path(), false), Arc::new(StableConsole::default())).unwrap();
    let result = services.await_up(None).await.unwrap();
    assert_eq!(result.status, AwaitStatus::Stable);
    assert!(!dir.path().join("await.json").exists());

    // sin estado previo, resume vuelve a comprobar la instancia
    let resumed = AemServices::with_sync(config(dir.path(), true), Arc::new(Unreachable)).unwrap();
    let result = resumed.await_up_until(None, tokio::time::sleep(Duration::from_millis(300))).await.unwrap();
    assert_ne!(result.status, AwaitStatus::Stable);
    assert_ne!(result.per_instance["local-author"], InstanceOutcome::Resumed);
}

#[tokio::test]
async fn interrupted_await_is_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let services = AemServices::with_sync(config_for(dir.path(), false, BOTH), Arc::new(OnlyStable("local-author"))).unwrap();
    let result = services.await_up_until(None, tokio::time::sleep(Duration::from_millis(300))).await.unwrap();
    assert_eq!(result.status, AwaitStatus::Cancelled);
    assert_eq!(result.per_instance["local-author"], InstanceOutcome::Stable);
    assert!(dir.path().join("await.json").exists());

    let resumed = AemServices::with_sync(config_for(dir.path(), true, BOTH), Arc::new(OnlyStable("local-publish"))).unwrap();
    let result = resumed.await_up(None).await.unwrap();
    assert_eq!(result.status, AwaitStatus::Stable);
    assert_eq!(result.per_instance["local-author"], InstanceOutcome::Resumed);
    assert_eq!(result.per_instance["local-publish"], InstanceOutcome::Stable);
    assert!(!dir.path().join("await.json").exists());
}

#[tokio::test]
async fn filter_without_matches_is_nothing_to_await() {
    let dir = tempfile::tempdir().unwrap();
    let services = AemServices::with_sync(config(dir.path(), false), Arc::new(Unreachable)).unwrap();
    let result = services.await_up(Some("*-publish")).await.unwrap();
    assert_eq!(result.status, AwaitStatus::NothingToAwait);
    assert!(result.is_success());
}

#[tokio::test]
async fn plan_state_survives_between_runs_in_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let sync = Arc::new(StableConsole::default());
    let services = AemServices::with_sync(config(dir.path(), false), sync.clone()).unwrap();
    let plan = r#"{ "steps": [ { "id": "flush", "action": { "type": "call", "method": "POST", "endpoint": "/bin/flush" } } ] }"#;

    let first = services.provision_plan(ProvisionPlan::from_json(plan).unwrap(), None).await.unwrap();
    assert_eq!(first.ended(), 1);
    assert!(dir.path().join("local-author.json").exists());

    let second = services.provision_plan(ProvisionPlan::from_json(plan).unwrap(), None).await.unwrap();
    assert_eq!(second.total(), 0);
    assert_eq!(second.skipped(), 1);
    assert_eq!(sync.posts.load(Ordering::SeqCst), 1);
}

#[test]
fn resolver_keeps_local_references_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("app.all-1.0.zip");
    std::fs::write(&local, b"zip").unwrap();
    let services = AemServices::with_sync(config(dir.path(), false), Arc::new(Unreachable)).unwrap();
    let resolver = services.resolver().unwrap();
    assert_eq!(resolver.download_dir(), dir.path().join("files"));

    let resolved = tokio_test::block_on(resolver.resolve_file(local.to_str().unwrap())).unwrap();
    assert_eq!(resolved, local);
}
