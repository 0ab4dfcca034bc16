mod common;

use aem_core::check::{CheckGroup, TimeoutCheck, TimeoutOptions};
use aem_core::{AemError, AwaitConfig, AwaitState, AwaitStatus, AwaitUp, Check, CheckReport, CheckState, Instance, InstanceOutcome,
               InstanceRegistry, InstanceSync, Reachability, SyncResponse};
use async_trait::async_trait;
use common::{instance, stable_console, ScriptedSync};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Fixed(CheckState);

#[async_trait]
impl Check for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn evaluate(&mut self, _instance: &Instance, _sync: &dyn InstanceSync) -> Result<CheckReport, AemError> {
        Ok(CheckReport::new("fixed", self.0))
    }

    fn reset(&mut self) {}
}

fn busy_console() -> ScriptedSync {
    stable_console().on("/system/console/events.json", |_| {
                        let now = chrono::Utc::now().timestamp_millis();
                        let body = json!({ "data": [ { "topic": "org/osgi/framework/ServiceEvent/REGISTERED", "received": now } ] });
                        Ok(SyncResponse::new(200, body.to_string()))
                    })
}

fn quick_config(timeout_secs: u64) -> AwaitConfig {
    AwaitConfig { delay: Duration::from_secs(1),
                  timeout: TimeoutOptions { timeout: Duration::from_secs(timeout_secs) },
                  ..AwaitConfig::default() }
}

#[tokio::test]
async fn empty_instance_set_is_informational() {
    let await_up = AwaitUp::new(Arc::new(ScriptedSync::new()));
    let result = await_up.await_up(&[], &AwaitConfig::default()).await.unwrap();
    assert_eq!(result.status, AwaitStatus::NothingToAwait);
    assert!(result.is_success());
    assert!(result.into_result().is_ok());
}

#[tokio::test]
async fn stable_console_ends_in_first_cycle() {
    let registry = Arc::new(InstanceRegistry::from_instances(vec![instance("local-author")]).unwrap());
    let await_up = AwaitUp::new(Arc::new(stable_console())).with_registry(registry.clone());
    let result = await_up.await_up(&registry.all(), &AwaitConfig::default()).await.unwrap();
    assert_eq!(result.status, AwaitStatus::Stable);
    assert_eq!(result.cycles, 1);
    assert_eq!(result.per_instance["local-author"], InstanceOutcome::Stable);
    assert_eq!(registry.reachability("local-author"), Reachability::Up);
}

#[tokio::test(start_paused = true)]
async fn timeout_overrides_stable_checks() {
    let sync = ScriptedSync::new();
    let mut group = CheckGroup::new(instance("local-author"),
                                    vec![Box::new(TimeoutCheck::new(TimeoutOptions { timeout: Duration::from_secs(5) })),
                                         Box::new(Fixed(CheckState::Stable)),
                                         Box::new(Fixed(CheckState::Stable)),
                                         Box::new(Fixed(CheckState::Stable))]);
    assert_eq!(group.evaluate(&sync).await.state, CheckState::Stable);
    tokio::time::advance(Duration::from_secs(6)).await;
    let result = group.evaluate(&sync).await;
    assert_eq!(result.state, CheckState::Abort);
    assert!(!result.is_stable());

    group.reset();
    assert_eq!(group.evaluate(&sync).await.state, CheckState::Stable);
}

#[tokio::test(start_paused = true)]
async fn unstable_instance_times_out() {
    let await_up = AwaitUp::new(Arc::new(busy_console()));
    let result = await_up.await_up(&[instance("local-author")], &quick_config(3)).await.unwrap();
    assert_eq!(result.status, AwaitStatus::TimedOut);
    assert!(result.cycles >= 4);
    match &result.per_instance["local-author"] {
        InstanceOutcome::Unstable { reasons } => assert!(reasons.iter().any(|r| r.starts_with("timeout"))),
        other => panic!("unexpected outcome {other:?}"),
    }
    let err = result.into_result().unwrap_err();
    assert!(matches!(err, AemError::AwaitTimeout { ref instances, .. } if instances == &vec!["local-author".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn escalated_timeout_is_an_error() {
    let await_up = AwaitUp::new(Arc::new(busy_console()));
    let config = AwaitConfig { escalate_timeout: true,
                               ..quick_config(2) };
    let err = await_up.await_up(&[instance("local-author")], &config).await.unwrap_err();
    assert!(matches!(err, AemError::AwaitTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn unreachable_instance_is_marked_down_and_keeps_polling() {
    let sync = ScriptedSync::new().on("/system/console/bundles.json", |i| Err(AemError::remote(&i.name, "connection refused")))
                                  .on("/system/console/events.json", |i| Err(AemError::remote(&i.name, "connection refused")))
                                  .on("/system/console/components.json", |i| Err(AemError::remote(&i.name, "connection refused")));
    let registry = Arc::new(InstanceRegistry::from_instances(vec![instance("local-publish")]).unwrap());
    let await_up = AwaitUp::new(Arc::new(sync)).with_registry(registry.clone());
    let result = await_up.await_up(&registry.all(), &quick_config(2)).await.unwrap();
    assert_eq!(result.status, AwaitStatus::TimedOut);
    assert_eq!(registry.reachability("local-publish"), Reachability::Down);
}

#[tokio::test]
async fn rejected_credentials_end_the_run() {
    let sync = stable_console().on("/system/console/bundles.json", |_| Ok(SyncResponse::new(401, "")));
    let await_up = AwaitUp::new(Arc::new(sync));
    let result = await_up.await_up(&[instance("local-author")], &AwaitConfig::default()).await.unwrap();
    assert_eq!(result.status, AwaitStatus::Failed);
    assert!(matches!(result.per_instance["local-author"],
                     InstanceOutcome::Failed { error: AemError::Configuration(_) }));
    assert_eq!(result.cycles, 1);
}

#[tokio::test]
async fn resume_skips_instances_already_stable() {
    let sync = Arc::new(stable_console());
    let mut prior = AwaitState::default();
    prior.stable.insert("local-author".into());
    let await_up = AwaitUp::new(sync.clone()).with_prior_state(prior);
    let config = AwaitConfig { resume: true,
                               ..AwaitConfig::default() };
    let result = await_up.await_up(&[instance("local-author"), instance("local-publish")], &config).await.unwrap();
    assert_eq!(result.status, AwaitStatus::Stable);
    assert_eq!(result.per_instance["local-author"], InstanceOutcome::Resumed);
    assert_eq!(result.per_instance["local-publish"], InstanceOutcome::Stable);
    let author_calls = sync.calls.lock().unwrap().iter().filter(|(n, _)| n == "local-author").count();
    assert_eq!(author_calls, 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_the_run() {
    let await_up = AwaitUp::new(Arc::new(busy_console()));
    let shutdown = tokio::time::sleep(Duration::from_secs(3));
    let result = await_up.await_up_until(&[instance("local-author")], &quick_config(600), shutdown)
                         .await
                         .unwrap();
    assert_eq!(result.status, AwaitStatus::Cancelled);
    assert!(!result.is_success());
}

#[tokio::test]
async fn await_state_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("await").join("state.json");
    assert!(AwaitState::load(&path).await.unwrap().is_none());

    let await_up = AwaitUp::new(Arc::new(stable_console()));
    let result = await_up.await_up(&[instance("local-author")], &AwaitConfig::default()).await.unwrap();
    let state = AwaitState::from_result(&result);
    state.save(&path).await.unwrap();
    let loaded = AwaitState::load(&path).await.unwrap().unwrap();
    assert!(loaded.stable.contains("local-author"));
}
