mod common;

use aem_core::{action_fn, AemError, Condition, EventStore, InMemoryEventStore, InMemoryStepStateRepository, Instance, Notifier,
               ProvisionEventKind, ProvisionPlan, Provisioner, Step, StepStateRepository, StepStates, StepStatus, SyncResponse};
use async_trait::async_trait;
use common::{instance, ScriptedSync};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(&aem_core::Instance) -> Result<(), AemError> + Send + Sync + 'static {
    let counter = counter.clone();
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<(String, String)>>);

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.0.lock().unwrap().push((title.to_string(), message.to_string()));
    }
}

#[tokio::test]
async fn once_step_runs_once_then_is_skipped() {
    let runs = Arc::new(AtomicUsize::new(0));
    let provisioner = Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                                        .step(Step::new("enable-launchers", action_fn(counting(&runs))))
                                        .build()
                                        .unwrap();
    let author = instance("local-author");

    let first = provisioner.provision(&[author.clone()]).await.unwrap();
    assert_eq!((first.total(), first.ended(), first.skipped()), (1, 1, 0));

    let second = provisioner.provision(&[author.clone()]).await.unwrap();
    assert_eq!((second.total(), second.skipped()), (0, 1));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let states = provisioner.repository().load(&author).await.unwrap();
    let state = &states["enable-launchers"];
    assert_eq!(state.status, StepStatus::Ended);
    assert_eq!(state.counter, 1);
}

#[tokio::test]
async fn never_step_has_no_side_effect() {
    let runs = Arc::new(AtomicUsize::new(0));
    let provisioner = Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                                        .step(Step::new("disabled", action_fn(counting(&runs))).condition(Condition::Never))
                                        .build()
                                        .unwrap();
    let author = instance("local-author");
    let summary = provisioner.provision(&[author.clone()]).await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(summary.executions[0].status, StepStatus::Skipped);
    let states = provisioner.repository().load(&author).await.unwrap();
    assert_eq!(states["disabled"].status, StepStatus::Skipped);
}

#[tokio::test]
async fn failing_step_does_not_stop_the_others() {
    let runs = Arc::new(AtomicUsize::new(0));
    let notifier = Arc::new(RecordingNotifier::default());
    let provisioner =
        Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                          .notifier(notifier.clone())
                          .step(Step::new("broken", action_fn(|_| Err(AemError::Internal("boom".into())))))
                          .step(Step::new("fine", action_fn(counting(&runs))))
                          .build()
                          .unwrap();
    let instances = [instance("local-author"), instance("local-publish")];
    let summary = provisioner.provision(&instances).await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!((summary.total(), summary.ended(), summary.failed()), (4, 2, 2));
    assert_eq!(summary.instances().len(), 2);
    assert!(!summary.is_success());
    assert!(matches!(summary.failures()[0], AemError::ProvisioningStep { step, .. } if step == "broken"));

    let states = provisioner.repository().load(&instances[0]).await.unwrap();
    assert_eq!(states["broken"].status, StepStatus::Failed);
    assert!(states["broken"].error.as_deref().unwrap().contains("boom"));

    let notes = notifier.0.lock().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, "Instances provisioned");
    assert_eq!(notes[0].1, "Performed 4 step(s) (2 ended, 2 failed) on 2 instance(s).");
}

#[tokio::test]
async fn failed_once_step_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let flaky = action_fn(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(AemError::Internal("first attempt".into()))
        } else {
            Ok(())
        }
    });
    let provisioner = Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                                        .step(Step::new("flaky", flaky))
                                        .build()
                                        .unwrap();
    let author = instance("local-author");
    assert_eq!(provisioner.provision(&[author.clone()]).await.unwrap().failed(), 1);
    assert_eq!(provisioner.provision(&[author.clone()]).await.unwrap().ended(), 1);
    assert_eq!(provisioner.provision(&[author.clone()]).await.unwrap().total(), 0);
    let states = provisioner.repository().load(&author).await.unwrap();
    assert_eq!(states["flaky"].counter, 2);
    assert_eq!(states["flaky"].error, None);
}

#[tokio::test]
async fn halting_failure_skips_remaining_steps() {
    let runs = Arc::new(AtomicUsize::new(0));
    let provisioner =
        Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                          .step(Step::new("critical", action_fn(|_| Err(AemError::Internal("down".into())))).continue_on_fail(false))
                          .step(Step::new("after", action_fn(counting(&runs))))
                          .build()
                          .unwrap();
    let author = instance("local-author");
    let summary = provisioner.provision(&[author.clone()]).await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(summary.executions[1].status, StepStatus::Skipped);
    let states = provisioner.repository().load(&author).await.unwrap();
    assert_eq!(states["after"].status, StepStatus::Skipped);
}

#[tokio::test]
async fn version_change_reruns_step() {
    let runs = Arc::new(AtomicUsize::new(0));
    let repository = Arc::new(InMemoryStepStateRepository::new());
    let author = instance("local-author");
    for version in ["1", "1", "2"] {
        let provisioner = Provisioner::builder(InMemoryEventStore::new(), repository.clone())
            .sync(Arc::new(ScriptedSync::new()))
            .step(Step::new("replication", action_fn(counting(&runs))).version(version))
            .build()
            .unwrap();
        provisioner.provision(&[author.clone()]).await.unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(repository.load(&author).await.unwrap()["replication"].counter, 2);
}

#[tokio::test]
async fn skip_never_overwrites_existing_state() {
    let due = Arc::new(AtomicBool::new(true));
    let flag = due.clone();
    let provisioner =
        Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                          .step(Step::new("toggle", action_fn(|_| Ok(()))).condition(Condition::custom(move |_| flag.load(Ordering::SeqCst))))
                          .build()
                          .unwrap();
    let author = instance("local-author");
    provisioner.provision(&[author.clone()]).await.unwrap();
    due.store(false, Ordering::SeqCst);
    let summary = provisioner.provision(&[author.clone()]).await.unwrap();
    assert_eq!(summary.skipped(), 1);
    let states = provisioner.repository().load(&author).await.unwrap();
    assert_eq!(states["toggle"].status, StepStatus::Ended);
    assert_eq!(states["toggle"].counter, 1);
}

#[tokio::test]
async fn run_is_recorded_as_events() {
    let provisioner = Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                                        .step(Step::new("a", action_fn(|_| Ok(()))))
                                        .step(Step::new("b", action_fn(|_| Ok(()))).condition(Condition::Never))
                                        .build()
                                        .unwrap();
    let summary = provisioner.provision(&[instance("local-author")]).await.unwrap();
    let events = provisioner.event_store().list(summary.run_id).await.unwrap();
    let codes: Vec<&str> = events.iter().map(|e| e.kind.code()).collect();
    assert_eq!(codes, vec!["R", "S", "E", "K", "C"]);
    assert!(matches!(events.last().unwrap().kind,
                     ProvisionEventKind::RunCompleted { total: 1, ended: 1, failed: 0, skipped: 1 }));
}

#[tokio::test]
async fn builder_validates_configuration() {
    let missing_sync = Provisioner::new().step(Step::new("a", action_fn(|_| Ok(())))).build();
    assert!(matches!(missing_sync, Err(AemError::Configuration(_))));

    let duplicated = Provisioner::new().sync(Arc::new(ScriptedSync::new()))
                                       .step(Step::new("a", action_fn(|_| Ok(()))))
                                       .step(Step::new("a", action_fn(|_| Ok(()))))
                                       .build();
    assert!(matches!(duplicated, Err(AemError::Configuration(_))));
}

#[tokio::test]
async fn plan_actions_use_the_sync_channel() {
    let sync = Arc::new(ScriptedSync::new().on("/etc/replication/agents.author/publish/jcr:content", |_| Ok(SyncResponse::new(200, "")))
                                           .on("/bin/flush", |_| Ok(SyncResponse::new(500, ""))));
    let plan = ProvisionPlan::from_json(r#"{ "steps": [
        { "id": "agent", "action": { "type": "save_node",
                                     "path": "/etc/replication/agents.author/publish/jcr:content",
                                     "properties": { "enabled": true } } },
        { "id": "flush", "action": { "type": "call", "method": "POST", "endpoint": "/bin/flush" } }
    ] }"#).unwrap();
    let provisioner = Provisioner::new().sync(sync.clone())
                                        .steps(plan.into_steps(sync.clone()))
                                        .build()
                                        .unwrap();
    let summary = provisioner.provision(&[instance("local-author")]).await.unwrap();
    assert_eq!((summary.ended(), summary.failed()), (1, 1));

    let calls = sync.calls.lock().unwrap();
    let (_, save) = calls.iter().find(|(_, r)| r.endpoint.ends_with("jcr:content")).unwrap();
    assert!(save.params.contains(&("enabled@TypeHint".to_string(), "Boolean".to_string())));
}

/// Repositorio que rechaza una instancia por configuración y deja colgada
/// la carga de las demás.
struct MisconfiguredRepository {
    rejected: &'static str,
}

#[async_trait]
impl StepStateRepository for MisconfiguredRepository {
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError> {
        if instance.name == self.rejected {
            return Err(AemError::config(format!("No state root for '{}'", instance.name)));
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(StepStates::new())
    }

    async fn save(&self, _: &Instance, _: &StepStates) -> Result<(), AemError> {
        Ok(())
    }
}

#[tokio::test]
async fn configuration_error_fails_fast() {
    let runs = Arc::new(AtomicUsize::new(0));
    let notifier = Arc::new(RecordingNotifier::default());
    let provisioner = Provisioner::builder(InMemoryEventStore::new(), MisconfiguredRepository { rejected: "local-publish" })
        .sync(Arc::new(ScriptedSync::new()))
        .notifier(notifier.clone())
        .parallelism(2)
        .step(Step::new("a", action_fn(counting(&runs))))
        .build()
        .unwrap();
    let instances = [instance("local-author"), instance("local-publish")];

    let outcome = tokio::time::timeout(Duration::from_secs(5), provisioner.provision(&instances)).await
                                                                                              .expect("provision must not wait for other instances");
    assert!(matches!(outcome, Err(AemError::Configuration(_))));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(notifier.0.lock().unwrap().is_empty());
}
