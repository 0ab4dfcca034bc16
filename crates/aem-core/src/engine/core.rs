//! Implementación del Provisioner.
//!
//! Por instancia, los steps se evalúan en orden de declaración:
//! `Pending -> Due | Skipped` según la condición y el estado persistido,
//! `Due -> Ended | Failed` según el resultado de la acción. El estado se
//! guarda tras cada step ejecutado. Las instancias se procesan en paralelo
//! con un límite de `parallelism`.

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::{ProvisionSummary, ProvisionerBuilder, StepExecution};
use crate::errors::AemError;
use crate::event::{EventStore, InMemoryEventStore, ProvisionEventKind};
use crate::instance::Instance;
use crate::notify::Notifier;
use crate::repo::{InMemoryStepStateRepository, StepStateRepository};
use crate::step::{ConditionContext, Step, StepState, StepStatus};
use crate::sync::InstanceSync;

pub struct Provisioner<E, R>
    where E: EventStore,
          R: StepStateRepository
{
    event_store: E,
    repository: R,
    sync: Arc<dyn InstanceSync>,
    notifier: Arc<dyn Notifier>,
    parallelism: usize,
    steps: Vec<Step>,
}

impl Provisioner<InMemoryEventStore, InMemoryStepStateRepository> {
    /// Builder con stores en memoria.
    pub fn new() -> ProvisionerBuilder<InMemoryEventStore, InMemoryStepStateRepository> {
        ProvisionerBuilder::new(InMemoryEventStore::new(), InMemoryStepStateRepository::new())
    }
}

impl<E, R> Provisioner<E, R>
    where E: EventStore,
          R: StepStateRepository
{
    pub fn builder(event_store: E, repository: R) -> ProvisionerBuilder<E, R> {
        ProvisionerBuilder::new(event_store, repository)
    }

    pub(crate) fn from_parts(event_store: E,
                             repository: R,
                             sync: Arc<dyn InstanceSync>,
                             notifier: Arc<dyn Notifier>,
                             parallelism: usize,
                             steps: Vec<Step>)
                             -> Self {
        Self { event_store,
               repository,
               sync,
               notifier,
               parallelism,
               steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Provisiona las instancias. Los fallos de steps quedan en el resumen;
    /// sólo un error de configuración devuelve `Err`, y lo hace en cuanto
    /// aparece, abandonando las instancias aún en curso.
    pub async fn provision(&self, instances: &[Instance]) -> Result<ProvisionSummary, AemError> {
        let run_id = Uuid::new_v4();
        self.record(run_id,
                    ProvisionEventKind::RunStarted { instances: instances.iter().map(|i| i.name.clone()).collect(),
                                                     step_count: self.steps.len() }).await;

        let mut outcomes = stream::iter(instances.iter().enumerate()).map(|(position, instance)| async move {
                                                                         let mut executions = Vec::new();
                                                                         match self.provision_instance(run_id, instance, &mut executions).await {
                                                                             Err(e @ AemError::Configuration(_)) => Err(e),
                                                                             result => Ok((position, executions, result.err())),
                                                                         }
                                                                     })
                                                                     .buffer_unordered(self.parallelism)
                                                                     .try_collect::<Vec<_>>()
                                                                     .await?;
        outcomes.sort_by_key(|(position, _, _)| *position);

        let mut summary = ProvisionSummary { run_id,
                                             executions: Vec::new(),
                                             errors: Vec::new() };
        for (_, executions, error) in outcomes {
            summary.executions.extend(executions);
            if let Some(e) = error {
                warn!("Provisioning aborted: {e}");
                summary.errors.push(e);
            }
        }

        self.record(run_id,
                    ProvisionEventKind::RunCompleted { total: summary.total(),
                                                       ended: summary.ended(),
                                                       failed: summary.failed(),
                                                       skipped: summary.skipped() }).await;
        if summary.total() > 0 {
            self.notifier.notify("Instances provisioned", &summary.message());
        } else {
            info!("No actions to perform / all instances provisioned.");
        }
        Ok(summary)
    }

    async fn provision_instance(&self, run_id: Uuid, instance: &Instance, executions: &mut Vec<StepExecution>) -> Result<(), AemError> {
        let mut states = self.repository.load(instance).await?;
        let mut halted_by: Option<&str> = None;

        for (step_index, step) in self.steps.iter().enumerate() {
            let fingerprint = step.fingerprint();
            let due = halted_by.is_none() && {
                let ctx = ConditionContext { instance,
                                             previous: states.get(&step.id),
                                             fingerprint: &fingerprint,
                                             now: Utc::now() };
                step.condition.is_due(&ctx)
            };

            if !due {
                match halted_by {
                    Some(failed) => debug!("Step '{}' skipped on '{}' after failure of '{}'", step.id, instance.name, failed),
                    None => debug!("Step '{}' not due on '{}'", step.id, instance.name),
                }
                self.record(run_id,
                            ProvisionEventKind::StepSkipped { instance: instance.name.clone(),
                                                              step_index,
                                                              step_id: step.id.clone() }).await;
                if !states.contains_key(&step.id) {
                    states.insert(step.id.clone(), StepState::skipped(&step.id, &fingerprint));
                    self.repository.save(instance, &states).await?;
                }
                executions.push(StepExecution { instance: instance.name.clone(),
                                                step_id: step.id.clone(),
                                                status: StepStatus::Skipped,
                                                error: None,
                                                duration: Default::default() });
                continue;
            }

            info!("Performing step '{}' on '{}'", step.description, instance.name);
            self.record(run_id,
                        ProvisionEventKind::StepStarted { instance: instance.name.clone(),
                                                          step_index,
                                                          step_id: step.id.clone(),
                                                          fingerprint: fingerprint.clone() }).await;
            let started_at = Utc::now();
            let clock = std::time::Instant::now();
            let outcome = step.perform(instance, self.sync.as_ref()).await;
            let duration = clock.elapsed();

            let error = outcome.err().map(|e| AemError::ProvisioningStep { instance: instance.name.clone(),
                                                                           step: step.id.clone(),
                                                                           cause: e.to_string() });
            let status = if error.is_some() { StepStatus::Failed } else { StepStatus::Ended };
            let counter = states.get(&step.id).map_or(0, |s| s.counter) + 1;
            states.insert(step.id.clone(),
                          StepState { step_id: step.id.clone(),
                                      status,
                                      version: fingerprint.clone(),
                                      started_at: Some(started_at),
                                      ended_at: Some(Utc::now()),
                                      counter,
                                      error: error.as_ref().map(|e| e.to_string()) });
            self.repository.save(instance, &states).await?;

            match &error {
                None => self.record(run_id,
                                    ProvisionEventKind::StepEnded { instance: instance.name.clone(),
                                                                    step_index,
                                                                    step_id: step.id.clone(),
                                                                    fingerprint,
                                                                    duration_ms: duration.as_millis() as u64 }).await,
                Some(e) => {
                    warn!("{e}");
                    self.record(run_id,
                                ProvisionEventKind::StepFailed { instance: instance.name.clone(),
                                                                 step_index,
                                                                 step_id: step.id.clone(),
                                                                 fingerprint,
                                                                 error: e.clone() }).await;
                    if !step.continue_on_fail {
                        halted_by = Some(&step.id);
                    }
                }
            }
            executions.push(StepExecution { instance: instance.name.clone(),
                                            step_id: step.id.clone(),
                                            status,
                                            error,
                                            duration });
        }
        Ok(())
    }

    /// Los eventos son auditoría: un fallo del store no detiene el run.
    async fn record(&self, run_id: Uuid, kind: ProvisionEventKind) {
        if let Err(e) = self.event_store.append_kind(run_id, kind).await {
            warn!("Cannot record provisioning event: {e}");
        }
    }
}
