//! Orquestador de await: espera a que un conjunto de instancias quede estable.
//!
//! Construye un grupo de checks nuevo por instancia, delega el sondeo en
//! `CheckRunner` y traduce el resultado a `AwaitResult`. Opcionalmente salta
//! instancias que un `AwaitState` previo ya registró como estables (resume) y
//! actualiza la alcanzabilidad en el `InstanceRegistry`.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::check::{BundlesCheck, BundlesOptions, Check, CheckFactory, CheckRunner, ComponentsCheck, ComponentsOptions,
                   EventsCheck, EventsOptions, RunStatus, TimeoutCheck, TimeoutOptions};
use crate::constants::{AWAIT_DELAY, PARALLELISM};
use crate::errors::AemError;
use crate::instance::{Instance, InstanceRegistry, Reachability};
use crate::notify::{LogProgress, ProgressReporter};
use crate::sync::InstanceSync;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitConfig {
    pub delay: Duration,
    pub resume: bool,
    pub parallelism: usize,
    /// Convierte un timeout en `Err(AemError::AwaitTimeout)`.
    pub escalate_timeout: bool,
    pub timeout: TimeoutOptions,
    pub bundles: BundlesOptions,
    pub events: EventsOptions,
    pub components: ComponentsOptions,
}

impl Default for AwaitConfig {
    fn default() -> Self {
        Self { delay: AWAIT_DELAY,
               resume: false,
               parallelism: PARALLELISM,
               escalate_timeout: false,
               timeout: TimeoutOptions::default(),
               bundles: BundlesOptions::default(),
               events: EventsOptions::default(),
               components: ComponentsOptions::default() }
    }
}

impl AwaitConfig {
    /// Checks en orden fijo: timeout, bundles, events, components.
    pub fn checks(&self) -> Vec<Box<dyn Check>> {
        vec![Box::new(TimeoutCheck::new(self.timeout.clone())),
             Box::new(BundlesCheck::new(self.bundles.clone())),
             Box::new(EventsCheck::new(self.events.clone())),
             Box::new(ComponentsCheck::new(self.components.clone()))]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwaitStatus {
    /// No había instancias que esperar. Informativo, no es un fallo.
    NothingToAwait,
    Stable,
    TimedOut,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceOutcome {
    Stable,
    /// Saltada por resume: un run anterior la registró estable.
    Resumed,
    Unstable { reasons: Vec<String> },
    Failed { error: AemError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitResult {
    pub status: AwaitStatus,
    pub per_instance: IndexMap<String, InstanceOutcome>,
    pub elapsed: Duration,
    pub cycles: u32,
}

impl AwaitResult {
    pub fn nothing_to_await() -> Self {
        Self { status: AwaitStatus::NothingToAwait,
               per_instance: IndexMap::new(),
               elapsed: Duration::ZERO,
               cycles: 0 }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, AwaitStatus::NothingToAwait | AwaitStatus::Stable)
    }

    pub fn stable_instances(&self) -> Vec<String> {
        self.per_instance
            .iter()
            .filter(|(_, o)| matches!(o, InstanceOutcome::Stable | InstanceOutcome::Resumed))
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn unstable_instances(&self) -> Vec<String> {
        self.per_instance
            .iter()
            .filter(|(_, o)| matches!(o, InstanceOutcome::Unstable { .. } | InstanceOutcome::Failed { .. }))
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Escala el resultado a error cuando el await no tuvo éxito.
    pub fn into_result(self) -> Result<Self, AemError> {
        match self.status {
            AwaitStatus::NothingToAwait | AwaitStatus::Stable => Ok(self),
            AwaitStatus::TimedOut => Err(AemError::AwaitTimeout { instances: self.unstable_instances(),
                                                                  elapsed_secs: self.elapsed.as_secs() }),
            AwaitStatus::Failed => Err(self.per_instance
                                           .values()
                                           .find_map(|o| match o {
                                               InstanceOutcome::Failed { error } => Some(error.clone()),
                                               _ => None,
                                           })
                                           .unwrap_or_else(|| AemError::Internal("await failed".into()))),
            AwaitStatus::Cancelled => Err(AemError::Internal("await cancelled".into())),
        }
    }
}

/// Estado persistible entre runs para soportar resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitState {
    pub stable: BTreeSet<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AwaitState {
    pub fn from_result(result: &AwaitResult) -> Self {
        Self { stable: result.stable_instances().into_iter().collect(),
               updated_at: Some(Utc::now()) }
    }

    /// `Ok(None)` si el archivo no existe.
    pub async fn load(path: &Path) -> Result<Option<Self>, AemError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text).map(Some)
                                                   .map_err(|e| AemError::config(format!("Await state '{}' is malformed: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AemError::Internal(format!("cannot read await state '{}': {e}", path.display()))),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), AemError> {
        let io = |e: std::io::Error| AemError::Internal(format!("cannot write await state '{}': {e}", path.display()));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| AemError::Internal(e.to_string()))?;
        tokio::fs::write(path, text).await.map_err(io)
    }

    /// Borra el estado guardado; no es error si no existe.
    pub async fn clear(path: &Path) -> Result<(), AemError> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(AemError::Internal(format!("cannot remove await state '{}': {e}", path.display())))
            }
            _ => Ok(()),
        }
    }
}

pub struct AwaitUp {
    sync: Arc<dyn InstanceSync>,
    progress: Arc<dyn ProgressReporter>,
    factory: Option<CheckFactory>,
    prior: Option<AwaitState>,
    registry: Option<Arc<InstanceRegistry>>,
}

impl AwaitUp {
    pub fn new(sync: Arc<dyn InstanceSync>) -> Self {
        Self { sync,
               progress: Arc::new(LogProgress),
               factory: None,
               prior: None,
               registry: None }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Sustituye los checks estándar derivados de `AwaitConfig`.
    pub fn with_check_factory(mut self, factory: CheckFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_prior_state(mut self, state: AwaitState) -> Self {
        self.prior = Some(state);
        self
    }

    pub fn with_registry(mut self, registry: Arc<InstanceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub async fn await_up(&self, instances: &[Instance], config: &AwaitConfig) -> Result<AwaitResult, AemError> {
        self.await_up_until(instances, config, std::future::pending()).await
    }

    /// Como `await_up`, pero termina con `Cancelled` si `shutdown` se completa.
    pub async fn await_up_until<F>(&self, instances: &[Instance], config: &AwaitConfig, shutdown: F) -> Result<AwaitResult, AemError>
        where F: Future<Output = ()>
    {
        if instances.is_empty() {
            info!("No instances to await.");
            return Ok(AwaitResult::nothing_to_await());
        }

        let mut per_instance = IndexMap::new();
        let mut pending = Vec::new();
        for instance in instances {
            let resumed = config.resume && self.prior.as_ref().is_some_and(|s| s.stable.contains(&instance.name));
            if resumed {
                info!("Instance '{}' already stable in a previous run, skipping.", instance.name);
                per_instance.insert(instance.name.clone(), InstanceOutcome::Resumed);
            } else {
                per_instance.insert(instance.name.clone(), InstanceOutcome::Unstable { reasons: Vec::new() });
                pending.push(instance.clone());
            }
        }
        if pending.is_empty() {
            return Ok(AwaitResult { status: AwaitStatus::Stable,
                                    per_instance,
                                    elapsed: Duration::ZERO,
                                    cycles: 0 });
        }

        let factory = match &self.factory {
            Some(f) => f.clone(),
            None => {
                let config = config.clone();
                Arc::new(move |_: &Instance| config.checks()) as CheckFactory
            }
        };
        let runner = CheckRunner::new(factory).with_delay(config.delay)
                                              .with_parallelism(config.parallelism)
                                              .with_progress(self.progress.clone());
        let report = runner.run(&pending, self.sync.as_ref(), shutdown).await;

        for (name, result) in &report.results {
            let outcome = match &result.failure {
                Some(error) => InstanceOutcome::Failed { error: error.clone() },
                None if result.is_stable() => InstanceOutcome::Stable,
                None => InstanceOutcome::Unstable { reasons: result.reasons() },
            };
            if let Some(registry) = &self.registry {
                if result.unreachable {
                    registry.mark(name, Reachability::Down);
                } else if result.is_stable() {
                    registry.mark(name, Reachability::Up);
                }
            }
            per_instance.insert(name.clone(), outcome);
        }

        let status = match report.status {
            RunStatus::Stable => AwaitStatus::Stable,
            RunStatus::Aborted => AwaitStatus::TimedOut,
            RunStatus::Failed => AwaitStatus::Failed,
            RunStatus::Cancelled => AwaitStatus::Cancelled,
        };
        let result = AwaitResult { status,
                                   per_instance,
                                   elapsed: report.elapsed,
                                   cycles: report.cycles };
        match status {
            AwaitStatus::Stable => info!("Instance(s) stable: {}", result.stable_instances().join(", ")),
            _ => warn!("Instance(s) not stable ({:?}): {}", status, result.unstable_instances().join(", ")),
        }
        if status == AwaitStatus::TimedOut && config.escalate_timeout {
            return result.into_result();
        }
        Ok(result)
    }
}
