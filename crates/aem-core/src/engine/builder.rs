//! Builder para `Provisioner`.
//!
//! Las stores (eventos + estado de steps) se fijan al crear el builder; el
//! canal de sincronización es obligatorio y se valida en `build`, junto con
//! la unicidad de los ids de step.
//!
//! ```ignore
//! let provisioner = Provisioner::new()
//!     .sync(sync)
//!     .step(Step::new("enable-launchers", action))
//!     .build()?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::PARALLELISM;
use crate::engine::Provisioner;
use crate::errors::AemError;
use crate::event::EventStore;
use crate::notify::{LogNotifier, Notifier};
use crate::repo::StepStateRepository;
use crate::step::Step;
use crate::sync::InstanceSync;

pub struct ProvisionerBuilder<E: EventStore, R: StepStateRepository> {
    pub(crate) event_store: E,
    pub(crate) repository: R,
    sync: Option<Arc<dyn InstanceSync>>,
    notifier: Arc<dyn Notifier>,
    parallelism: usize,
    steps: Vec<Step>,
}

impl<E: EventStore, R: StepStateRepository> ProvisionerBuilder<E, R> {
    pub(crate) fn new(event_store: E, repository: R) -> Self {
        Self { event_store,
               repository,
               sync: None,
               notifier: Arc::new(LogNotifier),
               parallelism: PARALLELISM,
               steps: Vec::new() }
    }

    pub fn sync(mut self, sync: Arc<dyn InstanceSync>) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Añade un step. El orden de declaración es el orden de ejecución.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn build(self) -> Result<Provisioner<E, R>, AemError> {
        let sync = self.sync
                       .ok_or_else(|| AemError::config("Provisioner requires an instance sync channel."))?;
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(AemError::config("Provision step id cannot be empty."));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(AemError::config(format!("Provision step '{}' is defined more than once.", step.id)));
            }
        }
        Ok(Provisioner::from_parts(self.event_store,
                                   self.repository,
                                   sync,
                                   self.notifier,
                                   self.parallelism,
                                   self.steps))
    }
}
