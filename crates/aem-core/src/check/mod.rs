//! Motor de checks de estabilidad.
//!
//! Cada `Check` es un predicado con estado evaluado una vez por ciclo de
//! sondeo. Un `CheckGroup` agrupa los checks de una instancia y agrega sus
//! estados; `CheckRunner` sondea todos los grupos hasta que el run termina.
//!
//! Reglas de agregación por instancia:
//! - algún `Abort` => `Abort`
//! - algún `Unstable` => `Unstable`
//! - al menos un `Stable` => `Stable`
//! - si todos se abstienen (`Unknown`) la instancia no cuenta como estable.

pub mod bundles;
pub mod components;
pub mod events;
pub mod runner;
pub mod timeout;

pub use bundles::{BundlesCheck, BundlesOptions};
pub use components::{ComponentsCheck, ComponentsOptions};
pub use events::{EventsCheck, EventsOptions};
pub use runner::{CheckFactory, CheckRunner, RunReport, RunStatus};
pub use timeout::{TimeoutCheck, TimeoutOptions};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AemError;
use crate::instance::Instance;
use crate::sync::InstanceSync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckState {
    /// El check se abstiene en este ciclo.
    Unknown,
    Stable,
    Unstable,
    /// Parada inmediata del run.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub check: String,
    pub state: CheckState,
    pub message: Option<String>,
}

impl CheckReport {
    pub fn new(check: &str, state: CheckState) -> Self {
        Self { check: check.to_string(),
               state,
               message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[async_trait]
pub trait Check: Send {
    fn name(&self) -> &'static str;

    async fn evaluate(&mut self, instance: &Instance, sync: &dyn InstanceSync) -> Result<CheckReport, AemError>;

    /// Descarta el estado acumulado (relojes, eventos vistos).
    fn reset(&mut self);
}

pub fn aggregate<I>(states: I) -> CheckState
    where I: IntoIterator<Item = CheckState>
{
    let mut any_stable = false;
    let mut any_unstable = false;
    for state in states {
        match state {
            CheckState::Abort => return CheckState::Abort,
            CheckState::Unstable => any_unstable = true,
            CheckState::Stable => any_stable = true,
            CheckState::Unknown => {}
        }
    }
    if any_unstable {
        CheckState::Unstable
    } else if any_stable {
        CheckState::Stable
    } else {
        CheckState::Unknown
    }
}

/// Resultado de evaluar el grupo de una instancia en un ciclo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCheckResult {
    pub instance: String,
    pub state: CheckState,
    pub reports: Vec<CheckReport>,
    /// La instancia no respondió en este ciclo.
    pub unreachable: bool,
    /// Error no recuperable que termina el run.
    pub failure: Option<AemError>,
}

impl InstanceCheckResult {
    pub fn is_stable(&self) -> bool {
        self.state == CheckState::Stable && self.failure.is_none()
    }

    /// Mensajes de los checks que impiden la estabilidad.
    pub fn reasons(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| matches!(r.state, CheckState::Unstable | CheckState::Abort))
            .map(|r| match &r.message {
                Some(m) => format!("{}: {}", r.check, m),
                None => r.check.clone(),
            })
            .collect()
    }
}

pub struct CheckGroup {
    instance: Instance,
    checks: Vec<Box<dyn Check>>,
}

impl CheckGroup {
    pub fn new(instance: Instance, checks: Vec<Box<dyn Check>>) -> Self {
        Self { instance, checks }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Evalúa todos los checks en orden. Un error de comunicación marca el
    /// check como inestable y el resto sigue evaluándose; cualquier otro
    /// error corta la evaluación del grupo.
    pub async fn evaluate(&mut self, sync: &dyn InstanceSync) -> InstanceCheckResult {
        let mut reports = Vec::with_capacity(self.checks.len());
        let mut unreachable = false;
        for check in self.checks.iter_mut() {
            match check.evaluate(&self.instance, sync).await {
                Ok(report) => reports.push(report),
                Err(e) if e.is_recoverable() => {
                    unreachable = true;
                    reports.push(CheckReport::new(check.name(), CheckState::Unstable).with_message(e.to_string()));
                }
                Err(e) => {
                    return InstanceCheckResult { instance: self.instance.name.clone(),
                                                 state: CheckState::Abort,
                                                 reports,
                                                 unreachable,
                                                 failure: Some(e) };
                }
            }
        }
        InstanceCheckResult { instance: self.instance.name.clone(),
                              state: aggregate(reports.iter().map(|r| r.state)),
                              reports,
                              unreachable,
                              failure: None }
    }

    pub fn reset(&mut self) {
        for check in self.checks.iter_mut() {
            check.reset();
        }
    }
}
