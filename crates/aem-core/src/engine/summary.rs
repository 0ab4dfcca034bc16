use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::AemError;
use crate::step::StepStatus;

/// Resultado de un step en una instancia dentro de un run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepExecution {
    pub instance: String,
    pub step_id: String,
    pub status: StepStatus,
    pub error: Option<AemError>,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionSummary {
    pub run_id: Uuid,
    pub executions: Vec<StepExecution>,
    /// Errores que impidieron provisionar una instancia entera (p. ej. el
    /// estado no se pudo cargar).
    pub errors: Vec<AemError>,
}

impl ProvisionSummary {
    fn count(&self, status: StepStatus) -> usize {
        self.executions.iter().filter(|e| e.status == status).count()
    }

    /// Steps ejecutados (no saltados).
    pub fn total(&self) -> usize {
        self.executions.iter().filter(|e| e.status != StepStatus::Skipped).count()
    }

    pub fn ended(&self) -> usize {
        self.count(StepStatus::Ended)
    }

    pub fn failed(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(StepStatus::Skipped)
    }

    /// Instancias con al menos un step ejecutado.
    pub fn instances(&self) -> BTreeSet<String> {
        self.executions
            .iter()
            .filter(|e| e.status != StepStatus::Skipped)
            .map(|e| e.instance.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.errors.is_empty()
    }

    pub fn failures(&self) -> Vec<&AemError> {
        self.executions
            .iter()
            .filter_map(|e| e.error.as_ref())
            .chain(self.errors.iter())
            .collect()
    }

    pub fn message(&self) -> String {
        format!("Performed {} step(s) ({} ended, {} failed) on {} instance(s).",
                self.total(),
                self.ended(),
                self.failed(),
                self.instances().len())
    }
}
