use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::StepStatus;

/// Estado persistido de un step en una instancia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub step_id: String,
    pub status: StepStatus,
    /// Fingerprint del step en la última ejecución.
    pub version: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Número de ejecuciones (no cuenta los saltos).
    pub counter: u32,
    pub error: Option<String>,
}

impl StepState {
    pub fn skipped(step_id: &str, version: &str) -> Self {
        Self { step_id: step_id.to_string(),
               status: StepStatus::Skipped,
               version: version.to_string(),
               started_at: None,
               ended_at: None,
               counter: 0,
               error: None }
    }

    pub fn ended(&self) -> bool {
        self.status == StepStatus::Ended
    }

    pub fn failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Estados de una instancia indexados por id de step.
pub type StepStates = BTreeMap<String, StepState>;
