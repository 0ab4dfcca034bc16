use serde::{Deserialize, Serialize};

/// Ciclo de vida de un step en una instancia:
/// `Pending -> Due | Skipped`, `Due -> Ended | Failed`.
/// Sólo `Ended`, `Failed` y `Skipped` se persisten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Due,
    Skipped,
    Ended,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Skipped | StepStatus::Ended | StepStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Due => "due",
            StepStatus::Skipped => "skipped",
            StepStatus::Ended => "ended",
            StepStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(StepStatus::Pending),
            "due" => Some(StepStatus::Due),
            "skipped" => Some(StepStatus::Skipped),
            "ended" => Some(StepStatus::Ended),
            "failed" => Some(StepStatus::Failed),
            _ => None,
        }
    }
}
