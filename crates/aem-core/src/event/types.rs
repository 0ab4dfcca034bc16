//! Tipos de evento de un run de provisioning.
//!
//! Cada `Provisioner::provision` emite eventos a un `EventStore` append-only
//! identificados por `run_id`. Son auditoría: el estado que decide si un step
//! es debido vive en `StepStateRepository`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AemError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProvisionEventKind {
    /// Primer evento de un run.
    RunStarted { instances: Vec<String>, step_count: usize },
    StepSkipped { instance: String, step_index: usize, step_id: String },
    StepStarted { instance: String, step_index: usize, step_id: String, fingerprint: String },
    StepEnded {
        instance: String,
        step_index: usize,
        step_id: String,
        fingerprint: String,
        duration_ms: u64,
    },
    StepFailed {
        instance: String,
        step_index: usize,
        step_id: String,
        fingerprint: String,
        error: AemError,
    },
    /// Cierre del run con los contadores del resumen.
    RunCompleted { total: usize, ended: usize, failed: usize, skipped: usize },
}

impl ProvisionEventKind {
    /// Código corto estable usado por los stores persistentes.
    pub fn code(&self) -> &'static str {
        match self {
            ProvisionEventKind::RunStarted { .. } => "R",
            ProvisionEventKind::StepSkipped { .. } => "K",
            ProvisionEventKind::StepStarted { .. } => "S",
            ProvisionEventKind::StepEnded { .. } => "E",
            ProvisionEventKind::StepFailed { .. } => "X",
            ProvisionEventKind::RunCompleted { .. } => "C",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionEvent {
    pub seq: u64,
    pub run_id: Uuid,
    pub kind: ProvisionEventKind,
    pub ts: DateTime<Utc>,
}
