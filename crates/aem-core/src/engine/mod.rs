//! Provisioner: ejecuta steps idempotentes sobre un conjunto de instancias.

mod builder;
mod core;
mod summary;

pub use builder::ProvisionerBuilder;
pub use core::Provisioner;
pub use summary::{ProvisionSummary, StepExecution};
