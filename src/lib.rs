//! aemflow
//!
//! Librería de fachada sobre los crates del workspace:
//! - `config`: configuración por capas (defaults, entorno, overrides).
//! - `services`: construcción de await, provisioner y resolver a partir de
//!   la configuración.
//! - `errors`: re-export de la taxonomía de errores.
//!
//! Los crates `aem-core`, `aem-resolver`, `aem-adapters` y `aem-persistence`
//! se re-exportan para que los clientes dependan sólo de este crate.

pub mod config;
pub mod errors;
pub mod services;

pub use aem_adapters;
pub use aem_core;
pub use aem_persistence;
pub use aem_resolver;

pub use config::{AemConfig, AemConfigOverrides, ProvisionConfig, StateStoreKind};
pub use errors::AemError;
pub use services::{AemServices, DynProvisioner};
