//! Taxonomía de errores del core.
//!
//! Las causas se guardan como texto para que el error sea `Clone` y
//! serializable: se registra en `StepState`, en eventos de provisioning y en
//! los resultados de await sin perder la atribución (instancia, step, URL).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum AemError {
    /// Configuración ausente o inválida. Fatal, sin reintentos.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Fallo de red, timeout o respuesta inesperada de una instancia.
    #[error("cannot communicate with instance '{instance}': {message}")]
    RemoteCommunication { instance: String, message: String },
    /// Fallo al obtener un archivo desde cualquier protocolo.
    #[error("cannot resolve '{key}': {cause}")]
    Download { key: String, cause: String },
    /// La acción de un step devolvió error.
    #[error("step '{step}' failed on instance '{instance}': {cause}")]
    ProvisioningStep { instance: String, step: String, cause: String },
    /// Las instancias no alcanzaron estabilidad a tiempo.
    #[error("instance(s) not stable after {elapsed_secs}s: {}", instances.join(", "))]
    AwaitTimeout { instances: Vec<String>, elapsed_secs: u64 },
    #[error("internal: {0}")]
    Internal(String),
}

/// Clasificación gruesa usada para auditoría y política de reintentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    Configuration,
    Transient,
    Permanent,
}

impl AemError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn remote(instance: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteCommunication { instance: instance.into(),
                                    message: message.into() }
    }

    pub fn download(key: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Download { key: key.into(),
                         cause: cause.to_string() }
    }

    /// Sólo los problemas de comunicación se consideran recuperables: el
    /// siguiente ciclo de sondeo puede tener éxito.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RemoteCommunication { .. })
    }

    pub fn class(&self) -> ErrorClass {
        classify_error(self)
    }
}

pub fn classify_error(error: &AemError) -> ErrorClass {
    match error {
        AemError::Configuration(_) => ErrorClass::Configuration,
        AemError::RemoteCommunication { .. } | AemError::Download { .. } => ErrorClass::Transient,
        AemError::ProvisioningStep { .. } | AemError::AwaitTimeout { .. } | AemError::Internal(_) => ErrorClass::Permanent,
    }
}
