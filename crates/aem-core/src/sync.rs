//! Canal de sincronización con las instancias (API HTTP de gestión).
//!
//! El core sólo conoce el trait; la implementación real (reqwest) vive en
//! `aem-adapters`, y los tests usan fakes con respuestas guionizadas.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::AemError;
use crate::instance::Instance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub method: Method,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl SyncRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self { method,
               endpoint: endpoint.into(),
               params: Vec::new() }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResponse {
    pub status: u16,
    pub body: String,
}

impl SyncResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status,
               body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Falla si el status no es 2xx. Credenciales rechazadas (401/403) son un
    /// error de configuración; el resto, de comunicación.
    pub fn ensure_success(self, instance: &Instance, endpoint: &str) -> Result<Self, AemError> {
        match self.status {
            200..=299 => Ok(self),
            401 | 403 => Err(AemError::config(format!("Instance '{}' rejected credentials of user '{}' (status {}) at '{}'.",
                                                      instance.name, instance.credentials.user, self.status, endpoint))),
            status => Err(AemError::remote(&instance.name, format!("unexpected status {status} at '{endpoint}'"))),
        }
    }

    pub fn json<T: DeserializeOwned>(&self, instance: &Instance, endpoint: &str) -> Result<T, AemError> {
        serde_json::from_str(&self.body).map_err(|e| {
                                            AemError::remote(&instance.name,
                                                             format!("malformed JSON at '{endpoint}': {e}"))
                                        })
    }
}

#[async_trait]
pub trait InstanceSync: Send + Sync {
    async fn call(&self, instance: &Instance, request: SyncRequest) -> Result<SyncResponse, AemError>;
}

/// GET que exige 2xx y decodifica JSON.
pub async fn get_json<T: DeserializeOwned>(sync: &dyn InstanceSync, instance: &Instance, endpoint: &str) -> Result<T, AemError> {
    let response = sync.call(instance, SyncRequest::get(endpoint)).await?;
    response.ensure_success(instance, endpoint)?.json(instance, endpoint)
}
