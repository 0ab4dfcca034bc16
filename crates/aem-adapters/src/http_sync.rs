use aem_core::{AemError, Instance, InstanceSync, Method, SyncRequest, SyncResponse};
use async_trait::async_trait;
use log::trace;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Acepta certificados autofirmados.
    pub ignore_ssl: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(10),
               request_timeout: Duration::from_secs(60),
               ignore_ssl: true }
    }
}

/// GET y DELETE envían los parámetros en la query; POST como formulario
/// (lo que espera el Sling POST servlet).
#[derive(Debug, Clone)]
pub struct HttpInstanceSync {
    client: reqwest::Client,
}

impl HttpInstanceSync {
    pub fn new(options: &SyncOptions) -> Result<Self, AemError> {
        let client = reqwest::Client::builder().connect_timeout(options.connect_timeout)
                                               .timeout(options.request_timeout)
                                               .danger_accept_invalid_certs(options.ignore_ssl)
                                               .build()
                                               .map_err(|e| AemError::config(format!("Cannot create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl InstanceSync for HttpInstanceSync {
    async fn call(&self, instance: &Instance, request: SyncRequest) -> Result<SyncResponse, AemError> {
        let url = instance.url(&request.endpoint);
        trace!("{:?} {}", request.method, url);
        let builder = match request.method {
            Method::Get => self.client.get(&url).query(&request.params),
            Method::Post => self.client.post(&url).form(&request.params),
            Method::Delete => self.client.delete(&url).query(&request.params),
        };
        let remote = |e: reqwest::Error| AemError::remote(&instance.name, format!("{}: {e}", request.endpoint));
        let response = builder.basic_auth(&instance.credentials.user, Some(&instance.credentials.password))
                              .send()
                              .await
                              .map_err(remote)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(remote)?;
        Ok(SyncResponse::new(status, body))
    }
}
