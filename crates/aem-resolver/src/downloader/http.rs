use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::Downloader;
use crate::config::HttpOptions;
use crate::errors::{DownloadError, DownloadResult};

pub struct HttpDownloader {
    client: reqwest::Client,
    options: HttpOptions,
}

impl HttpDownloader {
    pub fn new(options: HttpOptions) -> DownloadResult<Self> {
        let client = reqwest::Client::builder().danger_accept_invalid_certs(options.ignore_ssl)
                                               .connect_timeout(Duration::from_secs(options.connect_timeout_secs))
                                               .build()?;
        Ok(Self { client, options })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, source: &str, target: &Path) -> DownloadResult<()> {
        debug!("Downloading '{source}' to '{}'", target.display());
        let mut request = self.client.get(source);
        if let Some(user) = &self.options.user {
            request = request.basic_auth(user, self.options.password.as_ref());
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status { url: source.to_string(),
                                               status: response.status().as_u16() });
        }

        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.sync_all().await?;
        Ok(())
    }
}
