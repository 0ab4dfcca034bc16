use async_trait::async_trait;
use reqwest::Url;
use std::path::Path;

use super::Downloader;
use crate::errors::{DownloadError, DownloadResult};

/// Esquemas de URL genéricos. Sólo `file://` se copia localmente.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlDownloader;

#[async_trait]
impl Downloader for UrlDownloader {
    async fn download(&self, source: &str, target: &Path) -> DownloadResult<()> {
        let url = Url::parse(source).map_err(|_| DownloadError::InvalidSource(source.to_string()))?;
        if url.scheme() != "file" {
            return Err(DownloadError::Unsupported(format!("scheme '{}' of '{source}'", url.scheme())));
        }
        let path = url.to_file_path()
                      .map_err(|_| DownloadError::InvalidSource(source.to_string()))?;
        if !path.exists() {
            return Err(DownloadError::NotFound(path.display().to_string()));
        }
        tokio::fs::copy(&path, target).await?;
        Ok(())
    }
}
