use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};

use super::Downloader;
use crate::config::SmbOptions;
use crate::errors::{DownloadError, DownloadResult};

/// Lee `smb://host/share/path` desde un share ya montado localmente.
#[derive(Debug, Clone)]
pub struct SmbDownloader {
    options: SmbOptions,
}

impl SmbDownloader {
    pub fn new(options: SmbOptions) -> Self {
        Self { options }
    }

    pub fn local_path(&self, source: &str) -> DownloadResult<PathBuf> {
        let root = self.options
                       .mount_root
                       .as_ref()
                       .ok_or_else(|| DownloadError::Unsupported(format!("no SMB mount root configured for '{source}'")))?;
        let url = Url::parse(source).map_err(|_| DownloadError::InvalidSource(source.to_string()))?;
        let host = url.host_str()
                      .ok_or_else(|| DownloadError::InvalidSource(source.to_string()))?;
        let mut path = root.join(host);
        for segment in url.path_segments().into_iter().flatten().filter(|s| !s.is_empty()) {
            if segment == ".." {
                return Err(DownloadError::InvalidSource(source.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl Downloader for SmbDownloader {
    async fn download(&self, source: &str, target: &Path) -> DownloadResult<()> {
        let path = self.local_path(source)?;
        if !path.is_file() {
            return Err(DownloadError::NotFound(path.display().to_string()));
        }
        tokio::fs::copy(&path, target).await?;
        Ok(())
    }
}
