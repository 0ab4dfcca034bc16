//! Backends de descarga por protocolo.
//!
//! Cada downloader escribe el contenido de `source` en `target`; el resolver
//! decide el path (un `.part` que luego renombra) y el marcador de fin.

pub mod dependency;
pub mod http;
pub mod sftp;
pub mod smb;
pub mod url;

pub use dependency::{DependencyDownloader, DependencyNotation, DependencyOptions};
pub use http::HttpDownloader;
pub use sftp::SftpDownloader;
pub use smb::SmbDownloader;
pub use url::UrlDownloader;

use async_trait::async_trait;
use std::path::Path;

use crate::errors::DownloadResult;

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, source: &str, target: &Path) -> DownloadResult<()>;
}

/// Origen de una clave de resolución.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Sftp,
    Smb,
    Http,
    /// Otros esquemas de URL (`file://`).
    Url,
    /// `group:name:version[:classifier][@ext]`
    Dependency,
    /// Path local: se referencia sin copiar.
    Local,
}

impl SourceKind {
    pub fn of(key: &str) -> Self {
        let lower = key.to_ascii_lowercase();
        if lower.starts_with("sftp://") {
            SourceKind::Sftp
        } else if lower.starts_with("smb://") {
            SourceKind::Smb
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceKind::Http
        } else if lower.contains("://") {
            SourceKind::Url
        } else if DependencyNotation::parse(key).is_some() {
            SourceKind::Dependency
        } else {
            SourceKind::Local
        }
    }
}

/// Nombre del archivo materializado para una clave.
pub fn file_name_of(key: &str) -> String {
    if let Some(notation) = DependencyNotation::parse(key) {
        return notation.file_name();
    }
    let without_query = key.split(['?', '#']).next().unwrap_or(key);
    let name = without_query.trim_end_matches(['/', '\\'])
                            .rsplit(['/', '\\'])
                            .next()
                            .unwrap_or_default();
    if name.is_empty() || name.contains("://") {
        "file".to_string()
    } else {
        name.to_string()
    }
}
