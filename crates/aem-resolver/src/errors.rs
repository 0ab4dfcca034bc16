//! Errores internos de los downloaders.
//!
//! Conservan la causa original (`source`) y se convierten en
//! `AemError::Download` en el borde del resolver, con la clave que falló.

use aem_core::AemError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from '{url}'")]
    Status { url: String, status: u16 },
    #[error("invalid source '{0}'")]
    InvalidSource(String),
    #[error("unsupported source: {0}")]
    Unsupported(String),
    #[error("file '{0}' does not exist")]
    NotFound(String),
    #[error("SFTP error: {0}")]
    Sftp(String),
    /// Ningún repositorio Maven tenía el artefacto.
    #[error("'{notation}' not found in any repository ({tried})")]
    NotInRepositories { notation: String, tried: String },
}

impl DownloadError {
    pub fn into_aem(self, key: &str) -> AemError {
        AemError::download(key, self)
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
