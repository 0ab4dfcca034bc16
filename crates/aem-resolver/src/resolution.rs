//! Resolución de un archivo: identidad por fingerprint de la clave y
//! materialización única bajo `downloadDir/<group>/<fingerprint>/`.
//!
//! Invariante de frescura: `download.lock` sólo se escribe tras una descarga
//! completa. Archivo presente sin marcador => descarga interrumpida, se borra
//! y se vuelve a descargar. La descarga va a `<name>.part` y se renombra al
//! terminar, así que cancelar nunca deja un marcador.

use aem_core::AemError;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

use crate::downloader::{file_name_of, Downloader, SourceKind};
use crate::errors::DownloadError;

pub const MARKER_FILE: &str = "download.lock";

/// Fingerprint de una clave: sha256 hex de la clave normalizada.
pub fn fingerprint(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.trim().as_bytes()))
}

#[derive(Debug, Serialize, Deserialize)]
struct Marker {
    downloaded: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FileResolution {
    id: String,
    key: String,
    kind: SourceKind,
    group: String,
    dir: PathBuf,
    file: OnceCell<PathBuf>,
}

impl FileResolution {
    pub(crate) fn new(key: &str, group: &str, download_dir: &Path) -> Self {
        let key = key.trim().to_string();
        let id = fingerprint(&key);
        Self { dir: download_dir.join(group).join(&id),
               kind: SourceKind::of(&key),
               group: group.to_string(),
               key,
               id,
               file: OnceCell::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archivo local, una vez materializado.
    pub fn file(&self) -> Option<&Path> {
        self.file.get().map(PathBuf::as_path)
    }

    pub fn marker(&self) -> PathBuf {
        self.dir.join(MARKER_FILE)
    }

    /// Materializa el archivo una sola vez; llamadas concurrentes esperan a
    /// la primera.
    pub(crate) async fn materialize(&self, downloader: Option<&dyn Downloader>) -> Result<&Path, AemError> {
        self.file
            .get_or_try_init(|| self.fetch(downloader))
            .await
            .map(PathBuf::as_path)
    }

    async fn fetch(&self, downloader: Option<&dyn Downloader>) -> Result<PathBuf, AemError> {
        let io = |e: std::io::Error| DownloadError::Io(e).into_aem(&self.key);

        if self.kind == SourceKind::Local {
            let path = PathBuf::from(&self.key);
            if !path.exists() {
                return Err(DownloadError::NotFound(self.key.clone()).into_aem(&self.key));
            }
            return Ok(path);
        }
        let downloader = downloader.ok_or_else(|| AemError::Internal(format!("no downloader for '{}'", self.key)))?;

        let name = file_name_of(&self.key);
        let target = self.dir.join(&name);
        let marker = self.marker();
        let target_exists = tokio::fs::try_exists(&target).await.map_err(io)?;
        let marker_exists = tokio::fs::try_exists(&marker).await.map_err(io)?;
        if target_exists && marker_exists {
            debug!("Reusing '{}' for '{}'", target.display(), self.key);
            return Ok(target);
        }
        if target_exists {
            warn!("File '{}' has no completion marker, downloading again", target.display());
            tokio::fs::remove_file(&target).await.map_err(io)?;
        }
        if marker_exists {
            tokio::fs::remove_file(&marker).await.map_err(io)?;
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(io)?;
        let part = self.dir.join(format!("{name}.part"));
        if let Err(e) = downloader.download(&self.key, &part).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into_aem(&self.key));
        }
        tokio::fs::rename(&part, &target).await.map_err(io)?;

        let stamp = serde_json::to_string(&Marker { downloaded: Utc::now() }).map_err(|e| AemError::Internal(e.to_string()))?;
        tokio::fs::write(&marker, stamp).await.map_err(io)?;
        debug!("Downloaded '{}' to '{}'", self.key, target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_trimmed() {
        assert_eq!(fingerprint("http://x/a.zip"), fingerprint(" http://x/a.zip "));
        assert_ne!(fingerprint("http://x/a.zip"), fingerprint("http://x/b.zip"));
        assert_eq!(fingerprint("a").len(), 64);
    }

    #[test]
    fn layout_follows_group_and_fingerprint() {
        let r = FileResolution::new("http://x/a.zip", "tools", Path::new("/tmp/files"));
        assert_eq!(r.dir(), Path::new("/tmp/files/tools").join(fingerprint("http://x/a.zip")));
        assert_eq!(r.marker(), r.dir().join("download.lock"));
        assert_eq!(r.kind(), SourceKind::Http);
        assert!(r.file().is_none());
    }
}
