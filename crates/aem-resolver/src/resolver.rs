//! Resolver de archivos multi-protocolo con caché por fingerprint.
//!
//! - `resolve(key)` resuelve en el grupo actual (por defecto `default`).
//! - `group(name).await` devuelve un `GroupScope` que retiene el cambio de
//!   grupo; al soltarlo se restaura el grupo por defecto. Mientras el scope
//!   está activo, `resolve` también resuelve en ese grupo. El lock de cambio
//!   sólo serializa scopes entre sí.
//! - Una resolución cuya descarga falla se retira de su grupo.
//! - El mapa de grupos vive tras un `std::sync::Mutex` que nunca se retiene
//!   a través de un `.await`.

use aem_core::AemError;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ResolverConfig;
use crate::downloader::{file_name_of, DependencyDownloader, DependencyOptions, Downloader, HttpDownloader, SftpDownloader,
                        SmbDownloader, SourceKind, UrlDownloader};
use crate::errors::DownloadError;
use crate::group::{FileGroup, DEFAULT_GROUP};
use crate::resolution::FileResolution;

pub struct FileResolver {
    config: ResolverConfig,
    groups: Mutex<IndexMap<String, FileGroup>>,
    current: Mutex<String>,
    switch: tokio::sync::Mutex<()>,
    downloaders: HashMap<SourceKind, Arc<dyn Downloader>>,
}

impl FileResolver {
    pub fn new(config: ResolverConfig) -> Result<Self, AemError> {
        let http = HttpDownloader::new(config.http.clone()).map_err(|e| AemError::config(format!("Cannot create HTTP client: {e}")))?;
        let mut downloaders: HashMap<SourceKind, Arc<dyn Downloader>> = HashMap::new();
        downloaders.insert(SourceKind::Http, Arc::new(http));
        downloaders.insert(SourceKind::Sftp, Arc::new(SftpDownloader::new(config.sftp.clone())));
        downloaders.insert(SourceKind::Smb, Arc::new(SmbDownloader::new(config.smb.clone())));
        downloaders.insert(SourceKind::Url, Arc::new(UrlDownloader));

        let mut groups = IndexMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), FileGroup::new(DEFAULT_GROUP));
        Ok(Self { config,
                  groups: Mutex::new(groups),
                  current: Mutex::new(DEFAULT_GROUP.to_string()),
                  switch: tokio::sync::Mutex::new(()),
                  downloaders })
    }

    /// Sustituye el backend de un tipo de origen.
    pub fn with_downloader(mut self, kind: SourceKind, downloader: Arc<dyn Downloader>) -> Self {
        self.downloaders.insert(kind, downloader);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn download_dir(&self) -> &Path {
        &self.config.download_dir
    }

    fn lock_groups(&self) -> Result<MutexGuard<'_, IndexMap<String, FileGroup>>, AemError> {
        self.groups
            .lock()
            .map_err(|_| AemError::Internal("file group registry is poisoned".into()))
    }

    fn set_current(&self, name: &str) {
        match self.current.lock() {
            Ok(mut current) => *current = name.to_string(),
            Err(poisoned) => *poisoned.into_inner() = name.to_string(),
        }
    }

    pub fn current_group(&self) -> String {
        match self.current.lock() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn downloader(&self, kind: SourceKind) -> Option<Arc<dyn Downloader>> {
        match kind {
            SourceKind::Local => None,
            SourceKind::Dependency => self.downloaders.get(&SourceKind::Dependency).cloned().or_else(|| {
                                          let http = self.downloaders.get(&SourceKind::Http)?.clone();
                                          Some(Arc::new(DependencyDownloader::new(self.config.maven_repositories.clone(), http)) as Arc<dyn Downloader>)
                                      }),
            other => self.downloaders.get(&other).cloned(),
        }
    }

    /// Resuelve en el grupo actual.
    pub async fn resolve(&self, key: &str) -> Result<Arc<FileResolution>, AemError> {
        let group = self.current_group();
        self.resolve_in(&group, key).await
    }

    pub async fn resolve_file(&self, key: &str) -> Result<PathBuf, AemError> {
        let resolution = self.resolve(key).await?;
        materialized(&resolution)
    }

    /// Resuelve varias claves con concurrencia acotada; conserva el orden.
    pub async fn resolve_all(&self, keys: &[String]) -> Result<Vec<Arc<FileResolution>>, AemError> {
        let group = self.current_group();
        self.resolve_all_in(&group, keys).await
    }

    pub async fn dependency(&self, options: &DependencyOptions) -> Result<Arc<FileResolution>, AemError> {
        self.resolve(&options.notation()).await
    }

    async fn resolve_in(&self, group: &str, key: &str) -> Result<Arc<FileResolution>, AemError> {
        let resolution = {
            let mut groups = self.lock_groups()?;
            let group = groups.entry(group.to_string())
                              .or_insert_with(|| FileGroup::new(group));
            let candidate = FileResolution::new(key, group.name(), &self.config.download_dir);
            match group.get(candidate.id()) {
                Some(existing) => existing.clone(),
                None => group.register(candidate),
            }
        };
        if resolution.file().is_none() {
            let downloader = self.downloader(resolution.kind());
            if let Err(e) = resolution.materialize(downloader.as_deref()).await {
                self.forget(group, &resolution)?;
                return Err(e);
            }
        } else {
            debug!("'{}' already resolved in group '{}'", key, group);
        }
        Ok(resolution)
    }

    fn forget(&self, group: &str, resolution: &Arc<FileResolution>) -> Result<(), AemError> {
        let mut groups = self.lock_groups()?;
        if let Some(group) = groups.get_mut(group) {
            if resolution.file().is_none() {
                group.remove(resolution);
            }
        }
        Ok(())
    }

    async fn resolve_all_in(&self, group: &str, keys: &[String]) -> Result<Vec<Arc<FileResolution>>, AemError> {
        let results: Vec<Result<Arc<FileResolution>, AemError>> = stream::iter(keys).map(|key| self.resolve_in(group, key))
                                                                                    .buffered(self.config.parallelism.max(1))
                                                                                    .collect()
                                                                                    .await;
        results.into_iter().collect()
    }

    /// Activa un grupo hasta que se suelte el scope devuelto.
    pub async fn group(&self, name: &str) -> GroupScope<'_> {
        let guard = self.switch.lock().await;
        self.set_current(name);
        if let Ok(mut groups) = self.lock_groups() {
            groups.entry(name.to_string()).or_insert_with(|| FileGroup::new(name));
        }
        GroupScope { resolver: self,
                     name: name.to_string(),
                     _guard: guard }
    }

    /// Resoluciones de un grupo existente y no vacío.
    pub fn group_named(&self, name: &str) -> Result<FileGroup, AemError> {
        self.lock_groups()?
            .get(name)
            .filter(|g| !g.is_empty())
            .cloned()
            .ok_or_else(|| AemError::config(format!("File group '{name}' is not defined.")))
    }

    /// Grupos con al menos una resolución.
    pub fn groups(&self) -> Result<Vec<FileGroup>, AemError> {
        Ok(self.lock_groups()?.values().filter(|g| !g.is_empty()).cloned().collect())
    }

    pub fn all_files(&self) -> Result<Vec<PathBuf>, AemError> {
        Ok(self.groups()?.iter().flat_map(FileGroup::files).collect())
    }

    pub fn output_dirs(&self) -> Result<Vec<PathBuf>, AemError> {
        Ok(self.groups()?.iter().flat_map(FileGroup::dirs).collect())
    }

    /// Descarga directa a `dir`, sin grupos ni caché.
    pub async fn download_to(&self, key: &str, dir: &Path) -> Result<PathBuf, AemError> {
        let key = key.trim();
        let io = |e: std::io::Error| DownloadError::Io(e).into_aem(key);
        tokio::fs::create_dir_all(dir).await.map_err(io)?;
        let target = dir.join(file_name_of(key));
        match self.downloader(SourceKind::of(key)) {
            None => {
                tokio::fs::copy(key, &target).await.map_err(io)?;
            }
            Some(downloader) => {
                let part = dir.join(format!("{}.part", file_name_of(key)));
                if let Err(e) = downloader.download(key, &part).await {
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(e.into_aem(key));
                }
                tokio::fs::rename(&part, &target).await.map_err(io)?;
            }
        }
        Ok(target)
    }
}

fn materialized(resolution: &FileResolution) -> Result<PathBuf, AemError> {
    resolution.file()
              .map(Path::to_path_buf)
              .ok_or_else(|| AemError::Internal(format!("'{}' was not materialized", resolution.key())))
}

/// Grupo activo. Al soltarse restaura el grupo por defecto.
pub struct GroupScope<'a> {
    resolver: &'a FileResolver,
    name: String,
    _guard: tokio::sync::MutexGuard<'a, ()>,
}

impl GroupScope<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn resolve(&self, key: &str) -> Result<Arc<FileResolution>, AemError> {
        self.resolver.resolve_in(&self.name, key).await
    }

    pub async fn resolve_file(&self, key: &str) -> Result<PathBuf, AemError> {
        let resolution = self.resolve(key).await?;
        materialized(&resolution)
    }

    pub async fn resolve_all(&self, keys: &[String]) -> Result<Vec<Arc<FileResolution>>, AemError> {
        self.resolver.resolve_all_in(&self.name, keys).await
    }

    pub async fn dependency(&self, options: &DependencyOptions) -> Result<Arc<FileResolution>, AemError> {
        self.resolve(&options.notation()).await
    }
}

impl Drop for GroupScope<'_> {
    fn drop(&mut self) {
        self.resolver.set_current(DEFAULT_GROUP);
    }
}
