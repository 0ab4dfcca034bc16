use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::resolution::FileResolution;

pub const DEFAULT_GROUP: &str = "default";

/// Colección ordenada de resoluciones, indexada por fingerprint.
#[derive(Debug, Clone)]
pub struct FileGroup {
    name: String,
    resolutions: IndexMap<String, Arc<FileResolution>>,
}

impl FileGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               resolutions: IndexMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, id: &str) -> Option<&Arc<FileResolution>> {
        self.resolutions.get(id)
    }

    /// Registra la resolución salvo que ya exista una con el mismo id, en
    /// cuyo caso devuelve la existente.
    pub(crate) fn register(&mut self, resolution: FileResolution) -> Arc<FileResolution> {
        self.resolutions
            .entry(resolution.id().to_string())
            .or_insert_with(|| Arc::new(resolution))
            .clone()
    }

    /// Retira la resolución si sigue siendo la registrada con su id.
    pub(crate) fn remove(&mut self, resolution: &Arc<FileResolution>) {
        if self.resolutions.get(resolution.id()).is_some_and(|r| Arc::ptr_eq(r, resolution)) {
            self.resolutions.shift_remove(resolution.id());
        }
    }

    pub fn resolutions(&self) -> Vec<Arc<FileResolution>> {
        self.resolutions.values().cloned().collect()
    }

    /// Archivos ya materializados, en orden de registro.
    pub fn files(&self) -> Vec<PathBuf> {
        self.resolutions
            .values()
            .filter_map(|r| r.file().map(|f| f.to_path_buf()))
            .collect()
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.resolutions.values().map(|r| r.dir().to_path_buf()).collect()
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }
}
