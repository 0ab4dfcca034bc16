use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::StepStateRepository;
use crate::errors::AemError;
use crate::instance::Instance;
use crate::step::StepStates;

/// Un archivo `<dir>/<instancia>.json` por instancia. La escritura pasa por un
/// temporal renombrado para no dejar archivos a medias.
#[derive(Debug, Clone)]
pub struct FileStepStateRepository {
    dir: PathBuf,
}

impl FileStepStateRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, instance: &Instance) -> PathBuf {
        self.dir.join(format!("{}.json", instance.name))
    }
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> AemError {
    AemError::Internal(format!("step state file '{}': {e}", path.display()))
}

#[async_trait]
impl StepStateRepository for FileStepStateRepository {
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError> {
        let path = self.path(instance);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| io_error(&path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StepStates::new()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn save(&self, instance: &Instance, states: &StepStates) -> Result<(), AemError> {
        let path = self.path(instance);
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| io_error(&self.dir, e))?;
        let text = serde_json::to_string_pretty(states).map_err(|e| io_error(&path, e))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await.map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| io_error(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepState;

    #[tokio::test]
    async fn missing_file_is_empty_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileStepStateRepository::new(dir.path().join("provision"));
        let instance = Instance::new("local-author", "http://localhost:4502");
        assert!(repo.load(&instance).await.unwrap().is_empty());

        let mut states = StepStates::new();
        states.insert("a".into(), StepState::skipped("a", "fp"));
        repo.save(&instance, &states).await.unwrap();
        assert_eq!(repo.load(&instance).await.unwrap(), states);
        assert!(repo.path(&instance).exists());
    }
}
