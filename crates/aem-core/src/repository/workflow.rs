//! Launchers de workflow (`/conf/global/settings/workflow/launcher/config`).
//!
//! En instancias con configuración congelada bajo `/libs`, antes de
//! modificar un launcher se copia su definición a `/conf`.

use serde_json::Value;

use super::{Node, Repository};
use crate::errors::AemError;

const LAUNCHER_ROOT: &str = "/conf/global/settings/workflow/launcher/config";
const LIBS_LAUNCHER_ROOT: &str = "/libs/settings/workflow/launcher/config";

pub struct WorkflowManager<'a> {
    repository: &'a Repository,
    config_frozen: bool,
}

impl<'a> WorkflowManager<'a> {
    pub(super) fn new(repository: &'a Repository) -> Self {
        Self { repository,
               config_frozen: true }
    }

    pub fn config_frozen(mut self, frozen: bool) -> Self {
        self.config_frozen = frozen;
        self
    }

    pub fn workflow(&self, id: &str) -> Workflow<'_> {
        Workflow { manager: self,
                   id: id.to_string() }
    }

    /// Habilita o deshabilita varios launchers.
    pub async fn toggle(&self, ids: &[&str], enabled: bool) -> Result<(), AemError> {
        for id in ids {
            self.workflow(id).toggle(enabled).await?;
        }
        Ok(())
    }
}

pub struct Workflow<'a> {
    manager: &'a WorkflowManager<'a>,
    id: String,
}

impl Workflow<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn launcher(&self) -> Node<'_> {
        self.manager.repository.node(format!("{LAUNCHER_ROOT}/{}", self.id))
    }

    fn libs_launcher(&self) -> String {
        format!("{LIBS_LAUNCHER_ROOT}/{}", self.id)
    }

    pub async fn exists(&self) -> Result<bool, AemError> {
        self.launcher().exists().await
    }

    pub async fn enable(&self) -> Result<(), AemError> {
        self.toggle(true).await
    }

    pub async fn disable(&self) -> Result<(), AemError> {
        self.toggle(false).await
    }

    pub async fn toggle(&self, enabled: bool) -> Result<(), AemError> {
        let launcher = self.launcher();
        if self.manager.config_frozen && !launcher.exists().await? {
            log::debug!("Copying launcher '{}' from /libs", self.id);
            launcher.copy_from(&self.libs_launcher()).await?;
        }
        launcher.save_property("enabled", Value::Bool(enabled)).await
    }
}
