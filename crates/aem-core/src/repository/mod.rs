//! Nodos del repositorio de contenido de una instancia (Sling POST servlet).
//!
//! Espejo transitorio del estado remoto: nada se guarda localmente.

mod node;
mod workflow;

pub use node::{split_path, Node};
pub use workflow::{Workflow, WorkflowManager};

use std::sync::Arc;

use crate::instance::Instance;
use crate::sync::InstanceSync;

#[derive(Clone)]
pub struct Repository {
    instance: Instance,
    sync: Arc<dyn InstanceSync>,
}

impl Repository {
    pub fn new(instance: Instance, sync: Arc<dyn InstanceSync>) -> Self {
        Self { instance, sync }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn sync(&self) -> &dyn InstanceSync {
        self.sync.as_ref()
    }

    pub fn node(&self, path: impl Into<String>) -> Node<'_> {
        Node::new(self, path.into())
    }

    pub fn workflows(&self) -> WorkflowManager<'_> {
        WorkflowManager::new(self)
    }
}
