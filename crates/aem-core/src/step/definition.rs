use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

use super::Condition;
use crate::constants::ENGINE_VERSION;
use crate::errors::AemError;
use crate::hashing::hash_value;
use crate::instance::Instance;
use crate::sync::InstanceSync;

#[async_trait]
pub trait StepAction: Send + Sync {
    async fn perform(&self, instance: &Instance, sync: &dyn InstanceSync) -> Result<(), AemError>;
}

/// Acción síncrona a partir de un closure. Útil para acciones locales y tests.
pub struct FnAction<F>(F);

pub fn action_fn<F>(f: F) -> FnAction<F>
    where F: Fn(&Instance) -> Result<(), AemError> + Send + Sync
{
    FnAction(f)
}

#[async_trait]
impl<F> StepAction for FnAction<F> where F: Fn(&Instance) -> Result<(), AemError> + Send + Sync
{
    async fn perform(&self, instance: &Instance, _sync: &dyn InstanceSync) -> Result<(), AemError> {
        (self.0)(instance)
    }
}

#[derive(Clone)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub version: String,
    pub condition: Condition,
    pub continue_on_fail: bool,
    action: Arc<dyn StepAction>,
}

impl Step {
    pub fn new(id: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self::from_arc(id, Arc::new(action))
    }

    pub fn from_arc(id: impl Into<String>, action: Arc<dyn StepAction>) -> Self {
        let id = id.into();
        Self { description: id.clone(),
               id,
               version: "1".to_string(),
               condition: Condition::Once,
               continue_on_fail: true,
               action }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn continue_on_fail(mut self, flag: bool) -> Self {
        self.continue_on_fail = flag;
        self
    }

    pub fn fingerprint(&self) -> String {
        hash_value(&json!({
            "engine_version": ENGINE_VERSION,
            "id": self.id,
            "version": self.version,
        }))
    }

    pub async fn perform(&self, instance: &Instance, sync: &dyn InstanceSync) -> Result<(), AemError> {
        self.action.perform(instance, sync).await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
         .field("id", &self.id)
         .field("version", &self.version)
         .field("condition", &self.condition)
         .field("continue_on_fail", &self.continue_on_fail)
         .finish()
    }
}
