//! Plan de provisioning declarado en JSON.
//!
//! ```json
//! { "steps": [
//!   { "id": "disable-dam-update-asset",
//!     "version": "1",
//!     "action": { "type": "disable_workflow", "id": "update_asset_create" } },
//!   { "id": "replication-agent",
//!     "condition": { "type": "repeat_after", "secs": 86400 },
//!     "action": { "type": "save_node",
//!                 "path": "/etc/replication/agents.author/publish/jcr:content",
//!                 "properties": { "enabled": true } } }
//! ] }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::AemError;
use crate::instance::Instance;
use crate::repository::Repository;
use crate::step::{Condition, Step, StepAction};
use crate::sync::{InstanceSync, Method, SyncRequest, SyncResponse};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionPlan {
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub condition: ConditionSpec,
    #[serde(default = "default_continue_on_fail")]
    pub continue_on_fail: bool,
    pub action: ActionSpec,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_continue_on_fail() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSpec {
    #[default]
    Once,
    Always,
    Never,
    RepeatAfter { secs: u64 },
}

impl From<&ConditionSpec> for Condition {
    fn from(spec: &ConditionSpec) -> Self {
        match spec {
            ConditionSpec::Once => Condition::Once,
            ConditionSpec::Always => Condition::Always,
            ConditionSpec::Never => Condition::Never,
            ConditionSpec::RepeatAfter { secs } => Condition::RepeatAfter(Duration::from_secs(*secs)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionSpec {
    Call {
        method: Method,
        endpoint: String,
        #[serde(default)]
        params: BTreeMap<String, String>,
    },
    SaveNode { path: String, properties: Map<String, Value> },
    EnableWorkflow {
        id: String,
        #[serde(default = "default_frozen")]
        config_frozen: bool,
    },
    DisableWorkflow {
        id: String,
        #[serde(default = "default_frozen")]
        config_frozen: bool,
    },
}

fn default_frozen() -> bool {
    true
}

/// Acción de plan ligada al canal de sincronización del provisioner.
struct PlanAction {
    spec: ActionSpec,
    sync: Arc<dyn InstanceSync>,
}

#[async_trait]
impl StepAction for PlanAction {
    async fn perform(&self, instance: &Instance, sync: &dyn InstanceSync) -> Result<(), AemError> {
        match &self.spec {
            ActionSpec::Call { method, endpoint, params } => {
                let request = params.iter()
                                    .fold(SyncRequest::new(*method, endpoint.clone()), |r, (k, v)| r.param(k, v));
                sync.call(instance, request)
                    .await
                    .and_then(|r: SyncResponse| r.ensure_success(instance, endpoint))
                    .map(|_| ())
            }
            ActionSpec::SaveNode { path, properties } => {
                let repository = Repository::new(instance.clone(), self.sync.clone());
                repository.node(path.clone()).save(properties).await
            }
            ActionSpec::EnableWorkflow { id, config_frozen } | ActionSpec::DisableWorkflow { id, config_frozen } => {
                let enabled = matches!(self.spec, ActionSpec::EnableWorkflow { .. });
                let repository = Repository::new(instance.clone(), self.sync.clone());
                repository.workflows()
                          .config_frozen(*config_frozen)
                          .workflow(id)
                          .toggle(enabled)
                          .await
            }
        }
    }
}

impl ProvisionPlan {
    pub fn from_json(text: &str) -> Result<Self, AemError> {
        serde_json::from_str(text).map_err(|e| AemError::config(format!("Provision plan is malformed: {e}")))
    }

    pub async fn load(path: &Path) -> Result<Self, AemError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AemError::config(format!("Cannot read provision plan '{}': {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Convierte el plan en steps que usan `sync` para las acciones remotas.
    pub fn into_steps(self, sync: Arc<dyn InstanceSync>) -> Vec<Step> {
        self.steps
            .into_iter()
            .map(|spec| {
                let condition = Condition::from(&spec.condition);
                let action = PlanAction { spec: spec.action,
                                          sync: sync.clone() };
                let step = Step::new(spec.id, action).version(spec.version)
                                                     .condition(condition)
                                                     .continue_on_fail(spec.continue_on_fail);
                match spec.description {
                    Some(d) => step.description(d),
                    None => step,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plan_with_defaults() {
        let plan = ProvisionPlan::from_json(r#"{ "steps": [
            { "id": "a", "action": { "type": "call", "method": "POST", "endpoint": "/bin/x", "params": { "k": "v" } } },
            { "id": "b", "version": "2", "condition": { "type": "repeat_after", "secs": 60 },
              "continue_on_fail": false,
              "action": { "type": "disable_workflow", "id": "update_asset_create" } }
        ] }"#).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].version, "1");
        assert_eq!(plan.steps[0].condition, ConditionSpec::Once);
        assert!(plan.steps[0].continue_on_fail);
        assert_eq!(plan.steps[1].condition, ConditionSpec::RepeatAfter { secs: 60 });
        assert!(matches!(plan.steps[1].action, ActionSpec::DisableWorkflow { config_frozen: true, .. }));
    }

    #[test]
    fn unknown_action_is_configuration_error() {
        let err = ProvisionPlan::from_json(r#"{ "steps": [ { "id": "a", "action": { "type": "upload_package" } } ] }"#).unwrap_err();
        assert!(matches!(err, AemError::Configuration(_)));
    }
}
