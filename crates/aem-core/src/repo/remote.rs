use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::StepStateRepository;
use crate::constants::PROVISION_STATE_ROOT;
use crate::errors::AemError;
use crate::instance::Instance;
use crate::repository::Repository;
use crate::step::{StepState, StepStates, StepStatus};
use crate::sync::InstanceSync;

/// Guarda el estado en la propia instancia: un nodo por step bajo
/// `/var/aemflow/provision/step/<id>`. El estado se pierde al recrear la
/// instancia, de modo que una instancia nueva se provisiona desde cero.
///
/// `save` sólo escribe los steps cuyo estado cambió respecto de lo último
/// leído o escrito para esa instancia.
pub struct RemoteStepStateRepository {
    sync: Arc<dyn InstanceSync>,
    root: String,
    persisted: DashMap<String, StepStates>,
}

impl RemoteStepStateRepository {
    pub fn new(sync: Arc<dyn InstanceSync>) -> Self {
        Self { sync,
               root: PROVISION_STATE_ROOT.to_string(),
               persisted: DashMap::new() }
    }

    fn is_persisted(&self, instance: &str, state: &StepState) -> bool {
        self.persisted
            .get(instance)
            .is_some_and(|known| known.get(&state.step_id) == Some(state))
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}

fn to_properties(state: &StepState) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("status".into(), json!(state.status.as_str()));
    props.insert("version".into(), json!(state.version));
    props.insert("counter".into(), json!(state.counter));
    props.insert("startedAt".into(), state.started_at.map(|t| json!(t.to_rfc3339())).unwrap_or(Value::Null));
    props.insert("endedAt".into(), state.ended_at.map(|t| json!(t.to_rfc3339())).unwrap_or(Value::Null));
    props.insert("error".into(), state.error.as_ref().map(|e| json!(e)).unwrap_or(Value::Null));
    props
}

fn from_properties(step_id: &str, props: &Map<String, Value>) -> Option<StepState> {
    let text = |key: &str| props.get(key).and_then(Value::as_str);
    let time = |key: &str| {
        text(key).and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                 .map(|t| t.with_timezone(&Utc))
    };
    Some(StepState { step_id: step_id.to_string(),
                     status: StepStatus::parse(text("status")?)?,
                     version: text("version")?.to_string(),
                     started_at: time("startedAt"),
                     ended_at: time("endedAt"),
                     counter: props.get("counter").and_then(Value::as_u64).unwrap_or(0) as u32,
                     error: text("error").map(str::to_string) })
}

#[async_trait]
impl StepStateRepository for RemoteStepStateRepository {
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError> {
        let repository = Repository::new(instance.clone(), self.sync.clone());
        let tree = repository.node(&self.root).tree(1).await?;
        let mut states = StepStates::new();
        for (step_id, value) in tree.into_iter().flatten() {
            if let Some(state) = value.as_object().and_then(|props| from_properties(&step_id, props)) {
                states.insert(step_id, state);
            }
        }
        self.persisted.insert(instance.name.clone(), states.clone());
        Ok(states)
    }

    async fn save(&self, instance: &Instance, states: &StepStates) -> Result<(), AemError> {
        let repository = Repository::new(instance.clone(), self.sync.clone());
        let root = repository.node(&self.root);
        for (step_id, state) in states {
            if self.is_persisted(&instance.name, state) {
                continue;
            }
            root.child(step_id).save(&to_properties(state)).await?;
            self.persisted
                .entry(instance.name.clone())
                .or_default()
                .insert(step_id.clone(), state.clone());
        }
        Ok(())
    }
}
