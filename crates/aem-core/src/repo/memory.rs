use async_trait::async_trait;
use dashmap::DashMap;

use super::StepStateRepository;
use crate::errors::AemError;
use crate::instance::Instance;
use crate::step::StepStates;

#[derive(Debug, Default)]
pub struct InMemoryStepStateRepository {
    inner: DashMap<String, StepStates>,
}

impl InMemoryStepStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StepStateRepository for InMemoryStepStateRepository {
    async fn load(&self, instance: &Instance) -> Result<StepStates, AemError> {
        Ok(self.inner.get(&instance.name).map(|s| s.clone()).unwrap_or_default())
    }

    async fn save(&self, instance: &Instance, states: &StepStates) -> Result<(), AemError> {
        self.inner.insert(instance.name.clone(), states.clone());
        Ok(())
    }
}
