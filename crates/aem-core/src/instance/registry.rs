use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Instance;
use crate::errors::AemError;
use crate::patterns::wildcard_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reachability {
    #[default]
    Unknown,
    Up,
    Down,
}

/// Registro de instancias configuradas. El orden de declaración se conserva.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: IndexMap<String, Instance>,
    reachability: DashMap<String, Reachability>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instances(instances: impl IntoIterator<Item = Instance>) -> Result<Self, AemError> {
        let mut registry = Self::new();
        for instance in instances {
            registry.add(instance)?;
        }
        Ok(registry)
    }

    /// Lista en formato `nombre=url;nombre=url`.
    pub fn parse(list: &str) -> Result<Self, AemError> {
        let mut registry = Self::new();
        for entry in list.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, url) = entry.split_once('=')
                                   .ok_or_else(|| AemError::config(format!("Instance entry '{entry}' must be 'name=url'.")))?;
            registry.add(Instance::parse(name, url)?)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, instance: Instance) -> Result<(), AemError> {
        if self.instances.contains_key(&instance.name) {
            return Err(AemError::config(format!("Instance '{}' is defined more than once.", instance.name)));
        }
        self.instances.insert(instance.name.clone(), instance);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Instance, AemError> {
        self.instances
            .get(name)
            .ok_or_else(|| AemError::config(format!("Instance '{name}' is not defined.")))
    }

    pub fn all(&self) -> Vec<Instance> {
        self.instances.values().cloned().collect()
    }

    /// Instancias cuyo nombre coincide con el patrón (`*-author`, `local-*`).
    pub fn filter(&self, pattern: &str) -> Vec<Instance> {
        self.instances
            .values()
            .filter(|i| wildcard_match(pattern, &i.name))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.instances.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn reachability(&self, name: &str) -> Reachability {
        self.reachability.get(name).map(|r| *r).unwrap_or_default()
    }

    pub fn mark(&self, name: &str, reachability: Reachability) {
        self.reachability.insert(name.to_string(), reachability);
    }
}
