use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Check, CheckReport, CheckState};
use crate::constants::{COMPONENTS_ENDPOINT, COMPONENTS_PLATFORM};
use crate::errors::AemError;
use crate::instance::Instance;
use crate::patterns::matches_any;
use crate::sync::{get_json, InstanceSync};

const LISTED: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentsOptions {
    /// Componentes de plataforma: deben estar `active`.
    pub platform: Vec<String>,
    /// Componentes propios de la instancia: `active`, `satisfied` o `registered`.
    pub specific: Vec<String>,
}

impl Default for ComponentsOptions {
    fn default() -> Self {
        Self { platform: COMPONENTS_PLATFORM.iter().map(|c| c.to_string()).collect(),
               specific: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub state: String,
}

impl Component {
    fn state_is(&self, expected: &str) -> bool {
        self.state.to_ascii_lowercase().starts_with(expected)
    }

    pub fn is_active(&self) -> bool {
        self.state_is("active")
    }

    pub fn is_satisfied(&self) -> bool {
        self.state_is("satisfied")
    }

    pub fn is_registered(&self) -> bool {
        self.state_is("registered")
    }
}

#[derive(Debug, Deserialize)]
struct ComponentsPayload {
    #[serde(default)]
    data: Vec<Component>,
}

#[derive(Debug)]
pub struct ComponentsCheck {
    options: ComponentsOptions,
}

impl ComponentsCheck {
    pub fn new(options: ComponentsOptions) -> Self {
        Self { options }
    }

    pub fn assess(&self, components: &[Component]) -> CheckReport {
        let inactive: Vec<&str> = components.iter()
                                            .filter(|c| matches_any(&c.name, &self.options.platform) && !c.is_active())
                                            .map(|c| c.name.as_str())
                                            .collect();
        let unusable: Vec<&str> = components.iter()
                                            .filter(|c| {
                                                matches_any(&c.name, &self.options.specific)
                                                && !(c.is_active() || c.is_satisfied() || c.is_registered())
                                            })
                                            .map(|c| c.name.as_str())
                                            .collect();
        if inactive.is_empty() && unusable.is_empty() {
            return CheckReport::new(self.name(), CheckState::Stable);
        }
        let mut parts = Vec::new();
        if !inactive.is_empty() {
            parts.push(format!("{} platform component(s) not active: {}", inactive.len(), listed(&inactive)));
        }
        if !unusable.is_empty() {
            parts.push(format!("{} specific component(s) not satisfied: {}", unusable.len(), listed(&unusable)));
        }
        CheckReport::new(self.name(), CheckState::Unstable).with_message(parts.join("; "))
    }
}

fn listed(names: &[&str]) -> String {
    let mut text = names.iter().take(LISTED).copied().collect::<Vec<_>>().join(", ");
    if names.len() > LISTED {
        text.push_str(", ...");
    }
    text
}

#[async_trait]
impl Check for ComponentsCheck {
    fn name(&self) -> &'static str {
        "components"
    }

    async fn evaluate(&mut self, instance: &Instance, sync: &dyn InstanceSync) -> Result<CheckReport, AemError> {
        let payload: ComponentsPayload = get_json(sync, instance, COMPONENTS_ENDPOINT).await?;
        Ok(self.assess(&payload.data))
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, state: &str) -> Component {
        Component { name: name.into(),
                    state: state.into() }
    }

    #[test]
    fn platform_must_be_active() {
        let check = ComponentsCheck::new(ComponentsOptions::default());
        let list = [component("com.day.crx.packaging.impl.PackagingImpl", "active"),
                    component("org.apache.sling.installer.core.impl.OsgiInstallerImpl", "satisfied")];
        let report = check.assess(&list);
        assert_eq!(report.state, CheckState::Unstable);
        assert!(report.message.unwrap().contains("OsgiInstallerImpl"));
    }

    #[test]
    fn specific_may_be_satisfied() {
        let check = ComponentsCheck::new(ComponentsOptions { platform: vec![],
                                                             specific: vec!["com.example.*".into()] });
        let list = [component("com.example.Service", "satisfied"),
                    component("com.example.Lazy", "registered"),
                    component("org.other.Thing", "unsatisfied (reference)")];
        assert_eq!(check.assess(&list).state, CheckState::Stable);
    }

    #[test]
    fn unsatisfied_specific_is_unstable() {
        let check = ComponentsCheck::new(ComponentsOptions { platform: vec![],
                                                             specific: vec!["com.example.*".into()] });
        let list = [component("com.example.Service", "unsatisfied (reference)")];
        assert_eq!(check.assess(&list).state, CheckState::Unstable);
    }
}
