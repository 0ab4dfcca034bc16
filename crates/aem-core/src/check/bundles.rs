use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Check, CheckReport, CheckState};
use crate::constants::BUNDLES_ENDPOINT;
use crate::errors::AemError;
use crate::instance::Instance;
use crate::patterns::matches_any;
use crate::sync::{get_json, InstanceSync};

/// Estados OSGi relevantes (`Bundle.RESOLVED`, `Bundle.ACTIVE`).
const STATE_RESOLVED: i32 = 4;
const STATE_ACTIVE: i32 = 32;

/// Máximo de bundles listados en el mensaje de inestabilidad.
const LISTED: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlesOptions {
    /// Patrones de symbolic name excluidos del check.
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "symbolicName", default)]
    pub symbolic_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "stateRaw", default)]
    pub state_raw: i32,
    #[serde(default)]
    pub fragment: bool,
}

impl Bundle {
    pub fn is_active(&self) -> bool {
        self.state_raw == STATE_ACTIVE || self.state.eq_ignore_ascii_case("active")
    }

    pub fn is_resolved(&self) -> bool {
        self.state_raw == STATE_RESOLVED || self.state.eq_ignore_ascii_case("resolved")
    }

    /// Los fragments nunca se activan: basta con que estén resueltos.
    pub fn is_stable(&self) -> bool {
        self.is_active() || (self.fragment && self.is_resolved())
    }
}

#[derive(Debug, Deserialize)]
struct BundlesPayload {
    #[serde(default)]
    data: Vec<Bundle>,
}

#[derive(Debug)]
pub struct BundlesCheck {
    options: BundlesOptions,
}

impl BundlesCheck {
    pub fn new(options: BundlesOptions) -> Self {
        Self { options }
    }

    pub fn assess(&self, bundles: &[Bundle]) -> CheckReport {
        let considered: Vec<&Bundle> = bundles.iter()
                                              .filter(|b| !matches_any(&b.symbolic_name, &self.options.ignored))
                                              .collect();
        if considered.is_empty() {
            return CheckReport::new(self.name(), CheckState::Unstable).with_message("no bundles reported");
        }
        let unstable: Vec<&Bundle> = considered.iter().copied().filter(|b| !b.is_stable()).collect();
        if unstable.is_empty() {
            return CheckReport::new(self.name(), CheckState::Stable);
        }
        let names: Vec<&str> = unstable.iter().take(LISTED).map(|b| b.symbolic_name.as_str()).collect();
        let message = format!("{} of {} bundle(s) not active: {}{}",
                              unstable.len(),
                              considered.len(),
                              names.join(", "),
                              if unstable.len() > LISTED { ", ..." } else { "" });
        CheckReport::new(self.name(), CheckState::Unstable).with_message(message)
    }
}

#[async_trait]
impl Check for BundlesCheck {
    fn name(&self) -> &'static str {
        "bundles"
    }

    async fn evaluate(&mut self, instance: &Instance, sync: &dyn InstanceSync) -> Result<CheckReport, AemError> {
        let payload: BundlesPayload = get_json(sync, instance, BUNDLES_ENDPOINT).await?;
        Ok(self.assess(&payload.data))
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundles(value: serde_json::Value) -> Vec<Bundle> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn active_and_resolved_fragments_are_stable() {
        let check = BundlesCheck::new(BundlesOptions::default());
        let list = bundles(json!([
            { "id": 0, "symbolicName": "org.apache.felix.framework", "state": "Active", "stateRaw": 32 },
            { "id": 1, "symbolicName": "com.example.fragment", "state": "Resolved", "stateRaw": 4, "fragment": true }
        ]));
        assert_eq!(check.assess(&list).state, CheckState::Stable);
    }

    #[test]
    fn resolved_non_fragment_is_unstable() {
        let check = BundlesCheck::new(BundlesOptions::default());
        let list = bundles(json!([
            { "id": 0, "symbolicName": "org.apache.felix.framework", "stateRaw": 32 },
            { "id": 7, "symbolicName": "com.example.core", "state": "Resolved", "stateRaw": 4 }
        ]));
        let report = check.assess(&list);
        assert_eq!(report.state, CheckState::Unstable);
        assert_eq!(report.message.as_deref(), Some("1 of 2 bundle(s) not active: com.example.core"));
    }

    #[test]
    fn ignored_bundles_do_not_count() {
        let check = BundlesCheck::new(BundlesOptions { ignored: vec!["com.example.*".into()] });
        let list = bundles(json!([
            { "id": 0, "symbolicName": "org.apache.felix.framework", "stateRaw": 32 },
            { "id": 7, "symbolicName": "com.example.core", "stateRaw": 2 }
        ]));
        assert_eq!(check.assess(&list).state, CheckState::Stable);
    }

    #[test]
    fn empty_list_is_unstable() {
        let check = BundlesCheck::new(BundlesOptions::default());
        assert_eq!(check.assess(&[]).state, CheckState::Unstable);
    }
}
