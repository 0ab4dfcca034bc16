use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Check, CheckReport, CheckState};
use crate::constants::{EVENTS_ENDPOINT, EVENTS_UNSTABLE_AGE, EVENTS_UNSTABLE_TOPICS};
use crate::errors::AemError;
use crate::instance::Instance;
use crate::patterns::matches_any;
use crate::sync::{get_json, InstanceSync};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsOptions {
    pub unstable_topics: Vec<String>,
    pub unstable_age: Duration,
}

impl Default for EventsOptions {
    fn default() -> Self {
        Self { unstable_topics: EVENTS_UNSTABLE_TOPICS.iter().map(|t| t.to_string()).collect(),
               unstable_age: EVENTS_UNSTABLE_AGE }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub topic: String,
    /// Epoch en milisegundos.
    pub received: i64,
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Deserialize)]
struct EventsPayload {
    #[serde(default)]
    data: Vec<Event>,
}

/// Inestable mientras haya eventos OSGi recientes de los topics vigilados.
#[derive(Debug)]
pub struct EventsCheck {
    options: EventsOptions,
    /// Último evento inestable visto (epoch ms). Sobrevive a la rotación del
    /// buffer de eventos de la consola.
    last_seen: Option<i64>,
}

impl EventsCheck {
    pub fn new(options: EventsOptions) -> Self {
        Self { options, last_seen: None }
    }

    pub fn assess(&mut self, events: &[Event], now_millis: i64) -> CheckReport {
        let matching: Vec<&Event> = events.iter()
                                          .filter(|e| matches_any(&e.topic, &self.options.unstable_topics))
                                          .collect();
        if let Some(newest) = matching.iter().map(|e| e.received).max() {
            if self.last_seen.map_or(true, |seen| newest > seen) {
                self.last_seen = Some(newest);
            }
        }
        let window = self.options.unstable_age.as_millis() as i64;
        match self.last_seen {
            Some(seen) if now_millis - seen < window => {
                let recent = matching.iter().filter(|e| now_millis - e.received < window).count();
                let topic = matching.iter()
                                    .max_by_key(|e| e.received)
                                    .map(|e| e.topic.as_str())
                                    .unwrap_or("?");
                CheckReport::new(self.name(), CheckState::Unstable).with_message(format!("{recent} recent event(s), last: {topic}"))
            }
            _ => CheckReport::new(self.name(), CheckState::Stable),
        }
    }
}

#[async_trait]
impl Check for EventsCheck {
    fn name(&self) -> &'static str {
        "events"
    }

    async fn evaluate(&mut self, instance: &Instance, sync: &dyn InstanceSync) -> Result<CheckReport, AemError> {
        let payload: EventsPayload = get_json(sync, instance, EVENTS_ENDPOINT).await?;
        Ok(self.assess(&payload.data, Utc::now().timestamp_millis()))
    }

    fn reset(&mut self) {
        self.last_seen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(topic: &str, received: i64) -> Event {
        Event { topic: topic.into(),
                received,
                info: String::new() }
    }

    #[test]
    fn recent_matching_event_is_unstable() {
        let mut check = EventsCheck::new(EventsOptions::default());
        let now = 1_000_000;
        let report = check.assess(&[event("org/osgi/framework/BundleEvent/STARTED", now - 1000)], now);
        assert_eq!(report.state, CheckState::Unstable);
    }

    #[test]
    fn old_or_unrelated_events_are_stable() {
        let mut check = EventsCheck::new(EventsOptions::default());
        let now = 1_000_000;
        let events = [event("org/osgi/framework/BundleEvent/STARTED", now - 10_000),
                      event("com/example/custom", now - 10)];
        assert_eq!(check.assess(&events, now).state, CheckState::Stable);
    }

    #[test]
    fn remembered_event_keeps_window_open_after_rotation() {
        let mut check = EventsCheck::new(EventsOptions::default());
        let now = 1_000_000;
        check.assess(&[event("org/osgi/framework/ServiceEvent/REGISTERED", now)], now);
        assert_eq!(check.assess(&[], now + 2000).state, CheckState::Unstable);
        assert_eq!(check.assess(&[], now + 6000).state, CheckState::Stable);
    }

    #[test]
    fn newer_events_restart_window() {
        let mut check = EventsCheck::new(EventsOptions::default());
        let now = 1_000_000;
        check.assess(&[event("org/osgi/framework/ServiceEvent/REGISTERED", now)], now);
        let later = [event("org/osgi/framework/FrameworkEvent/STARTED", now + 4000)];
        assert_eq!(check.assess(&later, now + 8000).state, CheckState::Unstable);
        check.reset();
        assert_eq!(check.assess(&[], now + 8000).state, CheckState::Stable);
    }
}
