use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use super::{Check, CheckReport, CheckState};
use crate::constants::AWAIT_TIMEOUT;
use crate::errors::AemError;
use crate::instance::Instance;
use crate::sync::InstanceSync;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutOptions {
    pub timeout: Duration,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self { timeout: AWAIT_TIMEOUT }
    }
}

/// Nunca es estable: se abstiene mientras queda presupuesto y aborta al
/// superarlo. El reloj arranca en la primera evaluación.
#[derive(Debug)]
pub struct TimeoutCheck {
    options: TimeoutOptions,
    started: Option<Instant>,
}

impl TimeoutCheck {
    pub fn new(options: TimeoutOptions) -> Self {
        Self { options, started: None }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

#[async_trait]
impl Check for TimeoutCheck {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn evaluate(&mut self, _instance: &Instance, _sync: &dyn InstanceSync) -> Result<CheckReport, AemError> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let elapsed = started.elapsed();
        if elapsed > self.options.timeout {
            return Ok(CheckReport::new(self.name(), CheckState::Abort).with_message(format!("timeout exceeded ({}s > {}s)",
                                                                                               elapsed.as_secs(),
                                                                                               self.options.timeout.as_secs())));
        }
        Ok(CheckReport::new(self.name(), CheckState::Unknown))
    }

    fn reset(&mut self) {
        self.started = None;
    }
}
