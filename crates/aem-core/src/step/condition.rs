use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::StepState;
use crate::instance::Instance;

/// Datos disponibles para decidir si un step es debido.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    pub instance: &'a Instance,
    pub previous: Option<&'a StepState>,
    /// Fingerprint actual del step.
    pub fingerprint: &'a str,
    pub now: DateTime<Utc>,
}

impl ConditionContext<'_> {
    pub fn never_ran(&self) -> bool {
        self.previous.map_or(true, |p| p.counter == 0)
    }

    pub fn version_changed(&self) -> bool {
        self.previous.is_some_and(|p| p.version != self.fingerprint)
    }

    pub fn last_failed(&self) -> bool {
        self.previous.is_some_and(StepState::failed)
    }

    /// Verdadero si el último fin exitoso es anterior a `now - age`.
    pub fn ended_before(&self, age: Duration) -> bool {
        match self.previous.and_then(|p| p.ended_at.filter(|_| p.ended())) {
            Some(ended_at) => match chrono::Duration::from_std(age) {
                Ok(age) => ended_at + age <= self.now,
                Err(_) => false,
            },
            None => true,
        }
    }
}

#[derive(Clone, Default)]
pub enum Condition {
    /// Debido si nunca corrió, si cambió el fingerprint o si la última
    /// ejecución falló.
    #[default]
    Once,
    Always,
    Never,
    /// Debido si nunca terminó bien o si terminó hace más de la duración dada.
    RepeatAfter(Duration),
    Custom(Arc<dyn Fn(&ConditionContext<'_>) -> bool + Send + Sync>),
}

impl Condition {
    pub fn custom<F>(f: F) -> Self
        where F: Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static
    {
        Condition::Custom(Arc::new(f))
    }

    pub fn is_due(&self, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Condition::Once => ctx.never_ran() || ctx.version_changed() || ctx.last_failed(),
            Condition::Always => true,
            Condition::Never => false,
            Condition::RepeatAfter(age) => ctx.ended_before(*age),
            Condition::Custom(f) => f(ctx),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Once => write!(f, "Once"),
            Condition::Always => write!(f, "Always"),
            Condition::Never => write!(f, "Never"),
            Condition::RepeatAfter(d) => write!(f, "RepeatAfter({d:?})"),
            Condition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
