//! Notificaciones y progreso.

use log::info;

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

pub trait ProgressReporter: Send + Sync {
    /// Describe la fase actual.
    fn step(&self, message: &str);
    /// Avanza un contador dentro de la fase.
    fn increment(&self, message: &str);
}

/// Notifier que escribe en el log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!("{title}: {message}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn step(&self, message: &str) {
        log::debug!("{message}");
    }

    fn increment(&self, message: &str) {
        log::trace!("{message}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn step(&self, _message: &str) {}

    fn increment(&self, _message: &str) {}
}
