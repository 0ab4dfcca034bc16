//! Bucle de sondeo sobre los grupos de checks de un await.

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::{Check, CheckGroup, CheckState, InstanceCheckResult};
use crate::instance::Instance;
use crate::notify::{NoopProgress, ProgressReporter};
use crate::sync::InstanceSync;

/// Construye los checks de una instancia. Se invoca una vez por instancia y
/// run, de modo que el estado de cada check es propio de su instancia.
pub type CheckFactory = Arc<dyn Fn(&Instance) -> Vec<Box<dyn Check>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Stable,
    /// Algún check pidió parada (timeout).
    Aborted,
    /// Error no recuperable en alguna instancia.
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    /// Último resultado de cada instancia, en el orden recibido.
    pub results: IndexMap<String, InstanceCheckResult>,
    pub cycles: u32,
    pub elapsed: Duration,
}

pub struct CheckRunner {
    delay: Duration,
    parallelism: usize,
    factory: CheckFactory,
    progress: Arc<dyn ProgressReporter>,
}

impl CheckRunner {
    pub fn new(factory: CheckFactory) -> Self {
        Self { delay: crate::constants::AWAIT_DELAY,
               parallelism: crate::constants::PARALLELISM,
               factory,
               progress: Arc::new(NoopProgress) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Sondea hasta que todas las instancias estén estables, algún check
    /// aborte, ocurra un error no recuperable o se complete `shutdown`.
    pub async fn run<F>(&self, instances: &[Instance], sync: &dyn InstanceSync, shutdown: F) -> RunReport
        where F: Future<Output = ()>
    {
        let started = Instant::now();
        let mut groups: Vec<CheckGroup> = instances.iter()
                                                   .map(|i| CheckGroup::new(i.clone(), (self.factory)(i)))
                                                   .collect();
        let mut results: IndexMap<String, InstanceCheckResult> = IndexMap::new();
        let mut cycles = 0u32;
        tokio::pin!(shutdown);

        loop {
            cycles += 1;
            self.progress.step(&format!("Checking {} instance(s), cycle {}", groups.len(), cycles));
            let evaluation = stream::iter(groups.iter_mut()).map(|group| group.evaluate(sync))
                                                            .buffer_unordered(self.parallelism)
                                                            .collect::<Vec<_>>();
            let cycle_results = tokio::select! {
                r = evaluation => r,
                _ = &mut shutdown => return self.finish(RunStatus::Cancelled, results, cycles, started),
            };
            for result in cycle_results {
                self.progress.increment(&format!("{}: {:?}", result.instance, result.state));
                results.insert(result.instance.clone(), result);
            }

            if let Some(failed) = results.values().find(|r| r.failure.is_some()) {
                warn!("Instance '{}' cannot be checked: {}",
                      failed.instance,
                      failed.failure.as_ref().map(|e| e.to_string()).unwrap_or_default());
                return self.finish(RunStatus::Failed, results, cycles, started);
            }
            if results.values().any(|r| r.state == CheckState::Abort) {
                return self.finish(RunStatus::Aborted, results, cycles, started);
            }
            if results.values().all(InstanceCheckResult::is_stable) {
                return self.finish(RunStatus::Stable, results, cycles, started);
            }
            for r in results.values().filter(|r| !r.is_stable()) {
                debug!("Instance '{}' not stable yet: {}", r.instance, r.reasons().join("; "));
            }

            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {},
                _ = &mut shutdown => return self.finish(RunStatus::Cancelled, results, cycles, started),
            }
        }
    }

    fn finish(&self, status: RunStatus, results: IndexMap<String, InstanceCheckResult>, cycles: u32, started: Instant) -> RunReport {
        let elapsed = started.elapsed();
        info!("Check run finished with {:?} after {} cycle(s) in {:.1}s", status, cycles, elapsed.as_secs_f64());
        RunReport { status,
                    results,
                    cycles,
                    elapsed }
    }
}
