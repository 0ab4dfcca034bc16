//! `await-up`: espera hasta que las instancias estén estables.

use aemflow_rust::aem_core::{AwaitResult, AwaitStatus, InstanceOutcome};
use aemflow_rust::{AemConfigOverrides, AemServices};
use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tracing::warn;

use crate::exit;

#[derive(Debug, Args)]
pub struct AwaitArgs {
    /// Total time budget in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Delay between polling cycles in milliseconds.
    #[arg(long)]
    pub delay_millis: Option<u64>,

    /// Skip instances recorded stable by the previous run.
    #[arg(long)]
    pub resume: bool,
}

impl AwaitArgs {
    pub fn apply(&self, overrides: &mut AemConfigOverrides) {
        overrides.await_timeout = self.timeout_secs.map(Duration::from_secs);
        overrides.await_delay = self.delay_millis.map(Duration::from_millis);
        if self.resume {
            overrides.resume = Some(true);
        }
    }
}

pub async fn execute(_args: &AwaitArgs, services: &AemServices, filter: Option<&str>, json: bool) -> Result<u8> {
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = services.await_up_until(filter, shutdown).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text(&result);
    }
    if result.is_success() {
        Ok(exit::OK)
    } else {
        warn!("await finished with status {:?}", result.status);
        Ok(exit::AWAIT_FAILED)
    }
}

fn print_text(result: &AwaitResult) {
    if result.status == AwaitStatus::NothingToAwait {
        println!("No instances to await.");
        return;
    }
    for (name, outcome) in &result.per_instance {
        match outcome {
            InstanceOutcome::Stable => println!("  {name}: stable"),
            InstanceOutcome::Resumed => println!("  {name}: stable (previous run)"),
            InstanceOutcome::Unstable { reasons } => println!("  {name}: unstable ({})", reasons.join("; ")),
            InstanceOutcome::Failed { error } => println!("  {name}: failed ({error})"),
        }
    }
    println!("{:?} after {} cycle(s) in {:.1}s", result.status, result.cycles, result.elapsed.as_secs_f64());
}
