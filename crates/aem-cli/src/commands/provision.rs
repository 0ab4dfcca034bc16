//! `provision`: aplica un plan JSON a las instancias.

use aemflow_rust::aem_core::{ProvisionPlan, StepStatus};
use aemflow_rust::AemServices;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::exit;

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Provision plan file (JSON).
    pub plan: PathBuf,
}

pub async fn execute(args: &ProvisionArgs, services: &AemServices, filter: Option<&str>, json: bool) -> Result<u8> {
    let plan = ProvisionPlan::load(&args.plan).await?;
    let summary = services.provision_plan(plan, filter)
                          .await
                          .with_context(|| format!("provisioning with plan '{}'", args.plan.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for execution in summary.executions.iter().filter(|e| e.status != StepStatus::Skipped) {
            match &execution.error {
                Some(error) => println!("  {} / {}: failed ({error})", execution.instance, execution.step_id),
                None => println!("  {} / {}: {}", execution.instance, execution.step_id, execution.status.as_str()),
            }
        }
        for error in &summary.errors {
            println!("  {error}");
        }
        println!("{}", summary.message());
    }
    Ok(if summary.is_success() { exit::OK } else { exit::PROVISION_FAILED })
}
