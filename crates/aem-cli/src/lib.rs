//! aem-cli
//!
//! Línea de comandos sobre `aemflow_rust`.
//!
//! - `aemflow await-up`: espera a que las instancias estén estables.
//! - `aemflow provision <plan.json>`: aplica un plan de provisioning.
//! - `aemflow resolve <key>...`: descarga archivos y falla al primer error.
//!
//! La configuración sigue las capas de `AemConfig`; los flags globales son la
//! capa explícita.

pub mod commands;
pub mod exit;

use aemflow_rust::{AemConfig, AemConfigOverrides, AemServices, StateStoreKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AEM instance lifecycle: await, provision and resolve files.
#[derive(Debug, Parser)]
#[command(name = "aemflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Instances as `name=url;name=url` (credentials in the URL userinfo).
    #[arg(long, global = true)]
    pub instances: Option<String>,

    /// Only act on instances whose name matches this wildcard pattern.
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// Maximum number of instances (or downloads) processed concurrently.
    #[arg(long, global = true)]
    pub parallelism: Option<usize>,

    /// Root directory for resolved files.
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Directory for provision and await state files.
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Where step state is stored: file, instance or postgres.
    #[arg(long, global = true)]
    pub state_store: Option<StateStoreKind>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Wait until instances are stable.
    AwaitUp(commands::await_up::AwaitArgs),
    /// Apply a provision plan.
    Provision(commands::provision::ProvisionArgs),
    /// Resolve (download) files.
    Resolve(commands::resolve::ResolveArgs),
}

impl Cli {
    pub fn overrides(&self) -> AemConfigOverrides {
        let mut overrides = AemConfigOverrides { instances: self.instances.clone(),
                                                 parallelism: self.parallelism,
                                                 download_dir: self.download_dir.clone(),
                                                 state_dir: self.state_dir.clone(),
                                                 state_store: self.state_store,
                                                 ..Default::default() };
        if let Commands::AwaitUp(args) = &self.command {
            args.apply(&mut overrides);
        }
        overrides
    }

    pub fn config(&self) -> anyhow::Result<AemConfig> {
        Ok(AemConfig::load(&self.overrides())?)
    }

    pub fn services(&self) -> anyhow::Result<AemServices> {
        Ok(AemServices::new(self.config()?)?)
    }
}

/// Ejecuta el subcomando y devuelve el código de salida.
pub async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let services = cli.services()?;
    let filter = cli.filter.as_deref();
    match &cli.command {
        Commands::AwaitUp(args) => commands::await_up::execute(args, &services, filter, cli.json).await,
        Commands::Provision(args) => commands::provision::execute(args, &services, filter, cli.json).await,
        Commands::Resolve(args) => commands::resolve::execute(args, &services, cli.json).await,
    }
}
