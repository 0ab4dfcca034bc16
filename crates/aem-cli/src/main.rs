//! Binario `aemflow`: await, provisioning y resolución de archivos.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aem_cli::{exit, Cli};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    // Los crates de librería registran con `log`; el subscriber captura esos registros.
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_target(false))
                                  .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
                                  .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(aem_cli::run(&cli));
    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit::code_for(&e))
        }
    }
}
