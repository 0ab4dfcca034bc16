//! `resolve`: descarga archivos por adelantado y falla al primer error.

use aemflow_rust::AemServices;
use anyhow::Result;
use clap::Args;
use tracing::error;

use crate::exit;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// URLs, dependency notations or local paths.
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// File group the resolutions are registered in.
    #[arg(long)]
    pub group: Option<String>,
}

pub async fn execute(args: &ResolveArgs, services: &AemServices, json: bool) -> Result<u8> {
    let resolver = services.resolver()?;
    let resolved = match &args.group {
        Some(name) => resolver.group(name).await.resolve_all(&args.keys).await,
        None => resolver.resolve_all(&args.keys).await,
    };
    let resolutions = match resolved {
        Ok(r) => r,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            return Ok(exit::RESOLVE_FAILED);
        }
    };
    let files: Vec<(String, String)> = resolutions.iter()
                                                  .map(|r| {
                                                      let file = r.file().map(|f| f.display().to_string()).unwrap_or_default();
                                                      (r.key().to_string(), file)
                                                  })
                                                  .collect();
    if json {
        let entries: Vec<serde_json::Value> = files.iter()
                                                   .map(|(key, file)| serde_json::json!({ "key": key, "file": file }))
                                                   .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (key, file) in &files {
            println!("{key} -> {file}");
        }
    }
    Ok(exit::OK)
}
