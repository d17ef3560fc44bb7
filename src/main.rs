use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kmersearch::{EngineConfig, Pipeline};

const USAGE: &str = "usage: kmer-search [--json-logs] <config.yaml>";

fn main() -> Result<()> {
    let mut json_logs = false;
    let mut config_path: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json-logs" => json_logs = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            path if config_path.is_none() => config_path = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}\n{USAGE}"),
        }
    }
    let config_path = config_path.context(USAGE)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let config = EngineConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(config = %config_path.display(), name = ?config.name, "configuration loaded");

    let output = config.output.directory.clone();
    let mut pipeline = Pipeline::new(config)?;
    let evaluation = pipeline.run_all()?;
    println!(
        "MAP {:.4} over {} queries ({} without class labels)",
        evaluation.map,
        evaluation.per_query.len(),
        evaluation.skipped
    );

    if let Some(dir) = output {
        let written = pipeline
            .save_all(&dir)
            .with_context(|| format!("saving artifacts to {}", dir.display()))?;
        for path in written {
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
