//! governor - inspect configuration and exercise the request governor
//!
//! Loads `.env`, reads an optional YAML config, applies `GOVERNOR_*`
//! overrides and runs one subcommand.

#![allow(missing_docs)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use request_governor::utils::logging::{LoggingOptions, init_logging};
use request_governor::{
    Governor, GovernorConfig, GovernorError, RequestMetadata, ResourceLimitsManager,
    SecurityContext,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "governor", version, about = "Request governor toolbox")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "GOVERNOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and validate a configuration file, then print it as JSON
    CheckConfig {
        file: PathBuf,
    },
    /// Run the file size and security validators against a local file
    ValidateFile {
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Push synthetic requests through a governor and print its metrics
    Simulate {
        #[arg(short = 'n', long, default_value_t = 10)]
        requests: u32,
        /// Fail the first attempt of every K-th request with a retryable error
        #[arg(long)]
        fail_every: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::CheckConfig { file } => {
            init_logging(&LoggingOptions::default());
            check_config(&file).await
        }
        Command::ValidateFile { path, mime, url } => {
            let config = load_config(cli.config.as_deref()).await?;
            validate_file(&config, &path, mime, url).await
        }
        Command::Simulate {
            requests,
            fail_every,
        } => {
            let config = load_config(cli.config.as_deref()).await?;
            simulate(&config, requests, fail_every).await
        }
    }
}

async fn check_config(file: &Path) -> anyhow::Result<()> {
    let config = GovernorConfig::from_file(file)
        .await
        .with_context(|| format!("invalid configuration in {}", file.display()))?;
    println!("{}", config.to_json()?);
    Ok(())
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<GovernorConfig> {
    let mut config = match path {
        Some(path) => GovernorConfig::from_file(path).await?,
        None => GovernorConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    init_logging(&config.logging);
    Ok(config)
}

async fn validate_file(
    config: &GovernorConfig,
    path: &Path,
    mime: Option<String>,
    url: Option<String>,
) -> anyhow::Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("cannot stat {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a regular file", path.display());
    }

    let manager = ResourceLimitsManager::new(config.resources.clone())?;
    let size = manager.validate_file_size(metadata.len());

    let mut context = SecurityContext::new();
    if let Some(name) = path.file_name() {
        context = context.with_filename(name.to_string_lossy());
    }
    if let Some(mime) = mime {
        context = context.with_mime_type(mime);
    }
    if let Some(url) = url {
        context = context.with_url(url);
    }
    let security = manager.validate_security_constraints(&context);

    let report = serde_json::json!({
        "path": path.display().to_string(),
        "size": size,
        "security": security,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !(size.valid && security.valid) {
        bail!("{} failed validation", path.display());
    }
    Ok(())
}

async fn simulate(
    config: &GovernorConfig,
    requests: u32,
    fail_every: Option<u32>,
) -> anyhow::Result<()> {
    if fail_every == Some(0) {
        bail!("--fail-every must be at least 1");
    }

    let governor = Governor::new(config)?;
    info!(
        "Simulating {} requests through a {} limiter",
        requests,
        governor.limiter().algorithm()
    );

    let runs = (1..=requests).map(|n| {
        let governor = &governor;
        let attempts = AtomicU32::new(0);
        async move {
            let flaky = fail_every.is_some_and(|k| n % k == 0);
            let metadata = RequestMetadata::new().with_endpoint("GET", "/simulate");
            governor
                .execute_request(
                    || async {
                        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                        if flaky && attempt == 0 {
                            Err(GovernorError::Io(io::Error::new(
                                io::ErrorKind::ConnectionReset,
                                "ECONNRESET",
                            )))
                        } else {
                            Ok(n)
                        }
                    },
                    Some(metadata),
                )
                .await
        }
    });

    for result in join_all(runs).await {
        if let Err(e) = result {
            warn!("Simulated request failed: {}", e);
        }
    }

    governor.dispose();
    println!("{}", serde_json::to_string_pretty(&governor.metrics())?);
    Ok(())
}
