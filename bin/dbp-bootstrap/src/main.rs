//! Database Bootstrap Provisioner
//!
//! Reads the declared principals, resolves their secrets, and creates the
//! ones the backend does not have yet. Safe to run on every deployment:
//! existing principals are reported and left untouched.
//!
//! Exit codes:
//! - 0: every principal exists after the run
//! - 1: at least one principal failed
//! - 2: configuration, credential or connection error; nothing was attempted

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use dbp_config::{AppConfig, ConfigLoader, DriverKind};
use dbp_core::plan;
use dbp_secrets::SecretService;

mod report;
mod runner;

use report::Outcome;
use runner::RetryPolicy;

/// Database Bootstrap Provisioner
#[derive(Parser, Debug)]
#[command(name = "dbp-bootstrap")]
#[command(about = "Create declared database principals that do not exist yet")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "DBP_CONFIG")]
    config: Option<PathBuf>,

    /// Backend driver: mongodb, postgres, memory
    #[arg(long)]
    driver: Option<DriverKind>,

    /// Administrative connection string
    #[arg(long)]
    uri: Option<String>,

    /// Report what would be created without changing anything
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Total attempts for principals that failed transiently
    #[arg(long, env = "DBP_MAX_ATTEMPTS", default_value = "1")]
    max_attempts: u32,

    /// Delay between attempts in milliseconds
    #[arg(long, env = "DBP_RETRY_DELAY_MS", default_value = "2000")]
    retry_delay_ms: u64,

    /// Print an example configuration and exit
    #[arg(long, default_value = "false")]
    print_example_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    // JSON if LOG_FORMAT=json, text otherwise
    dbp_common::init_logging("dbp-bootstrap");

    let args = Args::parse();

    if args.print_example_config {
        print!("{}", AppConfig::example_toml());
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Bootstrap aborted");
            eprintln!("error: {:#}", e);
            Outcome::Aborted.into()
        }
    }
}

async fn run(args: Args) -> Result<Outcome> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load_unvalidated().context("failed to load configuration")?;

    if let Some(kind) = args.driver {
        config.driver.kind = kind;
    }
    if let Some(uri) = args.uri {
        config.driver.uri = uri;
    }
    config.validate().context("invalid configuration")?;

    info!(
        driver = %config.driver.kind,
        principals = config.principals.len(),
        dry_run = args.dry_run,
        "Starting database bootstrap"
    );

    let secrets = SecretService::new(&runner::secrets_settings(&config));
    let specs = runner::build_specs(&config, &secrets).await?;
    dbp_core::validate(&specs).context("invalid principal declarations")?;

    let mut driver = runner::connect_driver(&config)
        .await
        .with_context(|| format!("failed to connect to {} backend", config.driver.kind))?;

    if args.dry_run {
        let plan = plan(&specs, driver.as_ref()).await?;
        let outcome = report::report_plan(&plan, &mut io::stdout().lock(), &mut io::stderr().lock())?;
        return Ok(outcome);
    }

    let policy = RetryPolicy {
        max_attempts: args.max_attempts,
        delay: Duration::from_millis(args.retry_delay_ms),
    };
    let result = runner::reconcile_with_retry(specs, driver.as_mut(), policy).await?;

    let outcome = report::report_result(&result, &mut io::stdout().lock(), &mut io::stderr().lock())?;
    Ok(outcome)
}
