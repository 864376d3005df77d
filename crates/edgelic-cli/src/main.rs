//! # edgelic entry point
//!
//! Parses command-line arguments, installs telemetry and dispatches to the
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use edgelic_cli::run::{run_enforcer, RunArgs};
use edgelic_cli::telemetry::{self, TelemetryConfig};
use edgelic_cli::validate::{run_validate, ValidateArgs};

/// License enforcement for IoT Edge modules.
#[derive(Parser, Debug)]
#[command(name = "edgelic", version, about, long_about = None)]
struct Cli {
    /// Hosting environment; `Development` enables trace logging.
    #[arg(long, env = "EDGELIC_ENVIRONMENT", default_value = "Production", global = true)]
    environment: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "EDGELIC_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enforce the module license until stopped or the license is lost.
    Run(RunArgs),

    /// Validate a license token file once and print the outcome.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    telemetry::init(TelemetryConfig {
        development: telemetry::is_development(&cli.environment),
        json: cli.log_json,
    });

    let result = match cli.command {
        Commands::Run(args) => tokio::runtime::Runtime::new()
            .map_err(anyhow::Error::from)
            .and_then(|runtime| runtime.block_on(run_enforcer(&args))),
        Commands::Validate(args) => run_validate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
