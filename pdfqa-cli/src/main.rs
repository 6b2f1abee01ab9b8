use std::process::ExitCode;

use clap::Parser;
use pdfqa_cli::cli::Cli;
use pdfqa_cli::{app, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init(cli.command.default_log_level(), cli.verbose > 0);

    match app::run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            eprintln!("\nFATAL ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}
