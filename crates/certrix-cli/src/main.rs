//! Certrix CLI binary entrypoint.
//!
//! This is the main entry point for the `certrix` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use certrix_cli::cli::{Cli, Commands};
use certrix_cli::commands::{GenerateCommand, PreviewCommand, RenewBulkCommand, RenewCommand};
use certrix_pki::Certrix;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_internal() {
                error!(error = %e, "Command failed");
            }
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), certrix_cli::CliError> {
    let format = cli.format;
    let mut stdout = io::stdout().lock();

    let mut certrix = Certrix::new(cli.ca.to_config());

    match cli.command {
        Commands::Generate(args) => {
            let cmd = GenerateCommand::new(&certrix);
            cmd.execute(&mut stdout, format, &args)?;
        }
        Commands::Renew(args) => {
            let cmd = RenewCommand::new(&certrix);
            cmd.execute(&mut stdout, format, &args)?;
        }
        Commands::RenewBulk(args) => {
            if let Some(workers) = args.workers {
                certrix = certrix.with_workers(workers);
            }
            let cmd = RenewBulkCommand::new(&certrix);
            cmd.execute(&mut stdout, format, &args)?;
        }
        Commands::Preview(args) => {
            let cmd = PreviewCommand::new();
            cmd.execute(&mut stdout, format, &args)?;
        }
    }

    Ok(())
}
