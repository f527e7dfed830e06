use clap::Parser;
use imap_cli::cli::Cli;
use imap_cli::commands;
use imap_cli::config::Config;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Help and version go to stdout and exit 0; usage errors exit 1
        Err(e) if e.use_stderr() => {
            if let Err(io) = e.print() {
                eprintln!("Error: {}", io);
            }
            return ExitCode::FAILURE;
        }
        Err(e) => e.exit(),
    };

    // Logs go to stderr so stdout stays parseable
    let filter = if cli.verbose > 0 {
        EnvFilter::new(cli.log_filter())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }

    let outcome = match Config::load(cli.config.as_deref()) {
        Ok(config) => commands::dispatch(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
