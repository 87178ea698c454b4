use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use archive_sweeper::cli::Cli;
use archive_sweeper::commands;
use archive_sweeper::config::Config;
use archive_sweeper::interrupt;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "archive-sweeper", &mut std::io::stdout());
        return Ok(());
    }

    if cli.target().is_none() {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "a target DIRECTORY (or --directory <PATH>) is required",
            )
            .exit();
    }

    // Initialize logging based on flags
    init_logging(cli.debug, cli.quiet);

    if let Err(e) = interrupt::install_handlers() {
        tracing::warn!("Could not install signal handlers: {}", e);
    }

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    tracing::debug!(?config, "Loaded configuration");

    let status = commands::sweep::run(&cli, &config)?;
    std::process::exit(status.code());
}

fn init_logging(debug: bool, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("archive_sweeper={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
