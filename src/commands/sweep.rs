//! Sweep command implementation.

use anyhow::{Context, Result};
use std::io::{self, Write};

use crate::cli::Cli;
use crate::config::Config;
use crate::pipeline::{ExitStatus, Pipeline, RunOptions};
use crate::prompt::{AutoPrompt, Prompt, TerminalPrompt};
use crate::report::select_renderer;

/// Resolve run options from the configuration and command-line flags.
pub fn resolve_options(cli: &Cli, config: &Config) -> Option<RunOptions> {
    let root = cli.target()?.clone();
    let mut options = RunOptions::from_config(root, config);

    options.clean_only = cli.clean_only;
    options.no_confirm = cli.no_confirm;
    options.show_progress = !cli.json && !cli.quiet;
    if let Some(max_size) = cli.max_size {
        options.extract.max_archive_size = max_size;
    }
    if cli.single_pass {
        options.fixed_point = false;
    }
    if cli.keep_archives {
        options.extract.delete_archive = false;
    }

    Some(options)
}

/// Run the sweep and print the report. Returns the process exit status.
pub fn run(cli: &Cli, config: &Config) -> Result<ExitStatus> {
    let options = resolve_options(cli, config).context("No target directory given")?;
    let verbosity = cli.verbosity.unwrap_or(config.report.verbosity);
    let color = config.report.color && !cli.no_color;

    tracing::info!(root = %options.root.display(), clean_only = options.clean_only, "Starting sweep");

    let mut prompt: Box<dyn Prompt> = if options.no_confirm {
        Box::new(AutoPrompt(true))
    } else {
        Box::new(TerminalPrompt::new())
    };

    let report = Pipeline::new(options).run(prompt.as_mut());

    let mut stdout = io::stdout().lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &report.stats)
            .context("Failed to write JSON report")?;
        writeln!(stdout)?;
    } else {
        let renderer = select_renderer(color);
        let text = report.stats.render(verbosity, renderer.as_ref());
        if !text.is_empty() {
            write!(stdout, "{}", text)?;
        }
    }
    stdout.flush()?;

    Ok(report.exit)
}
