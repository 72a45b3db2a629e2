//! Portfolio - image portfolio viewer
//!
//! Main entry point: resolves the image directory, builds the session and
//! either runs the viewer window or a one-shot PDF export.

mod app;
mod cli;

use anyhow::{Context, Result};
use app_core::{AppError, LoadOptions, Session, SettingsStore};
use clap::Parser;
use cli::Cli;
use std::path::PathBuf;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging and panic hook first
    let log_guard = app_log::init(app_log::LogConfig::default())?;

    if let Err(e) = app_log::cleanup_old_logs(log_guard.dir(), 7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("Portfolio starting...");

    let (session, dir) = open_session(&cli)?;

    if cli.export_only {
        let path = cli.export_path(&dir);
        let report = session
            .start_export(path.clone())
            .wait()
            .map_err(|e| report_error(&e))
            .with_context(|| format!("exporting to {}", path.display()))?;
        println!("Exported {} pages to {}", report.pages, report.path.display());
        return Ok(());
    }

    let export_path = cli.export_path(&dir);
    app::run(session, export_path)
}

/// Load settings and the catalog.
///
/// Without `--dir` the user is prompted, and prompted again when the chosen
/// directory yields no images.
fn open_session(cli: &Cli) -> Result<(Session, PathBuf)> {
    let store = cli
        .settings
        .clone()
        .map(SettingsStore::new)
        .unwrap_or_else(SettingsStore::at_default_location);

    loop {
        let dir = match &cli.dir {
            Some(dir) => dir.clone(),
            None => cli::prompt_for_directory(std::io::stdin().lock(), std::io::stdout())?,
        };

        match Session::open(store.clone(), &dir, &LoadOptions::default()) {
            Ok((session, skipped)) => {
                for file in &skipped {
                    eprintln!("Skipped {}: {}", file.path.display(), file.error.user_message());
                }
                return Ok((session, dir));
            }
            Err(e) if cli.dir.is_none() => {
                eprintln!("{}", e.user_message());
            }
            Err(e) => {
                return Err(report_error(&e)).with_context(|| format!("loading {}", dir.display()));
            }
        }
    }
}

fn report_error(e: &AppError) -> anyhow::Error {
    tracing::error!("{}", e);
    anyhow::anyhow!(e.user_message())
}
