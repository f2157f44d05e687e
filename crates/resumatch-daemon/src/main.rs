mod cli;
mod commands;
mod error;
mod logging;
mod serve;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use resumatch::config::{apply_env_overrides, validate_config};
use resumatch::{load_config, Config, Services};

use cli::{Cli, Command};
use error::DaemonError;

const DEFAULT_CONFIG_FILE: &str = "resumatch.json";

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level, cli.log_format) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), DaemonError> {
    let config = resolve_config(cli.config.as_deref())?;
    info!(
        "Starting resumatchd v{} (database {})",
        env!("CARGO_PKG_VERSION"),
        config.database_path().display()
    );
    let services = Services::build(config)?;

    let output = match cli.command {
        Command::Serve { rematch_all } => return serve::run(services, rematch_all),
        Command::Match { rematch_all } => commands::run_match(&services, rematch_all)?,
        Command::ScanTags => commands::scan_tags(&services)?,
        Command::ImportPositions { file } => commands::import_positions(&services, &file)?,
        Command::ReloadVocab => commands::reload_vocab(&services)?,
        Command::Check => commands::check(&services)?,
        Command::Stats { days } => commands::stats(&services, days)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// The given file, else `./resumatch.json` when it exists, else defaults.
/// Environment overrides apply in every case.
fn resolve_config(explicit: Option<&Path>) -> Result<Config, DaemonError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()));

    match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Ok(load_config(&path)?)
        }
        None => {
            info!("No config file found, using defaults");
            let mut config = Config::default();
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
            validate_config(&config)?;
            Ok(config)
        }
    }
}
