//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `absence_core` linkage, configuration, and storage bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use absence_core::db::migrations::current_version;
use absence_core::db::{open_db, open_db_in_memory};
use absence_core::{init_logging, sqlite_registry, CoreConfig};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_probe module=cli status=error error={message}");
            eprintln!("absence_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::load().map_err(|err| err.to_string())?;

    if let Some(log_dir) = config.log_dir.as_ref().and_then(|dir| dir.to_str()) {
        init_logging(config.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    let conn = match config.db_path.as_ref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;

    let schema_version = current_version(&conn).map_err(|err| err.to_string())?;
    let registry = sqlite_registry(&conn).map_err(|err| err.to_string())?;
    let absence_days = registry.find_all().map_err(|err| err.to_string())?;

    println!("absence_core ping={}", absence_core::ping());
    println!("absence_core version={}", absence_core::core_version());
    println!("absence_core schema_version={schema_version}");
    println!("absence_core absence_days={}", absence_days.len());
    Ok(())
}
