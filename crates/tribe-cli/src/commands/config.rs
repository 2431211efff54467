use std::path::{Path, PathBuf};

use tribe_core::TribeConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::{load_config, resolve_db_path};
use crate::error::CliError;

pub fn run_config(
    command: ConfigCommands,
    config_path: &Path,
    cli_db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            database_path,
            import_dir,
            timeout_ms,
            retry_limit,
        } => {
            let overrides = ConfigOverrides {
                database_path,
                import_dir,
                timeout_ms,
                retry_limit,
            };
            let config = run_config_init(config_path, overrides)?;
            println!("Saved config to {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Show => run_config_show(config_path, cli_db_path),
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub import_dir: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub retry_limit: Option<u32>,
}

/// Merge `overrides` into the config at `config_path` and save it.
pub fn run_config_init(
    config_path: &Path,
    overrides: ConfigOverrides,
) -> Result<TribeConfig, CliError> {
    let existing = load_config(config_path)?;
    let config = TribeConfig {
        database_path: overrides.database_path.or(existing.database_path),
        import_dir: overrides.import_dir.or(existing.import_dir),
        operation_timeout_ms: overrides
            .timeout_ms
            .unwrap_or(existing.operation_timeout_ms),
        sync_retry_limit: overrides.retry_limit.unwrap_or(existing.sync_retry_limit),
    };
    config.save_to_path(config_path)?;
    load_config(config_path)
}

fn run_config_show(config_path: &Path, cli_db_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let db_path = resolve_db_path(cli_db_path, &config);

    println!("Config file: {}", config_path.display());
    println!("Database: {}", db_path.display());
    println!(
        "Import dir: {}",
        config
            .import_dir
            .as_deref()
            .map_or_else(|| "not set".to_string(), |dir| dir.display().to_string())
    );
    match config.operation_timeout() {
        Some(timeout) => println!("Operation timeout: {}ms", timeout.as_millis()),
        None => println!("Operation timeout: none"),
    }
    println!("Sync retry limit: {}", config.sync_retry_limit);
    Ok(())
}
