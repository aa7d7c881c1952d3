use std::path::{Path, PathBuf};

use milkbook_core::util::normalize_text_option;
use milkbook_core::SyncConfig;

use crate::cli::ConfigCommands;
use crate::cli_config::{default_config_path, CliConfig, Overrides, Settings};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, overrides: Overrides) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            endpoint,
            request_timeout_secs,
            store_path,
        } => run_config_init(endpoint, request_timeout_secs, store_path),
        ConfigCommands::Show => run_config_show(overrides),
    }
}

fn run_config_init(
    endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
    store_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let path = default_config_path().map_err(CliError::Config)?;
    init_config_at(&path, endpoint, request_timeout_secs, store_path)?;
    println!("Saved config to {}", path.display());
    Ok(())
}

/// Merge the given values into the config file at `path`, keeping the rest
pub fn init_config_at(
    path: &Path,
    endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
    store_path: Option<PathBuf>,
) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::load_from_path(path).map_err(CliError::Config)?;

    if let Some(endpoint) = normalize_text_option(endpoint) {
        config.endpoint = Some(SyncConfig::validate_endpoint("--endpoint", &endpoint)?);
    }
    if let Some(secs) = request_timeout_secs {
        if secs == 0 {
            return Err(CliError::Config(
                "--request-timeout-secs must be greater than zero".to_string(),
            ));
        }
        config.request_timeout_secs = Some(secs);
    }
    if let Some(store_path) = store_path {
        config.db_path = Some(store_path);
    }

    config.save_to_path(path).map_err(CliError::Config)?;
    CliConfig::load_from_path(path).map_err(CliError::Config)
}

fn run_config_show(overrides: Overrides) -> Result<(), CliError> {
    let path = default_config_path().map_err(CliError::Config)?;
    let file = CliConfig::load_from_path(&path).map_err(CliError::Config)?;
    let settings = Settings::resolve(overrides, &file)?;

    println!("Config file: {}", path.display());
    for line in describe_settings(&settings) {
        println!("{line}");
    }
    Ok(())
}

pub fn describe_settings(settings: &Settings) -> Vec<String> {
    vec![
        format!("Database: {}", settings.db_path.display()),
        format!(
            "Endpoint: {}",
            settings.sync.endpoint.as_deref().unwrap_or("(not set)")
        ),
        format!(
            "Request timeout: {}s",
            settings.sync.request_timeout.as_secs()
        ),
        format!("Offline: {}", settings.offline),
    ]
}
