//! `qtigate config`: inspect and initialise configuration.

use std::path::PathBuf;

use serde_json::Value;

use crate::{
    cli::{ConfigCommands, GlobalArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(
    cmd: ConfigCommands,
    global: &GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(&config.redacted(), &key)?;
            output.print(&value)?;
        }

        ConfigCommands::List => {
            output.header("Current Configuration:")?;
            output.print(&to_toml(&config.redacted())?)?;
        }

        ConfigCommands::Path => {
            output.print(&active_path(global).display().to_string())?;
        }

        ConfigCommands::Init { force } => {
            let path = active_path(global);
            if path.exists() && !force {
                output.info(&format!(
                    "Config already exists at {}  (use --force to overwrite)",
                    path.display(),
                ))?;
                return Ok(());
            }

            let contents = to_toml(&AppConfig::default())?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| CliError::IoError {
                    message: format!("Failed to create config directory '{}'", parent.display()),
                    source: e,
                })?;
            }
            std::fs::write(&path, contents).map_err(|e| CliError::IoError {
                message: format!("Failed to write config to '{}'", path.display()),
                source: e,
            })?;

            output.success(&format!("Configuration created at {}", path.display()))?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn active_path(global: &GlobalArgs) -> PathBuf {
    global.config.clone().unwrap_or_else(AppConfig::config_path)
}

fn to_toml(config: &AppConfig) -> CliResult<String> {
    toml::to_string_pretty(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Look up a dotted key such as `service.base_url`; unset values print empty.
fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    let unknown = || CliError::ConfigError {
        message: format!("Unknown config key: '{key}'"),
        source: None,
    };

    let tree = serde_json::to_value(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })?;

    let (section, field) = key.split_once('.').ok_or_else(unknown)?;
    let section = tree.get(section).and_then(Value::as_object).ok_or_else(unknown)?;
    match section.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(Value::Object(_)) => Err(unknown()),
        Some(other) => Ok(other.to_string()),
        // Optional keys are omitted when unset.
        None if matches!(key, "service.base_url" | "service.api_token") => Ok(String::new()),
        None => Err(unknown()),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
