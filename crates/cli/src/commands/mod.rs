//! Command implementations.

mod emit;
mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::RelayConfig;

use crate::error::CliError;

pub use emit::run_emit;
pub use info::run_info;
pub use run::run_relay;
pub use validate::run_validate;

/// Load a config file, or the defaults when no path is given
pub(crate) fn load_config(path: Option<&Path>) -> Result<RelayConfig> {
    let Some(path) = path else {
        return Ok(RelayConfig::default());
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
