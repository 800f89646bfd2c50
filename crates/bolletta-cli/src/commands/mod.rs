//! CLI subcommands.

pub mod config;
pub mod extract;

use std::path::Path;

use bolletta_core::BollettaConfig;

/// Load the configuration: an explicit path must exist; otherwise the
/// default location is used when present, and built-in defaults when not.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BollettaConfig> {
    let config = match path {
        Some(path) => BollettaConfig::from_file(path)?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                BollettaConfig::from_file(&default_path)?
            } else {
                BollettaConfig::default()
            }
        }
    };
    Ok(config)
}
