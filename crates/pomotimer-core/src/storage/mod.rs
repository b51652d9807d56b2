mod settings;

pub use settings::{Settings, CURRENT_SETTINGS_VERSION};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `<config dir>/pomotimer/`.
///
/// Set POMOTIMER_CONFIG_DIR to use another directory.
///
/// # Errors
/// Returns an error if the platform has no config directory.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os("POMOTIMER_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|base| base.join("pomotimer"))
        .ok_or(ConfigError::NoConfigDir)
}
