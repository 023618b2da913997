//! Platform-specific locations

use std::path::PathBuf;

const APP_DIR: &str = "telepaint";

/// Get the platform-specific config directory
///
/// Returns:
/// - Windows: %APPDATA%\telepaint
/// - macOS: ~/Library/Application Support/telepaint
/// - Linux/Other: ~/.config/telepaint
pub fn get_config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_DIR)
}

/// Default location of the client config file
pub fn default_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}
