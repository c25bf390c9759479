//! Player configuration
//!
//! Resolution follows the priority order: command-line argument, environment
//! variable, TOML config file, compiled default.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Player configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP control surface binds to
    pub bind_addr: String,
    /// Path to the sqlite database holding settings and the position record
    pub db_path: PathBuf,
    /// Root folder music file paths are resolved against
    pub library_root: PathBuf,
}

impl Config {
    /// Resolve configuration from CLI arguments plus an optional config file.
    ///
    /// CLI values win; missing values fall back to the config file, then to
    /// defaults relative to the platform data directory.
    pub fn resolve(
        port: u16,
        cli_db_path: Option<PathBuf>,
        cli_library_root: Option<PathBuf>,
    ) -> Result<Self> {
        let file = load_config_file()?;

        let db_path = cli_db_path
            .or_else(|| file.as_ref().and_then(|f| f.db_path.clone()))
            .unwrap_or_else(default_db_path);

        let library_root = cli_library_root
            .or_else(|| file.as_ref().and_then(|f| f.library_root.clone()))
            .unwrap_or_else(default_library_root);

        Ok(Self {
            bind_addr: format!("0.0.0.0:{port}"),
            db_path,
            library_root,
        })
    }
}

/// Subset of fields readable from the TOML config file
#[derive(Debug, serde::Deserialize)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    library_root: Option<PathBuf>,
}

/// Load `segue/config.toml` from the platform config directory, if present
fn load_config_file() -> Result<Option<ConfigFile>> {
    let Some(path) = dirs::config_dir().map(|d| d.join("segue").join("config.toml")) else {
        return Ok(None);
    };

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let parsed = toml::from_str::<ConfigFile>(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    Ok(Some(parsed))
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("segue")
        .join("segue.db")
}

fn default_library_root() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| PathBuf::from("."))
}
