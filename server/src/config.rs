use std::env;
use std::path::PathBuf;

use crate::notify::Notifier;

const DATA_DIR: &str = "./uploads";
const STATIC_DIR: &str = "./static";
const PORT: &str = "8080";

pub const DATA_DIR_VAR: &str = "PICDROP_DATA_DIR";
pub const STATIC_DIR_VAR: &str = "PICDROP_STATIC_DIR";
pub const SECRET_KEY_VAR: &str = "PICDROP_SECRET_KEY";
pub const PORT_VAR: &str = "PICDROP_PORT";
pub const NOTIFY_VAR: &str = "PICDROP_NOTIFY";

/// Service settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    /// `None` locks the admin pages entirely
    pub secret_key: Option<String>,
    pub port: u16,
    pub notifier: Notifier,
}

impl Config {
    /// Reads settings from the process environment. A `.env` file in the
    /// working directory is loaded first if there is one.
    pub fn from_env() -> Result<Self, String> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("environment loaded from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_VAR).unwrap_or_else(|| String::from(DATA_DIR));
        let static_dir = lookup(STATIC_DIR_VAR).unwrap_or_else(|| String::from(STATIC_DIR));
        let secret_key = lookup(SECRET_KEY_VAR).filter(|k| !k.is_empty());
        let port = lookup(PORT_VAR).unwrap_or_else(|| String::from(PORT));
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("{PORT_VAR} '{port}' is not a valid port: {e}"))?;
        let notifier = match lookup(NOTIFY_VAR) {
            Some(value) => value.parse()?,
            None => Notifier::Log,
        };

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            static_dir: PathBuf::from(static_dir),
            secret_key,
            port,
            notifier,
        })
    }
}
