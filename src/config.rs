use serde::Deserialize;

use crate::Error;

/// Settings for the `server` binary, layered from an optional TOML file and
/// `BITCASKD_`-prefixed environment variables on top of the built-in
/// defaults below.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db")]
    pub db: String,
    #[serde(default)]
    pub merge_on_start: bool,
}

fn default_port() -> u16 {
    9000
}

fn default_db() -> String {
    "./db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db: default_db(),
            merge_on_start: false,
        }
    }
}

impl ServerConfig {
    /// Load settings from `path` (if it exists) overlaid with
    /// `BITCASKD_*` environment variables, falling back to defaults for
    /// anything neither source sets.
    pub fn load(path: &str) -> Result<Self, Error> {
        let settings = config::Config::builder()
            .set_default("port", default_port() as i64)?
            .set_default("db", default_db())?
            .set_default("merge_on_start", false)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("BITCASKD"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
