//! Service configuration.
//!
//! Read from a TOML file whose path defaults to `config.toml` and can be
//! overridden with `PIXELSMITH_CONFIG`. Every key has a default, so the file
//! itself is optional. `PORT` replaces the port of `app.listen`.
//!
//! ```toml
//! [app]
//! listen = "0.0.0.0:5000"
//! max_upload_bytes = 10485760
//! max_dimension = 10000
//! request_timeout_secs = 60
//! default_format = "jpeg"
//! default_quality = 80
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pixelsmith_core::pipeline::{clamp_quality, Limits, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_UPLOAD_BYTES};
use pixelsmith_core::OutputFormat;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "PIXELSMITH_CONFIG";
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: String,
    pub max_upload_bytes: usize,
    pub max_dimension: u32,
    pub request_timeout_secs: u64,
    pub default_format: OutputFormat,
    pub default_quality: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            request_timeout_secs: 60,
            default_format: OutputFormat::Jpeg,
            default_quality: 80,
        }
    }
}

impl Config {
    pub fn limits(&self) -> Limits {
        Limits {
            max_upload_bytes: self.app.max_upload_bytes,
            max_dimension: self.app.max_dimension,
        }
    }

    /// Default quality, clamped into `1..=100`.
    pub fn default_quality(&self) -> u8 {
        clamp_quality(self.app.default_quality as i64)
    }

    /// Replace the port of `app.listen`.
    pub fn override_port(&mut self, port: &str) -> Result<()> {
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("invalid {} value {:?}", PORT_ENV, port))?;
        let host = match self.app.listen.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.app.listen.as_str(),
        };
        self.app.listen = format!("{}:{}", host, port);
        Ok(())
    }
}

/// Parse a config file.
pub fn parse(config_path: impl AsRef<Path>) -> Result<Config> {
    let config_path = config_path.as_ref();
    let toml_str = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config file {}", config_path.display()))?;
    let cfg: Config = toml::from_str(&toml_str)
        .with_context(|| format!("failed to deserialize config {}", config_path.display()))?;

    if cfg.app.max_upload_bytes == 0 {
        bail!("app.max_upload_bytes must be positive");
    }
    if cfg.app.max_dimension == 0 {
        bail!("app.max_dimension must be positive");
    }
    Ok(cfg)
}

/// Load the config from the environment-selected path and apply `PORT`.
///
/// A missing file at the default path yields the defaults; a missing file at
/// an explicitly configured path is an error.
pub fn load() -> Result<Config> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let port = std::env::var(PORT_ENV).ok();
    load_from(explicit.as_deref(), port.as_deref())
}

fn load_from(explicit_path: Option<&str>, port: Option<&str>) -> Result<Config> {
    let mut cfg = match explicit_path {
        Some(path) => parse(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => parse(DEFAULT_CONFIG_PATH)?,
        None => Config::default(),
    };

    if let Some(port) = port {
        cfg.override_port(port)?;
    }
    Ok(cfg)
}
