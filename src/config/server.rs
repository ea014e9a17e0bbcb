use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Optional settings file looked up inside the data directory.
pub const CONFIG_FILE_NAME: &str = "halodb.toml";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Requests allowed per client IP each minute. Zero disables limiting.
    pub rate_limit_per_minute: u32,
}

/// Contents of `halodb.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rate_limit_per_minute: Option<u32>,
}

impl FileConfig {
    /// Reads `halodb.toml` from `data_dir`. A missing file is an empty config.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

impl ServerConfig {
    /// Builds the configuration for `data_dir`. Explicit values win over the
    /// settings file, which wins over the defaults.
    pub fn resolve(
        data_dir: PathBuf,
        host: Option<String>,
        port: Option<u16>,
        rate_limit_per_minute: Option<u32>,
    ) -> Result<Self> {
        let file = FileConfig::load(&data_dir)?;
        let defaults = Self::default();

        Ok(Self {
            host: host.or(file.host).unwrap_or(defaults.host),
            port: port.or(file.port).unwrap_or(defaults.port),
            rate_limit_per_minute: rate_limit_per_minute
                .or(file.rate_limit_per_minute)
                .unwrap_or(defaults.rate_limit_per_minute),
            data_dir,
        })
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("halodb.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            rate_limit_per_minute: 100,
        }
    }
}
