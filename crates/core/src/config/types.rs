use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub picker: PickerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8080
}

/// Where managed documents and the document cache live
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    #[serde(default = "default_cache_file_name")]
    pub cache_file_name: String,
}

impl StorageConfig {
    /// Full path of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.documents_dir.join(&self.cache_file_name)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            cache_file_name: default_cache_file_name(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("documents")
}

fn default_cache_file_name() -> String {
    crate::cache::CACHE_FILE_NAME.to_string()
}

/// Constraints applied to picked source files
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PickerConfig {
    #[serde(default = "default_allowed_extension")]
    pub allowed_extension: String,
    #[serde(default = "default_allow_multiple")]
    pub allow_multiple: bool,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            allowed_extension: default_allowed_extension(),
            allow_multiple: default_allow_multiple(),
        }
    }
}

fn default_allowed_extension() -> String {
    "shapr".to_string()
}

fn default_allow_multiple() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}
