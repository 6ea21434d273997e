//! On-disk service configuration loading.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::ServiceConfig;

/// The full on-disk configuration: where to listen, plus the
/// [`ServiceConfig`] consumed by the bucket engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Address the gRPC facade listens on.
    pub bind_addr: SocketAddr,
    /// Bucket/namespace configuration.
    #[serde(flatten)]
    pub service: ServiceConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7070)),
            service: ServiceConfig::default(),
        }
    }
}

impl FileConfig {
    /// Loads and validates configuration from `path`. Supports `.toml` and
    /// `.json`, dispatching on the file extension.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: FileConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => anyhow::bail!("unsupported config file extension: {ext}"),
        };

        config
            .service
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

        Ok(config)
    }
}
