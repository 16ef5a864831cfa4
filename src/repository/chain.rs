//! Lookup of the raw resource committed for a top-level label.
//!
//! The chain sync itself lives outside this process; the resolver only
//! needs a way to ask "what bytes are committed for this name". The
//! static implementation serves a fixed table from the configuration
//! file, which is plenty for development and for air-gapped setups.

use std::collections::HashMap;
use std::io::Result;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
    /// Resource bytes per top-level label, hex encoded. Keys are bare
    /// label names without the trailing dot.
    #[serde(default)]
    pub records: HashMap<String, String>,
}

impl Config {
    pub fn build(self) -> Result<StaticChainService> {
        StaticChainService::new(self)
    }
}

#[async_trait::async_trait]
pub trait ChainService {
    /// Raw resource bytes for a top-level label, `None` when the name
    /// has no committed resource.
    async fn resource(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

pub struct StaticChainService {
    records: HashMap<String, Vec<u8>>,
}

impl StaticChainService {
    fn new(config: Config) -> Result<Self> {
        let mut records = HashMap::with_capacity(config.records.len());
        for (name, hex) in config.records {
            let data = base16ct::mixed::decode_vec(hex.trim()).map_err(|error| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("resource for {name:?} is not valid hex: {error}"),
                )
            })?;
            records.insert(name.to_ascii_lowercase(), data);
        }
        Ok(Self { records })
    }
}

#[async_trait::async_trait]
impl ChainService for StaticChainService {
    #[tracing::instrument(skip(self))]
    async fn resource(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.get(name).cloned())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockChainService {
    inner: HashMap<&'static str, Vec<u8>>,
}

#[cfg(test)]
impl MockChainService {
    pub fn with_resource(mut self, name: &'static str, data: Vec<u8>) -> Self {
        self.inner.insert(name, data);
        self
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ChainService for MockChainService {
    async fn resource(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChainService, Config};

    #[tokio::test]
    async fn should_serve_configured_resources() {
        let config = Config {
            records: [("alice".to_string(), "0001c0000201".to_string())].into(),
        };
        let service = config.build().unwrap();

        let found = service.resource("alice").await.unwrap().unwrap();
        assert_eq!(found, vec![0x00, 0x01, 0xc0, 0x00, 0x02, 0x01]);
        assert!(service.resource("bob").await.unwrap().is_none());
    }

    #[test]
    fn should_reject_invalid_hex() {
        let config = Config {
            records: [("alice".to_string(), "zz".to_string())].into(),
        };
        assert!(config.build().is_err());
    }
}
