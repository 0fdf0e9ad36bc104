use serde::Deserialize;
use serde_json::{Map, Value};

use super::{SourceConfig, TargetConfig};
use crate::constants::{DEFAULT_COMPRESSION, DEFAULT_COMPRESSION_LEVEL};
use crate::interfaces::{Error, Result};

/// Connection options for an S3-compatible object store, derived from a
/// plugin configuration laid out as `config[region][storage]`.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStoreOptions {
    pub endpoint: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
}

impl std::fmt::Debug for ObjectStoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreOptions")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "[REDACTED]"))
            .field("region", &self.region)
            .finish()
    }
}

impl ObjectStoreOptions {
    pub fn from_plugin_config(config: &Map<String, Value>, region: &str, storage: &str) -> Result<Self> {
        let conn = config
            .get(region)
            .and_then(|r| r.get(storage))
            .and_then(Value::as_object)
            .ok_or_else(|| Error::missing_key(&format!("{}.{}", region, storage), "object store connection"))?;

        let text = |key: &str| -> Option<String> {
            conn.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };

        let host = text("host").ok_or_else(|| Error::missing_key("host", "object store connection"))?;
        let endpoint = match text("port") {
            Some(port) => format!("http://{}:{}", host, port),
            None => format!("http://{}", host),
        };

        Ok(Self {
            endpoint,
            access_key_id: text("access_key"),
            secret_access_key: text("secret_key"),
            region: text("s3_region").unwrap_or_default(),
        })
    }

    /// Resolves the `region` and `storage` named by a source.
    pub fn for_source(config: &Map<String, Value>, source: &SourceConfig) -> Result<Self> {
        let storage = source.require_str("storage", "load")?;
        let region = source.require_str("region", "load")?;
        Self::from_plugin_config(config, region, storage)
    }

    /// Resolves the `region` and `storage` named by a target.
    pub fn for_target(config: &Map<String, Value>, target: &TargetConfig) -> Result<Self> {
        let storage = target.require_str("storage", "store")?;
        let region = target.require_str("region", "store")?;
        Self::from_plugin_config(config, region, storage)
    }

    /// The key/value form handed to object-store clients.
    pub fn to_map(&self) -> Vec<(&'static str, String)> {
        let mut options = vec![("aws_endpoint", self.endpoint.clone())];
        if let Some(key) = &self.access_key_id {
            options.push(("aws_access_key_id", key.clone()));
        }
        if let Some(secret) = &self.secret_access_key {
            options.push(("aws_secret_access_key", secret.clone()));
        }
        options.push(("scheme", "http".to_string()));
        options.push(("aws_region", self.region.clone()));
        options.push(("AWS_ALLOW_HTTP", "True".to_string()));
        options.push(("AWS_S3_ALLOW_UNSAFE_RENAME", "True".to_string()));
        options.push(("AWS_STORAGE_ALLOW_HTTP", "True".to_string()));
        options
    }
}

/// `s3://<bucket>/<dataset_name>` for a target; both keys are required.
pub fn dataset_uri(target: &TargetConfig) -> Result<String> {
    let bucket = target.require_str("bucket", "store")?;
    let dataset_name = target.require_str("dataset_name", "store")?;
    Ok(format!("s3://{}/{}", bucket, dataset_name))
}

/// Compression settings for written files. Passed explicitly to each writer.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WriterProperties {
    pub compression: String,
    pub compression_level: u32,
}

impl Default for WriterProperties {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION.to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl WriterProperties {
    /// Reads overrides from the `writer_properties` entry of a plugin config.
    pub fn from_plugin_config(config: &Map<String, Value>) -> Result<Self> {
        match config.get("writer_properties") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::InvalidConfiguration(format!("'writer_properties': {}", e))),
        }
    }

    /// Options clause for a `COPY ... TO` statement.
    pub fn to_copy_options(&self) -> String {
        format!(
            "COMPRESSION {}, COMPRESSION_LEVEL {}",
            self.compression, self.compression_level
        )
    }
}
