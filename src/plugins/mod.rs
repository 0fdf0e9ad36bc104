//! Contract for storage backends that load data into and store data out of
//! a DuckDB connection.
//!
//! Backends are external collaborators. This module only defines what they
//! receive and how they are looked up.

mod storage;

pub use storage::{ObjectStoreOptions, WriterProperties, dataset_uri};

use duckdb::arrow::record_batch::RecordBatch;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::interfaces::{Error, PluginConfig, Result};

/// Options attached to a source that is read through a plugin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub identifier: String,
    pub schema: String,
    pub database: String,
    pub meta: Map<String, Value>,
}

impl SourceConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str, operation: &str) -> Result<&str> {
        self.get_str(key).ok_or_else(|| Error::missing_key(key, operation))
    }
}

/// Where and how a model's result should be written by a plugin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetConfig {
    pub relation: String,
    pub location: Option<String>,
    pub config: Map<String, Value>,
}

impl TargetConfig {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn require_str(&self, key: &str, operation: &str) -> Result<&str> {
        self.get_str(key).ok_or_else(|| Error::missing_key(key, operation))
    }
}

/// A storage backend. `initialize` runs once with the plugin's own
/// configuration; `configure_connection` runs for every new connection.
pub trait Plugin: Send + Sync {
    fn initialize(&mut self, config: &Map<String, Value>) -> Result<()>;

    fn configure_connection(&self, _conn: &duckdb::Connection) -> Result<()> {
        Ok(())
    }

    fn load(&self, conn: &duckdb::Connection, source: &SourceConfig) -> Result<Vec<RecordBatch>>;

    fn store(&self, conn: &duckdb::Connection, target: &TargetConfig) -> Result<()>;

    fn default_materialization(&self) -> &str {
        "table"
    }
}

pub type PluginFactory = fn() -> Box<dyn Plugin>;

/// Builds and holds the plugins named by a configuration's `plugins` list.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
    plugins: HashMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(module.into(), factory);
    }

    /// Instantiates and initializes every configured plugin under its alias.
    ///
    /// Either every entry loads and replaces the current set, or nothing changes.
    pub fn load(&mut self, configs: &[PluginConfig]) -> Result<()> {
        let mut plugins: HashMap<String, Box<dyn Plugin>> = HashMap::with_capacity(configs.len());

        for config in configs {
            let alias = config.alias();
            if plugins.contains_key(alias) {
                return Err(Error::DuplicatePlugin(alias.to_string()));
            }

            let factory = self
                .factories
                .get(&config.module)
                .ok_or_else(|| Error::UnknownPlugin(config.module.clone()))?;

            let mut plugin = factory();
            plugin.initialize(&config.config)?;

            tracing::info!("Initialized plugin {} (module {})", alias, config.module);
            plugins.insert(alias.to_string(), plugin);
        }

        self.plugins = plugins;
        Ok(())
    }

    pub fn get(&self, alias: &str) -> Option<&dyn Plugin> {
        self.plugins.get(alias).map(|p| p.as_ref())
    }

    pub fn configure_connection(&self, conn: &duckdb::Connection) -> Result<()> {
        for plugin in self.plugins.values() {
            plugin.configure_connection(conn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::ErrorKind;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingPlugin {
        bucket: Option<String>,
    }

    impl Plugin for RecordingPlugin {
        fn initialize(&mut self, config: &Map<String, Value>) -> Result<()> {
            self.bucket = config.get("bucket").and_then(Value::as_str).map(str::to_string);
            Ok(())
        }

        fn load(&self, _conn: &duckdb::Connection, source: &SourceConfig) -> Result<Vec<RecordBatch>> {
            source.require_str("delta_table_path", "load")?;
            Ok(Vec::new())
        }

        fn store(&self, _conn: &duckdb::Connection, target: &TargetConfig) -> Result<()> {
            target.require_str("dataset_name", "store")?;
            Ok(())
        }

        fn default_materialization(&self) -> &str {
            if self.bucket.is_some() { "view" } else { "table" }
        }
    }

    fn recording() -> Box<dyn Plugin> {
        Box::new(RecordingPlugin::default())
    }

    fn plugin_config(value: Value) -> PluginConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_registry_loads_by_alias() {
        let mut registry = PluginRegistry::new();
        registry.register("recording", recording);
        registry
            .load(&[
                plugin_config(json!({"module": "recording", "alias": "lake", "config": {"bucket": "b"}})),
                plugin_config(json!({"module": "recording"})),
            ])
            .unwrap();

        assert_eq!(registry.get("lake").unwrap().default_materialization(), "view");
        assert_eq!(registry.get("recording").unwrap().default_materialization(), "table");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_unknown_module() {
        let mut registry = PluginRegistry::new();
        let err = registry.load(&[plugin_config(json!({"module": "nope"}))]).unwrap_err();
        assert!(matches!(err, Error::UnknownPlugin(ref m) if m == "nope"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register("recording", recording);
        let err = registry
            .load(&[
                plugin_config(json!({"module": "recording", "alias": "lake"})),
                plugin_config(json!({"module": "recording", "alias": "lake", "config": {"bucket": "b"}})),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePlugin(ref a) if a == "lake"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(registry.get("lake").is_none());
    }

    #[test]
    fn test_failed_load_keeps_previous_plugins() {
        let mut registry = PluginRegistry::new();
        registry.register("recording", recording);
        registry.load(&[plugin_config(json!({"module": "recording", "alias": "old"}))]).unwrap();

        let err = registry
            .load(&[
                plugin_config(json!({"module": "recording", "alias": "new"})),
                plugin_config(json!({"module": "nope"})),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownPlugin(_)));
        assert!(registry.get("new").is_none());
        assert!(registry.get("old").is_some());
    }

    #[test]
    fn test_load_and_store_require_keys() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let mut registry = PluginRegistry::new();
        registry.register("recording", recording);
        registry.load(&[plugin_config(json!({"module": "recording"}))]).unwrap();
        registry.configure_connection(&conn).unwrap();
        let plugin = registry.get("recording").unwrap();

        let err = plugin.load(&conn, &SourceConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredKey { ref key, .. } if key == "delta_table_path"));

        let mut source = SourceConfig::default();
        source.meta.insert("delta_table_path".to_string(), json!("s3://lake/t"));
        assert!(plugin.load(&conn, &source).unwrap().is_empty());

        let err = plugin.store(&conn, &TargetConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
