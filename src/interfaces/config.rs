use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// A DuckDB extension to install and load on connection setup.
///
/// Accepts either a bare name (`httpfs`) or a mapping with an optional
/// repository `source`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "ExtensionEntry")]
pub struct Extension {
    pub name: String,
    pub source: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtensionEntry {
    Name(String),
    Full { name: String, source: Option<String> },
}

impl From<ExtensionEntry> for Extension {
    fn from(entry: ExtensionEntry) -> Self {
        match entry {
            ExtensionEntry::Name(name) => Extension { name, source: None },
            ExtensionEntry::Full { name, source } => Extension { name, source },
        }
    }
}

impl Extension {
    pub fn to_sql(&self) -> Vec<String> {
        let install = match &self.source {
            Some(source) => format!("INSTALL {} FROM {}", self.name, source),
            None => format!("INSTALL {}", self.name),
        };
        vec![install, format!("LOAD {}", self.name)]
    }
}

/// Connection details for a remote DuckDB server.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A storage plugin to instantiate, keyed by `alias` (or `module` when no alias is given).
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub module: String,
    pub alias: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl PluginConfig {
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.module)
    }
}
