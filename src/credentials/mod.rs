//! Connection configuration for an embedded DuckDB database.
//!
//! [`Configuration::from_mapping`] turns an untyped mapping (parsed from JSON
//! or YAML) into validated secrets and attachments, infers the database name,
//! and renders the SQL that prepares a connection.

mod attachment;
mod provider;
mod secret;

pub use attachment::Attachment;
pub use provider::{
    AmbientCredentials, AwsCredentialProvider, CredentialProvider, CredentialProviderKind,
    resolve_settings,
};
pub use secret::{Secret, SecretType};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

use crate::constants::{
    DEFAULT_EXTERNAL_ROOT, DEFAULT_SCHEMA, MEMORY_DATABASE, MEMORY_DB_PATH, MOTHERDUCK_DEFAULT_DATABASE,
    MOTHERDUCK_SCHEMES, REMOTE_DEFAULT_DATABASE,
};
use crate::interfaces::{Error, Extension, PluginConfig, RemoteConfig, Result};

const KNOWN_KEYS: &[&str] = &[
    "type",
    "database",
    "schema",
    "path",
    "remote",
    "settings",
    "secrets",
    "attach",
    "extensions",
    "plugins",
    "external_root",
    "threads",
    "use_credential_provider",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub database: String,
    pub schema: String,
    pub path: Option<String>,
    pub remote: Option<RemoteConfig>,
    pub settings: Map<String, Value>,
    pub extensions: Vec<Extension>,
    pub secrets: Vec<Secret>,
    pub attach: Vec<Attachment>,
    pub plugins: Vec<PluginConfig>,
    pub external_root: String,
    pub threads: Option<u32>,
    pub use_credential_provider: Option<CredentialProviderKind>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database: MEMORY_DATABASE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            path: None,
            remote: None,
            settings: Map::new(),
            extensions: Vec::new(),
            secrets: Vec::new(),
            attach: Vec::new(),
            plugins: Vec::new(),
            external_root: DEFAULT_EXTERNAL_ROOT.to_string(),
            threads: None,
            use_credential_provider: None,
        }
    }
}

impl Configuration {
    /// Builds a configuration from a raw mapping. Either every secret and
    /// attachment validates, or nothing is returned.
    pub fn from_mapping(raw: &Value) -> Result<Self> {
        let raw = raw
            .as_object()
            .ok_or_else(|| Error::InvalidConfiguration("configuration must be a mapping".to_string()))?;

        for key in raw.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!("Ignoring unrecognized configuration key '{}'", key);
            }
        }

        let path = optional_string(raw, "path")?;
        let database = optional_string(raw, "database")?;
        if database.as_deref() == Some("") {
            return Err(Error::InvalidConfiguration("'database' must not be empty".to_string()));
        }

        let remote: Option<RemoteConfig> = optional_typed(raw, "remote")?;

        let settings = match raw.get("settings") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(Error::InvalidConfiguration("'settings' must be a mapping".to_string())),
        };

        let secrets = entries(raw, "secrets")?
            .into_iter()
            .map(Secret::from_mapping)
            .collect::<Result<Vec<_>>>()?;

        let attach = entries(raw, "attach")?
            .into_iter()
            .map(Attachment::from_mapping)
            .collect::<Result<Vec<_>>>()?;

        let extensions: Vec<Extension> = optional_typed(raw, "extensions")?.unwrap_or_default();
        let plugins: Vec<PluginConfig> = optional_typed(raw, "plugins")?.unwrap_or_default();

        let threads = match raw.get("threads") {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n > 0 => Some(n),
                _ => {
                    return Err(Error::InvalidConfiguration(
                        "'threads' must be a positive integer".to_string(),
                    ));
                }
            },
        };

        let use_credential_provider = optional_string(raw, "use_credential_provider")?
            .map(|s| s.parse::<CredentialProviderKind>())
            .transpose()?;

        let database = infer_database(database, path.as_deref(), remote.is_some(), &attach)?;

        let config = Configuration {
            database,
            schema: optional_string(raw, "schema")?.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            path,
            remote,
            settings,
            extensions,
            secrets,
            attach,
            plugins,
            external_root: optional_string(raw, "external_root")?
                .unwrap_or_else(|| DEFAULT_EXTERNAL_ROOT.to_string()),
            threads,
            use_credential_provider,
        };

        tracing::info!(
            database = %config.database,
            secrets = config.secrets.len(),
            attachments = config.attach.len(),
            "Loaded connection configuration"
        );

        Ok(config)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let raw: Value =
            serde_json::from_str(input).map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        Self::from_mapping(&raw)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let raw: Value =
            serde_yaml::from_str(input).map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        Self::from_mapping(&raw)
    }

    /// Reads a configuration file. `.yml` and `.yaml` files are parsed as YAML, anything else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
    }

    /// Returns the settings to apply to a new connection, merged with the
    /// configured credential provider's output when one is set.
    pub async fn load_settings(&self) -> Result<Map<String, Value>> {
        let provider = self.use_credential_provider.map(|kind| kind.provider());
        resolve_settings(&self.settings, provider.as_deref()).await
    }

    pub fn is_motherduck(&self) -> bool {
        self.path
            .as_deref()
            .and_then(url_scheme)
            .is_some_and(|scheme| MOTHERDUCK_SCHEMES.contains(&scheme))
    }

    /// The ordered statements that prepare a connection: extensions, then
    /// `settings`, then secrets, then attachments.
    pub fn setup_statements(&self, settings: &Map<String, Value>) -> Vec<String> {
        let mut statements: Vec<String> = self.extensions.iter().flat_map(Extension::to_sql).collect();

        for (key, value) in settings {
            match setting_literal(value) {
                Some(literal) => statements.push(format!("SET {} = {}", key, literal)),
                None => tracing::warn!("Skipping setting '{}' with unsupported value", key),
            }
        }

        statements.extend(self.secrets.iter().map(Secret::to_sql));
        statements.extend(self.attach.iter().map(Attachment::to_sql));

        for statement in &statements {
            tracing::debug!("Setup statement: {}", crate::sanitize::sanitize_credentials(statement));
        }

        statements
    }
}

/// Derives a database name from a `path`, the way a URL parser would see it.
///
/// `:memory:` maps to `memory`, `md:` connection strings without a name map
/// to `my_db`, and anything else uses the final path segment without its
/// extension.
pub fn database_from_path(path: &str) -> String {
    if path == MEMORY_DB_PATH {
        return MEMORY_DATABASE.to_string();
    }

    let scheme = url_scheme(path);
    let rest = match scheme {
        Some(scheme) => &path[scheme.len() + 1..],
        None => path,
    };
    let rest = rest.split(['?', '#']).next().unwrap_or("");

    // Skip the authority of `scheme://host/...` URLs.
    let url_path = match (scheme, rest.strip_prefix("//")) {
        (Some(_), Some(authority)) => authority.find('/').map_or("", |i| &authority[i..]),
        _ => rest,
    };

    let base = url_path.rsplit(['/', '\\']).next().unwrap_or("");
    let stem = match base.rfind('.') {
        Some(i) if i > 0 => &base[..i],
        _ => base,
    };

    if !stem.is_empty() {
        stem.to_string()
    }
    else if scheme.is_some_and(|s| MOTHERDUCK_SCHEMES.contains(&s)) {
        MOTHERDUCK_DEFAULT_DATABASE.to_string()
    }
    else {
        MEMORY_DATABASE.to_string()
    }
}

fn url_scheme(path: &str) -> Option<&str> {
    let (scheme, _) = path.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn infer_database(
    database: Option<String>,
    path: Option<&str>,
    remote: bool,
    attach: &[Attachment],
) -> Result<String> {
    let path_database = path.map(database_from_path);

    match database {
        Some(database) => {
            if let Some(path_database) = path_database {
                let attached = attach.iter().any(|a| a.alias() == Some(database.as_str()));
                if path_database != database && !remote && !attached {
                    return Err(Error::DatabaseMismatch {
                        database,
                        path_database,
                    });
                }
            }
            Ok(database)
        }
        None if remote => Ok(REMOTE_DEFAULT_DATABASE.to_string()),
        None => Ok(path_database.unwrap_or_else(|| MEMORY_DATABASE.to_string())),
    }
}

fn optional_string(raw: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::InvalidConfiguration(format!("'{}' must be a string", key))),
    }
}

fn optional_typed<T: DeserializeOwned>(raw: &Map<String, Value>, key: &str) -> Result<Option<T>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::InvalidConfiguration(format!("'{}': {}", key, e))),
    }
}

fn entries<'a>(raw: &'a Map<String, Value>, key: &str) -> Result<Vec<&'a Map<String, Value>>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| Error::InvalidConfiguration(format!("each '{}' entry must be a mapping", key)))
            })
            .collect(),
        Some(_) => Err(Error::InvalidConfiguration(format!("'{}' must be a list", key))),
    }
}

fn setting_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
