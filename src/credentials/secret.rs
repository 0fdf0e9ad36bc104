use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::constants::{CERTIFICATE_SUFFIX, SENSITIVE_FIELDS};
use crate::interfaces::{Error, Result};

const S3_FIELDS: &[&str] = &[
    "key_id",
    "secret",
    "region",
    "session_token",
    "endpoint",
    "url_style",
    "use_ssl",
    "provider",
    "scope",
];

const GCS_FIELDS: &[&str] = &[
    "key_id",
    "secret",
    "region",
    "endpoint",
    "url_style",
    "use_ssl",
    "provider",
    "scope",
];

const R2_FIELDS: &[&str] = &[
    "key_id",
    "secret",
    "region",
    "account_id",
    "endpoint",
    "url_style",
    "use_ssl",
    "provider",
    "scope",
];

// Emission order for AZURE secrets. Doubles as the allow-list.
const AZURE_FIELDS: &[&str] = &[
    "provider",
    "connection_string",
    "account_name",
    "tenant_id",
    "client_id",
    "client_secret",
    "client_certificate_path",
];

const HUGGINGFACE_FIELDS: &[&str] = &["token", "provider"];

const HTTP_FIELDS: &[&str] = &[
    "bearer_token",
    "http_proxy",
    "http_proxy_username",
    "http_proxy_password",
];

const POSTGRES_FIELDS: &[&str] = &["host", "port", "user", "password", "database"];

const MYSQL_FIELDS: &[&str] = &["host", "port", "user", "password", "database", "ssl_mode"];

/// Kinds of secret the engine's secret manager understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretType {
    S3,
    Gcs,
    R2,
    Azure,
    Huggingface,
    Http,
    Postgres,
    Mysql,
}

impl SecretType {
    pub const ALL: [SecretType; 8] = [
        SecretType::S3,
        SecretType::Gcs,
        SecretType::R2,
        SecretType::Azure,
        SecretType::Huggingface,
        SecretType::Http,
        SecretType::Postgres,
        SecretType::Mysql,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SecretType::S3 => "S3",
            SecretType::Gcs => "GCS",
            SecretType::R2 => "R2",
            SecretType::Azure => "AZURE",
            SecretType::Huggingface => "HUGGINGFACE",
            SecretType::Http => "HTTP",
            SecretType::Postgres => "POSTGRES",
            SecretType::Mysql => "MYSQL",
        }
    }

    pub fn allowed_fields(&self) -> &'static [&'static str] {
        match self {
            SecretType::S3 => S3_FIELDS,
            SecretType::Gcs => GCS_FIELDS,
            SecretType::R2 => R2_FIELDS,
            SecretType::Azure => AZURE_FIELDS,
            SecretType::Huggingface => HUGGINGFACE_FIELDS,
            SecretType::Http => HTTP_FIELDS,
            SecretType::Postgres => POSTGRES_FIELDS,
            SecretType::Mysql => MYSQL_FIELDS,
        }
    }

    pub fn allows(&self, field: &str) -> bool {
        self.allowed_fields().contains(&field)
    }

    /// Fixed emission order, or `None` when fields render in insertion order.
    fn emission_order(&self) -> Option<&'static [&'static str]> {
        match self {
            SecretType::Azure => Some(AZURE_FIELDS),
            SecretType::S3
            | SecretType::Gcs
            | SecretType::R2
            | SecretType::Huggingface
            | SecretType::Http
            | SecretType::Postgres
            | SecretType::Mysql => None,
        }
    }

    /// Fields whose value is upper-cased when rendered.
    fn upper_cased_fields(&self) -> &'static [&'static str] {
        match self {
            SecretType::Azure => &["provider"],
            _ => &[],
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SecretType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SecretType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedSecretType(s.to_string()))
    }
}

/// A credential bundle registered through `CREATE SECRET`.
///
/// Built once from configuration and never mutated. Every field key is
/// guaranteed to be in the allow-list of its [`SecretType`], so
/// [`Secret::to_sql`] cannot fail.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    secret_type: SecretType,
    name: String,
    fields: Vec<(String, String)>,
}

impl Secret {
    /// Builds a secret from already-stringified fields. An empty `name` means an unnamed secret.
    pub fn new<I, K, V>(secret_type: SecretType, name: impl Into<String>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut collected: Vec<(String, String)> = Vec::new();
        for (key, value) in fields {
            let key = key.into();
            if !secret_type.allows(&key) {
                return Err(Error::UnsupportedSecretField {
                    secret_type: secret_type.to_string(),
                    field: key,
                });
            }
            let value = value.into();
            match collected.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => collected.push((key, value)),
            }
        }

        let mut secret = Secret {
            secret_type,
            name: name.into(),
            fields: collected,
        };
        secret.normalize();
        Ok(secret)
    }

    /// Builds a secret from a raw configuration entry such as
    /// `{"type": "s3", "name": "", "key_id": "abc"}`.
    pub fn from_mapping(raw: &Map<String, Value>) -> Result<Self> {
        let secret_type = match raw.get("type") {
            None | Some(Value::Null) => return Err(Error::MissingSecretType),
            Some(Value::String(s)) => s.parse::<SecretType>()?,
            Some(other) => return Err(Error::UnsupportedSecretType(other.to_string())),
        };

        let name = match raw.get("name") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(Error::InvalidSecretValue {
                    field: "name".to_string(),
                });
            }
        };

        let mut fields = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            if key == "type" || key == "name" {
                continue;
            }
            if !secret_type.allows(key) {
                return Err(Error::UnsupportedSecretField {
                    secret_type: secret_type.to_string(),
                    field: key.clone(),
                });
            }
            if let Some(text) = scalar_text(key, value)? {
                fields.push((key.clone(), text));
            }
        }

        Secret::new(secret_type, name, fields)
    }

    fn normalize(&mut self) {
        if self.secret_type == SecretType::Azure
            && self
                .get("provider")
                .is_some_and(|p| p.eq_ignore_ascii_case("service_principal"))
        {
            if let Some((_, path)) = self
                .fields
                .iter_mut()
                .find(|(k, _)| k == "client_certificate_path")
            {
                if !path.ends_with(CERTIFICATE_SUFFIX) {
                    path.push_str(CERTIFICATE_SUFFIX);
                }
            }
        }
    }

    pub fn secret_type(&self) -> SecretType {
        self.secret_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in the order they are rendered.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let fields: Box<dyn Iterator<Item = (&str, &str)> + '_> = match self.secret_type.emission_order() {
            Some(order) => Box::new(
                order
                    .iter()
                    .filter_map(|field| self.get(field).map(|value| (*field, value))),
            ),
            None => Box::new(self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
        };
        fields
    }

    /// Renders the `CREATE SECRET` statement. Values are emitted verbatim.
    pub fn to_sql(&self) -> String {
        let header = if self.name.is_empty() {
            "CREATE SECRET (".to_string()
        }
        else {
            format!("CREATE OR REPLACE SECRET {} (", self.name)
        };

        let upper = self.secret_type.upper_cased_fields();
        let mut lines = vec![format!("    type {}", self.secret_type)];
        for (field, value) in self.fields() {
            if upper.contains(&field) {
                lines.push(format!("    {} {}", field, value.to_uppercase()));
            }
            else {
                lines.push(format!("    {} {}", field, value));
            }
        }

        format!("{}\n{}\n)", header, lines.join(",\n"))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<(&str, &str)> = self
            .fields()
            .map(|(k, v)| if SENSITIVE_FIELDS.contains(&k) { (k, "[REDACTED]") } else { (k, v) })
            .collect();
        f.debug_struct("Secret")
            .field("type", &self.secret_type)
            .field("name", &self.name)
            .field("fields", &fields)
            .finish()
    }
}

fn scalar_text(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(Error::InvalidSecretValue {
            field: field.to_string(),
        }),
    }
}
