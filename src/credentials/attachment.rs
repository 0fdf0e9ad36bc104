use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::interfaces::{Error, Result};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAttachment {
    path: String,
    alias: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    read_only: bool,
    #[serde(rename = "type")]
    db_type: Option<String>,
}

/// Accepts `true`/`false`, integers (non-zero is true) and `null`.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => false,
    })
}

/// An external database made available on the connection through `ATTACH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    path: String,
    alias: Option<String>,
    read_only: bool,
    db_type: Option<String>,
}

impl Attachment {
    pub fn new(
        path: impl Into<String>,
        alias: Option<String>,
        read_only: bool,
        db_type: Option<String>,
    ) -> Result<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(Error::EmptyAttachmentPath);
        }

        Ok(Self {
            path,
            alias,
            read_only,
            db_type,
        })
    }

    pub fn from_mapping(raw: &Map<String, Value>) -> Result<Self> {
        let raw: RawAttachment =
            serde_json::from_value(Value::Object(raw.clone())).map_err(Error::InvalidAttachment)?;
        Attachment::new(raw.path, raw.alias, raw.read_only, raw.db_type)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn db_type(&self) -> Option<&str> {
        self.db_type.as_deref()
    }

    pub fn to_sql(&self) -> String {
        let mut query = format!("ATTACH '{}'", self.path);

        if let Some(alias) = &self.alias {
            query.push_str(" AS ");
            query.push_str(alias);
        }

        let mut options: Vec<String> = Vec::new();
        if let Some(db_type) = &self.db_type {
            options.push(format!("TYPE {}", db_type));
        }
        if self.read_only {
            options.push("READ_ONLY".to_string());
        }
        if !options.is_empty() {
            query.push_str(&format!(" ({})", options.join(", ")));
        }

        query
    }
}
