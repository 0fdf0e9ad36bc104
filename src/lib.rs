pub mod constants;
pub mod credentials;
pub mod interfaces;
pub mod plugins;
pub mod sanitize;

pub use credentials::{
    Attachment, Configuration, CredentialProvider, CredentialProviderKind, Secret, SecretType,
    database_from_path, resolve_settings,
};
pub use interfaces::{Error, ErrorKind, Result};
pub use plugins::{Plugin, PluginRegistry, SourceConfig, TargetConfig};
