mod cli;
mod config;
mod error;

pub use cli::{Cli, CliCommand, ConfigArgs, RenderArgs};
pub use config::{Extension, PluginConfig, RemoteConfig};
pub use error::{Error, ErrorKind, Result};
