use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    #[command(about = "Print the connection setup SQL for a configuration file")]
    Render(RenderArgs),
    #[command(about = "Print the database name inferred from a configuration file")]
    Database(ConfigArgs),
    #[command(about = "Print the crate version")]
    Version,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Disable ANSI colors in log output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Connection configuration file (JSON, or YAML with a .yml/.yaml extension)
    #[arg(long = "config", short = 'c', env = "DUCKDB_CREDENTIALS_CONFIG")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Query the configured credential provider and merge its values into the settings
    #[arg(long)]
    pub resolve_credentials: bool,
}
