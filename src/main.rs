use anyhow::Result;
use clap::Parser;
use tokio::runtime::Builder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duckdb_credentials::Configuration;
use duckdb_credentials::constants::FULL_VERSION;
use duckdb_credentials::interfaces::{Cli, CliCommand, ConfigArgs, RenderArgs};
use duckdb_credentials::sanitize::SanitizingMakeWriter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duckdb_credentials=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(SanitizingMakeWriter)
                .with_ansi(!cli.no_color),
        )
        .init();

    match cli.command {
        CliCommand::Render(args) => render(args),
        CliCommand::Database(args) => database(args),
        CliCommand::Version => {
            println!("duckdb-credentials {}", FULL_VERSION);
            Ok(())
        }
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let config = Configuration::from_path(&args.config.config)?;

    let settings = if args.resolve_credentials {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(config.load_settings())?
    }
    else {
        if config.use_credential_provider.is_some() {
            tracing::warn!("A credential provider is configured; pass --resolve-credentials to query it");
        }
        config.settings.clone()
    };

    for statement in config.setup_statements(&settings) {
        println!("{};", statement);
    }

    Ok(())
}

fn database(args: ConfigArgs) -> Result<()> {
    let config = Configuration::from_path(&args.config)?;
    println!("{}", config.database);
    Ok(())
}
