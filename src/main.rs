use anyhow::Result;
use clap::Parser;
use request_validator::cli::{execute_validate, exit_code, Cli};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(error) = execute_validate(cli.command).await {
        let code = exit_code(&error);
        error!(exit_code = code, "validation failed: {error:#}");
        eprintln!("❌ エラー: {error:#}");
        std::process::exit(code);
    }

    Ok(())
}
