use clap::Parser;
use localrag_server::cli::{self, Cli};
use localrag_server::{Settings, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    telemetry::init(settings.log_format)?;

    cli::run(cli, settings).await
}
