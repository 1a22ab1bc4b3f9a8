use clap::Parser;
use hbnb_storage::cli::{commands, Cli};
use hbnb_storage::infrastructure::logging;
use hbnb_storage::{AppConfig, StorageContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    let context = StorageContext::bootstrap(&config).await?;
    commands::run(&context, cli.command).await
}
