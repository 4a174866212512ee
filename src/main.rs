mod app;
mod config;
mod models;
mod providers;
mod services;
mod ui;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use app::App;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(model = %config.model, base_url = %config.base_url, "Starting {}", config::APP_NAME);

    let app = App::init(config).await?;
    ui::window::run(app).await
}
