mod app;
mod block_font;

use std::fs::{self, OpenOptions};

use anyhow::Result;
use bingo_core::{config, AppConfig, CardStore};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    let store = CardStore::new(&config.data_root)?;

    let mut app = app::BingoApp::new(config, store);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("bingotui.log");

    let env_filter = EnvFilter::from_default_env();

    // Stdout belongs to the TUI, so only a file layer is installed.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
