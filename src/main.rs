//! Crawler render proxy.
//!
//! Serves pre-rendered pages to search engine and link-preview crawlers and
//! forwards every other request to the origin.
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                RENDER PROXY                  │
//!   Client Request        │  ┌──────────┐   bot?   ┌──────────────────┐  │      Render
//!   ──────────────────────┼─▶│ crawler  │────yes──▶│ render backend   │──┼────▶ Service
//!                         │  │classifier│          │ (deadline)       │  │
//!                         │  └────┬─────┘          └────────┬─────────┘  │
//!                         │       │ no                      │ relay      │
//!                         │       ▼                         ▼            │
//!   Client Response       │  ┌──────────┐          ┌──────────────────┐  │
//!   ◀─────────────────────┼──│ upstream │          │ status/headers/  │  │
//!                         │  │ forward  │──────────▶ body stream      │  │──────▶ Origin
//!                         │  └──────────┘          └──────────────────┘  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use render_proxy::config::{load_config, ProxyConfig};
use render_proxy::lifecycle::startup;
use render_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "render-proxy")]
#[command(about = "Serve pre-rendered pages to crawlers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!("render-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;
    Ok(())
}
