//! Main application entry point
//!
//! Usage: `qstate [settings.json] [start-url]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use qs_core::{AppContext, Settings};

mod demo;

const DEFAULT_START_URL: &str = "https://shop.example.com/admin/products?tab=all";

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let settings_path = args.next().map(PathBuf::from);
    let start_url = args.next().unwrap_or_else(|| DEFAULT_START_URL.to_string());

    let settings = Settings::load_or_default(settings_path.as_deref())
        .context("Failed to load settings")?;
    let ctx = AppContext::bootstrap(settings);

    info!(url = %start_url, "Starting query-state demo");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime.block_on(demo::run(ctx, &start_url))?;

    Ok(())
}
