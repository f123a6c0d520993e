//! Scrape a URL from the command line and print the result as JSON
//!
//! Usage: cargo run --example scrape_url -- <url> [auto|static|js]

use anyhow::{Context, Result};
use tracing::info;

use pagesift::{Engine, FetchMode, load_yaml_config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: scrape_url <url> [auto|static|js]")?;
    let mode = match args.next().as_deref() {
        None | Some("auto") => FetchMode::Auto,
        Some("static") => FetchMode::Static,
        Some("js") => FetchMode::Js,
        Some(other) => anyhow::bail!("unknown mode '{other}', expected auto|static|js"),
    };

    let config = load_yaml_config()?;
    let engine = Engine::new(config).context("Failed to build engine")?;

    info!("Scraping {url}");
    let doc = engine.scrape(&url, mode, None).await;

    info!(
        sections = doc.sections.len(),
        mode = ?doc.meta.retrieval_mode,
        errors = doc.errors.len(),
        "Scrape complete"
    );
    println!("{}", serde_json::to_string_pretty(&doc)?);

    engine.shutdown().await;
    Ok(())
}
