//! Catalog client command line
//!
//! Loads configuration, fetches one catalog page with all of its details and
//! warms the image cache for the records on it.

use anyhow::Context;
use catalog_client::{ClientConfig, ClientMetrics, HttpFetcher, ImageCache, ImageDecoder, PageFetcher};
use futures::future::join_all;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main entry point
///
/// # Usage
/// ```bash
/// # Default config (catalog_client.yaml, built-in defaults if absent), first page
/// cargo run
///
/// # Custom config, page starting at offset 40
/// cargo run -- /path/to/config.yaml 40
/// ```
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "catalog_client.yaml".to_string());
    let offset: usize = match env::args().nth(2) {
        Some(raw) => raw.parse().with_context(|| format!("invalid offset '{}'", raw))?,
        None => 0,
    };

    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration from: {}", config_path);
        ClientConfig::from_file(&config_path)?
    } else {
        warn!("{} not found, using built-in defaults", config_path);
        ClientConfig::default()
    };

    info!("  - Base URL: {}/{}", config.base_url, config.resource_path);
    info!("  - Page size: {}", config.page_size);
    info!("  - Max concurrent detail loads: {}", config.max_concurrent_detail_loads);
    info!("  - Image cache capacity: {}", config.image_cache.capacity);

    let metrics = Arc::new(ClientMetrics::new());
    let transport = Arc::new(HttpFetcher::with_timeout(config.request_timeout())?);
    let pages = PageFetcher::with_transport(&config, transport.clone())?.with_metrics(metrics.clone());
    let images = ImageCache::from_config(&config.image_cache, transport, ImageDecoder, metrics.clone());

    let batch = pages
        .fetch_page(offset, config.page_size)
        .await
        .with_context(|| format!("failed to fetch page at offset {}", offset))?;

    info!(
        "Page at offset {}: {} records of {} (more: {})",
        offset,
        batch.len(),
        batch.total_count,
        batch.has_more
    );
    for record in &batch {
        info!(
            "  #{:<5} {:<20} weight={} height={}",
            record.id, record.name, record.weight, record.height
        );
    }

    let keys: Vec<_> = batch.iter().filter_map(|r| r.image_key()).collect();
    let loaded = join_all(keys.iter().map(|key| images.fetch(key))).await;
    let ok = loaded.iter().filter(|image| image.is_some()).count();
    info!("Loaded {} of {} images", ok, keys.len());

    let cache = images.stats();
    let stats = metrics.get_stats();
    info!(
        "Cache: {}/{} entries, {} bytes; hit rate {:.1}%, {} evictions",
        cache.entries,
        cache.capacity,
        cache.total_cost,
        stats.cache_hit_rate(),
        stats.evictions
    );
    info!(
        "Details: {} requests, {:.1}% failed; avg page {:.1} ms",
        stats.detail_requests,
        stats.detail_failure_rate(),
        stats.avg_page_duration_ms()
    );

    Ok(())
}
