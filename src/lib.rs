//! Catalog Client
//!
//! The concurrency-sensitive data layer of a client for a paginated REST
//! catalog (by default the PokeAPI `pokemon` resource).
//!
//! # Overview
//!
//! Two components do the heavy lifting:
//!
//! - **Paginated detail fetching**: a list page is requested, then one detail
//!   request per entry is fanned out with a cap on concurrency. Records come
//!   back in catalog order no matter which response arrives first, and a page
//!   either succeeds completely or fails with the first error.
//! - **Coalescing resource cache**: images are fetched by URL, at most one
//!   request per URL at a time, shared by every caller asking for it. Fetches
//!   can be cancelled without ever polluting the cache, and the cache holds a
//!   bounded number of entries with least-recently-used eviction.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use catalog_client::{ClientConfig, HttpFetcher, ImageCache, ImageDecoder, PageFetcher};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let pages = PageFetcher::new(&config)?;
//!
//! let batch = pages.fetch_page(0, config.page_size).await?;
//! println!("{} of {} items", batch.len(), batch.total_count);
//!
//! let transport = Arc::new(HttpFetcher::with_timeout(config.request_timeout())?);
//! let images = ImageCache::new(config.image_cache.capacity, transport, ImageDecoder);
//! if let Some(key) = batch.records[0].image_key() {
//!     let image = images.fetch(&key).await;
//!     println!("artwork loaded: {}", image.is_some());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`Transport`] / [`HttpFetcher`]: single GET with status validation
//! - [`decoder`]: list envelope and detail record decoding
//! - [`map_bounded`]: order-preserving concurrent map with a concurrency cap
//! - [`PageFetcher`]: list + details pipeline
//! - [`ResourceCache`] / [`ImageCache`]: coalescing LRU cache
//! - [`ClientMetrics`]: counters shared by both components
//!
//! # Configuration
//!
//! ```yaml
//! base_url: "https://pokeapi.co/api/v2"
//! resource_path: "pokemon"
//! page_size: 20
//! max_concurrent_detail_loads: 6
//! request_timeout_secs: 30
//! image_cache:
//!   capacity: 20
//! ```
//!
//! See [`ClientConfig`] for all options.

pub mod bounded_map;
pub mod config;
pub mod decoder;
pub mod error;
pub mod http_fetch;
pub mod image;
pub mod metrics;
pub mod models;
pub mod page_fetcher;
pub mod resource_cache;

// Re-export commonly used types
pub use bounded_map::map_bounded;
pub use config::{CacheConfig, ClientConfig};
pub use error::{FetchError, Result};
pub use http_fetch::{HttpFetcher, Transport};
pub use image::{Image, ImageCache, ImageDecoder, ImageFormat};
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use models::{CacheKey, DetailRecord, FetchBatch, ListEntry, ListPage};
pub use page_fetcher::{FetchStage, PageFetcher};
pub use resource_cache::{CacheStats, ResourceCache, ResourceDecoder};
