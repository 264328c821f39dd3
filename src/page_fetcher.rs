//! Paginated detail fetcher
//!
//! A page fetch requests one list page, fans out one detail request per list
//! entry through [`map_bounded`], and hands back the decoded records in the
//! order the list returned them. Any failure along the way fails the page; a
//! partially assembled batch is never returned.

use crate::bounded_map::map_bounded;
use crate::config::ClientConfig;
use crate::decoder::{decode_detail, decode_list};
use crate::error::{FetchError, Result};
use crate::http_fetch::{HttpFetcher, Transport};
use crate::metrics::ClientMetrics;
use crate::models::{DetailRecord, FetchBatch, ListEntry, ListPage};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Stage of a single page fetch, reported in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    RequestingList,
    RequestingDetails,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStage::RequestingList => "requesting-list",
            FetchStage::RequestingDetails => "requesting-details",
            FetchStage::Assembling => "assembling",
            FetchStage::Done => "done",
            FetchStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Fetches catalog pages together with the details of every entry
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    base_url: Url,
    resource_path: String,
    max_concurrent_detail_loads: usize,
    metrics: Arc<ClientMetrics>,
}

impl PageFetcher {
    /// Create a PageFetcher that talks HTTP using the configured timeout
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = HttpFetcher::with_timeout(config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a PageFetcher on top of an arbitrary transport
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            FetchError::InvalidRequest(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;

        Ok(PageFetcher {
            transport,
            base_url,
            resource_path: config.resource_path.trim_matches('/').to_string(),
            max_concurrent_detail_loads: config.max_concurrent_detail_loads,
            metrics: Arc::new(ClientMetrics::new()),
        })
    }

    /// Report into a shared metrics collector instead of a private one
    pub fn with_metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    /// Build the list URL for a page
    ///
    /// The result is `{base}/{resource}?offset={offset}&limit={page_size}`.
    pub fn page_url(&self, offset: usize, page_size: usize) -> Result<Url> {
        if page_size == 0 {
            return Err(FetchError::InvalidRequest(
                "page_size must be greater than 0".to_string(),
            ));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::InvalidRequest(format!(
                    "Base URL '{}' cannot carry a resource path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(self.resource_path.split('/'));

        url.query_pairs_mut()
            .clear()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &page_size.to_string());

        Ok(url)
    }

    /// Fetch a page using the configured detail concurrency
    pub async fn fetch_page(&self, offset: usize, page_size: usize) -> Result<FetchBatch> {
        self.fetch_page_with_concurrency(offset, page_size, self.max_concurrent_detail_loads)
            .await
    }

    /// Fetch a page with at most `max_concurrent_detail_loads` detail requests in flight
    ///
    /// # Returns
    /// * `Ok(FetchBatch)` with one record per list entry, in list order
    /// * `Err(FetchError)` for the first failure of the list request or of
    ///   any detail request
    pub async fn fetch_page_with_concurrency(
        &self,
        offset: usize,
        page_size: usize,
        max_concurrent_detail_loads: usize,
    ) -> Result<FetchBatch> {
        if max_concurrent_detail_loads == 0 {
            return Err(FetchError::InvalidRequest(
                "max_concurrent_detail_loads must be greater than 0".to_string(),
            ));
        }

        let started = Instant::now();
        let result = self
            .run_page(offset, page_size, max_concurrent_detail_loads)
            .await;
        let elapsed = started.elapsed();
        self.metrics.record_page(result.is_ok(), elapsed);

        match &result {
            Ok(batch) => info!(
                "Fetched page offset={} limit={}: {} records in {:?}",
                offset,
                page_size,
                batch.len(),
                elapsed
            ),
            Err(e) => warn!(
                "Page fetch offset={} limit={} stage={}: {}",
                offset,
                page_size,
                FetchStage::Failed,
                e
            ),
        }

        result
    }

    async fn run_page(&self, offset: usize, page_size: usize, concurrency: usize) -> Result<FetchBatch> {
        debug!("Page offset={} stage={}", offset, FetchStage::RequestingList);
        let page = self.fetch_list(offset, page_size).await?;

        debug!(
            "Page offset={} stage={} entries={} concurrency={}",
            offset,
            FetchStage::RequestingDetails,
            page.entries.len(),
            concurrency
        );
        let expected = page.entries.len();
        let transport = self.transport.clone();
        let metrics = self.metrics.clone();
        let records = map_bounded(page.entries, concurrency, move |entry| {
            let transport = transport.clone();
            let metrics = metrics.clone();
            async move { load_detail(transport.as_ref(), &metrics, &entry).await }
        })
        .await?;

        debug!("Page offset={} stage={}", offset, FetchStage::Assembling);
        debug_assert_eq!(records.len(), expected);

        debug!("Page offset={} stage={}", offset, FetchStage::Done);
        Ok(FetchBatch {
            total_count: page.total_count,
            has_more: page.next.is_some(),
            records,
        })
    }

    /// Request and decode a list page without fetching details
    pub async fn fetch_list(&self, offset: usize, page_size: usize) -> Result<ListPage> {
        let url = self.page_url(offset, page_size)?;
        let body = self.transport.get(&url).await?;
        decode_list(&body)
    }

    /// Request and decode the detail record behind a single list entry
    pub async fn fetch_detail(&self, entry: &ListEntry) -> Result<DetailRecord> {
        load_detail(self.transport.as_ref(), &self.metrics, entry).await
    }
}

async fn load_detail(
    transport: &dyn Transport,
    metrics: &ClientMetrics,
    entry: &ListEntry,
) -> Result<DetailRecord> {
    let result = match transport.get(&entry.detail_ref).await {
        Ok(body) => decode_detail(&body),
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        warn!("Detail fetch failed for {} ({}): {}", entry.name, entry.detail_ref, e);
    }
    metrics.record_detail(result.is_ok());
    result
}
