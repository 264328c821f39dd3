//! Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use catalog_client::{FetchError, Result, Transport};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const BASE: &str = "https://catalog.test/api/v2";

/// Smallest body the image decoder accepts
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

#[derive(Clone)]
struct Route {
    status: u16,
    body: Bytes,
    delay: Duration,
}

/// In-memory transport with per-URL status, body and latency
///
/// Tracks how many requests are running at once and the order in which
/// responses complete.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<HashMap<String, usize>>,
    completions: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &str, status: u16, body: impl Into<Bytes>, delay: Duration) {
        self.routes.lock().insert(
            url.to_string(),
            Route {
                status,
                body: body.into(),
                delay,
            },
        );
    }

    pub fn requests(&self, url: &str) -> usize {
        self.requests.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().values().sum()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> Vec<String> {
        self.completions.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        let key = url.as_str().to_string();
        *self.requests.lock().entry(key.clone()).or_insert(0) += 1;

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let route = self.routes.lock().get(&key).cloned();
        let route = route.unwrap_or(Route {
            status: 404,
            body: Bytes::new(),
            delay: Duration::ZERO,
        });
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completions.lock().push(key);

        match FetchError::from_http_status(route.status) {
            Some(err) => Err(err),
            None => Ok(route.body),
        }
    }
}

pub fn page_url(base: &str, offset: usize, limit: usize) -> String {
    format!("{}/pokemon?offset={}&limit={}", base, offset, limit)
}

pub fn detail_url(base: &str, id: u64) -> String {
    format!("{}/pokemon/{}/", base, id)
}

pub fn page_json(base: &str, ids: &[u64], next: Option<&str>) -> Vec<u8> {
    let results: Vec<_> = ids
        .iter()
        .map(|id| json!({ "name": format!("poke-{}", id), "url": detail_url(base, *id) }))
        .collect();
    json!({
        "count": 10000,
        "next": next,
        "previous": null,
        "results": results,
    })
    .to_string()
    .into_bytes()
}

pub fn detail_json(id: u64) -> Vec<u8> {
    json!({
        "id": id,
        "name": format!("poke-{}", id),
        "weight": 61,
        "height": 143,
        "sprites": {
            "other": {
                "official-artwork": {
                    "front_default": format!("https://images.test/artwork/{}.png", id)
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Route a list page and a detail response for each id
pub fn script_page(transport: &ScriptedTransport, offset: usize, ids: &[u64], delays: &[Duration]) {
    transport.route(
        &page_url(BASE, offset, ids.len()),
        200,
        page_json(BASE, ids, None),
        Duration::ZERO,
    );
    for (i, id) in ids.iter().enumerate() {
        let delay = delays.get(i).copied().unwrap_or(Duration::ZERO);
        transport.route(&detail_url(BASE, *id), 200, detail_json(*id), delay);
    }
}
