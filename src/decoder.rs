//! Decoding of list and detail payloads into domain records
//!
//! The wire structs mirror the JSON the catalog serves; they are converted to
//! the models in [`crate::models`] after URL fields have been validated.

use crate::error::{FetchError, Result};
use crate::models::{DetailRecord, ListEntry, ListPage};
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    count: u64,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    previous: Option<String>,
    results: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct DetailPayload {
    id: u64,
    name: String,
    weight: u32,
    height: u32,
    #[serde(default)]
    sprites: Sprites,
}

#[derive(Debug, Default, Deserialize)]
struct Sprites {
    #[serde(default)]
    other: OtherSprites,
}

#[derive(Debug, Default, Deserialize)]
struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    official_artwork: Option<Artwork>,
}

#[derive(Debug, Deserialize)]
struct Artwork {
    #[serde(default)]
    front_default: Option<String>,
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| FetchError::Decode(format!("{} is not a valid URL ({}): {}", field, raw, e)))
}

/// Decode a list page envelope
///
/// Entries keep the order the server sent them in. An entry whose detail URL
/// does not parse fails the whole page.
pub fn decode_list(body: &[u8]) -> Result<ListPage> {
    let envelope: ListEnvelope = serde_json::from_slice(body)?;

    let entries = envelope
        .results
        .into_iter()
        .map(|item| {
            let detail_ref = parse_url("results[].url", &item.url)?;
            Ok(ListEntry {
                name: item.name,
                detail_ref,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let next = envelope.next.as_deref().map(|u| parse_url("next", u)).transpose()?;
    let previous = envelope
        .previous
        .as_deref()
        .map(|u| parse_url("previous", u))
        .transpose()?;

    debug!(
        "Decoded list page: count={}, entries={}, has_next={}",
        envelope.count,
        entries.len(),
        next.is_some()
    );

    Ok(ListPage {
        total_count: envelope.count,
        next,
        previous,
        entries,
    })
}

/// Decode a single detail object
///
/// A missing or unparsable artwork URL leaves `image_url` empty rather than
/// failing the record.
pub fn decode_detail(body: &[u8]) -> Result<DetailRecord> {
    let payload: DetailPayload = serde_json::from_slice(body)?;

    let image_url = payload
        .sprites
        .other
        .official_artwork
        .and_then(|art| art.front_default)
        .and_then(|raw| Url::parse(&raw).ok());

    Ok(DetailRecord {
        id: payload.id,
        name: payload.name,
        weight: payload.weight,
        height: payload.height,
        image_url,
    })
}
