//! Resolution of a source URL into downloadable items
//!
//! [`ItemResolver`] wraps a [`MetadataSource`] (yt-dlp in production) and turns whatever
//! it reports into an ordered list of [`ItemDescriptor`]s. A collection yields its
//! available entries in collection order; a single-item URL yields exactly one
//! descriptor.

mod traits;
mod ytdlp;

pub use traits::{MetadataSource, RawEntry, ResolvedMedia};
pub use ytdlp::YtDlpMetadataSource;

use crate::error::{Error, Result};
use crate::types::ItemDescriptor;
use crate::utils::{extract_item_id, parse_http_url};
use std::sync::Arc;

/// Title used for collection entries reported without one
const UNKNOWN_ENTRY_TITLE: &str = "Unknown";

/// Title used for a single item reported without one
const SINGLE_ITEM_TITLE: &str = "Video";

/// Result of resolving a URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBatch {
    /// Collection title (or item title for a single item), when known
    pub title: Option<String>,
    /// Whether the URL named a collection
    pub is_collection: bool,
    /// Items in collection order
    pub items: Vec<ItemDescriptor>,
}

/// Turns source URLs into item descriptors
#[derive(Clone)]
pub struct ItemResolver {
    source: Arc<dyn MetadataSource>,
}

impl std::fmt::Debug for ItemResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemResolver")
            .field("source", &self.source.name())
            .finish()
    }
}

impl ItemResolver {
    /// Create a resolver over a metadata source
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Resolve `url` into an ordered list of items
    ///
    /// # Errors
    ///
    /// `Error::InvalidUrl` for non-http(s) input (checked before any lookup) and
    /// `Error::Resolution` for any lookup failure.
    pub async fn resolve(&self, url: &str) -> Result<Vec<ItemDescriptor>> {
        Ok(self.resolve_batch(url).await?.items)
    }

    /// Resolve `url`, keeping collection details for logging
    pub async fn resolve_batch(&self, url: &str) -> Result<ResolvedBatch> {
        let url = url.trim();
        if parse_http_url(url).is_none() {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        let media = self.source.extract(url, true).await.map_err(|e| match e {
            Error::Resolution(_) | Error::InvalidUrl(_) => e,
            other => Error::Resolution(other.to_string()),
        })?;

        Ok(batch_from_media(url, media))
    }
}

/// Map metadata to descriptors
pub(crate) fn batch_from_media(url: &str, media: ResolvedMedia) -> ResolvedBatch {
    match media.entries {
        Some(entries) => {
            let total = entries.len();
            let items: Vec<ItemDescriptor> = entries
                .into_iter()
                .flatten()
                .map(descriptor_from_entry)
                .collect();
            if items.len() < total {
                tracing::debug!(
                    unavailable = total - items.len(),
                    "dropped unavailable collection entries"
                );
            }
            ResolvedBatch {
                title: media.title,
                is_collection: true,
                items,
            }
        }
        None => {
            let id = media
                .id
                .filter(|id| !id.is_empty())
                .or_else(|| extract_item_id(url))
                .unwrap_or_default();
            let title = media
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| SINGLE_ITEM_TITLE.to_string());
            ResolvedBatch {
                title: Some(title.clone()),
                is_collection: false,
                items: vec![ItemDescriptor {
                    id,
                    title,
                    direct_url: Some(url.to_string()),
                }],
            }
        }
    }
}

fn descriptor_from_entry(entry: RawEntry) -> ItemDescriptor {
    // Flat extraction sometimes reports the bare id in `url`
    let direct_url = entry.url.filter(|u| parse_http_url(u).is_some());
    let id = entry
        .id
        .filter(|id| !id.is_empty())
        .or_else(|| direct_url.as_deref().and_then(extract_item_id))
        .unwrap_or_default();

    ItemDescriptor {
        id,
        title: entry
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ENTRY_TITLE.to_string()),
        direct_url,
    }
}
