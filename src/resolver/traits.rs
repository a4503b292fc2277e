//! Metadata source abstraction and the data it returns

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of a collection as reported by the metadata source
///
/// In flat mode entries carry only basic fields, which is all the orchestrator needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Platform item id
    #[serde(default)]
    pub id: Option<String>,
    /// Item title
    #[serde(default)]
    pub title: Option<String>,
    /// Item URL (some extractors report only the id here)
    #[serde(default)]
    pub url: Option<String>,
}

/// Metadata for a URL: either a collection (`entries` present) or a single item
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    /// Collection entries in collection order; `None` for a single item.
    /// Unavailable entries are reported as `null`.
    #[serde(default)]
    pub entries: Option<Vec<Option<RawEntry>>>,
    /// Id of the collection or item
    #[serde(default)]
    pub id: Option<String>,
    /// Title of the collection or item
    #[serde(default)]
    pub title: Option<String>,
}

impl ResolvedMedia {
    /// Whether this describes a collection
    pub fn is_collection(&self) -> bool {
        self.entries.is_some()
    }
}

/// Trait for the external media metadata resolver
///
/// Implementations must not download media; `flat` asks for entry lists without
/// resolving each entry individually.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for `url`
    ///
    /// # Errors
    ///
    /// Any failure (network, unsupported URL, tool missing) is returned as an error; the
    /// [`ItemResolver`](super::ItemResolver) maps it to `Error::Resolution`.
    async fn extract(&self, url: &str, flat: bool) -> Result<ResolvedMedia>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
