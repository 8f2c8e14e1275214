//! # Preview Cache Builder
//!
//! Small per-filter thumbnail previews of the current original, shown
//! before the user commits to a filter. Each filter gets its own
//! transcode-plus-remote round-trip at the thumbnail bound; the round-trips
//! run one at a time, in filter-bar order, so partially built strips render
//! deterministically.
//!
//! The cache is scoped to one original: a new capture or a discard clears
//! it, and a rebuild replaces the whole mapping (no incremental diffing).

use std::collections::BTreeMap;

use log::warn;

use crate::error::PipelineResult;
use crate::filter::FilterKind;
use crate::image_ref::ImageRef;
use crate::remote::FilterClient;
use crate::transcode;

/// Mapping from filter to its thumbnail preview. A filter whose round-trip
/// failed is simply absent.
#[derive(Debug, Default)]
pub struct PreviewCache {
    entries: BTreeMap<FilterKind, ImageRef>,
}

impl PreviewCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The preview for a filter, if its round-trip succeeded.
    pub fn get(&self, filter: FilterKind) -> Option<&ImageRef> {
        self.entries.get(&filter)
    }

    /// Number of populated previews.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no previews are populated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate populated previews.
    pub fn iter(&self) -> impl Iterator<Item = (FilterKind, &ImageRef)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    fn insert(&mut self, filter: FilterKind, preview: ImageRef) {
        self.entries.insert(filter, preview);
    }
}

/// Build previews of `original` for every filter in `filters`, sequentially
/// and in order.
///
/// A failure for one filter is logged and leaves that key absent; it never
/// aborts the remaining filters. Only the transcode of the original itself
/// can fail the whole build, and even that is per-filter here since each
/// round-trip re-transcodes independently.
pub async fn build_previews(
    client: &FilterClient,
    original: &ImageRef,
    filters: &[FilterKind],
    preview_max_width: u32,
    jpeg_quality: u8,
) -> PreviewCache {
    let mut cache = PreviewCache::new();
    for &filter in filters {
        match preview_round_trip(client, original, filter, preview_max_width, jpeg_quality).await {
            Ok(preview) => cache.insert(filter, preview),
            Err(e) => warn!("preview for '{}' unavailable: {}", filter, e),
        }
    }
    cache
}

async fn preview_round_trip(
    client: &FilterClient,
    original: &ImageRef,
    filter: FilterKind,
    preview_max_width: u32,
    jpeg_quality: u8,
) -> PipelineResult<ImageRef> {
    let payload = transcode::to_transfer_format(original, preview_max_width, jpeg_quality)?;
    client.apply_filter(&payload, filter).await
}
