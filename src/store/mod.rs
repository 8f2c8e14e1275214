//! # Local Media Store
//!
//! The device media library seam and the adapter the session saves through.
//!
//! The library itself (create an asset, look up or create an album, append
//! assets, list an album newest-first) is an external collaborator behind
//! the [`MediaStore`] trait. [`LibraryAdapter`] layers the pipeline's save
//! semantics on top: materialize transfer-encoded images to a cache file,
//! ingest the file as an asset, and upsert album membership so prior
//! contents are never overwritten.

pub mod fs;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::image_ref::ImageRef;

/// A photo asset ingested into the media library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Library-assigned identifier.
    pub id: String,
    /// Resolvable location of the asset's bytes.
    pub path: PathBuf,
    /// Creation time, the album's sort key.
    pub created: DateTime<Utc>,
}

/// A named album in the media library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    /// Album display name. At most one album per name is canonical.
    pub name: String,
    /// Opaque library handle.
    pub id: String,
}

/// Abstract interface to the device media library.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Ingest a file as a new library asset.
    async fn create_asset(&self, file: &Path) -> PipelineResult<Asset>;

    /// Look up an album by name.
    async fn get_album(&self, name: &str) -> PipelineResult<Option<Album>>;

    /// Create an album seeded with an initial asset.
    async fn create_album(&self, name: &str, seed: &Asset) -> PipelineResult<Album>;

    /// Append assets to an existing album. Prior contents are preserved.
    async fn add_assets(&self, album: &Album, assets: &[Asset]) -> PipelineResult<()>;

    /// List up to `limit` photo assets of an album, newest first by
    /// creation time.
    async fn recent_assets(&self, album: &Album, limit: usize) -> PipelineResult<Vec<Asset>>;
}

/// Save-path adapter over a [`MediaStore`].
pub struct LibraryAdapter {
    store: Box<dyn MediaStore>,
    cache_dir: PathBuf,
    cache_seq: AtomicU64,
}

impl LibraryAdapter {
    /// Wrap a media store, materializing transfer-encoded images under
    /// `cache_dir` before ingest.
    pub fn new(store: Box<dyn MediaStore>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_dir: cache_dir.into(),
            cache_seq: AtomicU64::new(0),
        }
    }

    /// Access the wrapped store.
    pub fn store(&self) -> &dyn MediaStore {
        self.store.as_ref()
    }

    /// Persist an image as a library asset.
    ///
    /// A transfer-encoded image is first materialized: payload decoded and
    /// written to a cache file. A file-backed image is ingested as-is.
    pub async fn persist(&self, image: &ImageRef) -> PipelineResult<Asset> {
        let file = match image {
            ImageRef::File { path } => path.clone(),
            ImageRef::Data { mime, payload } => self.materialize(mime, payload).await?,
        };
        self.store.create_asset(&file).await
    }

    /// Get-or-create-then-append: ensure `name` exists and contains `asset`.
    pub async fn upsert_album(&self, asset: &Asset, name: &str) -> PipelineResult<Album> {
        match self.store.get_album(name).await? {
            Some(album) => {
                debug!("appending asset {} to album '{}'", asset.id, name);
                self.store
                    .add_assets(&album, std::slice::from_ref(asset))
                    .await?;
                Ok(album)
            }
            None => {
                debug!("creating album '{}' seeded with asset {}", name, asset.id);
                self.store.create_album(name, asset).await
            }
        }
    }

    /// The most recent asset of an album, as a resolvable image reference.
    /// Absent when the album or its contents do not exist.
    pub async fn most_recent(&self, name: &str) -> PipelineResult<Option<ImageRef>> {
        let Some(album) = self.store.get_album(name).await? else {
            return Ok(None);
        };
        let assets = self.store.recent_assets(&album, 1).await?;
        Ok(assets.into_iter().next().map(|a| ImageRef::file(a.path)))
    }

    /// Decode a transfer-encoded payload and write it to a cache file.
    async fn materialize(&self, mime: &str, payload: &str) -> PipelineResult<PathBuf> {
        let bytes = BASE64
            .decode(payload.as_bytes())
            .map_err(|e| PipelineError::persist("decode_payload", e.to_string()))?;

        tokio::fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
            PipelineError::persist_at("cache_dir", self.cache_dir.display().to_string(), e.to_string())
        })?;

        let seq = self.cache_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "processed_{}_{:04}.{}",
            Utc::now().format("%Y%m%d_%H%M%S%3f"),
            seq,
            extension_for(mime)
        );
        let path = self.cache_dir.join(name);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            PipelineError::persist_at("cache_write", path.display().to_string(), e.to_string())
        })?;
        debug!("materialized {} byte payload to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// File extension for the MIME types the pipeline produces.
fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        _ => "jpg",
    }
}
