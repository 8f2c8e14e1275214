//! Directory-backed media store.
//!
//! Stands in for the device photo library: assets are timestamped files
//! under `<root>/assets/`, albums are directories under `<root>/albums/`
//! whose entries are reference files pointing at assets. One directory per
//! album name keeps the at-most-one-canonical-album invariant structural.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::store::{Album, Asset, MediaStore};

/// Media library rooted at a directory.
pub struct FsMediaStore {
    root: PathBuf,
    ingest_seq: AtomicU64,
}

impl FsMediaStore {
    /// Open (creating if needed) a library at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> PipelineResult<Self> {
        let root = root.into();
        for dir in [root.join("assets"), root.join("albums")] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                PipelineError::persist_at("library_init", dir.display().to_string(), e.to_string())
            })?;
        }
        Ok(Self {
            root,
            ingest_seq: AtomicU64::new(0),
        })
    }

    /// The library root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    fn album_dir(&self, name: &str) -> PathBuf {
        self.root.join("albums").join(name)
    }

    /// Write one album membership entry: a file named after the asset id
    /// whose content is the asset's path.
    async fn write_member(&self, album_dir: &Path, asset: &Asset) -> PipelineResult<()> {
        let member = album_dir.join(&asset.id);
        tokio::fs::write(&member, asset.path.display().to_string())
            .await
            .map_err(|e| {
                PipelineError::persist_at("album_append", member.display().to_string(), e.to_string())
            })
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn create_asset(&self, file: &Path) -> PipelineResult<Asset> {
        let created = Utc::now();
        let seq = self.ingest_seq.fetch_add(1, Ordering::Relaxed);
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        // Millisecond timestamp plus an ingest counter keeps ids unique and
        // lexicographically ordered within one process.
        let id = format!("img_{}_{:04}", created.format("%Y%m%d_%H%M%S%3f"), seq);
        let dest = self.assets_dir().join(format!("{}.{}", id, ext));

        tokio::fs::copy(file, &dest).await.map_err(|e| {
            PipelineError::persist_at("create_asset", file.display().to_string(), e.to_string())
        })?;

        Ok(Asset {
            id,
            path: dest,
            created,
        })
    }

    async fn get_album(&self, name: &str) -> PipelineResult<Option<Album>> {
        let dir = self.album_dir(name);
        if dir.is_dir() {
            Ok(Some(Album {
                name: name.to_owned(),
                id: dir.display().to_string(),
            }))
        } else {
            Ok(None)
        }
    }

    async fn create_album(&self, name: &str, seed: &Asset) -> PipelineResult<Album> {
        let dir = self.album_dir(name);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            PipelineError::persist_at("create_album", dir.display().to_string(), e.to_string())
        })?;
        let album = Album {
            name: name.to_owned(),
            id: dir.display().to_string(),
        };
        self.write_member(&dir, seed).await?;
        Ok(album)
    }

    async fn add_assets(&self, album: &Album, assets: &[Asset]) -> PipelineResult<()> {
        let dir = self.album_dir(&album.name);
        for asset in assets {
            self.write_member(&dir, asset).await?;
        }
        Ok(())
    }

    async fn recent_assets(&self, album: &Album, limit: usize) -> PipelineResult<Vec<Asset>> {
        let dir = self.album_dir(&album.name);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                return Err(PipelineError::persist_at(
                    "album_scan",
                    dir.display().to_string(),
                    e.to_string(),
                ));
            }
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            PipelineError::persist_at("album_scan", dir.display().to_string(), e.to_string())
        })? {
            let id = entry.file_name().to_string_lossy().into_owned();
            let target = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => PathBuf::from(content.trim()),
                Err(e) => {
                    warn!("unreadable album entry {}: {}", id, e);
                    continue;
                }
            };
            let modified = match tokio::fs::metadata(&target).await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    // Asset deleted out from under the album; skip it.
                    warn!("album entry {} points at missing asset: {}", id, e);
                    continue;
                }
            };
            found.push(Asset {
                id,
                path: target,
                created: DateTime::<Utc>::from(modified),
            });
        }

        // Newest first; ids tie-break same-timestamp ingests since the
        // ingest counter is embedded in the name.
        found.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
        found.truncate(limit);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_create_asset_copies_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::open(dir.path().join("lib")).await.unwrap();
        let frame = write_frame(dir.path(), "frame.jpg", b"pixels");

        let asset = store.create_asset(&frame).await.unwrap();
        assert_ne!(asset.path, frame);
        assert_eq!(std::fs::read(&asset.path).unwrap(), b"pixels");
        assert!(asset.id.starts_with("img_"));
    }

    #[tokio::test]
    async fn test_album_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::open(dir.path().join("lib")).await.unwrap();
        let frame = write_frame(dir.path(), "frame.jpg", b"pixels");

        assert!(store.get_album("DigiCam").await.unwrap().is_none());

        let first = store.create_asset(&frame).await.unwrap();
        let album = store.create_album("DigiCam", &first).await.unwrap();
        assert_eq!(album.name, "DigiCam");
        assert!(store.get_album("DigiCam").await.unwrap().is_some());

        let second = store.create_asset(&frame).await.unwrap();
        store
            .add_assets(&album, std::slice::from_ref(&second))
            .await
            .unwrap();

        let recent = store.recent_assets(&album, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second.id);
        assert_eq!(recent[1].id, first.id);

        let limited = store.recent_assets(&album, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, second.id);
    }

    #[tokio::test]
    async fn test_missing_asset_target_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::open(dir.path().join("lib")).await.unwrap();
        let frame = write_frame(dir.path(), "frame.jpg", b"pixels");

        let keep = store.create_asset(&frame).await.unwrap();
        let doomed = store.create_asset(&frame).await.unwrap();
        let album = store.create_album("DigiCam", &keep).await.unwrap();
        store
            .add_assets(&album, std::slice::from_ref(&doomed))
            .await
            .unwrap();

        std::fs::remove_file(&doomed.path).unwrap();
        let recent = store.recent_assets(&album, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, keep.id);
    }
}
