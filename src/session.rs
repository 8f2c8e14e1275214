//! # Capture Session Management
//!
//! The in-memory lifecycle of a capture: the pristine `original` frame, the
//! `working` image currently shown and savable, and the transitions between
//! them. Built through [`CaptureSessionBuilder`], which wires the camera
//! source, media store, and filter client together.
//!
//! ## Lifecycle
//!
//! `Idle` → `capture()` → `Previewing` → any number of `apply_filter()`
//! round-trips and `save()`s → `discard(confirmed)` back to `Idle`.
//!
//! Two invariants hold throughout:
//! - `original` is set exactly once per capture and never overwritten by a
//!   filter result; filters always transcode from `original`, so they never
//!   compound.
//! - a failed operation leaves `original`/`working` in their last-good
//!   state; the error is surfaced and the session stays usable.
//!
//! All session I/O is awaited sequentially on one logical task. `&mut self`
//! receivers keep interleaved mutation unrepresentable; on top of that, a
//! single-flight guard rejects a filter request issued while another is in
//! flight, for callers that wrap the session in shared ownership.

use log::info;

use crate::capture::CaptureSource;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::filter::FilterKind;
use crate::image_ref::ImageRef;
use crate::preview::{self, PreviewCache};
use crate::remote::FilterClient;
use crate::store::{Asset, LibraryAdapter, MediaStore};
use crate::transcode;

/// Observable session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No working image.
    Idle,
    /// A working image is present; filters and saves are allowed.
    Previewing,
}

/// The capture session state machine.
pub struct CaptureSession {
    camera: Box<dyn CaptureSource>,
    library: LibraryAdapter,
    client: FilterClient,
    config: PipelineConfig,
    original: Option<ImageRef>,
    working: Option<ImageRef>,
    last_saved: Option<ImageRef>,
    previews: PreviewCache,
    filter_in_flight: bool,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("state", &self.state())
            .field("original", &self.original)
            .field("working", &self.working)
            .field("last_saved", &self.last_saved)
            .field("filter_in_flight", &self.filter_in_flight)
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    /// Create a new capture session using the builder pattern.
    pub fn builder() -> CaptureSessionBuilder {
        CaptureSessionBuilder::new()
    }

    /// Current state, derived from the presence of a working image.
    pub fn state(&self) -> SessionState {
        if self.working.is_some() {
            SessionState::Previewing
        } else {
            SessionState::Idle
        }
    }

    /// The pristine captured frame, if any.
    pub fn original(&self) -> Option<&ImageRef> {
        self.original.as_ref()
    }

    /// The image currently shown and savable, if any.
    pub fn working(&self) -> Option<&ImageRef> {
        self.working.as_ref()
    }

    /// The most recently saved asset's image, used as the "last shot"
    /// thumbnail.
    pub fn last_saved(&self) -> Option<&ImageRef> {
        self.last_saved.as_ref()
    }

    /// The preview cache for the current original.
    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    /// Re-query the library for the most recent "DigiCam" asset. Called on
    /// session start to seed the last-shot thumbnail; `save()` refreshes it
    /// automatically afterwards.
    pub async fn refresh_last_saved(&mut self) -> PipelineResult<Option<&ImageRef>> {
        self.last_saved = self.library.most_recent(&self.config.album_name).await?;
        Ok(self.last_saved.as_ref())
    }

    /// Capture a new frame from the camera collaborator.
    ///
    /// Sets both `original` and `working` to the new frame and invalidates
    /// the preview cache, which was scoped to the previous original.
    pub async fn capture(&mut self) -> PipelineResult<ImageRef> {
        let frame = self.camera.capture_frame().await?;
        info!("captured {}", frame);
        self.original = Some(frame.clone());
        self.working = Some(frame.clone());
        self.previews.clear();
        Ok(frame)
    }

    /// Apply a filter to the captured original via the remote endpoint.
    ///
    /// Transcodes from `original`, never from `working`, so repeated
    /// applications replace rather than compound. On success `working` is
    /// replaced with the processed image; on failure nothing is mutated and
    /// the error is returned for the caller to surface (and, if it is
    /// retryable, to retry).
    pub async fn apply_filter(&mut self, filter: FilterKind) -> PipelineResult<ImageRef> {
        let original = self
            .original
            .clone()
            .ok_or(PipelineError::NoOriginalImage)?;
        if self.filter_in_flight {
            return Err(PipelineError::filter_busy(filter.as_str()));
        }

        self.filter_in_flight = true;
        let result = self
            .round_trip(&original, filter, self.config.max_width)
            .await;
        self.filter_in_flight = false;

        let processed = result?;
        info!("filter '{}' applied, working image replaced", filter);
        self.working = Some(processed.clone());
        Ok(processed)
    }

    /// Rebuild the preview cache for the current original: one sequential
    /// round-trip per known filter at the thumbnail bound, failures left
    /// absent.
    pub async fn refresh_previews(&mut self) -> PipelineResult<&PreviewCache> {
        let original = self
            .original
            .clone()
            .ok_or(PipelineError::NoOriginalImage)?;
        self.previews.clear();
        self.previews = preview::build_previews(
            &self.client,
            &original,
            &FilterKind::ALL,
            self.config.preview_max_width,
            self.config.jpeg_quality,
        )
        .await;
        info!(
            "previews rebuilt: {}/{} available",
            self.previews.len(),
            FilterKind::ALL.len()
        );
        Ok(&self.previews)
    }

    /// Discard the capture, gated on caller-supplied confirmation.
    ///
    /// Without confirmation nothing changes and `false` is returned. With
    /// it, `original`, `working`, and the previews are cleared and the
    /// session returns to `Idle`.
    pub fn discard(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        self.original = None;
        self.working = None;
        self.previews.clear();
        info!("capture discarded");
        true
    }

    /// Save the working image into the media library and upsert it into
    /// the configured album.
    ///
    /// The working image survives the save: a filtered shot can be saved,
    /// re-filtered, and saved again. On success the last-shot thumbnail is
    /// refreshed from the library.
    pub async fn save(&mut self) -> PipelineResult<Asset> {
        let working = self.working.clone().ok_or(PipelineError::NoImageToSave)?;
        let asset = self.library.persist(&working).await?;
        self.library
            .upsert_album(&asset, &self.config.album_name)
            .await?;
        self.last_saved = self.library.most_recent(&self.config.album_name).await?;
        info!("saved asset {} to album '{}'", asset.id, self.config.album_name);
        Ok(asset)
    }

    async fn round_trip(
        &self,
        source: &ImageRef,
        filter: FilterKind,
        max_width: u32,
    ) -> PipelineResult<ImageRef> {
        let payload =
            transcode::to_transfer_format(source, max_width, self.config.jpeg_quality)?;
        self.client.apply_filter(&payload, filter).await
    }
}

/// Builder for capture sessions.
pub struct CaptureSessionBuilder {
    camera: Option<Box<dyn CaptureSource>>,
    store: Option<Box<dyn MediaStore>>,
    config: PipelineConfig,
}

impl CaptureSessionBuilder {
    /// Start an empty builder with default configuration.
    pub fn new() -> Self {
        Self {
            camera: None,
            store: None,
            config: PipelineConfig::default(),
        }
    }

    /// Set the camera frame source.
    pub fn camera(mut self, camera: impl CaptureSource + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    /// Set the media library backend.
    pub fn store(mut self, store: impl MediaStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Replace the default pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and assemble the session.
    pub fn build(self) -> PipelineResult<CaptureSession> {
        self.config.validate()?;
        let camera = self
            .camera
            .ok_or_else(|| PipelineError::config("camera", "<unset>", "a camera source is required"))?;
        let store = self
            .store
            .ok_or_else(|| PipelineError::config("store", "<unset>", "a media store is required"))?;

        let client = FilterClient::new(
            self.config.endpoint.clone(),
            self.config.encoding,
            self.config.timeout,
        );
        let library = LibraryAdapter::new(store, self.config.cache_dir.clone());

        Ok(CaptureSession {
            camera,
            library,
            client,
            config: self.config,
            original: None,
            working: None,
            last_saved: None,
            previews: PreviewCache::new(),
            filter_in_flight: false,
        })
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
