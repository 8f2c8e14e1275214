//! # Configuration Module
//!
//! Pipeline configuration shared by the CLI and the core library.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `endpoint` | `http://127.0.0.1:5000/apply-filter` | Remote filter endpoint URL |
//! | `encoding` | `json` | Request body encoding (json or multipart) |
//! | `max_width` | 1280 | Transfer bound for full-size filter round-trips |
//! | `preview_max_width` | 100 | Transfer bound for preview thumbnails |
//! | `jpeg_quality` | 80 | JPEG recompression quality |
//! | `album_name` | `DigiCam` | Album every save lands in |
//! | `timeout` | none | Optional per-request remote timeout |
//!
//! The endpoint URL is the only piece of configuration the source app had,
//! compiled in per build; it stays a compiled-in default here, overridable
//! by the caller. The timeout is a deliberate deviation: the source blocked
//! indefinitely on a hung endpoint, so `None` preserves that behavior and
//! anything else is hygiene the caller opts into.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};
use crate::remote::RequestEncoding;

/// Default remote filter endpoint (the development filter server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/apply-filter";

/// The album every save lands in.
pub const DEFAULT_ALBUM: &str = "DigiCam";

/// Transfer bound for full-size round-trips, in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1280;

/// Transfer bound for preview thumbnails, in pixels.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 100;

/// Configuration for a capture session pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Remote filter endpoint URL.
    pub endpoint: String,
    /// Request body encoding for filter calls.
    pub encoding: RequestEncoding,
    /// Width bound for full-size transfer payloads. Caps request size and
    /// round-trip latency.
    pub max_width: u32,
    /// Width bound for preview thumbnails.
    pub preview_max_width: u32,
    /// JPEG recompression quality, 1-100.
    pub jpeg_quality: u8,
    /// Album name saves are upserted into.
    pub album_name: String,
    /// Directory where transfer-encoded results are materialized before
    /// library ingest.
    pub cache_dir: PathBuf,
    /// Optional per-request timeout for remote filter calls.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            encoding: RequestEncoding::default(),
            max_width: DEFAULT_MAX_WIDTH,
            preview_max_width: DEFAULT_PREVIEW_WIDTH,
            jpeg_quality: crate::transcode::JPEG_QUALITY,
            album_name: DEFAULT_ALBUM.to_string(),
            cache_dir: default_cache_dir(),
            timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.endpoint.is_empty() {
            return Err(PipelineError::config("endpoint", "", "must not be empty"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(PipelineError::config(
                "endpoint",
                &self.endpoint,
                "must be an http(s) URL",
            ));
        }
        if self.max_width == 0 {
            return Err(PipelineError::config(
                "max_width",
                "0",
                "must be greater than 0",
            ));
        }
        if self.preview_max_width == 0 {
            return Err(PipelineError::config(
                "preview_max_width",
                "0",
                "must be greater than 0",
            ));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(PipelineError::config(
                "jpeg_quality",
                self.jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        if self.album_name.is_empty() {
            return Err(PipelineError::config("album_name", "", "must not be empty"));
        }
        Ok(())
    }
}

/// Platform cache directory for materialized filter results, with a temp-dir
/// fallback when the platform reports none.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("digicam")
}
