//! # DigiCam Capture-and-Filter Pipeline
//!
//! The core pipeline of a camera application: capture a photo, preview it,
//! optionally send it through a remote image-filter endpoint (repeatably,
//! without compounding), and save the result into the device media library
//! under the "DigiCam" album.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `capture`: the camera collaborator seam and a file-backed source
//! - `transcode`: bounded resize + JPEG recompression + transfer encoding
//! - `remote`: the filter endpoint client with two request encodings
//! - `store`: the media library seam, a directory-backed store, and the
//!   save-path adapter
//! - `session`: the capture session state machine tying it all together
//! - `preview`: per-filter thumbnail previews of the current original
//!
//! ## Example
//!
//! ```rust,no_run
//! use digicam::capture::FileCaptureSource;
//! use digicam::filter::FilterKind;
//! use digicam::session::CaptureSession;
//! use digicam::store::fs::FsMediaStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FsMediaStore::open("./library").await?;
//! let mut session = CaptureSession::builder()
//!     .camera(FileCaptureSource::single("shot.jpg"))
//!     .store(store)
//!     .build()?;
//!
//! session.capture().await?;
//! session.apply_filter(FilterKind::Sepia).await?;
//! session.save().await?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod filter;
pub mod image_ref;
pub mod preview;
pub mod remote;
pub mod session;
pub mod store;
pub mod transcode;

/// Re-export the types most callers need.
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, Retryable};
pub use filter::FilterKind;
pub use image_ref::{ImageKind, ImageRef};
pub use session::{CaptureSession, CaptureSessionBuilder, SessionState};
