// # Capture Module
//
// The camera collaborator seam and the file-backed source used by the CLI
// and the test suite.

use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{PipelineError, PipelineResult};
use crate::image_ref::ImageRef;

/// Abstract interface for camera frame sources.
///
/// The pipeline consumes exactly one operation from the camera: produce the
/// next frame as an image reference. Facing, flash, and capture settings
/// live outside this seam.
#[async_trait]
pub trait CaptureSource: Send {
    /// Captures the next frame from the source asynchronously.
    ///
    /// Fails with a `Capture` error when no frame can be produced.
    async fn capture_frame(&mut self) -> PipelineResult<ImageRef>;
}

/// Camera source backed by image files on disk.
///
/// Hands out queued file references one per `capture_frame` call, in order.
/// An exhausted queue behaves like a camera that produced no frame. Stands
/// in for real camera hardware in the CLI and in tests.
pub struct FileCaptureSource {
    frames: VecDeque<PathBuf>,
}

impl FileCaptureSource {
    /// Source that captures the given files in order.
    pub fn new(frames: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Source that captures a single frame.
    pub fn single(frame: impl Into<PathBuf>) -> Self {
        Self::new([frame.into()])
    }

    /// Frames still queued.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl CaptureSource for FileCaptureSource {
    async fn capture_frame(&mut self) -> PipelineResult<ImageRef> {
        let path = self
            .frames
            .pop_front()
            .ok_or_else(|| PipelineError::capture("no frames queued"))?;
        if !path.exists() {
            return Err(PipelineError::capture(format!(
                "frame file missing: {}",
                path.display()
            )));
        }
        Ok(ImageRef::file(path))
    }
}
