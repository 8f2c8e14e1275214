//! Tagged image references.
//!
//! Every image flowing through the pipeline is one of two things: a file on
//! disk (camera output, cache file, library asset) or a transfer-encoded
//! blob embedded in a `data:` URI (remote filter output). [`ImageRef`] keeps
//! the two distinguishable while letting both resolve to raw bytes.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::{PipelineError, PipelineResult};

/// The two reference kinds the pipeline moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Resolves to a byte stream via the file system.
    FileUri,
    /// Carries an embedded encoding tag and base64 payload.
    DataUri,
}

/// A reference to an image: a local file or a transfer-encoded blob.
///
/// The invariants are structural: `File` always holds a path, `Data` always
/// holds a MIME tag and a base64 payload (validated at construction when
/// parsed from a locator string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// A file on disk.
    File { path: PathBuf },
    /// An embedded `data:<mime>;base64,<payload>` blob.
    Data { mime: String, payload: String },
}

impl ImageRef {
    /// Reference an image file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// Reference an embedded blob from its MIME type and base64 payload.
    pub fn data(mime: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Data {
            mime: mime.into(),
            payload: payload.into(),
        }
    }

    /// Parse a `data:` URI locator string.
    ///
    /// Rejects locators without the `data:` scheme, the `;base64` marker,
    /// or a payload section.
    pub fn parse_data_uri(locator: &str) -> PipelineResult<Self> {
        let rest = locator
            .strip_prefix("data:")
            .ok_or_else(|| PipelineError::transcode("parse_data_uri", "missing data: scheme"))?;
        let (head, payload) = rest
            .split_once(',')
            .ok_or_else(|| PipelineError::transcode("parse_data_uri", "missing payload section"))?;
        let mime = head
            .strip_suffix(";base64")
            .ok_or_else(|| PipelineError::transcode("parse_data_uri", "missing base64 marker"))?;
        if mime.is_empty() {
            return Err(PipelineError::transcode(
                "parse_data_uri",
                "missing encoding tag",
            ));
        }
        Ok(Self::data(mime, payload))
    }

    /// Which kind of reference this is.
    pub fn kind(&self) -> ImageKind {
        match self {
            Self::File { .. } => ImageKind::FileUri,
            Self::Data { .. } => ImageKind::DataUri,
        }
    }

    /// The opaque locator string: a path or a full data URI.
    pub fn locator(&self) -> String {
        match self {
            Self::File { path } => path.display().to_string(),
            Self::Data { mime, payload } => format!("data:{};base64,{}", mime, payload),
        }
    }

    /// The file path, if this is a file reference.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File { path } => Some(path),
            Self::Data { .. } => None,
        }
    }

    /// The base64 payload, if this is a data reference.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::File { .. } => None,
            Self::Data { payload, .. } => Some(payload),
        }
    }

    /// The embedded encoding tag, if this is a data reference.
    pub fn mime(&self) -> Option<&str> {
        match self {
            Self::File { .. } => None,
            Self::Data { mime, .. } => Some(mime),
        }
    }

    /// Resolve the reference to raw image bytes.
    ///
    /// A file reference reads from disk; a data reference decodes its
    /// payload. Either failure surfaces as a transcode error since callers
    /// hit this on the way into the transcode stage.
    pub fn read_bytes(&self) -> PipelineResult<Vec<u8>> {
        match self {
            Self::File { path } => std::fs::read(path).map_err(|e| {
                PipelineError::transcode("read_source", format!("{}: {}", path.display(), e))
            }),
            Self::Data { payload, .. } => BASE64
                .decode(payload.as_bytes())
                .map_err(|e| PipelineError::transcode("decode_payload", e.to_string())),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path } => write!(f, "file:{}", path.display()),
            // Payloads run to megabytes; show the tag and length only.
            Self::Data { mime, payload } => write!(f, "data:{} ({} b64 chars)", mime, payload.len()),
        }
    }
}
