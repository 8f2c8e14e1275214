//! # Remote Filter Client
//!
//! Sends an encoded image plus a filter identifier to the remote filter
//! endpoint and decodes the processed result back into an image reference.
//!
//! The service accepts two request encodings and both appear in the wild:
//! a JSON body carrying the base64 payload, and a multipart form carrying
//! the binary image. They are interchangeable strategies behind one client,
//! selected by configuration, never merged. The response contract is the
//! same for both: a JSON body with a base64 `processed_image` field.
//!
//! Each call is a bare, stateless transformation request: no
//! authentication, no idempotency key, no automatic retry. The caller
//! decides whether a failed call is worth re-issuing.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use log::debug;
use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;

use crate::error::{PipelineError, PipelineResult};
use crate::filter::FilterKind;
use crate::image_ref::ImageRef;

/// Filename and MIME type advertised for the multipart image part.
const PART_FILE_NAME: &str = "photo.jpg";
const PART_MIME: &str = "image/jpeg";

/// How the request body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RequestEncoding {
    /// `{ "image": <base64>, "filter": <id> }` JSON body (default).
    #[default]
    Json,
    /// Multipart form: binary `image` part plus a `filter` text field,
    /// matching the upload-style endpoint contract.
    Multipart,
}

impl std::fmt::Display for RequestEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            RequestEncoding::Json => "json",
            RequestEncoding::Multipart => "multipart",
        })
    }
}

/// Successful response body shape. Anything else is a malformed response.
#[derive(Debug, Deserialize)]
struct FilterResponse {
    processed_image: String,
}

/// Client for the remote filter endpoint.
pub struct FilterClient {
    http: reqwest::Client,
    endpoint: String,
    encoding: RequestEncoding,
    timeout: Option<Duration>,
}

impl FilterClient {
    /// Create a client for `endpoint` with the given request encoding.
    ///
    /// `timeout` bounds each round-trip; `None` preserves the historical
    /// behavior of blocking until the endpoint answers.
    pub fn new(
        endpoint: impl Into<String>,
        encoding: RequestEncoding,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            encoding,
            timeout,
        }
    }

    /// The endpoint URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one filter request and decode the processed image.
    ///
    /// `payload` is the transfer representation produced by the transcode
    /// stage (base64 JPEG). On success the result is a data-URI image
    /// reference wrapping the endpoint's `processed_image` payload, verified
    /// to decode. Every failure mode (network, non-2xx, malformed body)
    /// is a `RemoteFilter` error carrying the reason.
    pub async fn apply_filter(
        &self,
        payload: &str,
        filter: FilterKind,
    ) -> PipelineResult<ImageRef> {
        debug!(
            "posting {:?} filter request to {} ({} b64 chars)",
            filter,
            self.endpoint,
            payload.len()
        );

        let request = match self.encoding {
            RequestEncoding::Json => self.http.post(&self.endpoint).json(&json!({
                "image": payload,
                "filter": filter.as_str(),
            })),
            RequestEncoding::Multipart => {
                let bytes = BASE64.decode(payload.as_bytes()).map_err(|e| {
                    PipelineError::transcode("decode_payload", e.to_string())
                })?;
                let part = multipart::Part::bytes(bytes)
                    .file_name(PART_FILE_NAME)
                    .mime_str(PART_MIME)
                    .map_err(|e| PipelineError::remote_malformed(e.to_string()))?;
                let form = multipart::Form::new()
                    .part("image", part)
                    .text("filter", filter.as_str());
                self.http.post(&self.endpoint).multipart(form)
            }
        };
        let request = match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };

        let response = request.send().await.map_err(PipelineError::remote_network)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::remote_status(status.as_u16(), body));
        }

        let body: FilterResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::remote_malformed(e.to_string()))?;
        // Reject payloads the decode stage would choke on later.
        BASE64.decode(body.processed_image.as_bytes()).map_err(|e| {
            PipelineError::remote_malformed(format!("processed_image is not valid base64: {}", e))
        })?;

        Ok(ImageRef::data(PART_MIME, body.processed_image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encoding_is_json() {
        assert_eq!(RequestEncoding::default(), RequestEncoding::Json);
    }

    #[test]
    fn test_multipart_rejects_bad_payload_before_sending() {
        // A payload that is not base64 fails locally, not over the wire.
        let client = FilterClient::new(
            "http://127.0.0.1:1/apply-filter",
            RequestEncoding::Multipart,
            None,
        );
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt
            .block_on(client.apply_filter("!!not-base64!!", FilterKind::Sepia))
            .unwrap_err();
        assert_eq!(err.category(), "transcode");
    }
}
