//! Common test utilities for the pipeline integration tests.
//!
//! Provides a stub filter endpoint standing in for the remote filter
//! service, plus image fixtures for capture frames.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tiny_http::{Header, Response, Server};

/// A complete 1x1 RGBA PNG, byte for byte.
pub const ONE_PX_PNG: [u8; 68] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, // IHDR chunk length
    0x49, 0x48, 0x44, 0x52, // IHDR
    0x00, 0x00, 0x00, 0x01, // width: 1
    0x00, 0x00, 0x00, 0x01, // height: 1
    0x08, 0x06, 0x00, 0x00,
    0x00, // bit depth: 8, color type: 6 (RGBA), compression: 0, filter: 0, interlace: 0
    0x1F, 0xF3, 0xFF, 0x61, // IHDR CRC
    0x00, 0x00, 0x00, 0x0C, // IDAT chunk length
    0x49, 0x44, 0x41, 0x54, // IDAT
    0x78, 0x9C, 0x62, 0x60, 0x60, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01, // compressed data
    0x27, 0x6B, 0xB1, 0x42, // IDAT CRC
    0x00, 0x00, 0x00, 0x00, // IEND chunk length
    0x49, 0x45, 0x4E, 0x44, // IEND
    0xAE, 0x42, 0x60, 0x82, // IEND CRC
];

/// Base64 of [`ONE_PX_PNG`], the stub's default processed image.
pub fn one_px_png_base64() -> String {
    BASE64.encode(ONE_PX_PNG)
}

/// Write a small PNG capture frame to `dir` and return its path.
pub fn write_test_frame(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 9 % 256) as u8, (y * 7 % 256) as u8, 64])
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// One request the stub saw: the filter id and the image payload it carried
/// (base64 for JSON requests, a marker for multipart requests).
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub filter: String,
    pub image: String,
}

/// Behavior knobs for the stub endpoint.
#[derive(Default)]
pub struct StubOptions {
    /// Filters answered with a 500 instead of a processed image.
    pub fail_filters: Vec<String>,
    /// Answer 2xx with a body missing `processed_image`.
    pub malformed: bool,
    /// Processed image payload; defaults to the 1x1 PNG.
    pub processed_b64: Option<String>,
}

/// A stub filter endpoint on a local port.
///
/// Serves `{"processed_image": <b64>}` for JSON and multipart requests
/// alike, recording what it saw, until dropped.
pub struct StubFilterServer {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: Arc<Server>,
    worker: Option<thread::JoinHandle<()>>,
}

impl StubFilterServer {
    pub fn spawn(options: StubOptions) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let url = format!("http://127.0.0.1:{}/apply-filter", port);

        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let processed = options
            .processed_b64
            .clone()
            .unwrap_or_else(one_px_png_base64);

        let worker = {
            let server = Arc::clone(&server);
            let hits = Arc::clone(&hits);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                loop {
                    let mut request = match server.recv() {
                        Ok(request) => request,
                        Err(_) => break, // unblocked on drop
                    };
                    hits.fetch_add(1, Ordering::SeqCst);

                    let content_type = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Content-Type"))
                        .map(|h| h.value.as_str().to_owned())
                        .unwrap_or_default();
                    let mut body = Vec::new();
                    request.as_reader().read_to_end(&mut body).unwrap_or(0);

                    let recorded = if content_type.starts_with("multipart/form-data") {
                        // Good enough for the tests: note the encoding, pull
                        // the filter field out of the raw form body.
                        RecordedRequest {
                            filter: extract_multipart_filter(&body).unwrap_or_default(),
                            image: "<multipart>".to_owned(),
                        }
                    } else {
                        let json: serde_json::Value =
                            serde_json::from_slice(&body).unwrap_or_default();
                        RecordedRequest {
                            filter: json["filter"].as_str().unwrap_or_default().to_owned(),
                            image: json["image"].as_str().unwrap_or_default().to_owned(),
                        }
                    };

                    let response = if options.fail_filters.contains(&recorded.filter) {
                        json_response(r#"{"error": "filter exploded"}"#, 500)
                    } else if options.malformed {
                        json_response(r#"{"unexpected": "shape"}"#, 200)
                    } else {
                        json_response(
                            &serde_json::json!({ "processed_image": processed }).to_string(),
                            200,
                        )
                    };
                    requests.lock().unwrap().push(recorded);
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            url,
            hits,
            requests,
            server,
            worker: Some(worker),
        }
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubFilterServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap())
}

/// Pull the `filter` form field's value out of a raw multipart body.
fn extract_multipart_filter(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let marker = "name=\"filter\"";
    let at = text.find(marker)? + marker.len();
    let rest = &text[at..];
    let value_start = rest.find("\r\n\r\n")? + 4;
    let rest = &rest[value_start..];
    let value_end = rest.find("\r\n")?;
    Some(rest[..value_end].to_owned())
}
