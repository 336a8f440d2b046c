//! Chunk download - one ranged request per chunk with cancellation

use std::future::Future;

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransferError};
use crate::types::Chunk;

/// Where chunk bytes come from.
///
/// `fetch_chunk` must return `TransferError::Cancelled` (never `ChunkFetch`)
/// when the token fires, so pause/cancel are not reported as failures.
pub trait ChunkSource: Send + Sync {
    /// Total asset size in bytes, 0 when the server does not say
    fn probe_size(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Fetch exactly the bytes of `chunk`'s range
    fn fetch_chunk(
        &self,
        chunk: &Chunk,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Short name used in log lines
    fn label(&self) -> &str {
        "chunk-source"
    }
}

/// `ChunkSource` backed by HTTP `Range` requests against one URL
#[derive(Debug, Clone)]
pub struct HttpChunkSource {
    client: Client,
    url: String,
}

impl HttpChunkSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn probe_with_head(&self) -> Option<u64> {
        match self.client.head(&self.url).send().await {
            Ok(response) if response.status().is_success() => {
                header_content_length(&response).filter(|len| *len > 0)
            }
            Ok(response) => {
                debug!(
                    "size_probe_head_rejected: {} status={}",
                    self.url,
                    response.status()
                );
                None
            }
            Err(e) => {
                debug!("size_probe_head_failed: {} error={}", self.url, e);
                None
            }
        }
    }

    async fn probe_with_range(&self) -> Result<u64> {
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await?;

        let status = response.status();
        // 206 only states the probed span's length; the total must come from Content-Range
        if status == StatusCode::PARTIAL_CONTENT {
            return Ok(content_range_total(&response).unwrap_or(0));
        }
        if status == StatusCode::OK {
            return Ok(header_content_length(&response).unwrap_or(0));
        }
        debug!(
            "size_probe_range_rejected: {} status={}",
            self.url,
            response.status()
        );
        Ok(0)
    }

    async fn fetch_range(&self, chunk: &Chunk, token: &CancellationToken) -> Result<Vec<u8>> {
        let chunk_id = chunk.id();
        let fetch_error = |message: String| TransferError::ChunkFetch { chunk_id, message };

        let response = self
            .client
            .get(&self.url)
            .header(RANGE, chunk.range_header())
            .send()
            .await
            .map_err(|e| fetch_error(format!("Range request failed: {}", e)))?;

        let status = response.status();
        let partial = status == StatusCode::PARTIAL_CONTENT;
        let skip = if partial {
            if let Some(value) = response.headers().get(CONTENT_RANGE) {
                let value = value.to_str().unwrap_or_default();
                let span = parse_content_range_span(value);
                if span != Some((chunk.byte_range_start(), chunk.byte_range_end())) {
                    return Err(fetch_error(format!(
                        "Content-Range mismatch: requested {}, got {}",
                        chunk.range_header(),
                        value
                    )));
                }
            }
            0
        } else if status == StatusCode::OK {
            warn!(
                "range_ignored: {} chunk={} server returned full body",
                self.url, chunk_id
            );
            chunk.byte_range_start()
        } else {
            let text = response.text().await.unwrap_or_default();
            return Err(fetch_error(format!(
                "Range request failed: {} - {}",
                status, text
            )));
        };

        let expected = chunk.size_bytes() as usize;
        let mut bytes = Vec::with_capacity(expected);
        let mut to_skip = skip;
        let mut stream = response.bytes_stream();

        while let Some(frame) = stream.next().await {
            if token.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            let frame = frame.map_err(|e| fetch_error(format!("Failed to read range bytes: {}", e)))?;
            let mut frame = &frame[..];
            if to_skip > 0 {
                let dropped = std::cmp::min(to_skip, frame.len() as u64);
                frame = &frame[dropped as usize..];
                to_skip -= dropped;
            }
            let wanted = expected - bytes.len();
            if partial && frame.len() > wanted {
                return Err(fetch_error(format!(
                    "Long body: expected {} bytes, got more",
                    expected
                )));
            }
            bytes.extend_from_slice(&frame[..std::cmp::min(wanted, frame.len())]);
            if !partial && bytes.len() == expected {
                break;
            }
        }

        if bytes.len() < expected {
            return Err(fetch_error(format!(
                "Short body: expected {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

impl ChunkSource for HttpChunkSource {
    async fn probe_size(&self) -> Result<u64> {
        if let Some(len) = self.probe_with_head().await {
            debug!("size_probe_head: {} total_bytes={}", self.url, len);
            return Ok(len);
        }
        let total = self.probe_with_range().await?;
        debug!("size_probe_range: {} total_bytes={}", self.url, total);
        Ok(total)
    }

    async fn fetch_chunk(&self, chunk: &Chunk, token: &CancellationToken) -> Result<Vec<u8>> {
        if token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(TransferError::Cancelled),
            result = self.fetch_range(chunk, token) => result,
        }
    }

    fn label(&self) -> &str {
        &self.url
    }
}

fn header_content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Total from `Content-Range: bytes 0-0/<total>`; `*` means unknown
fn content_range_total(response: &Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    parse_content_range_total(value)
}

/// `(start, end)` from `bytes <start>-<end>/<total>`
fn parse_content_range_span(value: &str) -> Option<(u64, u64)> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, _) = range.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    let total = value.rsplit('/').next()?.trim();
    if total == "*" {
        return None;
    }
    total.parse::<u64>().ok()
}
