//! Progressive transfer - the state machine driving planner, downloader and reassembler
//!
//! Chunks are fetched one at a time in priority order. `pause()` aborts only the
//! in-flight chunk and keeps completed ones; `resume()` or a new `start()`
//! refetches everything not yet loaded. `cancel()` discards all state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::TransferConfig;
use crate::downloader::{ChunkSource, HttpChunkSource};
use crate::error::{Result, TransferError};
use crate::events::{NoopEvents, TransferEvents};
use crate::planner::plan;
use crate::reassembler::{loaded_bytes, reassemble_checked};
use crate::types::{Chunk, TransferProgress, TransferStage};

/// Receives one throughput sample per completed chunk
pub trait ThroughputSink: Send + Sync {
    fn record_sample(&self, bytes: u64, elapsed: Duration);
}

/// How a call to `start()`/`resume()` ended
#[derive(Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Every chunk loaded; the reassembled asset
    Complete(Vec<u8>),
    Paused,
    Cancelled,
    /// A run is already active or paused; nothing was done
    AlreadyRunning,
}

#[derive(Debug, Default)]
struct TransferState {
    stage: TransferStage,
    paused: bool,
    chunks: Vec<Chunk>,
    progress: TransferProgress,
    token: Option<CancellationToken>,
    /// Bumped on every run and on cancel; stale runs must not write
    generation: u64,
    elapsed_before: Duration,
    run_started: Option<Instant>,
}

impl TransferState {
    fn elapsed(&self) -> Duration {
        self.elapsed_before + self.run_started.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn stop_clock(&mut self) {
        if let Some(started) = self.run_started.take() {
            self.elapsed_before += started.elapsed();
        }
    }

    fn set_stage(&mut self, stage: TransferStage) {
        self.stage = stage;
        self.progress.stage = stage;
    }

    fn begin_run(&mut self) -> (CancellationToken, u64) {
        let token = CancellationToken::new();
        self.generation += 1;
        self.paused = false;
        self.progress.paused = false;
        self.token = Some(token.clone());
        self.run_started = Some(Instant::now());
        self.set_stage(TransferStage::Downloading);
        (token, self.generation)
    }

    fn refresh_progress(&mut self) {
        self.progress.bytes_loaded = loaded_bytes(&self.chunks);
        let elapsed = self.elapsed().as_secs_f64();
        self.progress.recompute(elapsed);
    }
}

struct Inner<S> {
    source: S,
    config: TransferConfig,
    events: Arc<dyn TransferEvents>,
    throughput: Option<Arc<dyn ThroughputSink>>,
    state: Mutex<TransferState>,
}

/// Handle to a single asset transfer. Clones share the same transfer.
pub struct ProgressiveTransfer<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for ProgressiveTransfer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct TransferBuilder<S> {
    source: S,
    config: TransferConfig,
    events: Arc<dyn TransferEvents>,
    throughput: Option<Arc<dyn ThroughputSink>>,
}

impl<S: ChunkSource> TransferBuilder<S> {
    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    pub fn events(mut self, events: Arc<dyn TransferEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn throughput_sink(mut self, sink: Arc<dyn ThroughputSink>) -> Self {
        self.throughput = Some(sink);
        self
    }

    pub fn build(self) -> Result<ProgressiveTransfer<S>> {
        self.config.validate()?;
        Ok(ProgressiveTransfer {
            inner: Arc::new(Inner {
                source: self.source,
                config: self.config,
                events: self.events,
                throughput: self.throughput,
                state: Mutex::new(TransferState::default()),
            }),
        })
    }
}

impl ProgressiveTransfer<HttpChunkSource> {
    /// Transfer of `url` over HTTP range requests
    pub fn from_url(url: impl Into<String>, config: TransferConfig) -> Result<Self> {
        Self::builder(HttpChunkSource::new(url)?).config(config).build()
    }
}

impl<S: ChunkSource> ProgressiveTransfer<S> {
    pub fn builder(source: S) -> TransferBuilder<S> {
        TransferBuilder {
            source,
            config: TransferConfig::default(),
            events: Arc::new(NoopEvents),
            throughput: None,
        }
    }

    pub fn new(source: S, config: TransferConfig) -> Result<Self> {
        Self::builder(source).config(config).build()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.inner.config
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn progress(&self) -> TransferProgress {
        self.lock().progress.clone()
    }

    pub fn stage(&self) -> TransferStage {
        self.lock().stage
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Snapshot of the current chunk list
    pub fn chunks(&self) -> Vec<Chunk> {
        self.lock().chunks.clone()
    }

    /// Begin (or retry) the transfer.
    ///
    /// No-op while downloading or paused. From `Error` or `Complete` the existing
    /// plan is kept and only chunks not yet loaded are fetched.
    pub async fn start(&self) -> Result<TransferOutcome> {
        let (token, generation, snapshot) = {
            let mut state = self.lock();
            if state.stage == TransferStage::Downloading || state.paused {
                debug!("transfer_start_ignored: {} already running", self.label());
                return Ok(TransferOutcome::AlreadyRunning);
            }
            let (token, generation) = state.begin_run();
            (token, generation, state.progress.clone())
        };
        info!(
            "transfer_start: {} chunk_size={} priority={}",
            self.label(),
            self.inner.config.chunk_size_bytes,
            self.inner.config.priority_level
        );
        self.inner.events.on_progress_update(&snapshot);
        self.run(token, generation).await
    }

    /// Re-enter the download loop after `pause()`, skipping loaded chunks.
    ///
    /// When not paused this behaves like `start()`.
    pub async fn resume(&self) -> Result<TransferOutcome> {
        let resumed = {
            let mut state = self.lock();
            if state.paused {
                let (token, generation) = state.begin_run();
                Some((token, generation, state.progress.clone()))
            } else {
                None
            }
        };
        let Some((token, generation, snapshot)) = resumed else {
            return self.start().await;
        };
        info!("transfer_resume: {}", self.label());
        self.inner.events.on_progress_update(&snapshot);
        self.run(token, generation).await
    }

    /// Abort the in-flight chunk and freeze progress. Returns false if not downloading.
    pub fn pause(&self) -> bool {
        let snapshot = {
            let mut state = self.lock();
            if state.stage != TransferStage::Downloading || state.paused {
                return false;
            }
            state.paused = true;
            state.progress.paused = true;
            if let Some(token) = state.token.take() {
                token.cancel();
            }
            state.stop_clock();
            state.progress.clone()
        };
        info!(
            "transfer_paused: {} bytes_loaded={}",
            self.label(),
            snapshot.bytes_loaded
        );
        self.inner.events.on_progress_update(&snapshot);
        true
    }

    /// Abort any in-flight fetch and discard all chunk data and progress
    pub fn cancel(&self) {
        let snapshot = {
            let mut state = self.lock();
            if let Some(token) = state.token.take() {
                token.cancel();
            }
            let generation = state.generation + 1;
            *state = TransferState {
                generation,
                ..TransferState::default()
            };
            state.progress.clone()
        };
        info!("transfer_cancelled: {}", self.label());
        self.inner.events.on_progress_update(&snapshot);
    }

    async fn run(&self, token: CancellationToken, generation: u64) -> Result<TransferOutcome> {
        let needs_plan = self.lock().chunks.is_empty();
        if needs_plan {
            let probed = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(self.interrupted(generation)),
                probed = self.inner.source.probe_size() => probed,
            };
            let total_bytes = match probed {
                Ok(0) => return self.fail(generation, TransferError::SizeUnknown),
                Ok(total_bytes) => total_bytes,
                Err(e) => return self.fail(generation, e),
            };
            let config = &self.inner.config;
            let chunks = match plan(total_bytes, config.chunk_size_bytes, config.priority_level) {
                Ok(chunks) => chunks,
                Err(e) => return self.fail(generation, e),
            };

            let snapshot = {
                let mut state = self.lock();
                if state.generation != generation {
                    return Ok(TransferOutcome::Cancelled);
                }
                state.progress.bytes_total = total_bytes;
                state.progress.total_chunks = chunks.len();
                state.chunks = chunks;
                state.refresh_progress();
                state.progress.clone()
            };
            info!(
                "transfer_plan: {} total_bytes={} chunks={}",
                self.label(),
                total_bytes,
                snapshot.total_chunks
            );
            self.inner.events.on_progress_update(&snapshot);
        }

        self.download_loop(&token, generation).await
    }

    async fn download_loop(
        &self,
        token: &CancellationToken,
        generation: u64,
    ) -> Result<TransferOutcome> {
        let order = fetch_order(&self.lock().chunks);

        for index in order {
            // Checked immediately before issuing each request
            if token.is_cancelled() {
                return Ok(self.interrupted(generation));
            }

            let chunk = {
                let mut state = self.lock();
                if state.generation != generation {
                    return Ok(TransferOutcome::Cancelled);
                }
                if state.chunks[index].is_loaded() {
                    continue;
                }
                state.progress.current_chunk_index = index;
                state.chunks[index].clone()
            };

            debug!(
                "chunk_fetch_start: {} chunk={} range={}..={}",
                self.label(),
                index,
                chunk.byte_range_start(),
                chunk.byte_range_end()
            );
            let fetch_timer = Instant::now();
            let result = self.inner.source.fetch_chunk(&chunk, token).await;

            match result {
                Ok(data) => {
                    let elapsed = fetch_timer.elapsed();
                    let received = data.len() as u64;
                    if let Some(sink) = &self.inner.throughput {
                        sink.record_sample(received, elapsed);
                    }
                    let snapshot = {
                        let mut state = self.lock();
                        if state.generation != generation {
                            return Ok(TransferOutcome::Cancelled);
                        }
                        state.chunks[index].mark_loaded(data);
                        state.refresh_progress();
                        state.progress.clone()
                    };
                    debug!(
                        "chunk_fetch_done: {} chunk={} bytes={} elapsed_ms={}",
                        self.label(),
                        index,
                        received,
                        elapsed.as_millis()
                    );
                    self.inner.events.on_progress_update(&snapshot);
                }
                Err(e) if e.is_cancelled() => return Ok(self.interrupted(generation)),
                Err(e) => {
                    warn!(
                        "chunk_fetch_failed: {} chunk={} error={}",
                        self.label(),
                        index,
                        e
                    );
                    let snapshot = {
                        let mut state = self.lock();
                        if state.generation != generation {
                            return Ok(TransferOutcome::Cancelled);
                        }
                        state.chunks[index].mark_failed(e.to_string());
                        state.refresh_progress();
                        state.progress.clone()
                    };
                    self.inner.events.on_progress_update(&snapshot);
                }
            }

            tokio::task::yield_now().await;
        }

        self.finish(generation)
    }

    /// Downloading -> Parsing -> Complete, or Error when chunks are missing
    fn finish(&self, generation: u64) -> Result<TransferOutcome> {
        let parsing = {
            let mut state = self.lock();
            if state.generation != generation {
                return Ok(TransferOutcome::Cancelled);
            }
            let failed = state.chunks.iter().filter(|c| !c.is_loaded()).count();
            if failed > 0 && failed == state.chunks.len() {
                drop(state);
                return self.fail(generation, TransferError::AllChunksFailed { failed });
            }
            state.set_stage(TransferStage::Parsing);
            state.progress.clone()
        };
        self.inner.events.on_progress_update(&parsing);

        let (buffer, snapshot) = {
            let mut state = self.lock();
            if state.generation != generation {
                return Ok(TransferOutcome::Cancelled);
            }
            let total_bytes = state.progress.bytes_total;
            match reassemble_checked(&state.chunks, total_bytes) {
                Ok(buffer) => {
                    state.stop_clock();
                    state.token = None;
                    state.set_stage(TransferStage::Complete);
                    state.refresh_progress();
                    state.progress.percentage = 100.0;
                    state.progress.eta_sec = 0.0;
                    (buffer, state.progress.clone())
                }
                Err(e) => {
                    drop(state);
                    return self.fail(generation, e);
                }
            }
        };

        info!(
            "transfer_complete: {} bytes={} elapsed_sec={:.2}",
            self.label(),
            buffer.len(),
            snapshot.time_elapsed_sec
        );
        self.inner.events.on_progress_update(&snapshot);
        self.inner.events.on_load_complete();
        Ok(TransferOutcome::Complete(buffer))
    }

    /// The run's token fired: either a pause (state kept) or a cancel (state gone)
    fn interrupted(&self, generation: u64) -> TransferOutcome {
        let state = self.lock();
        if state.generation == generation && state.paused {
            debug!("transfer_run_stopped: {} paused", self.label());
            TransferOutcome::Paused
        } else {
            TransferOutcome::Cancelled
        }
    }

    fn fail(&self, generation: u64, err: TransferError) -> Result<TransferOutcome> {
        let snapshot = {
            let mut state = self.lock();
            if state.generation != generation {
                return Ok(TransferOutcome::Cancelled);
            }
            state.stop_clock();
            state.token = None;
            state.set_stage(TransferStage::Error);
            state.progress.clone()
        };
        error!("transfer_failed: {} error={}", self.label(), err);
        self.inner.events.on_progress_update(&snapshot);
        self.inner.events.on_load_error(&err);
        Err(err)
    }

    fn label(&self) -> &str {
        self.inner.source.label()
    }

    fn lock(&self) -> MutexGuard<'_, TransferState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Chunk indices by priority descending, ties by planned index ascending
pub(crate) fn fetch_order(chunks: &[Chunk]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..chunks.len()).collect();
    order.sort_by(|a, b| {
        chunks[*b]
            .priority()
            .cmp(&chunks[*a].priority())
            .then(chunks[*a].id().cmp(&chunks[*b].id()))
    });
    order
}
