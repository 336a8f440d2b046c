//! Asset loader facade: one transfer wired to connection monitoring and quality control

use std::sync::Arc;

use log::{info, warn};
use range_dl::{
    ChunkSource, HttpChunkSource, NoopEvents, ProgressiveTransfer, TransferEvents,
    TransferOutcome, TransferProgress,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheReporter, CacheStats};
use crate::config::LoaderConfig;
use crate::connection::ConnectionMonitor;
use crate::device::{DeviceCapabilities, LiveDeviceMetrics, TelemetryProvider};
use crate::error::Result;
use crate::quality::{OptimizationSettings, QualityController, QualityTier};
use crate::render::Renderer;

/// Point-in-time snapshot of a load, serializable for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct LoaderReport {
    pub progress: TransferProgress,
    pub settings: OptimizationSettings,
    pub automatic_tier: QualityTier,
    pub automatic_score: i32,
    pub connection: LiveDeviceMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    /// Unix seconds
    pub generated_at: i64,
}

pub struct AssetLoader<S> {
    transfer: ProgressiveTransfer<S>,
    monitor: Arc<ConnectionMonitor>,
    quality: Arc<QualityController>,
}

impl<S> Clone for AssetLoader<S> {
    fn clone(&self) -> Self {
        Self {
            transfer: self.transfer.clone(),
            monitor: self.monitor.clone(),
            quality: self.quality.clone(),
        }
    }
}

impl AssetLoader<HttpChunkSource> {
    pub fn from_url(
        url: impl Into<String>,
        config: &LoaderConfig,
        monitor: Arc<ConnectionMonitor>,
        capabilities: watch::Receiver<DeviceCapabilities>,
    ) -> Result<Self> {
        Self::new(
            HttpChunkSource::new(url)?,
            config,
            monitor,
            capabilities,
            Arc::new(NoopEvents),
        )
    }
}

impl<S: ChunkSource> AssetLoader<S> {
    /// Every completed chunk feeds `monitor`, which in turn feeds quality scoring.
    ///
    /// The monitor may be shared with other loaders; they all publish into the same live metrics.
    pub fn new(
        source: S,
        config: &LoaderConfig,
        monitor: Arc<ConnectionMonitor>,
        capabilities: watch::Receiver<DeviceCapabilities>,
        events: Arc<dyn TransferEvents>,
    ) -> Result<Self> {
        let transfer = ProgressiveTransfer::builder(source)
            .config(config.transfer.clone())
            .events(events)
            .throughput_sink(monitor.clone())
            .build()?;
        let quality = Arc::new(QualityController::new(
            capabilities,
            monitor.subscribe(),
            config.quality.override_tier(),
        ));
        Ok(Self {
            transfer,
            monitor,
            quality,
        })
    }

    pub fn transfer(&self) -> &ProgressiveTransfer<S> {
        &self.transfer
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub fn quality(&self) -> &Arc<QualityController> {
        &self.quality
    }

    pub fn progress(&self) -> TransferProgress {
        self.transfer.progress()
    }

    pub fn settings(&self) -> OptimizationSettings {
        self.quality.settings()
    }

    /// Keep quality settings current until `token` fires
    pub fn watch_quality(&self, token: CancellationToken) -> JoinHandle<()> {
        self.quality.clone().spawn(token)
    }

    pub fn refresh_telemetry(&self, provider: &dyn TelemetryProvider) -> OptimizationSettings {
        self.monitor.refresh_from(provider);
        self.quality.recompute()
    }

    pub fn set_manual_override(&self, tier: Option<QualityTier>) -> OptimizationSettings {
        self.quality.set_manual_override(tier)
    }

    /// Download the asset and hand it to `renderer` once complete
    pub async fn load<R: Renderer>(&self, renderer: &mut R) -> Result<TransferOutcome> {
        let outcome = self.transfer.start().await?;
        Ok(self.deliver(outcome, renderer))
    }

    pub async fn resume<R: Renderer>(&self, renderer: &mut R) -> Result<TransferOutcome> {
        let outcome = self.transfer.resume().await?;
        Ok(self.deliver(outcome, renderer))
    }

    pub fn pause(&self) -> bool {
        self.transfer.pause()
    }

    pub fn cancel(&self) {
        self.transfer.cancel()
    }

    pub fn report(&self, cache: Option<&dyn CacheReporter>) -> LoaderReport {
        LoaderReport {
            progress: self.transfer.progress(),
            settings: self.quality.settings(),
            automatic_tier: self.quality.automatic_tier(),
            automatic_score: self.quality.automatic_score(),
            connection: self.monitor.metrics(),
            cache: cache.map(|c| c.stats()),
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    fn deliver<R: Renderer>(&self, outcome: TransferOutcome, renderer: &mut R) -> TransferOutcome {
        match &outcome {
            TransferOutcome::Complete(bytes) => {
                let settings = self.quality.recompute();
                info!(
                    "asset_delivered: bytes={} quality={} override={}",
                    bytes.len(),
                    settings.quality_tier,
                    settings.manual_override
                );
                renderer.load_asset(bytes);
                renderer.apply_settings(&settings);
            }
            TransferOutcome::AlreadyRunning => {
                warn!("asset_load_ignored: transfer already running or paused");
            }
            TransferOutcome::Paused | TransferOutcome::Cancelled => {}
        }
        outcome
    }
}
