//! Reactive quality controller - rescored whenever capabilities or metrics change

use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::scorer::{OptimizationSettings, QualityScorer, QualityTier};
use crate::device::{DeviceCapabilities, LiveDeviceMetrics};

pub struct QualityController {
    scorer: Mutex<QualityScorer>,
    capabilities: watch::Receiver<DeviceCapabilities>,
    metrics: watch::Receiver<LiveDeviceMetrics>,
    settings: watch::Sender<OptimizationSettings>,
}

impl QualityController {
    /// Scores immediately from the current values of both inputs
    pub fn new(
        capabilities: watch::Receiver<DeviceCapabilities>,
        metrics: watch::Receiver<LiveDeviceMetrics>,
        manual_override: Option<QualityTier>,
    ) -> Self {
        let mut scorer = QualityScorer::new(manual_override);
        let initial = {
            let caps = capabilities.borrow();
            let live = metrics.borrow();
            scorer.evaluate(&caps, &live)
        };
        let (settings, _) = watch::channel(initial);
        Self {
            scorer: Mutex::new(scorer),
            capabilities,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> OptimizationSettings {
        *self.settings.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<OptimizationSettings> {
        self.settings.subscribe()
    }

    pub fn automatic_tier(&self) -> QualityTier {
        self.lock().automatic_tier()
    }

    pub fn automatic_score(&self) -> i32 {
        self.lock().automatic_score()
    }

    pub fn set_manual_override(&self, tier: Option<QualityTier>) -> OptimizationSettings {
        self.lock().set_manual_override(tier);
        info!(
            "quality_override: {}",
            tier.map(|t| t.to_string()).unwrap_or_else(|| "auto".to_string())
        );
        self.recompute()
    }

    /// Rescore from the latest inputs and publish if the settings changed
    pub fn recompute(&self) -> OptimizationSettings {
        let settings = {
            let caps = self.capabilities.borrow().clone();
            let live = self.metrics.borrow().clone();
            let mut scorer = self.lock();
            let settings = scorer.evaluate(&caps, &live);
            debug!(
                "quality_score: score={} automatic={} applied={} override={}",
                scorer.automatic_score(),
                scorer.automatic_tier(),
                settings.quality_tier,
                settings.manual_override
            );
            settings
        };
        self.settings.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        });
        settings
    }

    /// Recompute on every input change until `token` fires or both inputs close
    pub fn spawn(self: std::sync::Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let mut capabilities = self.capabilities.clone();
        let mut metrics = self.metrics.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = capabilities.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        capabilities.borrow_and_update();
                    }
                    changed = metrics.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        metrics.borrow_and_update();
                    }
                }
                self.recompute();
            }
            debug!("quality_controller_stopped");
        })
    }

    fn lock(&self) -> MutexGuard<'_, QualityScorer> {
        self.scorer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
