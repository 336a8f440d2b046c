//! Connection monitoring - network class and live throughput estimate

use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use range_dl::{ThroughputSink, BYTES_PER_MB};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::device::{BatteryStatus, LiveDeviceMetrics, TelemetryProvider};

/// Smoothing factor for the throughput estimate
const SPEED_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[default]
    #[serde(rename = "4g")]
    FourG,
    #[serde(rename = "5g")]
    FiveG,
}

impl ConnectionType {
    /// Classify a measured speed in MB/s
    pub fn classify(speed_mbps: f64) -> Self {
        if speed_mbps < 0.05 {
            ConnectionType::TwoG
        } else if speed_mbps < 0.5 {
            ConnectionType::ThreeG
        } else if speed_mbps < 5.0 {
            ConnectionType::FourG
        } else {
            ConnectionType::FiveG
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionType::TwoG => write!(f, "2g"),
            ConnectionType::ThreeG => write!(f, "3g"),
            ConnectionType::FourG => write!(f, "4g"),
            ConnectionType::FiveG => write!(f, "5g"),
        }
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow-2g" | "2g" => Ok(ConnectionType::TwoG),
            "3g" => Ok(ConnectionType::ThreeG),
            "4g" => Ok(ConnectionType::FourG),
            "5g" => Ok(ConnectionType::FiveG),
            other => Err(format!("Unknown connection type: {}", other)),
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    estimate_mbps: Option<f64>,
    reported: Option<ConnectionType>,
}

/// Tracks connection class and speed, publishing [`LiveDeviceMetrics`].
///
/// A platform-reported class wins over one derived from measured speed.
/// Publishing is replace-on-update; the last writer wins.
pub struct ConnectionMonitor {
    state: Mutex<MonitorState>,
    metrics: watch::Sender<LiveDeviceMetrics>,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        let (metrics, _) = watch::channel(LiveDeviceMetrics::default());
        Self {
            state: Mutex::new(MonitorState::default()),
            metrics,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveDeviceMetrics> {
        self.metrics.subscribe()
    }

    pub fn metrics(&self) -> LiveDeviceMetrics {
        self.metrics.borrow().clone()
    }

    pub fn estimated_speed_mbps(&self) -> f64 {
        self.lock().estimate_mbps.unwrap_or(0.0)
    }

    pub fn effective_type(&self) -> ConnectionType {
        let state = self.lock();
        effective_type(&state)
    }

    /// Fold one transfer sample into the smoothed estimate
    pub fn record_sample(&self, bytes: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 || bytes == 0 {
            return;
        }
        let sample = bytes as f64 / BYTES_PER_MB / secs;
        let (estimate, effective) = {
            let mut state = self.lock();
            let estimate = match state.estimate_mbps {
                Some(prev) => SPEED_ALPHA * sample + (1.0 - SPEED_ALPHA) * prev,
                None => sample,
            };
            state.estimate_mbps = Some(estimate);
            (estimate, effective_type(&state))
        };
        debug!(
            "connection_sample: sample_mbps={:.3} estimate_mbps={:.3} type={}",
            sample, estimate, effective
        );
        self.metrics.send_modify(|m| {
            m.estimated_speed_mbps = estimate;
            m.connection_effective_type = effective;
        });
    }

    /// Platform report of the connection class; `None` falls back to measurement
    pub fn set_reported_type(&self, reported: Option<ConnectionType>) {
        let effective = {
            let mut state = self.lock();
            state.reported = reported;
            effective_type(&state)
        };
        self.metrics
            .send_modify(|m| m.connection_effective_type = effective);
    }

    /// Battery state; `None` restores the always-available defaults
    pub fn set_battery(&self, battery: Option<BatteryStatus>) {
        let battery = battery.unwrap_or_default();
        self.metrics.send_modify(|m| {
            m.battery_level = battery.level.clamp(0.0, 1.0);
            m.is_charging = battery.is_charging;
        });
    }

    /// Pull a snapshot from platform telemetry
    pub fn refresh_from(&self, provider: &dyn TelemetryProvider) {
        self.set_reported_type(provider.connection_type());
        self.set_battery(provider.battery());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ThroughputSink for ConnectionMonitor {
    fn record_sample(&self, bytes: u64, elapsed: Duration) {
        ConnectionMonitor::record_sample(self, bytes, elapsed);
    }
}

fn effective_type(state: &MonitorState) -> ConnectionType {
    state
        .reported
        .or_else(|| state.estimate_mbps.map(ConnectionType::classify))
        .unwrap_or_default()
}
