//! Progressive, network- and device-adaptive asset loading
//!
//! Wires the `range-dl` chunked transfer engine to:
//! - Connection monitoring fed by per-chunk throughput samples
//! - Device capability probing with resize refresh
//! - Battery/connection telemetry behind an injectable provider
//! - Reactive quality scoring with a manual override

pub mod cache;
pub mod config;
pub mod connection;
pub mod device;
mod error;
pub mod loader;
pub mod quality;
pub mod render;

pub use cache::{CacheReporter, CacheStats};
pub use config::{LoaderConfig, QualityConfig};
pub use connection::{ConnectionMonitor, ConnectionType};
pub use device::{
    BatteryStatus, DefaultTelemetry, DeviceCapabilities, DeviceCapabilityProbe, DeviceClass,
    LiveDeviceMetrics, PlatformInfo, ScreenSize, StaticPlatform, StaticTelemetry,
    TelemetryProvider,
};
pub use error::{LoaderError, Result};
pub use loader::{AssetLoader, LoaderReport};
pub use quality::{OptimizationSettings, QualityController, QualityScorer, QualityTier};
pub use render::Renderer;
