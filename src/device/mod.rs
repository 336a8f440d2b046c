//! Device capability probing and platform telemetry

mod capabilities;
mod telemetry;

pub use capabilities::{
    DeviceCapabilities, DeviceCapabilityProbe, DeviceClass, PlatformInfo, ScreenSize,
    StaticPlatform, MODERN_GRAPHICS_API_VERSION,
};
pub use telemetry::{
    BatteryStatus, DefaultTelemetry, LiveDeviceMetrics, StaticTelemetry, TelemetryProvider,
};
