//! Battery and connection telemetry behind an injectable provider

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// 0.0 - 1.0
    pub level: f64,
    pub is_charging: bool,
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            level: 1.0,
            is_charging: true,
        }
    }
}

/// Live metrics consumed by quality scoring.
///
/// Defaults (full battery, charging, 4g) apply whenever telemetry is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDeviceMetrics {
    pub battery_level: f64,
    pub is_charging: bool,
    pub connection_effective_type: ConnectionType,
    pub estimated_speed_mbps: f64,
}

impl Default for LiveDeviceMetrics {
    fn default() -> Self {
        Self {
            battery_level: 1.0,
            is_charging: true,
            connection_effective_type: ConnectionType::FourG,
            estimated_speed_mbps: 0.0,
        }
    }
}

/// Platform battery/connection APIs. Either may be unavailable.
pub trait TelemetryProvider: Send + Sync {
    fn battery(&self) -> Option<BatteryStatus>;

    fn connection_type(&self) -> Option<ConnectionType>;
}

/// Provider for environments without telemetry
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTelemetry;

impl TelemetryProvider for DefaultTelemetry {
    fn battery(&self) -> Option<BatteryStatus> {
        None
    }

    fn connection_type(&self) -> Option<ConnectionType> {
        None
    }
}

/// Fixed readings, for headless use and tests
#[derive(Debug, Clone, Default)]
pub struct StaticTelemetry {
    pub battery: Option<BatteryStatus>,
    pub connection: Option<ConnectionType>,
}

impl StaticTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_battery(mut self, level: f64, is_charging: bool) -> Self {
        self.battery = Some(BatteryStatus { level, is_charging });
        self
    }

    pub fn with_connection(mut self, connection: ConnectionType) -> Self {
        self.connection = Some(connection);
        self
    }
}

impl TelemetryProvider for StaticTelemetry {
    fn battery(&self) -> Option<BatteryStatus> {
        self.battery
    }

    fn connection_type(&self) -> Option<ConnectionType> {
        self.connection
    }
}
