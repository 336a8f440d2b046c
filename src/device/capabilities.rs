//! Device capability detection, refreshed on viewport resize

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Graphics API major version counted as the newer API
pub const MODERN_GRAPHICS_API_VERSION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    #[serde(rename = "mobile")]
    Mobile,
    #[serde(rename = "tablet")]
    Tablet,
    #[serde(rename = "desktop")]
    Desktop,
}

impl DeviceClass {
    /// Width < 768 is mobile; < 1024, or touch below 1366, is tablet
    pub fn classify(screen_width: u32, has_touch: bool) -> Self {
        if screen_width < 768 {
            DeviceClass::Mobile
        } else if screen_width < 1024 || (has_touch && screen_width < 1366) {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Mobile => write!(f, "mobile"),
            DeviceClass::Tablet => write!(f, "tablet"),
            DeviceClass::Desktop => write!(f, "desktop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub device_class: DeviceClass,
    pub has_touch: bool,
    pub screen_size: ScreenSize,
    pub pixel_ratio: f64,
    pub max_texture_size: u32,
    pub graphics_api_version: u8,
    pub has_battery_telemetry: bool,
    pub has_connection_telemetry: bool,
}

impl DeviceCapabilities {
    pub fn has_modern_graphics_api(&self) -> bool {
        self.graphics_api_version >= MODERN_GRAPHICS_API_VERSION
    }
}

/// Raw platform facts the probe reads
pub trait PlatformInfo: Send + Sync {
    fn screen_size(&self) -> ScreenSize;
    fn pixel_ratio(&self) -> f64;
    fn has_touch(&self) -> bool;
    fn max_texture_size(&self) -> u32;
    fn graphics_api_version(&self) -> u8;
    fn has_battery_telemetry(&self) -> bool;
    fn has_connection_telemetry(&self) -> bool;
}

/// Fixed platform description
#[derive(Debug, Clone, PartialEq)]
pub struct StaticPlatform {
    pub screen_size: ScreenSize,
    pub pixel_ratio: f64,
    pub has_touch: bool,
    pub max_texture_size: u32,
    pub graphics_api_version: u8,
    pub has_battery_telemetry: bool,
    pub has_connection_telemetry: bool,
}

impl Default for StaticPlatform {
    fn default() -> Self {
        Self::desktop()
    }
}

impl StaticPlatform {
    pub fn desktop() -> Self {
        Self {
            screen_size: ScreenSize {
                width: 1920,
                height: 1080,
            },
            pixel_ratio: 1.0,
            has_touch: false,
            max_texture_size: 4096,
            graphics_api_version: 2,
            has_battery_telemetry: false,
            has_connection_telemetry: false,
        }
    }

    pub fn phone() -> Self {
        Self {
            screen_size: ScreenSize {
                width: 390,
                height: 844,
            },
            pixel_ratio: 3.0,
            has_touch: true,
            max_texture_size: 2048,
            graphics_api_version: 1,
            has_battery_telemetry: true,
            has_connection_telemetry: true,
        }
    }

    pub fn with_screen(mut self, width: u32, height: u32) -> Self {
        self.screen_size = ScreenSize { width, height };
        self
    }
}

impl PlatformInfo for StaticPlatform {
    fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn has_touch(&self) -> bool {
        self.has_touch
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn graphics_api_version(&self) -> u8 {
        self.graphics_api_version
    }

    fn has_battery_telemetry(&self) -> bool {
        self.has_battery_telemetry
    }

    fn has_connection_telemetry(&self) -> bool {
        self.has_connection_telemetry
    }
}

/// Probes once at construction and again on each resize.
///
/// Subscribers see the latest [`DeviceCapabilities`]; readers never mutate it.
pub struct DeviceCapabilityProbe<P> {
    platform: P,
    capabilities: watch::Sender<DeviceCapabilities>,
}

impl<P: PlatformInfo> DeviceCapabilityProbe<P> {
    pub fn new(platform: P) -> Self {
        let initial = detect(&platform, platform.screen_size());
        let (capabilities, _) = watch::channel(initial);
        Self {
            platform,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceCapabilities> {
        self.capabilities.subscribe()
    }

    /// Re-read everything from the platform
    pub fn refresh(&self) -> DeviceCapabilities {
        self.publish(detect(&self.platform, self.platform.screen_size()))
    }

    /// Viewport changed; reclassify with the new size
    pub fn on_resize(&self, width: u32, height: u32) -> DeviceCapabilities {
        self.publish(detect(&self.platform, ScreenSize { width, height }))
    }

    fn publish(&self, detected: DeviceCapabilities) -> DeviceCapabilities {
        debug!(
            "device_probe: class={} screen={}x{} max_texture={}",
            detected.device_class,
            detected.screen_size.width,
            detected.screen_size.height,
            detected.max_texture_size
        );
        self.capabilities.send_if_modified(|current| {
            if *current == detected {
                false
            } else {
                *current = detected.clone();
                true
            }
        });
        detected
    }
}

fn detect(platform: &dyn PlatformInfo, screen_size: ScreenSize) -> DeviceCapabilities {
    let has_touch = platform.has_touch();
    DeviceCapabilities {
        device_class: DeviceClass::classify(screen_size.width, has_touch),
        has_touch,
        screen_size,
        pixel_ratio: platform.pixel_ratio(),
        max_texture_size: platform.max_texture_size(),
        graphics_api_version: platform.graphics_api_version(),
        has_battery_telemetry: platform.has_battery_telemetry(),
        has_connection_telemetry: platform.has_connection_telemetry(),
    }
}
