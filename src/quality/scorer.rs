//! Additive quality scoring

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionType;
use crate::device::{DeviceCapabilities, DeviceClass, LiveDeviceMetrics};

/// Minimum score for `High`
pub const HIGH_THRESHOLD: i32 = 6;
/// Minimum score for `Medium`
pub const MEDIUM_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "low")]
    Low,
    #[default]
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityTier::Low => write!(f, "low"),
            QualityTier::Medium => write!(f, "medium"),
            QualityTier::High => write!(f, "high"),
        }
    }
}

/// What the renderer applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationSettings {
    pub quality_tier: QualityTier,
    pub manual_override: bool,
}

/// Raw additive score for a device under current conditions
pub fn quality_score(capabilities: &DeviceCapabilities, metrics: &LiveDeviceMetrics) -> i32 {
    let mut score = match capabilities.device_class {
        DeviceClass::Desktop => 3,
        DeviceClass::Tablet => 2,
        DeviceClass::Mobile => 1,
    };

    let width = capabilities.screen_size.width;
    if width >= 1920 {
        score += 2;
    } else if width >= 1280 {
        score += 1;
    }

    if capabilities.has_modern_graphics_api() {
        score += 1;
    }
    if capabilities.max_texture_size >= 4096 {
        score += 1;
    }

    if !metrics.is_charging {
        if metrics.battery_level < 0.2 {
            score -= 2;
        } else if metrics.battery_level < 0.5 {
            score -= 1;
        }
    }

    score += match metrics.connection_effective_type {
        ConnectionType::FourG | ConnectionType::FiveG => 1,
        ConnectionType::ThreeG => -1,
        ConnectionType::TwoG => -2,
    };

    score
}

pub fn tier_for_score(score: i32) -> QualityTier {
    if score >= HIGH_THRESHOLD {
        QualityTier::High
    } else if score >= MEDIUM_THRESHOLD {
        QualityTier::Medium
    } else {
        QualityTier::Low
    }
}

/// Automatic tier, ignoring any override
pub fn score(capabilities: &DeviceCapabilities, metrics: &LiveDeviceMetrics) -> QualityTier {
    tier_for_score(quality_score(capabilities, metrics))
}

/// Scorer with a manual override.
///
/// The automatic score is always computed so it can be shown next to an override.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    manual_override: Option<QualityTier>,
    automatic_score: i32,
    automatic_tier: QualityTier,
}

impl QualityScorer {
    pub fn new(manual_override: Option<QualityTier>) -> Self {
        Self {
            manual_override,
            ..Self::default()
        }
    }

    pub fn set_manual_override(&mut self, tier: Option<QualityTier>) {
        self.manual_override = tier;
    }

    pub fn manual_override(&self) -> Option<QualityTier> {
        self.manual_override
    }

    pub fn automatic_score(&self) -> i32 {
        self.automatic_score
    }

    pub fn automatic_tier(&self) -> QualityTier {
        self.automatic_tier
    }

    pub fn evaluate(
        &mut self,
        capabilities: &DeviceCapabilities,
        metrics: &LiveDeviceMetrics,
    ) -> OptimizationSettings {
        self.automatic_score = quality_score(capabilities, metrics);
        self.automatic_tier = tier_for_score(self.automatic_score);
        self.settings()
    }

    /// Settings from the last evaluation and current override
    pub fn settings(&self) -> OptimizationSettings {
        match self.manual_override {
            Some(tier) => OptimizationSettings {
                quality_tier: tier,
                manual_override: true,
            },
            None => OptimizationSettings {
                quality_tier: self.automatic_tier,
                manual_override: false,
            },
        }
    }
}
