//! Quality tier selection from device capability and live telemetry

mod controller;
mod scorer;

pub use controller::QualityController;
pub use scorer::{
    quality_score, score, tier_for_score, OptimizationSettings, QualityScorer, QualityTier,
    HIGH_THRESHOLD, MEDIUM_THRESHOLD,
};
