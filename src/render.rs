//! Rendering-side collaborator: receives the finished asset and quality changes

use crate::quality::OptimizationSettings;

pub trait Renderer: Send {
    /// Called once with the fully reassembled asset bytes
    fn load_asset(&mut self, bytes: &[u8]);

    fn apply_settings(&mut self, settings: &OptimizationSettings);
}
