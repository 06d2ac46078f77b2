/// Application-provided storage for compiled shader binaries.

use crate::graphics_device::BinaryShaderFormat;
use super::content_hash::ResourceContentHash;

/// Persistent cache of driver-specific shader binaries, keyed by effect hash
///
/// A cached binary that the device refuses is reported through
/// `binary_shader_uploaded(hash, false)`; the effect is then compiled from
/// source and offered back to the cache.
pub trait BinaryShaderCache: Send + Sync {
    fn has_binary_shader(&self, effect_hash: ResourceContentHash) -> bool;
    fn binary_shader_format(&self, effect_hash: ResourceContentHash) -> Option<BinaryShaderFormat>;
    fn binary_shader_data(&self, effect_hash: ResourceContentHash) -> Option<Vec<u8>>;
    fn should_binary_shader_be_cached(&self, effect_hash: ResourceContentHash) -> bool;
    fn store_binary_shader(&self, effect_hash: ResourceContentHash, binary: &[u8], format: BinaryShaderFormat);
    fn binary_shader_uploaded(&self, effect_hash: ResourceContentHash, success: bool);
}
