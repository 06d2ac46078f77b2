/// Content-derived identity of client resources.

use std::fmt;
use std::hash::Hasher;
use rustc_hash::FxHasher;

/// 128-bit hash of a resource's content
///
/// Identical content always maps to the same hash, which lets scenes share
/// one device upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceContentHash {
    pub low: u64,
    pub high: u64,
}

impl ResourceContentHash {
    pub const INVALID: ResourceContentHash = ResourceContentHash { low: 0, high: 0 };

    /// Hash from its two halves
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    /// Hash a byte blob
    pub fn compute(bytes: &[u8]) -> Self {
        Self::compute_tagged(&[], bytes)
    }

    /// Hash a byte blob prefixed by `tags` (kind, format...), so equal bytes
    /// describing different resources never collide
    pub fn compute_tagged(tags: &[u32], bytes: &[u8]) -> Self {
        let mut low = FxHasher::default();
        for tag in tags {
            low.write_u32(*tag);
        }
        low.write(bytes);
        let low = low.finish();

        let mut high = FxHasher::default();
        high.write_u64(bytes.len() as u64);
        high.write_u64(low);
        high.write(bytes);
        Self { low, high: high.finish() }
    }

    /// False for `INVALID`
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for ResourceContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high, self.low)
    }
}
