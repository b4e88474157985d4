//! Decoded sample frame type.

use serde::{Deserialize, Serialize};

/// Fill pattern substituted for a sensor's payload slot when its read
/// fails. Indistinguishable in the record from a genuine all-ones
/// reading; the producer's failure counter is the only place the
/// distinction survives.
pub const SENTINEL_BYTE: u8 = 0xFF;

/// One decoded sample: a timestamped, sequence-numbered set of
/// fixed-length per-sensor payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFrame {
    /// Milliseconds since boot, wrapping at u32 range
    pub timestamp_ms: u32,
    /// Monotonically increasing, producer-owned sequence number
    pub sample_num: u32,
    /// Per-sensor payloads in declared sensor order
    pub payloads: Vec<Vec<u8>>,
}

impl SampleFrame {
    /// Create a frame with the given header fields and payloads.
    pub fn new(timestamp_ms: u32, sample_num: u32, payloads: Vec<Vec<u8>>) -> Self {
        Self {
            timestamp_ms,
            sample_num,
            payloads,
        }
    }

    /// Whether the given slot is entirely sentinel-filled.
    pub fn slot_is_sentinel(&self, slot: usize) -> bool {
        self.payloads
            .get(slot)
            .is_some_and(|p| !p.is_empty() && p.iter().all(|b| *b == SENTINEL_BYTE))
    }
}
