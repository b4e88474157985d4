//! Sample Frame Codec
//!
//! Defines the fixed-size binary record that flows through the ring
//! buffer: a millisecond timestamp, a producer-owned sequence number,
//! and one fixed-length payload slot per configured sensor, packed at
//! compile-time-known offsets with no padding and no in-band lengths.

mod frame;
mod layout;

pub use frame::{SampleFrame, SENTINEL_BYTE};
pub use layout::{FrameLayout, HEADER_LEN};

use thiserror::Error;

/// Errors raised while encoding or decoding a sample frame
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame carries the wrong number of payload slots for the layout
    #[error("expected {expected} payload slots, got {actual}")]
    SlotCountMismatch { expected: usize, actual: usize },

    /// One payload slot has the wrong length for its descriptor
    #[error("slot {slot}: expected {expected} bytes, got {actual}")]
    SlotLengthMismatch {
        slot: usize,
        expected: usize,
        actual: usize,
    },

    /// Byte buffer does not match the fixed frame length
    #[error("expected a {expected}-byte frame, got {actual} bytes")]
    LengthMismatch { expected: usize, actual: usize },
}
