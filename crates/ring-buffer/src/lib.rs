//! Lock-Free SPSC Byte Ring Buffer
//!
//! Bridges the acquisition task and the storage task without a mutex.
//! The buffer is split at construction time into a write-only producer
//! handle and a read-only consumer handle, so the single-writer-per-cursor
//! rule that makes the lock omission sound is enforced by the type system
//! rather than by convention.

mod buffer;
mod signal;

pub use buffer::{RingBuffer, RingConsumer, RingMonitor, RingProducer, DEFAULT_CAPACITY};

use thiserror::Error;

/// Errors raised while constructing a ring buffer
#[derive(Debug, Error)]
pub enum RingConfigError {
    #[error("ring capacity must be non-zero")]
    ZeroCapacity,
    #[error("wake-up signal depth must be non-zero")]
    ZeroSignalDepth,
}
