//! Storage Layer
//!
//! Sinks that persist consumed sample frames as rows of a structured
//! log. The sink handle is owned exclusively by the consumer task,
//! which also controls the flush cadence.

mod csv_sink;
mod memory;

pub use csv_sink::CsvLogSink;
pub use memory::{MemorySink, NullSink};

use frame_codec::SampleFrame;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Sink is closed")]
    Closed,
}

/// Destination for consumed sample frames.
///
/// `append` persists one frame as one row; the first append on a fresh
/// target is responsible for the header row. `flush` makes appended
/// rows durable; `close` is idempotent and safe to call any number of
/// times.
pub trait RecordSink {
    /// Append one frame as a single row.
    fn append(&mut self, frame: &SampleFrame) -> Result<(), SinkError>;

    /// Make appended rows durable.
    fn flush(&mut self) -> Result<(), SinkError>;

    /// Flush and release the target. Idempotent.
    fn close(&mut self) -> Result<(), SinkError>;
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn append(&mut self, frame: &SampleFrame) -> Result<(), SinkError> {
        (**self).append(frame)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}
