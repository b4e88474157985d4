//! In-memory and discarding sinks.

use crate::{RecordSink, SinkError};
use frame_codec::SampleFrame;
use tracing::warn;

/// Sink that discards every row. Used when persistent storage fails to
/// initialize and the pipeline degrades rather than aborting.
#[derive(Debug, Default)]
pub struct NullSink {
    rows: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows accepted (and discarded) so far.
    pub fn rows_discarded(&self) -> u64 {
        self.rows
    }
}

impl RecordSink for NullSink {
    fn append(&mut self, _frame: &SampleFrame) -> Result<(), SinkError> {
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink keeping every appended frame, with injectable
/// append/flush failures. The pipeline tests use it to observe exactly
/// what reached persistence.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<SampleFrame>,
    flushes: u64,
    closed: bool,
    fail_appends: bool,
    fail_flushes: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail.
    pub fn fail_appends(&mut self, fail: bool) {
        self.fail_appends = fail;
    }

    /// Make subsequent flushes fail.
    pub fn fail_flushes(&mut self, fail: bool) {
        self.fail_flushes = fail;
    }

    /// Frames appended so far.
    pub fn rows(&self) -> &[SampleFrame] {
        &self.rows
    }

    /// Number of flushes performed.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Whether the sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, frame: &SampleFrame) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        if self.fail_appends {
            return Err(SinkError::Io(std::io::Error::new(std::io::ErrorKind::Other, "injected append failure")));
        }
        self.rows.push(frame.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        if self.fail_flushes {
            warn!("Injected flush failure");
            return Err(SinkError::Io(std::io::Error::new(std::io::ErrorKind::Other, "injected flush failure")));
        }
        self.flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if !self.closed {
            // First close performs the final flush exactly once.
            self.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sample_num: u32) -> SampleFrame {
        SampleFrame::new(0, sample_num, vec![vec![1, 2, 3]])
    }

    #[test]
    fn test_memory_sink_records_rows() {
        let mut sink = MemorySink::new();
        sink.append(&frame(1)).unwrap();
        sink.append(&frame(2)).unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.rows().len(), 2);
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn test_close_idempotent_single_final_flush() {
        let mut sink = MemorySink::new();
        sink.append(&frame(1)).unwrap();

        sink.close().unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(sink.is_closed());
        assert_eq!(sink.flushes(), 1);
        assert!(matches!(sink.append(&frame(2)), Err(SinkError::Closed)));
    }

    #[test]
    fn test_injected_failures() {
        let mut sink = MemorySink::new();
        sink.fail_appends(true);
        assert!(sink.append(&frame(1)).is_err());

        sink.fail_appends(false);
        sink.fail_flushes(true);
        sink.append(&frame(1)).unwrap();
        assert!(sink.flush().is_err());
    }

    #[test]
    fn test_null_sink_counts_and_discards() {
        let mut sink = NullSink::new();
        sink.append(&frame(1)).unwrap();
        sink.append(&frame(2)).unwrap();
        sink.flush().unwrap();
        sink.close().unwrap();
        assert_eq!(sink.rows_discarded(), 2);
    }
}
