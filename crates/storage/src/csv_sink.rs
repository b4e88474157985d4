//! CSV log sink.

use crate::{RecordSink, SinkError};
use frame_codec::{FrameLayout, SampleFrame};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sink that appends each consumed frame as one CSV row: the two header
/// fields followed by one decimal column per payload byte, in declared
/// sensor order.
pub struct CsvLogSink {
    path: PathBuf,
    columns: Vec<String>,
    writer: Option<csv::Writer<File>>,
    header_written: bool,
    rows: u64,
}

impl CsvLogSink {
    /// Create the log file at `path`. The header row is written by the
    /// first `append`, so an untouched log stays empty.
    pub fn create(path: impl AsRef<Path>, layout: &FrameLayout) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&path)?;
        info!("CSV log sink created at {}", path.display());

        Ok(Self {
            path,
            columns: layout.column_names(),
            writer: Some(csv::Writer::from_writer(file)),
            header_written: false,
            rows: 0,
        })
    }

    /// Create a session log named `flight_<UTC timestamp>.csv` in `dir`.
    pub fn create_in_dir(dir: impl AsRef<Path>, layout: &FrameLayout) -> Result<Self, SinkError> {
        let file_name = format!("flight_{}.csv", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
        Self::create(dir.as_ref().join(file_name), layout)
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended so far, excluding the header.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }
}

impl RecordSink for CsvLogSink {
    fn append(&mut self, frame: &SampleFrame) -> Result<(), SinkError> {
        let header_written = self.header_written;
        let columns = &self.columns;
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;

        if !header_written {
            writer.write_record(columns)?;
            self.header_written = true;
        }

        let mut record = Vec::with_capacity(self.columns.len());
        record.push(frame.timestamp_ms.to_string());
        record.push(frame.sample_num.to_string());
        for payload in &frame.payloads {
            for byte in payload {
                record.push(byte.to_string());
            }
        }

        writer.write_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            debug!("Flushed {} rows to {}", self.rows, self.path.display());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            info!("CSV log sink closed: {} rows in {}", self.rows, self.path.display());
        }
        Ok(())
    }
}

impl Drop for CsvLogSink {
    fn drop(&mut self) {
        // Last-resort close; the consumer task closes explicitly.
        let _ = self.close();
    }
}
