//! Sensor Bus Error Types

use thiserror::Error;

/// Errors that can occur during a sensor bus transaction
#[derive(Debug, Error)]
pub enum SensorError {
    /// Bus-level I/O error
    #[error("Bus error: {0}")]
    BusError(String),

    /// Device did not acknowledge its address
    #[error("Device 0x{address:02X} did not acknowledge")]
    Nack { address: u8 },

    /// Timeout waiting for the transaction to complete
    #[error("Timeout waiting for sensor response after {0}ms")]
    Timeout(u64),

    /// Device returned fewer bytes than its declared payload length
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Sensor index outside the configured device table
    #[error("Sensor index {0} is not configured")]
    UnknownSensor(usize),
}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::BusError(err.to_string())
    }
}
