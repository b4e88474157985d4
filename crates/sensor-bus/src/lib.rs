//! Sensor Bus Abstraction
//!
//! Owns the static sensor configuration table and the `SensorSource`
//! seam the producer task acquires through. The bus handle is owned
//! exclusively by the producer; nothing else touches it.

mod error;
mod sim;

pub use error::SensorError;
pub use sim::SimulatedBus;

/// Static per-device configuration, read-only after initialization.
#[derive(Debug, Clone)]
pub struct SensorDescriptor {
    /// Human-readable name, used for log lines and sink column names
    pub name: String,
    /// 7-bit device address on the bus
    pub address: u8,
    /// Starting register for the data read
    pub data_reg: u8,
    /// Fixed payload length in bytes
    pub data_len: usize,
}

impl SensorDescriptor {
    /// Create a descriptor.
    pub fn new(name: &str, address: u8, data_reg: u8, data_len: usize) -> Self {
        Self {
            name: name.to_string(),
            address,
            data_reg,
            data_len,
        }
    }
}

/// The payload's default device table: IMU, barometer, magnetometer,
/// six data bytes each.
pub fn default_payload_set() -> Vec<SensorDescriptor> {
    vec![
        SensorDescriptor::new("imu", 0x68, 0x3B, 6),
        SensorDescriptor::new("baro", 0x76, 0xF7, 6),
        SensorDescriptor::new("mag", 0x1E, 0x03, 6),
    ]
}

/// Source of fixed-length sensor payloads, indexed by position in the
/// descriptor table. A read is one bounded bus transaction; failures
/// are per-sensor and never affect the other devices.
pub trait SensorSource {
    /// The configured device table, in declared sensor order.
    fn descriptors(&self) -> &[SensorDescriptor];

    /// Read one sensor's payload of its declared length.
    fn read_sensor(&mut self, index: usize) -> Result<Vec<u8>, SensorError>;
}
