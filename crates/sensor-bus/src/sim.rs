//! Simulated sensor bus for testing and hardware-free runs.

use crate::{SensorDescriptor, SensorError, SensorSource};
use std::collections::HashSet;
use tracing::{debug, info};

/// Simulated bus producing deterministic pseudo-random payloads (no
/// hardware required). Individual sensors can be marked as failing to
/// exercise the sentinel-masking path.
pub struct SimulatedBus {
    descriptors: Vec<SensorDescriptor>,
    failing: HashSet<usize>,
    reads: u64,
}

impl SimulatedBus {
    /// Create a simulated bus over the given device table.
    pub fn new(descriptors: Vec<SensorDescriptor>) -> Self {
        info!("Creating simulated sensor bus with {} devices", descriptors.len());
        Self {
            descriptors,
            failing: HashSet::new(),
            reads: 0,
        }
    }

    /// Create a simulated bus over the default payload device table.
    pub fn with_defaults() -> Self {
        Self::new(crate::default_payload_set())
    }

    /// Mark a sensor as failing; subsequent reads return `Nack`.
    pub fn set_failing(&mut self, index: usize, failing: bool) {
        if failing {
            self.failing.insert(index);
        } else {
            self.failing.remove(&index);
        }
    }

    /// Deterministic payload derived from the read counter and device
    /// identity, so runs are reproducible.
    fn generate_payload(&self, descriptor: &SensorDescriptor) -> Vec<u8> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.reads.hash(&mut hasher);
        descriptor.address.hash(&mut hasher);
        descriptor.data_reg.hash(&mut hasher);
        let mut state = hasher.finish();

        (0..descriptor.data_len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 33) as u8
            })
            .collect()
    }
}

impl SensorSource for SimulatedBus {
    fn descriptors(&self) -> &[SensorDescriptor] {
        &self.descriptors
    }

    fn read_sensor(&mut self, index: usize) -> Result<Vec<u8>, SensorError> {
        let descriptor = self
            .descriptors
            .get(index)
            .ok_or(SensorError::UnknownSensor(index))?
            .clone();

        self.reads += 1;

        if self.failing.contains(&index) {
            debug!("Simulated NACK from {} (0x{:02X})", descriptor.name, descriptor.address);
            return Err(SensorError::Nack {
                address: descriptor.address,
            });
        }

        Ok(self.generate_payload(&descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_match_declared_length() {
        let mut bus = SimulatedBus::with_defaults();
        for i in 0..bus.descriptors().len() {
            let expected = bus.descriptors()[i].data_len;
            let payload = bus.read_sensor(i).unwrap();
            assert_eq!(payload.len(), expected);
        }
    }

    #[test]
    fn test_failing_sensor_nacks() {
        let mut bus = SimulatedBus::with_defaults();
        bus.set_failing(1, true);

        assert!(bus.read_sensor(0).is_ok());
        assert!(matches!(
            bus.read_sensor(1),
            Err(SensorError::Nack { address: 0x76 })
        ));
        assert!(bus.read_sensor(2).is_ok());

        bus.set_failing(1, false);
        assert!(bus.read_sensor(1).is_ok());
    }

    #[test]
    fn test_unknown_index_rejected() {
        let mut bus = SimulatedBus::with_defaults();
        assert!(matches!(
            bus.read_sensor(7),
            Err(SensorError::UnknownSensor(7))
        ));
    }

    #[test]
    fn test_payloads_vary_between_reads() {
        let mut bus = SimulatedBus::with_defaults();
        let first = bus.read_sensor(0).unwrap();
        let second = bus.read_sensor(0).unwrap();
        assert_ne!(first, second);
    }
}
