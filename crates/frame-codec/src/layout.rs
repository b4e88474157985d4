//! Fixed-offset frame layout and encode/decode.

use crate::frame::{SampleFrame, SENTINEL_BYTE};
use crate::FrameError;

/// Header length in bytes: u32 timestamp followed by u32 sequence
/// number, both little-endian like the acquisition target.
pub const HEADER_LEN: usize = 8;

/// One payload slot in the frame.
#[derive(Debug, Clone)]
struct Slot {
    name: String,
    offset: usize,
    len: usize,
}

/// Fixed binary layout of a sample frame, built once from the sensor
/// configuration and immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    slots: Vec<Slot>,
    frame_len: usize,
}

impl FrameLayout {
    /// Build a layout from `(name, payload_len)` pairs in declared
    /// sensor order.
    pub fn new<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut offset = HEADER_LEN;
        let slots: Vec<Slot> = slots
            .into_iter()
            .map(|(name, len)| {
                let slot = Slot {
                    name: name.into(),
                    offset,
                    len,
                };
                offset += len;
                slot
            })
            .collect();

        Self {
            slots,
            frame_len: offset,
        }
    }

    /// Total frame length in bytes, constant for the process lifetime.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Number of payload slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Payload length of the given slot.
    pub fn slot_len(&self, slot: usize) -> usize {
        self.slots[slot].len
    }

    /// Sentinel fill pattern for the given slot, substituted when that
    /// sensor's read fails so the record length never changes.
    pub fn sentinel_payload(&self, slot: usize) -> Vec<u8> {
        vec![SENTINEL_BYTE; self.slots[slot].len]
    }

    /// Column names for a tabular sink: the two header fields, then one
    /// column per payload byte in declared sensor order.
    pub fn column_names(&self) -> Vec<String> {
        let mut columns = vec!["timestamp_ms".to_string(), "sample_num".to_string()];
        for slot in &self.slots {
            for i in 0..slot.len {
                columns.push(format!("{}_b{}", slot.name, i));
            }
        }
        columns
    }

    /// Encode `frame` into `out`, which must be exactly one frame long.
    pub fn encode_into(&self, frame: &SampleFrame, out: &mut [u8]) -> Result<(), FrameError> {
        if out.len() != self.frame_len {
            return Err(FrameError::LengthMismatch {
                expected: self.frame_len,
                actual: out.len(),
            });
        }
        if frame.payloads.len() != self.slots.len() {
            return Err(FrameError::SlotCountMismatch {
                expected: self.slots.len(),
                actual: frame.payloads.len(),
            });
        }

        out[0..4].copy_from_slice(&frame.timestamp_ms.to_le_bytes());
        out[4..8].copy_from_slice(&frame.sample_num.to_le_bytes());

        for (i, (slot, payload)) in self.slots.iter().zip(&frame.payloads).enumerate() {
            if payload.len() != slot.len {
                return Err(FrameError::SlotLengthMismatch {
                    slot: i,
                    expected: slot.len,
                    actual: payload.len(),
                });
            }
            out[slot.offset..slot.offset + slot.len].copy_from_slice(payload);
        }

        Ok(())
    }

    /// Encode `frame` into a freshly allocated byte record.
    pub fn encode(&self, frame: &SampleFrame) -> Result<Vec<u8>, FrameError> {
        let mut out = vec![0u8; self.frame_len];
        self.encode_into(frame, &mut out)?;
        Ok(out)
    }

    /// Decode one frame from `bytes`, the exact inverse of
    /// [`encode`](Self::encode) at the same fixed offsets.
    pub fn decode(&self, bytes: &[u8]) -> Result<SampleFrame, FrameError> {
        if bytes.len() != self.frame_len {
            return Err(FrameError::LengthMismatch {
                expected: self.frame_len,
                actual: bytes.len(),
            });
        }

        let timestamp_ms = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let sample_num = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let payloads = self
            .slots
            .iter()
            .map(|slot| bytes[slot.offset..slot.offset + slot.len].to_vec())
            .collect();

        Ok(SampleFrame {
            timestamp_ms,
            sample_num,
            payloads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn three_sensor_layout() -> FrameLayout {
        FrameLayout::new([("imu", 6), ("baro", 6), ("mag", 6)])
    }

    #[test]
    fn test_frame_len_and_columns() {
        let layout = three_sensor_layout();
        assert_eq!(layout.frame_len(), HEADER_LEN + 18);

        let columns = layout.column_names();
        assert_eq!(columns.len(), 2 + 18);
        assert_eq!(columns[0], "timestamp_ms");
        assert_eq!(columns[1], "sample_num");
        assert_eq!(columns[2], "imu_b0");
        assert_eq!(columns[19], "mag_b0");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let layout = three_sensor_layout();
        let frame = SampleFrame::new(
            123_456,
            42,
            vec![
                vec![1, 2, 3, 4, 5, 6],
                vec![7, 8, 9, 10, 11, 12],
                vec![13, 14, 15, 16, 17, 18],
            ],
        );

        let bytes = layout.encode(&frame).unwrap();
        assert_eq!(bytes.len(), layout.frame_len());
        assert_eq!(&bytes[0..4], &123_456u32.to_le_bytes());

        let decoded = layout.decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_sentinel_slot_preserves_length() {
        let layout = three_sensor_layout();
        let frame = SampleFrame::new(
            10,
            1,
            vec![
                vec![1, 2, 3, 4, 5, 6],
                layout.sentinel_payload(1),
                vec![13, 14, 15, 16, 17, 18],
            ],
        );

        let bytes = layout.encode(&frame).unwrap();
        assert_eq!(bytes.len(), layout.frame_len());

        let decoded = layout.decode(&bytes).unwrap();
        assert!(!decoded.slot_is_sentinel(0));
        assert!(decoded.slot_is_sentinel(1));
        assert!(!decoded.slot_is_sentinel(2));
    }

    #[test]
    fn test_slot_length_mismatch_rejected() {
        let layout = three_sensor_layout();
        let frame = SampleFrame::new(0, 0, vec![vec![1, 2, 3], vec![0; 6], vec![0; 6]]);

        match layout.encode(&frame) {
            Err(FrameError::SlotLengthMismatch { slot: 0, .. }) => {}
            other => panic!("expected slot length mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_wrong_length_rejected() {
        let layout = three_sensor_layout();
        assert!(matches!(
            layout.decode(&[0u8; 10]),
            Err(FrameError::LengthMismatch { .. })
        ));
    }

    proptest! {
        // Round-trip yields field-for-field equality for every valid
        // combination of header fields and payload lengths.
        #[test]
        fn prop_round_trip(
            timestamp_ms in any::<u32>(),
            sample_num in any::<u32>(),
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..8), 1..5),
        ) {
            let layout =
                FrameLayout::new(payloads.iter().enumerate().map(|(i, p)| (format!("s{}", i), p.len())));
            let frame = SampleFrame::new(timestamp_ms, sample_num, payloads);

            let bytes = layout.encode(&frame).unwrap();
            prop_assert_eq!(bytes.len(), layout.frame_len());
            prop_assert_eq!(layout.decode(&bytes).unwrap(), frame);
        }
    }
}
