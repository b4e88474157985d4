//! Consumer task: drains frames from the ring buffer and persists them
//! through the record sink.

use crate::pipeline::{PipelineStats, ShutdownFlag};
use frame_codec::FrameLayout;
use ring_buffer::RingConsumer;
use std::sync::Arc;
use std::time::Duration;
use storage::RecordSink;
use tracing::{error, info, warn};

/// The storage-side task. Sole owner of the sink handle and the ring
/// buffer's read cursor.
pub struct ConsumerTask<K: RecordSink> {
    sink: K,
    layout: FrameLayout,
    ring: RingConsumer,
    wait_timeout: Duration,
    flush_every: u64,
    stats: Arc<PipelineStats>,
    rows_since_flush: u64,
    scratch: Vec<u8>,
}

impl<K: RecordSink> ConsumerTask<K> {
    pub(crate) fn new(
        sink: K,
        layout: FrameLayout,
        ring: RingConsumer,
        wait_timeout: Duration,
        flush_every: u64,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let scratch = vec![0u8; layout.frame_len()];
        Self {
            sink,
            layout,
            ring,
            wait_timeout,
            flush_every: flush_every.max(1),
            stats,
            rows_since_flush: 0,
            scratch,
        }
    }

    /// Pull one frame out of the ring and hand it to the sink. Returns
    /// true if bytes were consumed. Sink failures are counted and the
    /// loop keeps draining: stalling here would surface as buffer-full
    /// drops on the producer side.
    pub fn drain_one(&mut self) -> bool {
        let frame_len = self.layout.frame_len();
        let n = self.ring.read(&mut self.scratch);
        if n == 0 {
            return false;
        }
        if n != frame_len {
            // Writes are whole frames, so a partial read means the
            // producer contract was violated upstream.
            warn!("Discarding {} stray bytes from the ring", n);
            return true;
        }

        match self.layout.decode(&self.scratch) {
            Ok(frame) => {
                self.stats.record_consumed();
                if let Err(e) = self.sink.append(&frame) {
                    self.stats.record_sink_error();
                    warn!("Sink append failed for sample {}: {}", frame.sample_num, e);
                }
                self.rows_since_flush += 1;
                if self.rows_since_flush >= self.flush_every {
                    self.flush();
                }
            }
            Err(e) => {
                warn!("Undecodable frame: {}", e);
            }
        }
        true
    }

    fn flush(&mut self) {
        self.rows_since_flush = 0;
        match self.sink.flush() {
            Ok(()) => self.stats.record_flush(),
            Err(e) => {
                self.stats.record_sink_error();
                warn!("Sink flush failed: {}", e);
            }
        }
    }

    /// Block (bounded) on the wake-up signal and drain until shutdown,
    /// then empty the ring's tail and close the sink. The sink is
    /// closed on every exit path.
    pub async fn run(mut self, shutdown: ShutdownFlag) {
        info!(
            "Consumer task started: {} byte frames, flush every {} rows",
            self.layout.frame_len(),
            self.flush_every
        );

        let frame_len = self.layout.frame_len();
        while !shutdown.is_set() {
            if self.ring.wait(self.wait_timeout).await {
                self.drain_one();
            } else if self.ring.available() >= frame_len {
                // The signal saturated or a wake was missed; the data
                // itself is authoritative.
                self.drain_one();
            }
            // A timeout with nothing available is an idle tick.
        }

        // Drain the tail: the producer stops within one polling
        // interval of the flag, so keep going until a full wait window
        // passes with nothing new.
        loop {
            while self.drain_one() {}
            if !self.ring.wait(self.wait_timeout).await && self.ring.available() < frame_len {
                break;
            }
        }

        if let Err(e) = self.sink.close() {
            self.stats.record_sink_error();
            error!("Failed to close sink: {}", e);
        }
        info!(
            "Consumer task stopped: {} rows persisted, {} sink errors",
            self.stats.samples_consumed(),
            self.stats.sink_errors()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring_buffer::{RingBuffer, RingProducer};
    use storage::MemorySink;

    fn layout() -> FrameLayout {
        FrameLayout::new([("imu", 6), ("baro", 6), ("mag", 6)])
    }

    fn build_consumer(
        sink: MemorySink,
        capacity_frames: usize,
    ) -> (ConsumerTask<MemorySink>, RingProducer) {
        let layout = layout();
        let capacity = layout.frame_len() * capacity_frames;
        let (ring_producer, ring_consumer) = RingBuffer::with_capacity(capacity, capacity_frames)
            .unwrap()
            .split();
        let stats = Arc::new(PipelineStats::default());
        let consumer = ConsumerTask::new(
            sink,
            layout,
            ring_consumer,
            Duration::from_millis(20),
            2,
            stats,
        );
        (consumer, ring_producer)
    }

    fn encoded_frame(sample_num: u32) -> Vec<u8> {
        let layout = layout();
        let frame = frame_codec::SampleFrame::new(
            sample_num * 10,
            sample_num,
            vec![vec![1; 6], vec![2; 6], vec![3; 6]],
        );
        layout.encode(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_idle_timeout_is_not_an_error() {
        let (mut consumer, _producer) = build_consumer(MemorySink::new(), 4);

        // No data ever arrives: the bounded wait simply reports no
        // data and the loop would tick again.
        assert!(!consumer.ring.wait(Duration::from_millis(30)).await);
        assert!(!consumer.drain_one());
        assert_eq!(consumer.stats.samples_consumed(), 0);
        assert_eq!(consumer.stats.sink_errors(), 0);
    }

    #[tokio::test]
    async fn test_drain_decodes_and_appends() {
        let (mut consumer, mut producer) = build_consumer(MemorySink::new(), 4);

        producer.write(&encoded_frame(0));
        producer.write(&encoded_frame(1));

        assert!(consumer.ring.wait(Duration::from_millis(10)).await);
        assert!(consumer.drain_one());
        assert!(consumer.drain_one());
        assert!(!consumer.drain_one());

        assert_eq!(consumer.stats.samples_consumed(), 2);
        assert_eq!(consumer.sink.rows().len(), 2);
        assert_eq!(consumer.sink.rows()[1].sample_num, 1);
        // flush_every = 2, so the cadence fired exactly once.
        assert_eq!(consumer.sink.flushes(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_draining() {
        let mut sink = MemorySink::new();
        sink.fail_appends(true);
        let (mut consumer, mut producer) = build_consumer(sink, 4);

        producer.write(&encoded_frame(0));
        producer.write(&encoded_frame(1));

        assert!(consumer.drain_one());
        assert!(consumer.drain_one());

        // Both frames were consumed even though persistence failed,
        // keeping the ring from backing up.
        assert_eq!(consumer.stats.samples_consumed(), 2);
        assert_eq!(consumer.stats.sink_errors(), 2);
        assert_eq!(consumer.ring.available(), 0);
    }

    #[tokio::test]
    async fn test_run_drains_tail_and_closes_sink() {
        let (consumer, mut producer) = build_consumer(MemorySink::new(), 8);
        let stats = Arc::clone(&consumer.stats);

        for i in 0..5 {
            producer.write(&encoded_frame(i));
        }

        let shutdown = ShutdownFlag::new();
        shutdown.request();
        consumer.run(shutdown).await;

        // Everything already buffered was persisted before close.
        assert_eq!(stats.samples_consumed(), 5);
    }
}
