//! Pipeline context: configuration, shared counters, shutdown flag.

use crate::{ConsumerTask, ProducerTask};
use frame_codec::FrameLayout;
use ring_buffer::{RingBuffer, RingConfigError, RingMonitor};
use sensor_bus::{SensorDescriptor, SensorSource};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storage::RecordSink;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Configuration for the acquisition pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Ring buffer capacity in bytes (default: 4096)
    pub buffer_capacity: usize,
    /// Producer polling interval (default: 500 ms)
    pub poll_interval: Duration,
    /// Consumer bounded wait on the wake-up signal (default: 1000 ms)
    pub wait_timeout: Duration,
    /// Rows between durable flushes (default: 32)
    pub flush_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 4096,
            poll_interval: Duration::from_millis(500),
            wait_timeout: Duration::from_millis(1000),
            flush_every: 32,
        }
    }
}

/// Shared stop flag, checked at each task's loop head.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; both tasks exit their loops promptly.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared pipeline counters. All updates are Relaxed; the counters are
/// observability data, not synchronization.
#[derive(Debug, Default)]
pub struct PipelineStats {
    samples_produced: AtomicU64,
    samples_dropped: AtomicU64,
    sensor_failures: AtomicU64,
    samples_consumed: AtomicU64,
    sink_errors: AtomicU64,
    flushes: AtomicU64,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub samples_produced: u64,
    pub samples_dropped: u64,
    pub sensor_failures: u64,
    pub samples_consumed: u64,
    pub sink_errors: u64,
    pub flushes: u64,
}

impl PipelineStats {
    pub(crate) fn record_produced(&self) {
        self.samples_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sensor_failure(&self) {
        self.sensor_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_consumed(&self) {
        self.samples_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Samples assembled by the producer, dropped or not.
    pub fn samples_produced(&self) -> u64 {
        self.samples_produced.load(Ordering::Relaxed)
    }

    /// Samples refused by a full ring buffer.
    pub fn samples_dropped(&self) -> u64 {
        self.samples_dropped.load(Ordering::Relaxed)
    }

    /// Individual sensor reads masked with the sentinel pattern.
    pub fn sensor_failures(&self) -> u64 {
        self.sensor_failures.load(Ordering::Relaxed)
    }

    /// Frames pulled out of the ring by the consumer.
    pub fn samples_consumed(&self) -> u64 {
        self.samples_consumed.load(Ordering::Relaxed)
    }

    /// Failed sink appends and flushes.
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    /// Durable flushes performed.
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_produced: self.samples_produced(),
            samples_dropped: self.samples_dropped(),
            sensor_failures: self.sensor_failures(),
            samples_consumed: self.samples_consumed(),
            sink_errors: self.sink_errors(),
            flushes: self.flushes(),
        }
    }
}

/// Frame layout derived from a sensor descriptor table: one payload
/// slot per device, in declared order.
pub fn layout_for(descriptors: &[SensorDescriptor]) -> FrameLayout {
    FrameLayout::new(descriptors.iter().map(|d| (d.name.clone(), d.data_len)))
}

/// The constructed pipeline: both tasks plus their shared context.
/// Owns every collaborator explicitly; there is no process-wide state.
pub struct Pipeline<S: SensorSource, K: RecordSink> {
    producer: ProducerTask<S>,
    consumer: ConsumerTask<K>,
    monitor: RingMonitor,
    stats: Arc<PipelineStats>,
    shutdown: ShutdownFlag,
}

impl<S: SensorSource, K: RecordSink> Pipeline<S, K> {
    /// Build the pipeline: frame layout from the sensor table, ring
    /// buffer sized from the configuration, tasks wired to their
    /// exclusive handles.
    pub fn new(config: PipelineConfig, source: S, sink: K) -> Result<Self, RingConfigError> {
        let layout = layout_for(source.descriptors());
        let frame_len = layout.frame_len();

        if config.buffer_capacity % frame_len != 0 {
            warn!(
                "Buffer capacity {} is not a multiple of the {}-byte frame; {} bytes of slack",
                config.buffer_capacity,
                frame_len,
                config.buffer_capacity % frame_len
            );
        }

        let signal_depth = (config.buffer_capacity / frame_len).max(1);
        let ring = RingBuffer::with_capacity(config.buffer_capacity, signal_depth)?;
        let (ring_producer, ring_consumer) = ring.split();
        let monitor = ring_producer.monitor();
        let stats = Arc::new(PipelineStats::default());

        info!(
            "Pipeline configured: {} byte ring, {} byte frames, {} sensors",
            config.buffer_capacity,
            frame_len,
            source.descriptors().len()
        );

        let producer = ProducerTask::new(
            source,
            layout.clone(),
            ring_producer,
            config.poll_interval,
            Arc::clone(&stats),
        );
        let consumer = ConsumerTask::new(
            sink,
            layout,
            ring_consumer,
            config.wait_timeout,
            config.flush_every,
            Arc::clone(&stats),
        );

        Ok(Self {
            producer,
            consumer,
            monitor,
            stats,
            shutdown: ShutdownFlag::new(),
        })
    }

    pub fn monitor(&self) -> RingMonitor {
        self.monitor.clone()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Spawn both tasks onto the runtime. In production each lands on
    /// its own worker thread of the multi-threaded runtime.
    pub fn spawn(self) -> PipelineHandles
    where
        S: Send + 'static,
        K: Send + 'static,
    {
        let producer_shutdown = self.shutdown.clone();
        let consumer_shutdown = self.shutdown.clone();

        PipelineHandles {
            producer: tokio::spawn(self.producer.run(producer_shutdown)),
            consumer: tokio::spawn(self.consumer.run(consumer_shutdown)),
            monitor: self.monitor,
            stats: self.stats,
            shutdown: self.shutdown,
        }
    }
}

/// Handles to a running pipeline.
pub struct PipelineHandles {
    pub producer: JoinHandle<()>,
    pub consumer: JoinHandle<()>,
    pub monitor: RingMonitor,
    pub stats: Arc<PipelineStats>,
    pub shutdown: ShutdownFlag,
}

impl PipelineHandles {
    /// Wait for both tasks to exit.
    pub async fn join(self) {
        let _ = self.producer.await;
        let _ = self.consumer.await;
    }
}
