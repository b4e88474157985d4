//! Acquisition Pipeline
//!
//! Wires the sensor source, the SPSC ring buffer, and the record sink
//! into two long-running tasks: a producer polling sensors on a fixed
//! cadence and a consumer draining frames into persistent storage. The
//! only synchronization point between them is the ring buffer; every
//! failure inside a task is recovered locally and surfaces as a counter
//! and a log line.

mod consumer;
mod pipeline;
mod producer;

pub use consumer::ConsumerTask;
pub use pipeline::{
    layout_for, Pipeline, PipelineConfig, PipelineHandles, PipelineStats, ShutdownFlag,
    StatsSnapshot,
};
pub use producer::ProducerTask;

// Observability handle, re-exported for the monitoring context.
pub use ring_buffer::RingMonitor;
