//! Star PI Payload Logger - Main Entry Point

use acquisition::{layout_for, Pipeline};
use anyhow::Result;
use daemon::{init_logging, Settings};
use sensor_bus::{SensorSource, SimulatedBus};
use std::sync::Arc;
use std::time::Duration;
use storage::{CsvLogSink, NullSink, RecordSink};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("=== Star PI Payload Logger v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load settings ({}); using defaults", e);
            Settings::default()
        }
    };

    let bus = SimulatedBus::with_defaults();
    let layout = layout_for(bus.descriptors());

    // Storage failure degrades to a discarding sink rather than
    // aborting: a payload that cannot log is still a payload.
    let sink: Box<dyn RecordSink + Send> =
        match CsvLogSink::create_in_dir(&settings.storage.data_dir, &layout) {
            Ok(sink) => {
                info!("Logging samples to {}", sink.path().display());
                Box::new(sink)
            }
            Err(e) => {
                error!("Failed to initialize storage ({}); proceeding without persistence", e);
                Box::new(NullSink::new())
            }
        };

    let pipeline = Pipeline::new(settings.pipeline_config(), bus, sink)?;
    let handles = pipeline.spawn();
    let monitor = handles.monitor.clone();
    let stats = Arc::clone(&handles.stats);

    info!("Both tasks spawned and running");

    // Low-priority monitoring context: read-only snapshots, never
    // touches a cursor.
    let mut status_tick = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = status_tick.tick() => {
                info!(
                    "Buffer: {}/{} bytes; produced {} dropped {} consumed {} sink errors {}",
                    monitor.available(),
                    monitor.capacity(),
                    stats.samples_produced(),
                    stats.samples_dropped(),
                    stats.samples_consumed(),
                    stats.sink_errors(),
                );
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
        }
    }

    handles.shutdown.request();
    handles.join().await;

    info!("Final stats: {}", serde_json::to_string(&stats.snapshot())?);
    Ok(())
}
