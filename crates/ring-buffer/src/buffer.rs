//! Lock-Free Ring Buffer Implementation

use crate::signal::DataSignal;
use crate::RingConfigError;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default buffer capacity in bytes (64 samples of 64 bytes)
pub const DEFAULT_CAPACITY: usize = 4096;

/// State shared between the producer and consumer halves.
struct Shared {
    /// Pre-allocated byte storage, touched only through the cursor
    /// discipline below.
    storage: Box<[UnsafeCell<u8>]>,
    /// Capacity of the buffer in bytes
    capacity: usize,
    /// Write cursor. Monotonically increasing; wrapped only when
    /// indexing storage. Only the producer handle ever stores to it.
    write_pos: AtomicUsize,
    /// Read cursor, same discipline, owned by the consumer handle.
    read_pos: AtomicUsize,
    /// Committed writes (for statistics)
    total_writes: AtomicU64,
    /// Writes refused because free space was insufficient
    dropped: AtomicU64,
    /// Wake-up signal, one unit per committed write
    signal: DataSignal,
}

// SAFETY: the write cursor is advanced only by the single RingProducer
// and the read cursor only by the single RingConsumer. The producer
// mutates cells strictly above the last published read cursor, the
// consumer reads cells strictly below the last published write cursor,
// and the Release store on each cursor orders the byte accesses it
// publishes. Given `0 <= write_pos - read_pos <= capacity`, the two
// active regions never overlap.
unsafe impl Send for Shared {}
unsafe impl Sync for Shared {}

impl Shared {
    fn available(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        // The two loads are not one atomic snapshot: a monitor can
        // observe a read cursor that advanced past the write cursor it
        // loaded first. Clamp so the snapshot stays within capacity;
        // for the cursor-owning handles the value is exact.
        w.wrapping_sub(r).min(self.capacity)
    }

    fn free_space(&self) -> usize {
        self.capacity - self.available()
    }
}

/// A fixed-capacity SPSC byte ring buffer, not yet split into handles.
pub struct RingBuffer {
    shared: Arc<Shared>,
}

impl RingBuffer {
    /// Create a ring buffer of `capacity` bytes whose wake-up signal
    /// holds at most `signal_depth` pending units (one per sample the
    /// buffer can hold).
    pub fn with_capacity(capacity: usize, signal_depth: usize) -> Result<Self, RingConfigError> {
        if capacity == 0 {
            return Err(RingConfigError::ZeroCapacity);
        }
        if signal_depth == 0 {
            return Err(RingConfigError::ZeroSignalDepth);
        }

        let storage: Box<[UnsafeCell<u8>]> = (0..capacity).map(|_| UnsafeCell::new(0)).collect();
        Ok(Self {
            shared: Arc::new(Shared {
                storage,
                capacity,
                write_pos: AtomicUsize::new(0),
                read_pos: AtomicUsize::new(0),
                total_writes: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                signal: DataSignal::new(signal_depth),
            }),
        })
    }

    /// Split the buffer into its producer and consumer halves. Exactly
    /// one of each ever exists per buffer; neither handle is `Clone`.
    pub fn split(self) -> (RingProducer, RingConsumer) {
        let producer = RingProducer {
            shared: Arc::clone(&self.shared),
        };
        let consumer = RingConsumer {
            shared: self.shared,
        };
        (producer, consumer)
    }
}

/// Write half of the ring buffer. Sole owner of the write cursor.
pub struct RingProducer {
    shared: Arc<Shared>,
}

impl RingProducer {
    /// Write `bytes` as one unit. Returns the number of bytes
    /// committed: either `bytes.len()` or 0 when free space is
    /// insufficient (the caller-visible "buffer full, sample dropped"
    /// condition). Never blocks and never partially commits; a write
    /// longer than the whole buffer can never succeed.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let len = bytes.len();
        if len == 0 {
            return 0;
        }
        if self.shared.free_space() < len {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        let w = self.shared.write_pos.load(Ordering::Relaxed);
        for (i, byte) in bytes.iter().enumerate() {
            let idx = w.wrapping_add(i) % self.shared.capacity;
            // SAFETY: this cell lies in the writer-owned region between
            // the write cursor and read cursor + capacity; the consumer
            // never reads past the currently published write cursor.
            unsafe { *self.shared.storage[idx].get() = *byte };
        }

        // Publish the new cursor only after the copy is complete; the
        // consumer's Acquire load pairs with this Release store.
        self.shared
            .write_pos
            .store(w.wrapping_add(len), Ordering::Release);
        self.shared.total_writes.fetch_add(1, Ordering::Relaxed);

        // Signal only after the cursor is published, so a woken
        // consumer always sees the data it was woken for.
        self.shared.signal.notify();

        len
    }

    /// Advisory snapshot of the writable byte count.
    pub fn free_space(&self) -> usize {
        self.shared.free_space()
    }

    /// Read-only observability handle.
    pub fn monitor(&self) -> RingMonitor {
        RingMonitor {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read half of the ring buffer. Sole owner of the read cursor.
pub struct RingConsumer {
    shared: Arc<Shared>,
}

impl RingConsumer {
    /// Wait for the producer's wake-up signal, bounded by `timeout`.
    /// Returns false on timeout; an idle tick, not an error. The signal
    /// count is advisory, so callers should still consult
    /// [`available`](Self::available) when woken or after a timeout.
    pub async fn wait(&self, timeout: Duration) -> bool {
        self.shared.signal.wait(timeout).await
    }

    /// Copy up to `buf.len()` bytes out of the ring. Returns the count
    /// actually copied; 0 means the buffer was empty. Never blocks.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let available = self.shared.available();
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let r = self.shared.read_pos.load(Ordering::Relaxed);
        for (i, slot) in buf[..to_read].iter_mut().enumerate() {
            let idx = r.wrapping_add(i) % self.shared.capacity;
            // SAFETY: this cell lies below the write cursor published
            // before `available` was observed; the producer never
            // mutates cells below read cursor + capacity.
            *slot = unsafe { *self.shared.storage[idx].get() };
        }

        self.shared
            .read_pos
            .store(r.wrapping_add(to_read), Ordering::Release);

        to_read
    }

    /// Advisory snapshot of the readable byte count.
    pub fn available(&self) -> usize {
        self.shared.available()
    }

    /// Read-only observability handle.
    pub fn monitor(&self) -> RingMonitor {
        RingMonitor {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only observability handle. Never touches a cursor, so any
/// number of monitoring contexts may poll it alongside the two tasks.
#[derive(Clone)]
pub struct RingMonitor {
    shared: Arc<Shared>,
}

impl RingMonitor {
    /// Bytes currently readable (advisory snapshot).
    pub fn available(&self) -> usize {
        self.shared.available()
    }

    /// Bytes currently writable (advisory snapshot).
    pub fn free_space(&self) -> usize {
        self.shared.free_space()
    }

    /// Fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Fill ratio (0.0 to 1.0).
    pub fn fill_ratio(&self) -> f64 {
        self.shared.available() as f64 / self.shared.capacity as f64
    }

    /// Writes committed since construction.
    pub fn total_writes(&self) -> u64 {
        self.shared.total_writes.load(Ordering::Relaxed)
    }

    /// Writes refused for lack of free space.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
