//! Interrupt-shared acquisition state.
//!
//! Produced by the edge bodies (burst capture, rate counting), consumed by
//! the dispatcher's spin loop.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ burst edge  │────▶│  group queue     │────▶│ DeferredSender │──▶ datagram
//! │ (4 samples) │     │  (lock-free SPSC)│     │ (scheduler tick)│
//! └─────────────┘     └──────────────────┘     └────────────────┘
//!        │
//!        └──▶ burst_count (atomic)
//! ```
//!
//! Everything here is atomics only, so a `static IsrShared` can be touched
//! from a real GPIO ISR as well as from a test.

use core::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::app::ports::{AnalogPort, SignalPort};
use crate::protocol::codec::{SAMPLES_PER_GROUP, SampleGroup};

/// Slots in the group queue.  Power of 2; one slot is kept free.
pub const GROUP_QUEUE_CAP: usize = 64;

/// Counters and the group queue shared with interrupt context.
pub struct IsrShared {
    burst_count: AtomicU64,
    rate_count: AtomicU32,
    dropped: AtomicU32,
    head: AtomicUsize,
    tail: AtomicUsize,
    slots: [AtomicU64; GROUP_QUEUE_CAP],
}

impl IsrShared {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY: AtomicU64 = AtomicU64::new(0);
        Self {
            burst_count: AtomicU64::new(0),
            rate_count: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots: [EMPTY; GROUP_QUEUE_CAP],
        }
    }

    /// Clear counters and empty the queue.  Only call while both edge
    /// lines are disabled.
    pub fn reset(&self) {
        self.burst_count.store(0, Ordering::Relaxed);
        self.rate_count.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.head.store(0, Ordering::Release);
    }

    pub fn burst_count(&self) -> u64 {
        self.burst_count.load(Ordering::Acquire)
    }

    pub fn rate_count(&self) -> u32 {
        self.rate_count.load(Ordering::Acquire)
    }

    /// Groups lost because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    // ── SPSC queue ────────────────────────────────────────────

    /// Producer side.  Returns `false` if the queue is full.
    pub fn push_group(&self, group: SampleGroup) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next = (head + 1) % GROUP_QUEUE_CAP;
        if next == tail {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.slots[head].store(pack(group), Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side.  FIFO order.
    pub fn pop_group(&self) -> Option<SampleGroup> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let raw = self.slots[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) % GROUP_QUEUE_CAP, Ordering::Release);
        Some(unpack(raw))
    }

    pub fn queued(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + GROUP_QUEUE_CAP - tail) % GROUP_QUEUE_CAP
    }
}

impl Default for IsrShared {
    fn default() -> Self {
        Self::new()
    }
}

// ── Edge bodies ───────────────────────────────────────────────

/// Burst edge: one timed 4-sample read, enqueue, count.
///
/// The count advances even when the group is dropped, so a burst always
/// terminates at its target.
pub fn burst_edge<A: AnalogPort + ?Sized>(shared: &IsrShared, adc: &mut A) {
    let mut group = [0u16; SAMPLES_PER_GROUP];
    adc.read_timed(&mut group);
    shared.push_group(group);
    shared.burst_count.fetch_add(1, Ordering::AcqRel);
}

/// Rate edge: count and clear the peak hold.
pub fn rate_edge<S: SignalPort + ?Sized>(shared: &IsrShared, signals: &mut S) {
    shared.rate_count.fetch_add(1, Ordering::AcqRel);
    signals.pulse_clear();
}

fn pack(group: SampleGroup) -> u64 {
    group
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, s)| acc | (u64::from(*s) << (16 * i)))
}

fn unpack(raw: u64) -> SampleGroup {
    core::array::from_fn(|i| (raw >> (16 * i)) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp(u16);

    impl AnalogPort for Ramp {
        fn read_timed(&mut self, out: &mut [u16]) {
            for s in out {
                *s = self.0;
                self.0 += 1;
            }
        }
    }

    #[derive(Default)]
    struct ClearCounter(u32);

    impl SignalPort for ClearCounter {
        fn set_polarity(&mut self, _bit: bool) {}
        fn set_test_pulse(&mut self, _on: bool) {}
        fn pulse_clear(&mut self) {
            self.0 += 1;
        }
    }

    #[test]
    fn queue_is_fifo() {
        let shared = IsrShared::new();
        assert!(shared.push_group([1, 2, 3, 4]));
        assert!(shared.push_group([5, 6, 7, 0xFFFF]));
        assert_eq!(shared.queued(), 2);
        assert_eq!(shared.pop_group(), Some([1, 2, 3, 4]));
        assert_eq!(shared.pop_group(), Some([5, 6, 7, 0xFFFF]));
        assert_eq!(shared.pop_group(), None);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let shared = IsrShared::new();
        for i in 0..GROUP_QUEUE_CAP - 1 {
            assert!(shared.push_group([i as u16; 4]));
        }
        assert!(!shared.push_group([0; 4]));
        assert_eq!(shared.dropped(), 1);
        assert_eq!(shared.pop_group(), Some([0; 4]));
    }

    #[test]
    fn burst_edge_reads_enqueues_and_counts() {
        let shared = IsrShared::new();
        let mut adc = Ramp(10);
        burst_edge(&shared, &mut adc);
        burst_edge(&shared, &mut adc);
        assert_eq!(shared.burst_count(), 2);
        assert_eq!(shared.pop_group(), Some([10, 11, 12, 13]));
        assert_eq!(shared.pop_group(), Some([14, 15, 16, 17]));
    }

    #[test]
    fn rate_edge_strobes_clear_line() {
        let shared = IsrShared::new();
        let mut sig = ClearCounter::default();
        for _ in 0..3 {
            rate_edge(&shared, &mut sig);
        }
        assert_eq!(shared.rate_count(), 3);
        assert_eq!(sig.0, 3);
    }

    #[test]
    fn reset_clears_everything() {
        let shared = IsrShared::new();
        burst_edge(&shared, &mut Ramp(0));
        shared.reset();
        assert_eq!(shared.burst_count(), 0);
        assert_eq!(shared.queued(), 0);
        assert_eq!(shared.pop_group(), None);
    }
}
