//! Interrupt burst mode.
//!
//! ```text
//!  burst edge ──▶ burst_edge() ──▶ IsrShared queue ──▶ DeferredSender::tick()
//!                                                        │
//!                      ┌─────── 512-sample ring ─────────┤
//!                      │  half A (256)  │  half B (256)  │──▶ one datagram per half
//!                      └────────────────┴────────────────┘
//! ```
//!
//! The edge body does the timed read and enqueues; everything that
//! touches the network happens in [`DeferredSender::tick`], called from
//! the dispatcher's spin loop.

use crate::app::ports::{AnalogPort, ClockPort, InterruptPort, Line};
use crate::error::Result;
use crate::isr::{self, IsrShared};
use crate::protocol::codec::{
    BURST_BLOCK_SAMPLES, BURST_BUFFER_SAMPLES, SAMPLES_PER_GROUP, encode_samples,
};
use crate::protocol::{Datagram, drain};

/// Copies queued groups into the circular send buffer and sends each half
/// as it completes.
pub struct DeferredSender {
    buf: [u16; BURST_BUFFER_SAMPLES],
    /// Groups consumed so far.
    consumed: u64,
    /// Datagrams handed to the link.
    sent: u32,
}

impl DeferredSender {
    pub fn new() -> Self {
        Self {
            buf: [0; BURST_BUFFER_SAMPLES],
            consumed: 0,
            sent: 0,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn datagrams_sent(&self) -> u32 {
        self.sent
    }

    /// Next write offset into `buf`.
    fn pos(&self) -> usize {
        ((self.consumed as usize) * SAMPLES_PER_GROUP) % BURST_BUFFER_SAMPLES
    }

    /// Consume every queued group, sending each half of the buffer as it
    /// fills.  Returns the number of groups consumed.
    pub fn tick<D: Datagram + ?Sized>(&mut self, shared: &IsrShared, link: &mut D) -> usize {
        let mut n = 0;
        while let Some(group) = shared.pop_group() {
            let pos = self.pos();
            self.buf[pos..pos + SAMPLES_PER_GROUP].copy_from_slice(&group);
            self.consumed += 1;
            n += 1;

            let end = pos + SAMPLES_PER_GROUP;
            if end % BURST_BLOCK_SAMPLES == 0 {
                self.send_range(end - BURST_BLOCK_SAMPLES, end, link);
            }
        }
        n
    }

    /// Consume what is left and flush the partially filled half.
    pub fn finish<D: Datagram + ?Sized>(&mut self, shared: &IsrShared, link: &mut D) {
        self.tick(shared, link);
        let fill = self.pos();
        let start = fill - fill % BURST_BLOCK_SAMPLES;
        if fill > start {
            self.send_range(start, fill, link);
        }
    }

    fn send_range<D: Datagram + ?Sized>(&mut self, start: usize, end: usize, link: &mut D) {
        let mut wire = [0u8; BURST_BLOCK_SAMPLES * 2];
        let len = encode_samples(&self.buf[start..end], &mut wire);
        // A lost block is not retried.
        match link.send(&wire[..len]) {
            Ok(()) => self.sent += 1,
            Err(e) => log::warn!("burst: send failed: {e}"),
        }
    }
}

impl Default for DeferredSender {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture `target` edge-triggered groups and send them on `link`.
///
/// Blocks until the target is reached; there is no abort.
pub fn run<B, D>(board: &mut B, link: &mut D, shared: &IsrShared, target: u64) -> Result<()>
where
    B: AnalogPort + InterruptPort + ClockPort + ?Sized,
    D: Datagram + ?Sized,
{
    shared.reset();
    let mut sender = DeferredSender::new();

    board.enable(Line::Burst);
    while shared.burst_count() < target {
        for _ in 0..board.take_latched(Line::Burst) {
            if shared.burst_count() >= target {
                break;
            }
            isr::burst_edge(shared, board);
            // A latched backlog can exceed the queue capacity.
            sender.tick(shared, link);
        }
        board.relax();
    }
    board.disable(Line::Burst);

    sender.finish(shared, link);
    if shared.dropped() > 0 {
        log::warn!("burst: {} groups dropped, queue full", shared.dropped());
    }
    log::info!(
        "burst: {} groups in {} datagrams",
        sender.consumed(),
        sender.datagrams_sent()
    );

    drain(link)?;
    Ok(())
}
