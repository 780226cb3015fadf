//! Rate mode: count rate-line edges over a fixed window.
//!
//! Reported in whole Hz, so anything below ~1 Hz reads as 0 or 1.

use std::time::Duration;

use crate::app::ports::{ClockPort, InterruptPort, Line, SignalPort};
use crate::isr::{self, IsrShared};

/// Count edges for `window` and return `round(count / elapsed_s)`.
pub fn run<B>(board: &mut B, shared: &IsrShared, window: Duration) -> u32
where
    B: SignalPort + InterruptPort + ClockPort + ?Sized,
{
    let window_us = window.as_micros() as u64;
    shared.reset();

    let start = board.now_us();
    board.enable(Line::Rate);
    let elapsed_us = loop {
        for _ in 0..board.take_latched(Line::Rate) {
            isr::rate_edge(shared, board);
        }
        let elapsed = board.now_us() - start;
        if elapsed >= window_us {
            break elapsed;
        }
        board.relax();
    };
    board.disable(Line::Rate);

    let count = shared.rate_count();
    let rate = hz(count, elapsed_us);
    log::info!("rate: {count} edges in {elapsed_us} us -> {rate} Hz");
    rate
}

fn hz(count: u32, elapsed_us: u64) -> u32 {
    if elapsed_us == 0 {
        return 0;
    }
    (f64::from(count) / (elapsed_us as f64 / 1e6)).round() as u32
}
