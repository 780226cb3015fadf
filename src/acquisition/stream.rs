//! Streaming mode: free-running timed samples, bit-packed with their
//! timestamps and sent in fixed-size chunks on the stream channel.

use crate::app::ports::{AnalogPort, ClockPort};
use crate::protocol::Datagram;
use crate::protocol::codec::{STREAM_CHUNK_PAIRS, STREAM_CHUNK_WORDS, TimedSample, encode_words};

/// Sample `target` values every `period_us`, timestamped from the first
/// sample, and send them in chunks of [`STREAM_CHUNK_PAIRS`].
///
/// The final chunk is zero-filled past the target and sent full size.
/// Chunks are never acknowledged; a failed send is logged and skipped.
/// Returns the number of chunks handed to the link.
pub fn run<B, D>(board: &mut B, link: &mut D, target: u32, period_us: u32) -> u32
where
    B: AnalogPort + ClockPort + ?Sized,
    D: Datagram + ?Sized,
{
    let mut words = [0u32; STREAM_CHUNK_WORDS];
    let mut wire = [0u8; STREAM_CHUNK_WORDS * 4];
    let mut filled = 0usize;
    let mut chunks = 0u32;
    let mut sample = [0u16; 1];

    let start = board.now_us();
    let mut due = start;
    for _ in 0..target {
        while board.now_us() < due {
            board.relax();
        }
        board.read_timed(&mut sample);
        let t_us = board.now_us() - start;
        words[2 * filled..2 * filled + 2].copy_from_slice(&TimedSample::pack(sample[0], t_us));
        filled += 1;
        due += u64::from(period_us);

        if filled == STREAM_CHUNK_PAIRS {
            chunks += send_chunk(&words, &mut wire, link);
            filled = 0;
        }
    }

    if filled > 0 {
        words[2 * filled..].fill(0);
        chunks += send_chunk(&words, &mut wire, link);
    }
    log::info!("stream: {target} samples in {chunks} chunks");
    chunks
}

fn send_chunk<D: Datagram + ?Sized>(
    words: &[u32; STREAM_CHUNK_WORDS],
    wire: &mut [u8; STREAM_CHUNK_WORDS * 4],
    link: &mut D,
) -> u32 {
    encode_words(words, wire);
    match link.send(&wire[..]) {
        Ok(()) => 1,
        Err(e) => {
            log::warn!("stream: send failed: {e}");
            0
        }
    }
}
