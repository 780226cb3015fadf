//! Fixed-size payload codecs.
//!
//! Sample groups (burst and polled modes) travel as raw u16 LE samples:
//! ```text
//! ┌────────┬────────┬────────┬────────┐
//! │ s0 u16 │ s1 u16 │ s2 u16 │ s3 u16 │   × n groups
//! └────────┴────────┴────────┴────────┘
//! ```
//!
//! Timed samples (streaming mode) travel as u32 LE word pairs:
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ word0: secs  │ word1: µs[31:12] │ adc[11:0] │   × n pairs
//! └──────────────┴──────────────────────────────┘
//! ```

use crate::error::{Error, Result};

/// Receive buffers are sized to this; anything larger is truncated.
pub const MAX_DATAGRAM: usize = 2048;

/// Samples taken by one fixed-duration timed read.
pub const SAMPLES_PER_GROUP: usize = 4;

/// Four consecutive samples from one timed read.
pub type SampleGroup = [u16; SAMPLES_PER_GROUP];

/// Bytes in one polled-mode record.
pub const GROUP_BYTES: usize = SAMPLES_PER_GROUP * 2;

/// Circular send buffer used by burst mode, in samples.
pub const BURST_BUFFER_SAMPLES: usize = 512;

/// Burst mode flushes one half of the send buffer at a time.
pub const BURST_BLOCK_SAMPLES: usize = BURST_BUFFER_SAMPLES / 2;

/// TimedSample word pairs in one streaming chunk.
pub const STREAM_CHUNK_PAIRS: usize = 190;

/// u32 words in one streaming chunk.
pub const STREAM_CHUNK_WORDS: usize = STREAM_CHUNK_PAIRS * 2;

/// Maximum length of the free-text state label.
pub const STATE_LABEL_MAX: usize = 32;

/// Largest value representable by the 12-bit converter.
pub const ADC_MAX: u16 = 0x0FFF;

const ADC_MASK: u32 = 0x0FFF;
const MICROS_MASK: u32 = 0x000F_FFFF;
const MICROS_SHIFT: u32 = 12;
const MICROS_PER_SEC: u64 = 1_000_000;

// ── Counts ────────────────────────────────────────────────────

/// Decode a u32 LE count payload.
pub fn decode_u32(bytes: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(Error::Payload("expected 4-byte count"))?;
    Ok(u32::from_le_bytes(raw))
}

/// Decode a u64 LE count payload.
pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or(Error::Payload("expected 8-byte count"))?;
    Ok(u64::from_le_bytes(raw))
}

// ── Sample groups ─────────────────────────────────────────────

/// Write `samples` as u16 LE into `out`.  Returns bytes written.
pub fn encode_samples(samples: &[u16], out: &mut [u8]) -> usize {
    let n = samples.len().min(out.len() / 2);
    for (chunk, s) in out.chunks_exact_mut(2).zip(&samples[..n]) {
        chunk.copy_from_slice(&s.to_le_bytes());
    }
    n * 2
}

/// Append the u16 LE samples in `bytes` to `out`.  An odd trailing byte
/// is dropped.
pub fn decode_samples(bytes: &[u8], out: &mut Vec<u16>) {
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]])),
    );
}

// ── Timed samples ─────────────────────────────────────────────

/// One reconstructed streaming sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    /// 12-bit converter value.
    pub adc: u16,
    /// Seconds since the stream started.
    pub t: f64,
}

impl TimedSample {
    /// Pack a sample taken `t_us` microseconds after stream start.
    pub fn pack(adc: u16, t_us: u64) -> [u32; 2] {
        let secs = (t_us / MICROS_PER_SEC) as u32;
        let micros = (t_us % MICROS_PER_SEC) as u32;
        [secs, ((micros & MICROS_MASK) << MICROS_SHIFT) | (u32::from(adc) & ADC_MASK)]
    }

    /// Recover `(adc, t)` from a packed word pair.
    pub fn unpack(word0: u32, word1: u32) -> Self {
        let micros = (word1 >> MICROS_SHIFT) & MICROS_MASK;
        Self {
            adc: (word1 & ADC_MASK) as u16,
            t: f64::from(word0) + 1e-6 * f64::from(micros),
        }
    }
}

/// Write `words` as u32 LE into `out`.  Returns bytes written.
pub fn encode_words(words: &[u32], out: &mut [u8]) -> usize {
    let n = words.len().min(out.len() / 4);
    for (chunk, w) in out.chunks_exact_mut(4).zip(&words[..n]) {
        chunk.copy_from_slice(&w.to_le_bytes());
    }
    n * 4
}

/// Append the u32 LE words in `bytes` to `out`.  A partial trailing word
/// is dropped.
pub fn decode_words(bytes: &[u8], out: &mut Vec<u32>) {
    out.extend(
        bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
    );
}
