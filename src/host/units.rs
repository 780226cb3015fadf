//! Units, calibration and reconstructed records.

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};
use crate::protocol::codec::{SAMPLES_PER_GROUP, TimedSample};

/// Millivolts per ADU: 3.3 V reference over a 12-bit range.
pub const MV_PER_ADU: f64 = 3300.0 / 4096.0;

pub fn adu_to_mv(adu: f64) -> f64 {
    adu * MV_PER_ADU
}

pub fn mv_to_adu(mv: f64) -> f64 {
    mv / MV_PER_ADU
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// Raw converter counts.
    #[default]
    Adu,
    Millivolts,
}

impl Units {
    /// Factor that takes a value in `self` to `to`.
    fn factor(self, to: Self) -> f64 {
        match (self, to) {
            (Self::Adu, Self::Millivolts) => MV_PER_ADU,
            (Self::Millivolts, Self::Adu) => 1.0 / MV_PER_ADU,
            _ => 1.0,
        }
    }
}

impl FromStr for Units {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ADU" => Ok(Self::Adu),
            "mV" => Ok(Self::Millivolts),
            _ => Err(Error::MalformedUnit),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Adu => "ADU",
            Self::Millivolts => "mV",
        })
    }
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Linear correction `(raw + offset) / gradient`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCurve {
    gradient: f64,
    offset: f64,
}

impl CalibrationCurve {
    pub const IDENTITY: Self = Self {
        gradient: 1.0,
        offset: 0.0,
    };

    pub fn new(gradient: f64, offset: f64) -> Result<Self> {
        if gradient == 0.0 || !gradient.is_finite() || !offset.is_finite() {
            return Err(Error::Config("calibration gradient must be non-zero"));
        }
        Ok(Self { gradient, offset })
    }

    pub fn gradient(&self) -> f64 {
        self.gradient
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn correct(&self, raw: f64) -> f64 {
        (raw + self.offset) / self.gradient
    }

    pub fn invert(&self, corrected: f64) -> f64 {
        corrected * self.gradient - self.offset
    }
}

impl Default for CalibrationCurve {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Sample table (polled and burst modes)
// ---------------------------------------------------------------------------

/// Rows of four samples, one row per timed read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleTable {
    rows: Vec<[f64; SAMPLES_PER_GROUP]>,
    units: Units,
}

impl SampleTable {
    /// Reshape raw samples into rows, keep the first `count` and apply the
    /// calibration curve.  A trailing partial row is dropped.
    pub fn from_raw(samples: &[u16], count: usize, curve: &CalibrationCurve) -> Self {
        let rows = samples
            .chunks_exact(SAMPLES_PER_GROUP)
            .take(count)
            .map(|g| core::array::from_fn(|i| curve.correct(f64::from(g[i]))))
            .collect();
        Self {
            rows,
            units: Units::Adu,
        }
    }

    pub fn rows(&self) -> &[[f64; SAMPLES_PER_GROUP]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Convert in place.  A no-op when already in `to`.
    pub fn set_units(&mut self, to: Units) {
        let k = self.units.factor(to);
        if k != 1.0 {
            for v in self.rows.iter_mut().flatten() {
                *v *= k;
            }
        }
        self.units = to;
    }

    /// Per-row mean, the value fed to downstream histogramming.
    pub fn row_means(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.iter().sum::<f64>() / SAMPLES_PER_GROUP as f64)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Stream record (streaming mode)
// ---------------------------------------------------------------------------

/// Timestamped single samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamRecord {
    adc: Vec<f64>,
    t: Vec<f64>,
    units: Units,
}

impl StreamRecord {
    /// Split packed word pairs into `(t, adc)` and keep the first `count`.
    pub fn from_words(words: &[u32], count: usize) -> Self {
        let (t, adc) = words
            .chunks_exact(2)
            .take(count)
            .map(|w| {
                let s = TimedSample::unpack(w[0], w[1]);
                (s.t, f64::from(s.adc))
            })
            .unzip();
        Self {
            adc,
            t,
            units: Units::Adu,
        }
    }

    pub fn adc(&self) -> &[f64] {
        &self.adc
    }

    /// Seconds since the stream started.
    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn len(&self) -> usize {
        self.adc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adc.is_empty()
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Convert the sample values in place.  Timestamps are untouched.
    pub fn set_units(&mut self, to: Units) {
        let k = self.units.factor(to);
        if k != 1.0 {
            for v in &mut self.adc {
                *v *= k;
            }
        }
        self.units = to;
    }
}
