//! Keyed histogram value type.

use qs_core::{Error, Result};
use qs_frame::FilledHistogram;
use serde::{Deserialize, Serialize};

use crate::binning::BinSpec;
use crate::region::Sign;

/// Identity of a histogram: process (or composite), region and variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistKey {
    /// Process, composite or estimate label.
    pub process: String,
    /// Sign region.
    pub sign: Sign,
    /// Variable name.
    pub variable: String,
}

impl HistKey {
    /// Key in an arbitrary region.
    pub fn new(process: impl Into<String>, sign: Sign, variable: impl Into<String>) -> Self {
        Self { process: process.into(), sign, variable: variable.into() }
    }

    /// Signal-region (opposite-sign) key.
    pub fn signal(process: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::new(process, Sign::Opposite, variable)
    }

    /// Control-region (same-sign) key.
    pub fn control(process: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::new(process, Sign::Same, variable)
    }

    /// Same region and variable, another process.
    pub fn with_process(&self, process: impl Into<String>) -> Self {
        Self { process: process.into(), sign: self.sign, variable: self.variable.clone() }
    }

    /// Persisted name: `{process}_{variable}` in the signal region,
    /// `{process}_{variable}_{control_suffix}` in the control region.
    pub fn name(&self, control_suffix: &str) -> String {
        match self.sign {
            Sign::Opposite => format!("{}_{}", self.process, self.variable),
            Sign::Same => format!("{}_{}_{}", self.process, self.variable, control_suffix),
        }
    }
}

/// Binned distribution of one variable with per-bin sum of squared weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Identity.
    #[serde(flatten)]
    pub key: HistKey,
    /// Binning.
    pub spec: BinSpec,
    /// Sum of weights per bin.
    pub bin_content: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sumw2: Vec<f64>,
    /// Weight below the first bin.
    #[serde(default)]
    pub underflow: f64,
    /// Weight at or above the last edge.
    #[serde(default)]
    pub overflow: f64,
    /// Filled entries inside the range.
    #[serde(default)]
    pub entries: u64,
}

impl Histogram {
    /// Empty histogram.
    pub fn zeros(key: HistKey, spec: BinSpec) -> Self {
        Self {
            key,
            spec,
            bin_content: vec![0.0; spec.count],
            sumw2: vec![0.0; spec.count],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Histogram from explicit bin contents, with `sumw2` equal to the
    /// contents (unit weights).
    pub fn from_bins(key: HistKey, spec: BinSpec, bin_content: Vec<f64>) -> Result<Self> {
        let mut h = Self::zeros(key, spec);
        h.check_len(bin_content.len())?;
        h.sumw2 = bin_content.iter().map(|v| v.abs()).collect();
        h.bin_content = bin_content;
        Ok(h)
    }

    /// Adopt the result of an engine fill.
    pub fn from_filled(key: HistKey, spec: BinSpec, filled: FilledHistogram) -> Result<Self> {
        let h = Self {
            key,
            spec,
            bin_content: filled.bin_content,
            sumw2: filled.sumw2,
            underflow: filled.underflow,
            overflow: filled.overflow,
            entries: filled.entries,
        };
        h.validate()?;
        Ok(h)
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// Largest bin content (0 for an empty histogram).
    pub fn max(&self) -> f64 {
        self.bin_content.iter().copied().fold(0.0, f64::max)
    }

    /// Statistical error per bin, `sqrt(sumw2)`.
    pub fn errors(&self) -> Vec<f64> {
        self.sumw2.iter().map(|v| v.max(0.0).sqrt()).collect()
    }

    /// Same contents under another key.
    pub fn rekeyed(mut self, key: HistKey) -> Self {
        self.key = key;
        self
    }

    /// Check that bin arrays agree with the spec.
    pub fn validate(&self) -> Result<()> {
        self.check_len(self.bin_content.len())?;
        self.check_len(self.sumw2.len())
    }

    /// Fail with [`Error::ShapeMismatch`] unless `other` has as many bins.
    pub fn check_compatible(&self, other: &Histogram, context: &str) -> Result<()> {
        if other.n_bins() != self.n_bins() {
            return Err(Error::shape(
                format!("{context}: {} vs {}", self.key.process, other.key.process),
                self.n_bins(),
                other.n_bins(),
            ));
        }
        Ok(())
    }

    fn check_len(&self, found: usize) -> Result<()> {
        if found != self.spec.count {
            return Err(Error::shape(
                format!("{}/{}/{}", self.key.process, self.key.sign, self.key.variable),
                self.spec.count,
                found,
            ));
        }
        Ok(())
    }
}
