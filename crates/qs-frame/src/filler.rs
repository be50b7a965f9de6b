//! Single-pass histogram filling over a pre-selected row set.

use rayon::prelude::*;

use crate::error::{FrameError, Result};
use crate::expr::Expr;
use crate::table::EventTable;

/// Fixed-width binning: `n_bins` equal bins over `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformAxis {
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub lower: f64,
    /// Upper edge of the last bin.
    pub upper: f64,
}

impl UniformAxis {
    /// Validated constructor.
    pub fn new(n_bins: usize, lower: f64, upper: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(FrameError::HistogramFill("axis needs at least one bin".into()));
        }
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(FrameError::HistogramFill(format!(
                "invalid axis range [{lower}, {upper})"
            )));
        }
        Ok(Self { n_bins, lower, upper })
    }

    /// Bin edges (length `n_bins + 1`).
    pub fn edges(&self) -> Vec<f64> {
        let width = (self.upper - self.lower) / self.n_bins as f64;
        (0..=self.n_bins).map(|i| self.lower + width * i as f64).collect()
    }

    /// Where a value lands on this axis.
    #[inline]
    pub fn locate(&self, x: f64) -> BinLocation {
        if x < self.lower {
            return BinLocation::Underflow;
        }
        if x >= self.upper {
            return BinLocation::Overflow;
        }
        let frac = (x - self.lower) / (self.upper - self.lower);
        let idx = (frac * self.n_bins as f64) as usize;
        BinLocation::Bin(idx.min(self.n_bins - 1))
    }
}

/// Result of [`UniformAxis::locate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinLocation {
    /// Below the lower edge.
    Underflow,
    /// In-range bin index.
    Bin(usize),
    /// At or above the upper edge.
    Overflow,
}

/// One histogram to accumulate: variable expression, optional weight
/// expression and binning.
#[derive(Debug, Clone)]
pub struct HistRequest {
    /// Name attached to the result.
    pub name: String,
    /// Expression giving the filled value.
    pub variable: String,
    /// Expression giving the per-event weight (unit weight if `None`).
    pub weight: Option<String>,
    /// Binning.
    pub axis: UniformAxis,
}

/// Accumulated bin contents for one [`HistRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilledHistogram {
    /// Request name.
    pub name: String,
    /// Binning used.
    pub axis: UniformAxis,
    /// Sum of weights per bin.
    pub bin_content: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sumw2: Vec<f64>,
    /// Sum of weights below the range.
    pub underflow: f64,
    /// Sum of weights at or above the range.
    pub overflow: f64,
    /// Selected entries that landed in a bin.
    pub entries: u64,
    /// Selected entries whose value was not finite.
    pub skipped: u64,
}

/// Fill every request over the rows where `mask` is true.
///
/// Requests are independent accumulations over the same rows and are
/// evaluated in parallel.
pub fn fill_histograms(
    table: &EventTable,
    mask: &[bool],
    requests: &[HistRequest],
) -> Result<Vec<FilledHistogram>> {
    if mask.len() != table.n_rows() {
        return Err(FrameError::HistogramFill(format!(
            "selection mask has {} rows, table has {}",
            mask.len(),
            table.n_rows()
        )));
    }
    requests.par_iter().map(|req| fill_one(table, mask, req)).collect()
}

fn fill_one(table: &EventTable, mask: &[bool], req: &HistRequest) -> Result<FilledHistogram> {
    let values = Expr::compile(&req.variable)?.eval_table(table)?;
    let weights = match &req.weight {
        Some(w) => Some(Expr::compile(w)?.eval_table(table)?),
        None => None,
    };

    let n_bins = req.axis.n_bins;
    let mut out = FilledHistogram {
        name: req.name.clone(),
        axis: req.axis,
        bin_content: vec![0.0; n_bins],
        sumw2: vec![0.0; n_bins],
        underflow: 0.0,
        overflow: 0.0,
        entries: 0,
        skipped: 0,
    };

    for (row, &x) in values.iter().enumerate() {
        if !mask[row] {
            continue;
        }
        if !x.is_finite() {
            out.skipped += 1;
            continue;
        }
        let w = weights.as_ref().map_or(1.0, |w| w[row]);
        match req.axis.locate(x) {
            BinLocation::Underflow => out.underflow += w,
            BinLocation::Overflow => out.overflow += w,
            BinLocation::Bin(b) => {
                out.bin_content[b] += w;
                out.sumw2[b] += w * w;
                out.entries += 1;
            }
        }
    }

    Ok(out)
}
