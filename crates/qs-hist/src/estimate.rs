//! Data-driven background estimate from the same-sign control region.
//!
//! The estimate is the observed control-region yield minus the sum of every
//! simulated background in the same region. Backgrounds are summed first and
//! subtracted once; negative bins are set to zero only on the final residual.

use qs_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::{HistKey, Histogram};
use crate::merge::{resolve, sum_histograms};
use crate::process::CompositeProcess;
use crate::region::Sign;
use crate::stack::scale;
use crate::store::HistogramStore;

/// Definition of the estimated background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimateDef {
    /// Label of the estimated process.
    #[serde(default = "default_name")]
    pub name: String,
    /// Observed data label (process or composite).
    pub data: String,
    /// Simulated backgrounds subtracted in the control region.
    pub subtract: Vec<String>,
    /// Opposite-sign / same-sign extrapolation factor.
    #[serde(default = "default_transfer_factor")]
    pub transfer_factor: f64,
}

fn default_name() -> String {
    "QCD".to_string()
}

fn default_transfer_factor() -> f64 {
    1.0
}

/// `max(data - Σ known, 0)` per bin, keyed by `key`.
///
/// `sumw2` of the result is the sum of every input's `sumw2`.
pub fn estimate(key: HistKey, control_data: &Histogram, known: &[&Histogram]) -> Result<Histogram> {
    let context = format!("estimate of '{}'", key.process);
    let mut out = control_data.clone().rekeyed(key);
    if known.is_empty() {
        clamp(&mut out);
        return Ok(out);
    }

    let total = sum_histograms(out.key.with_process("known backgrounds"), known)?;
    out.check_compatible(&total, &context)?;

    for (v, b) in out.bin_content.iter_mut().zip(&total.bin_content) {
        *v -= b;
    }
    for (v, b) in out.sumw2.iter_mut().zip(&total.sumw2) {
        *v += b;
    }
    out.underflow -= total.underflow;
    out.overflow -= total.overflow;
    clamp(&mut out);
    Ok(out)
}

fn clamp(h: &mut Histogram) {
    let mut clamped = 0usize;
    for v in h.bin_content.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
            clamped += 1;
        }
    }
    h.underflow = h.underflow.max(0.0);
    h.overflow = h.overflow.max(0.0);
    if clamped > 0 {
        tracing::debug!(
            process = %h.key.process,
            variable = %h.key.variable,
            clamped,
            "negative bins set to zero"
        );
    }
}

/// Signal-region estimate of `def` for `variable`, read from the store's
/// control-region histograms and scaled by the transfer factor.
pub fn estimate_background(
    store: &HistogramStore,
    composites: &[CompositeProcess],
    def: &EstimateDef,
    variable: &str,
) -> Result<Histogram> {
    if !(def.transfer_factor.is_finite() && def.transfer_factor >= 0.0) {
        return Err(Error::Validation(format!(
            "transfer factor of '{}' must be finite and non-negative",
            def.name
        )));
    }
    let data = resolve(store, composites, &def.data, variable, Sign::Same)?;
    let known = def
        .subtract
        .iter()
        .map(|label| resolve(store, composites, label, variable, Sign::Same))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&Histogram> = known.iter().collect();

    let cr = estimate(HistKey::control(def.name.as_str(), variable), &data, &refs)?;
    tracing::info!(
        process = %def.name,
        variable,
        control_yield = cr.integral(),
        transfer_factor = def.transfer_factor,
        "background estimated from control region"
    );
    Ok(scale(&cr, def.transfer_factor).rekeyed(HistKey::signal(def.name.as_str(), variable)))
}
