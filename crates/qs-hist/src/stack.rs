//! Scaling and cumulative stacking.

use std::fmt;

use qs_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

/// `h` with bin contents multiplied by `factor` and `sumw2` by `factor²`.
pub fn scale(h: &Histogram, factor: f64) -> Histogram {
    let mut out = h.clone();
    let k2 = factor * factor;
    out.bin_content.iter_mut().for_each(|v| *v *= factor);
    out.sumw2.iter_mut().for_each(|v| *v *= k2);
    out.underflow *= factor;
    out.overflow *= factor;
    out
}

/// One drawn layer of a stacked plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackLayer {
    /// Legend label.
    pub label: String,
    /// The layer's own contribution.
    pub histogram: Histogram,
    /// Sum of all previous layers.
    pub baseline: Vec<f64>,
    /// `baseline + histogram.bin_content`.
    pub top: Vec<f64>,
}

/// Stack `layers` in the given order.
///
/// Layer `i` is drawn from the sum of layers `0..i` up to that sum plus its
/// own contents.
pub fn stack(layers: Vec<(String, Histogram)>) -> Result<Vec<StackLayer>> {
    let Some((_, first)) = layers.first() else {
        return Ok(Vec::new());
    };
    let n = first.n_bins();
    let reference = first.clone();

    let mut cumulative = vec![0.0; n];
    let mut out = Vec::with_capacity(layers.len());
    for (label, histogram) in layers {
        reference.check_compatible(&histogram, &format!("stack layer '{label}'"))?;
        let baseline = cumulative.clone();
        for (c, v) in cumulative.iter_mut().zip(&histogram.bin_content) {
            *c += v;
        }
        out.push(StackLayer { label, histogram, baseline, top: cumulative.clone() });
    }
    Ok(out)
}

/// Maximum of the top of a stack.
pub fn stack_max(layers: &[StackLayer]) -> f64 {
    layers.last().map_or(0.0, |l| l.top.iter().copied().fold(0.0, f64::max))
}

/// How observed data is scaled before it is compared to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "DataScaleRepr", into = "DataScaleRepr")]
pub enum DataScale {
    /// Σ stack integrals / data integral.
    #[default]
    Auto,
    /// Fixed factor.
    Fixed(f64),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DataScaleRepr {
    Number(f64),
    Word(String),
}

impl TryFrom<DataScaleRepr> for DataScale {
    type Error = String;

    fn try_from(repr: DataScaleRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            DataScaleRepr::Number(k) => Ok(DataScale::Fixed(k)),
            DataScaleRepr::Word(w) if w == "auto" => Ok(DataScale::Auto),
            DataScaleRepr::Word(w) => Err(format!("data scale must be a number or 'auto', got '{w}'")),
        }
    }
}

impl From<DataScale> for DataScaleRepr {
    fn from(s: DataScale) -> Self {
        match s {
            DataScale::Auto => DataScaleRepr::Word("auto".into()),
            DataScale::Fixed(k) => DataScaleRepr::Number(k),
        }
    }
}

impl fmt::Display for DataScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataScale::Auto => f.write_str("auto"),
            DataScale::Fixed(k) => write!(f, "{k}"),
        }
    }
}

impl DataScale {
    /// Factor applied to `data` for this policy.
    pub fn factor(&self, layers: &[StackLayer], data: &Histogram) -> Result<f64> {
        match *self {
            DataScale::Fixed(k) => Ok(k),
            DataScale::Auto => {
                let data_integral = data.integral();
                if data_integral == 0.0 {
                    return Err(Error::Validation(format!(
                        "cannot scale '{}' to the stack: data integral is zero",
                        data.key.process
                    )));
                }
                let stack_integral: f64 = layers.iter().map(|l| l.histogram.integral()).sum();
                Ok(stack_integral / data_integral)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::BinSpec;
    use crate::histogram::HistKey;

    fn h(p: &str, bins: &[f64]) -> Histogram {
        let spec = BinSpec::new(bins.len(), 0.0, 1.0).unwrap();
        Histogram::from_bins(HistKey::signal(p, "x"), spec, bins.to_vec()).unwrap()
    }

    #[test]
    fn cumulative_baseline() {
        let layers = stack(vec![
            ("W".into(), h("W", &[2.0, 3.0])),
            ("TT".into(), h("TT", &[1.0, 1.0])),
            ("QCD".into(), h("QCD", &[0.0, 2.0])),
        ])
        .unwrap();
        assert_eq!(layers[0].baseline, vec![0.0, 0.0]);
        assert_eq!(layers[1].baseline, vec![2.0, 3.0]);
        assert_eq!(layers[2].baseline, vec![3.0, 4.0]);
        assert_eq!(layers[2].top, vec![3.0, 6.0]);
        assert_eq!(stack_max(&layers), 6.0);
    }

    #[test]
    fn stack_rejects_mismatched_layers() {
        let err = stack(vec![("A".into(), h("A", &[1.0])), ("B".into(), h("B", &[1.0, 2.0]))])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert!(stack(vec![]).unwrap().is_empty());
    }

    #[test]
    fn scale_is_linear() {
        let s = scale(&h("ggH", &[1.0, 4.0]), 100.0);
        assert_eq!(s.bin_content, vec![100.0, 400.0]);
        assert_eq!(s.sumw2, vec![10000.0, 40000.0]);
        let z = scale(&h("ggH", &[1.0, 4.0]), 0.0);
        assert!(z.bin_content.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn data_scale_policies() {
        let layers = stack(vec![("W".into(), h("W", &[2.0, 4.0]))]).unwrap();
        let data = h("dataRunB", &[1.0, 2.0]);
        assert_eq!(DataScale::Auto.factor(&layers, &data).unwrap(), 2.0);
        assert_eq!(DataScale::Fixed(1.2).factor(&layers, &data).unwrap(), 1.2);
        assert!(DataScale::Auto.factor(&layers, &h("d", &[0.0, 0.0])).is_err());
    }

    #[test]
    fn data_scale_serde() {
        let auto: DataScale = serde_yaml_ng::from_str("auto").unwrap();
        assert_eq!(auto, DataScale::Auto);
        let fixed: DataScale = serde_yaml_ng::from_str("1.5").unwrap();
        assert_eq!(fixed, DataScale::Fixed(1.5));
        assert!(serde_yaml_ng::from_str::<DataScale>("twice").is_err());
        assert_eq!(serde_json::to_string(&DataScale::Auto).unwrap(), "\"auto\"");
    }
}
