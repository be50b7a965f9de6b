//! Stacked-plot artifact: the numbers a renderer draws, in plain arrays.

use std::path::Path;

use qs_hist::StackComposition;
use serde::{Deserialize, Serialize};

use crate::{RenderError, Result};

/// Schema version written into every artifact.
pub const STACK_PLOT_V0: &str = "qcdstack_stack_plot_v0";

/// Stacked plot of one variable, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackPlotArtifact {
    /// Always [`STACK_PLOT_V0`].
    pub schema_version: String,
    /// Producing tool.
    pub meta: ArtifactMeta,
    /// Variable name.
    pub variable: String,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// `n_bins + 1` edges.
    pub bin_edges: Vec<f64>,
    /// Upper end of the y range.
    pub y_max: f64,
    /// Bottom layer first.
    pub layers: Vec<StackLayerSeries>,
    /// Scaled signal overlays.
    pub signals: Vec<OverlaySeries>,
    /// Scaled observed data.
    pub data: DataSeries,
}

/// Tool that wrote an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Tool name.
    pub tool: String,
    /// Tool version.
    pub tool_version: String,
}

/// One filled stack layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackLayerSeries {
    /// Process label.
    pub label: String,
    /// Legend text.
    pub legend: String,
    /// Layer contribution per bin.
    pub y: Vec<f64>,
    /// Bottom of the layer per bin.
    pub baseline: Vec<f64>,
    /// Top of the layer per bin.
    pub top: Vec<f64>,
}

/// A signal drawn as a line over the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySeries {
    /// Process label.
    pub label: String,
    /// Legend text, including the scale.
    pub legend: String,
    /// Factor already applied to `y`.
    pub scale: f64,
    /// Scaled content per bin.
    pub y: Vec<f64>,
}

/// Observed data drawn as markers with error bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    /// Series label.
    pub label: String,
    /// Legend text, including the scale.
    pub legend: String,
    /// Factor already applied to `y` and `yerr`.
    pub scale: f64,
    /// Scaled content per bin.
    pub y: Vec<f64>,
    /// `sqrt(sumw2)` of the scaled data.
    pub yerr: Vec<f64>,
}

/// Legend entry of a scaled overlay, e.g. `ggH (x100.0)`.
pub fn scaled_legend(label: &str, scale: f64) -> String {
    format!("{label} (x{scale:.1})")
}

impl StackPlotArtifact {
    /// Flatten a composed stack into plain arrays.
    pub fn from_composition(comp: &StackComposition) -> Self {
        let layers = comp
            .layers
            .iter()
            .map(|l| StackLayerSeries {
                label: l.label.clone(),
                legend: l.label.clone(),
                y: l.histogram.bin_content.clone(),
                baseline: l.baseline.clone(),
                top: l.top.clone(),
            })
            .collect();
        let signals = comp
            .signals
            .iter()
            .map(|s| OverlaySeries {
                label: s.label.clone(),
                legend: scaled_legend(&s.label, s.scale),
                scale: s.scale,
                y: s.histogram.bin_content.clone(),
            })
            .collect();
        let data = DataSeries {
            label: comp.data.label.clone(),
            legend: scaled_legend(&comp.data.label, comp.data.scale),
            scale: comp.data.scale,
            y: comp.data.histogram.bin_content.clone(),
            yerr: comp.data.histogram.errors(),
        };
        Self {
            schema_version: STACK_PLOT_V0.to_string(),
            meta: ArtifactMeta {
                tool: "qcdstack".into(),
                tool_version: env!("CARGO_PKG_VERSION").into(),
            },
            variable: comp.variable.clone(),
            x_title: comp.x_title.clone(),
            y_title: comp.y_title.clone(),
            bin_edges: comp.spec.edges(),
            y_max: comp.y_max,
            layers,
            signals,
            data,
        }
    }

    /// Number of bins described by the edges.
    pub fn n_bins(&self) -> usize {
        self.bin_edges.len().saturating_sub(1)
    }

    /// Schema and array-length checks for artifacts read back from disk.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != STACK_PLOT_V0 {
            return Err(RenderError::Schema(format!(
                "expected schema_version '{STACK_PLOT_V0}', found '{}'",
                self.schema_version
            )));
        }
        let n = self.n_bins();
        if n == 0 {
            return Err(RenderError::Schema("artifact has no bins".into()));
        }
        let mut series: Vec<(&str, usize)> = Vec::new();
        for l in &self.layers {
            series.push((l.label.as_str(), l.y.len()));
            series.push((l.label.as_str(), l.baseline.len()));
            series.push((l.label.as_str(), l.top.len()));
        }
        for s in &self.signals {
            series.push((s.label.as_str(), s.y.len()));
        }
        series.push((self.data.label.as_str(), self.data.y.len()));
        series.push((self.data.label.as_str(), self.data.yerr.len()));
        if let Some((label, len)) = series.into_iter().find(|(_, len)| *len != n) {
            return Err(RenderError::Schema(format!(
                "series '{label}' has {len} bins, edges describe {n}"
            )));
        }
        Ok(())
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate an artifact.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Read and validate an artifact file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qs_hist::{BinSpec, HistKey, Histogram, Overlay, Sign, scale, stack};

    fn h(process: &str, bins: &[f64]) -> Histogram {
        let spec = BinSpec::new(bins.len(), 0.0, bins.len() as f64).unwrap();
        Histogram::from_bins(HistKey::new(process, Sign::Opposite, "m_vis"), spec, bins.to_vec())
            .unwrap()
    }

    fn composition() -> StackComposition {
        let layers = stack(vec![
            ("W".to_string(), h("W", &[2.0, 3.0])),
            ("TT".to_string(), h("TT", &[1.0, 1.0])),
            ("QCD".to_string(), h("QCD", &[0.0, 2.0])),
        ])
        .unwrap();
        StackComposition {
            variable: "m_vis".into(),
            spec: BinSpec::new(2, 0.0, 2.0).unwrap(),
            x_title: "m_{vis}".into(),
            y_title: "N_{Events}".into(),
            layers,
            signals: vec![Overlay {
                label: "ggH".into(),
                histogram: scale(&h("ggH", &[0.01, 0.02]), 100.0),
                scale: 100.0,
            }],
            data: Overlay {
                label: "Data".into(),
                histogram: scale(&h("data", &[4.0, 9.0]), 0.5),
                scale: 0.5,
            },
            y_max: 8.4,
        }
    }

    #[test]
    fn composition_is_flattened_in_stack_order() {
        let art = StackPlotArtifact::from_composition(&composition());
        let labels: Vec<_> = art.layers.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["W", "TT", "QCD"]);
        assert_eq!(art.bin_edges, vec![0.0, 1.0, 2.0]);
        assert_eq!(art.layers[2].baseline, vec![3.0, 4.0]);
        assert_eq!(art.layers[2].top, vec![3.0, 6.0]);
        assert_eq!(art.signals[0].legend, "ggH (x100.0)");
        assert_eq!(art.data.legend, "Data (x0.5)");
        assert_eq!(art.data.y, vec![2.0, 4.5]);
        // sumw2 of unit-weight data scaled by 0.5: [1.0, 2.25]
        assert_eq!(art.data.yerr, vec![1.0, 1.5]);
        art.validate().unwrap();
    }

    #[test]
    fn json_round_trip_checks_schema_and_lengths() {
        let art = StackPlotArtifact::from_composition(&composition());
        let json = art.to_json_pretty().unwrap();
        assert_eq!(StackPlotArtifact::from_json_str(&json).unwrap(), art);

        let mut wrong = art.clone();
        wrong.schema_version = "other".into();
        assert!(matches!(wrong.validate(), Err(RenderError::Schema(_))));

        let mut short = art;
        short.layers[1].top.pop();
        let err = short.validate().unwrap_err().to_string();
        assert!(err.contains("'TT'"), "{err}");
    }
}
