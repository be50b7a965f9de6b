//! Analysis configuration (YAML) parsing and semantic validation.
//!
//! One file describes the event sources, the baseline selection, the
//! variables and their binning, the processes, the composites and how the
//! final comparison plot is assembled.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use qs_core::{Error, Result};
use qs_frame::{ParquetCatalog, Selection};
use serde::{Deserialize, Serialize};

use crate::binning::{BinSpec, BinningRegistry};
use crate::estimate::EstimateDef;
use crate::process::{CompositeProcess, Process};
use crate::region::{ChargeColumns, RegionSelector};
use crate::stack::DataScale;
use crate::store::DEFAULT_CONTROL_SUFFIX;

/// Schema tag accepted by [`AnalysisConfig::from_yaml_str`].
pub const ANALYSIS_V0: &str = "qcdstack_analysis_v0";

/// Top-level analysis file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Must be [`ANALYSIS_V0`].
    pub schema_version: String,
    /// Where event sources live.
    pub sources: SourcesConfig,
    /// Integrated luminosity in pb⁻¹.
    pub luminosity: f64,
    /// Default per-event weight column.
    #[serde(default = "default_weight_column")]
    pub weight_column: String,
    /// The two charge columns.
    #[serde(default)]
    pub charge_columns: ChargeColumns,
    /// Truth-match column (1 = genuine, 0 = misidentified).
    #[serde(default = "default_truth_column")]
    pub truth_column: String,
    /// Suffix of control-region histogram names.
    #[serde(default = "default_control_suffix")]
    pub control_suffix: String,
    /// Baseline cuts applied in every region.
    #[serde(default)]
    pub baseline: Vec<CutConfig>,
    /// Variables in display order.
    pub variables: Vec<VariableConfig>,
    /// Elementary processes in production order.
    pub processes: Vec<Process>,
    /// Composite processes.
    #[serde(default)]
    pub composites: Vec<CompositeProcess>,
    /// Plot composition.
    pub plot: PlotConfig,
}

/// Event source location: `{base_dir}/{source}{suffix}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Directory of the skimmed files, relative to the config file.
    pub base_dir: PathBuf,
    /// File name suffix.
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

/// One named baseline cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CutConfig {
    /// Boolean expression.
    pub cut: String,
    /// Description shown in cut-flow reports.
    #[serde(default)]
    pub name: String,
}

/// One variable and its binning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableConfig {
    /// Column name or expression.
    pub name: String,
    /// Number of bins.
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// Lower edge.
    pub lower: f64,
    /// Upper edge.
    pub upper: f64,
    /// Axis title.
    #[serde(default)]
    pub title: Option<String>,
}

/// How the comparison plot is composed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotConfig {
    /// Observed data label (process or composite).
    pub data: String,
    /// Stack layers, bottom first.
    pub stack: Vec<String>,
    /// Overlaid signals.
    #[serde(default)]
    pub signals: Vec<String>,
    /// Magnification of the signal overlays.
    #[serde(default = "default_signal_scale")]
    pub signal_scale: f64,
    /// Data normalization policy.
    #[serde(default)]
    pub data_scale: DataScale,
    /// Y axis title.
    #[serde(default = "default_y_title")]
    pub y_title: String,
    /// Estimated background, when one enters the stack.
    #[serde(default)]
    pub estimate: Option<EstimateDef>,
}

fn default_weight_column() -> String {
    "weight".into()
}
fn default_truth_column() -> String {
    "gen_match".into()
}
fn default_control_suffix() -> String {
    DEFAULT_CONTROL_SUFFIX.into()
}
fn default_suffix() -> String {
    "Skim.parquet".into()
}
fn default_bins() -> usize {
    30
}
fn default_signal_scale() -> f64 {
    100.0
}
fn default_y_title() -> String {
    "N_{Events}".into()
}

impl AnalysisConfig {
    /// Read, parse and validate an analysis file. A relative
    /// `sources.base_dir` is resolved against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_yaml_str(&text)?;
        if cfg.sources.base_dir.is_relative()
            && let Some(parent) = path.parent()
        {
            cfg.sources.base_dir = parent.join(&cfg.sources.base_dir);
        }
        tracing::debug!(
            path = %path.display(),
            processes = cfg.processes.len(),
            variables = cfg.variables.len(),
            "analysis config loaded"
        );
        Ok(cfg)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let probe: serde_yaml_ng::Value = serde_yaml_ng::from_str(text)?;
        let version = probe.get("schema_version").and_then(|v| v.as_str());
        if version != Some(ANALYSIS_V0) {
            return Err(Error::Validation(format!(
                "unsupported schema_version for analysis config: got={} expected={ANALYSIS_V0}",
                version.unwrap_or("<missing>")
            )));
        }
        let cfg: Self = serde_yaml_ng::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(self.luminosity.is_finite() && self.luminosity > 0.0) {
            return Err(Error::Validation(format!(
                "luminosity must be positive, got {}",
                self.luminosity
            )));
        }
        if self.control_suffix.is_empty() {
            return Err(Error::Validation("control_suffix must be non-empty".into()));
        }
        if self.variables.is_empty() {
            return Err(Error::Validation("at least one variable is required".into()));
        }
        self.registry()?;

        let mut labels = HashSet::new();
        for p in &self.processes {
            p.validate()?;
            if !labels.insert(p.label.as_str()) {
                return Err(Error::Validation(format!("duplicate process label '{}'", p.label)));
            }
        }
        for c in &self.composites {
            if c.members.is_empty() {
                return Err(Error::Validation(format!("composite '{}' has no members", c.name)));
            }
            if let Some(m) = c.members.iter().find(|m| !labels.contains(m.as_str())) {
                return Err(Error::Validation(format!(
                    "composite '{}' references unknown process '{m}'",
                    c.name
                )));
            }
        }
        for c in &self.composites {
            if !labels.insert(c.name.as_str()) {
                return Err(Error::Validation(format!(
                    "composite '{}' clashes with another label",
                    c.name
                )));
            }
        }

        self.validate_plot(&labels)
    }

    fn validate_plot(&self, labels: &HashSet<&str>) -> Result<()> {
        let plot = &self.plot;
        let known = |l: &str| labels.contains(l);
        let estimate_name = plot.estimate.as_ref().map(|e| e.name.as_str());

        if !known(&plot.data) {
            return Err(Error::Validation(format!("plot data '{}' is not a known label", plot.data)));
        }
        if let Some(def) = &plot.estimate {
            if labels.contains(def.name.as_str()) {
                return Err(Error::Validation(format!(
                    "estimate '{}' clashes with a process label",
                    def.name
                )));
            }
            if !known(&def.data) {
                return Err(Error::Validation(format!(
                    "estimate data '{}' is not a known label",
                    def.data
                )));
            }
            if let Some(l) = def.subtract.iter().find(|l| !known(l)) {
                return Err(Error::Validation(format!(
                    "estimate subtracts unknown label '{l}'"
                )));
            }
        }
        for l in &plot.stack {
            if !known(l) && Some(l.as_str()) != estimate_name {
                return Err(Error::Validation(format!("stack layer '{l}' is not a known label")));
            }
        }
        for l in &plot.signals {
            if !known(l) {
                return Err(Error::Validation(format!("signal '{l}' is not a known label")));
            }
        }
        if !(plot.signal_scale.is_finite() && plot.signal_scale >= 0.0) {
            return Err(Error::Validation("signal_scale must be finite and non-negative".into()));
        }
        if let DataScale::Fixed(k) = plot.data_scale
            && !(k.is_finite() && k >= 0.0)
        {
            return Err(Error::Validation("data_scale must be finite and non-negative".into()));
        }
        Ok(())
    }

    /// Binning registry in authored order.
    pub fn registry(&self) -> Result<BinningRegistry> {
        let mut reg = BinningRegistry::new();
        for v in &self.variables {
            let spec = BinSpec { count: v.bins, lower: v.lower, upper: v.upper };
            reg.register_titled(v.name.as_str(), spec, v.title.clone())?;
        }
        Ok(reg)
    }

    /// Baseline selection.
    pub fn baseline(&self) -> Selection {
        self.baseline
            .iter()
            .fold(Selection::all(), |sel, c| sel.filter(c.cut.as_str(), c.name.as_str()))
    }

    /// Region selector over the configured charge and truth columns.
    pub fn selector(&self) -> RegionSelector {
        RegionSelector::new(self.charge_columns.clone(), self.truth_column.as_str())
    }

    /// Parquet catalog of the event sources.
    pub fn catalog(&self) -> ParquetCatalog {
        ParquetCatalog::new(&self.sources.base_dir, self.sources.suffix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessKind;
    use crate::region::TruthMatch;

    const YAML: &str = r#"
schema_version: qcdstack_analysis_v0
sources: { base_dir: skims }
luminosity: 11467.0
baseline:
  - { cut: "mt_1<20", name: "Muon transverse mass cut for W+jets suppression" }
  - { cut: "iso_1<0.1", name: "Require isolated muon for signal region" }
variables:
  - { name: pt_1, lower: 17, upper: 70, title: "p_T(mu)" }
  - { name: q_1, bins: 2, lower: -2, upper: 2 }
processes:
  - { label: ggH, source: GluGluToHToTauTau, kind: signal, cross_section: 19.6, generated_events: 476963 }
  - { label: W1J, source: W1JetsToLNu, kind: background, cross_section: 6381.2, generated_events: 29784800 }
  - { label: W2J, source: W2JetsToLNu, kind: background, cross_section: 2039.8, generated_events: 30693853 }
  - { label: ZTT, source: DYJetsToLL, kind: background, cross_section: 3503.7, generated_events: 30458871, truth_match: genuine }
  - { label: dataRunB, source: Run2012B_TauPlusX, kind: data }
composites:
  - { name: W, members: [W1J, W2J] }
plot:
  data: dataRunB
  stack: [W, ZTT, QCD]
  signals: [ggH]
  estimate: { data: dataRunB, subtract: [W, ZTT] }
"#;

    #[test]
    fn parses_with_defaults() {
        let cfg = AnalysisConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(cfg.weight_column, "weight");
        assert_eq!(cfg.control_suffix, "ss");
        assert_eq!(cfg.sources.suffix, "Skim.parquet");
        assert_eq!(cfg.charge_columns, ChargeColumns::default());
        assert_eq!(cfg.plot.signal_scale, 100.0);
        assert_eq!(cfg.plot.data_scale, DataScale::Auto);
        assert_eq!(cfg.plot.estimate.as_ref().unwrap().name, "QCD");
        let ztt = cfg.processes.iter().find(|p| p.label == "ZTT").unwrap();
        assert_eq!(ztt.truth_match, TruthMatch::Genuine);

        let reg = cfg.registry().unwrap();
        assert_eq!(reg.lookup("pt_1").unwrap().count, 30);
        assert_eq!(reg.title("pt_1").unwrap(), "p_T(mu)");
        assert_eq!(cfg.baseline().cuts().len(), 2);
        let backgrounds = cfg.processes.iter().filter(|p| p.kind == ProcessKind::Background);
        assert_eq!(backgrounds.count(), 3);
    }

    #[test]
    fn schema_version_is_required() {
        let text = YAML.replace("qcdstack_analysis_v0", "trex_analysis_spec_v0");
        let err = AnalysisConfig::from_yaml_str(&text).unwrap_err();
        assert!(err.to_string().contains("unsupported schema_version"));
    }

    #[test]
    fn unknown_labels_rejected() {
        let text = YAML.replace("members: [W1J, W2J]", "members: [W1J, W9J]");
        assert!(matches!(AnalysisConfig::from_yaml_str(&text), Err(Error::Validation(_))));

        let text = YAML.replace("stack: [W, ZTT, QCD]", "stack: [W, TT, QCD]");
        assert!(AnalysisConfig::from_yaml_str(&text).is_err());
    }

    #[test]
    fn truth_match_on_data_rejected() {
        let text = YAML.replace("kind: data }", "kind: data, truth_match: misidentified }");
        let err = AnalysisConfig::from_yaml_str(&text).unwrap_err();
        assert!(err.to_string().contains("only defined for simulation"));
    }

    #[test]
    fn bad_binning_rejected() {
        let text = YAML.replace("lower: -2, upper: 2", "lower: 2, upper: -2");
        assert!(AnalysisConfig::from_yaml_str(&text).is_err());
    }
}
