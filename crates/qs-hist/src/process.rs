//! Processes and composite processes.

use qs_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::region::TruthMatch;

/// Role of a process in the final comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// Observed events.
    Data,
    /// Simulated background.
    Background,
    /// Simulated signal, drawn as an overlay.
    Signal,
}

/// One elementary event sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Process {
    /// Label used in histogram keys.
    pub label: String,
    /// Event source name. Several processes may share one source.
    pub source: String,
    /// Data, background or signal.
    pub kind: ProcessKind,
    /// Cross section in pb.
    #[serde(default)]
    pub cross_section: Option<f64>,
    /// Number of generated events the cross section is spread over.
    #[serde(default)]
    pub generated_events: Option<f64>,
    /// Explicit normalization, used instead of the cross section.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Truth-match requirement (simulation only).
    #[serde(default)]
    pub truth_match: TruthMatch,
    /// Per-event weight column overriding the analysis default.
    #[serde(default)]
    pub weight: Option<String>,
}

impl Process {
    /// Process with no normalization or truth requirement.
    pub fn new(label: impl Into<String>, source: impl Into<String>, kind: ProcessKind) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            kind,
            cross_section: None,
            generated_events: None,
            scale: None,
            truth_match: TruthMatch::None,
            weight: None,
        }
    }

    /// Normalize to `cross_section / generated_events` per unit luminosity.
    pub fn with_cross_section(mut self, cross_section: f64, generated_events: f64) -> Self {
        self.cross_section = Some(cross_section);
        self.generated_events = Some(generated_events);
        self
    }

    /// Fixed normalization.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Truth-match requirement.
    pub fn with_truth_match(mut self, truth: TruthMatch) -> Self {
        self.truth_match = truth;
        self
    }

    /// `true` for simulated samples.
    pub fn is_simulation(&self) -> bool {
        self.kind != ProcessKind::Data
    }

    /// Per-event normalization factor.
    ///
    /// Data is never rescaled. Simulation uses the explicit `scale` when set,
    /// otherwise `cross_section / generated_events * luminosity`.
    pub fn normalization(&self, luminosity: f64) -> Result<f64> {
        if !self.is_simulation() {
            return Ok(1.0);
        }
        if let Some(scale) = self.scale {
            return Ok(scale);
        }
        match (self.cross_section, self.generated_events) {
            (Some(xs), Some(n)) if n > 0.0 => Ok(xs / n * luminosity),
            (Some(_), Some(n)) => Err(Error::Validation(format!(
                "process '{}': generated_events must be positive, got {n}",
                self.label
            ))),
            _ => Err(Error::Validation(format!(
                "process '{}': simulation needs either `scale` or `cross_section` and `generated_events`",
                self.label
            ))),
        }
    }

    /// Check the per-process invariants.
    pub fn validate(&self) -> Result<()> {
        if self.label.is_empty() || self.source.is_empty() {
            return Err(Error::Validation("process label and source must be non-empty".into()));
        }
        if !self.is_simulation() {
            if self.truth_match != TruthMatch::None {
                return Err(Error::Validation(format!(
                    "process '{}': truth matching is only defined for simulation",
                    self.label
                )));
            }
            if self.scale.is_some() || self.cross_section.is_some() {
                return Err(Error::Validation(format!(
                    "process '{}': observed data cannot be normalized",
                    self.label
                )));
            }
            return Ok(());
        }
        let norm = self.normalization(1.0)?;
        if !norm.is_finite() || norm < 0.0 {
            return Err(Error::Validation(format!(
                "process '{}': normalization must be finite and non-negative, got {norm}",
                self.label
            )));
        }
        Ok(())
    }
}

/// Named bin-by-bin sum of elementary processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeProcess {
    /// Composite label.
    pub name: String,
    /// Member process labels.
    pub members: Vec<String>,
}

impl CompositeProcess {
    /// Composite over `members`.
    pub fn new(name: impl Into<String>, members: &[&str]) -> Self {
        Self { name: name.into(), members: members.iter().map(|m| m.to_string()).collect() }
    }
}
