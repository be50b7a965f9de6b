//! Histogram store and its JSON artifact.
//!
//! Histograms are held under typed [`HistKey`]s. String names are derived
//! from the key only when the store is written, and checked against the key
//! when it is read back.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use qs_core::{Error, Result};
use qs_frame::CutFlow;
use serde::{Deserialize, Serialize};

use crate::histogram::{HistKey, Histogram};
use crate::region::Sign;

/// Schema tag of the persisted artifact.
pub const STORE_SCHEMA_V0: &str = "qcdstack_histograms_v0";

/// Default suffix of control-region names.
pub const DEFAULT_CONTROL_SUFFIX: &str = "ss";

/// Cut-flow of one (process, region) selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutFlowRecord {
    /// Process label.
    pub process: String,
    /// Region.
    pub sign: Sign,
    /// Events before any cut.
    pub total: u64,
    /// Per-cut counts.
    pub steps: Vec<CutFlowStepRecord>,
}

/// One row of a [`CutFlowRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutFlowStepRecord {
    /// Cut description.
    pub name: String,
    /// Events reaching the cut.
    pub all: u64,
    /// Events passing the cut.
    pub pass: u64,
    /// `pass / all` in percent.
    pub efficiency: f64,
}

impl CutFlowRecord {
    /// Snapshot of an engine cut-flow.
    pub fn new(process: impl Into<String>, sign: Sign, flow: &CutFlow) -> Self {
        Self {
            process: process.into(),
            sign,
            total: flow.total,
            steps: flow
                .steps
                .iter()
                .map(|s| CutFlowStepRecord {
                    name: s.name.clone(),
                    all: s.all,
                    pass: s.pass,
                    efficiency: s.efficiency(),
                })
                .collect(),
        }
    }

    /// Events passing every cut.
    pub fn selected(&self) -> u64 {
        self.steps.last().map_or(self.total, |s| s.pass)
    }
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    schema_version: String,
    control_suffix: String,
    histograms: Vec<NamedHistogram>,
    #[serde(default)]
    cutflows: Vec<CutFlowRecord>,
}

#[derive(Serialize, Deserialize)]
struct NamedHistogram {
    name: String,
    #[serde(flatten)]
    histogram: Histogram,
}

/// Keyed histogram collection, kept in insertion order.
#[derive(Debug, Clone)]
pub struct HistogramStore {
    control_suffix: String,
    entries: Vec<Histogram>,
    index: HashMap<HistKey, usize>,
    cutflows: Vec<CutFlowRecord>,
}

impl Default for HistogramStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_SUFFIX)
    }
}

impl HistogramStore {
    /// Empty store naming control-region entries with `control_suffix`.
    pub fn new(control_suffix: impl Into<String>) -> Self {
        Self {
            control_suffix: control_suffix.into(),
            entries: Vec::new(),
            index: HashMap::new(),
            cutflows: Vec::new(),
        }
    }

    /// Suffix of control-region names.
    pub fn control_suffix(&self) -> &str {
        &self.control_suffix
    }

    /// Insert a histogram. An existing entry with the same key is replaced
    /// in place and returned.
    pub fn put(&mut self, histogram: Histogram) -> Option<Histogram> {
        match self.index.get(&histogram.key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], histogram)),
            None => {
                self.index.insert(histogram.key.clone(), self.entries.len());
                self.entries.push(histogram);
                None
            }
        }
    }

    /// Histogram stored under `key`.
    pub fn get(&self, key: &HistKey) -> Result<&Histogram> {
        self.index
            .get(key)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::MissingKey(self.name_of(key)))
    }

    /// `true` if `key` is present.
    pub fn contains(&self, key: &HistKey) -> bool {
        self.index.contains_key(key)
    }

    /// Persisted name of `key`.
    pub fn name_of(&self, key: &HistKey) -> String {
        key.name(&self.control_suffix)
    }

    /// Histograms in insertion order.
    pub fn histograms(&self) -> impl Iterator<Item = &Histogram> {
        self.entries.iter()
    }

    /// Persisted names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|h| self.name_of(&h.key)).collect()
    }

    /// Number of histograms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the store holds no histogram.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a cut-flow report.
    pub fn push_cutflow(&mut self, record: CutFlowRecord) {
        self.cutflows.push(record);
    }

    /// Recorded cut-flow reports.
    pub fn cutflows(&self) -> &[CutFlowRecord] {
        &self.cutflows
    }

    /// Write the whole store to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = StoreFile {
            schema_version: STORE_SCHEMA_V0.to_string(),
            control_suffix: self.control_suffix.clone(),
            histograms: self
                .entries
                .iter()
                .map(|h| NamedHistogram { name: self.name_of(&h.key), histogram: h.clone() })
                .collect(),
            cutflows: self.cutflows.clone(),
        };
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &file)?;
        w.write_all(b"\n")?;
        w.flush()?;
        tracing::info!(path = %path.display(), histograms = self.len(), "histogram store written");
        Ok(())
    }

    /// Read a store written by [`HistogramStore::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let file: StoreFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if file.schema_version != STORE_SCHEMA_V0 {
            return Err(Error::Validation(format!(
                "unsupported schema_version for histogram store: got={} expected={}",
                file.schema_version, STORE_SCHEMA_V0
            )));
        }

        let mut store = Self::new(file.control_suffix);
        for entry in file.histograms {
            let expected = store.name_of(&entry.histogram.key);
            if entry.name != expected {
                return Err(Error::Validation(format!(
                    "store entry '{}' does not match its key (expected '{expected}')",
                    entry.name
                )));
            }
            entry.histogram.validate()?;
            store.put(entry.histogram);
        }
        store.cutflows = file.cutflows;
        tracing::debug!(path = %path.display(), histograms = store.len(), "histogram store loaded");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::BinSpec;

    fn hist(process: &str, sign: Sign, bins: Vec<f64>) -> Histogram {
        let spec = BinSpec::new(bins.len(), 0.0, 1.0).unwrap();
        Histogram::from_bins(HistKey::new(process, sign, "pt_1"), spec, bins).unwrap()
    }

    #[test]
    fn duplicate_put_overwrites() {
        let mut store = HistogramStore::default();
        assert!(store.put(hist("TT", Sign::Opposite, vec![1.0, 2.0])).is_none());
        let old = store.put(hist("TT", Sign::Opposite, vec![5.0, 6.0])).unwrap();
        assert_eq!(old.bin_content, vec![1.0, 2.0]);
        assert_eq!(store.len(), 1);
        let key = HistKey::signal("TT", "pt_1");
        assert_eq!(store.get(&key).unwrap().bin_content, vec![5.0, 6.0]);
    }

    #[test]
    fn missing_key_names_the_histogram() {
        let store = HistogramStore::new("cr");
        let err = store.get(&HistKey::control("W2J", "pt_1")).unwrap_err();
        assert!(matches!(err, Error::MissingKey(name) if name == "W2J_pt_1_cr"));
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir().join(format!("qs_hist_store_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("histograms.json");

        let mut store = HistogramStore::default();
        store.put(hist("W1J", Sign::Opposite, vec![1.0, 2.0]));
        store.put(hist("W1J", Sign::Same, vec![0.5, 0.0]));
        store.push_cutflow(CutFlowRecord {
            process: "W1J".into(),
            sign: Sign::Same,
            total: 10,
            steps: vec![],
        });
        store.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"W1J_pt_1_ss\""));

        let back = HistogramStore::load(&path).unwrap();
        assert_eq!(back.names(), vec!["W1J_pt_1", "W1J_pt_1_ss"]);
        assert_eq!(back.get(&HistKey::control("W1J", "pt_1")).unwrap().bin_content, vec![0.5, 0.0]);
        assert_eq!(back.cutflows()[0].selected(), 10);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
