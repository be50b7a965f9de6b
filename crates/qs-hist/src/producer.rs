//! Histogram production for (process, region) pairs.
//!
//! Every registered variable of a region is booked on one [`RequestBatch`]
//! and filled from the same selected rows in a single pass.

use qs_core::{Error, Result};
use qs_frame::{EventSource, FrameError, RequestBatch, Selection, SourceProvider};

use crate::binning::BinningRegistry;
use crate::histogram::{HistKey, Histogram};
use crate::process::Process;
use crate::region::{RegionSelector, Sign};
use crate::store::CutFlowRecord;

/// Histograms and cut-flow of one (process, region) batch.
#[derive(Debug, Clone)]
pub struct RegionOutput {
    /// One histogram per registered variable, in registry order.
    pub histograms: Vec<Histogram>,
    /// Cut-flow of the region selection.
    pub cutflow: CutFlowRecord,
}

/// Books and fills histograms for processes.
pub struct HistogramProducer<'a> {
    registry: &'a BinningRegistry,
    selector: &'a RegionSelector,
    baseline: &'a Selection,
    provider: &'a dyn SourceProvider,
    luminosity: f64,
    weight_column: String,
}

impl<'a> HistogramProducer<'a> {
    /// Producer over `provider`, with unit luminosity and the `weight` column.
    pub fn new(
        registry: &'a BinningRegistry,
        selector: &'a RegionSelector,
        baseline: &'a Selection,
        provider: &'a dyn SourceProvider,
    ) -> Self {
        Self {
            registry,
            selector,
            baseline,
            provider,
            luminosity: 1.0,
            weight_column: "weight".into(),
        }
    }

    /// Integrated luminosity used for cross-section normalization.
    pub fn luminosity(mut self, luminosity: f64) -> Self {
        self.luminosity = luminosity;
        self
    }

    /// Default per-event weight column.
    pub fn weight_column(mut self, column: impl Into<String>) -> Self {
        self.weight_column = column.into();
        self
    }

    /// Registry the producer books from.
    pub fn registry(&self) -> &BinningRegistry {
        self.registry
    }

    /// Weight expression of `process`: its weight column, multiplied by the
    /// normalization unless that is exactly 1.
    pub fn weight_expression(&self, process: &Process) -> Result<String> {
        let column = process.weight.as_deref().unwrap_or(&self.weight_column);
        let norm = process.normalization(self.luminosity)?;
        if norm == 1.0 {
            Ok(column.to_string())
        } else {
            Ok(format!("{column} * {norm}"))
        }
    }

    /// Selection of `process` in `sign`.
    pub fn selection(&self, process: &Process, sign: Sign) -> Selection {
        self.selector.region(self.baseline, sign, process.truth_match)
    }

    /// Open the event source of `process`.
    pub fn open(&self, process: &Process) -> Result<Box<dyn EventSource>> {
        self.provider.open(&process.source).map_err(|e| Error::SourceUnavailable {
            process: process.label.clone(),
            reason: e.to_string(),
        })
    }

    /// Histogram of one variable.
    pub fn produce(&self, process: &Process, sign: Sign, variable: &str) -> Result<Histogram> {
        let spec = self.registry.lookup(variable)?;
        let source = self.open(process)?;
        let key = HistKey::new(process.label.as_str(), sign, variable);

        let mut batch = RequestBatch::new(self.selection(process, sign));
        let handle = batch.book(
            variable,
            variable,
            Some(self.weight_expression(process)?),
            spec.to_axis()?,
        );
        let mut result = source.execute(&batch).map_err(|e| engine_error(process, sign, e))?;
        let filled = result.take(handle).map_err(|e| engine_error(process, sign, e))?;
        Histogram::from_filled(key, spec, filled)
    }

    /// Every registered variable of `process` in `sign`, from one batch.
    pub fn produce_region(&self, process: &Process, sign: Sign) -> Result<RegionOutput> {
        let source = self.open(process)?;
        self.produce_region_from(source.as_ref(), process, sign)
    }

    /// Both sign regions of `process`, opening its source once.
    pub fn produce_process(&self, process: &Process) -> Result<Vec<RegionOutput>> {
        let source = self.open(process)?;
        tracing::info!(
            process = %process.label,
            source = %process.source,
            events = source.n_events(),
            "producing histograms"
        );
        Sign::ALL
            .iter()
            .map(|&sign| self.produce_region_from(source.as_ref(), process, sign))
            .collect()
    }

    fn produce_region_from(
        &self,
        source: &dyn EventSource,
        process: &Process,
        sign: Sign,
    ) -> Result<RegionOutput> {
        let weight = self.weight_expression(process)?;
        let mut batch = RequestBatch::new(self.selection(process, sign));
        let mut booked = Vec::with_capacity(self.registry.len());
        for def in self.registry.iter() {
            let key = HistKey::new(process.label.as_str(), sign, def.name.as_str());
            let axis = def.spec.to_axis()?;
            let handle = batch.book(def.name.as_str(), def.name.as_str(), Some(weight.clone()), axis);
            booked.push((key, def.spec, handle));
        }

        let mut result = source.execute(&batch).map_err(|e| engine_error(process, sign, e))?;
        let cutflow = CutFlowRecord::new(process.label.as_str(), sign, &result.cutflow);
        tracing::info!(
            process = %process.label,
            region = %sign,
            selected = cutflow.selected(),
            total = cutflow.total,
            histograms = booked.len(),
            "region filled"
        );
        tracing::debug!(process = %process.label, region = %sign, "cut-flow:\n{}", result.cutflow);

        let histograms = booked
            .into_iter()
            .map(|(key, spec, handle)| {
                let filled = result.take(handle).map_err(|e| engine_error(process, sign, e))?;
                Histogram::from_filled(key, spec, filled)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RegionOutput { histograms, cutflow })
    }
}

/// Engine failure while filling a region. Read failures of the source
/// itself are [`Error::SourceUnavailable`]; everything else is an
/// expression or configuration problem.
fn engine_error(process: &Process, sign: Sign, e: FrameError) -> Error {
    match e {
        FrameError::Io(_)
        | FrameError::Parquet(_)
        | FrameError::Arrow(_)
        | FrameError::SourceNotFound(_) => Error::SourceUnavailable {
            process: process.label.clone(),
            reason: e.to_string(),
        },
        other => Error::Expression(format!("process '{}', {sign} region: {other}", process.label)),
    }
}
