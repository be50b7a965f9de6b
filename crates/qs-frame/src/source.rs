//! Event sources and the batched request API.
//!
//! Requests against one filtered stream are registered on a
//! [`RequestBatch`] first and executed together with
//! [`EventSource::execute`], which evaluates the selection once and fills
//! every booked histogram in a single pass over the selected rows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{FrameError, Result};
use crate::filler::{FilledHistogram, HistRequest, UniformAxis, fill_histograms};
use crate::selection::{CutFlow, Selection};
use crate::table::EventTable;

/// Handle to a histogram booked on a [`RequestBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistHandle(usize);

/// Histogram requests sharing one selection.
#[derive(Debug, Clone, Default)]
pub struct RequestBatch {
    selection: Selection,
    requests: Vec<HistRequest>,
}

impl RequestBatch {
    /// New batch over the rows accepted by `selection`.
    pub fn new(selection: Selection) -> Self {
        Self { selection, requests: Vec::new() }
    }

    /// Register a histogram; nothing is computed until the batch executes.
    pub fn book(
        &mut self,
        name: impl Into<String>,
        variable: impl Into<String>,
        weight: Option<String>,
        axis: UniformAxis,
    ) -> HistHandle {
        self.requests.push(HistRequest {
            name: name.into(),
            variable: variable.into(),
            weight,
            axis,
        });
        HistHandle(self.requests.len() - 1)
    }

    /// Selection shared by every request.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Booked requests in booking order.
    pub fn requests(&self) -> &[HistRequest] {
        &self.requests
    }

    /// Number of booked requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// `true` if nothing is booked.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Output of one executed [`RequestBatch`].
#[derive(Debug, Clone)]
pub struct BatchResult {
    histograms: Vec<Option<FilledHistogram>>,
    /// Cut flow of the batch selection.
    pub cutflow: CutFlow,
}

impl BatchResult {
    /// Take the histogram for `handle`. Each handle can be taken once.
    pub fn take(&mut self, handle: HistHandle) -> Result<FilledHistogram> {
        self.histograms
            .get_mut(handle.0)
            .and_then(Option::take)
            .ok_or_else(|| FrameError::HistogramFill(format!("handle {} already taken", handle.0)))
    }
}

/// A readable collection of events.
pub trait EventSource: Send + Sync {
    /// Source name.
    fn name(&self) -> &str;

    /// Number of events before any selection.
    fn n_events(&self) -> usize;

    /// Evaluate the batch selection and fill every booked histogram.
    ///
    /// Blocks until all requests of the batch are complete.
    fn execute(&self, batch: &RequestBatch) -> Result<BatchResult>;
}

/// [`EventSource`] over an in-memory [`EventTable`].
#[derive(Debug, Clone)]
pub struct TableSource {
    name: String,
    table: Arc<EventTable>,
}

impl TableSource {
    /// Wrap a table.
    pub fn new(name: impl Into<String>, table: Arc<EventTable>) -> Self {
        Self { name: name.into(), table }
    }

    /// Underlying table.
    pub fn table(&self) -> &EventTable {
        &self.table
    }
}

impl EventSource for TableSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_events(&self) -> usize {
        self.table.n_rows()
    }

    fn execute(&self, batch: &RequestBatch) -> Result<BatchResult> {
        let (mask, cutflow) = batch.selection().evaluate(&self.table)?;
        tracing::debug!(
            source = %self.name,
            requests = batch.len(),
            selected = cutflow.selected(),
            "executing request batch"
        );
        let filled = fill_histograms(&self.table, &mask, batch.requests())?;
        Ok(BatchResult { histograms: filled.into_iter().map(Some).collect(), cutflow })
    }
}

/// Opens event sources by name.
pub trait SourceProvider: Send + Sync {
    /// Open the source registered as `name`.
    fn open(&self, name: &str) -> Result<Box<dyn EventSource>>;
}

/// Sources held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: HashMap<String, Arc<EventTable>>,
}

impl MemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under `name`.
    pub fn insert(&mut self, name: impl Into<String>, table: EventTable) {
        self.tables.insert(name.into(), Arc::new(table));
    }

    /// Builder-style [`MemoryCatalog::insert`].
    pub fn with(mut self, name: impl Into<String>, table: EventTable) -> Self {
        self.insert(name, table);
        self
    }
}

impl SourceProvider for MemoryCatalog {
    fn open(&self, name: &str) -> Result<Box<dyn EventSource>> {
        let table =
            self.tables.get(name).ok_or_else(|| FrameError::SourceNotFound(name.to_string()))?;
        Ok(Box::new(TableSource::new(name, Arc::clone(table))))
    }
}

/// Parquet files laid out as `{base_dir}/{name}{suffix}`.
#[derive(Debug, Clone)]
pub struct ParquetCatalog {
    base_dir: PathBuf,
    suffix: String,
}

impl ParquetCatalog {
    /// Catalog rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self { base_dir: base_dir.into(), suffix: suffix.into() }
    }

    /// File backing source `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}{}", self.suffix))
    }

    /// Base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl SourceProvider for ParquetCatalog {
    fn open(&self, name: &str) -> Result<Box<dyn EventSource>> {
        let path = self.path_for(name);
        let table = crate::parquet_io::read_table(&path)?;
        tracing::info!(
            source = name,
            path = %path.display(),
            events = table.n_rows(),
            "event source opened"
        );
        Ok(Box::new(TableSource::new(name, Arc::new(table))))
    }
}
