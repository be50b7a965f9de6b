//! # qs-frame
//!
//! Tabular event-processing engine for qcdstack.
//!
//! Events live in columnar [`EventTable`]s (loaded from Parquet or built in
//! memory). Selections, variables and weights are string expressions over
//! column names. Histograms are requested in batches that share one
//! selection, so every variable booked for a region is filled from the same
//! row set in one pass.
//!
//! ## Example
//!
//! ```no_run
//! use qs_frame::{ParquetCatalog, RequestBatch, Selection, SourceProvider, UniformAxis};
//!
//! let catalog = ParquetCatalog::new("skims", "Skim.parquet");
//! let source = catalog.open("TTbar").unwrap();
//! let mut batch = RequestBatch::new(Selection::all().filter("q_1*q_2 < 0", "opposite sign"));
//! let h = batch.book("pt_1", "pt_1", Some("weight".into()), UniformAxis::new(30, 17.0, 70.0).unwrap());
//! let mut result = source.execute(&batch).unwrap();
//! println!("{:?}", result.take(h).unwrap().bin_content);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod expr;
pub mod filler;
pub mod parquet_io;
pub mod selection;
pub mod source;
pub mod table;

pub use error::{FrameError, Result};
pub use expr::Expr;
pub use filler::{BinLocation, FilledHistogram, HistRequest, UniformAxis, fill_histograms};
pub use parquet_io::{read_table, write_table};
pub use selection::{Cut, CutFlow, CutFlowStep, Selection};
pub use source::{
    BatchResult, EventSource, HistHandle, MemoryCatalog, ParquetCatalog, RequestBatch,
    SourceProvider, TableSource,
};
pub use table::EventTable;
