//! # qs-hist
//!
//! Histogram aggregation and data-driven background estimation.
//!
//! The crate books per-variable histograms for every (process, region)
//! pair through the [`qs_frame`] engine, keeps them in a typed
//! [`HistogramStore`], sums sub-samples into composites, estimates the QCD
//! multijet background from the same-sign control region and composes the
//! stacked comparison against observed data.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binning;
pub mod config;
pub mod estimate;
pub mod histogram;
pub mod merge;
pub mod pipeline;
pub mod process;
pub mod producer;
pub mod region;
pub mod stack;
pub mod store;

pub use binning::{BinSpec, BinningRegistry, VariableDef};
pub use config::{ANALYSIS_V0, AnalysisConfig, PlotConfig};
pub use estimate::{EstimateDef, estimate, estimate_background};
pub use histogram::{HistKey, Histogram};
pub use merge::{merge, resolve, sum_histograms};
pub use pipeline::{
    Overlay, ProcessFailure, ProduceReport, StackComposition, Y_HEADROOM, compose_plot, produce_all,
};
pub use process::{CompositeProcess, Process, ProcessKind};
pub use producer::{HistogramProducer, RegionOutput};
pub use region::{ChargeColumns, RegionSelector, Sign, TruthMatch};
pub use stack::{DataScale, StackLayer, scale, stack, stack_max};
pub use store::{CutFlowRecord, CutFlowStepRecord, HistogramStore, STORE_SCHEMA_V0};
