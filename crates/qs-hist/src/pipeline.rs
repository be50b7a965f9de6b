//! End-to-end stages: production of a store and composition of a plot.

use qs_core::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::binning::BinSpec;
use crate::config::AnalysisConfig;
use crate::estimate::estimate_background;
use crate::histogram::Histogram;
use crate::merge::resolve;
use crate::process::Process;
use crate::producer::HistogramProducer;
use crate::region::Sign;
use crate::stack::{StackLayer, scale, stack, stack_max};
use crate::store::HistogramStore;

/// A process whose event source could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFailure {
    /// Process label.
    pub process: String,
    /// Error message.
    pub reason: String,
}

/// Output of [`produce_all`].
#[derive(Debug, Clone)]
pub struct ProduceReport {
    /// Histograms of every process that could be read.
    pub store: HistogramStore,
    /// Processes skipped because their source was unavailable.
    pub failures: Vec<ProcessFailure>,
}

/// Fill both regions of every process.
///
/// Processes run in parallel. Results enter the store in `processes` order.
/// A process whose source is unavailable is reported and skipped; any other
/// error aborts the run.
pub fn produce_all(
    producer: &HistogramProducer<'_>,
    processes: &[Process],
    control_suffix: &str,
) -> Result<ProduceReport> {
    let results: Vec<_> = processes.par_iter().map(|p| producer.produce_process(p)).collect();

    let mut store = HistogramStore::new(control_suffix);
    let mut failures = Vec::new();
    for (process, result) in processes.iter().zip(results) {
        match result {
            Ok(regions) => {
                for region in regions {
                    for h in region.histograms {
                        store.put(h);
                    }
                    store.push_cutflow(region.cutflow);
                }
            }
            Err(e) if e.is_source_unavailable() => {
                tracing::warn!(process = %process.label, error = %e, "skipping process");
                failures.push(ProcessFailure {
                    process: process.label.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    tracing::info!(
        histograms = store.len(),
        processes = processes.len() - failures.len(),
        failed = failures.len(),
        "production finished"
    );
    Ok(ProduceReport { store, failures })
}

/// Scaled signal overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Legend label.
    pub label: String,
    /// Scaled histogram.
    pub histogram: Histogram,
    /// Factor applied.
    pub scale: f64,
}

/// Everything needed to draw one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackComposition {
    /// Variable name.
    pub variable: String,
    /// Binning.
    pub spec: BinSpec,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// Stack layers, bottom first.
    pub layers: Vec<StackLayer>,
    /// Signal overlays.
    pub signals: Vec<Overlay>,
    /// Scaled observed data.
    pub data: Overlay,
    /// Upper end of the y range.
    pub y_max: f64,
}

/// Headroom above the tallest drawn element.
pub const Y_HEADROOM: f64 = 1.4;

/// Binning and x title of `variable`.
///
/// Registered variables use the configured binning and title. Anything else
/// (a store written for an ad-hoc variable) takes the binning recorded with
/// its histograms and is titled by its name.
fn plot_binning(
    config: &AnalysisConfig,
    store: &HistogramStore,
    variable: &str,
) -> Result<(BinSpec, String)> {
    let registry = config.registry()?;
    if let Ok(def) = registry.get(variable) {
        return Ok((def.spec, registry.title(variable)?.to_string()));
    }
    let stored = store
        .histograms()
        .find(|h| h.key.variable == variable)
        .ok_or_else(|| qs_core::Error::UnknownVariable(variable.to_string()))?;
    tracing::debug!(variable, "variable not configured, using stored binning");
    Ok((stored.spec, variable.to_string()))
}

/// Build the stack, overlays and scaled data of `variable` from a store.
///
/// Stack layers are resolved as stored processes, composites or the
/// configured background estimate, in the configured order.
pub fn compose_plot(
    config: &AnalysisConfig,
    store: &HistogramStore,
    variable: &str,
) -> Result<StackComposition> {
    let (spec, x_title) = plot_binning(config, store, variable)?;
    let plot = &config.plot;
    let composites = &config.composites;

    let mut layers = Vec::with_capacity(plot.stack.len());
    for label in &plot.stack {
        let h = match &plot.estimate {
            Some(def) if def.name == *label => {
                estimate_background(store, composites, def, variable)?
            }
            _ => resolve(store, composites, label, variable, Sign::Opposite)?,
        };
        if h.n_bins() != spec.count {
            return Err(qs_core::Error::shape(label.as_str(), spec.count, h.n_bins()));
        }
        layers.push((label.clone(), h));
    }
    let layers = stack(layers)?;

    let signals = plot
        .signals
        .iter()
        .map(|label| {
            let h = resolve(store, composites, label, variable, Sign::Opposite)?;
            Ok(Overlay {
                label: label.clone(),
                histogram: scale(&h, plot.signal_scale),
                scale: plot.signal_scale,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let raw_data = resolve(store, composites, &plot.data, variable, Sign::Opposite)?;
    let data_scale = plot.data_scale.factor(&layers, &raw_data)?;
    let data = Overlay {
        label: "Data".into(),
        histogram: scale(&raw_data, data_scale),
        scale: data_scale,
    };

    let y_max = signals
        .iter()
        .map(|s| s.histogram.max())
        .fold(stack_max(&layers).max(data.histogram.max()), f64::max)
        * Y_HEADROOM;

    tracing::info!(
        variable,
        layers = layers.len(),
        signals = signals.len(),
        data_scale,
        "plot composed"
    );

    Ok(StackComposition {
        variable: variable.to_string(),
        spec,
        x_title,
        y_title: plot.y_title.clone(),
        layers,
        signals,
        data,
        y_max,
    })
}
