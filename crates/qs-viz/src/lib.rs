//! # qs-viz
//!
//! Stacked-plot artifacts and their SVG rendering.
//!
//! [`StackPlotArtifact`] flattens a composed stack into plain arrays (one
//! JSON file per variable); [`render_stack`] draws it with a [`PlotStyle`].

/// Stacked-plot artifacts (JSON).
pub mod artifact;
/// Axis scales and the plot area.
pub mod axes;
/// Deferred SVG canvas.
pub mod canvas;
/// RGB colors and the fallback palette.
pub mod color;
/// Drawing styles.
pub mod primitives;
/// Stack rendering.
pub mod render;
/// Plot style configuration.
pub mod style;

use thiserror::Error;

pub use artifact::{STACK_PLOT_V0, StackPlotArtifact, scaled_legend};
pub use color::Color;
pub use render::render_stack;
pub use style::PlotStyle;

/// Errors raised while reading artifacts or styles and drawing plots.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Artifact with a wrong schema version or inconsistent arrays.
    #[error("artifact schema error: {0}")]
    Schema(String),
    /// Plot style outside its valid ranges.
    #[error("style error: {0}")]
    Style(String),
    /// Artifact JSON could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Style YAML could not be parsed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    /// Reading an input file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Writing the SVG document failed.
    #[error("svg formatting error")]
    Format(#[from] std::fmt::Error),
}

/// Result alias for rendering.
pub type Result<T> = std::result::Result<T, RenderError>;
