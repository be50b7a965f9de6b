//! Plot style: canvas geometry, fonts, line widths and process colors.
//!
//! A [`PlotStyle`] is built once (defaults, optionally overridden from a YAML
//! file) and handed to the renderer by reference.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::color::{Color, fallback_color};
use crate::{RenderError, Result};

/// Complete style of a stacked plot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotStyle {
    pub figure: FigureStyle,
    pub margins: Margins,
    pub font: FontStyle,
    pub lines: LineWidths,
    pub legend: LegendStyle,
    pub data_color: Color,
    /// Label → fill (stack) or line (signal) color.
    pub colors: HashMap<String, Color>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            figure: FigureStyle::default(),
            margins: Margins::default(),
            font: FontStyle::default(),
            lines: LineWidths::default(),
            legend: LegendStyle::default(),
            data_color: Color::BLACK,
            colors: default_colors(),
        }
    }
}

fn default_colors() -> HashMap<String, Color> {
    [
        ("ggH", Color::rgb(0xBF, 0x22, 0x29)),
        ("qqH", Color::rgb(0x00, 0xA8, 0x8F)),
        ("TT", Color::rgb(155, 152, 204)),
        ("W", Color::rgb(222, 90, 106)),
        ("QCD", Color::rgb(250, 202, 255)),
        ("ZLL", Color::rgb(248, 206, 104)),
        ("ZTT", Color::rgb(248, 206, 104)),
    ]
    .into_iter()
    .map(|(k, c)| (k.to_string(), c))
    .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FigureStyle {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self { width: 600.0, height: 600.0 }
    }
}

/// Margins as fractions of the canvas size.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self { top: 0.05, bottom: 0.13, left: 0.16, right: 0.05 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontStyle {
    pub label_size: f64,
    pub tick_size: f64,
    pub legend_size: f64,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self { label_size: 18.0, tick_size: 14.0, legend_size: 14.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineWidths {
    pub frame: f64,
    pub stack_outline: f64,
    pub signal: f64,
    pub data_error: f64,
    pub marker_radius: f64,
    pub tick_length: f64,
}

impl Default for LineWidths {
    fn default() -> Self {
        Self {
            frame: 1.0,
            stack_outline: 1.0,
            signal: 3.0,
            data_error: 1.0,
            marker_radius: 3.0,
            tick_length: 8.0,
        }
    }
}

/// Legend box position as fractions of the plot area, from its top-left.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegendStyle {
    pub x: f64,
    pub y: f64,
    pub columns: usize,
    pub row_height: f64,
    pub swatch: f64,
}

impl Default for LegendStyle {
    fn default() -> Self {
        Self { x: 0.04, y: 0.04, columns: 2, row_height: 22.0, swatch: 14.0 }
    }
}

impl PlotStyle {
    /// Defaults with the sections present in `yaml` replaced.
    ///
    /// Colors are merged: labels listed in the file override or extend the
    /// default palette.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut style: PlotStyle = serde_yaml_ng::from_str(yaml)?;
        let mut colors = default_colors();
        colors.extend(std::mem::take(&mut style.colors));
        style.colors = colors;
        style.validate()?;
        Ok(style)
    }

    /// Read a style file.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Reject sizes and fractions that cannot be drawn.
    pub fn validate(&self) -> Result<()> {
        let m = &self.margins;
        if !(self.figure.width > 0.0 && self.figure.height > 0.0) {
            return Err(RenderError::Style("figure size must be positive".into()));
        }
        if [m.top, m.bottom, m.left, m.right].iter().any(|v| !(0.0..1.0).contains(v))
            || m.left + m.right >= 1.0
            || m.top + m.bottom >= 1.0
        {
            return Err(RenderError::Style("margins must leave a non-empty plot area".into()));
        }
        if self.legend.columns == 0 {
            return Err(RenderError::Style("legend needs at least one column".into()));
        }
        Ok(())
    }

    /// Color of `label`; unknown labels take the `index`-th fallback color.
    pub fn color_for(&self, label: &str, index: usize) -> Color {
        self.colors.get(label).copied().unwrap_or_else(|| fallback_color(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_process_palette() {
        let s = PlotStyle::default();
        assert_eq!(s.color_for("W", 0), Color::rgb(222, 90, 106));
        assert_eq!(s.color_for("QCD", 0), Color::rgb(250, 202, 255));
        assert_eq!(s.color_for("Other", 1), fallback_color(1));
        assert_eq!(s.lines.signal, 3.0);
        s.validate().unwrap();
    }

    #[test]
    fn yaml_overrides_sections_and_merges_colors() {
        let s = PlotStyle::from_yaml_str(
            "figure: { width: 800, height: 500 }\ncolors: { W: '#000000', VV: '#112233' }\n",
        )
        .unwrap();
        assert_eq!(s.figure.width, 800.0);
        assert_eq!(s.margins.left, 0.16);
        assert_eq!(s.color_for("W", 0), Color::BLACK);
        assert_eq!(s.color_for("VV", 0), Color::rgb(0x11, 0x22, 0x33));
        assert_eq!(s.color_for("TT", 0), Color::rgb(155, 152, 204));
    }

    #[test]
    fn invalid_styles_are_rejected() {
        assert!(PlotStyle::from_yaml_str("margins: { left: 0.6, right: 0.5 }").is_err());
        assert!(PlotStyle::from_yaml_str("legend: { columns: 0 }").is_err());
        assert!(PlotStyle::from_yaml_str("colours: {}").is_err());
    }
}
