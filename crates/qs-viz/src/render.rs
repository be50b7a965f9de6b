//! SVG rendering of a [`StackPlotArtifact`].

use crate::artifact::StackPlotArtifact;
use crate::axes::{Axis, PlotArea};
use crate::canvas::Canvas;
use crate::color::Color;
use crate::primitives::*;
use crate::style::PlotStyle;
use crate::Result;

/// One row of the legend.
pub struct LegendEntry {
    /// Displayed text.
    pub label: String,
    /// Swatch color.
    pub color: Color,
    /// Swatch shape.
    pub kind: LegendKind,
}

/// Legend swatch shape, matching how the series is drawn.
pub enum LegendKind {
    /// Stack layer.
    FilledRect,
    /// Signal overlay.
    Line,
    /// Data points.
    Marker,
}

/// Draw the stacked comparison: filled layers, signal outlines, data points.
pub fn render_stack(artifact: &StackPlotArtifact, style: &PlotStyle) -> Result<String> {
    artifact.validate()?;
    style.validate()?;

    let mut canvas = Canvas::new(style.figure.width, style.figure.height);
    let area = PlotArea::from_margins(style.figure.width, style.figure.height, &style.margins);
    let edges = &artifact.bin_edges;
    let n_bins = artifact.n_bins();

    let x_min = edges[0];
    let x_max = edges[n_bins];
    let x_axis = Axis::linear(x_min, x_max, 6);
    let y_max = if artifact.y_max > 0.0 { artifact.y_max } else { 1.0 };
    let y_axis = Axis::linear(0.0, y_max, 6);

    let _clip = canvas.push_clip(area.left, area.top, area.width, area.height);

    for (li, layer) in artifact.layers.iter().enumerate() {
        let fill = style.color_for(&layer.label, li);
        let outline = Style::outlined(fill, Color::BLACK, style.lines.stack_outline);
        for bi in 0..n_bins {
            if layer.y[bi] <= 0.0 {
                continue;
            }
            let px_lo = area.x(&x_axis, edges[bi]);
            let px_hi = area.x(&x_axis, edges[bi + 1]);
            let py_base = area.y(&y_axis, layer.baseline[bi]);
            let py_top = area.y(&y_axis, layer.top[bi]);
            canvas.rect(px_lo, py_top, px_hi - px_lo, py_base - py_top, &outline);
        }
    }

    for (si, signal) in artifact.signals.iter().enumerate() {
        let color = style.color_for(&signal.label, artifact.layers.len() + si);
        let points = step_points(&area, &x_axis, &y_axis, edges, &signal.y);
        canvas.polyline(&points, &LineStyle::new(color, style.lines.signal));
    }

    let err_style = LineStyle::new(style.data_color, style.lines.data_error);
    let marker = MarkerStyle { color: style.data_color, size: style.lines.marker_radius };
    for bi in 0..n_bins {
        let y = artifact.data.y[bi];
        if y <= 0.0 {
            continue;
        }
        let err = artifact.data.yerr[bi];
        let px = area.x(&x_axis, 0.5 * (edges[bi] + edges[bi + 1]));
        let (py_lo, py_hi) = (area.y(&y_axis, (y - err).max(0.0)), area.y(&y_axis, y + err));
        canvas.error_bar(px, py_lo, py_hi, &err_style);
        canvas.marker(px, area.y(&y_axis, y), &marker);
    }

    canvas.pop_clip();

    draw_axes(&mut canvas, &area, &x_axis, &y_axis, style);
    draw_titles(&mut canvas, &area, &artifact.x_title, &artifact.y_title, style);
    draw_legend(&mut canvas, &area, &legend_entries(artifact, style), style);

    tracing::debug!(
        variable = %artifact.variable,
        layers = artifact.layers.len(),
        signals = artifact.signals.len(),
        "stack plot rendered"
    );
    Ok(canvas.finish_svg()?)
}

/// Outline of a histogram: horizontal across each bin, vertical at each edge.
fn step_points(
    area: &PlotArea,
    x: &Axis,
    y: &Axis,
    edges: &[f64],
    values: &[f64],
) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(2 * values.len() + 2);
    points.push((area.x(x, edges[0]), area.y(y, 0.0)));
    for (bi, &v) in values.iter().enumerate() {
        let py = area.y(y, v);
        points.push((area.x(x, edges[bi]), py));
        points.push((area.x(x, edges[bi + 1]), py));
    }
    points.push((area.x(x, edges[values.len()]), area.y(y, 0.0)));
    points
}

/// Stack layers bottom first, then signals, then data.
fn legend_entries(artifact: &StackPlotArtifact, style: &PlotStyle) -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = artifact
        .layers
        .iter()
        .enumerate()
        .map(|(li, layer)| LegendEntry {
            label: layer.legend.clone(),
            color: style.color_for(&layer.label, li),
            kind: LegendKind::FilledRect,
        })
        .collect();
    for (si, signal) in artifact.signals.iter().enumerate() {
        entries.push(LegendEntry {
            label: signal.legend.clone(),
            color: style.color_for(&signal.label, artifact.layers.len() + si),
            kind: LegendKind::Line,
        });
    }
    entries.push(LegendEntry {
        label: artifact.data.legend.clone(),
        color: style.data_color,
        kind: LegendKind::Marker,
    });
    entries
}

/// Lay `entries` out in columns in the top-left corner of the plot area.
pub fn draw_legend(
    canvas: &mut Canvas,
    area: &PlotArea,
    entries: &[LegendEntry],
    style: &PlotStyle,
) {
    if entries.is_empty() {
        return;
    }
    let cfg = &style.legend;
    let gap = 6.0;
    let text_style = TextStyle::new(style.font.legend_size).baseline(TextBaseline::Middle);
    let max_w = entries.iter().map(|e| text_style.approx_width(&e.label)).fold(0.0_f64, f64::max);
    let column_w = cfg.swatch + gap + max_w + 2.0 * gap;

    let x0 = area.left + cfg.x * area.width;
    let y0 = area.top + cfg.y * area.height;

    for (i, entry) in entries.iter().enumerate() {
        let (row, col) = (i / cfg.columns, i % cfg.columns);
        let sx = x0 + col as f64 * column_w;
        let ey = y0 + (row as f64 + 0.5) * cfg.row_height;
        let half = 0.5 * cfg.swatch;

        match entry.kind {
            LegendKind::FilledRect => {
                canvas.rect(
                    sx,
                    ey - half,
                    cfg.swatch,
                    cfg.swatch,
                    &Style::outlined(entry.color, Color::BLACK, style.lines.stack_outline),
                );
            }
            LegendKind::Line => {
                let line = LineStyle::new(entry.color, style.lines.signal);
                canvas.line(sx, ey, sx + cfg.swatch, ey, &line);
            }
            LegendKind::Marker => {
                let err = LineStyle::new(entry.color, style.lines.data_error);
                canvas.error_bar(sx + half, ey - half, ey + half, &err);
                canvas.marker(
                    sx + half,
                    ey,
                    &MarkerStyle { color: entry.color, size: style.lines.marker_radius },
                );
            }
        }
        canvas.text(sx + cfg.swatch + gap, ey, &entry.label, &text_style);
    }
}

/// Frame with inward ticks on all four sides and labels on the bottom and left.
pub fn draw_axes(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    style: &PlotStyle,
) {
    let frame = LineStyle::new(Color::BLACK, style.lines.frame);
    let tl = style.lines.tick_length;

    canvas.line(area.left, area.top, area.right(), area.top, &frame);
    canvas.line(area.left, area.bottom(), area.right(), area.bottom(), &frame);
    canvas.line(area.left, area.top, area.left, area.bottom(), &frame);
    canvas.line(area.right(), area.top, area.right(), area.bottom(), &frame);

    let x_label = TextStyle::new(style.font.tick_size)
        .anchor(TextAnchor::Middle)
        .baseline(TextBaseline::Hanging);
    for (val, label) in x_axis.tick_positions.iter().zip(&x_axis.tick_labels) {
        let px = area.x(x_axis, *val);
        canvas.line(px, area.bottom(), px, area.bottom() - tl, &frame);
        canvas.line(px, area.top, px, area.top + tl, &frame);
        canvas.text(px, area.bottom() + 4.0, label, &x_label);
    }

    let y_label = TextStyle::new(style.font.tick_size)
        .anchor(TextAnchor::End)
        .baseline(TextBaseline::Middle);
    for (val, label) in y_axis.tick_positions.iter().zip(&y_axis.tick_labels) {
        let py = area.y(y_axis, *val);
        canvas.line(area.left, py, area.left + tl, py, &frame);
        canvas.line(area.right(), py, area.right() - tl, py, &frame);
        canvas.text(area.left - 4.0, py, label, &y_label);
    }
}

/// Axis titles aligned to the far ends of their axes.
fn draw_titles(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_title: &str,
    y_title: &str,
    style: &PlotStyle,
) {
    let size = style.font.label_size;
    let x_style = TextStyle::new(size).anchor(TextAnchor::End).baseline(TextBaseline::Hanging);
    canvas.text(area.right(), area.bottom() + style.font.tick_size + 12.0, x_title, &x_style);

    let y_style = TextStyle::new(size).anchor(TextAnchor::End);
    let y_x = area.left - 0.6 * area.left;
    canvas.text_rotated(y_x, area.top, y_title, &y_style, -90.0);
}
