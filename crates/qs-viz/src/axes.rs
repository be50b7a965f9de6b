//! Axis ticks and the data→pixel mapping of the plot area.

/// Linear axis with fixed limits and "nice number" ticks inside them.
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
}

impl Axis {
    /// Axis spanning exactly `[min, max]`, ticked at multiples of a nice step.
    pub fn linear(min: f64, max: f64, target_ticks: usize) -> Self {
        let (min, max) = if (max - min).abs() < 1e-15 { (min, min + 1.0) } else { (min, max) };
        let step = nice_step((max - min) / (target_ticks.max(2) - 1) as f64);
        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        let mut k = (min / step).ceil();
        loop {
            let v = k * step;
            if v > max + step * 1e-9 {
                break;
            }
            ticks.push(v);
            labels.push(format_tick(v, step));
            k += 1.0;
        }
        Self { min, max, tick_positions: ticks, tick_labels: labels }
    }

    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = (value - self.min) / (self.max - self.min);
        px_min + frac * (px_max - px_min)
    }
}

fn nice_step(rough: f64) -> f64 {
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice_frac = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice_frac * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };
    if decimals == 0 {
        // avoid "-0"
        let v = if value.abs() < step * 0.01 { 0.0 } else { value };
        format!("{}", v.round() as i64)
    } else {
        format!("{:.prec$}", value, prec = decimals)
    }
}

/// Pixel rectangle of the frame inside the canvas.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    /// Area left after removing fractional margins from a canvas.
    pub fn from_margins(canvas_w: f64, canvas_h: f64, margins: &crate::style::Margins) -> Self {
        let left = canvas_w * margins.left;
        let top = canvas_h * margins.top;
        Self {
            left,
            top,
            width: canvas_w * (1.0 - margins.left - margins.right),
            height: canvas_h * (1.0 - margins.top - margins.bottom),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn x(&self, axis: &Axis, value: f64) -> f64 {
        axis.data_to_pixel(value, self.left, self.right())
    }

    /// Pixel y of `value`; larger values are higher on the canvas.
    pub fn y(&self, axis: &Axis, value: f64) -> f64 {
        axis.data_to_pixel(value, self.bottom(), self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ticks_stay_inside_limits() {
        let ax = Axis::linear(0.0, 140.0, 6);
        assert_eq!(ax.min, 0.0);
        assert_eq!(ax.max, 140.0);
        assert_eq!(ax.tick_labels, ["0", "20", "40", "60", "80", "100", "120", "140"]);
        assert!(ax.tick_positions.iter().all(|&t| (0.0..=140.0).contains(&t)));
    }

    #[test]
    fn fractional_steps_keep_decimals() {
        let ax = Axis::linear(0.0, 1.0, 6);
        assert_eq!(ax.tick_labels.first().map(String::as_str), Some("0.0"));
        assert_eq!(ax.tick_labels.last().map(String::as_str), Some("1.0"));
    }

    #[test]
    fn degenerate_range_is_widened() {
        let ax = Axis::linear(3.0, 3.0, 5);
        assert!(ax.max > ax.min);
    }

    #[test]
    fn pixel_mapping_flips_y() {
        let ax = Axis::linear(0.0, 100.0, 5);
        let area = PlotArea { left: 10.0, top: 20.0, width: 200.0, height: 100.0 };
        assert_relative_eq!(area.x(&ax, 50.0), 110.0);
        assert_relative_eq!(area.y(&ax, 0.0), 120.0);
        assert_relative_eq!(area.y(&ax, 100.0), 20.0);
    }
}
