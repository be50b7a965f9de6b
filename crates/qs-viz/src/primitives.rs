use crate::color::Color;

/// Fill and optional outline of a rectangle or marker.
#[derive(Debug, Clone)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<(Color, f64)>,
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self { fill: Some(color), stroke: None }
    }

    pub fn outlined(fill: Color, stroke: Color, width: f64) -> Self {
        Self { fill: Some(fill), stroke: Some((stroke, width)) }
    }
}

/// Solid stroke.
#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
}

impl LineStyle {
    pub fn new(color: Color, width: f64) -> Self {
        Self { color, width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    #[default]
    Alphabetic,
    Middle,
    Hanging,
}

impl TextBaseline {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextBaseline::Alphabetic => "alphabetic",
            TextBaseline::Middle => "central",
            TextBaseline::Hanging => "hanging",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub anchor: TextAnchor,
    pub baseline: TextBaseline,
}

impl TextStyle {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            color: Color::BLACK,
            anchor: TextAnchor::Start,
            baseline: TextBaseline::Alphabetic,
        }
    }

    pub fn anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn baseline(mut self, baseline: TextBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    /// Rough advance width of `content` for layout (no font metrics).
    pub fn approx_width(&self, content: &str) -> f64 {
        content.chars().count() as f64 * self.size * 0.55
    }
}

/// Filled circle marker of observed data.
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    pub color: Color,
    pub size: f64,
}
