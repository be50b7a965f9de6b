use std::fmt::{self, Write as FmtWrite};

use crate::primitives::*;

#[derive(Debug, Clone)]
enum SvgElement {
    Rect { x: f64, y: f64, w: f64, h: f64, style: Style },
    Line { x1: f64, y1: f64, x2: f64, y2: f64, style: LineStyle },
    Polyline { points: Vec<(f64, f64)>, style: LineStyle },
    Text { x: f64, y: f64, content: String, style: TextStyle, rotate: Option<f64> },
    Circle { cx: f64, cy: f64, r: f64, style: Style },
    GroupStart { clip_id: Option<String> },
    GroupEnd,
}

/// Immediate-mode SVG canvas in pixels, origin at the top left.
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    elements: Vec<SvgElement>,
    defs: Vec<String>,
    open_groups: usize,
    next_clip_id: usize,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
            defs: Vec::new(),
            open_groups: 0,
            next_clip_id: 0,
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: &Style) {
        self.elements.push(SvgElement::Rect { x, y, w, h, style: style.clone() });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        self.elements.push(SvgElement::Line { x1, y1, x2, y2, style: style.clone() });
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], style: &LineStyle) {
        if points.len() < 2 {
            return;
        }
        self.elements.push(SvgElement::Polyline { points: points.to_vec(), style: style.clone() });
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        self.elements.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            style: style.clone(),
            rotate: None,
        });
    }

    pub fn text_rotated(&mut self, x: f64, y: f64, content: &str, style: &TextStyle, angle: f64) {
        self.elements.push(SvgElement::Text {
            x,
            y,
            content: content.to_string(),
            style: style.clone(),
            rotate: Some(angle),
        });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, style: &Style) {
        self.elements.push(SvgElement::Circle { cx, cy, r, style: style.clone() });
    }

    /// Vertical error bar without caps.
    pub fn error_bar(&mut self, x: f64, y_lo: f64, y_hi: f64, style: &LineStyle) {
        self.line(x, y_lo, x, y_hi, style);
    }

    pub fn marker(&mut self, x: f64, y: f64, marker: &MarkerStyle) {
        let style = Style::outlined(marker.color, marker.color, 0.5);
        self.circle(x, y, marker.size, &style);
    }

    /// Clip everything drawn until the matching [`Canvas::pop_clip`] to a rectangle.
    pub fn push_clip(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("clip{}", self.next_clip_id);
        self.next_clip_id += 1;
        self.defs.push(format!(
            r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" /></clipPath>"#
        ));
        self.elements.push(SvgElement::GroupStart { clip_id: Some(id.clone()) });
        self.open_groups += 1;
        id
    }

    pub fn pop_clip(&mut self) {
        if self.open_groups > 0 {
            self.open_groups -= 1;
            self.elements.push(SvgElement::GroupEnd);
        }
    }

    pub fn finish_svg(&self) -> Result<String, fmt::Error> {
        let mut out = String::with_capacity(32 * 1024);
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        )?;
        if !self.defs.is_empty() {
            out.push_str("<defs>\n");
            for d in &self.defs {
                out.push_str(d);
                out.push('\n');
            }
            out.push_str("</defs>\n");
        }
        writeln!(out, r#"<rect width="{}" height="{}" fill="white" />"#, self.width, self.height)?;
        for elem in &self.elements {
            render_element(&mut out, elem)?;
        }
        for _ in 0..self.open_groups {
            out.push_str("</g>\n");
        }
        out.push_str("</svg>\n");
        Ok(out)
    }
}

fn render_element(out: &mut String, elem: &SvgElement) -> fmt::Result {
    match elem {
        SvgElement::Rect { x, y, w, h, style } => {
            write!(out, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#)?;
            write_style_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Line { x1, y1, x2, y2, style } => {
            write!(out, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#)?;
            write_line_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Polyline { points, style } => {
            out.push_str(r#"<polyline points=""#);
            for (i, (x, y)) in points.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write!(out, "{x:.2},{y:.2}")?;
            }
            out.push_str(r#"" fill="none""#);
            write_line_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Text { x, y, content, style, rotate } => {
            write!(out, r#"<text x="{x:.2}" y="{y:.2}""#)?;
            out.push_str(r#" font-family="Helvetica, Arial, sans-serif""#);
            write!(out, r#" font-size="{:.1}""#, style.size)?;
            write!(out, r#" fill="{}""#, style.color.to_svg_fill())?;
            write!(out, r#" text-anchor="{}""#, style.anchor.as_str())?;
            write!(out, r#" dominant-baseline="{}""#, style.baseline.as_str())?;
            if let Some(angle) = rotate {
                write!(out, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#)?;
            }
            out.push('>');
            out.push_str(&escape_xml(content));
            out.push_str("</text>\n");
        }
        SvgElement::Circle { cx, cy, r, style } => {
            write!(out, r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}""#)?;
            write_style_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::GroupStart { clip_id } => {
            out.push_str("<g");
            if let Some(id) = clip_id {
                write!(out, r#" clip-path="url(#{id})""#)?;
            }
            out.push_str(">\n");
        }
        SvgElement::GroupEnd => out.push_str("</g>\n"),
    }
    Ok(())
}

fn write_style_attrs(out: &mut String, style: &Style) -> fmt::Result {
    match &style.fill {
        Some(fill) => write!(out, r#" fill="{}""#, fill.to_svg_fill())?,
        None => out.push_str(r#" fill="none""#),
    }
    if let Some((color, width)) = &style.stroke {
        write!(out, r#" stroke="{}" stroke-width="{width:.2}""#, color.to_svg_fill())?;
    }
    Ok(())
}

fn write_line_attrs(out: &mut String, style: &LineStyle) -> fmt::Result {
    write!(out, r#" stroke="{}" stroke-width="{:.2}""#, style.color.to_svg_fill(), style.width)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn renders_elements_in_order() {
        let mut c = Canvas::new(100.0, 50.0);
        c.rect(1.0, 2.0, 3.0, 4.0, &Style::filled(Color::rgb(255, 0, 0)));
        c.text(5.0, 6.0, "a<b & c", &TextStyle::new(10.0));
        let svg = c.finish_svg().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        let rect = svg.find(r##"fill="#ff0000""##).unwrap();
        let text = svg.find("a&lt;b &amp; c").unwrap();
        assert!(rect < text);
    }

    #[test]
    fn clip_groups_are_balanced() {
        let mut c = Canvas::new(10.0, 10.0);
        let id = c.push_clip(0.0, 0.0, 5.0, 5.0);
        c.line(0.0, 0.0, 10.0, 10.0, &LineStyle::new(Color::BLACK, 1.0));
        let svg = c.finish_svg().unwrap();
        assert!(svg.contains(&format!(r#"clip-path="url(#{id})""#)));
        assert_eq!(svg.matches("<g").count(), svg.matches("</g>").count());
        c.pop_clip();
        c.pop_clip();
        let svg = c.finish_svg().unwrap();
        assert_eq!(svg.matches("<g").count(), svg.matches("</g>").count());
    }

    #[test]
    fn single_point_polyline_is_dropped() {
        let mut c = Canvas::new(10.0, 10.0);
        c.polyline(&[(1.0, 1.0)], &LineStyle::new(Color::BLACK, 1.0));
        assert!(!c.finish_svg().unwrap().contains("polyline"));
    }
}
