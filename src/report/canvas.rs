use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    pub dash: Option<String>,
}

impl LineStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: Some("4 3".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn as_svg(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub anchor: TextAnchor,
    pub bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 11.0,
            color: Color::BLACK,
            anchor: TextAnchor::Start,
            bold: false,
        }
    }
}

/// An SVG element stored for deferred rendering.
#[derive(Debug, Clone)]
enum SvgElement {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Color,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        style: LineStyle,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Color,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        style: TextStyle,
    },
}

/// Immediate-mode SVG canvas. Coordinates in points, origin top-left.
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    elements: Vec<SvgElement>,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: Color) {
        self.elements.push(SvgElement::Rect { x, y, w, h, fill });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        self.elements.push(SvgElement::Line {
            x1,
            y1,
            x2,
            y2,
            style: style.clone(),
        });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: Color) {
        self.elements.push(SvgElement::Circle { cx, cy, r, fill });
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        self.elements.push(SvgElement::Text {
            x,
            y,
            content: content.to_owned(),
            style: style.clone(),
        });
    }

    /// Rough text width for layout; sans-serif glyphs average ~0.55em.
    pub fn measure_text(&self, content: &str, style: &TextStyle) -> f64 {
        content.chars().count() as f64 * style.size * 0.55
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="Helvetica, Arial, sans-serif">"#,
            w = self.width,
            h = self.height
        );
        for el in &self.elements {
            render_element(&mut out, el);
        }
        out.push_str("</svg>\n");
        out
    }
}

fn render_element(out: &mut String, el: &SvgElement) {
    // Writing into a String cannot fail.
    let _ = match el {
        SvgElement::Rect { x, y, w, h, fill } => writeln!(
            out,
            r#"  <rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{}"/>"#,
            fill.to_hex()
        ),
        SvgElement::Line {
            x1,
            y1,
            x2,
            y2,
            style,
        } => {
            let dash = style
                .dash
                .as_ref()
                .map(|d| format!(r#" stroke-dasharray="{d}""#))
                .unwrap_or_default();
            writeln!(
                out,
                r#"  <line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{}" stroke-width="{:.2}"{dash}/>"#,
                style.color.to_hex(),
                style.width
            )
        }
        SvgElement::Circle { cx, cy, r, fill } => writeln!(
            out,
            r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}"/>"#,
            fill.to_hex()
        ),
        SvgElement::Text {
            x,
            y,
            content,
            style,
        } => writeln!(
            out,
            r#"  <text x="{x:.2}" y="{y:.2}" font-size="{:.1}" fill="{}" text-anchor="{}"{}>{}</text>"#,
            style.size,
            style.color.to_hex(),
            style.anchor.as_svg(),
            if style.bold { r#" font-weight="bold""# } else { "" },
            escape_xml(content)
        ),
    };
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
