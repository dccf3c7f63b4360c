//! Box geometry in CSS pixels

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, shaped like a DOMRect
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Parses a computed length such as `"-10px"` or `"0"`. Keywords like
/// `auto` yield `None`.
pub fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Formats a pixel value for markup: integral values without a fraction,
/// others rounded to three decimals.
pub fn format_px(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    // adding 0.0 turns -0 into 0
    format!("{}", rounded + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.right(), 40.0);
        assert_eq!(rect.bottom(), 60.0);
        assert!(rect.has_area());
        assert!(!Rect::new(0.0, 0.0, 0.0, 5.0).has_area());
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("-10px"), Some(-10.0));
        assert_eq!(parse_px(" 4.5px "), Some(4.5));
        assert_eq!(parse_px("0"), Some(0.0));
        assert_eq!(parse_px("auto"), None);
        assert_eq!(parse_px(""), None);
    }

    #[test]
    fn test_format_px() {
        assert_eq!(format_px(26.0), "26");
        assert_eq!(format_px(-0.0), "0");
        assert_eq!(format_px(0.1 + 0.2), "0.3");
        assert_eq!(format_px(12.3456), "12.346");
    }
}
