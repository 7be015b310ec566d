// Geometry module
// Logo placement, preview sizing and aspect-ratio labels

use crate::error::{Error, Result};
use std::fmt;

/// Default fraction of the canvas the logo may occupy
pub const DEFAULT_LOGO_RATIO: f64 = 0.5;

/// Integer pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle in canvas coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Integer placement for rasterizing: (x, y, width, height)
    ///
    /// Non-empty rectangles keep at least one pixel per side so a tiny
    /// ratio on a small canvas still draws something.
    pub fn to_pixels(&self) -> (i64, i64, u32, u32) {
        if self.is_empty() {
            return (self.x.round() as i64, self.y.round() as i64, 0, 0);
        }
        let width = (self.width.round() as u32).max(1);
        let height = (self.height.round() as u32).max(1);
        (self.x.round() as i64, self.y.round() as i64, width, height)
    }
}

/// Maximum fraction of the canvas width/height the logo may cover, in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoRatio(f64);

impl LogoRatio {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(Error::InvalidRatio(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for LogoRatio {
    fn default() -> Self {
        Self(DEFAULT_LOGO_RATIO)
    }
}

impl fmt::Display for LogoRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fit the logo inside `ratio` of the canvas, centered, preserving aspect ratio
///
/// The logo is first fitted to the allowed width; if that makes it taller
/// than the allowed height it is shrunk to the height instead.
pub fn fit_logo_rect(logo: Size, canvas: Size, ratio: LogoRatio) -> Rect {
    let canvas_w = canvas.width as f64;
    let canvas_h = canvas.height as f64;

    if logo.is_empty() {
        return Rect {
            x: canvas_w / 2.0,
            y: canvas_h / 2.0,
            width: 0.0,
            height: 0.0,
        };
    }

    let aspect = logo.height as f64 / logo.width as f64;
    let max_w = canvas_w * ratio.get();
    let max_h = canvas_h * ratio.get();

    let mut width = max_w;
    let mut height = width * aspect;
    if height > max_h {
        height = max_h;
        width = height / aspect;
    }

    Rect {
        x: (canvas_w - width) / 2.0,
        y: (canvas_h - height) / 2.0,
        width,
        height,
    }
}

/// Scale `canvas` down so neither side exceeds `max_dimension`
pub fn preview_size(canvas: Size, max_dimension: u32) -> Size {
    if canvas.width <= max_dimension && canvas.height <= max_dimension {
        return canvas;
    }

    let scale_x = max_dimension as f64 / canvas.width as f64;
    let scale_y = max_dimension as f64 / canvas.height as f64;
    let scale = scale_x.min(scale_y);

    let width = (canvas.width as f64 * scale).round() as u32;
    let height = (canvas.height as f64 * scale).round() as u32;

    Size::new(width.clamp(1, max_dimension), height.clamp(1, max_dimension))
}

/// Greatest common divisor (Euclid)
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Reduced aspect ratio text such as `16:9`
pub fn aspect_ratio_label(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "0:0".to_string();
    }
    let d = gcd(width, height);
    format!("{}:{}", width / d, height / d)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn ratio(v: f64) -> LogoRatio {
        LogoRatio::new(v).unwrap()
    }

    #[test]
    fn tall_logo_on_portrait_canvas() {
        let rect = fit_logo_rect(Size::new(100, 400), Size::new(1080, 1920), ratio(0.5));
        assert!(rect.height <= 960.0 + EPSILON);
        assert!(rect.width <= 540.0 + EPSILON);
        assert!((rect.width / rect.height - 0.25).abs() < 1e-9);
        // Height-bound: shrinks to exactly the allowed height
        assert!((rect.height - 960.0).abs() < EPSILON);
        assert!((rect.x - (1080.0 - rect.width) / 2.0).abs() < EPSILON);
    }

    #[test]
    fn wide_logo_is_width_bound() {
        let rect = fit_logo_rect(Size::new(400, 100), Size::new(1920, 1080), ratio(0.5));
        assert!((rect.width - 960.0).abs() < EPSILON);
        assert!((rect.height - 240.0).abs() < EPSILON);
        assert!((rect.y - 420.0).abs() < EPSILON);
    }

    #[test]
    fn fitted_rect_respects_bounds() {
        let logos = [(1, 1), (100, 400), (400, 100), (3, 7), (5000, 17), (17, 5000)];
        let canvases = [(1, 1), (640, 480), (1080, 1920), (2560, 1440), (5120, 2880), (7, 3)];
        let ratios = [0.01, 0.1, 0.33, 0.5, 0.75, 1.0];

        for &(lw, lh) in &logos {
            for &(cw, ch) in &canvases {
                for &r in &ratios {
                    let rect = fit_logo_rect(Size::new(lw, lh), Size::new(cw, ch), ratio(r));
                    assert!(rect.width <= r * cw as f64 + EPSILON, "{lw}x{lh} in {cw}x{ch} @ {r}");
                    assert!(rect.height <= r * ch as f64 + EPSILON, "{lw}x{lh} in {cw}x{ch} @ {r}");
                    let expected = lw as f64 / lh as f64;
                    assert!((rect.width / rect.height - expected).abs() / expected < 1e-9);
                    // Centered
                    assert!((rect.x * 2.0 + rect.width - cw as f64).abs() < EPSILON);
                    assert!((rect.y * 2.0 + rect.height - ch as f64).abs() < EPSILON);
                }
            }
        }
    }

    #[test]
    fn zero_size_logo_yields_centered_empty_rect() {
        for logo in [Size::new(0, 0), Size::new(0, 50), Size::new(50, 0)] {
            let rect = fit_logo_rect(logo, Size::new(1920, 1080), ratio(0.5));
            assert_eq!(rect.width, 0.0);
            assert_eq!(rect.height, 0.0);
            assert_eq!(rect.x, 960.0);
            assert_eq!(rect.y, 540.0);
            assert_eq!(rect.to_pixels(), (960, 540, 0, 0));
        }
    }

    #[test]
    fn ratio_bounds() {
        assert!(LogoRatio::new(1.0).is_ok());
        assert!(LogoRatio::new(0.001).is_ok());
        assert!(LogoRatio::new(0.0).is_err());
        assert!(LogoRatio::new(-0.5).is_err());
        assert!(LogoRatio::new(1.01).is_err());
        assert!(LogoRatio::new(f64::NAN).is_err());
        assert_eq!(LogoRatio::default().get(), DEFAULT_LOGO_RATIO);
    }

    #[test]
    fn preview_size_caps_larger_side() {
        assert_eq!(preview_size(Size::new(5120, 2880), 512), Size::new(512, 288));
        assert_eq!(preview_size(Size::new(1080, 1920), 512), Size::new(288, 512));
        assert_eq!(preview_size(Size::new(300, 200), 512), Size::new(300, 200));
        assert_eq!(preview_size(Size::new(10000, 1), 512), Size::new(512, 1));
    }

    #[test]
    fn aspect_labels() {
        assert_eq!(gcd(2560, 1440), 160);
        assert_eq!(aspect_ratio_label(2560, 1440), "16:9");
        assert_eq!(aspect_ratio_label(1920, 1200), "8:5");
        assert_eq!(aspect_ratio_label(1080, 1920), "9:16");
        assert_eq!(aspect_ratio_label(0, 1080), "0:0");
    }

    #[test]
    fn tiny_rect_keeps_one_pixel() {
        let rect = fit_logo_rect(Size::new(1000, 1), Size::new(10, 10), ratio(0.5));
        let (_, _, w, h) = rect.to_pixels();
        assert_eq!(w, 5);
        assert_eq!(h, 1);
    }
}
