// Compositing module
// Paints the background and the fitted logo onto a display-sized canvas

use crate::color::BackgroundColor;
use crate::error::{Error, Result};
use crate::geometry::{fit_logo_rect, LogoRatio, Size};
use crate::image_loader::Logo;
use image::{imageops, ImageBuffer, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Composite `logo` over a solid `color` canvas of exactly `canvas` pixels
pub fn composite(
    logo: &Logo,
    color: BackgroundColor,
    canvas: Size,
    ratio: LogoRatio,
) -> Result<RgbaImage> {
    if canvas.is_empty() {
        return Err(Error::ImageConversion(format!(
            "canvas {canvas} has no pixels"
        )));
    }

    let mut out: RgbaImage =
        ImageBuffer::from_pixel(canvas.width, canvas.height, color.to_opaque_rgba());

    let rect = fit_logo_rect(logo.size(), canvas, ratio);
    let (x, y, width, height) = rect.to_pixels();
    if width == 0 || height == 0 {
        return Ok(out);
    }

    if (width, height) == logo.pixels.dimensions() {
        imageops::overlay(&mut out, &logo.pixels, x, y);
    } else {
        let scaled = imageops::resize(&logo.pixels, width, height, imageops::FilterType::Lanczos3);
        imageops::overlay(&mut out, &scaled, x, y);
    }

    Ok(out)
}

/// Encode a bitmap as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::ImageConversion(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn logo(width: u32, height: u32, px: Rgba<u8>) -> Logo {
        Logo {
            source: None,
            pixels: ImageBuffer::from_pixel(width, height, px),
        }
    }

    #[test]
    fn output_matches_canvas_size() {
        let logo = logo(100, 400, Rgba([255, 255, 255, 255]));
        for canvas in [Size::new(1080, 1920), Size::new(64, 48), Size::new(1, 1), Size::new(333, 77)] {
            let out = composite(&logo, BackgroundColor::BLACK, canvas, LogoRatio::default()).unwrap();
            assert_eq!(out.dimensions(), (canvas.width, canvas.height));
        }
    }

    #[test]
    fn paints_background_and_centers_logo() {
        let bg = BackgroundColor::rgb(0, 0, 255);
        let logo = logo(10, 10, Rgba([255, 0, 0, 255]));
        let out = composite(&logo, bg, Size::new(100, 50), LogoRatio::new(0.5).unwrap()).unwrap();

        // 10x10 fitted into 50x25 max -> 25x25 centered at (37.5, 12.5)
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(99, 49), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(50, 25), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(20, 25), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn transparent_logo_leaves_background() {
        let bg = BackgroundColor::rgb(12, 34, 56);
        let logo = logo(8, 8, Rgba([255, 255, 255, 0]));
        let out = composite(&logo, bg, Size::new(32, 32), LogoRatio::new(1.0).unwrap()).unwrap();
        assert!(out.pixels().all(|p| *p == Rgba([12, 34, 56, 255])));
    }

    #[test]
    fn zero_size_logo_is_background_only() {
        let logo = Logo {
            source: None,
            pixels: RgbaImage::new(0, 0),
        };
        let out = composite(&logo, BackgroundColor::rgb(1, 2, 3), Size::new(16, 9), LogoRatio::default()).unwrap();
        assert_eq!(out.dimensions(), (16, 9));
        assert!(out.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn empty_canvas_is_a_conversion_error() {
        let logo = logo(4, 4, Rgba([0, 0, 0, 255]));
        let err = composite(&logo, BackgroundColor::BLACK, Size::new(0, 100), LogoRatio::default()).unwrap_err();
        assert!(matches!(err, Error::ImageConversion(_)));
    }

    #[test]
    fn encodes_png() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([9, 9, 9, 255]));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }
}
