// Image loading module
// Validates and decodes the logo the user hands us

use crate::error::{Error, Result};
use crate::geometry::Size;
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Extensions rejected before any read or decode attempt
const VECTOR_EXTENSIONS: &[&str] = &["svg", "svgz", "pdf", "eps", "ai", "ps"];

/// Decoded logo, immutable once loaded
#[derive(Debug, Clone)]
pub struct Logo {
    /// Where the logo came from (file path, or `None` for stdin)
    pub source: Option<PathBuf>,
    /// RGBA pixels with straight alpha
    pub pixels: RgbaImage,
}

impl Logo {
    pub fn size(&self) -> Size {
        let (width, height) = self.pixels.dimensions();
        Size::new(width, height)
    }

    /// Short description for log lines
    pub fn describe(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "<stdin>".to_string(),
        }
    }
}

/// Load a logo from a file path
pub fn load_logo(path: &Path) -> Result<Logo> {
    check_extension(path)?;

    let data = fs::read(path)
        .map_err(|e| Error::io(format!("Failed to read image file {}", path.display()), e))?;
    let mut logo = load_logo_from_bytes(&data)?;
    logo.source = Some(path.to_path_buf());
    Ok(logo)
}

/// Load a logo from raw bytes (stdin), auto-detecting the format
pub fn load_logo_from_bytes(data: &[u8]) -> Result<Logo> {
    if looks_like_vector(data) {
        return Err(Error::UnsupportedFileType(PathBuf::from("<stdin>")));
    }

    let format = image::guess_format(data)?;
    if !is_supported_format(format) {
        return Err(Error::UnsupportedFileType(PathBuf::from(format!(
            "<{}>",
            format.extensions_str().first().copied().unwrap_or("unknown")
        ))));
    }

    let img = image::load(Cursor::new(data), format)?;
    ensure_alpha(&img, format)?;

    debug!(
        "Decoded {:?} logo: {}x{} ({:?})",
        format,
        img.width(),
        img.height(),
        img.color()
    );

    Ok(Logo {
        source: None,
        pixels: img.to_rgba8(),
    })
}

/// Reject vector and unknown extensions without touching the file
pub fn check_extension(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if VECTOR_EXTENSIONS.contains(&ext.as_str()) || format_from_extension(&ext).is_none() {
        return Err(Error::UnsupportedFileType(path.to_path_buf()));
    }
    Ok(())
}

/// Raster formats that can carry an alpha channel
pub fn format_from_extension(ext: &str) -> Option<ImageFormat> {
    match ext.to_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "webp" => Some(ImageFormat::WebP),
        "gif" => Some(ImageFormat::Gif),
        "tiff" | "tif" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

fn is_supported_format(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Gif | ImageFormat::Tiff
    )
}

fn ensure_alpha(img: &DynamicImage, format: ImageFormat) -> Result<()> {
    if !img.color().has_alpha() {
        return Err(Error::MissingAlphaChannel);
    }
    // GIF always decodes as RGBA; only a transparent palette entry counts
    if format == ImageFormat::Gif && !has_transparent_pixel(img) {
        return Err(Error::MissingAlphaChannel);
    }
    Ok(())
}

fn has_transparent_pixel(img: &DynamicImage) -> bool {
    match img.as_rgba8() {
        Some(rgba) => rgba.pixels().any(|p| p.0[3] < u8::MAX),
        None => img.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX),
    }
}

/// Sniff SVG/XML/PDF/PostScript payloads so they never reach the decoder
fn looks_like_vector(data: &[u8]) -> bool {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let head = &data[start..data.len().min(start + 256)];
    let head_lower = head.to_ascii_lowercase();

    head_lower.starts_with(b"<svg")
        || head_lower.starts_with(b"<?xml")
        || head_lower.starts_with(b"<!doctype svg")
        || head.starts_with(b"%PDF")
        || head.starts_with(b"%!PS")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    fn rgba_logo(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(width, height, Rgba([10, 20, 30, 128])))
    }

    #[test]
    fn loads_png_with_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        fs::write(&path, png_bytes(rgba_logo(12, 34))).unwrap();

        let logo = load_logo(&path).unwrap();
        assert_eq!(logo.size(), Size::new(12, 34));
        assert_eq!(logo.source.as_deref(), Some(path.as_path()));
        assert_eq!(logo.pixels.get_pixel(0, 0), &Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn rejects_vector_before_reading() {
        // The file does not exist; the extension alone must be enough
        for name in ["missing.svg", "missing.SVG", "missing.pdf", "missing.svgz"] {
            let err = load_logo(Path::new(name)).unwrap_err();
            assert!(matches!(err, Error::UnsupportedFileType(_)), "{name}: {err}");
        }
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_logo(Path::new("logo.jpg")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
        let err = load_logo(Path::new("logo")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn rejects_png_without_alpha() {
        let opaque = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([1, 2, 3])));
        let err = load_logo_from_bytes(&png_bytes(opaque)).unwrap_err();
        assert!(matches!(err, Error::MissingAlphaChannel));
    }

    fn gif_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Gif).unwrap();
        out
    }

    #[test]
    fn rejects_opaque_gif() {
        let opaque = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([200, 10, 10])));
        let err = load_logo_from_bytes(&gif_bytes(opaque)).unwrap_err();
        assert!(matches!(err, Error::MissingAlphaChannel));
    }

    #[test]
    fn accepts_gif_with_transparency() {
        let mut img = ImageBuffer::from_pixel(4, 4, Rgba([200, 10, 10, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let logo = load_logo_from_bytes(&gif_bytes(DynamicImage::ImageRgba8(img))).unwrap();
        assert_eq!(logo.pixels.get_pixel(0, 0)[3], 0);
        assert_eq!(logo.pixels.get_pixel(3, 3)[3], 255);
    }

    #[test]
    fn rejects_piped_svg() {
        let svg = b"  <?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        let err = load_logo_from_bytes(svg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
        assert!(looks_like_vector(b"%PDF-1.7"));
        assert!(!looks_like_vector(&png_bytes(rgba_logo(1, 1))));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = load_logo_from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
