// Generator module
// Composites one wallpaper per display, persists it and applies it

use crate::cache::{keep_set_of, PersistedMap, WallpaperCache};
use crate::color::BackgroundColor;
use crate::compositor::{composite, encode_png};
use crate::display::DisplayTarget;
use crate::error::{Error, Result};
use crate::geometry::{LogoRatio, Size};
use crate::image_loader::Logo;
use crate::wallpaper::WallpaperSetter;
use log::{debug, error, info};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What the user asked to render
#[derive(Debug, Clone)]
pub struct WallpaperRequest {
    pub logo: Arc<Logo>,
    pub color: BackgroundColor,
    pub ratio: LogoRatio,
}

/// One applied wallpaper
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedWallpaper {
    pub display: String,
    pub pixel_size: Size,
    pub path: PathBuf,
}

/// Outcome of a successful generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub applied: Vec<AppliedWallpaper>,
    /// Number of distinct pixel sizes actually composited
    pub rendered: usize,
}

/// Runs the per-display loop against a cache and a wallpaper backend
pub struct Generator {
    cache: Arc<WallpaperCache>,
    setter: Arc<dyn WallpaperSetter>,
}

impl Generator {
    pub fn new(cache: Arc<WallpaperCache>, setter: Arc<dyn WallpaperSetter>) -> Self {
        Self { cache, setter }
    }

    /// Composite, persist and apply a wallpaper for every display
    ///
    /// All-or-nothing: the first failure stops the loop, deletes the files
    /// this run wrote and puts the previous keep-set back.
    pub fn generate(
        &self,
        request: &WallpaperRequest,
        displays: &[DisplayTarget],
    ) -> Result<GenerationReport> {
        if displays.is_empty() {
            return Err(Error::NoDisplayAvailable);
        }

        let original = self.cache.snapshot();
        let original_keep = keep_set_of(&original);
        let mut written: Vec<PathBuf> = Vec::new();

        info!(
            "Generating wallpapers for {} display(s) with {} (ratio {}, color {})",
            displays.len(),
            request.logo.describe(),
            request.ratio,
            request.color
        );

        match self.apply_all(request, displays, &mut written) {
            Ok((map, report)) => {
                if let Err(e) = self.cache.commit(map) {
                    error!("Failed to save wallpaper index: {e}");
                    self.roll_back(original, &original_keep, &written);
                    return Err(e);
                }
                self.cache.prune(&self.cache.keep_set());
                info!(
                    "Applied {} wallpaper(s), {} rendered",
                    report.applied.len(),
                    report.rendered
                );
                Ok(report)
            }
            Err(e) => {
                error!("Generation failed: {e}");
                self.roll_back(original, &original_keep, &written);
                Err(e)
            }
        }
    }

    fn apply_all(
        &self,
        request: &WallpaperRequest,
        displays: &[DisplayTarget],
        written: &mut Vec<PathBuf>,
    ) -> Result<(PersistedMap, GenerationReport)> {
        let mut by_size: HashMap<Size, PathBuf> = HashMap::new();
        let mut map = PersistedMap::new();
        let mut report = GenerationReport::default();

        for display in displays {
            let pixel_size = display.pixel_size();

            let path = match by_size.get(&pixel_size) {
                Some(path) => {
                    debug!("Reusing {pixel_size} render for {}", display.id);
                    path.clone()
                }
                None => {
                    let image = composite(&request.logo, request.color, pixel_size, request.ratio)?;
                    let png = encode_png(&image)?;
                    let path = self.cache.write_png(&pixel_size.to_string(), &png)?;
                    written.push(path.clone());
                    by_size.insert(pixel_size, path.clone());
                    report.rendered += 1;
                    path
                }
            };

            self.setter.set(display, &path)?;
            debug!("{} accepted {} via {}", display.id, path.display(), self.setter.name());

            map.insert(display.id.clone(), path.clone());
            report.applied.push(AppliedWallpaper {
                display: display.id.clone(),
                pixel_size,
                path,
            });
        }

        Ok((map, report))
    }

    fn roll_back(&self, original: PersistedMap, original_keep: &BTreeSet<PathBuf>, written: &[PathBuf]) {
        let fresh = written.iter().filter(|p| !original_keep.contains(*p));
        self.cache.remove_files(fresh);
        self.cache.restore(original);
        self.cache.prune(original_keep);
    }
}

/// Write a single composited wallpaper to a user-chosen path
///
/// The file lives outside the cache and is never tracked by the janitor.
pub fn export(request: &WallpaperRequest, size: Size, out: &Path) -> Result<()> {
    let image = composite(&request.logo, request.color, size, request.ratio)?;
    let png = encode_png(&image)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;
    }
    fs::write(out, png).map_err(|e| Error::io(format!("write {}", out.display()), e))?;

    info!("Exported {size} wallpaper to {}", out.display());
    Ok(())
}

/// Largest display by pixel area, the default export size
pub fn largest_pixel_size(displays: &[DisplayTarget]) -> Option<Size> {
    displays
        .iter()
        .map(DisplayTarget::pixel_size)
        .max_by_key(Size::area)
}
