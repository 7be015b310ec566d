// Preview module
// Debounced low-resolution previews for every distinct display size

use crate::color::BackgroundColor;
use crate::compositor::composite;
use crate::debounce::Debouncer;
use crate::display::DisplayTarget;
use crate::error::{Error, Result};
use crate::geometry::{aspect_ratio_label, preview_size, LogoRatio, Size};
use crate::image_loader::Logo;
use image::RgbaImage;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Largest side of a preview image
pub const MAX_PREVIEW_DIMENSION: u32 = 512;

/// Quiet period before a preview is recomputed
pub const DEFAULT_PREVIEW_DELAY: Duration = Duration::from_millis(150);

/// Everything a preview depends on
#[derive(Debug, Clone)]
pub struct PreviewInput {
    pub logo: Arc<Logo>,
    pub color: BackgroundColor,
    pub ratio: LogoRatio,
    pub targets: Vec<DisplayTarget>,
}

/// One preview image standing in for all displays of one pixel size
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub label: String,
    pub display_ids: Vec<String>,
    pub pixel_size: Size,
    pub image: RgbaImage,
}

/// Published result; `generation` grows with every submitted input
#[derive(Debug)]
pub struct Preview {
    pub generation: u64,
    pub frames: Result<Vec<PreviewFrame>>,
}

/// Render one scaled-down frame per distinct pixel size, in display order
pub fn render_preview(input: &PreviewInput, max_dimension: u32) -> Result<Vec<PreviewFrame>> {
    if input.targets.is_empty() {
        return Err(Error::NoDisplayAvailable);
    }

    let mut groups: Vec<(Size, Vec<String>)> = Vec::new();
    for target in &input.targets {
        let size = target.pixel_size();
        match groups.iter_mut().find(|(s, _)| *s == size) {
            Some((_, ids)) => ids.push(target.id.clone()),
            None => groups.push((size, vec![target.id.clone()])),
        }
    }

    groups
        .into_iter()
        .map(|(pixel_size, display_ids)| {
            let canvas = preview_size(pixel_size, max_dimension);
            let image = composite(&input.logo, input.color, canvas, input.ratio)?;
            let label = format!(
                "{} {} ({})",
                display_ids.join(","),
                pixel_size,
                aspect_ratio_label(pixel_size.width, pixel_size.height)
            );
            Ok(PreviewFrame {
                label,
                display_ids,
                pixel_size,
                image,
            })
        })
        .collect()
}

/// Coalesces input changes and renders previews off the calling thread
pub struct PreviewPipeline {
    debouncer: Debouncer<(u64, PreviewInput)>,
    generation: AtomicU64,
}

impl PreviewPipeline {
    /// Start the pipeline; previews arrive on the returned receiver
    pub fn new(delay: Duration) -> Result<(Self, mpsc::Receiver<Preview>)> {
        let (tx, rx) = mpsc::channel();

        let debouncer = Debouncer::new("preview", delay, move |(generation, input): (u64, PreviewInput)| {
            debug!("Rendering preview #{generation}");
            let frames = render_preview(&input, MAX_PREVIEW_DIMENSION);
            if let Err(e) = &frames {
                warn!("Preview #{generation} failed: {e}");
            }
            if tx.send(Preview { generation, frames }).is_err() {
                debug!("Preview receiver dropped");
            }
        })
        .map_err(|e| Error::io("spawn preview worker", e))?;

        Ok((
            Self {
                debouncer,
                generation: AtomicU64::new(0),
            },
            rx,
        ))
    }

    /// Replace the pending input; returns its generation number
    pub fn submit(&self, input: PreviewInput) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.debouncer.schedule((generation, input));
        generation
    }

    /// Generation of the newest submitted input
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn input(targets: &[&str], color: BackgroundColor) -> PreviewInput {
        PreviewInput {
            logo: Arc::new(Logo {
                source: None,
                pixels: ImageBuffer::from_pixel(20, 10, Rgba([255, 255, 255, 255])),
            }),
            color,
            ratio: LogoRatio::default(),
            targets: targets.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn frames_are_capped_and_grouped() {
        let input = input(&["DP-1=2560x1440", "DP-2=2560x1440", "eDP-1=1080x1920@2"], BackgroundColor::BLACK);
        let frames = render_preview(&input, 512).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].display_ids, vec!["DP-1", "DP-2"]);
        assert_eq!(frames[0].image.dimensions(), (512, 288));
        assert_eq!(frames[0].label, "DP-1,DP-2 2560x1440 (16:9)");
        assert_eq!(frames[1].pixel_size, Size::new(2160, 3840));
        assert_eq!(frames[1].image.dimensions(), (288, 512));
    }

    #[test]
    fn no_targets_is_an_error() {
        let input = input(&[], BackgroundColor::BLACK);
        assert!(matches!(render_preview(&input, 512), Err(Error::NoDisplayAvailable)));
    }

    #[test]
    fn rapid_changes_produce_one_preview() {
        let (pipeline, rx) = PreviewPipeline::new(Duration::from_millis(50)).unwrap();

        for shade in [10, 20, 30] {
            pipeline.submit(input(&["A=64x36"], BackgroundColor::rgb(shade, shade, shade)));
        }

        let preview = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(preview.generation, 3);
        assert_eq!(preview.generation, pipeline.latest_generation());
        let frames = preview.frames.unwrap();
        assert_eq!(frames[0].image.get_pixel(0, 0), &Rgba([30, 30, 30, 255]));

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn cancelled_input_is_never_rendered() {
        let (pipeline, rx) = PreviewPipeline::new(Duration::from_millis(50)).unwrap();
        pipeline.submit(input(&["A=64x36"], BackgroundColor::BLACK));
        pipeline.cancel();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }
}
