// logowall - Logo-on-solid-color wallpapers for every attached display
// Composites a transparent logo per display size, caches the PNGs and sets them

mod app;
mod cache;
mod cli;
mod color;
mod compositor;
mod debounce;
mod display;
mod error;
mod generator;
mod geometry;
mod image_loader;
mod preview;
mod settings;
mod wallpaper;
mod wayland;
mod worker;

use crate::app::AppState;
use crate::cache::WallpaperCache;
use crate::cli::{Command, LogoSource, ParsedArgs};
use crate::display::DisplaySource;
use crate::generator::Generator;
use crate::image_loader::Logo;
use crate::preview::{Preview, PreviewPipeline};
use crate::settings::Settings;
use crate::worker::GenerationWorker;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use notify::{RecursiveMode, Watcher};
use std::fs;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Set `LOGOWALL_DEBUG` to print the full error chain
const DEBUG_ENV: &str = "LOGOWALL_DEBUG";

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = real_main() {
        print_error(&err);
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let args = cli::parse_args()?;

    let mut settings = Settings::load_default();
    if args.save_defaults {
        save_defaults(&mut settings, &args)?;
    }

    match args.command.clone() {
        Command::Set { .. } => run_set(&args, &settings),
        Command::Preview { out, watch, .. } => run_preview(&args, &settings, &out, watch),
        Command::Export { out, size, .. } => run_export(&args, &settings, &out, size),
        Command::Displays => run_displays(&args),
        Command::Clean => run_clean(&args),
    }
}

fn print_error(err: &anyhow::Error) {
    if std::env::var_os(DEBUG_ENV).is_some_and(|v| !v.is_empty()) {
        eprintln!("{err:?}");
    } else {
        eprintln!("Error: {err}");
    }
}

fn save_defaults(settings: &mut Settings, args: &ParsedArgs) -> Result<()> {
    if let Some(color) = args.color {
        settings.color = color;
    }
    if let Some(ratio) = args.ratio {
        settings.ratio = ratio.get();
    }
    let path = Settings::default_path().ok_or_else(|| anyhow!("No config directory for this user"))?;
    settings.save(&path)?;
    info!("Saved defaults to {}", path.display());
    Ok(())
}

fn load_logo(args: &ParsedArgs) -> Result<Logo> {
    let logo = match &args.logo {
        Some(LogoSource::Path(path)) => image_loader::load_logo(path)?,
        Some(LogoSource::Bytes(data)) => image_loader::load_logo_from_bytes(data)?,
        None => return Err(anyhow!("No logo provided")),
    };
    let size = logo.size();
    info!("Logo loaded: {}x{} pixels from {}", size.width, size.height, logo.describe());
    Ok(logo)
}

/// Session state seeded from settings, overridden by flags
fn initial_state(args: &ParsedArgs, settings: &Settings) -> AppState {
    let mut state = AppState::new(settings.color, settings.logo_ratio());
    if let Some(color) = args.color {
        state.set_color(color);
    }
    if let Some(ratio) = args.ratio {
        state.set_ratio(ratio);
    }
    state
}

/// Open the cache and run the startup janitor
fn open_cache(args: &ParsedArgs) -> Result<Arc<WallpaperCache>> {
    let dir = match &args.cache_dir {
        Some(dir) => dir.clone(),
        None => WallpaperCache::default_dir()?,
    };
    let cache = WallpaperCache::open(&dir)
        .with_context(|| format!("Failed to open cache directory {}", dir.display()))?;
    cache.janitor();
    Ok(Arc::new(cache))
}

fn run_set(args: &ParsedArgs, settings: &Settings) -> Result<()> {
    let mut state = initial_state(args, settings);
    state.set_logo(load_logo(args)?);
    info!("Background {}, logo ratio {}", state.color(), state.ratio());
    let request = state
        .request()
        .ok_or_else(|| anyhow!("No logo provided"))?;

    let cache = open_cache(args)?;
    let setter = wallpaper::system_setter();
    info!("Using {} wallpaper backend", setter.name());

    let displays: Arc<dyn DisplaySource> = Arc::from(display::source_for(args.displays.clone()));
    let worker = GenerationWorker::spawn(Generator::new(cache, Arc::from(setter)), displays)?;

    let report = worker.generate_blocking(request)?;
    for applied in &report.applied {
        println!(
            "{}: {} -> {}",
            applied.display,
            applied.pixel_size,
            applied.path.display()
        );
    }
    Ok(())
}

fn run_export(
    args: &ParsedArgs,
    settings: &Settings,
    out: &Path,
    size: Option<geometry::Size>,
) -> Result<()> {
    let mut state = initial_state(args, settings);
    state.set_logo(load_logo(args)?);
    let request = state
        .request()
        .ok_or_else(|| anyhow!("No logo provided"))?;

    let size = match size {
        Some(size) => size,
        None => {
            let displays = display::source_for(args.displays.clone()).displays()?;
            generator::largest_pixel_size(&displays).ok_or(error::Error::NoDisplayAvailable)?
        }
    };

    generator::export(&request, size, out)?;
    println!("{}", out.display());
    Ok(())
}

fn run_displays(args: &ParsedArgs) -> Result<()> {
    for target in display::source_for(args.displays.clone()).displays()? {
        println!("{target}");
    }
    Ok(())
}

fn run_clean(args: &ParsedArgs) -> Result<()> {
    let dir = match &args.cache_dir {
        Some(dir) => dir.clone(),
        None => WallpaperCache::default_dir()?,
    };
    let cache = WallpaperCache::open(&dir)?;
    let removed = cache.janitor();
    println!("Removed {removed} file(s) from {}", cache.dir().display());
    Ok(())
}

fn run_preview(args: &ParsedArgs, settings: &Settings, out: &Path, watch: bool) -> Result<()> {
    let targets = display::source_for(args.displays.clone()).displays()?;
    fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let (pipeline, previews) = PreviewPipeline::new(settings.preview_delay())?;
    let pipeline = Arc::new(pipeline);

    let mut state = initial_state(args, settings);
    let submitter = pipeline.clone();
    state.subscribe(move |change, state| {
        debug!("State changed: {change:?}");
        if let Some(input) = state.preview_input() {
            submitter.submit(input);
        }
    });
    state.set_targets(targets);
    info!("Previewing {} display(s)", state.targets().len());
    state.set_logo(load_logo(args)?);

    let logo_path = match (&args.logo, watch) {
        (Some(LogoSource::Path(path)), true) => Some(path.clone()),
        (_, true) => {
            warn!("--watch needs a logo file path; rendering once");
            None
        }
        _ => None,
    };

    let Some(logo_path) = logo_path else {
        let preview = previews
            .recv()
            .map_err(|_| anyhow!("Preview worker stopped"))?;
        return write_preview(preview, out);
    };

    // Watch the parent directory so editors that replace the file are seen
    let (fs_tx, fs_rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(fs_tx)?;
    let watch_dir = logo_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    info!("Watching {} for changes (Ctrl-C to stop)", logo_path.display());

    let file_name = logo_path.file_name().map(|n| n.to_os_string());
    loop {
        match fs_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(Ok(event)) => {
                let touches_logo = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if touches_logo && event.kind.is_remove() {
                    warn!("{} was removed; dropping pending preview", logo_path.display());
                    pipeline.cancel();
                } else if touches_logo && (event.kind.is_modify() || event.kind.is_create()) {
                    match image_loader::load_logo(&logo_path) {
                        Ok(logo) => state.set_logo(logo),
                        Err(e) => warn!("Keeping previous logo: {e}"),
                    }
                }
            }
            Ok(Err(e)) => warn!("Watch error: {e}"),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        while let Ok(preview) = previews.try_recv() {
            if preview.generation < pipeline.latest_generation() {
                debug!("Skipping stale preview #{}", preview.generation);
                continue;
            }
            if let Err(e) = write_preview(preview, out) {
                error!("{e:#}");
            }
        }
    }

    Ok(())
}

fn write_preview(preview: Preview, out: &Path) -> Result<()> {
    let frames = preview.frames?;
    for (i, frame) in frames.iter().enumerate() {
        let path = out.join(format!("preview-{}-{}.png", i + 1, frame.pixel_size));
        frame
            .image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Frame covers {:?}", frame.display_ids);
        println!("{} -> {}", frame.label, path.display());
    }
    Ok(())
}
