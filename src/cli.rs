// Command line interface module
// Handles parsing of command line arguments and stdin input

use crate::color::BackgroundColor;
use crate::display::DisplayTarget;
use crate::geometry::{LogoRatio, Size};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;

/// logowall - Put your logo on a solid-color wallpaper for every display
#[derive(Parser, Debug)]
#[command(name = "logowall")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Background color (#RGB, #RRGGBB, #RRGGBBAA or a basic name)
    #[arg(short, long, global = true, value_parser = parse_color)]
    pub color: Option<BackgroundColor>,

    /// Maximum fraction of the screen width/height the logo may cover (0 < R <= 1)
    #[arg(short, long, global = true, value_parser = parse_ratio)]
    pub ratio: Option<LogoRatio>,

    /// Use this display instead of detecting them (repeatable)
    #[arg(long = "display", value_name = "ID=WxH[@SCALE]", global = true)]
    pub displays: Vec<DisplayTarget>,

    /// Directory for generated wallpapers
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Remember --color and --ratio as the new defaults
    #[arg(long, global = true)]
    pub save_defaults: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Composite the logo and set it as wallpaper on every display
    Set {
        /// Path to a PNG logo with transparency (can also be piped to stdin)
        #[arg(value_name = "LOGO")]
        logo: Option<PathBuf>,
    },

    /// Write low-resolution previews for every distinct display size
    Preview {
        #[arg(value_name = "LOGO")]
        logo: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "previews")]
        out: PathBuf,

        /// Keep running and re-render whenever the logo file changes
        #[arg(long)]
        watch: bool,
    },

    /// Save a single composited wallpaper to a file of your choice
    Export {
        #[arg(value_name = "LOGO")]
        logo: Option<PathBuf>,

        /// Destination PNG
        #[arg(short, long)]
        out: PathBuf,

        /// Canvas size (defaults to the largest display)
        #[arg(short, long, value_name = "WxH", value_parser = parse_size)]
        size: Option<Size>,
    },

    /// List detected displays
    Displays,

    /// Remove cached wallpapers that are no longer in use
    Clean,
}

impl Command {
    fn logo_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Set { logo } | Command::Preview { logo, .. } | Command::Export { logo, .. } => {
                logo.as_ref()
            }
            Command::Displays | Command::Clean => None,
        }
    }

    fn needs_logo(&self) -> bool {
        matches!(
            self,
            Command::Set { .. } | Command::Preview { .. } | Command::Export { .. }
        )
    }
}

/// Where the logo comes from
#[derive(Debug)]
pub enum LogoSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Parsed arguments with resolved logo source
#[derive(Debug)]
pub struct ParsedArgs {
    pub command: Command,
    pub logo: Option<LogoSource>,
    pub color: Option<BackgroundColor>,
    pub ratio: Option<LogoRatio>,
    pub displays: Vec<DisplayTarget>,
    pub cache_dir: Option<PathBuf>,
    pub save_defaults: bool,
}

fn parse_color(s: &str) -> Result<BackgroundColor, String> {
    BackgroundColor::parse(s).map_err(|e| e.to_string())
}

/// Parse ratio value and ensure it's within valid range
fn parse_ratio(s: &str) -> Result<LogoRatio, String> {
    let ratio: f64 = s.parse().map_err(|_| "Invalid ratio value")?;
    LogoRatio::new(ratio).map_err(|e| e.to_string())
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
    let size = Size::new(
        w.parse().map_err(|_| format!("invalid width {w:?}"))?,
        h.parse().map_err(|_| format!("invalid height {h:?}"))?,
    );
    if size.is_empty() {
        return Err("size must be non-zero".to_string());
    }
    Ok(size)
}

/// Check if stdin has data available (is a pipe)
fn stdin_has_data() -> bool {
    !atty::is(atty::Stream::Stdin)
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Parse command line arguments and handle stdin input
pub fn parse_args() -> Result<ParsedArgs> {
    resolve(Args::parse())
}

fn resolve(args: Args) -> Result<ParsedArgs> {
    let logo = if let Some(path) = args.command.logo_path() {
        Some(LogoSource::Path(path.clone()))
    } else if args.command.needs_logo() {
        if !stdin_has_data() {
            bail!(
                "No logo provided. Please provide a PNG path or pipe image data to stdin.\n\
                 Usage: logowall set <LOGO> [OPTIONS]\n\
                 Or:    cat logo.png | logowall set [OPTIONS]"
            );
        }
        let data = read_stdin()?;
        if data.is_empty() {
            bail!("No data received from stdin");
        }
        Some(LogoSource::Bytes(data))
    } else {
        None
    };

    Ok(ParsedArgs {
        command: args.command,
        logo,
        color: args.color,
        ratio: args.ratio,
        displays: args.displays,
        cache_dir: args.cache_dir,
        save_defaults: args.save_defaults,
    })
}
