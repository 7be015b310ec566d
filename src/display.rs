// Display module
// Detects attached displays and their pixel dimensions

use crate::error::{Error, Result};
use crate::geometry::{aspect_ratio_label, Size};
use crate::wayland;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::process::Command;
use std::str::FromStr;

/// One attached display, recomputed on demand and never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTarget {
    /// Connector or output name (e.g. `DP-1`); stable across runs
    pub id: String,
    /// Size in logical (scaled) units
    pub logical_size: Size,
    /// Backing scale factor
    pub scale_factor: f64,
    /// Position in enumeration order, used as the screen index by some desktops
    pub index: usize,
}

impl DisplayTarget {
    pub fn new(id: impl Into<String>, logical_size: Size, scale_factor: f64, index: usize) -> Self {
        Self {
            id: id.into(),
            logical_size,
            scale_factor,
            index,
        }
    }

    /// Logical size multiplied by the scale factor
    pub fn pixel_size(&self) -> Size {
        let scale = if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        Size::new(
            (self.logical_size.width as f64 * scale).round() as u32,
            (self.logical_size.height as f64 * scale).round() as u32,
        )
    }
}

impl fmt::Display for DisplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let px = self.pixel_size();
        write!(
            f,
            "{} {}x{} ({}) scale {}",
            self.id,
            px.width,
            px.height,
            aspect_ratio_label(px.width, px.height),
            self.scale_factor
        )
    }
}

/// `ID=WxH[@SCALE]`, as accepted by `--display`
impl FromStr for DisplayTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (id, geometry) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=WxH[@SCALE], got {s:?}"))?;
        if id.is_empty() {
            return Err("display id must not be empty".to_string());
        }

        let (dims, scale) = match geometry.split_once('@') {
            Some((dims, scale)) => {
                let scale: f64 = scale.parse().map_err(|_| format!("invalid scale {scale:?}"))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(format!("scale must be positive, got {scale}"));
                }
                (dims, scale)
            }
            None => (geometry, 1.0),
        };

        let size = parse_dimensions(dims).ok_or_else(|| format!("invalid size {dims:?}"))?;
        if size.is_empty() {
            return Err(format!("size must be non-zero, got {dims:?}"));
        }
        Ok(DisplayTarget::new(id, size, scale, 0))
    }
}

fn parse_dimensions(s: &str) -> Option<Size> {
    let (w, h) = s.split_once(['x', 'X'])?;
    Some(Size::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Anything that can tell us which displays are attached
pub trait DisplaySource: Send + Sync {
    fn displays(&self) -> Result<Vec<DisplayTarget>>;
}

/// Queries the running session (Wayland first, then X11)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDisplays;

impl DisplaySource for SystemDisplays {
    fn displays(&self) -> Result<Vec<DisplayTarget>> {
        let has_wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
        let has_x11 = std::env::var_os("DISPLAY").is_some();

        if has_wayland {
            match wayland::list_outputs() {
                Ok(targets) if !targets.is_empty() => return Ok(targets),
                Ok(_) => warn!("Wayland reported no outputs"),
                Err(e) if has_x11 => warn!("{e}; trying X11"),
                Err(e) => return Err(e),
            }
        }

        if has_x11 {
            let targets = xrandr_outputs()?;
            if !targets.is_empty() {
                return Ok(targets);
            }
        }

        Err(Error::NoDisplayAvailable)
    }
}

/// Fixed display list, from `--display` overrides or tests
#[derive(Debug, Clone, Default)]
pub struct StaticDisplays(pub Vec<DisplayTarget>);

impl DisplaySource for StaticDisplays {
    fn displays(&self) -> Result<Vec<DisplayTarget>> {
        if self.0.is_empty() {
            return Err(Error::NoDisplayAvailable);
        }
        // Each id owns one persisted file; a repeat would orphan the first
        let mut seen = HashSet::new();
        if let Some(dup) = self.0.iter().find(|t| !seen.insert(t.id.as_str())) {
            return Err(Error::DisplayQuery(format!("display {} given more than once", dup.id)));
        }
        Ok(self
            .0
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, mut t)| {
                t.index = index;
                t
            })
            .collect())
    }
}

/// Pick overrides when given, otherwise ask the session
pub fn source_for(overrides: Vec<DisplayTarget>) -> Box<dyn DisplaySource> {
    if overrides.is_empty() {
        Box::new(SystemDisplays)
    } else {
        info!("Using {} display override(s)", overrides.len());
        Box::new(StaticDisplays(overrides))
    }
}

fn xrandr_outputs() -> Result<Vec<DisplayTarget>> {
    let output = Command::new("xrandr")
        .arg("--query")
        .output()
        .map_err(|e| Error::DisplayQuery(format!("run xrandr: {e}")))?;
    if !output.status.success() {
        return Err(Error::DisplayQuery("xrandr --query failed".to_string()));
    }

    let targets = parse_xrandr(&String::from_utf8_lossy(&output.stdout));
    info!("Found {} X11 output(s)", targets.len());
    Ok(targets)
}

/// Parse connected outputs from `xrandr --query`
///
/// X11 has no per-output scale, so the mode is both logical and pixel size.
fn parse_xrandr(text: &str) -> Vec<DisplayTarget> {
    let mut targets = Vec::new();

    for line in text.lines() {
        if line.starts_with(char::is_whitespace) || line.starts_with("Screen ") {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(name), Some("connected")) = (tokens.next(), tokens.next()) else {
            continue;
        };

        // First token shaped like WxH+X+Y is the active geometry
        let Some(size) = tokens
            .filter_map(|t| t.split_once('+').map(|(dims, _)| dims))
            .find_map(parse_dimensions)
        else {
            debug!("Output {name} is connected but inactive");
            continue;
        };

        targets.push(DisplayTarget::new(name, size, 1.0, targets.len()));
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_size_applies_scale() {
        let t = DisplayTarget::new("eDP-1", Size::new(1440, 900), 2.0, 0);
        assert_eq!(t.pixel_size(), Size::new(2880, 1800));
        let t = DisplayTarget::new("eDP-1", Size::new(1707, 1067), 1.5, 0);
        assert_eq!(t.pixel_size(), Size::new(2561, 1601));
        let t = DisplayTarget::new("bad", Size::new(800, 600), 0.0, 0);
        assert_eq!(t.pixel_size(), Size::new(800, 600));
    }

    #[test]
    fn parses_display_override() {
        let t: DisplayTarget = "DP-1=2560x1440".parse().unwrap();
        assert_eq!(t.id, "DP-1");
        assert_eq!(t.pixel_size(), Size::new(2560, 1440));

        let t: DisplayTarget = "eDP-1=1440x900@2".parse().unwrap();
        assert_eq!(t.scale_factor, 2.0);
        assert_eq!(t.pixel_size(), Size::new(2880, 1800));

        for bad in ["DP-1", "=10x10", "DP-1=10", "DP-1=0x10", "DP-1=10x10@0", "DP-1=10x10@x"] {
            assert!(bad.parse::<DisplayTarget>().is_err(), "{bad}");
        }
    }

    #[test]
    fn static_source_reindexes() {
        let source = StaticDisplays(vec![
            "A=100x100".parse().unwrap(),
            "B=200x100".parse().unwrap(),
        ]);
        let displays = source.displays().unwrap();
        assert_eq!(displays[0].index, 0);
        assert_eq!(displays[1].index, 1);
        assert!(matches!(StaticDisplays::default().displays(), Err(Error::NoDisplayAvailable)));
    }

    #[test]
    fn static_source_rejects_repeated_id() {
        let source = StaticDisplays(vec![
            "DP-1=1920x1080".parse().unwrap(),
            "DP-2=1920x1080".parse().unwrap(),
            "DP-1=2560x1440".parse().unwrap(),
        ]);
        let err = source.displays().unwrap_err();
        assert!(matches!(err, Error::DisplayQuery(ref msg) if msg.contains("DP-1")));
    }

    #[test]
    fn parses_xrandr_query() {
        let text = "\
Screen 0: minimum 320 x 200, current 4480 x 1440, maximum 16384 x 16384
eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 309mm x 174mm
   1920x1080     60.02*+
HDMI-1 disconnected (normal left inverted right x axis y axis)
DP-1 connected 2560x1440+1920+0 (normal left inverted right x axis y axis) 597mm x 336mm
   2560x1440     59.95*+
DP-2 connected (normal left inverted right x axis y axis)
   1920x1080     60.00 +
";
        let targets = parse_xrandr(text);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id, "eDP-1");
        assert_eq!(targets[0].pixel_size(), Size::new(1920, 1080));
        assert_eq!(targets[1].id, "DP-1");
        assert_eq!(targets[1].index, 1);
        assert_eq!(targets[1].pixel_size(), Size::new(2560, 1440));
    }

    #[test]
    fn display_line_includes_aspect() {
        let t = DisplayTarget::new("DP-1", Size::new(2560, 1440), 1.0, 0);
        assert_eq!(t.to_string(), "DP-1 2560x1440 (16:9) scale 1");
    }
}
