// Wallpaper module
// Hands a persisted PNG to the desktop environment

use crate::display::DisplayTarget;
use crate::error::{Error, Result};
use log::{debug, info};
use std::path::Path;
use std::process::Command;

/// Sets the desktop wallpaper of one display to an image file
pub trait WallpaperSetter: Send + Sync {
    fn set(&self, display: &DisplayTarget, image: &Path) -> Result<()>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

/// Desktop environments with a dedicated backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopKind {
    Sway,
    Kde,
    Gnome,
    Other,
}

/// Detect the running desktop from the session environment
pub fn detect_desktop() -> DesktopKind {
    if std::env::var_os("SWAYSOCK").is_some() {
        return DesktopKind::Sway;
    }
    let current = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
    desktop_from_name(&current)
}

fn desktop_from_name(name: &str) -> DesktopKind {
    // XDG_CURRENT_DESKTOP is a colon-separated list such as "ubuntu:GNOME"
    for part in name.split(':').map(str::to_ascii_lowercase) {
        match part.as_str() {
            "sway" => return DesktopKind::Sway,
            "kde" | "plasma" => return DesktopKind::Kde,
            "gnome" | "unity" | "budgie" => return DesktopKind::Gnome,
            _ => {}
        }
    }
    DesktopKind::Other
}

/// Backend for the running desktop
pub fn system_setter() -> Box<dyn WallpaperSetter> {
    let desktop = detect_desktop();
    debug!("Detected desktop: {desktop:?}");
    match desktop {
        DesktopKind::Sway => Box::new(SwaySetter),
        DesktopKind::Kde => Box::new(KdeSetter),
        DesktopKind::Gnome => Box::new(GnomeSetter),
        DesktopKind::Other => Box::new(GenericSetter),
    }
}

fn path_str<'a>(display: &DisplayTarget, path: &'a Path) -> Result<&'a str> {
    path.to_str().ok_or_else(|| Error::WallpaperSet {
        display: display.id.clone(),
        reason: "path is not valid UTF-8".to_string(),
    })
}

/// Backslash-escape `quote` and backslashes for a `quote`-delimited string
fn escape_quoted(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn run(display: &DisplayTarget, cmd: &mut Command, what: &str) -> Result<()> {
    let fail = |reason: String| Error::WallpaperSet {
        display: display.id.clone(),
        reason,
    };
    let status = cmd.status().map_err(|e| fail(format!("run {what}: {e}")))?;
    if !status.success() {
        return Err(fail(format!("{what} failed ({status})")));
    }
    Ok(())
}

/// Per-output background through `swaymsg`
#[derive(Debug, Default)]
pub struct SwaySetter;

impl SwaySetter {
    fn command(output: &str, path: &str) -> String {
        format!(
            "output \"{}\" bg \"{}\" fill",
            escape_quoted(output, '"'),
            escape_quoted(path, '"')
        )
    }
}

impl WallpaperSetter for SwaySetter {
    fn set(&self, display: &DisplayTarget, image: &Path) -> Result<()> {
        let path = path_str(display, image)?;
        run(display, Command::new("swaymsg").arg(Self::command(&display.id, path)), "swaymsg")?;
        info!("Sway background set on {}", display.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sway"
    }
}

/// Plasma desktop script addressing the desktop on the display's screen
#[derive(Debug, Default)]
pub struct KdeSetter;

impl KdeSetter {
    fn find_qdbus() -> Option<&'static str> {
        // Plasma 6 ships qdbus6, Plasma 5 ships qdbus
        ["qdbus6", "qdbus"]
            .into_iter()
            .find(|exe| Command::new(exe).arg("--version").output().is_ok())
    }

    fn script(screen: usize, uri: &str) -> String {
        let uri = escape_quoted(uri, '\'');
        format!(
            "var allDesktops = desktops();\n\
             for (var i = 0; i < allDesktops.length; i++) {{\n\
               var d = allDesktops[i];\n\
               if (d.screen != {screen}) continue;\n\
               d.wallpaperPlugin = 'org.kde.image';\n\
               d.currentConfigGroup = ['Wallpaper', 'org.kde.image', 'General'];\n\
               d.writeConfig('Image', '{uri}');\n\
             }}\n"
        )
    }
}

impl WallpaperSetter for KdeSetter {
    fn set(&self, display: &DisplayTarget, image: &Path) -> Result<()> {
        let qdbus = Self::find_qdbus().ok_or_else(|| Error::WallpaperSet {
            display: display.id.clone(),
            reason: "qdbus not found (qdbus6/qdbus)".to_string(),
        })?;
        let uri = format!("file://{}", path_str(display, image)?);

        run(
            display,
            Command::new(qdbus)
                .arg("org.kde.plasmashell")
                .arg("/PlasmaShell")
                .arg("org.kde.PlasmaShell.evaluateScript")
                .arg(Self::script(display.index, &uri)),
            "PlasmaShell.evaluateScript",
        )?;
        info!("Plasma wallpaper set on screen {} ({})", display.index, display.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kde"
    }
}

fn best_effort(cmd: &mut Command, key: &str) {
    match cmd.status() {
        Ok(status) if status.success() => {}
        Ok(status) => debug!("gsettings {key} not applied ({status})"),
        Err(e) => debug!("gsettings {key} not applied: {e}"),
    }
}

/// `gsettings`; GNOME has one wallpaper for all monitors, so the last call wins
#[derive(Debug, Default)]
pub struct GnomeSetter;

impl WallpaperSetter for GnomeSetter {
    fn set(&self, display: &DisplayTarget, image: &Path) -> Result<()> {
        let uri = format!("file://{}", path_str(display, image)?);

        run(
            display,
            Command::new("gsettings")
                .args(["set", "org.gnome.desktop.background", "picture-uri"])
                .arg(&uri),
            "gsettings (picture-uri)",
        )?;

        // Best-effort: dark variant exists on GNOME 42+
        best_effort(
            Command::new("gsettings")
                .args(["set", "org.gnome.desktop.background", "picture-uri-dark"])
                .arg(&uri),
            "picture-uri-dark",
        );
        best_effort(
            Command::new("gsettings")
                .args(["set", "org.gnome.desktop.background", "picture-options", "zoom"]),
            "picture-options",
        );

        info!("GNOME wallpaper set from {}", display.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gnome"
    }
}

/// Whatever the `wallpaper` crate supports on this desktop
#[derive(Debug, Default)]
pub struct GenericSetter;

impl WallpaperSetter for GenericSetter {
    fn set(&self, display: &DisplayTarget, image: &Path) -> Result<()> {
        let path = path_str(display, image)?;
        ::wallpaper::set_from_path(path).map_err(|e| Error::WallpaperSet {
            display: display.id.clone(),
            reason: e.to_string(),
        })?;
        info!("Wallpaper set from {}", display.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "generic"
    }
}
