// Cache module
// Owns the persisted wallpaper files and the keep-set janitor

use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Display id -> persisted wallpaper file, saved next to the files
pub const INDEX_FILE: &str = "wallpapers.ron";

/// Environment override for the cache directory
pub const CACHE_DIR_ENV: &str = "LOGOWALL_CACHE_DIR";

pub type PersistedMap = BTreeMap<String, PathBuf>;

/// Per-user directory of generated wallpapers
#[derive(Debug)]
pub struct WallpaperCache {
    dir: PathBuf,
    persisted: Mutex<PersistedMap>,
}

impl WallpaperCache {
    /// `$LOGOWALL_CACHE_DIR`, else the platform cache dir plus `logowall`
    pub fn default_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::cache_dir()
            .map(|d| d.join("logowall"))
            .ok_or_else(|| Error::Settings("no cache directory for this user".to_string()))
    }

    /// Open the cache, creating the directory and reading the index
    ///
    /// The directory is made absolute so every path handed to a wallpaper
    /// backend stays valid regardless of its working directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("create cache dir {}", dir.display()), e))?;
        let dir = std::path::absolute(&dir)
            .map_err(|e| Error::io(format!("resolve cache dir {}", dir.display()), e))?;

        let persisted = load_index(&dir);
        debug!("Cache {} holds {} persisted entr(ies)", dir.display(), persisted.len());

        Ok(Self {
            dir,
            persisted: Mutex::new(persisted),
        })
    }

    /// Prune against the current keep-set
    pub fn janitor(&self) -> usize {
        self.prune(&self.keep_set())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy of the current display -> file map
    pub fn snapshot(&self) -> PersistedMap {
        self.lock().clone()
    }

    /// Files the janitor must not delete
    pub fn keep_set(&self) -> BTreeSet<PathBuf> {
        keep_set_of(&self.lock())
    }

    /// Write PNG bytes under a fresh unique name and return its path
    pub fn write_png(&self, key: &str, png: &[u8]) -> Result<PathBuf> {
        let suffix: u64 = rand::random();
        let name = format!("wallpaper-{key}-{suffix:016x}.png");
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        fs::write(&tmp, png).map_err(|e| Error::io(format!("write {}", tmp.display()), e))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::io(format!("rename {} -> {}", tmp.display(), path.display()), e)
        })?;

        debug!("Wrote {} ({} bytes)", path.display(), png.len());
        Ok(path)
    }

    /// Replace the persisted map and save the index
    pub fn commit(&self, map: PersistedMap) -> Result<()> {
        let mut persisted = self.lock();
        save_index(&self.dir, &map)?;
        *persisted = map;
        Ok(())
    }

    /// Put back a previous map after a failed generation
    ///
    /// The index on disk was never touched by the failed run, so only the
    /// in-memory map needs restoring.
    pub fn restore(&self, map: PersistedMap) {
        *self.lock() = map;
    }

    /// Delete every wallpaper file in the cache dir that is not in `keep`
    ///
    /// Only names written by this cache are considered; anything else in the
    /// directory is left alone. Failures are logged, never returned. Returns
    /// how many files went away.
    pub fn prune(&self, keep: &BTreeSet<PathBuf>) -> usize {
        let keep_names: BTreeSet<OsString> = keep
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list cache dir {}: {e}", self.dir.display());
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !is_owned_name(&name) || keep_names.contains(&name) {
                continue;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Pruned {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove stale wallpaper {}: {e}", path.display()),
            }
        }

        if removed > 0 {
            info!("Removed {removed} stale wallpaper file(s)");
        }
        removed
    }

    /// Best-effort removal of specific files
    pub fn remove_files<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) {
        for path in paths {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedMap> {
        self.persisted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wallpapers and temp leftovers written by `write_png` or `save_index`
fn is_owned_name(name: &OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    let wallpaper = |n: &str| n.starts_with("wallpaper-") && n.ends_with(".png");
    match name.strip_prefix('.').and_then(|n| n.strip_suffix(".tmp")) {
        Some(inner) => wallpaper(inner) || inner == INDEX_FILE,
        None => wallpaper(name),
    }
}

pub fn keep_set_of(map: &PersistedMap) -> BTreeSet<PathBuf> {
    map.values().cloned().collect()
}

fn load_index(dir: &Path) -> PersistedMap {
    let path = dir.join(INDEX_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistedMap::new(),
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            return PersistedMap::new();
        }
    };

    match ron::from_str(&text) {
        Ok(map) => map,
        Err(e) => {
            warn!("Ignoring corrupt wallpaper index {}: {e}", path.display());
            PersistedMap::new()
        }
    }
}

fn save_index(dir: &Path, map: &PersistedMap) -> Result<()> {
    let text = ron::ser::to_string_pretty(map, ron::ser::PrettyConfig::default())
        .map_err(|e| Error::Settings(format!("encode wallpaper index: {e}")))?;

    let path = dir.join(INDEX_FILE);
    let tmp = dir.join(format!(".{INDEX_FILE}.tmp"));
    fs::write(&tmp, text).map_err(|e| Error::io(format!("write {}", tmp.display()), e))?;
    fs::rename(&tmp, &path)
        .map_err(|e| Error::io(format!("rename {} -> {}", tmp.display(), path.display()), e))?;
    Ok(())
}
