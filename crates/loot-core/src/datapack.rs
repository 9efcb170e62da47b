//! Upkeep of the editor's own datapack
//!
//! The export root gets a `pack.mcmeta` whose format matches the modpack's
//! game version, and its contents are mirrored into every world save.

use crate::error::Result;
use crate::files::{absolute, read_json, write_json};
use crate::instance::InstanceDescriptor;
use crate::settings::{export_root, PACK_FOLDER};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const PACK_META: &str = "pack.mcmeta";
const PACK_DESCRIPTION: &str = "Loot Editor datapack exports";

/// Used when the game version is unknown or newer than every rule
pub const DEFAULT_PACK_FORMAT: u32 = 71;

/// A `major.minor.patch` game version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl Version {
    /// Parse the leading numeric part of a version string (`1.20.1-forge` -> 1.20.1)
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if digits.is_empty() {
            return None;
        }
        let mut parts = digits.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        Some(Version(
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
        ))
    }
}

/// `(first version, last version inclusive, pack format)`
const PACK_FORMATS: &[(Version, Option<Version>, u32)] = &[
    (Version(1, 21, 5), None, 71),
    (Version(1, 21, 4), Some(Version(1, 21, 4)), 61),
    (Version(1, 21, 2), Some(Version(1, 21, 3)), 57),
    (Version(1, 21, 0), Some(Version(1, 21, 1)), 48),
    (Version(1, 20, 5), Some(Version(1, 20, 6)), 41),
    (Version(1, 20, 3), Some(Version(1, 20, 4)), 32),
    (Version(1, 20, 2), Some(Version(1, 20, 2)), 18),
    (Version(1, 20, 0), Some(Version(1, 20, 1)), 15),
    (Version(1, 19, 4), Some(Version(1, 19, 4)), 12),
    (Version(1, 19, 0), Some(Version(1, 19, 3)), 10),
    (Version(1, 18, 2), Some(Version(1, 18, 2)), 9),
    (Version(1, 18, 0), Some(Version(1, 18, 1)), 8),
    (Version(1, 17, 0), Some(Version(1, 17, 1)), 7),
    (Version(1, 16, 2), Some(Version(1, 16, 5)), 6),
    (Version(1, 15, 0), Some(Version(1, 16, 1)), 5),
    (Version(1, 13, 0), Some(Version(1, 14, 4)), 4),
];

/// Datapack format for a game version
pub fn pack_format_for(version: Version) -> u32 {
    PACK_FORMATS
        .iter()
        .find(|(min, max, _)| version >= *min && max.map_or(true, |max| version <= max))
        .map(|(_, _, format)| *format)
        .unwrap_or(DEFAULT_PACK_FORMAT)
}

/// Datapack format for a modpack, from its instance descriptor
pub fn resolve_pack_format(modpack_root: &Path) -> u32 {
    let version = match InstanceDescriptor::load(modpack_root) {
        Ok(Some(instance)) => instance.game_version().and_then(Version::parse),
        Ok(None) => None,
        Err(e) => {
            debug!("Ignoring instance descriptor: {}", e);
            None
        }
    };
    version.map_or(DEFAULT_PACK_FORMAT, pack_format_for)
}

/// Create the export root with its `data` directory and an up to date `pack.mcmeta`
pub fn ensure_pack_root(modpack_root: &Path) -> Result<PathBuf> {
    let pack_root = export_root(modpack_root);
    fs::create_dir_all(&pack_root)?;
    write_pack_meta(&pack_root, resolve_pack_format(modpack_root))?;
    fs::create_dir_all(pack_root.join("data"))?;
    Ok(pack_root)
}

fn write_pack_meta(pack_root: &Path, pack_format: u32) -> Result<()> {
    let file = pack_root.join(PACK_META);
    let current = read_json::<Value, _>(&file)
        .ok()
        .and_then(|meta| meta.pointer("/pack/pack_format").and_then(Value::as_u64));
    if current == Some(u64::from(pack_format)) {
        return Ok(());
    }
    write_json(
        &file,
        &json!({ "pack": { "pack_format": pack_format, "description": PACK_DESCRIPTION } }),
    )?;
    debug!("Wrote {} with pack_format {}", file.display(), pack_format);
    Ok(())
}

/// Mirror the export root into `saves/<world>/datapacks/loot_editor` of every world
///
/// Per-world failures are logged and skipped. Returns the worlds updated.
pub fn sync_world_datapacks(modpack_root: &Path) -> Result<Vec<PathBuf>> {
    let pack_root = ensure_pack_root(modpack_root)?;
    let saves = modpack_root.join("saves");
    if !saves.is_dir() {
        return Ok(Vec::new());
    }

    let mut worlds: Vec<PathBuf> = fs::read_dir(&saves)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.join("level.dat").exists())
        .collect();
    worlds.sort();

    let mut updated = Vec::new();
    for world in worlds {
        let target = world.join("datapacks").join(PACK_FOLDER);
        match copy_dir(&pack_root, &target) {
            Ok(()) => {
                info!("Synced loot_editor datapack into world {}", world.display());
                updated.push(world);
            }
            Err(e) => warn!("Failed to sync datapack into {}: {}", world.display(), e),
        }
    }
    Ok(updated)
}

/// True when `path` is inside a world's `datapacks/loot_editor` mirror
///
/// Mirrors are replaced wholesale by [`sync_world_datapacks`].
pub fn is_world_mirror(modpack_root: &Path, path: &Path) -> bool {
    let saves = absolute(&modpack_root.join("saves"));
    let path = absolute(path);
    let Ok(relative) = path.strip_prefix(&saves) else {
        return false;
    };
    let mut parts = relative.components().map(|c| c.as_os_str());
    parts.next().is_some()
        && parts.next().is_some_and(|c| c == "datapacks")
        && parts.next().is_some_and(|c| c == PACK_FOLDER)
}

/// Replace `target` with a copy of `source`
fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    if absolute(source) == absolute(target) {
        return Ok(());
    }
    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
