//! Per-modpack export settings
//!
//! An optional `loot-editor/export-settings.json` inside the modpack root may
//! redirect the override datapack elsewhere:
//!
//! ```json
//! { "packRoot": "loot-editor/export/datapack" }
//! ```
//!
//! Relative paths resolve against the modpack root. A missing, blank or
//! malformed file falls back to `<modpack>/datapacks/loot_editor`.

use crate::files::{absolute, read_json};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Folder name of the editor's own datapack
pub const PACK_FOLDER: &str = "loot_editor";

const SETTINGS_DIR: &str = "loot-editor";
const SETTINGS_FILE: &str = "export-settings.json";

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(rename = "packRoot")]
    pack_root: Option<String>,
}

/// Location of the settings file for a modpack
pub fn settings_file(modpack_root: &Path) -> PathBuf {
    modpack_root.join(SETTINGS_DIR).join(SETTINGS_FILE)
}

/// Export root explicitly configured for this modpack, if any
pub fn configured_export_root(modpack_root: &Path) -> Option<PathBuf> {
    let file = settings_file(modpack_root);
    if !file.is_file() {
        return None;
    }
    let settings: SettingsFile = match read_json(&file) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load export settings from {}: {}", file.display(), e);
            return None;
        }
    };
    let raw = settings.pack_root.unwrap_or_default();
    let raw = raw.trim();
    if raw.is_empty() {
        warn!("packRoot missing or empty in {}", file.display());
        return None;
    }
    let candidate = Path::new(raw);
    let resolved = if candidate.is_absolute() {
        absolute(candidate)
    } else {
        absolute(&modpack_root.join(candidate))
    };
    debug!("Using custom export root {} from {}", resolved.display(), file.display());
    Some(resolved)
}

/// Default export root when nothing is configured
pub fn default_export_root(modpack_root: &Path) -> PathBuf {
    modpack_root.join("datapacks").join(PACK_FOLDER)
}

/// Configured export root, or the default one
pub fn export_root(modpack_root: &Path) -> PathBuf {
    configured_export_root(modpack_root).unwrap_or_else(|| default_export_root(modpack_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_settings(root: &Path, body: &str) {
        let file = settings_file(root);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, body).unwrap();
    }

    #[test]
    fn test_default_when_missing() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(configured_export_root(tmp.path()), None);
        assert_eq!(
            export_root(tmp.path()),
            tmp.path().join("datapacks").join("loot_editor")
        );
    }

    #[test]
    fn test_relative_pack_root() {
        let tmp = TempDir::new().unwrap();
        write_settings(tmp.path(), r#"{"packRoot": "loot-editor/export/./datapack"}"#);
        assert_eq!(
            configured_export_root(tmp.path()),
            Some(absolute(&tmp.path().join("loot-editor/export/datapack")))
        );
    }

    #[test]
    fn test_absolute_pack_root() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = tmp.path().join("elsewhere");
        write_settings(
            tmp.path(),
            &serde_json::json!({ "packRoot": elsewhere.to_string_lossy() }).to_string(),
        );
        assert_eq!(configured_export_root(tmp.path()), Some(absolute(&elsewhere)));
    }

    #[test]
    fn test_blank_or_malformed_falls_back() {
        let tmp = TempDir::new().unwrap();
        write_settings(tmp.path(), r#"{"packRoot": "   "}"#);
        assert_eq!(configured_export_root(tmp.path()), None);

        write_settings(tmp.path(), "{ not json");
        assert_eq!(configured_export_root(tmp.path()), None);
        assert_eq!(export_root(tmp.path()), default_export_root(tmp.path()));
    }
}
