//! Override manifest and the replacement artifacts derived from it
//!
//! Tables that cannot be edited in place (archive-backed, vanilla) are
//! replaced at runtime. For every target the store keeps:
//! - a replacement table under `loot_editor:replacements/<ns>/<path>`
//! - a per-target modifier rule "when `target` is requested, use `replacement`"
//! - one global list naming every modifier, sorted by target id
//!
//! The manifest `data/loot_editor/meta/loot_overrides.json` records the
//! target -> replacement pairs. Writes are whole-file overwrites and are not
//! safe against concurrent writers on the same pack root.

use crate::error::{Error, Result};
use crate::files::{is_within, join_slashed, write_json};
use crate::id::LootId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Private namespace owning every generated artifact
pub const EDITOR_NAMESPACE: &str = "loot_editor";

const LOOT_TABLES_DIR: &str = "loot_table";
const LOOT_MODIFIERS_DIR: &str = "loot_modifiers";
const META_DIR: &str = "meta";
const REPLACEMENTS_DIR: &str = "replacements";
const MODIFIER_TYPE: &str = "loot_editor_loader:replace_table";
const MODIFIER_CONDITION: &str = "neoforge:loot_table_id";

/// Identifier of the replacement table for `target`
pub fn replacement_id(target: &LootId) -> LootId {
    let path = format!("{REPLACEMENTS_DIR}/{}/{}", target.namespace(), target.path());
    LootId::derived(EDITOR_NAMESPACE, path)
}

/// Identifier of the modifier rule for `target`
pub fn modifier_id(target: &LootId) -> LootId {
    let path = format!("{}/{}", target.namespace(), target.path());
    LootId::derived(EDITOR_NAMESPACE, path)
}

fn editor_data_dir(pack_root: &Path) -> PathBuf {
    pack_root.join("data").join(EDITOR_NAMESPACE)
}

/// Root of the replacement tree inside an export root
pub fn replacement_root(pack_root: &Path) -> PathBuf {
    editor_data_dir(pack_root)
        .join(LOOT_TABLES_DIR)
        .join(REPLACEMENTS_DIR)
}

pub fn replacement_file(pack_root: &Path, target: &LootId) -> PathBuf {
    let dir = replacement_root(pack_root).join(target.namespace());
    join_slashed(&dir, &format!("{}.json", target.path()))
}

pub fn modifier_file(pack_root: &Path, target: &LootId) -> PathBuf {
    let dir = editor_data_dir(pack_root)
        .join(LOOT_MODIFIERS_DIR)
        .join(target.namespace());
    join_slashed(&dir, &format!("{}.json", target.path()))
}

pub fn global_modifiers_file(pack_root: &Path) -> PathBuf {
    editor_data_dir(pack_root)
        .join(LOOT_MODIFIERS_DIR)
        .join("global_loot_modifiers.json")
}

pub fn manifest_file(pack_root: &Path) -> PathBuf {
    editor_data_dir(pack_root)
        .join(META_DIR)
        .join("loot_overrides.json")
}

/// Whether `candidate` lives inside the replacement tree of `pack_root`
pub fn is_replacement_path(pack_root: &Path, candidate: &Path) -> bool {
    is_within(&replacement_root(pack_root), candidate)
}

/// One target -> replacement pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub target: LootId,
    pub replacement: LootId,
}

/// Ordered override list, unique by target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideManifest {
    #[serde(default)]
    pub overrides: Vec<OverrideEntry>,
}

impl OverrideManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the replacement for `target`
    ///
    /// An existing target keeps its position; a new one is appended.
    pub fn upsert(mut self, target: LootId, replacement: LootId) -> Self {
        match self.overrides.iter_mut().find(|e| e.target == target) {
            Some(existing) => {
                if existing.replacement != replacement {
                    existing.replacement = replacement;
                }
            }
            None => self.overrides.push(OverrideEntry {
                target,
                replacement,
            }),
        }
        self
    }

    pub fn replacement_for(&self, target: &LootId) -> Option<&LootId> {
        self.overrides
            .iter()
            .find(|e| &e.target == target)
            .map(|e| &e.replacement)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Modifier ids of every entry, sorted by the target's string form
    pub fn modifier_ids(&self) -> Vec<LootId> {
        let mut targets: Vec<&LootId> = self.overrides.iter().map(|e| &e.target).collect();
        targets.sort_by_key(|t| t.to_string());
        targets.into_iter().map(modifier_id).collect()
    }
}

/// Rule document substituting `replacement` whenever `target` is requested
pub fn modifier_document(target: &LootId, replacement: &LootId) -> Value {
    json!({
        "type": MODIFIER_TYPE,
        "conditions": [
            {
                "condition": MODIFIER_CONDITION,
                "loot_table": target.to_string(),
            }
        ],
        "replacement": replacement.to_string(),
    })
}

/// Aggregate document listing every modifier
pub fn global_list_document(manifest: &OverrideManifest) -> Value {
    let entries: Vec<String> = manifest
        .modifier_ids()
        .iter()
        .map(LootId::to_string)
        .collect();
    json!({
        "replace": false,
        "entries": entries,
    })
}

/// Reads and writes override artifacts for one export root
#[derive(Debug, Clone)]
pub struct OverrideStore {
    pack_root: PathBuf,
}

impl OverrideStore {
    pub fn new(pack_root: impl Into<PathBuf>) -> Self {
        Self {
            pack_root: pack_root.into(),
        }
    }

    pub fn pack_root(&self) -> &Path {
        &self.pack_root
    }

    /// Read the manifest, failing on corrupt content
    pub fn try_load(&self) -> Result<OverrideManifest> {
        let file = manifest_file(&self.pack_root);
        if !file.is_file() {
            return Ok(OverrideManifest::new());
        }
        let content = fs::read_to_string(&file).map_err(|e| Error::FileRead {
            path: file.clone(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ManifestCorrupt { path: file, source })
    }

    /// Read the manifest; missing or corrupt content yields an empty one
    pub fn load(&self) -> OverrideManifest {
        match self.try_load() {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("{}. Starting fresh.", e);
                OverrideManifest::new()
            }
        }
    }

    pub fn save(&self, manifest: &OverrideManifest) -> Result<()> {
        write_json(manifest_file(&self.pack_root), manifest)
    }

    /// Write the replacement table content for `target`
    pub fn write_replacement(&self, target: &LootId, document: &Value) -> Result<PathBuf> {
        let file = replacement_file(&self.pack_root, target);
        write_json(&file, document)?;
        Ok(file)
    }

    pub fn write_modifier(&self, target: &LootId, replacement: &LootId) -> Result<()> {
        write_json(
            modifier_file(&self.pack_root, target),
            &modifier_document(target, replacement),
        )
    }

    pub fn write_global_list(&self, manifest: &OverrideManifest) -> Result<()> {
        write_json(
            global_modifiers_file(&self.pack_root),
            &global_list_document(manifest),
        )
    }

    /// Replace `target` with `document` and refresh every derived artifact
    ///
    /// The manifest is written last, after the replacement, the modifier and
    /// the global list it implies are on disk.
    pub fn apply(&self, target: &LootId, document: &Value) -> Result<PathBuf> {
        let replacement = replacement_id(target);
        let file = self.write_replacement(target, document)?;

        let manifest = self.load().upsert(target.clone(), replacement.clone());
        self.write_modifier(target, &replacement)?;
        self.write_global_list(&manifest)?;
        self.save(&manifest)?;

        info!("Override {} -> {} written to {}", target, replacement, file.display());
        Ok(file)
    }
}
