//! Descriptors for discovered loot tables

use crate::error::Result;
use crate::id::LootId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a loot table was discovered
///
/// Declaration order is the presentation order of scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Datapack,
    #[serde(rename = "KubeJSOverride")]
    KubeJsOverride,
    ModArchive,
    LootDump,
    Vanilla,
    Unknown,
}

impl SourceType {
    /// Short human-readable label
    pub fn label(self) -> &'static str {
        match self {
            SourceType::Datapack => "Datapack",
            SourceType::KubeJsOverride => "KubeJS",
            SourceType::ModArchive => "Mod Jar",
            SourceType::LootDump => "Loot Dump",
            SourceType::Vanilla => "Minecraft",
            SourceType::Unknown => "Unknown",
        }
    }

    /// Upper-snake key used in scan manifests
    pub fn key(self) -> &'static str {
        match self {
            SourceType::Datapack => "DATAPACK",
            SourceType::KubeJsOverride => "KUBEJS",
            SourceType::ModArchive => "MOD_JAR",
            SourceType::LootDump => "LOOT_DUMP",
            SourceType::Vanilla => "VANILLA",
            SourceType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single loot table found during discovery
///
/// Rebuilt on every scan and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootTableDescriptor {
    /// Namespace directory the table lives under
    pub namespace: String,
    /// Path below the loot-table directory, without `.json`
    pub table_path: String,
    /// The file itself, or the archive holding it
    pub container: PathBuf,
    /// Member name inside `container` for archive-backed tables
    pub archive_member: Option<String>,
    /// Human-readable source label (e.g. "Mod Jar: foo.jar")
    pub source_label: String,
    pub source_type: SourceType,
    /// Whether the table can be overwritten in place
    pub editable: bool,
}

impl LootTableDescriptor {
    /// Descriptor for a standalone file on disk
    pub fn file(
        namespace: impl Into<String>,
        table_path: impl Into<String>,
        container: impl Into<PathBuf>,
        source_label: impl Into<String>,
        source_type: SourceType,
        editable: bool,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            table_path: table_path.into(),
            container: container.into(),
            archive_member: None,
            source_label: source_label.into(),
            source_type,
            editable,
        }
    }

    /// `namespace:table_path`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.namespace, self.table_path)
    }

    pub fn loot_id(&self) -> Result<LootId> {
        LootId::new(self.namespace.as_str(), self.table_path.as_str())
    }

    pub fn is_archive_entry(&self) -> bool {
        self.archive_member
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty())
    }
}
