//! Read-only scan manifest for comparison tooling

use crate::descriptor::{LootTableDescriptor, SourceType};
use crate::error::Result;
use crate::files::write_json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_SOURCE: &str = "jar_scan";

/// One discovered table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTable {
    pub id: String,
    pub namespace: String,
    pub path: String,
    pub source_type: String,
    pub source_label: String,
    pub source_display: String,
    pub editable: bool,
    pub container_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub archive_entry: Option<String>,
}

impl From<&LootTableDescriptor> for ManifestTable {
    fn from(descriptor: &LootTableDescriptor) -> Self {
        Self {
            id: descriptor.qualified_name(),
            namespace: descriptor.namespace.clone(),
            path: descriptor.table_path.clone(),
            source_type: descriptor.source_type.key().to_string(),
            source_label: descriptor.source_type.label().to_string(),
            source_display: descriptor.source_label.clone(),
            editable: descriptor.editable,
            container_path: descriptor.container.clone(),
            archive_entry: descriptor.archive_member.clone(),
        }
    }
}

/// `{source, generated, packRoot, entries, tables}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanManifest {
    pub source: String,
    pub generated: String,
    pub pack_root: PathBuf,
    pub entries: usize,
    pub tables: Vec<ManifestTable>,
}

impl ScanManifest {
    pub fn from_descriptors(pack_root: &Path, descriptors: &[LootTableDescriptor]) -> Self {
        Self::generated_at(pack_root, descriptors, Utc::now())
    }

    pub fn generated_at(pack_root: &Path, descriptors: &[LootTableDescriptor], at: DateTime<Utc>) -> Self {
        Self {
            source: MANIFEST_SOURCE.to_string(),
            generated: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            pack_root: pack_root.to_path_buf(),
            entries: descriptors.len(),
            tables: descriptors.iter().map(ManifestTable::from).collect(),
        }
    }

    /// Table count per source type, in presentation order
    pub fn counts(descriptors: &[LootTableDescriptor]) -> BTreeMap<SourceType, usize> {
        let mut counts = BTreeMap::new();
        for descriptor in descriptors {
            *counts.entry(descriptor.source_type).or_insert(0) += 1;
        }
        counts
    }

    /// Write pretty-printed, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}
