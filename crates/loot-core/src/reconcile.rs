//! Collapsing duplicate identities into the visible table list
//!
//! Descriptors sharing `(source type, qualified name)` are reduced to the one
//! with the highest priority. Ties keep the first one seen.

use crate::descriptor::{LootTableDescriptor, SourceType};
use crate::error::{Error, Result};
use crate::files::is_within;
use crate::scanner::scan_modpack;
use crate::settings::export_root;
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a descriptor sits relative to the modpack's well-known folders
#[derive(Debug, Clone)]
pub struct Priorities {
    export_root: PathBuf,
    datapacks: PathBuf,
    saves: PathBuf,
}

impl Priorities {
    pub fn for_modpack(modpack_root: &Path) -> Self {
        Self {
            export_root: export_root(modpack_root),
            datapacks: modpack_root.join("datapacks"),
            saves: modpack_root.join("saves"),
        }
    }

    /// 4 = export root, 3 = primary datapacks, 1 = world mirror, 2 = anything else
    pub fn score(&self, descriptor: &LootTableDescriptor) -> u8 {
        let container = &descriptor.container;
        if is_within(&self.export_root, container) {
            4
        } else if is_within(&self.datapacks, container) {
            3
        } else if is_within(&self.saves, container) {
            1
        } else {
            2
        }
    }
}

/// Reduce `descriptors` to one per `(source type, qualified name)`
///
/// Output is sorted by source type, namespace, then table path.
pub fn reconcile(modpack_root: &Path, descriptors: Vec<LootTableDescriptor>) -> Vec<LootTableDescriptor> {
    let priorities = Priorities::for_modpack(modpack_root);
    let mut best: HashMap<(SourceType, String), (u8, LootTableDescriptor)> = HashMap::new();

    for descriptor in descriptors {
        let score = priorities.score(&descriptor);
        match best.entry((descriptor.source_type, descriptor.qualified_name())) {
            Entry::Vacant(slot) => {
                slot.insert((score, descriptor));
            }
            Entry::Occupied(mut slot) => {
                if score > slot.get().0 {
                    debug!(
                        "{} from '{}' shadows '{}'",
                        descriptor.qualified_name(),
                        descriptor.source_label,
                        slot.get().1.source_label
                    );
                    slot.insert((score, descriptor));
                }
            }
        }
    }

    let mut visible: Vec<LootTableDescriptor> = best.into_values().map(|(_, d)| d).collect();
    visible.sort_by(|a, b| {
        (a.source_type, &a.namespace, &a.table_path).cmp(&(b.source_type, &b.namespace, &b.table_path))
    });
    visible
}

/// Scan and reconcile in one step
pub fn visible_tables(modpack_root: &Path) -> Result<Vec<LootTableDescriptor>> {
    let discovered = scan_modpack(modpack_root)?;
    Ok(reconcile(modpack_root, discovered))
}

/// The visible copy of `qualified_name` with the highest priority
///
/// When several source types carry the name, the first in presentation order wins.
pub fn find_table(modpack_root: &Path, qualified_name: &str) -> Result<LootTableDescriptor> {
    let priorities = Priorities::for_modpack(modpack_root);
    let wanted = qualified_name.trim();
    visible_tables(modpack_root)?
        .into_iter()
        .filter(|d| d.qualified_name() == wanted)
        .min_by_key(|d| (Reverse(priorities.score(d)), d.source_type))
        .ok_or_else(|| Error::TableNotFound(wanted.to_string()))
}
