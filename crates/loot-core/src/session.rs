//! Editing state of a single open table
//!
//! ```text
//! open() ──> Loaded(clean) <──> Loaded(dirty)
//!                 ^                  │ save()
//!                 └──── Saved <──────┘
//! ```
//!
//! `Saved` is clean and refers to the newly written descriptor; the next edit
//! or revert continues from `Loaded` against that descriptor.

use crate::codec::{self, Expansion, LootEntryRow};
use crate::descriptor::LootTableDescriptor;
use crate::error::Result;
use crate::pools::PoolResolver;
use crate::service::{table_id, TableService};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded { dirty: bool },
    Saved,
}

/// A table loaded for editing
#[derive(Debug, Clone)]
pub struct TableSession {
    descriptor: LootTableDescriptor,
    snapshot: Value,
    baseline: Vec<LootEntryRow>,
    rows: Vec<LootEntryRow>,
    state: SessionState,
}

impl TableSession {
    /// Load a table and collapse its rows
    pub fn open(service: &TableService, descriptor: LootTableDescriptor) -> Result<Self> {
        let snapshot = service.load(&descriptor)?;
        let baseline = service.open_rows(&descriptor, &snapshot);
        debug!("Opened {} with {} rows", descriptor.qualified_name(), baseline.len());
        Ok(Self {
            descriptor,
            snapshot,
            rows: baseline.clone(),
            baseline,
            state: SessionState::Loaded { dirty: false },
        })
    }

    pub fn descriptor(&self) -> &LootTableDescriptor {
        &self.descriptor
    }

    /// Document as last loaded or saved
    pub fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    pub fn rows(&self) -> &[LootEntryRow] {
        &self.rows
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == SessionState::Loaded { dirty: true }
    }

    /// Replace the working rows; dirty only when they differ from the baseline
    pub fn set_rows(&mut self, rows: Vec<LootEntryRow>) {
        self.rows = rows;
        self.state = SessionState::Loaded {
            dirty: self.rows != self.baseline,
        };
    }

    /// Apply an edit to the working rows
    pub fn edit(&mut self, f: impl FnOnce(&mut Vec<LootEntryRow>)) {
        let mut rows = self.rows.clone();
        f(&mut rows);
        self.set_rows(rows);
    }

    /// Drop unsaved edits
    pub fn revert(&mut self) {
        self.rows = self.baseline.clone();
        self.state = SessionState::Loaded { dirty: false };
    }

    /// Save the working rows and adopt the written location
    ///
    /// The table is written before its pool links. If the link write fails the
    /// session still follows the written table and stays dirty, so a retry
    /// rewrites both.
    pub fn save<R: PoolResolver + ?Sized>(&mut self, service: &TableService, pools: &R) -> Result<&LootTableDescriptor> {
        let table = table_id(&self.descriptor)?;
        let Expansion { document, links } = codec::expand(&self.snapshot, &self.rows, pools);
        self.descriptor = service.save_to_preferred_location(&self.descriptor, &document)?;
        self.snapshot = document;
        service.link_store().save(&table, &links)?;
        self.baseline = self.rows.clone();
        self.state = SessionState::Saved;
        Ok(&self.descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use crate::descriptor::SourceType;
    use crate::pools::EnchantmentPool;
    use crate::scanner::OVERRIDE_LABEL;
    use std::fs;
    use tempfile::TempDir;

    fn vanilla_descriptor(root: &std::path::Path) -> LootTableDescriptor {
        let jar = root.join("client.jar");
        write_zip(
            &jar,
            &[(
                "data/minecraft/loot_table/chests/simple_dungeon.json",
                r#"{"type":"minecraft:chest","pools":[{"rolls":2,"entries":[{"type":"minecraft:item","name":"minecraft:bone","weight":10}]}]}"#,
            )],
        );
        LootTableDescriptor {
            namespace: "minecraft".into(),
            table_path: "chests/simple_dungeon".into(),
            container: jar,
            archive_member: Some("data/minecraft/loot_table/chests/simple_dungeon.json".into()),
            source_label: "Minecraft".into(),
            source_type: SourceType::Vanilla,
            editable: false,
        }
    }

    #[test]
    fn test_state_transitions() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pack")).unwrap();
        let service = TableService::new(tmp.path().join("pack"));
        let mut session = TableSession::open(&service, vanilla_descriptor(tmp.path())).unwrap();
        assert_eq!(session.state(), SessionState::Loaded { dirty: false });
        assert_eq!(session.rows().len(), 1);

        session.edit(|rows| rows[0].weight = 20.0);
        assert!(session.is_dirty());
        session.edit(|rows| rows[0].weight = 10.0);
        assert!(!session.is_dirty());

        session.edit(|rows| rows.push(LootEntryRow::item("minecraft:diamond", 1.0)));
        session.revert();
        assert_eq!(session.rows().len(), 1);
        assert_eq!(session.state(), SessionState::Loaded { dirty: false });

        session.edit(|rows| rows.push(LootEntryRow::item("minecraft:diamond", 1.0)));
        let none: Vec<EnchantmentPool> = Vec::new();
        let saved = session.save(&service, &none).unwrap().clone();
        assert_eq!(session.state(), SessionState::Saved);
        assert_eq!(saved.source_label, OVERRIDE_LABEL);
        assert!(saved.editable && saved.archive_member.is_none());
        assert_eq!(session.snapshot()["pools"][0]["rolls"], 2);

        session.revert();
        assert_eq!(session.rows().len(), 2);
        assert_eq!(service.load(session.descriptor()).unwrap(), *session.snapshot());
    }

    #[test]
    fn test_failed_link_write_keeps_written_table() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("pack");
        // A file where the link directory belongs makes the link write fail.
        let blocker = root.join("kubejs/data/loot_editor/pool_links");
        fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        fs::write(&blocker, "").unwrap();

        let service = TableService::new(&root);
        let mut session = TableSession::open(&service, vanilla_descriptor(tmp.path())).unwrap();
        let pools = vec![EnchantmentPool::new(
            "loot_editor",
            "books",
            "Books",
            false,
            vec![crate::pools::EnchantmentPoolEntry::new("minecraft:mending", 1.0, 1, 1).unwrap()],
        )
        .unwrap()];
        session.edit(|rows| rows.push(LootEntryRow::item("minecraft:book", 1.0).with_pool("books")));

        assert!(session.save(&service, &pools).is_err());
        assert_eq!(session.descriptor().source_label, OVERRIDE_LABEL);
        assert!(session.descriptor().container.is_file());
        assert_eq!(service.load(session.descriptor()).unwrap(), *session.snapshot());
        assert_eq!(session.snapshot()["pools"][0]["entries"].as_array().unwrap().len(), 2);
        assert!(session.is_dirty());
    }
}
