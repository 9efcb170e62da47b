//! Load, save, create and fork operations on loot tables

use crate::archive::{ArchiveView, ZipView};
use crate::codec::{self, Expansion, LootEntryRow, DEFAULT_ENTRY_TYPE};
use crate::datapack::{ensure_pack_root, is_world_mirror, sync_world_datapacks};
use crate::descriptor::{LootTableDescriptor, SourceType};
use crate::error::{Error, Result};
use crate::files::{join_slashed, read_json, write_json};
use crate::id::LootId;
use crate::links::{EnchantmentPoolLink, LinkStore};
use crate::overrides::{is_replacement_path, OverrideStore};
use crate::pools::{PoolResolver, PoolStore};
use crate::scanner::OVERRIDE_LABEL;
use crate::settings::PACK_FOLDER;
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub const KUBEJS_LABEL: &str = "KubeJS Override";

/// Starting point for a newly created table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableTemplate {
    Chest,
    EntityDrops,
    BlockDrops,
}

impl TableTemplate {
    pub fn loot_type(self) -> &'static str {
        match self {
            TableTemplate::Chest => "minecraft:chest",
            TableTemplate::EntityDrops => "minecraft:entity",
            TableTemplate::BlockDrops => "minecraft:block",
        }
    }

    pub fn default_entry(self) -> &'static str {
        match self {
            TableTemplate::Chest => "minecraft:stone",
            TableTemplate::EntityDrops => "minecraft:rotten_flesh",
            TableTemplate::BlockDrops => "minecraft:stone",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TableTemplate::Chest => "Chest / Container",
            TableTemplate::EntityDrops => "Entity Drops",
            TableTemplate::BlockDrops => "Block Drops",
        }
    }

    /// One roll, one default entry
    pub fn document(self) -> Value {
        json!({
            "type": self.loot_type(),
            "pools": [{
                "rolls": 1,
                "entries": [{ "type": DEFAULT_ENTRY_TYPE, "name": self.default_entry(), "weight": 1 }]
            }]
        })
    }
}

impl fmt::Display for TableTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TableTemplate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chest" | "container" => Ok(TableTemplate::Chest),
            "entity" | "entity-drops" | "entity_drops" => Ok(TableTemplate::EntityDrops),
            "block" | "block-drops" | "block_drops" => Ok(TableTemplate::BlockDrops),
            other => Err(format!("unknown template '{other}' (expected chest, entity or block)")),
        }
    }
}

/// Trimmed, lower-cased namespace
pub fn normalize_namespace(namespace: &str) -> Result<String> {
    let trimmed = namespace.trim();
    if trimmed.is_empty() {
        return Err(Error::IdentityRequired("namespace"));
    }
    Ok(trimmed.to_lowercase())
}

/// Trimmed table path with `/` separators and no `.json` suffix
pub fn normalize_table_path(table_path: &str) -> Result<String> {
    let normalized = table_path.trim().replace('\\', "/");
    let normalized = normalized.strip_suffix(".json").unwrap_or(&normalized);
    let normalized = normalized.trim_matches('/');
    if normalized.is_empty() {
        return Err(Error::IdentityRequired("table path"));
    }
    Ok(normalized.to_string())
}

/// Normalized identity of the table a descriptor points at
pub fn table_id(descriptor: &LootTableDescriptor) -> Result<LootId> {
    let namespace = normalize_namespace(&descriptor.namespace)?;
    let table_path = normalize_table_path(&descriptor.table_path)?;
    LootId::new(namespace, table_path)
}

/// Result of saving a row set
#[derive(Debug, Clone)]
pub struct SavedTable {
    /// Where the content now lives
    pub descriptor: LootTableDescriptor,
    pub document: Value,
    pub links: Vec<EnchantmentPoolLink>,
}

/// Table operations for one modpack
///
/// Writes are not synchronized; one editor owns a modpack root at a time.
#[derive(Debug, Clone)]
pub struct TableService {
    modpack_root: PathBuf,
}

impl TableService {
    pub fn new(modpack_root: impl Into<PathBuf>) -> Self {
        Self {
            modpack_root: modpack_root.into(),
        }
    }

    pub fn modpack_root(&self) -> &Path {
        &self.modpack_root
    }

    pub fn pool_store(&self) -> PoolStore {
        PoolStore::new(&self.modpack_root)
    }

    pub fn link_store(&self) -> LinkStore {
        LinkStore::new(&self.modpack_root)
    }

    /// Read a table from its file or archive member
    pub fn load(&self, descriptor: &LootTableDescriptor) -> Result<Value> {
        match descriptor.archive_member.as_deref() {
            Some(member) if descriptor.is_archive_entry() => {
                let mut view = ZipView::open(&descriptor.container)?;
                let bytes = view.read_bytes(member)?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            _ => read_json(&descriptor.container),
        }
    }

    /// Write `document` in place when possible, otherwise through the override layer
    ///
    /// In-place writes need an editable, standalone file outside the
    /// replacement tree and outside world mirrors, which the world sync
    /// overwrites. The returned descriptor is always editable.
    pub fn save_to_preferred_location(
        &self,
        descriptor: &LootTableDescriptor,
        document: &Value,
    ) -> Result<LootTableDescriptor> {
        let pack_root = ensure_pack_root(&self.modpack_root)?;
        let in_place = descriptor.editable
            && !descriptor.is_archive_entry()
            && descriptor.container.is_file()
            && !is_replacement_path(&pack_root, &descriptor.container)
            && !is_world_mirror(&self.modpack_root, &descriptor.container);

        let saved = if in_place {
            write_json(&descriptor.container, document)?;
            info!("Saved {} in place at {}", descriptor.qualified_name(), descriptor.container.display());
            LootTableDescriptor {
                archive_member: None,
                editable: true,
                ..descriptor.clone()
            }
        } else {
            let target = table_id(descriptor)?;
            let file = OverrideStore::new(&pack_root).apply(&target, document)?;
            LootTableDescriptor::file(
                target.namespace(),
                target.path(),
                file,
                OVERRIDE_LABEL,
                SourceType::Datapack,
                true,
            )
        };
        self.sync_worlds();
        Ok(saved)
    }

    /// Create a new table in the editor's datapack
    ///
    /// Fails with [`Error::TargetExists`] rather than overwrite anything.
    pub fn create_table(
        &self,
        namespace: &str,
        table_path: &str,
        template: TableTemplate,
    ) -> Result<LootTableDescriptor> {
        let namespace = normalize_namespace(namespace)?;
        let table_path = normalize_table_path(table_path)?;
        let pack_root = ensure_pack_root(&self.modpack_root)?;
        let dir = pack_root.join("data").join(&namespace).join("loot_table");
        let target = join_slashed(&dir, &format!("{table_path}.json"));
        if target.exists() {
            return Err(Error::TargetExists(target));
        }
        write_json(&target, &template.document())?;
        info!("Created {}:{} from {} template", namespace, table_path, template);
        self.sync_worlds();
        Ok(LootTableDescriptor::file(
            namespace,
            table_path,
            target,
            format!("Datapack: {PACK_FOLDER}"),
            SourceType::Datapack,
            true,
        ))
    }

    /// Copy a table into `kubejs/data` so it can be edited there
    pub fn fork_to_kubejs(&self, descriptor: &LootTableDescriptor) -> Result<LootTableDescriptor> {
        let target_id = table_id(descriptor)?;
        let document = self.load(descriptor)?;
        let dir = self
            .modpack_root
            .join("kubejs")
            .join("data")
            .join(target_id.namespace())
            .join("loot_table");
        let target = join_slashed(&dir, &format!("{}.json", target_id.path()));
        if target.exists() {
            return Err(Error::TargetExists(target));
        }
        write_json(&target, &document)?;
        info!("Forked {} to {}", target_id, target.display());
        Ok(LootTableDescriptor::file(
            target_id.namespace(),
            target_id.path(),
            target,
            KUBEJS_LABEL,
            SourceType::KubeJsOverride,
            true,
        ))
    }

    /// Push a table's current content into the override layer unchanged
    pub fn export_to_datapack(&self, descriptor: &LootTableDescriptor) -> Result<LootTableDescriptor> {
        let document = self.load(descriptor)?;
        self.save_to_preferred_location(descriptor, &document)
    }

    /// Every physical entry as a row, ignoring pools
    pub fn extract_entries(&self, document: &Value) -> Vec<LootEntryRow> {
        codec::extract_entries(document)
    }

    /// Rebuild a document from rows without expanding pools
    pub fn rebuild_table(&self, template: &Value, rows: &[LootEntryRow]) -> Value {
        codec::rebuild(template, rows)
    }

    /// Logical rows of a loaded table, collapsing pool-generated entries
    pub fn open_rows(&self, descriptor: &LootTableDescriptor, document: &Value) -> Vec<LootEntryRow> {
        match table_id(descriptor) {
            Ok(id) => codec::collapse(document, &self.link_store().load(&id)),
            Err(_) => codec::extract_entries(document),
        }
    }

    /// Expand `rows`, save the document and record its pool links
    pub fn save_rows<R: PoolResolver + ?Sized>(
        &self,
        descriptor: &LootTableDescriptor,
        template: &Value,
        rows: &[LootEntryRow],
        pools: &R,
    ) -> Result<SavedTable> {
        let table = table_id(descriptor)?;
        let Expansion { document, links } = codec::expand(template, rows, pools);
        let saved = self.save_to_preferred_location(descriptor, &document)?;
        self.link_store().save(&table, &links)?;
        Ok(SavedTable {
            descriptor: saved,
            document,
            links,
        })
    }

    /// Mirror the export root into every world save
    pub fn sync_world_datapacks(&self) -> Result<Vec<PathBuf>> {
        sync_world_datapacks(&self.modpack_root)
    }

    fn sync_worlds(&self) {
        match sync_world_datapacks(&self.modpack_root) {
            Ok(worlds) if !worlds.is_empty() => {
                info!("Propagated loot_editor datapack to {} world(s)", worlds.len())
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Failed to propagate datapack to worlds under {}: {}",
                self.modpack_root.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use crate::overrides::{global_modifiers_file, manifest_file, modifier_file, replacement_file};
    use crate::pools::{EnchantmentPool, EnchantmentPoolEntry};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn jar_descriptor(root: &Path) -> LootTableDescriptor {
        let jar = root.join("mods/cool.jar");
        fs::create_dir_all(jar.parent().unwrap()).unwrap();
        write_zip(
            &jar,
            &[("data/cool/loot_table/chests/vault.json", r#"{"type":"minecraft:chest","pools":[]}"#)],
        );
        LootTableDescriptor {
            namespace: "cool".into(),
            table_path: "chests/vault".into(),
            container: jar,
            archive_member: Some("data/cool/loot_table/chests/vault.json".into()),
            source_label: "Mod Jar: cool.jar".into(),
            source_type: SourceType::ModArchive,
            editable: false,
        }
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_namespace("  MyMod ").unwrap(), "mymod");
        assert_eq!(normalize_table_path(" chests\\vault.json ").unwrap(), "chests/vault");
        assert!(matches!(normalize_namespace(" "), Err(Error::IdentityRequired("namespace"))));
        assert!(matches!(normalize_table_path(".json"), Err(Error::IdentityRequired("table path"))));
    }

    #[test]
    fn test_template_parse() {
        assert_eq!("Chest".parse::<TableTemplate>().unwrap(), TableTemplate::Chest);
        assert_eq!("entity".parse::<TableTemplate>().unwrap(), TableTemplate::EntityDrops);
        assert!("barrel".parse::<TableTemplate>().is_err());
        assert_eq!(TableTemplate::EntityDrops.document()["pools"][0]["entries"][0]["name"], "minecraft:rotten_flesh");
    }

    #[test]
    fn test_load_from_archive_and_missing_member() {
        let tmp = TempDir::new().unwrap();
        let service = TableService::new(tmp.path());
        let mut descriptor = jar_descriptor(tmp.path());
        assert_eq!(service.load(&descriptor).unwrap()["type"], "minecraft:chest");

        descriptor.archive_member = Some("data/cool/loot_table/chests/gone.json".into());
        assert!(matches!(service.load(&descriptor), Err(Error::ArchiveEntryMissing { .. })));
    }

    #[test]
    fn test_editable_file_saved_in_place() {
        let tmp = TempDir::new().unwrap();
        let service = TableService::new(tmp.path());
        let created = service.create_table("mine", "chests/box", TableTemplate::Chest).unwrap();
        assert_eq!(created.container, tmp.path().join("datapacks/loot_editor/data/mine/loot_table/chests/box.json"));
        assert_eq!(created.source_label, "Datapack: loot_editor");

        let saved = service
            .save_to_preferred_location(&created, &json!({"type": "minecraft:chest", "pools": []}))
            .unwrap();
        assert_eq!(saved, created);
        assert_eq!(service.load(&saved).unwrap()["pools"], json!([]));
        assert!(!manifest_file(&tmp.path().join("datapacks/loot_editor")).exists());
    }

    #[test]
    fn test_archive_table_goes_through_override_layer() {
        let tmp = TempDir::new().unwrap();
        let service = TableService::new(tmp.path());
        let descriptor = jar_descriptor(tmp.path());
        let saved = service.export_to_datapack(&descriptor).unwrap();

        let pack_root = tmp.path().join("datapacks/loot_editor");
        let target = LootId::parse("cool:chests/vault").unwrap();
        assert_eq!(saved.container, replacement_file(&pack_root, &target));
        assert_eq!(saved.source_label, OVERRIDE_LABEL);
        assert!(saved.editable);
        assert!(modifier_file(&pack_root, &target).is_file());
        assert!(global_modifiers_file(&pack_root).is_file());

        let again = service.save_to_preferred_location(&saved, &json!({"pools": []})).unwrap();
        assert_eq!(again.container, saved.container);
        assert_eq!(OverrideStore::new(&pack_root).load().len(), 1);
    }

    #[test]
    fn test_world_mirror_table_survives_save() {
        let tmp = TempDir::new().unwrap();
        let world = tmp.path().join("saves/w");
        fs::create_dir_all(&world).unwrap();
        fs::write(world.join("level.dat"), b"").unwrap();
        let mirrored = world.join("datapacks/loot_editor/data/mine/loot_table/t.json");
        fs::create_dir_all(mirrored.parent().unwrap()).unwrap();
        fs::write(&mirrored, r#"{"pools": []}"#).unwrap();

        let descriptor = crate::reconcile::find_table(tmp.path(), "mine:t").unwrap();
        assert_eq!(descriptor.container, mirrored);
        assert!(!descriptor.editable);

        let service = TableService::new(tmp.path());
        let document = json!({"type": "minecraft:chest", "pools": []});
        let saved = service.save_to_preferred_location(&descriptor, &document).unwrap();
        let pack_root = tmp.path().join("datapacks/loot_editor");
        let target = LootId::parse("mine:t").unwrap();
        assert_eq!(saved.container, replacement_file(&pack_root, &target));
        assert!(saved.container.is_file());
        assert_eq!(service.load(&saved).unwrap(), document);
        assert!(world
            .join("datapacks/loot_editor")
            .join(replacement_file(&pack_root, &target).strip_prefix(&pack_root).unwrap())
            .is_file());
    }

    #[test]
    fn test_fork_refuses_existing_target() {
        let tmp = TempDir::new().unwrap();
        let service = TableService::new(tmp.path());
        let descriptor = jar_descriptor(tmp.path());
        let forked = service.fork_to_kubejs(&descriptor).unwrap();
        assert_eq!(forked.container, tmp.path().join("kubejs/data/cool/loot_table/chests/vault.json"));
        assert_eq!(forked.source_type, SourceType::KubeJsOverride);

        let before = fs::read(&forked.container).unwrap();
        assert!(matches!(service.fork_to_kubejs(&descriptor), Err(Error::TargetExists(_))));
        assert_eq!(fs::read(&forked.container).unwrap(), before);
    }

    #[test]
    fn test_save_rows_and_open_rows() {
        let tmp = TempDir::new().unwrap();
        let service = TableService::new(tmp.path());
        let pool = EnchantmentPool::new(
            "loot_editor",
            "armor",
            "Armor",
            false,
            vec![
                EnchantmentPoolEntry::new("minecraft:protection", 1.0, 1, 4).unwrap(),
                EnchantmentPoolEntry::new("minecraft:thorns", 1.0, 1, 1).unwrap(),
            ],
        )
        .unwrap();
        service.pool_store().save(&pool).unwrap();

        let created = service.create_table("mine", "chests/armory", TableTemplate::Chest).unwrap();
        let template = service.load(&created).unwrap();
        let rows = vec![
            LootEntryRow::item("minecraft:iron_chestplate", 10.0).with_pool("loot_editor:armor"),
            LootEntryRow::item("minecraft:bread", 5.0).with_counts(2, 4),
        ];
        let saved = service.save_rows(&created, &template, &rows, &service.pool_store()).unwrap();
        assert_eq!(saved.links.len(), 1);
        assert!(service.link_store().link_file(&LootId::parse("mine:chests/armory").unwrap()).is_file());

        let reloaded = service.load(&saved.descriptor).unwrap();
        assert_eq!(reloaded, saved.document);
        assert_eq!(service.open_rows(&saved.descriptor, &reloaded), rows);
        assert_eq!(service.extract_entries(&reloaded).len(), 3);

        let plain = vec![LootEntryRow::item("minecraft:bread", 1.0)];
        service.save_rows(&saved.descriptor, &reloaded, &plain, &service.pool_store()).unwrap();
        assert!(!service.link_store().link_file(&LootId::parse("mine:chests/armory").unwrap()).exists());
    }
}
