//! Discovery of loot tables across every source in a modpack
//!
//! Sources, in visiting order:
//! - `datapacks/` sub-directories and zip archives (plus embedded datapacks)
//! - the editor's export root and its override manifest
//! - `saves/<world>/datapacks/` mirrors
//! - `kubejs/data` and its `_loot_dump` subtree
//! - `mods/*.jar`
//! - the vanilla client jar named by the instance descriptor
//!
//! Only a missing modpack root fails the scan. Any other unreadable source is
//! skipped and logged.

use crate::archive::{join, ArchiveView, DirView, ZipView};
use crate::datapack::is_world_mirror;
use crate::descriptor::{LootTableDescriptor, SourceType};
use crate::error::{Error, Result};
use crate::files::{absolute, join_slashed};
use crate::id::LootId;
use crate::instance::vanilla_jar;
use crate::overrides::{is_replacement_path, replacement_file, OverrideStore};
use crate::settings::export_root;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loot directory names, legacy first
pub const LOOT_DIRS: [&str; 2] = ["loot_tables", "loot_table"];

/// Label of descriptors synthesized from the override manifest
pub const OVERRIDE_LABEL: &str = "Loot Editor Override";

/// Discover every loot table reachable from `modpack_root`
///
/// Results are sorted by source type, namespace, then table path.
pub fn scan_modpack(modpack_root: &Path) -> Result<Vec<LootTableDescriptor>> {
    if !modpack_root.is_dir() {
        return Err(Error::InvalidRoot(modpack_root.to_path_buf()));
    }

    let mut scan = Discovery::new(modpack_root);
    scan.datapacks();
    scan.export_overrides();
    scan.worlds();
    scan.kubejs();
    scan.mods();
    scan.vanilla();

    let mut descriptors = scan.descriptors;
    descriptors.sort_by(|a, b| {
        (a.source_type, &a.namespace, &a.table_path).cmp(&(b.source_type, &b.namespace, &b.table_path))
    });
    info!(
        "Discovered {} loot tables under {}",
        descriptors.len(),
        modpack_root.display()
    );
    Ok(descriptors)
}

struct Discovery {
    root: PathBuf,
    export_root: PathBuf,
    descriptors: Vec<LootTableDescriptor>,
}

impl Discovery {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            export_root: export_root(root),
            descriptors: Vec::new(),
        }
    }

    fn datapacks(&mut self) {
        let dir = self.root.join("datapacks");
        let skip = absolute(&self.export_root);
        self.datapack_dir(&dir, "Datapack: ", Some(skip.as_path()));
    }

    /// Every pack directory or `.zip` directly inside `dir`
    fn datapack_dir(&mut self, dir: &Path, prefix: &str, skip: Option<&Path>) {
        for pack in sorted_children(dir) {
            if skip.is_some_and(|skip| absolute(&pack).as_path() == skip) {
                continue;
            }
            let label = format!("{prefix}{}", file_name(&pack));
            if pack.is_dir() {
                // A world's mirror of the export root is overwritten on every sync.
                let editable = !is_world_mirror(&self.root, &pack);
                let start = self.descriptors.len();
                let view = DirView::new(&pack);
                self.data_root(&view, "data", &label, SourceType::Datapack, editable);
                self.embedded(&view, &label, editable);
                // World mirrors of the export root carry a replacement tree too.
                self.hide_replacements(start, &pack);
            } else if pack.extension().is_some_and(|ext| ext == "zip") {
                self.archive(&pack, &label, SourceType::Datapack);
            }
        }
    }

    fn export_overrides(&mut self) {
        let export_root = self.export_root.clone();
        if export_root.join("data").is_dir() {
            info!("Scanning Loot Editor export datapack at {}", export_root.display());
            let start = self.descriptors.len();
            let view = DirView::new(&export_root);
            self.data_root(&view, "data", "Loot Editor Export", SourceType::Datapack, true);
            self.hide_replacements(start, &export_root);
        }

        let manifest = OverrideStore::new(&export_root).load();
        for entry in &manifest.overrides {
            let file = replacement_file(&export_root, &entry.target);
            if !file.is_file() {
                warn!("Override {} points to missing file {}", entry.target, file.display());
                continue;
            }
            self.descriptors.push(LootTableDescriptor::file(
                entry.target.namespace(),
                entry.target.path(),
                file,
                OVERRIDE_LABEL,
                SourceType::Datapack,
                true,
            ));
        }
    }

    /// Drop descriptors found since `start` that live in `pack_root`'s replacement tree
    fn hide_replacements(&mut self, start: usize, pack_root: &Path) {
        let found = self.descriptors.split_off(start);
        self.descriptors.extend(
            found
                .into_iter()
                .filter(|d| !is_replacement_path(pack_root, &d.container)),
        );
    }

    fn worlds(&mut self) {
        for world in sorted_children(&self.root.join("saves")) {
            let datapacks = world.join("datapacks");
            if datapacks.is_dir() {
                let prefix = format!("World {}: ", file_name(&world));
                self.datapack_dir(&datapacks, &prefix, None);
            }
        }
    }

    fn kubejs(&mut self) {
        let data = self.root.join("kubejs").join("data");
        if !data.is_dir() {
            return;
        }
        let view = DirView::new(&data);
        self.data_root(&view, "", "KubeJS", SourceType::KubeJsOverride, true);
        if view.is_dir("_loot_dump") {
            self.data_root(&view, "_loot_dump", "Loot Dump", SourceType::LootDump, false);
        }
    }

    fn mods(&mut self) {
        for jar in sorted_children(&self.root.join("mods")) {
            if jar.is_file() && jar.extension().is_some_and(|ext| ext == "jar") {
                let label = format!("Mod Jar: {}", file_name(&jar));
                self.archive(&jar, &label, SourceType::ModArchive);
            }
        }
    }

    fn vanilla(&mut self) {
        if let Some(jar) = vanilla_jar(&self.root) {
            self.archive(&jar, "Minecraft", SourceType::Vanilla);
        }
    }

    /// Mount one archive, scan it and drop it
    fn archive(&mut self, path: &Path, label: &str, source_type: SourceType) {
        let view = match ZipView::open(path) {
            Ok(view) => view,
            Err(e) => {
                debug!("Skipping archive: {}", Error::unreadable(path, e));
                return;
            }
        };
        self.data_root(&view, "data", label, source_type, false);
        self.embedded(&view, label, false);
    }

    /// Top-level folders holding `pack.mcmeta` beside a `data` directory
    fn embedded(&mut self, view: &dyn ArchiveView, label: &str, editable: bool) {
        let entries = match view.list("") {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Unable to inspect embedded datapacks: {}", Error::unreadable(view.container(), e));
                return;
            }
        };
        for entry in entries.into_iter().filter(|e| e.is_dir) {
            let data = join(&entry.name, "data");
            if view.is_file(&join(&entry.name, "pack.mcmeta")) && view.is_dir(&data) {
                let label = format!("{label} (Datapack {})", entry.name);
                self.data_root(view, &data, &label, SourceType::Datapack, editable);
            }
        }
    }

    /// Walk `<data_root>/<namespace>/<loot dir>/**.json`
    fn data_root(
        &mut self,
        view: &dyn ArchiveView,
        data_root: &str,
        label: &str,
        source_type: SourceType,
        editable: bool,
    ) {
        if !view.is_dir(data_root) {
            return;
        }
        let namespaces = match view.list(data_root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read namespaces: {}", Error::unreadable(view.container(), e));
                return;
            }
        };
        for namespace in namespaces.into_iter().filter(|e| e.is_dir) {
            for loot_dir in LOOT_DIRS {
                let dir = join(&join(data_root, &namespace.name), loot_dir);
                if !view.is_dir(&dir) {
                    continue;
                }
                let files = match view.walk_files(&dir) {
                    Ok(files) => files,
                    Err(e) => {
                        warn!("Failed to walk loot tables under {}: {}", dir, e);
                        continue;
                    }
                };
                for member in files {
                    if let Some(descriptor) =
                        describe(view, &dir, member, &namespace.name, label, source_type, editable)
                    {
                        self.descriptors.push(descriptor);
                    }
                }
            }
        }
    }
}

fn describe(
    view: &dyn ArchiveView,
    loot_dir: &str,
    member: String,
    namespace: &str,
    label: &str,
    source_type: SourceType,
    editable: bool,
) -> Option<LootTableDescriptor> {
    let relative = member.strip_prefix(loot_dir)?.strip_prefix('/')?;
    let table_path = relative.strip_suffix(".json")?.to_string();
    if let Err(e) = LootId::new(namespace, table_path.as_str()) {
        debug!("Skipping {} in {}: {}", member, view.container().display(), e);
        return None;
    }
    let descriptor = if view.is_archive() {
        LootTableDescriptor {
            namespace: namespace.to_string(),
            table_path,
            container: view.container().to_path_buf(),
            archive_member: Some(member),
            source_label: label.to_string(),
            source_type,
            editable: false,
        }
    } else {
        LootTableDescriptor::file(
            namespace,
            table_path,
            join_slashed(view.container(), &member),
            label,
            source_type,
            editable,
        )
    };
    Some(descriptor)
}

fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut children: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    children.sort();
    children
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn names(descriptors: &[LootTableDescriptor]) -> Vec<String> {
        descriptors.iter().map(|d| d.qualified_name()).collect()
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            scan_modpack(&tmp.path().join("nope")),
            Err(Error::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_empty_root_scans_clean() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_modpack(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_both_loot_dir_names() {
        let tmp = TempDir::new().unwrap();
        let pack = tmp.path().join("datapacks/mine/data/ns");
        write(&pack.join("loot_tables/old.json"), "{}");
        write(&pack.join("loot_table/chests/new.json"), "{}");
        write(&pack.join("loot_table/readme.txt"), "");

        let found = scan_modpack(tmp.path()).unwrap();
        assert_eq!(names(&found), vec!["ns:chests/new", "ns:old"]);
        assert!(found.iter().all(|d| d.editable && d.source_label == "Datapack: mine"));
    }

    #[test]
    fn test_zip_datapack_and_mod_jar_are_archive_backed() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("datapacks")).unwrap();
        fs::create_dir_all(tmp.path().join("mods")).unwrap();
        write_zip(
            &tmp.path().join("datapacks/extra.zip"),
            &[("data/extra/loot_table/blocks/ore.json", "{}")],
        );
        write_zip(
            &tmp.path().join("mods/cool.jar"),
            &[
                ("data/cool/loot_tables/chests/vault.json", "{}"),
                ("bundled/pack.mcmeta", "{}"),
                ("bundled/data/cool/loot_table/entities/bat.json", "{}"),
            ],
        );
        fs::write(tmp.path().join("mods/broken.jar"), b"not a zip").unwrap();

        let found = scan_modpack(tmp.path()).unwrap();
        let ore = found.iter().find(|d| d.qualified_name() == "extra:blocks/ore").unwrap();
        assert_eq!(ore.source_type, SourceType::Datapack);
        assert!(!ore.editable);
        assert_eq!(ore.archive_member.as_deref(), Some("data/extra/loot_table/blocks/ore.json"));

        let vault = found.iter().find(|d| d.qualified_name() == "cool:chests/vault").unwrap();
        assert_eq!(vault.source_type, SourceType::ModArchive);
        assert_eq!(vault.source_label, "Mod Jar: cool.jar");
        assert_eq!(vault.container, tmp.path().join("mods/cool.jar"));

        let bat = found.iter().find(|d| d.qualified_name() == "cool:entities/bat").unwrap();
        assert_eq!(bat.source_type, SourceType::Datapack);
        assert_eq!(bat.source_label, "Mod Jar: cool.jar (Datapack bundled)");
        assert_eq!(
            bat.archive_member.as_deref(),
            Some("bundled/data/cool/loot_table/entities/bat.json")
        );
    }

    #[test]
    fn test_world_kubejs_and_loot_dump_sources() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("saves/Survival/datapacks/wp/data/w/loot_table/a.json"), "{}");
        write(&tmp.path().join("kubejs/data/kj/loot_table/b.json"), "{}");
        write(&tmp.path().join("kubejs/data/_loot_dump/dump/loot_table/c.json"), "{}");

        let found = scan_modpack(tmp.path()).unwrap();
        let by_name = |name: &str| found.iter().find(|d| d.qualified_name() == name).unwrap();
        assert_eq!(by_name("w:a").source_label, "World Survival: wp");
        assert_eq!(by_name("kj:b").source_type, SourceType::KubeJsOverride);
        let dump = by_name("dump:c");
        assert_eq!(dump.source_type, SourceType::LootDump);
        assert!(!dump.editable);
    }

    #[test]
    fn test_export_root_hides_replacements_and_adds_overrides() {
        let tmp = TempDir::new().unwrap();
        let export = tmp.path().join("datapacks/loot_editor");
        let target = LootId::parse("minecraft:chests/simple_dungeon").unwrap();
        let store = OverrideStore::new(&export);
        store.apply(&target, &serde_json::json!({"pools": []})).unwrap();
        write(&export.join("data/mine/loot_table/own.json"), "{}");

        let missing = LootId::parse("minecraft:chests/gone").unwrap();
        let manifest = store.load().upsert(missing.clone(), crate::overrides::replacement_id(&missing));
        store.save(&manifest).unwrap();

        let found = scan_modpack(tmp.path()).unwrap();
        assert_eq!(names(&found), vec!["mine:own", "minecraft:chests/simple_dungeon"]);
        let override_entry = &found[1];
        assert_eq!(override_entry.source_label, OVERRIDE_LABEL);
        assert!(override_entry.editable);
        assert_eq!(override_entry.container, replacement_file(&export, &target));
        assert_eq!(found[0].source_label, "Loot Editor Export");
    }

    #[test]
    fn test_world_mirror_hides_replacement_tree() {
        let tmp = TempDir::new().unwrap();
        let mirror = tmp.path().join("saves/w/datapacks/loot_editor");
        let target = LootId::parse("minecraft:chests/simple_dungeon").unwrap();
        OverrideStore::new(&mirror)
            .apply(&target, &serde_json::json!({"pools": []}))
            .unwrap();
        write(&mirror.join("data/mine/loot_table/own.json"), "{}");

        let found = scan_modpack(tmp.path()).unwrap();
        assert_eq!(names(&found), vec!["mine:own"]);
        assert_eq!(found[0].source_label, "World w: loot_editor");
        assert!(!found[0].editable);
    }

    #[test]
    fn test_namespace_with_colon_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("datapacks/p/data/a:b/loot_table/x.json"), "{}");
        write(&tmp.path().join("datapacks/p/data/ok/loot_table/y.json"), "{}");

        let found = scan_modpack(tmp.path()).unwrap();
        assert_eq!(names(&found), vec!["ok:y"]);
        for name in names(&found) {
            assert_eq!(LootId::parse(&name).unwrap().to_string(), name);
        }
    }

    #[test]
    fn test_corrupt_instance_descriptor_keeps_other_sources() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join(crate::instance::INSTANCE_FILE), "{\"baseModLoader\": [");
        write(&tmp.path().join("datapacks/mine/data/mine/loot_table/chests/a.json"), "{}");

        let found = scan_modpack(tmp.path()).unwrap();
        assert_eq!(names(&found), vec!["mine:chests/a"]);
        assert_eq!(found[0].source_type, SourceType::Datapack);
    }
}
