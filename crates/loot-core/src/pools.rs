//! Enchantment pools: named, weighted enchantment lists attached to loot rows
//!
//! Pools live under `kubejs/data/<namespace>/enchantment_pools/<name>.json`.

use crate::error::{Error, Result};
use crate::files::{read_json, write_json};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Namespace used when a pool id carries none
pub const DEFAULT_POOL_NAMESPACE: &str = "loot_editor";

const POOLS_DIR: &str = "enchantment_pools";

/// One weighted option inside a pool
#[derive(Debug, Clone, PartialEq)]
pub struct EnchantmentPoolEntry {
    pub enchantment_id: String,
    pub weight: f64,
    pub min_level: u32,
    pub max_level: u32,
}

impl EnchantmentPoolEntry {
    /// Weight must be positive; levels are clamped to `1 <= min <= max`
    pub fn new(
        enchantment_id: impl Into<String>,
        weight: f64,
        min_level: u32,
        max_level: u32,
    ) -> Result<Self> {
        let enchantment_id = enchantment_id.into();
        if !(weight > 0.0) {
            return Err(Error::InvalidPool(format!(
                "weight for '{enchantment_id}' must be > 0"
            )));
        }
        let min_level = min_level.max(1);
        Ok(Self {
            enchantment_id,
            weight,
            min_level,
            max_level: max_level.max(min_level),
        })
    }
}

/// A reusable weighted list of enchantment options
#[derive(Debug, Clone, PartialEq)]
pub struct EnchantmentPool {
    namespace: String,
    name: String,
    display_name: String,
    treasure_allowed: bool,
    entries: Vec<EnchantmentPoolEntry>,
}

impl EnchantmentPool {
    pub fn new(
        namespace: &str,
        name: &str,
        display_name: &str,
        treasure_allowed: bool,
        entries: Vec<EnchantmentPoolEntry>,
    ) -> Result<Self> {
        let namespace = match namespace.trim() {
            "" => DEFAULT_POOL_NAMESPACE.to_string(),
            ns => ns.to_lowercase(),
        };
        let name = name.trim().to_lowercase().replace(' ', "_");
        if name.is_empty() {
            return Err(Error::InvalidPool("pool name is required".to_string()));
        }
        if name.contains(':') || name.contains('/') {
            return Err(Error::InvalidPool(format!(
                "pool name '{name}' must not contain ':' or '/'"
            )));
        }
        let display_name = match display_name.trim() {
            "" => name.clone(),
            label => label.to_string(),
        };
        Ok(Self {
            namespace,
            name,
            display_name,
            treasure_allowed,
            entries,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `namespace:name`
    pub fn id(&self) -> String {
        format!("{}:{}", self.namespace, self.name)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn treasure_allowed(&self) -> bool {
        self.treasure_allowed
    }

    pub fn entries(&self) -> &[EnchantmentPoolEntry] {
        &self.entries
    }

    /// Sum of option weights, treated as 1 when not positive
    pub fn total_weight(&self) -> f64 {
        let total: f64 = self.entries.iter().map(|e| e.weight).sum();
        if total <= 0.0 {
            1.0
        } else {
            total
        }
    }
}

/// Split a pool id into namespace and name
pub fn split_pool_id(pool_id: &str) -> (&str, &str) {
    match pool_id.split_once(':') {
        Some((namespace, name)) => (namespace, name),
        None => (DEFAULT_POOL_NAMESPACE, pool_id),
    }
}

/// Qualified `namespace:name` form of a pool id, `None` when blank
pub fn qualify_pool_id(pool_id: &str) -> Option<String> {
    let trimmed = pool_id.trim();
    if trimmed.is_empty() {
        return None;
    }
    match split_pool_id(trimmed) {
        ("", name) => Some(format!("{DEFAULT_POOL_NAMESPACE}:{name}")),
        (namespace, name) => Some(format!("{namespace}:{name}")),
    }
}

/// Lower-cased, underscore-separated pool name for free-form input
pub fn sanitize_name(input: &str) -> String {
    match input.trim() {
        "" => "pool".to_string(),
        trimmed => trimmed.to_lowercase().replace(' ', "_"),
    }
}

/// Looks up pools by id for the pool codec
pub trait PoolResolver {
    fn resolve(&self, pool_id: &str) -> Option<EnchantmentPool>;
}

impl PoolResolver for [EnchantmentPool] {
    fn resolve(&self, pool_id: &str) -> Option<EnchantmentPool> {
        let (namespace, name) = split_pool_id(pool_id.trim());
        self.iter()
            .find(|p| p.namespace() == namespace && p.name() == name)
            .cloned()
    }
}

impl PoolResolver for Vec<EnchantmentPool> {
    fn resolve(&self, pool_id: &str) -> Option<EnchantmentPool> {
        self.as_slice().resolve(pool_id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PoolFile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    treasure_allowed: bool,
    #[serde(default)]
    entries: Vec<PoolFileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PoolFileEntry {
    #[serde(default = "default_enchantment")]
    enchantment: String,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default = "default_level")]
    min_level: u32,
    #[serde(default = "default_level")]
    max_level: u32,
}

fn default_enchantment() -> String {
    "minecraft:unbreaking".to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_level() -> u32 {
    1
}

/// Reads and writes pool definitions for one modpack
#[derive(Debug, Clone)]
pub struct PoolStore {
    modpack_root: PathBuf,
}

impl PoolStore {
    pub fn new(modpack_root: impl Into<PathBuf>) -> Self {
        Self {
            modpack_root: modpack_root.into(),
        }
    }

    fn data_root(&self) -> PathBuf {
        self.modpack_root.join("kubejs").join("data")
    }

    pub fn pool_file(&self, namespace: &str, name: &str) -> PathBuf {
        self.data_root()
            .join(namespace)
            .join(POOLS_DIR)
            .join(format!("{name}.json"))
    }

    /// Every readable pool, sorted case-insensitively by id
    pub fn list(&self) -> Vec<EnchantmentPool> {
        let data_root = self.data_root();
        if !data_root.is_dir() {
            return Vec::new();
        }
        let mut pools: Vec<EnchantmentPool> = WalkDir::new(&data_root)
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .parent()
                    .and_then(Path::file_name)
                    .is_some_and(|dir| dir == POOLS_DIR)
            })
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| load_pool_file(e.path()))
            .collect();
        pools.sort_by_key(|p| p.id().to_lowercase());
        pools
    }

    pub fn find(&self, pool_id: &str) -> Option<EnchantmentPool> {
        let pool_id = pool_id.trim();
        if pool_id.is_empty() {
            return None;
        }
        let (namespace, name) = split_pool_id(pool_id);
        let file = self.pool_file(namespace, name);
        if !file.is_file() {
            return None;
        }
        load_pool_file(&file)
    }

    /// Like [`find`](Self::find) but missing pools are an error
    pub fn require(&self, pool_id: &str) -> Result<EnchantmentPool> {
        self.find(pool_id)
            .ok_or_else(|| Error::PoolUnresolved(pool_id.to_string()))
    }

    pub fn save(&self, pool: &EnchantmentPool) -> Result<PathBuf> {
        let file = self.pool_file(pool.namespace(), pool.name());
        let body = PoolFile {
            display_name: Some(pool.display_name().to_string()),
            treasure_allowed: pool.treasure_allowed(),
            entries: pool
                .entries()
                .iter()
                .map(|e| PoolFileEntry {
                    enchantment: e.enchantment_id.clone(),
                    weight: e.weight,
                    min_level: e.min_level,
                    max_level: e.max_level,
                })
                .collect(),
        };
        write_json(&file, &body)?;
        Ok(file)
    }

    /// Delete a pool; unknown ids are ignored
    pub fn delete(&self, pool_id: &str) -> Result<()> {
        if let Some(pool) = self.find(pool_id) {
            let file = self.pool_file(pool.namespace(), pool.name());
            if file.exists() {
                fs::remove_file(file)?;
            }
        }
        Ok(())
    }
}

impl PoolResolver for PoolStore {
    fn resolve(&self, pool_id: &str) -> Option<EnchantmentPool> {
        self.find(pool_id)
    }
}

fn load_pool_file(path: &Path) -> Option<EnchantmentPool> {
    let namespace = path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)?
        .to_string_lossy()
        .into_owned();
    let name = path.file_stem()?.to_string_lossy().into_owned();

    let parsed = read_json::<PoolFile, _>(path).and_then(|raw| {
        let entries = raw
            .entries
            .into_iter()
            .map(|e| EnchantmentPoolEntry::new(e.enchantment, e.weight, e.min_level, e.max_level))
            .collect::<Result<Vec<_>>>()?;
        EnchantmentPool::new(
            &namespace,
            &name,
            raw.display_name.as_deref().unwrap_or(&name),
            raw.treasure_allowed,
            entries,
        )
    });
    match parsed {
        Ok(pool) => Some(pool),
        Err(e) => {
            debug!("Skipping pool file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_pool() -> EnchantmentPool {
        EnchantmentPool::new(
            "loot_editor",
            "Weapon Tier",
            "Weapon Tier",
            true,
            vec![
                EnchantmentPoolEntry::new("minecraft:sharpness", 2.0, 1, 3).unwrap(),
                EnchantmentPoolEntry::new("minecraft:looting", 1.0, 2, 2).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pool_name_normalization() {
        let pool = sample_pool();
        assert_eq!(pool.name(), "weapon_tier");
        assert_eq!(pool.id(), "loot_editor:weapon_tier");

        let blank_ns = EnchantmentPool::new("  ", "x", "", false, vec![]).unwrap();
        assert_eq!(blank_ns.namespace(), "loot_editor");
        assert_eq!(blank_ns.display_name(), "x");

        assert!(EnchantmentPool::new("ns", "a/b", "", false, vec![]).is_err());
        assert!(EnchantmentPool::new("ns", " ", "", false, vec![]).is_err());
    }

    #[test]
    fn test_entry_validation() {
        assert!(EnchantmentPoolEntry::new("minecraft:mending", 0.0, 1, 1).is_err());
        let entry = EnchantmentPoolEntry::new("minecraft:mending", 1.0, 0, 0).unwrap();
        assert_eq!((entry.min_level, entry.max_level), (1, 1));
        let entry = EnchantmentPoolEntry::new("minecraft:power", 1.0, 4, 2).unwrap();
        assert_eq!((entry.min_level, entry.max_level), (4, 4));
    }

    #[test]
    fn test_total_weight_floor() {
        let empty = EnchantmentPool::new("ns", "empty", "", false, vec![]).unwrap();
        assert_eq!(empty.total_weight(), 1.0);
        assert_eq!(sample_pool().total_weight(), 3.0);
    }

    #[test]
    fn test_store_save_find_list_delete() {
        let tmp = TempDir::new().unwrap();
        let store = PoolStore::new(tmp.path());
        let pool = sample_pool();
        let file = store.save(&pool).unwrap();
        assert!(file.ends_with("kubejs/data/loot_editor/enchantment_pools/weapon_tier.json"));

        assert_eq!(store.find("loot_editor:weapon_tier"), Some(pool.clone()));
        assert_eq!(store.find("weapon_tier"), Some(pool.clone()));
        assert_eq!(store.find("other:weapon_tier"), None);
        assert_eq!(store.list(), vec![pool.clone()]);

        store.delete("weapon_tier").unwrap();
        assert!(store.find("weapon_tier").is_none());
        assert!(matches!(store.require("weapon_tier"), Err(Error::PoolUnresolved(_))));
    }

    #[test]
    fn test_store_reads_defaults_and_skips_invalid() {
        let tmp = TempDir::new().unwrap();
        let store = PoolStore::new(tmp.path());
        let dir = tmp.path().join("kubejs/data/custom/enchantment_pools");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("minimal.json"), r#"{"entries": [{}]}"#).unwrap();
        fs::write(dir.join("bad.json"), r#"{"entries": [{"weight": -1}]}"#).unwrap();

        let pools = store.list();
        assert_eq!(pools.len(), 1);
        let pool = &pools[0];
        assert_eq!(pool.id(), "custom:minimal");
        assert_eq!(pool.display_name(), "minimal");
        assert_eq!(pool.entries()[0].enchantment_id, "minecraft:unbreaking");
    }

    #[test]
    fn test_slice_resolver() {
        let pools = vec![sample_pool()];
        assert!(pools.resolve("weapon_tier").is_some());
        assert!(pools.resolve("loot_editor:weapon_tier").is_some());
        assert!(pools.resolve("missing").is_none());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  My Pool "), "my_pool");
        assert_eq!(sanitize_name(""), "pool");
    }
}
