//! Pool link records
//!
//! A link remembers which physical entries of a table were generated from one
//! pool-tagged row. One file per table at
//! `kubejs/data/loot_editor/pool_links/<namespace>/<table path>.json`.

use crate::error::Result;
use crate::files::{join_slashed, read_json, write_json};
use crate::id::LootId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One enchantment option as it was expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedEnchantment {
    #[serde(rename = "id")]
    pub enchantment_id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_one")]
    pub min_level: u32,
    #[serde(default = "default_one")]
    pub max_level: u32,
}

/// A pool-tagged row and the enchantments it expanded into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnchantmentPoolLink {
    /// Physical position of the first entry generated for this row
    #[serde(rename = "order", default)]
    pub order_index: usize,
    #[serde(rename = "pool")]
    pub pool_id: String,
    #[serde(rename = "item")]
    pub item_id: String,
    #[serde(default = "default_entry_type")]
    pub entry_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_one")]
    pub min_count: u32,
    #[serde(default = "default_one")]
    pub max_count: u32,
    #[serde(default)]
    pub enchantments: Vec<LinkedEnchantment>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_one() -> u32 {
    1
}

fn default_entry_type() -> String {
    "minecraft:item".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkFile {
    table: String,
    #[serde(default)]
    links: Vec<EnchantmentPoolLink>,
}

/// Reads and writes link files for one modpack
#[derive(Debug, Clone)]
pub struct LinkStore {
    modpack_root: PathBuf,
}

impl LinkStore {
    pub fn new(modpack_root: impl Into<PathBuf>) -> Self {
        Self {
            modpack_root: modpack_root.into(),
        }
    }

    pub fn link_file(&self, table: &LootId) -> PathBuf {
        let dir = self
            .modpack_root
            .join("kubejs")
            .join("data")
            .join("loot_editor")
            .join("pool_links")
            .join(table.namespace());
        join_slashed(&dir, &format!("{}.json", table.path()))
    }

    /// Links for `table`; missing or unreadable files give an empty list
    pub fn load(&self, table: &LootId) -> Vec<EnchantmentPoolLink> {
        let file = self.link_file(table);
        if !file.is_file() {
            return Vec::new();
        }
        match read_json::<LinkFile, _>(&file) {
            Ok(parsed) => parsed.links,
            Err(e) => {
                warn!("Ignoring unreadable pool links {}: {}", file.display(), e);
                Vec::new()
            }
        }
    }

    /// Write the links, or delete the file when there are none
    pub fn save(&self, table: &LootId, links: &[EnchantmentPoolLink]) -> Result<()> {
        let file = self.link_file(table);
        if links.is_empty() {
            if file.exists() {
                fs::remove_file(&file)?;
                debug!("Removed stale pool links {}", file.display());
            }
            return Ok(());
        }
        write_json(
            &file,
            &LinkFile {
                table: table.to_string(),
                links: links.to_vec(),
            },
        )
    }
}
