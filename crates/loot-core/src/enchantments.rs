//! Enchantments available to a modpack
//!
//! Read from a CraftTweaker dump (`ct_dumps/enchantment.txt`) when the pack
//! has one, otherwise the vanilla set.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

const VANILLA: &[&str] = &[
    "minecraft:aqua_affinity",
    "minecraft:bane_of_arthropods",
    "minecraft:binding_curse",
    "minecraft:blast_protection",
    "minecraft:channeling",
    "minecraft:depth_strider",
    "minecraft:efficiency",
    "minecraft:feather_falling",
    "minecraft:fire_aspect",
    "minecraft:fire_protection",
    "minecraft:flame",
    "minecraft:fortune",
    "minecraft:frost_walker",
    "minecraft:impaling",
    "minecraft:infinity",
    "minecraft:knockback",
    "minecraft:looting",
    "minecraft:loyalty",
    "minecraft:luck_of_the_sea",
    "minecraft:lure",
    "minecraft:mending",
    "minecraft:multishot",
    "minecraft:piercing",
    "minecraft:power",
    "minecraft:projectile_protection",
    "minecraft:protection",
    "minecraft:punch",
    "minecraft:quick_charge",
    "minecraft:respiration",
    "minecraft:riptide",
    "minecraft:sharpness",
    "minecraft:smite",
    "minecraft:soul_speed",
    "minecraft:swift_sneak",
    "minecraft:sweeping",
    "minecraft:thorns",
    "minecraft:unbreaking",
    "minecraft:vanishing_curse",
];

const DUMP_PREFIX: &str = "<enchantment:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnchantmentDescriptor {
    pub id: String,
    pub namespace: String,
    pub display_name: String,
}

impl EnchantmentDescriptor {
    /// Build from an id, defaulting the namespace to `minecraft`
    pub fn from_id(id: &str) -> Self {
        let normalized = id.trim().to_lowercase();
        let (namespace, name) = normalized
            .split_once(':')
            .unwrap_or(("minecraft", normalized.as_str()));
        Self {
            id: format!("{namespace}:{name}"),
            namespace: namespace.to_string(),
            display_name: prettify(name),
        }
    }
}

/// `fire_aspect` -> `Fire Aspect`
pub fn prettify(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Enchantments for a modpack, sorted case-insensitively by id
pub fn load_enchantments(modpack_root: &Path) -> Vec<EnchantmentDescriptor> {
    let dump = modpack_root.join("ct_dumps").join("enchantment.txt");
    let mut found: Vec<EnchantmentDescriptor> = match fs::read_to_string(&dump) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_prefix(DUMP_PREFIX)?.strip_suffix('>'))
            .filter(|id| !id.is_empty())
            .map(EnchantmentDescriptor::from_id)
            .collect(),
        Err(e) => {
            debug!("No enchantment dump at {}: {}", dump.display(), e);
            Vec::new()
        }
    };
    if found.is_empty() {
        found = VANILLA.iter().copied().map(EnchantmentDescriptor::from_id).collect();
    }
    found.sort_by_key(|d| d.id.to_lowercase());
    found.dedup_by(|a, b| a.id == b.id);
    found
}
