//! Pool codec: logical rows <-> physical loot-table entries
//!
//! A row tagged with an enchantment pool expands into one physical entry per
//! pool option, each carrying a single `minecraft:set_enchantments` function.
//! The returned [`EnchantmentPoolLink`]s are the only record of which entries
//! belong together; [`collapse`] uses them to rebuild the logical rows.
//!
//! Matching depends on the physical entry order staying stable between writes.
//! Entries edited or reordered by hand simply stop matching and show up as
//! plain rows again; nothing else in the table is touched.
//!
//! Everything in a document other than the first pool's `rolls` and the
//! entries themselves is carried over as an opaque JSON value.

use crate::error::Error;
use crate::links::{EnchantmentPoolLink, LinkedEnchantment};
use crate::pools::{qualify_pool_id, EnchantmentPool, EnchantmentPoolEntry, PoolResolver};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const DEFAULT_ENTRY_TYPE: &str = "minecraft:item";
pub const DEFAULT_TABLE_TYPE: &str = "minecraft:generic";
const SET_COUNT: &str = "minecraft:set_count";
const SET_ENCHANTMENTS: &str = "minecraft:set_enchantments";
const UNIFORM: &str = "minecraft:uniform";

/// A logical, user-facing loot entry
#[derive(Debug, Clone, PartialEq)]
pub struct LootEntryRow {
    pub item_id: String,
    pub weight: f64,
    pub entry_type: String,
    pub min_count: u32,
    pub max_count: u32,
    pub enchantment_pool_id: Option<String>,
}

impl LootEntryRow {
    /// Counts are clamped to `1 <= min <= max`
    pub fn new(
        item_id: impl Into<String>,
        weight: f64,
        entry_type: impl Into<String>,
        min_count: u32,
        max_count: u32,
        enchantment_pool_id: Option<String>,
    ) -> Self {
        let min_count = min_count.max(1);
        Self {
            item_id: item_id.into(),
            weight,
            entry_type: entry_type.into(),
            min_count,
            max_count: max_count.max(min_count),
            enchantment_pool_id: enchantment_pool_id.as_deref().and_then(qualify_pool_id),
        }
    }

    /// Plain `minecraft:item` row with a count of one
    pub fn item(item_id: impl Into<String>, weight: f64) -> Self {
        Self::new(item_id, weight, DEFAULT_ENTRY_TYPE, 1, 1, None)
    }

    pub fn with_counts(self, min: u32, max: u32) -> Self {
        Self::new(self.item_id, self.weight, self.entry_type, min, max, self.enchantment_pool_id)
    }

    pub fn with_pool(mut self, pool_id: impl Into<String>) -> Self {
        self.enchantment_pool_id = qualify_pool_id(&pool_id.into());
        self
    }
}

/// Inclusive item count range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl Default for CountRange {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

/// Count range from the first `minecraft:set_count` in a function list
pub fn parse_count_range(functions: Option<&Value>) -> CountRange {
    let Some(functions) = functions.and_then(Value::as_array) else {
        return CountRange::default();
    };
    for function in functions {
        if function.get("function").and_then(Value::as_str) != Some(SET_COUNT) {
            continue;
        }
        match function.get("count") {
            Some(Value::Number(n)) => {
                let value = n.as_f64().map_or(1, round_count);
                return CountRange { min: value, max: value };
            }
            Some(Value::Object(range)) => {
                let min = range.get("min").and_then(Value::as_f64);
                let max = range.get("max").and_then(Value::as_f64);
                if let (Some(min), Some(max)) = (min, max) {
                    let min = round_count(min);
                    return CountRange {
                        min,
                        max: round_count(max).max(min),
                    };
                }
            }
            _ => {}
        }
    }
    CountRange::default()
}

fn round_count(value: f64) -> u32 {
    value.round().max(1.0).min(f64::from(u32::MAX)) as u32
}

/// Physical JSON plus the links describing its pool-generated entries
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub document: Value,
    pub links: Vec<EnchantmentPoolLink>,
}

/// Build a single-pool document from `rows`, expanding pool-tagged rows
///
/// Keys of `template` other than `pools` are kept; `type` defaults to
/// `minecraft:generic` and `rolls` is taken from the template's first pool.
/// Rows whose pool does not resolve are emitted as plain entries.
pub fn expand<R: PoolResolver + ?Sized>(template: &Value, rows: &[LootEntryRow], pools: &R) -> Expansion {
    let mut entries = Vec::new();
    let mut links = Vec::new();

    for row in rows {
        let pool = row.enchantment_pool_id.as_deref().and_then(|pool_id| {
            let resolved = pools.resolve(pool_id);
            if resolved.is_none() {
                debug!("{}; emitting a plain entry", Error::PoolUnresolved(pool_id.to_string()));
            }
            resolved
        });
        let Some(pool) = pool else {
            entries.push(standard_entry(row));
            continue;
        };

        let order_index = entries.len();
        let total = pool.total_weight();
        let mut linked = Vec::with_capacity(pool.entries().len());
        for option in pool.entries() {
            let mut entry = standard_entry(row);
            let weight = (row.weight * option.weight / total).round().max(1.0) as i64;
            entry.insert("weight".to_string(), json!(weight));
            push_function(&mut entry, set_enchantments_function(option, pool.treasure_allowed()));
            entries.push(entry);
            linked.push(LinkedEnchantment {
                enchantment_id: option.enchantment_id.clone(),
                weight: option.weight,
                min_level: option.min_level,
                max_level: option.max_level,
            });
        }
        links.push(EnchantmentPoolLink {
            order_index,
            pool_id: pool.id(),
            item_id: row.item_id.clone(),
            entry_type: row.entry_type.clone(),
            weight: row.weight,
            min_count: row.min_count,
            max_count: row.max_count,
            enchantments: linked,
        });
    }

    Expansion {
        document: assemble(template, entries),
        links,
    }
}

/// Pool-unaware rebuild: every row becomes exactly one entry
pub fn rebuild(template: &Value, rows: &[LootEntryRow]) -> Value {
    let entries = rows.iter().map(standard_entry).collect();
    assemble(template, entries)
}

fn assemble(template: &Value, entries: Vec<Map<String, Value>>) -> Value {
    let mut root = match template {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if !root.get("type").is_some_and(Value::is_string) {
        root.insert("type".to_string(), json!(DEFAULT_TABLE_TYPE));
    }
    let rolls = root
        .get("pools")
        .and_then(|pools| pools.get(0))
        .and_then(|pool| pool.get("rolls"))
        .cloned()
        .unwrap_or_else(|| json!(1));

    let entries: Vec<Value> = entries.into_iter().map(Value::Object).collect();
    root.insert(
        "pools".to_string(),
        json!([{ "rolls": rolls, "entries": entries }]),
    );
    Value::Object(root)
}

fn standard_entry(row: &LootEntryRow) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("type".to_string(), json!(row.entry_type));
    entry.insert("name".to_string(), json!(row.item_id));
    entry.insert("weight".to_string(), number(row.weight));
    if (row.min_count, row.max_count) != (1, 1) {
        let count = if row.min_count == row.max_count {
            json!(row.min_count)
        } else {
            json!({ "type": UNIFORM, "min": row.min_count, "max": row.max_count })
        };
        push_function(&mut entry, json!({ "function": SET_COUNT, "count": count }));
    }
    entry
}

fn set_enchantments_function(option: &EnchantmentPoolEntry, treasure: bool) -> Value {
    let level = if option.min_level == option.max_level {
        json!(option.min_level)
    } else {
        json!({ "type": UNIFORM, "min": option.min_level, "max": option.max_level })
    };
    let mut enchantments = Map::new();
    enchantments.insert(option.enchantment_id.clone(), level);

    let mut function = Map::new();
    function.insert("function".to_string(), json!(SET_ENCHANTMENTS));
    function.insert("enchantments".to_string(), Value::Object(enchantments));
    function.insert("add".to_string(), json!(false));
    if treasure {
        function.insert("treasure".to_string(), json!(true));
    }
    Value::Object(function)
}

fn push_function(entry: &mut Map<String, Value>, function: Value) {
    match entry.get_mut("functions") {
        Some(Value::Array(functions)) => functions.push(function),
        _ => {
            entry.insert("functions".to_string(), json!([function]));
        }
    }
}

/// Whole weights are written as integers
fn number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// A physical entry with its logical reading
struct PhysicalEntry<'a> {
    row: LootEntryRow,
    raw: &'a Map<String, Value>,
}

fn physical_entries(document: &Value) -> Vec<PhysicalEntry<'_>> {
    let Some(pools) = document.get("pools").and_then(Value::as_array) else {
        return Vec::new();
    };
    pools
        .iter()
        .filter_map(|pool| pool.get("entries").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .map(|raw| {
            let entry_type = raw.get("type").and_then(Value::as_str).unwrap_or(DEFAULT_ENTRY_TYPE);
            let item_id = raw
                .get("name")
                .and_then(Value::as_str)
                .or_else(|| raw.get("id").and_then(Value::as_str))
                .unwrap_or("unknown");
            let weight = raw.get("weight").and_then(Value::as_f64).unwrap_or(1.0);
            let range = parse_count_range(raw.get("functions"));
            PhysicalEntry {
                row: LootEntryRow::new(item_id, weight, entry_type, range.min, range.max, None),
                raw,
            }
        })
        .collect()
}

/// Every physical entry as one plain row, ignoring pool links
pub fn extract_entries(document: &Value) -> Vec<LootEntryRow> {
    physical_entries(document).into_iter().map(|p| p.row).collect()
}

/// Rebuild logical rows from a document and its pool links
///
/// A link produces a row only when every one of its enchantments matches an
/// unclaimed entry; otherwise its entries stay visible as plain rows. Rows are
/// ordered by physical position, with link rows placed at their recorded
/// position and any beyond the last entry appended in position order.
pub fn collapse(document: &Value, links: &[EnchantmentPoolLink]) -> Vec<LootEntryRow> {
    let physical = physical_entries(document);
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut aggregated: BTreeMap<usize, Vec<LootEntryRow>> = BTreeMap::new();

    for link in links {
        let mut matched = Vec::with_capacity(link.enchantments.len());
        for enchantment in &link.enchantments {
            let found = physical.iter().enumerate().position(|(index, entry)| {
                !claimed.contains(&index)
                    && !matched.contains(&index)
                    && matches_link(entry, link, enchantment)
            });
            match found {
                Some(index) => matched.push(index),
                None => break,
            }
        }
        if matched.len() != link.enchantments.len() {
            debug!(
                "Pool link for {} at {} no longer matches; showing its entries individually",
                link.item_id, link.order_index
            );
            continue;
        }
        claimed.extend(matched);
        aggregated.entry(link.order_index).or_default().push(LootEntryRow::new(
            link.item_id.clone(),
            link.weight,
            link.entry_type.clone(),
            link.min_count,
            link.max_count,
            Some(link.pool_id.clone()),
        ));
    }

    let mut rows = Vec::with_capacity(physical.len());
    for (index, entry) in physical.into_iter().enumerate() {
        if let Some(pooled) = aggregated.remove(&index) {
            rows.extend(pooled);
        }
        if !claimed.contains(&index) {
            rows.push(entry.row);
        }
    }
    rows.extend(aggregated.into_values().flatten());
    rows
}

fn matches_link(entry: &PhysicalEntry<'_>, link: &EnchantmentPoolLink, enchantment: &LinkedEnchantment) -> bool {
    entry.row.item_id == link.item_id
        && entry.row.entry_type == link.entry_type
        && entry.row.min_count == link.min_count.max(1)
        && entry.row.max_count == link.max_count.max(link.min_count.max(1))
        && single_enchantment(entry.raw) == Some(level_of(enchantment))
}

/// `(id, min level, max level)` when the entry carries exactly one
/// enchantment function naming exactly one enchantment
fn single_enchantment(entry: &Map<String, Value>) -> Option<(&str, u32, u32)> {
    let functions = entry.get("functions")?.as_array()?;
    let mut enchanting = functions
        .iter()
        .filter(|f| f.get("function").and_then(Value::as_str) == Some(SET_ENCHANTMENTS));
    let function = enchanting.next()?;
    if enchanting.next().is_some() {
        return None;
    }
    let enchantments = function.get("enchantments")?.as_object()?;
    if enchantments.len() != 1 {
        return None;
    }
    let (id, level) = enchantments.iter().next()?;
    let (min, max) = match level {
        Value::Number(n) => {
            let level = u32::try_from(n.as_u64()?).ok()?;
            (level, level)
        }
        Value::Object(range) => {
            let min = range.get("min").and_then(Value::as_u64).unwrap_or(1);
            let max = range.get("max").and_then(Value::as_u64).unwrap_or(min);
            (u32::try_from(min).ok()?, u32::try_from(max).ok()?)
        }
        _ => return None,
    };
    Some((id.as_str(), min, max))
}

fn level_of(enchantment: &LinkedEnchantment) -> (&str, u32, u32) {
    (
        enchantment.enchantment_id.as_str(),
        enchantment.min_level,
        enchantment.max_level,
    )
}

/// Pools referenced by `rows` that `pools` cannot resolve
pub fn unresolved_pools<R: PoolResolver + ?Sized>(rows: &[LootEntryRow], pools: &R) -> Vec<String> {
    let mut missing: Vec<String> = rows
        .iter()
        .filter_map(|row| row.enchantment_pool_id.clone())
        .filter(|id| pools.resolve(id).is_none())
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

/// Pools referenced by `rows` that `pools` can resolve, in first-use order
pub fn resolved_pools<R: PoolResolver + ?Sized>(rows: &[LootEntryRow], pools: &R) -> Vec<EnchantmentPool> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.enchantment_pool_id.as_deref())
        .filter(|id| seen.insert(id.to_string()))
        .filter_map(|id| pools.resolve(id))
        .collect()
}
