//! loot-core: Core library for discovering and editing modpack loot tables
//!
//! This library provides functionality to:
//! - Discover loot tables in datapacks, world saves, KubeJS, mod jars and the vanilla jar
//! - Reconcile copies of the same table found in different sources
//! - Save edits to read-only tables through a generated override datapack
//! - Expand enchantment-pool rows into loot entries and collapse them back
//! - Create, fork and export tables, and mirror the override datapack into worlds

pub mod archive;
pub mod codec;
pub mod datapack;
pub mod descriptor;
pub mod enchantments;
pub mod error;
pub mod files;
pub mod id;
pub mod instance;
pub mod links;
pub mod manifest;
pub mod overrides;
pub mod pools;
pub mod reconcile;
pub mod scanner;
pub mod service;
pub mod session;
pub mod settings;
pub mod tasks;

pub use archive::{ArchiveEntry, ArchiveView, DirView, ZipView};
pub use codec::{collapse, expand, extract_entries, parse_count_range, CountRange, Expansion, LootEntryRow};
pub use datapack::{ensure_pack_root, sync_world_datapacks};
pub use descriptor::{LootTableDescriptor, SourceType};
pub use enchantments::{load_enchantments, EnchantmentDescriptor};
pub use error::{Error, Result};
pub use id::LootId;
pub use links::{EnchantmentPoolLink, LinkStore, LinkedEnchantment};
pub use manifest::{ManifestTable, ScanManifest};
pub use overrides::{OverrideEntry, OverrideManifest, OverrideStore};
pub use pools::{EnchantmentPool, EnchantmentPoolEntry, PoolResolver, PoolStore};
pub use reconcile::{find_table, reconcile, visible_tables};
pub use scanner::scan_modpack;
pub use service::{SavedTable, TableService, TableTemplate};
pub use session::{SessionState, TableSession};
pub use settings::export_root;
pub use tasks::{ScanTask, Task, TaskHandle, TaskOutcome, TaskRunner};
