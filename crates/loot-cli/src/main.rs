//! Loot Table Editor CLI
//!
//! Command-line tool for scanning, inspecting and overriding modpack loot tables.

use clap::{Parser, Subcommand};
use loot_core::tasks::EnchantmentTask;
use loot_core::{
    export_root, find_table, load_enchantments, LootTableDescriptor, OverrideStore, ScanManifest,
    ScanTask, TableService, TableSession, TableTemplate, TaskRunner,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loot-cli")]
#[command(about = "Modpack Loot Table Editor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a modpack and summarize the visible loot tables
    Scan {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Write a JSON scan manifest to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List every visible loot table
    List {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Show source and location for each table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show a loot table's document or its logical rows
    Show {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Table id (namespace:path)
        #[arg(short, long)]
        table: String,

        /// Print collapsed rows instead of the raw document
        #[arg(long)]
        rows: bool,
    },

    /// Create a new table in the editor datapack
    Create {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Table namespace
        #[arg(short, long)]
        namespace: String,

        /// Table path below loot_table/
        #[arg(short, long)]
        path: String,

        /// Starting template (chest, entity or block)
        #[arg(long, default_value = "chest")]
        template: TableTemplate,
    },

    /// Copy a table into kubejs/data for editing
    Fork {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Table id (namespace:path)
        #[arg(short, long)]
        table: String,
    },

    /// Write a table into the editor datapack unchanged
    Export {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,

        /// Table id (namespace:path)
        #[arg(short, long)]
        table: String,
    },

    /// List overrides recorded in the editor datapack
    Overrides {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,
    },

    /// Mirror the editor datapack into every world save
    Sync {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,
    },

    /// List stored enchantment pools
    Pools {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,
    },

    /// List known enchantments
    Enchantments {
        /// Modpack root directory
        #[arg(short, long)]
        root: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> loot_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { root, output } => cmd_scan(&root, output.as_deref()),
        Commands::List { root, verbose } => cmd_list(&root, verbose),
        Commands::Show { root, table, rows } => cmd_show(&root, &table, rows),
        Commands::Create {
            root,
            namespace,
            path,
            template,
        } => cmd_create(&root, &namespace, &path, template),
        Commands::Fork { root, table } => cmd_fork(&root, &table),
        Commands::Export { root, table } => cmd_export(&root, &table),
        Commands::Overrides { root } => cmd_overrides(&root),
        Commands::Sync { root } => cmd_sync(&root),
        Commands::Pools { root } => cmd_pools(&root),
        Commands::Enchantments { root } => cmd_enchantments(&root),
    }
}

fn cmd_scan(root: &Path, output: Option<&Path>) -> loot_core::Result<()> {
    let runner = TaskRunner::new()?;
    let scan = runner.submit(ScanTask::new(root));
    let registry = runner.submit(EnchantmentTask {
        modpack_root: root.to_path_buf(),
    });

    let scanned = scan.wait()?;
    let tables = scanned.payload;

    println!("Scanned {} in {} ms", root.display(), scanned.duration.as_millis());
    println!();
    for (source_type, count) in ScanManifest::counts(&tables) {
        println!("  {:<10} {}", source_type.label(), count);
    }
    println!();
    println!("Found {} loot tables", tables.len());

    match registry.wait() {
        Ok(enchantments) => println!("Known enchantments: {}", enchantments.payload.len()),
        Err(e) => eprintln!("Enchantment registry unavailable: {}", e),
    }

    if let Some(output) = output {
        ScanManifest::from_descriptors(root, &tables).write(output)?;
        println!("Manifest written to {}", output.display());
    }

    Ok(())
}

fn cmd_list(root: &Path, verbose: bool) -> loot_core::Result<()> {
    let tables = loot_core::visible_tables(root)?;

    println!("Loot tables ({}):", tables.len());
    println!();

    for table in &tables {
        if verbose {
            let lock = if table.editable { "" } else { " [read-only]" };
            println!("{}{}", table.qualified_name(), lock);
            println!("  {} ({})", table.source_label, table.source_type);
            match &table.archive_member {
                Some(member) => println!("  {} -> {}", table.container.display(), member),
                None => println!("  {}", table.container.display()),
            }
        } else {
            println!("  {:<10} {}", table.source_type.label(), table.qualified_name());
        }
    }

    Ok(())
}

fn cmd_show(root: &Path, table: &str, rows: bool) -> loot_core::Result<()> {
    let descriptor = find_table(root, table)?;
    print_descriptor(&descriptor);
    println!();

    let service = TableService::new(root);
    if !rows {
        let document = service.load(&descriptor)?;
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let session = TableSession::open(&service, descriptor)?;
    println!("ITEM\tWEIGHT\tCOUNT\tPOOL");
    println!("{}", "-".repeat(48));
    for row in session.rows() {
        println!(
            "{}\t{}\t{}-{}\t{}",
            row.item_id,
            row.weight,
            row.min_count,
            row.max_count,
            row.enchantment_pool_id.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn cmd_create(root: &Path, namespace: &str, path: &str, template: TableTemplate) -> loot_core::Result<()> {
    let service = TableService::new(root);
    let created = service.create_table(namespace, path, template)?;
    println!("Created {} ({})", created.qualified_name(), template);
    println!("  {}", created.container.display());
    Ok(())
}

fn cmd_fork(root: &Path, table: &str) -> loot_core::Result<()> {
    let descriptor = find_table(root, table)?;
    let forked = TableService::new(root).fork_to_kubejs(&descriptor)?;
    println!("Forked {} to {}", forked.qualified_name(), forked.container.display());
    Ok(())
}

fn cmd_export(root: &Path, table: &str) -> loot_core::Result<()> {
    let descriptor = find_table(root, table)?;
    let exported = TableService::new(root).export_to_datapack(&descriptor)?;
    println!("Exported {} to {}", exported.qualified_name(), exported.container.display());
    Ok(())
}

fn cmd_overrides(root: &Path) -> loot_core::Result<()> {
    let pack_root = export_root(root);
    let manifest = OverrideStore::new(&pack_root).try_load()?;

    println!("Export root: {}", pack_root.display());
    println!("Overrides ({}):", manifest.len());
    for entry in &manifest.overrides {
        println!("  {} -> {}", entry.target, entry.replacement);
    }

    Ok(())
}

fn cmd_sync(root: &Path) -> loot_core::Result<()> {
    let worlds = TableService::new(root).sync_world_datapacks()?;

    if worlds.is_empty() {
        println!("No worlds to update");
    } else {
        println!("Updated {} world(s):", worlds.len());
        for world in &worlds {
            println!("  {}", world.display());
        }
    }

    Ok(())
}

fn cmd_pools(root: &Path) -> loot_core::Result<()> {
    let pools = TableService::new(root).pool_store().list();

    println!("Enchantment pools ({}):", pools.len());
    for pool in &pools {
        let treasure = if pool.treasure_allowed() { " [treasure]" } else { "" };
        println!("  {} \"{}\"{}", pool.id(), pool.display_name(), treasure);
        for option in pool.entries() {
            println!(
                "    {} w={} lvl {}-{}",
                option.enchantment_id, option.weight, option.min_level, option.max_level
            );
        }
    }

    Ok(())
}

fn cmd_enchantments(root: &Path) -> loot_core::Result<()> {
    let enchantments = load_enchantments(root);

    println!("Enchantments ({}):", enchantments.len());
    for enchantment in &enchantments {
        println!("  {:<40} {}", enchantment.id, enchantment.display_name);
    }

    Ok(())
}

fn print_descriptor(descriptor: &LootTableDescriptor) {
    println!("{}", descriptor.qualified_name());
    println!("  Source:   {} ({})", descriptor.source_label, descriptor.source_type);
    println!("  Location: {}", descriptor.container.display());
    if let Some(member) = &descriptor.archive_member {
        println!("  Entry:    {}", member);
    }
    println!("  Editable: {}", descriptor.editable);
}
