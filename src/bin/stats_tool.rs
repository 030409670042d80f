use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use entity_stats::{DatabaseFixture, PersistenceConfig, PersistenceManager, StatisticsUpdate};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "stats-tool")]
#[command(about = "Inspect soft-delete tables, secondary tables and entity statistics")]
struct Cli {
    /// JSON fixture describing tables, metamodel and statistics
    #[arg(long)]
    fixture: PathBuf,

    /// JSON config file; replaces the fixture's own config section
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write statistics changes back into the fixture
    #[arg(long)]
    write: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    SoftDeleteTables,
    SecondaryTables,
    IsSoftDelete {
        table: String,
    },
    IsSecondary {
        table: String,
    },
    Stats,
    Decide {
        entity: String,
    },
    Enter {
        name: String,
        #[arg(long)]
        instance_count: Option<i64>,
        #[arg(long)]
        fetch_ui: Option<i32>,
        #[arg(long)]
        max_fetch_ui: Option<i32>,
        #[arg(long)]
        lazy_threshold: Option<i32>,
        #[arg(long)]
        lookup_threshold: Option<i32>,
    },
    Refresh {
        entity: String,
    },
    Delete {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut fixture = DatabaseFixture::load(&cli.fixture)
        .with_context(|| format!("Failed to load fixture '{}'", cli.fixture.display()))?;
    let config = match &cli.config {
        Some(path) => PersistenceConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => fixture.config.clone(),
    };
    let (db, metamodel) = fixture.build()?;
    let manager = PersistenceManager::in_memory(db.clone(), Arc::new(metamodel), config)?;

    let mutated = run(&manager, cli.command).await?;

    if mutated && cli.write {
        fixture.capture_statistics(&db)?;
        fixture
            .save(&cli.fixture)
            .with_context(|| format!("Failed to write fixture '{}'", cli.fixture.display()))?;
    }
    Ok(())
}

/// Runs one command; returns whether it changed the statistics table.
async fn run(manager: &PersistenceManager, command: Command) -> Result<bool> {
    match command {
        Command::SoftDeleteTables => {
            for table in manager.get_soft_delete_tables().await? {
                println!("{}", table);
            }
        }
        Command::SecondaryTables => {
            let tables = manager.metamodel_scanner().secondary_tables().await?;
            let mut list: Vec<&String> = tables.iter().collect();
            list.sort();
            for table in list {
                println!("{}", table);
            }
        }
        Command::IsSoftDelete { table } => {
            println!("{}", manager.is_soft_delete_for(&table).await?);
        }
        Command::IsSecondary { table } => {
            println!("{}", manager.is_secondary_table(&table).await?);
        }
        Command::Stats => {
            for (name, es) in manager.get_entity_statistics().await? {
                println!(
                    "{}\tinstances={}\tfetch_ui={}\tmax_fetch_ui={}\tlazy={}\tlookup={}",
                    name,
                    show(es.instance_count),
                    show(es.fetch_ui),
                    show(es.max_fetch_ui),
                    show(es.lazy_collection_threshold),
                    show(es.lookup_screen_threshold),
                );
            }
        }
        Command::Decide { entity } => {
            println!("lazy_collection={}", manager.use_lazy_collection(&entity).await?);
            println!("lookup_screen={}", manager.use_lookup_screen(&entity).await?);
            println!("fetch_ui={}", manager.get_fetch_ui(&entity).await?);
            println!("max_fetch_ui={}", manager.get_max_fetch_ui(&entity).await?);
        }
        Command::Enter {
            name,
            instance_count,
            fetch_ui,
            max_fetch_ui,
            lazy_threshold,
            lookup_threshold,
        } => {
            let update = StatisticsUpdate {
                instance_count,
                fetch_ui,
                max_fetch_ui,
                lazy_collection_threshold: lazy_threshold,
                lookup_screen_threshold: lookup_threshold,
            };
            let entry = manager.enter_statistics(&name, update).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
            return Ok(true);
        }
        Command::Refresh { entity } => {
            let entry = manager.refresh_statistics_for_entity(&entity).await?;
            println!("{}\tinstances={}", entry.name, show(entry.instance_count));
            return Ok(true);
        }
        Command::Delete { name } => {
            manager.delete_statistics(&name).await?;
            return Ok(true);
        }
    }
    Ok(false)
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
