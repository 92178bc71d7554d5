//! Pantry CLI - command-line interface for the inventory tracker.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pantry_core::{CollectionPatch, ItemFilter, ItemPatch, PantryConfig};
use pantry_server::{
    AddCollectionParams, AddItemParams, AddLineParams, ListItemsParams, PantryServer,
    UpdateItemParams,
};

/// Pantry - household inventory and grocery-purchase tracker
#[derive(Parser)]
#[command(name = "pantry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (default: ~/.pantry/db.sqlite)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage inventory items
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Manage shopping trips and their purchase lines
    Trip {
        #[command(subcommand)]
        action: TripAction,
    },
}

#[derive(Subcommand)]
enum ItemAction {
    /// Add an inventory item
    Add {
        /// Item name (unique, case-insensitive)
        name: String,

        /// Unit the stock is tracked in (e.g. kg, l, pcs)
        #[arg(short, long)]
        unit: String,

        /// Category id
        #[arg(short, long)]
        category: Option<i64>,

        /// Initial stock
        #[arg(short, long, default_value = "0")]
        quantity: f64,

        /// Reference price per unit
        #[arg(short, long)]
        price: Option<f64>,
    },

    /// List inventory items
    List {
        /// Name substring filter
        #[arg(short, long)]
        name: Option<String>,

        /// Category id filter
        #[arg(short, long)]
        category: Option<i64>,

        /// Only items marked empty
        #[arg(long)]
        empty: bool,
    },

    /// Update item fields
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        category: Option<i64>,

        #[arg(long)]
        quantity: Option<f64>,

        #[arg(long)]
        unit: Option<String>,

        /// Reference price per unit
        #[arg(long)]
        price: Option<f64>,
    },

    /// Zero the stock and mark the item empty
    MarkEmpty { id: i64 },

    /// Delete an item (refused while purchase history references it)
    Delete { id: i64 },

    /// Show an item's price history, newest first
    History { id: i64 },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// List all categories
    List,

    /// Add a category
    Add { name: String },

    /// Rename a category
    Rename { id: i64, name: String },

    /// Delete a category (refused while items reference it)
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum TripAction {
    /// Record a new shopping trip
    Add {
        name: String,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List trips, newest first
    List,

    /// Show a trip and its lines
    Show { id: i64 },

    /// Rename a trip or edit its notes
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a trip and its lines
    Delete { id: i64 },

    /// Record a purchase line: updates stock, price history, and the total
    AddLine {
        /// Trip id
        trip: i64,

        /// Item id
        item: i64,

        /// Quantity purchased, in --unit
        #[arg(short, long)]
        quantity: f64,

        /// Total price paid for the line
        #[arg(short, long)]
        price: f64,

        /// Unit the purchase was made in (default: the item's own unit)
        #[arg(short, long)]
        unit: Option<String>,
    },
}

/// Resolve the effective configuration: file if given, defaults otherwise,
/// with an explicit --database overriding either.
fn load_config(
    config_path: Option<PathBuf>,
    database: Option<PathBuf>,
) -> Result<PantryConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => PantryConfig::load(path)?,
        None => PantryConfig::default(),
    };

    if let Some(path) = database {
        config.database.path = path;
    }

    Ok(config)
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(cli.config, cli.database)?;

    match cli.command {
        Commands::Init => {
            let _server = PantryServer::open_with_config(&config)?;
            println!("Initialized database at: {}", config.database.path.display());
        }
        Commands::Item { action } => {
            let server = PantryServer::open_with_config(&config)?;
            run_item(&server, action).await?;
        }
        Commands::Category { action } => {
            let server = PantryServer::open_with_config(&config)?;
            run_category(&server, action).await?;
        }
        Commands::Trip { action } => {
            let server = PantryServer::open_with_config(&config)?;
            run_trip(&server, action).await?;
        }
    }

    Ok(())
}

async fn run_item(
    server: &PantryServer,
    action: ItemAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ItemAction::Add {
            name,
            unit,
            category,
            quantity,
            price,
        } => {
            let id = server
                .add_item(AddItemParams {
                    name,
                    unit,
                    category_id: category,
                    quantity,
                    last_price: price,
                })
                .await?;
            println!("Added item {}", id);
        }
        ItemAction::List {
            name,
            category,
            empty,
        } => {
            let items = server
                .list_items(ListItemsParams {
                    filter: ItemFilter {
                        name,
                        category_id: category,
                        is_empty: empty.then_some(true),
                    },
                })
                .await?;

            for item in items {
                let category = item.category_name.as_deref().unwrap_or("-");
                let flag = if item.is_empty { " [empty]" } else { "" };
                println!(
                    "{:>4}  {:<30} {:>10.2} {:<6} {:<16}{}",
                    item.id, item.name, item.quantity, item.unit, category, flag
                );
            }
        }
        ItemAction::Update {
            id,
            name,
            category,
            quantity,
            unit,
            price,
        } => {
            let changed = server
                .update_item(UpdateItemParams {
                    id,
                    patch: ItemPatch {
                        name,
                        category_id: category,
                        quantity,
                        unit,
                        last_price: price,
                        is_empty: None,
                    },
                })
                .await?;
            println!("{}", if changed { "Updated" } else { "No change" });
        }
        ItemAction::MarkEmpty { id } => {
            let changed = server.mark_item_empty(id).await?;
            println!("{}", if changed { "Marked empty" } else { "No such item" });
        }
        ItemAction::Delete { id } => {
            let changed = server.delete_item(id).await?;
            println!("{}", if changed { "Deleted" } else { "No such item" });
        }
        ItemAction::History { id } => {
            let history = server.item_price_history(id).await?;
            if history.is_empty() {
                println!("No price history");
                return Ok(());
            }

            for entry in history {
                let unit = entry.unit.as_deref().unwrap_or("-");
                let trip = entry.collection_name.as_deref().unwrap_or("-");
                println!(
                    "{:<24} {:>10.2} x {:<6} = {:>10.2}  ({:.2}/{})  {}",
                    format_millis(entry.recorded_at),
                    entry.quantity,
                    unit,
                    entry.price,
                    entry.unit_price,
                    unit,
                    trip
                );
            }
        }
    }

    Ok(())
}

async fn run_category(
    server: &PantryServer,
    action: CategoryAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CategoryAction::List => {
            for cat in server.list_categories().await? {
                println!("{:>4}  {:<24} {} item(s)", cat.id, cat.name, cat.item_count);
            }
        }
        CategoryAction::Add { name } => {
            let id = server.add_category(&name).await?;
            println!("Added category {}", id);
        }
        CategoryAction::Rename { id, name } => {
            let changed = server.update_category(id, &name).await?;
            println!("{}", if changed { "Renamed" } else { "No such category" });
        }
        CategoryAction::Delete { id } => {
            if server.delete_category(id).await? {
                println!("Deleted");
            } else {
                eprintln!("Category is still in use (or does not exist)");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_trip(
    server: &PantryServer,
    action: TripAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TripAction::Add { name, notes } => {
            let id = server
                .add_collection(AddCollectionParams {
                    name,
                    purchase_date: None,
                    notes,
                })
                .await?;
            println!("Added trip {}", id);
        }
        TripAction::List => {
            for trip in server.list_collections().await? {
                println!(
                    "{:>4}  {:<24} {:<24} {:>3} line(s) {:>12.2}",
                    trip.id,
                    format_millis(trip.purchase_date),
                    trip.name,
                    trip.item_count,
                    trip.total_amount
                );
            }
        }
        TripAction::Show { id } => {
            let Some(trip) = server.get_collection(id).await? else {
                eprintln!("No such trip: {}", id);
                std::process::exit(1);
            };

            println!("{} ({})", trip.name, format_millis(trip.purchase_date));
            if let Some(notes) = &trip.notes {
                println!("  {}", notes);
            }
            for line in server.list_collection_items(id).await? {
                let unit = line.unit.as_deref().unwrap_or("-");
                println!(
                    "  {:<30} {:>10.2} {:<6} {:>10.2}",
                    line.item_name, line.quantity, unit, line.price
                );
            }
            println!("  Total: {:.2}", trip.total_amount);
        }
        TripAction::Update { id, name, notes } => {
            let changed = server
                .update_collection(
                    id,
                    CollectionPatch {
                        name,
                        notes,
                        ..Default::default()
                    },
                )
                .await?;
            println!("{}", if changed { "Updated" } else { "No change" });
        }
        TripAction::Delete { id } => {
            let changed = server.delete_collection(id).await?;
            println!("{}", if changed { "Deleted" } else { "No such trip" });
        }
        TripAction::AddLine {
            trip,
            item,
            quantity,
            price,
            unit,
        } => {
            let line_id = server
                .add_collection_item(AddLineParams {
                    collection_id: trip,
                    item_id: item,
                    quantity,
                    price,
                    unit,
                    standard_unit: None,
                    standard_unit_price: None,
                })
                .await?;
            println!("Recorded line {}", line_id);
        }
    }

    Ok(())
}

/// Render Unix millis for display; seconds resolution is enough here.
fn format_millis(millis: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => millis.to_string(),
    }
}
