//! `lodgr` command-line driver over a local data directory.
//!
//! ```sh
//! lodgr house create -i house.json
//! lodgr book 01J0... 2024-06-10 2024-06-15
//! lodgr house list --city Lisbon --start-date 2024-06-01 --end-date 2024-06-30
//! lodgr discounted-soon
//! ```

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use ulid::Ulid;

use lodgr::cache::MemoryFastStore;
use lodgr::compactor::compact_if_due;
use lodgr::config::Config;
use lodgr::engine::{Engine, EngineError};
use lodgr::gateway::LogGateway;
use lodgr::model::{DateRange, HouseFilter, NewHouse, RentalUpdate};
use lodgr::status;

#[derive(Parser)]
#[command(name = "lodgr", version, about = "House availability and booking store")]
struct Cli {
    /// Data directory (overrides LODGR_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage listed houses
    #[command(subcommand)]
    House(HouseCommand),
    /// Book a date range on a house
    Book {
        house_id: Ulid,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Manage rentals of a house
    #[command(subcommand)]
    Rental(RentalCommand),
    /// Houses with a promoted period starting in the next three months
    DiscountedSoon,
    /// Rewrite the log now, regardless of threshold
    Compact,
}

#[derive(Subcommand)]
enum HouseCommand {
    /// Create from JSON (stdin if no file)
    Create {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Replace a house from JSON (stdin if no file)
    Update {
        id: Ulid,
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    Get {
        id: Ulid,
    },
    Delete {
        id: Ulid,
    },
    /// List by owner, by city, or by city and period start
    List {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
    },
}

#[derive(Subcommand)]
enum RentalCommand {
    Get {
        house_id: Ulid,
        rental_id: Ulid,
    },
    /// Overwrite dates and price from JSON (stdin if no file)
    Update {
        house_id: Ulid,
        rental_id: Ulid,
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    Delete {
        house_id: Ulid,
        rental_id: Ulid,
    },
    List {
        house_id: Ulid,
    },
}

fn read_json<T: DeserializeOwned>(path: Option<&PathBuf>) -> Result<T> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("Invalid JSON input")
}

async fn run(engine: &Engine, gateway: &LogGateway, command: Commands) -> Result<Value> {
    let value = match command {
        Commands::House(cmd) => match cmd {
            HouseCommand::Create { input } => {
                let house: NewHouse = read_json(input.as_ref())?;
                let stored = engine.create_house(house).await?;
                json!({
                    "status": status::CREATED,
                    "location": status::location_for_house(stored.id),
                    "house": stored,
                })
            }
            HouseCommand::Update { id, input } => {
                let house: NewHouse = read_json(input.as_ref())?;
                serde_json::to_value(engine.update_house(id, house).await?)?
            }
            HouseCommand::Get { id } => serde_json::to_value(engine.get_house(id).await?)?,
            HouseCommand::Delete { id } => {
                engine.delete_house(id).await?;
                json!({ "deleted": id })
            }
            HouseCommand::List {
                user_id,
                city,
                start_date,
                end_date,
            } => {
                let filter = HouseFilter::from_params(
                    user_id.as_deref(),
                    city.as_deref(),
                    start_date.as_deref(),
                    end_date.as_deref(),
                )?;
                serde_json::to_value(engine.find_houses(&filter).await?)?
            }
        },
        Commands::Book {
            house_id,
            start,
            end,
        } => {
            let rental = engine.book(house_id, DateRange::new(start, end)).await?;
            json!({
                "status": status::CREATED,
                "location": status::location_for_rental(house_id, rental.id),
                "rental": rental,
            })
        }
        Commands::Rental(cmd) => match cmd {
            RentalCommand::Get {
                house_id,
                rental_id,
            } => serde_json::to_value(engine.get_rental(house_id, rental_id).await?)?,
            RentalCommand::Update {
                house_id,
                rental_id,
                input,
            } => {
                let update: RentalUpdate = read_json(input.as_ref())?;
                serde_json::to_value(engine.update_rental(house_id, rental_id, update).await?)?
            }
            RentalCommand::Delete {
                house_id,
                rental_id,
            } => {
                engine.delete_rental(house_id, rental_id).await?;
                json!({ "deleted": rental_id })
            }
            RentalCommand::List { house_id } => {
                serde_json::to_value(engine.list_rentals(house_id).await?)?
            }
        },
        Commands::DiscountedSoon => serde_json::to_value(engine.discounted_soon().await?)?,
        Commands::Compact => {
            gateway.compact().await?;
            json!({ "compacted": true })
        }
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    lodgr::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
    let gateway = Arc::new(
        LogGateway::open(&config.wal_path())
            .with_context(|| format!("Failed to open {}", config.wal_path().display()))?,
    );
    let engine = Engine::new(gateway.clone(), Arc::new(MemoryFastStore::new()));

    let result = run(&engine, &gateway, cli.command).await;
    compact_if_due(&gateway, config.compact_threshold).await;

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<EngineError>() {
                Some(err) => eprintln!("error ({}): {err}", status::status_for(err)),
                None => eprintln!("error: {e:#}"),
            }
            std::process::exit(1);
        }
    }
}
