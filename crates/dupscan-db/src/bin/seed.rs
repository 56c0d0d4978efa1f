//! # Seed Data Generator
//!
//! Populates the database with sample lists for development.
//!
//! ## Usage
//! ```bash
//! # 3 lists with 25 barcodes each (default)
//! cargo run -p dupscan-db --bin seed
//!
//! # Custom amounts
//! cargo run -p dupscan-db --bin seed -- --lists 5 --per-list 100
//!
//! # Specify database path
//! cargo run -p dupscan-db --bin seed -- --db ./data/dupscan.db
//! ```
//!
//! ## Generated Data
//! Each list is named after a warehouse location and filled with
//! EAN-13-shaped values `400{list:03}{index:07}`. Every tenth barcode is
//! committed twice so the duplicate path shows up in the logs.

use dupscan_core::CommitOutcome;
use dupscan_db::{Database, DbConfig};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Warehouse locations used as list names
const LOCATIONS: &[&str] = &[
    "Inbound Dock",
    "Aisle 4",
    "Returns Cage",
    "Cold Storage",
    "Mezzanine",
    "Outbound Staging",
    "Quarantine",
    "Yard",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut lists: usize = 3;
    let mut per_list: usize = 25;
    let mut db_path = String::from("./dupscan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--lists" | "-l" => {
                if i + 1 < args.len() {
                    lists = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--per-list" | "-n" => {
                if i + 1 < args.len() {
                    per_list = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("DupScan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -l, --lists <N>      Number of lists to create (default: 3)");
                println!("  -n, --per-list <N>   Barcodes per list (default: 25)");
                println!("  -d, --db <PATH>      Database file path (default: ./dupscan_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, lists, per_list, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.lists().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has lists, skipping seed");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let start = std::time::Instant::now();
    let mut inserted = 0usize;
    let mut duplicates = 0usize;

    for list_idx in 0..lists {
        let name = match LOCATIONS.get(list_idx) {
            Some(location) => location.to_string(),
            None => format!("Location {}", list_idx + 1),
        };
        let list = db.lists().create(&name).await?;

        for idx in 0..per_list {
            let value = format!("400{:03}{:07}", list_idx, idx);
            let attempts = if idx % 10 == 0 { 2 } else { 1 };

            for _ in 0..attempts {
                match db.barcodes().commit_if_absent(&list.id, &value, &cancel).await? {
                    CommitOutcome::Inserted(_) => inserted += 1,
                    CommitOutcome::AlreadyExists => duplicates += 1,
                }
            }
        }

        info!(list = %list.name, id = %list.id, "Seeded list");
    }

    info!(
        inserted,
        duplicates,
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
