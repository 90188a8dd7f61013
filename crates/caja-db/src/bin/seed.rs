//! # Seed Data Generator
//!
//! Populates the database with registers for development.
//!
//! ## Usage
//! ```bash
//! # Create 4 registers in the default branch
//! cargo run -p caja-db --bin seed
//!
//! # Custom amount and branch
//! cargo run -p caja-db --bin seed -- --count 8 --branch sucursal-centro
//!
//! # Specify database path
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//! ```
//!
//! Registers are named `Caja 1` .. `Caja N`. Names that already exist in
//! the branch are skipped, so re-running the seed is harmless.

use caja_core::Register;
use caja_db::{Database, DbConfig};
use chrono::Utc;
use std::env;

const DEFAULT_COUNT: usize = 4;
const DEFAULT_BRANCH: &str = "branch-dev";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = DEFAULT_COUNT;
    let mut branch_id = String::from(DEFAULT_BRANCH);
    let mut db_path = String::from("./caja_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--branch" | "-b" => {
                if i + 1 < args.len() {
                    branch_id = args[i + 1].clone();
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
                println!("Caja Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of registers to create (default: 4)");
                println!("  -b, --branch <ID>    Branch the registers belong to (default: branch-dev)");
                println!("  -d, --db <PATH>      Database file path (default: ./caja_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Caja Seed Data Generator");
    println!("========================");
    println!("Database:  {}", db_path);
    println!("Branch:    {}", branch_id);
    println!("Registers: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.registers().count_by_branch(&branch_id).await?;
    if existing > 0 {
        println!("⚠ Branch already has {} registers; existing names are skipped", existing);
    }

    let mut created = 0;
    for n in 1..=count {
        let register = Register::new(&branch_id, format!("Caja {}", n), Utc::now());

        match db.registers().insert(&register).await {
            Ok(()) => {
                println!("  + {} ({})", register.name, register.id);
                created += 1;
            }
            Err(e) if e.is_unique_violation_on("registers.name") => {
                println!("  = {} (exists)", register.name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!();
    println!("✓ Created {} registers", created);

    db.close().await;
    Ok(())
}
