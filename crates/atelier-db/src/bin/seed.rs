//! # Seed Data Generator
//!
//! Populates the database with a small garment catalog and customers for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed ./atelier_dev.db
//! cargo run -p atelier-db --bin seed
//!
//! # Specify database path
//! cargo run -p atelier-db --bin seed -- --db ./data/atelier.db
//! ```
//!
//! ## Generated Data
//! - Categories: bodysuits, rompers, sets, knitwear
//! - Sizes from newborn to 24 months, colors with hex codes
//! - One variant per garment × size × color, code `{GARMENT}-{size}-{color}`
//! - A handful of customers

use std::env;

use atelier_core::DocumentType;
use atelier_db::repository::catalog::new_garment;
use atelier_db::repository::customer::new_customer;
use atelier_db::{Database, DbConfig};

/// (category, [(code, name, cost, price)])
const GARMENTS: &[(&str, &[(&str, &str, i64, i64)])] = &[
    (
        "Bodysuits",
        &[
            ("BDY-SL", "Short sleeve bodysuit", 3_500, 8_900),
            ("BDY-LL", "Long sleeve bodysuit", 4_200, 10_500),
            ("BDY-RIB", "Ribbed bodysuit", 4_800, 11_900),
        ],
    ),
    (
        "Rompers",
        &[
            ("RMP-PLUSH", "Plush romper", 9_000, 21_500),
            ("RMP-COT", "Cotton romper", 7_200, 17_900),
        ],
    ),
    (
        "Sets",
        &[
            ("SET-NB", "Newborn set", 12_000, 28_900),
            ("SET-3P", "Three piece set", 15_500, 36_000),
        ],
    ),
    (
        "Knitwear",
        &[
            ("KNT-CARD", "Knitted cardigan", 11_000, 25_500),
            ("KNT-HAT", "Knitted hat", 2_500, 6_900),
        ],
    ),
];

const SIZES: &[&str] = &["RN", "0-3m", "3-6m", "6-9m", "9-12m", "12-18m", "18-24m"];

const COLORS: &[(&str, &str)] = &[
    ("White", "#FFFFFF"),
    ("Pink", "#F4C2C2"),
    ("Sky blue", "#87CEEB"),
    ("Grey", "#9E9E9E"),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Ana", "Paz", "30111222"),
    ("Lucia", "Ferreyra", "28444555"),
    ("Martin", "Sosa", "33777888"),
    ("Julieta", "Romero", "35999000"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./atelier_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atelier Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./atelier_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Atelier Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count_garments().await?;
    if existing > 0 {
        println!("⚠ Database already has {} garments", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let catalog = db.catalog();
    let start = std::time::Instant::now();

    let mut sizes = Vec::with_capacity(SIZES.len());
    for (order, name) in SIZES.iter().enumerate() {
        sizes.push(catalog.insert_size(name, order as i64).await?);
    }

    let mut colors = Vec::with_capacity(COLORS.len());
    for (name, hex) in COLORS {
        colors.push(catalog.insert_color(name, Some(hex)).await?);
    }

    let mut garments = 0;
    let mut variants = 0;

    for (category_name, items) in GARMENTS {
        let category = catalog.insert_category(category_name, None).await?;

        for (idx, (code, name, cost, price)) in items.iter().enumerate() {
            let garment = catalog
                .insert_garment(&new_garment(*code, *name, category.id.clone(), *cost, *price))
                .await?;
            garments += 1;

            for (size_idx, size) in sizes.iter().enumerate() {
                for (color_idx, color) in colors.iter().enumerate() {
                    let stock = ((idx * 7 + size_idx * 3 + color_idx * 5) % 13) as i64;

                    if let Err(e) = catalog.insert_variant(&garment.id, &size.id, &color.id, stock).await {
                        eprintln!("Failed to insert variant of {}: {}", garment.code, e);
                        continue;
                    }
                    variants += 1;
                }
            }
        }
    }

    for (first, last, dni) in CUSTOMERS {
        db.customers()
            .insert(&new_customer(*first, *last, DocumentType::Dni, Some(dni.to_string())))
            .await?;
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} garments, {} variants in {:?}", garments, variants, elapsed);
    println!("✓ Generated {} customers", CUSTOMERS.len());

    let low = catalog.low_stock(atelier_db::DEFAULT_LOW_STOCK_THRESHOLD).await?;
    println!("  Low stock variants: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
