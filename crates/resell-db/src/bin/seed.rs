//! # Seed Data Generator
//!
//! Populates a SQLite database with a demo shop ledger for development.
//!
//! ## Usage
//! ```bash
//! # 40 phones into the configured database (default)
//! cargo run -p resell-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p resell-db --bin seed -- --count 200 --db ./data/resell.db
//! ```
//!
//! ## Generated Ledger
//! For every phone, by index:
//! - every 2nd phone is sold for cash
//! - every 5th phone is sold on credit with a down payment, some of which
//!   get a follow-up payment
//! - every 7th sold phone is returned, and every 14th one resold
//!
//! IMEIs are `35` + a zero-padded index, so re-running against the same
//! database is refused rather than producing duplicates.

use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use resell_core::{NewPhone, PhoneStatus, ReturnInput, ReturnType, SaleInput};
use resell_db::{Database, DbConfig, LifecycleEngine, ResellConfig};

/// Models with a base purchase price in cents.
const MODELS: &[(&str, i64)] = &[
    ("iPhone 11", 18_000),
    ("iPhone 12", 24_000),
    ("iPhone 13", 31_000),
    ("iPhone 14 Pro", 52_000),
    ("Galaxy S21", 21_000),
    ("Galaxy S22 Ultra", 38_000),
    ("Galaxy A54", 14_000),
    ("Pixel 6a", 12_500),
    ("Pixel 7", 19_000),
    ("OnePlus 9", 16_000),
    ("Redmi Note 12", 9_000),
];

const STORAGE: &[&str] = &["64GB", "128GB", "256GB", "512GB"];
const COLORS: &[&str] = &["Black", "White", "Blue", "Graphite", "Green"];
const CONDITIONS: &[&str] = &["Like new", "Good", "Fair"];
const CUSTOMERS: &[&str] = &["Ayesha Khan", "Bilal Ahmed", "Sara Malik", "Usman Tariq", "Hina Raza"];
const PAYMENT_METHODS: &[&str] = &["cash", "card", "bank transfer"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ResellConfig::load_or_default(None);

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = config.database.path.clone();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Resell Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of phones to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: from config)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Resell Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path.display());
    println!("Tenant:   {}", config.tenant.id);
    println!("Phones:   {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let engine = LifecycleEngine::new(Arc::new(db), config.tenant.id.clone());

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = engine.list_phones(None).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} phones", existing);
        println!("  Skipping seed to avoid duplicate IMEIs.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating ledger...");

    let start = std::time::Instant::now();
    let mut stats = Stats::default();

    for index in 0..count {
        if let Err(e) = seed_phone(&engine, index, &mut stats).await {
            eprintln!("Failed to seed phone #{}: {}", index, e);
        }
    }

    println!();
    println!(
        "✓ {} phones, {} sales ({} on credit), {} payments, {} returns in {:?}",
        stats.phones,
        stats.sales,
        stats.credit_sales,
        stats.payments,
        stats.returns,
        start.elapsed()
    );

    let dashboard = engine.dashboard().await?;
    println!();
    println!("Dashboard");
    println!("  Phones:          {} ({} in stock, {} sold)", dashboard.total_phones, dashboard.in_stock, dashboard.sold);
    println!("  Total profit:    {}", cents(dashboard.total_profit_cents));
    println!("  Refunds:         {}", cents(dashboard.total_refunds_cents));
    println!("  Net profit:      {}", cents(dashboard.net_profit_cents));
    println!("  Today's profit:  {}", cents(dashboard.daily_profit_cents));
    println!(
        "  Turnover:        {:.1} days over {} sales",
        dashboard.inventory_turnover_days, dashboard.turnover_sample_size
    );

    let credits = engine.credit_summary().await?;
    println!("  Outstanding:     {} across {} credits", cents(credits.outstanding_cents), credits.pending_count);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

#[derive(Default)]
struct Stats {
    phones: usize,
    sales: usize,
    credit_sales: usize,
    payments: usize,
    returns: usize,
}

/// Adds phone `index` and walks it through its share of the lifecycle.
async fn seed_phone(
    engine: &LifecycleEngine<Database>,
    index: usize,
    stats: &mut Stats,
) -> Result<(), Box<dyn std::error::Error>> {
    let (model, base_price) = MODELS[index % MODELS.len()];
    let storage_step = (index % STORAGE.len()) as i64;
    let purchase_price = base_price + storage_step * 2_500;

    let phone = engine
        .add_phone(NewPhone {
            imei1: format!("35{:013}", index),
            imei2: (index % 3 == 0).then(|| format!("86{:013}", index)),
            model: model.to_string(),
            storage: Some(STORAGE[index % STORAGE.len()].to_string()),
            color: Some(COLORS[index % COLORS.len()].to_string()),
            condition: Some(CONDITIONS[index % CONDITIONS.len()].to_string()),
            unlock_status: Some(if index % 4 == 0 { "Locked" } else { "Unlocked" }.to_string()),
            battery_health: Some(80 + (index % 21) as i64),
            purchase_date: None,
            purchase_price_cents: purchase_price,
            notes: None,
        })
        .await?;
    stats.phones += 1;

    let on_credit = index % 5 == 0;
    if index % 2 != 0 && !on_credit {
        return Ok(());
    }

    // 15-35% margin
    let sale_price = purchase_price * (115 + (index % 21) as i64) / 100;
    let customer = CUSTOMERS[index % CUSTOMERS.len()];
    let outcome = engine
        .record_sale(
            &phone.id,
            SaleInput {
                sale_price_cents: sale_price,
                sale_date: None,
                customer_name: Some(customer.to_string()),
                payment_method: Some(PAYMENT_METHODS[index % PAYMENT_METHODS.len()].to_string()),
                is_credit: on_credit,
                received_amount_cents: if on_credit { sale_price * 40 / 100 } else { 0 },
                receipt_number: None,
            },
        )
        .await?;
    stats.sales += 1;

    if let Some(credit) = &outcome.credit {
        stats.credit_sales += 1;
        if index % 10 == 0 {
            let amount = credit.remaining_amount_cents / 2;
            engine
                .record_credit_payment(&credit.id, amount, None, Some("cash".to_string()))
                .await?;
            stats.payments += 1;
        }
    }

    if index % 7 == 0 {
        engine
            .record_return(
                &phone.id,
                ReturnInput {
                    return_type: if index % 3 == 0 { ReturnType::TradeIn } else { ReturnType::Refund },
                    return_price_cents: sale_price * 90 / 100,
                    new_price_cents: purchase_price * 95 / 100,
                    return_reason: Some("Customer changed mind".to_string()),
                    return_date: None,
                },
            )
            .await?;
        stats.returns += 1;

        if index % 14 == 0 {
            let resold = engine
                .record_sale(
                    &phone.id,
                    SaleInput {
                        sale_price_cents: sale_price * 95 / 100,
                        customer_name: Some(CUSTOMERS[(index + 1) % CUSTOMERS.len()].to_string()),
                        payment_method: Some("cash".to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            debug_assert_eq!(resold.phone.status, PhoneStatus::Sold);
            stats.sales += 1;
        }
    }

    Ok(())
}

fn cents(amount: i64) -> String {
    resell_core::Money::from_cents(amount).to_string()
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=resell=trace` - Show trace for resell crates only
/// - Default: INFO, DEBUG for resell crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,resell=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
