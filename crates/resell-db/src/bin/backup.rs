//! # Backup Tool
//!
//! Exports the configured tenant's ledger to a JSON file, or restores one.
//!
//! ## Usage
//! ```bash
//! cargo run -p resell-db --bin backup -- export ./shop-backup.json
//! cargo run -p resell-db --bin backup -- import ./shop-backup.json
//! cargo run -p resell-db --bin backup -- list
//!
//! # Explicit config file
//! cargo run -p resell-db --bin backup -- --config ./resell.toml export out.json
//! ```
//!
//! Store, tenant and backup directory come from [`ResellConfig`]. Imports
//! write a safety backup of the replaced data into the backup directory.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use resell_db::{
    BackupArchive, BackupCodec, Database, DbConfig, DirectoryArchive, LifecycleEngine,
    MemoryStore, ResellConfig, RestoreSummary, Store, StoreBackend,
};

#[derive(Parser)]
#[command(name = "backup", about = "Export or restore the shop ledger", version)]
struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        help = "Config file; defaults to the platform config directory"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the ledger to FILE
    Export { file: PathBuf },
    /// Replace the ledger with the backup in FILE
    Import { file: PathBuf },
    /// List backups in the backup directory
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let config = match ResellConfig::load(cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match config.database.backend {
        StoreBackend::Sqlite => match Database::new(DbConfig::from(&config)).await {
            Ok(db) => run(db, &config, cli.command).await,
            Err(e) => Err(e.into()),
        },
        StoreBackend::Memory => run(MemoryStore::new(), &config, cli.command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Backup command failed");
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run<S: Store>(
    store: S,
    config: &ResellConfig,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = LifecycleEngine::new(Arc::new(store), config.tenant.id.clone());
    let archive = DirectoryArchive::new(&config.backup.dir);
    let codec = BackupCodec::new(engine, archive).safety_backups(config.backup.safety_backups);

    match command {
        Command::Export { file: path } => {
            let json = codec.export_json().await?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, json).await?;
            println!("✓ Exported ledger to {}", path.display());
        }
        Command::Import { file: path } => {
            let json = tokio::fs::read_to_string(&path).await?;
            let summary = codec.import_json(&json).await?;
            print_summary(&summary);
        }
        Command::List => {
            let names = codec.archive().list().await?;
            println!("Backups in {}:", config.backup.dir.display());
            if names.is_empty() {
                println!("  (none)");
            }
            for name in names {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RestoreSummary) {
    println!("✓ Restore finished");
    let rows = [
        ("Phones", summary.phones),
        ("Sales", summary.sales),
        ("Returns", summary.returns),
        ("Credits", summary.credits),
    ];
    for (label, count) in rows {
        println!("  {:<8} {:>5} imported, {} skipped", label, count.imported, count.skipped);
    }
    if summary.credit_payments_discarded > 0 {
        println!(
            "  ⚠ {} credit payment(s) were not restored",
            summary.credit_payments_discarded
        );
    }
    for skipped in &summary.skipped {
        println!("  ⚠ {} {}: {}", skipped.entity, skipped.backup_id, skipped.reason);
    }
    for warning in &summary.warnings {
        println!("  ⚠ {}", warning);
    }
    match &summary.safety_backup {
        Some(name) => println!("  Previous data saved as {}", name),
        None => println!("  No safety backup was written"),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// Default: INFO, DEBUG for resell crates; `RUST_LOG` overrides.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,resell=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["backup", "export", "out.json"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Command::Export { file } if file == PathBuf::from("out.json")));

        let cli = Cli::try_parse_from(["backup", "import", "in.json", "--config", "shop.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("shop.toml")));
        assert!(matches!(cli.command, Command::Import { .. }));

        assert!(matches!(
            Cli::try_parse_from(["backup", "list"]).unwrap().command,
            Command::List
        ));
        assert!(Cli::try_parse_from(["backup", "export"]).is_err());
        assert!(Cli::try_parse_from(["backup"]).is_err());
    }
}
