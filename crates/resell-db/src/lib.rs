//! # resell-db: Storage Layer for Resell
//!
//! Everything that touches a store or a file: the entity store contract and
//! its two adapters, the Lifecycle Engine that drives the pure rules of
//! `resell-core` against a store, and the Backup Codec.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Resell Data Flow                                 │
//! │                                                                         │
//! │  UI / API  (record_sale, import_json, dashboard, ...)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     resell-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐   ┌───────────────┐   ┌───────────────┐   │   │
//! │  │   │ LifecycleEngine│◄──│  BackupCodec  │──►│ BackupArchive │   │   │
//! │  │   │  (engine.rs)   │   │  (backup.rs)  │   │ (archive.rs)  │   │   │
//! │  │   │  reports.rs    │   └───────────────┘   └───────────────┘   │   │
//! │  │   └───────┬────────┘                                           │   │
//! │  │           ▼                                                     │   │
//! │  │   EntityStore<R> ──► MemoryStore | Database (SQLite, pool.rs)   │   │
//! │  │                                                  migrations.rs  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/resell/resell.db                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Entity store contract, embedded and SQLite adapters
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`engine`] - Lifecycle Engine
//! - [`reports`] - Report entry points on the engine
//! - [`backup`] - Backup export and restore
//! - [`archive`] - Backup document storage
//! - [`config`] - Configuration loading
//! - [`error`] - Store, service and backup error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resell_db::{Database, DbConfig, LifecycleEngine};
//! use std::sync::Arc;
//!
//! let db = Database::new(DbConfig::new("path/to/resell.db")).await?;
//! let engine = LifecycleEngine::new(Arc::new(db), resell_core::DEFAULT_TENANT_ID);
//!
//! let phone = engine.add_phone(new_phone).await?;
//! let outcome = engine.record_sale(&phone.id, sale).await?;
//! let dashboard = engine.dashboard().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod archive;
pub mod backup;
pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use archive::{BackupArchive, DirectoryArchive};
pub use backup::{BackupCodec, RestoreSummary};
pub use config::{ResellConfig, StoreBackend};
pub use engine::LifecycleEngine;
pub use error::{BackupError, DbError, ServiceError};
pub use pool::{Database, DbConfig};
pub use store::{EntityStore, MemoryStore, Store, Table};
