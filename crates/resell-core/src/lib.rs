//! # resell-core: Pure Business Logic for Resell
//!
//! This crate holds the rules of the phone resale ledger as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Resell Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                UI / API (external collaborator)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        resell-db: LifecycleEngine, BackupCodec, stores          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls                                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ resell-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   types      lifecycle    resale     report      backup        │   │
//! │  │   Phone      sale/return  detector   profit      document      │   │
//! │  │   Sale...    transitions             dashboard   validation    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (Phone, Sale, Return, Credit, CreditPayment) and inputs
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`query`] - Storage-agnostic predicates over records
//! - [`dates`] - Tolerant date parsing and report windows
//! - [`receipt`] - Receipt number generation
//! - [`resale`] - Resale Detector
//! - [`lifecycle`] - Pure state transitions of the phone lifecycle
//! - [`report`] - Report Aggregator
//! - [`backup`] - Backup document format and validation
//!
//! ## Example Usage
//!
//! ```rust
//! use resell_core::money::Money;
//!
//! let purchase = Money::from_cents(10_000);
//! let sale = Money::from_cents(15_000);
//! assert_eq!((sale - purchase).cents(), 5_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backup;
pub mod dates;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod query;
pub mod receipt;
pub mod report;
pub mod resale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use query::{FieldValue, Filter, OrderBy, Query, Record};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID for single-operator installs.
///
/// Every record carries a tenant id and every store call is scoped by it,
/// but a shop normally runs a single tenant.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Number of models listed in the best-seller table.
pub const BEST_SELLER_LIMIT: usize = 10;
