//! # Report Entry Points
//!
//! Fetches a snapshot through the engine and hands it to the pure
//! aggregator in `resell_core::report`, anchored at today's date.
//!
//! ```text
//! engine.dashboard()
//!     │
//!     ├── snapshot()            five table scans, no locks held after
//!     │
//!     └── report::dashboard(&snapshot, today)
//! ```
//!
//! Reports may observe a write that is still in flight; a dashboard that
//! is a moment stale is acceptable.

use tracing::debug;

use crate::engine::{today, LifecycleEngine};
use crate::error::ServiceResult;
use crate::store::Store;
use resell_core::dates::DateRange;
use resell_core::report::{self, CreditSummary, Dashboard, InventoryReport, ProfitReport};

impl<S: Store> LifecycleEngine<S> {
    pub async fn inventory_report(&self) -> ServiceResult<InventoryReport> {
        let snapshot = self.snapshot().await?;
        Ok(report::inventory_report(&snapshot))
    }

    /// Revenue, costs and refunds of the sales and returns dated within
    /// `range`.
    pub async fn profit_report(&self, range: DateRange) -> ServiceResult<ProfitReport> {
        let snapshot = self.snapshot().await?;
        let today = today();
        debug!(range = ?range, bounds = ?range.bounds(today), "Building profit report");
        Ok(report::profit_report(&snapshot, range, today))
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        let snapshot = self.snapshot().await?;
        Ok(report::dashboard(&snapshot, today()))
    }

    pub async fn credit_summary(&self) -> ServiceResult<CreditSummary> {
        let snapshot = self.snapshot().await?;
        Ok(report::credit_summary(&snapshot))
    }
}
