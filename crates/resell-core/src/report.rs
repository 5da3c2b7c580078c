//! # Report Aggregator
//!
//! Read-only statistics over a [`Snapshot`] of the entity graph.
//!
//! ## Two Profit Figures
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  profit_report   revenue - Σ phone.purchase_price (CURRENT) - refunds  │
//! │  dashboard       Σ sale.profit (FROZEN at sale time)       - refunds   │
//! │                                                                         │
//! │  They diverge once a return rewrites a phone's purchase price. Both    │
//! │  are reported as-is; neither is "corrected" to match the other.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dates that do not parse (see [`crate::dates::parse_date`]) drop the row
//! from date-filtered figures instead of failing the report. Credits only
//! feed [`credit_summary`], never the profit math.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::dates::{days_between, parse_date, DateRange};
use crate::money::Money;
use crate::types::{CreditStatus, Phone, PhoneStatus, Snapshot};
use crate::BEST_SELLER_LIMIT;

// =============================================================================
// Report Types
// =============================================================================

/// Units sold per model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BestSeller {
    pub model: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryReport {
    pub current_stock_count: usize,
    pub current_stock_value_cents: i64,
    pub sold_count: usize,
    pub returns_count: usize,
    pub best_selling_models: Vec<BestSeller>,
    /// Returns per hundred sold phones.
    pub return_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfitReport {
    pub range: DateRange,
    pub total_sales: usize,
    pub total_sales_revenue_cents: i64,
    pub total_purchase_costs_cents: i64,
    pub total_refunds_cents: i64,
    pub net_profit_cents: i64,
    /// Zero when there are no sales in the window.
    pub average_profit_per_sale_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Dashboard {
    pub total_phones: usize,
    pub in_stock: usize,
    pub sold: usize,
    pub total_profit_cents: i64,
    pub total_refunds_cents: i64,
    pub net_profit_cents: i64,
    pub daily_profit_cents: i64,
    pub weekly_profit_cents: i64,
    pub monthly_profit_cents: i64,
    pub yearly_profit_cents: i64,
    /// Mean days from purchase to sale, zero when no sale has a usable
    /// date pair.
    pub inventory_turnover_days: f64,
    /// Sales that contributed to `inventory_turnover_days`.
    pub turnover_sample_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreditSummary {
    pub pending_count: usize,
    pub paid_count: usize,
    pub cancelled_count: usize,
    /// Σ remaining over pending credits.
    pub outstanding_cents: i64,
    /// Σ received over every credit, cancelled ones included.
    pub collected_cents: i64,
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock value, best sellers and return rate.
pub fn inventory_report(snapshot: &Snapshot) -> InventoryReport {
    let in_stock: Vec<&Phone> = snapshot
        .phones
        .iter()
        .filter(|p| p.status == PhoneStatus::InStock)
        .collect();
    let sold: Vec<&Phone> = snapshot.phones.iter().filter(|p| p.is_sold()).collect();

    let stock_value: Money = in_stock.iter().map(|p| p.purchase_price()).sum();
    let returns_count = snapshot.returns.len();

    InventoryReport {
        current_stock_count: in_stock.len(),
        current_stock_value_cents: stock_value.cents(),
        sold_count: sold.len(),
        returns_count,
        best_selling_models: best_sellers(&sold),
        return_rate: returns_count as f64 / sold.len().max(1) as f64 * 100.0,
    }
}

fn best_sellers(sold: &[&Phone]) -> Vec<BestSeller> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for phone in sold {
        *counts.entry(phone.model.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<BestSeller> = counts
        .into_iter()
        .map(|(model, count)| BestSeller {
            model: model.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.model.cmp(&b.model)));
    ranked.truncate(BEST_SELLER_LIMIT);
    ranked
}

// =============================================================================
// Profit
// =============================================================================

/// Revenue, costs and refunds of one date window.
///
/// Sales are filtered by `sale_date` and returns by `return_date` against
/// the same window. Purchase costs use each sold phone's current purchase
/// price; a sale whose phone is gone contributes no cost.
pub fn profit_report(snapshot: &Snapshot, range: DateRange, today: NaiveDate) -> ProfitReport {
    let phones: HashMap<&str, &Phone> = snapshot
        .phones
        .iter()
        .map(|p| (p.id.as_str(), p))
        .collect();

    let sales: Vec<_> = snapshot
        .sales
        .iter()
        .filter(|s| range.contains_text(&s.sale_date, today))
        .collect();

    let revenue: Money = sales.iter().map(|s| s.sale_price()).sum();
    let costs: Money = sales
        .iter()
        .filter_map(|s| phones.get(s.phone_id.as_str()))
        .map(|p| p.purchase_price())
        .sum();
    let refunds: Money = snapshot
        .returns
        .iter()
        .filter(|r| range.contains_text(&r.return_date, today))
        .map(|r| r.return_price())
        .sum();

    let net = revenue - costs - refunds;

    ProfitReport {
        range,
        total_sales: sales.len(),
        total_sales_revenue_cents: revenue.cents(),
        total_purchase_costs_cents: costs.cents(),
        total_refunds_cents: refunds.cents(),
        net_profit_cents: net.cents(),
        average_profit_per_sale_cents: net.average(sales.len()).cents(),
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Headline figures built on the profit frozen into each sale.
pub fn dashboard(snapshot: &Snapshot, today: NaiveDate) -> Dashboard {
    let total_profit: Money = snapshot.sales.iter().map(|s| s.profit()).sum();
    let refunds: Money = snapshot.returns.iter().map(|r| r.return_price()).sum();

    let window_profit = |range: DateRange| -> i64 {
        snapshot
            .sales
            .iter()
            .filter(|s| range.contains_text(&s.sale_date, today))
            .map(|s| s.profit())
            .sum::<Money>()
            .cents()
    };

    let (turnover, samples) = inventory_turnover(snapshot);
    let sold = snapshot.phones.iter().filter(|p| p.is_sold()).count();

    Dashboard {
        total_phones: snapshot.phones.len(),
        in_stock: snapshot.phones.len() - sold,
        sold,
        total_profit_cents: total_profit.cents(),
        total_refunds_cents: refunds.cents(),
        net_profit_cents: (total_profit - refunds).cents(),
        daily_profit_cents: window_profit(DateRange::Today),
        weekly_profit_cents: window_profit(DateRange::Week),
        monthly_profit_cents: window_profit(DateRange::Month),
        yearly_profit_cents: window_profit(DateRange::Year),
        inventory_turnover_days: turnover,
        turnover_sample_size: samples,
    }
}

/// Mean days from purchase to sale over every recorded sale.
///
/// Resales count as their own sample. Pairs where either date is missing
/// or unparsable are left out of both sum and count.
fn inventory_turnover(snapshot: &Snapshot) -> (f64, usize) {
    let purchases: HashMap<&str, NaiveDate> = snapshot
        .phones
        .iter()
        .filter_map(|p| parse_date(&p.purchase_date).map(|d| (p.id.as_str(), d)))
        .collect();

    let days: Vec<i64> = snapshot
        .sales
        .iter()
        .filter_map(|s| {
            let purchased = purchases.get(s.phone_id.as_str())?;
            let sold = parse_date(&s.sale_date)?;
            Some(days_between(*purchased, sold))
        })
        .collect();

    if days.is_empty() {
        return (0.0, 0);
    }
    let total: i64 = days.iter().sum();
    (total as f64 / days.len() as f64, days.len())
}

// =============================================================================
// Credits
// =============================================================================

/// Receivables overview.
pub fn credit_summary(snapshot: &Snapshot) -> CreditSummary {
    snapshot
        .credits
        .iter()
        .fold(CreditSummary::default(), |mut summary, credit| {
            match credit.status {
                CreditStatus::Pending => {
                    summary.pending_count += 1;
                    summary.outstanding_cents = summary
                        .outstanding_cents
                        .saturating_add(credit.remaining_amount_cents);
                }
                CreditStatus::Paid => summary.paid_count += 1,
                CreditStatus::Cancelled => summary.cancelled_count += 1,
            }
            summary.collected_cents = summary
                .collected_cents
                .saturating_add(credit.received_amount_cents);
            summary
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
