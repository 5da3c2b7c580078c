//! # Domain Types
//!
//! Records and inputs of the phone resale ledger.
//!
//! ## Record Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────────┐ 1     n ┌──────────────┐ 1     n ┌──────────────┐    │
//! │  │    Phone     │◄────────│     Sale     │◄────────│    Return    │    │
//! │  │  imei1/imei2 │ phoneId │  profit      │ saleId  │  returnType  │    │
//! │  │  status      │         │  isResale    │         │  newPrice    │    │
//! │  │  (mirrors of │         │  receipt     │────────►│              │    │
//! │  │  active sale)│         └──────┬───────┘ origin- └──────────────┘    │
//! │  └──────┬───────┘                │ 0..1    alReturnId                   │
//! │         │ phoneId         ┌──────▼───────┐ 1     n ┌──────────────┐    │
//! │         └────────────────►│    Credit    │◄────────│CreditPayment │    │
//! │                           │  remaining   │ creditId│  amount      │    │
//! │                           └──────────────┘         └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Denormalized Mirrors
//! A sold phone carries copies of its active sale's price, receipt, customer
//! and credit figures. Only the lifecycle transitions in
//! [`crate::lifecycle`] write them.
//!
//! ## Dates
//! Business dates (`purchase_date`, `sale_date`, `return_date`, ...) are kept
//! as the text that was stored: ISO `YYYY-MM-DD` for records written here,
//! `DD/MM/YYYY` for data imported from the embedded client store. Use
//! [`crate::dates::parse_date`] to read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::query::{FieldValue, Record};

// =============================================================================
// Phone Status
// =============================================================================

/// Inventory state of a phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PhoneStatus {
    /// On the shelf, available for sale.
    #[default]
    InStock,
    /// Reflects a live, non-returned sale.
    Sold,
}

impl PhoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneStatus::InStock => "in_stock",
            PhoneStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for PhoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PhoneStatus> for FieldValue {
    fn from(value: PhoneStatus) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

// =============================================================================
// Return Type
// =============================================================================

/// How a sale was reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// Customer got money back.
    #[default]
    Refund,
    /// Unit taken back as part payment for another purchase.
    TradeIn,
    /// Unit swapped for another unit.
    Exchange,
}

impl ReturnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnType::Refund => "refund",
            ReturnType::TradeIn => "trade_in",
            ReturnType::Exchange => "exchange",
        }
    }
}

impl From<ReturnType> for FieldValue {
    fn from(value: ReturnType) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

// =============================================================================
// Credit Status
// =============================================================================

/// Settlement state of a credit sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    #[default]
    Pending,
    Paid,
    /// The phone was returned; nothing further is collected.
    Cancelled,
}

impl CreditStatus {
    /// Status implied by the ledger figures.
    ///
    /// `cancelled` if the phone was returned, else `paid` once nothing
    /// remains, else `pending`.
    pub fn derive(returned: bool, remaining: Money) -> Self {
        if returned {
            CreditStatus::Cancelled
        } else if remaining.cents() <= 0 {
            CreditStatus::Paid
        } else {
            CreditStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Pending => "pending",
            CreditStatus::Paid => "paid",
            CreditStatus::Cancelled => "cancelled",
        }
    }
}

impl From<CreditStatus> for FieldValue {
    fn from(value: CreditStatus) -> Self {
        FieldValue::Text(value.as_str().to_string())
    }
}

// =============================================================================
// Phone
// =============================================================================

/// A physical unit in the shop's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Phone {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,

    /// Primary IMEI, unique among the tenant's phones.
    pub imei1: String,
    /// Second slot IMEI on dual-SIM units.
    pub imei2: Option<String>,

    pub model: String,
    pub storage: Option<String>,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub unlock_status: Option<String>,
    /// Battery health in percent.
    pub battery_health: Option<i64>,

    pub purchase_date: String,
    /// Cost basis for the next sale. A return overwrites it with `newPrice`.
    pub purchase_price_cents: i64,

    #[serde(default)]
    pub status: PhoneStatus,

    // Mirrors of the active sale.
    pub sale_date: Option<String>,
    pub sale_price_cents: Option<i64>,
    pub receipt_number: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub is_credit: bool,
    pub credit_received_cents: Option<i64>,
    pub credit_remaining_cents: Option<i64>,

    pub notes: Option<String>,

    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Phone {
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    #[inline]
    pub fn is_sold(&self) -> bool {
        self.status == PhoneStatus::Sold
    }

    /// True if any sale mirror field is populated.
    pub fn has_sale_marker(&self) -> bool {
        self.sale_date.is_some()
    }

    /// Both IMEIs, skipping an absent second slot.
    pub fn imeis(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.imei1.as_str()).chain(self.imei2.as_deref())
    }
}

impl Record for Phone {
    const TABLE: &'static str = "phones";
    const ENTITY: &'static str = "Phone";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "imei1",
        "imei2",
        "model",
        "storage",
        "color",
        "condition",
        "unlock_status",
        "battery_health",
        "purchase_date",
        "purchase_price_cents",
        "status",
        "sale_date",
        "sale_price_cents",
        "receipt_number",
        "customer_name",
        "payment_method",
        "is_credit",
        "credit_received_cents",
        "credit_remaining_cents",
        "notes",
        "created_at",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["imei1"];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: &str) {
        self.tenant_id = tenant_id.to_string();
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.imei1.clone().into(),
            self.imei2.clone().into(),
            self.model.clone().into(),
            self.storage.clone().into(),
            self.color.clone().into(),
            self.condition.clone().into(),
            self.unlock_status.clone().into(),
            self.battery_health.into(),
            self.purchase_date.clone().into(),
            self.purchase_price_cents.into(),
            self.status.into(),
            self.sale_date.clone().into(),
            self.sale_price_cents.into(),
            self.receipt_number.clone().into(),
            self.customer_name.clone().into(),
            self.payment_method.clone().into(),
            self.is_credit.into(),
            self.credit_received_cents.into(),
            self.credit_remaining_cents.into(),
            self.notes.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One sale event. Created once; only the credit mirrors and the resale
/// back-reference are ever rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub phone_id: String,
    pub sale_price_cents: i64,
    pub sale_date: String,
    pub customer_name: Option<String>,
    pub payment_method: Option<String>,
    /// `sale_price - phone.purchase_price` frozen at sale time.
    pub profit_cents: i64,
    pub receipt_number: String,
    #[serde(default)]
    pub is_credit: bool,
    #[serde(default)]
    pub credit_received_cents: i64,
    #[serde(default)]
    pub credit_remaining_cents: i64,
    #[serde(default)]
    pub is_resale: bool,
    /// Most recent return of the phone before this sale, set when `is_resale`.
    pub original_return_id: Option<String>,
    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

impl Record for Sale {
    const TABLE: &'static str = "sales";
    const ENTITY: &'static str = "Sale";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "phone_id",
        "sale_price_cents",
        "sale_date",
        "customer_name",
        "payment_method",
        "profit_cents",
        "receipt_number",
        "is_credit",
        "credit_received_cents",
        "credit_remaining_cents",
        "is_resale",
        "original_return_id",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: &str) {
        self.tenant_id = tenant_id.to_string();
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.phone_id.clone().into(),
            self.sale_price_cents.into(),
            self.sale_date.clone().into(),
            self.customer_name.clone().into(),
            self.payment_method.clone().into(),
            self.profit_cents.into(),
            self.receipt_number.clone().into(),
            self.is_credit.into(),
            self.credit_received_cents.into(),
            self.credit_remaining_cents.into(),
            self.is_resale.into(),
            self.original_return_id.clone().into(),
            self.created_at.into(),
        ]
    }
}

// =============================================================================
// Return
// =============================================================================

/// Reversal of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Return {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub sale_id: String,
    pub phone_id: String,
    #[serde(default)]
    pub return_type: ReturnType,
    /// Amount paid back to the customer.
    pub return_price_cents: i64,
    /// Price the unit is re-listed at; becomes the phone's cost basis.
    pub new_price_cents: i64,
    pub return_reason: Option<String>,
    pub return_date: String,
    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Return {
    #[inline]
    pub fn return_price(&self) -> Money {
        Money::from_cents(self.return_price_cents)
    }
}

impl Record for Return {
    const TABLE: &'static str = "returns";
    const ENTITY: &'static str = "Return";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "sale_id",
        "phone_id",
        "return_type",
        "return_price_cents",
        "new_price_cents",
        "return_reason",
        "return_date",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: &str) {
        self.tenant_id = tenant_id.to_string();
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.sale_id.clone().into(),
            self.phone_id.clone().into(),
            self.return_type.into(),
            self.return_price_cents.into(),
            self.new_price_cents.into(),
            self.return_reason.clone().into(),
            self.return_date.clone().into(),
            self.created_at.into(),
        ]
    }
}

// =============================================================================
// Credit
// =============================================================================

/// Receivable of a "buy now, pay later" sale.
///
/// Invariant: `remaining == total - received`, never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Credit {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub phone_id: String,
    pub sale_id: String,
    pub customer_name: Option<String>,
    pub total_amount_cents: i64,
    pub received_amount_cents: i64,
    pub remaining_amount_cents: i64,
    pub sale_date: String,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: CreditStatus,
    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Credit {
    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_amount_cents)
    }

    #[inline]
    pub fn received(&self) -> Money {
        Money::from_cents(self.received_amount_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

impl Record for Credit {
    const TABLE: &'static str = "credits";
    const ENTITY: &'static str = "Credit";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "phone_id",
        "sale_id",
        "customer_name",
        "total_amount_cents",
        "received_amount_cents",
        "remaining_amount_cents",
        "sale_date",
        "payment_method",
        "status",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: &str) {
        self.tenant_id = tenant_id.to_string();
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.phone_id.clone().into(),
            self.sale_id.clone().into(),
            self.customer_name.clone().into(),
            self.total_amount_cents.into(),
            self.received_amount_cents.into(),
            self.remaining_amount_cents.into(),
            self.sale_date.clone().into(),
            self.payment_method.clone().into(),
            self.status.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }
}

// =============================================================================
// Credit Payment
// =============================================================================

/// Append-only ledger entry against a credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreditPayment {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub credit_id: String,
    pub amount_cents: i64,
    pub payment_date: String,
    pub payment_method: Option<String>,
    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Record for CreditPayment {
    const TABLE: &'static str = "credit_payments";
    const ENTITY: &'static str = "CreditPayment";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "credit_id",
        "amount_cents",
        "payment_date",
        "payment_method",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant_id: &str) {
        self.tenant_id = tenant_id.to_string();
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.credit_id.clone().into(),
            self.amount_cents.into(),
            self.payment_date.clone().into(),
            self.payment_method.clone().into(),
            self.created_at.into(),
        ]
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Data for a newly purchased phone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPhone {
    pub imei1: String,
    pub imei2: Option<String>,
    pub model: String,
    pub storage: Option<String>,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub unlock_status: Option<String>,
    pub battery_health: Option<i64>,
    /// Defaults to today when omitted.
    pub purchase_date: Option<String>,
    pub purchase_price_cents: i64,
    pub notes: Option<String>,
}

/// Edit of an in-stock phone's inventory attributes.
///
/// `None` leaves a field untouched; an empty string clears an optional
/// text field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PhonePatch {
    pub imei1: Option<String>,
    pub imei2: Option<String>,
    pub model: Option<String>,
    pub storage: Option<String>,
    pub color: Option<String>,
    pub condition: Option<String>,
    pub unlock_status: Option<String>,
    pub battery_health: Option<i64>,
    pub purchase_date: Option<String>,
    pub purchase_price_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Details of a sale being recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleInput {
    pub sale_price_cents: i64,
    /// Defaults to today when omitted.
    pub sale_date: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub is_credit: bool,
    /// Down payment on a credit sale.
    #[serde(default)]
    pub received_amount_cents: i64,
    /// Generated as `RCP-YYYYMMDD-NNN` when omitted.
    pub receipt_number: Option<String>,
}

/// Details of a return being recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnInput {
    #[serde(default)]
    pub return_type: ReturnType,
    pub return_price_cents: i64,
    pub new_price_cents: i64,
    pub return_reason: Option<String>,
    /// Defaults to today when omitted.
    pub return_date: Option<String>,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Records written by `record_sale`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleOutcome {
    pub phone: Phone,
    pub sale: Sale,
    pub credit: Option<Credit>,
}

/// Records written by `record_return`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReturnOutcome {
    pub phone: Phone,
    #[serde(rename = "return")]
    #[ts(rename = "return")]
    pub record: Return,
    /// The cancelled credit, if the sale was on credit.
    pub credit: Option<Credit>,
}

/// Records written by `record_credit_payment`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentOutcome {
    pub payment: CreditPayment,
    pub credit: Credit,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time copy of one tenant's entity graph.
///
/// Reports and exports work on a snapshot, never on live tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Snapshot {
    pub phones: Vec<Phone>,
    pub sales: Vec<Sale>,
    pub returns: Vec<Return>,
    pub credits: Vec<Credit>,
    pub credit_payments: Vec<CreditPayment>,
}

impl Snapshot {
    /// True when there is nothing worth protecting.
    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
            && self.sales.is_empty()
            && self.returns.is_empty()
            && self.credits.is_empty()
            && self.credit_payments.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_status_derivation() {
        assert_eq!(
            CreditStatus::derive(false, Money::from_cents(1)),
            CreditStatus::Pending
        );
        assert_eq!(
            CreditStatus::derive(false, Money::zero()),
            CreditStatus::Paid
        );
        assert_eq!(
            CreditStatus::derive(true, Money::from_cents(500)),
            CreditStatus::Cancelled
        );
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PhoneStatus::InStock).unwrap(),
            "\"in_stock\""
        );
        assert_eq!(
            serde_json::to_string(&ReturnType::TradeIn).unwrap(),
            "\"trade_in\""
        );
        assert_eq!(PhoneStatus::Sold.to_string(), "sold");
    }

    #[test]
    fn test_record_values_align_with_columns() {
        let phone: Phone = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "imei1": "350000000000001",
            "model": "Pixel 7",
            "purchaseDate": "2026-01-02",
            "purchasePriceCents": 10000
        }))
        .unwrap();

        assert_eq!(phone.values().len(), Phone::COLUMNS.len());
        assert_eq!(phone.value("model"), Some(FieldValue::Text("Pixel 7".into())));
        assert_eq!(phone.value("status"), Some(FieldValue::Text("in_stock".into())));
        assert_eq!(phone.value("imei2"), Some(FieldValue::Null));
    }

    #[test]
    fn test_phone_imeis_skip_missing_second_slot() {
        let mut phone: Phone = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "imei1": "A",
            "model": "X",
            "purchaseDate": "2026-01-02",
            "purchasePriceCents": 0
        }))
        .unwrap();
        assert_eq!(phone.imeis().collect::<Vec<_>>(), vec!["A"]);

        phone.imei2 = Some("B".into());
        assert_eq!(phone.imeis().collect::<Vec<_>>(), vec!["A", "B"]);
    }
}
