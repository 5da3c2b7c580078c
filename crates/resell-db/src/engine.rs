//! # Lifecycle Engine
//!
//! The single mutation point of the ledger. Every operation loads what it
//! needs through the store contract, runs the pure transition from
//! `resell_core::lifecycle`, then writes the result back.
//!
//! ## Phone Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Phone Lifecycle                                 │
//! │                                                                         │
//! │  add_phone() ──► IN_STOCK ──record_sale()──► SOLD ──┐                   │
//! │                     ▲                         │     │ record_credit_    │
//! │                     │                         │     │ payment()         │
//! │                     └────record_return()──────┘◄────┘                   │
//! │                                                                         │
//! │  delete_phone():                                                        │
//! │    SOLD      ──► payments, credits, returns, sales, phone deleted       │
//! │    IN_STOCK  ──► phone deleted, unless it carries sale history          │
//! │                                                                         │
//! │  Each resale after a return is tagged by the Resale Detector.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Order
//! Multi-record operations are sequences of single-record writes with no
//! enclosing transaction. Rules are checked before the first write, so a
//! rejected operation never writes anything.
//!
//! | Operation               | Writes, in order                               |
//! |-------------------------|------------------------------------------------|
//! | `record_sale`           | sale, phone mirrors, credit (credit sales)     |
//! | `record_return`         | return, credit cancel, phone reset             |
//! | `record_credit_payment` | payment, credit, sale mirror, phone mirror     |

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DbError, ServiceError, ServiceResult};
use crate::store::{Store, Table};
use resell_core::dates::{format_iso, parse_date};
use resell_core::lifecycle;
use resell_core::receipt::generate_receipt_number;
use resell_core::resale::{detect_resale, ResaleTag};
use resell_core::validation::{
    normalize_imei, normalize_optional_imei, validate_new_phone, validate_patch, validate_return,
    validate_sale,
};
use resell_core::{
    CoreError, Credit, CreditPayment, CreditStatus, Filter, Money, NewPhone, PaymentOutcome,
    Phone, PhonePatch, PhoneStatus, Query, Return, ReturnInput, ReturnOutcome, Sale, SaleInput,
    SaleOutcome, Snapshot,
};

/// Orchestrates the phone lifecycle for one tenant.
///
/// Generic over the store so the same rules run on the embedded store and
/// on SQLite.
pub struct LifecycleEngine<S: Store> {
    store: Arc<S>,
    tenant_id: String,
}

impl<S: Store> Clone for LifecycleEngine<S> {
    fn clone(&self) -> Self {
        LifecycleEngine {
            store: Arc::clone(&self.store),
            tenant_id: self.tenant_id.clone(),
        }
    }
}

impl<S: Store> LifecycleEngine<S> {
    pub fn new(store: Arc<S>, tenant_id: impl Into<String>) -> Self {
        LifecycleEngine {
            store,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn phones(&self) -> Table<'_, S, Phone> {
        Table::new(&*self.store, &self.tenant_id)
    }

    pub fn sales(&self) -> Table<'_, S, Sale> {
        Table::new(&*self.store, &self.tenant_id)
    }

    pub fn returns(&self) -> Table<'_, S, Return> {
        Table::new(&*self.store, &self.tenant_id)
    }

    pub fn credits(&self) -> Table<'_, S, Credit> {
        Table::new(&*self.store, &self.tenant_id)
    }

    pub fn credit_payments(&self) -> Table<'_, S, CreditPayment> {
        Table::new(&*self.store, &self.tenant_id)
    }

    // =========================================================================
    // Phones
    // =========================================================================

    /// Adds a phone to stock.
    ///
    /// IMEIs are normalized first, then checked against both IMEI slots
    /// of every phone of the tenant.
    ///
    /// ## Errors
    /// - `Validation` for malformed input
    /// - `DuplicateImei` if either IMEI is already carried by a phone
    pub async fn add_phone(&self, mut input: NewPhone) -> ServiceResult<Phone> {
        input.imei1 = normalize_imei(&input.imei1);
        input.imei2 = normalize_optional_imei(input.imei2.as_deref());
        validate_new_phone(&input)?;

        let mut imeis = vec![input.imei1.clone()];
        imeis.extend(input.imei2.clone());
        self.ensure_imeis_free(None, &imeis).await?;

        let today = today();
        let purchase_date = date_or_today(input.purchase_date.clone(), today);
        let phone = lifecycle::new_phone(&self.tenant_id, input, purchase_date, Utc::now());

        let imei1 = phone.imei1.clone();
        let phone = self
            .phones()
            .insert(phone)
            .await
            .map_err(|e| duplicate_imei(e, &imei1))?;

        info!(phone_id = %phone.id, imei = %phone.imei1, model = %phone.model, "Phone added");
        Ok(phone)
    }

    /// Edits an in-stock phone's inventory attributes.
    ///
    /// ## Errors
    /// - `NotFound`, `Immutable` (phone is sold), `Validation`,
    ///   `DuplicateImei`
    pub async fn update_phone(&self, id: &str, mut patch: PhonePatch) -> ServiceResult<Phone> {
        let mut phone = self.phones().require(id).await?;
        lifecycle::ensure_editable(&phone)?;

        patch.imei1 = patch.imei1.map(|imei| normalize_imei(&imei));
        // An empty imei2 clears the slot and must survive normalization.
        patch.imei2 = patch
            .imei2
            .map(|imei| normalize_optional_imei(Some(&imei)).unwrap_or_default());
        validate_patch(&patch)?;

        let imeis_changed = patch.imei1.is_some() || patch.imei2.is_some();
        lifecycle::apply_patch(&mut phone, patch, Utc::now());

        if imeis_changed {
            let imeis: Vec<String> = phone.imeis().map(str::to_string).collect();
            self.ensure_imeis_free(Some(&phone.id), &imeis).await?;
        }

        self.phones()
            .update(&phone)
            .await
            .map_err(|e| duplicate_imei(e, &phone.imei1))?;

        info!(phone_id = %phone.id, "Phone updated");
        Ok(phone)
    }

    /// Deletes a phone.
    ///
    /// A sold phone takes its payments, credits, returns and sales with
    /// it. An in-stock phone is only deleted if it never left the shelf.
    ///
    /// ## Errors
    /// - `NotFound`
    /// - `SaleHistory` for an in-stock phone with a sale date marker or
    ///   sale records
    pub async fn delete_phone(&self, id: &str) -> ServiceResult<()> {
        let phone = self.phones().require(id).await?;
        let sales = self.sales_for_phone(id).await?;
        lifecycle::ensure_deletable(&phone, sales.len())?;

        if phone.is_sold() {
            let credits = self
                .credits()
                .find(&Query::where_eq("phone_id", id))
                .await?;
            let mut payments = 0;
            for credit in &credits {
                payments += self
                    .credit_payments()
                    .delete_where("credit_id", credit.id.as_str())
                    .await?;
            }
            let credits = self.credits().delete_where("phone_id", id).await?;
            let returns = self.returns().delete_where("phone_id", id).await?;
            let sales = self.sales().delete_where("phone_id", id).await?;
            debug!(
                phone_id = %id,
                payments,
                credits,
                returns,
                sales,
                "Cascaded phone history"
            );
        }

        self.phones().delete(id).await?;

        info!(phone_id = %id, "Phone deleted");
        Ok(())
    }

    pub async fn get_phone(&self, id: &str) -> ServiceResult<Phone> {
        Ok(self.phones().require(id).await?)
    }

    /// Phones, newest first, optionally filtered by status.
    pub async fn list_phones(&self, status: Option<PhoneStatus>) -> ServiceResult<Vec<Phone>> {
        let filter = match status {
            Some(status) => Filter::eq("status", status),
            None => Filter::All,
        };
        let query = Query::filter(filter).order_by_desc("created_at");
        Ok(self.phones().find(&query).await?)
    }

    /// Case-insensitive substring search over IMEIs and model.
    pub async fn search_phones(&self, text: &str) -> ServiceResult<Vec<Phone>> {
        let needle = text.trim();
        if needle.is_empty() {
            return self.list_phones(None).await;
        }

        let filter = Filter::Or(vec![
            Filter::contains("imei1", needle),
            Filter::contains("imei2", needle),
            Filter::contains("model", needle),
        ]);
        let query = Query::filter(filter).order_by_desc("created_at");
        Ok(self.phones().find(&query).await?)
    }

    /// Fails with `DuplicateImei` if any of `imeis` is carried by a phone
    /// other than `exclude_id`.
    async fn ensure_imeis_free(&self, exclude_id: Option<&str>, imeis: &[String]) -> ServiceResult<()> {
        let phones = self.phones().all().await?;
        for imei in imeis {
            let taken = phones
                .iter()
                .filter(|p| Some(p.id.as_str()) != exclude_id)
                .any(|p| p.imeis().any(|existing| normalize_imei(existing) == *imei));
            if taken {
                return Err(CoreError::DuplicateImei { imei: imei.clone() }.into());
            }
        }
        Ok(())
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Sells an in-stock phone.
    ///
    /// ## Flow
    /// 1. Validate input, load phone (`NotFound`, `AlreadySold`)
    /// 2. Tag the sale via the Resale Detector; a failed returns lookup
    ///    degrades to a fresh sale
    /// 3. Insert the sale with profit frozen at today's purchase price
    /// 4. Mirror the sale onto the phone (status `sold`)
    /// 5. Open a credit for credit sales
    pub async fn record_sale(&self, phone_id: &str, input: SaleInput) -> ServiceResult<SaleOutcome> {
        validate_sale(&input)?;
        let mut phone = self.phones().require(phone_id).await?;
        if phone.is_sold() {
            return Err(CoreError::AlreadySold {
                phone_id: phone.id.clone(),
            }
            .into());
        }

        let tag = self.resale_tag(phone_id).await;

        let today = today();
        let sale_date = date_or_today(input.sale_date.clone(), today);
        let receipt_number = match non_blank(input.receipt_number.clone()) {
            Some(receipt) => receipt,
            None => {
                let day = parse_date(&sale_date).unwrap_or(today);
                generate_receipt_number(day, &mut rand::thread_rng())
            }
        };

        let now = Utc::now();
        let sale = lifecycle::plan_sale(&phone, &input, tag, sale_date, receipt_number, now)?;
        let sale = self.sales().insert(sale).await?;

        lifecycle::mirror_sale(&mut phone, &sale, now);
        self.phones().update(&phone).await?;

        let credit = match lifecycle::plan_credit(&sale, now) {
            Some(credit) => Some(self.credits().insert(credit).await?),
            None => None,
        };

        info!(
            phone_id = %phone.id,
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            profit = %sale.profit(),
            is_resale = sale.is_resale,
            is_credit = sale.is_credit,
            "Sale recorded"
        );

        Ok(SaleOutcome {
            phone,
            sale,
            credit,
        })
    }

    async fn resale_tag(&self, phone_id: &str) -> ResaleTag {
        match self
            .returns()
            .find(&Query::where_eq("phone_id", phone_id).order_by("created_at"))
            .await
        {
            Ok(returns) => detect_resale(phone_id, &returns),
            Err(err) => {
                warn!(
                    phone_id = %phone_id,
                    error = %err,
                    "Returns lookup failed; recording as a fresh sale"
                );
                ResaleTag::fresh()
            }
        }
    }

    /// Every sale of a phone, oldest first.
    pub async fn sales_for_phone(&self, phone_id: &str) -> ServiceResult<Vec<Sale>> {
        let query = Query::where_eq("phone_id", phone_id).order_by("created_at");
        Ok(self.sales().find(&query).await?)
    }

    /// Every sale, newest first.
    pub async fn list_sales(&self) -> ServiceResult<Vec<Sale>> {
        Ok(self
            .sales()
            .find(&Query::all().order_by_desc("created_at"))
            .await?)
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Takes a sold phone back.
    ///
    /// The return reverses the phone's active sale. Its credit, if any, is
    /// cancelled with the amount still owed written off; what the customer
    /// already paid stays recorded as received. The phone goes back in
    /// stock with `new_price` as its cost basis.
    ///
    /// ## Errors
    /// - `Validation`, `NotFound`, `NotSold`
    pub async fn record_return(
        &self,
        phone_id: &str,
        input: ReturnInput,
    ) -> ServiceResult<ReturnOutcome> {
        validate_return(&input)?;
        let mut phone = self.phones().require(phone_id).await?;
        lifecycle::ensure_returnable(&phone)?;

        let sales = self.sales_for_phone(phone_id).await?;
        let sale = lifecycle::active_sale(&phone, &sales)
            .ok_or_else(|| CoreError::not_found("Sale", format!("active sale of phone {}", phone_id)))?;

        let now = Utc::now();
        let return_date = date_or_today(input.return_date.clone(), today());
        let record = lifecycle::plan_return(&phone, &sale.id, &input, return_date, now);
        let record = self.returns().insert(record).await?;

        let mut cancelled = None;
        let credits = self
            .credits()
            .find(&Query::where_eq("sale_id", sale.id.as_str()))
            .await?;
        for mut credit in credits {
            if credit.status == CreditStatus::Cancelled {
                continue;
            }
            lifecycle::cancel_credit(&mut credit, now);
            self.credits().update(&credit).await?;
            debug!(
                credit_id = %credit.id,
                received = %credit.received(),
                "Credit cancelled by return"
            );
            cancelled = Some(credit);
        }

        lifecycle::reset_after_return(&mut phone, Some(input.new_price_cents), now);
        self.phones().update(&phone).await?;

        info!(
            phone_id = %phone.id,
            return_id = %record.id,
            return_type = record.return_type.as_str(),
            refund = %record.return_price(),
            "Return recorded"
        );

        Ok(ReturnOutcome {
            phone,
            record,
            credit: cancelled,
        })
    }

    /// Every return, newest first.
    pub async fn list_returns(&self) -> ServiceResult<Vec<Return>> {
        Ok(self
            .returns()
            .find(&Query::all().order_by_desc("created_at"))
            .await?)
    }

    // =========================================================================
    // Credits
    // =========================================================================

    /// Records a payment against a credit and propagates the new figures
    /// to the credit's sale and phone.
    ///
    /// ## Errors
    /// - `NotFound`
    /// - `InvalidAmount` if `amount_cents <= 0`
    /// - `ExceedsRemaining` if more than the remaining amount is paid
    pub async fn record_credit_payment(
        &self,
        credit_id: &str,
        amount_cents: i64,
        payment_date: Option<String>,
        payment_method: Option<String>,
    ) -> ServiceResult<PaymentOutcome> {
        let mut credit = self.credits().require(credit_id).await?;
        let amount = Money::from_cents(amount_cents);

        let now = Utc::now();
        lifecycle::apply_payment(&mut credit, amount, now)?;

        let payment_date = date_or_today(payment_date, today());
        let payment = lifecycle::plan_payment(&credit, amount, payment_date, payment_method, now);
        let payment = self.credit_payments().insert(payment).await?;

        self.credits().update(&credit).await?;

        if let Some(mut sale) = self.sales().get(&credit.sale_id).await? {
            lifecycle::mirror_credit_on_sale(&mut sale, &credit);
            self.sales().update(&sale).await?;
        }
        if let Some(mut phone) = self.phones().get(&credit.phone_id).await? {
            if phone.is_sold() {
                lifecycle::mirror_credit_on_phone(&mut phone, &credit, now);
                self.phones().update(&phone).await?;
            }
        }

        info!(
            credit_id = %credit.id,
            amount = %amount,
            remaining = %credit.remaining(),
            status = credit.status.as_str(),
            "Credit payment recorded"
        );

        Ok(PaymentOutcome { payment, credit })
    }

    /// Credits, newest first, optionally filtered by status.
    pub async fn list_credits(&self, status: Option<CreditStatus>) -> ServiceResult<Vec<Credit>> {
        let filter = match status {
            Some(status) => Filter::eq("status", status),
            None => Filter::All,
        };
        let query = Query::filter(filter).order_by_desc("created_at");
        Ok(self.credits().find(&query).await?)
    }

    /// Payments of a credit, oldest first.
    pub async fn payments_for_credit(&self, credit_id: &str) -> ServiceResult<Vec<CreditPayment>> {
        let query = Query::where_eq("credit_id", credit_id).order_by("created_at");
        Ok(self.credit_payments().find(&query).await?)
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Point-in-time fetch of every table of the tenant.
    pub async fn snapshot(&self) -> ServiceResult<Snapshot> {
        Ok(Snapshot {
            phones: self.phones().all().await?,
            sales: self.sales().all().await?,
            returns: self.returns().all().await?,
            credits: self.credits().all().await?,
            credit_payments: self.credit_payments().all().await?,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Caller-supplied date text, kept verbatim, or today in ISO form.
fn date_or_today(value: Option<String>, today: NaiveDate) -> String {
    non_blank(value).unwrap_or_else(|| format_iso(today))
}

/// The store's own imei1 constraint surfaces as `DuplicateImei`.
fn duplicate_imei(err: DbError, imei1: &str) -> ServiceError {
    match err {
        DbError::UniqueViolation { field, .. } if field == "imei1" => CoreError::DuplicateImei {
            imei: imei1.to_string(),
        }
        .into(),
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
