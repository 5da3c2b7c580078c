//! # Lifecycle Transitions
//!
//! Pure state transitions of the phone lifecycle. The engine in `resell-db`
//! loads records, calls these functions, and writes the results back.
//!
//! ## Phone State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │    add_phone                                                            │
//! │        │                                                                │
//! │        ▼          record_sale                                           │
//! │   ┌──────────┐ ─────────────────────► ┌──────────┐                      │
//! │   │ in_stock │                        │   sold   │◄─┐ record_credit_    │
//! │   └──────────┘ ◄───────────────────── └──────────┘ ─┘ payment           │
//! │        │          record_return             │                           │
//! │        │          (purchase price :=        │                           │
//! │        │           return.new_price)        │                           │
//! │        ▼                                    ▼                           │
//! │   delete (only without sale history)   delete (cascades to payments,   │
//! │                                        credits, returns, sales)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mirrors
//! While sold, a phone carries copies of its active sale's figures
//! ([`mirror_sale`]). A return wipes them ([`reset_after_return`]); a credit
//! payment refreshes the credit figures ([`mirror_credit_on_phone`]).

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::resale::ResaleTag;
use crate::types::{
    Credit, CreditPayment, CreditStatus, NewPhone, Phone, PhonePatch, PhoneStatus, Return,
    ReturnInput, Sale, SaleInput,
};
use crate::validation::{normalize_imei, normalize_optional_imei};

// =============================================================================
// Phones
// =============================================================================

/// Builds an in-stock phone from validated input. The id is left empty for
/// the store to assign.
pub fn new_phone(
    tenant_id: &str,
    input: NewPhone,
    purchase_date: String,
    now: DateTime<Utc>,
) -> Phone {
    Phone {
        id: String::new(),
        tenant_id: tenant_id.to_string(),
        imei1: normalize_imei(&input.imei1),
        imei2: normalize_optional_imei(input.imei2.as_deref()),
        model: input.model.trim().to_string(),
        storage: non_blank(input.storage),
        color: non_blank(input.color),
        condition: non_blank(input.condition),
        unlock_status: non_blank(input.unlock_status),
        battery_health: input.battery_health,
        purchase_date,
        purchase_price_cents: input.purchase_price_cents,
        status: PhoneStatus::InStock,
        sale_date: None,
        sale_price_cents: None,
        receipt_number: None,
        customer_name: None,
        payment_method: None,
        is_credit: false,
        credit_received_cents: None,
        credit_remaining_cents: None,
        notes: non_blank(input.notes),
        created_at: now,
        updated_at: now,
    }
}

/// Rejects edits of a sold phone's inventory attributes.
pub fn ensure_editable(phone: &Phone) -> CoreResult<()> {
    if phone.is_sold() {
        return Err(CoreError::Immutable {
            phone_id: phone.id.clone(),
        });
    }
    Ok(())
}

/// Applies a patch to an in-stock phone. Empty strings clear optional text.
pub fn apply_patch(phone: &mut Phone, patch: PhonePatch, now: DateTime<Utc>) {
    if let Some(imei1) = patch.imei1 {
        phone.imei1 = normalize_imei(&imei1);
    }
    if let Some(imei2) = patch.imei2 {
        phone.imei2 = normalize_optional_imei(Some(&imei2));
    }
    if let Some(model) = patch.model {
        phone.model = model.trim().to_string();
    }
    if let Some(storage) = patch.storage {
        phone.storage = non_blank(Some(storage));
    }
    if let Some(color) = patch.color {
        phone.color = non_blank(Some(color));
    }
    if let Some(condition) = patch.condition {
        phone.condition = non_blank(Some(condition));
    }
    if let Some(unlock_status) = patch.unlock_status {
        phone.unlock_status = non_blank(Some(unlock_status));
    }
    if let Some(health) = patch.battery_health {
        phone.battery_health = Some(health);
    }
    if let Some(date) = patch.purchase_date {
        phone.purchase_date = date;
    }
    if let Some(price) = patch.purchase_price_cents {
        phone.purchase_price_cents = price;
    }
    if let Some(notes) = patch.notes {
        phone.notes = non_blank(Some(notes));
    }
    phone.updated_at = now;
}

/// Checks a phone may be deleted without cascade.
///
/// A sold phone always may (the caller cascades). An in-stock phone may
/// only if it never left the shelf: no `sale_date` marker and no sales.
pub fn ensure_deletable(phone: &Phone, sale_count: usize) -> CoreResult<()> {
    if !phone.is_sold() && (phone.has_sale_marker() || sale_count > 0) {
        return Err(CoreError::SaleHistory {
            phone_id: phone.id.clone(),
        });
    }
    Ok(())
}

// =============================================================================
// Sales
// =============================================================================

/// Builds the sale record for `phone`.
///
/// Profit is frozen here as `sale_price - phone.purchase_price`. Credit
/// figures are only populated for credit sales.
pub fn plan_sale(
    phone: &Phone,
    input: &SaleInput,
    tag: ResaleTag,
    sale_date: String,
    receipt_number: String,
    now: DateTime<Utc>,
) -> CoreResult<Sale> {
    if phone.is_sold() {
        return Err(CoreError::AlreadySold {
            phone_id: phone.id.clone(),
        });
    }

    let price = Money::from_cents(input.sale_price_cents);
    let profit = price - phone.purchase_price();
    let (received, remaining) = if input.is_credit {
        let received = Money::from_cents(input.received_amount_cents);
        (received, price - received)
    } else {
        (Money::zero(), Money::zero())
    };

    Ok(Sale {
        id: String::new(),
        tenant_id: phone.tenant_id.clone(),
        phone_id: phone.id.clone(),
        sale_price_cents: price.cents(),
        sale_date,
        customer_name: non_blank(input.customer_name.clone()),
        payment_method: non_blank(input.payment_method.clone()),
        profit_cents: profit.cents(),
        receipt_number,
        is_credit: input.is_credit,
        credit_received_cents: received.cents(),
        credit_remaining_cents: remaining.cents(),
        is_resale: tag.is_resale,
        original_return_id: tag.original_return_id,
        created_at: now,
    })
}

/// Builds the credit opened by a persisted credit sale, `None` for cash.
pub fn plan_credit(sale: &Sale, now: DateTime<Utc>) -> Option<Credit> {
    if !sale.is_credit {
        return None;
    }
    let remaining = Money::from_cents(sale.credit_remaining_cents);
    Some(Credit {
        id: String::new(),
        tenant_id: sale.tenant_id.clone(),
        phone_id: sale.phone_id.clone(),
        sale_id: sale.id.clone(),
        customer_name: sale.customer_name.clone(),
        total_amount_cents: sale.sale_price_cents,
        received_amount_cents: sale.credit_received_cents,
        remaining_amount_cents: remaining.cents(),
        sale_date: sale.sale_date.clone(),
        payment_method: sale.payment_method.clone(),
        status: CreditStatus::derive(false, remaining),
        created_at: now,
        updated_at: now,
    })
}

/// Marks `phone` sold and copies the sale's figures onto it.
pub fn mirror_sale(phone: &mut Phone, sale: &Sale, now: DateTime<Utc>) {
    phone.status = PhoneStatus::Sold;
    phone.sale_date = Some(sale.sale_date.clone());
    phone.sale_price_cents = Some(sale.sale_price_cents);
    phone.receipt_number = Some(sale.receipt_number.clone());
    phone.customer_name = sale.customer_name.clone();
    phone.payment_method = sale.payment_method.clone();
    phone.is_credit = sale.is_credit;
    if sale.is_credit {
        phone.credit_received_cents = Some(sale.credit_received_cents);
        phone.credit_remaining_cents = Some(sale.credit_remaining_cents);
    } else {
        phone.credit_received_cents = None;
        phone.credit_remaining_cents = None;
    }
    phone.updated_at = now;
}

/// The sale currently reflected by a sold phone: the most recently created
/// sale of the phone, later entries winning ties.
pub fn active_sale<'a>(phone: &Phone, sales: &'a [Sale]) -> Option<&'a Sale> {
    if !phone.is_sold() {
        return None;
    }
    sales
        .iter()
        .filter(|s| s.phone_id == phone.id)
        .fold(None::<&Sale>, |best, candidate| match best {
            Some(current) if current.created_at > candidate.created_at => Some(current),
            _ => Some(candidate),
        })
}

// =============================================================================
// Returns
// =============================================================================

/// Rejects returns of an in-stock phone.
pub fn ensure_returnable(phone: &Phone) -> CoreResult<()> {
    if !phone.is_sold() {
        return Err(CoreError::NotSold {
            phone_id: phone.id.clone(),
        });
    }
    Ok(())
}

/// Builds the return record reversing `sale_id`.
pub fn plan_return(
    phone: &Phone,
    sale_id: &str,
    input: &ReturnInput,
    return_date: String,
    now: DateTime<Utc>,
) -> Return {
    Return {
        id: String::new(),
        tenant_id: phone.tenant_id.clone(),
        sale_id: sale_id.to_string(),
        phone_id: phone.id.clone(),
        return_type: input.return_type,
        return_price_cents: input.return_price_cents,
        new_price_cents: input.new_price_cents,
        return_reason: non_blank(input.return_reason.clone()),
        return_date,
        created_at: now,
    }
}

/// Puts a phone back on the shelf and clears every sale mirror.
///
/// `new_price` becomes the cost basis of the next sale. Restore passes
/// `None` because imported phones already carry their final price.
pub fn reset_after_return(phone: &mut Phone, new_price_cents: Option<i64>, now: DateTime<Utc>) {
    phone.status = PhoneStatus::InStock;
    phone.sale_date = None;
    phone.sale_price_cents = None;
    phone.receipt_number = None;
    phone.customer_name = None;
    phone.payment_method = None;
    phone.is_credit = false;
    phone.credit_received_cents = None;
    phone.credit_remaining_cents = None;
    if let Some(price) = new_price_cents {
        phone.purchase_price_cents = price;
    }
    phone.updated_at = now;
}

/// Cancels the credit of a returned sale.
///
/// Whatever was already received stays on the record and is not refunded;
/// the amount still owed is written off.
pub fn cancel_credit(credit: &mut Credit, now: DateTime<Utc>) {
    credit.status = CreditStatus::Cancelled;
    credit.remaining_amount_cents = 0;
    credit.updated_at = now;
}

// =============================================================================
// Credit Payments
// =============================================================================

/// Applies a payment to a credit.
///
/// ## Errors
/// - `InvalidAmount` if `amount <= 0`
/// - `ExceedsRemaining` if `amount > remaining` (always the case for a
///   cancelled credit, whose remaining amount is zero)
pub fn apply_payment(credit: &mut Credit, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount {
            amount_cents: amount.cents(),
        });
    }
    if amount > credit.remaining() {
        return Err(CoreError::ExceedsRemaining {
            amount_cents: amount.cents(),
            remaining_cents: credit.remaining_amount_cents,
        });
    }

    let received = credit.received() + amount;
    let remaining = credit.remaining() - amount;
    credit.received_amount_cents = received.cents();
    credit.remaining_amount_cents = remaining.cents();
    credit.status = CreditStatus::derive(false, remaining);
    credit.updated_at = now;
    Ok(())
}

/// Builds the ledger entry for an applied payment.
pub fn plan_payment(
    credit: &Credit,
    amount: Money,
    payment_date: String,
    payment_method: Option<String>,
    now: DateTime<Utc>,
) -> CreditPayment {
    CreditPayment {
        id: String::new(),
        tenant_id: credit.tenant_id.clone(),
        credit_id: credit.id.clone(),
        amount_cents: amount.cents(),
        payment_date,
        payment_method: non_blank(payment_method),
        created_at: now,
    }
}

/// Copies a credit's received/remaining figures onto its sale.
pub fn mirror_credit_on_sale(sale: &mut Sale, credit: &Credit) {
    sale.credit_received_cents = credit.received_amount_cents;
    sale.credit_remaining_cents = credit.remaining_amount_cents;
}

/// Copies a credit's received/remaining figures onto its phone.
pub fn mirror_credit_on_phone(phone: &mut Phone, credit: &Credit, now: DateTime<Utc>) {
    phone.is_credit = true;
    phone.credit_received_cents = Some(credit.received_amount_cents);
    phone.credit_remaining_cents = Some(credit.remaining_amount_cents);
    phone.updated_at = now;
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReturnType;

    fn phone(price: i64) -> Phone {
        let mut phone = new_phone(
            "t",
            NewPhone {
                imei1: "35-0000 0000".to_string(),
                model: " iPhone 12 ".to_string(),
                purchase_price_cents: price,
                color: Some("  ".to_string()),
                ..Default::default()
            },
            "2026-01-01".to_string(),
            Utc::now(),
        );
        phone.id = "p1".to_string();
        phone
    }

    fn sale_input(price: i64) -> SaleInput {
        SaleInput {
            sale_price_cents: price,
            customer_name: Some("Amina".to_string()),
            payment_method: Some("cash".to_string()),
            ..Default::default()
        }
    }

    fn sell(phone: &mut Phone, input: &SaleInput, tag: ResaleTag) -> Sale {
        let mut sale = plan_sale(
            phone,
            input,
            tag,
            "2026-01-10".to_string(),
            "RCP-20260110-001".to_string(),
            Utc::now(),
        )
        .unwrap();
        sale.id = "s1".to_string();
        mirror_sale(phone, &sale, Utc::now());
        sale
    }

    #[test]
    fn test_new_phone_normalizes_input() {
        let phone = phone(100);
        assert_eq!(phone.imei1, "3500000000");
        assert_eq!(phone.model, "iPhone 12");
        assert_eq!(phone.color, None);
        assert_eq!(phone.status, PhoneStatus::InStock);
    }

    #[test]
    fn test_sale_freezes_profit_and_mirrors_phone() {
        let mut phone = phone(10_000);
        let sale = sell(&mut phone, &sale_input(15_000), ResaleTag::fresh());

        assert_eq!(sale.profit_cents, 5_000);
        assert!(!sale.is_resale);
        assert!(phone.is_sold());
        assert_eq!(phone.sale_price_cents, Some(15_000));
        assert_eq!(phone.receipt_number.as_deref(), Some("RCP-20260110-001"));
        assert_eq!(phone.credit_remaining_cents, None);
        assert!(plan_credit(&sale, Utc::now()).is_none());
    }

    #[test]
    fn test_sold_phone_rejects_sale_and_edit() {
        let mut phone = phone(100);
        sell(&mut phone, &sale_input(150), ResaleTag::fresh());

        let err = plan_sale(
            &phone,
            &sale_input(200),
            ResaleTag::fresh(),
            String::new(),
            String::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::AlreadySold { .. }));
        assert!(matches!(
            ensure_editable(&phone),
            Err(CoreError::Immutable { .. })
        ));
    }

    #[test]
    fn test_credit_sale_opens_pending_credit() {
        let mut phone = phone(30_000);
        let input = SaleInput {
            is_credit: true,
            received_amount_cents: 20_000,
            ..sale_input(50_000)
        };
        let sale = sell(&mut phone, &input, ResaleTag::fresh());
        let credit = plan_credit(&sale, Utc::now()).unwrap();

        assert_eq!(credit.total_amount_cents, 50_000);
        assert_eq!(credit.remaining_amount_cents, 30_000);
        assert_eq!(credit.status, CreditStatus::Pending);
        assert_eq!(credit.sale_id, "s1");
        assert_eq!(phone.credit_remaining_cents, Some(30_000));
    }

    #[test]
    fn test_fully_paid_credit_sale_is_paid() {
        let mut phone = phone(100);
        let input = SaleInput {
            is_credit: true,
            received_amount_cents: 500,
            ..sale_input(500)
        };
        let sale = sell(&mut phone, &input, ResaleTag::fresh());
        assert_eq!(
            plan_credit(&sale, Utc::now()).unwrap().status,
            CreditStatus::Paid
        );
    }

    #[test]
    fn test_return_resets_phone_and_sets_cost_basis() {
        let mut phone = phone(10_000);
        sell(&mut phone, &sale_input(15_000), ResaleTag::fresh());
        ensure_returnable(&phone).unwrap();

        let input = ReturnInput {
            return_type: ReturnType::Refund,
            return_price_cents: 14_000,
            new_price_cents: 9_000,
            ..Default::default()
        };
        let ret = plan_return(&phone, "s1", &input, "2026-01-12".to_string(), Utc::now());
        reset_after_return(&mut phone, Some(ret.new_price_cents), Utc::now());

        assert_eq!(phone.status, PhoneStatus::InStock);
        assert_eq!(phone.purchase_price_cents, 9_000);
        assert_eq!(phone.sale_price_cents, None);
        assert_eq!(phone.customer_name, None);
        assert!(!phone.has_sale_marker());
        assert!(matches!(
            ensure_returnable(&phone),
            Err(CoreError::NotSold { .. })
        ));
    }

    #[test]
    fn test_resale_profit_uses_new_cost_basis() {
        let mut phone = phone(9_000);
        let tag = ResaleTag {
            is_resale: true,
            original_return_id: Some("r1".to_string()),
        };
        let sale = sell(&mut phone, &sale_input(13_000), tag);
        assert_eq!(sale.profit_cents, 4_000);
        assert!(sale.is_resale);
        assert_eq!(sale.original_return_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_payment_bounds() {
        let mut phone = phone(100);
        let input = SaleInput {
            is_credit: true,
            received_amount_cents: 20_000,
            ..sale_input(50_000)
        };
        let sale = sell(&mut phone, &input, ResaleTag::fresh());
        let mut credit = plan_credit(&sale, Utc::now()).unwrap();

        assert!(matches!(
            apply_payment(&mut credit, Money::zero(), Utc::now()),
            Err(CoreError::InvalidAmount { amount_cents: 0 })
        ));
        assert!(matches!(
            apply_payment(&mut credit, Money::from_cents(30_001), Utc::now()),
            Err(CoreError::ExceedsRemaining {
                remaining_cents: 30_000,
                ..
            })
        ));
        assert_eq!(credit.remaining_amount_cents, 30_000);

        apply_payment(&mut credit, Money::from_cents(30_000), Utc::now()).unwrap();
        assert_eq!(credit.remaining_amount_cents, 0);
        assert_eq!(credit.status, CreditStatus::Paid);
        assert_eq!(
            credit.received_amount_cents + credit.remaining_amount_cents,
            credit.total_amount_cents
        );
    }

    #[test]
    fn test_cancelled_credit_keeps_received_amount() {
        let mut phone = phone(100);
        let input = SaleInput {
            is_credit: true,
            received_amount_cents: 200,
            ..sale_input(500)
        };
        let sale = sell(&mut phone, &input, ResaleTag::fresh());
        let mut credit = plan_credit(&sale, Utc::now()).unwrap();
        cancel_credit(&mut credit, Utc::now());

        assert_eq!(credit.status, CreditStatus::Cancelled);
        assert_eq!(credit.remaining_amount_cents, 0);
        assert_eq!(credit.received_amount_cents, 200);
        assert!(apply_payment(&mut credit, Money::from_cents(1), Utc::now()).is_err());
    }

    #[test]
    fn test_delete_guard() {
        let mut phone = phone(100);
        assert!(ensure_deletable(&phone, 0).is_ok());
        assert!(matches!(
            ensure_deletable(&phone, 1),
            Err(CoreError::SaleHistory { .. })
        ));

        phone.sale_date = Some("01/01/2026".to_string());
        assert!(ensure_deletable(&phone, 0).is_err());

        let mut sold = self::phone(100);
        sell(&mut sold, &sale_input(150), ResaleTag::fresh());
        assert!(ensure_deletable(&sold, 1).is_ok());
    }

    #[test]
    fn test_active_sale_is_latest_for_phone() {
        let mut phone = phone(100);
        let first = sell(&mut phone, &sale_input(150), ResaleTag::fresh());
        let mut second = first.clone();
        second.id = "s2".to_string();
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        let mut other = first.clone();
        other.id = "s3".to_string();
        other.phone_id = "p2".to_string();

        let sales = vec![second.clone(), first, other];
        assert_eq!(active_sale(&phone, &sales).map(|s| s.id.as_str()), Some("s2"));
    }
}
