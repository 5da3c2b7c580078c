//! # Validation Module
//!
//! Input validation for the lifecycle operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API)                                            │
//! │  └── Deserialization into NewPhone / SaleInput / ReturnInput           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── IMEI normalization and format                                     │
//! │  └── Required fields, price and percentage ranges                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Lifecycle Engine                                             │
//! │  └── State rules (DuplicateImei, AlreadySold, ...)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Store                                                        │
//! │  └── UNIQUE (tenant_id, imei1)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written until every check in this module has passed.

use crate::error::ValidationError;
use crate::types::{NewPhone, PhonePatch, ReturnInput, SaleInput};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest IMEI accepted. Real IMEIs are 15 digits; some stores keep
/// serial numbers in the same slot.
pub const MAX_IMEI_LENGTH: usize = 20;

/// Longest model name accepted.
pub const MAX_MODEL_LENGTH: usize = 120;

/// Largest price accepted, in cents (ten billion in major units). Keeps
/// ledger-wide sums far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000_000;

// =============================================================================
// IMEI
// =============================================================================

/// Canonical form of an IMEI: whitespace and hyphens removed, upper-cased.
///
/// Duplicate checks compare canonical forms, so `"35-1234 567"` and
/// `"351234567"` are the same unit.
///
/// ## Example
/// ```rust
/// use resell_core::validation::normalize_imei;
///
/// assert_eq!(normalize_imei(" 35-12 34ab "), "351234AB");
/// ```
pub fn normalize_imei(imei: &str) -> String {
    imei.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Validates an already normalized IMEI.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - ASCII letters and digits only
pub fn validate_imei(field: &str, imei: &str) -> ValidationResult<()> {
    if imei.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if imei.len() > MAX_IMEI_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IMEI_LENGTH,
        });
    }

    if !imei.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Normalizes an optional second IMEI; blank input means "none".
pub fn normalize_optional_imei(imei: Option<&str>) -> Option<String> {
    imei.map(normalize_imei).filter(|s| !s.is_empty())
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a model name.
pub fn validate_model(model: &str) -> ValidationResult<()> {
    let model = model.trim();

    if model.is_empty() {
        return Err(ValidationError::Required {
            field: "model".to_string(),
        });
    }

    if model.chars().count() > MAX_MODEL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "model".to_string(),
            max: MAX_MODEL_LENGTH,
        });
    }

    Ok(())
}

/// Validates a price in cents: `0..=MAX_PRICE_CENTS`. Zero is allowed
/// (gifted stock, free swaps).
pub fn validate_price(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a battery health percentage.
///
/// ## Example
/// ```rust
/// use resell_core::validation::validate_battery_health;
///
/// assert!(validate_battery_health(87).is_ok());
/// assert!(validate_battery_health(101).is_err());
/// ```
pub fn validate_battery_health(percent: i64) -> ValidationResult<()> {
    if !(0..=100).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "batteryHealth".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Input Validators
// =============================================================================

/// Validates a new phone. IMEIs are expected in normalized form.
pub fn validate_new_phone(phone: &NewPhone) -> ValidationResult<()> {
    validate_imei("imei1", &phone.imei1)?;
    if let Some(imei2) = &phone.imei2 {
        validate_imei("imei2", imei2)?;
    }
    validate_model(&phone.model)?;
    validate_price("purchasePrice", phone.purchase_price_cents)?;
    if let Some(health) = phone.battery_health {
        validate_battery_health(health)?;
    }
    Ok(())
}

/// Validates the fields a patch sets. IMEIs are expected in normalized form.
pub fn validate_patch(patch: &PhonePatch) -> ValidationResult<()> {
    if let Some(imei1) = &patch.imei1 {
        validate_imei("imei1", imei1)?;
    }
    if let Some(imei2) = patch.imei2.as_deref().filter(|s| !s.is_empty()) {
        validate_imei("imei2", imei2)?;
    }
    if let Some(model) = &patch.model {
        validate_model(model)?;
    }
    if let Some(price) = patch.purchase_price_cents {
        validate_price("purchasePrice", price)?;
    }
    if let Some(health) = patch.battery_health {
        validate_battery_health(health)?;
    }
    Ok(())
}

/// Validates a sale.
///
/// A credit sale's down payment must lie within `0..=salePrice`; the
/// received amount is ignored for cash sales.
pub fn validate_sale(input: &SaleInput) -> ValidationResult<()> {
    validate_price("salePrice", input.sale_price_cents)?;
    if input.is_credit
        && !(0..=input.sale_price_cents).contains(&input.received_amount_cents)
    {
        return Err(ValidationError::OutOfRange {
            field: "receivedAmount".to_string(),
            min: 0,
            max: input.sale_price_cents,
        });
    }
    Ok(())
}

/// Validates a return.
pub fn validate_return(input: &ReturnInput) -> ValidationResult<()> {
    validate_price("returnPrice", input.return_price_cents)?;
    validate_price("newPrice", input.new_price_cents)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_imei() {
        assert_eq!(normalize_imei("35 1234-5678 9012"), "35123456789012");
        assert_eq!(normalize_imei("ab12"), "AB12");
        assert_eq!(normalize_optional_imei(Some("  ")), None);
        assert_eq!(normalize_optional_imei(Some("1-2")), Some("12".to_string()));
    }

    #[test]
    fn test_validate_imei() {
        assert!(validate_imei("imei1", "350000000000001").is_ok());
        assert!(matches!(
            validate_imei("imei1", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_imei("imei1", &"1".repeat(21)),
            Err(ValidationError::TooLong { max: 20, .. })
        ));
        assert!(matches!(
            validate_imei("imei2", "35/01"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_new_phone() {
        let mut phone = NewPhone {
            imei1: "350000000000001".to_string(),
            model: "iPhone 12".to_string(),
            purchase_price_cents: 10_000,
            battery_health: Some(91),
            ..Default::default()
        };
        assert!(validate_new_phone(&phone).is_ok());

        phone.model = "   ".to_string();
        assert!(matches!(
            validate_new_phone(&phone),
            Err(ValidationError::Required { ref field }) if field == "model"
        ));

        phone.model = "iPhone 12".to_string();
        phone.purchase_price_cents = -1;
        assert!(validate_new_phone(&phone).is_err());
    }

    #[test]
    fn test_prices_are_capped() {
        assert!(validate_price("salePrice", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price("salePrice", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));

        let phone = NewPhone {
            imei1: "350000000000001".to_string(),
            model: "iPhone 12".to_string(),
            purchase_price_cents: i64::MAX,
            ..Default::default()
        };
        assert!(validate_new_phone(&phone).is_err());
    }

    #[test]
    fn test_validate_sale_credit_bounds() {
        let mut sale = SaleInput {
            sale_price_cents: 50_000,
            is_credit: true,
            received_amount_cents: 20_000,
            ..Default::default()
        };
        assert!(validate_sale(&sale).is_ok());

        sale.received_amount_cents = 50_001;
        assert!(validate_sale(&sale).is_err());

        sale.received_amount_cents = -1;
        assert!(validate_sale(&sale).is_err());

        // Ignored for cash sales.
        sale.is_credit = false;
        assert!(validate_sale(&sale).is_ok());
    }

    #[test]
    fn test_validate_patch_only_checks_set_fields() {
        assert!(validate_patch(&PhonePatch::default()).is_ok());

        let patch = PhonePatch {
            imei2: Some(String::new()),
            battery_health: Some(100),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_ok());

        let patch = PhonePatch {
            battery_health: Some(-3),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_err());
    }
}
