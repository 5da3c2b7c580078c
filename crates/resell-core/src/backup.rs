//! # Backup Document
//!
//! Portable JSON form of one tenant's entity graph, and the checks that
//! gate a restore.
//!
//! ## Format
//! ```text
//! {
//!   "phones":         [ Phone, ... ],          required
//!   "sales":          [ Sale, ... ],           required
//!   "returns":        [ Return, ... ],         required
//!   "credits":        [ Credit, ... ],         optional
//!   "creditPayments": [ CreditPayment, ... ],  optional
//!   "exportDate":     "2026-05-20T10:00:00Z",
//!   "version":        "1.0.0"
//! }
//! ```
//!
//! ## Validation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  serde_json::Value                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Structure: top-level object, required arrays present               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Records: every element decodes (errors collected per element)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. References: sale→phone, return→sale, credit→phone/sale,           │
//! │     no duplicate ids                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ValidatedBackup { document, warnings }                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each stage reports every problem it finds, not just the first.
//! Version differences only produce a warning.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::query::Record;
use crate::types::{Credit, CreditPayment, Phone, Return, Sale, Snapshot};

/// Version written into every exported document.
pub const BACKUP_FORMAT_VERSION: &str = "1.0.0";

// =============================================================================
// Document
// =============================================================================

/// A full export of one tenant, original identifiers included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BackupDocument {
    pub phones: Vec<Phone>,
    pub sales: Vec<Sale>,
    pub returns: Vec<Return>,
    #[serde(default)]
    pub credits: Vec<Credit>,
    #[serde(default)]
    pub credit_payments: Vec<CreditPayment>,
    #[ts(as = "String")]
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl BackupDocument {
    /// Wraps a snapshot for export.
    pub fn from_snapshot(snapshot: Snapshot, export_date: DateTime<Utc>) -> Self {
        BackupDocument {
            phones: snapshot.phones,
            sales: snapshot.sales,
            returns: snapshot.returns,
            credits: snapshot.credits,
            credit_payments: snapshot.credit_payments,
            export_date,
            version: BACKUP_FORMAT_VERSION.to_string(),
        }
    }

    /// Total number of records of every kind.
    pub fn record_count(&self) -> usize {
        self.phones.len()
            + self.sales.len()
            + self.returns.len()
            + self.credits.len()
            + self.credit_payments.len()
    }
}

/// A document that passed every check, plus non-fatal findings.
#[derive(Debug, Clone)]
pub struct ValidatedBackup {
    pub document: BackupDocument,
    pub warnings: Vec<String>,
}

// =============================================================================
// Validation
// =============================================================================

/// Checks a decoded JSON value and turns it into a [`BackupDocument`].
///
/// ## Errors
/// `ValidationFailed` with every structural, record-level or referential
/// problem found.
pub fn validate_document(value: &Value) -> CoreResult<ValidatedBackup> {
    let Some(root) = value.as_object() else {
        return Err(CoreError::ValidationFailed(vec![
            "backup must be a JSON object".to_string(),
        ]));
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let phones: Vec<Phone> = decode_array(root.get("phones"), "phones", true, &mut errors);
    let sales: Vec<Sale> = decode_array(root.get("sales"), "sales", true, &mut errors);
    let returns: Vec<Return> = decode_array(root.get("returns"), "returns", true, &mut errors);
    let credits: Vec<Credit> = decode_array(root.get("credits"), "credits", false, &mut errors);
    let credit_payments: Vec<CreditPayment> = decode_array(
        root.get("creditPayments"),
        "creditPayments",
        false,
        &mut errors,
    );

    let version = match root.get("version").and_then(Value::as_str) {
        Some(version) => {
            if version != BACKUP_FORMAT_VERSION {
                warnings.push(format!(
                    "backup version {} differs from {}; importing anyway",
                    version, BACKUP_FORMAT_VERSION
                ));
            }
            version.to_string()
        }
        None => {
            warnings.push("backup has no version; importing anyway".to_string());
            String::new()
        }
    };

    let export_date = root
        .get("exportDate")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
            warnings.push("backup has no readable exportDate".to_string());
            DateTime::<Utc>::default()
        });

    if !errors.is_empty() {
        return Err(CoreError::ValidationFailed(errors));
    }

    let document = BackupDocument {
        phones,
        sales,
        returns,
        credits,
        credit_payments,
        export_date,
        version,
    };

    check_references(&document, &mut errors, &mut warnings);
    if !errors.is_empty() {
        return Err(CoreError::ValidationFailed(errors));
    }

    Ok(ValidatedBackup { document, warnings })
}

fn decode_array<T: DeserializeOwned>(
    value: Option<&Value>,
    name: &str,
    required: bool,
    errors: &mut Vec<String>,
) -> Vec<T> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None if !required => return Vec::new(),
        Some(_) => {
            errors.push(format!("`{}` must be an array", name));
            return Vec::new();
        }
        None => {
            errors.push(format!("missing `{}` array", name));
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                errors.push(format!("{}[{}]: {}", name, index, e));
                None
            }
        })
        .collect()
}

fn check_references(doc: &BackupDocument, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let phone_ids = unique_ids(&doc.phones, "phones", errors);
    let sale_ids = unique_ids(&doc.sales, "sales", errors);
    unique_ids(&doc.returns, "returns", errors);
    let credit_ids = unique_ids(&doc.credits, "credits", errors);

    for (i, sale) in doc.sales.iter().enumerate() {
        if !phone_ids.contains(sale.phone_id.as_str()) {
            errors.push(format!(
                "sales[{}] ({}) references missing phone {}",
                i, sale.id, sale.phone_id
            ));
        }
    }

    for (i, ret) in doc.returns.iter().enumerate() {
        if !sale_ids.contains(ret.sale_id.as_str()) {
            errors.push(format!(
                "returns[{}] ({}) references missing sale {}",
                i, ret.id, ret.sale_id
            ));
        }
    }

    for (i, credit) in doc.credits.iter().enumerate() {
        if !phone_ids.contains(credit.phone_id.as_str()) {
            errors.push(format!(
                "credits[{}] ({}) references missing phone {}",
                i, credit.id, credit.phone_id
            ));
        }
        if !sale_ids.contains(credit.sale_id.as_str()) {
            errors.push(format!(
                "credits[{}] ({}) references missing sale {}",
                i, credit.id, credit.sale_id
            ));
        }
    }

    // Payments are never replayed, so a dangling one is only noted.
    let dangling = doc
        .credit_payments
        .iter()
        .filter(|p| !credit_ids.contains(p.credit_id.as_str()))
        .count();
    if dangling > 0 {
        warnings.push(format!(
            "{} credit payment(s) reference missing credits",
            dangling
        ));
    }
}

fn unique_ids<'a, R: Record>(
    records: &'a [R],
    name: &str,
    errors: &mut Vec<String>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id()) {
            errors.push(format!("{} contains duplicate id {}", name, record.id()));
        }
    }
    seen
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phone(id: &str) -> Value {
        json!({
            "id": id,
            "imei1": format!("IMEI{id}"),
            "model": "Pixel 7",
            "purchaseDate": "01/02/2026",
            "purchasePriceCents": 10000
        })
    }

    fn sale(id: &str, phone_id: &str) -> Value {
        json!({
            "id": id,
            "phoneId": phone_id,
            "salePriceCents": 15000,
            "saleDate": "02/02/2026",
            "profitCents": 5000,
            "receiptNumber": "RCP-20260202-001"
        })
    }

    fn document(phones: Vec<Value>, sales: Vec<Value>) -> Value {
        json!({
            "phones": phones,
            "sales": sales,
            "returns": [],
            "exportDate": "2026-05-20T10:00:00Z",
            "version": BACKUP_FORMAT_VERSION
        })
    }

    fn problems(result: CoreResult<ValidatedBackup>) -> Vec<String> {
        match result {
            Err(CoreError::ValidationFailed(problems)) => problems,
            other => panic!("expected ValidationFailed, got {:?}", other.map(|v| v.warnings)),
        }
    }

    #[test]
    fn test_valid_document() {
        let validated =
            validate_document(&document(vec![phone("p1")], vec![sale("s1", "p1")])).unwrap();
        assert!(validated.warnings.is_empty());
        assert_eq!(validated.document.phones.len(), 1);
        assert_eq!(validated.document.sales[0].phone_id, "p1");
        assert!(validated.document.credits.is_empty());
    }

    #[test]
    fn test_missing_arrays_are_all_reported() {
        let problems = problems(validate_document(&json!({ "credits": {} })));
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p == "missing `phones` array"));
        assert!(problems.iter().any(|p| p == "missing `returns` array"));
        assert!(problems.iter().any(|p| p == "`credits` must be an array"));
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(problems(validate_document(&json!([1, 2]))).len(), 1);
    }

    #[test]
    fn test_broken_references_are_accumulated() {
        let mut doc = document(
            vec![phone("p1")],
            vec![sale("s1", "p1"), sale("s2", "p404"), sale("s3", "p405")],
        );
        doc["returns"] = json!([{
            "id": "r1",
            "saleId": "s404",
            "phoneId": "p1",
            "returnPriceCents": 0,
            "newPriceCents": 0,
            "returnDate": "2026-02-03"
        }]);

        let problems = problems(validate_document(&doc));
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("p404"));
        assert!(problems[1].contains("p405"));
        assert!(problems[2].contains("s404"));
    }

    #[test]
    fn test_undecodable_record_is_reported_with_index() {
        let mut bad = phone("p2");
        bad["purchasePriceCents"] = json!("lots");
        let problems = problems(validate_document(&document(vec![phone("p1"), bad], vec![])));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("phones[1]"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let problems = problems(validate_document(&document(
            vec![phone("p1"), phone("p1")],
            vec![],
        )));
        assert!(problems[0].contains("duplicate id p1"));
    }

    #[test]
    fn test_version_mismatch_only_warns() {
        let mut doc = document(vec![phone("p1")], vec![]);
        doc["version"] = json!("0.9.0");
        let validated = validate_document(&doc).unwrap();
        assert_eq!(validated.warnings.len(), 1);
        assert!(validated.warnings[0].contains("0.9.0"));
    }

    #[test]
    fn test_export_shape() {
        let snapshot = Snapshot::default();
        let doc = BackupDocument::from_snapshot(snapshot, Utc::now());
        let json = serde_json::to_value(&doc).unwrap();
        for key in ["phones", "sales", "returns", "credits", "creditPayments", "exportDate"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["version"], BACKUP_FORMAT_VERSION);
        assert_eq!(doc.record_count(), 0);
    }
}
