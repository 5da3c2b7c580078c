//! # Query Predicates
//!
//! Storage-agnostic description of the filters the lifecycle engine needs:
//! status filters, foreign-key lookups, substring search over IMEI/model,
//! and date or amount ranges.
//!
//! ## One Predicate, Two Evaluators
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Filter::and([Eq("status","sold"), Contains("model","pixel")])          │
//! │        │                                        │                       │
//! │        ▼                                        ▼                       │
//! │  Embedded store                            SQLite store                 │
//! │  filter.matches(&record)                   WHERE status = ?             │
//! │  (Record::value per column)                  AND LOWER(model) LIKE ?    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both evaluators must agree, so the semantics live here: `Contains` is a
//! case-insensitive substring test, `Between` is inclusive on both ends,
//! and `Eq` against [`FieldValue::Null`] means "is null".

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

// =============================================================================
// Record
// =============================================================================

/// A row type that the entity stores can persist.
///
/// `COLUMNS` lists the persisted columns in a fixed order, starting with
/// `id` and `tenant_id`; [`Record::values`] returns values in that order.
pub trait Record: Clone + Send + Sync + 'static {
    /// Table (or collection) name.
    const TABLE: &'static str;

    /// Human-readable entity name used in error messages.
    const ENTITY: &'static str;

    /// Persisted columns, `id` and `tenant_id` first.
    const COLUMNS: &'static [&'static str];

    /// Columns that must be unique per tenant (null values are exempt).
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn tenant_id(&self) -> &str;

    fn set_tenant_id(&mut self, tenant_id: &str);

    /// Column values aligned with [`Record::COLUMNS`].
    fn values(&self) -> Vec<FieldValue>;

    /// Value of a single column, `None` if the column is unknown.
    fn value(&self, column: &str) -> Option<FieldValue> {
        let index = Self::COLUMNS.iter().position(|c| *c == column)?;
        self.values().into_iter().nth(index)
    }

    /// Returns true if `column` is a persisted column of this record.
    fn has_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }
}

// =============================================================================
// Field Value
// =============================================================================

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Orders two values of the same kind; mixed kinds are unordered.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Sort key used by stores: nulls first, then natural order.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

// =============================================================================
// Filter
// =============================================================================

/// A predicate over the columns of one record type.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every record.
    All,
    /// Column equals value (`Null` means "is null").
    Eq {
        column: &'static str,
        value: FieldValue,
    },
    /// Case-insensitive substring match on a text column.
    Contains {
        column: &'static str,
        needle: String,
    },
    /// Inclusive range on a column.
    Between {
        column: &'static str,
        from: FieldValue,
        to: FieldValue,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<FieldValue>) -> Self {
        Filter::Eq {
            column,
            value: value.into(),
        }
    }

    pub fn contains(column: &'static str, needle: impl Into<String>) -> Self {
        Filter::Contains {
            column,
            needle: needle.into(),
        }
    }

    pub fn between(
        column: &'static str,
        from: impl Into<FieldValue>,
        to: impl Into<FieldValue>,
    ) -> Self {
        Filter::Between {
            column,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            current => Filter::And(vec![current, other]),
        }
    }

    /// Every column the filter refers to.
    pub fn columns(&self) -> Vec<&'static str> {
        match self {
            Filter::All => Vec::new(),
            Filter::Eq { column, .. }
            | Filter::Contains { column, .. }
            | Filter::Between { column, .. } => vec![*column],
            Filter::And(parts) | Filter::Or(parts) => {
                parts.iter().flat_map(Filter::columns).collect()
            }
        }
    }

    /// Evaluates the filter against a record in memory.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { column, value } => match record.value(column) {
                Some(actual) => {
                    if value.is_null() {
                        actual.is_null()
                    } else {
                        actual == *value
                    }
                }
                None => false,
            },
            Filter::Contains { column, needle } => match record.value(column) {
                Some(FieldValue::Text(text)) => {
                    text.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            Filter::Between { column, from, to } => match record.value(column) {
                Some(actual) if !actual.is_null() => {
                    let above = matches!(
                        actual.compare(from),
                        Some(Ordering::Greater | Ordering::Equal)
                    );
                    let below = matches!(
                        actual.compare(to),
                        Some(Ordering::Less | Ordering::Equal)
                    );
                    above && below
                }
                _ => false,
            },
            Filter::And(parts) => parts.iter().all(|f| f.matches(record)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(record)),
        }
    }
}

// =============================================================================
// Query
// =============================================================================

/// Sort order for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

/// A filter plus an optional sort order.
///
/// Rows that compare equal keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Every record, insertion order.
    pub fn all() -> Self {
        Query {
            filter: Filter::All,
            order_by: None,
        }
    }

    pub fn filter(filter: Filter) -> Self {
        Query {
            filter,
            order_by: None,
        }
    }

    /// Shorthand for `Query::filter(Filter::eq(column, value))`.
    pub fn where_eq(column: &'static str, value: impl Into<FieldValue>) -> Self {
        Query::filter(Filter::eq(column, value))
    }

    pub fn order_by(mut self, column: &'static str) -> Self {
        self.order_by = Some(OrderBy {
            column,
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, column: &'static str) -> Self {
        self.order_by = Some(OrderBy {
            column,
            descending: true,
        });
        self
    }

    /// Every column the query refers to (filter and sort).
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = self.filter.columns();
        if let Some(order) = &self.order_by {
            columns.push(order.column);
        }
        columns
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        id: String,
        tenant_id: String,
        model: String,
        price: i64,
        note: Option<String>,
    }

    impl Record for Row {
        const TABLE: &'static str = "rows";
        const ENTITY: &'static str = "Row";
        const COLUMNS: &'static [&'static str] = &["id", "tenant_id", "model", "price", "note"];

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
                self.model.clone().into(),
                self.price.into(),
                self.note.clone().into(),
            ]
        }
    }

    fn row(model: &str, price: i64, note: Option<&str>) -> Row {
        Row {
            id: "r1".to_string(),
            tenant_id: "t".to_string(),
            model: model.to_string(),
            price,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let filter = Filter::contains("model", "PIXEL");
        assert!(filter.matches(&row("Google Pixel 7", 100, None)));
        assert!(!filter.matches(&row("iPhone 13", 100, None)));
    }

    #[test]
    fn test_between_is_inclusive() {
        let filter = Filter::between("price", 100, 200);
        assert!(filter.matches(&row("a", 100, None)));
        assert!(filter.matches(&row("a", 200, None)));
        assert!(!filter.matches(&row("a", 201, None)));
    }

    #[test]
    fn test_eq_null_means_is_null() {
        let filter = Filter::eq("note", FieldValue::Null);
        assert!(filter.matches(&row("a", 1, None)));
        assert!(!filter.matches(&row("a", 1, Some("x"))));
    }

    #[test]
    fn test_unknown_column_never_matches() {
        assert!(!Filter::eq("color", "red").matches(&row("a", 1, None)));
    }

    #[test]
    fn test_and_or_composition() {
        let filter = Filter::Or(vec![
            Filter::contains("model", "iphone"),
            Filter::eq("price", 5),
        ])
        .and(Filter::eq("tenant_id", "t"));
        assert!(filter.matches(&row("iPhone 12", 1, None)));
        assert!(filter.matches(&row("Galaxy", 5, None)));
        assert!(!filter.matches(&row("Galaxy", 6, None)));
        assert_eq!(filter.columns(), vec!["model", "price", "tenant_id"]);
    }

    #[test]
    fn test_sort_cmp_puts_nulls_first() {
        assert_eq!(
            FieldValue::Null.sort_cmp(&FieldValue::Integer(1)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Integer(2).sort_cmp(&FieldValue::Integer(1)),
            Ordering::Greater
        );
    }
}
