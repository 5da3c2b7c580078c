//! # Resale Detector
//!
//! Classifies a new sale as a fresh sale or the resale of a unit that came
//! back through a return.
//!
//! ```text
//!   returns of the phone            ResaleTag
//!   ─────────────────────           ─────────────────────────────────────
//!   []                        ──►   { is_resale: false, original: None }
//!   [r1 (Jan), r2 (Mar)]      ──►   { is_resale: true,  original: r2 }
//! ```
//!
//! When the lookup of returns fails the engine calls [`ResaleTag::fresh`]
//! and keeps going; recording the sale matters more than tagging it.

use crate::types::Return;

/// Resale classification of a sale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResaleTag {
    pub is_resale: bool,
    /// Most recent return of the phone, present iff `is_resale`.
    pub original_return_id: Option<String>,
}

impl ResaleTag {
    /// Tag of a unit sold for the first time.
    pub fn fresh() -> Self {
        Self::default()
    }
}

/// Classifies a sale of `phone_id` given previously recorded returns.
///
/// Returns of other phones are ignored. The most recent return by
/// `created_at` wins; on equal timestamps the later one in `returns` wins,
/// which is insertion order for store results.
pub fn detect_resale(phone_id: &str, returns: &[Return]) -> ResaleTag {
    let latest = returns
        .iter()
        .filter(|r| r.phone_id == phone_id)
        .fold(None::<&Return>, |best, candidate| match best {
            Some(current) if current.created_at > candidate.created_at => Some(current),
            _ => Some(candidate),
        });

    match latest {
        Some(ret) => ResaleTag {
            is_resale: true,
            original_return_id: Some(ret.id.clone()),
        },
        None => ResaleTag::fresh(),
    }
}
