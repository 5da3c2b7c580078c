//! Receipt numbers: `RCP-YYYYMMDD-NNN`.
//!
//! `NNN` is a zero-padded random value in `0..=999`. Uniqueness is best
//! effort; a shop writing a handful of sales a day rarely collides, and a
//! collision only affects the printed receipt, not any record link.

use chrono::NaiveDate;
use rand::Rng;

/// Prefix of every generated receipt number.
pub const RECEIPT_PREFIX: &str = "RCP";

/// Generates a receipt number for a sale on `date`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use resell_core::receipt::generate_receipt_number;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
/// let receipt = generate_receipt_number(date, &mut rand::thread_rng());
/// assert!(receipt.starts_with("RCP-20260315-"));
/// assert_eq!(receipt.len(), 16);
/// ```
pub fn generate_receipt_number<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(0..=999);
    format!("{}-{}-{:03}", RECEIPT_PREFIX, date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_format() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let receipt = generate_receipt_number(date, &mut rng);
            let (head, tail) = receipt.split_at(13);
            assert_eq!(head, "RCP-20260105-");
            assert_eq!(tail.len(), 3);
            assert!(tail.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
