//! Cardholder data handling.
//!
//! Raw card data arrives as [`CardDetails`] and is consumed by
//! [`CreditCard::new`]. The resulting value keeps only the trailing digits
//! of the PAN; the full number and CVV are dropped when construction ends.

use chrono::{DateTime, Datelike, Utc};

use crate::error::DomainError;

/// Number of trailing PAN digits retained for display and reconciliation.
pub const LAST_DIGITS_LEN: usize = 4;

const MIN_PAN_LEN: usize = 12;
const MAX_PAN_LEN: usize = 19;

/// Raw card data as submitted by a client.
///
/// Never stored; `Debug` output masks the number and CVV.
#[derive(Clone)]
pub struct CardDetails {
    pub number: String,
    pub holder_name: String,
    pub expiration_month: u32,
    pub expiration_year: i32,
    pub cvv: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &"****")
            .field("holder_name", &self.holder_name)
            .field("expiration_month", &self.expiration_month)
            .field("expiration_year", &self.expiration_year)
            .field("cvv", &"***")
            .finish()
    }
}

/// A validated card with its sensitive fields already discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditCard {
    holder_name: String,
    expiration_month: u32,
    expiration_year: i32,
    last_digits: String,
}

impl CreditCard {
    /// Validates card data against the current time.
    pub fn new(
        number: &str,
        holder_name: &str,
        expiration_month: u32,
        expiration_year: i32,
        cvv: &str,
    ) -> Result<Self, DomainError> {
        Self::new_at(
            number,
            holder_name,
            expiration_month,
            expiration_year,
            cvv,
            Utc::now(),
        )
    }

    /// Validates card data against an explicit instant.
    pub fn new_at(
        number: &str,
        holder_name: &str,
        expiration_month: u32,
        expiration_year: i32,
        cvv: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if !(1..=12).contains(&expiration_month) {
            return Err(DomainError::InvalidCard(
                "expiration month must be between 1 and 12".into(),
            ));
        }

        // A card is valid through the last day of its expiration month.
        if (expiration_year, expiration_month) < (now.year(), now.month()) {
            return Err(DomainError::InvalidCard("card is expired".into()));
        }

        let digits: String = number
            .chars()
            .filter(|c| *c != ' ' && *c != '-')
            .collect();
        if digits.is_empty() {
            return Err(DomainError::InvalidCard("card number is required".into()));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidCard(
                "card number must contain only digits".into(),
            ));
        }
        if !(MIN_PAN_LEN..=MAX_PAN_LEN).contains(&digits.len()) {
            return Err(DomainError::InvalidCard(format!(
                "card number must have between {MIN_PAN_LEN} and {MAX_PAN_LEN} digits"
            )));
        }

        if cvv.trim().is_empty() {
            return Err(DomainError::InvalidCard("cvv is required".into()));
        }

        Ok(Self {
            holder_name: holder_name.trim().to_string(),
            expiration_month,
            expiration_year,
            last_digits: digits[digits.len() - LAST_DIGITS_LEN..].to_string(),
        })
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn expiration_month(&self) -> u32 {
        self.expiration_month
    }

    pub fn expiration_year(&self) -> i32 {
        self.expiration_year
    }

    /// Trailing digits of the card number.
    pub fn last_digits(&self) -> &str {
        &self.last_digits
    }
}

impl TryFrom<CardDetails> for CreditCard {
    type Error = DomainError;

    fn try_from(details: CardDetails) -> Result<Self, Self::Error> {
        CreditCard::new(
            &details.number,
            &details.holder_name,
            details.expiration_month,
            details.expiration_year,
            &details.cvv,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_2030() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_keeps_last_four_digits() {
        let card = CreditCard::new("4111111111111111", "John Doe", 12, 2099, "123").unwrap();
        assert_eq!(card.last_digits(), "1111");
        assert_eq!(card.holder_name(), "John Doe");
    }

    #[test]
    fn test_strips_separators() {
        let card = CreditCard::new("4111 1111-1111 4242", "J", 1, 2099, "1").unwrap();
        assert_eq!(card.last_digits(), "4242");
    }

    #[test]
    fn test_month_out_of_range() {
        for month in [0, 13] {
            let result = CreditCard::new("4111111111111111", "J", month, 2099, "123");
            assert!(matches!(result, Err(DomainError::InvalidCard(_))));
        }
    }

    #[test]
    fn test_expiry_is_inclusive_of_current_month() {
        let now = june_2030();
        assert!(CreditCard::new_at("4111111111111111", "J", 6, 2030, "123", now).is_ok());
        assert!(matches!(
            CreditCard::new_at("4111111111111111", "J", 5, 2030, "123", now),
            Err(DomainError::InvalidCard(_))
        ));
        assert!(matches!(
            CreditCard::new_at("4111111111111111", "J", 12, 2029, "123", now),
            Err(DomainError::InvalidCard(_))
        ));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        for number in ["", "   ", "4111abcd11111111", "41111111111", "41111111111111111111"] {
            let result = CreditCard::new(number, "J", 12, 2099, "123");
            assert!(
                matches!(result, Err(DomainError::InvalidCard(_))),
                "{number:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_blank_cvv_rejected() {
        let result = CreditCard::new("4111111111111111", "J", 12, 2099, " ");
        assert!(matches!(result, Err(DomainError::InvalidCard(_))));
    }

    #[test]
    fn test_card_details_debug_is_masked() {
        let details = CardDetails {
            number: "4111111111111111".into(),
            holder_name: "John Doe".into(),
            expiration_month: 12,
            expiration_year: 2099,
            cvv: "987".into(),
        };
        let printed = format!("{details:?}");
        assert!(!printed.contains("4111111111111111"));
        assert!(!printed.contains("987"));
        assert!(printed.contains("John Doe"));
    }
}
