//! Argument guards shared by constructors and factories.
//!
//! Each guard returns `InvalidArgument` named after the offending parameter.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Allowance for clock skew between the caller and this process when checking
/// that a business date is not in the future.
pub const CLOCK_SKEW_DAYS: u64 = 1;

pub fn positive_quantity(parameter: &'static str, quantity: u32) -> DomainResult<u32> {
    if quantity == 0 {
        return Err(DomainError::invalid_argument(parameter, "must be greater than zero"));
    }
    Ok(quantity)
}

pub fn positive_amount(parameter: &'static str, amount: Decimal) -> DomainResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::invalid_argument(
            parameter,
            format!("must be greater than zero (got {amount})"),
        ));
    }
    Ok(amount)
}

pub fn non_negative(parameter: &'static str, amount: Decimal) -> DomainResult<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::invalid_argument(
            parameter,
            format!("cannot be negative (got {amount})"),
        ));
    }
    Ok(amount)
}

/// A rate expressed in percent, `0 ..= 100` inclusive.
pub fn percentage(parameter: &'static str, rate: Decimal) -> DomainResult<Decimal> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(DomainError::invalid_argument(
            parameter,
            format!("must be between 0 and 100 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// A required, non-blank string of at most `max_len` characters (trimmed).
pub fn required_text(parameter: &'static str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument(parameter, "cannot be blank"));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(DomainError::invalid_argument(
            parameter,
            format!("cannot exceed {max_len} characters (got {len})"),
        ));
    }
    Ok(trimmed.to_string())
}

/// An optional string; when present it follows [`required_text`] rules.
pub fn optional_text(
    parameter: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> DomainResult<Option<String>> {
    value
        .map(|v| required_text(parameter, v, max_len))
        .transpose()
}

/// Rejects dates later than today plus [`CLOCK_SKEW_DAYS`].
pub fn not_in_future(parameter: &'static str, date: NaiveDate) -> DomainResult<NaiveDate> {
    let today = Utc::now().date_naive();
    let latest = today
        .checked_add_days(Days::new(CLOCK_SKEW_DAYS))
        .unwrap_or(NaiveDate::MAX);
    if date > latest {
        return Err(DomainError::invalid_argument(
            parameter,
            format!("cannot be in the future (got {date}, today is {today})"),
        ));
    }
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_bounds_are_inclusive() {
        assert!(percentage("tax_rate", dec!(0)).is_ok());
        assert!(percentage("tax_rate", dec!(100)).is_ok());
        assert!(percentage("tax_rate", dec!(100.01)).is_err());
        assert!(percentage("tax_rate", dec!(-0.01)).is_err());
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(required_text("name", "  Acme  ", 10).unwrap(), "Acme");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdefghijk", 10).is_err());
        assert_eq!(optional_text("name", None, 10).unwrap(), None);
    }

    #[test]
    fn future_dates_allow_one_day_of_skew() {
        let today = Utc::now().date_naive();
        assert!(not_in_future("date", today).is_ok());
        assert!(not_in_future("date", today + Days::new(1)).is_ok());
        let err = not_in_future("date", today + Days::new(3)).unwrap_err();
        assert_eq!(err.parameter(), Some("date"));
    }

    #[test]
    fn signs() {
        assert!(non_negative("amount", dec!(0)).is_ok());
        assert!(non_negative("amount", dec!(-1)).is_err());
        assert!(positive_amount("amount", dec!(0)).is_err());
        assert!(positive_quantity("quantity", 0).is_err());
        assert_eq!(positive_quantity("quantity", 1).unwrap(), 1);
    }
}
