//! Monetary arithmetic shared by the financial value objects.
//!
//! All amounts are [`Decimal`]s. Derived monetary values are rounded to two
//! decimal places, midpoint away from zero, and compared against each other
//! with the fixed absolute [`TOLERANCE`].

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Absolute tolerance used by every derived-value consistency check (0.01).
///
/// This is part of the public contract: a stored snapshot whose derived fields
/// differ from the recomputed ones by more than this is rejected.
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Number of decimal places monetary results are rounded to.
pub const MONEY_SCALE: u32 = 2;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a monetary amount to [`MONEY_SCALE`] places.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether `a` and `b` agree within [`TOLERANCE`].
///
/// Amounts too far apart to subtract are never consistent.
pub fn is_consistent(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|d| d.abs() <= TOLERANCE)
}

fn out_of_range(parameter: &'static str) -> DomainError {
    DomainError::invalid_argument(parameter, "amount out of range")
}

/// `a + b`, failing with `InvalidArgument` on overflow.
pub fn checked_add(parameter: &'static str, a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(parameter))
}

/// `a - b`, failing with `InvalidArgument` on overflow.
pub fn checked_sub(parameter: &'static str, a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| out_of_range(parameter))
}

/// `a × b`, failing with `InvalidArgument` on overflow.
pub fn checked_mul(parameter: &'static str, a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(parameter))
}

/// `base × rate / 100`, unrounded.
pub fn percentage_of_exact(
    parameter: &'static str,
    base: Decimal,
    rate: Decimal,
) -> DomainResult<Decimal> {
    Ok(checked_mul(parameter, base, rate)? / ONE_HUNDRED)
}

/// `base × rate / 100`, rounded to money precision.
pub fn percentage_of(parameter: &'static str, base: Decimal, rate: Decimal) -> DomainResult<Decimal> {
    percentage_of_exact(parameter, base, rate).map(round_money)
}

/// `part / whole × 100`, unrounded. `None` when `whole` is zero or the ratio
/// is not representable.
pub fn ratio_percent(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)?.checked_mul(ONE_HUNDRED)
}
