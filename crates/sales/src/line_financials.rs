use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::money::{self, is_consistent};
use wholesale_core::{DomainError, DomainResult, ValueObject, guard};

/// Financial snapshot of a single order line.
///
/// Built by [`LineFinancials::calculate`] / [`LineFinancials::free_items`], or
/// reconstituted through [`LineFinancials::new`], which re-checks that
/// `extended_price ≈ unit_price × quantity` and
/// `tax_amount ≈ extended_price × tax_rate / 100` within [`money::TOLERANCE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LineFinancialsRecord")]
pub struct LineFinancials {
    quantity: u32,
    /// `None` for free items.
    unit_price: Option<Decimal>,
    tax_rate: Decimal,
    tax_amount: Decimal,
    line_profit: Decimal,
    extended_price: Decimal,
}

/// Stored shape of [`LineFinancials`]; converting it back re-runs validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFinancialsRecord {
    pub quantity: u32,
    pub unit_price: Option<Decimal>,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_profit: Decimal,
    pub extended_price: Decimal,
}

impl ValueObject for LineFinancials {}

impl LineFinancials {
    /// Reconstitute a snapshot from all six fields, rejecting inconsistent ones.
    pub fn new(
        quantity: u32,
        unit_price: Option<Decimal>,
        tax_rate: Decimal,
        tax_amount: Decimal,
        line_profit: Decimal,
        extended_price: Decimal,
    ) -> DomainResult<Self> {
        guard::positive_quantity("quantity", quantity)?;
        if let Some(price) = unit_price {
            guard::non_negative("unit_price", price)?;
        }
        guard::percentage("tax_rate", tax_rate)?;
        guard::non_negative("tax_amount", tax_amount)?;
        guard::non_negative("extended_price", extended_price)?;

        let expected_extended = money::checked_mul(
            "unit_price",
            Decimal::from(quantity),
            unit_price.unwrap_or(Decimal::ZERO),
        )?;
        if !is_consistent(extended_price, expected_extended) {
            return Err(DomainError::invalid_argument(
                "extended_price",
                format!(
                    "{extended_price} does not match quantity × unit price ({expected_extended})"
                ),
            ));
        }

        let expected_tax = money::percentage_of_exact("extended_price", extended_price, tax_rate)?;
        if !is_consistent(tax_amount, expected_tax) {
            return Err(DomainError::invalid_argument(
                "tax_amount",
                format!(
                    "{tax_amount} does not match extended price × tax rate ({})",
                    money::round_money(expected_tax)
                ),
            ));
        }

        // Keeps total_including_tax representable.
        money::checked_add("tax_amount", extended_price, tax_amount)?;

        Ok(Self {
            quantity,
            unit_price,
            tax_rate,
            tax_amount,
            line_profit,
            extended_price,
        })
    }

    /// Derive the snapshot for `quantity` items sold at `unit_price`
    /// (`None` = free) with `tax_rate` percent tax and the given cost per item.
    pub fn calculate(
        quantity: u32,
        unit_price: Option<Decimal>,
        tax_rate: Decimal,
        cost_price: Decimal,
    ) -> DomainResult<Self> {
        guard::positive_quantity("quantity", quantity)?;
        if let Some(price) = unit_price {
            guard::non_negative("unit_price", price)?;
        }
        guard::percentage("tax_rate", tax_rate)?;
        guard::non_negative("cost_price", cost_price)?;

        let qty = Decimal::from(quantity);
        let extended_price = money::round_money(money::checked_mul(
            "unit_price",
            qty,
            unit_price.unwrap_or(Decimal::ZERO),
        )?);
        let tax_amount = money::percentage_of("tax_rate", extended_price, tax_rate)?;
        let total_cost = money::checked_mul("cost_price", qty, cost_price)?;
        let line_profit =
            money::round_money(money::checked_sub("cost_price", extended_price, total_cost)?);

        Self::new(
            quantity,
            unit_price,
            tax_rate,
            tax_amount,
            line_profit,
            extended_price,
        )
    }

    /// Items given away: no unit price, no tax, a loss of the full cost.
    pub fn free_items(quantity: u32, cost_price: Option<Decimal>) -> DomainResult<Self> {
        Self::calculate(
            quantity,
            None,
            Decimal::ZERO,
            cost_price.unwrap_or(Decimal::ZERO),
        )
    }

    pub fn with_quantity(&self, quantity: u32, cost_price: Decimal) -> DomainResult<Self> {
        Self::calculate(quantity, self.unit_price, self.tax_rate, cost_price)
    }

    pub fn with_unit_price(
        &self,
        unit_price: Option<Decimal>,
        cost_price: Decimal,
    ) -> DomainResult<Self> {
        Self::calculate(self.quantity, unit_price, self.tax_rate, cost_price)
    }

    pub fn with_tax_rate(&self, tax_rate: Decimal, cost_price: Decimal) -> DomainResult<Self> {
        Self::calculate(self.quantity, self.unit_price, tax_rate, cost_price)
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        self.unit_price
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn line_profit(&self) -> Decimal {
        self.line_profit
    }

    pub fn extended_price(&self) -> Decimal {
        self.extended_price
    }

    /// Representable: `new` rejects snapshots whose sum would overflow.
    pub fn total_including_tax(&self) -> Decimal {
        self.extended_price + self.tax_amount
    }

    pub fn effective_unit_price(&self) -> Decimal {
        self.unit_price.unwrap_or(Decimal::ZERO)
    }

    pub fn is_free_item(&self) -> bool {
        self.unit_price.is_none_or(|p| p.is_zero())
    }

    pub fn is_profitable(&self) -> bool {
        self.line_profit > Decimal::ZERO
    }

    pub fn has_loss(&self) -> bool {
        self.line_profit < Decimal::ZERO
    }

    /// Profit as a percentage of the extended price; `None` when nothing is charged.
    pub fn profit_margin_percentage(&self) -> Option<Decimal> {
        money::ratio_percent(self.line_profit, self.extended_price)
    }

    pub fn profit_per_item(&self) -> Decimal {
        self.line_profit / Decimal::from(self.quantity)
    }

    /// Tax actually charged relative to the extended price (0 for free lines).
    pub fn effective_tax_rate(&self) -> Decimal {
        money::ratio_percent(self.tax_amount, self.extended_price).unwrap_or(Decimal::ZERO)
    }

    pub fn to_record(&self) -> LineFinancialsRecord {
        LineFinancialsRecord {
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
            tax_amount: self.tax_amount,
            line_profit: self.line_profit,
            extended_price: self.extended_price,
        }
    }
}

impl TryFrom<LineFinancialsRecord> for LineFinancials {
    type Error = DomainError;

    fn try_from(r: LineFinancialsRecord) -> Result<Self, Self::Error> {
        Self::new(
            r.quantity,
            r.unit_price,
            r.tax_rate,
            r.tax_amount,
            r.line_profit,
            r.extended_price,
        )
    }
}

impl fmt::Display for LineFinancials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_free_item() {
            write!(f, "{} x FREE = {:.2}", self.quantity, self.extended_price)?;
        } else {
            write!(
                f,
                "{} x {:.2} = {:.2} + {:.2} tax ({}%)",
                self.quantity,
                self.effective_unit_price(),
                self.extended_price,
                self.tax_amount,
                self.tax_rate.normalize()
            )?;
        }

        if self.has_loss() {
            write!(f, ", profit ({:.2})", self.line_profit)
        } else {
            write!(f, ", profit +{:.2}", self.line_profit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn calculate_derives_extended_price_tax_and_profit() {
        let line = LineFinancials::calculate(10, Some(dec!(25.50)), dec!(8.25), dec!(20.00)).unwrap();

        assert_eq!(line.extended_price(), dec!(255.00));
        assert_eq!(line.tax_amount(), dec!(21.04));
        assert_eq!(line.line_profit(), dec!(55.00));
        assert_eq!(line.total_including_tax(), dec!(276.04));
        assert!(line.is_profitable());
        assert!(!line.has_loss());
        assert!(!line.is_free_item());
        assert_eq!(line.profit_per_item(), dec!(5.5));
        assert_eq!(
            line.profit_margin_percentage().map(money::round_money),
            Some(dec!(21.57))
        );
        assert_eq!(money::round_money(line.effective_tax_rate()), dec!(8.25));
    }

    #[test]
    fn free_items_carry_full_cost_as_loss() {
        let line = LineFinancials::free_items(5, Some(dec!(15.00))).unwrap();

        assert_eq!(line.unit_price(), None);
        assert_eq!(line.tax_rate(), Decimal::ZERO);
        assert_eq!(line.extended_price(), Decimal::ZERO);
        assert_eq!(line.tax_amount(), Decimal::ZERO);
        assert_eq!(line.line_profit(), dec!(-75.00));
        assert_eq!(line.effective_unit_price(), Decimal::ZERO);
        assert!(line.is_free_item());
        assert!(line.has_loss());
        assert_eq!(line.profit_margin_percentage(), None);
        assert_eq!(line.effective_tax_rate(), Decimal::ZERO);
    }

    #[test]
    fn free_items_without_cost_break_even() {
        let line = LineFinancials::free_items(3, None).unwrap();
        assert_eq!(line.line_profit(), Decimal::ZERO);
        assert!(!line.is_profitable());
        assert!(!line.has_loss());
    }

    #[test]
    fn zero_unit_price_counts_as_free() {
        let line = LineFinancials::calculate(2, Some(Decimal::ZERO), dec!(10), dec!(1)).unwrap();
        assert!(line.is_free_item());
        assert_eq!(line.unit_price(), Some(Decimal::ZERO));
    }

    #[test]
    fn constructor_rejects_inconsistent_extended_price() {
        let err = LineFinancials::new(
            10,
            Some(dec!(25.50)),
            dec!(8.25),
            dec!(21.04),
            dec!(55.00),
            dec!(300.00),
        )
        .unwrap_err();
        assert_eq!(err.parameter(), Some("extended_price"));
    }

    #[test]
    fn constructor_rejects_inconsistent_tax() {
        let err = LineFinancials::new(
            10,
            Some(dec!(25.50)),
            dec!(8.25),
            dec!(25.00),
            dec!(55.00),
            dec!(255.00),
        )
        .unwrap_err();
        assert_eq!(err.parameter(), Some("tax_amount"));
    }

    #[test]
    fn constructor_tolerates_one_cent_drift() {
        assert!(
            LineFinancials::new(
                10,
                Some(dec!(25.50)),
                dec!(8.25),
                dec!(21.04),
                dec!(55.00),
                dec!(255.01),
            )
            .is_ok()
        );
    }

    #[test]
    fn boundaries() {
        assert!(LineFinancials::calculate(1, Some(dec!(1)), dec!(100), dec!(0)).is_ok());
        let err = LineFinancials::calculate(1, Some(dec!(1)), dec!(100.01), dec!(0)).unwrap_err();
        assert_eq!(err.parameter(), Some("tax_rate"));
        let err = LineFinancials::calculate(0, Some(dec!(1)), dec!(10), dec!(0)).unwrap_err();
        assert_eq!(err.parameter(), Some("quantity"));
        let err = LineFinancials::calculate(1, Some(dec!(-1)), dec!(10), dec!(0)).unwrap_err();
        assert_eq!(err.parameter(), Some("unit_price"));
        let err = LineFinancials::calculate(1, Some(dec!(1)), dec!(-1), dec!(0)).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn oversized_amounts_are_rejected_not_overflowed() {
        let err = LineFinancials::calculate(2, Some(Decimal::MAX), Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("unit_price"));

        let err = LineFinancials::calculate(1, Some(Decimal::MAX), dec!(50), Decimal::ZERO)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("tax_rate"));

        let err = LineFinancials::calculate(3, Some(dec!(1)), Decimal::ZERO, Decimal::MAX)
            .unwrap_err();
        assert_eq!(err.parameter(), Some("cost_price"));

        let err = LineFinancials::free_items(2, Some(Decimal::MAX)).unwrap_err();
        assert_eq!(err.parameter(), Some("cost_price"));

        let err = LineFinancials::new(
            2,
            Some(Decimal::MAX),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::MAX,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn reconstitution_rejects_unrepresentable_totals() {
        // extended price and tax each fit, but their sum does not.
        let err = LineFinancials::new(
            1,
            Some(Decimal::MAX),
            dec!(1),
            Decimal::MAX / dec!(100),
            Decimal::ZERO,
            Decimal::MAX,
        )
        .unwrap_err();
        assert_eq!(err.parameter(), Some("tax_amount"));
    }

    #[test]
    fn with_updates_leave_the_original_untouched() {
        let original = LineFinancials::calculate(10, Some(dec!(25.50)), dec!(8.25), dec!(20.00)).unwrap();
        let snapshot = original.clone();

        let more = original.with_quantity(20, dec!(20.00)).unwrap();
        assert_eq!(more.extended_price(), dec!(510.00));
        assert_eq!(more.tax_amount(), dec!(42.08));
        assert_eq!(more.line_profit(), dec!(110.00));

        let cheaper = original.with_unit_price(Some(dec!(19.00)), dec!(20.00)).unwrap();
        assert_eq!(cheaper.extended_price(), dec!(190.00));
        assert_eq!(cheaper.line_profit(), dec!(-10.00));
        assert!(cheaper.has_loss());

        let untaxed = original.with_tax_rate(Decimal::ZERO, dec!(20.00)).unwrap();
        assert_eq!(untaxed.tax_amount(), Decimal::ZERO);

        assert_eq!(original, snapshot);
        assert!(original.with_quantity(0, dec!(20.00)).is_err());
    }

    #[test]
    fn equality_is_structural() {
        let a = LineFinancials::calculate(2, Some(dec!(5)), dec!(10), dec!(3)).unwrap();
        let b = LineFinancials::calculate(2, Some(dec!(5.00)), dec!(10), dec!(3)).unwrap();
        let c = LineFinancials::calculate(2, Some(dec!(5)), dec!(10), dec!(2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hashing_agrees_with_equality() {
        let a = LineFinancials::calculate(2, Some(dec!(5)), dec!(10), dec!(3)).unwrap();
        let b = LineFinancials::calculate(2, Some(dec!(5.00)), dec!(10), dec!(3)).unwrap();
        let c = LineFinancials::calculate(2, Some(dec!(5)), dec!(10), dec!(2)).unwrap();

        let set: HashSet<LineFinancials> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn display_distinguishes_free_items_and_losses() {
        let priced = LineFinancials::calculate(10, Some(dec!(25.50)), dec!(8.25), dec!(20.00)).unwrap();
        assert_eq!(
            priced.to_string(),
            "10 x 25.50 = 255.00 + 21.04 tax (8.25%), profit +55.00"
        );

        let free = LineFinancials::free_items(5, Some(dec!(15.00))).unwrap();
        assert_eq!(free.to_string(), "5 x FREE = 0.00, profit (-75.00)");
    }

    #[test]
    fn deserialization_rejects_tampered_snapshots() {
        let line = LineFinancials::calculate(10, Some(dec!(25.50)), dec!(8.25), dec!(20.00)).unwrap();
        let json = serde_json::to_string(&line).unwrap();
        let back: LineFinancials = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line);

        let mut record = line.to_record();
        record.extended_price = dec!(300.00);
        let tampered = serde_json::to_string(&record).unwrap();
        assert!(serde_json::from_str::<LineFinancials>(&tampered).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: derived fields follow the documented formulas and the
        /// result survives reconstitution through the checking constructor.
        #[test]
        fn calculate_is_consistent_and_reconstitutes(
            quantity in 1u32..10_000,
            price_cents in 0i64..1_000_000,
            rate_bp in 0i64..=10_000,
            cost_cents in 0i64..1_000_000,
        ) {
            let unit_price = Decimal::new(price_cents, 2);
            let tax_rate = Decimal::new(rate_bp, 2);
            let cost_price = Decimal::new(cost_cents, 2);

            let line = LineFinancials::calculate(quantity, Some(unit_price), tax_rate, cost_price).unwrap();
            let gross = Decimal::from(quantity) * unit_price;

            prop_assert!(is_consistent(line.extended_price(), money::round_money(gross)));
            prop_assert!(is_consistent(
                line.tax_amount(),
                money::round_money(gross * tax_rate / Decimal::ONE_HUNDRED)
            ));

            let rebuilt = LineFinancials::new(
                line.quantity(),
                line.unit_price(),
                line.tax_rate(),
                line.tax_amount(),
                line.line_profit(),
                line.extended_price(),
            );
            prop_assert_eq!(rebuilt, Ok(line));
        }
    }
}
