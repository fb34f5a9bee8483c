use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::money::{self, is_consistent};
use wholesale_core::{DomainError, DomainResult, ValueObject, guard};

/// Kind of supplier ledger entry, derived from the sign and shape of the amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Invoice,
    Payment,
    Credit,
    /// Positive entry without tax.
    DebitAdjustment,
    /// Negative entry without tax that is not a payment.
    CreditAdjustment,
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionCategory::Invoice => "Invoice",
            TransactionCategory::Payment => "Payment",
            TransactionCategory::Credit => "Credit Note",
            TransactionCategory::DebitAdjustment => "Debit Adjustment",
            TransactionCategory::CreditAdjustment => "Credit Adjustment",
        })
    }
}

/// Settlement state, derived from the outstanding balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Settled,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::PartiallyPaid => "Partially Paid",
            PaymentStatus::Settled => "Settled",
        })
    }
}

/// Financial snapshot of a supplier ledger entry.
///
/// Amounts owed to the supplier are positive (invoices); payments and credits
/// are negative. The outstanding balance shares the sign of the transaction
/// amount or is zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TransactionFinancialsRecord")]
pub struct TransactionFinancials {
    amount_excluding_tax: Decimal,
    tax_amount: Decimal,
    transaction_amount: Decimal,
    outstanding_balance: Decimal,
}

/// Stored shape of [`TransactionFinancials`]; converting it back re-runs validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFinancialsRecord {
    pub amount_excluding_tax: Decimal,
    pub tax_amount: Decimal,
    pub transaction_amount: Decimal,
    pub outstanding_balance: Decimal,
}

/// Result of [`TransactionFinancials::apply_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentApplication {
    pub financials: TransactionFinancials,
    /// Part of the payment that exceeded the outstanding balance. The caller
    /// decides what happens to it (refund, carry forward, ...).
    pub unapplied: Decimal,
}

impl PaymentApplication {
    pub fn is_overpayment(&self) -> bool {
        self.unapplied > Decimal::ZERO
    }
}

impl ValueObject for TransactionFinancials {}

impl TransactionFinancials {
    pub fn new(
        amount_excluding_tax: Decimal,
        tax_amount: Decimal,
        transaction_amount: Decimal,
        outstanding_balance: Decimal,
    ) -> DomainResult<Self> {
        // Payments carry no net/tax breakdown, only the (negative) total.
        let payment_shaped = amount_excluding_tax.is_zero()
            && tax_amount.is_zero()
            && transaction_amount < Decimal::ZERO;
        let expected = money::checked_add("tax_amount", amount_excluding_tax, tax_amount)?;
        if !payment_shaped && !is_consistent(transaction_amount, expected) {
            return Err(DomainError::invalid_argument(
                "transaction_amount",
                format!("{transaction_amount} does not match amount excluding tax + tax ({expected})"),
            ));
        }

        if !outstanding_balance.is_zero()
            && (transaction_amount.is_zero()
                || outstanding_balance.is_sign_negative() != transaction_amount.is_sign_negative())
        {
            return Err(DomainError::invalid_argument(
                "outstanding_balance",
                format!(
                    "{outstanding_balance} must be zero or share the sign of the transaction amount ({transaction_amount})"
                ),
            ));
        }

        // Both sides are non-negative, so the difference cannot overflow.
        if outstanding_balance.abs() - transaction_amount.abs() > money::TOLERANCE {
            return Err(DomainError::invalid_argument(
                "outstanding_balance",
                format!(
                    "{outstanding_balance} exceeds the transaction amount ({transaction_amount})"
                ),
            ));
        }

        Ok(Self {
            amount_excluding_tax,
            tax_amount,
            transaction_amount,
            outstanding_balance,
        })
    }

    /// An amount owed to the supplier; fully outstanding until paid.
    pub fn create_invoice(amount_excluding_tax: Decimal, tax_amount: Decimal) -> DomainResult<Self> {
        guard::non_negative("amount_excluding_tax", amount_excluding_tax)?;
        guard::non_negative("tax_amount", tax_amount)?;
        let total = money::checked_add("tax_amount", amount_excluding_tax, tax_amount)?;
        if total.is_zero() {
            return Err(DomainError::invalid_argument(
                "amount_excluding_tax",
                "an invoice must be for a positive amount",
            ));
        }
        Self::new(amount_excluding_tax, tax_amount, total, total)
    }

    /// A payment to the supplier. Payments settle immediately.
    pub fn create_payment(payment_amount: Decimal) -> DomainResult<Self> {
        guard::positive_amount("payment_amount", payment_amount)?;
        Self::new(Decimal::ZERO, Decimal::ZERO, -payment_amount, Decimal::ZERO)
    }

    /// A credit note for `credit_amount` (excluding tax) taxed at `tax_rate` percent.
    pub fn create_credit(credit_amount: Decimal, tax_rate: Decimal) -> DomainResult<Self> {
        guard::positive_amount("credit_amount", credit_amount)?;
        guard::percentage("tax_rate", tax_rate)?;
        let tax = money::percentage_of("credit_amount", credit_amount, tax_rate)?;
        let total = -money::checked_add("credit_amount", credit_amount, tax)?;
        Self::new(-credit_amount, -tax, total, total)
    }

    /// Settle `amount` against the outstanding balance, moving it toward zero.
    ///
    /// Anything beyond the outstanding balance is returned as
    /// [`PaymentApplication::unapplied`]; the balance never crosses zero.
    pub fn apply_payment(&self, amount: Decimal) -> DomainResult<PaymentApplication> {
        if !self.has_outstanding_balance() {
            return Err(DomainError::illegal_state(
                "no outstanding balance to apply a payment to",
            ));
        }
        guard::positive_amount("amount", amount)?;

        let remaining = self.outstanding_balance.abs() - amount;
        let (magnitude, unapplied) = if remaining < Decimal::ZERO {
            (Decimal::ZERO, -remaining)
        } else {
            (remaining, Decimal::ZERO)
        };
        let balance = if self.outstanding_balance.is_sign_negative() && !magnitude.is_zero() {
            -magnitude
        } else {
            magnitude
        };

        Ok(PaymentApplication {
            financials: self.with_outstanding_balance(balance)?,
            unapplied,
        })
    }

    /// Replace the outstanding balance (reconciliation).
    pub fn with_outstanding_balance(&self, outstanding_balance: Decimal) -> DomainResult<Self> {
        Self::new(
            self.amount_excluding_tax,
            self.tax_amount,
            self.transaction_amount,
            outstanding_balance,
        )
    }

    pub fn amount_excluding_tax(&self) -> Decimal {
        self.amount_excluding_tax
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn transaction_amount(&self) -> Decimal {
        self.transaction_amount
    }

    pub fn outstanding_balance(&self) -> Decimal {
        self.outstanding_balance
    }

    pub fn absolute_transaction_amount(&self) -> Decimal {
        self.transaction_amount.abs()
    }

    /// Portion of the transaction amount already settled.
    pub fn settled_amount(&self) -> Decimal {
        self.transaction_amount - self.outstanding_balance
    }

    pub fn is_fully_paid(&self) -> bool {
        self.outstanding_balance.is_zero()
    }

    pub fn has_outstanding_balance(&self) -> bool {
        !self.is_fully_paid()
    }

    pub fn is_payment(&self) -> bool {
        self.amount_excluding_tax.is_zero() && self.transaction_amount < Decimal::ZERO
    }

    pub fn is_credit(&self) -> bool {
        self.transaction_amount < Decimal::ZERO && !self.tax_amount.is_zero()
    }

    pub fn is_invoice(&self) -> bool {
        self.transaction_amount > Decimal::ZERO && !self.tax_amount.is_zero()
    }

    pub fn category(&self) -> TransactionCategory {
        if self.is_payment() {
            TransactionCategory::Payment
        } else if self.is_credit() {
            TransactionCategory::Credit
        } else if self.is_invoice() {
            TransactionCategory::Invoice
        } else if self.transaction_amount < Decimal::ZERO {
            TransactionCategory::CreditAdjustment
        } else {
            TransactionCategory::DebitAdjustment
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        if self.is_fully_paid() {
            PaymentStatus::Settled
        } else if self.outstanding_balance == self.transaction_amount {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }

    pub fn to_record(&self) -> TransactionFinancialsRecord {
        TransactionFinancialsRecord {
            amount_excluding_tax: self.amount_excluding_tax,
            tax_amount: self.tax_amount,
            transaction_amount: self.transaction_amount,
            outstanding_balance: self.outstanding_balance,
        }
    }
}

impl TryFrom<TransactionFinancialsRecord> for TransactionFinancials {
    type Error = DomainError;

    fn try_from(r: TransactionFinancialsRecord) -> Result<Self, Self::Error> {
        Self::new(
            r.amount_excluding_tax,
            r.tax_amount,
            r.transaction_amount,
            r.outstanding_balance,
        )
    }
}

impl fmt::Display for TransactionFinancials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2} ({:.2} + {:.2} tax), {} ({:.2} outstanding)",
            self.category(),
            self.transaction_amount,
            self.amount_excluding_tax,
            self.tax_amount,
            self.payment_status(),
            self.outstanding_balance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn invoice_is_fully_outstanding() {
        let inv = TransactionFinancials::create_invoice(dec!(100.00), dec!(15.00)).unwrap();
        assert_eq!(inv.transaction_amount(), dec!(115.00));
        assert_eq!(inv.outstanding_balance(), dec!(115.00));
        assert!(inv.is_invoice());
        assert!(!inv.is_payment());
        assert!(!inv.is_credit());
        assert_eq!(inv.category(), TransactionCategory::Invoice);
        assert_eq!(inv.payment_status(), PaymentStatus::Unpaid);
        assert!(inv.has_outstanding_balance());
    }

    #[test]
    fn invoice_must_be_positive() {
        assert!(TransactionFinancials::create_invoice(dec!(0), dec!(0)).is_err());
        assert!(TransactionFinancials::create_invoice(dec!(-10), dec!(0)).is_err());
        let untaxed = TransactionFinancials::create_invoice(dec!(10), dec!(0)).unwrap();
        assert_eq!(untaxed.category(), TransactionCategory::DebitAdjustment);
    }

    #[test]
    fn payment_is_negative_and_settled() {
        let pay = TransactionFinancials::create_payment(dec!(50.00)).unwrap();
        assert_eq!(pay.amount_excluding_tax(), Decimal::ZERO);
        assert_eq!(pay.tax_amount(), Decimal::ZERO);
        assert_eq!(pay.transaction_amount(), dec!(-50.00));
        assert_eq!(pay.absolute_transaction_amount(), dec!(50.00));
        assert!(pay.is_payment());
        assert!(!pay.is_credit());
        assert!(pay.is_fully_paid());
        assert_eq!(pay.category(), TransactionCategory::Payment);
        assert_eq!(pay.payment_status(), PaymentStatus::Settled);
        assert!(TransactionFinancials::create_payment(dec!(0)).is_err());
    }

    #[test]
    fn credit_negates_amount_and_tax() {
        let credit = TransactionFinancials::create_credit(dec!(200.00), dec!(15)).unwrap();
        assert_eq!(credit.amount_excluding_tax(), dec!(-200.00));
        assert_eq!(credit.tax_amount(), dec!(-30.00));
        assert_eq!(credit.transaction_amount(), dec!(-230.00));
        assert_eq!(credit.outstanding_balance(), dec!(-230.00));
        assert!(credit.is_credit());
        assert!(!credit.is_payment());
        assert!(!credit.is_invoice());
        assert_eq!(credit.category().to_string(), "Credit Note");

        let untaxed = TransactionFinancials::create_credit(dec!(20), dec!(0)).unwrap();
        assert_eq!(untaxed.category(), TransactionCategory::CreditAdjustment);
    }

    #[test]
    fn constructor_checks_total_and_balance_sign() {
        let err = TransactionFinancials::new(dec!(100), dec!(15), dec!(120), dec!(120)).unwrap_err();
        assert_eq!(err.parameter(), Some("transaction_amount"));

        let err = TransactionFinancials::new(dec!(100), dec!(15), dec!(115), dec!(-5)).unwrap_err();
        assert_eq!(err.parameter(), Some("outstanding_balance"));

        assert!(TransactionFinancials::new(dec!(100), dec!(15), dec!(115.01), dec!(0)).is_ok());
        assert!(TransactionFinancials::new(dec!(0), dec!(0), dec!(0), dec!(1)).is_err());

        // Only a negative total may omit the breakdown.
        assert!(TransactionFinancials::new(dec!(0), dec!(0), dec!(-50), dec!(0)).is_ok());
        let err = TransactionFinancials::new(dec!(0), dec!(0), dec!(50), dec!(50)).unwrap_err();
        assert_eq!(err.parameter(), Some("transaction_amount"));
    }

    #[test]
    fn partial_payment_reduces_balance() {
        let inv = TransactionFinancials::create_invoice(dec!(100.00), dec!(15.00)).unwrap();
        let applied = inv.apply_payment(dec!(40.00)).unwrap();
        assert_eq!(applied.financials.outstanding_balance(), dec!(75.00));
        assert_eq!(applied.unapplied, Decimal::ZERO);
        assert!(!applied.is_overpayment());
        assert_eq!(applied.financials.payment_status(), PaymentStatus::PartiallyPaid);
        assert_eq!(applied.financials.settled_amount(), dec!(40.00));
        // original untouched
        assert_eq!(inv.outstanding_balance(), dec!(115.00));
    }

    #[test]
    fn overpayment_clamps_and_reports_the_excess() {
        let inv = TransactionFinancials::create_invoice(dec!(100.00), dec!(15.00)).unwrap();
        let applied = inv.apply_payment(dec!(150.00)).unwrap();
        assert!(applied.financials.is_fully_paid());
        assert_eq!(applied.unapplied, dec!(35.00));
        assert!(applied.is_overpayment());
    }

    #[test]
    fn payment_against_credit_moves_toward_zero() {
        let credit = TransactionFinancials::create_credit(dec!(100.00), dec!(0)).unwrap();
        let applied = credit.apply_payment(dec!(30.00)).unwrap();
        assert_eq!(applied.financials.outstanding_balance(), dec!(-70.00));

        let applied = applied.financials.apply_payment(dec!(80.00)).unwrap();
        assert!(applied.financials.is_fully_paid());
        assert_eq!(applied.unapplied, dec!(10.00));
    }

    #[test]
    fn apply_payment_without_outstanding_balance_is_illegal() {
        let pay = TransactionFinancials::create_payment(dec!(10)).unwrap();
        assert!(pay.apply_payment(dec!(1)).unwrap_err().is_illegal_state());

        let inv = TransactionFinancials::create_invoice(dec!(10), dec!(1)).unwrap();
        let err = inv.apply_payment(dec!(0)).unwrap_err();
        assert_eq!(err.parameter(), Some("amount"));
    }

    #[test]
    fn with_outstanding_balance_revalidates() {
        let inv = TransactionFinancials::create_invoice(dec!(100), dec!(10)).unwrap();
        assert_eq!(
            inv.with_outstanding_balance(dec!(60)).unwrap().outstanding_balance(),
            dec!(60)
        );
        assert!(inv.with_outstanding_balance(dec!(-1)).is_err());
    }

    #[test]
    fn outstanding_balance_cannot_exceed_the_transaction_amount() {
        let inv = TransactionFinancials::create_invoice(dec!(100), dec!(15)).unwrap();
        let err = inv.with_outstanding_balance(dec!(1000)).unwrap_err();
        assert_eq!(err.parameter(), Some("outstanding_balance"));
        assert!(inv.with_outstanding_balance(dec!(115.01)).is_ok());
        assert!(inv.with_outstanding_balance(dec!(115.02)).is_err());

        let credit = TransactionFinancials::create_credit(dec!(50), dec!(10)).unwrap();
        assert!(credit.with_outstanding_balance(dec!(-55.00)).is_ok());
        assert!(credit.with_outstanding_balance(dec!(-60.00)).is_err());
        assert!(TransactionFinancials::new(dec!(100), dec!(15), dec!(115), dec!(200)).is_err());
    }

    #[test]
    fn oversized_amounts_are_rejected_not_overflowed() {
        let err = TransactionFinancials::create_invoice(Decimal::MAX, dec!(1)).unwrap_err();
        assert_eq!(err.parameter(), Some("tax_amount"));

        let err = TransactionFinancials::create_credit(Decimal::MAX, dec!(10)).unwrap_err();
        assert_eq!(err.parameter(), Some("credit_amount"));
        let err = TransactionFinancials::create_credit(Decimal::MAX, dec!(0.5)).unwrap_err();
        assert_eq!(err.parameter(), Some("credit_amount"));

        assert!(TransactionFinancials::new(Decimal::MAX, dec!(1), Decimal::MAX, Decimal::ZERO).is_err());
        assert!(TransactionFinancials::new(Decimal::MAX, Decimal::ZERO, Decimal::MIN, Decimal::ZERO).is_err());

        let payment = TransactionFinancials::create_payment(Decimal::MAX).unwrap();
        assert_eq!(payment.transaction_amount(), Decimal::MIN);
    }

    #[test]
    fn hashing_agrees_with_equality() {
        let a = TransactionFinancials::create_invoice(dec!(100), dec!(15)).unwrap();
        let b = TransactionFinancials::create_invoice(dec!(100.00), dec!(15.00)).unwrap();
        let paid = a.apply_payment(dec!(15)).unwrap().financials;

        let set: HashSet<TransactionFinancials> = [a, b, paid].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_includes_category_and_status() {
        let inv = TransactionFinancials::create_invoice(dec!(100), dec!(15)).unwrap();
        assert_eq!(
            inv.to_string(),
            "Invoice 115.00 (100.00 + 15.00 tax), Unpaid (115.00 outstanding)"
        );
    }

    #[test]
    fn deserialization_revalidates() {
        let inv = TransactionFinancials::create_invoice(dec!(100), dec!(15)).unwrap();
        let json = serde_json::to_string(&inv).unwrap();
        assert_eq!(serde_json::from_str::<TransactionFinancials>(&json).unwrap(), inv);

        let mut record = inv.to_record();
        record.transaction_amount = dec!(999);
        let tampered = serde_json::to_string(&record).unwrap();
        assert!(serde_json::from_str::<TransactionFinancials>(&tampered).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a payment never pushes the balance past zero, and the
        /// applied plus unapplied parts add up to the payment.
        #[test]
        fn payment_is_fully_accounted_for(
            net_cents in 1i64..10_000_000,
            tax_cents in 0i64..1_000_000,
            pay_cents in 1i64..20_000_000,
        ) {
            let inv = TransactionFinancials::create_invoice(
                Decimal::new(net_cents, 2),
                Decimal::new(tax_cents, 2),
            ).unwrap();
            let payment = Decimal::new(pay_cents, 2);
            let applied = inv.apply_payment(payment).unwrap();

            let after = applied.financials.outstanding_balance();
            prop_assert!(after >= Decimal::ZERO);
            prop_assert_eq!(inv.outstanding_balance() - after + applied.unapplied, payment);
        }
    }
}
