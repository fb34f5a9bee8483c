use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{
    AuditStamp, DomainError, DomainResult, Identity, PaymentMethodId, PersonId, PurchaseOrderId,
    SupplierId, SupplierTransactionId, TransactionTypeId, guard, impl_entity,
};

use crate::transaction_financials::TransactionFinancials;

/// Maximum length of the supplier's own invoice reference.
pub const MAX_INVOICE_NUMBER_LEN: usize = 20;

/// Supplier transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierTransactionStatus {
    Open,
    Finalized,
}

/// Command: RecordSupplierInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSupplierInvoice {
    pub supplier_id: SupplierId,
    pub transaction_type_id: TransactionTypeId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub supplier_invoice_number: Option<String>,
    pub transaction_date: NaiveDate,
    pub amount_excluding_tax: Decimal,
    pub tax_amount: Decimal,
    pub edited_by: PersonId,
}

/// Command: RecordSupplierPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSupplierPayment {
    pub supplier_id: SupplierId,
    pub transaction_type_id: TransactionTypeId,
    /// Required; a payment without a payment method is rejected.
    pub payment_method_id: Option<PaymentMethodId>,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub edited_by: PersonId,
}

/// Command: RecordSupplierCredit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSupplierCredit {
    pub supplier_id: SupplierId,
    pub transaction_type_id: TransactionTypeId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub supplier_invoice_number: Option<String>,
    pub transaction_date: NaiveDate,
    pub credit_amount: Decimal,
    pub tax_rate: Decimal,
    pub edited_by: PersonId,
}

/// Stored shape of a [`SupplierTransaction`], consumed by [`SupplierTransaction::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierTransactionRecord {
    pub id: SupplierTransactionId,
    pub supplier_id: SupplierId,
    pub transaction_type_id: TransactionTypeId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub supplier_invoice_number: Option<String>,
    pub transaction_date: NaiveDate,
    pub financials: TransactionFinancials,
    pub finalization_date: Option<NaiveDate>,
    pub last_edited_by: PersonId,
    pub last_edited_when: DateTime<Utc>,
}

/// Aggregate root: an entry in a supplier's ledger (invoice, payment or credit).
///
/// While open, payments can be applied and links edited. Finalizing freezes
/// the entry until it is explicitly unfinalized.
#[derive(Debug, Clone)]
pub struct SupplierTransaction {
    identity: Identity<SupplierTransactionId>,
    supplier_id: SupplierId,
    transaction_type_id: TransactionTypeId,
    purchase_order_id: Option<PurchaseOrderId>,
    payment_method_id: Option<PaymentMethodId>,
    supplier_invoice_number: Option<String>,
    transaction_date: NaiveDate,
    financials: TransactionFinancials,
    finalization_date: Option<NaiveDate>,
    audit: AuditStamp,
}

impl_entity!(SupplierTransaction, SupplierTransactionId);

impl SupplierTransaction {
    pub fn invoice(cmd: RecordSupplierInvoice) -> DomainResult<Self> {
        let financials =
            TransactionFinancials::create_invoice(cmd.amount_excluding_tax, cmd.tax_amount)?;
        Self::build(
            SupplierTransactionRecordParts {
                supplier_id: cmd.supplier_id,
                transaction_type_id: cmd.transaction_type_id,
                purchase_order_id: cmd.purchase_order_id,
                payment_method_id: None,
                supplier_invoice_number: cmd.supplier_invoice_number,
                transaction_date: cmd.transaction_date,
                financials,
                finalization_date: None,
            },
            AuditStamp::now(cmd.edited_by),
        )
    }

    pub fn payment(cmd: RecordSupplierPayment) -> DomainResult<Self> {
        let financials = TransactionFinancials::create_payment(cmd.amount)?;
        Self::build(
            SupplierTransactionRecordParts {
                supplier_id: cmd.supplier_id,
                transaction_type_id: cmd.transaction_type_id,
                purchase_order_id: None,
                payment_method_id: cmd.payment_method_id,
                supplier_invoice_number: None,
                transaction_date: cmd.transaction_date,
                financials,
                finalization_date: None,
            },
            AuditStamp::now(cmd.edited_by),
        )
    }

    pub fn credit(cmd: RecordSupplierCredit) -> DomainResult<Self> {
        let financials = TransactionFinancials::create_credit(cmd.credit_amount, cmd.tax_rate)?;
        Self::build(
            SupplierTransactionRecordParts {
                supplier_id: cmd.supplier_id,
                transaction_type_id: cmd.transaction_type_id,
                purchase_order_id: cmd.purchase_order_id,
                payment_method_id: None,
                supplier_invoice_number: cmd.supplier_invoice_number,
                transaction_date: cmd.transaction_date,
                financials,
                finalization_date: None,
            },
            AuditStamp::now(cmd.edited_by),
        )
    }

    /// Rebuild a stored transaction through the same checks the factories run.
    pub fn restore(record: SupplierTransactionRecord) -> DomainResult<Self> {
        let mut txn = Self::build(
            SupplierTransactionRecordParts {
                supplier_id: record.supplier_id,
                transaction_type_id: record.transaction_type_id,
                purchase_order_id: record.purchase_order_id,
                payment_method_id: record.payment_method_id,
                supplier_invoice_number: record.supplier_invoice_number,
                transaction_date: record.transaction_date,
                financials: record.financials,
                finalization_date: record.finalization_date,
            },
            AuditStamp::at(record.last_edited_by, record.last_edited_when),
        )?;
        txn.identity.assign(record.id)?;
        Ok(txn)
    }

    fn build(parts: SupplierTransactionRecordParts, audit: AuditStamp) -> DomainResult<Self> {
        let supplier_invoice_number = guard::optional_text(
            "supplier_invoice_number",
            parts.supplier_invoice_number.as_deref(),
            MAX_INVOICE_NUMBER_LEN,
        )?;
        guard::not_in_future("transaction_date", parts.transaction_date)?;
        if let Some(finalized_on) = parts.finalization_date {
            ensure_finalization_date(finalized_on, parts.transaction_date)?;
        }
        ensure_payment_method(&parts.financials, parts.payment_method_id)?;

        Ok(Self {
            identity: Identity::unassigned(),
            supplier_id: parts.supplier_id,
            transaction_type_id: parts.transaction_type_id,
            purchase_order_id: parts.purchase_order_id,
            payment_method_id: parts.payment_method_id,
            supplier_invoice_number,
            transaction_date: parts.transaction_date,
            financials: parts.financials,
            finalization_date: parts.finalization_date,
            audit,
        })
    }

    pub fn to_record(&self) -> Option<SupplierTransactionRecord> {
        Some(SupplierTransactionRecord {
            id: self.identity.get()?,
            supplier_id: self.supplier_id,
            transaction_type_id: self.transaction_type_id,
            purchase_order_id: self.purchase_order_id,
            payment_method_id: self.payment_method_id,
            supplier_invoice_number: self.supplier_invoice_number.clone(),
            transaction_date: self.transaction_date,
            financials: self.financials.clone(),
            finalization_date: self.finalization_date,
            last_edited_by: self.audit.last_edited_by(),
            last_edited_when: self.audit.last_edited_when(),
        })
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn transaction_type_id(&self) -> TransactionTypeId {
        self.transaction_type_id
    }

    pub fn purchase_order_id(&self) -> Option<PurchaseOrderId> {
        self.purchase_order_id
    }

    pub fn payment_method_id(&self) -> Option<PaymentMethodId> {
        self.payment_method_id
    }

    pub fn supplier_invoice_number(&self) -> Option<&str> {
        self.supplier_invoice_number.as_deref()
    }

    pub fn transaction_date(&self) -> NaiveDate {
        self.transaction_date
    }

    pub fn financials(&self) -> &TransactionFinancials {
        &self.financials
    }

    pub fn finalization_date(&self) -> Option<NaiveDate> {
        self.finalization_date
    }

    pub fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    pub fn status(&self) -> SupplierTransactionStatus {
        if self.finalization_date.is_some() {
            SupplierTransactionStatus::Finalized
        } else {
            SupplierTransactionStatus::Open
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.status() == SupplierTransactionStatus::Finalized
    }

    pub fn finalize_transaction(&mut self, date: NaiveDate, editor: PersonId) -> DomainResult<()> {
        self.ensure_open()?;
        ensure_finalization_date(date, self.transaction_date)?;

        self.finalization_date = Some(date);
        self.audit.touch(editor);
        tracing::info!(id = ?self.identity.get(), %date, %editor, "supplier transaction finalized");
        Ok(())
    }

    pub fn unfinalize_transaction(&mut self, editor: PersonId) -> DomainResult<()> {
        if !self.is_finalized() {
            return Err(DomainError::illegal_state(
                "supplier transaction is not finalized",
            ));
        }

        self.finalization_date = None;
        self.audit.touch(editor);
        tracing::info!(id = ?self.identity.get(), %editor, "supplier transaction reopened");
        Ok(())
    }

    /// Apply a payment to the outstanding balance; returns the unapplied part
    /// of `amount` (non-zero on overpayment).
    pub fn apply_payment(&mut self, amount: Decimal, editor: PersonId) -> DomainResult<Decimal> {
        self.ensure_open()?;
        let applied = self.financials.apply_payment(amount)?;

        if applied.is_overpayment() {
            tracing::warn!(
                id = ?self.identity.get(),
                %amount,
                unapplied = %applied.unapplied,
                "payment exceeds outstanding balance"
            );
        }
        tracing::debug!(
            id = ?self.identity.get(),
            outstanding = %applied.financials.outstanding_balance(),
            "payment applied"
        );

        self.financials = applied.financials;
        self.audit.touch(editor);
        Ok(applied.unapplied)
    }

    pub fn update_outstanding_balance(
        &mut self,
        outstanding_balance: Decimal,
        editor: PersonId,
    ) -> DomainResult<()> {
        self.ensure_open()?;
        self.financials = self.financials.with_outstanding_balance(outstanding_balance)?;
        tracing::debug!(id = ?self.identity.get(), %outstanding_balance, "outstanding balance overridden");
        self.audit.touch(editor);
        Ok(())
    }

    pub fn link_to_purchase_order(
        &mut self,
        purchase_order_id: PurchaseOrderId,
        editor: PersonId,
    ) -> DomainResult<()> {
        self.ensure_open()?;
        self.purchase_order_id = Some(purchase_order_id);
        self.audit.touch(editor);
        Ok(())
    }

    pub fn unlink_from_purchase_order(&mut self, editor: PersonId) -> DomainResult<()> {
        self.ensure_open()?;
        if self.purchase_order_id.is_none() {
            return Err(DomainError::illegal_state(
                "supplier transaction is not linked to a purchase order",
            ));
        }
        self.purchase_order_id = None;
        self.audit.touch(editor);
        Ok(())
    }

    pub fn update_payment_method(
        &mut self,
        payment_method_id: Option<PaymentMethodId>,
        editor: PersonId,
    ) -> DomainResult<()> {
        self.ensure_open()?;
        ensure_payment_method(&self.financials, payment_method_id)?;
        self.payment_method_id = payment_method_id;
        self.audit.touch(editor);
        Ok(())
    }

    pub fn update_supplier_invoice_number(
        &mut self,
        supplier_invoice_number: Option<&str>,
        editor: PersonId,
    ) -> DomainResult<()> {
        self.ensure_open()?;
        self.supplier_invoice_number = guard::optional_text(
            "supplier_invoice_number",
            supplier_invoice_number,
            MAX_INVOICE_NUMBER_LEN,
        )?;
        self.audit.touch(editor);
        Ok(())
    }

    fn ensure_open(&self) -> DomainResult<()> {
        if self.is_finalized() {
            return Err(DomainError::illegal_state(
                "cannot modify a finalized supplier transaction",
            ));
        }
        Ok(())
    }
}

struct SupplierTransactionRecordParts {
    supplier_id: SupplierId,
    transaction_type_id: TransactionTypeId,
    purchase_order_id: Option<PurchaseOrderId>,
    payment_method_id: Option<PaymentMethodId>,
    supplier_invoice_number: Option<String>,
    transaction_date: NaiveDate,
    financials: TransactionFinancials,
    finalization_date: Option<NaiveDate>,
}

fn ensure_finalization_date(finalized_on: NaiveDate, transaction_date: NaiveDate) -> DomainResult<()> {
    guard::not_in_future("finalization_date", finalized_on)?;
    if finalized_on < transaction_date {
        return Err(DomainError::invalid_argument(
            "finalization_date",
            format!("{finalized_on} is before the transaction date {transaction_date}"),
        ));
    }
    Ok(())
}

fn ensure_payment_method(
    financials: &TransactionFinancials,
    payment_method_id: Option<PaymentMethodId>,
) -> DomainResult<()> {
    if financials.is_payment() && payment_method_id.is_none() {
        return Err(DomainError::invalid_argument(
            "payment_method_id",
            "a payment must specify a payment method",
        ));
    }
    Ok(())
}
