//! Purchasing domain module: the supplier ledger.
//!
//! Supplier invoices, payments and credits are [`SupplierTransaction`]s whose
//! amounts live in an immutable [`TransactionFinancials`] snapshot.

pub mod supplier_transaction;
pub mod transaction_financials;

pub use supplier_transaction::{
    MAX_INVOICE_NUMBER_LEN, RecordSupplierCredit, RecordSupplierInvoice, RecordSupplierPayment,
    SupplierTransaction, SupplierTransactionRecord, SupplierTransactionStatus,
};
pub use transaction_financials::{
    PaymentApplication, PaymentStatus, TransactionCategory, TransactionFinancials,
    TransactionFinancialsRecord,
};
