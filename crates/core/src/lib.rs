//! `wholesale-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy, the value object / entity split, write-once identity,
//! audit stamps and the monetary rules shared by the financial value objects.

pub mod audit;
pub mod entity;
pub mod error;
pub mod guard;
pub mod id;
pub mod money;
pub mod value_object;

pub use audit::AuditStamp;
pub use entity::{Entity, Identity};
pub use error::{DomainError, DomainResult};
pub use id::{
    CustomerId, OrderId, PaymentMethodId, PersonId, PurchaseOrderId, StockItemId, SupplierId,
    SupplierTransactionId, TransactionTypeId,
};
pub use value_object::ValueObject;

// Re-exported so dependents name the same decimal type.
pub use rust_decimal::Decimal;
