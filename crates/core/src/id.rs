//! Strongly-typed numeric identifiers used across the domain.
//!
//! Identifiers are assigned by the storage layer and are always positive. The
//! "not yet stored" state is modelled by [`crate::Identity`], never by a zero id.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

macro_rules! impl_numeric_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $t(i64);

        impl $t {
            /// Wrap a raw identifier, rejecting zero and negative values.
            pub fn new(raw: i64) -> DomainResult<Self> {
                if raw <= 0 {
                    return Err(DomainError::invalid_argument(
                        $name,
                        format!("must be a positive identifier (got {raw})"),
                    ));
                }
                Ok(Self(raw))
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl TryFrom<i64> for $t {
            type Error = DomainError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_argument($name, e.to_string()))?;
                Self::new(raw)
            }
        }
    };
}

impl_numeric_id!(
    /// A person acting on the system (editor of a record, picker of an order).
    PersonId,
    "person_id"
);
impl_numeric_id!(SupplierTransactionId, "supplier_transaction_id");
impl_numeric_id!(SupplierId, "supplier_id");
impl_numeric_id!(TransactionTypeId, "transaction_type_id");
impl_numeric_id!(PurchaseOrderId, "purchase_order_id");
impl_numeric_id!(PaymentMethodId, "payment_method_id");
impl_numeric_id!(OrderId, "order_id");
impl_numeric_id!(CustomerId, "customer_id");
impl_numeric_id!(StockItemId, "stock_item_id");
