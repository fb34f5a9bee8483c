//! Parties domain module (customers).
//!
//! Customer master data plus the credit rules that gate order placement,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod customer;

pub use customer::{ContactDetails, CreditStatus, Customer, CustomerRecord, RegisterCustomer};
