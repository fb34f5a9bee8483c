//! Sales domain module: order lines and the order picking workflow.
//!
//! Pure, deterministic domain logic (no IO, no storage). Line amounts are held
//! in [`LineFinancials`] snapshots that are re-derived, never edited in place.

pub mod line_financials;
pub mod order;

pub use line_financials::{LineFinancials, LineFinancialsRecord};
pub use order::{AddOrderLine, Order, OrderLine, OrderRecord, OrderStatus, OrderTotals, PlaceOrder};
