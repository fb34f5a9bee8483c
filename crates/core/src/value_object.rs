//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared (and hashed) by their full field
/// set. They are built only through validating constructors or factories, so
/// any instance in hand satisfies its invariants. "Updating" one means building
/// a new instance through the same constructor; the original is left as is.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: no identity; two values with the same fields are equal.
/// - **Entity**: has identity; two entities with the same id are the same entity
///   regardless of their attributes (see [`crate::Entity`]).
pub trait ValueObject: Clone + Eq + core::hash::Hash + core::fmt::Debug {}
