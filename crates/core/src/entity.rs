//! Entity trait: identity + continuity across state changes.
//!
//! Identifiers are handed out by the storage layer after the first successful
//! insert. Until then an entity carries an unassigned [`Identity`], and the
//! identifier can be set exactly once.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Entity marker + minimal interface.
///
/// Entities compare and hash by identity only; use [`impl_entity!`](crate::impl_entity)
/// to derive the trait and the identity-based `PartialEq`/`Eq`/`Hash` together.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the identifier, or `None` while the entity has not been stored.
    fn id(&self) -> Option<Self::Id>;

    /// Assigns the store-issued identifier.
    ///
    /// Fails with `IllegalState` when an identifier was already assigned.
    fn set_id(&mut self, id: Self::Id) -> DomainResult<()>;

    fn is_transient(&self) -> bool {
        self.id().is_none()
    }
}

/// Write-once identifier slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity<Id>(Option<Id>);

impl<Id> Default for Identity<Id> {
    fn default() -> Self {
        Self(None)
    }
}

impl<Id: Copy + core::fmt::Display> Identity<Id> {
    pub const fn unassigned() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<Id> {
        self.0
    }

    pub fn is_assigned(&self) -> bool {
        self.0.is_some()
    }

    pub fn assign(&mut self, id: Id) -> DomainResult<()> {
        if let Some(existing) = self.0 {
            return Err(DomainError::illegal_state(format!(
                "identifier already assigned ({existing}); cannot reassign to {id}"
            )));
        }
        self.0 = Some(id);
        tracing::info!(id = %id, "identity assigned");
        Ok(())
    }
}

/// Implements [`Entity`] plus identity-only `PartialEq`, `Eq` and `Hash` for a
/// struct holding its identifier in an `identity: Identity<Id>` field.
///
/// Two unassigned entities compare equal through the shared sentinel; compare
/// transient entities by their attributes explicitly when that matters.
#[macro_export]
macro_rules! impl_entity {
    ($t:ty, $id:ty) => {
        impl $crate::Entity for $t {
            type Id = $id;

            fn id(&self) -> Option<$id> {
                self.identity.get()
            }

            fn set_id(&mut self, id: $id) -> $crate::DomainResult<()> {
                self.identity.assign(id)
            }
        }

        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                self.identity == other.identity
            }
        }

        impl Eq for $t {}

        impl core::hash::Hash for $t {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                core::hash::Hash::hash(&self.identity, state);
            }
        }
    };
}
