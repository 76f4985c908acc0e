//! Run-time type identity for property values.
//!
//! Property specs need to compare the types of values without naming them, so each Rust type is mapped to
//! a [`TypeToken`] through a single process-wide registry. Tokens compare by identity only, the stored
//! type name is purely informative.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock, PoisonError};

static REGISTRY: OnceLock<Mutex<HashMap<TypeId, TypeToken>>> = OnceLock::new();

/// Opaque token identifying the type of a property value.
#[derive(Copy, Clone)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    /// Get the token for `T`. The first call for a type registers it, later calls return the same token.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let registry = REGISTRY.get_or_init(Default::default);
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        *registry.entry(TypeId::of::<T>()).or_insert_with(|| TypeToken {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        })
    }

    /// Returns true if this is the token for `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Name of the type, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Amount of types registered in this process so far.
    pub fn registered_count() -> usize {
        REGISTRY
            .get()
            .map(|registry| registry.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or_default()
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeToken {}

impl Hash for TypeToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Debug for TypeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeToken({})", self.name)
    }
}

impl Display for TypeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
