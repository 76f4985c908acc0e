//! Hashed string identifiers.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A name used to identify properties, tasks and resources. Only the hash of the name takes part in
/// equality, ordering and hashing, the name itself is kept around for diagnostics.
///
/// Two different names hashing to the same value are considered the same identifier. This is an accepted risk.
///
/// # Example
/// ```
/// use lumen::Identifier;
///
/// let a = Identifier::new("albedo");
/// let b = Identifier::from("albedo");
/// assert_eq!(a, b);
/// assert_eq!(a.name(), "albedo");
/// ```
#[derive(Clone)]
pub struct Identifier {
    hash: u64,
    name: Arc<str>,
}

impl Identifier {
    /// Create an identifier by hashing a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self {
            hash: Self::hash_name(name),
            name: Arc::from(name),
        }
    }

    /// The hash of a name, as it would be stored in an identifier.
    pub fn hash_name(name: &str) -> u64 {
        // DefaultHasher::new() always uses the same keys, so this is stable within a build.
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }

    /// The hashed value of this identifier.
    pub fn value(&self) -> u64 {
        self.hash
    }

    /// The name this identifier was created from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash)
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identifier({:?}, {:#018x})", self.name, self.hash)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::new(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::new(value)
    }
}

impl From<&Identifier> for Identifier {
    fn from(value: &Identifier) -> Self {
        value.clone()
    }
}
