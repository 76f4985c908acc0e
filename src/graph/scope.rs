//! Hierarchical property storage read and written by running tasks.

use std::any::Any;
use std::sync::Arc;

use anyhow::Result;

use crate::util::ident::Identifier;
use crate::util::sorted_map::SortedMap;
use crate::util::type_token::TypeToken;
use crate::Error;

/// A type-erased property value together with its type.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Property {
    ty: TypeToken,
    #[derivative(Debug = "ignore")]
    value: Arc<dyn Any + Send + Sync>,
}

impl Property {
    /// Type of the stored value
    pub fn type_token(&self) -> TypeToken {
        self.ty
    }

    fn downcast<T: Any + Send + Sync>(&self, name: &Identifier) -> Result<&T> {
        self.value.downcast_ref::<T>().ok_or_else(|| {
            Error::TypeMismatch {
                name: name.clone(),
                expected: self.ty,
                found: TypeToken::of::<T>(),
            }
            .into()
        })
    }
}

/// Stores property values by name. A scope may have a parent scope, which is consulted for any name
/// that is not present in the scope itself. Writes always go to the scope itself.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use lumen::*;
///
/// let mut globals = PropertyScope::new();
/// globals.set("resolution", (1920u32, 1080u32))?;
///
/// let mut frame = PropertyScope::child(Arc::new(globals));
/// frame.set("time", 0.5f32)?;
/// assert_eq!(*frame.get::<(u32, u32)>(&"resolution".into())?, (1920, 1080));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct PropertyScope {
    values: SortedMap<Property>,
    parent: Option<Arc<PropertyScope>>,
}

impl PropertyScope {
    /// Create an empty scope without parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scope that falls back to `parent`.
    pub fn child(parent: Arc<PropertyScope>) -> Self {
        Self {
            values: SortedMap::new(),
            parent: Some(parent),
        }
    }

    /// The parent scope, if any.
    pub fn parent(&self) -> Option<&Arc<PropertyScope>> {
        self.parent.as_ref()
    }

    /// Look up a property in this scope or its parents.
    pub fn lookup(&self, name: &Identifier) -> Option<&Property> {
        match self.values.get(name) {
            Some(property) => Some(property),
            None => self.parent.as_ref().and_then(|parent| parent.lookup(name)),
        }
    }

    /// Get a value. Fails if it is not present, or if it was stored with a different type.
    pub fn get<T: Any + Send + Sync>(&self, name: &Identifier) -> Result<&T> {
        self.lookup(name)
            .ok_or_else(|| Error::PropertyNotFound(name.clone()))?
            .downcast(name)
    }

    /// Get a value if it is present. Still fails if it was stored with a different type.
    pub fn try_get<T: Any + Send + Sync>(&self, name: &Identifier) -> Result<Option<&T>> {
        self.lookup(name)
            .map(|property| property.downcast(name))
            .transpose()
    }

    /// Get a shared handle to a value.
    pub fn get_shared<T: Any + Send + Sync>(&self, name: &Identifier) -> Result<Arc<T>> {
        let property = self
            .lookup(name)
            .ok_or_else(|| Error::PropertyNotFound(name.clone()))?;
        property.downcast::<T>(name)?;
        property
            .value
            .clone()
            .downcast::<T>()
            .map_err(|_| Error::Uncategorized("Downcast failed after type check").into())
    }

    /// Store a value. Overwriting a value that is visible from this scope with a value of a different type fails.
    pub fn set<T: Any + Send + Sync>(&mut self, name: impl Into<Identifier>, value: T) -> Result<()> {
        self.set_shared(name, Arc::new(value))
    }

    /// Store a value that is already behind an [`Arc`].
    pub fn set_shared<T: Any + Send + Sync>(&mut self, name: impl Into<Identifier>, value: Arc<T>) -> Result<()> {
        let name = name.into();
        let ty = TypeToken::of::<T>();
        if let Some(existing) = self.lookup(&name) {
            if existing.ty != ty {
                return Err(Error::TypeMismatch {
                    name,
                    expected: existing.ty,
                    found: ty,
                }
                .into());
            }
        }
        self.set_dynamic(name, ty, value);
        Ok(())
    }

    /// Store a type-erased value. The caller guarantees `ty` is the type of `value`.
    pub(crate) fn set_dynamic(&mut self, name: Identifier, ty: TypeToken, value: Arc<dyn Any + Send + Sync>) {
        self.values.insert(
            name,
            Property {
                ty,
                value,
            },
        );
    }

    /// Remove a value from this scope. Values in parent scopes are not affected.
    pub fn remove(&mut self, name: &Identifier) -> Option<Property> {
        self.values.remove(name)
    }

    /// Returns true if this scope or any of its parents holds a value for `name`.
    pub fn contains(&self, name: &Identifier) -> bool {
        self.lookup(name).is_some()
    }

    /// Type of the value stored under `name`.
    pub fn type_of(&self, name: &Identifier) -> Option<TypeToken> {
        self.lookup(name).map(Property::type_token)
    }

    /// Names stored directly in this scope, without parents.
    pub fn local_names(&self) -> impl Iterator<Item = &Identifier> {
        self.values.keys()
    }
}
