use std::fmt::{Display, Formatter};

use anyhow::Result;

use crate::util::ident::Identifier;
use crate::util::sorted_map::SortedMap;
use crate::util::type_token::TypeToken;
use crate::Error;

/// Describes one named, typed value flowing through a pipeline.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PropertySpec {
    pub(crate) name: Identifier,
    pub(crate) ty: TypeToken,
}

/// Property specs keyed by their name.
pub type SpecMap = SortedMap<PropertySpec>;

impl PropertySpec {
    /// Create a spec for a property of type `T`.
    pub fn new<T: 'static>(name: impl Into<Identifier>) -> Self {
        Self::with_type(name, TypeToken::of::<T>())
    }

    /// Create a spec from an already known type token.
    pub fn with_type(name: impl Into<Identifier>, ty: TypeToken) -> Self {
        PropertySpec {
            name: name.into(),
            ty,
        }
    }

    /// Get the name of this property
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Get the type of this property
    pub fn type_token(&self) -> TypeToken {
        self.ty
    }

    /// Returns an error if `other` names the same property with a different type.
    pub fn check_compatible(&self, other: &PropertySpec) -> Result<()> {
        if self.name == other.name && self.ty != other.ty {
            return Err(Error::TypeMismatch {
                name: self.name.clone(),
                expected: self.ty,
                found: other.ty,
            }
            .into());
        }
        Ok(())
    }
}

impl Display for PropertySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// Build a [`SpecMap`] from a list of specs.
pub fn spec_map(specs: impl IntoIterator<Item = PropertySpec>) -> SpecMap {
    specs
        .into_iter()
        .map(|spec| (spec.name.clone(), spec))
        .collect()
}
