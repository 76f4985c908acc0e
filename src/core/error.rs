//! Exposes the lumen error type

use thiserror::Error;

use crate::util::ident::Identifier;
use crate::util::type_token::TypeToken;

/// Error type that lumen can return.
#[derive(Error, Debug)]
pub enum Error {
    /// The same property name was used with two different types.
    #[error("Property `{name}` is used as `{expected}` and as `{found}`.")]
    TypeMismatch {
        /// Name of the property
        name: Identifier,
        /// Type the property was first seen with
        expected: TypeToken,
        /// Conflicting type
        found: TypeToken,
    },
    /// A desired output has no producing task, and the unsatisfied output policy forbids passing it through.
    #[error("No task produces desired output `{0}`.")]
    UnsatisfiedOutput(Identifier),
    /// A method lists itself as a direct or transitive fallback.
    #[error("Method `{0}` is its own fallback.")]
    FallbackCycle(String),
    /// Two different tasks need each other's outputs. Only a task reading its own output is allowed.
    #[error("Task `{task}` needs `{property}`, which is produced by a task that depends on it.")]
    DependencyCycle {
        /// Task whose input closes the cycle
        task: Identifier,
        /// The property on the cycle
        property: Identifier,
    },
    /// Tasks kept reporting changed requirements.
    #[error("Requirements did not converge after {replans} replans.")]
    NonConvergent {
        /// Amount of replans performed before giving up
        replans: usize,
    },
    /// A task needs an auxiliary resource that no resource preparer can provide.
    #[error("Task `{task}` requires resource `{resource}`, but no preparer provides it.")]
    MissingResource {
        /// Task that requested the resource
        task: Identifier,
        /// The missing resource
        resource: Identifier,
    },
    /// Property is not present in the scope or any of its parents.
    #[error("Property `{0}` not found.")]
    PropertyNotFound(Identifier),
    /// A task tried to access a property it did not declare.
    #[error("Task `{task}` has no binding for `{name}`.")]
    NoBinding {
        /// The running task
        task: Identifier,
        /// Property name that was accessed
        name: Identifier,
    },
    /// Failed to render or write an exported graph.
    #[error("Graph export failed: {0}")]
    GraphExport(String),
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}
