//! Exposes all structs needed to configure frame composition.

use std::path::PathBuf;

/// What the resolver does with a desired output that no task produces.
///
/// Such an output becomes a pipethrough: its value must be supplied by the caller under the same name.
/// This is legitimate for values that are computed elsewhere, but it also hides typos in property names.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum UnsatisfiedPolicy {
    /// Silently pass the output through.
    Allow,
    /// Pass the output through, and log a warning.
    #[default]
    Warn,
    /// Fail resolution with [`Error::UnsatisfiedOutput`](crate::Error::UnsatisfiedOutput).
    Deny,
}

/// Settings used by the [`Executor`](crate::Executor).
#[derive(Debug, Clone)]
pub struct ComposeSettings {
    /// Maximum amount of times a single compose cycle may be replanned because a task
    /// reported changed requirements.
    pub max_replans: usize,
    /// Policy for desired outputs without a producer.
    pub unsatisfied: UnsatisfiedPolicy,
    /// If set, every rebuild exports the resolved pipeline to this file. A path with an `svg` extension
    /// is rendered to an image, anything else receives the graph in `dot` format.
    pub graph_export: Option<PathBuf>,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        ComposeBuilder::new().build()
    }
}

/// Compose settings builder.
/// # Example
/// ```
/// # use lumen::*;
/// let settings = ComposeBuilder::new()
///     .max_replans(4)
///     .unsatisfied(UnsatisfiedPolicy::Deny)
///     .build();
/// assert_eq!(settings.max_replans, 4);
/// ```
pub struct ComposeBuilder {
    inner: ComposeSettings,
}

impl Default for ComposeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        ComposeBuilder {
            inner: ComposeSettings {
                max_replans: 8,
                unsatisfied: UnsatisfiedPolicy::default(),
                graph_export: None,
            },
        }
    }

    /// Sets the maximum amount of replans per compose cycle.
    pub fn max_replans(mut self, count: usize) -> Self {
        self.inner.max_replans = count;
        self
    }

    /// Sets the policy for desired outputs without a producer.
    pub fn unsatisfied(mut self, policy: UnsatisfiedPolicy) -> Self {
        self.inner.unsatisfied = policy;
        self
    }

    /// Export the resolved pipeline to a file after every rebuild.
    pub fn graph_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.graph_export = Some(path.into());
        self
    }

    /// Build the resulting compose settings.
    pub fn build(self) -> ComposeSettings {
        self.inner
    }
}
