//! Auxiliary resources that must be prepared before a pipeline runs, such as frame stores and textures.
//!
//! After a pipeline is resolved, the executor walks its items in reverse order and asks every task and every
//! registered [`ResourcePreparer`] which resources the item needs. Walking backwards lets a consumer late in the
//! pipeline announce a resource that an earlier producer will write into. Every requested resource must then be
//! provided by at least one preparer, otherwise the compose cycle is aborted.

use anyhow::Result;
use multimap::MultiMap;

use crate::graph::pipeline::PipeItem;
use crate::util::ident::Identifier;

/// Resources requested per task, keyed by task name.
#[derive(Debug, Default, Clone)]
pub struct ResourceRequests {
    requests: MultiMap<Identifier, Identifier>,
}

impl ResourceRequests {
    /// Create an empty request set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `resource` on behalf of `task`. Requesting the same resource twice for one task is a no-op.
    pub fn request(&mut self, task: impl Into<Identifier>, resource: impl Into<Identifier>) {
        let task = task.into();
        let resource = resource.into();
        let exists = self
            .requests
            .get_vec(&task)
            .map_or(false, |resources| resources.contains(&resource));
        if !exists {
            self.requests.insert(task, resource);
        }
    }

    /// All resources requested by `task`, in request order.
    pub fn for_task(&self, task: &Identifier) -> &[Identifier] {
        self.requests
            .get_vec(task)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate over `(task, resource)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Identifier)> {
        self.requests
            .iter_all()
            .flat_map(|(task, resources)| resources.iter().map(move |resource| (task, resource)))
    }

    /// Total amount of requested resources.
    pub fn len(&self) -> usize {
        self.requests.iter_all().map(|(_, resources)| resources.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.requests.clear()
    }
}

/// Implemented by collaborators that own auxiliary resources (frame stores, texture managers, ...).
pub trait ResourcePreparer {
    /// Declare the resources `item` needs. Called once per item, in reverse pipeline order, after every rebuild.
    fn declare(&mut self, item: &PipeItem, requests: &mut ResourceRequests) -> Result<()>;

    /// Returns true if this preparer can provide `resource`.
    fn provides(&self, resource: &Identifier) -> bool;

    /// Called after a compose cycle completed successfully, to synchronize or flush prepared resources.
    fn flush(&mut self, _requests: &ResourceRequests) -> Result<()> {
        Ok(())
    }
}
