//! A [`Method`] is a registry that answers the question "which task produces this property?".
//!
//! Each method holds its own tasks, keyed by every output name they declare, and an ordered list of fallback
//! methods. A lookup checks the local tasks first, then asks each fallback in order and returns the first hit.
//! Registering a fallback in front of the list (see [`Method::prefer_fallback_method`]) changes which producer
//! wins for every output that is not produced locally.
//!
//! Every method exposes a [`preference hash`](Method::preference_hash) that summarizes its tasks and the order of
//! its fallback chain. Any mutation of a method changes its hash and the hash of every method that (transitively)
//! uses it as a fallback. Listeners registered through [`Method::subscribe`] are called on every such change, which
//! lets caches know their resolved pipelines are stale.
//!
//! # Example
//! ```
//! use lumen::*;
//!
//! let defaults = Method::new("defaults");
//! defaults.register_task(ConstantTask::new("exposure", 1.0f32));
//!
//! let scene = Method::new("scene");
//! scene.register_fallback_method(defaults.clone());
//! assert!(scene.get_task(&"exposure".into()).is_some());
//!
//! // Changing the fallback changes the scene method too.
//! let before = scene.preference_hash();
//! defaults.register_task(ConstantTask::new("gamma", 2.2f32));
//! assert_ne!(before, scene.preference_hash());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use anyhow::Result;

use crate::graph::task::{same_task, TaskRef};
use crate::util::ident::Identifier;
use crate::util::sorted_map::SortedMap;
use crate::Error;

/// Shared handle to a method.
pub type MethodRef = Arc<Method>;

type Listener = Arc<dyn Fn(&Method) + Send + Sync>;

/// Handle to a listener registered with [`Method::subscribe`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct MethodInner {
    tasks_per_output: SortedMap<TaskRef>,
    fallback_methods: Vec<MethodRef>,
    /// Methods that list this method as a fallback.
    dependents: Vec<Weak<Method>>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

/// Fallback-ordered registry of tasks. See the [module documentation](self) for details.
pub struct Method {
    name: String,
    inner: RwLock<MethodInner>,
    hash: AtomicU64,
    dirty: AtomicBool,
}

impl Method {
    /// Create a new, empty method.
    pub fn new(name: impl Into<String>) -> MethodRef {
        Arc::new(Method {
            name: name.into(),
            inner: RwLock::new(MethodInner {
                tasks_per_output: SortedMap::new(),
                fallback_methods: Vec::new(),
                dependents: Vec::new(),
                listeners: Vec::new(),
                next_listener: 0,
            }),
            hash: AtomicU64::new(0),
            dirty: AtomicBool::new(true),
        })
    }

    /// Name of this method, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> RwLockReadGuard<'_, MethodInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MethodInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a task as the local producer of every output it declares. A task registered later replaces
    /// any earlier local producer of the same output.
    pub fn register_task(&self, task: TaskRef) {
        {
            let mut inner = self.write();
            for name in task.output_specs().keys() {
                trace!("Method {}: {} produces {}", self.name, task.name(), name);
                inner.tasks_per_output.insert(name.clone(), task.clone());
            }
        }
        self.notify_changed();
    }

    /// Remove every local output mapping to `task`. Returns false if the task was not registered.
    pub fn unregister_task(&self, task: &TaskRef) -> bool {
        let removed = {
            let mut inner = self.write();
            let before = inner.tasks_per_output.len();
            inner.tasks_per_output.retain(|_, registered| !same_task(registered, task));
            before != inner.tasks_per_output.len()
        };
        if removed {
            trace!("Method {}: unregistered {}", self.name, task.name());
            self.notify_changed();
        }
        removed
    }

    /// Append a fallback method. Registering a method that already is a fallback does nothing.
    ///
    /// A method must never become its own direct or transitive fallback. Use [`Method::check_fallback_chain`]
    /// to verify this, resolution does so before it starts.
    pub fn register_fallback_method(self: &Arc<Self>, method: MethodRef) {
        {
            let mut inner = self.write();
            if inner.fallback_methods.iter().any(|m| Arc::ptr_eq(m, &method)) {
                return;
            }
            inner.fallback_methods.push(method.clone());
        }
        method.write().dependents.push(Arc::downgrade(self));
        trace!("Method {}: added fallback {}", self.name, method.name);
        self.notify_changed();
    }

    /// Move a fallback method to the front of the fallback list, registering it if needed. It will be consulted
    /// before every other fallback.
    pub fn prefer_fallback_method(self: &Arc<Self>, method: MethodRef) {
        let newly_added = {
            let mut inner = self.write();
            let position = inner.fallback_methods.iter().position(|m| Arc::ptr_eq(m, &method));
            match position {
                Some(0) => return,
                Some(index) => {
                    let existing = inner.fallback_methods.remove(index);
                    inner.fallback_methods.insert(0, existing);
                    false
                }
                None => {
                    inner.fallback_methods.insert(0, method.clone());
                    true
                }
            }
        };
        if newly_added {
            method.write().dependents.push(Arc::downgrade(self));
        }
        trace!("Method {}: preferring fallback {}", self.name, method.name);
        self.notify_changed();
    }

    /// Remove a fallback method. Returns false if it was not a fallback of this method.
    pub fn unregister_fallback_method(&self, method: &MethodRef) -> bool {
        let removed = {
            let mut inner = self.write();
            let before = inner.fallback_methods.len();
            inner.fallback_methods.retain(|m| !Arc::ptr_eq(m, method));
            before != inner.fallback_methods.len()
        };
        if removed {
            let this = self as *const Method;
            method
                .write()
                .dependents
                .retain(|dependent| dependent.as_ptr() != this);
            self.notify_changed();
        }
        removed
    }

    /// Find the task producing `output`. Local tasks take priority, then fallbacks are asked in order.
    /// Returns `None` if no method in the chain produces it, meaning the property is a boundary input.
    pub fn get_task(&self, output: &Identifier) -> Option<TaskRef> {
        let mut visited = Vec::new();
        self.find_task(output, &mut visited)
    }

    fn find_task(&self, output: &Identifier, visited: &mut Vec<*const Method>) -> Option<TaskRef> {
        let this = self as *const Method;
        if visited.contains(&this) {
            return None;
        }
        visited.push(this);

        let fallbacks = {
            let inner = self.read();
            if let Some(task) = inner.tasks_per_output.get(output) {
                return Some(task.clone());
            }
            inner.fallback_methods.clone()
        };
        fallbacks
            .iter()
            .find_map(|fallback| fallback.find_task(output, visited))
    }

    /// The task registered locally for `output`, ignoring fallbacks.
    pub fn local_task(&self, output: &Identifier) -> Option<TaskRef> {
        self.read().tasks_per_output.get(output).cloned()
    }

    /// Output names produced by local tasks.
    pub fn local_outputs(&self) -> Vec<Identifier> {
        self.read().tasks_per_output.keys().cloned().collect()
    }

    /// The fallback methods, in priority order.
    pub fn fallback_methods(&self) -> Vec<MethodRef> {
        self.read().fallback_methods.clone()
    }

    /// Verify that no method reachable through the fallback chain is its own fallback.
    /// # Errors
    /// - Fails with [`Error::FallbackCycle`] naming the first method found on a cycle.
    pub fn check_fallback_chain(&self) -> Result<()> {
        let mut path = Vec::new();
        let mut done = Vec::new();
        self.visit_fallbacks(&mut path, &mut done)
    }

    fn visit_fallbacks(&self, path: &mut Vec<*const Method>, done: &mut Vec<*const Method>) -> Result<()> {
        let this = self as *const Method;
        if path.contains(&this) {
            return Err(Error::FallbackCycle(self.name.clone()).into());
        }
        if done.contains(&this) {
            return Ok(());
        }
        path.push(this);
        for fallback in self.fallback_methods() {
            fallback.visit_fallbacks(path, done)?;
        }
        path.pop();
        done.push(this);
        Ok(())
    }

    /// Hash summarizing the local tasks and the fallback chain order. It changes whenever this method or any
    /// method in its fallback chain is mutated, and is recomputed lazily.
    pub fn preference_hash(&self) -> u64 {
        let mut visited = Vec::new();
        self.compute_hash(&mut visited)
    }

    fn compute_hash(&self, visited: &mut Vec<*const Method>) -> u64 {
        let this = self as *const Method;
        if !self.dirty.load(Ordering::Acquire) {
            return self.hash.load(Ordering::Acquire);
        }
        if visited.contains(&this) {
            // Malformed chain, the cycle itself is reported by check_fallback_chain().
            return 0;
        }
        visited.push(this);

        let mut hasher = DefaultHasher::new();
        let fallbacks = {
            let inner = self.read();
            for (name, task) in &inner.tasks_per_output {
                name.hash(&mut hasher);
                (Arc::as_ptr(task) as *const () as usize).hash(&mut hasher);
            }
            inner.fallback_methods.clone()
        };
        for fallback in &fallbacks {
            fallback.compute_hash(visited).hash(&mut hasher);
        }

        let hash = hasher.finish();
        self.hash.store(hash, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        hash
    }

    /// Register a listener that is called whenever the preference hash of this method changes, including
    /// changes caused by a method in its fallback chain.
    pub fn subscribe(&self, listener: impl Fn(&Method) + Send + Sync + 'static) -> ListenerId {
        let mut inner = self.write();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if no listener with this id was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.write();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener, _)| *listener != id);
        before != inner.listeners.len()
    }

    /// Mark this method and all methods depending on it as changed, then call their listeners.
    fn notify_changed(&self) {
        self.dirty.store(true, Ordering::Release);
        let mut visited = vec![self as *const Method];
        let mut affected = Vec::new();
        self.collect_dependents(&mut visited, &mut affected);

        self.call_listeners();
        for method in &affected {
            method.call_listeners();
        }
    }

    fn collect_dependents(&self, visited: &mut Vec<*const Method>, affected: &mut Vec<MethodRef>) {
        let dependents: Vec<MethodRef> = {
            let mut inner = self.write();
            inner.dependents.retain(|dependent| dependent.strong_count() > 0);
            inner.dependents.iter().filter_map(Weak::upgrade).collect()
        };
        for dependent in dependents {
            let ptr = Arc::as_ptr(&dependent);
            if visited.contains(&ptr) {
                continue;
            }
            visited.push(ptr);
            dependent.dirty.store(true, Ordering::Release);
            dependent.collect_dependents(visited, affected);
            affected.push(dependent);
        }
    }

    fn call_listeners(&self) {
        let listeners: Vec<Listener> = self
            .read()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(self);
        }
    }
}

impl Debug for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("outputs", &inner.tasks_per_output.keys().collect::<Vec<_>>())
            .field(
                "fallbacks",
                &inner
                    .fallback_methods
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
