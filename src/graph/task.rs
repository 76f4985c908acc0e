//! This module exposes the [`Task`] trait, the unit of work the resolver plans with, together with the
//! [`TaskBuilder`] used to define closure-backed tasks.
//!
//! A task declares the properties it reads and the properties it writes. The resolver only ever looks at
//! these declarations, what a task does when it runs is opaque to it.
//!
//! # Example
//!
//! A task that reads a `f32` exposure value and a color, and writes a tonemapped color.
//! ```
//! use lumen::*;
//!
//! let tonemap = TaskBuilder::new("tonemap")
//!     .input::<f32>("exposure")
//!     .input::<[f32; 3]>("hdr_color")
//!     .output::<[f32; 3]>("ldr_color")
//!     .execute(|ctx| {
//!         let exposure = *ctx.input::<f32>("exposure")?;
//!         let hdr = *ctx.input::<[f32; 3]>("hdr_color")?;
//!         let ldr = hdr.map(|c| 1.0 - (-c * exposure).exp());
//!         ctx.set_output("ldr_color", ldr)?;
//!         Ok(TaskStatus::Done)
//!     })
//!     .build();
//! assert_eq!(tonemap.output_specs().len(), 1);
//! ```
//!
//! # Stateful properties
//!
//! A task may list the same property name as both an input and an output. The resolver never tries to
//! produce such an input: it is treated as a boundary input that must already hold a value from a previous
//! execution. This is how double-buffered state (for example a history buffer for temporal filtering) is
//! carried from one frame to the next.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

use crate::graph::pipeline::PipeItem;
use crate::graph::property::{PropertySpec, SpecMap};
use crate::graph::resource::ResourceRequests;
use crate::graph::scope::PropertyScope;
use crate::util::ident::Identifier;
use crate::util::type_token::TypeToken;
use crate::Error;

/// Shared handle to a task. Tasks are immutable once built and can be registered in any number of methods.
pub type TaskRef = Arc<dyn Task>;

/// Returns true if both handles point to the same task. Tasks are compared by identity, never by name.
pub(crate) fn same_task(lhs: &TaskRef, rhs: &TaskRef) -> bool {
    Arc::as_ptr(lhs) as *const () == Arc::as_ptr(rhs) as *const ()
}

/// Returned by [`Task::run`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task ran and produced its outputs.
    Done,
    /// The task discovered at run time that its inputs or outputs differ from what was planned.
    /// The executor discards the current cycle and plans again. A task must report this only when
    /// its requirements actually changed, or composition never converges.
    RequirementsChanged,
}

/// A unit of computation with declared, named and typed inputs and outputs.
pub trait Task: Send + Sync {
    /// Name of this task, used in diagnostics and to key resource requests.
    fn name(&self) -> &Identifier;

    /// The inputs this task declares.
    fn input_specs(&self) -> &SpecMap;

    /// The outputs this task declares.
    fn output_specs(&self) -> &SpecMap;

    /// The inputs this task needs given what is known at resolution time. Tasks whose inputs depend on
    /// the types of values present in the scope override this.
    fn resolve_inputs(&self, _ctx: &ResolveContext) -> Result<SpecMap> {
        Ok(self.input_specs().clone())
    }

    /// Run the task.
    fn run(&self, _ctx: &mut RunContext) -> Result<TaskStatus> {
        Ok(TaskStatus::Done)
    }

    /// Declare auxiliary resources that must be prepared before the pipeline runs.
    fn declare_resources(&self, _item: &PipeItem, _requests: &mut ResourceRequests) -> Result<()> {
        Ok(())
    }
}

impl Debug for dyn Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", self.name())
            .field("inputs", &self.input_specs().keys().collect::<Vec<_>>())
            .field("outputs", &self.output_specs().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolution time information a task may use to decide on its inputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveContext<'a> {
    scope: Option<&'a PropertyScope>,
}

impl<'a> ResolveContext<'a> {
    /// A context without any information.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that can look at the values currently present in a scope.
    pub fn with_scope(scope: &'a PropertyScope) -> Self {
        Self {
            scope: Some(scope),
        }
    }

    /// Type of the value currently stored under `name`, if any.
    pub fn type_of(&self, name: &Identifier) -> Option<TypeToken> {
        self.scope.and_then(|scope| scope.type_of(name))
    }

    /// Returns true if a value is currently stored under `name`.
    pub fn contains(&self, name: &Identifier) -> bool {
        self.scope.map_or(false, |scope| scope.contains(name))
    }
}

/// Gives a running task access to its inputs and outputs, through the bindings chosen by the resolver.
pub struct RunContext<'a> {
    item: &'a PipeItem,
    scope: &'a mut PropertyScope,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(item: &'a PipeItem, scope: &'a mut PropertyScope) -> Self {
        Self {
            item,
            scope,
        }
    }

    /// The pipe item being executed.
    pub fn item(&self) -> &PipeItem {
        self.item
    }

    fn input_binding(&self, name: &Identifier) -> Result<&Identifier> {
        self.item.input_binding(name).ok_or_else(|| {
            Error::NoBinding {
                task: self.item.task.name().clone(),
                name: name.clone(),
            }
            .into()
        })
    }

    /// Read an input. Fails if the input was not declared, is missing, or has a different type.
    pub fn input<T: Any + Send + Sync>(&self, name: impl Into<Identifier>) -> Result<&T> {
        let local = self.input_binding(&name.into())?;
        self.scope.get(local)
    }

    /// Read an input that may not have a value yet, such as state from a previous frame.
    pub fn try_input<T: Any + Send + Sync>(&self, name: impl Into<Identifier>) -> Result<Option<&T>> {
        let local = self.input_binding(&name.into())?;
        self.scope.try_get(local)
    }

    /// Write an output. Fails if the output was not declared or declared with a different type.
    pub fn set_output<T: Any + Send + Sync>(&mut self, name: impl Into<Identifier>, value: T) -> Result<()> {
        self.set_output_shared(name, Arc::new(value))
    }

    /// Write an output that is already behind an [`Arc`].
    pub fn set_output_shared<T: Any + Send + Sync>(&mut self, name: impl Into<Identifier>, value: Arc<T>) -> Result<()> {
        let name = name.into();
        let task = self.item.task.name().clone();
        let local = self
            .item
            .output_binding(&name)
            .ok_or_else(|| Error::NoBinding {
                task: task.clone(),
                name: name.clone(),
            })?
            .clone();
        if let Some(spec) = self.item.task.output_specs().get(&name) {
            spec.check_compatible(&PropertySpec::new::<T>(name.clone()))?;
        }
        self.scope.set_shared(local, value)
    }
}

/// Defines what a closure-backed task does when it runs.
pub trait TaskExecutor: Send + Sync {
    /// Run the task.
    fn execute(&self, ctx: &mut RunContext) -> Result<TaskStatus>;
}

impl<F> TaskExecutor for F
where
    F: Fn(&mut RunContext) -> Result<TaskStatus> + Send + Sync,
{
    /// Run the task by calling the given function.
    fn execute(&self, ctx: &mut RunContext) -> Result<TaskStatus> {
        self(ctx)
    }
}

/// A task executor that does nothing
pub struct EmptyTaskExecutor;

impl TaskExecutor for EmptyTaskExecutor {
    fn execute(&self, _ctx: &mut RunContext) -> Result<TaskStatus> {
        Ok(TaskStatus::Done)
    }
}

type BoxedTaskFn = Box<dyn TaskExecutor>;
type BoxedInputFn = Box<dyn Fn(&ResolveContext, &SpecMap) -> Result<SpecMap> + Send + Sync>;
type BoxedResourceFn = Box<dyn Fn(&PipeItem, &mut ResourceRequests) -> Result<()> + Send + Sync>;

/// A task defined by closures. You can obtain one using a [`TaskBuilder`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FnTask {
    name: Identifier,
    inputs: SpecMap,
    outputs: SpecMap,
    #[derivative(Debug = "ignore")]
    execute: BoxedTaskFn,
    #[derivative(Debug = "ignore")]
    dynamic_inputs: Option<BoxedInputFn>,
    #[derivative(Debug = "ignore")]
    resources: Option<BoxedResourceFn>,
}

impl Task for FnTask {
    fn name(&self) -> &Identifier {
        &self.name
    }

    fn input_specs(&self) -> &SpecMap {
        &self.inputs
    }

    fn output_specs(&self) -> &SpecMap {
        &self.outputs
    }

    fn resolve_inputs(&self, ctx: &ResolveContext) -> Result<SpecMap> {
        match &self.dynamic_inputs {
            None => Ok(self.inputs.clone()),
            Some(f) => f(ctx, &self.inputs),
        }
    }

    fn run(&self, ctx: &mut RunContext) -> Result<TaskStatus> {
        self.execute.execute(ctx)
    }

    fn declare_resources(&self, item: &PipeItem, requests: &mut ResourceRequests) -> Result<()> {
        match &self.resources {
            None => Ok(()),
            Some(f) => f(item, requests),
        }
    }
}

/// Used to create [`FnTask`]s.
pub struct TaskBuilder {
    inner: FnTask,
}

impl TaskBuilder {
    /// Create a new task that does nothing when it runs.
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self {
            inner: FnTask {
                name: name.into(),
                inputs: SpecMap::new(),
                outputs: SpecMap::new(),
                execute: Box::new(EmptyTaskExecutor),
                dynamic_inputs: None,
                resources: None,
            },
        }
    }

    /// Declare an input of type `T`.
    pub fn input<T: 'static>(self, name: impl Into<Identifier>) -> Self {
        self.input_spec(PropertySpec::new::<T>(name))
    }

    /// Declare an input from a spec.
    pub fn input_spec(mut self, spec: PropertySpec) -> Self {
        self.inner.inputs.insert(spec.name.clone(), spec);
        self
    }

    /// Declare an output of type `T`.
    pub fn output<T: 'static>(self, name: impl Into<Identifier>) -> Self {
        self.output_spec(PropertySpec::new::<T>(name))
    }

    /// Declare an output from a spec.
    pub fn output_spec(mut self, spec: PropertySpec) -> Self {
        self.inner.outputs.insert(spec.name.clone(), spec);
        self
    }

    /// Declare a stateful property: the task reads the value it wrote during its previous execution.
    pub fn feedback<T: 'static>(self, name: impl Into<Identifier>) -> Self {
        let spec = PropertySpec::new::<T>(name);
        self.input_spec(spec.clone()).output_spec(spec)
    }

    /// Compute the inputs at resolution time. The closure receives the declared inputs.
    pub fn dynamic_inputs<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResolveContext, &SpecMap) -> Result<SpecMap> + Send + Sync + 'static, {
        self.inner.dynamic_inputs = Some(Box::new(f));
        self
    }

    /// Declare auxiliary resources this task needs prepared.
    pub fn resources<F>(mut self, f: F) -> Self
    where
        F: Fn(&PipeItem, &mut ResourceRequests) -> Result<()> + Send + Sync + 'static, {
        self.inner.resources = Some(Box::new(f));
        self
    }

    /// Set the function to call when the task runs.
    pub fn execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RunContext) -> Result<TaskStatus> + Send + Sync + 'static, {
        self.inner.execute = Box::new(f);
        self
    }

    /// Get the task, ready to be registered in a method.
    pub fn build(self) -> TaskRef {
        trace!("Built task {} ({} inputs, {} outputs)", self.inner.name, self.inner.inputs.len(), self.inner.outputs.len());
        Arc::new(self.inner)
    }
}

/// A task that writes one fixed value.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ConstantTask {
    name: Identifier,
    inputs: SpecMap,
    outputs: SpecMap,
    #[derivative(Debug = "ignore")]
    value: Arc<dyn Any + Send + Sync>,
}

impl ConstantTask {
    /// Create a task producing `value` under `name`. The task is named after its output.
    pub fn new<T: Any + Send + Sync>(name: impl Into<Identifier>, value: T) -> TaskRef {
        let spec = PropertySpec::new::<T>(name);
        Arc::new(ConstantTask {
            name: spec.name.clone(),
            inputs: SpecMap::new(),
            outputs: [(spec.name.clone(), spec)].into_iter().collect(),
            value: Arc::new(value),
        })
    }
}

impl Task for ConstantTask {
    fn name(&self) -> &Identifier {
        &self.name
    }

    fn input_specs(&self) -> &SpecMap {
        &self.inputs
    }

    fn output_specs(&self) -> &SpecMap {
        &self.outputs
    }

    fn run(&self, ctx: &mut RunContext) -> Result<TaskStatus> {
        let spec = self.outputs.values().next().ok_or(Error::Uncategorized("Constant task without output"))?;
        let local = ctx
            .item()
            .output_binding(&spec.name)
            .ok_or_else(|| Error::NoBinding {
                task: self.name.clone(),
                name: spec.name.clone(),
            })?
            .clone();
        ctx.scope.set_dynamic(local, spec.ty, self.value.clone());
        Ok(TaskStatus::Done)
    }
}
