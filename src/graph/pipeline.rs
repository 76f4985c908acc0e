//! The pipeline module holds the resolver, which turns a set of desired outputs into an ordered list of tasks.
//!
//! # Resolution
//!
//! Resolution starts from every desired output, in the order given, and asks the [`Method`] for a producing task.
//! If there is one, it claims every output the method resolves to it and its inputs are resolved recursively before
//! the task itself is appended to the pipeline. An output the method resolves to another task is written to the
//! shadow variable `"{task}/{name}"` instead, so the value under a name always comes from the task the method picks
//! for it, whatever the order of the desired outputs. Appending after the recursion guarantees every task comes after the
//! producers of its inputs. A property without producer becomes a boundary input that the caller must supply, and
//! a desired output without producer additionally becomes a *pipethrough*: its value is passed through unchanged.
//!
//! A task input that has the same name as one of that task's own outputs is never resolved. It is a boundary
//! input holding the value the task wrote during its previous execution (see the [`task`](crate::graph::task)
//! module documentation).
//!
//! Resolution is deterministic: it only depends on the desired output order, the registration order of tasks and
//! fallbacks in the method, and the input order of each task.
//!
//! # Example
//! ```
//! use lumen::*;
//!
//! let method = Method::new("main");
//! method.register_task(
//!     TaskBuilder::new("blur")
//!         .input::<f32>("radius")
//!         .input::<Vec<f32>>("image")
//!         .output::<Vec<f32>>("blurred")
//!         .build(),
//! );
//!
//! let pipeline = Pipeline::for_outputs(&method, &[PropertySpec::new::<Vec<f32>>("blurred")])?;
//! assert_eq!(pipeline.len(), 1);
//! assert!(pipeline.input_specs().contains_key(&"radius".into()));
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::collections::HashSet;

use anyhow::Result;
use static_assertions::assert_impl_all;

use crate::core::settings::UnsatisfiedPolicy;
use crate::graph::method::Method;
use crate::graph::property::{PropertySpec, SpecMap};
use crate::graph::task::{same_task, ResolveContext, TaskRef};
use crate::util::ident::Identifier;
use crate::util::sorted_map::SortedMap;
use crate::Error;

/// One task in a resolved pipeline, with the variables its inputs and outputs are bound to.
#[derive(Debug, Clone)]
pub struct PipeItem {
    pub(crate) task: TaskRef,
    pub(crate) input_to_local_variables: SortedMap<Identifier>,
    pub(crate) output_to_local_variables: SortedMap<Identifier>,
}

impl PipeItem {
    /// The task executed by this item.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Variable that input `name` of the task is bound to.
    pub fn input_binding(&self, name: &Identifier) -> Option<&Identifier> {
        self.input_to_local_variables.get(name)
    }

    /// Variable that output `name` of the task is bound to.
    pub fn output_binding(&self, name: &Identifier) -> Option<&Identifier> {
        self.output_to_local_variables.get(name)
    }

    /// All input bindings, as `(input, variable)` pairs.
    pub fn inputs(&self) -> impl Iterator<Item = (&Identifier, &Identifier)> {
        self.input_to_local_variables.iter()
    }

    /// All output bindings, as `(output, variable)` pairs.
    pub fn outputs(&self) -> impl Iterator<Item = (&Identifier, &Identifier)> {
        self.output_to_local_variables.iter()
    }
}

/// The ordered result of resolving a set of desired outputs. A pipeline is never modified after resolution,
/// a change in requirements produces a new one.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    items: Vec<PipeItem>,
    input_specs: SpecMap,
    output_specs: SpecMap,
    local_specs: SpecMap,
    pipethrough_input_names: Vec<Identifier>,
}

assert_impl_all!(Pipeline: Send, Sync);

struct Resolver<'a> {
    method: &'a Method,
    ctx: &'a ResolveContext<'a>,
    policy: UnsatisfiedPolicy,
    visited_outputs: HashSet<Identifier>,
    /// Outputs claimed by tasks that are currently being resolved, mapped to that task.
    in_progress: SortedMap<TaskRef>,
    known_types: SpecMap,
    pipeline: Pipeline,
}

impl<'a> Resolver<'a> {
    fn check_type(&mut self, spec: &PropertySpec) -> Result<()> {
        match self.known_types.get(&spec.name) {
            Some(known) => known.check_compatible(spec),
            None => {
                self.known_types.insert(spec.name.clone(), spec.clone());
                Ok(())
            }
        }
    }

    fn try_add_dependency(&mut self, spec: &PropertySpec, is_final_output: bool) -> Result<()> {
        self.check_type(spec)?;
        if self.visited_outputs.contains(&spec.name) {
            return Ok(());
        }

        match self.method.get_task(&spec.name) {
            Some(task) => self.add_task(task),
            None => self.add_boundary_input(spec, is_final_output),
        }
    }

    /// Returns true if `task` is the task the method resolves `name` to. Only that task writes the variable `name`.
    fn is_producer(&self, task: &TaskRef, name: &Identifier) -> bool {
        self.method
            .get_task(name)
            .map_or(true, |producer| same_task(&producer, task))
    }

    fn add_task(&mut self, task: TaskRef) -> Result<()> {
        // Claim outputs before descending, so shared producers terminate.
        let mut claimed = Vec::new();
        let mut output_to_local_variables = SortedMap::new();
        for (name, spec) in task.output_specs() {
            self.check_type(spec)?;
            if self.is_producer(&task, name) && self.visited_outputs.insert(name.clone()) {
                self.in_progress.insert(name.clone(), task.clone());
                if !self.pipeline.output_specs.contains_key(name) {
                    self.pipeline.local_specs.insert(name.clone(), spec.clone());
                }
                output_to_local_variables.insert(name.clone(), name.clone());
                claimed.push(name.clone());
            } else {
                // The method picks another task for this name, keep the value out of its variable.
                let shadow = Identifier::new(format!("{}/{}", task.name(), name));
                debug!("{} is produced by another task, binding the output of {} to {}", name, task.name(), shadow);
                self.pipeline
                    .local_specs
                    .insert(shadow.clone(), PropertySpec::with_type(shadow.clone(), spec.ty));
                output_to_local_variables.insert(name.clone(), shadow);
            }
        }

        let inputs = task.resolve_inputs(self.ctx)?;
        let mut input_to_local_variables = SortedMap::new();
        for (name, spec) in &inputs {
            let variable = match output_to_local_variables.get(name) {
                Some(variable) => {
                    // Stateful property, the value comes from the previous execution of this task.
                    self.check_type(spec)?;
                    self.pipeline
                        .input_specs
                        .insert(variable.clone(), PropertySpec::with_type(variable.clone(), spec.ty));
                    variable.clone()
                }
                None => {
                    if let Some(producer) = self.in_progress.get(name) {
                        if !same_task(producer, &task) {
                            return Err(Error::DependencyCycle {
                                task: task.name().clone(),
                                property: name.clone(),
                            }
                            .into());
                        }
                    }
                    self.try_add_dependency(spec, false)?;
                    name.clone()
                }
            };
            input_to_local_variables.insert(name.clone(), variable);
        }

        for name in &claimed {
            self.in_progress.remove(name);
        }

        trace!("Resolved task {} at position {}", task.name(), self.pipeline.items.len());
        self.pipeline.items.push(PipeItem {
            task,
            input_to_local_variables,
            output_to_local_variables,
        });
        Ok(())
    }

    fn add_boundary_input(&mut self, spec: &PropertySpec, is_final_output: bool) -> Result<()> {
        self.pipeline.input_specs.insert(spec.name.clone(), spec.clone());
        if !is_final_output {
            return Ok(());
        }

        match self.policy {
            UnsatisfiedPolicy::Deny => return Err(Error::UnsatisfiedOutput(spec.name.clone()).into()),
            UnsatisfiedPolicy::Warn => warn!("No task produces desired output {}, passing it through", spec.name),
            UnsatisfiedPolicy::Allow => debug!("Passing through {}", spec.name),
        }
        if !self.pipeline.pipethrough_input_names.contains(&spec.name) {
            self.pipeline.pipethrough_input_names.push(spec.name.clone());
        }
        Ok(())
    }
}

impl Pipeline {
    /// Resolve a pipeline producing `outputs`, using the tasks available through `method`.
    /// # Errors
    /// - Fails if the method's fallback chain contains a cycle.
    /// - Fails if one property name is used with two different types.
    /// - Fails if two different tasks depend on each other's outputs.
    /// - Fails if a desired output has no producer and `policy` is [`UnsatisfiedPolicy::Deny`].
    /// - Fails if a task cannot determine its inputs.
    pub fn resolve(
        method: &Method,
        outputs: &[PropertySpec],
        ctx: &ResolveContext,
        policy: UnsatisfiedPolicy,
    ) -> Result<Self> {
        method.check_fallback_chain()?;

        let mut resolver = Resolver {
            method,
            ctx,
            policy,
            visited_outputs: HashSet::new(),
            in_progress: SortedMap::new(),
            known_types: SpecMap::new(),
            pipeline: Pipeline::default(),
        };
        for spec in outputs {
            resolver.check_type(spec)?;
            resolver.pipeline.output_specs.insert(spec.name.clone(), spec.clone());
        }
        for spec in outputs {
            resolver.try_add_dependency(spec, true)?;
        }

        let pipeline = resolver.pipeline;
        debug!(
            "Resolved {} outputs into {} tasks ({} inputs, {} locals, {} pipethroughs)",
            outputs.len(),
            pipeline.items.len(),
            pipeline.input_specs.len(),
            pipeline.local_specs.len(),
            pipeline.pipethrough_input_names.len()
        );
        Ok(pipeline)
    }

    /// Resolve with an empty resolution context and the default [`UnsatisfiedPolicy`].
    pub fn for_outputs(method: &Method, outputs: &[PropertySpec]) -> Result<Self> {
        Self::resolve(method, outputs, &ResolveContext::new(), UnsatisfiedPolicy::default())
    }

    /// The resolved tasks, in execution order.
    pub fn items(&self) -> &[PipeItem] {
        &self.items
    }

    /// Properties the caller must supply before execution.
    pub fn input_specs(&self) -> &SpecMap {
        &self.input_specs
    }

    /// The properties this pipeline was resolved for.
    pub fn output_specs(&self) -> &SpecMap {
        &self.output_specs
    }

    /// Intermediate properties, produced and consumed within the pipeline.
    pub fn local_specs(&self) -> &SpecMap {
        &self.local_specs
    }

    /// Desired outputs without producer, which must be supplied under the same name.
    pub fn pipethrough_input_names(&self) -> &[Identifier] {
        &self.pipethrough_input_names
    }

    pub fn is_pipethrough(&self, name: &Identifier) -> bool {
        self.pipethrough_input_names.contains(name)
    }

    /// Position of the item writing variable `name`, if any.
    pub fn producer_of(&self, name: &Identifier) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.outputs().any(|(_, variable)| variable == name))
    }

    /// Returns the total amount of items in the pipeline.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
