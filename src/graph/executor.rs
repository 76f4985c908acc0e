//! The executor runs resolved pipelines and plans them again whenever the requirements change.
//!
//! One call to [`Executor::compose`] is one compose cycle. The executor moves through these states:
//!
//! - [`ComposeState::NeedsRebuild`]: the desired outputs or the method changed, or a task reported
//!   [`TaskStatus::RequirementsChanged`]. The next cycle resolves a new pipeline.
//! - [`ComposeState::Planned`]: a pipeline was resolved and its resources were declared.
//! - [`ComposeState::Running`]: the pipeline is executing. If a task reports changed requirements, the whole
//!   cycle is discarded and planning starts over, at most [`ComposeSettings::max_replans`] times.
//! - [`ComposeState::Idle`]: the cycle completed and all preparers were flushed.
//!
//! The executor does no locking of its own. If the method or the scope are mutated from another thread, the caller
//! serializes those mutations with the compose cycle.
//!
//! # Example
//! ```
//! use lumen::*;
//!
//! let method = Method::new("main");
//! method.register_task(
//!     TaskBuilder::new("double")
//!         .input::<i32>("value")
//!         .output::<i32>("doubled")
//!         .execute(|ctx| {
//!             let value = *ctx.input::<i32>("value")?;
//!             ctx.set_output("doubled", value * 2)?;
//!             Ok(TaskStatus::Done)
//!         })
//!         .build(),
//! );
//!
//! let mut executor = Executor::new(method, ComposeSettings::default());
//! executor.set_desired_outputs([PropertySpec::new::<i32>("doubled")]);
//!
//! let mut scope = PropertyScope::new();
//! scope.set("value", 21)?;
//! let report = executor.compose(&mut scope)?;
//! assert_eq!(report.replans, 0);
//! assert_eq!(*scope.get::<i32>(&"doubled".into())?, 42);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;

use crate::core::settings::ComposeSettings;
use crate::graph::export::GraphViz;
use crate::graph::method::MethodRef;
use crate::graph::pipeline::Pipeline;
use crate::graph::property::PropertySpec;
use crate::graph::resource::{ResourcePreparer, ResourceRequests};
use crate::graph::scope::PropertyScope;
use crate::graph::task::{ResolveContext, RunContext, TaskStatus};
use crate::util::ident::Identifier;
use crate::Error;

/// State of the compose state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComposeState {
    Idle,
    NeedsRebuild,
    Planned,
    Running,
}

/// Summary of a completed compose cycle.
#[derive(Debug, Clone)]
pub struct ComposeReport {
    /// How many times the cycle was discarded and planned again.
    pub replans: usize,
    /// Tasks executed during the cycle, including those of discarded attempts.
    pub items_run: usize,
    /// The resources that were requested for the final pipeline.
    pub resources: ResourceRequests,
}

/// Owns the current pipeline and drives compose cycles.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Executor {
    settings: ComposeSettings,
    method: MethodRef,
    desired: Vec<PropertySpec>,
    pipeline: Option<Pipeline>,
    state: ComposeState,
    planned_hash: Option<u64>,
    #[derivative(Debug = "ignore")]
    preparers: Vec<Box<dyn ResourcePreparer>>,
    requests: ResourceRequests,
}

enum RunOutcome {
    Completed,
    Replan(Identifier),
}

impl Executor {
    /// Create an executor for `method`. Nothing is planned until the first compose cycle.
    pub fn new(method: MethodRef, settings: ComposeSettings) -> Self {
        Self {
            settings,
            method,
            desired: Vec::new(),
            pipeline: None,
            state: ComposeState::NeedsRebuild,
            planned_hash: None,
            preparers: Vec::new(),
            requests: ResourceRequests::new(),
        }
    }

    /// Replace the method tasks are taken from.
    pub fn set_method(&mut self, method: MethodRef) {
        trace!("Executor switched to method {}", method.name());
        self.method = method;
        self.invalidate();
    }

    /// Set the properties the next compose cycles produce, in priority order.
    /// Setting the same outputs again does not cause a rebuild.
    pub fn set_desired_outputs(&mut self, outputs: impl IntoIterator<Item = PropertySpec>) {
        let outputs: Vec<PropertySpec> = outputs.into_iter().collect();
        if outputs != self.desired {
            self.desired = outputs;
            self.invalidate();
        }
    }

    /// Force a rebuild at the start of the next compose cycle.
    pub fn invalidate(&mut self) {
        self.state = ComposeState::NeedsRebuild;
    }

    /// Register a resource preparer. Preparers are consulted in registration order.
    pub fn add_preparer(&mut self, preparer: impl ResourcePreparer + 'static) {
        self.preparers.push(Box::new(preparer));
        self.invalidate();
    }

    pub fn state(&self) -> ComposeState {
        self.state
    }

    /// The most recently resolved pipeline.
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    pub fn desired_outputs(&self) -> &[PropertySpec] {
        &self.desired
    }

    pub fn settings(&self) -> &ComposeSettings {
        &self.settings
    }

    /// Resources requested for the current pipeline.
    pub fn requests(&self) -> &ResourceRequests {
        &self.requests
    }

    /// Returns true if the next compose cycle has to resolve a new pipeline.
    pub fn needs_rebuild(&self) -> bool {
        self.state == ComposeState::NeedsRebuild
            || self.pipeline.is_none()
            || self.planned_hash != Some(self.method.preference_hash())
    }

    /// Resolve a new pipeline for the desired outputs and prepare its resources.
    /// # Errors
    /// - Fails if resolution fails, see [`Pipeline::resolve`].
    /// - Fails if a task or preparer fails to declare its resources.
    /// - Fails if a requested resource is not provided by any preparer.
    /// - Fails if the graph cannot be exported when [`ComposeSettings::graph_export`] is set.
    pub fn rebuild(&mut self, scope: &PropertyScope) -> Result<()> {
        self.state = ComposeState::NeedsRebuild;
        let hash = self.method.preference_hash();
        let pipeline = Pipeline::resolve(
            &self.method,
            &self.desired,
            &ResolveContext::with_scope(scope),
            self.settings.unsatisfied,
        )?;
        info!(
            "Rebuilt pipeline for {} outputs using method {}: {} tasks",
            self.desired.len(),
            self.method.name(),
            pipeline.len()
        );

        // Consumers announce resources their producers write into, so walk back to front.
        let mut requests = ResourceRequests::new();
        for item in pipeline.items().iter().rev() {
            item.task().declare_resources(item, &mut requests)?;
            for preparer in &mut self.preparers {
                preparer.declare(item, &mut requests)?;
            }
        }
        for (task, resource) in requests.iter() {
            if !self.preparers.iter().any(|preparer| preparer.provides(resource)) {
                return Err(Error::MissingResource {
                    task: task.clone(),
                    resource: resource.clone(),
                }
                .into());
            }
        }
        if !requests.is_empty() {
            debug!("Pipeline requests {} resources", requests.len());
        }

        if let Some(path) = &self.settings.graph_export {
            pipeline.export(path)?;
            debug!("Exported pipeline graph to {}", path.display());
        }

        self.pipeline = Some(pipeline);
        self.requests = requests;
        self.planned_hash = Some(hash);
        self.state = ComposeState::Planned;
        Ok(())
    }

    /// Run one compose cycle: rebuild if needed, then run every task of the pipeline in order.
    /// # Errors
    /// - Fails if a rebuild fails, see [`Executor::rebuild`].
    /// - Fails if a task fails. The pipeline is kept, the next cycle runs it again.
    /// - Fails with [`Error::NonConvergent`] if tasks keep reporting changed requirements.
    /// - Fails if a preparer fails to flush.
    pub fn compose(&mut self, scope: &mut PropertyScope) -> Result<ComposeReport> {
        let mut replans = 0;
        let mut items_run = 0;
        loop {
            if self.needs_rebuild() {
                self.rebuild(scope)?;
            }

            self.state = ComposeState::Running;
            let outcome = match self.run_items(scope, &mut items_run) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.state = ComposeState::Idle;
                    return Err(err);
                }
            };

            match outcome {
                RunOutcome::Completed => break,
                RunOutcome::Replan(task) => {
                    replans += 1;
                    self.state = ComposeState::NeedsRebuild;
                    if replans > self.settings.max_replans {
                        error!("Requirements keep changing after {} replans, giving up", replans - 1);
                        return Err(Error::NonConvergent {
                            replans: replans - 1,
                        }
                        .into());
                    }
                    warn!("Task {task} reported changed requirements, planning again");
                }
            }
        }

        for preparer in &mut self.preparers {
            preparer.flush(&self.requests)?;
        }
        self.state = ComposeState::Idle;
        Ok(ComposeReport {
            replans,
            items_run,
            resources: self.requests.clone(),
        })
    }

    fn run_items(&self, scope: &mut PropertyScope, items_run: &mut usize) -> Result<RunOutcome> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or(Error::Uncategorized("No pipeline was planned"))?;
        for (index, item) in pipeline.items().iter().enumerate() {
            let task = item.task();
            trace!("Running task {} ({}/{})", task.name(), index + 1, pipeline.len());
            let mut ctx = RunContext::new(item, scope);
            let status = task.run(&mut ctx)?;
            *items_run += 1;
            if status == TaskStatus::RequirementsChanged {
                return Ok(RunOutcome::Replan(task.name().clone()));
            }
        }
        Ok(RunOutcome::Completed)
    }
}
