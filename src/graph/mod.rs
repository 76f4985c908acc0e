//! The graph system turns a set of desired output properties into an ordered list of tasks, and runs that list.
//!
//! Tasks are registered in a [`Method`](method::Method), which maps every property name to the task that produces it. Methods can
//! fall back to other methods, so a specialized method only needs to provide the tasks it overrides. A [`Pipeline`](pipeline::Pipeline)
//! is resolved from a method and a list of desired outputs, and an [`Executor`](executor::Executor) keeps that pipeline up to date and
//! runs it against a [`PropertyScope`](scope::PropertyScope).
//!
//! Through the [`GraphViz`](export::GraphViz) trait, it's possible to export a graphviz-compatible dot file to display a resolved pipeline.
//!
//! # Example
//!
//! ```
//! use lumen::*;
//!
//! let base = Method::new("base");
//! base.register_task(ConstantTask::new("exposure", 1.5f32));
//! base.register_task(
//!     TaskBuilder::new("shade")
//!         .input::<f32>("exposure")
//!         .output::<f32>("color")
//!         .execute(|ctx| {
//!             let exposure = *ctx.input::<f32>("exposure")?;
//!             ctx.set_output("color", exposure * 0.5)?;
//!             Ok(TaskStatus::Done)
//!         })
//!         .build(),
//! );
//!
//! // Override the exposure, keep everything else.
//! let bright = Method::new("bright");
//! bright.register_task(ConstantTask::new("exposure", 4.0f32));
//! bright.register_fallback_method(base.clone());
//!
//! let mut executor = Executor::new(bright, ComposeSettings::default());
//! executor.set_desired_outputs([PropertySpec::new::<f32>("color")]);
//! let mut scope = PropertyScope::new();
//! executor.compose(&mut scope)?;
//! assert_eq!(*scope.get::<f32>(&"color".into())?, 2.0);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! For more complex tasks, see the [`task`] module documentation.

pub mod executor;
pub mod export;
pub mod method;
pub mod pipeline;
pub mod property;
pub mod resource;
pub mod scope;
pub mod task;
