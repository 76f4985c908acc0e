//! Property-driven task resolution and execution for frame composition.
//!
//! Lumen plans the work needed to produce a frame. Every piece of work is a [`Task`] that declares the named,
//! typed properties it reads and writes. Given the properties a caller wants, lumen finds the tasks that produce
//! them, orders them so every producer runs before its consumers, and reports which properties the caller has to
//! supply. It then runs that plan and plans again whenever a task finds out at run time that its requirements changed.
//!
//! To get started, import everything through the prelude
//! ```
//! use lumen::prelude::*;
//!
//! // Or, since the prelude is re-exported
//! use lumen::*;
//! ```
//!
//! # Example
//!
//! First, register the available tasks in a [`Method`]. Only the declared inputs and outputs matter for planning.
//! ```
//! use lumen::*;
//!
//! let method = Method::new("forward");
//! method.register_task(
//!     TaskBuilder::new("geometry")
//!         .input::<u32>("frame_index")
//!         .output::<Vec<f32>>("depth")
//!         .output::<Vec<f32>>("normals")
//!         .build(),
//! );
//! method.register_task(
//!     TaskBuilder::new("lighting")
//!         .input::<Vec<f32>>("depth")
//!         .input::<Vec<f32>>("normals")
//!         .output::<Vec<f32>>("radiance")
//!         .build(),
//! );
//!
//! // Resolve what is needed to produce the radiance.
//! let pipeline = Pipeline::for_outputs(&method, &[PropertySpec::new::<Vec<f32>>("radiance")])?;
//! let order: Vec<_> = pipeline.items().iter().map(|item| item.task().name().to_string()).collect();
//! assert_eq!(order, ["geometry", "lighting"]);
//! // The frame index is not produced by any task, so the caller supplies it.
//! assert!(pipeline.input_specs().contains_key(&"frame_index".into()));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! For running pipelines and replanning, see the [`graph`] module and [`Executor`].
//! For further code, check out the following modules
//! - [`graph`] for tasks, methods, resolution and execution.
//! - [`core`] for errors and settings.
//! - [`util`] for identifiers, type tokens and the sorted map used throughout.

#[macro_use]
extern crate derivative;
#[macro_use] extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod core;
pub mod graph;
pub mod util;
