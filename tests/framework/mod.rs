#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;

use lumen::{
    Identifier, PipeItem, Pipeline, PropertySpec, ResourcePreparer, ResourceRequests, TaskBuilder, TaskRef,
    TaskStatus,
};

/// Initializes logging once for the whole test binary. Set `RUST_LOG` to see output.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Spec of an `i32` property, the type used by most test tasks.
pub fn spec(name: &str) -> PropertySpec {
    PropertySpec::new::<i32>(name)
}

pub fn specs(names: &[&str]) -> Vec<PropertySpec> {
    names.iter().map(|name| spec(name)).collect()
}

/// Creates a task with `i32` inputs and outputs that does nothing when it runs.
pub fn task(name: &str, inputs: &[&str], outputs: &[&str]) -> TaskRef {
    let builder = inputs.iter().fold(TaskBuilder::new(name), |builder, input| builder.input::<i32>(*input));
    outputs.iter().fold(builder, |builder, output| builder.output::<i32>(*output)).build()
}

/// Creates a task that writes the sum of its inputs plus `offset` to every output.
pub fn sum_task(name: &str, inputs: &[&str], outputs: &[&str], offset: i32) -> TaskRef {
    let input_names: Vec<String> = inputs.iter().map(|input| input.to_string()).collect();
    let output_names: Vec<String> = outputs.iter().map(|output| output.to_string()).collect();
    let builder = inputs.iter().fold(TaskBuilder::new(name), |builder, input| builder.input::<i32>(*input));
    outputs
        .iter()
        .fold(builder, |builder, output| builder.output::<i32>(*output))
        .execute(move |ctx| {
            let mut sum = offset;
            for input in &input_names {
                sum += *ctx.input::<i32>(input.as_str())?;
            }
            for output in &output_names {
                ctx.set_output(output.as_str(), sum)?;
            }
            Ok(TaskStatus::Done)
        })
        .build()
}

/// Names of the tasks in a pipeline, in execution order.
pub fn task_names(pipeline: &Pipeline) -> Vec<String> {
    pipeline
        .items()
        .iter()
        .map(|item| item.task().name().to_string())
        .collect()
}

pub fn names(ids: impl IntoIterator<Item = Identifier>) -> Vec<String> {
    ids.into_iter().map(|id| id.to_string()).collect()
}

/// A preparer that provides a fixed set of resources and records every call it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingPreparer {
    pub provided: Vec<Identifier>,
    /// Task names, in the order `declare` saw them.
    pub declared: Arc<Mutex<Vec<String>>>,
    pub flushes: Arc<Mutex<usize>>,
}

impl RecordingPreparer {
    pub fn new(provided: &[&str]) -> Self {
        Self {
            provided: provided.iter().map(|name| Identifier::new(name)).collect(),
            ..Default::default()
        }
    }

    pub fn declared(&self) -> Vec<String> {
        self.declared.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        *self.flushes.lock().unwrap()
    }
}

impl ResourcePreparer for RecordingPreparer {
    fn declare(&mut self, item: &PipeItem, _requests: &mut ResourceRequests) -> Result<()> {
        self.declared.lock().unwrap().push(item.task().name().to_string());
        Ok(())
    }

    fn provides(&self, resource: &Identifier) -> bool {
        self.provided.contains(resource)
    }

    fn flush(&mut self, _requests: &ResourceRequests) -> Result<()> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}
