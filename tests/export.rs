use anyhow::Result;

use lumen::{ComposeBuilder, Executor, ExportNode, GraphViz, Method, Pipeline, PropertyScope};

mod framework;

use framework::{spec, sum_task, task};

fn lighting_method() -> lumen::MethodRef {
    let method = Method::new("lighting");
    method.register_task(task("gbuffer", &["camera"], &["depth", "normals"]));
    method.register_task(task("shade", &["depth", "normals"], &["radiance"]));
    method
}

#[test]
pub fn graph_has_tasks_inputs_and_outputs() -> Result<()> {
    let pipeline = Pipeline::for_outputs(&lighting_method(), &[spec("radiance"), spec("sky")])?;
    let graph = pipeline.export_graph();

    let tasks = graph.node_weights().filter(|node| matches!(node, ExportNode::Task(..))).count();
    let inputs = graph.node_weights().filter(|node| matches!(node, ExportNode::Input(_))).count();
    let outputs = graph.node_weights().filter(|node| matches!(node, ExportNode::Output(_))).count();
    assert_eq!((tasks, inputs, outputs), (2, 2, 2));
    // camera -> gbuffer, depth and normals -> shade, shade -> radiance, sky -> sky.
    assert_eq!(graph.edge_count(), 5);
    Ok(())
}

#[test]
pub fn dot_output_names_everything() -> Result<()> {
    let pipeline = Pipeline::for_outputs(&lighting_method(), &[spec("radiance")])?;
    let dot = pipeline.dot()?;
    assert!(dot.starts_with("digraph"));
    for name in ["gbuffer", "shade", "camera", "normals", "radiance"] {
        assert!(dot.contains(name), "{name} is missing from\n{dot}");
    }
    Ok(())
}

#[test]
pub fn svg_can_be_rendered() -> Result<()> {
    let pipeline = Pipeline::for_outputs(&lighting_method(), &[spec("radiance")])?;
    let svg = pipeline.svg()?;
    assert!(svg.contains("<svg"));
    Ok(())
}

#[test]
pub fn rebuild_exports_when_configured() -> Result<()> {
    framework::init_logging();
    let path = std::env::temp_dir().join(format!("lumen-export-{}.dot", std::process::id()));
    let method = Method::new("m");
    method.register_task(sum_task("add", &["a"], &["b"], 1));

    let settings = ComposeBuilder::new().graph_export(&path).build();
    let mut executor = Executor::new(method, settings);
    executor.set_desired_outputs([spec("b")]);
    let mut scope = PropertyScope::new();
    scope.set("a", 1)?;
    executor.compose(&mut scope)?;

    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.contains("add"));
    std::fs::remove_file(&path)?;
    Ok(())
}
