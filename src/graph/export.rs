//! Debug export of resolved pipelines as graphviz graphs.
//!
//! Nodes are the tasks of the pipeline, the boundary inputs it needs and the outputs it was resolved for.
//! Every edge carries the name of the property flowing along it. Exporting has no effect on resolution.

use std::fmt::{Display, Formatter};
use std::path::Path;

use anyhow::Result;
use layout::backends::svg::SVGWriter;
use layout::gv;
use layout::gv::GraphBuilder;
use petgraph::dot::Dot;
use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::Graph;

use crate::graph::pipeline::Pipeline;
use crate::util::ident::Identifier;
use crate::util::sorted_map::SortedMap;
use crate::Error;

/// Node in an exported pipeline graph.
#[derive(Debug, Clone)]
pub enum ExportNode {
    /// A property the caller supplies.
    Input(Identifier),
    /// A task, with its position in the pipeline.
    Task(usize, Identifier),
    /// A property the pipeline was resolved for.
    Output(Identifier),
}

impl Display for ExportNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportNode::Input(name) => write!(f, "Input: {name}"),
            ExportNode::Task(index, name) => write!(f, "#{index} {name}"),
            ExportNode::Output(name) => write!(f, "Output: {name}"),
        }
    }
}

/// Graph structure of an exported pipeline, edges are labelled with property names.
pub type ExportGraph = Graph<ExportNode, String>;

/// Trait that is implemented for pipelines to help with debugging and visualizing them.
pub trait GraphViz {
    /// Get the graph structure.
    fn export_graph(&self) -> ExportGraph;

    /// Get the string representation of this graph in `dot` format.
    fn dot(&self) -> Result<String> {
        let graph = self.export_graph();
        Ok(format!(
            "{}",
            Dot::with_attr_getters(&graph, &[], &get_edge_attributes, &get_node_attributes)
        ))
    }

    /// Render the graph to an svg image.
    fn svg(&self) -> Result<String> {
        let dot = self.dot()?;
        let mut parser = gv::DotParser::new(&dot);
        let graph = parser.process().map_err(Error::GraphExport)?;
        let mut builder = GraphBuilder::new();
        builder.visit_graph(&graph);
        let mut visual = builder.get();
        let mut svg = SVGWriter::new();
        visual.do_it(false, false, false, &mut svg);
        Ok(svg.finalize())
    }

    /// Write the graph to a file. Paths with an `svg` extension receive a rendered image, all other paths the dot source.
    fn export(&self, path: &Path) -> Result<()> {
        let is_svg = path
            .extension()
            .map_or(false, |extension| extension.eq_ignore_ascii_case("svg"));
        let contents = if is_svg { self.svg()? } else { self.dot()? };
        std::fs::write(path, contents)
            .map_err(|err| Error::GraphExport(format!("{}: {err}", path.display())))?;
        Ok(())
    }
}

fn get_edge_attributes(_: &ExportGraph, _: EdgeReference<String>) -> String {
    String::from("")
}

fn get_node_attributes(_: &ExportGraph, node: (NodeIndex, &ExportNode)) -> String {
    match node.1 {
        ExportNode::Task(..) => String::from("fillcolor = \"#5e6df7\""),
        ExportNode::Input(_) => String::from("fillcolor = \"#f7c65e\" shape=box"),
        ExportNode::Output(_) => String::from("fillcolor = \"#5ef78a\" shape=box"),
    }
}

impl GraphViz for Pipeline {
    fn export_graph(&self) -> ExportGraph {
        let mut graph = ExportGraph::new();
        let mut inputs = SortedMap::new();
        for name in self.input_specs().keys() {
            inputs.insert(name.clone(), graph.add_node(ExportNode::Input(name.clone())));
        }

        // Variable name to the node that last wrote it.
        let mut writers: SortedMap<NodeIndex> = SortedMap::new();
        for (index, item) in self.items().iter().enumerate() {
            let node = graph.add_node(ExportNode::Task(index, item.task().name().clone()));
            for (name, variable) in item.inputs() {
                let source = writers.get(variable).or_else(|| inputs.get(variable));
                if let Some(&source) = source {
                    graph.add_edge(source, node, name.to_string());
                }
            }
            for (_, variable) in item.outputs() {
                writers.insert(variable.clone(), node);
            }
        }

        for name in self.output_specs().keys() {
            let node = graph.add_node(ExportNode::Output(name.clone()));
            let source = writers.get(name).or_else(|| inputs.get(name));
            if let Some(&source) = source {
                graph.add_edge(source, node, name.to_string());
            }
        }
        graph
    }
}
