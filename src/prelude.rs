pub use crate::core::error::Error;
pub use crate::core::settings::*;

pub use crate::util::ident::Identifier;
pub use crate::util::sorted_map::SortedMap;
pub use crate::util::type_token::TypeToken;

pub use crate::graph::executor::{ComposeReport, ComposeState, Executor};
pub use crate::graph::export::{ExportGraph, ExportNode, GraphViz};
pub use crate::graph::method::{ListenerId, Method, MethodRef};
pub use crate::graph::pipeline::{PipeItem, Pipeline};
pub use crate::graph::property::{spec_map, PropertySpec, SpecMap};
pub use crate::graph::resource::{ResourcePreparer, ResourceRequests};
pub use crate::graph::scope::{Property, PropertyScope};
pub use crate::graph::task::*;
