#![warn(clippy::all)]
#![allow(clippy::must_use_candidate)]

pub mod bindings;
pub mod eval;
pub mod ir;
pub mod registry;
pub mod rendered;
pub mod spec;
pub mod track;
pub mod value;

pub use bindings::Bindings;
pub use eval::{evaluate, EvalContext, Mounts};
pub use ir::CompiledTemplate;
pub use registry::{ComponentDef, ComponentRegistry};
pub use rendered::{ComponentId, ComponentNode, Dynamic, Rendered};
pub use track::{Changed, ChangedSet};
pub use value::Value;
