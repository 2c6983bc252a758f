#![warn(clippy::all)]
#![allow(clippy::must_use_candidate)]

mod diff;
mod live;
mod patch;

pub use crate::diff::diff;
pub use crate::live::LiveTemplate;
pub use crate::patch::{
    ComponentPatch, ComprehensionItems, ComprehensionPatch, ListPatch, Move, Patch, SlotPatch,
};
