use serde_json::{json, Map as JsonMap, Value as Json};

use std::collections::BTreeMap;

use template::rendered::ComponentId;

/// The minimal wire description of the difference between two render
/// trees. An empty patch means no message is sent at all.
///
/// Wire shape:
/// - `"s"` (statics) is present only on a full replace.
/// - each changed dynamic index appears under its decimal string key.
/// - comprehensions use `"d"` (an array replaces every item, an object
///   is a sparse per-index map) plus `"s"` when their statics changed,
///   or `"m"` when a keyed reorder moved components without content.
/// - `"c"` maps component ids to their patches; an explicit `null` is
///   the removal tombstone, distinguishable from "unchanged, omitted",
///   so clients can release resources tied to the id.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Patch {
    pub statics: Option<Vec<String>>,
    pub slots: BTreeMap<usize, SlotPatch>,
    pub components: BTreeMap<ComponentId, ComponentPatch>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SlotPatch {
    /// A re-rendered scalar value.
    Value(String),
    /// A nested patch, keyed by this slot index.
    Nested(Box<Patch>),
    /// The slot now shows the component with this id; its content
    /// travels under `"c"`.
    Component(ComponentId),
    /// A list of nested trees.
    List(ListPatch),
    /// A loop.
    Comprehension(ComprehensionPatch),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ListPatch {
    Replace(Vec<Patch>),
    Sparse(BTreeMap<usize, Patch>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComprehensionPatch {
    /// The shared per-item statics, only on structural change.
    pub statics: Option<Vec<String>>,
    pub items: ComprehensionItems,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ComprehensionItems {
    /// Every per-item dynamics tuple.
    Replace(Vec<Vec<SlotPatch>>),
    /// Only the tuples at changed indices.
    Sparse(BTreeMap<usize, Vec<SlotPatch>>),
    /// A keyed reorder: relocate existing components, send no content.
    Moves(Vec<Move>),
}

/// One relocation instruction: put the component with `id` at item
/// position `to`. Components not mentioned keep their relative order.
#[derive(Clone, Debug, PartialEq)]
pub struct Move {
    pub id: ComponentId,
    pub to: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ComponentPatch {
    /// A component new to the tree: its full content.
    Mount(Patch),
    /// An incremental patch for a component that kept its id.
    Update(Patch),
    /// The removal tombstone.
    Delete,
}

impl Patch {
    pub fn new() -> Patch {
        Patch::default()
    }

    pub fn is_empty(&self) -> bool {
        self.statics.is_none() && self.slots.is_empty() && self.components.is_empty()
    }

    pub fn to_json(&self) -> Json {
        let mut object = JsonMap::new();
        if let Some(statics) = &self.statics {
            object.insert("s".to_string(), json!(statics));
        }
        for (slot, patch) in &self.slots {
            object.insert(slot.to_string(), patch.to_json());
        }
        if !self.components.is_empty() {
            let mut components = JsonMap::new();
            for (id, patch) in &self.components {
                components.insert(id.0.to_string(), patch.to_json());
            }
            object.insert("c".to_string(), Json::Object(components));
        }
        Json::Object(object)
    }
}

impl SlotPatch {
    fn to_json(&self) -> Json {
        match self {
            SlotPatch::Value(text) => json!(text),
            SlotPatch::Nested(patch) => patch.to_json(),
            SlotPatch::Component(id) => json!(id.0),
            SlotPatch::List(ListPatch::Replace(items)) => {
                Json::Array(items.iter().map(Patch::to_json).collect())
            }
            SlotPatch::List(ListPatch::Sparse(items)) => {
                let mut object = JsonMap::new();
                for (index, patch) in items {
                    object.insert(index.to_string(), patch.to_json());
                }
                Json::Object(object)
            }
            SlotPatch::Comprehension(comp) => comp.to_json(),
        }
    }
}

impl ComprehensionPatch {
    fn to_json(&self) -> Json {
        let mut object = JsonMap::new();
        match &self.items {
            ComprehensionItems::Replace(items) => {
                object.insert(
                    "d".to_string(),
                    Json::Array(items.iter().map(|item| item_to_json(item)).collect()),
                );
            }
            ComprehensionItems::Sparse(items) => {
                let mut sparse = JsonMap::new();
                for (index, item) in items {
                    sparse.insert(index.to_string(), item_to_json(item));
                }
                object.insert("d".to_string(), Json::Object(sparse));
            }
            ComprehensionItems::Moves(moves) => {
                object.insert(
                    "m".to_string(),
                    Json::Array(
                        moves
                            .iter()
                            .map(|mv| json!([mv.id.0, mv.to]))
                            .collect(),
                    ),
                );
            }
        }
        if let Some(statics) = &self.statics {
            object.insert("s".to_string(), json!(statics));
        }
        Json::Object(object)
    }
}

fn item_to_json(item: &[SlotPatch]) -> Json {
    Json::Array(item.iter().map(SlotPatch::to_json).collect())
}

impl ComponentPatch {
    fn to_json(&self) -> Json {
        match self {
            ComponentPatch::Mount(patch) | ComponentPatch::Update(patch) => patch.to_json(),
            ComponentPatch::Delete => Json::Null,
        }
    }
}
