use fxhash::FxHashMap;
use serde::Serialize;

use std::collections::BTreeMap;

use syntax::symbol::Symbol;

use crate::value::Value;

/// A stable key identifying one mounted component instance across
/// renders. The diff engine joins previous and current trees on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ComponentId(pub u32);

/// The evaluated form of a template: literal fragments interleaved with
/// dynamic slots. Interleaving `statics[0], dynamics[0], statics[1], ...`
/// reconstructs the rendered output exactly, so the arity invariant is
/// load-bearing and asserted at construction.
///
/// A `None` dynamic means change tracking skipped the producing
/// expression: the previous value is still correct and already on the
/// client, and the diff engine must not touch the slot. Snapshots kept
/// between renders are always fully populated (see [`absorb`]).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rendered {
    pub statics: Vec<String>,
    pub dynamics: Vec<Option<Dynamic>>,
    pub fingerprint: u64,
    pub root: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Dynamic {
    /// A rendered scalar value.
    Value(String),
    /// A nested render tree, e.g. slot content.
    Nested(Rendered),
    /// An ordered list of render trees, e.g. a multi-entry slot.
    List(Vec<Rendered>),
    /// A loop: one shared static template, one dynamics tuple per item.
    Comprehension(Comprehension),
    /// A mounted component.
    Component(ComponentNode),
}

/// Loop output. The static text is stored once, not per item; items are
/// the per-iteration dynamics tuples.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comprehension {
    pub statics: Vec<String>,
    pub fingerprint: u64,
    pub items: Vec<Vec<Dynamic>>,
}

/// A component instance in the tree. Components mounted inside this
/// one's slots live inside `rendered`; ownership is a strict tree and
/// identity across renders is carried solely by `component_id`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentNode {
    pub fingerprint: u64,
    pub component_id: ComponentId,
    /// The assigns this instance was last evaluated with. Change
    /// tracking compares against these to drop derived change marks
    /// whose value is identical, so a loop rebinding the same data
    /// doesn't force its components to re-render.
    pub assigns: BTreeMap<Symbol, Value>,
    pub rendered: Rendered,
}

impl Rendered {
    pub fn new(
        statics: Vec<String>,
        dynamics: Vec<Option<Dynamic>>,
        fingerprint: u64,
        root: bool,
    ) -> Rendered {
        assert_eq!(
            dynamics.len() + 1,
            statics.len(),
            "rendered tree arity is broken: {} statics, {} dynamics",
            statics.len(),
            dynamics.len(),
        );
        Rendered {
            statics,
            dynamics,
            fingerprint,
            root,
        }
    }

    pub fn is_fully_evaluated(&self) -> bool {
        self.dynamics.iter().all(Option::is_some)
    }

    /// Reconstruct the literal output. Only a fully-evaluated tree can
    /// be printed; a skipped slot here means a snapshot was never
    /// absorbed, which is a logic error, not bad input.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        for (index, fragment) in self.statics.iter().enumerate() {
            out.push_str(fragment);
            if index < self.dynamics.len() {
                let dynamic = self.dynamics[index]
                    .as_ref()
                    .expect("cannot print a tree with skipped slots");
                dynamic.write_text(out);
            }
        }
    }
}

impl Dynamic {
    fn write_text(&self, out: &mut String) {
        match self {
            Dynamic::Value(text) => out.push_str(text),
            Dynamic::Nested(rendered) => rendered.write_text(out),
            Dynamic::List(items) => {
                for item in items {
                    item.write_text(out);
                }
            }
            Dynamic::Comprehension(comp) => {
                for item in &comp.items {
                    for (index, fragment) in comp.statics.iter().enumerate() {
                        out.push_str(fragment);
                        if index < item.len() {
                            item[index].write_text(out);
                        }
                    }
                }
            }
            Dynamic::Component(node) => node.rendered.write_text(out),
        }
    }
}

/// Fill every skipped slot of `current` from the previous snapshot,
/// producing the tree to keep for the next render. Components are
/// matched by id, not position, so content survives reorders.
pub fn absorb(current: Rendered, previous: Option<&Rendered>) -> Rendered {
    let mut index = FxHashMap::default();
    if let Some(previous) = previous {
        index_components(previous, &mut index);
    }
    absorb_rendered(current, previous, &index)
}

/// Index every component in a tree by id.
pub fn index_components<'tree>(
    rendered: &'tree Rendered,
    index: &mut FxHashMap<ComponentId, &'tree ComponentNode>,
) {
    for dynamic in rendered.dynamics.iter().flatten() {
        index_dynamic(dynamic, index);
    }
}

fn index_dynamic<'tree>(
    dynamic: &'tree Dynamic,
    index: &mut FxHashMap<ComponentId, &'tree ComponentNode>,
) {
    match dynamic {
        Dynamic::Value(_) => {}
        Dynamic::Nested(rendered) => index_components(rendered, index),
        Dynamic::List(items) => {
            for item in items {
                index_components(item, index);
            }
        }
        Dynamic::Comprehension(comp) => {
            for item in &comp.items {
                for dynamic in item {
                    index_dynamic(dynamic, index);
                }
            }
        }
        Dynamic::Component(node) => {
            index.insert(node.component_id, node);
            index_components(&node.rendered, index);
        }
    }
}

fn absorb_rendered(
    current: Rendered,
    previous: Option<&Rendered>,
    index: &FxHashMap<ComponentId, &ComponentNode>,
) -> Rendered {
    let Rendered {
        statics,
        dynamics,
        fingerprint,
        root,
    } = current;
    let dynamics = dynamics
        .into_iter()
        .enumerate()
        .map(|(slot, dynamic)| {
            let prev_slot = previous
                .and_then(|prev| prev.dynamics.get(slot))
                .and_then(Option::as_ref);
            match dynamic {
                Some(dynamic) => Some(absorb_dynamic(dynamic, prev_slot, index)),
                None => {
                    let prev = prev_slot
                        .expect("skipped a slot with no previous snapshot to fall back on");
                    Some(prev.clone())
                }
            }
        })
        .collect();
    Rendered {
        statics,
        dynamics,
        fingerprint,
        root,
    }
}

fn absorb_dynamic(
    dynamic: Dynamic,
    prev_slot: Option<&Dynamic>,
    index: &FxHashMap<ComponentId, &ComponentNode>,
) -> Dynamic {
    match dynamic {
        Dynamic::Component(node) => {
            let prev = index.get(&node.component_id).map(|prev| &prev.rendered);
            Dynamic::Component(ComponentNode {
                fingerprint: node.fingerprint,
                component_id: node.component_id,
                assigns: node.assigns,
                rendered: absorb_rendered(node.rendered, prev, index),
            })
        }
        Dynamic::Nested(rendered) => {
            let prev = match prev_slot {
                Some(Dynamic::Nested(prev)) => Some(prev),
                _ => None,
            };
            Dynamic::Nested(absorb_rendered(rendered, prev, index))
        }
        Dynamic::List(items) => Dynamic::List(
            items
                .into_iter()
                .map(|item| absorb_rendered(item, None, index))
                .collect(),
        ),
        Dynamic::Comprehension(comp) => Dynamic::Comprehension(Comprehension {
            statics: comp.statics,
            fingerprint: comp.fingerprint,
            items: comp
                .items
                .into_iter()
                .map(|item| {
                    item.into_iter()
                        .map(|dynamic| absorb_dynamic(dynamic, None, index))
                        .collect()
                })
                .collect(),
        }),
        other => other,
    }
}
