use fxhash::{FxHashMap, FxHashSet};
use log::debug;

use template::rendered::{
    index_components, ComponentId, ComponentNode, Comprehension, Dynamic, Rendered,
};

use crate::patch::{
    ComponentPatch, ComprehensionItems, ComprehensionPatch, ListPatch, Move, Patch, SlotPatch,
};

/// Compute the minimal patch bringing a client's view of `previous` up
/// to `current`.
///
/// The change-tracking decision arrives encoded in `current`: a `None`
/// dynamic means the producing expression never re-executed, and the
/// engine does not touch that slot. `previous` must be a fully-absorbed
/// snapshot; a skipped slot with no previous value behind it is a logic
/// fault and fails loudly.
///
/// Components are joined on their id: retained ids diff in place, new
/// ids mount, missing ids get an explicit removal tombstone, and keyed
/// reorders become move instructions (greedy longest-common-subsequence
/// on id order, trading optimal patch size for bounded compute).
pub fn diff(previous: Option<&Rendered>, current: &Rendered) -> Patch {
    let mut cx = DiffContext::new(previous);
    let mut patch = diff_or_full(previous, current, &mut cx);
    // Anything in the previous tree we never saw again was removed.
    let removed: Vec<ComponentId> = cx
        .prev_index
        .keys()
        .filter(|id| !cx.seen.contains(id))
        .copied()
        .collect();
    for id in removed {
        debug!("component {:?} left the tree", id);
        cx.components.insert(id, ComponentPatch::Delete);
    }
    patch.components = std::mem::take(&mut cx.components);
    patch
}

struct DiffContext<'prev> {
    prev_index: FxHashMap<ComponentId, &'prev ComponentNode>,
    components: std::collections::BTreeMap<ComponentId, ComponentPatch>,
    seen: FxHashSet<ComponentId>,
}

impl<'prev> DiffContext<'prev> {
    fn new(previous: Option<&'prev Rendered>) -> DiffContext<'prev> {
        let mut prev_index = FxHashMap::default();
        if let Some(previous) = previous {
            index_components(previous, &mut prev_index);
        }
        DiffContext {
            prev_index,
            components: std::collections::BTreeMap::new(),
            seen: FxHashSet::default(),
        }
    }
}

fn diff_or_full(previous: Option<&Rendered>, current: &Rendered, cx: &mut DiffContext<'_>) -> Patch {
    match previous {
        Some(previous) if previous.fingerprint == current.fingerprint => {
            diff_rendered(previous, current, cx)
        }
        // No previous tree, or a different template shape: replace
        // wholesale, statics included.
        _ => full_rendered(current, cx),
    }
}

fn full_rendered(rendered: &Rendered, cx: &mut DiffContext<'_>) -> Patch {
    debug_assert!(
        rendered.is_fully_evaluated(),
        "a full replace requires a fully evaluated tree",
    );
    let mut patch = Patch::new();
    patch.statics = Some(rendered.statics.clone());
    for (slot, dynamic) in rendered.dynamics.iter().enumerate() {
        let dynamic = dynamic
            .as_ref()
            .expect("a full replace requires a fully evaluated tree");
        patch.slots.insert(slot, full_dynamic(dynamic, cx));
    }
    patch
}

fn full_dynamic(dynamic: &Dynamic, cx: &mut DiffContext<'_>) -> SlotPatch {
    match dynamic {
        Dynamic::Value(text) => SlotPatch::Value(text.clone()),
        Dynamic::Nested(rendered) => SlotPatch::Nested(Box::new(full_rendered(rendered, cx))),
        Dynamic::List(items) => SlotPatch::List(ListPatch::Replace(
            items.iter().map(|item| full_rendered(item, cx)).collect(),
        )),
        Dynamic::Comprehension(comp) => SlotPatch::Comprehension(ComprehensionPatch {
            statics: Some(comp.statics.clone()),
            items: ComprehensionItems::Replace(
                comp.items
                    .iter()
                    .map(|item| item.iter().map(|d| full_dynamic(d, cx)).collect())
                    .collect(),
            ),
        }),
        Dynamic::Component(node) => {
            register_component(node, cx);
            SlotPatch::Component(node.component_id)
        }
    }
}

/// Join one current component against the previous tree by id. New ids
/// mount with full content; retained ids diff against their previous
/// output wherever it was in the tree (so moves cost nothing).
/// Idempotent: a component already handled this pass is not re-diffed.
fn register_component(node: &ComponentNode, cx: &mut DiffContext<'_>) {
    let id = node.component_id;
    if !cx.seen.insert(id) {
        return;
    }
    match cx.prev_index.get(&id).copied() {
        Some(prev_node) => {
            let sub = diff_or_full(Some(&prev_node.rendered), &node.rendered, cx);
            if !sub.is_empty() {
                cx.components.insert(id, ComponentPatch::Update(sub));
            }
        }
        None => {
            let full = full_rendered(&node.rendered, cx);
            cx.components.insert(id, ComponentPatch::Mount(full));
        }
    }
}

fn diff_rendered(previous: &Rendered, current: &Rendered, cx: &mut DiffContext<'_>) -> Patch {
    // Same fingerprint implies the same skeleton; anything else is a
    // broken invariant upstream, not bad input.
    assert_eq!(
        previous.dynamics.len(),
        current.dynamics.len(),
        "same fingerprint but different arity",
    );
    let mut patch = Patch::new();
    for (slot, dynamic) in current.dynamics.iter().enumerate() {
        let prev_dynamic = previous.dynamics[slot]
            .as_ref()
            .expect("the previous tree must be an absorbed snapshot");
        match dynamic {
            None => {
                // Skipped upstream: the client's copy is already
                // correct. Its components are still alive though.
                mark_components_seen(prev_dynamic, cx);
            }
            Some(dynamic) => {
                if let Some(slot_patch) = diff_dynamic(prev_dynamic, dynamic, cx) {
                    patch.slots.insert(slot, slot_patch);
                }
            }
        }
    }
    patch
}

fn mark_components_seen(dynamic: &Dynamic, cx: &mut DiffContext<'_>) {
    match dynamic {
        Dynamic::Value(_) => {}
        Dynamic::Nested(rendered) => mark_rendered_seen(rendered, cx),
        Dynamic::List(items) => {
            for item in items {
                mark_rendered_seen(item, cx);
            }
        }
        Dynamic::Comprehension(comp) => {
            for item in &comp.items {
                for dynamic in item {
                    mark_components_seen(dynamic, cx);
                }
            }
        }
        Dynamic::Component(node) => {
            cx.seen.insert(node.component_id);
            mark_rendered_seen(&node.rendered, cx);
        }
    }
}

fn mark_rendered_seen(rendered: &Rendered, cx: &mut DiffContext<'_>) {
    for dynamic in rendered.dynamics.iter().flatten() {
        mark_components_seen(dynamic, cx);
    }
}

fn diff_dynamic(
    previous: &Dynamic,
    current: &Dynamic,
    cx: &mut DiffContext<'_>,
) -> Option<SlotPatch> {
    match (previous, current) {
        // A re-executed value is included as-is: whether it was worth
        // re-executing was change tracking's call, not ours.
        (_, Dynamic::Value(text)) => Some(SlotPatch::Value(text.clone())),
        (Dynamic::Nested(prev), Dynamic::Nested(curr)) => {
            let sub = diff_or_full(Some(prev), curr, cx);
            if sub.is_empty() {
                None
            } else {
                Some(SlotPatch::Nested(Box::new(sub)))
            }
        }
        (Dynamic::List(prev), Dynamic::List(curr)) => diff_list(prev, curr, cx),
        (Dynamic::Comprehension(prev), Dynamic::Comprehension(curr)) => {
            diff_comprehension(prev, curr, cx)
        }
        (Dynamic::Component(prev), Dynamic::Component(curr)) => {
            register_component(curr, cx);
            if prev.component_id == curr.component_id {
                // Same identity in the same place; content rode along
                // in the component map if it changed.
                None
            } else {
                Some(SlotPatch::Component(curr.component_id))
            }
        }
        // The dynamic changed kind (e.g. a slot went from one entry to
        // several): replace the slot wholesale.
        (_, current) => Some(full_dynamic(current, cx)),
    }
}

fn diff_list(prev: &[Rendered], curr: &[Rendered], cx: &mut DiffContext<'_>) -> Option<SlotPatch> {
    let structurally_same = prev.len() == curr.len()
        && prev
            .iter()
            .zip(curr.iter())
            .all(|(p, c)| p.fingerprint == c.fingerprint);
    if !structurally_same {
        return Some(SlotPatch::List(ListPatch::Replace(
            curr.iter().map(|item| full_rendered(item, cx)).collect(),
        )));
    }
    let mut sparse = std::collections::BTreeMap::new();
    for (index, (p, c)) in prev.iter().zip(curr.iter()).enumerate() {
        let sub = diff_rendered(p, c, cx);
        if !sub.is_empty() {
            sparse.insert(index, sub);
        }
    }
    if sparse.is_empty() {
        None
    } else {
        Some(SlotPatch::List(ListPatch::Sparse(sparse)))
    }
}

fn diff_comprehension(
    prev: &Comprehension,
    curr: &Comprehension,
    cx: &mut DiffContext<'_>,
) -> Option<SlotPatch> {
    if prev.fingerprint != curr.fingerprint {
        // A different item template: replace everything, statics too.
        return Some(SlotPatch::Comprehension(ComprehensionPatch {
            statics: Some(curr.statics.clone()),
            items: ComprehensionItems::Replace(
                curr.items
                    .iter()
                    .map(|item| item.iter().map(|d| full_dynamic(d, cx)).collect())
                    .collect(),
            ),
        }));
    }

    // Keyed fast path: the same set of components in a new order is a
    // pure reorder, expressed as moves with no content.
    if let (Some(prev_ids), Some(curr_ids)) = (component_run(prev), component_run(curr)) {
        if prev_ids != curr_ids && same_id_set(&prev_ids, &curr_ids) {
            for item in &curr.items {
                for dynamic in item {
                    if let Dynamic::Component(node) = dynamic {
                        register_component(node, cx);
                    }
                }
            }
            let moves = lcs_moves(&prev_ids, &curr_ids);
            return Some(SlotPatch::Comprehension(ComprehensionPatch {
                statics: None,
                items: ComprehensionItems::Moves(moves),
            }));
        }
    }

    if prev.items.len() != curr.items.len() {
        return Some(SlotPatch::Comprehension(ComprehensionPatch {
            statics: None,
            items: ComprehensionItems::Replace(
                curr.items
                    .iter()
                    .map(|item| item.iter().map(|d| full_dynamic(d, cx)).collect())
                    .collect(),
            ),
        }));
    }

    // Register components first so their content travels under "c" and
    // the per-item comparison can key on ids alone.
    for item in &curr.items {
        for dynamic in item {
            if let Dynamic::Component(node) = dynamic {
                register_component(node, cx);
            }
        }
    }
    // Loop locals are always-changed, so there is no upstream skip
    // signal per item; positional equality stands in for it.
    let mut sparse = std::collections::BTreeMap::new();
    for (index, (p, c)) in prev.items.iter().zip(curr.items.iter()).enumerate() {
        if !items_equal(p, c) {
            sparse.insert(
                index,
                c.iter().map(|d| full_dynamic(d, cx)).collect::<Vec<_>>(),
            );
        }
    }
    if sparse.is_empty() {
        None
    } else {
        Some(SlotPatch::Comprehension(ComprehensionPatch {
            statics: None,
            items: ComprehensionItems::Sparse(sparse),
        }))
    }
}

/// The id sequence of a comprehension whose every item is exactly one
/// component, the shape `:for` over component invocations produces.
fn component_run(comp: &Comprehension) -> Option<Vec<ComponentId>> {
    comp.items
        .iter()
        .map(|item| match &item[..] {
            [Dynamic::Component(node)] => Some(node.component_id),
            _ => None,
        })
        .collect()
}

fn same_id_set(prev: &[ComponentId], curr: &[ComponentId]) -> bool {
    if prev.len() != curr.len() {
        return false;
    }
    let mut prev = prev.to_vec();
    let mut curr = curr.to_vec();
    prev.sort_unstable();
    curr.sort_unstable();
    prev == curr
}

/// Components compare by id here; their content differences already
/// travel in the component map.
fn items_equal(prev: &[Dynamic], curr: &[Dynamic]) -> bool {
    prev.len() == curr.len()
        && prev.iter().zip(curr.iter()).all(|pair| match pair {
            (Dynamic::Component(p), Dynamic::Component(c)) => p.component_id == c.component_id,
            (p, c) => p == c,
        })
}

/// Greedy longest-common-subsequence on id order: everything on the
/// common subsequence stays put, everything else gets a move to its new
/// index.
fn lcs_moves(prev: &[ComponentId], curr: &[ComponentId]) -> Vec<Move> {
    let n = prev.len();
    let m = curr.len();
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if prev[i] == curr[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    let mut kept = FxHashSet::default();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if prev[i] == curr[j] {
            kept.insert(curr[j]);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    curr.iter()
        .enumerate()
        .filter(|(_, id)| !kept.contains(*id))
        .map(|(to, id)| Move { id: *id, to })
        .collect()
}
