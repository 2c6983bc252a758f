use crate::support::{entry, live};

use diff::{ComponentPatch, ComprehensionItems, SlotPatch};
use template::Bindings;
use template::Value;

fn entries(ids: &[(&str, &str)]) -> Value {
    Value::List(ids.iter().map(|(id, label)| entry(id, label)).collect())
}

#[test]
fn components_mount_with_full_content() {
    let mut live = live("<.row id=\"a\" label=\"Ada\" />");
    let mut bindings = Bindings::new();
    let patch = live.render(&mut bindings);

    // The slot references the component; the content travels in "c".
    assert!(matches!(patch.slots.get(&0), Some(SlotPatch::Component(_))));
    assert_eq!(patch.components.len(), 1);
    match patch.components.values().next().unwrap() {
        ComponentPatch::Mount(full) => assert!(full.statics.is_some()),
        other => panic!("expected a mount, got {:?}", other),
    }
    assert_eq!(live.html().unwrap(), "<span>Ada</span>");
}

#[test]
fn component_identity_survives_reorders_with_moves_only() {
    let mut live = live("<li :for={e <- entries}><.row id={e.id} label={e.label} /></li>");
    let mut bindings = Bindings::new();
    bindings.assign(
        "entries",
        entries(&[("a", "Ada"), ("b", "Grace"), ("c", "Edsger")]),
    );
    live.render(&mut bindings);

    bindings.assign(
        "entries",
        entries(&[("b", "Grace"), ("a", "Ada"), ("c", "Edsger")]),
    );
    let patch = live.render(&mut bindings);

    // Reordering unchanged components sends moves and nothing else: no
    // content for any of the three.
    assert!(patch.components.is_empty());
    match patch.slots.get(&0) {
        Some(SlotPatch::Comprehension(comp)) => match &comp.items {
            ComprehensionItems::Moves(moves) => assert_eq!(moves.len(), 1),
            other => panic!("expected moves, got {:?}", other),
        },
        other => panic!("expected a comprehension patch, got {:?}", other),
    }
}

#[test]
fn component_content_changes_travel_in_the_component_map() {
    let mut live = live("<li :for={e <- entries}><.row id={e.id} label={e.label} /></li>");
    let mut bindings = Bindings::new();
    bindings.assign("entries", entries(&[("a", "Ada"), ("b", "Grace")]));
    live.render(&mut bindings);

    bindings.assign("entries", entries(&[("a", "Ada"), ("b", "Hopper")]));
    let patch = live.render(&mut bindings);

    // Item tuples still reference the same ids, so nothing is resent
    // positionally; the changed component patches incrementally.
    assert!(patch.slots.is_empty());
    assert_eq!(patch.components.len(), 1);
    match patch.components.values().next().unwrap() {
        ComponentPatch::Update(update) => {
            assert!(update.statics.is_none());
            assert_eq!(
                update.slots.get(&0),
                Some(&SlotPatch::Value("Hopper".to_string()))
            );
        }
        other => panic!("expected an update, got {:?}", other),
    }
}

#[test]
fn removed_components_get_tombstones() {
    let mut live = live("<li :for={e <- entries}><.row id={e.id} label={e.label} /></li>");
    let mut bindings = Bindings::new();
    bindings.assign("entries", entries(&[("a", "Ada"), ("b", "Grace")]));
    live.render(&mut bindings);

    bindings.assign("entries", entries(&[("a", "Ada")]));
    let patch = live.render(&mut bindings);

    let deletes: Vec<_> = patch
        .components
        .values()
        .filter(|component| matches!(component, ComponentPatch::Delete))
        .collect();
    assert_eq!(deletes.len(), 1);
}

#[test]
fn new_components_mount_into_an_existing_list() {
    let mut live = live("<li :for={e <- entries}><.row id={e.id} label={e.label} /></li>");
    let mut bindings = Bindings::new();
    bindings.assign("entries", entries(&[("a", "Ada")]));
    live.render(&mut bindings);

    bindings.assign("entries", entries(&[("a", "Ada"), ("d", "Dijkstra")]));
    let patch = live.render(&mut bindings);

    let mounts: Vec<_> = patch
        .components
        .values()
        .filter(|component| matches!(component, ComponentPatch::Mount(_)))
        .collect();
    assert_eq!(mounts.len(), 1);
}

#[test]
fn unchanged_components_re_render_nothing() {
    let mut live = live("<.card title=\"Hi\"><p><%= name %></p></.card><p><%= name %></p>");
    let mut bindings = Bindings::new();
    bindings.assign("name", "Ada");
    live.render(&mut bindings);

    // `name` feeds both the card's default slot and the outer hole.
    bindings.assign("name", "Grace");
    let patch = live.render(&mut bindings);
    assert_eq!(patch.slots.len(), 1);
    assert_eq!(patch.components.len(), 1);

    // A change that feeds nothing inside the card leaves it alone.
    bindings.assign("unrelated", 1i64);
    let patch = live.render(&mut bindings);
    assert!(patch.is_empty());
}

#[test]
fn named_slots_and_default_slots_render() {
    let mut live = live(
        "<.card title={title}><:header><em>hi</em></:header><p><%= name %></p></.card>",
    );
    let mut bindings = Bindings::new();
    bindings.assign("title", "People");
    bindings.assign("name", "Ada");
    live.render(&mut bindings);
    assert_eq!(
        live.html().unwrap(),
        "<div class=\"card\"><h1>People</h1><em>hi</em><section><p>Ada</p></section></div>"
    );
}

#[test]
fn let_bindings_hand_back_the_component_assigns() {
    let mut live = live("<.field name=\"email\" :let={f}><%= f.name %></.field>");
    let mut bindings = Bindings::new();
    live.render(&mut bindings);
    assert_eq!(
        live.html().unwrap(),
        "<div class=\"field\">email</div>"
    );
}
