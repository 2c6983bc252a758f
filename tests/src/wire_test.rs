use crate::support::{entry, live};

use serde_json::json;
use template::{Bindings, Value};

#[test]
fn full_replace_carries_statics_and_every_slot() {
    let mut live = live("<p><%= name %></p>");
    let mut bindings = Bindings::new();
    bindings.assign("name", "Ada");
    let patch = live.render(&mut bindings);
    assert_eq!(
        patch.to_json(),
        json!({"s": ["<p>", "</p>"], "0": "Ada"})
    );
}

#[test]
fn incremental_patches_omit_statics() {
    let mut live = live("<p><%= name %></p>");
    let mut bindings = Bindings::new();
    bindings.assign("name", "Ada");
    live.render(&mut bindings);
    bindings.assign("name", "Grace");
    let patch = live.render(&mut bindings);
    assert_eq!(patch.to_json(), json!({"0": "Grace"}));
}

#[test]
fn comprehensions_share_statics_across_items() {
    let mut live = live("<li :for={n <- names}><%= n %></li>");
    let mut bindings = Bindings::new();
    bindings.assign(
        "names",
        vec![Value::from("Ada"), Value::from("Grace")],
    );
    let patch = live.render(&mut bindings);
    assert_eq!(
        patch.to_json(),
        json!({
            "s": ["", ""],
            "0": {"d": [["Ada"], ["Grace"]], "s": ["<li>", "</li>"]}
        })
    );
}

#[test]
fn removal_tombstones_are_explicit_nulls() {
    let mut live = live("<li :for={e <- entries}><.row id={e.id} label={e.label} /></li>");
    let mut bindings = Bindings::new();
    bindings.assign(
        "entries",
        Value::List(vec![entry("a", "Ada"), entry("b", "Grace")]),
    );
    live.render(&mut bindings);

    bindings.assign("entries", Value::List(vec![entry("a", "Ada")]));
    let patch = live.render(&mut bindings);
    let json = patch.to_json();
    let components = json
        .get("c")
        .and_then(|c| c.as_object())
        .expect("expected a component map");
    // Exactly one id maps to null; unchanged components are omitted
    // entirely, which is what makes the tombstone distinguishable.
    let nulls: Vec<_> = components.values().filter(|v| v.is_null()).collect();
    assert_eq!(nulls.len(), 1);
}

#[test]
fn component_slots_reference_ids_as_numbers() {
    let mut live = live("<.row id=\"a\" label=\"Ada\" />");
    let mut bindings = Bindings::new();
    let patch = live.render(&mut bindings);
    let json = patch.to_json();
    let slot = json.get("0").expect("expected the component slot");
    assert!(slot.is_number());
    let components = json.get("c").and_then(|c| c.as_object()).unwrap();
    assert_eq!(components.len(), 1);
    let full = components.values().next().unwrap();
    assert_eq!(full.get("s").unwrap(), &json!(["<span>", "</span>"]));
}

#[test]
fn empty_patches_serialize_to_an_empty_object() {
    let mut live = live("<p>hi</p>");
    let mut bindings = Bindings::new();
    live.render(&mut bindings);
    let patch = live.render(&mut bindings);
    assert!(patch.is_empty());
    assert_eq!(patch.to_json(), json!({}));
}
