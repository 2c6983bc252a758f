use crate::support::live;

use diff::{diff, SlotPatch};
use parser::compile_source;
use template::eval::{evaluate, EvalContext, Mounts};
use template::registry::ComponentRegistry;
use template::Bindings;

#[test]
fn static_only_template_renders_one_fragment() {
    let mut live = live("<p>hi</p>");
    let mut bindings = Bindings::new();
    let patch = live.render(&mut bindings);
    assert_eq!(patch.statics, Some(vec!["<p>hi</p>".to_string()]));
    assert_eq!(live.html().unwrap(), "<p>hi</p>");

    // Diffing it against itself yields nothing, whatever changed.
    bindings.assign("noise", 1i64);
    let patch = live.render(&mut bindings);
    assert!(patch.is_empty());
}

#[test]
fn single_dynamic_render_sequence() {
    let mut live = live("<p><%= name %></p>");
    let mut bindings = Bindings::new();
    bindings.assign("name", "Ada");

    // First render: full replace.
    let patch = live.render(&mut bindings);
    assert_eq!(
        patch.statics,
        Some(vec!["<p>".to_string(), "</p>".to_string()])
    );
    assert_eq!(patch.slots.get(&0), Some(&SlotPatch::Value("Ada".to_string())));
    assert_eq!(live.html().unwrap(), "<p>Ada</p>");

    // Second render, same value: empty patch.
    bindings.assign("name", "Ada");
    let patch = live.render(&mut bindings);
    assert!(patch.is_empty());

    // Third render, new value: just the slot.
    bindings.assign("name", "Grace");
    let patch = live.render(&mut bindings);
    assert!(patch.statics.is_none());
    assert_eq!(
        patch.slots.get(&0),
        Some(&SlotPatch::Value("Grace".to_string()))
    );
    assert_eq!(live.html().unwrap(), "<p>Grace</p>");
}

#[test]
fn round_trip_reconstructs_direct_rendering() {
    let mut live = live(
        "<div class={tone}><h1><%= title %></h1><ul><li :for={n <- names}><%= n %></li></ul></div>",
    );
    let mut bindings = Bindings::new();
    bindings.assign("tone", "warm");
    bindings.assign("title", "People");
    bindings.assign(
        "names",
        vec![
            template::Value::from("Ada"),
            template::Value::from("Grace"),
        ],
    );
    live.render(&mut bindings);
    assert_eq!(
        live.html().unwrap(),
        "<div class=\"warm\"><h1>People</h1><ul><li>Ada</li><li>Grace</li></ul></div>"
    );
}

#[test]
fn minimality_only_the_reading_slot_is_patched() {
    let mut live = live("<p><%= greeting %></p><p><%= name %></p>");
    let mut bindings = Bindings::new();
    bindings.assign("greeting", "hello");
    bindings.assign("name", "Ada");
    live.render(&mut bindings);

    bindings.assign("name", "Grace");
    let patch = live.render(&mut bindings);
    assert_eq!(patch.slots.len(), 1);
    assert_eq!(
        patch.slots.get(&1),
        Some(&SlotPatch::Value("Grace".to_string()))
    );
}

#[test]
fn field_level_changes_respect_nested_changed_sets() {
    use template::ChangedSet;

    let mut live = live("<p><%= user.name %></p><p><%= user.email %></p>");
    let mut bindings = Bindings::new();
    bindings.assign(
        "user",
        template::Value::map(vec![
            ("name", template::Value::from("Ada")),
            ("email", template::Value::from("ada@example.com")),
        ]),
    );
    live.render(&mut bindings);

    // Only `email` moved inside the map.
    let mut fields = ChangedSet::new();
    fields.mark("email");
    bindings.assign_fields(
        "user",
        template::Value::map(vec![
            ("name", template::Value::from("Ada")),
            ("email", template::Value::from("ada@acm.org")),
        ]),
        fields,
    );
    let patch = live.render(&mut bindings);
    assert_eq!(patch.slots.len(), 1);
    assert_eq!(
        patch.slots.get(&1),
        Some(&SlotPatch::Value("ada@acm.org".to_string()))
    );
}

#[test]
fn full_replace_when_the_template_shape_differs() {
    let a = compile_source("<p><%= name %></p>").unwrap();
    let b = compile_source("<section><%= name %></section>").unwrap();
    let registry = ComponentRegistry::new();
    let mut bindings = Bindings::new();
    bindings.assign("name", "Ada");

    let mut mounts = Mounts::new();
    let rendered_a = {
        let mut ctx = EvalContext::new(&registry, &mut mounts, None);
        evaluate(&a, &bindings, None, &mut ctx)
    };
    let rendered_b = {
        let mut ctx = EvalContext::new(&registry, &mut mounts, None);
        evaluate(&b, &bindings, None, &mut ctx)
    };

    let patch = diff(Some(&rendered_a), &rendered_b);
    assert_eq!(
        patch.statics,
        Some(vec!["<section>".to_string(), "</section>".to_string()])
    );
}

#[test]
fn comprehension_patches_are_sparse() {
    use diff::ComprehensionItems;

    let mut live = live("<li :for={n <- names}><%= n %></li>");
    let mut bindings = Bindings::new();
    bindings.assign(
        "names",
        vec![
            template::Value::from("Ada"),
            template::Value::from("Grace"),
            template::Value::from("Edsger"),
        ],
    );
    live.render(&mut bindings);

    bindings.assign(
        "names",
        vec![
            template::Value::from("Ada"),
            template::Value::from("Barbara"),
            template::Value::from("Edsger"),
        ],
    );
    let patch = live.render(&mut bindings);
    match patch.slots.get(&0) {
        Some(SlotPatch::Comprehension(comp)) => {
            assert!(comp.statics.is_none());
            match &comp.items {
                ComprehensionItems::Sparse(items) => {
                    assert_eq!(items.len(), 1);
                    assert!(items.contains_key(&1));
                }
                other => panic!("expected a sparse item map, got {:?}", other),
            }
        }
        other => panic!("expected a comprehension patch, got {:?}", other),
    }
}

#[test]
fn body_values_are_escaped() {
    let mut live = live("<p><%= name %></p>");
    let mut bindings = Bindings::new();
    bindings.assign("name", "<b>Ada</b>");
    live.render(&mut bindings);
    assert_eq!(live.html().unwrap(), "<p>&lt;b&gt;Ada&lt;/b&gt;</p>");
}

#[test]
fn spreads_render_attribute_runs() {
    let mut live = live("<div {attrs}>x</div>");
    let mut bindings = Bindings::new();
    bindings.assign(
        "attrs",
        template::Value::map(vec![
            ("id", template::Value::from("next")),
            ("class", template::Value::from("btn")),
        ]),
    );
    live.render(&mut bindings);
    assert_eq!(live.html().unwrap(), "<div class=\"btn\" id=\"next\">x</div>");
}
