use diff::LiveTemplate;
use parser::compile_source;
use syntax::ty::AttrType;
use template::registry::{ComponentDef, ComponentRegistry};
use template::spec::TemplateCompiler;
use template::value::Value;

/// A registry with the components the scenarios mount:
/// - `row`: a one-line component keyed by `id`
/// - `card`: a component with a named `header` slot and a default slot
/// - `field`: a component whose default slot uses `:let`
pub fn registry() -> ComponentRegistry {
    let mut decls = TemplateCompiler::new();
    decls
        .begin_component("row")
        .attr("id", AttrType::String, false)
        .attr("label", AttrType::String, true)
        .end_component();
    decls
        .begin_component("card")
        .attr("title", AttrType::String, true)
        .slot("header", false)
        .slot("inner_block", false)
        .end_component();
    decls
        .begin_component("field")
        .attr("name", AttrType::String, true)
        .slot("inner_block", false)
        .end_component();
    let mut specs = decls.finish();

    let mut registry = ComponentRegistry::new();
    registry.define(
        "field",
        ComponentDef {
            spec: specs.remove(2),
            template: compile_source("<div class=\"field\"><%= inner_block %></div>").unwrap(),
        },
    );
    registry.define(
        "card",
        ComponentDef {
            spec: specs.remove(1),
            template: compile_source(
                "<div class=\"card\"><h1><%= title %></h1><%= header %><section><%= inner_block %></section></div>",
            )
            .unwrap(),
        },
    );
    registry.define(
        "row",
        ComponentDef {
            spec: specs.remove(0),
            template: compile_source("<span><%= label %></span>").unwrap(),
        },
    );
    registry
}

pub fn live(source: &str) -> LiveTemplate {
    LiveTemplate::with_registry(compile_source(source).unwrap(), registry())
}

pub fn entry(id: &str, label: &str) -> Value {
    Value::map(vec![("id", Value::from(id)), ("label", Value::from(label))])
}
