use parser::{compile_source, validate, Parser};

use crate::support::registry;

#[test]
fn mismatched_closing_tag_names_both_tags() {
    let err = compile_source("<div><span></div>").unwrap_err();
    assert_eq!(err.message, "Mismatched closing tag");
    assert!(err.labels[0].message.contains("expected </span>"));
    assert!(err.labels[0].message.contains("found </div>"));
}

#[test]
fn slot_entry_under_an_element_is_rejected() {
    let err = compile_source("<div><:footer>x</:footer></div>").unwrap_err();
    assert!(err.labels[0]
        .message
        .contains("slot entry must be a direct child of a component"));
}

#[test]
fn lexical_errors_abort_compilation() {
    assert!(compile_source("<div").is_err());
    assert!(compile_source("<!-- never closed").is_err());
    assert!(compile_source("<p><%= name</p>").is_err());
}

#[test]
fn declarative_findings_do_not_abort_compilation() {
    let source = "<.row id=\"a\" label=\"Ada\" tone=\"loud\" />";
    // The template still compiles...
    assert!(compile_source(source).is_ok());
    // ...and the finding is reported as a warning against the caller.
    let template = Parser::new(source).parse().unwrap();
    let warnings = validate(&template, &registry());
    assert_eq!(warnings.len(), 1);
    assert!(warnings.iter().all(|diagnostic| diagnostic.is_warning()));
}

#[test]
fn missing_required_attr_still_renders_with_nil() {
    let template = Parser::new("<.row id=\"a\" />").parse().unwrap();
    let warnings = validate(&template, &registry());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings.iter().next().unwrap().message, "Missing required attribute");

    // The runtime always has some value; label defaults to nil.
    let mut live = crate::support::live("<.row id=\"a\" />");
    let mut bindings = template::Bindings::new();
    live.render(&mut bindings);
    assert_eq!(live.html().unwrap(), "<span></span>");
}
