use source::diagnostics::{Diagnostic, DiagnosticSet, Label, Span};

use syntax::ast::{Attr, AttrShape, AttrValue, Attribute, Component, Node, SlotEntry, Template};

use crate::expr::parse_expr;

use template::registry::ComponentRegistry;
use template::spec::{AttrSpec, ComponentSpec};

/// Check every component invocation against its declared interface.
/// Everything reported here is a warning against the caller's source
/// location: types are advisory and the template still compiles and
/// runs, with missing values defaulting to nil at evaluation time.
pub fn validate(template: &Template, registry: &ComponentRegistry) -> DiagnosticSet {
    let mut warnings = DiagnosticSet::new();
    for node in &template.children {
        validate_node(node, registry, &mut warnings);
    }
    warnings
}

fn warn(warnings: &mut DiagnosticSet, message: &str, label: &str, span: Span) {
    warnings.add(
        Diagnostic::warning()
            .with_message(message)
            .with_labels(vec![Label::primary(span).with_message(label)]),
    );
}

fn validate_node(node: &Node, registry: &ComponentRegistry, warnings: &mut DiagnosticSet) {
    match node {
        Node::Element(element) => {
            for child in &element.children {
                validate_node(child, registry, warnings);
            }
        }
        Node::Loop(lp) => validate_node(&lp.body, registry, warnings),
        Node::Component(component) => validate_component(component, registry, warnings),
        Node::ExpressionHole(_) | Node::TextFragment(_) => {}
    }
}

fn validate_component(
    component: &Component,
    registry: &ComponentRegistry,
    warnings: &mut DiagnosticSet,
) {
    let name = component.target.name();
    let spec = match registry.spec(name) {
        Some(spec) => spec,
        None => {
            warn(
                warnings,
                "Unknown component",
                &format!("no component named `{}` is defined", name),
                component.span,
            );
            return;
        }
    };

    let has_spread = component
        .attrs
        .iter()
        .any(|attr| matches!(attr, Attr::Spread(_)));
    check_attrs(
        &component.attrs,
        &spec.attrs,
        spec,
        has_spread,
        component.span,
        warnings,
    );
    check_slots(component, spec, warnings);

    for slot in &component.slots {
        for child in &slot.children {
            validate_node(child, registry, warnings);
        }
    }
}

fn check_attrs(
    attrs: &[Attr],
    declared: &[AttrSpec],
    spec: &ComponentSpec,
    has_spread: bool,
    call_span: Span,
    warnings: &mut DiagnosticSet,
) {
    let mut seen: Vec<&str> = vec![];
    for attr in attrs {
        let named = match attr {
            Attr::Named(named) => named,
            Attr::Spread(_) => continue,
        };
        let name = named.name.to_str();
        if seen.contains(&name) {
            warn(
                warnings,
                "Duplicate attribute",
                &format!("`{}` is given more than once", name),
                named.span,
            );
        }
        seen.push(name);
        // `id` doubles as the stable identity key and is always
        // accepted.
        if name == "id" {
            continue;
        }
        match declared.iter().find(|decl| decl.name.as_str() == name) {
            None => warn(
                warnings,
                "Unknown attribute",
                &format!("`{}` is not declared on `{}`", name, spec.name),
                named.span,
            ),
            Some(decl) => {
                if !decl.ty.admits_shape(literal_shape(named)) {
                    warn(
                        warnings,
                        "Attribute type mismatch",
                        &format!("`{}` is declared as {}", name, decl.ty),
                        named.span,
                    );
                }
            }
        }
    }
    // A spread can supply anything, so missing-attribute checks only
    // make sense without one.
    if !has_spread {
        for decl in declared {
            if decl.required && !seen.contains(&decl.name.as_str()) {
                warn(
                    warnings,
                    "Missing required attribute",
                    &format!("`{}` requires the `{}` attribute", spec.name, decl.name),
                    call_span,
                );
            }
        }
    }
}

fn check_slots(component: &Component, spec: &ComponentSpec, warnings: &mut DiagnosticSet) {
    let mut supplied: Vec<String> = vec![];
    for slot in &component.slots {
        let slot_name = slot.name.to_str().trim_start_matches(':').to_string();
        if slot_name != syntax::ast::INNER_BLOCK && spec.slot(&slot_name).is_none() {
            warn(
                warnings,
                "Unknown slot",
                &format!("`{}` has no slot named `{}`", spec.name, slot_name),
                slot.span,
            );
        }
        if let Some(slot_spec) = spec.slot(&slot_name) {
            check_slot_attrs(slot, &slot_spec.attrs, spec, warnings);
        }
        supplied.push(slot_name);
    }
    for decl in &spec.slots {
        if decl.required && !supplied.iter().any(|name| name == decl.name.as_str()) {
            warn(
                warnings,
                "Missing required slot",
                &format!("`{}` requires the `{}` slot", spec.name, decl.name),
                component.span,
            );
        }
    }
}

fn check_slot_attrs(
    slot: &SlotEntry,
    declared: &[AttrSpec],
    spec: &ComponentSpec,
    warnings: &mut DiagnosticSet,
) {
    for attr in &slot.attrs {
        let named = match attr {
            Attr::Named(named) => named,
            Attr::Spread(_) => continue,
        };
        let name = named.name.to_str();
        match declared.iter().find(|decl| decl.name.as_str() == name) {
            None => warn(
                warnings,
                "Unknown attribute",
                &format!(
                    "`{}` is not declared on slot `{}` of `{}`",
                    name,
                    slot.name.to_str().trim_start_matches(':'),
                    spec.name
                ),
                named.span,
            ),
            Some(decl) => {
                if !decl.ty.admits_shape(literal_shape(named)) {
                    warn(
                        warnings,
                        "Attribute type mismatch",
                        &format!("`{}` is declared as {}", name, decl.ty),
                        named.span,
                    );
                }
            }
        }
    }
}

/// The statically-known shape of an attribute value. Expressions whose
/// code is itself a literal (atoms and booleans in braces, typically)
/// are still checkable; anything else is unknown and always admitted.
fn literal_shape(attr: &Attribute) -> AttrShape {
    match &attr.value {
        AttrValue::Expression(code) => match parse_expr(code.code.as_str(), code.span) {
            Ok(expr) => attr.shape_with_expr(&expr),
            Err(_) => attr.shape(),
        },
        _ => attr.shape(),
    }
}

#[cfg(test)]
mod tests {
    use super::validate;
    use crate::compile;
    use crate::parser::Parser;
    use template::registry::{ComponentDef, ComponentRegistry};
    use template::spec::TemplateCompiler;
    use syntax::ty::AttrType;

    fn registry() -> ComponentRegistry {
        let mut decls = TemplateCompiler::new();
        decls
            .begin_component("button")
            .attr("label", AttrType::String, true)
            .attr("disabled", AttrType::Boolean, false)
            .slot("inner_block", false)
            .end_component();
        let spec = decls.finish().remove(0);
        let template =
            compile(&Parser::new("<button><%= label %></button>").parse().unwrap()).unwrap();
        let mut registry = ComponentRegistry::new();
        registry.define("button", ComponentDef { spec, template });
        registry
    }

    fn warnings_for(source: &str) -> Vec<String> {
        let template = Parser::new(source).parse().unwrap();
        validate(&template, &registry())
            .iter()
            .map(|diagnostic| diagnostic.message.clone())
            .collect()
    }

    #[test]
    fn a_clean_invocation_raises_nothing() {
        assert!(warnings_for(r#"<.button label="Go" disabled />"#).is_empty());
    }

    #[test]
    fn unknown_attributes_warn_but_do_not_fail() {
        let warnings = warnings_for(r#"<.button label="Go" tone="red" />"#);
        assert_eq!(warnings, vec!["Unknown attribute"]);
    }

    #[test]
    fn literal_type_mismatches_warn() {
        let warnings = warnings_for(r#"<.button label="Go" disabled="yes" />"#);
        assert_eq!(warnings, vec!["Attribute type mismatch"]);
    }

    #[test]
    fn literal_expressions_are_shape_checked_too() {
        let warnings = warnings_for(r#"<.button label="Go" disabled={:loud} />"#);
        assert_eq!(warnings, vec!["Attribute type mismatch"]);
        // A literal boolean in braces is fine.
        assert!(warnings_for(r#"<.button label="Go" disabled={true} />"#).is_empty());
    }

    #[test]
    fn missing_required_attributes_warn() {
        let warnings = warnings_for(r#"<.button />"#);
        assert_eq!(warnings, vec!["Missing required attribute"]);
    }

    #[test]
    fn spreads_suppress_missing_attribute_checks() {
        assert!(warnings_for(r#"<.button {rest} />"#).is_empty());
    }

    #[test]
    fn duplicate_attributes_warn() {
        let warnings = warnings_for(r#"<.button label="a" label="b" />"#);
        assert_eq!(warnings, vec!["Duplicate attribute"]);
    }

    #[test]
    fn unknown_components_warn() {
        let warnings = warnings_for(r#"<.missing />"#);
        assert_eq!(warnings, vec!["Unknown component"]);
    }
}
