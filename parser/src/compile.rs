use diagnostics::ParseResult as Result;
use source::diagnostics::Span;

use syntax::ast::{self, Attr, AttrValue, Component, Element, Node, SlotEntry, Template};
use syntax::expr::{Expr, ExprKind, Lit};
use syntax::symbol::Symbol;

use template::ir::{
    fingerprint, CallAttr, CompiledSlot, CompiledSlotEntry, CompiledTemplate, ComponentCall,
    DynKind, DynamicTemplate,
};
use template::track::{Deps, Read};
use template::value::ValueContext;

use crate::expr::parse_expr;

/// Compile a parse tree into the template IR: literal markup flattened
/// into static fragments, one dynamic instruction per hole, and the
/// structural fingerprint stamped on every (sub)template.
///
/// Output normalizes markup: void elements print as `<br>`, and a
/// self-closed non-void element prints as an open/close pair.
pub fn compile(template: &Template) -> Result<CompiledTemplate> {
    compile_nodes(&template.children)
}

/// Accumulates one template's interleaving. Every dynamic pushes the
/// pending static buffer first, which is what keeps the arity invariant
/// (`statics.len() == dynamics.len() + 1`) true by construction.
struct Builder {
    statics: Vec<String>,
    buf: String,
    dynamics: Vec<DynamicTemplate>,
}

impl Builder {
    fn new() -> Builder {
        Builder {
            statics: vec![],
            buf: String::new(),
            dynamics: vec![],
        }
    }

    fn push_str(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    fn push_dynamic(&mut self, dynamic: DynamicTemplate) {
        self.statics.push(std::mem::take(&mut self.buf));
        self.dynamics.push(dynamic);
    }

    fn finish(mut self) -> CompiledTemplate {
        self.statics.push(self.buf);
        let fingerprint = fingerprint(&self.statics, &self.dynamics);
        CompiledTemplate {
            statics: self.statics,
            dynamics: self.dynamics,
            fingerprint,
        }
    }
}

fn compile_nodes(nodes: &[Node]) -> Result<CompiledTemplate> {
    let mut builder = Builder::new();
    for node in nodes {
        emit(node, &mut builder)?;
    }
    Ok(builder.finish())
}

fn emit(node: &Node, builder: &mut Builder) -> Result<()> {
    match node {
        Node::TextFragment(text) => builder.push_str(text.content.as_str()),
        Node::ExpressionHole(hole) => {
            builder.push_dynamic(DynamicTemplate {
                kind: DynKind::Expr {
                    expr: hole.expr.clone(),
                    context: ValueContext::Body,
                },
                deps: Deps::from_expr(&hole.expr),
                span: hole.span,
            });
        }
        Node::Element(element) => emit_element(element, builder)?,
        Node::Loop(lp) => {
            let body = compile_nodes(std::slice::from_ref(&*lp.body))?;
            // The loop re-runs when its source moves or when anything
            // the body reads from the enclosing scope moves.
            let mut deps = Deps::from_expr(&lp.generator.source);
            deps.merge(&Deps {
                reads: collect_reads(&body),
            });
            builder.push_dynamic(DynamicTemplate {
                kind: DynKind::Comprehension {
                    generator: lp.generator.clone(),
                    template: body,
                },
                deps,
                span: lp.span,
            });
        }
        Node::Component(component) => emit_component(component, builder)?,
    }
    Ok(())
}

fn emit_element(element: &Element, builder: &mut Builder) -> Result<()> {
    let name = element.name.to_str();
    builder.push_str(&format!("<{}", name));
    for attr in &element.attrs {
        match attr {
            Attr::Named(named) => match &named.value {
                AttrValue::Literal(lit) => {
                    builder.push_str(&format!(
                        " {}=\"{}\"",
                        named.name.to_str(),
                        lit.value.as_str()
                    ));
                }
                AttrValue::Boolean => {
                    builder.push_str(&format!(" {}", named.name.to_str()));
                }
                AttrValue::Expression(code) => {
                    let expr = parse_expr(code.code.as_str(), code.span)?;
                    let deps = Deps::from_expr(&expr);
                    builder.push_dynamic(DynamicTemplate {
                        kind: DynKind::Expr {
                            expr,
                            context: ValueContext::AttrPair(named.name.symbol.clone()),
                        },
                        deps,
                        span: named.span,
                    });
                }
            },
            Attr::Spread(code) => {
                let expr = parse_expr(code.code.as_str(), code.span)?;
                let deps = Deps::from_expr(&expr);
                builder.push_dynamic(DynamicTemplate {
                    kind: DynKind::Spread { expr },
                    deps,
                    span: code.span,
                });
            }
        }
    }
    builder.push_str(">");
    for child in &element.children {
        emit(child, builder)?;
    }
    if !ast::is_void_element(name) {
        builder.push_str(&format!("</{}>", name));
    }
    Ok(())
}

fn emit_component(component: &Component, builder: &mut Builder) -> Result<()> {
    let mut attrs = vec![];
    let mut spreads = vec![];
    let mut deps = Deps::none();
    for attr in &component.attrs {
        match attr {
            Attr::Named(named) => {
                let expr = match &named.value {
                    AttrValue::Literal(lit) => {
                        literal_expr(Lit::Str(lit.value.clone()), lit.value.clone(), named.span)
                    }
                    AttrValue::Boolean => {
                        literal_expr(Lit::Bool(true), Symbol::intern("true"), named.span)
                    }
                    AttrValue::Expression(code) => parse_expr(code.code.as_str(), code.span)?,
                };
                deps.merge(&Deps::from_expr(&expr));
                attrs.push(CallAttr {
                    name: named.name.symbol.clone(),
                    expr,
                });
            }
            Attr::Spread(code) => {
                let expr = parse_expr(code.code.as_str(), code.span)?;
                deps.merge(&Deps::from_expr(&expr));
                spreads.push(expr);
            }
        }
    }

    let mut slots: Vec<CompiledSlot> = vec![];
    for entry in &component.slots {
        let compiled = compile_slot_entry(entry)?;
        deps.merge(&compiled.deps);
        let slot_name = Symbol::intern(entry.name.to_str().trim_start_matches(':'));
        match slots.iter_mut().find(|slot| slot.name == slot_name) {
            Some(slot) => slot.entries.push(compiled),
            None => slots.push(CompiledSlot {
                name: slot_name,
                entries: vec![compiled],
            }),
        }
    }

    builder.push_dynamic(DynamicTemplate {
        kind: DynKind::Component(ComponentCall {
            target: component.target.clone(),
            attrs,
            spreads,
            slots,
            span: component.span,
        }),
        deps,
        span: component.span,
    });
    Ok(())
}

fn compile_slot_entry(entry: &SlotEntry) -> Result<CompiledSlotEntry> {
    let template = compile_nodes(&entry.children)?;
    let deps = Deps {
        reads: collect_reads(&template),
    };
    Ok(CompiledSlotEntry {
        template,
        let_binding: entry.let_binding.as_ref().map(|pattern| pattern.symbol.clone()),
        deps,
    })
}

fn literal_expr(lit: Lit, code: Symbol, span: Span) -> Expr {
    Expr {
        kind: ExprKind::Lit(lit),
        code,
        span,
    }
}

/// Every read a template makes, recursively. Reads rooted at a binding
/// that turns out to be block-scoped are resolved at evaluation time,
/// where the scope is known.
fn collect_reads(template: &CompiledTemplate) -> Vec<Read> {
    let mut reads = vec![];
    collect_into(template, &mut reads);
    reads
}

fn collect_into(template: &CompiledTemplate, reads: &mut Vec<Read>) {
    for dynamic in &template.dynamics {
        for read in &dynamic.deps.reads {
            if !reads.contains(read) {
                reads.push(read.clone());
            }
        }
        if let DynKind::Comprehension { template, .. } = &dynamic.kind {
            collect_into(template, reads);
        }
    }
}
