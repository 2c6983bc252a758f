use fxhash::FxHasher;
use source::diagnostics::Span;
use syntax::ast::Target;
use syntax::expr::{Expr, Generator};
use syntax::symbol::Symbol;

use std::hash::{Hash, Hasher};

use crate::track::Deps;
use crate::value::ValueContext;

/// The compiled form of a template: the static skeleton plus one
/// instruction per dynamic slot. Produced once at compile time and
/// shared by every evaluation.
#[derive(Clone, Debug)]
pub struct CompiledTemplate {
    pub statics: Vec<String>,
    pub dynamics: Vec<DynamicTemplate>,
    pub fingerprint: u64,
}

#[derive(Clone, Debug)]
pub struct DynamicTemplate {
    pub kind: DynKind,
    pub deps: Deps,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum DynKind {
    /// An expression hole: body text or a whole attribute pair.
    Expr { expr: Expr, context: ValueContext },
    /// `{map}` in attribute position: a run of attribute pairs.
    Spread { expr: Expr },
    /// A `:for` loop over a generator.
    Comprehension {
        generator: Generator,
        template: CompiledTemplate,
    },
    /// A component invocation.
    Component(ComponentCall),
}

#[derive(Clone, Debug)]
pub struct ComponentCall {
    pub target: Target,
    pub attrs: Vec<CallAttr>,
    pub spreads: Vec<Expr>,
    pub slots: Vec<CompiledSlot>,
    pub span: Span,
}

impl ComponentCall {
    /// The invocation's `id` attribute, used as the stable mount key
    /// inside loops so identity follows content across reorders.
    pub fn id_attr(&self) -> Option<&CallAttr> {
        self.attrs.iter().find(|attr| attr.name.as_str() == "id")
    }
}

/// A named attribute on an invocation. Literal and boolean attributes
/// are carried as literal expressions so evaluation is uniform.
#[derive(Clone, Debug)]
pub struct CallAttr {
    pub name: Symbol,
    pub expr: Expr,
}

/// All entries an invocation supplied for one slot name, merged in
/// source order. The implicit default slot is one of these.
#[derive(Clone, Debug)]
pub struct CompiledSlot {
    pub name: Symbol,
    pub entries: Vec<CompiledSlotEntry>,
}

#[derive(Clone, Debug)]
pub struct CompiledSlotEntry {
    pub template: CompiledTemplate,
    pub let_binding: Option<Symbol>,
    /// What the entry's body reads from the caller's scope, so the
    /// invocation can mark the slot changed (or not) for the callee.
    pub deps: Deps,
}

/// A structural fingerprint: derived from the static fragments and the
/// per-slot dynamic shape only, never from binding values. Two
/// evaluations of one compiled template always share it; two different
/// templates almost always differ.
pub fn fingerprint(statics: &[String], dynamics: &[DynamicTemplate]) -> u64 {
    let mut hasher = FxHasher::default();
    statics.len().hash(&mut hasher);
    for fragment in statics {
        fragment.hash(&mut hasher);
    }
    for dynamic in dynamics {
        match &dynamic.kind {
            DynKind::Expr { .. } => 1u8.hash(&mut hasher),
            DynKind::Spread { .. } => 2u8.hash(&mut hasher),
            DynKind::Comprehension { template, .. } => {
                3u8.hash(&mut hasher);
                template.fingerprint.hash(&mut hasher);
            }
            DynKind::Component(call) => {
                4u8.hash(&mut hasher);
                call.target.name().as_str().hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}
