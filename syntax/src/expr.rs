use crate::ast::Ident;
use crate::symbol::Symbol;

use serde::{Deserialize, Serialize};
use source::diagnostics::Span;

/// A template expression. The dialect is deliberately small: literals,
/// binding reads, and dotted field access. The original source text is
/// kept on the node for diagnostics.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub code: Symbol,
    pub span: Span,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ExprKind {
    Lit(Lit),
    /// A root binding read, `name`
    Var(Symbol),
    /// Dotted access from a root binding, `user.name.first`
    Path { root: Symbol, fields: Vec<Symbol> },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Lit {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Symbol),
    Atom(Symbol),
}

impl Expr {
    /// The binding key this expression reads, if any. This is the unit
    /// change tracking works in: a slot is re-evaluated only when one of
    /// its root keys appears in the changed-set.
    pub fn root_key(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Lit(_) => None,
            ExprKind::Var(root) | ExprKind::Path { root, .. } => Some(root),
        }
    }
}

/// A `:for` generator, `pat <- source`. The pattern is a single
/// identifier bound fresh on every iteration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Generator {
    pub pattern: Ident,
    pub source: Expr,
    pub span: Span,
}
