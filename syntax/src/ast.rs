use crate::expr::{Expr, Generator, Lit};
use crate::symbol::Symbol;

use serde::{Deserialize, Serialize};
use source::diagnostics::Span;

use std::fmt::{Debug, Error, Formatter};

#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct Ident {
    pub symbol: Symbol,
    pub span: Span,
}

impl Ident {
    pub fn to_str(&self) -> &str {
        self.symbol.as_str()
    }
}

impl Debug for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "{:?}", self.symbol)
    }
}

/// What a tag name means, decided once when the tag is read. Everything
/// downstream dispatches on this instead of re-inspecting name strings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum TagKind {
    /// An ordinary markup element, `<div>`
    Element,
    /// `<Card.header>` or `<Card>`: resolved against a remote target
    RemoteComponent,
    /// `<.header>`: resolved against locally-visible components
    LocalComponent,
    /// `<:footer>`: a slot entry inside a component invocation
    SlotEntry,
}

impl TagKind {
    pub fn classify(name: &str) -> TagKind {
        let mut chars = name.chars();
        match chars.next() {
            Some('.') => TagKind::LocalComponent,
            Some(':') => TagKind::SlotEntry,
            Some(ch) if ch.is_ascii_uppercase() => TagKind::RemoteComponent,
            _ if name.contains('.') => TagKind::RemoteComponent,
            _ => TagKind::Element,
        }
    }
}

/// Elements that may not have children and never appear on the open-tag
/// stack, whether or not the author writes the trailing slash.
pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is opaque text, never tokenized as markup.
pub fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Attr {
    Named(Attribute),
    /// `{code}` with no name: a whole map of attributes supplied at runtime
    Spread(ExprCode),
}

impl Attr {
    pub fn span(&self) -> Span {
        match self {
            Attr::Named(attr) => attr.span,
            Attr::Spread(code) => code.span,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: Ident,
    pub value: AttrValue,
    pub span: Span,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// `attr="text"`
    Literal(LitValue),
    /// `attr={code}`
    Expression(ExprCode),
    /// Presence-only, `<input disabled>`
    Boolean,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LitValue {
    pub value: Symbol,
    pub span: Span,
}

/// Raw expression source as it appeared between braces or markers.
/// Parsed into an [`Expr`] by the tree builder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExprCode {
    pub code: Symbol,
    pub span: Span,
}

/// Statically-known shape of an attribute value, recorded for the
/// declarative validation pass so it never has to re-parse source.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum AttrShape {
    String,
    Boolean,
    AtomLike,
    Unknown,
}

impl Attribute {
    pub fn shape(&self) -> AttrShape {
        match &self.value {
            AttrValue::Literal(_) => AttrShape::String,
            AttrValue::Boolean => AttrShape::Boolean,
            AttrValue::Expression(_) => AttrShape::Unknown,
        }
    }

    /// Shape refined with the parsed expression, when the tree builder
    /// has one. Literal atoms and booleans inside braces are still
    /// statically known.
    pub fn shape_with_expr(&self, expr: &Expr) -> AttrShape {
        match (&self.value, &expr.kind) {
            (AttrValue::Expression(_), crate::expr::ExprKind::Lit(lit)) => match lit {
                Lit::Atom(_) => AttrShape::AtomLike,
                Lit::Bool(_) => AttrShape::Boolean,
                Lit::Str(_) => AttrShape::String,
                _ => AttrShape::Unknown,
            },
            _ => self.shape(),
        }
    }
}

// The parse tree. Compile-time only: the tree builder turns this into the
// template IR and the nodes are discarded.

/// Root of a parsed template. A template is a sequence of nodes, not
/// necessarily wrapped in a single element.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Template {
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Component(Component),
    Loop(Loop),
    ExpressionHole(ExpressionHole),
    TextFragment(TextFragment),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(el) => el.span,
            Node::Component(comp) => comp.span,
            Node::Loop(lp) => lp.span,
            Node::ExpressionHole(hole) => hole.span,
            Node::TextFragment(text) => text.span,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Element {
    pub name: Ident,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    pub span: Span,
}

/// A component invocation. Loose (non-slot) children are collected into
/// the implicit default slot by the tree builder, so `slots` is the only
/// content field.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Component {
    pub target: Target,
    pub attrs: Vec<Attr>,
    pub let_binding: Option<Ident>,
    pub slots: Vec<SlotEntry>,
    pub span: Span,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// `<Card.header>`: a dotted path to a component in another unit
    Remote(Symbol),
    /// `<.header>`: a component in the current unit
    Local(Symbol),
}

impl Target {
    pub fn name(&self) -> &Symbol {
        match self {
            Target::Remote(path) | Target::Local(path) => path,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SlotEntry {
    pub name: Ident,
    pub attrs: Vec<Attr>,
    pub let_binding: Option<Ident>,
    pub children: Vec<Node>,
    pub span: Span,
}

/// The desugared form of a `:for={pat <- expr}` element.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Loop {
    pub generator: Generator,
    pub body: Box<Node>,
    pub span: Span,
}

/// A dynamic hole tied to a source expression. Conditionals taken in the
/// host surface also land here: the tree only ever sees an opaque hole.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ExpressionHole {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TextFragment {
    pub content: Symbol,
    pub span: Span,
}

/// The reserved name for the implicit default slot.
pub const INNER_BLOCK: &str = "inner_block";

#[cfg(test)]
mod tests {
    use super::TagKind;

    #[test]
    fn classifies_tag_names() {
        assert_eq!(TagKind::classify("div"), TagKind::Element);
        assert_eq!(TagKind::classify("my-widget"), TagKind::Element);
        assert_eq!(TagKind::classify("Card"), TagKind::RemoteComponent);
        assert_eq!(TagKind::classify("Card.header"), TagKind::RemoteComponent);
        assert_eq!(TagKind::classify("forms.input"), TagKind::RemoteComponent);
        assert_eq!(TagKind::classify(".header"), TagKind::LocalComponent);
        assert_eq!(TagKind::classify(":footer"), TagKind::SlotEntry);
    }
}
