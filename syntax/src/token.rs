use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{Attr, Ident};
use crate::symbol::Symbol;
use source::diagnostics::Span;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)
    }
}

#[inline]
pub fn token(kind: TokenKind, span: Span) -> Token {
    Token { kind, span }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenKind {
    /* A run of literal markup text */
    Text(Symbol),
    /* `<name attr... >` or `<name attr... />` */
    TagOpen(TagOpen),
    /* `</name>` */
    TagClose(Ident),
    /* `<%= code %>` or `<% code %>` */
    Expression(ExprToken),
    /* `<!-- ... -->`; dropped by the tree builder */
    Comment(Symbol),
    /* `<!doctype ...>`; passes through as literal output */
    Doctype(Symbol),
    /* End of input */
    EOF,
}

impl TokenKind {
    pub fn is_eof(&self) -> bool {
        matches!(self, TokenKind::EOF)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TagOpen {
    pub name: Ident,
    pub attrs: Vec<Attr>,
    pub self_close: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExprToken {
    pub marker: ExprMarker,
    pub code: Symbol,
}

/// Which expression marker introduced the hole. Both evaluate the code;
/// only `Output` renders the result into the document.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum ExprMarker {
    /* `<%= %>` */
    Output,
    /* `<% %>` */
    Quiet,
}
