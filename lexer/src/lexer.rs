use crate::reader::Reader;

use diagnostics::ParseResult as Result;

use source::diagnostics::{ByteIndex, Diagnostic, Label, Span};

use syntax::ast::{self, Attr, AttrValue, Attribute, ExprCode, Ident, LitValue};
use syntax::symbol::Symbol;
use syntax::token::{token, ExprMarker, ExprToken, TagOpen, Token, TokenKind};

use std::collections::VecDeque;

/// Where the tokenizer currently is. `Text` and `RawText` are the two
/// resumable states: a source chunk may end in either and the next chunk
/// picks up from there. Ending a chunk inside any other state is a
/// malformed template and reports the matching unterminated error.
#[derive(PartialEq, Debug, Clone)]
pub enum LexState {
    Text,
    TagOpen,
    TagName,
    AttrName,
    AttrValue(QuoteKind),
    Comment,
    RawText(Symbol),
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum QuoteKind {
    Single,
    Double,
}

impl QuoteKind {
    fn char(self) -> char {
        match self {
            QuoteKind::Single => '\'',
            QuoteKind::Double => '"',
        }
    }
}

pub struct Tokenizer<'a> {
    pub reader: Reader<'a>,
    pub source: &'a str,
    state: LexState,
    lookahead: VecDeque<Token>,
}

macro_rules! symbol {
    ($self: ident, $start: ident, $end: ident) => {
        Symbol::intern(&$self.source[($start.to_usize())..($end.to_usize())])
    };
}

/// Tokenize a whole source chunk starting from `start`, returning the
/// tokens and the state the next chunk should resume from.
pub fn tokenize(source: &str, start: LexState) -> Result<(Vec<Token>, LexState)> {
    let mut tokenizer = Tokenizer::with_state(source, start);
    let mut tokens = vec![];
    loop {
        let next = tokenizer.next_token()?;
        if next.kind.is_eof() {
            break;
        }
        tokens.push(next);
    }
    Ok((tokens, tokenizer.state().clone()))
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer::with_state(source, LexState::Text)
    }

    pub fn with_state(source: &'a str, state: LexState) -> Self {
        let reader = Reader::new(source);
        Tokenizer {
            reader,
            source,
            state,
            lookahead: VecDeque::with_capacity(4),
        }
    }

    pub fn state(&self) -> &LexState {
        &self.state
    }

    fn next_char(&mut self) -> Option<char> {
        self.reader.next()
    }

    fn peek_char(&mut self) -> Option<&char> {
        self.reader.peek()
    }

    fn start_span(&mut self) -> ByteIndex {
        self.reader.start()
    }

    fn end_span(&self, pos: ByteIndex) -> Span {
        self.reader.end(pos)
    }

    fn eat(&mut self, ch: char) {
        let next_ch = self.next_char().expect("eat() called on empty reader");
        debug_assert_eq!(ch, next_ch);
    }

    fn skip_while<F>(&mut self, pred: F)
    where
        F: Fn(char) -> bool,
    {
        loop {
            match self.peek_char() {
                Some(&ch) if pred(ch) => {
                    self.eat(ch);
                }
                _ => return,
            }
        }
    }

    fn skip_whitespace(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    /// Whether the rest of the input starts with `prefix`, without
    /// consuming anything.
    fn rest_starts_with(&self, prefix: &str) -> bool {
        self.source[self.reader.offset().to_usize()..].starts_with(prefix)
    }

    fn fatal(&self, message: &str, label: &str, span: Span) -> Diagnostic {
        Diagnostic::error()
            .with_message(message)
            .with_labels(vec![Label::primary(span).with_message(label)])
    }

    pub fn next_token(&mut self) -> Result<Token> {
        // Read from the lookahead if its populated.
        if let Some(next) = self.lookahead.pop_front() {
            return Ok(next);
        }
        match self.state.clone() {
            LexState::RawText(tag) => self.raw_text(&tag),
            _ => self.text(),
        }
    }

    pub fn peek_token(&mut self) -> Result<&Token> {
        if self.lookahead.is_empty() {
            let next = self.next_token()?;
            self.lookahead.push_front(next);
        }
        Ok(self.lookahead.front().unwrap())
    }

    fn eof(&mut self) -> Result<Token> {
        let span_start = self.start_span();
        let span = self.end_span(span_start);
        Ok(token(TokenKind::EOF, span))
    }

    /// Scan literal text up to the next `<`. Whitespace is significant
    /// here and is preserved byte-for-byte.
    fn text(&mut self) -> Result<Token> {
        let span_start = self.start_span();
        let start = self.reader.offset();
        loop {
            match self.peek_char() {
                Some('<') => {
                    let end = self.reader.offset();
                    if start != end {
                        let span = self.end_span(span_start);
                        return Ok(token(TokenKind::Text(symbol!(self, start, end)), span));
                    }
                    self.eat('<');
                    return self.after_angle(span_start);
                }
                Some(_) => {
                    self.next_char();
                }
                None => {
                    let end = self.reader.offset();
                    if start != end {
                        let span = self.end_span(span_start);
                        return Ok(token(TokenKind::Text(symbol!(self, start, end)), span));
                    }
                    return self.eof();
                }
            }
        }
    }

    /// Dispatch after a `<` has been consumed in text position.
    fn after_angle(&mut self, lo: ByteIndex) -> Result<Token> {
        match self.peek_char() {
            Some('%') => {
                self.eat('%');
                self.expression(lo)
            }
            Some('!') => {
                self.eat('!');
                self.bang(lo)
            }
            Some('/') => {
                self.eat('/');
                self.tag_close(lo)
            }
            _ => self.tag_open(lo),
        }
    }

    /// `<%= code %>` or `<% code %>`, already past the `<%`.
    fn expression(&mut self, lo: ByteIndex) -> Result<Token> {
        let marker = if self.peek_char() == Some(&'=') {
            self.eat('=');
            ExprMarker::Output
        } else {
            ExprMarker::Quiet
        };
        let start = self.reader.offset();
        loop {
            let before = self.reader.offset();
            match self.next_char() {
                Some('%') => {
                    if self.peek_char() == Some(&'>') {
                        self.eat('>');
                        let code = symbol!(self, start, before);
                        let span = self.end_span(lo);
                        return Ok(token(
                            TokenKind::Expression(ExprToken { marker, code }),
                            span,
                        ));
                    }
                }
                Some(_) => {}
                None => {
                    return Err(self.fatal(
                        "Unterminated expression",
                        "this expression marker is never closed with %>",
                        self.end_span(lo),
                    ));
                }
            }
        }
    }

    /// `<!` introduces either a comment or a doctype.
    fn bang(&mut self, lo: ByteIndex) -> Result<Token> {
        if self.rest_starts_with("--") {
            self.eat('-');
            self.eat('-');
            self.comment(lo)
        } else {
            self.doctype(lo)
        }
    }

    fn comment(&mut self, lo: ByteIndex) -> Result<Token> {
        self.state = LexState::Comment;
        let start = self.reader.offset();
        loop {
            let before = self.reader.offset();
            match self.next_char() {
                Some('-') => {
                    if self.rest_starts_with("->") {
                        self.eat('-');
                        self.eat('>');
                        let content = symbol!(self, start, before);
                        let span = self.end_span(lo);
                        self.state = LexState::Text;
                        return Ok(token(TokenKind::Comment(content), span));
                    }
                }
                Some(_) => {}
                None => {
                    return Err(self.fatal(
                        "Unterminated comment",
                        "this comment is never closed with -->",
                        self.end_span(lo),
                    ));
                }
            }
        }
    }

    /// Doctypes (and any other `<!` declaration) pass through verbatim as
    /// literal output.
    fn doctype(&mut self, lo: ByteIndex) -> Result<Token> {
        loop {
            match self.next_char() {
                Some('>') => {
                    let end = self.reader.offset();
                    let content = symbol!(self, lo, end);
                    let span = self.end_span(lo);
                    return Ok(token(TokenKind::Doctype(content), span));
                }
                Some(_) => {}
                None => {
                    return Err(self.fatal(
                        "Unterminated tag",
                        "this declaration is never closed",
                        self.end_span(lo),
                    ));
                }
            }
        }
    }

    fn tag_name(&mut self) -> Result<Ident> {
        let lo = self.start_span();
        let start = self.reader.offset();
        match self.peek_char() {
            Some(&ch) if is_tag_name_start(ch) => {
                self.eat(ch);
            }
            _ => {
                return Err(self.fatal(
                    "Invalid character in name",
                    "expected a tag name here",
                    self.end_span(lo),
                ));
            }
        }
        self.skip_while(is_tag_name_continue);
        let end = self.reader.offset();
        let span = self.end_span(lo);
        Ok(Ident {
            symbol: symbol!(self, start, end),
            span,
        })
    }

    /// `</name >`, already past the `</`.
    fn tag_close(&mut self, lo: ByteIndex) -> Result<Token> {
        let name = self.tag_name()?;
        self.skip_whitespace();
        match self.next_char() {
            Some('>') => {
                let span = self.end_span(lo);
                Ok(token(TokenKind::TagClose(name), span))
            }
            _ => Err(self.fatal(
                "Unterminated tag",
                "this closing tag is never terminated with >",
                self.end_span(lo),
            )),
        }
    }

    /// An open tag, already past the `<`. Scans the name and the whole
    /// attribute list through to `>` or `/>`.
    fn tag_open(&mut self, lo: ByteIndex) -> Result<Token> {
        self.state = LexState::TagName;
        let name = self.tag_name()?;
        let mut attrs = vec![];
        let self_close;
        loop {
            self.skip_whitespace();
            self.state = LexState::TagOpen;
            match self.peek_char() {
                Some('>') => {
                    self.eat('>');
                    self_close = false;
                    break;
                }
                Some('/') => {
                    self.eat('/');
                    if self.peek_char() == Some(&'>') {
                        self.eat('>');
                        self_close = true;
                        break;
                    }
                    return Err(self.unterminated_tag(lo));
                }
                Some('{') => {
                    let spread = self.braced(lo)?;
                    attrs.push(Attr::Spread(spread));
                }
                Some(&ch) if is_attr_name_start(ch) => {
                    let attr = self.attribute(lo)?;
                    attrs.push(Attr::Named(attr));
                }
                Some(_) => {
                    return Err(self.fatal(
                        "Invalid character in name",
                        "expected an attribute name, {, /> or >",
                        self.end_span(lo),
                    ));
                }
                None => return Err(self.unterminated_tag(lo)),
            }
        }
        let span = self.end_span(lo);
        // Script/style content is opaque: switch to raw text until the
        // matching close tag.
        if !self_close && ast::is_raw_text_element(name.to_str()) {
            self.state = LexState::RawText(name.symbol.clone());
        } else {
            self.state = LexState::Text;
        }
        Ok(token(
            TokenKind::TagOpen(TagOpen {
                name,
                attrs,
                self_close,
            }),
            span,
        ))
    }

    fn attribute(&mut self, tag_lo: ByteIndex) -> Result<Attribute> {
        self.state = LexState::AttrName;
        let lo = self.start_span();
        let start = self.reader.offset();
        let first = *self.peek_char().expect("attribute() called at EOF");
        self.eat(first);
        self.skip_while(is_attr_name_continue);
        let end = self.reader.offset();
        let name = Ident {
            symbol: symbol!(self, start, end),
            span: self.end_span(lo),
        };
        self.skip_whitespace();
        let value = if self.peek_char() == Some(&'=') {
            self.eat('=');
            self.skip_whitespace();
            match self.peek_char() {
                Some('"') => AttrValue::Literal(self.quoted(tag_lo, QuoteKind::Double)?),
                Some('\'') => AttrValue::Literal(self.quoted(tag_lo, QuoteKind::Single)?),
                Some('{') => AttrValue::Expression(self.braced(tag_lo)?),
                _ => {
                    return Err(self.fatal(
                        "Unexpected character",
                        "expected a quoted string or a { expression } value",
                        self.end_span(lo),
                    ));
                }
            }
        } else {
            AttrValue::Boolean
        };
        let span = self.end_span(lo);
        Ok(Attribute { name, value, span })
    }

    /// A quoted literal attribute value, `"text"` or `'text'`.
    fn quoted(&mut self, tag_lo: ByteIndex, quote: QuoteKind) -> Result<LitValue> {
        self.state = LexState::AttrValue(quote);
        let lo = self.start_span();
        self.eat(quote.char());
        let start = self.reader.offset();
        loop {
            match self.peek_char() {
                Some(&ch) if ch == quote.char() => {
                    let end = self.reader.offset();
                    self.eat(ch);
                    let span = self.end_span(lo);
                    return Ok(LitValue {
                        value: symbol!(self, start, end),
                        span,
                    });
                }
                Some(_) => {
                    self.next_char();
                }
                None => return Err(self.unterminated_tag(tag_lo)),
            }
        }
    }

    /// A braced expression, `{ code }`, with balanced inner braces.
    /// Quoted strings inside the code may contain unbalanced braces.
    fn braced(&mut self, tag_lo: ByteIndex) -> Result<ExprCode> {
        let lo = self.start_span();
        self.eat('{');
        let start = self.reader.offset();
        let mut depth = 1usize;
        loop {
            let before = self.reader.offset();
            match self.next_char() {
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        let span = self.end_span(lo);
                        return Ok(ExprCode {
                            code: symbol!(self, start, before),
                            span,
                        });
                    }
                }
                Some(quote) if quote == '"' || quote == '\'' => loop {
                    match self.next_char() {
                        Some(ch) if ch == quote => break,
                        Some(_) => {}
                        None => return Err(self.unterminated_tag(tag_lo)),
                    }
                },
                Some(_) => {}
                None => {
                    return Err(self.fatal(
                        "Unterminated expression",
                        "this { expression } is never closed",
                        self.end_span(lo),
                    ));
                }
            }
        }
    }

    /// Opaque content of a `<script>`/`<style>` element, up to the
    /// matching close tag.
    fn raw_text(&mut self, tag: &Symbol) -> Result<Token> {
        let span_start = self.start_span();
        let start = self.reader.offset();
        let close = format!("</{}", tag.as_str());
        loop {
            if self.rest_starts_with(&close) {
                let after = self.reader.offset().to_usize() + close.len();
                let next = self.source[after..].chars().next();
                if matches!(next, Some('>') | None) || next.map_or(false, char::is_whitespace) {
                    let end = self.reader.offset();
                    if start != end {
                        let span = self.end_span(span_start);
                        return Ok(token(TokenKind::Text(symbol!(self, start, end)), span));
                    }
                    self.eat('<');
                    self.eat('/');
                    let result = self.tag_close(span_start)?;
                    self.state = LexState::Text;
                    return Ok(result);
                }
            }
            match self.next_char() {
                Some(_) => {}
                None => {
                    // A chunk may end inside raw text; the next chunk
                    // resumes here. A genuinely unclosed element is
                    // reported by the tree builder's open-tag stack.
                    let end = self.reader.offset();
                    if start != end {
                        let span = self.end_span(span_start);
                        return Ok(token(TokenKind::Text(symbol!(self, start, end)), span));
                    }
                    return self.eof();
                }
            }
        }
    }

    fn unterminated_tag(&self, lo: ByteIndex) -> Diagnostic {
        self.fatal(
            "Unterminated tag",
            "this tag is never terminated with > or />",
            self.end_span(lo),
        )
    }
}

fn is_tag_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '.' || ch == ':'
}

fn is_tag_name_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.'
}

fn is_attr_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == ':' || ch == '@'
}

fn is_attr_name_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == ':'
}
