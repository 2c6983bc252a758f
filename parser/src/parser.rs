use lexer::Tokenizer;

use syntax::ast::{
    self, Attr, AttrValue, Attribute, Component, Element, ExprCode, Ident, Node, SlotEntry,
    TagKind, Target, Template,
};
use syntax::expr::Generator;
use syntax::symbol::Symbol;
use syntax::token::{ExprMarker, TagOpen, Token, TokenKind};

use diagnostics::ParseResult as Result;

use source::diagnostics::{Diagnostic, Label, Span};

use log::debug;

use crate::expr::{parse_expr, parse_generator, parse_pattern};

/// Builds the parse tree from the token stream, enforcing every
/// structural rule: balanced tags, component/slot placement, and the
/// `:let`/`:for` directives. All failures are fatal; a template either
/// compiles or it does not.
pub struct Parser<'s> {
    tokenizer: Tokenizer<'s>,
    span: Span,
}

/// One still-open tag. Slot entries accumulate on their component
/// frame; ordinary children accumulate on whatever is innermost.
struct Frame {
    kind: TagKind,
    name: Ident,
    attrs: Vec<Attr>,
    let_binding: Option<Ident>,
    generator: Option<Generator>,
    children: Vec<Node>,
    slots: Vec<SlotEntry>,
    open_span: Span,
}

impl Frame {
    fn is_component(&self) -> bool {
        matches!(
            self.kind,
            TagKind::RemoteComponent | TagKind::LocalComponent
        )
    }
}

/// What the open-tag handler extracted from an attribute list.
struct Directives {
    attrs: Vec<Attr>,
    let_binding: Option<Ident>,
    generator: Option<Generator>,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str) -> Parser<'s> {
        debug!("Parser::new");
        let tokenizer = Tokenizer::new(source);
        let span = Span::new(0, 0);
        Parser { tokenizer, span }
    }

    fn next_token(&mut self) -> Result<Token> {
        let token = self.tokenizer.next_token()?;
        debug!("next_token: {:?}", token.kind);
        self.span = token.span;
        Ok(token)
    }

    fn fatal(&self, message: &str, label_message: &str, span: Span) -> Diagnostic {
        let label = Label::primary(span).with_message(label_message);
        Diagnostic::error()
            .with_message(message)
            .with_labels(vec![label])
    }

    /// Parse the whole source into a template tree.
    pub fn parse(&mut self) -> Result<Template> {
        let mut stack: Vec<Frame> = vec![];
        let mut roots: Vec<Node> = vec![];
        let lo = self.span;
        loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::EOF => break,
                TokenKind::Text(content) => {
                    push_child(
                        &mut stack,
                        &mut roots,
                        Node::TextFragment(ast::TextFragment {
                            content,
                            span: token.span,
                        }),
                    );
                }
                TokenKind::Doctype(content) => {
                    push_child(
                        &mut stack,
                        &mut roots,
                        Node::TextFragment(ast::TextFragment {
                            content,
                            span: token.span,
                        }),
                    );
                }
                TokenKind::Comment(content) => {
                    // Markup comments are part of the document and pass
                    // through as literal output.
                    push_child(
                        &mut stack,
                        &mut roots,
                        Node::TextFragment(ast::TextFragment {
                            content: Symbol::intern(&format!("<!--{}-->", content)),
                            span: token.span,
                        }),
                    );
                }
                TokenKind::Expression(expr_token) => {
                    match expr_token.marker {
                        ExprMarker::Output => {
                            let expr = parse_expr(expr_token.code.as_str(), token.span)?;
                            push_child(
                                &mut stack,
                                &mut roots,
                                Node::ExpressionHole(ast::ExpressionHole {
                                    expr,
                                    span: token.span,
                                }),
                            );
                        }
                        // Quiet markers hold host-side statements; the
                        // tree has no hole for them.
                        ExprMarker::Quiet => {}
                    }
                }
                TokenKind::TagOpen(open) => {
                    self.open_tag(open, token.span, &mut stack, &mut roots)?;
                }
                TokenKind::TagClose(name) => {
                    self.close_tag(&name, token.span, &mut stack, &mut roots)?;
                }
            }
        }
        if let Some(frame) = stack.last() {
            return Err(self.fatal(
                "Unclosed tag",
                &format!("<{}> is never closed", frame.name.to_str()),
                frame.open_span,
            ));
        }
        let span = lo.merge(self.span);
        Ok(Template {
            children: roots,
            span,
        })
    }

    fn open_tag(
        &mut self,
        open: TagOpen,
        span: Span,
        stack: &mut Vec<Frame>,
        roots: &mut Vec<Node>,
    ) -> Result<()> {
        let kind = TagKind::classify(open.name.to_str());
        debug!("open_tag: <{}> as {:?}", open.name.to_str(), kind);
        match kind {
            TagKind::Element => self.open_element(open, span, stack, roots),
            TagKind::RemoteComponent | TagKind::LocalComponent => {
                self.open_component(kind, open, span, stack, roots)
            }
            TagKind::SlotEntry => self.open_slot(open, span, stack),
        }
    }

    fn open_element(
        &mut self,
        open: TagOpen,
        span: Span,
        stack: &mut Vec<Frame>,
        roots: &mut Vec<Node>,
    ) -> Result<()> {
        let directives = self.directives(open.attrs, TagKind::Element)?;
        let void = ast::is_void_element(open.name.to_str());
        let frame = Frame {
            kind: TagKind::Element,
            name: open.name,
            attrs: directives.attrs,
            let_binding: None,
            generator: directives.generator,
            children: vec![],
            slots: vec![],
            open_span: span,
        };
        if open.self_close || void {
            // Void elements are never pushed onto the open-tag stack.
            let node = reduce_element(frame, span);
            push_child(stack, roots, node);
        } else {
            stack.push(frame);
        }
        Ok(())
    }

    fn open_component(
        &mut self,
        kind: TagKind,
        open: TagOpen,
        span: Span,
        stack: &mut Vec<Frame>,
        roots: &mut Vec<Node>,
    ) -> Result<()> {
        let directives = self.directives(open.attrs, kind)?;
        if open.self_close && directives.let_binding.is_some() {
            return Err(self.fatal(
                "Invalid `:let`",
                "`:let` on a component without inner content",
                span,
            ));
        }
        let frame = Frame {
            kind,
            name: open.name,
            attrs: directives.attrs,
            let_binding: directives.let_binding,
            generator: None,
            children: vec![],
            slots: vec![],
            open_span: span,
        };
        if open.self_close {
            let node = reduce_component(frame, span);
            push_child(stack, roots, node);
        } else {
            stack.push(frame);
        }
        Ok(())
    }

    fn open_slot(&mut self, open: TagOpen, span: Span, stack: &mut Vec<Frame>) -> Result<()> {
        match stack.last() {
            Some(parent) if parent.is_component() => {}
            _ => {
                return Err(self.fatal(
                    "Misplaced slot entry",
                    "slot entry must be a direct child of a component",
                    span,
                ));
            }
        }
        let slot_name = open.name.to_str().trim_start_matches(':').to_string();
        if slot_name == ast::INNER_BLOCK {
            return Err(self.fatal(
                "Reserved slot name",
                "the slot name :inner_block is reserved",
                span,
            ));
        }
        let directives = self.directives(open.attrs, TagKind::SlotEntry)?;
        if open.self_close {
            if directives.let_binding.is_some() {
                return Err(self.fatal(
                    "Invalid `:let`",
                    "`:let` on a slot without inner content",
                    span,
                ));
            }
            let parent = stack.last_mut().expect("checked above");
            parent.slots.push(SlotEntry {
                name: open.name,
                attrs: directives.attrs,
                let_binding: None,
                children: vec![],
                span,
            });
        } else {
            stack.push(Frame {
                kind: TagKind::SlotEntry,
                name: open.name,
                attrs: directives.attrs,
                let_binding: directives.let_binding,
                generator: None,
                children: vec![],
                slots: vec![],
                open_span: span,
            });
        }
        Ok(())
    }

    fn close_tag(
        &mut self,
        name: &Ident,
        close_span: Span,
        stack: &mut Vec<Frame>,
        roots: &mut Vec<Node>,
    ) -> Result<()> {
        let frame = match stack.pop() {
            Some(frame) => frame,
            None => {
                return Err(self.fatal(
                    "Unexpected closing tag",
                    &format!("</{}> has no matching open tag", name.to_str()),
                    close_span,
                ));
            }
        };
        if frame.name.symbol != name.symbol {
            return Err(Diagnostic::error()
                .with_message("Mismatched closing tag")
                .with_labels(vec![
                    Label::primary(close_span).with_message(format!(
                        "expected </{}>, found </{}>",
                        frame.name.to_str(),
                        name.to_str()
                    )),
                    Label::secondary(frame.open_span).with_message("the tag opened here"),
                ]));
        }
        let span = frame.open_span.merge(close_span);
        match frame.kind {
            TagKind::Element => {
                let node = reduce_element(frame, span);
                push_child(stack, roots, node);
            }
            TagKind::RemoteComponent | TagKind::LocalComponent => {
                let node = reduce_component(frame, span);
                push_child(stack, roots, node);
            }
            TagKind::SlotEntry => {
                let parent = stack
                    .last_mut()
                    .expect("slot frames only open under a component frame");
                parent.slots.push(SlotEntry {
                    name: frame.name,
                    attrs: frame.attrs,
                    let_binding: frame.let_binding,
                    children: frame.children,
                    span,
                });
            }
        }
        Ok(())
    }

    /// Split the raw attribute list into ordinary attributes and the
    /// reserved directives, enforcing where each directive may appear.
    fn directives(&self, attrs: Vec<Attr>, kind: TagKind) -> Result<Directives> {
        let mut remaining = vec![];
        let mut let_binding: Option<Ident> = None;
        let mut generator: Option<Generator> = None;
        for attr in attrs {
            if let Attr::Named(named) = &attr {
                if named.name.to_str() == ":let" {
                    if kind == TagKind::Element {
                        return Err(self.fatal(
                            "Invalid `:let`",
                            "`:let` is only supported on components and slot entries",
                            named.span,
                        ));
                    }
                    if let_binding.is_some() {
                        return Err(self.fatal(
                            "Duplicate `:let`",
                            "at most one `:let` per invocation",
                            named.span,
                        ));
                    }
                    let code = self.directive_code(named)?;
                    let_binding = Some(parse_pattern(code.code.as_str(), named.span)?);
                    continue;
                }
                if named.name.to_str() == ":for" {
                    if kind != TagKind::Element {
                        return Err(self.fatal(
                            "Invalid `:for`",
                            "`:for` may only appear on a plain element",
                            named.span,
                        ));
                    }
                    if generator.is_some() {
                        return Err(self.fatal(
                            "Duplicate `:for`",
                            "at most one `:for` per element",
                            named.span,
                        ));
                    }
                    let code = self.directive_code(named)?;
                    generator = Some(parse_generator(code.code.as_str(), named.span)?);
                    continue;
                }
            }
            remaining.push(attr);
        }
        Ok(Directives {
            attrs: remaining,
            let_binding,
            generator,
        })
    }

    fn directive_code<'a>(&self, attr: &'a Attribute) -> Result<&'a ExprCode> {
        match &attr.value {
            AttrValue::Expression(code) => Ok(code),
            _ => Err(self.fatal(
                "Invalid directive value",
                &format!("`{}` expects a {{ ... }} value", attr.name.to_str()),
                attr.span,
            )),
        }
    }
}

fn push_child(stack: &mut Vec<Frame>, roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(node),
        None => roots.push(node),
    }
}

fn reduce_element(frame: Frame, span: Span) -> Node {
    let element = Element {
        name: frame.name,
        attrs: frame.attrs,
        children: frame.children,
        span,
    };
    match frame.generator {
        Some(generator) => Node::Loop(ast::Loop {
            generator,
            body: Box::new(Node::Element(element)),
            span,
        }),
        None => Node::Element(element),
    }
}

fn reduce_component(frame: Frame, span: Span) -> Node {
    let target = match frame.kind {
        TagKind::LocalComponent => Target::Local(Symbol::intern(
            frame.name.to_str().trim_start_matches('.'),
        )),
        _ => Target::Remote(frame.name.symbol.clone()),
    };
    let mut slots = frame.slots;
    if !frame.children.is_empty() {
        // Loose content becomes the implicit default slot; a component
        // level `:let` binds inside it.
        slots.insert(
            0,
            SlotEntry {
                name: Ident {
                    symbol: Symbol::intern(ast::INNER_BLOCK),
                    span: frame.open_span,
                },
                attrs: vec![],
                let_binding: frame.let_binding.clone(),
                children: frame.children,
                span: frame.open_span,
            },
        );
    }
    Node::Component(Component {
        target,
        attrs: frame.attrs,
        let_binding: frame.let_binding,
        slots,
        span,
    })
}
