use diagnostics::ParseResult as Result;
use source::diagnostics::{Diagnostic, Label, Span};
use syntax::ast::Ident;
use syntax::expr::{Expr, ExprKind, Generator, Lit};
use syntax::symbol::Symbol;

// The expression sub-grammar for dynamic holes: literals, binding
// reads, and dotted field access. Anything richer belongs in the host
// surface, not in templates.

fn invalid(message: &str, label: &str, span: Span) -> Diagnostic {
    Diagnostic::error()
        .with_message(message)
        .with_labels(vec![Label::primary(span).with_message(label)])
}

/// Parse the code of one expression hole or attribute expression.
pub fn parse_expr(code: &str, span: Span) -> Result<Expr> {
    let trimmed = code.trim();
    let kind = parse_kind(trimmed, span)?;
    Ok(Expr {
        kind,
        code: Symbol::intern(trimmed),
        span,
    })
}

fn parse_kind(code: &str, span: Span) -> Result<ExprKind> {
    if code.is_empty() {
        return Err(invalid("Invalid expression", "expected an expression", span));
    }
    if let Some(quote) = code.chars().next().filter(|ch| *ch == '"' || *ch == '\'') {
        let inner = &code[1..];
        return match inner.strip_suffix(quote) {
            Some(text) if !text.contains(quote) => {
                Ok(ExprKind::Lit(Lit::Str(Symbol::intern(text))))
            }
            _ => Err(invalid(
                "Invalid expression",
                "unterminated string literal",
                span,
            )),
        };
    }
    if let Some(atom) = code.strip_prefix(':') {
        if is_ident(atom) {
            return Ok(ExprKind::Lit(Lit::Atom(Symbol::intern(atom))));
        }
        return Err(invalid("Invalid expression", "malformed atom", span));
    }
    match code {
        "nil" => return Ok(ExprKind::Lit(Lit::Nil)),
        "true" => return Ok(ExprKind::Lit(Lit::Bool(true))),
        "false" => return Ok(ExprKind::Lit(Lit::Bool(false))),
        _ => {}
    }
    if code.starts_with(|ch: char| ch.is_ascii_digit())
        || (code.starts_with('-') && code.len() > 1)
    {
        if let Ok(int) = code.parse::<i64>() {
            return Ok(ExprKind::Lit(Lit::Int(int)));
        }
        if let Ok(float) = code.parse::<f64>() {
            return Ok(ExprKind::Lit(Lit::Float(float)));
        }
        return Err(invalid("Invalid expression", "malformed number", span));
    }
    let mut segments = code.split('.');
    let root = segments.next().expect("split yields at least one segment");
    if !is_ident(root) {
        return Err(invalid(
            "Invalid expression",
            "expected a literal or a binding name",
            span,
        ));
    }
    let mut fields = vec![];
    for segment in segments {
        if !is_ident(segment) {
            return Err(invalid(
                "Invalid expression",
                "malformed field access",
                span,
            ));
        }
        fields.push(Symbol::intern(segment));
    }
    if fields.is_empty() {
        Ok(ExprKind::Var(Symbol::intern(root)))
    } else {
        Ok(ExprKind::Path {
            root: Symbol::intern(root),
            fields,
        })
    }
}

/// Parse a `:for` value, `pattern <- source`.
pub fn parse_generator(code: &str, span: Span) -> Result<Generator> {
    let (pattern, source) = match code.split_once("<-") {
        Some(parts) => parts,
        None => {
            return Err(invalid(
                "Invalid expression",
                "`:for` expects `pattern <- source`",
                span,
            ));
        }
    };
    let pattern = parse_pattern(pattern, span)?;
    let source = parse_expr(source, span)?;
    Ok(Generator {
        pattern,
        source,
        span,
    })
}

/// Parse a binding pattern: a single identifier, as used by `:let` and
/// generator left-hand sides.
pub fn parse_pattern(code: &str, span: Span) -> Result<Ident> {
    let trimmed = code.trim();
    if !is_ident(trimmed) {
        return Err(invalid(
            "Invalid expression",
            "expected a binding name",
            span,
        ));
    }
    Ok(Ident {
        symbol: Symbol::intern(trimmed),
        span,
    })
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::{parse_expr, parse_generator};
    use source::diagnostics::Span;
    use syntax::expr::{ExprKind, Lit};
    use syntax::symbol::Symbol;

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn parses_literals() {
        assert_eq!(
            parse_expr("\"hi\"", span()).unwrap().kind,
            ExprKind::Lit(Lit::Str(Symbol::intern("hi")))
        );
        assert_eq!(
            parse_expr(":save", span()).unwrap().kind,
            ExprKind::Lit(Lit::Atom(Symbol::intern("save")))
        );
        assert_eq!(parse_expr("42", span()).unwrap().kind, ExprKind::Lit(Lit::Int(42)));
        assert_eq!(
            parse_expr("2.5", span()).unwrap().kind,
            ExprKind::Lit(Lit::Float(2.5))
        );
        assert_eq!(parse_expr("nil", span()).unwrap().kind, ExprKind::Lit(Lit::Nil));
    }

    #[test]
    fn parses_reads() {
        assert_eq!(
            parse_expr(" name ", span()).unwrap().kind,
            ExprKind::Var(Symbol::intern("name"))
        );
        assert_eq!(
            parse_expr("user.email", span()).unwrap().kind,
            ExprKind::Path {
                root: Symbol::intern("user"),
                fields: vec![Symbol::intern("email")],
            }
        );
    }

    #[test]
    fn parses_generators() {
        let generator = parse_generator("item <- items", span()).unwrap();
        assert_eq!(generator.pattern.to_str(), "item");
        assert_eq!(
            generator.source.kind,
            ExprKind::Var(Symbol::intern("items"))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_expr("1 +", span()).is_err());
        assert!(parse_expr("", span()).is_err());
        assert!(parse_generator("items", span()).is_err());
    }
}
