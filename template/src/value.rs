use serde::Serialize;
use syntax::symbol::Symbol;

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::rendered::Rendered;

/// A runtime binding value. Closed set; nothing in the engine ever
/// inspects a value's type reflectively beyond matching this enum.
///
/// Maps are ordered so that anything rendered from one (spread
/// attributes in particular) is deterministic across renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Atom(Symbol),
    List(Vec<Value>),
    Map(BTreeMap<Symbol, Value>),
    /// Slot content handed to a component: the caller's rendered
    /// entries for one named slot. Never constructed by user code.
    Slot(Vec<Rendered>),
}

/// Where a value is being rendered, which decides escaping and how
/// nil/boolean values print.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueContext {
    /// Document body text.
    Body,
    /// A whole `name="value"` attribute pair. Nil and `false` erase the
    /// attribute; `true` prints the bare name.
    AttrPair(Symbol),
}

impl Value {
    pub fn map(pairs: Vec<(&str, Value)>) -> Value {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (Symbol::intern(k), v))
                .collect(),
        )
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn get(&self, field: &Symbol) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(field),
            _ => None,
        }
    }

    /// The unescaped text form of a value.
    pub fn to_text(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Atom(sym) => sym.as_str().to_string(),
            Value::List(items) => {
                let mut out = String::new();
                for item in items {
                    out.push_str(&item.to_text());
                }
                out
            }
            Value::Map(map) => {
                // Maps are not meaningful as body text; render their
                // attribute form so the output is at least inspectable.
                let mut out = String::new();
                for (key, value) in map {
                    let _ = write!(out, " {}=\"{}\"", key, value.to_text());
                }
                out
            }
            Value::Slot(_) => String::new(),
        }
    }

    /// Render for a given position, HTML-escaped.
    pub fn render(&self, context: &ValueContext) -> String {
        match context {
            ValueContext::Body => html_escape::encode_text(&self.to_text()).into_owned(),
            ValueContext::AttrPair(name) => {
                if !self.is_truthy() {
                    return String::new();
                }
                match self {
                    Value::Bool(true) => format!(" {}", name),
                    other => format!(
                        " {}=\"{}\"",
                        name,
                        html_escape::encode_double_quoted_attribute(&other.to_text())
                    ),
                }
            }
        }
    }

    /// Render a map as a run of attribute pairs, for spreads. Non-map
    /// values render nothing: spreads are advisory, like attribute types.
    pub fn render_spread(&self) -> String {
        match self {
            Value::Map(map) => {
                let mut out = String::new();
                for (key, value) in map {
                    out.push_str(&Value::render(
                        value,
                        &ValueContext::AttrPair(key.clone()),
                    ));
                }
                out
            }
            _ => String::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::{Value, ValueContext};
    use syntax::symbol::Symbol;

    #[test]
    fn body_text_is_escaped() {
        let value = Value::from("<b>bold</b>");
        assert_eq!(value.render(&ValueContext::Body), "&lt;b&gt;bold&lt;/b&gt;");
    }

    #[test]
    fn attr_pairs_render_by_truthiness() {
        let name = Symbol::intern("disabled");
        assert_eq!(Value::Nil.render(&ValueContext::AttrPair(name.clone())), "");
        assert_eq!(
            Value::Bool(false).render(&ValueContext::AttrPair(name.clone())),
            ""
        );
        assert_eq!(
            Value::Bool(true).render(&ValueContext::AttrPair(name.clone())),
            " disabled"
        );
        assert_eq!(
            Value::from("x").render(&ValueContext::AttrPair(Symbol::intern("class"))),
            " class=\"x\""
        );
    }

    #[test]
    fn spreads_render_in_key_order() {
        let value = Value::map(vec![
            ("id", Value::from("next")),
            ("class", Value::from("btn")),
        ]);
        assert_eq!(value.render_spread(), " class=\"btn\" id=\"next\"");
    }
}
