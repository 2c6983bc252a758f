use crate::ast::AttrShape;
use crate::symbol::Symbol;

use serde::{Deserialize, Serialize};

use std::fmt;

/// The closed set of types an attribute can be declared with. Compared
/// structurally; there is no runtime reflection anywhere.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum AttrType {
    Any,
    String,
    Atom,
    Boolean,
    Integer,
    Float,
    List,
    Map,
    /// A global attribute passed through to the underlying element
    /// (class, id, aria-*); any value shape is accepted.
    Global,
    Struct(TypeTag),
}

/// A nominal tag naming a struct-like shape, e.g. a form or changeset
/// type. Declared types carry the tag; values are never inspected.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag(pub Symbol);

impl AttrType {
    /// Whether a statically-known literal shape can satisfy this type.
    /// `Unknown` shapes (arbitrary expressions) always pass: types are
    /// advisory, and only literals can be checked without running code.
    pub fn admits_shape(&self, shape: AttrShape) -> bool {
        match shape {
            AttrShape::Unknown => true,
            AttrShape::String => matches!(
                self,
                AttrType::Any | AttrType::Global | AttrType::String
            ),
            AttrShape::Boolean => matches!(
                self,
                AttrType::Any | AttrType::Global | AttrType::Boolean
            ),
            AttrShape::AtomLike => {
                matches!(self, AttrType::Any | AttrType::Global | AttrType::Atom)
            }
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Any => write!(f, "any"),
            AttrType::String => write!(f, "string"),
            AttrType::Atom => write!(f, "atom"),
            AttrType::Boolean => write!(f, "boolean"),
            AttrType::Integer => write!(f, "integer"),
            AttrType::Float => write!(f, "float"),
            AttrType::List => write!(f, "list"),
            AttrType::Map => write!(f, "map"),
            AttrType::Global => write!(f, "global"),
            AttrType::Struct(tag) => write!(f, "struct {}", tag.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_shapes_check_structurally() {
        assert!(AttrType::String.admits_shape(AttrShape::String));
        assert!(!AttrType::Boolean.admits_shape(AttrShape::String));
        assert!(AttrType::Atom.admits_shape(AttrShape::AtomLike));
        assert!(AttrType::Global.admits_shape(AttrShape::Boolean));
        // Expressions can't be checked statically, so they always pass.
        assert!(AttrType::Struct(TypeTag(Symbol::intern("Form")))
            .admits_shape(AttrShape::Unknown));
    }
}
