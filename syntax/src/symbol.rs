use serde::{Deserialize, Serialize};

use std::fmt::{Debug, Display, Error, Formatter};
use std::result::Result;

/// An interned name: tag names, attribute names, binding keys.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    // Temporary representation, we will eventually intern the string
    // with a global interner like rustc, but for now this helps debugging
    unstable_source: String,
}

impl Symbol {
    pub fn intern(s: &str) -> Symbol {
        Symbol {
            unstable_source: String::from(s),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.unstable_source
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Symbol {
        Symbol::intern(s)
    }
}

impl Debug for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.unstable_source)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.unstable_source)
    }
}
