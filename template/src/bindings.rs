use fxhash::FxHashMap;
use syntax::symbol::Symbol;

use crate::track::ChangedSet;
use crate::value::Value;

/// One evaluation's variable bindings plus the record of which keys
/// changed since the last evaluation. Assigning an equal value is a
/// no-op and marks nothing changed.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: FxHashMap<Symbol, Value>,
    changed: ChangedSet,
}

impl Bindings {
    pub fn new() -> Bindings {
        Bindings::default()
    }

    pub fn assign(&mut self, key: impl Into<Symbol>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if self.values.get(&key) == Some(&value) {
            return;
        }
        self.changed.mark(key.clone());
        self.values.insert(key, value);
    }

    /// Assign with an explicit per-field changed record, for callers that
    /// track movement inside a keyed map themselves.
    pub fn assign_fields(
        &mut self,
        key: impl Into<Symbol>,
        value: impl Into<Value>,
        fields: ChangedSet,
    ) {
        let key = key.into();
        self.changed.mark_fields(key.clone(), fields);
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &Symbol) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn changed(&self) -> &ChangedSet {
        &self.changed
    }

    /// Forget change marks, typically right after a render consumed them.
    pub fn clear_changes(&mut self) {
        self.changed = ChangedSet::new();
    }

    /// Replace the changed-set wholesale. Useful in tests and for
    /// callers that compute change records out of band.
    pub fn set_changed(&mut self, changed: ChangedSet) {
        self.changed = changed;
    }

    pub(crate) fn from_values(values: FxHashMap<Symbol, Value>, changed: ChangedSet) -> Bindings {
        Bindings { values, changed }
    }
}

#[cfg(test)]
mod tests {
    use super::Bindings;
    use crate::value::Value;
    use syntax::symbol::Symbol;

    #[test]
    fn assigning_a_new_value_marks_the_key() {
        let mut bindings = Bindings::new();
        bindings.assign("name", "Ada");
        assert!(bindings.changed().contains(&Symbol::intern("name")));
    }

    #[test]
    fn assigning_an_equal_value_is_quiet() {
        let mut bindings = Bindings::new();
        bindings.assign("name", "Ada");
        bindings.clear_changes();
        bindings.assign("name", "Ada");
        assert!(bindings.changed().is_empty());
        assert_eq!(bindings.get(&Symbol::intern("name")), Some(&Value::from("Ada")));
    }
}
