use fxhash::FxHashMap;
use syntax::expr::{Expr, ExprKind};
use syntax::symbol::Symbol;

/// How much of a binding changed since the last evaluation. Absence from
/// the containing [`ChangedSet`] means unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum Changed {
    /// The whole value changed.
    All,
    /// Only the named sub-fields changed. Produced when the value is a
    /// keyed map and the caller knows which fields moved.
    Fields(ChangedSet),
}

/// The set of binding keys that changed since the previous evaluation,
/// optionally refined per sub-field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangedSet {
    entries: FxHashMap<Symbol, Changed>,
}

impl ChangedSet {
    pub fn new() -> ChangedSet {
        ChangedSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark a key fully changed.
    pub fn mark(&mut self, key: impl Into<Symbol>) {
        self.entries.insert(key.into(), Changed::All);
    }

    /// Mark only some fields of a key changed.
    pub fn mark_fields(&mut self, key: impl Into<Symbol>, fields: ChangedSet) {
        self.entries.insert(key.into(), Changed::Fields(fields));
    }

    pub fn insert(&mut self, key: Symbol, changed: Changed) {
        self.entries.insert(key, changed);
    }

    pub fn get(&self, key: &Symbol) -> Option<&Changed> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &Symbol) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &Symbol) {
        self.entries.remove(key);
    }

    /// Project this changed-set through one read. `None` means the read
    /// is untouched by the change; `Some` carries how much of it moved.
    ///
    /// A whole-value read of a partially-changed map projects to the
    /// partial change: the reader can't know which fields it used, so
    /// any field movement taints it.
    pub fn project(&self, root: &Symbol, fields: &[Symbol]) -> Option<Changed> {
        let mut current = self.entries.get(root)?;
        for field in fields {
            match current {
                Changed::All => return Some(Changed::All),
                Changed::Fields(set) => current = set.entries.get(field)?,
            }
        }
        Some(current.clone())
    }

    /// Whether a read of `root.fields...` is affected by this set.
    pub fn affects(&self, root: &Symbol, fields: &[Symbol]) -> bool {
        self.project(root, fields).is_some()
    }

    /// Project through an expression, for deriving a callee-side
    /// changed-set from the caller's.
    pub fn project_expr(&self, expr: &Expr) -> Option<Changed> {
        match &expr.kind {
            ExprKind::Lit(_) => None,
            ExprKind::Var(root) => self.project(root, &[]),
            ExprKind::Path { root, fields } => self.project(root, fields),
        }
    }
}

/// A single dependency of a dynamic slot: the binding key the slot's
/// expression reads, plus the field path under it.
#[derive(Clone, Debug, PartialEq)]
pub struct Read {
    pub root: Symbol,
    pub fields: Vec<Symbol>,
}

impl Read {
    pub fn from_expr(expr: &Expr) -> Option<Read> {
        match &expr.kind {
            ExprKind::Lit(_) => None,
            ExprKind::Var(root) => Some(Read {
                root: root.clone(),
                fields: vec![],
            }),
            ExprKind::Path { root, fields } => Some(Read {
                root: root.clone(),
                fields: fields.clone(),
            }),
        }
    }
}

/// A dynamic slot's dependency summary, computed at compile time: every
/// read the slot's expression (or subtree) makes. The evaluation guard
/// reuses the previous output when none of the reads are affected.
///
/// Which reads are block-scoped locals is only known at evaluation
/// time, so `affected` takes that knowledge as a predicate: a read
/// rooted at a local is always affected, since loop variables and
/// `:let` patterns have no identity across renders to compare against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Deps {
    pub reads: Vec<Read>,
}

impl Deps {
    pub fn none() -> Deps {
        Deps::default()
    }

    pub fn from_expr(expr: &Expr) -> Deps {
        Deps {
            reads: Read::from_expr(expr).into_iter().collect(),
        }
    }

    pub fn affected<F>(&self, changed: &ChangedSet, is_local: F) -> bool
    where
        F: Fn(&Symbol) -> bool,
    {
        self.reads
            .iter()
            .any(|read| is_local(&read.root) || changed.affects(&read.root, &read.fields))
    }

    pub fn merge(&mut self, other: &Deps) {
        for read in &other.reads {
            if !self.reads.contains(read) {
                self.reads.push(read.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Changed, ChangedSet, Deps, Read};
    use syntax::symbol::Symbol;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn absent_keys_are_unchanged() {
        let changed = ChangedSet::new();
        assert!(!changed.affects(&sym("name"), &[]));
    }

    #[test]
    fn whole_value_reads_are_tainted_by_field_changes() {
        let mut fields = ChangedSet::new();
        fields.mark("email");
        let mut changed = ChangedSet::new();
        changed.mark_fields("user", fields);

        // Reading the whole map is affected by any field movement.
        assert!(changed.affects(&sym("user"), &[]));
        // Reading the changed field is affected; a sibling is not.
        assert!(changed.affects(&sym("user"), &[sym("email")]));
        assert!(!changed.affects(&sym("user"), &[sym("name")]));
    }

    #[test]
    fn full_changes_taint_every_path() {
        let mut changed = ChangedSet::new();
        changed.mark("user");
        assert_eq!(
            changed.project(&sym("user"), &[sym("name"), sym("first")]),
            Some(Changed::All)
        );
    }

    #[test]
    fn local_reads_are_always_affected() {
        let deps = Deps {
            reads: vec![Read {
                root: sym("item"),
                fields: vec![],
            }],
        };
        // As a session binding, `item` is unchanged here...
        assert!(!deps.affected(&ChangedSet::new(), |_| false));
        // ...but as a loop variable it has no identity to compare.
        assert!(deps.affected(&ChangedSet::new(), |root| root == &sym("item")));
    }
}
