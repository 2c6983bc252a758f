use fxhash::FxHashMap;
use syntax::ast::Target;
use syntax::symbol::Symbol;

use crate::ir::CompiledTemplate;
use crate::spec::ComponentSpec;

/// A resolvable component: its declared interface and compiled body.
#[derive(Clone, Debug)]
pub struct ComponentDef {
    pub spec: ComponentSpec,
    pub template: CompiledTemplate,
}

/// Resolves invocation targets to component definitions. Remote targets
/// are keyed by their full dotted path (`Card.header`), local ones by
/// their bare name (`header`).
#[derive(Default)]
pub struct ComponentRegistry {
    components: FxHashMap<Symbol, ComponentDef>,
}

impl ComponentRegistry {
    pub fn new() -> ComponentRegistry {
        ComponentRegistry::default()
    }

    pub fn define(&mut self, name: impl Into<Symbol>, def: ComponentDef) {
        self.components.insert(name.into(), def);
    }

    pub fn resolve(&self, target: &Target) -> Option<&ComponentDef> {
        self.components.get(target.name())
    }

    pub fn spec(&self, name: &Symbol) -> Option<&ComponentSpec> {
        self.components.get(name).map(|def| &def.spec)
    }
}
