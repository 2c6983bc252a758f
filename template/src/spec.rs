use syntax::symbol::Symbol;
use syntax::ty::AttrType;

/// A declared attribute on a component.
#[derive(Clone, Debug)]
pub struct AttrSpec {
    pub name: Symbol,
    pub ty: AttrType,
    pub required: bool,
}

/// A declared slot on a component, with the attributes its entries may
/// carry.
#[derive(Clone, Debug)]
pub struct SlotSpec {
    pub name: Symbol,
    pub required: bool,
    pub attrs: Vec<AttrSpec>,
}

/// The immutable interface record of one component: what it accepts.
/// Built through [`TemplateCompiler`]; invocation sites are checked
/// against it by the declarative validation pass.
#[derive(Clone, Debug)]
pub struct ComponentSpec {
    pub name: Symbol,
    pub attrs: Vec<AttrSpec>,
    pub slots: Vec<SlotSpec>,
}

impl ComponentSpec {
    pub fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|attr| attr.name.as_str() == name)
    }

    pub fn slot(&self, name: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|slot| slot.name.as_str() == name)
    }
}

/// Accumulates attribute/slot/component declarations while one unit is
/// being compiled and finalizes them into immutable [`ComponentSpec`]
/// records. This is the whole declaration story: there is no ambient
/// registry to mutate.
#[derive(Default)]
pub struct TemplateCompiler {
    current: Option<PendingComponent>,
    finished: Vec<ComponentSpec>,
}

struct PendingComponent {
    name: Symbol,
    attrs: Vec<AttrSpec>,
    slots: Vec<SlotSpec>,
}

impl TemplateCompiler {
    pub fn new() -> TemplateCompiler {
        TemplateCompiler::default()
    }

    pub fn begin_component(&mut self, name: impl Into<Symbol>) -> &mut Self {
        assert!(
            self.current.is_none(),
            "finish the open component declaration first"
        );
        self.current = Some(PendingComponent {
            name: name.into(),
            attrs: vec![],
            slots: vec![],
        });
        self
    }

    pub fn attr(&mut self, name: impl Into<Symbol>, ty: AttrType, required: bool) -> &mut Self {
        let pending = self
            .current
            .as_mut()
            .expect("attr() outside a component declaration");
        pending.attrs.push(AttrSpec {
            name: name.into(),
            ty,
            required,
        });
        self
    }

    pub fn slot(&mut self, name: impl Into<Symbol>, required: bool) -> &mut Self {
        self.slot_with_attrs(name, required, vec![])
    }

    pub fn slot_with_attrs(
        &mut self,
        name: impl Into<Symbol>,
        required: bool,
        attrs: Vec<AttrSpec>,
    ) -> &mut Self {
        let pending = self
            .current
            .as_mut()
            .expect("slot() outside a component declaration");
        pending.slots.push(SlotSpec {
            name: name.into(),
            required,
            attrs,
        });
        self
    }

    pub fn end_component(&mut self) -> &mut Self {
        let pending = self
            .current
            .take()
            .expect("end_component() with no open declaration");
        self.finished.push(ComponentSpec {
            name: pending.name,
            attrs: pending.attrs,
            slots: pending.slots,
        });
        self
    }

    /// Finish the unit, yielding every component declared in it.
    pub fn finish(mut self) -> Vec<ComponentSpec> {
        assert!(
            self.current.is_none(),
            "finish() with an open component declaration"
        );
        std::mem::take(&mut self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::TemplateCompiler;
    use syntax::ty::AttrType;

    #[test]
    fn declarations_accumulate_and_finalize() {
        let mut compiler = TemplateCompiler::new();
        compiler
            .begin_component("button")
            .attr("label", AttrType::String, true)
            .attr("disabled", AttrType::Boolean, false)
            .slot("inner_block", false)
            .end_component();
        compiler.begin_component("card").slot("header", true).end_component();

        let specs = compiler.finish();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name.as_str(), "button");
        assert!(specs[0].attr("label").unwrap().required);
        assert!(specs[1].slot("header").unwrap().required);
    }
}
