use fxhash::{FxHashMap, FxHashSet};
use log::warn;

use std::collections::BTreeMap;

use syntax::expr::{Expr, ExprKind, Lit};
use syntax::symbol::Symbol;

use crate::bindings::Bindings;
use crate::ir::{CompiledTemplate, ComponentCall, DynKind, DynamicTemplate};
use crate::registry::ComponentRegistry;
use crate::rendered::{
    index_components, ComponentId, ComponentNode, Comprehension, Dynamic, Rendered,
};
use crate::track::{Changed, ChangedSet};
use crate::value::Value;

/// One step in the structural position of a call site: which dynamic
/// slot we descended into, or which comprehension item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PathSeg {
    Slot(usize),
    Item(usize),
}

/// The stable address of one component mount position. Two renders that
/// reach the same position (or the same user-supplied id) get the same
/// component id back.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MountKey {
    parent: Option<ComponentId>,
    path: Vec<PathSeg>,
    key: Option<(Symbol, String)>,
}

/// Owns the mount-position → component-id table for one session. Ids
/// are assigned once per distinct position and survive re-renders; ids
/// whose component left the tree are pruned after each render.
#[derive(Default)]
pub struct Mounts {
    ids: FxHashMap<MountKey, ComponentId>,
    next: u32,
}

impl Mounts {
    pub fn new() -> Mounts {
        Mounts::default()
    }

    fn lookup_or_assign(&mut self, key: MountKey) -> ComponentId {
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = ComponentId(self.next);
        self.next += 1;
        self.ids.insert(key, id);
        id
    }

    /// Drop mount entries whose component is no longer in the tree.
    pub fn retain_live(&mut self, live: &FxHashSet<ComponentId>) {
        self.ids.retain(|_, id| live.contains(id));
    }
}

/// Everything one evaluation pass needs besides the bindings: component
/// resolution, mount identity, and an id-index over the previous
/// snapshot so components find their old output even after moving.
pub struct EvalContext<'env> {
    registry: &'env ComponentRegistry,
    mounts: &'env mut Mounts,
    prev_components: FxHashMap<ComponentId, &'env ComponentNode>,
    parent: Option<ComponentId>,
    path: Vec<PathSeg>,
}

impl<'env> EvalContext<'env> {
    pub fn new(
        registry: &'env ComponentRegistry,
        mounts: &'env mut Mounts,
        previous: Option<&'env Rendered>,
    ) -> EvalContext<'env> {
        let mut prev_components = FxHashMap::default();
        if let Some(previous) = previous {
            index_components(previous, &mut prev_components);
        }
        EvalContext {
            registry,
            mounts,
            prev_components,
            parent: None,
            path: vec![],
        }
    }
}

/// Block-scoped bindings: loop variables and `:let` patterns. Checked
/// before the session bindings on every variable read.
#[derive(Default)]
struct Locals {
    entries: Vec<(Symbol, Value)>,
}

impl Locals {
    fn push(&mut self, name: Symbol, value: Value) {
        self.entries.push((name, value));
    }

    fn pop(&mut self) {
        self.entries.pop();
    }

    fn get(&self, name: &Symbol) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    fn contains(&self, name: &Symbol) -> bool {
        self.get(name).is_some()
    }
}

/// Evaluate a compiled template against one binding set, reusing the
/// previous snapshot wherever change tracking proves an expression
/// cannot have produced a different result. The returned tree carries
/// `None` in every skipped slot; diff it, then [`absorb`] it into the
/// next snapshot.
///
/// [`absorb`]: crate::rendered::absorb
pub fn evaluate(
    template: &CompiledTemplate,
    bindings: &Bindings,
    previous: Option<&Rendered>,
    ctx: &mut EvalContext<'_>,
) -> Rendered {
    let mut locals = Locals::default();
    eval_template(template, bindings, previous, ctx, &mut locals, true)
}

fn eval_template(
    template: &CompiledTemplate,
    bindings: &Bindings,
    previous: Option<&Rendered>,
    ctx: &mut EvalContext<'_>,
    locals: &mut Locals,
    root: bool,
) -> Rendered {
    // A fingerprint mismatch means a different template shape landed
    // here; the old tree tells us nothing.
    let previous = previous.filter(|prev| prev.fingerprint == template.fingerprint);
    let changed = bindings.changed();
    let mut dynamics = Vec::with_capacity(template.dynamics.len());
    for (slot, dynamic) in template.dynamics.iter().enumerate() {
        if previous.is_some() && !dynamic.deps.affected(changed, |root| locals.contains(root)) {
            // Nothing this slot reads moved: the previous output stands
            // and the expression is not re-executed at all.
            dynamics.push(None);
            continue;
        }
        ctx.path.push(PathSeg::Slot(slot));
        dynamics.push(Some(eval_dynamic(dynamic, bindings, ctx, locals)));
        ctx.path.pop();
    }
    Rendered::new(
        template.statics.clone(),
        dynamics,
        template.fingerprint,
        root,
    )
}

fn eval_dynamic(
    dynamic: &DynamicTemplate,
    bindings: &Bindings,
    ctx: &mut EvalContext<'_>,
    locals: &mut Locals,
) -> Dynamic {
    match &dynamic.kind {
        DynKind::Expr { expr, context } => match eval_expr(expr, bindings, locals) {
            Value::Slot(mut entries) => match entries.len() {
                0 => Dynamic::Value(String::new()),
                1 => Dynamic::Nested(entries.pop().expect("len checked")),
                _ => Dynamic::List(entries),
            },
            value => Dynamic::Value(value.render(context)),
        },
        DynKind::Spread { expr } => {
            Dynamic::Value(eval_expr(expr, bindings, locals).render_spread())
        }
        DynKind::Comprehension {
            generator,
            template,
        } => {
            let source = eval_expr(&generator.source, bindings, locals);
            let items_in = match source {
                Value::List(items) => items,
                Value::Nil => vec![],
                _ => {
                    warn!(
                        "`:for` source `{}` is not a list, rendering nothing",
                        generator.source.code
                    );
                    vec![]
                }
            };
            let mut items = Vec::with_capacity(items_in.len());
            for (index, item) in items_in.into_iter().enumerate() {
                ctx.path.push(PathSeg::Item(index));
                locals.push(generator.pattern.symbol.clone(), item);
                let mut dynamics = Vec::with_capacity(template.dynamics.len());
                for (slot, dynamic) in template.dynamics.iter().enumerate() {
                    ctx.path.push(PathSeg::Slot(slot));
                    dynamics.push(eval_dynamic(dynamic, bindings, ctx, locals));
                    ctx.path.pop();
                }
                locals.pop();
                ctx.path.pop();
                items.push(dynamics);
            }
            Dynamic::Comprehension(Comprehension {
                statics: template.statics.clone(),
                fingerprint: template.fingerprint,
                items,
            })
        }
        DynKind::Component(call) => eval_component(call, bindings, ctx, locals),
    }
}

fn eval_component(
    call: &ComponentCall,
    bindings: &Bindings,
    ctx: &mut EvalContext<'_>,
    locals: &mut Locals,
) -> Dynamic {
    let registry = ctx.registry;
    let changed = bindings.changed();

    // Build the callee's bindings from the invocation, deriving its
    // changed-set from the caller's: an attribute whose expression is
    // untouched arrives unchanged on the other side.
    let mut assigns: BTreeMap<Symbol, Value> = BTreeMap::new();
    let mut callee_changed = ChangedSet::new();
    for spread in &call.spreads {
        let spread_changed = expr_changed(spread, changed, locals).is_some();
        if let Value::Map(map) = eval_expr(spread, bindings, locals) {
            for (key, value) in map {
                if spread_changed {
                    callee_changed.insert(key.clone(), Changed::All);
                }
                assigns.insert(key, value);
            }
        }
    }
    for attr in &call.attrs {
        if let Some(change) = expr_changed(&attr.expr, changed, locals) {
            callee_changed.insert(attr.name.clone(), change);
        }
        assigns.insert(attr.name.clone(), eval_expr(&attr.expr, bindings, locals));
    }

    // Mount identity: the `id` attribute when present (so identity
    // follows content through reorders), the structural position
    // otherwise.
    let key = call
        .id_attr()
        .map(|attr| eval_expr(&attr.expr, bindings, locals).to_text());
    let mount_key = match key {
        Some(id) => MountKey {
            parent: ctx.parent,
            path: vec![],
            key: Some((call.target.name().clone(), id)),
        },
        None => MountKey {
            parent: ctx.parent,
            path: ctx.path.clone(),
            key: None,
        },
    };
    let cid = ctx.mounts.lookup_or_assign(mount_key);
    let prev_node = ctx.prev_components.get(&cid).copied();

    let def = match registry.resolve(&call.target) {
        Some(def) => def,
        None => {
            warn!("unresolved component <{}>", call.target.name());
            return Dynamic::Value(String::new());
        }
    };

    // Slot content is evaluated in the caller's scope. A `:let` pattern
    // binds the assigns the component hands back.
    let handed_back = Value::Map(assigns.clone());
    for slot in &call.slots {
        let mut entries = Vec::with_capacity(slot.entries.len());
        let mut slot_changed = false;
        for entry in &slot.entries {
            slot_changed |= entry
                .deps
                .affected(changed, |root| locals.contains(root));
            if entry.let_binding.is_some() && !callee_changed.is_empty() {
                slot_changed = true;
            }
            let bound = entry.let_binding.is_some();
            if let Some(pattern) = &entry.let_binding {
                locals.push(pattern.clone(), handed_back.clone());
            }
            let rendered = eval_template(&entry.template, bindings, None, ctx, locals, false);
            if bound {
                locals.pop();
            }
            entries.push(rendered);
        }
        if slot_changed {
            callee_changed.mark(slot.name.clone());
        }
        assigns.insert(slot.name.clone(), Value::Slot(entries));
    }

    // A derived change mark whose value is identical to what the
    // component already has is dropped: a loop rebinding the same data
    // must not force its components to re-render. This is still change
    // tracking deciding, not the diff engine comparing output.
    if let Some(prev) = prev_node {
        let mut unchanged = vec![];
        for (key, value) in &assigns {
            if callee_changed.contains(key) && prev.assigns.get(key) == Some(value) {
                unchanged.push(key.clone());
            }
        }
        for key in unchanged {
            callee_changed.remove(&key);
        }
    }

    // Evaluate the callee in its own scope, against its own previous
    // output (found by id, so moves don't lose it).
    let values: FxHashMap<Symbol, Value> = assigns
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let callee_bindings = Bindings::from_values(values, callee_changed);
    let saved_parent = ctx.parent;
    let saved_path = std::mem::take(&mut ctx.path);
    ctx.parent = Some(cid);
    let mut callee_locals = Locals::default();
    let rendered = eval_template(
        &def.template,
        &callee_bindings,
        prev_node.map(|node| &node.rendered),
        ctx,
        &mut callee_locals,
        false,
    );
    ctx.parent = saved_parent;
    ctx.path = saved_path;

    Dynamic::Component(ComponentNode {
        fingerprint: rendered.fingerprint,
        component_id: cid,
        assigns,
        rendered,
    })
}

fn eval_expr(expr: &Expr, bindings: &Bindings, locals: &Locals) -> Value {
    match &expr.kind {
        ExprKind::Lit(lit) => match lit {
            Lit::Nil => Value::Nil,
            Lit::Bool(b) => Value::Bool(*b),
            Lit::Int(n) => Value::Int(*n),
            Lit::Float(n) => Value::Float(*n),
            Lit::Str(s) => Value::Str(s.as_str().to_string()),
            Lit::Atom(a) => Value::Atom(a.clone()),
        },
        ExprKind::Var(root) => read(root, bindings, locals),
        ExprKind::Path { root, fields } => {
            let mut value = read(root, bindings, locals);
            for field in fields {
                value = value.get(field).cloned().unwrap_or(Value::Nil);
            }
            value
        }
    }
}

fn read(root: &Symbol, bindings: &Bindings, locals: &Locals) -> Value {
    if let Some(value) = locals.get(root) {
        return value.clone();
    }
    bindings.get(root).cloned().unwrap_or(Value::Nil)
}

/// How much the value of `expr` moved since the last render, from the
/// caller's point of view. Local bindings have no cross-render identity
/// and always count as fully changed.
fn expr_changed(expr: &Expr, changed: &ChangedSet, locals: &Locals) -> Option<Changed> {
    if let Some(root) = expr.root_key() {
        if locals.contains(root) {
            return Some(Changed::All);
        }
    }
    changed.project_expr(expr)
}

#[cfg(test)]
mod tests {
    use super::{evaluate, EvalContext, Mounts};
    use crate::bindings::Bindings;
    use crate::ir::{fingerprint, CompiledTemplate, DynKind, DynamicTemplate};
    use crate::registry::ComponentRegistry;
    use crate::rendered::Dynamic;
    use crate::track::{Deps, Read};
    use crate::value::ValueContext;
    use source::diagnostics::Span;
    use syntax::expr::{Expr, ExprKind};
    use syntax::symbol::Symbol;

    fn var(name: &str) -> Expr {
        Expr {
            kind: ExprKind::Var(Symbol::intern(name)),
            code: Symbol::intern(name),
            span: Span::new(0, 0),
        }
    }

    fn single_dynamic(name: &str) -> CompiledTemplate {
        let dynamics = vec![DynamicTemplate {
            kind: DynKind::Expr {
                expr: var(name),
                context: ValueContext::Body,
            },
            deps: Deps {
                reads: vec![Read {
                    root: Symbol::intern(name),
                    fields: vec![],
                }],
            },
            span: Span::new(0, 0),
        }];
        let statics = vec!["<p>".to_string(), "</p>".to_string()];
        let fingerprint = fingerprint(&statics, &dynamics);
        CompiledTemplate {
            statics,
            dynamics,
            fingerprint,
        }
    }

    #[test]
    fn first_render_fills_every_slot() {
        let template = single_dynamic("name");
        let registry = ComponentRegistry::new();
        let mut mounts = Mounts::new();
        let mut bindings = Bindings::new();
        bindings.assign("name", "Ada");
        let mut ctx = EvalContext::new(&registry, &mut mounts, None);
        let rendered = evaluate(&template, &bindings, None, &mut ctx);
        assert_eq!(rendered.to_text(), "<p>Ada</p>");
    }

    #[test]
    fn unchanged_slots_are_skipped_not_recomputed() {
        let template = single_dynamic("name");
        let registry = ComponentRegistry::new();
        let mut mounts = Mounts::new();
        let mut bindings = Bindings::new();
        bindings.assign("name", "Ada");

        let previous = {
            let mut ctx = EvalContext::new(&registry, &mut mounts, None);
            evaluate(&template, &bindings, None, &mut ctx)
        };

        bindings.clear_changes();
        let mut ctx = EvalContext::new(&registry, &mut mounts, Some(&previous));
        let rendered = evaluate(&template, &bindings, Some(&previous), &mut ctx);
        assert_eq!(rendered.dynamics, vec![None]);
    }

    #[test]
    fn changed_slots_re_evaluate() {
        let template = single_dynamic("name");
        let registry = ComponentRegistry::new();
        let mut mounts = Mounts::new();
        let mut bindings = Bindings::new();
        bindings.assign("name", "Ada");

        let previous = {
            let mut ctx = EvalContext::new(&registry, &mut mounts, None);
            evaluate(&template, &bindings, None, &mut ctx)
        };

        bindings.clear_changes();
        bindings.assign("name", "Grace");
        let mut ctx = EvalContext::new(&registry, &mut mounts, Some(&previous));
        let rendered = evaluate(&template, &bindings, Some(&previous), &mut ctx);
        assert_eq!(
            rendered.dynamics,
            vec![Some(Dynamic::Value("Grace".to_string()))]
        );
    }
}
