use fxhash::{FxHashMap, FxHashSet};

use template::bindings::Bindings;
use template::eval::{evaluate, EvalContext, Mounts};
use template::ir::CompiledTemplate;
use template::registry::ComponentRegistry;
use template::rendered::{absorb, index_components, Rendered};

use crate::diff::diff;
use crate::patch::Patch;

/// One live session's view of one template: the compiled template, the
/// component universe it can mount, and the previous render snapshot.
///
/// Sessions are strictly sequential: one event, one evaluate-then-diff
/// cycle, then the snapshot is replaced by plain ownership swap. Nothing
/// here blocks, suspends, or shares state across sessions, so there is
/// no locking anywhere.
pub struct LiveTemplate {
    template: CompiledTemplate,
    registry: ComponentRegistry,
    mounts: Mounts,
    snapshot: Option<Rendered>,
}

impl LiveTemplate {
    pub fn new(template: CompiledTemplate) -> LiveTemplate {
        LiveTemplate::with_registry(template, ComponentRegistry::new())
    }

    pub fn with_registry(template: CompiledTemplate, registry: ComponentRegistry) -> LiveTemplate {
        LiveTemplate {
            template,
            registry,
            mounts: Mounts::new(),
            snapshot: None,
        }
    }

    /// Evaluate against `bindings`, diff against the previous render,
    /// keep the merged result as the new snapshot, and consume the
    /// bindings' change marks. The first call yields the full replace;
    /// later calls yield minimal patches (possibly empty: send nothing).
    pub fn render(&mut self, bindings: &mut Bindings) -> Patch {
        let current = {
            let mut ctx =
                EvalContext::new(&self.registry, &mut self.mounts, self.snapshot.as_ref());
            evaluate(&self.template, bindings, self.snapshot.as_ref(), &mut ctx)
        };
        let patch = diff(self.snapshot.as_ref(), &current);
        let snapshot = absorb(current, self.snapshot.as_ref());

        // Mount positions whose component left the tree are dropped so
        // a later remount at the same position gets a fresh identity.
        let mut live_index = FxHashMap::default();
        index_components(&snapshot, &mut live_index);
        let live: FxHashSet<_> = live_index.keys().copied().collect();
        self.mounts.retain_live(&live);

        self.snapshot = Some(snapshot);
        bindings.clear_changes();
        patch
    }

    /// The full markup of the last render, for first-paint delivery.
    pub fn html(&self) -> Option<String> {
        self.snapshot.as_ref().map(Rendered::to_text)
    }
}
