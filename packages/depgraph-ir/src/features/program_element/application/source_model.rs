/*
 * Source Model
 *
 * The lowered view of one compilation unit: the element store, the methods
 * found in it, and the lazily computed def/use state. Graph builders share a
 * model immutably; def/use queries serialize on an internal lock so the model
 * can be cached and handed out across worker threads.
 */

use std::sync::Arc;

use parking_lot::Mutex;

use crate::features::program_element::domain::element::ElementStore;
use crate::features::program_element::domain::scope::ScopeId;
use crate::features::program_element::domain::var::{VarDef, VarUse};
use crate::features::program_element::infrastructure::def_use::{
    DefUseConfig, DefUseState, MethodDefHeuristics,
};
use crate::shared::models::ElementId;

#[derive(Debug)]
pub struct SourceModel {
    store: ElementStore,
    methods: Vec<ElementId>,
    def_use: Mutex<DefUseState>,
}

impl SourceModel {
    pub fn new(store: ElementStore, methods: Vec<ElementId>, config: DefUseConfig) -> Self {
        Self {
            store,
            methods,
            def_use: Mutex::new(DefUseState::new(config)),
        }
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    /// Swap the method-def heuristic tables. Resets the def/use state, so
    /// call this before the first query.
    pub fn set_method_def_heuristics(&self, heuristics: MethodDefHeuristics) {
        let mut state = self.def_use.lock();
        *state = DefUseState::new(state.config()).with_heuristics(heuristics);
    }

    /// Methods of the compilation unit, in id order
    pub fn methods(&self) -> &[ElementId] {
        &self.methods
    }

    /// Defs of an element; may contain NoDef entries
    pub fn def_variables(&self, id: ElementId) -> Arc<Vec<VarDef>> {
        self.def_use.lock().def_variables(&self.store, id)
    }

    /// Uses of an element; may contain NoUse entries
    pub fn use_variables(&self, id: ElementId) -> Arc<Vec<VarUse>> {
        self.def_use.lock().use_variables(&self.store, id)
    }

    /// Defs of at least MayDef certainty
    pub fn defs_at_least_may_def(&self, id: ElementId) -> Vec<VarDef> {
        self.def_variables(id)
            .iter()
            .filter(|d| d.certainty.at_least_may_def())
            .cloned()
            .collect()
    }

    /// Uses of at least MayUse certainty
    pub fn uses_at_least_may_use(&self, id: ElementId) -> Vec<VarUse> {
        self.use_variables(id)
            .iter()
            .filter(|u| u.certainty.at_least_may_use())
            .cloned()
            .collect()
    }

    /// The block element a scope is keyed by
    pub fn scope_block(&self, scope: ScopeId) -> ElementId {
        self.def_use.lock().scopes.block(scope)
    }
}
