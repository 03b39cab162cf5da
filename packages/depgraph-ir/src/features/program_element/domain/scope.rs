/*
 * Lexical Scope Model
 *
 * One scope per block element. The scope manager interns scopes by their
 * owning block and establishes the parent chain by following owner_block
 * back-references (skipping self-cycles).
 */

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::ElementId;

use super::element::ElementStore;

/// Handle of a scope inside a ScopeManager
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ScopeId(pub u32);

/// A variable registered in a scope
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScopeVar {
    main_name: String,
    aliases: BTreeSet<String>,
    /// Def-style entries are the ones name lookup considers
    is_def: bool,
}

/// A lexical scope keyed by its block element
#[derive(Debug)]
pub struct Scope {
    pub block: ElementId,
    pub parent: Option<ScopeId>,
    variables: Vec<ScopeVar>,
}

impl Scope {
    fn new(block: ElementId) -> Self {
        Self {
            block,
            parent: None,
            variables: Vec::new(),
        }
    }

    /// Whether this scope directly declares a def-style var matching `name`
    fn has_variable_def(&self, name: &str) -> bool {
        self.variables
            .iter()
            .filter(|v| v.is_def)
            .any(|v| v.aliases.contains(name))
    }

    fn add(&mut self, var: ScopeVar) {
        if !self.variables.contains(&var) {
            self.variables.push(var);
        }
    }
}

/// Interning manager for scopes of one compilation unit
#[derive(Debug, Default)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
    by_block: FxHashMap<ElementId, ScopeId>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the cache
    pub fn clear(&mut self) {
        self.scopes.clear();
        self.by_block.clear();
    }

    /// Scope of a block element; idempotent. On first access the full parent
    /// chain is established recursively through owner_block references.
    pub fn scope_of_block(&mut self, store: &ElementStore, block: ElementId) -> ScopeId {
        if let Some(&scope) = self.by_block.get(&block) {
            return scope;
        }
        let scope = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(block));
        self.by_block.insert(block, scope);

        let parent_block = store
            .get(block)
            .and_then(|e| e.statement())
            .and_then(|s| s.owner_block);
        if let Some(parent_block) = parent_block {
            if parent_block != block {
                let parent = self.scope_of_block(store, parent_block);
                self.scopes[scope.0 as usize].parent = Some(parent);
            }
        }
        scope
    }

    /// The block element a scope belongs to
    pub fn block(&self, scope: ScopeId) -> ElementId {
        self.scopes[scope.0 as usize].block
    }

    /// Nearest enclosing scope (starting at `from`, inclusive) that declares
    /// a def-style variable whose alias set contains `name`
    pub fn search_variable_def(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(scope) = current {
            if self.scopes[scope.0 as usize].has_variable_def(name) {
                return Some(scope);
            }
            current = self.scopes[scope.0 as usize].parent;
        }
        None
    }

    /// Register a def-style variable in a scope
    pub fn add_def_variable(
        &mut self,
        scope: ScopeId,
        main_name: &str,
        aliases: &BTreeSet<String>,
    ) {
        self.scopes[scope.0 as usize].add(ScopeVar {
            main_name: main_name.to_string(),
            aliases: aliases.clone(),
            is_def: true,
        });
    }

    /// Register a use-style variable in a scope (kept for completeness;
    /// name lookup ignores these)
    pub fn add_use_variable(
        &mut self,
        scope: ScopeId,
        main_name: &str,
        aliases: &BTreeSet<String>,
    ) {
        self.scopes[scope.0 as usize].add(ScopeVar {
            main_name: main_name.to_string(),
            aliases: aliases.clone(),
            is_def: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program_element::domain::element::{
        ElementKind, ProgramElement, StatementCategory, StatementData,
    };
    use crate::shared::models::LineSpan;

    fn block(store: &mut ElementStore, owner: Option<ElementId>) -> ElementId {
        store.insert(ProgramElement::new(
            ElementKind::Statement(StatementData::new(StatementCategory::SimpleBlock, owner)),
            LineSpan::new(1, 1),
        ))
    }

    #[test]
    fn test_scope_is_interned_per_block() {
        let mut store = ElementStore::new();
        let mut scopes = ScopeManager::new();
        let b = block(&mut store, None);

        let s1 = scopes.scope_of_block(&store, b);
        let s2 = scopes.scope_of_block(&store, b);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_parent_chain_follows_owner_blocks() {
        let mut store = ElementStore::new();
        let mut scopes = ScopeManager::new();
        let outer = block(&mut store, None);
        let inner = block(&mut store, Some(outer));

        let inner_scope = scopes.scope_of_block(&store, inner);
        let outer_scope = scopes.scope_of_block(&store, outer);

        scopes.add_def_variable(
            outer_scope,
            "x",
            &BTreeSet::from(["x".to_string()]),
        );

        assert_eq!(scopes.search_variable_def(inner_scope, "x"), Some(outer_scope));
        assert_eq!(scopes.search_variable_def(inner_scope, "y"), None);
    }

    #[test]
    fn test_use_entries_are_ignored_by_lookup() {
        let mut store = ElementStore::new();
        let mut scopes = ScopeManager::new();
        let b = block(&mut store, None);
        let scope = scopes.scope_of_block(&store, b);

        scopes.add_use_variable(scope, "x", &BTreeSet::from(["x".to_string()]));
        assert_eq!(scopes.search_variable_def(scope, "x"), None);

        scopes.add_def_variable(scope, "x", &BTreeSet::from(["x".to_string()]));
        assert_eq!(scopes.search_variable_def(scope, "x"), Some(scope));
    }
}
