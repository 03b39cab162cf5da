/*
 * Variable Def/Use Model
 *
 * Defs and uses carry a certainty grade from a small lattice and an alias
 * set: the textual names under which one logical variable may be referenced
 * (e.g. {"source", "this.source"}).
 */

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::shared::models::ElementId;

use super::scope::ScopeId;

/// Def certainty lattice:
/// `Unknown < NoDef < MayDef < Def < Declare < DeclareAndDef`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DefCertainty {
    Unknown,
    NoDef,
    MayDef,
    Def,
    Declare,
    DeclareAndDef,
}

impl DefCertainty {
    pub fn at_least_may_def(self) -> bool {
        self >= DefCertainty::MayDef
    }

    pub fn at_least_declare(self) -> bool {
        self >= DefCertainty::Declare
    }
}

/// Use certainty lattice: `Unknown < NoUse < MayUse < Use`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum UseCertainty {
    Unknown,
    NoUse,
    MayUse,
    Use,
}

impl UseCertainty {
    pub fn at_least_may_use(self) -> bool {
        self >= UseCertainty::MayUse
    }
}

/// A def of a named variable by some program element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarDef {
    /// Scope of the variable; None for unresolved names (typically fields)
    pub scope: Option<ScopeId>,
    pub main_name: String,
    /// Aliases of the same variable, main name included
    pub aliases: BTreeSet<String>,
    pub certainty: DefCertainty,
    /// The statement this def was normalized under
    pub relevant_stmt: Option<ElementId>,
}

impl VarDef {
    pub fn new(scope: Option<ScopeId>, name: impl Into<String>, certainty: DefCertainty) -> Self {
        let name = name.into();
        let aliases = BTreeSet::from([name.clone()]);
        Self {
            scope,
            main_name: name,
            aliases,
            certainty,
            relevant_stmt: None,
        }
    }

    pub fn with_aliases(
        scope: Option<ScopeId>,
        main_name: impl Into<String>,
        aliases: BTreeSet<String>,
        certainty: DefCertainty,
    ) -> Self {
        Self {
            scope,
            main_name: main_name.into(),
            aliases,
            certainty,
            relevant_stmt: None,
        }
    }

    /// Whether a variable name matches this def
    pub fn matches_name(&self, name: &str) -> bool {
        self.aliases.contains(name)
    }

    /// A copy promoted to at least the given certainty
    pub fn promote(&self, certainty: DefCertainty) -> Self {
        let mut out = self.clone();
        if out.certainty < certainty {
            out.certainty = certainty;
        }
        out
    }
}

/// A use of a named variable by some program element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarUse {
    pub scope: Option<ScopeId>,
    pub main_name: String,
    pub aliases: BTreeSet<String>,
    pub certainty: UseCertainty,
    pub relevant_stmt: Option<ElementId>,
}

impl VarUse {
    pub fn new(scope: Option<ScopeId>, name: impl Into<String>, certainty: UseCertainty) -> Self {
        let name = name.into();
        let aliases = BTreeSet::from([name.clone()]);
        Self {
            scope,
            main_name: name,
            aliases,
            certainty,
            relevant_stmt: None,
        }
    }

    pub fn with_aliases(
        scope: Option<ScopeId>,
        main_name: impl Into<String>,
        aliases: BTreeSet<String>,
        certainty: UseCertainty,
    ) -> Self {
        Self {
            scope,
            main_name: main_name.into(),
            aliases,
            certainty,
            relevant_stmt: None,
        }
    }

    /// Whether a variable name matches this use
    pub fn matches_name(&self, name: &str) -> bool {
        self.aliases.contains(name)
    }

    /// A copy promoted to at least the given certainty
    pub fn promote(&self, certainty: UseCertainty) -> Self {
        let mut out = self.clone();
        if out.certainty < certainty {
            out.certainty = certainty;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_def_lattice_order() {
        assert!(DefCertainty::Unknown < DefCertainty::NoDef);
        assert!(DefCertainty::NoDef < DefCertainty::MayDef);
        assert!(DefCertainty::MayDef < DefCertainty::Def);
        assert!(DefCertainty::Def < DefCertainty::Declare);
        assert!(DefCertainty::Declare < DefCertainty::DeclareAndDef);

        assert!(!DefCertainty::NoDef.at_least_may_def());
        assert!(DefCertainty::MayDef.at_least_may_def());
        assert!(DefCertainty::DeclareAndDef.at_least_declare());
        assert!(!DefCertainty::Def.at_least_declare());
    }

    #[test]
    fn test_use_lattice_order() {
        assert!(UseCertainty::Unknown < UseCertainty::NoUse);
        assert!(UseCertainty::NoUse < UseCertainty::MayUse);
        assert!(UseCertainty::MayUse < UseCertainty::Use);
        assert!(UseCertainty::MayUse.at_least_may_use());
        assert!(!UseCertainty::NoUse.at_least_may_use());
    }

    #[test]
    fn test_promote_never_demotes() {
        let def = VarDef::new(None, "x", DefCertainty::Def);
        assert_eq!(def.promote(DefCertainty::MayDef).certainty, DefCertainty::Def);
        assert_eq!(
            def.promote(DefCertainty::DeclareAndDef).certainty,
            DefCertainty::DeclareAndDef
        );

        let use_ = VarUse::new(None, "x", UseCertainty::MayUse);
        assert_eq!(use_.promote(UseCertainty::Use).certainty, UseCertainty::Use);
    }

    #[test]
    fn test_alias_matching() {
        let def = VarDef::with_aliases(
            None,
            "this.source",
            BTreeSet::from(["source".to_string(), "this.source".to_string()]),
            DefCertainty::Def,
        );
        assert!(def.matches_name("source"));
        assert!(def.matches_name("this.source"));
        assert!(!def.matches_name("sink"));
    }
}
