/*
 * Def/Use Analyzer
 *
 * Per-element computation of variable defs and uses, memoized across the
 * compilation unit. Defs and uses bubble up the element tree; statement-level
 * normalization binds them to lexical scopes and rewrites unresolved names
 * into field form ("x" -> "this.x") when configured.
 */

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::features::program_element::domain::element::{
    ElementKind, ElementStore, ExpressionCategory,
};
use crate::features::program_element::domain::scope::ScopeManager;
use crate::features::program_element::domain::var::{DefCertainty, UseCertainty, VarDef, VarUse};
use crate::shared::models::ElementId;

/// Analyzer configuration
#[derive(Debug, Clone, Copy)]
pub struct DefUseConfig {
    /// Treat unresolved variables as fields of `this` ("x" ~ "this.x")
    pub treat_non_local_as_field: bool,
    /// Leave uppercase-leading names (likely type names) out of the field
    /// rewrite; only effective with `treat_non_local_as_field`
    pub treat_field_exclude_uppercase: bool,
}

impl Default for DefUseConfig {
    fn default() -> Self {
        Self {
            treat_non_local_as_field: true,
            treat_field_exclude_uppercase: true,
        }
    }
}

/// Name tables deciding whether a method invocation may define its receiver.
///
/// An exclusion strategy: well-known read-only names and prefixes map to
/// NoDef, well-known mutators to Def, everything else to MayDef. The tables
/// are data so callers can swap them; the defaults pin the historical lists
/// (note `contains` sits in the defining prefixes).
#[derive(Debug, Clone)]
pub struct MethodDefHeuristics {
    pub no_def_names: Vec<String>,
    pub def_names: Vec<String>,
    pub no_def_prefixes: Vec<String>,
    pub def_prefixes: Vec<String>,
}

impl Default for MethodDefHeuristics {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            // Object / Collection queries
            no_def_names: strings(&[
                "equals", "hashCode", "toString", "isEmpty", "size", "length", "stream",
            ]),
            // Collection mutators
            def_names: strings(&["push", "pop", "offer", "poll"]),
            // accessors, printing and logging
            no_def_prefixes: strings(&[
                "get", "print", "debug", "trace", "info", "warn", "error",
            ]),
            def_prefixes: strings(&["set", "add", "remove", "put", "insert", "contains"]),
        }
    }
}

impl MethodDefHeuristics {
    /// Judge whether a method may define its receiver, by name
    pub fn classify(&self, method_name: &str) -> DefCertainty {
        if self.no_def_names.iter().any(|n| method_name == n) {
            return DefCertainty::NoDef;
        }
        if self.def_names.iter().any(|n| method_name == n) {
            return DefCertainty::Def;
        }
        if self.no_def_prefixes.iter().any(|p| method_name.starts_with(p.as_str())) {
            return DefCertainty::NoDef;
        }
        if self.def_prefixes.iter().any(|p| method_name.starts_with(p.as_str())) {
            return DefCertainty::Def;
        }
        DefCertainty::MayDef
    }
}

/// Memoized def/use state of one compilation unit
#[derive(Debug)]
pub struct DefUseState {
    pub scopes: ScopeManager,
    config: DefUseConfig,
    heuristics: MethodDefHeuristics,
    defs: FxHashMap<ElementId, Arc<Vec<VarDef>>>,
    uses: FxHashMap<ElementId, Arc<Vec<VarUse>>>,
}

fn push_def(out: &mut Vec<VarDef>, def: VarDef) {
    if !out.contains(&def) {
        out.push(def);
    }
}

fn push_use(out: &mut Vec<VarUse>, use_: VarUse) {
    if !out.contains(&use_) {
        out.push(use_);
    }
}

impl DefUseState {
    pub fn new(config: DefUseConfig) -> Self {
        Self {
            scopes: ScopeManager::new(),
            config,
            heuristics: MethodDefHeuristics::default(),
            defs: FxHashMap::default(),
            uses: FxHashMap::default(),
        }
    }

    pub fn with_heuristics(mut self, heuristics: MethodDefHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn config(&self) -> DefUseConfig {
        self.config
    }

    /// Defs of an element; may contain NoDef entries. Memoized.
    pub fn def_variables(&mut self, store: &ElementStore, id: ElementId) -> Arc<Vec<VarDef>> {
        if let Some(defs) = self.defs.get(&id) {
            return Arc::clone(defs);
        }
        let computed = Arc::new(self.calc_defs(store, id));
        self.defs.insert(id, Arc::clone(&computed));
        computed
    }

    /// Uses of an element; may contain NoUse entries. Memoized.
    pub fn use_variables(&mut self, store: &ElementStore, id: ElementId) -> Arc<Vec<VarUse>> {
        if let Some(uses) = self.uses.get(&id) {
            return Arc::clone(uses);
        }
        let computed = Arc::new(self.calc_uses(store, id));
        self.uses.insert(id, Arc::clone(&computed));
        computed
    }

    fn calc_defs(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarDef> {
        match &store.element(id).kind {
            ElementKind::Statement(_) => self.calc_statement_defs(store, id),
            ElementKind::Expression(_) => self.calc_expression_defs(store, id),
            ElementKind::Method(_) => self.calc_method_defs(store, id),
            ElementKind::VariableDeclaration(data) => {
                vec![VarDef::new(None, data.name.clone(), DefCertainty::Declare)]
            }
            ElementKind::Class(_) | ElementKind::Type | ElementKind::Operator(_) => Vec::new(),
        }
    }

    fn calc_uses(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarUse> {
        match &store.element(id).kind {
            ElementKind::Statement(_) => self.calc_statement_uses(store, id),
            ElementKind::Expression(_) => self.calc_expression_uses(store, id),
            ElementKind::Method(_) => self.calc_method_uses(store, id),
            ElementKind::VariableDeclaration(_)
            | ElementKind::Class(_)
            | ElementKind::Type
            | ElementKind::Operator(_) => Vec::new(),
        }
    }

    // ------------------------- statements -------------------------

    fn statement_children(store: &ElementStore, id: ElementId) -> Vec<ElementId> {
        let stmt = store.element(id).statement().expect("statement element");
        let mut children = Vec::new();
        children.extend(&stmt.expressions);
        children.extend(&stmt.initializers);
        children.extend(&stmt.condition);
        children.extend(&stmt.updaters);
        children.extend(&stmt.statements);
        children.extend(&stmt.else_statements);
        children.extend(&stmt.catch_statements);
        children.extend(&stmt.finally_statement);
        children
    }

    fn calc_statement_defs(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarDef> {
        let owner = store.element(id).statement().unwrap().owner_block;
        let mut out = Vec::new();
        for child in Self::statement_children(store, id) {
            let defs = self.def_variables(store, child);
            for def in defs.iter() {
                let normalized = self.normalize_def(store, id, owner, def.clone());
                push_def(&mut out, normalized);
            }
        }
        out
    }

    fn calc_statement_uses(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarUse> {
        let owner = store.element(id).statement().unwrap().owner_block;
        let mut out = Vec::new();
        for child in Self::statement_children(store, id) {
            let uses = self.use_variables(store, child);
            for use_ in uses.iter() {
                let normalized = self.normalize_use(store, id, owner, use_.clone());
                push_use(&mut out, normalized);
            }
        }
        out
    }

    /// Bind an incoming def to this statement: resolve its scope, rewrite
    /// unresolved names into field form, record the relevant statement, and
    /// register the variable so later lookups can find it.
    fn normalize_def(
        &mut self,
        store: &ElementStore,
        stmt: ElementId,
        owner_block: Option<ElementId>,
        mut def: VarDef,
    ) -> VarDef {
        let our_scope = owner_block.map(|block| self.scopes.scope_of_block(store, block));

        if def.scope.is_none() {
            if def.certainty.at_least_declare() {
                // A declaration lives in the statement's own scope
                def.scope = our_scope;
            } else if let Some(our_scope) = our_scope {
                // Otherwise bind to the scope that declared the name, if any
                def.scope = self.scopes.search_variable_def(our_scope, &def.main_name);
            }
        }

        if def.scope.is_none() {
            self.rewrite_as_field(&mut def.main_name, &mut def.aliases);
        }

        if def.relevant_stmt.is_none() {
            def.relevant_stmt = Some(stmt);
        }

        if let Some(scope) = def.scope {
            self.scopes.add_def_variable(scope, &def.main_name, &def.aliases);
        }
        def
    }

    fn normalize_use(
        &mut self,
        store: &ElementStore,
        stmt: ElementId,
        owner_block: Option<ElementId>,
        mut use_: VarUse,
    ) -> VarUse {
        let our_scope = owner_block.map(|block| self.scopes.scope_of_block(store, block));

        if use_.scope.is_none() {
            if let Some(our_scope) = our_scope {
                use_.scope = self.scopes.search_variable_def(our_scope, &use_.main_name);
            }
        }

        if use_.scope.is_none() {
            self.rewrite_as_field(&mut use_.main_name, &mut use_.aliases);
        }

        if use_.relevant_stmt.is_none() {
            use_.relevant_stmt = Some(stmt);
        }

        if let Some(scope) = use_.scope {
            self.scopes.add_use_variable(scope, &use_.main_name, &use_.aliases);
        }
        use_
    }

    /// "x" -> "this.x" with aliases {"x", "this.x"}, for names no scope
    /// declares (most likely fields of `this`)
    fn rewrite_as_field(&self, main_name: &mut String, aliases: &mut BTreeSet<String>) {
        if !self.config.treat_non_local_as_field || main_name.is_empty() {
            return;
        }
        let leading_upper = main_name
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        if self.config.treat_field_exclude_uppercase && leading_upper {
            return;
        }
        if main_name.starts_with("this.") {
            return;
        }
        let with_this = format!("this.{main_name}");
        *aliases = BTreeSet::from([main_name.clone(), with_this.clone()]);
        *main_name = with_this;
    }

    // ------------------------- expressions -------------------------

    fn calc_expression_defs(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarDef> {
        let expr = store.element(id).expression().expect("expression element");
        let mut out = Vec::new();
        match expr.category {
            ExpressionCategory::Assignment => {
                if expr.expressions.len() == 3 {
                    // LHS values are surely Def; defs inside the RHS are kept
                    let left = expr.expressions[0];
                    let targets = self.variable_name_aliases(store, left);
                    if !targets.is_empty() {
                        for (name, aliases) in targets {
                            push_def(
                                &mut out,
                                VarDef::with_aliases(None, name, aliases, DefCertainty::Def),
                            );
                        }
                    } else {
                        for def in self.def_variables(store, left).iter() {
                            push_def(&mut out, def.clone());
                        }
                    }

                    // expressions[1] is the operator

                    let right = expr.expressions[2];
                    for def in self.def_variables(store, right).iter() {
                        push_def(&mut out, def.clone());
                    }
                }
            }
            ExpressionCategory::VariableDeclarationFragment => {
                if expr.expressions.len() == 2 {
                    let name = expr.expressions[0];
                    let targets = self.variable_name_aliases(store, name);
                    if !targets.is_empty() {
                        for (main, aliases) in targets {
                            push_def(
                                &mut out,
                                VarDef::with_aliases(
                                    None,
                                    main,
                                    aliases,
                                    DefCertainty::DeclareAndDef,
                                ),
                            );
                        }
                    } else {
                        for def in self.def_variables(store, name).iter() {
                            push_def(&mut out, def.clone());
                        }
                    }

                    let initializer = expr.expressions[1];
                    for def in self.def_variables(store, initializer).iter() {
                        push_def(&mut out, def.clone());
                    }
                }
            }
            ExpressionCategory::Postfix => {
                // x++ / x-- surely define x
                if expr.expressions.len() == 2 {
                    let operand = expr.expressions[0];
                    let targets = self.variable_name_aliases(store, operand);
                    if !targets.is_empty() {
                        for (name, aliases) in targets {
                            push_def(
                                &mut out,
                                VarDef::with_aliases(None, name, aliases, DefCertainty::Def),
                            );
                        }
                    } else {
                        for def in self.def_variables(store, operand).iter() {
                            push_def(&mut out, def.clone());
                        }
                    }
                }
            }
            ExpressionCategory::Prefix => {
                // ++x / --x define x; +x, -x, ~x, !x only propagate
                if expr.expressions.len() == 2 {
                    let operator_token = match &store.element(expr.expressions[0]).kind {
                        ElementKind::Operator(token) => Some(token.as_str()),
                        _ => None,
                    };
                    if let Some(token) = operator_token {
                        let operand = expr.expressions[1];
                        let targets = self.variable_name_aliases(store, operand);
                        if !targets.is_empty() && (token == "++" || token == "--") {
                            for (name, aliases) in targets {
                                push_def(
                                    &mut out,
                                    VarDef::with_aliases(None, name, aliases, DefCertainty::Def),
                                );
                            }
                        } else {
                            for def in self.def_variables(store, operand).iter() {
                                push_def(&mut out, def.clone());
                            }
                        }
                    }
                }
            }
            ExpressionCategory::MethodInvocation => {
                // Arguments could be MayDef too, but that is uncommon and
                // drowns the result in false positives, so only the receiver
                // is classified.
                if let (Some(qualifier), Some(&name)) =
                    (expr.qualifier, expr.expressions.first())
                {
                    let call_def = self.heuristics.classify(store.text(name));
                    let targets = self.variable_name_aliases(store, qualifier);
                    if !targets.is_empty() {
                        // Added whatever the certainty, NoDef included, so
                        // consumers can see the absence
                        for (name, aliases) in targets {
                            push_def(&mut out, VarDef::with_aliases(None, name, aliases, call_def));
                        }
                    } else if call_def.at_least_may_def() {
                        // Chained call such as `a.getX().set(1)`: the sub-defs
                        // in the receiver become at least MayDef
                        for def in self.def_variables(store, qualifier).iter() {
                            push_def(&mut out, def.promote(DefCertainty::MayDef));
                        }
                    } else {
                        for def in self.def_variables(store, qualifier).iter() {
                            push_def(&mut out, def.clone());
                        }
                    }
                }
            }
            _ => {
                let children = expr.expressions.clone();
                let anonymous = expr.anonymous_class;
                for child in children {
                    for def in self.def_variables(store, child).iter() {
                        push_def(&mut out, def.clone());
                    }
                }
                if let Some(class) = anonymous {
                    let methods = store.element(class).class().unwrap().methods.clone();
                    for method in methods {
                        for def in self.def_variables(store, method).iter() {
                            push_def(&mut out, def.clone());
                        }
                    }
                }
            }
        }
        out
    }

    fn calc_expression_uses(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarUse> {
        let expr = store.element(id).expression().expect("expression element");
        let mut out = Vec::new();
        match expr.category {
            ExpressionCategory::Assignment => {
                // RHS values are used for sure
                if expr.expressions.len() == 3 {
                    let right = expr.expressions[2];
                    for use_ in self.use_variables(store, right).iter() {
                        push_use(&mut out, use_.promote(UseCertainty::Use));
                    }
                }
            }
            ExpressionCategory::VariableDeclarationFragment => {
                if expr.expressions.len() == 2 {
                    let initializer = expr.expressions[1];
                    for use_ in self.use_variables(store, initializer).iter() {
                        push_use(&mut out, use_.promote(UseCertainty::Use));
                    }
                }
            }
            ExpressionCategory::Postfix | ExpressionCategory::Prefix => {
                for child in expr.expressions.clone() {
                    for use_ in self.use_variables(store, child).iter() {
                        push_use(&mut out, use_.promote(UseCertainty::Use));
                    }
                }
            }
            ExpressionCategory::SimpleName => {
                push_use(
                    &mut out,
                    VarUse::new(None, store.element(id).text.clone(), UseCertainty::MayUse),
                );
            }
            ExpressionCategory::MethodInvocation => {
                // Receiver and arguments propagate as-is; the method name
                // itself (expressions[0]) is not a use
                if let Some(qualifier) = expr.qualifier {
                    for use_ in self.use_variables(store, qualifier).iter() {
                        push_use(&mut out, use_.clone());
                    }
                }
                let arguments: Vec<ElementId> = expr.expressions.iter().skip(1).copied().collect();
                for argument in arguments {
                    for use_ in self.use_variables(store, argument).iter() {
                        push_use(&mut out, use_.clone());
                    }
                }
            }
            _ => {
                let targets = self.variable_name_aliases(store, id);
                if !targets.is_empty() {
                    for (name, aliases) in targets {
                        push_use(
                            &mut out,
                            VarUse::with_aliases(None, name, aliases, UseCertainty::MayUse),
                        );
                    }
                } else {
                    let children = expr.expressions.clone();
                    let anonymous = expr.anonymous_class;
                    for child in children {
                        for use_ in self.use_variables(store, child).iter() {
                            push_use(&mut out, use_.clone());
                        }
                    }
                    if let Some(class) = anonymous {
                        let methods = store.element(class).class().unwrap().methods.clone();
                        for method in methods {
                            for use_ in self.use_variables(store, method).iter() {
                                push_use(&mut out, use_.clone());
                            }
                        }
                    }
                }
            }
        }
        out
    }

    // ------------------------- methods -------------------------

    fn calc_method_defs(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarDef> {
        let method = store.element(id).method().expect("method element");
        let parameters = method.parameters.clone();
        let statements = method.statements.clone();
        let lambda_expression = if method.lambda {
            method.lambda_expression
        } else {
            None
        };

        let mut out = Vec::new();

        // Parameters first, so statement lookups can resolve them
        let method_scope = self.scopes.scope_of_block(store, id);
        for parameter in parameters {
            let parameter_defs = self.def_variables(store, parameter);
            for pd in parameter_defs.iter() {
                let def = VarDef::with_aliases(
                    Some(method_scope),
                    pd.main_name.clone(),
                    pd.aliases.clone(),
                    pd.certainty,
                );
                self.scopes
                    .add_def_variable(method_scope, &def.main_name, &def.aliases);
                push_def(&mut out, def);
            }
        }

        for statement in statements {
            for def in self.def_variables(store, statement).iter() {
                push_def(&mut out, def.clone());
            }
        }

        if let Some(lambda_expression) = lambda_expression {
            for def in self.def_variables(store, lambda_expression).iter() {
                push_def(&mut out, def.clone());
            }
        }
        out
    }

    fn calc_method_uses(&mut self, store: &ElementStore, id: ElementId) -> Vec<VarUse> {
        let method = store.element(id).method().expect("method element");
        let statements = method.statements.clone();
        let lambda_expression = if method.lambda {
            method.lambda_expression
        } else {
            None
        };

        let mut out = Vec::new();
        for statement in statements {
            for use_ in self.use_variables(store, statement).iter() {
                push_use(&mut out, use_.clone());
            }
        }
        if let Some(lambda_expression) = lambda_expression {
            for use_ in self.use_variables(store, lambda_expression).iter() {
                push_use(&mut out, use_.clone());
            }
        }
        out
    }

    // ------------------------- variable recognition -------------------------

    /// Judge whether an element is a variable reference and return its name
    /// aliases. Array indices are excluded, fields are kept:
    /// - `a[0]`   -> {"a": {"a"}}
    /// - `a.x`    -> {"a.x": {"a.x"}, "a": {"a"}}
    /// - `this.x` -> {"this.x": {"this.x"}} (plus "x" without field treatment)
    /// - `foo().x` -> {}
    fn variable_name_aliases(
        &self,
        store: &ElementStore,
        id: ElementId,
    ) -> Vec<(String, BTreeSet<String>)> {
        let element = store.element(id);
        let Some(expr) = element.expression() else {
            return Vec::new();
        };
        let text = element.text.clone();
        let single = |name: &str| (name.to_string(), BTreeSet::from([name.to_string()]));

        match expr.category {
            ExpressionCategory::SimpleName => vec![single(&text)],
            ExpressionCategory::ArrayAccess => {
                if let Some(&base) = expr.expressions.first() {
                    if Self::is_category(store, base, ExpressionCategory::SimpleName) {
                        return vec![single(store.text(base))];
                    }
                }
                Vec::new()
            }
            ExpressionCategory::FieldAccess => {
                if expr.expressions.len() == 2 {
                    let base = expr.expressions[0];
                    if Self::is_category(store, base, ExpressionCategory::SimpleName) {
                        return vec![single(&text), single(store.text(base))];
                    }
                    if Self::is_category(store, base, ExpressionCategory::This) {
                        if self.config.treat_non_local_as_field {
                            return vec![single(&text)];
                        }
                        let field = store.text(expr.expressions[1]).to_string();
                        return vec![(
                            text.clone(),
                            BTreeSet::from([text, field]),
                        )];
                    }
                }
                Vec::new()
            }
            ExpressionCategory::QualifiedName => {
                if !expr.expressions.is_empty() {
                    if let Some(qualifier) = expr.qualifier {
                        if Self::is_category(store, qualifier, ExpressionCategory::SimpleName) {
                            return vec![single(&text), single(store.text(qualifier))];
                        }
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn is_category(store: &ElementStore, id: ElementId, category: ExpressionCategory) -> bool {
        store.element(id).expression_category() == Some(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program_element::domain::element::{
        ElementKind, ProgramElement, StatementCategory, StatementData,
    };
    use crate::shared::models::LineSpan;

    fn expression(
        store: &mut ElementStore,
        category: ExpressionCategory,
        text: &str,
    ) -> ElementId {
        let mut element = ProgramElement::new(
            ElementKind::Expression(crate::features::program_element::domain::element::ExpressionData::new(category)),
            LineSpan::new(1, 1),
        );
        element.text = text.to_string();
        store.insert(element)
    }

    fn operator(store: &mut ElementStore, token: &str) -> ElementId {
        let mut element =
            ProgramElement::new(ElementKind::Operator(token.to_string()), LineSpan::new(1, 1));
        element.text = token.to_string();
        store.insert(element)
    }

    fn statement(
        store: &mut ElementStore,
        category: StatementCategory,
        owner: Option<ElementId>,
    ) -> ElementId {
        store.insert(ProgramElement::new(
            ElementKind::Statement(StatementData::new(category, owner)),
            LineSpan::new(1, 1),
        ))
    }

    fn add_child(store: &mut ElementStore, parent: ElementId, child: ElementId) {
        store
            .element_mut(parent)
            .expression_mut()
            .unwrap()
            .expressions
            .push(child);
    }

    #[test]
    fn test_heuristics_pin_original_tables() {
        let h = MethodDefHeuristics::default();
        assert_eq!(h.classify("equals"), DefCertainty::NoDef);
        assert_eq!(h.classify("push"), DefCertainty::Def);
        assert_eq!(h.classify("getValue"), DefCertainty::NoDef);
        assert_eq!(h.classify("setValue"), DefCertainty::Def);
        // `contains` is a defining prefix in the historical tables
        assert_eq!(h.classify("containsKey"), DefCertainty::Def);
        assert_eq!(h.classify("frobnicate"), DefCertainty::MayDef);
    }

    #[test]
    fn test_assignment_defines_lhs() {
        let mut store = ElementStore::new();
        let x = expression(&mut store, ExpressionCategory::SimpleName, "x");
        let eq = operator(&mut store, "=");
        let y = expression(&mut store, ExpressionCategory::SimpleName, "y");
        let assign = expression(&mut store, ExpressionCategory::Assignment, "x = y");
        add_child(&mut store, assign, x);
        add_child(&mut store, assign, eq);
        add_child(&mut store, assign, y);

        let mut state = DefUseState::new(DefUseConfig::default());
        let defs = state.def_variables(&store, assign);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].main_name, "x");
        assert_eq!(defs[0].certainty, DefCertainty::Def);

        let uses = state.use_variables(&store, assign);
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].main_name, "y");
        assert_eq!(uses[0].certainty, UseCertainty::Use);
    }

    #[test]
    fn test_statement_rewrites_undeclared_def_as_field() {
        let mut store = ElementStore::new();
        let block = statement(&mut store, StatementCategory::SimpleBlock, None);
        let x = expression(&mut store, ExpressionCategory::SimpleName, "x");
        let eq = operator(&mut store, "=");
        let one = expression(&mut store, ExpressionCategory::Number, "1");
        let assign = expression(&mut store, ExpressionCategory::Assignment, "x = 1");
        add_child(&mut store, assign, x);
        add_child(&mut store, assign, eq);
        add_child(&mut store, assign, one);
        let stmt = statement(&mut store, StatementCategory::Expression, Some(block));
        store
            .element_mut(stmt)
            .statement_mut()
            .unwrap()
            .expressions
            .push(assign);

        let mut state = DefUseState::new(DefUseConfig::default());
        let defs = state.def_variables(&store, stmt);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].main_name, "this.x");
        assert!(defs[0].matches_name("x"));
        assert!(defs[0].matches_name("this.x"));
        assert_eq!(defs[0].relevant_stmt, Some(stmt));
    }

    #[test]
    fn test_uppercase_names_are_excluded_from_field_rewrite() {
        let mut store = ElementStore::new();
        let block = statement(&mut store, StatementCategory::SimpleBlock, None);
        let x = expression(&mut store, ExpressionCategory::SimpleName, "CONSTANT");
        let eq = operator(&mut store, "=");
        let one = expression(&mut store, ExpressionCategory::Number, "1");
        let assign = expression(&mut store, ExpressionCategory::Assignment, "CONSTANT = 1");
        add_child(&mut store, assign, x);
        add_child(&mut store, assign, eq);
        add_child(&mut store, assign, one);
        let stmt = statement(&mut store, StatementCategory::Expression, Some(block));
        store
            .element_mut(stmt)
            .statement_mut()
            .unwrap()
            .expressions
            .push(assign);

        let mut state = DefUseState::new(DefUseConfig::default());
        let defs = state.def_variables(&store, stmt);
        assert_eq!(defs[0].main_name, "CONSTANT");
    }

    #[test]
    fn test_method_invocation_receiver_classification() {
        let mut store = ElementStore::new();
        let recv = expression(&mut store, ExpressionCategory::SimpleName, "list");
        let name = expression(&mut store, ExpressionCategory::SimpleName, "add");
        let arg = expression(&mut store, ExpressionCategory::SimpleName, "v");
        let call = expression(&mut store, ExpressionCategory::MethodInvocation, "list.add(v)");
        store.element_mut(call).expression_mut().unwrap().qualifier = Some(recv);
        add_child(&mut store, call, name);
        add_child(&mut store, call, arg);

        let mut state = DefUseState::new(DefUseConfig::default());
        let defs = state.def_variables(&store, call);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].main_name, "list");
        assert_eq!(defs[0].certainty, DefCertainty::Def);

        // The method name is not a use; receiver and argument are
        let uses = state.use_variables(&store, call);
        let names: Vec<_> = uses.iter().map(|u| u.main_name.as_str()).collect();
        assert!(names.contains(&"list"));
        assert!(names.contains(&"v"));
        assert!(!names.contains(&"add"));
    }

    #[test]
    fn test_repeated_queries_return_the_same_set() {
        let mut store = ElementStore::new();
        let x = expression(&mut store, ExpressionCategory::SimpleName, "x");
        let mut state = DefUseState::new(DefUseConfig::default());
        let first = state.use_variables(&store, x);
        let second = state.use_variables(&store, x);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
