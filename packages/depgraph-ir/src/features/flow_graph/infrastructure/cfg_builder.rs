/*
 * CFG Builder
 *
 * Lowers the nested statement tree of one method into a flow graph. Each
 * statement category has a structural rule; sub-graphs are built bottom-up
 * and stitched together through the shared node factory. Jumps register as
 * pending on their sub-graph and resolve when the matching loop or switch
 * closes. Pseudo placeholder nodes are spliced out at the end of every
 * non-pseudo build.
 */

use std::collections::VecDeque;

use crate::features::program_element::application::source_model::SourceModel;
use crate::features::program_element::domain::element::{
    ElementKind, ElementStore, StatementCategory,
};
use crate::shared::models::ElementId;

use super::super::domain::cfg::{CFGNodeKind, ControlFlowGraph};
use super::node_factory::CFGNodeFactory;

impl ControlFlowGraph {
    /// Build the graph for the core element
    pub fn build(&mut self, model: &SourceModel, factory: &CFGNodeFactory) {
        assert!(!self.built, "this CFG has already been built");
        self.built = true;

        let store = model.store();
        let Some(core) = self.core else {
            let pseudo = factory.make_normal_node(store, None);
            self.nodes.insert(pseudo);
            self.enter = Some(pseudo);
            self.exits.insert(pseudo);
            return;
        };

        match &store.element(core).kind {
            ElementKind::Statement(data) => match data.category {
                StatementCategory::Catch | StatementCategory::Synchronized => {
                    self.build_conditional_block(model, factory, core, false)
                }
                StatementCategory::Do => self.build_do_block(model, factory, core),
                StatementCategory::For => self.build_for_block(model, factory, core),
                StatementCategory::Foreach | StatementCategory::While => {
                    self.build_conditional_block(model, factory, core, true)
                }
                StatementCategory::If => self.build_if_block(model, factory, core),
                StatementCategory::Switch => self.build_switch_block(model, factory, core),
                StatementCategory::SimpleBlock => self.build_block_body(model, factory, core),
                StatementCategory::TypeDeclaration => {}
                StatementCategory::Try => self.build_try_block(model, factory, core),
                _ => {
                    let node = factory.make_normal_node(store, Some(core));
                    // SequentialCFGs picks the first enter among siblings
                    self.enter = Some(node);
                    match data.category {
                        StatementCategory::Break => self.pending_breaks.push_front(node),
                        StatementCategory::Continue => self.pending_continues.push_front(node),
                        _ => {
                            self.exits.insert(node);
                        }
                    }
                    self.nodes.insert(node);
                }
            },
            ElementKind::Expression(_) => {
                let node = factory.make_normal_node(store, Some(core));
                self.enter = Some(node);
                self.exits.insert(node);
                self.nodes.insert(node);
            }
            ElementKind::Method(data) => {
                if !data.lambda {
                    self.build_block_body(model, factory, core);
                }
            }
            _ => panic!("unexpected CFG core element"),
        }

        self.remove_pseudo_nodes(factory);
    }

    /// Sequential composition of the CFGs of sibling elements
    fn build_sequential(
        model: &SourceModel,
        factory: &CFGNodeFactory,
        elements: &[ElementId],
    ) -> ControlFlowGraph {
        let mut cfgs: Vec<ControlFlowGraph> = Vec::new();
        for &element in elements {
            let mut cfg = ControlFlowGraph::new(Some(element));
            cfg.build(model, factory);
            if !cfg.is_empty() {
                cfgs.push(cfg);
            }
        }
        for index in 1..cfgs.len() {
            let posterior_enter = cfgs[index]
                .enter
                .expect("non-empty sequential sub-CFG without enter node");
            for &exit in &cfgs[index - 1].exits {
                factory.connect(exit, posterior_enter);
            }
        }
        if cfgs.is_empty() {
            let mut pseudo = ControlFlowGraph::new(None);
            pseudo.build(model, factory);
            cfgs.push(pseudo);
        }

        let mut sequence = ControlFlowGraph::new(None);
        sequence.built = true;
        sequence.enter = cfgs.first().unwrap().enter;
        sequence.exits.extend(&cfgs.last().unwrap().exits);
        for cfg in cfgs {
            sequence.nodes.extend(&cfg.nodes);
            sequence.pending_breaks.extend(cfg.pending_breaks);
            sequence.pending_continues.extend(cfg.pending_continues);
        }
        sequence
    }

    /// Method body or simple block: the sequential CFG of its children
    fn build_block_body(
        &mut self,
        model: &SourceModel,
        factory: &CFGNodeFactory,
        core: ElementId,
    ) {
        let statements = model.store().block_statements(core).to_vec();
        let sequence = Self::build_sequential(model, factory, &statements);
        self.enter = sequence.enter;
        self.exits.extend(&sequence.exits);
        self.nodes.extend(&sequence.nodes);
        self.pending_breaks.extend(sequence.pending_breaks);
        self.pending_continues.extend(sequence.pending_continues);
    }

    /// Condition-guarded block: Catch / Synchronized, and with `looping`
    /// also While / Foreach
    fn build_conditional_block(
        &mut self,
        model: &SourceModel,
        factory: &CFGNodeFactory,
        core: ElementId,
        looping: bool,
    ) {
        let store = model.store();
        let (sub_statements, condition) = {
            let data = store.element(core).statement().unwrap();
            (data.statements.clone(), data.condition)
        };
        let sequence = Self::build_sequential(model, factory, &sub_statements);
        let condition_node = factory.make_control_node(store, condition);

        self.enter = Some(condition_node);
        self.nodes.extend(&sequence.nodes);
        self.nodes.insert(condition_node);
        if looping {
            self.exits.insert(condition_node);
        } else {
            self.exits.extend(&sequence.exits);
            if sub_statements.is_empty() {
                self.exits.insert(condition_node);
            }
        }
        self.pending_breaks.extend(sequence.pending_breaks.iter().copied());
        self.pending_continues
            .extend(sequence.pending_continues.iter().copied());

        let body_enter = sequence
            .enter
            .expect("sequential sub-CFG without enter node");
        factory.connect_control(condition_node, body_enter, true);

        if looping {
            for &exit in &sequence.exits {
                if factory.node_kind(exit) == CFGNodeKind::Break {
                    self.exits.insert(exit);
                } else {
                    factory.connect(exit, condition_node);
                }
            }
            self.connect_pending_breaks(store, core);
            self.connect_pending_continues(store, factory, core, condition_node);
        }
    }

    fn build_if_block(&mut self, model: &SourceModel, factory: &CFGNodeFactory, core: ElementId) {
        self.build_conditional_block(model, factory, core, false);

        let store = model.store();
        let (else_statements, condition) = {
            let data = store.element(core).statement().unwrap();
            (data.else_statements.clone(), data.condition)
        };
        let condition_node = factory.make_control_node(store, condition);

        let else_cfg = Self::build_sequential(model, factory, &else_statements);
        self.nodes.extend(&else_cfg.nodes);
        self.exits.extend(&else_cfg.exits);
        if else_statements.is_empty() {
            self.exits.insert(condition_node);
        }

        let else_enter = else_cfg.enter.expect("sequential sub-CFG without enter node");
        factory.connect_control(condition_node, else_enter, false);

        self.pending_breaks.extend(else_cfg.pending_breaks);
        self.pending_continues.extend(else_cfg.pending_continues);
    }

    fn build_do_block(&mut self, model: &SourceModel, factory: &CFGNodeFactory, core: ElementId) {
        let store = model.store();
        let (statements, condition) = {
            let data = store.element(core).statement().unwrap();
            (data.statements.clone(), data.condition)
        };
        let sequence = Self::build_sequential(model, factory, &statements);
        let condition_node = factory.make_control_node(store, condition);

        let body_enter = sequence
            .enter
            .expect("sequential sub-CFG without enter node");
        self.enter = Some(body_enter);
        self.nodes.extend(&sequence.nodes);
        self.nodes.insert(condition_node);
        self.exits.insert(condition_node);
        self.pending_breaks.extend(sequence.pending_breaks);
        self.pending_continues.extend(sequence.pending_continues);

        for &exit in &sequence.exits {
            factory.connect(exit, condition_node);
        }
        factory.connect_control(condition_node, body_enter, true);

        self.connect_pending_breaks(store, core);
        self.connect_pending_continues(store, factory, core, body_enter);
    }

    fn build_for_block(&mut self, model: &SourceModel, factory: &CFGNodeFactory, core: ElementId) {
        let store = model.store();
        let (statements, initializers, condition, updaters) = {
            let data = store.element(core).statement().unwrap();
            (
                data.statements.clone(),
                data.initializers.clone(),
                data.condition,
                data.updaters.clone(),
            )
        };

        let body = Self::build_sequential(model, factory, &statements);
        let initializer_cfg = Self::build_sequential(model, factory, &initializers);
        let condition_node = factory.make_control_node(store, condition);
        let updater_cfg = Self::build_sequential(model, factory, &updaters);

        self.enter = initializer_cfg.enter;
        self.exits.insert(condition_node);
        self.nodes.extend(&body.nodes);
        self.nodes.extend(&initializer_cfg.nodes);
        self.nodes.insert(condition_node);
        self.nodes.extend(&updater_cfg.nodes);
        self.pending_breaks.extend(body.pending_breaks);
        self.pending_continues.extend(body.pending_continues);

        for &exit in &initializer_cfg.exits {
            factory.connect(exit, condition_node);
        }

        let body_enter = body.enter.expect("sequential sub-CFG without enter node");
        factory.connect_control(condition_node, body_enter, true);

        let updater_enter = updater_cfg
            .enter
            .expect("sequential sub-CFG without enter node");
        for &exit in &body.exits {
            factory.connect(exit, updater_enter);
        }
        for &exit in &updater_cfg.exits {
            factory.connect(exit, condition_node);
        }

        self.connect_pending_breaks(store, core);
        self.connect_pending_continues(store, factory, core, condition_node);
    }

    fn build_switch_block(
        &mut self,
        model: &SourceModel,
        factory: &CFGNodeFactory,
        core: ElementId,
    ) {
        let store = model.store();
        let (sub_statements, condition) = {
            let data = store.element(core).statement().unwrap();
            (data.statements.clone(), data.condition)
        };
        let condition_node = factory.make_control_node(store, condition);
        self.enter = Some(condition_node);
        self.nodes.insert(condition_node);

        let mut sub_cfgs: Vec<ControlFlowGraph> = Vec::new();
        for &sub in &sub_statements {
            let mut sub_cfg = ControlFlowGraph::new(Some(sub));
            sub_cfg.build(model, factory);
            self.nodes.extend(&sub_cfg.nodes);
            self.pending_breaks
                .extend(sub_cfg.pending_breaks.iter().copied());
            self.pending_continues
                .extend(sub_cfg.pending_continues.iter().copied());

            match store.element(sub).statement_category() {
                Some(StatementCategory::Case) => {
                    let case_enter = sub_cfg.enter.expect("case sub-CFG without enter node");
                    factory.connect_control(condition_node, case_enter, true);
                }
                Some(StatementCategory::Break) | Some(StatementCategory::Continue) => {
                    self.exits.extend(&sub_cfg.exits);
                }
                _ => {}
            }
            sub_cfgs.push(sub_cfg);
        }

        // Fall-through between consecutive children, except out of a jump
        for index in 1..sub_cfgs.len() {
            let anterior = &sub_cfgs[index - 1];
            if let Some(anterior_core) = anterior.core {
                if matches!(
                    store.element(anterior_core).statement_category(),
                    Some(StatementCategory::Break) | Some(StatementCategory::Continue)
                ) {
                    continue;
                }
            }
            let Some(posterior_enter) = sub_cfgs[index].enter else {
                continue;
            };
            for &exit in &sub_cfgs[index - 1].exits {
                factory.connect(exit, posterior_enter);
            }
        }

        if let Some(last) = sub_cfgs.last() {
            self.exits.extend(&last.exits);
        }

        self.connect_pending_breaks(store, core);
    }

    fn build_try_block(&mut self, model: &SourceModel, factory: &CFGNodeFactory, core: ElementId) {
        let store = model.store();
        let (statements, catch_statements, finally_statement) = {
            let data = store.element(core).statement().unwrap();
            (
                data.statements.clone(),
                data.catch_statements.clone(),
                data.finally_statement,
            )
        };
        let body = Self::build_sequential(model, factory, &statements);

        // A missing (or empty) finally contributes a single pseudo node that
        // is elided afterwards
        let mut finally_cfg = ControlFlowGraph::new(finally_statement);
        finally_cfg.build(model, factory);
        if finally_cfg.is_empty() {
            finally_cfg = ControlFlowGraph::new(None);
            finally_cfg.build(model, factory);
        }

        self.enter = body.enter;
        self.nodes.extend(&body.nodes);
        self.nodes.extend(&finally_cfg.nodes);
        self.exits.extend(&finally_cfg.exits);
        self.pending_breaks.extend(body.pending_breaks);
        self.pending_continues.extend(body.pending_continues);

        let finally_enter = finally_cfg.enter.expect("finally sub-CFG without enter node");
        for &exit in &body.exits {
            factory.connect(exit, finally_enter);
        }

        // No edge leads from the try body into its catch blocks: exception
        // flow is under-approximated and catch entries stay unreachable
        for &catch in &catch_statements {
            let mut catch_cfg = ControlFlowGraph::new(Some(catch));
            catch_cfg.build(model, factory);
            self.nodes.extend(&catch_cfg.nodes);
            for &exit in &catch_cfg.exits {
                factory.connect(exit, finally_enter);
            }
        }
    }

    /// Splice pseudo nodes out: connect every backward neighbor to every
    /// forward neighbor, promote the successor into the enter slot and the
    /// predecessors into the exit set where needed
    fn remove_pseudo_nodes(&mut self, factory: &CFGNodeFactory) {
        let snapshot: Vec<ElementId> = self.nodes.iter().copied().collect();
        for node in snapshot {
            if factory.node_kind(node) != CFGNodeKind::Pseudo {
                continue;
            }
            self.nodes.remove(&node);

            let forwards = factory.forward_nodes(node);
            let backwards = factory.backward_nodes(node);

            if self.enter == Some(node) {
                self.enter = forwards.first().copied();
            }
            if self.exits.remove(&node) {
                for &backward in &backwards {
                    self.exits.insert(backward);
                }
            }

            for &backward in &backwards {
                factory.remove_forward_node(backward, node);
            }
            for &forward in &forwards {
                factory.remove_backward_node(forward, node);
            }
            for &backward in &backwards {
                for &forward in &forwards {
                    factory.connect(backward, forward);
                }
            }
        }
    }

    /// Resolve pending breaks against a closing loop or switch: an unlabeled
    /// break, or one whose label matches, becomes an exit; the rest stay
    /// pending for an outer block
    fn connect_pending_breaks(&mut self, store: &ElementStore, statement: ElementId) {
        let statement_label = store
            .element(statement)
            .statement()
            .and_then(|s| s.label.clone());
        let mut remaining = VecDeque::new();
        while let Some(node) = self.pending_breaks.pop_front() {
            match store.jump_to_label(node) {
                None => {
                    self.exits.insert(node);
                }
                Some(label) if Some(label) == statement_label.as_deref() => {
                    self.exits.insert(node);
                }
                Some(_) => remaining.push_back(node),
            }
        }
        self.pending_breaks = remaining;
    }

    /// Resolve pending continues against a closing loop, wiring a jump edge
    /// to the supplied destination (the condition, or the body enter for do)
    fn connect_pending_continues(
        &mut self,
        store: &ElementStore,
        factory: &CFGNodeFactory,
        statement: ElementId,
        destination: ElementId,
    ) {
        let statement_label = store
            .element(statement)
            .statement()
            .and_then(|s| s.label.clone());
        let mut remaining = VecDeque::new();
        while let Some(node) = self.pending_continues.pop_front() {
            match store.jump_to_label(node) {
                None => factory.connect(node, destination),
                Some(label) if Some(label) == statement_label.as_deref() => {
                    factory.connect(node, destination)
                }
                Some(_) => remaining.push_back(node),
            }
        }
        self.pending_continues = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lowering::lower_compilation_unit;
    use crate::features::program_element::infrastructure::def_use::DefUseConfig;

    fn build_method_cfg(source: &str) -> (SourceModel, CFGNodeFactory, ControlFlowGraph) {
        let model = lower_compilation_unit(source, DefUseConfig::default()).unwrap();
        let method = model.methods()[0];
        let factory = CFGNodeFactory::new();
        let mut cfg = ControlFlowGraph::new(Some(method));
        cfg.build(&model, &factory);
        (model, factory, cfg)
    }

    fn nodes_of_kind(
        cfg: &ControlFlowGraph,
        factory: &CFGNodeFactory,
        kind: CFGNodeKind,
    ) -> Vec<ElementId> {
        cfg.all_nodes()
            .into_iter()
            .filter(|&n| factory.node_kind(n) == kind)
            .collect()
    }

    #[test]
    fn test_straight_line_flow() {
        let (_, factory, cfg) = build_method_cfg(
            "class C { int f() {\nint x = 1;\nint y = 2;\nreturn x + y;\n} }",
        );
        assert_eq!(cfg.all_nodes().len(), 3);
        let enter = cfg.enter_node().unwrap();
        let mid = factory.forward_nodes(enter)[0];
        let last = factory.forward_nodes(mid)[0];
        assert!(cfg.exit_nodes().contains(&last));
        assert!(factory.forward_nodes(last).is_empty());
        // no pseudo nodes survive the build
        for node in cfg.all_nodes() {
            assert_ne!(factory.node_kind(node), CFGNodeKind::Pseudo);
        }
    }

    #[test]
    fn test_if_else_branches() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f(int a) {\nif (a > 0) {\na = 1;\n} else {\na = 2;\n}\n} }",
        );
        let controls = nodes_of_kind(&cfg, &factory, CFGNodeKind::Control);
        assert_eq!(controls.len(), 1);
        let condition = controls[0];
        assert_eq!(cfg.enter_node(), Some(condition));

        let edges = factory.forward_edges(condition);
        let labels: Vec<Option<bool>> = edges.iter().map(|e| e.kind.control_label()).collect();
        assert!(labels.contains(&Some(true)));
        assert!(labels.contains(&Some(false)));
        // both branch statements exit the if
        assert_eq!(cfg.exit_nodes().len(), 2);
    }

    #[test]
    fn test_while_loop_back_edge() {
        let (_, factory, cfg) = build_method_cfg(
            "class C { void f(int n) {\nint i = 0;\nwhile (i < n) {\ni = i + 1;\n}\n} }",
        );
        // enter = the declaration, then the condition
        let enter = cfg.enter_node().unwrap();
        let condition = factory.forward_nodes(enter)[0];
        assert_eq!(factory.node_kind(condition), CFGNodeKind::Control);
        // the condition is the loop exit
        assert!(cfg.exit_nodes().contains(&condition));
        // body loops back to the condition
        let body = factory
            .forward_edges(condition)
            .into_iter()
            .find(|e| e.kind.control_label() == Some(true))
            .unwrap()
            .to;
        assert!(factory.forward_nodes(body).contains(&condition));
    }

    #[test]
    fn test_do_loop_shape() {
        let (_, factory, cfg) = build_method_cfg(
            "class C { void f(int n) {\ndo {\nn = n - 1;\n} while (n > 0);\n} }",
        );
        let enter = cfg.enter_node().unwrap();
        assert_eq!(factory.node_kind(enter), CFGNodeKind::Statement);
        let condition = factory.forward_nodes(enter)[0];
        assert_eq!(factory.node_kind(condition), CFGNodeKind::Control);
        // condition loops back to the body and is the sole exit
        assert!(factory.forward_nodes(condition).contains(&enter));
        assert_eq!(cfg.exit_nodes().into_iter().collect::<Vec<_>>(), vec![condition]);
    }

    #[test]
    fn test_for_loop_updater_cycle() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f() {\nfor (int i = 0; i < 10; i++) {\ng(i);\n}\n} }",
        );
        let controls = nodes_of_kind(&cfg, &factory, CFGNodeKind::Control);
        assert_eq!(controls.len(), 1);
        let condition = controls[0];
        // init -> condition; body -> updater -> condition
        let init = cfg.enter_node().unwrap();
        assert!(factory.forward_nodes(init).contains(&condition));
        let body = factory
            .forward_edges(condition)
            .into_iter()
            .find(|e| e.kind.control_label() == Some(true))
            .unwrap()
            .to;
        let updater = factory.forward_nodes(body)[0];
        assert!(factory.forward_nodes(updater).contains(&condition));
        assert!(cfg.exit_nodes().contains(&condition));
    }

    #[test]
    fn test_break_exits_loop() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f() {\nwhile (true) {\nbreak;\n}\n} }",
        );
        let breaks = nodes_of_kind(&cfg, &factory, CFGNodeKind::Break);
        assert_eq!(breaks.len(), 1);
        assert!(cfg.exit_nodes().contains(&breaks[0]));
        assert!(cfg.pending_breaks.is_empty());
    }

    #[test]
    fn test_continue_targets_condition() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f(int n) {\nwhile (n > 0) {\ncontinue;\n}\n} }",
        );
        let continues = nodes_of_kind(&cfg, &factory, CFGNodeKind::Continue);
        let controls = nodes_of_kind(&cfg, &factory, CFGNodeKind::Control);
        assert_eq!(continues.len(), 1);
        let targets = factory.forward_nodes(continues[0]);
        assert_eq!(targets, controls);
        assert_eq!(
            factory.forward_edges(continues[0])[0].kind.as_str(),
            "jump"
        );
    }

    #[test]
    fn test_labeled_break_skips_inner_loop() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f(boolean cond) {\nouter: for (int i = 0; i < 10; i++) {\nfor (int j = 0; j < 10; j++) {\nif (cond) {\nbreak outer;\n}\n}\n}\n} }",
        );
        let breaks = nodes_of_kind(&cfg, &factory, CFGNodeKind::Break);
        assert_eq!(breaks.len(), 1);
        // the labeled break bypasses the inner for and exits the outer one
        assert!(cfg.exit_nodes().contains(&breaks[0]));
        assert!(factory.forward_nodes(breaks[0]).is_empty());
        assert!(cfg.pending_breaks.is_empty());
    }

    #[test]
    fn test_switch_case_edges_and_fall_through() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f(int k) {\nswitch (k) {\ncase 1:\nk = 1;\nbreak;\ncase 2:\nk = 2;\ndefault:\nk = 3;\n}\n} }",
        );
        let cases = nodes_of_kind(&cfg, &factory, CFGNodeKind::SwitchCase);
        assert_eq!(cases.len(), 3);
        let condition = cfg.enter_node().unwrap();
        for case in &cases {
            let incoming = factory.backward_edges(*case);
            assert!(incoming
                .iter()
                .any(|e| e.from == condition && e.kind.control_label() == Some(true)));
        }
        // `k = 2` of case 2 falls through into the default label
        let store = model.store();
        let assignment_nodes: Vec<ElementId> = cfg
            .all_nodes()
            .into_iter()
            .filter(|&n| {
                factory.node_kind(n) == CFGNodeKind::Statement
                    && store.element(n).text.contains("k = 2")
            })
            .collect();
        assert_eq!(assignment_nodes.len(), 1);
        let next = factory.forward_nodes(assignment_nodes[0]);
        assert!(next.iter().any(|&n| factory.node_kind(n) == CFGNodeKind::SwitchCase));
        // the break after case 1 does not fall anywhere
        let breaks = nodes_of_kind(&cfg, &factory, CFGNodeKind::Break);
        assert!(factory.forward_nodes(breaks[0]).is_empty());
    }

    #[test]
    fn test_try_finally_flow() {
        let (model, factory, cfg) = build_method_cfg(
            "class C { void f() {\ntry {\ng();\n} catch (Exception e) {\nh();\n} finally {\nk();\n}\nm();\n} }",
        );
        let store = model.store();
        let find = |needle: &str| {
            cfg.all_nodes()
                .into_iter()
                .find(|&n| {
                    factory
                        .pe_of(n)
                        .map(|pe| store.element(pe).text.contains(needle))
                        .unwrap_or(false)
                })
                .unwrap()
        };
        let body = find("g()");
        let handler = find("h()");
        let finally = find("k()");
        let after = find("m()");

        assert!(factory.forward_nodes(body).contains(&finally));
        assert!(factory.forward_nodes(handler).contains(&finally));
        assert!(factory.forward_nodes(finally).contains(&after));
        // no edge from the try body into the catch block
        assert!(!factory.forward_nodes(body).contains(&handler));
        // the catch condition node is part of the graph but unreachable
        let catch_condition = cfg
            .all_nodes()
            .into_iter()
            .find(|&n| factory.node_kind(n) == CFGNodeKind::Control)
            .unwrap();
        assert!(!cfg.reachable_nodes(&factory).contains(&catch_condition));
    }

    #[test]
    fn test_remove_switch_cases_splices_case_nodes() {
        let (_, factory, mut cfg) = build_method_cfg(
            "class C { void f(int k) {\nswitch (k) {\ncase 1:\nk = 1;\n}\n} }",
        );
        let condition = cfg.enter_node().unwrap();
        cfg.remove_switch_cases(&factory);

        for node in cfg.all_nodes() {
            assert_ne!(factory.node_kind(node), CFGNodeKind::SwitchCase);
        }
        // the condition now reaches the case body directly, keeping the
        // control label of the spliced edge
        let forward = factory.forward_edges(condition);
        assert!(forward
            .iter()
            .any(|e| e.kind.control_label() == Some(true)
                && factory.node_kind(e.to) == CFGNodeKind::Statement));
    }

    #[test]
    fn test_remove_jump_statements_splices_continue() {
        let (_, factory, mut cfg) = build_method_cfg(
            "class C { void f(int n) {\nwhile (n > 0) {\ncontinue;\n}\n} }",
        );
        let condition = cfg.enter_node().unwrap();
        cfg.remove_jump_statements(&factory);

        for node in cfg.all_nodes() {
            assert!(!matches!(
                factory.node_kind(node),
                CFGNodeKind::Break | CFGNodeKind::Continue
            ));
        }
        // condition -> continue -> condition collapses into a self jump
        assert!(factory
            .forward_edges(condition)
            .iter()
            .any(|e| e.to == condition && e.kind.as_str() == "jump"));
    }

    #[test]
    fn test_build_twice_panics() {
        let model =
            lower_compilation_unit("class C { void f() { g(); } }", DefUseConfig::default())
                .unwrap();
        let method = model.methods()[0];
        let factory = CFGNodeFactory::new();
        let mut cfg = ControlFlowGraph::new(Some(method));
        cfg.build(&model, &factory);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cfg.build(&model, &factory);
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_edge_mirroring_invariant() {
        let (_, factory, cfg) = build_method_cfg(
            "class C { int f(int n) {\nint s = 0;\nfor (int i = 0; i < n; i++) {\ns += i;\n}\nreturn s;\n} }",
        );
        for node in cfg.all_nodes() {
            for edge in factory.forward_edges(node) {
                assert!(factory.backward_edges(edge.to).contains(&edge));
            }
            for edge in factory.backward_edges(node) {
                assert!(factory.forward_edges(edge.from).contains(&edge));
            }
        }
        // every reachable node is a member of the node set
        let nodes = cfg.all_nodes();
        for node in cfg.reachable_nodes(&factory) {
            assert!(nodes.contains(&node));
        }
    }
}
