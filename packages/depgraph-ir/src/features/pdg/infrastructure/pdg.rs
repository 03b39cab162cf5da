/*
 * PDG (Program Dependence Graph) Builder
 *
 * Builds the method's CFG, then overlays three edge families on PDG nodes
 * derived from it:
 * - Data: reaching-definition propagation over the CFG per defined variable,
 *   plus parameter-to-entry wiring
 * - Control: conditional blocks govern their direct statements (true for
 *   then/body/initializers/updaters, false for else)
 * - Execution: every CFG successor edge lifted into the PDG
 *
 * Traversals use explicit work lists so adversarial nesting cannot exhaust
 * the native stack.
 */

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::features::flow_graph::domain::cfg::ControlFlowGraph;
use crate::features::flow_graph::infrastructure::node_factory::CFGNodeFactory;
use crate::features::program_element::application::source_model::SourceModel;
use crate::features::program_element::domain::element::StatementCategory;
use crate::features::program_element::domain::var::{DefCertainty, UseCertainty};
use crate::shared::models::ElementId;

use super::super::domain::model::{PDGEdge, PDGEdgeKind, PDGNodeKind, PdgOptions};
use super::node_factory::PDGNodeFactory;

/// The program dependence graph of a method
#[derive(Debug)]
pub struct ProgramDependenceGraph {
    /// The method this PDG belongs to
    pub unit: ElementId,
    options: PdgOptions,
    node_factory: PDGNodeFactory,
    cfg_factory: CFGNodeFactory,
    /// The fake enter node (a Control node over a synthetic element)
    enter: ElementId,
    parameter_nodes: Vec<ElementId>,
    all_nodes: BTreeSet<ElementId>,
    exit_nodes: BTreeSet<ElementId>,
    cfg: Option<ControlFlowGraph>,
    built: bool,
}

impl ProgramDependenceGraph {
    pub fn new(model: &SourceModel, unit: ElementId, options: PdgOptions) -> Self {
        let store = model.store();
        assert!(
            store.element(unit).method().is_some(),
            "PDG unit must be a method"
        );
        let node_factory = PDGNodeFactory::new();
        let cfg_factory = CFGNodeFactory::new();

        let enter = node_factory.make_control_node(store, unit);
        let mut all_nodes = BTreeSet::new();
        all_nodes.insert(enter);

        let mut parameter_nodes = Vec::new();
        for &parameter in &store.element(unit).method().unwrap().parameters {
            let node = node_factory.make_normal_node(store, parameter);
            all_nodes.insert(node);
            parameter_nodes.push(node);
        }

        Self {
            unit,
            options,
            node_factory,
            cfg_factory,
            enter,
            parameter_nodes,
            all_nodes,
            exit_nodes: BTreeSet::new(),
            cfg: None,
            built: false,
        }
    }

    // ------------------------- accessors -------------------------

    pub fn options(&self) -> PdgOptions {
        self.options
    }

    pub fn enter_node(&self) -> ElementId {
        self.enter
    }

    pub fn parameter_nodes(&self) -> &[ElementId] {
        &self.parameter_nodes
    }

    pub fn exit_nodes(&self) -> BTreeSet<ElementId> {
        self.exit_nodes.clone()
    }

    pub fn all_nodes(&self) -> BTreeSet<ElementId> {
        self.all_nodes.clone()
    }

    /// All nodes except the enter node and the parameter nodes, ascending
    pub fn all_nodes_except_enter_and_params(&self) -> Vec<ElementId> {
        self.all_nodes
            .iter()
            .copied()
            .filter(|&node| {
                !matches!(
                    self.node_factory.node_kind(node),
                    PDGNodeKind::MethodEnter | PDGNodeKind::Parameter
                )
            })
            .collect()
    }

    /// Every edge of the graph, ordered by (from, to, type)
    pub fn all_edges(&self) -> BTreeSet<PDGEdge> {
        let mut edges = BTreeSet::new();
        for &node in &self.all_nodes {
            edges.extend(self.node_factory.forward_edges(node));
            edges.extend(self.node_factory.backward_edges(node));
        }
        edges
    }

    pub fn node_factory(&self) -> &PDGNodeFactory {
        &self.node_factory
    }

    pub fn cfg_factory(&self) -> &CFGNodeFactory {
        &self.cfg_factory
    }

    /// The CFG the dependences were derived from (present after build)
    pub fn cfg(&self) -> Option<&ControlFlowGraph> {
        self.cfg.as_ref()
    }

    // ------------------------- build -------------------------

    pub fn build(&mut self, model: &SourceModel) {
        assert!(!self.built, "this PDG has already been built");
        self.built = true;

        let mut cfg = ControlFlowGraph::new(Some(self.unit));
        cfg.build(model, &self.cfg_factory);

        if self.options.build_control_dependence {
            if self.options.control_from_enter_to_all {
                self.emit_control_for_block(model, &cfg, self.enter, self.unit);
            }
            if self.options.control_from_enter_to_parameters {
                for index in 0..self.parameter_nodes.len() {
                    let parameter = self.parameter_nodes[index];
                    self.add_edge(PDGEdge {
                        from: self.enter,
                        to: parameter,
                        kind: PDGEdgeKind::Control {
                            true_dependence: true,
                        },
                    });
                }
            }
        }

        // Execution: from the fake enter to the first real node
        if self.options.build_execution_dependence {
            if let Some(cfg_enter) = cfg.enter_node() {
                let node = self.make_node(model, cfg_enter);
                self.all_nodes.insert(node);
                self.add_edge(PDGEdge {
                    from: self.enter,
                    to: node,
                    kind: PDGEdgeKind::Execution,
                });
            }
        }

        if self.options.build_data_dependence {
            // Materialize the whole def/use analysis up front
            model.def_variables(self.unit);
            model.use_variables(self.unit);

            // Parameters reach their uses from the CFG enter on
            if let Some(cfg_enter) = cfg.enter_node() {
                for index in 0..self.parameter_nodes.len() {
                    let parameter = self.parameter_nodes[index];
                    let name = self.parameter_name(model, parameter);
                    self.propagate_data(model, cfg_enter, parameter, &name);
                }
            }

            // And the fake enter feeds each parameter
            for index in 0..self.parameter_nodes.len() {
                let parameter = self.parameter_nodes[index];
                let name = self.parameter_name(model, parameter);
                self.add_edge(PDGEdge {
                    from: self.enter,
                    to: parameter,
                    kind: PDGEdgeKind::Data { variable: name },
                });
            }
        }

        // Dependences of every reachable node, then of dead code
        let mut visited = FxHashSet::default();
        if let Some(cfg_enter) = cfg.enter_node() {
            self.build_dependence(model, &cfg, cfg_enter, &mut visited);
        }

        for cfg_exit in cfg.exit_nodes() {
            let node = self.make_node(model, cfg_exit);
            self.all_nodes.insert(node);
            self.exit_nodes.insert(node);
        }

        if !cfg.is_empty() {
            let reachable = cfg.reachable_nodes(&self.cfg_factory);
            let unreachable: Vec<ElementId> = cfg
                .all_nodes()
                .difference(&reachable)
                .copied()
                .collect();
            if !unreachable.is_empty() {
                debug!(count = unreachable.len(), "dependences of unreachable nodes");
            }
            for node in unreachable {
                self.build_dependence(model, &cfg, node, &mut visited);
            }
        }

        self.cfg = Some(cfg);
    }

    fn parameter_name(&self, model: &SourceModel, parameter: ElementId) -> String {
        let pe = self.node_factory.pe_of(parameter);
        model
            .store()
            .element(pe)
            .variable_declaration()
            .expect("parameter node over a non variable declaration")
            .name
            .clone()
    }

    fn make_node(&self, model: &SourceModel, cfg_node: ElementId) -> ElementId {
        self.node_factory
            .make_node_from_cfg(model.store(), &self.cfg_factory, cfg_node)
    }

    fn add_edge(&self, edge: PDGEdge) {
        self.node_factory.add_edge(edge);
    }

    /// Emit all dependence edges rooted at the given CFG nodes (depth first)
    fn build_dependence(
        &mut self,
        model: &SourceModel,
        cfg: &ControlFlowGraph,
        start: ElementId,
        visited: &mut FxHashSet<ElementId>,
    ) {
        let mut worklist = vec![start];
        while let Some(cfg_node) = worklist.pop() {
            if !visited.insert(cfg_node) {
                continue;
            }
            let pdg_node = self.make_node(model, cfg_node);
            self.all_nodes.insert(pdg_node);
            let pe = self
                .cfg_factory
                .pe_of(cfg_node)
                .expect("CFG node without backing element");

            if self.options.build_data_dependence {
                for def in model.defs_at_least_may_def(pe) {
                    // The node itself is inspected too, so self-feeding
                    // assignments like `x = x + 1` get their loop edge
                    self.propagate_data(model, cfg_node, pdg_node, &def.main_name);
                    for next in self.cfg_factory.forward_nodes(cfg_node) {
                        self.propagate_data(model, next, pdg_node, &def.main_name);
                    }
                }
            }

            if self.options.build_control_dependence {
                if self.node_factory.node_kind(pdg_node) == PDGNodeKind::Control {
                    if let Some(block) = model.store().element(pe).owner_conditional_block {
                        self.emit_control_for_block(model, cfg, pdg_node, block);
                    }
                }
            }

            if self.options.build_execution_dependence {
                for next in self.cfg_factory.forward_nodes(cfg_node) {
                    let to = self.make_node(model, next);
                    self.all_nodes.insert(to);
                    self.add_edge(PDGEdge {
                        from: pdg_node,
                        to,
                        kind: PDGEdgeKind::Execution,
                    });
                }
            }

            for next in self.cfg_factory.forward_nodes(cfg_node).into_iter().rev() {
                if !visited.contains(&next) {
                    worklist.push(next);
                }
            }
        }
    }

    /// Reaching-definition propagation: walk forward from `start`, emitting
    /// a data edge into every node whose uses match `variable`, and stopping
    /// where a sufficiently certain definition kills the variable
    fn propagate_data(
        &mut self,
        model: &SourceModel,
        start: ElementId,
        from_pdg_node: ElementId,
        variable: &str,
    ) {
        let mut checked: FxHashSet<ElementId> = FxHashSet::default();
        let mut worklist = vec![start];
        while let Some(cfg_node) = worklist.pop() {
            if !checked.insert(cfg_node) {
                continue;
            }
            let pe = self
                .cfg_factory
                .pe_of(cfg_node)
                .expect("CFG node without backing element");

            let uses = model.uses_at_least_may_use(pe);
            let threshold = if self.options.treat_may_use_as_use {
                UseCertainty::MayUse
            } else {
                UseCertainty::Use
            };
            let should_add = uses
                .iter()
                .find(|use_| use_.matches_name(variable))
                .map(|use_| use_.certainty >= threshold)
                .unwrap_or(false);
            if should_add {
                let to = self.make_node(model, cfg_node);
                self.all_nodes.insert(to);
                self.add_edge(PDGEdge {
                    from: from_pdg_node,
                    to,
                    kind: PDGEdgeKind::Data {
                        variable: variable.to_string(),
                    },
                });
            }

            // A matching definition may kill the propagation: a sure Def
            // always does, a MayDef only when configured to
            let defs = model.defs_at_least_may_def(pe);
            let mut should_propagate = true;
            if let Some(def) = defs.iter().find(|def| def.matches_name(variable)) {
                if def.certainty.at_least_may_def() {
                    if self.options.treat_may_def_as_def {
                        should_propagate = false;
                    } else if def.certainty == DefCertainty::Def {
                        should_propagate = false;
                    }
                }
            }

            if should_propagate {
                for next in self.cfg_factory.forward_nodes(cfg_node).into_iter().rev() {
                    if !checked.contains(&next) {
                        worklist.push(next);
                    }
                }
            }
        }
    }

    /// Control edges from a conditional's control node into the block it
    /// governs: true for direct statements (and updaters), false for the
    /// else branch
    fn emit_control_for_block(
        &mut self,
        model: &SourceModel,
        cfg: &ControlFlowGraph,
        from: ElementId,
        block: ElementId,
    ) {
        let store = model.store();
        let statements = store.block_statements(block).to_vec();
        for statement in statements {
            self.emit_control_to_statement(model, cfg, from, statement, true);
        }

        if let Some(data) = store.element(block).statement() {
            let else_statements = data.else_statements.clone();
            let updaters = data.updaters.clone();
            for statement in else_statements {
                self.emit_control_to_statement(model, cfg, from, statement, false);
            }
            for updater in updaters {
                let to = self.node_factory.make_normal_node(store, updater);
                self.all_nodes.insert(to);
                self.add_edge(PDGEdge {
                    from,
                    to,
                    kind: PDGEdgeKind::Control {
                        true_dependence: true,
                    },
                });
            }
        }
    }

    fn emit_control_to_statement(
        &mut self,
        model: &SourceModel,
        cfg: &ControlFlowGraph,
        from: ElementId,
        statement: ElementId,
        label: bool,
    ) {
        let store = model.store();
        let Some(category) = store.element(statement).statement_category() else {
            return;
        };
        match category {
            StatementCategory::Catch
            | StatementCategory::Do
            | StatementCategory::For
            | StatementCategory::Foreach
            | StatementCategory::If
            | StatementCategory::SimpleBlock
            | StatementCategory::Synchronized
            | StatementCategory::Switch
            | StatementCategory::Try
            | StatementCategory::While => {
                let (condition, initializers) = {
                    let data = store.element(statement).statement().unwrap();
                    (data.condition, data.initializers.clone())
                };
                match condition {
                    Some(condition) => {
                        let to = self.node_factory.make_control_node(store, condition);
                        self.all_nodes.insert(to);
                        self.add_edge(PDGEdge {
                            from,
                            to,
                            kind: PDGEdgeKind::Control {
                                true_dependence: label,
                            },
                        });
                    }
                    // No own condition (e.g. a plain block): its children
                    // answer to the same control node
                    None => self.emit_control_for_block(model, cfg, from, statement),
                }
                for initializer in initializers {
                    let to = self.node_factory.make_normal_node(store, initializer);
                    self.all_nodes.insert(to);
                    self.add_edge(PDGEdge {
                        from,
                        to,
                        kind: PDGEdgeKind::Control {
                            true_dependence: label,
                        },
                    });
                }
            }
            StatementCategory::Assert
            | StatementCategory::Break
            | StatementCategory::Case
            | StatementCategory::Continue
            | StatementCategory::Expression
            | StatementCategory::Return
            | StatementCategory::Throw
            | StatementCategory::VariableDeclaration => {
                if self.cfg_factory.has_node(statement) && cfg.contains(statement) {
                    let to = self.node_factory.make_normal_node(store, statement);
                    self.all_nodes.insert(to);
                    self.add_edge(PDGEdge {
                        from,
                        to,
                        kind: PDGEdgeKind::Control {
                            true_dependence: label,
                        },
                    });
                }
            }
            _ => {}
        }
    }
}
