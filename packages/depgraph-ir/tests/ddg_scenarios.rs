//! End-to-end scenarios over the driver API: each source is a single class
//! holding one method; expected data edges are written as
//! `src line -> dst line [variable]`.

use depgraph_ir::features::flow_graph::domain::cfg::CFGNodeKind;
use depgraph_ir::features::pdg::domain::model::PDGEdgeKind;
use depgraph_ir::pipeline::driver::{AnalysisDriver, PdgResult};

/// Data edges of the first method as (from line, to line, variable)
fn data_edges(result: &PdgResult) -> Vec<(u32, u32, String)> {
    let pdg = &result.methods[0].pdg;
    pdg.all_edges()
        .into_iter()
        .filter_map(|edge| match &edge.kind {
            PDGEdgeKind::Data { variable } => Some((
                pdg.node_factory().span_of(edge.from).start_line,
                pdg.node_factory().span_of(edge.to).start_line,
                variable.clone(),
            )),
            _ => None,
        })
        .collect()
}

fn has_edge(edges: &[(u32, u32, String)], from: u32, to: u32, variable: &str) -> bool {
    edges
        .iter()
        .any(|(f, t, v)| *f == from && *t == to && v == variable)
}

#[test]
fn straight_line_assignment() {
    let source = "\
class C { int foo() {
int x = 1;
int y = x + 1;
return y;
} }";
    let driver = AnalysisDriver::new();
    let result = driver.get_ddg(source).unwrap();
    let edges = data_edges(&result);

    assert!(has_edge(&edges, 2, 3, "x"));
    assert!(has_edge(&edges, 3, 4, "y"));

    // a DDG carries no control or execution edges
    let pdg = &result.methods[0].pdg;
    assert!(pdg.all_edges().iter().all(|e| e.is_data()));
}

#[test]
fn if_then_else_with_kill() {
    let source = "\
class C { void foo(int a) {
int x = a;
if (a > 0) {
x = 1;
} else {
x = 2;
} print(x);
} }";
    let driver = AnalysisDriver::new();
    let result = driver.get_ddg(source).unwrap();
    let edges = data_edges(&result);

    // the parameter declared on line 1 reaches its uses
    assert!(has_edge(&edges, 1, 2, "a"));
    assert!(has_edge(&edges, 1, 3, "a"));
    // both branch definitions reach the print
    assert!(has_edge(&edges, 4, 7, "x"));
    assert!(has_edge(&edges, 6, 7, "x"));
    // the initial definition is killed on both branches
    assert!(!has_edge(&edges, 2, 7, "x"));
}

#[test]
fn while_loop_back_edges() {
    let source = "\
class C { int sum(int n) {
int s = 0; int i = 0;
while (i < n) {

s = s + i;
i = i + 1;
} return s;
} }";
    let driver = AnalysisDriver::new();
    let result = driver.get_ddg(source).unwrap();
    let edges = data_edges(&result);

    assert!(has_edge(&edges, 5, 5, "s"));
    assert!(has_edge(&edges, 6, 6, "i"));
    assert!(has_edge(&edges, 6, 3, "i"));
    assert!(has_edge(&edges, 5, 7, "s"));
}

#[test]
fn switch_with_fall_through_and_break() {
    let source = "\
class C { void f(int k) {
switch (k) {
case 1: a = 1; break;
case 2: a = 2;
default: a = 3;
} use(a);
} }";
    let driver = AnalysisDriver::new();

    // CFG shape: every case label gets a true edge from the condition, and
    // case 2 falls through into default
    let cfg_result = driver.get_cfg(source).unwrap();
    let entry = &cfg_result.methods[0];
    let store = cfg_result.model.store();

    let condition = entry.cfg.enter_node().unwrap();
    assert_eq!(entry.factory.node_kind(condition), CFGNodeKind::Control);

    let cases: Vec<_> = entry
        .cfg
        .all_nodes()
        .into_iter()
        .filter(|&n| entry.factory.node_kind(n) == CFGNodeKind::SwitchCase)
        .collect();
    assert_eq!(cases.len(), 3);
    for &case in &cases {
        assert!(entry
            .factory
            .backward_edges(case)
            .iter()
            .any(|e| e.from == condition && e.kind.control_label() == Some(true)));
    }

    let case2_assignment = entry
        .cfg
        .all_nodes()
        .into_iter()
        .find(|&n| {
            entry.factory.node_kind(n) == CFGNodeKind::Statement
                && store.element(n).text.contains("a = 2")
        })
        .unwrap();
    let fall_through = entry.factory.forward_nodes(case2_assignment);
    assert!(fall_through
        .iter()
        .any(|&n| entry.factory.node_kind(n) == CFGNodeKind::SwitchCase));

    // DDG: the break after case 1 jumps over the default, so that
    // definition reaches the use; the fall-through one is killed by default
    let ddg = driver.get_ddg(source).unwrap();
    let edges = data_edges(&ddg);
    assert!(edges.iter().any(|(f, t, v)| *f == 3 && *t == 6 && v.contains('a')));
    assert!(edges.iter().any(|(f, t, v)| *f == 5 && *t == 6 && v.contains('a')));
}

#[test]
fn labeled_break_exits_the_outer_loop() {
    let source = "\
class C { void f(boolean cond) {
outer: for (int i = 0; i < 10; i++) {
for (int j = 0; j < 10; j++) {
if (cond) {
break outer;
}
}
}
} }";
    let driver = AnalysisDriver::new();
    let result = driver.get_cfg(source).unwrap();
    let entry = &result.methods[0];

    let breaks: Vec<_> = entry
        .cfg
        .all_nodes()
        .into_iter()
        .filter(|&n| entry.factory.node_kind(n) == CFGNodeKind::Break)
        .collect();
    assert_eq!(breaks.len(), 1);

    // the labeled break bypasses the inner for: it is an exit of the outer
    // loop (and of the method), with no forward edge
    assert!(entry.cfg.exit_nodes().contains(&breaks[0]));
    assert!(entry.factory.forward_nodes(breaks[0]).is_empty());
}

#[test]
fn field_aliasing() {
    let source = "\
class C { int source;
void f() { int x = source;
source = x + 1; } }";
    let driver = AnalysisDriver::new();
    let result = driver.get_ddg(source).unwrap();
    let model = &result.model;
    let method = result.methods[0].method;

    // line 3 defines this.source with aliases {source, this.source}
    let defs = model.defs_at_least_may_def(method);
    let field_def = defs
        .iter()
        .find(|d| d.main_name == "this.source")
        .expect("field def present");
    assert!(field_def.matches_name("source"));
    assert!(field_def.matches_name("this.source"));

    // line 2 records a use of this.source
    let uses = model.uses_at_least_may_use(method);
    let field_use = uses
        .iter()
        .find(|u| u.main_name == "this.source")
        .expect("field use present");
    assert!(field_use.matches_name("source"));

    let edges = data_edges(&result);
    assert!(has_edge(&edges, 2, 3, "x"));
    // straight-line code: the later field def does not flow backwards
    assert!(!has_edge(&edges, 3, 2, "this.source"));
}

#[test]
fn ddg_json_document_end_to_end() {
    let source = "\
class C { int f(int a) {
int x = a;
x = x + 1;
return x;
} }";
    let driver = AnalysisDriver::new();
    let result = driver.get_ddg(source).unwrap();
    let document = result.to_def_use_json();

    let method = document.get("f#1").expect("method keyed by name#startLine");
    let x = method
        .variable_jsons
        .iter()
        .find(|v| v.name == "x")
        .expect("x entry");
    assert_eq!(
        x.def_stmt_line_numbers.iter().copied().collect::<Vec<_>>(),
        vec![2, 3]
    );
    assert_eq!(
        x.use_stmt_line_numbers.iter().copied().collect::<Vec<_>>(),
        vec![3, 4]
    );

    // the whole document serializes and round-trips
    let text = serde_json::to_string_pretty(&document).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(parsed.get("f#1").is_some());
}
