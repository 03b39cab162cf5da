/*
 * DDG JSON Model
 *
 * Flattens a method's data dependence view into variable entries: one entry
 * per (scope, name) pair, each carrying the statement lines that define and
 * use the variable. Ids follow first appearance while walking the PDG nodes
 * in node order, defs before uses per node.
 */

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::features::pdg::infrastructure::pdg::ProgramDependenceGraph;
use crate::features::program_element::application::source_model::SourceModel;
use crate::features::program_element::domain::scope::ScopeId;

/// Scope of a variable entry: the variant of the owning block element and
/// its first line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeJson {
    #[serde(rename = "type")]
    pub scope_type: String,
    pub line_number: u32,
}

/// One variable of a method
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableJson {
    pub id: u32,
    pub scope_json: Option<ScopeJson>,
    pub name: String,
    pub def_stmt_line_numbers: BTreeSet<u32>,
    pub use_stmt_line_numbers: BTreeSet<u32>,
    /// Merge key, not serialized
    #[serde(skip)]
    scope: Option<ScopeId>,
}

/// Def/use summary of one method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefUseJson {
    pub variable_jsons: Vec<VariableJson>,
}

impl DefUseJson {
    /// Collect variable entries from a built PDG. Entries merge by
    /// (scope, name); a def and a use of the same variable share one entry.
    pub fn from_pdg(model: &SourceModel, pdg: &ProgramDependenceGraph) -> Self {
        let mut variables: Vec<VariableJson> = Vec::new();
        let mut next_id = 0u32;

        for node in pdg.all_nodes_except_enter_and_params() {
            let pe = pdg.node_factory().pe_of(node);
            let statement_line = model.store().element(pe).span.start_line;

            for def in model.defs_at_least_may_def(pe) {
                Self::record(
                    &mut variables,
                    &mut next_id,
                    model,
                    def.scope,
                    &def.main_name,
                    statement_line,
                    true,
                );
            }
            for use_ in model.uses_at_least_may_use(pe) {
                Self::record(
                    &mut variables,
                    &mut next_id,
                    model,
                    use_.scope,
                    &use_.main_name,
                    statement_line,
                    false,
                );
            }
        }
        DefUseJson {
            variable_jsons: variables,
        }
    }

    fn record(
        variables: &mut Vec<VariableJson>,
        next_id: &mut u32,
        model: &SourceModel,
        scope: Option<ScopeId>,
        name: &str,
        line: u32,
        is_def: bool,
    ) {
        let position = variables
            .iter()
            .position(|v| v.scope == scope && v.name == name);
        let entry = match position {
            Some(position) => &mut variables[position],
            None => {
                let scope_json = scope.map(|scope| {
                    let block = model.scope_block(scope);
                    let element = model.store().element(block);
                    ScopeJson {
                        scope_type: element.kind.variant_name().to_string(),
                        line_number: element.span.start_line,
                    }
                });
                variables.push(VariableJson {
                    id: *next_id,
                    scope_json,
                    name: name.to_string(),
                    def_stmt_line_numbers: BTreeSet::new(),
                    use_stmt_line_numbers: BTreeSet::new(),
                    scope,
                });
                *next_id += 1;
                variables.last_mut().unwrap()
            }
        };
        if is_def {
            entry.def_stmt_line_numbers.insert(line);
        } else {
            entry.use_stmt_line_numbers.insert(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lowering::lower_compilation_unit;
    use crate::features::pdg::domain::model::PdgOptions;
    use crate::features::program_element::infrastructure::def_use::DefUseConfig;

    fn def_use_json(source: &str) -> DefUseJson {
        let model = lower_compilation_unit(source, DefUseConfig::default()).unwrap();
        let method = model.methods()[0];
        let mut pdg = ProgramDependenceGraph::new(&model, method, PdgOptions::ddg());
        pdg.build(&model);
        DefUseJson::from_pdg(&model, &pdg)
    }

    #[test]
    fn test_variables_merge_by_scope_and_name() {
        let json = def_use_json(
            "class C { int f() {\nint x = 1;\nx = x + 1;\nreturn x;\n} }",
        );
        let x: Vec<&VariableJson> = json
            .variable_jsons
            .iter()
            .filter(|v| v.name == "x")
            .collect();
        assert_eq!(x.len(), 1, "one entry per (scope, name)");
        assert_eq!(
            x[0].def_stmt_line_numbers,
            BTreeSet::from([2, 3])
        );
        assert_eq!(
            x[0].use_stmt_line_numbers,
            BTreeSet::from([3, 4])
        );
        assert!(x[0].scope_json.is_some());
    }

    #[test]
    fn test_field_variable_has_no_scope() {
        let json = def_use_json(
            "class C { int source;\nvoid f() {\nsource = 1;\n} }",
        );
        let field = json
            .variable_jsons
            .iter()
            .find(|v| v.name == "this.source")
            .expect("field entry present");
        assert!(field.scope_json.is_none());
        assert_eq!(field.def_stmt_line_numbers, BTreeSet::from([3]));
    }

    #[test]
    fn test_ids_follow_first_appearance() {
        let json = def_use_json(
            "class C { void f() {\nint a = 1;\nint b = a;\n} }",
        );
        let ids: Vec<u32> = json.variable_jsons.iter().map(|v| v.id).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort_unstable();
            s
        };
        assert_eq!(ids, sorted);
        assert_eq!(ids.first(), Some(&0));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = def_use_json("class C { void f() {\nint a = 1;\n} }");
        let text = serde_json::to_string(&json).unwrap();
        assert!(text.contains("variableJsons"));
        assert!(text.contains("defStmtLineNumbers"));
        assert!(text.contains("useStmtLineNumbers"));
        assert!(text.contains("scopeJson"));
    }
}
