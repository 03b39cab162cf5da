/*
 * Java CST -> Program Element Lowering
 *
 * Single pass over the tree-sitter-java CST. Supported node kinds get a
 * dedicated handler; everything else descends generically into its children,
 * which is exactly the situation the work stack's safe-pop contract covers:
 * a handler remembers the stack size before visiting a child and reclaims
 * the child's result only when that child pushed exactly one element of the
 * expected variant.
 *
 * Statement handlers only attach themselves when the current top of stack is
 * a block-leading element; statements synthesized inside unsupported
 * contexts are suppressed.
 */

use tracing::debug;
use tree_sitter::{Node, Parser};

use crate::errors::{DepgraphError, Result};
use crate::features::program_element::application::source_model::SourceModel;
use crate::features::program_element::domain::element::{
    ClassData, ElementKind, ElementStore, ExpressionCategory, ExpressionData, MethodData,
    ProgramElement, StatementCategory, StatementData, VariableCategory, VariableDeclarationData,
};
use crate::features::program_element::infrastructure::def_use::DefUseConfig;
use crate::shared::models::{ElementId, LineSpan};

use super::work_stack::{ExpectedKind, WorkStack};

/// Parse a compilation unit and lower it into a source model
pub fn lower_compilation_unit(source: &str, config: DefUseConfig) -> Result<SourceModel> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| DepgraphError::Parse(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DepgraphError::parse("parser returned no tree"))?;

    let mut lowering = JavaLowering::new(source);
    lowering.visit(tree.root_node());
    let JavaLowering { store, methods, .. } = lowering;
    Ok(SourceModel::new(store, methods, config))
}

struct JavaLowering<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
    store: ElementStore,
    stack: WorkStack,
    methods: Vec<ElementId>,
}

impl<'a> JavaLowering<'a> {
    fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0usize];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            source,
            line_starts,
            store: ElementStore::new(),
            stack: WorkStack::new(),
            methods: Vec::new(),
        }
    }

    // ------------------------- location helpers -------------------------

    fn line_of_byte(&self, byte: usize) -> u32 {
        self.line_starts.partition_point(|&start| start <= byte) as u32
    }

    fn start_line(&self, node: Node) -> u32 {
        node.start_position().row as u32 + 1
    }

    /// End line; for `if` the then-branch end, for `try` the body end
    fn end_line(&self, node: Node) -> u32 {
        match node.kind() {
            "if_statement" => {
                if let Some(alternative) = node.child_by_field_name("alternative") {
                    self.line_of_byte(alternative.start_byte().saturating_sub(1))
                } else {
                    node.end_position().row as u32 + 1
                }
            }
            "try_statement" | "try_with_resources_statement" => {
                let first_catch = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "catch_clause");
                let finally = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "finally_clause");
                if let Some(stop) = first_catch.or(finally) {
                    self.line_of_byte(stop.start_byte().saturating_sub(1))
                } else {
                    node.end_position().row as u32 + 1
                }
            }
            _ => node.end_position().row as u32 + 1,
        }
    }

    fn span_of(&self, node: Node) -> LineSpan {
        LineSpan::new(self.start_line(node), self.end_line(node))
    }

    fn text_of(&self, node: Node) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or_default()
            .to_string()
    }

    // ------------------------- store helpers -------------------------

    fn make_expression(&mut self, category: ExpressionCategory, span: LineSpan) -> ElementId {
        self.store.insert(ProgramElement::new(
            ElementKind::Expression(ExpressionData::new(category)),
            span,
        ))
    }

    fn make_statement(
        &mut self,
        category: StatementCategory,
        owner: ElementId,
        span: LineSpan,
    ) -> ElementId {
        self.store.insert(ProgramElement::new(
            ElementKind::Statement(StatementData::new(category, Some(owner))),
            span,
        ))
    }

    fn make_operator(&mut self, token: &str, span: LineSpan) -> ElementId {
        let mut element = ProgramElement::new(ElementKind::Operator(token.to_string()), span);
        element.text = token.to_string();
        self.store.insert(element)
    }

    fn make_type(&mut self, name: &str, span: LineSpan) -> ElementId {
        let mut element = ProgramElement::new(ElementKind::Type, span);
        element.text = name.to_string();
        self.store.insert(element)
    }

    fn set_text(&mut self, id: ElementId, text: String) {
        self.store.element_mut(id).text = text;
    }

    fn element_text(&self, id: ElementId) -> String {
        self.store.element(id).text.clone()
    }

    fn add_expression(&mut self, parent: ElementId, child: ElementId) {
        match &mut self.store.element_mut(parent).kind {
            ElementKind::Expression(data) => data.expressions.push(child),
            ElementKind::Statement(data) => data.expressions.push(child),
            _ => panic!("add_expression on a non-expression parent"),
        }
    }

    fn add_statement(&mut self, parent: ElementId, child: ElementId) {
        match &mut self.store.element_mut(parent).kind {
            ElementKind::Statement(data) => data.statements.push(child),
            ElementKind::Method(data) => data.statements.push(child),
            _ => panic!("add_statement on a non-block parent"),
        }
    }

    fn add_initializer(&mut self, stmt: ElementId, initializer: ElementId) {
        self.store
            .element_mut(stmt)
            .statement_mut()
            .expect("initializer on a non-statement")
            .initializers
            .push(initializer);
    }

    fn add_updater(&mut self, stmt: ElementId, updater: ElementId) {
        self.store
            .element_mut(stmt)
            .statement_mut()
            .expect("updater on a non-statement")
            .updaters
            .push(updater);
    }

    fn set_condition(&mut self, stmt: ElementId, condition: ElementId) {
        self.store
            .element_mut(stmt)
            .statement_mut()
            .expect("condition on a non-statement")
            .condition = Some(condition);
        self.store.element_mut(condition).owner_conditional_block = Some(stmt);
    }

    /// Top of stack when it can own statements
    fn owner_block(&self) -> Option<ElementId> {
        let top = self.stack.peek()?;
        if self.store.element(top).is_block_owner() {
            Some(top)
        } else {
            None
        }
    }

    fn visit_and_pop(
        &mut self,
        node: Option<Node>,
        mark: usize,
        expected: ExpectedKind,
    ) -> Option<ElementId> {
        let node = node?;
        self.visit(node);
        self.stack.pop(mark, expected, &self.store)
    }

    // ------------------------- dispatch -------------------------

    fn visit(&mut self, node: Node) {
        match node.kind() {
            "class_declaration" | "interface_declaration" => self.visit_class(node),
            "method_declaration" | "constructor_declaration" => self.visit_method(node),
            "lambda_expression" => self.visit_lambda(node),

            "block" | "constructor_body" => self.visit_block(node),
            "expression_statement" => self.visit_expression_statement(node),
            "local_variable_declaration" => self.visit_local_variable_declaration(node),
            "if_statement" => self.visit_if(node),
            "while_statement" => self.visit_while(node),
            "do_statement" => self.visit_do(node),
            "for_statement" => self.visit_for(node),
            "enhanced_for_statement" => self.visit_foreach(node),
            "switch_expression" | "switch_statement" => self.visit_switch(node),
            "switch_label" => self.visit_switch_label(node),
            "try_statement" | "try_with_resources_statement" => self.visit_try(node),
            "catch_clause" => self.visit_catch(node),
            "synchronized_statement" => self.visit_synchronized(node),
            "labeled_statement" => self.visit_labeled(node),
            "break_statement" => self.visit_jump(node, StatementCategory::Break, "break"),
            "continue_statement" => self.visit_jump(node, StatementCategory::Continue, "continue"),
            "return_statement" => self.visit_return(node),
            "throw_statement" => self.visit_throw(node),
            "assert_statement" => self.visit_assert(node),

            "variable_declarator" => self.visit_variable_declarator(node),
            "formal_parameter" | "spread_parameter" => self.visit_formal_parameter(node),
            "assignment_expression" => self.visit_assignment(node),
            "binary_expression" => self.visit_infix(node),
            "instanceof_expression" => self.visit_instanceof(node),
            "unary_expression" => self.visit_prefix(node),
            "update_expression" => self.visit_update(node),
            "ternary_expression" => self.visit_trinomial(node),
            "cast_expression" => self.visit_cast(node),
            "parenthesized_expression" => self.visit_parenthesized(node),
            "method_invocation" => self.visit_method_invocation(node),
            "object_creation_expression" => self.visit_class_instance_creation(node),
            "explicit_constructor_invocation" => self.visit_constructor_invocation(node),
            "field_access" => self.visit_field_access(node),
            "scoped_identifier" => self.visit_qualified_name(node),
            "array_access" => self.visit_array_access(node),
            "array_creation_expression" => self.visit_array_creation(node),
            "array_initializer" => self.visit_array_initializer(node),
            "array_type" => self.visit_array_type(node),

            "identifier" => self.visit_leaf_with_text(node, ExpressionCategory::SimpleName),
            "this" => self.visit_leaf_with_text(node, ExpressionCategory::This),
            "null_literal" => self.visit_leaf_with_text(node, ExpressionCategory::Null),
            "true" | "false" => self.visit_leaf_with_text(node, ExpressionCategory::Boolean),
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
            | "decimal_floating_point_literal"
            | "hex_floating_point_literal" => {
                self.visit_leaf_with_text(node, ExpressionCategory::Number)
            }
            "string_literal" => self.visit_leaf_with_text(node, ExpressionCategory::String),
            "character_literal" => self.visit_leaf_with_text(node, ExpressionCategory::Character),
            "class_literal" => self.visit_leaf_with_text(node, ExpressionCategory::TypeLiteral),

            _ => {
                // Unsupported category: descend generically. Whatever the
                // children push is absorbed by the enclosing safe pops.
                for index in 0..node.child_count() {
                    if let Some(child) = node.child(index) {
                        self.visit(child);
                    }
                }
            }
        }
    }

    // ------------------------- classes & methods -------------------------

    fn visit_class(&mut self, node: Node) {
        // A class declaration in statement position lowers into a
        // TypeDeclaration statement wrapping the class element
        if let Some(owner) = self.owner_block() {
            let span = self.span_of(node);
            let stmt = self.make_statement(StatementCategory::TypeDeclaration, owner, span);
            let mark = self.stack.push(stmt);
            self.lower_class(node);
            if let Some(class) = self.stack.pop(mark, ExpectedKind::Class, &self.store) {
                self.add_expression(stmt, class);
                let text = self.element_text(class);
                self.set_text(stmt, text);
            }
        } else {
            self.lower_class(node);
        }
    }

    fn lower_class(&mut self, node: Node) {
        let span = self.span_of(node);
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let class = self.store.insert(ProgramElement::new(
            ElementKind::Class(ClassData {
                name: Some(name.clone()),
                methods: Vec::new(),
            }),
            span,
        ));
        let mark = self.stack.push(class);

        let mut text = format!("class {name}{{\n");
        if let Some(body) = node.child_by_field_name("body") {
            for child in named_children(body) {
                if matches!(
                    child.kind(),
                    "method_declaration" | "constructor_declaration"
                ) {
                    if let Some(method) =
                        self.visit_and_pop(Some(child), mark, ExpectedKind::Method)
                    {
                        self.methods.push(method);
                        match &mut self.store.element_mut(class).kind {
                            ElementKind::Class(data) => data.methods.push(method),
                            _ => unreachable!(),
                        }
                        text.push_str(&self.element_text(method));
                        text.push('\n');
                    }
                }
            }
        }
        text.push('}');
        self.set_text(class, text);
    }

    fn lower_anonymous_class(&mut self, body: Node) -> ElementId {
        let span = self.span_of(body);
        let class = self.store.insert(ProgramElement::new(
            ElementKind::Class(ClassData {
                name: None,
                methods: Vec::new(),
            }),
            span,
        ));
        let mark = self.stack.push(class);

        let mut text = String::from("{\n");
        for child in named_children(body) {
            if child.kind() == "method_declaration" {
                if let Some(method) = self.visit_and_pop(Some(child), mark, ExpectedKind::Method) {
                    match &mut self.store.element_mut(class).kind {
                        ElementKind::Class(data) => data.methods.push(method),
                        _ => unreachable!(),
                    }
                    text.push_str(&self.element_text(method));
                }
            }
        }
        text.push('}');
        self.set_text(class, text);
        // Leave the class on the stack for the caller's pop
        class
    }

    fn visit_method(&mut self, node: Node) {
        let span = self.span_of(node);
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let method = self.store.insert(ProgramElement::new(
            ElementKind::Method(MethodData::new(Some(name.clone()), false)),
            span,
        ));
        let mark = self.stack.push(method);

        let mut text = String::new();
        if let Some(modifiers) = child_of_kind(node, "modifiers") {
            for index in 0..modifiers.child_count() {
                if let Some(modifier) = modifiers.child(index) {
                    let token = self.text_of(modifier);
                    self.store.element_mut(method).modifiers.push(token.clone());
                    text.push_str(&token);
                    text.push(' ');
                }
            }
        }
        if let Some(return_type) = node.child_by_field_name("type") {
            text.push_str(&self.text_of(return_type));
            text.push(' ');
        }
        text.push_str(&name);
        text.push_str(" (");

        if let Some(parameters) = node.child_by_field_name("parameters") {
            for parameter in named_children(parameters) {
                if !matches!(parameter.kind(), "formal_parameter" | "spread_parameter") {
                    continue;
                }
                if let Some(param) =
                    self.visit_and_pop(Some(parameter), mark, ExpectedKind::VariableDeclaration)
                {
                    if let ElementKind::VariableDeclaration(data) =
                        &mut self.store.element_mut(param).kind
                    {
                        data.category = VariableCategory::Parameter;
                    }
                    match &mut self.store.element_mut(method).kind {
                        ElementKind::Method(data) => data.parameters.push(param),
                        _ => unreachable!(),
                    }
                    text.push_str(&self.element_text(param));
                    text.push(',');
                }
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push_str(") ");

        if let Some(body) = node.child_by_field_name("body") {
            if let Some(body) = self.visit_and_pop(Some(body), mark, ExpectedKind::Statement) {
                self.store.set_block_body(method, body);
                text.push_str(&self.element_text(body));
            }
        }
        self.set_text(method, text);
    }

    fn visit_lambda(&mut self, node: Node) {
        let span = self.span_of(node);
        let method = self.store.insert(ProgramElement::new(
            ElementKind::Method(MethodData::new(None, true)),
            span,
        ));
        let mark = self.stack.push(method);

        let mut text = String::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            text.push_str(&self.text_of(parameters));
        }
        text.push_str(" -> ");

        if let Some(body) = node.child_by_field_name("body") {
            match self.visit_and_pop(Some(body), mark, ExpectedKind::Any) {
                Some(result) => {
                    let is_statement =
                        matches!(self.store.element(result).kind, ElementKind::Statement(_));
                    let is_expression =
                        matches!(self.store.element(result).kind, ElementKind::Expression(_));
                    if is_statement {
                        self.store.set_block_body(method, result);
                    } else if is_expression {
                        match &mut self.store.element_mut(method).kind {
                            ElementKind::Method(data) => data.lambda_expression = Some(result),
                            _ => unreachable!(),
                        }
                    } else {
                        debug!("lambda body lowered to an unexpected element");
                    }
                    text.push_str(&self.element_text(result));
                }
                None => text.push_str("{}"),
            }
        } else {
            text.push_str("{}");
        }
        self.set_text(method, text);
    }

    // ------------------------- statements -------------------------

    fn visit_block(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let block = self.make_statement(StatementCategory::SimpleBlock, owner, span);
        let mark = self.stack.push(block);

        let mut text = String::from("{\n");
        for index in 0..node.child_count() {
            let Some(child) = node.child(index) else {
                continue;
            };
            if child.kind() == ";" {
                // Bare empty statement
                let span = self.span_of(child);
                let empty = self.make_statement(StatementCategory::Empty, block, span);
                self.set_text(empty, ";".to_string());
                self.add_statement(block, empty);
                text.push_str(";\n");
                continue;
            }
            if !child.is_named() || child.kind().ends_with("comment") {
                continue;
            }
            if let Some(statement) = self.visit_and_pop(Some(child), mark, ExpectedKind::Statement)
            {
                self.add_statement(block, statement);
                text.push_str(&self.element_text(statement));
                text.push('\n');
            }
        }
        text.push('}');
        self.set_text(block, text);
    }

    fn visit_expression_statement(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Expression, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::new();
        if let Some(expression) =
            self.visit_and_pop(first_named(node), mark, ExpectedKind::Any)
        {
            self.add_expression(stmt, expression);
            text.push_str(&self.element_text(expression));
            text.push(';');
        }
        self.set_text(stmt, text);
    }

    fn visit_local_variable_declaration(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::VariableDeclaration, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::new();
        if let Some(modifiers) = child_of_kind(node, "modifiers") {
            text.push_str(&self.text_of(modifiers));
            text.push(' ');
        }

        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let type_element = self.make_type(&type_text, span);
        self.add_expression(stmt, type_element);
        text.push_str(&type_text);
        text.push(' ');

        for declarator in children_by_field(node, "declarator") {
            if let Some(fragment) =
                self.visit_and_pop(Some(declarator), mark, ExpectedKind::Any)
            {
                self.add_expression(stmt, fragment);
                text.push_str(&self.element_text(fragment));
                text.push(',');
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push(';');
        self.set_text(stmt, text);
    }

    fn visit_variable_declarator(&mut self, node: Node) {
        let span = self.span_of(node);
        let fragment = self.make_expression(ExpressionCategory::VariableDeclarationFragment, span);
        let mark = self.stack.push(fragment);

        let mut text = String::new();
        if let Some(name) =
            self.visit_and_pop(node.child_by_field_name("name"), mark, ExpectedKind::Any)
        {
            self.add_expression(fragment, name);
            text.push_str(&self.element_text(name));
        }
        if let Some(value) =
            self.visit_and_pop(node.child_by_field_name("value"), mark, ExpectedKind::Any)
        {
            self.add_expression(fragment, value);
            text.push_str(" = ");
            text.push_str(&self.element_text(value));
        }
        self.set_text(fragment, text);
    }

    /// `int i = 0` in for-initializer position lowers as an expression
    fn lower_variable_declaration_expression(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::VariableDeclarationExpression, span);
        let mark = self.stack.push(expr);

        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let type_element = self.make_type(&type_text, span);
        self.add_expression(expr, type_element);

        let mut text = format!("{type_text} ");
        for declarator in children_by_field(node, "declarator") {
            if let Some(fragment) =
                self.visit_and_pop(Some(declarator), mark, ExpectedKind::Any)
            {
                self.add_expression(expr, fragment);
                text.push_str(&self.element_text(fragment));
            }
        }
        self.set_text(expr, text);
    }

    fn visit_if(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::If, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("if (");
        let condition = unwrap_parens(node.child_by_field_name("condition"));
        if let Some(condition) = self.visit_and_pop(condition, mark, ExpectedKind::Any) {
            self.set_condition(stmt, condition);
            let condition_text = self.element_text(condition);
            text.push_str(&condition_text);
            self.set_text(condition, format!("if {condition_text}"));
        }
        text.push_str(") ");

        if let Some(then_body) =
            self.visit_and_pop(node.child_by_field_name("consequence"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, then_body);
            text.push_str(&self.element_text(then_body));
        }

        if let Some(else_body) =
            self.visit_and_pop(node.child_by_field_name("alternative"), mark, ExpectedKind::Statement)
        {
            self.store.set_else_body(stmt, else_body);
            text.push_str(&self.element_text(else_body));
        }
        self.set_text(stmt, text);
    }

    fn visit_while(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::While, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("while (");
        let condition = unwrap_parens(node.child_by_field_name("condition"));
        if let Some(condition) = self.visit_and_pop(condition, mark, ExpectedKind::Any) {
            self.set_condition(stmt, condition);
            let condition_text = self.element_text(condition);
            text.push_str(&condition_text);
            self.set_text(condition, format!("while {condition_text}"));
        }
        text.push_str(") ");

        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }
        self.set_text(stmt, text);
    }

    fn visit_do(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Do, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("do ");
        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }

        let condition = unwrap_parens(node.child_by_field_name("condition"));
        if let Some(condition) = self.visit_and_pop(condition, mark, ExpectedKind::Any) {
            self.set_condition(stmt, condition);
            text.push_str("while (");
            text.push_str(&self.element_text(condition));
            text.push_str(");");
        }
        self.set_text(stmt, text);
    }

    fn visit_for(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::For, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("for (");
        for init in children_by_field(node, "init") {
            let initializer = if init.kind() == "local_variable_declaration" {
                self.lower_variable_declaration_expression(init);
                self.stack.pop(mark, ExpectedKind::Expression, &self.store)
            } else {
                self.visit_and_pop(Some(init), mark, ExpectedKind::Expression)
            };
            if let Some(initializer) = initializer {
                self.add_initializer(stmt, initializer);
                text.push_str(&self.element_text(initializer));
                text.push(',');
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push_str("; ");

        if let Some(condition) =
            self.visit_and_pop(node.child_by_field_name("condition"), mark, ExpectedKind::Any)
        {
            self.set_condition(stmt, condition);
            text.push_str(&self.element_text(condition));
        }
        text.push_str("; ");

        for update in children_by_field(node, "update") {
            if let Some(updater) = self.visit_and_pop(Some(update), mark, ExpectedKind::Expression)
            {
                self.add_updater(stmt, updater);
                text.push_str(&self.element_text(updater));
                text.push(',');
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push(')');

        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }
        self.set_text(stmt, text);
    }

    fn visit_foreach(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let mark = self.stack.len();

        let mut text = String::from("for (");

        // Loop variable: lowered directly as a local variable declaration
        let span = self.span_of(node);
        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let name_text = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let parameter = self.store.insert(ProgramElement::new(
            ElementKind::VariableDeclaration(VariableDeclarationData {
                category: VariableCategory::Local,
                type_name: type_text.clone(),
                name: name_text.clone(),
            }),
            span,
        ));
        self.set_text(parameter, format!("{type_text} {name_text}"));
        text.push_str(&format!("{type_text} {name_text} : "));

        let value = self.visit_and_pop(node.child_by_field_name("value"), mark, ExpectedKind::Any);
        if let Some(value) = value {
            text.push_str(&self.element_text(value));
        }
        text.push(')');

        let stmt = self.make_statement(StatementCategory::Foreach, owner, span);
        self.add_initializer(stmt, parameter);
        if let Some(value) = value {
            self.add_initializer(stmt, value);
        }
        let mark = self.stack.push(stmt);

        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }
        self.set_text(stmt, text);
    }

    fn visit_switch(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Switch, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("switch (");
        let condition = unwrap_parens(node.child_by_field_name("condition"));
        if let Some(condition) = self.visit_and_pop(condition, mark, ExpectedKind::Any) {
            self.set_condition(stmt, condition);
            text.push_str(&self.element_text(condition));
        }
        text.push_str(") {\n");

        if let Some(body) = node.child_by_field_name("body") {
            for group in named_children(body) {
                match group.kind() {
                    // Traditional `case X:` groups: label and statements are
                    // flattened into direct children of the switch
                    "switch_block_statement_group" => {
                        for child in named_children(group) {
                            if let Some(statement) =
                                self.visit_and_pop(Some(child), mark, ExpectedKind::Statement)
                            {
                                self.add_statement(stmt, statement);
                                text.push_str(&self.element_text(statement));
                                text.push('\n');
                            }
                        }
                    }
                    // Arrow rules: the label and the rule body each become a
                    // direct child
                    "switch_rule" => {
                        for child in named_children(group) {
                            if let Some(statement) =
                                self.visit_and_pop(Some(child), mark, ExpectedKind::Statement)
                            {
                                self.add_statement(stmt, statement);
                                text.push_str(&self.element_text(statement));
                                text.push('\n');
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        text.push('}');
        self.set_text(stmt, text);
    }

    fn visit_switch_label(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Case, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::new();
        let is_default = node
            .child(0)
            .map(|c| c.kind() == "default")
            .unwrap_or(false);
        if is_default {
            text.push_str("default");
        } else {
            for child in named_children(node) {
                if let Some(expression) =
                    self.visit_and_pop(Some(child), mark, ExpectedKind::Any)
                {
                    self.add_expression(stmt, expression);
                    text.push_str("case ");
                    text.push_str(&self.element_text(expression));
                }
            }
        }
        text.push(':');
        self.set_text(stmt, text);
    }

    fn visit_try(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Try, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("try ");
        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }

        for child in named_children(node) {
            if child.kind() != "catch_clause" {
                continue;
            }
            if let Some(catch) = self.visit_and_pop(Some(child), mark, ExpectedKind::Statement) {
                match &mut self.store.element_mut(stmt).kind {
                    ElementKind::Statement(data) => data.catch_statements.push(catch),
                    _ => unreachable!(),
                }
                text.push_str(&self.element_text(catch));
            }
        }

        if let Some(finally) = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "finally_clause")
        {
            let block = named_children(finally)
                .into_iter()
                .find(|c| c.kind() == "block");
            if let Some(finally_block) =
                self.visit_and_pop(block, mark, ExpectedKind::Statement)
            {
                match &mut self.store.element_mut(stmt).kind {
                    ElementKind::Statement(data) => {
                        data.finally_statement = Some(finally_block)
                    }
                    _ => unreachable!(),
                }
                text.push_str(&self.element_text(finally_block));
            }
        }
        self.set_text(stmt, text);
    }

    fn visit_catch(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Catch, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("catch (");
        let parameter = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "catch_formal_parameter");
        if let Some(parameter) = parameter {
            self.lower_catch_parameter(parameter);
            if let Some(exception) =
                self.stack
                    .pop(mark, ExpectedKind::VariableDeclaration, &self.store)
            {
                self.set_condition(stmt, exception);
                text.push_str(&self.element_text(exception));
            }
        }
        text.push_str(") ");

        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }
        self.set_text(stmt, text);
    }

    fn lower_catch_parameter(&mut self, node: Node) {
        let span = self.span_of(node);
        let type_text = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "catch_type")
            .map(|c| self.text_of(c))
            .unwrap_or_default();
        let name = node
            .child_by_field_name("name")
            .or_else(|| {
                named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "identifier")
            })
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let vd = self.store.insert(ProgramElement::new(
            ElementKind::VariableDeclaration(VariableDeclarationData {
                category: VariableCategory::Local,
                type_name: type_text.clone(),
                name: name.clone(),
            }),
            span,
        ));
        self.set_text(vd, format!("catch ( {type_text} {name} )"));
        self.stack.push(vd);
    }

    fn visit_formal_parameter(&mut self, node: Node) {
        let span = self.span_of(node);
        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let vd = self.store.insert(ProgramElement::new(
            ElementKind::VariableDeclaration(VariableDeclarationData {
                category: VariableCategory::Local,
                type_name: type_text.clone(),
                name: name.clone(),
            }),
            span,
        ));
        let mut text = String::new();
        if let Some(modifiers) = child_of_kind(node, "modifiers") {
            let modifier_text = self.text_of(modifiers);
            self.store
                .element_mut(vd)
                .modifiers
                .push(modifier_text.clone());
            text.push_str(&modifier_text);
            text.push(' ');
        }
        text.push_str(&format!("{type_text} {name}"));
        self.set_text(vd, text);
        self.stack.push(vd);
    }

    fn visit_synchronized(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Synchronized, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("synchronized (");
        let condition = unwrap_parens(child_of_kind(node, "parenthesized_expression"));
        if let Some(condition) = self.visit_and_pop(condition, mark, ExpectedKind::Any) {
            self.set_condition(stmt, condition);
            text.push_str(&self.element_text(condition));
        }
        text.push_str(") ");

        if let Some(body) =
            self.visit_and_pop(node.child_by_field_name("body"), mark, ExpectedKind::Statement)
        {
            self.store.set_block_body(stmt, body);
            text.push_str(&self.element_text(body));
        }
        self.set_text(stmt, text);
    }

    fn visit_labeled(&mut self, node: Node) {
        let children = named_children(node);
        let label = children
            .iter()
            .find(|c| c.kind() == "identifier")
            .map(|c| self.text_of(*c));
        let Some(body) = children.iter().find(|c| c.kind() != "identifier") else {
            return;
        };
        self.visit(*body);
        // The labeled inner statement is the one left on the stack
        if let (Some(top), Some(label)) = (self.stack.peek(), label) {
            if let Some(statement) = self.store.element_mut(top).statement_mut() {
                statement.label = Some(label);
            }
        }
    }

    fn visit_jump(&mut self, node: Node, category: StatementCategory, keyword: &str) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(category, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from(keyword);
        let label = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "identifier");
        if let Some(label) = self.visit_and_pop(label, mark, ExpectedKind::Any) {
            self.add_expression(stmt, label);
            text.push(' ');
            text.push_str(&self.element_text(label));
        }
        text.push(';');
        self.set_text(stmt, text);
    }

    fn visit_return(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Return, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("return");
        if let Some(expression) = self.visit_and_pop(first_named(node), mark, ExpectedKind::Any) {
            self.add_expression(stmt, expression);
            text.push(' ');
            text.push_str(&self.element_text(expression));
        }
        text.push(';');
        self.set_text(stmt, text);
    }

    fn visit_throw(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let stmt = self.make_statement(StatementCategory::Throw, owner, span);
        let mark = self.stack.push(stmt);

        let mut text = String::from("throw ");
        if let Some(expression) = self.visit_and_pop(first_named(node), mark, ExpectedKind::Any) {
            self.add_expression(stmt, expression);
            text.push_str(&self.element_text(expression));
        }
        text.push(';');
        self.set_text(stmt, text);
    }

    fn visit_assert(&mut self, node: Node) {
        let Some(owner) = self.owner_block() else {
            return;
        };
        let span = self.span_of(node);
        let mark = self.stack.len();

        let children = named_children(node);
        let expression = self.visit_and_pop(children.first().copied(), mark, ExpectedKind::Any);
        let message = self.visit_and_pop(children.get(1).copied(), mark, ExpectedKind::Any);

        let stmt = self.make_statement(StatementCategory::Assert, owner, span);
        let mut text = String::from("assert ");
        if let Some(expression) = expression {
            self.add_expression(stmt, expression);
            text.push_str(&self.element_text(expression));
        }
        if let Some(message) = message {
            self.add_expression(stmt, message);
            text.push_str(" : ");
            text.push_str(&self.element_text(message));
        }
        text.push(';');
        self.set_text(stmt, text);
        self.stack.push(stmt);
    }

    // ------------------------- expressions -------------------------

    fn visit_leaf_with_text(&mut self, node: Node, category: ExpressionCategory) {
        let span = self.span_of(node);
        let expr = self.make_expression(category, span);
        let text = self.text_of(node);
        self.set_text(expr, text);
        self.stack.push(expr);
    }

    fn visit_assignment(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Assignment, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        if let Some(left) =
            self.visit_and_pop(node.child_by_field_name("left"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, left);
            text.push_str(&self.element_text(left));
        }

        let operator_token = node
            .child_by_field_name("operator")
            .map(|o| self.text_of(o))
            .unwrap_or_else(|| "=".to_string());
        let operator = self.make_operator(&operator_token, span);
        self.add_expression(expr, operator);
        text.push_str(&format!(" {operator_token} "));

        if let Some(right) =
            self.visit_and_pop(node.child_by_field_name("right"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, right);
            text.push_str(&self.element_text(right));
        }
        self.set_text(expr, text);
    }

    fn visit_infix(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Infix, span);
        let mark = self.stack.push(expr);

        let mut text = String::from(" ( ");
        if let Some(left) =
            self.visit_and_pop(node.child_by_field_name("left"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, left);
            text.push_str(&self.element_text(left));
            text.push(' ');
        }

        let operator_token = node
            .child_by_field_name("operator")
            .map(|o| self.text_of(o))
            .unwrap_or_default();
        let operator = self.make_operator(&operator_token, span);
        self.add_expression(expr, operator);
        text.push_str(&operator_token);
        text.push(' ');

        if let Some(right) =
            self.visit_and_pop(node.child_by_field_name("right"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, right);
            text.push_str(&self.element_text(right));
            text.push_str(" )");
        }
        self.set_text(expr, text);
    }

    fn visit_instanceof(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Instanceof, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        if let Some(left) =
            self.visit_and_pop(node.child_by_field_name("left"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, left);
            text.push_str(&self.element_text(left));
        }
        if let Some(right) =
            self.visit_and_pop(node.child_by_field_name("right"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, right);
            text.push_str(" instanceof ");
            text.push_str(&self.element_text(right));
        }
        self.set_text(expr, text);
    }

    fn visit_prefix(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Prefix, span);
        let mark = self.stack.push(expr);

        let operator_token = node
            .child_by_field_name("operator")
            .map(|o| self.text_of(o))
            .unwrap_or_default();
        let operator = self.make_operator(&operator_token, span);
        self.add_expression(expr, operator);
        let mut text = operator_token;

        if let Some(operand) =
            self.visit_and_pop(node.child_by_field_name("operand"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, operand);
            text.push_str(&self.element_text(operand));
        }
        self.set_text(expr, text);
    }

    /// `x++` / `++x`: tree-sitter folds both into update_expression
    fn visit_update(&mut self, node: Node) {
        let span = self.span_of(node);
        let first = node.child(0);
        let prefix = first
            .map(|c| c.kind() == "++" || c.kind() == "--")
            .unwrap_or(false);
        let category = if prefix {
            ExpressionCategory::Prefix
        } else {
            ExpressionCategory::Postfix
        };
        let expr = self.make_expression(category, span);
        let mark = self.stack.push(expr);

        let (operator_node, operand_node) = if prefix {
            (node.child(0), node.child(1))
        } else {
            (node.child(1), node.child(0))
        };
        let operator_token = operator_node
            .map(|o| self.text_of(o))
            .unwrap_or_default();

        let mut text = String::new();
        if prefix {
            let operator = self.make_operator(&operator_token, span);
            self.add_expression(expr, operator);
            text.push_str(&operator_token);
            if let Some(operand) = self.visit_and_pop(operand_node, mark, ExpectedKind::Any) {
                self.add_expression(expr, operand);
                text.push_str(&self.element_text(operand));
            }
        } else {
            if let Some(operand) = self.visit_and_pop(operand_node, mark, ExpectedKind::Any) {
                self.add_expression(expr, operand);
                text.push_str(&self.element_text(operand));
            }
            let operator = self.make_operator(&operator_token, span);
            self.add_expression(expr, operator);
            text.push_str(&operator_token);
        }
        self.set_text(expr, text);
    }

    fn visit_trinomial(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Trinomial, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        if let Some(condition) =
            self.visit_and_pop(node.child_by_field_name("condition"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, condition);
            text.push_str(&self.element_text(condition));
            text.push_str(" ? ");
        }
        if let Some(consequence) =
            self.visit_and_pop(node.child_by_field_name("consequence"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, consequence);
            text.push_str(&self.element_text(consequence));
            text.push_str(" : ");
        }
        if let Some(alternative) =
            self.visit_and_pop(node.child_by_field_name("alternative"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, alternative);
            text.push_str(&self.element_text(alternative));
        }
        self.set_text(expr, text);
    }

    fn visit_cast(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Cast, span);
        let mark = self.stack.push(expr);

        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let type_element = self.make_type(&type_text, span);
        self.add_expression(expr, type_element);
        let mut text = format!("({type_text})");

        if let Some(value) =
            self.visit_and_pop(node.child_by_field_name("value"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, value);
            text.push_str(&self.element_text(value));
        }
        self.set_text(expr, text);
    }

    fn visit_parenthesized(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::Parenthesized, span);
        let mark = self.stack.push(expr);

        if let Some(inner) = self.visit_and_pop(first_named(node), mark, ExpectedKind::Any) {
            self.add_expression(expr, inner);
            let text = format!("({})", self.element_text(inner));
            self.set_text(expr, text);
        }
    }

    fn visit_method_invocation(&mut self, node: Node) {
        let span = self.span_of(node);
        let object = node.child_by_field_name("object");
        let super_call = object.map(|o| o.kind() == "super").unwrap_or(false);
        let category = if super_call {
            ExpressionCategory::SuperMethodInvocation
        } else {
            ExpressionCategory::MethodInvocation
        };
        let expr = self.make_expression(category, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        let mut qualifier_text = None;
        if super_call {
            text.push_str("super.");
        } else if let Some(qualifier) = self.visit_and_pop(object, mark, ExpectedKind::Any) {
            self.store.element_mut(expr).expression_mut().unwrap().qualifier = Some(qualifier);
            let t = self.element_text(qualifier);
            text.push_str(&t);
            text.push('.');
            qualifier_text = Some(t);
        }

        let name_text = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        if let Some(name) =
            self.visit_and_pop(node.child_by_field_name("name"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, name);
            text.push_str(&self.element_text(name));
            text.push('(');
        }

        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                if let Some(argument) =
                    self.visit_and_pop(Some(argument), mark, ExpectedKind::Any)
                {
                    self.add_expression(expr, argument);
                    text.push_str(&self.element_text(argument));
                    text.push(',');
                }
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push(')');
        self.set_text(expr, text);

        // No type bindings in this front end: the API name always degrades
        // to the textual receiver form
        if let Some(qualifier_text) = qualifier_text {
            self.store
                .element_mut(expr)
                .expression_mut()
                .unwrap()
                .api_name = Some(format!("{qualifier_text}.{name_text}()"));
        }
    }

    fn visit_class_instance_creation(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::ClassInstanceCreation, span);
        let mark = self.stack.push(expr);

        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let type_element = self.make_type(&type_text, span);
        self.add_expression(expr, type_element);

        let mut text = format!("new {type_text}(");
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                if let Some(argument) =
                    self.visit_and_pop(Some(argument), mark, ExpectedKind::Any)
                {
                    self.add_expression(expr, argument);
                    text.push_str(&self.element_text(argument));
                    text.push(',');
                }
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push(')');

        if let Some(body) = child_of_kind(node, "class_body") {
            let class = self.lower_anonymous_class(body);
            if self.stack.pop(mark, ExpectedKind::Class, &self.store) == Some(class) {
                self.store
                    .element_mut(expr)
                    .expression_mut()
                    .unwrap()
                    .anonymous_class = Some(class);
                text.push_str(&self.element_text(class));
            }
        }
        self.set_text(expr, text);
    }

    fn visit_constructor_invocation(&mut self, node: Node) {
        let span = self.span_of(node);
        let constructor = node.child_by_field_name("constructor");
        let super_call = constructor.map(|c| c.kind() == "super").unwrap_or(false);
        let category = if super_call {
            ExpressionCategory::SuperConstructorInvocation
        } else {
            ExpressionCategory::ConstructorInvocation
        };
        let expr = self.make_expression(category, span);
        let mark = self.stack.push(expr);

        let mut text = String::from(if super_call { "super(" } else { "this(" });
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for argument in named_children(arguments) {
                if let Some(argument) =
                    self.visit_and_pop(Some(argument), mark, ExpectedKind::Any)
                {
                    self.add_expression(expr, argument);
                    text.push_str(&self.element_text(argument));
                    text.push(',');
                }
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push(')');
        self.set_text(expr, text.clone());

        // Constructor invocations are statements: pop the expression and
        // wrap it
        let _ = self.stack.pop(mark - 1, ExpectedKind::Any, &self.store);
        let Some(owner) = self.owner_block() else {
            return;
        };
        let stmt = self.make_statement(StatementCategory::Expression, owner, span);
        self.add_expression(stmt, expr);
        text.push(';');
        self.set_text(stmt, text);
        self.stack.push(stmt);
    }

    fn visit_field_access(&mut self, node: Node) {
        let span = self.span_of(node);
        let object = node.child_by_field_name("object");
        let super_access = object.map(|o| o.kind() == "super").unwrap_or(false);
        let category = if super_access {
            ExpressionCategory::SuperFieldAccess
        } else {
            ExpressionCategory::FieldAccess
        };
        let expr = self.make_expression(category, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        if super_access {
            text.push_str("super");
        } else if let Some(object) = self.visit_and_pop(object, mark, ExpectedKind::Any) {
            self.add_expression(expr, object);
            text.push_str(&self.element_text(object));
        }

        if let Some(field) =
            self.visit_and_pop(node.child_by_field_name("field"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, field);
            text.push('.');
            text.push_str(&self.element_text(field));
        }
        self.set_text(expr, text);
    }

    /// `a.b` in name position (rare outside imports and types)
    fn visit_qualified_name(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::QualifiedName, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        if let Some(qualifier) =
            self.visit_and_pop(node.child_by_field_name("scope"), mark, ExpectedKind::Any)
        {
            self.store.element_mut(expr).expression_mut().unwrap().qualifier = Some(qualifier);
            text.push_str(&self.element_text(qualifier));
        }
        if let Some(name) =
            self.visit_and_pop(node.child_by_field_name("name"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, name);
            text.push('.');
            text.push_str(&self.element_text(name));
        }
        self.set_text(expr, text);
    }

    fn visit_array_access(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::ArrayAccess, span);
        let mark = self.stack.push(expr);

        let mut text = String::new();
        if let Some(array) =
            self.visit_and_pop(node.child_by_field_name("array"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, array);
            text.push_str(&self.element_text(array));
        }
        if let Some(index) =
            self.visit_and_pop(node.child_by_field_name("index"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, index);
            text.push('[');
            text.push_str(&self.element_text(index));
            text.push(']');
        }
        self.set_text(expr, text);
    }

    fn visit_array_creation(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::ArrayCreation, span);
        let mark = self.stack.push(expr);

        let type_text = node
            .child_by_field_name("type")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let type_element = self.make_type(&type_text, span);
        self.add_expression(expr, type_element);
        let mut text = format!("new {type_text}[]");

        if let Some(value) =
            self.visit_and_pop(node.child_by_field_name("value"), mark, ExpectedKind::Any)
        {
            self.add_expression(expr, value);
            text.push_str(&self.element_text(value));
        }
        self.set_text(expr, text);
    }

    fn visit_array_initializer(&mut self, node: Node) {
        let span = self.span_of(node);
        let expr = self.make_expression(ExpressionCategory::ArrayInitializer, span);
        let mark = self.stack.push(expr);

        let mut text = String::from("{");
        for child in named_children(node) {
            if let Some(element) = self.visit_and_pop(Some(child), mark, ExpectedKind::Any) {
                self.add_expression(expr, element);
                text.push_str(&self.element_text(element));
                text.push(',');
            }
        }
        if text.ends_with(',') {
            text.pop();
        }
        text.push('}');
        self.set_text(expr, text);
    }

    fn visit_array_type(&mut self, node: Node) {
        let span = self.span_of(node);
        let element_type = node
            .child_by_field_name("element")
            .map(|t| self.text_of(t))
            .unwrap_or_default();
        let dimensions = node
            .child_by_field_name("dimensions")
            .map(|d| self.text_of(d))
            .unwrap_or_default();
        let type_element = self.make_type(&format!("{element_type}{dimensions}"), span);
        self.stack.push(type_element);
    }
}

// ------------------------- node helpers -------------------------

/// Named children, comments excluded
fn named_children(node: Node) -> Vec<Node> {
    let mut out = Vec::new();
    for index in 0..node.named_child_count() {
        if let Some(child) = node.named_child(index) {
            if !child.kind().ends_with("comment") {
                out.push(child);
            }
        }
    }
    out
}

fn first_named(node: Node) -> Option<Node> {
    named_children(node).into_iter().next()
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    for index in 0..node.child_count() {
        if let Some(child) = node.child(index) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// Conditions arrive wrapped in a parenthesized_expression; the model wants
/// the bare expression
fn unwrap_parens(node: Option<Node>) -> Option<Node> {
    let node = node?;
    if node.kind() == "parenthesized_expression" {
        first_named(node).or(Some(node))
    } else {
        Some(node)
    }
}
