/*
 * Program Element Model
 *
 * Tagged-variant tree of the semantic elements the graphs are built over.
 * Elements live in an ElementStore and reference each other by ElementId;
 * owner back-references (owner_block, owner_conditional_block) are lookup
 * convenience, never ownership.
 */

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::{ElementId, LineSpan};

/// All supported statement categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementCategory {
    Assert,
    Break,
    Case,
    Catch,
    Continue,
    Do,
    Empty,
    Expression,
    If,
    For,
    Foreach,
    Return,
    SimpleBlock,
    Synchronized,
    Switch,
    Throw,
    Try,
    TypeDeclaration,
    VariableDeclaration,
    While,
}

/// All supported expression categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionCategory {
    ArrayAccess,
    ArrayCreation,
    ArrayInitializer,
    Assignment,
    Boolean,
    Cast,
    Character,
    ClassInstanceCreation,
    ConstructorInvocation,
    FieldAccess,
    Infix,
    Instanceof,
    MethodInvocation,
    Null,
    Number,
    Parenthesized,
    Postfix,
    Prefix,
    QualifiedName,
    SimpleName,
    String,
    SuperConstructorInvocation,
    SuperFieldAccess,
    SuperMethodInvocation,
    This,
    Trinomial,
    TypeLiteral,
    VariableDeclarationExpression,
    VariableDeclarationFragment,
    MethodEnter,
}

/// Variable declaration categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableCategory {
    Field,
    Local,
    Parameter,
}

/// Statement payload
#[derive(Debug, Clone)]
pub struct StatementData {
    pub category: StatementCategory,
    /// The enclosing block element this statement was created under
    pub owner_block: Option<ElementId>,
    /// Condition element for conditional blocks (If, While, Switch, ...)
    pub condition: Option<ElementId>,
    pub expressions: Vec<ElementId>,
    /// For / Foreach initializer expressions
    pub initializers: Vec<ElementId>,
    /// For updater expressions
    pub updaters: Vec<ElementId>,
    pub statements: Vec<ElementId>,
    /// If: statements of the else branch
    pub else_statements: Vec<ElementId>,
    /// Try: catch blocks
    pub catch_statements: Vec<ElementId>,
    /// Try: finally block
    pub finally_statement: Option<ElementId>,
    /// Label of a labeled statement
    pub label: Option<String>,
}

impl StatementData {
    pub fn new(category: StatementCategory, owner_block: Option<ElementId>) -> Self {
        Self {
            category,
            owner_block,
            condition: None,
            expressions: Vec::new(),
            initializers: Vec::new(),
            updaters: Vec::new(),
            statements: Vec::new(),
            else_statements: Vec::new(),
            catch_statements: Vec::new(),
            finally_statement: None,
            label: None,
        }
    }
}

/// Expression payload
#[derive(Debug, Clone)]
pub struct ExpressionData {
    pub category: ExpressionCategory,
    /// Receiver / qualifier, e.g. `a` in `a.foo()` or `a.x`
    pub qualifier: Option<ElementId>,
    /// Children; for assignment `[lhs, operator, rhs]`, for method
    /// invocation `[name, arg1, arg2, ...]`
    pub expressions: Vec<ElementId>,
    /// Anonymous class body of a ClassInstanceCreation
    pub anonymous_class: Option<ElementId>,
    /// Textual API name of a MethodInvocation, e.g. `"req.getSession()"`
    pub api_name: Option<String>,
}

impl ExpressionData {
    pub fn new(category: ExpressionCategory) -> Self {
        Self {
            category,
            qualifier: None,
            expressions: Vec::new(),
            anonymous_class: None,
            api_name: None,
        }
    }
}

/// Method payload
#[derive(Debug, Clone)]
pub struct MethodData {
    pub name: Option<String>,
    pub lambda: bool,
    pub parameters: Vec<ElementId>,
    pub statements: Vec<ElementId>,
    /// Single-expression lambda body
    pub lambda_expression: Option<ElementId>,
}

impl MethodData {
    pub fn new(name: Option<String>, lambda: bool) -> Self {
        Self {
            name,
            lambda,
            parameters: Vec::new(),
            statements: Vec::new(),
            lambda_expression: None,
        }
    }
}

/// Class payload; anonymous iff `name` is absent
#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: Option<String>,
    pub methods: Vec<ElementId>,
}

/// Variable declaration payload (parameters, catch parameters, locals)
#[derive(Debug, Clone)]
pub struct VariableDeclarationData {
    pub category: VariableCategory,
    pub type_name: String,
    pub name: String,
}

/// Element variants
#[derive(Debug, Clone)]
pub enum ElementKind {
    Statement(StatementData),
    Expression(ExpressionData),
    Method(MethodData),
    Class(ClassData),
    VariableDeclaration(VariableDeclarationData),
    /// A string-form type; the text carries the type name
    Type,
    /// Operator token such as `++` or `=`
    Operator(String),
}

impl ElementKind {
    /// Variant name, used by the scope JSON export
    pub fn variant_name(&self) -> &'static str {
        match self {
            ElementKind::Statement(_) => "Statement",
            ElementKind::Expression(_) => "Expression",
            ElementKind::Method(_) => "Method",
            ElementKind::Class(_) => "Class",
            ElementKind::VariableDeclaration(_) => "VariableDeclaration",
            ElementKind::Type => "Type",
            ElementKind::Operator(_) => "Operator",
        }
    }
}

/// A program element: id, span, text, modifiers and the tagged payload
#[derive(Debug, Clone)]
pub struct ProgramElement {
    pub id: ElementId,
    pub span: LineSpan,
    pub text: String,
    pub modifiers: Vec<String>,
    /// Set on condition elements: the conditional block they belong to
    pub owner_conditional_block: Option<ElementId>,
    pub kind: ElementKind,
}

impl ProgramElement {
    pub fn new(kind: ElementKind, span: LineSpan) -> Self {
        Self {
            id: ElementId::next(),
            span,
            text: String::new(),
            modifiers: Vec::new(),
            owner_conditional_block: None,
            kind,
        }
    }

    pub fn statement(&self) -> Option<&StatementData> {
        match &self.kind {
            ElementKind::Statement(data) => Some(data),
            _ => None,
        }
    }

    pub fn statement_mut(&mut self) -> Option<&mut StatementData> {
        match &mut self.kind {
            ElementKind::Statement(data) => Some(data),
            _ => None,
        }
    }

    pub fn expression(&self) -> Option<&ExpressionData> {
        match &self.kind {
            ElementKind::Expression(data) => Some(data),
            _ => None,
        }
    }

    pub fn expression_mut(&mut self) -> Option<&mut ExpressionData> {
        match &mut self.kind {
            ElementKind::Expression(data) => Some(data),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<&MethodData> {
        match &self.kind {
            ElementKind::Method(data) => Some(data),
            _ => None,
        }
    }

    pub fn method_mut(&mut self) -> Option<&mut MethodData> {
        match &mut self.kind {
            ElementKind::Method(data) => Some(data),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&ClassData> {
        match &self.kind {
            ElementKind::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn variable_declaration(&self) -> Option<&VariableDeclarationData> {
        match &self.kind {
            ElementKind::VariableDeclaration(data) => Some(data),
            _ => None,
        }
    }

    pub fn statement_category(&self) -> Option<StatementCategory> {
        self.statement().map(|s| s.category)
    }

    pub fn expression_category(&self) -> Option<ExpressionCategory> {
        self.expression().map(|e| e.category)
    }

    /// Whether statements may be attached under this element
    pub fn is_block_owner(&self) -> bool {
        matches!(self.kind, ElementKind::Statement(_) | ElementKind::Method(_))
    }
}

/// Central store for the PE forest of one compilation unit
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: FxHashMap<ElementId, ProgramElement>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new element, returning its id
    pub fn insert(&mut self, element: ProgramElement) -> ElementId {
        let id = element.id;
        self.elements.insert(id, element);
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&ProgramElement> {
        self.elements.get(&id)
    }

    /// Fetch an element; a missing id is an implementation bug
    pub fn element(&self, id: ElementId) -> &ProgramElement {
        self.elements
            .get(&id)
            .unwrap_or_else(|| panic!("unknown element id {id}"))
    }

    pub fn element_mut(&mut self, id: ElementId) -> &mut ProgramElement {
        self.elements
            .get_mut(&id)
            .unwrap_or_else(|| panic!("unknown element id {id}"))
    }

    pub fn text(&self, id: ElementId) -> &str {
        &self.element(id).text
    }

    pub fn is_block_owner(&self, id: ElementId) -> bool {
        self.get(id).map(|e| e.is_block_owner()).unwrap_or(false)
    }

    /// Statements directly under a block element (statement or method)
    pub fn block_statements(&self, id: ElementId) -> &[ElementId] {
        match &self.element(id).kind {
            ElementKind::Statement(data) => &data.statements,
            ElementKind::Method(data) => &data.statements,
            _ => &[],
        }
    }

    /// Set the body of a block element, inlining simple-block children so
    /// composite constructs keep flat statement sequences.
    ///
    /// A statement owner keeps an empty simple block as its only child; a
    /// method drops it.
    pub fn set_block_body(&mut self, owner: ElementId, body: ElementId) {
        let keep_empty_block = matches!(self.element(owner).kind, ElementKind::Statement(_));
        let inlined = self.inlined_children(body, keep_empty_block);
        match &mut self.element_mut(owner).kind {
            ElementKind::Statement(data) => {
                data.statements.clear();
                data.statements.extend(inlined);
            }
            ElementKind::Method(data) => {
                data.statements.clear();
                data.statements.extend(inlined);
            }
            _ => panic!("set_block_body on a non-block element"),
        }
    }

    /// Set the else branch of an If statement, inlining simple-block children
    pub fn set_else_body(&mut self, owner: ElementId, body: ElementId) {
        let inlined = self.inlined_children(body, false);
        let data = self
            .element_mut(owner)
            .statement_mut()
            .expect("else body on a non-statement");
        data.else_statements.clear();
        data.else_statements.extend(inlined);
    }

    fn inlined_children(&self, body: ElementId, keep_empty_block: bool) -> Vec<ElementId> {
        match self.element(body).statement_category() {
            Some(StatementCategory::SimpleBlock) => {
                let children = &self.element(body).statement().unwrap().statements;
                if children.is_empty() && keep_empty_block {
                    vec![body]
                } else {
                    children.clone()
                }
            }
            _ => vec![body],
        }
    }

    /// Label a Break / Continue jumps to, e.g. `"out"` in `break out;`
    pub fn jump_to_label(&self, id: ElementId) -> Option<&str> {
        let stmt = self.element(id).statement()?;
        if !matches!(
            stmt.category,
            StatementCategory::Break | StatementCategory::Continue
        ) {
            return None;
        }
        stmt.expressions
            .first()
            .map(|&label| self.element(label).text.as_str())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_set_block_body_inlines_simple_block() {
        let mut store = ElementStore::new();
        let outer = statement(&mut store, StatementCategory::If, None);
        let block = statement(&mut store, StatementCategory::SimpleBlock, Some(outer));
        let a = statement(&mut store, StatementCategory::Expression, Some(block));
        let b = statement(&mut store, StatementCategory::Return, Some(block));
        store
            .element_mut(block)
            .statement_mut()
            .unwrap()
            .statements
            .extend([a, b]);

        store.set_block_body(outer, block);

        assert_eq!(store.block_statements(outer), &[a, b]);
    }

    #[test]
    fn test_set_block_body_keeps_empty_block_under_statement() {
        let mut store = ElementStore::new();
        let outer = statement(&mut store, StatementCategory::While, None);
        let block = statement(&mut store, StatementCategory::SimpleBlock, Some(outer));

        store.set_block_body(outer, block);

        // An empty body keeps the block itself so the CFG still gets a node
        assert_eq!(store.block_statements(outer), &[block]);
    }

    #[test]
    fn test_jump_to_label() {
        let mut store = ElementStore::new();
        let brk = statement(&mut store, StatementCategory::Break, None);
        assert_eq!(store.jump_to_label(brk), None);

        let mut label = ProgramElement::new(
            ElementKind::Expression(ExpressionData::new(ExpressionCategory::SimpleName)),
            LineSpan::new(1, 1),
        );
        label.text = "out".to_string();
        let label = store.insert(label);
        store
            .element_mut(brk)
            .statement_mut()
            .unwrap()
            .expressions
            .push(label);

        assert_eq!(store.jump_to_label(brk), Some("out"));
    }
}
