//! Concrete syntax tree produced by the parser.
//!
//! Every node is the same generic record: a kind, the range of source it
//! covers, an optional piece of text (identifier, keyword, operator or literal)
//! and its children in source order. The middle never looks at tokens, it only
//! consumes these records, so any parser that can produce them can feed the
//! compiler.

use strum::Display;

use crate::frontend::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub text: Option<String>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NodeKind {
    Module,
    AttributeList,
    /// text = attribute name, children = argument expressions
    Attribute,
    /// text = keyword, children = [AttributeList, Name, TypeAnnotation?, Initializer?]
    VariableDeclaration,
    /// children = [AttributeList, Name, ParameterList, ReturnType?, Block]
    FunctionDeclaration,
    ParameterList,
    /// children = [AttributeList, Name, TypeAnnotation]
    Parameter,
    /// children = [AttributeList, type]
    ReturnType,
    /// children = [AttributeList, Name, Property*]
    StructDeclaration,
    /// children = [AttributeList, Name, TypeAnnotation]
    Property,
    /// children = [AttributeList, Name, EnumMember*]
    EnumDeclaration,
    /// children = [Name, Initializer]
    EnumMember,
    /// children = [AttributeList, Name, TypeAnnotation]
    AliasDeclaration,
    /// text = identifier
    Name,
    TypeAnnotation,
    Initializer,
    /// text = type name, children = template arguments (types or expressions)
    TypeName,
    PointerType,

    Block,
    ExpressionStatement,
    /// text = assignment operator
    AssignmentStatement,
    /// children = [condition, Block, (Block | IfStatement)?]
    IfStatement,
    WhileStatement,
    /// children = [ForInitializer?, ForCondition?, ForUpdate?, Block]
    ForStatement,
    ForInitializer,
    ForCondition,
    ForUpdate,
    /// children = [selector, SwitchCase*]
    SwitchStatement,
    /// text = "case" or "default", children = [selector*, Block]
    SwitchCase,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    DiscardStatement,

    /// text = literal source text
    Literal,
    NameExpression,
    BinaryExpression,
    UnaryExpression,
    IndexExpression,
    /// text = property name, children = [base]
    MemberExpression,
    /// children = [Name (enum), Name (member)]
    EnumValueExpression,
    /// text = function name, children = arguments
    CallExpression,
    /// children = [type, arguments*]
    NewExpression,
    GroupingExpression,
}

impl NodeKind {
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Literal
                | NodeKind::NameExpression
                | NodeKind::BinaryExpression
                | NodeKind::UnaryExpression
                | NodeKind::IndexExpression
                | NodeKind::MemberExpression
                | NodeKind::EnumValueExpression
                | NodeKind::CallExpression
                | NodeKind::NewExpression
                | NodeKind::GroupingExpression
        )
    }

    pub fn is_type(self) -> bool {
        matches!(self, NodeKind::TypeName | NodeKind::PointerType)
    }

    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::VariableDeclaration
                | NodeKind::FunctionDeclaration
                | NodeKind::StructDeclaration
                | NodeKind::EnumDeclaration
                | NodeKind::AliasDeclaration
        )
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// First direct child of the given kind
    pub fn child(&self, kind: NodeKind) -> Option<&Node> {
        self.children.iter().find(|child| child.kind == kind)
    }

    pub fn children_of(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    /// Writes an indented outline of the tree, one node per line
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.kind.to_string());

        if let Some(text) = &self.text {
            out.push_str(&format!(" `{text}`"));
        }

        out.push('\n');

        for child in &self.children {
            child.write_outline(depth + 1, out);
        }
    }
}
