//! The abstract syntax tree lives in one flat arena owned by a [`Document`].
//! Nodes refer to their children by [`NodeId`], which doubles as the key the
//! validation trace memoizes attachments under.

use hashbrown::HashSet;
use once_cell::unsync::OnceCell;
use strum::{Display, EnumString};

use crate::{
    error::Fatal,
    frontend::Span,
    index::{IndexVec, simple_index},
    middle::primitive::{SamplerKind, TextureKind, VectorSize},
};

simple_index! {
    /// Stable identity of a node within its document
    pub struct NodeId;
}

#[derive(Debug, Default)]
pub struct Document {
    pub nodes: IndexVec<NodeId, Node>,
    /// Module-level declarations in source order
    pub declarations: Vec<NodeId>,
    module_declarations: HashSet<NodeId>,
}

#[derive(Debug)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Declaration(Declaration),
    Expression(Expression),
    Statement(Statement),
    Type(TypeExpression),
    AttributeList(AttributeList),
    Attribute(Attribute),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Debug)]
pub struct Declaration {
    pub name: Identifier,
    /// Always present, possibly empty
    pub attributes: NodeId,
    pub kind: DeclarationKind,
}

#[derive(Debug)]
pub enum DeclarationKind {
    Variable(VariableDeclaration),
    Parameter { ty: NodeId },
    Property { ty: NodeId },
    Struct { properties: Vec<NodeId> },
    Enum { members: Vec<EnumMember> },
    Alias { ty: NodeId },
    Function(FunctionDeclaration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeclarationKeyword {
    Const,
    Let,
    Storage,
    Uniform,
    Workgroup,
    Private,
    Param,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationScope {
    Module,
    Function,
}

#[derive(Debug)]
pub struct VariableDeclaration {
    pub keyword: DeclarationKeyword,
    pub scope: DeclarationScope,
    pub ty: Option<NodeId>,
    pub initializer: Option<NodeId>,
}

#[derive(Debug)]
pub struct EnumMember {
    pub name: Identifier,
    pub value: NodeId,
}

#[derive(Debug)]
pub struct FunctionDeclaration {
    pub parameters: Vec<NodeId>,
    pub return_type: Option<NodeId>,
    /// Attributes written after the arrow, always present
    pub return_attributes: NodeId,
    pub body: NodeId,
}

#[derive(Debug)]
pub enum Expression {
    /// Raw literal text, parsed during validation
    Literal(String),
    Name(Identifier),
    Binary {
        operator: BinaryOperatorKind,
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary {
        operator: UnaryOperatorKind,
        operand: NodeId,
    },
    Index {
        base: NodeId,
        index: NodeId,
    },
    Member {
        base: NodeId,
        property: Identifier,
    },
    EnumValue {
        enumeration: Identifier,
        member: Identifier,
    },
    New {
        ty: NodeId,
        arguments: Vec<NodeId>,
    },
    Call {
        function: Identifier,
        arguments: Vec<NodeId>,
    },
    Grouping(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum BinaryOperatorKind {
    #[strum(to_string = "+")]
    Add,
    #[strum(to_string = "-")]
    Subtract,
    #[strum(to_string = "*")]
    Multiply,
    #[strum(to_string = "/")]
    Divide,
    #[strum(to_string = "%")]
    Modulus,
    #[strum(to_string = "==")]
    Equals,
    #[strum(to_string = "!=")]
    NotEquals,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = "<=")]
    LessThanOrEqualTo,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = ">=")]
    GreaterThanOrEqualTo,
    #[strum(to_string = "&&")]
    LogicalAnd,
    #[strum(to_string = "||")]
    LogicalOr,
    #[strum(to_string = "&")]
    BitwiseAnd,
    #[strum(to_string = "|")]
    BitwiseOr,
    #[strum(to_string = "^")]
    BitwiseXor,
    #[strum(to_string = "<<")]
    ShiftLeft,
    #[strum(to_string = ">>")]
    ShiftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorClass {
    Arithmetic,
    Bitwise,
    Shift,
    /// `<`, `<=`, `>`, `>=`
    Ordering,
    /// `==`, `!=`
    Equality,
    Logical,
}

impl BinaryOperatorKind {
    pub fn class(self) -> BinaryOperatorClass {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulus => {
                BinaryOperatorClass::Arithmetic
            }
            Self::BitwiseAnd | Self::BitwiseOr | Self::BitwiseXor => BinaryOperatorClass::Bitwise,
            Self::ShiftLeft | Self::ShiftRight => BinaryOperatorClass::Shift,
            Self::LessThan
            | Self::LessThanOrEqualTo
            | Self::GreaterThan
            | Self::GreaterThanOrEqualTo => BinaryOperatorClass::Ordering,
            Self::Equals | Self::NotEquals => BinaryOperatorClass::Equality,
            Self::LogicalAnd | Self::LogicalOr => BinaryOperatorClass::Logical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum UnaryOperatorKind {
    #[strum(to_string = "*")]
    Deref,
    #[strum(to_string = "&")]
    AddressOf,
    #[strum(to_string = "!")]
    LogicalNot,
    #[strum(to_string = "~")]
    BitwiseNot,
    #[strum(to_string = "-")]
    Negate,
}

#[derive(Debug)]
pub enum Statement {
    /// Function-scope `let` or `const`
    Declaration(NodeId),
    Assignment {
        /// `None` for plain `=`, otherwise the operator of a compound assignment
        operator: Option<BinaryOperatorKind>,
        target: NodeId,
        value: NodeId,
    },
    /// A function call evaluated for its side effects
    Expression(NodeId),
    Block(Vec<NodeId>),
    If {
        condition: NodeId,
        positive: NodeId,
        /// Either a block or another if statement
        negative: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    For {
        initializer: Option<NodeId>,
        condition: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    Switch {
        selector: NodeId,
        cases: Vec<SwitchCase>,
    },
    Return(Option<NodeId>),
    Break,
    Continue,
    Discard,
}

#[derive(Debug)]
pub struct SwitchCase {
    pub span: Span,
    pub selectors: Vec<NodeId>,
    pub is_default: bool,
    pub body: NodeId,
}

#[derive(Debug)]
pub enum TypeExpression {
    /// Scalars, `String`, `Void` and user declared types
    Named(Identifier),
    Vector {
        size: VectorSize,
        inner: NodeId,
    },
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        inner: NodeId,
    },
    Array {
        inner: NodeId,
        /// Absent for runtime-sized arrays
        length: Option<NodeId>,
    },
    Pointer {
        inner: NodeId,
    },
    Sampler(SamplerKind),
    Texture {
        kind: TextureKind,
        sampled: Option<NodeId>,
        format: Option<Identifier>,
        access: Option<Identifier>,
    },
}

/// Where an attribute list is written, which decides the attributes it may
/// contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeTarget {
    ModuleVariable,
    LocalVariable,
    Function,
    FunctionReturn,
    Parameter,
    Property,
    Struct,
    Enum,
    Alias,
}

impl core::fmt::Display for AttributeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AttributeTarget::ModuleVariable => "module variable",
            AttributeTarget::LocalVariable => "local variable",
            AttributeTarget::Function => "function",
            AttributeTarget::FunctionReturn => "function return type",
            AttributeTarget::Parameter => "function parameter",
            AttributeTarget::Property => "struct property",
            AttributeTarget::Struct => "struct",
            AttributeTarget::Enum => "enum",
            AttributeTarget::Alias => "alias",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeOwner {
    pub declaration: NodeId,
    pub target: AttributeTarget,
}

#[derive(Debug)]
pub struct AttributeList {
    pub attributes: Vec<NodeId>,
    owner: OnceCell<AttributeOwner>,
}

impl AttributeList {
    pub fn new(attributes: Vec<NodeId>) -> Self {
        Self {
            attributes,
            owner: OnceCell::new(),
        }
    }

    /// Binds the list to the declaration it decorates. A list can only ever
    /// belong to one declaration.
    pub fn attach(&self, owner: AttributeOwner) -> Result<(), AttributeOwner> {
        self.owner.set(owner)
    }

    pub fn owner(&self) -> Option<AttributeOwner> {
        self.owner.get().copied()
    }
}

#[derive(Debug)]
pub struct Attribute {
    pub name: Identifier,
    pub arguments: Vec<NodeId>,
}

impl Document {
    pub fn push(&mut self, span: Span, kind: NodeKind) -> NodeId {
        self.nodes.push(Node { span, kind })
    }

    pub fn push_module_declaration(&mut self, declaration: NodeId) {
        self.declarations.push(declaration);
        self.module_declarations.insert(declaration);
    }

    pub fn is_module_declaration(&self, id: NodeId) -> bool {
        self.module_declarations.contains(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, Fatal> {
        self.nodes.get(id).ok_or(Fatal::UnknownNode(id))
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes.get(id).map(|node| node.span).unwrap_or_default()
    }

    pub fn declaration(&self, id: NodeId) -> Option<&Declaration> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Declaration(declaration) => Some(declaration),
            _ => None,
        }
    }

    pub fn expression(&self, id: NodeId) -> Option<&Expression> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn statement(&self, id: NodeId) -> Option<&Statement> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Statement(statement) => Some(statement),
            _ => None,
        }
    }

    pub fn type_expression(&self, id: NodeId) -> Option<&TypeExpression> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn attribute_list(&self, id: NodeId) -> Option<&AttributeList> {
        match &self.nodes.get(id)?.kind {
            NodeKind::AttributeList(list) => Some(list),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId) -> Option<&Attribute> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    /// Attributes of a declaration's list, empty if it has none
    pub fn attributes_of(&self, list: NodeId) -> impl Iterator<Item = &Attribute> {
        self.attribute_list(list)
            .into_iter()
            .flat_map(|list| list.attributes.iter())
            .filter_map(|id| self.attribute(*id))
    }

    /// Looks up an attribute by name in a list
    pub fn find_attribute(&self, list: NodeId, name: &str) -> Option<&Attribute> {
        self.attributes_of(list)
            .find(|attribute| attribute.name.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols_round_trip_through_strum() {
        assert_eq!("<<".parse::<BinaryOperatorKind>().ok(), Some(BinaryOperatorKind::ShiftLeft));
        assert_eq!(BinaryOperatorKind::GreaterThanOrEqualTo.to_string(), ">=");
        assert_eq!("&".parse::<UnaryOperatorKind>().ok(), Some(UnaryOperatorKind::AddressOf));
        assert_eq!(
            BinaryOperatorKind::NotEquals.class(),
            BinaryOperatorClass::Equality
        );
    }

    #[test]
    fn test_attribute_list_attaches_once() {
        let list = AttributeList::new(Vec::new());
        let mut document = Document::default();
        let first = document.push(Span::default(), NodeKind::Statement(Statement::Break));
        let second = document.push(Span::default(), NodeKind::Statement(Statement::Break));

        let owner = AttributeOwner {
            declaration: first,
            target: AttributeTarget::Function,
        };

        assert!(list.attach(owner).is_ok());
        assert!(
            list.attach(AttributeOwner {
                declaration: second,
                target: AttributeTarget::Function,
            })
            .is_err()
        );
        assert_eq!(list.owner(), Some(owner));
    }

    #[test]
    fn test_unknown_node_is_fatal() {
        let document = Document::default();

        assert!(matches!(
            document.node(NodeId(3)),
            Err(Fatal::UnknownNode(_))
        ));
    }
}
