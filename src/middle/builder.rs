//! Lowers the concrete syntax tree into the arena AST.
//!
//! The builder only checks shape: every record must carry the children and
//! text its kind promises. Anything else is left to validation, except for
//! templated type names which match no known type variant at all.

use tracing::debug;

use crate::{
    error::Fatal,
    frontend::{
        Span,
        cst::{self, NodeKind as CstKind},
    },
    middle::{
        ast::{
            Attribute, AttributeList, AttributeOwner, AttributeTarget, BinaryOperatorKind,
            Declaration, DeclarationKeyword, DeclarationKind, DeclarationScope, Document,
            EnumMember, Expression, FunctionDeclaration, Identifier, NodeId, NodeKind, Statement,
            SwitchCase, TypeExpression, UnaryOperatorKind, VariableDeclaration,
        },
        primitive::{NumericKind, SamplerKind, TextureKind, VectorSize},
    },
};

/// Builds a [`Document`] out of a `Module` record
pub struct Builder {
    document: Document,
}

fn malformed<T>(node: &cst::Node, expected: &'static str) -> Result<T, Fatal> {
    Err(Fatal::MalformedTree {
        kind: node.kind,
        expected,
        span: node.span,
    })
}

fn unknown_type_variant<T>(node: &cst::Node, name: &str) -> Result<T, Fatal> {
    Err(Fatal::UnknownTypeVariant {
        name: name.to_string(),
        span: node.span,
    })
}

fn child<'cst>(
    node: &'cst cst::Node,
    index: usize,
    expected: &'static str,
) -> Result<&'cst cst::Node, Fatal> {
    match node.children.get(index) {
        Some(child) => Ok(child),
        None => malformed(node, expected),
    }
}

fn text<'cst>(node: &'cst cst::Node, expected: &'static str) -> Result<&'cst str, Fatal> {
    match &node.text {
        Some(text) => Ok(text),
        None => malformed(node, expected),
    }
}

/// The single child wrapped by `TypeAnnotation`, `Initializer` and friends
fn unwrap<'cst>(
    node: &'cst cst::Node,
    kind: CstKind,
    expected: &'static str,
) -> Result<&'cst cst::Node, Fatal> {
    if node.kind != kind {
        return malformed(node, expected);
    }

    child(node, 0, expected)
}

fn identifier(node: &cst::Node) -> Result<Identifier, Fatal> {
    if node.kind != CstKind::Name {
        return malformed(node, "a name");
    }

    Ok(Identifier {
        name: text(node, "identifier text")?.to_string(),
        span: node.span,
    })
}

/// Identifier carried as text at the end of a record, like `base.property`
fn trailing_identifier(node: &cst::Node) -> Result<Identifier, Fatal> {
    let name = text(node, "identifier text")?;

    Ok(Identifier {
        name: name.to_string(),
        span: Span::new(node.span.end.saturating_sub(name.len()), node.span.end),
    })
}

/// Identifier carried as text at the start of a record, like `name(arguments)`
fn leading_identifier(node: &cst::Node) -> Result<Identifier, Fatal> {
    let name = text(node, "identifier text")?;

    Ok(Identifier {
        name: name.to_string(),
        span: Span::new(node.span.start, node.span.start + name.len()),
    })
}

impl Builder {
    pub fn build(module: &cst::Node) -> Result<Document, Fatal> {
        if module.kind != CstKind::Module {
            return malformed(module, "the module root");
        }

        let mut builder = Self {
            document: Document::default(),
        };

        for child in &module.children {
            let declaration = builder.build_declaration(child, DeclarationScope::Module)?;
            builder.document.push_module_declaration(declaration);
        }

        debug!(
            "built {} nodes from {} module declarations",
            builder.document.nodes.len(),
            builder.document.declarations.len()
        );

        Ok(builder.document)
    }

    fn push(&mut self, span: Span, kind: NodeKind) -> NodeId {
        self.document.push(span, kind)
    }

    fn attach(
        &mut self,
        list: NodeId,
        declaration: NodeId,
        target: AttributeTarget,
    ) -> Result<(), Fatal> {
        let span = self.document.span(list);

        let Some(attribute_list) = self.document.attribute_list(list) else {
            return Err(Fatal::UnknownNode(list));
        };

        attribute_list
            .attach(AttributeOwner {
                declaration,
                target,
            })
            .map_err(|_| Fatal::AttributeListReattached { list, span })
    }

    fn build_attribute_list(&mut self, node: &cst::Node) -> Result<NodeId, Fatal> {
        if node.kind != CstKind::AttributeList {
            return malformed(node, "an attribute list");
        }

        let mut attributes = Vec::with_capacity(node.children.len());

        for attribute in &node.children {
            if attribute.kind != CstKind::Attribute {
                return malformed(attribute, "an attribute");
            }

            let arguments = attribute
                .children
                .iter()
                .map(|argument| self.build_expression(argument))
                .collect::<Result<Vec<_>, _>>()?;

            let id = self.push(
                attribute.span,
                NodeKind::Attribute(Attribute {
                    name: Identifier {
                        name: text(attribute, "attribute name")?.to_string(),
                        // Skip the `@`
                        span: Span::new(attribute.span.start + 1, attribute.span.end),
                    },
                    arguments,
                }),
            );

            attributes.push(id);
        }

        Ok(self.push(
            node.span,
            NodeKind::AttributeList(AttributeList::new(attributes)),
        ))
    }

    fn empty_attribute_list(&mut self, at: Span) -> NodeId {
        self.push(
            Span::new(at.start, at.start),
            NodeKind::AttributeList(AttributeList::new(Vec::new())),
        )
    }

    fn build_declaration(
        &mut self,
        node: &cst::Node,
        scope: DeclarationScope,
    ) -> Result<NodeId, Fatal> {
        let attributes = self.build_attribute_list(child(node, 0, "an attribute list")?)?;
        let name = identifier(child(node, 1, "a name")?)?;

        let (kind, target, return_attributes) = match node.kind {
            CstKind::VariableDeclaration => {
                let keyword = text(node, "a declaration keyword")?;
                let Ok(keyword) = keyword.parse::<DeclarationKeyword>() else {
                    return malformed(node, "a declaration keyword");
                };

                let mut ty = None;
                let mut initializer = None;

                for child in &node.children[2..] {
                    match child.kind {
                        CstKind::TypeAnnotation if ty.is_none() && initializer.is_none() => {
                            ty = Some(self.build_type(unwrap(
                                child,
                                CstKind::TypeAnnotation,
                                "a type",
                            )?)?);
                        }
                        CstKind::Initializer if initializer.is_none() => {
                            initializer = Some(self.build_expression(unwrap(
                                child,
                                CstKind::Initializer,
                                "an initializer expression",
                            )?)?);
                        }
                        _ => return malformed(node, "a type annotation or an initializer"),
                    }
                }

                let target = match scope {
                    DeclarationScope::Module => AttributeTarget::ModuleVariable,
                    DeclarationScope::Function => AttributeTarget::LocalVariable,
                };

                let kind = DeclarationKind::Variable(VariableDeclaration {
                    keyword,
                    scope,
                    ty,
                    initializer,
                });

                (kind, target, None)
            }
            CstKind::FunctionDeclaration => {
                let parameter_list = child(node, 2, "a parameter list")?;

                if parameter_list.kind != CstKind::ParameterList {
                    return malformed(node, "a parameter list");
                }

                let parameters = parameter_list
                    .children
                    .iter()
                    .map(|parameter| self.build_typed_name(parameter, CstKind::Parameter))
                    .collect::<Result<Vec<_>, _>>()?;

                let (return_attributes, return_type) = match node.children.get(3) {
                    Some(return_type) if return_type.kind == CstKind::ReturnType => {
                        let list = self.build_attribute_list(child(
                            return_type,
                            0,
                            "return attributes",
                        )?)?;
                        let ty = self.build_type(child(return_type, 1, "a return type")?)?;

                        (list, Some(ty))
                    }
                    _ => (self.empty_attribute_list(name.span), None),
                };

                let Some(body) = node.children.last() else {
                    return malformed(node, "a body");
                };

                if body.kind != CstKind::Block {
                    return malformed(node, "a body");
                }

                let body = self.build_statement(body)?;

                let kind = DeclarationKind::Function(FunctionDeclaration {
                    parameters,
                    return_type,
                    return_attributes,
                    body,
                });

                (kind, AttributeTarget::Function, Some(return_attributes))
            }
            CstKind::StructDeclaration => {
                let properties = node.children[2..]
                    .iter()
                    .map(|property| self.build_typed_name(property, CstKind::Property))
                    .collect::<Result<Vec<_>, _>>()?;

                (
                    DeclarationKind::Struct { properties },
                    AttributeTarget::Struct,
                    None,
                )
            }
            CstKind::EnumDeclaration => {
                let mut members = Vec::new();

                for member in &node.children[2..] {
                    if member.kind != CstKind::EnumMember {
                        return malformed(node, "enum members");
                    }

                    let name = identifier(child(member, 0, "a member name")?)?;
                    let value = self.build_expression(unwrap(
                        child(member, 1, "a member value")?,
                        CstKind::Initializer,
                        "a member value",
                    )?)?;

                    members.push(EnumMember { name, value });
                }

                (
                    DeclarationKind::Enum { members },
                    AttributeTarget::Enum,
                    None,
                )
            }
            CstKind::AliasDeclaration => {
                let ty = self.build_type(unwrap(
                    child(node, 2, "an aliased type")?,
                    CstKind::TypeAnnotation,
                    "an aliased type",
                )?)?;

                (DeclarationKind::Alias { ty }, AttributeTarget::Alias, None)
            }
            _ => return malformed(node, "a declaration"),
        };

        let id = self.push(
            node.span,
            NodeKind::Declaration(Declaration {
                name,
                attributes,
                kind,
            }),
        );

        self.attach(attributes, id, target)?;

        if let Some(return_attributes) = return_attributes {
            self.attach(return_attributes, id, AttributeTarget::FunctionReturn)?;
        }

        Ok(id)
    }

    /// Parameters and struct properties: `@location(0) name: Type`
    fn build_typed_name(&mut self, node: &cst::Node, kind: CstKind) -> Result<NodeId, Fatal> {
        if node.kind != kind {
            return malformed(node, "a parameter or property");
        }

        let attributes = self.build_attribute_list(child(node, 0, "an attribute list")?)?;
        let name = identifier(child(node, 1, "a name")?)?;
        let ty = self.build_type(unwrap(
            child(node, 2, "a type annotation")?,
            CstKind::TypeAnnotation,
            "a type",
        )?)?;

        let (declaration_kind, target) = match kind {
            CstKind::Parameter => (DeclarationKind::Parameter { ty }, AttributeTarget::Parameter),
            _ => (DeclarationKind::Property { ty }, AttributeTarget::Property),
        };

        let id = self.push(
            node.span,
            NodeKind::Declaration(Declaration {
                name,
                attributes,
                kind: declaration_kind,
            }),
        );

        self.attach(attributes, id, target)?;

        Ok(id)
    }

    fn build_type(&mut self, node: &cst::Node) -> Result<NodeId, Fatal> {
        let ty = match node.kind {
            CstKind::PointerType => TypeExpression::Pointer {
                inner: self.build_type(child(node, 0, "a pointee type")?)?,
            },
            CstKind::TypeName => self.build_type_name(node)?,
            _ => return malformed(node, "a type"),
        };

        Ok(self.push(node.span, NodeKind::Type(ty)))
    }

    /// Builds the template argument at `index` which must itself be a type
    fn build_type_argument(
        &mut self,
        node: &cst::Node,
        name: &str,
        index: usize,
    ) -> Result<NodeId, Fatal> {
        match node.children.get(index) {
            Some(argument) if argument.kind.is_type() => self.build_type(argument),
            _ => unknown_type_variant(node, name),
        }
    }

    /// A template argument spelled as a bare identifier, like `rgba8unorm`
    fn identifier_argument(node: &cst::Node, name: &str, index: usize) -> Result<Identifier, Fatal> {
        match node.children.get(index) {
            Some(argument) if argument.kind == CstKind::TypeName && argument.children.is_empty() => {
                Ok(Identifier {
                    name: text(argument, "identifier text")?.to_string(),
                    span: argument.span,
                })
            }
            _ => unknown_type_variant(node, name),
        }
    }

    fn build_type_name(&mut self, node: &cst::Node) -> Result<TypeExpression, Fatal> {
        let name = text(node, "a type name")?;
        let arity = node.children.len();

        let expects = |count: usize| {
            if arity == count {
                Ok(())
            } else {
                unknown_type_variant(node, name)
            }
        };

        if matches!(name, "Boolean" | "String" | "Void") || NumericKind::from_type_name(name).is_some()
        {
            expects(0)?;

            return Ok(TypeExpression::Named(Identifier {
                name: name.to_string(),
                span: node.span,
            }));
        }

        if let Some(count) = name.strip_prefix("Vector") {
            let size = count
                .parse::<usize>()
                .ok()
                .and_then(VectorSize::from_count);

            if let Some(size) = size {
                expects(1)?;

                return Ok(TypeExpression::Vector {
                    size,
                    inner: self.build_type_argument(node, name, 0)?,
                });
            }
        }

        if let Some(shape) = name.strip_prefix("Matrix") {
            let dimensions = shape.split_once('x').and_then(|(columns, rows)| {
                let columns = VectorSize::from_count(columns.parse().ok()?)?;
                let rows = VectorSize::from_count(rows.parse().ok()?)?;

                Some((columns, rows))
            });

            if let Some((columns, rows)) = dimensions {
                expects(1)?;

                return Ok(TypeExpression::Matrix {
                    columns,
                    rows,
                    inner: self.build_type_argument(node, name, 0)?,
                });
            }
        }

        if name == "Array" {
            let inner = match arity {
                1 | 2 => self.build_type_argument(node, name, 0)?,
                _ => return unknown_type_variant(node, name),
            };

            let length = match node.children.get(1) {
                // A length written as an identifier was parsed as a type name
                Some(length) if length.kind == CstKind::TypeName && length.children.is_empty() => {
                    Some(self.push(
                        length.span,
                        NodeKind::Expression(Expression::Name(Identifier {
                            name: text(length, "identifier text")?.to_string(),
                            span: length.span,
                        })),
                    ))
                }
                Some(length) if length.kind.is_expression() => Some(self.build_expression(length)?),
                Some(_) => return unknown_type_variant(node, name),
                None => None,
            };

            return Ok(TypeExpression::Array { inner, length });
        }

        if let Some(kind) = SamplerKind::from_type_name(name) {
            expects(0)?;

            return Ok(TypeExpression::Sampler(kind));
        }

        if let Some(kind) = TextureKind::from_type_name(name) {
            if kind.takes_sampled_type() {
                expects(1)?;

                return Ok(TypeExpression::Texture {
                    kind,
                    sampled: Some(self.build_type_argument(node, name, 0)?),
                    format: None,
                    access: None,
                });
            }

            if kind.is_storage() {
                expects(2)?;

                return Ok(TypeExpression::Texture {
                    kind,
                    sampled: None,
                    format: Some(Self::identifier_argument(node, name, 0)?),
                    access: Some(Self::identifier_argument(node, name, 1)?),
                });
            }

            expects(0)?;

            return Ok(TypeExpression::Texture {
                kind,
                sampled: None,
                format: None,
                access: None,
            });
        }

        // Anything else must be a user declared type, resolved during validation
        expects(0)?;

        Ok(TypeExpression::Named(Identifier {
            name: name.to_string(),
            span: node.span,
        }))
    }

    fn build_expression(&mut self, node: &cst::Node) -> Result<NodeId, Fatal> {
        let expression = match node.kind {
            CstKind::Literal => Expression::Literal(text(node, "literal text")?.to_string()),
            CstKind::NameExpression => Expression::Name(Identifier {
                name: text(node, "a name")?.to_string(),
                span: node.span,
            }),
            CstKind::BinaryExpression => {
                let Ok(operator) = text(node, "an operator")?.parse::<BinaryOperatorKind>() else {
                    return malformed(node, "a binary operator");
                };

                Expression::Binary {
                    operator,
                    lhs: self.build_expression(child(node, 0, "a left operand")?)?,
                    rhs: self.build_expression(child(node, 1, "a right operand")?)?,
                }
            }
            CstKind::UnaryExpression => {
                let Ok(operator) = text(node, "an operator")?.parse::<UnaryOperatorKind>() else {
                    return malformed(node, "a unary operator");
                };

                Expression::Unary {
                    operator,
                    operand: self.build_expression(child(node, 0, "an operand")?)?,
                }
            }
            CstKind::IndexExpression => Expression::Index {
                base: self.build_expression(child(node, 0, "an indexed expression")?)?,
                index: self.build_expression(child(node, 1, "an index")?)?,
            },
            CstKind::MemberExpression => Expression::Member {
                base: self.build_expression(child(node, 0, "an accessed expression")?)?,
                property: trailing_identifier(node)?,
            },
            CstKind::EnumValueExpression => Expression::EnumValue {
                enumeration: identifier(child(node, 0, "an enum name")?)?,
                member: identifier(child(node, 1, "a member name")?)?,
            },
            CstKind::CallExpression => Expression::Call {
                function: leading_identifier(node)?,
                arguments: node
                    .children
                    .iter()
                    .map(|argument| self.build_expression(argument))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            CstKind::NewExpression => {
                let ty = self.build_type(child(node, 0, "a constructed type")?)?;
                let arguments = node.children[1..]
                    .iter()
                    .map(|argument| self.build_expression(argument))
                    .collect::<Result<Vec<_>, _>>()?;

                Expression::New { ty, arguments }
            }
            CstKind::GroupingExpression => {
                Expression::Grouping(self.build_expression(child(node, 0, "an inner expression")?)?)
            }
            _ => return malformed(node, "an expression"),
        };

        Ok(self.push(node.span, NodeKind::Expression(expression)))
    }

    fn build_block(&mut self, node: &cst::Node) -> Result<NodeId, Fatal> {
        if node.kind != CstKind::Block {
            return malformed(node, "a block");
        }

        self.build_statement(node)
    }

    fn build_statement(&mut self, node: &cst::Node) -> Result<NodeId, Fatal> {
        let statement = match node.kind {
            CstKind::VariableDeclaration => Statement::Declaration(
                self.build_declaration(node, DeclarationScope::Function)?,
            ),
            CstKind::Block => Statement::Block(
                node.children
                    .iter()
                    .map(|statement| self.build_statement(statement))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            CstKind::ExpressionStatement => {
                Statement::Expression(self.build_expression(child(node, 0, "an expression")?)?)
            }
            CstKind::AssignmentStatement => {
                let operator = match text(node, "an assignment operator")? {
                    "=" => None,
                    compound => {
                        let Some(Ok(operator)) = compound
                            .strip_suffix('=')
                            .map(str::parse::<BinaryOperatorKind>)
                        else {
                            return malformed(node, "an assignment operator");
                        };

                        Some(operator)
                    }
                };

                Statement::Assignment {
                    operator,
                    target: self.build_expression(child(node, 0, "an assignment target")?)?,
                    value: self.build_expression(child(node, 1, "an assigned value")?)?,
                }
            }
            CstKind::IfStatement => {
                let condition = self.build_expression(child(node, 0, "a condition")?)?;
                let positive = self.build_block(child(node, 1, "a block")?)?;
                let negative = match node.children.get(2) {
                    Some(negative)
                        if matches!(negative.kind, CstKind::Block | CstKind::IfStatement) =>
                    {
                        Some(self.build_statement(negative)?)
                    }
                    Some(_) => return malformed(node, "an else block"),
                    None => None,
                };

                Statement::If {
                    condition,
                    positive,
                    negative,
                }
            }
            CstKind::WhileStatement => Statement::While {
                condition: self.build_expression(child(node, 0, "a condition")?)?,
                body: self.build_block(child(node, 1, "a body")?)?,
            },
            CstKind::ForStatement => {
                let mut initializer = None;
                let mut condition = None;
                let mut update = None;
                let mut body = None;

                for part in &node.children {
                    match part.kind {
                        CstKind::ForInitializer => {
                            initializer =
                                Some(self.build_statement(child(part, 0, "an initializer")?)?)
                        }
                        CstKind::ForCondition => {
                            condition =
                                Some(self.build_expression(child(part, 0, "a condition")?)?)
                        }
                        CstKind::ForUpdate => {
                            update = Some(self.build_statement(child(part, 0, "an update")?)?)
                        }
                        CstKind::Block => body = Some(self.build_block(part)?),
                        _ => return malformed(node, "for loop clauses"),
                    }
                }

                let Some(body) = body else {
                    return malformed(node, "a body");
                };

                Statement::For {
                    initializer,
                    condition,
                    update,
                    body,
                }
            }
            CstKind::SwitchStatement => {
                let selector = self.build_expression(child(node, 0, "a selector")?)?;
                let mut cases = Vec::new();

                for case in &node.children[1..] {
                    if case.kind != CstKind::SwitchCase {
                        return malformed(node, "switch cases");
                    }

                    let Some((body, selectors)) = case.children.split_last() else {
                        return malformed(case, "a body");
                    };

                    let is_default = text(case, "case or default")? == "default";

                    cases.push(SwitchCase {
                        span: case.span,
                        selectors: selectors
                            .iter()
                            .map(|selector| self.build_expression(selector))
                            .collect::<Result<Vec<_>, _>>()?,
                        is_default,
                        body: self.build_block(body)?,
                    });
                }

                Statement::Switch { selector, cases }
            }
            CstKind::ReturnStatement => Statement::Return(match node.children.first() {
                Some(value) => Some(self.build_expression(value)?),
                None => None,
            }),
            CstKind::BreakStatement => Statement::Break,
            CstKind::ContinueStatement => Statement::Continue,
            CstKind::DiscardStatement => Statement::Discard,
            _ => return malformed(node, "a statement"),
        };

        Ok(self.push(node.span, NodeKind::Statement(statement)))
    }
}
