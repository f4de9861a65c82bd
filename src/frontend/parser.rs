use tracing::debug;

use crate::{
    error::Fatal,
    frontend::{
        SourceFile,
        cst::{Node, NodeKind},
        lexer::{Keyword, Lexer, Span, Token, TokenKind},
    },
};

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
}

impl<'source> Parser<'source> {
    pub fn parse_module(source_file: &'source SourceFile) -> Result<Node, Fatal> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
        };

        let mut module = Node::new(
            NodeKind::Module,
            Span::new(0, source_file.contents.len()),
        );

        while parser.lexer.peek()?.is_some() {
            module.push(parser.parse_declaration()?);
        }

        debug!(
            origin = %source_file.origin,
            declarations = module.children.len(),
            "parsed module"
        );

        Ok(module)
    }

    fn report_syntax_error<T>(&self, offending_span: Span, message: String) -> Result<T, Fatal> {
        Err(Fatal::Syntax {
            message,
            span: offending_span,
        })
    }

    fn eof_span(&self) -> Span {
        let end = self.lexer.source().contents.len();
        Span::new(end, end)
    }

    fn text(&self, token: &Token) -> String {
        self.lexer.source().value_of_span(token.span).to_string()
    }

    fn expect_peek(&mut self, expecting: &str) -> Result<Token, Fatal> {
        let Some(token) = self.lexer.peek()? else {
            return self.report_syntax_error(
                self.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            );
        };

        Ok(token)
    }

    fn expect_next(&mut self, expecting: &str) -> Result<Token, Fatal> {
        let Some(token) = self.lexer.next()? else {
            return self.report_syntax_error(
                self.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            );
        };

        Ok(token)
    }

    fn expect_next_to_be(&mut self, kind: TokenKind) -> Result<Token, Fatal> {
        let token = self.expect_next(&format!("{kind:?}"))?;

        if token.kind != kind {
            return self.report_syntax_error(
                token.span,
                format!(
                    "Expected {:?} but found {:?} ({})",
                    kind,
                    token.kind,
                    self.text(&token)
                ),
            );
        }

        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, Fatal> {
        self.expect_next_to_be(TokenKind::Keyword(keyword))
    }

    fn peek_is(&mut self, kind: TokenKind) -> Result<bool, Fatal> {
        Ok(self.lexer.peek()?.is_some_and(|t| t.kind == kind))
    }

    /// Consumes the next token if it is of the given kind
    fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>, Fatal> {
        if self.peek_is(kind)? {
            return self.lexer.next();
        }

        Ok(None)
    }

    // main
    fn parse_name(&mut self) -> Result<Node, Fatal> {
        let token = self.expect_next_to_be(TokenKind::Identifier)?;

        Ok(Node::new(NodeKind::Name, token.span).with_text(self.text(&token)))
    }

    // @group(0) @binding(1)
    fn parse_attribute_list(&mut self) -> Result<Node, Fatal> {
        let start = self.expect_peek("attribute or declaration")?.span.start;
        let mut list = Node::new(NodeKind::AttributeList, Span::new(start, start));

        while let Some(at) = self.eat(TokenKind::At)? {
            let name = self.expect_next_to_be(TokenKind::Identifier)?;
            let mut attribute =
                Node::new(NodeKind::Attribute, at.span.to(name.span)).with_text(self.text(&name));

            if self.peek_is(TokenKind::OpenParen)? {
                let (arguments, span) = self.parse_argument_list()?;
                attribute.children = arguments;
                attribute.span = attribute.span.to(span);
            }

            list.span = list.span.to(attribute.span);
            list.push(attribute);
        }

        Ok(list)
    }

    fn parse_declaration(&mut self) -> Result<Node, Fatal> {
        let attributes = self.parse_attribute_list()?;
        let peeked = self.expect_peek("declaration")?;

        match peeked.kind {
            kind if kind.is_declaration_keyword() => {
                self.parse_variable_declaration(attributes, true)
            }
            TokenKind::Keyword(Keyword::Fn) => self.parse_function_declaration(attributes),
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct_declaration(attributes),
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum_declaration(attributes),
            TokenKind::Keyword(Keyword::Alias) => self.parse_alias_declaration(attributes),
            _ => self.report_syntax_error(
                peeked.span,
                format!(
                    "Expected declaration in module but found: {} ({:?})",
                    self.text(&peeked),
                    peeked.kind
                ),
            ),
        }
    }

    /// storage name: type = initializer;
    fn parse_variable_declaration(
        &mut self,
        attributes: Node,
        terminated: bool,
    ) -> Result<Node, Fatal> {
        let keyword = self.expect_next("declaration keyword")?;

        if !keyword.kind.is_declaration_keyword() {
            return self.report_syntax_error(
                keyword.span,
                format!("Expected declaration keyword but found {}", self.text(&keyword)),
            );
        }

        let name = self.parse_name()?;
        let mut span = keyword.span.to(name.span);
        let mut children = vec![attributes, name];

        if let Some(colon) = self.eat(TokenKind::Colon)? {
            let ty = self.parse_type()?;
            span = span.to(ty.span);
            children.push(Node::new(NodeKind::TypeAnnotation, colon.span.to(ty.span)).with_children(vec![ty]));
        }

        if let Some(equals) = self.eat(TokenKind::Equals)? {
            let initializer = self.parse_expression()?;
            span = span.to(initializer.span);
            children.push(
                Node::new(NodeKind::Initializer, equals.span.to(initializer.span))
                    .with_children(vec![initializer]),
            );
        }

        if terminated {
            span = span.to(self.expect_next_to_be(TokenKind::Semicolon)?.span);
        }

        Ok(Node::new(NodeKind::VariableDeclaration, span)
            .with_text(self.text(&keyword))
            .with_children(children))
    }

    /// fn name(param: ty) -> @location(0) return_type {}
    fn parse_function_declaration(&mut self, attributes: Node) -> Result<Node, Fatal> {
        let fn_keyword = self.expect_keyword(Keyword::Fn)?;
        let name = self.parse_name()?;
        let parameters = self.parse_parameter_list()?;

        let mut children = vec![attributes, name, parameters];

        if let Some(arrow) = self.eat(TokenKind::Arrow)? {
            let return_attributes = self.parse_attribute_list()?;
            let ty = self.parse_type()?;

            children.push(
                Node::new(NodeKind::ReturnType, arrow.span.to(ty.span))
                    .with_children(vec![return_attributes, ty]),
            );
        }

        let body = self.parse_block()?;
        let span = fn_keyword.span.to(body.span);
        children.push(body);

        Ok(Node::new(NodeKind::FunctionDeclaration, span).with_children(children))
    }

    // (@builtin(position) position: Vector4<Float32>, uv: Vector2<Float32>)
    fn parse_parameter_list(&mut self) -> Result<Node, Fatal> {
        let open_paren = self.expect_next_to_be(TokenKind::OpenParen)?;
        let mut list = Node::new(NodeKind::ParameterList, open_paren.span);

        // If the next token is not a closing paren, try parsing parameters
        if self.expect_peek("function parameter or closing paren")?.kind != TokenKind::CloseParen {
            list.push(self.parse_parameter()?);

            // While the next token is a comma try and parse more parameters
            while self.eat(TokenKind::Comma)?.is_some() {
                if self.peek_is(TokenKind::CloseParen)? {
                    break;
                }

                list.push(self.parse_parameter()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen)?;
        list.span = list.span.to(close_paren.span);

        Ok(list)
    }

    // @location(0) uv: Vector2<Float32>
    fn parse_parameter(&mut self) -> Result<Node, Fatal> {
        self.parse_typed_name(NodeKind::Parameter)
    }

    /// Shared shape of parameters and struct properties
    fn parse_typed_name(&mut self, kind: NodeKind) -> Result<Node, Fatal> {
        let attributes = self.parse_attribute_list()?;
        let name = self.parse_name()?;
        let colon = self.expect_next_to_be(TokenKind::Colon)?;
        let ty = self.parse_type()?;

        let start = if attributes.children.is_empty() {
            name.span
        } else {
            attributes.span
        };
        let annotation =
            Node::new(NodeKind::TypeAnnotation, colon.span.to(ty.span)).with_children(vec![ty]);

        Ok(Node::new(kind, start.to(annotation.span))
            .with_children(vec![attributes, name, annotation]))
    }

    /// struct Light { position: Vector3<Float32>, color: Vector3<Float32> }
    fn parse_struct_declaration(&mut self, attributes: Node) -> Result<Node, Fatal> {
        let struct_keyword = self.expect_keyword(Keyword::Struct)?;
        let name = self.parse_name()?;
        let mut children = vec![attributes, name];

        self.expect_next_to_be(TokenKind::OpenBrace)?;

        while !self.peek_is(TokenKind::CloseBrace)? {
            children.push(self.parse_typed_name(NodeKind::Property)?);

            if self.eat(TokenKind::Comma)?.is_none() {
                break;
            }
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace)?;

        Ok(
            Node::new(NodeKind::StructDeclaration, struct_keyword.span.to(close_brace.span))
                .with_children(children),
        )
    }

    /// enum Mode { Fast = 0u, Slow = 1u }
    fn parse_enum_declaration(&mut self, attributes: Node) -> Result<Node, Fatal> {
        let enum_keyword = self.expect_keyword(Keyword::Enum)?;
        let name = self.parse_name()?;
        let mut children = vec![attributes, name];

        self.expect_next_to_be(TokenKind::OpenBrace)?;

        while !self.peek_is(TokenKind::CloseBrace)? {
            let member_name = self.parse_name()?;
            let equals = self.expect_next_to_be(TokenKind::Equals)?;
            let value = self.parse_expression()?;

            let initializer = Node::new(NodeKind::Initializer, equals.span.to(value.span))
                .with_children(vec![value]);

            children.push(
                Node::new(NodeKind::EnumMember, member_name.span.to(initializer.span))
                    .with_children(vec![member_name, initializer]),
            );

            if self.eat(TokenKind::Comma)?.is_none() {
                break;
            }
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace)?;

        Ok(
            Node::new(NodeKind::EnumDeclaration, enum_keyword.span.to(close_brace.span))
                .with_children(children),
        )
    }

    /// alias Color = Vector4<Float32>;
    fn parse_alias_declaration(&mut self, attributes: Node) -> Result<Node, Fatal> {
        let alias_keyword = self.expect_keyword(Keyword::Alias)?;
        let name = self.parse_name()?;
        let equals = self.expect_next_to_be(TokenKind::Equals)?;
        let ty = self.parse_type()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

        let annotation =
            Node::new(NodeKind::TypeAnnotation, equals.span.to(ty.span)).with_children(vec![ty]);

        Ok(
            Node::new(NodeKind::AliasDeclaration, alias_keyword.span.to(semicolon.span))
                .with_children(vec![attributes, name, annotation]),
        )
    }

    // type         = "*" type
    //              | IDENTIFIER ( "<" template_arg ( "," template_arg )* ">" )?
    // template_arg = type | term_expression
    fn parse_type(&mut self) -> Result<Node, Fatal> {
        let peeked = self.expect_peek("type")?;

        if peeked.kind == TokenKind::Asterisk {
            let asterisk = self.expect_next_to_be(TokenKind::Asterisk)?;
            let inner = self.parse_type()?;

            return Ok(Node::new(NodeKind::PointerType, asterisk.span.to(inner.span))
                .with_children(vec![inner]));
        }

        let name = self.expect_next_to_be(TokenKind::Identifier)?;
        let mut ty = Node::new(NodeKind::TypeName, name.span).with_text(self.text(&name));

        if self.eat(TokenKind::LessThan)?.is_some() {
            loop {
                let peeked = self.expect_peek("template argument")?;

                let argument = match peeked.kind {
                    TokenKind::Identifier | TokenKind::Asterisk => self.parse_type()?,
                    // Comparisons and shifts would swallow the closing `>`
                    _ => self.parse_term_expression()?,
                };

                ty.push(argument);

                if self.eat(TokenKind::Comma)?.is_none() {
                    break;
                }
            }

            let close = self.expect_template_close()?;
            ty.span = ty.span.to(close);
        }

        Ok(ty)
    }

    /// Consumes a `>` closing a template list. Tokens which merely start with
    /// `>` are split and their remainder is put back.
    fn expect_template_close(&mut self) -> Result<Span, Fatal> {
        let token = self.expect_next("closing angle bracket")?;

        let remainder = match token.kind {
            TokenKind::GreaterThan => None,
            TokenKind::ShiftRight => Some(TokenKind::GreaterThan),
            TokenKind::GreaterThanOrEqualTo => Some(TokenKind::Equals),
            TokenKind::ShiftRightEquals => Some(TokenKind::GreaterThanOrEqualTo),
            _ => {
                return self.report_syntax_error(
                    token.span,
                    format!(
                        "Expected closing angle bracket but found {:?} ({})",
                        token.kind,
                        self.text(&token)
                    ),
                );
            }
        };

        if let Some(kind) = remainder {
            self.lexer.push_front(Token {
                kind,
                span: Span::new(token.span.start + 1, token.span.end),
            });
        }

        Ok(Span::new(token.span.start, token.span.start + 1))
    }

    // "{" ( statement )* "}"
    fn parse_block(&mut self) -> Result<Node, Fatal> {
        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace)?;
        let mut block = Node::new(NodeKind::Block, open_brace.span);

        while self.expect_peek("statement or closing brace")?.kind != TokenKind::CloseBrace {
            block.push(self.parse_statement()?);
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace)?;
        block.span = block.span.to(close_brace.span);

        Ok(block)
    }

    fn parse_statement(&mut self) -> Result<Node, Fatal> {
        let peeked = self.expect_peek("statement")?;

        match peeked.kind {
            kind if kind.is_declaration_keyword() => {
                let attributes = Node::new(
                    NodeKind::AttributeList,
                    Span::new(peeked.span.start, peeked.span.start),
                );
                self.parse_variable_declaration(attributes, true)
            }
            TokenKind::OpenBrace => self.parse_block(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            TokenKind::Keyword(Keyword::Return) => {
                let return_keyword = self.expect_keyword(Keyword::Return)?;
                let mut statement = Node::new(NodeKind::ReturnStatement, return_keyword.span);

                if !self.peek_is(TokenKind::Semicolon)? {
                    statement.push(self.parse_expression()?);
                }

                let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;
                statement.span = statement.span.to(semicolon.span);

                Ok(statement)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.parse_keyword_statement(Keyword::Break, NodeKind::BreakStatement)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.parse_keyword_statement(Keyword::Continue, NodeKind::ContinueStatement)
            }
            TokenKind::Keyword(Keyword::Discard) => {
                self.parse_keyword_statement(Keyword::Discard, NodeKind::DiscardStatement)
            }
            _ => {
                let mut statement = self.parse_simple_statement()?;
                let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;
                statement.span = statement.span.to(semicolon.span);

                Ok(statement)
            }
        }
    }

    // break;
    fn parse_keyword_statement(&mut self, keyword: Keyword, kind: NodeKind) -> Result<Node, Fatal> {
        let keyword = self.expect_keyword(keyword)?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

        Ok(Node::new(kind, keyword.span.to(semicolon.span)))
    }

    /// Assignment or bare expression without the trailing semicolon
    fn parse_simple_statement(&mut self) -> Result<Node, Fatal> {
        let target = self.parse_expression()?;

        if self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_assignment_operator())
        {
            let operator = self.expect_next("assignment operator")?;
            let value = self.parse_expression()?;

            return Ok(Node::new(NodeKind::AssignmentStatement, target.span.to(value.span))
                .with_text(self.text(&operator))
                .with_children(vec![target, value]));
        }

        Ok(Node::new(NodeKind::ExpressionStatement, target.span).with_children(vec![target]))
    }

    /// "if" expression BLOCK ( "else" ( if | BLOCK ) )?
    fn parse_if_statement(&mut self) -> Result<Node, Fatal> {
        let if_keyword = self.expect_keyword(Keyword::If)?;
        let condition = self.parse_expression()?;
        let positive = self.parse_block()?;

        let mut span = if_keyword.span.to(positive.span);
        let mut children = vec![condition, positive];

        if self.eat(TokenKind::Keyword(Keyword::Else))?.is_some() {
            let peeked = self.expect_peek("if keyword or opening brace")?;

            let negative = match peeked.kind {
                TokenKind::Keyword(Keyword::If) => self.parse_if_statement()?,
                TokenKind::OpenBrace => self.parse_block()?,
                _ => {
                    return self.report_syntax_error(
                        peeked.span,
                        format!(
                            "Expected if statement or block after else keyword but found {:?} ({})",
                            peeked.kind,
                            self.text(&peeked)
                        ),
                    );
                }
            };

            span = span.to(negative.span);
            children.push(negative);
        }

        Ok(Node::new(NodeKind::IfStatement, span).with_children(children))
    }

    /// "while" expression BLOCK
    fn parse_while_statement(&mut self) -> Result<Node, Fatal> {
        let while_keyword = self.expect_keyword(Keyword::While)?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(Node::new(NodeKind::WhileStatement, while_keyword.span.to(body.span))
            .with_children(vec![condition, body]))
    }

    /// "for" "(" initializer? ";" condition? ";" update? ")" BLOCK
    fn parse_for_statement(&mut self) -> Result<Node, Fatal> {
        let for_keyword = self.expect_keyword(Keyword::For)?;
        self.expect_next_to_be(TokenKind::OpenParen)?;

        let mut children = Vec::new();

        let peeked = self.expect_peek("for loop initializer or semicolon")?;
        if peeked.kind != TokenKind::Semicolon {
            let initializer = if peeked.kind.is_declaration_keyword() {
                let attributes = Node::new(
                    NodeKind::AttributeList,
                    Span::new(peeked.span.start, peeked.span.start),
                );
                self.parse_variable_declaration(attributes, false)?
            } else {
                self.parse_simple_statement()?
            };

            children.push(
                Node::new(NodeKind::ForInitializer, initializer.span)
                    .with_children(vec![initializer]),
            );
        }
        self.expect_next_to_be(TokenKind::Semicolon)?;

        if !self.peek_is(TokenKind::Semicolon)? {
            let condition = self.parse_expression()?;
            children.push(
                Node::new(NodeKind::ForCondition, condition.span).with_children(vec![condition]),
            );
        }
        self.expect_next_to_be(TokenKind::Semicolon)?;

        if !self.peek_is(TokenKind::CloseParen)? {
            let update = self.parse_simple_statement()?;
            children.push(Node::new(NodeKind::ForUpdate, update.span).with_children(vec![update]));
        }
        self.expect_next_to_be(TokenKind::CloseParen)?;

        let body = self.parse_block()?;
        let span = for_keyword.span.to(body.span);
        children.push(body);

        Ok(Node::new(NodeKind::ForStatement, span).with_children(children))
    }

    /// "switch" expression "{" ( ( "case" expression ( "," expression )* | "default" ) ":" BLOCK )* "}"
    fn parse_switch_statement(&mut self) -> Result<Node, Fatal> {
        let switch_keyword = self.expect_keyword(Keyword::Switch)?;
        let selector = self.parse_expression()?;
        let mut children = vec![selector];

        self.expect_next_to_be(TokenKind::OpenBrace)?;

        while !self.peek_is(TokenKind::CloseBrace)? {
            let keyword = self.expect_next("case or default keyword")?;
            let mut case = Node::new(NodeKind::SwitchCase, keyword.span);

            match keyword.kind {
                TokenKind::Keyword(Keyword::Case) => {
                    case.text = Some("case".to_string());
                    case.push(self.parse_expression()?);

                    while self.eat(TokenKind::Comma)?.is_some() {
                        if self.peek_is(TokenKind::Colon)? {
                            break;
                        }

                        case.push(self.parse_expression()?);
                    }
                }
                TokenKind::Keyword(Keyword::Default) => {
                    case.text = Some("default".to_string());
                }
                _ => {
                    return self.report_syntax_error(
                        keyword.span,
                        format!(
                            "Expected case or default keyword but found {:?} ({})",
                            keyword.kind,
                            self.text(&keyword)
                        ),
                    );
                }
            }

            self.expect_next_to_be(TokenKind::Colon)?;

            let body = self.parse_block()?;
            case.span = case.span.to(body.span);
            case.push(body);

            children.push(case);
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace)?;

        Ok(Node::new(NodeKind::SwitchStatement, switch_keyword.span.to(close_brace.span))
            .with_children(children))
    }

    /// expression     -> logical_or
    /// logical_or     -> logical_and ( "||" logical_and )*
    /// logical_and    -> comparison ( "&&" comparison )*
    /// comparison     -> bitwise_or ( ( "!=" | "==" | "<" | "<=" | ">" | ">=" ) bitwise_or )*
    /// bitwise_or     -> bitwise_xor ( "|" bitwise_xor )*
    /// bitwise_xor    -> bitwise_and ( "^" bitwise_and )*
    /// bitwise_and    -> bit_shift ( "&" bit_shift )*
    /// bit_shift      -> term ( ( "<<" | ">>" ) term )*
    /// term           -> factor ( ( "-" | "+" ) factor )*
    /// factor         -> unary ( ( "/" | "*" | "%" ) unary )*
    /// unary          -> ( "!" | "~" | "-" | "*" | "&" ) unary
    ///                   | postfix
    /// postfix        -> atom ( "[" expression "]" | "." IDENTIFIER )*
    /// atom           -> IDENTIFIER ( "(" arguments ")" | "::" IDENTIFIER )?
    ///                   | NUMBER | STRING | BOOL
    ///                   | "new" type "(" arguments ")"
    ///                   | "(" expression ")"
    fn parse_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_logical_or_expression()
    }

    /// Parses one left-associative precedence level
    fn parse_binary_level(
        &mut self,
        is_operator: impl Fn(TokenKind) -> bool,
        mut parse_operand: impl FnMut(&mut Self) -> Result<Node, Fatal>,
    ) -> Result<Node, Fatal> {
        let mut expression = parse_operand(self)?;

        while self.lexer.peek()?.is_some_and(|t| is_operator(t.kind)) {
            let operator = self.expect_next("binary operator")?;
            let rhs = parse_operand(self)?;

            expression = Node::new(NodeKind::BinaryExpression, expression.span.to(rhs.span))
                .with_text(self.text(&operator))
                .with_children(vec![expression, rhs]);
        }

        Ok(expression)
    }

    fn parse_logical_or_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind == TokenKind::LogicalOr,
            Self::parse_logical_and_expression,
        )
    }

    fn parse_logical_and_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind == TokenKind::LogicalAnd,
            Self::parse_comparison_expression,
        )
    }

    fn parse_comparison_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind.is_comparison_operator(),
            Self::parse_bitwise_or_expression,
        )
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind == TokenKind::BitwiseOr,
            Self::parse_bitwise_xor_expression,
        )
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind == TokenKind::BitwiseXor,
            Self::parse_bitwise_and_expression,
        )
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind == TokenKind::Ampersand,
            Self::parse_bit_shift_expression,
        )
    }

    fn parse_bit_shift_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind.is_bit_shift_operator(),
            Self::parse_term_expression,
        )
    }

    fn parse_term_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind.is_term_operator(),
            Self::parse_factor_expression,
        )
    }

    fn parse_factor_expression(&mut self) -> Result<Node, Fatal> {
        self.parse_binary_level(
            |kind| kind.is_factor_operator(),
            Self::parse_unary_expression,
        )
    }

    fn parse_unary_expression(&mut self) -> Result<Node, Fatal> {
        let peeked = self.expect_peek("expression")?;

        if peeked.kind.is_unary_operator() {
            let operator = self.expect_next("unary operator")?;
            let operand = self.parse_unary_expression()?;

            return Ok(Node::new(NodeKind::UnaryExpression, operator.span.to(operand.span))
                .with_text(self.text(&operator))
                .with_children(vec![operand]));
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> Result<Node, Fatal> {
        let mut expression = self.parse_atomic_expression()?;

        loop {
            if self.eat(TokenKind::OpenBracket)?.is_some() {
                let index = self.parse_expression()?;
                let close_bracket = self.expect_next_to_be(TokenKind::CloseBracket)?;

                expression = Node::new(
                    NodeKind::IndexExpression,
                    expression.span.to(close_bracket.span),
                )
                .with_children(vec![expression, index]);
            } else if self.eat(TokenKind::Dot)?.is_some() {
                let property = self.expect_next_to_be(TokenKind::Identifier)?;

                expression = Node::new(NodeKind::MemberExpression, expression.span.to(property.span))
                    .with_text(self.text(&property))
                    .with_children(vec![expression]);
            } else {
                return Ok(expression);
            }
        }
    }

    // (a, b, c)
    fn parse_argument_list(&mut self) -> Result<(Vec<Node>, Span), Fatal> {
        let mut arguments = Vec::new();

        let open_paren = self.expect_next_to_be(TokenKind::OpenParen)?;

        if self.expect_peek("argument or closing paren")?.kind != TokenKind::CloseParen {
            arguments.push(self.parse_expression()?);

            while self.eat(TokenKind::Comma)?.is_some() {
                if self.peek_is(TokenKind::CloseParen)? {
                    break;
                }

                arguments.push(self.parse_expression()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen)?;

        Ok((arguments, open_paren.span.to(close_paren.span)))
    }

    fn parse_atomic_expression(&mut self) -> Result<Node, Fatal> {
        let token = self.expect_next("expression")?;

        match token.kind {
            kind if kind.is_literal() => {
                Ok(Node::new(NodeKind::Literal, token.span).with_text(self.text(&token)))
            }
            TokenKind::Identifier => {
                let name = self.text(&token);

                // Function call
                if self.peek_is(TokenKind::OpenParen)? {
                    let (arguments, span) = self.parse_argument_list()?;

                    return Ok(Node::new(NodeKind::CallExpression, token.span.to(span))
                        .with_text(name)
                        .with_children(arguments));
                }

                // Enum value
                if self.eat(TokenKind::DoubleColon)?.is_some() {
                    let member = self.parse_name()?;
                    let enumeration = Node::new(NodeKind::Name, token.span).with_text(name);

                    return Ok(Node::new(
                        NodeKind::EnumValueExpression,
                        token.span.to(member.span),
                    )
                    .with_children(vec![enumeration, member]));
                }

                Ok(Node::new(NodeKind::NameExpression, token.span).with_text(name))
            }
            TokenKind::Keyword(Keyword::New) => {
                let ty = self.parse_type()?;
                let (arguments, span) = self.parse_argument_list()?;

                let mut children = vec![ty];
                children.extend(arguments);

                Ok(Node::new(NodeKind::NewExpression, token.span.to(span)).with_children(children))
            }
            TokenKind::OpenParen => {
                let expression = self.parse_expression()?;
                let close_paren = self.expect_next_to_be(TokenKind::CloseParen)?;

                Ok(Node::new(NodeKind::GroupingExpression, token.span.to(close_paren.span))
                    .with_children(vec![expression]))
            }
            kind => self.report_syntax_error(
                token.span,
                format!(
                    "Expected expression but found {:?} ({})",
                    kind,
                    self.text(&token)
                ),
            ),
        }
    }
}
