use std::{
    collections::{BTreeMap, VecDeque},
    str::Chars,
};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::{Display, EnumString};

use crate::{error::Fatal, frontend::SourceFile};

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // fn
    Identifier,       // main

    /* Literals */
    BooleanLiteral, // true
    IntegerLiteral, // 1, 0xff, 3u
    FloatLiteral,   // 1.0, 2e3, 0.5h
    StringLiteral,  // "read_write"

    /* Delimiters */
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]
    OpenBrace,    // {
    CloseBrace,   // }
    Semicolon,    // ;
    Comma,        // ,

    /* Other */
    Colon,       // :
    DoubleColon, // ::
    Arrow,       // ->
    At,          // @
    Dot,         // .

    /* Unary Ops */
    Bang,  // !
    Tilde, // ~

    /* Unary + Binary Ops */
    Asterisk,  // *
    Minus,     // -
    Ampersand, // &

    /* Binary Ops */
    Plus,                 // +
    Divide,               // /
    Modulus,              // %
    LogicalAnd,           // &&
    LogicalOr,            // ||
    BitwiseXor,           // ^
    BitwiseOr,            // |
    ShiftLeft,            // <<
    ShiftRight,           // >>
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals,           // =
    PlusEquals,       // +=
    MinusEquals,      // -=
    MultiplyEquals,   // *=
    DivideEquals,     // /=
    ModulusEquals,    // %=
    BitwiseXorEquals, // ^=
    BitwiseAndEquals, // &=
    BitwiseOrEquals,  // |=
    ShiftLeftEquals,  // <<=
    ShiftRightEquals, // >>=
}

impl TokenKind {
    pub fn is_assignment_operator(&self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::PlusEquals
                | Self::MinusEquals
                | Self::MultiplyEquals
                | Self::DivideEquals
                | Self::ModulusEquals
                | Self::BitwiseXorEquals
                | Self::BitwiseAndEquals
                | Self::BitwiseOrEquals
                | Self::ShiftLeftEquals
                | Self::ShiftRightEquals
        )
    }

    pub fn is_comparison_operator(&self) -> bool {
        matches!(
            self,
            Self::NotEquals
                | Self::DoubleEquals
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_bit_shift_operator(&self) -> bool {
        matches!(self, Self::ShiftLeft | Self::ShiftRight)
    }

    pub fn is_term_operator(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }

    pub fn is_factor_operator(&self) -> bool {
        matches!(self, Self::Asterisk | Self::Divide | Self::Modulus)
    }

    pub fn is_unary_operator(&self) -> bool {
        matches!(
            self,
            Self::Asterisk | Self::Ampersand | Self::Bang | Self::Tilde | Self::Minus
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::BooleanLiteral | Self::IntegerLiteral | Self::FloatLiteral | Self::StringLiteral
        )
    }

    /// Variable declaration keywords, valid at module or function scope
    pub fn is_declaration_keyword(&self) -> bool {
        matches!(
            self,
            Self::Keyword(
                Keyword::Const
                    | Keyword::Let
                    | Keyword::Storage
                    | Keyword::Uniform
                    | Keyword::Workgroup
                    | Keyword::Private
                    | Keyword::Param
            )
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Const,
    Let,
    Storage,
    Uniform,
    Workgroup,
    Private,
    Param,
    Fn,
    Struct,
    Enum,
    Alias,
    If,
    Else,
    While,
    For,
    Switch,
    Case,
    Default,
    Return,
    Break,
    Continue,
    Discard,
    New,
}

/// Single character tokens, tried once no longer sequence matched
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('[', TokenKind::OpenBracket),
        (']', TokenKind::CloseBracket),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        ('!', TokenKind::Bang),
        ('~', TokenKind::Tilde),
        (':', TokenKind::Colon),
        ('@', TokenKind::At),
        ('.', TokenKind::Dot),
        ('*', TokenKind::Asterisk),
        ('-', TokenKind::Minus),
        ('=', TokenKind::Equals),
        ('+', TokenKind::Plus),
        ('/', TokenKind::Divide),
        ('%', TokenKind::Modulus),
        ('^', TokenKind::BitwiseXor),
        ('&', TokenKind::Ampersand),
        ('|', TokenKind::BitwiseOr),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

/// Numeric literal suffixes (`i`, `u`, `f`, `h`)
const NUMBER_SUFFIXES: [char; 4] = ['i', 'u', 'f', 'h'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            peek_buffer: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &'source SourceFile {
        self.source
    }

    /// Byte offset just past the last consumed character
    pub fn position(&self) -> usize {
        self.position
    }

    fn syntax_error<T>(&self, start: usize, message: String) -> Result<T, Fatal> {
        Err(Fatal::Syntax {
            message,
            span: Span::new(start, self.position.max(start + 1)),
        })
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn ignore_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn ignore_line(&mut self) {
        while self.chars.peek().is_some_and(|c| *c != '\n') {
            self.bump();
        }
    }

    fn read_string(&mut self) -> Result<Token, Fatal> {
        let start_position = self.position;

        // Consume opening quote
        self.bump();

        while let Some(c) = self.bump() {
            match c {
                '\n' => break,
                // Skip whatever is escaped, including quotes
                '\\' => {
                    self.bump();
                }
                '"' => {
                    return Ok(Token {
                        span: self.new_span(start_position),
                        kind: TokenKind::StringLiteral,
                    });
                }
                _ => {}
            }
        }

        self.syntax_error(start_position, "Unterminated string literal".to_string())
    }

    // Keywords and boolean literals share the identifier grammar
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while self
            .chars
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            self.bump();
        }

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = match value {
            "true" | "false" => TokenKind::BooleanLiteral,
            _ => value
                .parse()
                .map_or(TokenKind::Identifier, TokenKind::Keyword),
        };

        Token { kind, span }
    }

    fn read_digits(&mut self) -> usize {
        let mut count = 0;

        while self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }

        count
    }

    // 12, 0x1F, 1.5, .5, 1e-3, 4u, 2.0h
    fn read_number(&mut self) -> Result<Token, Fatal> {
        let start_position = self.position;

        if self.chars.peek() == Some(&'0') && matches!(self.chars.peek_nth(1), Some('x' | 'X')) {
            self.bump();
            self.bump();

            let mut digits = 0;
            while self.chars.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
                digits += 1;
            }

            if digits == 0 {
                return self.syntax_error(
                    start_position,
                    "Hexadecimal literal needs at least one digit".to_string(),
                );
            }

            if matches!(self.chars.peek(), Some('i' | 'u')) {
                self.bump();
            }

            return Ok(Token {
                kind: TokenKind::IntegerLiteral,
                span: self.new_span(start_position),
            });
        }

        let mut kind = TokenKind::IntegerLiteral;

        self.read_digits();

        // `values[0].x` is an index followed by member access, not `0.`
        if self.chars.peek() == Some(&'.')
            && !self
                .chars
                .peek_nth(1)
                .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_')
        {
            kind = TokenKind::FloatLiteral;
            self.bump();
            self.read_digits();
        }

        if matches!(self.chars.peek(), Some('e' | 'E')) {
            let sign_offset = usize::from(matches!(self.chars.peek_nth(1), Some('+' | '-')));

            if self
                .chars
                .peek_nth(1 + sign_offset)
                .is_some_and(|c| c.is_ascii_digit())
            {
                kind = TokenKind::FloatLiteral;
                self.bump();
                if sign_offset == 1 {
                    self.bump();
                }
                self.read_digits();
            }
        }

        if let Some(suffix) = self
            .chars
            .peek()
            .copied()
            .filter(|c| NUMBER_SUFFIXES.contains(c))
        {
            if matches!(suffix, 'f' | 'h') {
                kind = TokenKind::FloatLiteral;
            }
            self.bump();
        }

        if self
            .chars
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            self.bump();
            return self.syntax_error(
                start_position,
                format!(
                    "Invalid numeric literal `{}`",
                    &self.source.contents[start_position..self.position]
                ),
            );
        }

        Ok(Token {
            kind,
            span: self.new_span(start_position),
        })
    }

    fn read_sequence(&mut self, length: usize, kind: TokenKind) -> Token {
        let start_position = self.position;

        for _ in 0..length {
            self.bump();
        }

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    /// Puts a token back in front of the stream. Used by the parser to split
    /// `>>` when it closes two template lists at once.
    pub fn push_front(&mut self, token: Token) {
        self.peek_buffer.push_front(token);
    }

    pub fn peek(&mut self) -> Result<Option<Token>, Fatal> {
        if self.peek_buffer.is_empty() {
            if let Some(token) = self.lex_token()? {
                self.peek_buffer.push_back(token);
            }
        }

        Ok(self.peek_buffer.front().cloned())
    }

    pub fn next(&mut self) -> Result<Option<Token>, Fatal> {
        if let Some(token) = self.peek_buffer.pop_front() {
            return Ok(Some(token));
        }

        self.lex_token()
    }

    fn lex_token(&mut self) -> Result<Option<Token>, Fatal> {
        while let Some(c) = self.chars.peek().copied() {
            let second = self.chars.peek_nth(1).copied();
            let third = self.chars.peek_nth(2).copied();

            let token = match (c, second, third) {
                // Ignore whitespace
                (c, _, _) if c.is_whitespace() => {
                    self.ignore_whitespace();
                    continue;
                }
                // Ignore comments
                ('/', Some('/'), _) => {
                    self.ignore_line();
                    continue;
                }

                ('"', _, _) => self.read_string()?,

                // Integer and float literals
                (n, _, _) if n.is_ascii_digit() => self.read_number()?,
                ('.', Some(n), _) if n.is_ascii_digit() => self.read_number()?,

                // Identifiers, keywords, and boolean literals
                (a, _, _) if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                ('<', Some('<'), Some('=')) => self.read_sequence(3, TokenKind::ShiftLeftEquals),
                ('>', Some('>'), Some('=')) => self.read_sequence(3, TokenKind::ShiftRightEquals),

                ('-', Some('>'), _) => self.read_sequence(2, TokenKind::Arrow),
                (':', Some(':'), _) => self.read_sequence(2, TokenKind::DoubleColon),
                ('=', Some('='), _) => self.read_sequence(2, TokenKind::DoubleEquals),
                ('!', Some('='), _) => self.read_sequence(2, TokenKind::NotEquals),
                ('<', Some('='), _) => self.read_sequence(2, TokenKind::LessThanOrEqualTo),
                ('>', Some('='), _) => self.read_sequence(2, TokenKind::GreaterThanOrEqualTo),
                ('+', Some('='), _) => self.read_sequence(2, TokenKind::PlusEquals),
                ('-', Some('='), _) => self.read_sequence(2, TokenKind::MinusEquals),
                ('*', Some('='), _) => self.read_sequence(2, TokenKind::MultiplyEquals),
                ('/', Some('='), _) => self.read_sequence(2, TokenKind::DivideEquals),
                ('%', Some('='), _) => self.read_sequence(2, TokenKind::ModulusEquals),
                ('&', Some('='), _) => self.read_sequence(2, TokenKind::BitwiseAndEquals),
                ('|', Some('='), _) => self.read_sequence(2, TokenKind::BitwiseOrEquals),
                ('^', Some('='), _) => self.read_sequence(2, TokenKind::BitwiseXorEquals),
                ('<', Some('<'), _) => self.read_sequence(2, TokenKind::ShiftLeft),
                ('>', Some('>'), _) => self.read_sequence(2, TokenKind::ShiftRight),
                ('&', Some('&'), _) => self.read_sequence(2, TokenKind::LogicalAnd),
                ('|', Some('|'), _) => self.read_sequence(2, TokenKind::LogicalOr),

                (s, _, _) => match SINGLE_TOKENS.get(&s) {
                    Some(kind) => self.read_sequence(1, *kind),
                    None => {
                        let start_position = self.position;
                        self.bump();
                        return self.syntax_error(
                            start_position,
                            format!("Unexpected character in stream: `{s}`"),
                        );
                    }
                },
            };

            return Ok(Some(token));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<(TokenKind, String)> {
        let source = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source);
        let mut tokens = Vec::new();

        while let Some(token) = lexer.next().unwrap() {
            tokens.push((token.kind, source.value_of_span(token.span).to_string()));
        }

        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("const storage fn Vector3 discard"),
            vec![
                TokenKind::Keyword(Keyword::Const),
                TokenKind::Keyword(Keyword::Storage),
                TokenKind::Keyword(Keyword::Fn),
                TokenKind::Identifier,
                TokenKind::Keyword(Keyword::Discard),
            ]
        );
    }

    #[test]
    fn test_numeric_literals_with_suffixes() {
        let tokens = lex("5 5.0 3u 7i 1.5h 2f 0x1Fu .25 1e3 2.5e-2");

        assert_eq!(
            tokens,
            vec![
                (TokenKind::IntegerLiteral, "5".to_string()),
                (TokenKind::FloatLiteral, "5.0".to_string()),
                (TokenKind::IntegerLiteral, "3u".to_string()),
                (TokenKind::IntegerLiteral, "7i".to_string()),
                (TokenKind::FloatLiteral, "1.5h".to_string()),
                (TokenKind::FloatLiteral, "2f".to_string()),
                (TokenKind::IntegerLiteral, "0x1Fu".to_string()),
                (TokenKind::FloatLiteral, ".25".to_string()),
                (TokenKind::FloatLiteral, "1e3".to_string()),
                (TokenKind::FloatLiteral, "2.5e-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_member_access_is_not_a_float() {
        assert_eq!(
            kinds("v.xy"),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier]
        );
        assert_eq!(
            kinds("a[0].x"),
            vec![
                TokenKind::Identifier,
                TokenKind::OpenBracket,
                TokenKind::IntegerLiteral,
                TokenKind::CloseBracket,
                TokenKind::Dot,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_multi_character_operators() {
        assert_eq!(
            kinds("<<= >>= -> :: && || == != <= >= += &= >>"),
            vec![
                TokenKind::ShiftLeftEquals,
                TokenKind::ShiftRightEquals,
                TokenKind::Arrow,
                TokenKind::DoubleColon,
                TokenKind::LogicalAnd,
                TokenKind::LogicalOr,
                TokenKind::DoubleEquals,
                TokenKind::NotEquals,
                TokenKind::LessThanOrEqualTo,
                TokenKind::GreaterThanOrEqualTo,
                TokenKind::PlusEquals,
                TokenKind::BitwiseAndEquals,
                TokenKind::ShiftRight,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("let a; // trailing words\n@compute"),
            vec![
                TokenKind::Keyword(Keyword::Let),
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::At,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_string_literal_with_escaped_quote() {
        let tokens = lex(r#""a\"b""#);

        assert_eq!(tokens, vec![(TokenKind::StringLiteral, r#""a\"b""#.to_string())]);
    }

    #[test]
    fn test_unexpected_character_is_a_syntax_error() {
        let source = SourceFile::from_memory("let a = $;");
        let mut lexer = Lexer::new(&source);

        let mut result = Ok(None);
        for _ in 0..5 {
            result = lexer.next();
            if result.is_err() {
                break;
            }
        }

        match result {
            Err(Fatal::Syntax { message, span }) => {
                assert!(message.contains('$'), "{message}");
                assert_eq!(span, Span::new(8, 9));
            }
            other => panic!("expected syntax error, found {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string_is_a_syntax_error() {
        let source = SourceFile::from_memory("\"open");
        let mut lexer = Lexer::new(&source);

        assert!(matches!(lexer.next(), Err(Fatal::Syntax { .. })));
    }
}
