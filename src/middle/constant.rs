//! Literal parsing and evaluation of constant expressions.
//!
//! Evaluation never panics: overflow, division by zero and anything it does
//! not understand simply yield `None`.

use hashbrown::HashMap;

use crate::middle::{
    ast::{
        BinaryOperatorKind, DeclarationKeyword, DeclarationKind, Document, Expression, NodeId,
        TypeExpression, UnaryOperatorKind,
    },
    primitive::NumericKind,
};

/// Guards against runaway recursion through chains of constants
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConstantValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConstantValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ConstantValue::String(value) => Some(value),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            ConstantValue::Integer(value) => Some(*value as f64),
            ConstantValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl core::fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::Integer(value) => write!(f, "{value}"),
            ConstantValue::Float(value) => write!(f, "{value:?}"),
            ConstantValue::String(value) => write!(f, "\"{value}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralType {
    Boolean,
    Numeric(NumericKind),
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLiteral {
    pub value: ConstantValue,
    pub ty: LiteralType,
    /// The digits did not fit into 64 bits and the value was clamped
    saturated: bool,
}

impl ParsedLiteral {
    fn new(value: ConstantValue, ty: LiteralType) -> Self {
        Self {
            value,
            ty,
            saturated: false,
        }
    }

    /// Whether the value is representable in its type
    pub fn is_in_range(&self) -> bool {
        match self.ty {
            LiteralType::Numeric(kind) => !self.saturated && fits_into(&self.value, kind),
            _ => true,
        }
    }
}

/// Whether a value survives conversion to the numeric kind unchanged
pub fn fits_into(value: &ConstantValue, kind: NumericKind) -> bool {
    match (value, kind) {
        (ConstantValue::Integer(value), NumericKind::Int32) => i32::try_from(*value).is_ok(),
        (ConstantValue::Integer(value), NumericKind::UInt32) => u32::try_from(*value).is_ok(),
        (ConstantValue::Integer(_), _) => true,
        (ConstantValue::Float(value), NumericKind::Float32) => {
            value.is_finite() && value.abs() <= f32::MAX as f64
        }
        (ConstantValue::Float(value), NumericKind::Float16) => {
            value.is_finite() && value.abs() <= 65504.0
        }
        (ConstantValue::Float(value), _) => value.is_finite(),
        _ => true,
    }
}

/// Parses the source text of a literal. Unsuffixed numbers get the abstract
/// kinds, `i`, `u`, `f` and `h` pick Int32, UInt32, Float32 and Float16.
pub fn parse_literal(text: &str) -> Option<ParsedLiteral> {
    match text {
        "true" => {
            return Some(ParsedLiteral::new(
                ConstantValue::Boolean(true),
                LiteralType::Boolean,
            ));
        }
        "false" => {
            return Some(ParsedLiteral::new(
                ConstantValue::Boolean(false),
                LiteralType::Boolean,
            ));
        }
        _ => {}
    }

    if let Some(quoted) = text.strip_prefix('"') {
        return Some(ParsedLiteral::new(
            ConstantValue::String(unescape(quoted.strip_suffix('"')?)),
            LiteralType::String,
        ));
    }

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let (digits, kind) = match hex.as_bytes().last()? {
            b'i' => (&hex[..hex.len() - 1], NumericKind::Int32),
            b'u' => (&hex[..hex.len() - 1], NumericKind::UInt32),
            _ => (hex, NumericKind::AbstractInt),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let value = u64::from_str_radix(digits, 16)
            .ok()
            .and_then(|value| i64::try_from(value).ok());

        return Some(ParsedLiteral {
            value: ConstantValue::Integer(value.unwrap_or(i64::MAX)),
            ty: LiteralType::Numeric(kind),
            saturated: value.is_none(),
        });
    }

    let (digits, suffix) = match text.as_bytes().last()? {
        suffix @ (b'i' | b'u' | b'f' | b'h') => (&text[..text.len() - 1], Some(*suffix)),
        _ => (text, None),
    };

    let is_float_syntax = digits.contains(['.', 'e', 'E']);

    let kind = match suffix {
        Some(b'i') => NumericKind::Int32,
        Some(b'u') => NumericKind::UInt32,
        Some(b'f') => NumericKind::Float32,
        Some(b'h') => NumericKind::Float16,
        _ if is_float_syntax => NumericKind::AbstractFloat,
        _ => NumericKind::AbstractInt,
    };

    if kind.is_integer() && is_float_syntax {
        return None;
    }

    if !kind.is_integer() {
        return Some(ParsedLiteral::new(
            ConstantValue::Float(digits.parse::<f64>().ok()?),
            LiteralType::Numeric(kind),
        ));
    }

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Oversized literals are clamped and reported as out of range
    let value = digits.parse::<i64>().ok();

    Some(ParsedLiteral {
        value: ConstantValue::Integer(value.unwrap_or(i64::MAX)),
        ty: LiteralType::Numeric(kind),
        saturated: value.is_none(),
    })
}

fn unescape(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut chars = contents.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Evaluates expressions whose value is known at shader creation time
pub struct ConstantEvaluator<'a> {
    document: &'a Document,
    /// Name and enum value expressions mapped to their declarations
    resolutions: &'a HashMap<NodeId, NodeId>,
}

impl<'a> ConstantEvaluator<'a> {
    pub fn new(document: &'a Document, resolutions: &'a HashMap<NodeId, NodeId>) -> Self {
        Self {
            document,
            resolutions,
        }
    }

    pub fn evaluate(&self, expression: NodeId) -> Option<ConstantValue> {
        self.evaluate_at_depth(expression, 0)
    }

    fn evaluate_at_depth(&self, expression: NodeId, depth: usize) -> Option<ConstantValue> {
        if depth > MAX_DEPTH {
            return None;
        }

        match self.document.expression(expression)? {
            Expression::Literal(text) => parse_literal(text)
                .filter(ParsedLiteral::is_in_range)
                .map(|literal| literal.value),
            Expression::Grouping(inner) => self.evaluate_at_depth(*inner, depth + 1),
            Expression::Name(_) => {
                let declaration = self
                    .document
                    .declaration(*self.resolutions.get(&expression)?)?;

                match &declaration.kind {
                    DeclarationKind::Variable(variable)
                        if variable.keyword == DeclarationKeyword::Const =>
                    {
                        self.evaluate_at_depth(variable.initializer?, depth + 1)
                    }
                    _ => None,
                }
            }
            Expression::EnumValue { member, .. } => {
                let declaration = self
                    .document
                    .declaration(*self.resolutions.get(&expression)?)?;

                let DeclarationKind::Enum { members } = &declaration.kind else {
                    return None;
                };

                let value = members
                    .iter()
                    .find(|candidate| candidate.name.name == member.name)?
                    .value;

                self.evaluate_at_depth(value, depth + 1)
            }
            Expression::Unary { operator, operand } => {
                let operand = self.evaluate_at_depth(*operand, depth + 1)?;

                match (operator, operand) {
                    (UnaryOperatorKind::Negate, ConstantValue::Integer(value)) => {
                        value.checked_neg().map(ConstantValue::Integer)
                    }
                    (UnaryOperatorKind::Negate, ConstantValue::Float(value)) => {
                        Some(ConstantValue::Float(-value))
                    }
                    (UnaryOperatorKind::BitwiseNot, ConstantValue::Integer(value)) => {
                        Some(ConstantValue::Integer(!value))
                    }
                    (UnaryOperatorKind::LogicalNot, ConstantValue::Boolean(value)) => {
                        Some(ConstantValue::Boolean(!value))
                    }
                    _ => None,
                }
            }
            Expression::Binary { operator, lhs, rhs } => {
                let lhs = self.evaluate_at_depth(*lhs, depth + 1)?;
                let rhs = self.evaluate_at_depth(*rhs, depth + 1)?;

                evaluate_binary(*operator, lhs, rhs)
            }
            Expression::New { ty, arguments } => {
                // Scalar conversions like `new UInt32(3)`
                let [argument] = arguments.as_slice() else {
                    return None;
                };

                let TypeExpression::Named(name) = self.document.type_expression(*ty)? else {
                    return None;
                };

                let value = self.evaluate_at_depth(*argument, depth + 1)?;

                match (NumericKind::from_type_name(&name.name)?, value) {
                    (kind, ConstantValue::Float(value)) if kind.is_integer() => {
                        Some(ConstantValue::Integer(value.trunc() as i64))
                    }
                    (kind, ConstantValue::Integer(value)) if kind.is_float() => {
                        Some(ConstantValue::Float(value as f64))
                    }
                    (_, value) => Some(value),
                }
            }
            Expression::Index { .. }
            | Expression::Member { .. }
            | Expression::Call { .. } => None,
        }
    }
}

fn evaluate_binary(
    operator: BinaryOperatorKind,
    lhs: ConstantValue,
    rhs: ConstantValue,
) -> Option<ConstantValue> {
    use BinaryOperatorKind as Op;
    use ConstantValue::{Boolean, Float, Integer};

    match (lhs, rhs) {
        (Integer(a), Integer(b)) => match operator {
            Op::Add => a.checked_add(b).map(Integer),
            Op::Subtract => a.checked_sub(b).map(Integer),
            Op::Multiply => a.checked_mul(b).map(Integer),
            Op::Divide => a.checked_div(b).map(Integer),
            Op::Modulus => a.checked_rem(b).map(Integer),
            Op::BitwiseAnd => Some(Integer(a & b)),
            Op::BitwiseOr => Some(Integer(a | b)),
            Op::BitwiseXor => Some(Integer(a ^ b)),
            Op::ShiftLeft => u32::try_from(b)
                .ok()
                .filter(|shift| *shift < 63)
                .and_then(|shift| a.checked_shl(shift))
                .map(Integer),
            Op::ShiftRight => u32::try_from(b)
                .ok()
                .filter(|shift| *shift < 64)
                .and_then(|shift| a.checked_shr(shift))
                .map(Integer),
            Op::Equals => Some(Boolean(a == b)),
            Op::NotEquals => Some(Boolean(a != b)),
            Op::LessThan => Some(Boolean(a < b)),
            Op::LessThanOrEqualTo => Some(Boolean(a <= b)),
            Op::GreaterThan => Some(Boolean(a > b)),
            Op::GreaterThanOrEqualTo => Some(Boolean(a >= b)),
            Op::LogicalAnd | Op::LogicalOr => None,
        },
        (Boolean(a), Boolean(b)) => match operator {
            Op::LogicalAnd | Op::BitwiseAnd => Some(Boolean(a && b)),
            Op::LogicalOr | Op::BitwiseOr => Some(Boolean(a || b)),
            Op::Equals => Some(Boolean(a == b)),
            Op::NotEquals => Some(Boolean(a != b)),
            _ => None,
        },
        (lhs, rhs) => {
            let (a, b) = (lhs.as_float()?, rhs.as_float()?);

            match operator {
                Op::Add => Some(Float(a + b)),
                Op::Subtract => Some(Float(a - b)),
                Op::Multiply => Some(Float(a * b)),
                Op::Divide if b != 0.0 => Some(Float(a / b)),
                Op::Modulus if b != 0.0 => Some(Float(a % b)),
                Op::Equals => Some(Boolean(a == b)),
                Op::NotEquals => Some(Boolean(a != b)),
                Op::LessThan => Some(Boolean(a < b)),
                Op::LessThanOrEqualTo => Some(Boolean(a <= b)),
                Op::GreaterThan => Some(Boolean(a > b)),
                Op::GreaterThanOrEqualTo => Some(Boolean(a >= b)),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::{SourceFile, parser::Parser},
        middle::{ast::DeclarationKind, builder::Builder},
    };

    fn numeric(text: &str) -> (ConstantValue, NumericKind) {
        let literal = parse_literal(text).unwrap();

        let LiteralType::Numeric(kind) = literal.ty else {
            panic!("{text} is not numeric");
        };

        (literal.value, kind)
    }

    /// Evaluates the initializer of the first declaration
    fn evaluate(source: &str) -> Option<ConstantValue> {
        let module = Parser::parse_module(&SourceFile::from_memory(source)).unwrap();
        let document = Builder::build(&module).unwrap();
        let resolutions = HashMap::new();

        let declaration = document.declaration(document.declarations[0]).unwrap();
        let DeclarationKind::Variable(variable) = &declaration.kind else {
            panic!("expected a variable");
        };

        ConstantEvaluator::new(&document, &resolutions).evaluate(variable.initializer.unwrap())
    }

    #[test]
    fn test_literal_suffixes() {
        assert_eq!(numeric("5"), (ConstantValue::Integer(5), NumericKind::AbstractInt));
        assert_eq!(numeric("5u"), (ConstantValue::Integer(5), NumericKind::UInt32));
        assert_eq!(numeric("5i"), (ConstantValue::Integer(5), NumericKind::Int32));
        assert_eq!(numeric("5.0"), (ConstantValue::Float(5.0), NumericKind::AbstractFloat));
        assert_eq!(numeric("5f"), (ConstantValue::Float(5.0), NumericKind::Float32));
        assert_eq!(numeric("2.5e-1h"), (ConstantValue::Float(0.25), NumericKind::Float16));
        assert_eq!(numeric(".5"), (ConstantValue::Float(0.5), NumericKind::AbstractFloat));
        assert_eq!(numeric("0xffu"), (ConstantValue::Integer(255), NumericKind::UInt32));
        assert_eq!(
            parse_literal("true").unwrap().value,
            ConstantValue::Boolean(true)
        );
        assert_eq!(
            parse_literal(r#""a\"b""#).unwrap().value,
            ConstantValue::String("a\"b".to_string())
        );
    }

    #[test]
    fn test_literal_ranges() {
        assert!(parse_literal("2147483647i").unwrap().is_in_range());
        assert!(!parse_literal("2147483648i").unwrap().is_in_range());
        assert!(parse_literal("4294967295u").unwrap().is_in_range());
        assert!(!parse_literal("4294967296u").unwrap().is_in_range());
        assert!(!parse_literal("70000.0h").unwrap().is_in_range());
        assert!(parse_literal("1.5i").is_none());
    }

    #[test]
    fn test_arithmetic_and_comparisons() {
        assert_eq!(evaluate("const a = (1 + 2) * 3;"), Some(ConstantValue::Integer(9)));
        assert_eq!(evaluate("const a = 1 << 4u;"), Some(ConstantValue::Integer(16)));
        assert_eq!(evaluate("const a = 7 % 4 == 3;"), Some(ConstantValue::Boolean(true)));
        assert_eq!(evaluate("const a = -2.0 * 0.5;"), Some(ConstantValue::Float(-1.0)));
        assert_eq!(evaluate("const a = !(1 < 2);"), Some(ConstantValue::Boolean(false)));
        assert_eq!(evaluate("const a = new UInt32(3.7);"), Some(ConstantValue::Integer(3)));
    }

    #[test]
    fn test_failures_do_not_panic() {
        assert_eq!(evaluate("const a = 1 / 0;"), None);
        assert_eq!(evaluate("const a = 1.0 / 0.0;"), None);
        assert_eq!(evaluate("const a = 9223372036854775807 + 1;"), None);
        assert_eq!(evaluate("const a = 1 << 80u;"), None);
        // Unresolved names are not constant
        assert_eq!(evaluate("const a = b;"), None);
    }
}
