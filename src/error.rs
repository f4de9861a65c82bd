use colored::Colorize;
use thiserror::Error;

use crate::{
    frontend::{SourceFile, Span, cst},
    middle::ast::NodeId,
};

/// An unrecoverable failure which aborts the whole compilation. Ordinary user
/// mistakes are never reported this way, they become incidents on the
/// validation trace instead.
#[derive(Debug, Error)]
pub enum Fatal {
    #[error("syntax error: {message}")]
    Syntax { message: String, span: Span },

    #[error("malformed syntax tree: {kind} node is missing {expected}")]
    MalformedTree {
        kind: cst::NodeKind,
        expected: &'static str,
        span: Span,
    },

    #[error("`{name}` does not name a known type variant")]
    UnknownTypeVariant { name: String, span: Span },

    #[error("attribute list is already attached to another declaration")]
    AttributeListReattached { list: NodeId, span: Span },

    #[error("attribute list was validated before being attached to a declaration")]
    DetachedAttributeList { list: NodeId, span: Span },

    #[error("`{name}` depends on itself")]
    CyclicDependency { name: String, span: Span },

    #[error("node {0:?} does not exist in this document")]
    UnknownNode(NodeId),
}

impl Fatal {
    /// Source range the failure points at, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            Fatal::Syntax { span, .. }
            | Fatal::MalformedTree { span, .. }
            | Fatal::UnknownTypeVariant { span, .. }
            | Fatal::AttributeListReattached { span, .. }
            | Fatal::DetachedAttributeList { span, .. }
            | Fatal::CyclicDependency { span, .. } => Some(*span),
            Fatal::UnknownNode(_) => None,
        }
    }

    /// Formats the failure like an incident, pointing at its source range
    /// when it has one
    pub fn render(&self, source: &SourceFile) -> String {
        match self.span() {
            Some(span) => format!(
                "{}: {}\n{}\n{}",
                "fatal".red(),
                self,
                source.format_span_position(span).white(),
                source.highlight_span(span)
            ),
            None => format!("{}: {}\n{}", "fatal".red(), self, source.origin),
        }
    }
}
