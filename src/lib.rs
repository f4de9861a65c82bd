//! `sheenc` compiles the Sheen shading language to WGSL.
//!
//! Source text is parsed into a concrete syntax tree, built into an arena AST,
//! validated into a set of per-node attachments and finally handed to a code
//! generator. User mistakes never abort a compilation: they are collected as
//! [`Incident`]s while the best-effort output is still produced. Only
//! structural failures surface as [`Fatal`].

pub mod backend;
pub mod error;
pub mod frontend;
pub mod index;
pub mod middle;

use tracing::debug;

pub use crate::{
    backend::{
        TranspileOptions,
        targets::{CodeGenerator, Target},
    },
    error::Fatal,
    frontend::{SourceFile, SourceFileOrigin},
    middle::{
        ast::Document,
        builtins::{BuiltinCatalog, FunctionCatalog},
        trace::{Incident, ValidationResults},
    },
};
use crate::{frontend::parser::Parser, middle::builder::Builder};

/// Result of a whole compilation: the generated text along with every
/// incident found on the way
#[derive(Debug)]
pub struct Transpilation {
    pub source: String,
    pub incidents: Vec<Incident>,
}

impl Transpilation {
    pub fn has_incidents(&self) -> bool {
        !self.incidents.is_empty()
    }
}

/// Lexes, parses and builds the AST of a source file
pub fn parse_ast(source: &SourceFile) -> Result<Document, Fatal> {
    let module = Parser::parse_module(source)?;

    Builder::build(&module)
}

/// Validates a document against a function catalog
pub fn validate(
    document: &Document,
    catalog: &dyn FunctionCatalog,
) -> Result<ValidationResults, Fatal> {
    middle::validate::validate(document, catalog)
}

/// Compiles a source file with the built-in function catalog. The output is
/// produced even when incidents were found.
pub fn transpile(
    source: &SourceFile,
    target: Target,
    options: &TranspileOptions,
) -> Result<Transpilation, Fatal> {
    let document = parse_ast(source)?;
    let results = validate(&document, &BuiltinCatalog::new())?;

    let generated = target
        .get_code_generator()
        .translate(&document, &results, options);

    debug!(
        origin = %source.origin,
        incidents = results.incidents.len(),
        "transpiled to {:?}",
        target
    );

    Ok(Transpilation {
        source: generated,
        incidents: results.incidents,
    })
}
