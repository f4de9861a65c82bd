//! Whole-document validation. Every node validates to an [`Attachment`],
//! computed on first demand through [`ValidationTrace::get_attachment`] so
//! declarations can be referenced before they are written.

mod declaration;
mod expression;
mod statement;
mod types;

use hashbrown::HashSet;
use tracing::debug;

use crate::{
    error::Fatal,
    middle::{
        ast::{DeclarationKind, Document, NodeId, NodeKind},
        builtins::FunctionCatalog,
        trace::{Attachment, FixedState, ValidationResults, ValidationTrace, report_error},
        ty::Type,
    },
};

/// Validates every declaration of a document. User mistakes end up as
/// incidents in the results; only structural problems are returned as errors.
pub fn validate(
    document: &Document,
    catalog: &dyn FunctionCatalog,
) -> Result<ValidationResults, Fatal> {
    let mut trace = ValidationTrace::new(document, catalog);

    // Bind every module name up front so declarations may refer to each other
    // in any order
    for &id in &document.declarations {
        let declaration = document.declaration(id).ok_or(Fatal::UnknownNode(id))?;
        trace.push_scoped_value(&declaration.name, id);
    }

    for &id in &document.declarations {
        trace.get_attachment(id)?;
    }

    for &id in &document.declarations {
        if let Some(DeclarationKind::Function(_)) =
            document.declaration(id).map(|declaration| &declaration.kind)
        {
            trace.validate_function_body(id)?;
        }
    }

    trace.check_recursion();

    let results = trace.finish();

    debug!(
        "validated {} declarations with {} incidents",
        document.declarations.len(),
        results.incidents.len()
    );

    Ok(results)
}

impl ValidationTrace<'_> {
    /// Computes the attachment of a node which has none cached yet
    pub(crate) fn validate_node(&mut self, node: NodeId) -> Result<Attachment, Fatal> {
        let document = self.document();

        match &document.node(node)?.kind {
            NodeKind::Declaration(declaration) => self.validate_declaration(node, declaration),
            NodeKind::Expression(expression) => self.validate_expression(node, expression),
            NodeKind::Type(ty) => self.validate_type(node, ty),
            NodeKind::AttributeList(_) => {
                self.validate_attribute_list(node)?;
                Ok(Attachment::constant(Type::void()))
            }
            NodeKind::Statement(_) | NodeKind::Attribute(_) => {
                Ok(Attachment::new(FixedState::Variable, Type::void()))
            }
        }
    }

    /// Reports every call which can reach its own function again
    fn check_recursion(&mut self) {
        let mut edges = self
            .calls
            .iter()
            .flat_map(|(&caller, calls)| {
                calls
                    .iter()
                    .map(move |&(call, callee)| (caller, call, callee))
            })
            .collect::<Vec<_>>();

        edges.sort_by_key(|&(_, call, _)| call);

        for (caller, call, callee) in edges {
            if !self.reaches(callee, caller) {
                continue;
            }

            let name = self
                .document()
                .declaration(callee)
                .map(|declaration| declaration.name.name.clone())
                .unwrap_or_default();

            report_error!(self, call, "Recursive call to '{}' is not allowed.", name);
        }
    }

    /// Whether `target` is reachable from `from` through the call graph
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![from];

        while let Some(function) = pending.pop() {
            if function == target {
                return true;
            }

            if !visited.insert(function) {
                continue;
            }

            if let Some(calls) = self.calls.get(&function) {
                pending.extend(calls.iter().map(|&(_, callee)| callee));
            }
        }

        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        frontend::{SourceFile, parser::Parser},
        middle::{builder::Builder, builtins::BuiltinCatalog},
    };

    pub(crate) fn validate_source(source: &str) -> ValidationResults {
        let document = build(source);

        validate(&document, &BuiltinCatalog::new()).unwrap()
    }

    pub(crate) fn build(source: &str) -> Document {
        let module = Parser::parse_module(&SourceFile::from_memory(source)).unwrap();

        Builder::build(&module).unwrap()
    }

    pub(crate) fn messages(source: &str) -> Vec<String> {
        validate_source(source)
            .incidents
            .into_iter()
            .map(|incident| incident.message)
            .collect()
    }

    #[test]
    fn test_forward_references_resolve() {
        let messages = messages(
            "const b: UInt32 = a * 2u;
            const a = 4u;
            fn first() -> Float32 { return second(); }
            fn second() -> Float32 { return 1.0; }",
        );

        assert!(messages.is_empty(), "{messages:#?}");
    }

    #[test]
    fn test_cycles_are_fatal() {
        let catalog = BuiltinCatalog::new();

        for source in [
            "alias A = A;",
            "struct S { s: S }",
            "const a = b; const b = a;",
        ] {
            let document = build(source);

            assert!(
                matches!(
                    validate(&document, &catalog),
                    Err(Fatal::CyclicDependency { .. })
                ),
                "{source}"
            );
        }
    }

    #[test]
    fn test_recursion_is_reported() {
        let messages = messages(
            "fn a() { b(); }
            fn b() { a(); }
            fn c() { c(); }",
        );

        assert_eq!(messages.len(), 3, "{messages:#?}");
        assert!(messages.contains(&"Recursive call to 'c' is not allowed.".to_string()));
    }

    #[test]
    fn test_duplicate_module_names_keep_first() {
        let source = "const a = 1u; const a = 2.0;";
        let document = build(source);
        let results = validate(&document, &BuiltinCatalog::new()).unwrap();

        assert_eq!(results.incidents.len(), 1);
        assert_eq!(results.incidents[0].message, "'a' is already defined.");

        let first = results.attachment(document.declarations[0]).unwrap();
        assert_eq!(first.resolve_type.to_string(), "UInt32");
    }
}
