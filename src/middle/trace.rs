use colored::Colorize;
use hashbrown::{HashMap, HashSet};
use strum::Display;
use tracing::trace;

use crate::{
    error::Fatal,
    frontend::{SourceFile, Span},
    middle::{
        ast::{Document, Identifier, NodeId},
        builtins::FunctionCatalog,
        primitive::AddressSpace,
        ty::Type,
    },
};

/// Name of the enclosing function, for incident origins
macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        type_name_of(f)
            .rsplit("::")
            .find(|&part| part != "f" && part != "{{closure}}")
            .unwrap_or("?")
    }};
}

pub(crate) use function;

/// Pushes an incident onto the trace. The span defaults to the node's own.
///
/// ```ignore
/// report_error!(self, expression, "'{}' is not a value.", name);
/// report_error!(self, at property.span, expression, "...");
/// ```
macro_rules! report_error {
    ($trace:expr, at $span:expr, $node:expr, $($message:tt)+) => {{
        #[cfg(feature = "error-backtrace")]
        let origin = Some(format!(
            "{}::{} (at {}:{}:{})",
            module_path!(),
            $crate::middle::trace::function!(),
            file!(),
            line!(),
            column!()
        ));
        #[cfg(not(feature = "error-backtrace"))]
        let origin = None;

        $trace.push_error(format!($($message)+), $span, Some($node), origin)
    }};
    ($trace:expr, $node:expr, $($message:tt)+) => {{
        let span = $trace.document().span($node);
        $crate::middle::trace::report_error!($trace, at span, $node, $($message)+)
    }};
}

pub(crate) use report_error;

/// How early the value of an expression is known. Combining values yields
/// the earliest tier all of them share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum FixedState {
    Variable,
    ScopeFixed,
    PipelineCreationFixed,
    ShaderCreationFixed,
    Constant,
}

impl FixedState {
    pub fn combine(self, other: Self) -> Self {
        self.min(other)
    }
}

/// The memoized validation result of a node
#[derive(Debug, Clone)]
pub struct Attachment {
    pub fixed_state: FixedState,
    /// Whether the node denotes an addressable location
    pub is_storage: bool,
    pub resolve_type: Type,
    pub address_space: Option<AddressSpace>,
}

impl Attachment {
    pub fn new(fixed_state: FixedState, resolve_type: Type) -> Self {
        Self {
            fixed_state,
            is_storage: false,
            resolve_type,
            address_space: None,
        }
    }

    pub fn constant(resolve_type: Type) -> Self {
        Self::new(FixedState::Constant, resolve_type)
    }

    /// Placeholder for anything which failed validation. It is as permissive
    /// as possible so no further incidents cascade from it.
    pub fn invalid() -> Self {
        Self {
            fixed_state: FixedState::Constant,
            is_storage: true,
            resolve_type: Type::invalid(),
            address_space: None,
        }
    }

    pub fn stored(mut self, address_space: Option<AddressSpace>) -> Self {
        self.is_storage = true;
        self.address_space = address_space;
        self
    }
}

/// A recoverable user error
#[derive(Debug, Clone)]
pub struct Incident {
    pub message: String,
    pub span: Span,
    pub node: Option<NodeId>,
    /// Compiler location which raised the incident
    pub origin: Option<String>,
}

impl Incident {
    /// Formats the incident with its position and the highlighted source line
    pub fn render(&self, source: &SourceFile) -> String {
        let mut out = String::new();

        if let Some(origin) = &self.origin {
            out.push_str(&format!("{}: {}\n", "backtrace".blue(), origin));
        }

        out.push_str(&format!(
            "{}: {}\n{}\n{}",
            "error".red(),
            self.message,
            source.format_span_position(self.span).white(),
            source.highlight_span(self.span)
        ));

        out
    }
}

/// Everything a validation run produced
#[derive(Debug, Default)]
pub struct ValidationResults {
    pub attachments: HashMap<NodeId, Attachment>,
    /// Name and call expressions mapped to the declaration they refer to
    pub resolutions: HashMap<NodeId, NodeId>,
    pub incidents: Vec<Incident>,
}

impl ValidationResults {
    pub fn attachment(&self, node: NodeId) -> Option<&Attachment> {
        self.attachments.get(&node)
    }

    pub fn resolution(&self, node: NodeId) -> Option<NodeId> {
        self.resolutions.get(&node).copied()
    }

    pub fn has_incidents(&self) -> bool {
        !self.incidents.is_empty()
    }
}

/// A data structure to assist in traversing scopes
#[derive(Debug, Default)]
struct ScopeStack {
    global_scope: HashMap<String, NodeId>,
    stack: Vec<HashMap<String, NodeId>>,
}

impl ScopeStack {
    /// Creates a new block or function scope
    fn push_shallow_scope(&mut self) {
        self.stack.push(HashMap::new());
    }

    /// Destroys the current block or function scope
    fn pop_shallow_scope(&mut self) {
        assert!(
            !self.stack.is_empty(),
            "Attempted to pop a shallow scope from the global context"
        );

        self.stack.pop();
    }

    /// The most nested scope, which is the global one outside of functions
    fn innermost(&mut self) -> &mut HashMap<String, NodeId> {
        match self.stack.last_mut() {
            Some(scope) => scope,
            None => &mut self.global_scope,
        }
    }

    /// Traverses the scope stack from back to front looking for bindings before
    /// checking the global scope.
    fn get_binding(&self, name: &str) -> Option<NodeId> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.global_scope.get(name))
            .copied()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionContext {
    pub function: NodeId,
    pub return_type: Type,
    pub loop_depth: usize,
    pub switch_depth: usize,
}

/// State of one validation run over one document
pub struct ValidationTrace<'document> {
    document: &'document Document,
    catalog: &'document dyn FunctionCatalog,
    scopes: ScopeStack,
    attachments: HashMap<NodeId, Attachment>,
    in_progress: HashSet<NodeId>,
    resolutions: HashMap<NodeId, NodeId>,
    incidents: Vec<Incident>,
    functions: Vec<FunctionContext>,
    /// Call sites of user functions, keyed by the calling function
    pub(crate) calls: HashMap<NodeId, Vec<(NodeId, NodeId)>>,
}

impl<'document> ValidationTrace<'document> {
    pub fn new(document: &'document Document, catalog: &'document dyn FunctionCatalog) -> Self {
        Self {
            document,
            catalog,
            scopes: ScopeStack::default(),
            attachments: HashMap::new(),
            in_progress: HashSet::new(),
            resolutions: HashMap::new(),
            incidents: Vec::new(),
            functions: Vec::new(),
            calls: HashMap::new(),
        }
    }

    pub fn document(&self) -> &'document Document {
        self.document
    }

    pub fn catalog(&self) -> &'document dyn FunctionCatalog {
        self.catalog
    }

    pub fn push_scope(&mut self) {
        self.scopes.push_shallow_scope();
        trace!(depth = self.scopes.stack.len(), "pushed scope");
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop_shallow_scope();
    }

    /// Binds a name in the innermost scope. A name already bound in that same
    /// scope is reported and keeps its first binding.
    pub fn push_scoped_value(&mut self, name: &Identifier, declaration: NodeId) -> bool {
        trace!("binding '{}' to {:?}", name.name, declaration);

        if self.scopes.innermost().contains_key(&name.name) {
            report_error!(self, at name.span, declaration, "'{}' is already defined.", name.name);
            return false;
        }

        self.scopes
            .innermost()
            .insert(name.name.clone(), declaration);
        true
    }

    /// Looks a name up from the innermost scope outwards, reporting it when
    /// nothing is bound
    pub fn get_scoped_value(&mut self, name: &Identifier, node: NodeId) -> Option<NodeId> {
        let declaration = self.find_scoped_value(&name.name);

        if declaration.is_none() {
            report_error!(self, at name.span, node, "'{}' is not defined.", name.name);
        }

        declaration
    }

    pub fn find_scoped_value(&self, name: &str) -> Option<NodeId> {
        self.scopes.get_binding(name)
    }

    pub fn push_error(
        &mut self,
        message: String,
        span: Span,
        node: Option<NodeId>,
        origin: Option<String>,
    ) {
        trace!("incident: {message}");

        self.incidents.push(Incident {
            message,
            span,
            node,
            origin,
        });
    }

    /// Returns the attachment of a node, validating it first if nobody asked
    /// for it before
    pub fn get_attachment(&mut self, node: NodeId) -> Result<Attachment, Fatal> {
        if let Some(attachment) = self.attachments.get(&node) {
            return Ok(attachment.clone());
        }

        if !self.in_progress.insert(node) {
            let name = self
                .document
                .declaration(node)
                .map(|declaration| declaration.name.name.clone())
                .unwrap_or_else(|| "expression".to_string());

            return Err(Fatal::CyclicDependency {
                name,
                span: self.document.span(node),
            });
        }

        trace!("attachment cache miss for {:?}", node);

        let attachment = if self.document.is_module_declaration(node) {
            self.in_module_context(|trace| trace.validate_node(node))
        } else {
            self.validate_node(node)
        };

        self.in_progress.remove(&node);
        let attachment = attachment?;

        self.attachments.insert(node, attachment.clone());

        Ok(attachment)
    }

    /// Whether the node's attachment is currently being computed further up
    /// the stack
    pub fn is_in_progress(&self, node: NodeId) -> bool {
        self.in_progress.contains(&node)
    }

    pub fn cached_attachment(&self, node: NodeId) -> Option<&Attachment> {
        self.attachments.get(&node)
    }

    pub fn record_resolution(&mut self, expression: NodeId, declaration: NodeId) {
        self.resolutions.insert(expression, declaration);
    }

    pub fn resolutions(&self) -> &HashMap<NodeId, NodeId> {
        &self.resolutions
    }

    /// Runs `f` with only module-level names visible
    pub fn in_module_context<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let stack = std::mem::take(&mut self.scopes.stack);
        let functions = std::mem::take(&mut self.functions);

        let result = f(self);

        self.scopes.stack = stack;
        self.functions = functions;

        result
    }

    pub fn enter_function(&mut self, function: NodeId, return_type: Type) {
        self.functions.push(FunctionContext {
            function,
            return_type,
            loop_depth: 0,
            switch_depth: 0,
        });
    }

    pub fn exit_function(&mut self) {
        self.functions.pop();
    }

    pub fn current_function(&self) -> Option<&FunctionContext> {
        self.functions.last()
    }

    pub fn current_function_mut(&mut self) -> Option<&mut FunctionContext> {
        self.functions.last_mut()
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }

    pub fn finish(self) -> ValidationResults {
        ValidationResults {
            attachments: self.attachments,
            resolutions: self.resolutions,
            incidents: self.incidents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frontend::Span,
        middle::{
            ast::{NodeKind, Statement},
            builtins::BuiltinCatalog,
        },
    };

    fn identifier(name: &str) -> Identifier {
        Identifier {
            name: name.to_string(),
            span: Span::default(),
        }
    }

    fn document_with_nodes(count: usize) -> (Document, Vec<NodeId>) {
        let mut document = Document::default();
        let ids = (0..count)
            .map(|_| document.push(Span::default(), NodeKind::Statement(Statement::Break)))
            .collect();

        (document, ids)
    }

    #[test]
    fn test_fixed_state_combines_to_minimum() {
        assert_eq!(
            FixedState::Constant.combine(FixedState::ScopeFixed),
            FixedState::ScopeFixed
        );
        assert_eq!(
            FixedState::Variable.combine(FixedState::Constant),
            FixedState::Variable
        );
        assert!(FixedState::PipelineCreationFixed < FixedState::ShaderCreationFixed);
    }

    #[test]
    fn test_duplicate_in_same_scope_keeps_first_binding() {
        let (document, ids) = document_with_nodes(2);
        let catalog = BuiltinCatalog::new();
        let mut trace = ValidationTrace::new(&document, &catalog);

        assert!(trace.push_scoped_value(&identifier("a"), ids[0]));
        assert!(!trace.push_scoped_value(&identifier("a"), ids[1]));
        assert_eq!(trace.find_scoped_value("a"), Some(ids[0]));

        let results = trace.finish();
        assert_eq!(results.incidents.len(), 1);
        assert_eq!(results.incidents[0].message, "'a' is already defined.");
    }

    #[test]
    fn test_shadowing_outer_scope_is_legal() {
        let (document, ids) = document_with_nodes(2);
        let catalog = BuiltinCatalog::new();
        let mut trace = ValidationTrace::new(&document, &catalog);

        trace.push_scoped_value(&identifier("a"), ids[0]);
        trace.push_scope();
        assert!(trace.push_scoped_value(&identifier("a"), ids[1]));
        assert_eq!(trace.find_scoped_value("a"), Some(ids[1]));
        trace.pop_scope();
        assert_eq!(trace.find_scoped_value("a"), Some(ids[0]));
        assert_eq!(trace.incident_count(), 0);
    }

    #[test]
    fn test_unresolved_name_is_reported() {
        let (document, ids) = document_with_nodes(1);
        let catalog = BuiltinCatalog::new();
        let mut trace = ValidationTrace::new(&document, &catalog);

        assert_eq!(trace.get_scoped_value(&identifier("missing"), ids[0]), None);

        let results = trace.finish();
        assert_eq!(results.incidents[0].message, "'missing' is not defined.");
        assert_eq!(results.incidents[0].node, Some(ids[0]));
    }

    #[test]
    fn test_module_context_hides_locals() {
        let (document, ids) = document_with_nodes(2);
        let catalog = BuiltinCatalog::new();
        let mut trace = ValidationTrace::new(&document, &catalog);

        trace.push_scoped_value(&identifier("global"), ids[0]);
        trace.push_scope();
        trace.push_scoped_value(&identifier("local"), ids[1]);

        let (global, local) = trace.in_module_context(|trace| {
            (
                trace.find_scoped_value("global"),
                trace.find_scoped_value("local"),
            )
        });

        assert_eq!(global, Some(ids[0]));
        assert_eq!(local, None);
        assert_eq!(trace.find_scoped_value("local"), Some(ids[1]));
    }
}
