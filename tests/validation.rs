use indoc::indoc;
use sheenc::{
    BuiltinCatalog, Document, Fatal, Incident, SourceFile, ValidationResults,
    middle::{
        ast::{DeclarationKind, Expression, NodeId, NodeKind},
        trace::FixedState,
    },
    parse_ast, validate,
};

fn run(source: &str) -> (Document, ValidationResults) {
    let document = parse_ast(&SourceFile::from_memory(source)).unwrap();
    let results = validate(&document, &BuiltinCatalog::new()).unwrap();

    (document, results)
}

fn incidents(source: &str) -> Vec<Incident> {
    run(source).1.incidents
}

fn assert_incident(incidents: &[Incident], needle: &str) {
    assert!(
        incidents.iter().any(|incident| incident.message.contains(needle)),
        "expected an incident containing {needle:?}: {incidents:#?}"
    );
}

/// Declaration node with the given name
fn declaration(document: &Document, name: &str) -> NodeId {
    document
        .nodes
        .enumerate()
        .find_map(|(id, node)| match &node.kind {
            NodeKind::Declaration(declaration) if declaration.name.name == name => Some(id),
            _ => None,
        })
        .unwrap()
}

/// Member expression accessing the given property
fn member(document: &Document, property: &str) -> NodeId {
    document
        .nodes
        .enumerate()
        .find_map(|(id, node)| match &node.kind {
            NodeKind::Expression(Expression::Member {
                property: accessed,
                ..
            }) if accessed.name == property => Some(id),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_const_without_initializer() {
    let incidents = incidents("const x: Float32;");

    assert_eq!(incidents.len(), 1, "{incidents:#?}");
    assert_incident(&incidents, "must have an initializer.");
}

#[test]
fn test_const_with_runtime_initializer() {
    let incidents = incidents(indoc! {"
        fn compute() -> Float32 { return 1.0; }
        const x: Float32 = compute();
    "});

    assert_incident(&incidents, "must be a constant expression.");
}

#[test]
fn test_duplicate_declarations() {
    let source = indoc! {"
        fn main() {
            let a: Float32 = 1.0;
            let a: UInt32 = 2u;
        }
    "};
    let (document, results) = run(source);

    assert_eq!(results.incidents.len(), 1, "{:#?}", results.incidents);
    assert_incident(&results.incidents, "'a' is already defined.");

    let second_line = source.find("let a: UInt32").unwrap();
    assert!(results.incidents[0].span.start > second_line);

    let first = results.attachment(declaration(&document, "a")).unwrap();
    assert_eq!(first.resolve_type.to_string(), "Float32");
}

#[test]
fn test_literal_typing() {
    let (document, results) = run("fn main() { let v: Float32 = 5.0; }");

    assert!(results.incidents.is_empty(), "{:#?}", results.incidents);

    let v = results.attachment(declaration(&document, "v")).unwrap();
    assert_eq!(v.resolve_type.to_string(), "Float32");
}

#[test]
fn test_address_of_literal() {
    let incidents = incidents("fn main() { let p: *Float32 = &5.0; }");

    assert_incident(&incidents, "needs to a stored value");
}

#[test]
fn test_swizzle_storage() {
    let (document, results) = run(indoc! {"
        fn main() {
            let vectorOne = new Vector3<Float32>(1.0, 2.0, 3.0);
            let pair = vectorOne.xy;
            let single = vectorOne.x;
        }
    "});

    assert!(results.incidents.is_empty(), "{:#?}", results.incidents);

    let pair = results.attachment(member(&document, "xy")).unwrap();
    assert_eq!(pair.resolve_type.to_string(), "Vector2<Float32>");
    assert!(!pair.is_storage);

    let single = results.attachment(member(&document, "x")).unwrap();
    assert_eq!(single.resolve_type.to_string(), "Float32");
    assert!(single.is_storage);
}

#[test]
fn test_switch_constraints() {
    let incidents = incidents(indoc! {"
        fn main() {
            let selector: Int32 = 1i;
            switch selector {
                case 1i: {}
                default: {}
            }
        }
    "});

    assert_incident(&incidents, "Switch selector must be an unsigned integer");
    assert_incident(&incidents, "Case selector must be a constant unsigned integer");
}

#[test]
fn test_binary_fixed_state_is_the_minimum() {
    let (document, results) = run(indoc! {"
        param count: UInt32 = 4u;
        fn main() {
            let v = 2u;
            let a = count + 1u;
            let b = v + count;
        }
    "});

    assert!(results.incidents.is_empty(), "{:#?}", results.incidents);

    let fixed_state = |name: &str| {
        let node = document.declaration(declaration(&document, name)).unwrap();
        let DeclarationKind::Variable(variable) = &node.kind else {
            panic!("'{name}' is not a variable");
        };

        results
            .attachment(variable.initializer.unwrap())
            .unwrap()
            .fixed_state
    };

    assert_eq!(fixed_state("a"), FixedState::PipelineCreationFixed);
    assert_eq!(fixed_state("b"), FixedState::Variable);
}

#[test]
fn test_structural_failures_are_fatal() {
    let catalog = BuiltinCatalog::new();

    let cyclic = parse_ast(&SourceFile::from_memory("alias A = B; alias B = A;")).unwrap();
    assert!(matches!(
        validate(&cyclic, &catalog),
        Err(Fatal::CyclicDependency { .. })
    ));

    assert!(matches!(
        parse_ast(&SourceFile::from_memory("fn main( {")),
        Err(Fatal::Syntax { .. })
    ));

    assert!(matches!(
        parse_ast(&SourceFile::from_memory("private a: Quaternion<Float32>;")),
        Err(Fatal::UnknownTypeVariant { .. })
    ));
}

#[test]
fn test_rendered_incident() {
    let source = SourceFile::from_memory("const a = missing;");
    let document = parse_ast(&source).unwrap();
    let results = validate(&document, &BuiltinCatalog::new()).unwrap();

    let rendered = strip_ansi_escapes::strip_str(results.incidents[0].render(&source));

    assert!(rendered.contains("error: 'missing' is not defined."), "{rendered}");
    assert!(rendered.contains("<memory>:1:11"), "{rendered}");
    assert!(rendered.contains("1 | const a = missing;"), "{rendered}");
    assert!(rendered.contains("^^^^^^^"), "{rendered}");
}
