use indoc::indoc;
use sheenc::{Fatal, SourceFile, Target, TranspileOptions, transpile};

fn options() -> TranspileOptions {
    TranspileOptions {
        header: false,
        ..Default::default()
    }
}

fn transpile_clean(source: &str) -> String {
    let transpilation =
        transpile(&SourceFile::from_memory(source), Target::Wgsl, &options()).unwrap();

    assert!(
        !transpilation.has_incidents(),
        "{:#?}",
        transpilation.incidents
    );

    transpilation.source
}

#[test]
fn test_literal_typing_emits_f32() {
    let output = transpile_clean("fn main() { let v: Float32 = 5.0; }");

    assert!(output.contains("var v: f32 = 5.0;"), "{output}");
}

#[test]
fn test_vertex_and_fragment_stages() {
    let output = transpile_clean(indoc! {"
        enum Slot { Color = 0u }

        struct VertexOutput {
            @builtin(position) position: Vector4<Float32>,
            @location(Slot::Color) color: Vector3<Float32>,
        }

        @vertex
        fn vertex_main(@builtin(vertex_index) index: UInt32) -> VertexOutput {
            let x = new Float32(index);
            return new VertexOutput(
                new Vector4<Float32>(x, 0.0, 0.0, 1.0),
                new Vector3<Float32>(1.0, 0.0, 0.0)
            );
        }

        @fragment
        fn fragment_main(input: VertexOutput) -> @location(0) Vector4<Float32> {
            return new Vector4<Float32>(input.color, 1.0);
        }
    "});

    assert_eq!(
        output,
        indoc! {"
            struct VertexOutput {
                @builtin(position) position: vec4<f32>,
                @location(0u) color: vec3<f32>,
            }

            @vertex fn vertex_main(@builtin(vertex_index) index: u32) -> VertexOutput {
                var x = f32(index);
                return VertexOutput(vec4<f32>(x, 0.0, 0.0, 1.0), vec3<f32>(1.0, 0.0, 0.0));
            }

            @fragment fn fragment_main(input: VertexOutput) -> @location(0) vec4<f32> {
                return vec4<f32>(input.color, 1.0);
            }
        "}
    );
}

#[test]
fn test_compute_with_overridable_workgroup() {
    let output = transpile_clean(indoc! {"
        @id(0) param size: UInt32 = 64u;
        workgroup shared: Array<Float32, size>;

        @compute @workgroup_size(size)
        fn main(@builtin(local_invocation_index) index: UInt32) {
            shared[index] = 0.0;
            workgroupBarrier();
        }
    "});

    assert!(output.contains("@id(0) override size: u32 = 64u;"), "{output}");
    assert!(
        output.contains("var<workgroup> shared: array<f32, size>;"),
        "{output}"
    );
    assert!(
        output.contains("@compute @workgroup_size(size) fn main("),
        "{output}"
    );
    assert!(output.contains("    workgroupBarrier();\n"), "{output}");
}

#[test]
fn test_pointers_carry_their_address_space() {
    let output = transpile_clean(indoc! {"
        alias P = *Float32;
        private g: Float32 = 1.0;

        fn read(p: *Float32) -> Float32 {
            return *p;
        }

        fn main() {
            let x: Float32 = 1.0;
            let p: P = &x;
            let q: P = &g;
            let a = read(&g);
        }
    "});

    assert!(output.contains("alias P = ptr<function, f32>;"), "{output}");
    assert!(output.contains("fn read(p: ptr<private, f32>) -> f32 {"), "{output}");
    assert!(output.contains("let p: ptr<function, f32> = &x;"), "{output}");
    assert!(output.contains("let q: ptr<private, f32> = &g;"), "{output}");
}

#[test]
fn test_vector_logical_operators_are_rejected() {
    let transpilation = transpile(
        &SourceFile::from_memory(indoc! {"
            fn main() {
                let a = new Vector2<Boolean>();
                let b = a && a;
                let c = true && false;
            }
        "}),
        Target::Wgsl,
        &options(),
    )
    .unwrap();

    assert_eq!(transpilation.incidents.len(), 1, "{:#?}", transpilation.incidents);
    assert!(transpilation.source.contains("var c = true && false;"), "{}", transpilation.source);
}

#[test]
fn test_output_survives_incidents() {
    let transpilation = transpile(
        &SourceFile::from_memory(indoc! {"
            const x: Float32;
            private y: Missing;
            fn main() {}
        "}),
        Target::Wgsl,
        &options(),
    )
    .unwrap();

    assert_eq!(transpilation.incidents.len(), 2, "{:#?}", transpilation.incidents);
    assert!(
        transpilation
            .source
            .contains("var<private> y: /* invalid */;"),
        "{}",
        transpilation.source
    );
    assert!(transpilation.source.contains("fn main() {"), "{}", transpilation.source);
}

#[test]
fn test_default_options_add_a_header() {
    let transpilation = transpile(
        &SourceFile::from_memory("fn main() {}"),
        Target::Wgsl,
        &TranspileOptions::default(),
    )
    .unwrap();

    assert!(transpilation.source.starts_with("// Generated by sheenc"));
    assert!(transpilation.source.ends_with("\n\nfn main() {\n}\n"));
}

#[test]
fn test_syntax_errors_abort() {
    let result = transpile(
        &SourceFile::from_memory("fn main() { let = 1; }"),
        Target::Wgsl,
        &options(),
    );

    assert!(matches!(result, Err(Fatal::Syntax { .. })));
}
