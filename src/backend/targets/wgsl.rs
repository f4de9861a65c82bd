use itertools::Itertools;
use tracing::debug;

use crate::{
    backend::{TranspileOptions, targets::CodeGenerator},
    middle::{
        ast::{
            Declaration, DeclarationKeyword, DeclarationKind, Document, Expression,
            FunctionDeclaration, NodeId, Statement, SwitchCase, VariableDeclaration,
        },
        attribute::{AttributeOutput, attribute_descriptor, enumerated_value},
        constant::{ConstantEvaluator, ConstantValue, LiteralType, parse_literal},
        primitive::{AddressSpace, NumericKind, SamplerKind, TextureDimension, TextureKind},
        trace::ValidationResults,
        ty::{ArrayLength, Type, TypeKind},
    },
};

const INVALID: &str = "/* invalid */";
const STRING: &str = "/* string */";

pub struct CodeGeneratorWgsl;

impl CodeGenerator for CodeGeneratorWgsl {
    fn translate(
        &self,
        document: &Document,
        results: &ValidationResults,
        options: &TranspileOptions,
    ) -> String {
        let mut writer = Writer {
            document,
            results,
            options,
            output: String::new(),
            depth: 0,
        };

        if options.header {
            writer.push_line(format!(
                "// Generated by sheenc {}",
                env!("CARGO_PKG_VERSION")
            ));
        }

        for &id in &document.declarations {
            writer.write_module_declaration(id);
        }

        let output = writer.into_output();

        debug!(bytes = output.len(), "emitted WGSL");

        output
    }
}

struct Writer<'a> {
    document: &'a Document,
    results: &'a ValidationResults,
    options: &'a TranspileOptions,
    output: String,
    depth: usize,
}

impl Writer<'_> {
    fn into_output(self) -> String {
        self.output
    }

    fn push_line(&mut self, line: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.output.push_str(&self.options.indent);
        }

        self.output.push_str(line.as_ref());
        self.output.push('\n');
    }

    /// Blank line between top level items
    fn separate(&mut self) {
        if !self.output.is_empty() {
            self.output.push('\n');
        }
    }

    fn write_module_declaration(&mut self, id: NodeId) {
        let document = self.document;

        let Some(declaration) = document.declaration(id) else {
            return;
        };

        match &declaration.kind {
            DeclarationKind::Variable(variable) => {
                self.separate();
                let line = self.variable(id, declaration, variable);
                self.push_line(format!("{line};"));
            }
            DeclarationKind::Struct { properties } => {
                self.separate();
                self.push_line(format!("struct {} {{", declaration.name.name));
                self.depth += 1;

                for &property in properties {
                    let Some(member) = document.declaration(property) else {
                        continue;
                    };

                    let line = format!(
                        "{}{}: {},",
                        self.attributes(member.attributes),
                        member.name.name,
                        self.attached_type(property)
                    );
                    self.push_line(line);
                }

                self.depth -= 1;
                self.push_line("}");
            }
            DeclarationKind::Alias { ty } => {
                self.separate();
                let line = format!("alias {} = {};", declaration.name.name, self.attached_type(*ty));
                self.push_line(line);
            }
            DeclarationKind::Function(function) => {
                self.separate();
                self.write_function(id, declaration, function);
            }
            // Enum values are inlined where they are used
            DeclarationKind::Enum { .. } => {}
            DeclarationKind::Parameter { .. } | DeclarationKind::Property { .. } => {}
        }
    }

    fn write_function(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
        function: &FunctionDeclaration,
    ) {
        let document = self.document;

        let parameters = function
            .parameters
            .iter()
            .filter_map(|&parameter| {
                let parameter_declaration = document.declaration(parameter)?;

                Some(format!(
                    "{}{}: {}",
                    self.attributes(parameter_declaration.attributes),
                    parameter_declaration.name.name,
                    self.attached_type(parameter)
                ))
            })
            .join(", ");

        let mut header = format!(
            "{}fn {}({})",
            self.attributes(declaration.attributes),
            declaration.name.name,
            parameters
        );

        let returns_value = self
            .results
            .attachment(id)
            .is_some_and(|attachment| !attachment.resolve_type.is_void());

        if let Some(return_type) = function.return_type.filter(|_| returns_value) {
            header.push_str(&format!(
                " -> {}{}",
                self.attributes(function.return_attributes),
                self.attached_type(return_type)
            ));
        }

        self.push_line(format!("{header} {{"));
        self.write_body(function.body);
        self.push_line("}");
    }

    /// Keyword, name, type and initializer of a variable, without the
    /// trailing semicolon
    fn variable(
        &self,
        id: NodeId,
        declaration: &Declaration,
        variable: &VariableDeclaration,
    ) -> String {
        let ty = self
            .results
            .attachment(id)
            .map(|attachment| attachment.resolve_type.clone())
            .unwrap_or_else(Type::invalid);

        let keyword = match variable.keyword {
            DeclarationKeyword::Const => "const".to_string(),
            DeclarationKeyword::Param => "override".to_string(),
            DeclarationKeyword::Let if ty.is_pointer() => "let".to_string(),
            DeclarationKeyword::Let => "var".to_string(),
            DeclarationKeyword::Storage => match self.access_mode(declaration) {
                Some(access) => format!("var<storage, {access}>"),
                None => "var<storage>".to_string(),
            },
            DeclarationKeyword::Uniform if ty.is_handle() => "var".to_string(),
            DeclarationKeyword::Uniform => "var<uniform>".to_string(),
            DeclarationKeyword::Workgroup => "var<workgroup>".to_string(),
            DeclarationKeyword::Private => "var<private>".to_string(),
        };

        let mut text = format!(
            "{}{} {}",
            self.attributes(declaration.attributes),
            keyword,
            declaration.name.name
        );

        if variable.ty.is_some() {
            text.push_str(": ");
            text.push_str(&type_name(&ty));
        }

        if let Some(initializer) = variable.initializer {
            text.push_str(" = ");
            text.push_str(&self.expression(initializer));
        }

        text
    }

    fn access_mode(&self, declaration: &Declaration) -> Option<String> {
        let attribute = self
            .document
            .find_attribute(declaration.attributes, "access")?;

        enumerated_value(
            self.document,
            &self.results.resolutions,
            *attribute.arguments.first()?,
        )
    }

    /// Rendered attributes, each followed by a space
    fn attributes(&self, list: NodeId) -> String {
        let mut rendered = Vec::new();

        for attribute in self.document.attributes_of(list) {
            let Some(descriptor) = attribute_descriptor(&attribute.name.name) else {
                continue;
            };

            let arguments = attribute
                .arguments
                .iter()
                .map(|&argument| self.attribute_argument(argument))
                .collect::<Vec<_>>();

            match descriptor.output {
                AttributeOutput::Omitted => {}
                AttributeOutput::Resource => {
                    if let [group, binding] = arguments.as_slice() {
                        rendered.push(format!("@group({group})"));
                        rendered.push(format!("@binding({binding})"));
                    }
                }
                AttributeOutput::Same if arguments.is_empty() => {
                    rendered.push(format!("@{}", descriptor.name));
                }
                AttributeOutput::Same => {
                    rendered.push(format!("@{}({})", descriptor.name, arguments.join(", ")));
                }
            }
        }

        rendered.into_iter().map(|attribute| attribute + " ").collect()
    }

    fn attribute_argument(&self, argument: NodeId) -> String {
        match self.document.expression(argument) {
            Some(Expression::Literal(_) | Expression::EnumValue { .. }) => {
                enumerated_value(self.document, &self.results.resolutions, argument)
                    .unwrap_or_else(|| self.expression(argument))
            }
            _ => self.expression(argument),
        }
    }

    fn attached_type(&self, node: NodeId) -> String {
        match self.results.attachment(node) {
            Some(attachment) => type_name(&attachment.resolve_type),
            None => INVALID.to_string(),
        }
    }

    /// Statements of a block one level deeper, or a lone statement
    fn write_body(&mut self, body: NodeId) {
        let document = self.document;

        self.depth += 1;

        match document.statement(body) {
            Some(Statement::Block(statements)) => {
                for &statement in statements {
                    self.write_statement(statement);
                }
            }
            _ => self.write_statement(body),
        }

        self.depth -= 1;
    }

    fn write_statement(&mut self, id: NodeId) {
        let document = self.document;

        let Some(statement) = document.statement(id) else {
            return;
        };

        match statement {
            Statement::Declaration(_) | Statement::Assignment { .. } | Statement::Expression(_) => {
                let line = self.simple_statement(id);
                self.push_line(format!("{line};"));
            }
            Statement::Block(_) => {
                self.push_line("{");
                self.write_body(id);
                self.push_line("}");
            }
            Statement::If {
                condition,
                positive,
                negative,
            } => self.write_if(*condition, *positive, *negative),
            Statement::While { condition, body } => {
                let condition = self.expression(*condition);
                self.push_line(format!("while {condition} {{"));
                self.write_body(*body);
                self.push_line("}");
            }
            Statement::For {
                initializer,
                condition,
                update,
                body,
            } => {
                let initializer = initializer
                    .map(|initializer| self.simple_statement(initializer))
                    .unwrap_or_default();
                let condition = condition
                    .map(|condition| self.expression(condition))
                    .unwrap_or_default();
                let update = update
                    .map(|update| self.simple_statement(update))
                    .unwrap_or_default();

                self.push_line(format!("for ({initializer}; {condition}; {update}) {{"));
                self.write_body(*body);
                self.push_line("}");
            }
            Statement::Switch { selector, cases } => self.write_switch(*selector, cases),
            Statement::Return(Some(value)) => {
                let value = self.expression(*value);
                self.push_line(format!("return {value};"));
            }
            Statement::Return(None) => self.push_line("return;"),
            Statement::Break => self.push_line("break;"),
            Statement::Continue => self.push_line("continue;"),
            Statement::Discard => self.push_line("discard;"),
        }
    }

    fn write_if(&mut self, condition: NodeId, positive: NodeId, negative: Option<NodeId>) {
        let document = self.document;

        let condition = self.expression(condition);
        self.push_line(format!("if {condition} {{"));
        self.write_body(positive);

        let mut negative = negative;

        while let Some(id) = negative {
            match document.statement(id) {
                Some(Statement::If {
                    condition,
                    positive,
                    negative: next,
                }) => {
                    let condition = self.expression(*condition);
                    self.push_line(format!("}} else if {condition} {{"));
                    self.write_body(*positive);
                    negative = *next;
                }
                _ => {
                    self.push_line("} else {");
                    self.write_body(id);
                    negative = None;
                }
            }
        }

        self.push_line("}");
    }

    fn write_switch(&mut self, selector: NodeId, cases: &[SwitchCase]) {
        let selector = self.expression(selector);
        self.push_line(format!("switch {selector} {{"));
        self.depth += 1;

        for case in cases {
            let mut labels = case
                .selectors
                .iter()
                .map(|&label| self.expression(label))
                .collect::<Vec<_>>();

            let head = if labels.is_empty() {
                "default".to_string()
            } else {
                if case.is_default {
                    labels.push("default".to_string());
                }

                format!("case {}", labels.join(", "))
            };

            self.push_line(format!("{head}: {{"));
            self.write_body(case.body);
            self.push_line("}");
        }

        self.depth -= 1;
        self.push_line("}");
    }

    /// Statements which may also appear in the header of a for loop
    fn simple_statement(&self, id: NodeId) -> String {
        let document = self.document;

        match document.statement(id) {
            Some(Statement::Declaration(declaration_id)) => {
                match document.declaration(*declaration_id) {
                    Some(declaration) => match &declaration.kind {
                        DeclarationKind::Variable(variable) => {
                            self.variable(*declaration_id, declaration, variable)
                        }
                        _ => INVALID.to_string(),
                    },
                    None => INVALID.to_string(),
                }
            }
            Some(Statement::Assignment {
                operator,
                target,
                value,
            }) => {
                let operator = operator.map(|operator| operator.to_string()).unwrap_or_default();

                format!(
                    "{} {}= {}",
                    self.expression(*target),
                    operator,
                    self.expression(*value)
                )
            }
            Some(Statement::Expression(expression)) => self.expression(*expression),
            _ => INVALID.to_string(),
        }
    }

    fn expression(&self, id: NodeId) -> String {
        let Some(expression) = self.document.expression(id) else {
            return INVALID.to_string();
        };

        match expression {
            Expression::Literal(text) => match parse_literal(text) {
                Some(literal) if literal.ty == LiteralType::String => STRING.to_string(),
                _ => text.clone(),
            },
            Expression::Name(name) => name.name.clone(),
            Expression::Binary { operator, lhs, rhs } => {
                format!("{} {} {}", self.operand(*lhs), operator, self.operand(*rhs))
            }
            Expression::Unary { operator, operand } => {
                format!("{}{}", operator, self.operand(*operand))
            }
            Expression::Index { base, index } => {
                format!("{}[{}]", self.operand(*base), self.expression(*index))
            }
            Expression::Member { base, property } => {
                format!("{}.{}", self.operand(*base), property.name)
            }
            Expression::EnumValue { .. } => {
                match ConstantEvaluator::new(self.document, &self.results.resolutions).evaluate(id) {
                    Some(ConstantValue::Integer(value)) => format!("{value}u"),
                    Some(ConstantValue::String(_)) => STRING.to_string(),
                    _ => INVALID.to_string(),
                }
            }
            Expression::New { ty, arguments } => {
                format!("{}({})", self.attached_type(*ty), self.arguments(arguments))
            }
            Expression::Call {
                function,
                arguments,
            } => format!("{}({})", function.name, self.arguments(arguments)),
            Expression::Grouping(inner) => format!("({})", self.expression(*inner)),
        }
    }

    /// Operands which are operations themselves get parentheses
    fn operand(&self, id: NodeId) -> String {
        match self.document.expression(id) {
            Some(Expression::Binary { .. } | Expression::Unary { .. }) => {
                format!("({})", self.expression(id))
            }
            _ => self.expression(id),
        }
    }

    fn arguments(&self, arguments: &[NodeId]) -> String {
        arguments
            .iter()
            .map(|&argument| self.expression(argument))
            .join(", ")
    }
}

pub fn type_name(ty: &Type) -> String {
    match ty.kind() {
        TypeKind::Boolean => "bool".to_string(),
        TypeKind::Numeric(kind) => numeric_name(*kind).to_string(),
        TypeKind::Vector(size, inner) => format!("vec{size}<{}>", type_name(inner)),
        TypeKind::Matrix {
            columns,
            rows,
            inner,
            ..
        } => format!("mat{columns}x{rows}<{}>", type_name(inner)),
        TypeKind::Array {
            inner,
            length: ArrayLength::Runtime,
        } => format!("array<{}>", type_name(inner)),
        TypeKind::Array { inner, length } => format!("array<{}, {length}>", type_name(inner)),
        TypeKind::Struct(structure) => structure.name.clone(),
        TypeKind::Enum(enumeration) => type_name(&enumeration.underlying),
        TypeKind::Alias(alias) => alias.name.clone(),
        TypeKind::Pointer(pointer) => format!(
            "ptr<{}, {}>",
            pointer.space().unwrap_or(AddressSpace::Function),
            type_name(&pointer.pointee)
        ),
        TypeKind::Sampler(SamplerKind::Sampler) => "sampler".to_string(),
        TypeKind::Sampler(SamplerKind::ComparisonSampler) => "sampler_comparison".to_string(),
        TypeKind::Texture(texture) => match texture.kind {
            TextureKind::Sampled(dimension) => format!(
                "texture_{}<{}>",
                dimension_name(dimension),
                texture.sampled.as_ref().map(type_name).unwrap_or_else(|| INVALID.to_string())
            ),
            TextureKind::Multisampled2D => format!(
                "texture_multisampled_2d<{}>",
                texture.sampled.as_ref().map(type_name).unwrap_or_else(|| INVALID.to_string())
            ),
            TextureKind::Depth(dimension) => format!("texture_depth_{}", dimension_name(dimension)),
            TextureKind::DepthMultisampled2D => "texture_depth_multisampled_2d".to_string(),
            TextureKind::Storage(dimension) => match (texture.format, texture.access) {
                (Some(format), Some(access)) => format!(
                    "texture_storage_{}<{format}, {access}>",
                    dimension_name(dimension)
                ),
                _ => INVALID.to_string(),
            },
        },
        TypeKind::String => STRING.to_string(),
        TypeKind::Void | TypeKind::Invalid => INVALID.to_string(),
    }
}

fn numeric_name(kind: NumericKind) -> &'static str {
    match kind {
        NumericKind::Int32 | NumericKind::AbstractInt => "i32",
        NumericKind::UInt32 => "u32",
        NumericKind::Float32 | NumericKind::AbstractFloat => "f32",
        NumericKind::Float16 => "f16",
    }
}

fn dimension_name(dimension: TextureDimension) -> &'static str {
    match dimension {
        TextureDimension::D1 => "1d",
        TextureDimension::D2 => "2d",
        TextureDimension::D2Array => "2d_array",
        TextureDimension::D3 => "3d",
        TextureDimension::Cube => "cube",
        TextureDimension::CubeArray => "cube_array",
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::middle::{
        builtins::BuiltinCatalog,
        primitive::{AccessMode, TexelFormat, VectorSize},
        ty::TextureType,
        validate::{tests::build, validate},
    };

    fn emit(source: &str) -> String {
        let document = build(source);
        let results = validate(&document, &BuiltinCatalog::new()).unwrap();

        assert!(results.incidents.is_empty(), "{:#?}", results.incidents);

        CodeGeneratorWgsl.translate(
            &document,
            &results,
            &TranspileOptions {
                header: false,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_type_names() {
        let float = Type::numeric(NumericKind::Float32);

        assert_eq!(type_name(&Type::boolean()), "bool");
        assert_eq!(type_name(&Type::numeric(NumericKind::AbstractInt)), "i32");
        assert_eq!(type_name(&Type::numeric(NumericKind::AbstractFloat)), "f32");
        assert_eq!(type_name(&Type::numeric(NumericKind::Float16)), "f16");
        assert_eq!(
            type_name(&Type::vector(VectorSize::Three, float.clone())),
            "vec3<f32>"
        );
        assert_eq!(
            type_name(&Type::matrix(VectorSize::Four, VectorSize::Three, float.clone())),
            "mat4x3<f32>"
        );
        assert_eq!(
            type_name(&Type::array(float.clone(), ArrayLength::Runtime)),
            "array<f32>"
        );
        assert_eq!(
            type_name(&Type::array(float.clone(), ArrayLength::Constant(8))),
            "array<f32, 8>"
        );
        assert_eq!(
            type_name(&Type::pointer(float.clone(), None)),
            "ptr<function, f32>"
        );
        assert_eq!(
            type_name(&Type::pointer(float.clone(), Some(AddressSpace::Workgroup))),
            "ptr<workgroup, f32>"
        );
        assert_eq!(type_name(&Type::invalid()), "/* invalid */");
        assert_eq!(type_name(&Type::string()), "/* string */");
    }

    #[test]
    fn test_handle_type_names() {
        let texture = |kind, sampled, format, access| {
            type_name(&Type::new(TypeKind::Texture(TextureType {
                kind,
                sampled,
                format,
                access,
            })))
        };

        assert_eq!(
            type_name(&Type::new(TypeKind::Sampler(SamplerKind::ComparisonSampler))),
            "sampler_comparison"
        );
        assert_eq!(
            texture(
                TextureKind::Sampled(TextureDimension::D2),
                Some(Type::numeric(NumericKind::Float32)),
                None,
                None
            ),
            "texture_2d<f32>"
        );
        assert_eq!(
            texture(TextureKind::Depth(TextureDimension::CubeArray), None, None, None),
            "texture_depth_cube_array"
        );
        assert_eq!(
            texture(
                TextureKind::Storage(TextureDimension::D2),
                None,
                Some(TexelFormat::Rgba8Unorm),
                Some(AccessMode::Write)
            ),
            "texture_storage_2d<rgba8unorm, write>"
        );
    }

    #[test]
    fn test_module_variables() {
        let output = emit(indoc! {"
            const scale: Float32 = 2.0;
            @id(3) param count: UInt32 = 64u;
            @group(0) @binding(0) @access(read_write) storage values: Array<Float32>;
            @resource(0, 1) uniform tint: Vector4<Float32>;
            @group(1) @binding(0) uniform colors: Texture2D<Float32>;
            @group(1) @binding(1) uniform linear: Sampler;
            private seed: UInt32;
            workgroup tile: Array<Float32, count>;
        "});

        assert_eq!(
            output,
            indoc! {"
                const scale: f32 = 2.0;

                @id(3) override count: u32 = 64u;

                @group(0) @binding(0) var<storage, read_write> values: array<f32>;

                @group(0) @binding(1) var<uniform> tint: vec4<f32>;

                @group(1) @binding(0) var colors: texture_2d<f32>;

                @group(1) @binding(1) var linear: sampler;

                var<private> seed: u32;

                var<workgroup> tile: array<f32, count>;
            "}
        );
    }

    #[test]
    fn test_structs_aliases_and_enums() {
        let output = emit(indoc! {"
            enum Mode { Off = 0u, On = 4u }
            alias Color = Vector4<Float32>;
            struct Light {
                @align(16) position: Vector3<Float32>,
                color: Color,
            }
            const mode: Mode = Mode::On;
        "});

        assert_eq!(
            output,
            indoc! {"
                alias Color = vec4<f32>;

                struct Light {
                    @align(16) position: vec3<f32>,
                    color: Color,
                }

                const mode: u32 = 4u;
            "}
        );
    }

    #[test]
    fn test_entry_point() {
        let output = emit(indoc! {"
            @group(0) @binding(0) @access(read_write) storage values: Array<Float32>;

            @compute @workgroup_size(64)
            fn main(@builtin(global_invocation_id) id: Vector3<UInt32>) {
                let index = id.x;
                if index < arrayLength(&values) {
                    values[index] = values[index] * (2.0 + 1.0);
                }
            }
        "});

        assert_eq!(
            output,
            indoc! {"
                @group(0) @binding(0) var<storage, read_write> values: array<f32>;

                @compute @workgroup_size(64) fn main(@builtin(global_invocation_id) id: vec3<u32>) {
                    var index = id.x;
                    if index < arrayLength(&values) {
                        values[index] = values[index] * (2.0 + 1.0);
                    }
                }
            "}
        );
    }

    #[test]
    fn test_statements() {
        let output = emit(indoc! {"
            @fragment
            fn shade(@location(0) uv: Vector2<Float32>) -> @location(0) Vector4<Float32> {
                let total: Float32 = 0.0;
                const steps = 4u;
                for (let i = 0u; i < steps; i += 1u) {
                    if i == 2u { continue; } else if i == 3u { break; } else { total += uv.x; }
                }
                while total > 1.0 {
                    total = total / 2.0;
                }
                let p = &total;
                switch steps {
                    case 1u, 2u: { discard; }
                    default: {}
                }
                return new Vector4<Float32>(*p, uv.yx, 1.0);
            }
        "});

        assert_eq!(
            output,
            indoc! {"
                @fragment fn shade(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
                    var total: f32 = 0.0;
                    const steps = 4u;
                    for (var i = 0u; i < steps; i += 1u) {
                        if i == 2u {
                            continue;
                        } else if i == 3u {
                            break;
                        } else {
                            total += uv.x;
                        }
                    }
                    while total > 1.0 {
                        total = total / 2.0;
                    }
                    let p = &total;
                    switch steps {
                        case 1u, 2u: {
                            discard;
                        }
                        default: {
                        }
                    }
                    return vec4<f32>(*p, uv.yx, 1.0);
                }
            "}
        );
    }

    #[test]
    fn test_header_and_indent_options() {
        let document = build("fn main() { return; }");
        let results = validate(&document, &BuiltinCatalog::new()).unwrap();

        let output = CodeGeneratorWgsl.translate(
            &document,
            &results,
            &TranspileOptions {
                indent: "\t".to_string(),
                header: true,
            },
        );

        assert!(output.starts_with("// Generated by sheenc "), "{output}");
        assert!(output.ends_with("fn main() {\n\treturn;\n}\n"), "{output}");
    }
}
