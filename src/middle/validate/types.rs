use crate::{
    error::Fatal,
    middle::{
        ast::{DeclarationKeyword, DeclarationKind, Identifier, NodeId, TypeExpression},
        constant::ConstantEvaluator,
        primitive::{AccessMode, NumericKind, TexelFormat},
        trace::{Attachment, FixedState, ValidationTrace, report_error},
        ty::{ArrayLength, TextureType, Type, TypeKind},
    },
};

impl ValidationTrace<'_> {
    pub(super) fn validate_type(
        &mut self,
        id: NodeId,
        ty: &TypeExpression,
    ) -> Result<Attachment, Fatal> {
        let resolved = match ty {
            TypeExpression::Named(name) => self.resolve_type_name(id, name)?,
            TypeExpression::Vector { size, inner } => {
                let inner = self.get_attachment(*inner)?.resolve_type;

                if inner.is_invalid() {
                    Type::invalid()
                } else if !inner.capabilities().scalar {
                    report_error!(self, id, "Vector components must be scalars, found '{}'.", inner);
                    Type::invalid()
                } else {
                    Type::vector(*size, inner)
                }
            }
            TypeExpression::Matrix {
                columns,
                rows,
                inner,
            } => {
                let inner = self.get_attachment(*inner)?.resolve_type;

                if inner.is_invalid() {
                    Type::invalid()
                } else if !inner.numeric_kind().is_some_and(NumericKind::is_float) {
                    report_error!(
                        self,
                        id,
                        "Matrix components must be floating point, found '{}'.",
                        inner
                    );
                    Type::invalid()
                } else {
                    Type::matrix(*columns, *rows, inner)
                }
            }
            TypeExpression::Array { inner, length } => {
                let inner = self.get_attachment(*inner)?.resolve_type;
                let capabilities = inner.capabilities();

                if !inner.is_invalid() && !(capabilities.plain && capabilities.fixed_footprint) {
                    report_error!(
                        self,
                        id,
                        "Array elements must have a fixed footprint, found '{}'.",
                        inner
                    );
                }

                match length {
                    None => Type::array(inner, ArrayLength::Runtime),
                    Some(length) => match self.array_length(*length)? {
                        Some(length) => Type::array(inner, length),
                        None => Type::invalid(),
                    },
                }
            }
            TypeExpression::Pointer { inner } => {
                let inner = self.get_attachment(*inner)?.resolve_type;

                if inner.is_void() {
                    report_error!(self, id, "Pointers cannot point to 'Void'.");
                    Type::invalid()
                } else {
                    Type::pointer(inner, None)
                }
            }
            TypeExpression::Sampler(kind) => Type::new(TypeKind::Sampler(*kind)),
            TypeExpression::Texture {
                kind,
                sampled,
                format,
                access,
            } => {
                let sampled = match sampled {
                    Some(sampled) => Some(self.texture_channel_type(*sampled)?),
                    None => None,
                };

                let format = format.as_ref().and_then(|format| {
                    let parsed = format.name.parse::<TexelFormat>().ok();

                    if parsed.is_none() {
                        report_error!(
                            self,
                            at format.span,
                            id,
                            "'{}' is not a texel format.",
                            format.name
                        );
                    }

                    parsed
                });

                let access = access.as_ref().and_then(|access| {
                    let parsed = access.name.parse::<AccessMode>().ok();

                    if parsed.is_none() {
                        report_error!(
                            self,
                            at access.span,
                            id,
                            "'{}' is not an access mode.",
                            access.name
                        );
                    }

                    parsed
                });

                Type::new(TypeKind::Texture(TextureType {
                    kind: *kind,
                    sampled,
                    format,
                    access,
                }))
            }
        };

        Ok(Attachment::constant(resolved))
    }

    /// Built-in scalar names, then user declared structs, enums and aliases
    fn resolve_type_name(&mut self, id: NodeId, name: &Identifier) -> Result<Type, Fatal> {
        match name.name.as_str() {
            "Boolean" => return Ok(Type::boolean()),
            "String" => return Ok(Type::string()),
            "Void" => return Ok(Type::void()),
            other => {
                if let Some(kind) = NumericKind::from_type_name(other) {
                    return Ok(Type::numeric(kind));
                }
            }
        }

        let Some(declaration_id) = self.get_scoped_value(name, id) else {
            return Ok(Type::invalid());
        };

        self.record_resolution(id, declaration_id);

        let declaration = self
            .document()
            .declaration(declaration_id)
            .ok_or(Fatal::UnknownNode(declaration_id))?;

        match declaration.kind {
            DeclarationKind::Struct { .. }
            | DeclarationKind::Enum { .. }
            | DeclarationKind::Alias { .. } => {
                Ok(self.get_attachment(declaration_id)?.resolve_type)
            }
            _ => {
                report_error!(self, id, "'{}' is not a type.", name.name);
                Ok(Type::invalid())
            }
        }
    }

    /// A constant length, or the name of a `param` declaration. `None` once
    /// an incident was reported.
    fn array_length(&mut self, length: NodeId) -> Result<Option<ArrayLength>, Fatal> {
        let attachment = self.get_attachment(length)?;
        let ty = &attachment.resolve_type;

        if ty.is_invalid() {
            return Ok(None);
        }

        if !ty.numeric_kind().is_some_and(NumericKind::is_integer) {
            report_error!(self, length, "Array length must be an integer, found '{}'.", ty);
            return Ok(None);
        }

        if attachment.fixed_state == FixedState::Constant {
            let value = ConstantEvaluator::new(self.document(), self.resolutions())
                .evaluate(length)
                .and_then(|value| value.as_integer());

            return Ok(match value {
                Some(value) if value > 0 => Some(ArrayLength::Constant(value as u64)),
                Some(_) => {
                    report_error!(self, length, "Array length must be greater than zero.");
                    None
                }
                None => {
                    report_error!(self, length, "Array length could not be evaluated.");
                    None
                }
            });
        }

        let overridable = self
            .resolutions()
            .get(&length)
            .copied()
            .and_then(|declaration_id| {
                let declaration = self.document().declaration(declaration_id)?;

                match &declaration.kind {
                    DeclarationKind::Variable(variable)
                        if variable.keyword == DeclarationKeyword::Param =>
                    {
                        Some(ArrayLength::Override {
                            declaration: declaration_id,
                            name: declaration.name.name.clone(),
                        })
                    }
                    _ => None,
                }
            });

        if overridable.is_none() {
            report_error!(
                self,
                length,
                "Array length must be a constant or the name of a 'param' declaration."
            );
        }

        Ok(overridable)
    }

    fn texture_channel_type(&mut self, sampled: NodeId) -> Result<Type, Fatal> {
        let ty = self.get_attachment(sampled)?.resolve_type;

        let is_channel = matches!(
            ty.numeric_kind(),
            Some(NumericKind::Int32 | NumericKind::UInt32 | NumericKind::Float32)
        );

        if !is_channel && !ty.is_invalid() {
            report_error!(
                self,
                sampled,
                "Texture channels must be Int32, UInt32 or Float32, found '{}'.",
                ty
            );
            return Ok(Type::invalid());
        }

        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use crate::middle::validate::tests::{messages, validate_source};

    #[test]
    fn test_type_expressions() {
        let messages = messages(
            "param count: UInt32 = 8u;
            const size = 4u;
            private a: Array<Vector3<Float32>, size>;
            workgroup b: Array<Float32, count>;
            @group(0) @binding(0) uniform c: Texture2D<Float32>;
            @group(0) @binding(1) uniform d: StorageTexture2D<rgba8unorm, write>;
            @group(0) @binding(2) storage e: Array<Matrix4x4<Float32>>;",
        );

        assert!(messages.is_empty(), "{messages:#?}");
    }

    #[test]
    fn test_illegal_type_expressions() {
        let messages = messages(
            "private a: Vector3<Array<Float32, 2>>;
            private b: Matrix2x2<Int32>;
            private c: Array<Float32, 0>;
            private d: Missing;
            @group(0) @binding(0) uniform e: StorageTexture2D<rgba3unorm, write>;
            fn f() {}
            private g: f;",
        );

        for expected in [
            "Vector components must be scalars, found 'Array<Float32, 2>'.",
            "Matrix components must be floating point, found 'Int32'.",
            "Array length must be greater than zero.",
            "'Missing' is not defined.",
            "'rgba3unorm' is not a texel format.",
            "'f' is not a type.",
        ] {
            assert!(messages.contains(&expected.to_string()), "{expected}: {messages:#?}");
        }
    }

    #[test]
    fn test_array_lengths_resolve() {
        let results = validate_source("const n = 2u + 1u; private a: Array<Int32, n>;");

        assert!(results.incidents.is_empty(), "{:#?}", results.incidents);
        assert!(
            results
                .attachments
                .values()
                .any(|attachment| attachment.resolve_type.to_string() == "Array<Int32, 3>")
        );
    }
}
