use hashbrown::HashSet;
use itertools::Itertools;

use crate::{
    error::Fatal,
    middle::{
        ast::{
            Declaration, DeclarationKeyword, DeclarationKind, DeclarationScope, EnumMember,
            FunctionDeclaration, Identifier, NodeId, VariableDeclaration,
        },
        constant::{ConstantEvaluator, fits_into},
        primitive::{AddressSpace, NumericKind},
        trace::{Attachment, FixedState, ValidationTrace, report_error},
        ty::{AliasType, EnumType, StructMember, StructType, Type, TypeKind},
    },
};

const STAGE_ATTRIBUTES: [&str; 3] = ["vertex", "fragment", "compute"];

impl DeclarationKeyword {
    pub fn fixed_state(self) -> FixedState {
        match self {
            DeclarationKeyword::Const => FixedState::Constant,
            DeclarationKeyword::Param => FixedState::PipelineCreationFixed,
            DeclarationKeyword::Uniform => FixedState::ScopeFixed,
            DeclarationKeyword::Storage
            | DeclarationKeyword::Workgroup
            | DeclarationKeyword::Private
            | DeclarationKeyword::Let => FixedState::Variable,
        }
    }

    pub fn address_space(self, scope: DeclarationScope) -> AddressSpace {
        match (self, scope) {
            (DeclarationKeyword::Storage, _) => AddressSpace::Storage,
            (DeclarationKeyword::Uniform, _) => AddressSpace::Uniform,
            (DeclarationKeyword::Workgroup, _) => AddressSpace::Workgroup,
            (_, DeclarationScope::Function) => AddressSpace::Function,
            (
                DeclarationKeyword::Private | DeclarationKeyword::Const | DeclarationKeyword::Param,
                DeclarationScope::Module,
            ) => AddressSpace::Private,
            (DeclarationKeyword::Let, DeclarationScope::Module) => AddressSpace::Function,
        }
    }

    fn is_allowed_in(self, scope: DeclarationScope) -> bool {
        match self {
            DeclarationKeyword::Const => true,
            DeclarationKeyword::Let => scope == DeclarationScope::Function,
            _ => scope == DeclarationScope::Module,
        }
    }
}

impl ValidationTrace<'_> {
    pub(super) fn validate_declaration(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
    ) -> Result<Attachment, Fatal> {
        match &declaration.kind {
            DeclarationKind::Variable(variable) => {
                self.validate_variable(id, declaration, variable)
            }
            DeclarationKind::Parameter { ty } => {
                self.get_attachment(declaration.attributes)?;
                let ty = self.get_attachment(*ty)?.resolve_type;

                // Bound by the first call, separately from any alias it names
                let ty = ty
                    .pointee()
                    .map(|pointee| Type::pointer(pointee.clone(), None))
                    .unwrap_or(ty);

                if !(ty.capabilities().constructible || ty.is_pointer() || ty.is_handle())
                    && !ty.is_invalid()
                {
                    report_error!(
                        self,
                        at declaration.name.span,
                        id,
                        "Parameter '{}' has type '{}' which cannot be passed to a function.",
                        declaration.name.name,
                        ty
                    );
                }

                Ok(Attachment::new(FixedState::ScopeFixed, ty))
            }
            DeclarationKind::Property { ty } => {
                self.get_attachment(declaration.attributes)?;
                let ty = self.get_attachment(*ty)?.resolve_type;

                Ok(Attachment::constant(ty))
            }
            DeclarationKind::Struct { properties } => {
                self.validate_struct(id, declaration, properties)
            }
            DeclarationKind::Enum { members } => self.validate_enum(id, declaration, members),
            DeclarationKind::Alias { ty } => {
                self.get_attachment(declaration.attributes)?;
                let target = self.get_attachment(*ty)?.resolve_type;

                if target.is_void() {
                    report_error!(
                        self,
                        at declaration.name.span,
                        id,
                        "Alias '{}' cannot stand for 'Void'.",
                        declaration.name.name
                    );
                }

                Ok(Attachment::constant(Type::new(TypeKind::Alias(AliasType {
                    name: declaration.name.name.clone(),
                    declaration: id,
                    target,
                }))))
            }
            DeclarationKind::Function(function) => {
                self.validate_function_signature(id, declaration, function)
            }
        }
    }

    fn validate_variable(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
        variable: &VariableDeclaration,
    ) -> Result<Attachment, Fatal> {
        let name = &declaration.name;
        let keyword = variable.keyword;

        if !keyword.is_allowed_in(variable.scope) {
            let message = match variable.scope {
                DeclarationScope::Module => "are not allowed at module scope",
                DeclarationScope::Function => "are only allowed at module scope",
            };

            report_error!(self, at name.span, id, "'{}' declarations {}.", keyword, message);
        }

        self.get_attachment(declaration.attributes)?;

        let declared = match variable.ty {
            Some(ty) => Some(self.get_attachment(ty)?.resolve_type),
            None => None,
        };

        let initializer = match variable.initializer {
            Some(initializer) => Some(self.get_attachment(initializer)?),
            None => None,
        };

        let needs_initializer = matches!(
            keyword,
            DeclarationKeyword::Const | DeclarationKeyword::Param
        );

        if needs_initializer && initializer.is_none() {
            report_error!(self, at name.span, id, "'{}' must have an initializer.", name.name);
        }

        let forbids_initializer = matches!(
            keyword,
            DeclarationKeyword::Storage | DeclarationKeyword::Uniform | DeclarationKeyword::Workgroup
        );

        if let Some(initializer) = variable.initializer.filter(|_| forbids_initializer) {
            report_error!(
                self,
                initializer,
                "'{}' declaration '{}' cannot have an initializer.",
                keyword,
                name.name
            );
        }

        let mut ty = match (&declared, &initializer) {
            (Some(declared), Some(initializer)) => {
                let value = &initializer.resolve_type;

                if !value.is_implicitly_castable_into(declared) {
                    report_error!(
                        self,
                        variable.initializer.unwrap_or(id),
                        "Cannot assign a value of type '{}' to '{}' of type '{}'.",
                        value,
                        name.name,
                        declared
                    );
                }

                declared.clone()
            }
            (Some(declared), None) => declared.clone(),
            (None, Some(initializer)) if keyword == DeclarationKeyword::Const => {
                initializer.resolve_type.clone()
            }
            (None, Some(initializer)) => initializer.resolve_type.concretize(),
            (None, None) => {
                if !needs_initializer {
                    report_error!(
                        self,
                        at name.span,
                        id,
                        "'{}' must have a type or an initializer.",
                        name.name
                    );
                }

                Type::invalid()
            }
        };

        if let (Some(expression), Some(initializer)) = (variable.initializer, &initializer) {
            self.validate_constant_conversion(name, expression, initializer, &ty);
        }

        if let Some(initializer) = &initializer {
            let minimum = match keyword {
                DeclarationKeyword::Const => Some(FixedState::Constant),
                DeclarationKeyword::Param => Some(FixedState::PipelineCreationFixed),
                _ => None,
            };

            if minimum.is_some_and(|minimum| initializer.fixed_state < minimum) {
                let message = match keyword {
                    DeclarationKeyword::Const => "a constant expression",
                    _ => "fixed at pipeline creation",
                };

                report_error!(
                    self,
                    variable.initializer.unwrap_or(id),
                    "Initializer of '{}' must be {}.",
                    name.name,
                    message
                );
            }
        }

        let mut address_space = keyword.address_space(variable.scope);

        if !ty.is_invalid() {
            let capabilities = ty.capabilities();
            let is_handle = keyword == DeclarationKeyword::Uniform && ty.is_handle();

            let requirements: &[(bool, &str)] = match keyword {
                DeclarationKeyword::Const | DeclarationKeyword::Private => {
                    &[(capabilities.constructible, "constructible")]
                }
                DeclarationKeyword::Storage => &[(capabilities.host_shareable, "host-shareable")],
                DeclarationKeyword::Uniform if is_handle => &[],
                DeclarationKeyword::Uniform => &[
                    (capabilities.constructible, "constructible"),
                    (capabilities.host_shareable, "host-shareable"),
                ],
                DeclarationKeyword::Workgroup => &[
                    (capabilities.fixed_footprint, "of a fixed footprint"),
                    (capabilities.plain, "plain"),
                ],
                DeclarationKeyword::Param => &[
                    (capabilities.constructible, "constructible"),
                    (capabilities.scalar, "a scalar"),
                ],
                DeclarationKeyword::Let if ty.is_pointer() => &[],
                DeclarationKeyword::Let => &[(capabilities.constructible, "constructible")],
            };

            for (satisfied, requirement) in requirements {
                if !satisfied {
                    report_error!(
                        self,
                        at name.span,
                        id,
                        "Type '{}' of '{}' is not {}.",
                        ty,
                        name.name,
                        requirement
                    );
                }
            }
        }

        if keyword == DeclarationKeyword::Let && ty.is_pointer() {
            match &initializer {
                None => report_error!(
                    self,
                    at name.span,
                    id,
                    "Pointer '{}' must have an initializer.",
                    name.name
                ),
                Some(initializer) => {
                    let space = initializer
                        .resolve_type
                        .address_space()
                        .unwrap_or(AddressSpace::Function);

                    // Aliases and type expressions are shared, so the bound
                    // pointer belongs to this declaration only
                    ty = ty
                        .pointee()
                        .map(|pointee| Type::pointer(pointee.clone(), Some(space)))
                        .unwrap_or(ty);
                    address_space = space;
                }
            }
        }

        if variable.scope == DeclarationScope::Module {
            self.validate_module_variable_attributes(id, declaration, keyword, &ty);
        }

        Ok(Attachment {
            fixed_state: keyword.fixed_state(),
            is_storage: false,
            resolve_type: ty,
            address_space: Some(address_space),
        })
    }

    /// Abstract constants take on the stored type, so their value has to fit
    /// into it
    fn validate_constant_conversion(
        &mut self,
        name: &Identifier,
        expression: NodeId,
        initializer: &Attachment,
        target: &Type,
    ) {
        if initializer.fixed_state != FixedState::Constant {
            return;
        }

        let is_abstract = initializer
            .resolve_type
            .component_numeric_kind()
            .is_some_and(NumericKind::is_abstract);

        let Some(kind) = target
            .component_numeric_kind()
            .filter(|kind| is_abstract && !kind.is_abstract())
        else {
            return;
        };

        let Some(value) =
            ConstantEvaluator::new(self.document(), self.resolutions()).evaluate(expression)
        else {
            return;
        };

        if !fits_into(&value, kind) {
            report_error!(
                self,
                expression,
                "Value {} of '{}' does not fit into {}.",
                value,
                name.name,
                target
            );
        }
    }

    /// Placement rules for the attributes which only make sense on some
    /// module variable keywords
    fn validate_module_variable_attributes(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
        keyword: DeclarationKeyword,
        ty: &Type,
    ) {
        let document = self.document();
        let list = declaration.attributes;
        let has = |name: &str| document.find_attribute(list, name).is_some();
        let name = &declaration.name;

        let is_resource = matches!(
            keyword,
            DeclarationKeyword::Storage | DeclarationKeyword::Uniform
        );

        if is_resource {
            if !(has("resource") || (has("group") && has("binding"))) {
                report_error!(
                    self,
                    at name.span,
                    id,
                    "'{}' requires '@group' and '@binding' or '@resource'.",
                    name.name
                );
            }

            if has("resource") && (has("group") || has("binding")) {
                report_error!(
                    self,
                    at name.span,
                    id,
                    "'@resource' cannot be combined with '@group' or '@binding'."
                );
            }
        } else {
            for attribute in ["group", "binding", "resource"] {
                if has(attribute) {
                    report_error!(
                        self,
                        at name.span,
                        id,
                        "'@{}' is only allowed on storage and uniform declarations.",
                        attribute
                    );
                }
            }
        }

        if has("access") && keyword != DeclarationKeyword::Storage {
            report_error!(
                self,
                at name.span,
                id,
                "'@access' is only allowed on storage declarations."
            );
        }

        if has("id") && keyword != DeclarationKeyword::Param {
            report_error!(
                self,
                at name.span,
                id,
                "'@id' is only allowed on param declarations."
            );
        }

        if keyword == DeclarationKeyword::Uniform && ty.is_runtime_sized_array() {
            report_error!(
                self,
                at name.span,
                id,
                "Uniform '{}' cannot be a runtime-sized array.",
                name.name
            );
        }
    }

    fn validate_struct(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
        properties: &[NodeId],
    ) -> Result<Attachment, Fatal> {
        let document = self.document();
        let name = &declaration.name;

        self.get_attachment(declaration.attributes)?;

        if properties.is_empty() {
            report_error!(
                self,
                at name.span,
                id,
                "Struct '{}' must have at least one property.",
                name.name
            );
        }

        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(properties.len());

        for (position, &property_id) in properties.iter().enumerate() {
            let property = document
                .declaration(property_id)
                .ok_or(Fatal::UnknownNode(property_id))?;
            let ty = self.get_attachment(property_id)?.resolve_type;
            let is_last = position + 1 == properties.len();

            if !seen.insert(property.name.name.as_str()) {
                report_error!(
                    self,
                    at property.name.span,
                    property_id,
                    "Property '{}' is already defined in '{}'.",
                    property.name.name,
                    name.name
                );
                continue;
            }

            let capabilities = ty.capabilities();

            if ty.is_invalid() {
                // Already reported where the type was written
            } else if !capabilities.plain {
                report_error!(
                    self,
                    at property.name.span,
                    property_id,
                    "Property '{}' of '{}' has type '{}' which cannot be a struct member.",
                    property.name.name,
                    name.name,
                    ty
                );
            } else if !capabilities.fixed_footprint && !(is_last && ty.is_runtime_sized_array()) {
                report_error!(
                    self,
                    at property.name.span,
                    property_id,
                    "Property '{}' of '{}' must have a fixed footprint. Only the last property may be a runtime-sized array.",
                    property.name.name,
                    name.name
                );
            }

            members.push(StructMember {
                name: property.name.name.clone(),
                ty,
            });
        }

        Ok(Attachment::constant(Type::new(TypeKind::Struct(StructType {
            name: name.name.clone(),
            declaration: id,
            members,
        }))))
    }

    fn validate_enum(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
        members: &[EnumMember],
    ) -> Result<Attachment, Fatal> {
        let name = &declaration.name;

        self.get_attachment(declaration.attributes)?;

        if members.is_empty() {
            report_error!(
                self,
                at name.span,
                id,
                "Enum '{}' must have at least one member.",
                name.name
            );
        }

        let unsigned = Type::numeric(NumericKind::UInt32);
        let mut seen = HashSet::new();
        let mut underlying: Option<Type> = None;

        for member in members {
            if !seen.insert(member.name.name.as_str()) {
                report_error!(
                    self,
                    at member.name.span,
                    member.value,
                    "Member '{}' is already defined in '{}'.",
                    member.name.name,
                    name.name
                );
            }

            let attachment = self.get_attachment(member.value)?;
            let ty = &attachment.resolve_type;

            if ty.is_invalid() {
                continue;
            }

            if attachment.fixed_state != FixedState::Constant {
                report_error!(
                    self,
                    member.value,
                    "Value of '{}::{}' must be a constant expression.",
                    name.name,
                    member.name.name
                );
                continue;
            }

            let kind = if ty.is_string() {
                Type::string()
            } else if ty.is_implicitly_castable_into(&unsigned) {
                let value = ConstantEvaluator::new(self.document(), self.resolutions())
                    .evaluate(member.value)
                    .and_then(|value| value.as_integer());

                if value.is_some_and(|value| u32::try_from(value).is_err()) {
                    report_error!(
                        self,
                        member.value,
                        "Value of '{}::{}' does not fit into UInt32.",
                        name.name,
                        member.name.name
                    );
                }

                unsigned.clone()
            } else {
                report_error!(
                    self,
                    member.value,
                    "Value of '{}::{}' must be an unsigned integer or a string, found '{}'.",
                    name.name,
                    member.name.name,
                    ty
                );
                continue;
            };

            match &underlying {
                None => underlying = Some(kind),
                Some(underlying) if underlying.equals(&kind) => {}
                Some(_) => report_error!(
                    self,
                    member.value,
                    "Members of '{}' must all be unsigned integers or all be strings.",
                    name.name
                ),
            }
        }

        Ok(Attachment::constant(Type::new(TypeKind::Enum(EnumType {
            name: name.name.clone(),
            declaration: id,
            underlying: underlying.unwrap_or(unsigned),
        }))))
    }

    /// Parameters, return type and attributes. The body is checked once every
    /// signature is known, see [`ValidationTrace::validate_function_body`].
    fn validate_function_signature(
        &mut self,
        id: NodeId,
        declaration: &Declaration,
        function: &FunctionDeclaration,
    ) -> Result<Attachment, Fatal> {
        let document = self.document();
        let name = &declaration.name;

        self.get_attachment(declaration.attributes)?;
        self.get_attachment(function.return_attributes)?;

        for &parameter in &function.parameters {
            self.get_attachment(parameter)?;
        }

        let return_type = match function.return_type {
            Some(ty) => self.get_attachment(ty)?.resolve_type,
            None => Type::void(),
        };

        if !return_type.is_void()
            && !return_type.is_invalid()
            && !return_type.capabilities().constructible
        {
            report_error!(
                self,
                at name.span,
                id,
                "Return type '{}' of '{}' is not constructible.",
                return_type,
                name.name
            );
        }

        let stages = STAGE_ATTRIBUTES
            .iter()
            .filter(|stage| document.find_attribute(declaration.attributes, stage).is_some())
            .collect_vec();

        if stages.len() > 1 {
            report_error!(
                self,
                at name.span,
                id,
                "Function '{}' can only be one of {}.",
                name.name,
                stages.iter().map(|stage| format!("@{stage}")).join(", ")
            );
        }

        let is_compute = document
            .find_attribute(declaration.attributes, "compute")
            .is_some();
        let has_workgroup_size = document
            .find_attribute(declaration.attributes, "workgroup_size")
            .is_some();

        if is_compute && !has_workgroup_size {
            report_error!(
                self,
                at name.span,
                id,
                "Compute function '{}' requires '@workgroup_size'.",
                name.name
            );
        }

        if has_workgroup_size && !is_compute {
            report_error!(
                self,
                at name.span,
                id,
                "'@workgroup_size' requires '@compute'."
            );
        }

        Ok(Attachment::constant(return_type))
    }

    /// Validates the statements of a function with its parameters in scope
    pub(super) fn validate_function_body(&mut self, id: NodeId) -> Result<(), Fatal> {
        let document = self.document();
        let declaration = document.declaration(id).ok_or(Fatal::UnknownNode(id))?;

        let DeclarationKind::Function(function) = &declaration.kind else {
            return Ok(());
        };

        let return_type = self.get_attachment(id)?.resolve_type;

        self.push_scope();
        self.enter_function(id, return_type.clone());

        for &parameter in &function.parameters {
            let name: &Identifier = &document
                .declaration(parameter)
                .ok_or(Fatal::UnknownNode(parameter))?
                .name;

            self.push_scoped_value(name, parameter);
        }

        let returns = self.validate_block_statements(function.body);

        self.exit_function();
        self.pop_scope();

        if !returns? && !return_type.is_void() && !return_type.is_invalid() {
            report_error!(
                self,
                at declaration.name.span,
                id,
                "Function '{}' must return a value on every path.",
                declaration.name.name
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::middle::validate::tests::{build, messages, validate_source};

    #[test]
    fn test_const_initializer_law() {
        assert_eq!(
            messages("const x: Float32;"),
            vec!["'x' must have an initializer.".to_string()]
        );

        let messages = messages(
            "private y: Float32 = 1.0;
            const x: Float32 = y;",
        );

        assert_eq!(
            messages,
            vec!["Initializer of 'x' must be a constant expression.".to_string()]
        );
    }

    #[test]
    fn test_keyword_placement() {
        let messages = messages(
            "let a = 1;
            fn f() { private b: Float32; }",
        );

        assert!(
            messages.contains(&"'let' declarations are not allowed at module scope.".to_string()),
            "{messages:#?}"
        );
        assert!(
            messages.contains(&"'private' declarations are only allowed at module scope.".to_string())
        );
    }

    #[test]
    fn test_keyword_predicates() {
        let messages = messages(
            "@group(0) @binding(0) storage a: Float32 = 1.0;
            workgroup b: Array<Float32>;
            param c: Vector2<Float32> = new Vector2<Float32>();
            uniform d: Float32;
            private e;
            @access(read) private f: Float32;",
        );

        for expected in [
            "'storage' declaration 'a' cannot have an initializer.",
            "Type 'Array<Float32>' of 'b' is not of a fixed footprint.",
            "Type 'Vector2<Float32>' of 'c' is not a scalar.",
            "'d' requires '@group' and '@binding' or '@resource'.",
            "'e' must have a type or an initializer.",
            "'@access' is only allowed on storage declarations.",
        ] {
            assert!(messages.contains(&expected.to_string()), "{expected}: {messages:#?}");
        }
    }

    #[test]
    fn test_uniform_handles_skip_buffer_checks() {
        let messages = messages(
            "@group(0) @binding(0) uniform s: Sampler;
            @resource(0, 1) uniform t: DepthTexture2D;",
        );

        assert!(messages.is_empty(), "{messages:#?}");
    }

    #[test]
    fn test_inferred_types() {
        let source = "const a = 1; private b = 1; private c: Float32 = 5.0;";
        let document = build(source);
        let results = validate_source(source);

        let types = document
            .declarations
            .iter()
            .map(|id| results.attachment(*id).unwrap().resolve_type.to_string())
            .collect::<Vec<_>>();

        assert_eq!(types, vec!["AbstractInt", "Int32", "Float32"]);
    }

    #[test]
    fn test_abstract_constants_must_fit() {
        let messages = messages(
            "const big = 3000000000;
            const wide: UInt32 = big;
            fn main() {
                let a = 3000000000;
                let b: Int32 = 3000000000;
                let c = 99999999999999999999999;
                let d: UInt32 = -1;
                let e: UInt32 = 4000000000;
                let f: Float16 = 70000.0;
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Value 3000000000 of 'a' does not fit into Int32.",
                "Value 3000000000 of 'b' does not fit into Int32.",
                "Literal '99999999999999999999999' does not fit into AbstractInt.",
                "Value -1 of 'd' does not fit into UInt32.",
                "Value 70000.0 of 'f' does not fit into Float16.",
            ]
        );
    }

    #[test]
    fn test_pointer_lets_own_their_address_space() {
        let messages = messages(
            "alias P = *Float32;
            private g: Float32 = 1.0;
            fn main() {
                let x: Float32 = 1.0;
                let p: P = &x;
                let q: P = &g;
                let r: *Float32 = &g;
            }",
        );

        assert!(messages.is_empty(), "{messages:#?}");
    }

    #[test]
    fn test_pointer_parameters_bind_on_first_call() {
        let messages = messages(
            "private g: Float32 = 1.0;
            fn read(p: *Float32) -> Float32 { return *p; }
            fn main() {
                let x: Float32 = 1.0;
                let a = read(&x);
                let b = read(&x);
                let c = read(&g);
            }",
        );

        assert_eq!(
            messages,
            vec!["Argument 1 of 'read' points into 'private', but the parameter is bound to 'function'."]
        );
    }

    #[test]
    fn test_structs() {
        let messages = messages(
            "struct Empty {}
            struct Twice { a: Float32, a: Float32 }
            struct Unsized { data: Array<Float32>, count: UInt32 }
            struct Fine { count: UInt32, data: Array<Float32> }
            struct Handles { s: Sampler }",
        );

        for expected in [
            "Struct 'Empty' must have at least one property.",
            "Property 'a' is already defined in 'Twice'.",
            "Property 'data' of 'Unsized' must have a fixed footprint. Only the last property may be a runtime-sized array.",
            "Property 's' of 'Handles' has type 'Sampler' which cannot be a struct member.",
        ] {
            assert!(messages.contains(&expected.to_string()), "{expected}: {messages:#?}");
        }

        assert_eq!(messages.len(), 4, "{messages:#?}");
    }

    #[test]
    fn test_enums() {
        let messages = messages(
            r#"enum Empty {}
            enum Mixed { A = 1u, B = "b" }
            enum Negative { A = -1 }
            enum Floats { A = 1.5 }
            enum Twice { A = 1u, A = 2u }
            enum Fine { A = 1u, B = Fine::A + 1u }"#,
        );

        for expected in [
            "Enum 'Empty' must have at least one member.",
            "Members of 'Mixed' must all be unsigned integers or all be strings.",
            "Value of 'Negative::A' does not fit into UInt32.",
            "Value of 'Floats::A' must be an unsigned integer or a string, found 'AbstractFloat'.",
            "Member 'A' is already defined in 'Twice'.",
        ] {
            assert!(messages.contains(&expected.to_string()), "{expected}: {messages:#?}");
        }

        assert_eq!(messages.len(), 5, "{messages:#?}");
    }

    #[test]
    fn test_functions() {
        let messages = messages(
            "@vertex @fragment
            fn a() {}
            @compute
            fn b() {}
            @workgroup_size(1)
            fn c() {}
            fn d(x: Float32, x: Float32) -> Float32 { if true { return x; } }
            fn e() -> Sampler { }",
        );

        for expected in [
            "Function 'a' can only be one of @vertex, @fragment.",
            "Compute function 'b' requires '@workgroup_size'.",
            "'@workgroup_size' requires '@compute'.",
            "'x' is already defined.",
            "Function 'd' must return a value on every path.",
            "Return type 'Sampler' of 'e' is not constructible.",
        ] {
            assert!(messages.contains(&expected.to_string()), "{expected}: {messages:#?}");
        }
    }
}
