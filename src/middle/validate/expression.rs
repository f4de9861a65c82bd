use itertools::Itertools;

use crate::{
    error::Fatal,
    middle::{
        ast::{
            BinaryOperatorClass, BinaryOperatorKind, DeclarationKind, Expression, Identifier,
            NodeId, UnaryOperatorKind,
        },
        constant::{ConstantEvaluator, LiteralType, parse_literal},
        primitive::{NumericKind, VectorSize},
        trace::{Attachment, FixedState, ValidationTrace, report_error},
        ty::{ArrayLength, Type, TypeKind},
    },
};

const POSITION_COMPONENTS: &str = "xyzw";
const COLOR_COMPONENTS: &str = "rgba";

/// The common type two operands convert into, preferring the concrete side
fn unify(lhs: &Type, rhs: &Type) -> Option<Type> {
    if lhs.is_implicitly_castable_into(rhs) {
        Some(rhs.clone())
    } else if rhs.is_implicitly_castable_into(lhs) {
        Some(lhs.clone())
    } else {
        None
    }
}

fn is_numeric(ty: &Type) -> bool {
    ty.component_numeric_kind().is_some()
}

fn is_integer(ty: &Type) -> bool {
    ty.component_numeric_kind()
        .is_some_and(NumericKind::is_integer)
}

fn is_boolean(ty: &Type) -> bool {
    ty.scalar_component().is_some_and(Type::is_boolean)
}

fn arithmetic_result(operator: BinaryOperatorKind, lhs: &Type, rhs: &Type) -> Option<Type> {
    let (lhs, rhs) = (lhs.resolved(), rhs.resolved());
    let multiply = operator == BinaryOperatorKind::Multiply;

    match (lhs.kind(), rhs.kind()) {
        (TypeKind::Numeric(_), TypeKind::Numeric(_)) => unify(lhs, rhs),
        (TypeKind::Vector(a, _), TypeKind::Vector(b, _))
            if a == b && is_numeric(lhs) && is_numeric(rhs) =>
        {
            unify(lhs, rhs)
        }
        (TypeKind::Vector(size, inner), TypeKind::Numeric(_)) if is_numeric(lhs) => {
            unify(inner, rhs).map(|component| Type::vector(*size, component))
        }
        (TypeKind::Numeric(_), TypeKind::Vector(size, inner)) if is_numeric(rhs) => {
            unify(lhs, inner).map(|component| Type::vector(*size, component))
        }
        (TypeKind::Matrix { .. }, TypeKind::Matrix { .. })
            if matches!(
                operator,
                BinaryOperatorKind::Add | BinaryOperatorKind::Subtract
            ) =>
        {
            unify(lhs, rhs)
        }
        (
            TypeKind::Matrix {
                columns,
                rows,
                inner,
                ..
            },
            TypeKind::Numeric(_),
        ) if multiply => unify(inner, rhs).map(|c| Type::matrix(*columns, *rows, c)),
        (
            TypeKind::Numeric(_),
            TypeKind::Matrix {
                columns,
                rows,
                inner,
                ..
            },
        ) if multiply => unify(lhs, inner).map(|c| Type::matrix(*columns, *rows, c)),
        (
            TypeKind::Matrix {
                columns,
                rows,
                inner,
                ..
            },
            TypeKind::Vector(size, component),
        ) if multiply && columns == size => {
            unify(inner, component).map(|c| Type::vector(*rows, c))
        }
        (
            TypeKind::Vector(size, component),
            TypeKind::Matrix {
                columns,
                rows,
                inner,
                ..
            },
        ) if multiply && size == rows => unify(component, inner).map(|c| Type::vector(*columns, c)),
        (
            TypeKind::Matrix {
                columns: columns_a,
                rows: rows_a,
                inner: inner_a,
                ..
            },
            TypeKind::Matrix {
                columns: columns_b,
                rows: rows_b,
                inner: inner_b,
                ..
            },
        ) if multiply && columns_a == rows_b => {
            unify(inner_a, inner_b).map(|c| Type::matrix(*columns_b, *rows_a, c))
        }
        _ => None,
    }
}

/// Result type of a binary operator, or `None` when the operands do not
/// support it
pub(super) fn binary_result(operator: BinaryOperatorKind, lhs: &Type, rhs: &Type) -> Option<Type> {
    let same_shape = lhs.vector_size() == rhs.vector_size()
        && lhs.scalar_component().is_some()
        && rhs.scalar_component().is_some();

    match operator.class() {
        BinaryOperatorClass::Arithmetic => arithmetic_result(operator, lhs, rhs),
        BinaryOperatorClass::Bitwise if same_shape && is_boolean(lhs) && is_boolean(rhs) => {
            Some(lhs.clone())
        }
        BinaryOperatorClass::Bitwise if same_shape && is_integer(lhs) && is_integer(rhs) => {
            unify(lhs, rhs)
        }
        BinaryOperatorClass::Shift => {
            let amount_is_unsigned = matches!(
                rhs.component_numeric_kind(),
                Some(NumericKind::UInt32 | NumericKind::AbstractInt)
            );

            (same_shape && is_integer(lhs) && amount_is_unsigned).then(|| lhs.clone())
        }
        BinaryOperatorClass::Ordering if same_shape && is_numeric(lhs) && is_numeric(rhs) => {
            unify(lhs, rhs).map(|_| lhs.with_component(Type::boolean()))
        }
        BinaryOperatorClass::Equality
            if same_shape
                && ((is_numeric(lhs) && is_numeric(rhs))
                    || (is_boolean(lhs) && is_boolean(rhs))) =>
        {
            unify(lhs, rhs).map(|_| lhs.with_component(Type::boolean()))
        }
        // Short-circuiting only exists for scalars
        BinaryOperatorClass::Logical if lhs.is_boolean() && rhs.is_boolean() => {
            Some(Type::boolean())
        }
        _ => None,
    }
}

impl ValidationTrace<'_> {
    pub(super) fn validate_expression(
        &mut self,
        id: NodeId,
        expression: &Expression,
    ) -> Result<Attachment, Fatal> {
        match expression {
            Expression::Literal(text) => Ok(self.validate_literal(id, text)),
            Expression::Name(name) => self.validate_name(id, name),
            Expression::Binary { operator, lhs, rhs } => {
                self.validate_binary(id, *operator, *lhs, *rhs)
            }
            Expression::Unary { operator, operand } => {
                self.validate_unary(id, *operator, *operand)
            }
            Expression::Index { base, index } => self.validate_index(id, *base, *index),
            Expression::Member { base, property } => self.validate_member(id, *base, property),
            Expression::EnumValue {
                enumeration,
                member,
            } => self.validate_enum_value(id, enumeration, member),
            Expression::New { ty, arguments } => self.validate_new(id, *ty, arguments),
            Expression::Call {
                function,
                arguments,
            } => self.validate_call(id, function, arguments),
            Expression::Grouping(inner) => self.get_attachment(*inner),
        }
    }

    fn validate_literal(&mut self, id: NodeId, text: &str) -> Attachment {
        let Some(literal) = parse_literal(text) else {
            report_error!(self, id, "'{}' is not a valid literal.", text);
            return Attachment::invalid();
        };

        let ty = match literal.ty {
            LiteralType::Boolean => Type::boolean(),
            LiteralType::Numeric(kind) => Type::numeric(kind),
            LiteralType::String => Type::string(),
        };

        if !literal.is_in_range() {
            report_error!(self, id, "Literal '{}' does not fit into {}.", text, ty);
        }

        Attachment::constant(ty)
    }

    fn validate_name(&mut self, id: NodeId, name: &Identifier) -> Result<Attachment, Fatal> {
        let Some(declaration_id) = self.get_scoped_value(name, id) else {
            return Ok(Attachment::invalid());
        };

        self.record_resolution(id, declaration_id);

        let declaration = self
            .document()
            .declaration(declaration_id)
            .ok_or(Fatal::UnknownNode(declaration_id))?;

        match declaration.kind {
            DeclarationKind::Variable(_) => {
                let attachment = self.get_attachment(declaration_id)?;

                Ok(Attachment {
                    is_storage: true,
                    ..attachment
                })
            }
            DeclarationKind::Parameter { .. } => self.get_attachment(declaration_id),
            _ => {
                report_error!(self, id, "'{}' is not a value.", name.name);
                Ok(Attachment::invalid())
            }
        }
    }

    fn validate_binary(
        &mut self,
        id: NodeId,
        operator: BinaryOperatorKind,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<Attachment, Fatal> {
        let lhs = self.get_attachment(lhs)?;
        let rhs = self.get_attachment(rhs)?;
        let fixed_state = lhs.fixed_state.combine(rhs.fixed_state);

        let (lhs, rhs) = (lhs.resolve_type, rhs.resolve_type);

        if lhs.is_invalid() || rhs.is_invalid() {
            return Ok(Attachment::new(fixed_state, Type::invalid()));
        }

        let ty = match binary_result(operator, &lhs, &rhs) {
            Some(ty) => ty,
            None => {
                report_error!(
                    self,
                    id,
                    "Operator '{}' cannot be applied to '{}' and '{}'.",
                    operator,
                    lhs,
                    rhs
                );

                match operator.class() {
                    BinaryOperatorClass::Ordering
                    | BinaryOperatorClass::Equality
                    | BinaryOperatorClass::Logical => Type::boolean(),
                    _ => lhs,
                }
            }
        };

        Ok(Attachment::new(fixed_state, ty))
    }

    fn validate_unary(
        &mut self,
        id: NodeId,
        operator: UnaryOperatorKind,
        operand: NodeId,
    ) -> Result<Attachment, Fatal> {
        let operand = self.get_attachment(operand)?;
        let ty = operand.resolve_type.clone();

        if ty.is_invalid() {
            return Ok(Attachment::invalid());
        }

        let supported = match operator {
            UnaryOperatorKind::Deref => {
                let Some(pointee) = ty.pointee() else {
                    report_error!(self, id, "Cannot dereference a value of type '{}'.", ty);
                    return Ok(Attachment::invalid());
                };

                return Ok(Attachment {
                    fixed_state: FixedState::Variable,
                    is_storage: true,
                    resolve_type: pointee.clone(),
                    address_space: ty.address_space(),
                });
            }
            UnaryOperatorKind::AddressOf => {
                if !operand.is_storage || operand.fixed_state >= FixedState::PipelineCreationFixed
                {
                    report_error!(self, id, "Address-of operand needs to a stored value.");
                    return Ok(Attachment::invalid());
                }

                if !ty.capabilities().storable {
                    report_error!(self, id, "Address-of operand of type '{}' is not storable.", ty);
                    return Ok(Attachment::invalid());
                }

                return Ok(Attachment::new(
                    FixedState::ScopeFixed,
                    Type::pointer(ty, operand.address_space),
                ));
            }
            UnaryOperatorKind::LogicalNot => is_boolean(&ty),
            UnaryOperatorKind::BitwiseNot => is_integer(&ty),
            UnaryOperatorKind::Negate => ty
                .component_numeric_kind()
                .is_some_and(|kind| kind != NumericKind::UInt32),
        };

        if !supported {
            report_error!(self, id, "Operator '{}' cannot be applied to '{}'.", operator, ty);
        }

        Ok(Attachment::new(operand.fixed_state, ty))
    }

    fn validate_index(
        &mut self,
        id: NodeId,
        base: NodeId,
        index: NodeId,
    ) -> Result<Attachment, Fatal> {
        let base_attachment = self.get_attachment(base)?;
        let index_attachment = self.get_attachment(index)?;
        let fixed_state = base_attachment
            .fixed_state
            .combine(index_attachment.fixed_state);

        let base_type = &base_attachment.resolve_type;
        let index_type = &index_attachment.resolve_type;

        if base_type.is_invalid() {
            return Ok(Attachment::invalid());
        }

        let Some(element) = base_type.indexed_element() else {
            report_error!(self, id, "Type '{}' cannot be indexed.", base_type);
            return Ok(Attachment::invalid());
        };

        if !index_type.is_invalid()
            && !index_type.is_implicitly_castable_into(&Type::numeric(NumericKind::UInt32))
        {
            report_error!(
                self,
                index,
                "Index must be an unsigned integer, found '{}'.",
                index_type
            );
        } else if index_attachment.fixed_state == FixedState::Constant {
            let value = ConstantEvaluator::new(self.document(), self.resolutions())
                .evaluate(index)
                .and_then(|value| value.as_integer());

            if let (Some(value), Some(count)) = (value, base_type.element_count()) {
                if value < 0 || value as u64 >= count {
                    report_error!(
                        self,
                        index,
                        "Index {} is out of bounds for '{}'.",
                        value,
                        base_type
                    );
                }
            }
        }

        Ok(Attachment {
            fixed_state,
            is_storage: base_attachment.is_storage,
            resolve_type: element.clone(),
            address_space: base_attachment.address_space,
        })
    }

    fn validate_member(
        &mut self,
        id: NodeId,
        base: NodeId,
        property: &Identifier,
    ) -> Result<Attachment, Fatal> {
        let base = self.get_attachment(base)?;
        let ty = base.resolve_type.clone();

        if ty.is_invalid() {
            return Ok(Attachment::invalid());
        }

        match ty.resolved().kind() {
            TypeKind::Struct(structure) => match structure.member(&property.name) {
                Some(member) => Ok(Attachment {
                    resolve_type: member.ty.clone(),
                    ..base
                }),
                None => {
                    report_error!(
                        self,
                        at property.span,
                        id,
                        "'{}' has no property '{}'.",
                        structure.name,
                        property.name
                    );
                    Ok(Attachment::invalid())
                }
            },
            TypeKind::Vector(size, inner) => Ok(self.validate_swizzle(id, &base, *size, inner, property)),
            TypeKind::Matrix { .. } => {
                report_error!(
                    self,
                    at property.span,
                    id,
                    "Members of '{}' cannot be accessed by name.",
                    ty
                );
                Ok(Attachment::invalid())
            }
            _ => {
                report_error!(self, at property.span, id, "Type '{}' has no properties.", ty);
                Ok(Attachment::invalid())
            }
        }
    }

    fn validate_swizzle(
        &mut self,
        id: NodeId,
        base: &Attachment,
        size: VectorSize,
        inner: &Type,
        property: &Identifier,
    ) -> Attachment {
        let swizzle = &property.name;
        let vector = &base.resolve_type;

        let Some(result_size) = (1..=4)
            .contains(&swizzle.len())
            .then_some(swizzle.len())
        else {
            report_error!(
                self,
                at property.span,
                id,
                "Swizzle '{}' must have between one and four components.",
                swizzle
            );
            return Attachment::invalid();
        };

        let components = if swizzle.chars().all(|c| POSITION_COMPONENTS.contains(c)) {
            POSITION_COMPONENTS
        } else if swizzle.chars().all(|c| COLOR_COMPONENTS.contains(c)) {
            COLOR_COMPONENTS
        } else if swizzle
            .chars()
            .all(|c| POSITION_COMPONENTS.contains(c) || COLOR_COMPONENTS.contains(c))
        {
            report_error!(
                self,
                at property.span,
                id,
                "Swizzle '{}' mixes 'xyzw' and 'rgba' components.",
                swizzle
            );
            return Attachment::invalid();
        } else {
            report_error!(
                self,
                at property.span,
                id,
                "'{}' is not a swizzle of '{}'.",
                swizzle,
                vector
            );
            return Attachment::invalid();
        };

        let out_of_range = swizzle
            .chars()
            .find(|&c| components.find(c).is_some_and(|index| index >= size.count()));

        if let Some(component) = out_of_range {
            report_error!(
                self,
                at property.span,
                id,
                "Swizzle component '{}' is out of range for '{}'.",
                component,
                vector
            );
            return Attachment::invalid();
        }

        match VectorSize::from_count(result_size) {
            // Several components are a new value, not a location
            Some(result_size) => {
                Attachment::new(base.fixed_state, Type::vector(result_size, inner.clone()))
            }
            None => Attachment {
                resolve_type: inner.clone(),
                ..base.clone()
            },
        }
    }

    fn validate_enum_value(
        &mut self,
        id: NodeId,
        enumeration: &Identifier,
        member: &Identifier,
    ) -> Result<Attachment, Fatal> {
        let Some(declaration_id) = self.get_scoped_value(enumeration, id) else {
            return Ok(Attachment::invalid());
        };

        self.record_resolution(id, declaration_id);

        let declaration = self
            .document()
            .declaration(declaration_id)
            .ok_or(Fatal::UnknownNode(declaration_id))?;

        let DeclarationKind::Enum { members } = &declaration.kind else {
            report_error!(
                self,
                at enumeration.span,
                id,
                "'{}' is not an enum.",
                enumeration.name
            );
            return Ok(Attachment::invalid());
        };

        let Some(value) = members
            .iter()
            .find(|candidate| candidate.name.name == member.name)
            .map(|member| member.value)
        else {
            report_error!(
                self,
                at member.span,
                id,
                "'{}' has no member '{}'.",
                enumeration.name,
                member.name
            );
            return Ok(Attachment::invalid());
        };

        // Members may refer to earlier members while the enum itself is
        // still being validated
        let ty = if self.is_in_progress(declaration_id) {
            self.get_attachment(value)?.resolve_type
        } else {
            self.get_attachment(declaration_id)?.resolve_type
        };

        Ok(Attachment::constant(ty))
    }

    fn validate_new(
        &mut self,
        id: NodeId,
        ty: NodeId,
        arguments: &[NodeId],
    ) -> Result<Attachment, Fatal> {
        let target = self.get_attachment(ty)?.resolve_type;
        let mut fixed_state = FixedState::Constant;
        let mut argument_types = Vec::with_capacity(arguments.len());

        for &argument in arguments {
            let attachment = self.get_attachment(argument)?;
            fixed_state = fixed_state.combine(attachment.fixed_state);
            argument_types.push((argument, attachment.resolve_type));
        }

        if target.is_invalid() {
            return Ok(Attachment::new(fixed_state, target));
        }

        let capabilities = target.capabilities();

        if !(capabilities.constructible && capabilities.fixed_footprint) {
            report_error!(self, id, "Type '{}' cannot be constructed.", target);
            return Ok(Attachment::new(fixed_state, target));
        }

        if !argument_types.is_empty() && !argument_types.iter().any(|(_, ty)| ty.is_invalid()) {
            self.check_constructor_arguments(id, &target, &argument_types);
        }

        Ok(Attachment::new(fixed_state, target))
    }

    /// Zero-value construction never gets here
    fn check_constructor_arguments(
        &mut self,
        id: NodeId,
        target: &Type,
        arguments: &[(NodeId, Type)],
    ) {
        let unusable = |trace: &mut Self, (argument, ty): &(NodeId, Type)| {
            report_error!(
                trace,
                *argument,
                "Cannot use a value of type '{}' to construct '{}'.",
                ty,
                target
            );
        };

        match target.resolved().kind() {
            TypeKind::Boolean | TypeKind::Numeric(_) => {
                if arguments.len() != 1 {
                    report_error!(
                        self,
                        id,
                        "'{}' takes at most 1 argument, but {} were given.",
                        target,
                        arguments.len()
                    );
                    return;
                }

                let (argument, ty) = &arguments[0];

                if !(ty.capabilities().scalar && ty.is_explicitly_castable_into(target)) {
                    report_error!(self, *argument, "Cannot convert '{}' into '{}'.", ty, target);
                }
            }
            TypeKind::Vector(size, inner) => {
                if let [(argument, ty)] = arguments {
                    let convertible = match ty.vector_size() {
                        None => ty.capabilities().scalar && ty.is_explicitly_castable_into(inner),
                        Some(_) => ty.is_explicitly_castable_into(target),
                    };

                    if !convertible {
                        report_error!(self, *argument, "Cannot convert '{}' into '{}'.", ty, target);
                    }

                    return;
                }

                let mut total = 0;

                for argument in arguments {
                    let fits = argument
                        .1
                        .scalar_component()
                        .is_some_and(|component| component.is_implicitly_castable_into(inner));

                    if !fits {
                        unusable(self, argument);
                        return;
                    }

                    total += argument.1.vector_size().map_or(1, VectorSize::count);
                }

                if total != size.count() {
                    report_error!(
                        self,
                        id,
                        "Arguments of '{}' have {} components, expected {}.",
                        target,
                        total,
                        size.count()
                    );
                }
            }
            TypeKind::Matrix {
                columns,
                rows,
                inner,
                column,
            } => {
                if let [(argument, ty)] = arguments {
                    if !ty.is_explicitly_castable_into(target) {
                        report_error!(self, *argument, "Cannot convert '{}' into '{}'.", ty, target);
                    }

                    return;
                }

                let element = if arguments.len() == columns.count() {
                    column
                } else if arguments.len() == columns.count() * rows.count() {
                    inner
                } else {
                    report_error!(
                        self,
                        id,
                        "Cannot construct '{}' from {} arguments.",
                        target,
                        arguments.len()
                    );
                    return;
                };

                if let Some(argument) = arguments
                    .iter()
                    .find(|(_, ty)| !ty.is_implicitly_castable_into(element))
                {
                    unusable(self, argument);
                }
            }
            TypeKind::Array { inner, length } => {
                if let Some(argument) = arguments
                    .iter()
                    .find(|(_, ty)| !ty.is_implicitly_castable_into(inner))
                {
                    unusable(self, argument);
                    return;
                }

                if matches!(length, ArrayLength::Constant(length) if *length != arguments.len() as u64) {
                    report_error!(
                        self,
                        id,
                        "'{}' expects {} elements, but {} were given.",
                        target,
                        length,
                        arguments.len()
                    );
                }
            }
            TypeKind::Struct(structure) => {
                if structure.members.len() != arguments.len() {
                    report_error!(
                        self,
                        id,
                        "'{}' expects {} members, but {} were given.",
                        structure.name,
                        structure.members.len(),
                        arguments.len()
                    );
                    return;
                }

                for ((argument, ty), member) in arguments.iter().zip(&structure.members) {
                    if !ty.is_implicitly_castable_into(&member.ty) {
                        report_error!(
                            self,
                            *argument,
                            "Cannot assign a value of type '{}' to property '{}' of type '{}'.",
                            ty,
                            member.name,
                            member.ty
                        );
                    }
                }
            }
            _ => report_error!(self, id, "Type '{}' cannot be constructed.", target),
        }
    }

    fn validate_call(
        &mut self,
        id: NodeId,
        function: &Identifier,
        arguments: &[NodeId],
    ) -> Result<Attachment, Fatal> {
        let document = self.document();
        let mut fixed_state = FixedState::Constant;
        let mut argument_types = Vec::with_capacity(arguments.len());

        for &argument in arguments {
            let attachment = self.get_attachment(argument)?;
            fixed_state = fixed_state.combine(attachment.fixed_state);
            argument_types.push(attachment.resolve_type);
        }

        let bound = self.find_scoped_value(&function.name);

        let user_function = bound.and_then(|declaration_id| {
            match &document.declaration(declaration_id)?.kind {
                DeclarationKind::Function(declaration) => Some((declaration_id, declaration)),
                _ => None,
            }
        });

        if let Some((declaration_id, declaration)) = user_function {
            self.record_resolution(id, declaration_id);

            let return_type = self.get_attachment(declaration_id)?.resolve_type;

            if declaration.parameters.len() != arguments.len() {
                report_error!(
                    self,
                    id,
                    "Function '{}' expects {} arguments, but {} were given.",
                    function.name,
                    declaration.parameters.len(),
                    arguments.len()
                );
            } else {
                for (position, (&parameter, (&argument, ty))) in declaration
                    .parameters
                    .iter()
                    .zip(arguments.iter().zip(&argument_types))
                    .enumerate()
                {
                    let expected = self.get_attachment(parameter)?.resolve_type;

                    let conflict = ty
                        .address_space()
                        .filter(|_| expected.is_pointer())
                        .and_then(|space| {
                            let bound = expected.bind_address_space(space).err()?;
                            Some((space, bound))
                        });

                    if let Some((space, bound)) = conflict {
                        report_error!(
                            self,
                            argument,
                            "Argument {} of '{}' points into '{}', but the parameter is bound to '{}'.",
                            position + 1,
                            function.name,
                            space,
                            bound
                        );
                    } else if !ty.is_implicitly_castable_into(&expected) {
                        report_error!(
                            self,
                            argument,
                            "Argument {} of '{}' expects '{}', found '{}'.",
                            position + 1,
                            function.name,
                            expected,
                            ty
                        );
                    }
                }
            }

            if let Some(caller) = self.current_function().map(|context| context.function) {
                self.calls
                    .entry(caller)
                    .or_default()
                    .push((id, declaration_id));
            }

            return Ok(Attachment::new(FixedState::Variable, return_type));
        }

        if self.catalog().contains(&function.name) {
            return Ok(match self.catalog().lookup(&function.name, &argument_types) {
                Some(header) => {
                    let fixed_state = if header.is_constant && fixed_state == FixedState::Constant
                    {
                        FixedState::Constant
                    } else {
                        FixedState::Variable
                    };

                    Attachment::new(fixed_state, header.return_type)
                }
                None => {
                    report_error!(
                        self,
                        id,
                        "No matching function header for {}({}).",
                        function.name,
                        argument_types.iter().join(", ")
                    );
                    Attachment::invalid()
                }
            });
        }

        if bound.is_some() {
            report_error!(self, at function.span, id, "'{}' is not a function.", function.name);
        } else {
            report_error!(
                self,
                at function.span,
                id,
                "Function '{}' is not defined.",
                function.name
            );
        }

        Ok(Attachment::invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::{
        ast::Statement,
        validate::tests::{build, messages},
    };
    use crate::middle::{builtins::BuiltinCatalog, validate::validate};

    /// Attachment of the initializer of the `index`th statement of `main`
    fn initializer_attachment(source: &str, index: usize) -> Attachment {
        let document = build(source);
        let results = validate(&document, &BuiltinCatalog::new()).unwrap();
        assert!(results.incidents.is_empty(), "{:#?}", results.incidents);

        let main = document.declarations.last().copied().unwrap();
        let Some(DeclarationKind::Function(function)) =
            document.declaration(main).map(|declaration| &declaration.kind)
        else {
            panic!("expected main to be last");
        };

        let Some(Statement::Block(statements)) = document.statement(function.body) else {
            panic!("expected a block");
        };

        let Some(Statement::Declaration(declaration)) = document.statement(statements[index])
        else {
            panic!("expected a declaration");
        };

        let Some(DeclarationKind::Variable(variable)) =
            document.declaration(*declaration).map(|declaration| &declaration.kind)
        else {
            panic!("expected a variable");
        };

        results
            .attachment(variable.initializer.unwrap())
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_swizzles() {
        let source = "fn main() {
            let vectorOne: Vector3<Float32> = new Vector3<Float32>(1.0);
            let a = vectorOne.xy;
            let b = vectorOne.x;
            let c = vectorOne.bgr;
        }";

        let xy = initializer_attachment(source, 1);
        assert_eq!(xy.resolve_type.to_string(), "Vector2<Float32>");
        assert!(!xy.is_storage);

        let x = initializer_attachment(source, 2);
        assert_eq!(x.resolve_type.to_string(), "Float32");
        assert!(x.is_storage);

        let messages = messages(
            "fn main() {
                let v = new Vector2<Float32>();
                let a = v.xr;
                let b = v.z;
                let c = v.xyzwx;
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Swizzle 'xr' mixes 'xyzw' and 'rgba' components.",
                "Swizzle component 'z' is out of range for 'Vector2<Float32>'.",
                "Swizzle 'xyzwx' must have between one and four components.",
            ]
        );
    }

    #[test]
    fn test_fixed_state_is_the_minimum_of_operands() {
        let source = "param scale = 2.0;
        fn main() {
            let a = 1.0 + 2.0;
            let b = scale * 2.0;
            let c = a * scale;
        }";

        assert_eq!(initializer_attachment(source, 0).fixed_state, FixedState::Constant);
        assert_eq!(
            initializer_attachment(source, 1).fixed_state,
            FixedState::PipelineCreationFixed
        );
        assert_eq!(initializer_attachment(source, 2).fixed_state, FixedState::Variable);
    }

    #[test]
    fn test_arithmetic_shapes() {
        let source = "fn main() {
            let m = new Matrix4x3<Float32>();
            let v = new Vector4<Float32>();
            let a = m * v;
            let b = v * 2;
            let c = 1 + 2u;
            let d = new Vector3<Float32>() * m;
        }";

        assert_eq!(initializer_attachment(source, 2).resolve_type.to_string(), "Vector3<Float32>");
        assert_eq!(initializer_attachment(source, 3).resolve_type.to_string(), "Vector4<Float32>");
        assert_eq!(initializer_attachment(source, 4).resolve_type.to_string(), "UInt32");
        assert_eq!(initializer_attachment(source, 5).resolve_type.to_string(), "Vector4<Float32>");
    }

    #[test]
    fn test_operator_mismatches() {
        let messages = messages(
            "fn main() {
                let a = 1i + 2u;
                let b = true + 1;
                let c = 1.0 << 2u;
                let d = 1i << 2i;
                let e = -1u;
                let f = !1;
                let g = true < false;
                let h = new Vector2<Boolean>();
                let i = h && h;
                let j = true || false;
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Operator '+' cannot be applied to 'Int32' and 'UInt32'.",
                "Operator '+' cannot be applied to 'Boolean' and 'AbstractInt'.",
                "Operator '<<' cannot be applied to 'AbstractFloat' and 'UInt32'.",
                "Operator '<<' cannot be applied to 'Int32' and 'Int32'.",
                "Operator '-' cannot be applied to 'UInt32'.",
                "Operator '!' cannot be applied to 'AbstractInt'.",
                "Operator '<' cannot be applied to 'Boolean' and 'Boolean'.",
                "Operator '&&' cannot be applied to 'Vector2<Boolean>' and 'Vector2<Boolean>'.",
            ]
        );
    }

    #[test]
    fn test_pointers() {
        let messages = messages(
            "const k = 1.0;
            fn main() {
                let x: Float32 = 1.0;
                let p: *Float32 = &x;
                let q: *Float32 = &5.0;
                let r = &k;
                let y: Float32 = *p;
                let z = *x;
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Address-of operand needs to a stored value.",
                "Address-of operand needs to a stored value.",
                "Cannot dereference a value of type 'Float32'.",
            ]
        );
    }

    #[test]
    fn test_indexing_and_members() {
        let messages = messages(
            "struct Light { color: Vector3<Float32>, power: Float32 }
            fn main() {
                let lights = new Array<Light, 2>();
                let a = lights[1u].color.r;
                let b = lights[2u];
                let c = lights[-1i];
                let d = lights[0].glow;
                let e = new Matrix2x2<Float32>().x;
                let f = a[0];
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Index 2 is out of bounds for 'Array<Light, 2>'.",
                "Index must be an unsigned integer, found 'Int32'.",
                "'Light' has no property 'glow'.",
                "Members of 'Matrix2x2<Float32>' cannot be accessed by name.",
                "Type 'Float32' cannot be indexed.",
            ]
        );
    }

    #[test]
    fn test_constructors() {
        let messages = messages(
            "struct Pair { a: Float32, b: UInt32 }
            fn main() {
                let a = new Vector4<Float32>(new Vector2<Float32>(), 1.0, 2.0);
                let b = new Vector4<Float32>(new Vector2<Float32>(), 1.0);
                let c = new Matrix2x2<Float32>(new Vector2<Float32>(), new Vector2<Float32>());
                let d = new Array<UInt32, 3>(1u, 2u);
                let e = new Pair(1.0, 2u);
                let f = new Pair(1.0);
                let g = new UInt32(1.5);
                let h = new Array<Float32>();
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Arguments of 'Vector4<Float32>' have 3 components, expected 4.",
                "'Array<UInt32, 3>' expects 3 elements, but 2 were given.",
                "'Pair' expects 2 members, but 1 were given.",
                "Type 'Array<Float32>' cannot be constructed.",
                "Type 'Array<Float32>' of 'h' is not constructible.",
            ]
        );
    }

    #[test]
    fn test_calls() {
        let messages = messages(
            "fn helper(a: Float32) -> Float32 { return a; }
            fn main() {
                let a = helper(1.0);
                let b = helper(1u);
                let c = helper();
                let d = sin(1.0);
                let e = sin(true);
                let f = missing(1);
                let g = a(1);
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Argument 1 of 'helper' expects 'Float32', found 'UInt32'.",
                "Function 'helper' expects 1 arguments, but 0 were given.",
                "No matching function header for sin(Boolean).",
                "Function 'missing' is not defined.",
                "'a' is not a function.",
            ]
        );
    }

    #[test]
    fn test_constant_builtins_stay_constant() {
        let source = "fn main() {
            let a = max(1.0, 2.0);
            let b = max(a, 2.0);
        }";

        assert_eq!(initializer_attachment(source, 0).fixed_state, FixedState::Constant);
        assert_eq!(initializer_attachment(source, 1).fixed_state, FixedState::Variable);
    }

    #[test]
    fn test_enum_values() {
        let messages = messages(
            "enum Mode { Fast = 1u, Slow = 2u }
            fn main() {
                let a: UInt32 = Mode::Fast;
                let b = Mode::Medium;
                let c = Missing::Fast;
                let d = main::Fast;
            }",
        );

        assert_eq!(
            messages,
            vec![
                "'Mode' has no member 'Medium'.",
                "'Missing' is not defined.",
                "'main' is not an enum.",
            ]
        );
    }
}
