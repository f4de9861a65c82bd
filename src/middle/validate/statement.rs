use hashbrown::HashSet;

use super::expression::binary_result;
use crate::{
    error::Fatal,
    middle::{
        ast::{BinaryOperatorKind, Expression, NodeId, Statement, SwitchCase},
        constant::ConstantEvaluator,
        primitive::NumericKind,
        trace::{FixedState, ValidationTrace, report_error},
        ty::Type,
    },
};

impl ValidationTrace<'_> {
    /// Validates the statements of a block in the current scope. Returns
    /// whether the block returns on every path.
    pub(super) fn validate_block_statements(&mut self, block: NodeId) -> Result<bool, Fatal> {
        let Some(Statement::Block(statements)) = self.document().statement(block) else {
            return self.validate_statement(block);
        };

        let mut returns = false;

        for &statement in statements {
            returns |= self.validate_statement(statement)?;
        }

        Ok(returns)
    }

    /// Returns whether the statement returns on every path
    fn validate_statement(&mut self, id: NodeId) -> Result<bool, Fatal> {
        let document = self.document();
        let statement = document.statement(id).ok_or(Fatal::UnknownNode(id))?;

        match statement {
            Statement::Declaration(declaration) => {
                self.get_attachment(*declaration)?;

                let declaration_node = document
                    .declaration(*declaration)
                    .ok_or(Fatal::UnknownNode(*declaration))?;
                self.push_scoped_value(&declaration_node.name, *declaration);
            }
            Statement::Assignment {
                operator,
                target,
                value,
            } => self.validate_assignment(id, *operator, *target, *value)?,
            Statement::Expression(expression) => {
                self.get_attachment(*expression)?;

                if !matches!(
                    document.expression(*expression),
                    Some(Expression::Call { .. })
                ) {
                    report_error!(self, id, "Only function calls can be used as statements.");
                }
            }
            Statement::Block(_) => {
                self.push_scope();
                let returns = self.validate_block_statements(id);
                self.pop_scope();

                return returns;
            }
            Statement::If {
                condition,
                positive,
                negative,
            } => {
                self.validate_condition(*condition)?;

                let positive = self.validate_statement(*positive)?;
                let negative = match negative {
                    Some(negative) => self.validate_statement(*negative)?,
                    None => false,
                };

                return Ok(positive && negative);
            }
            Statement::While { condition, body } => {
                self.validate_condition(*condition)?;
                self.validate_loop_body(*body)?;
            }
            Statement::For {
                initializer,
                condition,
                update,
                body,
            } => {
                self.push_scope();

                if let Some(initializer) = initializer {
                    self.validate_statement(*initializer)?;
                }

                if let Some(condition) = condition {
                    self.validate_condition(*condition)?;
                }

                if let Some(update) = update {
                    self.validate_statement(*update)?;
                }

                self.validate_loop_body(*body)?;
                self.pop_scope();
            }
            Statement::Switch { selector, cases } => {
                return self.validate_switch(id, *selector, cases);
            }
            Statement::Return(value) => {
                self.validate_return(id, *value)?;
                return Ok(true);
            }
            Statement::Break => {
                let inside = self
                    .current_function()
                    .is_some_and(|context| context.loop_depth + context.switch_depth > 0);

                if !inside {
                    report_error!(
                        self,
                        id,
                        "'break' is only allowed inside loops and switch statements."
                    );
                }
            }
            Statement::Continue => {
                let inside = self
                    .current_function()
                    .is_some_and(|context| context.loop_depth > 0);

                if !inside {
                    report_error!(self, id, "'continue' is only allowed inside loops.");
                }
            }
            Statement::Discard => {
                if self.current_function().is_none() {
                    report_error!(self, id, "'discard' is only allowed inside functions.");
                }
            }
        }

        Ok(false)
    }

    fn validate_condition(&mut self, condition: NodeId) -> Result<(), Fatal> {
        let ty = self.get_attachment(condition)?.resolve_type;

        if !ty.is_invalid() && !ty.is_boolean() {
            report_error!(
                self,
                condition,
                "Condition must be of type 'Boolean', found '{}'.",
                ty
            );
        }

        Ok(())
    }

    fn validate_loop_body(&mut self, body: NodeId) -> Result<(), Fatal> {
        if let Some(context) = self.current_function_mut() {
            context.loop_depth += 1;
        }

        let result = self.validate_statement(body);

        if let Some(context) = self.current_function_mut() {
            context.loop_depth -= 1;
        }

        result.map(|_| ())
    }

    fn validate_assignment(
        &mut self,
        id: NodeId,
        operator: Option<BinaryOperatorKind>,
        target: NodeId,
        value: NodeId,
    ) -> Result<(), Fatal> {
        let target_attachment = self.get_attachment(target)?;
        let value_attachment = self.get_attachment(value)?;

        let target_type = &target_attachment.resolve_type;
        let value_type = &value_attachment.resolve_type;

        if target_type.is_invalid() || value_type.is_invalid() {
            return Ok(());
        }

        if !target_attachment.is_storage {
            report_error!(
                self,
                target,
                "Left-hand side of assignment needs to a stored value."
            );
            return Ok(());
        }

        if target_attachment.fixed_state != FixedState::Variable {
            report_error!(
                self,
                target,
                "Cannot assign to a value which is {}.",
                target_attachment.fixed_state
            );
            return Ok(());
        }

        let assigned = match operator {
            None => value_type.clone(),
            Some(operator) => match binary_result(operator, target_type, value_type) {
                Some(result) => result,
                None => {
                    report_error!(
                        self,
                        id,
                        "Operator '{}' cannot be applied to '{}' and '{}'.",
                        operator,
                        target_type,
                        value_type
                    );
                    return Ok(());
                }
            },
        };

        if !assigned.is_implicitly_castable_into(target_type) {
            report_error!(
                self,
                value,
                "Cannot assign a value of type '{}' to a target of type '{}'.",
                assigned,
                target_type
            );
        }

        Ok(())
    }

    fn validate_switch(
        &mut self,
        id: NodeId,
        selector: NodeId,
        cases: &[SwitchCase],
    ) -> Result<bool, Fatal> {
        let unsigned = Type::numeric(NumericKind::UInt32);
        let selector_type = self.get_attachment(selector)?.resolve_type;

        if !selector_type.is_invalid() && !selector_type.is_implicitly_castable_into(&unsigned) {
            report_error!(
                self,
                selector,
                "Switch selector must be an unsigned integer, found '{}'.",
                selector_type
            );
        }

        let defaults = cases.iter().filter(|case| case.is_default).count();

        if defaults != 1 {
            report_error!(
                self,
                id,
                "Switch statement must have exactly one 'default' case, found {}.",
                defaults
            );
        }

        let mut seen = HashSet::new();
        let mut returns = defaults > 0;

        for case in cases {
            for &label in &case.selectors {
                let attachment = self.get_attachment(label)?;
                let ty = &attachment.resolve_type;

                if ty.is_invalid() {
                    continue;
                }

                if attachment.fixed_state != FixedState::Constant
                    || !ty.is_implicitly_castable_into(&unsigned)
                {
                    report_error!(
                        self,
                        label,
                        "Case selector must be a constant unsigned integer, found '{}'.",
                        ty
                    );
                    continue;
                }

                let value = ConstantEvaluator::new(self.document(), self.resolutions())
                    .evaluate(label)
                    .and_then(|value| value.as_integer());

                if let Some(value) = value.filter(|value| !seen.insert(*value)) {
                    report_error!(self, label, "Duplicate case selector {}.", value);
                }
            }

            if let Some(context) = self.current_function_mut() {
                context.switch_depth += 1;
            }

            let case_returns = self.validate_statement(case.body);

            if let Some(context) = self.current_function_mut() {
                context.switch_depth -= 1;
            }

            returns &= case_returns?;
        }

        Ok(returns)
    }

    fn validate_return(&mut self, id: NodeId, value: Option<NodeId>) -> Result<(), Fatal> {
        let Some(context) = self.current_function() else {
            report_error!(self, id, "'return' is only allowed inside functions.");
            return Ok(());
        };

        let expected = context.return_type.clone();
        let function = context.function;

        let name = self
            .document()
            .declaration(function)
            .map(|declaration| declaration.name.name.clone())
            .unwrap_or_default();

        match value {
            None if !expected.is_void() && !expected.is_invalid() => {
                report_error!(
                    self,
                    id,
                    "Function '{}' must return a value of type '{}'.",
                    name,
                    expected
                );
            }
            None => {}
            Some(value) => {
                let ty = self.get_attachment(value)?.resolve_type;

                if expected.is_void() {
                    report_error!(self, value, "Function '{}' does not return a value.", name);
                } else if !ty.is_implicitly_castable_into(&expected) {
                    report_error!(
                        self,
                        value,
                        "Cannot return a value of type '{}' from '{}', expected '{}'.",
                        ty,
                        name,
                        expected
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::middle::validate::tests::messages;

    #[test]
    fn test_switch_constraints() {
        let messages = messages(
            "fn main() {
                let signed: Int32 = 1i;
                let unsigned: UInt32 = 1u;
                switch signed {
                    default: {}
                }
                switch unsigned {
                    case 1u, 2u: {}
                    case 2u: {}
                    case unsigned: {}
                    case -1i: {}
                }
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Switch selector must be an unsigned integer, found 'Int32'.",
                "Switch statement must have exactly one 'default' case, found 0.",
                "Duplicate case selector 2.",
                "Case selector must be a constant unsigned integer, found 'UInt32'.",
                "Case selector must be a constant unsigned integer, found 'Int32'.",
            ]
        );
    }

    #[test]
    fn test_assignments() {
        let messages = messages(
            "const limit = 4u;
            @group(0) @binding(0) uniform scale: Float32;
            fn main() {
                let a: Float32 = 1.0;
                a = 2.0;
                a += 1.0;
                a = 1u;
                a <<= 1u;
                limit = 2u;
                scale = 2.0;
                let v = new Vector3<Float32>();
                v.xy = new Vector2<Float32>();
                v.x = 1.0;
                5.0;
            }",
        );

        assert_eq!(
            messages,
            vec![
                "Cannot assign a value of type 'UInt32' to a target of type 'Float32'.",
                "Operator '<<' cannot be applied to 'Float32' and 'UInt32'.",
                "Cannot assign to a value which is Constant.",
                "Cannot assign to a value which is ScopeFixed.",
                "Left-hand side of assignment needs to a stored value.",
                "Only function calls can be used as statements.",
            ]
        );
    }

    #[test]
    fn test_control_flow() {
        let messages = messages(
            "fn main() -> Float32 {
                break;
                while 1 { continue; }
                for (let i = 0u; i < 4u; i += 1u) { break; }
                switch 1u { default: { break; } }
                if true { return 1.0; } else { return 1u; }
            }
            fn nothing() { return 1.0; }
            fn something() -> Float32 { return; }",
        );

        assert_eq!(
            messages,
            vec![
                "'break' is only allowed inside loops and switch statements.",
                "Condition must be of type 'Boolean', found 'AbstractInt'.",
                "Cannot return a value of type 'UInt32' from 'main', expected 'Float32'.",
                "Function 'nothing' does not return a value.",
                "Function 'something' must return a value of type 'Float32'.",
            ]
        );
    }

    #[test]
    fn test_every_path_must_return() {
        let messages = messages(
            "fn a(x: UInt32) -> UInt32 {
                switch x {
                    case 1u: { return 1u; }
                    default: { return 2u; }
                }
            }
            fn b(x: Boolean) -> UInt32 {
                if x { return 1u; } else if !x { return 2u; }
            }
            fn c() -> UInt32 {
                { return 3u; }
            }",
        );

        assert_eq!(messages, vec!["Function 'b' must return a value on every path."]);
    }

    #[test]
    fn test_block_scopes() {
        let messages = messages(
            "fn main() {
                let a = 1;
                { let a = 2.0; let b = a + 1.0; }
                let c = b;
                let a = 3;
            }",
        );

        assert_eq!(messages, vec!["'b' is not defined.", "'a' is already defined."]);
    }
}
