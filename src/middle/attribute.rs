//! Attributes decorate declarations. Which attributes exist, where they may be
//! written and which arguments they take is described by a static table.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use once_cell::sync::Lazy;

use crate::{
    error::Fatal,
    middle::{
        ast::{AttributeTarget, Document, Expression, NodeId},
        constant::{ConstantEvaluator, ConstantValue, parse_literal},
        trace::{FixedState, ValidationTrace, report_error},
    },
};

/// What a single positional argument must look like
#[derive(Debug, Clone, Copy)]
pub enum ParameterShape {
    /// An identifier, a string literal or a string enum value naming one of
    /// the options
    OneOf(&'static [&'static str]),
    /// An integer known no later than `minimum`
    Integer {
        minimum: FixedState,
        /// Zero is rejected as well as negative values
        positive: bool,
    },
}

/// How an attribute shows up in generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOutput {
    /// `@name(arguments)`
    Same,
    /// Consumed by the declaration itself
    Omitted,
    /// Expands into `@group(a) @binding(b)`
    Resource,
}

#[derive(Debug)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub targets: &'static [AttributeTarget],
    /// Accepted argument lists, one per allowed arity
    pub shapes: &'static [&'static [ParameterShape]],
    pub output: AttributeOutput,
}

const CONSTANT_INTEGER: ParameterShape = ParameterShape::Integer {
    minimum: FixedState::Constant,
    positive: false,
};

const WORKGROUP_DIMENSION: ParameterShape = ParameterShape::Integer {
    minimum: FixedState::PipelineCreationFixed,
    positive: true,
};

const MODULE_VARIABLE: &[AttributeTarget] = &[AttributeTarget::ModuleVariable];

const INTERSTAGE: &[AttributeTarget] = &[
    AttributeTarget::Parameter,
    AttributeTarget::Property,
    AttributeTarget::FunctionReturn,
];

const BUILTIN_VALUES: &[&str] = &[
    "position",
    "vertex_index",
    "instance_index",
    "front_facing",
    "frag_depth",
    "sample_index",
    "sample_mask",
    "local_invocation_id",
    "local_invocation_index",
    "global_invocation_id",
    "workgroup_id",
    "num_workgroups",
];

const INTERPOLATION_TYPES: ParameterShape =
    ParameterShape::OneOf(&["perspective", "linear", "flat"]);

const INTERPOLATION_SAMPLING: ParameterShape =
    ParameterShape::OneOf(&["center", "centroid", "sample"]);

const ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor {
        name: "group",
        targets: MODULE_VARIABLE,
        shapes: &[&[CONSTANT_INTEGER]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "binding",
        targets: MODULE_VARIABLE,
        shapes: &[&[CONSTANT_INTEGER]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "resource",
        targets: MODULE_VARIABLE,
        shapes: &[&[CONSTANT_INTEGER, CONSTANT_INTEGER]],
        output: AttributeOutput::Resource,
    },
    AttributeDescriptor {
        name: "access",
        targets: MODULE_VARIABLE,
        shapes: &[&[ParameterShape::OneOf(&["read", "write", "read_write"])]],
        output: AttributeOutput::Omitted,
    },
    AttributeDescriptor {
        name: "id",
        targets: MODULE_VARIABLE,
        shapes: &[&[CONSTANT_INTEGER]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "location",
        targets: INTERSTAGE,
        shapes: &[&[CONSTANT_INTEGER]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "builtin",
        targets: INTERSTAGE,
        shapes: &[&[ParameterShape::OneOf(BUILTIN_VALUES)]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "interpolate",
        targets: INTERSTAGE,
        shapes: &[
            &[INTERPOLATION_TYPES],
            &[INTERPOLATION_TYPES, INTERPOLATION_SAMPLING],
        ],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "invariant",
        targets: INTERSTAGE,
        shapes: &[&[]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "align",
        targets: &[AttributeTarget::Property],
        shapes: &[&[ParameterShape::Integer {
            minimum: FixedState::Constant,
            positive: true,
        }]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "size",
        targets: &[AttributeTarget::Property],
        shapes: &[&[ParameterShape::Integer {
            minimum: FixedState::Constant,
            positive: true,
        }]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "vertex",
        targets: &[AttributeTarget::Function],
        shapes: &[&[]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "fragment",
        targets: &[AttributeTarget::Function],
        shapes: &[&[]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "compute",
        targets: &[AttributeTarget::Function],
        shapes: &[&[]],
        output: AttributeOutput::Same,
    },
    AttributeDescriptor {
        name: "workgroup_size",
        targets: &[AttributeTarget::Function],
        shapes: &[
            &[WORKGROUP_DIMENSION],
            &[WORKGROUP_DIMENSION, WORKGROUP_DIMENSION],
            &[WORKGROUP_DIMENSION, WORKGROUP_DIMENSION, WORKGROUP_DIMENSION],
        ],
        output: AttributeOutput::Same,
    },
];

static DESCRIPTORS: Lazy<HashMap<&'static str, &'static AttributeDescriptor>> = Lazy::new(|| {
    ATTRIBUTES
        .iter()
        .map(|descriptor| (descriptor.name, descriptor))
        .collect()
});

pub fn attribute_descriptor(name: &str) -> Option<&'static AttributeDescriptor> {
    DESCRIPTORS.get(name).copied()
}

impl AttributeDescriptor {
    fn shape_for(&self, arity: usize) -> Option<&'static [ParameterShape]> {
        self.shapes.iter().copied().find(|shape| shape.len() == arity)
    }

    fn arities(&self) -> String {
        self.shapes.iter().map(|shape| shape.len()).join(" or ")
    }
}

/// Reads an enumerated attribute argument: a bare identifier, a string
/// literal or a value of a string enum
pub fn enumerated_value(
    document: &Document,
    resolutions: &HashMap<NodeId, NodeId>,
    argument: NodeId,
) -> Option<String> {
    match document.expression(argument)? {
        Expression::Name(name) => Some(name.name.clone()),
        Expression::Literal(text) => match parse_literal(text)?.value {
            ConstantValue::String(value) => Some(value),
            _ => None,
        },
        Expression::EnumValue { .. } => ConstantEvaluator::new(document, resolutions)
            .evaluate(argument)?
            .as_string()
            .map(str::to_string),
        _ => None,
    }
}

impl ValidationTrace<'_> {
    /// Checks every attribute of a list against the declaration the list is
    /// attached to
    pub fn validate_attribute_list(&mut self, list_id: NodeId) -> Result<(), Fatal> {
        let document = self.document();

        let list = document
            .attribute_list(list_id)
            .ok_or(Fatal::UnknownNode(list_id))?;

        let owner = list.owner().ok_or(Fatal::DetachedAttributeList {
            list: list_id,
            span: document.span(list_id),
        })?;

        let mut seen = HashSet::new();

        for &attribute_id in &list.attributes {
            let attribute = document
                .attribute(attribute_id)
                .ok_or(Fatal::UnknownNode(attribute_id))?;
            let name = &attribute.name.name;

            let Some(descriptor) = attribute_descriptor(name) else {
                report_error!(self, attribute_id, "Unknown attribute '@{}'.", name);
                continue;
            };

            if !seen.insert(name.as_str()) {
                report_error!(self, attribute_id, "Attribute '@{}' is already applied.", name);
                continue;
            }

            if !descriptor.targets.contains(&owner.target) {
                report_error!(
                    self,
                    attribute_id,
                    "Attribute '@{}' cannot be applied to a {}.",
                    name,
                    owner.target
                );
                continue;
            }

            let Some(shape) = descriptor.shape_for(attribute.arguments.len()) else {
                report_error!(
                    self,
                    attribute_id,
                    "Attribute '@{}' takes {} arguments, but {} were given.",
                    name,
                    descriptor.arities(),
                    attribute.arguments.len()
                );
                continue;
            };

            for (position, (&argument, parameter)) in
                attribute.arguments.iter().zip(shape).enumerate()
            {
                self.validate_attribute_argument(name, position + 1, argument, *parameter)?;
            }
        }

        Ok(())
    }

    fn validate_attribute_argument(
        &mut self,
        attribute: &str,
        position: usize,
        argument: NodeId,
        shape: ParameterShape,
    ) -> Result<(), Fatal> {
        match shape {
            ParameterShape::OneOf(options) => {
                // Bare identifiers are keywords here, not names to resolve
                if matches!(
                    self.document().expression(argument),
                    Some(Expression::EnumValue { .. })
                ) {
                    self.get_attachment(argument)?;
                }

                let value = enumerated_value(self.document(), self.resolutions(), argument);

                match value {
                    Some(value) if options.contains(&value.as_str()) => {}
                    Some(value) => report_error!(
                        self,
                        argument,
                        "'{}' is not a valid argument for '@{}', expected one of: {}.",
                        value,
                        attribute,
                        options.join(", ")
                    ),
                    None => report_error!(
                        self,
                        argument,
                        "Argument {} of '@{}' must be one of: {}.",
                        position,
                        attribute,
                        options.join(", ")
                    ),
                }
            }
            ParameterShape::Integer { minimum, positive } => {
                let attachment = self.get_attachment(argument)?;
                let ty = &attachment.resolve_type;

                if ty.is_invalid() {
                    return Ok(());
                }

                if !ty.numeric_kind().is_some_and(|kind| kind.is_integer()) {
                    report_error!(
                        self,
                        argument,
                        "Argument {} of '@{}' must be an integer, found '{}'.",
                        position,
                        attribute,
                        ty
                    );
                    return Ok(());
                }

                if attachment.fixed_state < minimum {
                    report_error!(
                        self,
                        argument,
                        "Argument {} of '@{}' must be {}, but it is only {}.",
                        position,
                        attribute,
                        minimum,
                        attachment.fixed_state
                    );
                    return Ok(());
                }

                let value = ConstantEvaluator::new(self.document(), self.resolutions())
                    .evaluate(argument)
                    .and_then(|value| value.as_integer());

                match value {
                    Some(value) if positive && value <= 0 => report_error!(
                        self,
                        argument,
                        "Argument {} of '@{}' must be greater than zero.",
                        position,
                        attribute
                    ),
                    Some(value) if value < 0 => report_error!(
                        self,
                        argument,
                        "Argument {} of '@{}' must not be negative.",
                        position,
                        attribute
                    ),
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::validate::tests::validate_source;

    fn messages(source: &str) -> Vec<String> {
        validate_source(source)
            .incidents
            .into_iter()
            .map(|incident| incident.message)
            .collect()
    }

    #[test]
    fn test_table_lookup() {
        let resource = attribute_descriptor("resource").unwrap();

        assert_eq!(resource.output, AttributeOutput::Resource);
        assert!(resource.shape_for(2).is_some());
        assert!(resource.shape_for(1).is_none());
        assert_eq!(attribute_descriptor("workgroup_size").unwrap().arities(), "1 or 2 or 3");
        assert!(attribute_descriptor("unknown").is_none());
    }

    #[test]
    fn test_valid_attributes_produce_no_incidents() {
        let messages = messages(
            "@group(0) @binding(1) uniform scale: Float32;
            @compute @workgroup_size(8, 8)
            fn main(@builtin(global_invocation_id) id: Vector3<UInt32>) {}",
        );

        assert!(messages.is_empty(), "{messages:#?}");
    }

    #[test]
    fn test_unknown_duplicate_and_misplaced_attributes() {
        let messages = messages(
            "@fancy @group(0) @group(1) @binding(0) uniform a: Float32;
            @location(0) const b = 1;",
        );

        assert!(messages.contains(&"Unknown attribute '@fancy'.".to_string()), "{messages:#?}");
        assert!(messages.contains(&"Attribute '@group' is already applied.".to_string()));
        assert!(
            messages.contains(&"Attribute '@location' cannot be applied to a module variable.".to_string())
        );
    }

    #[test]
    fn test_argument_shapes() {
        let messages = messages(
            "@compute @workgroup_size(0)
            fn a() {}
            @vertex
            fn b(@builtin(elsewhere) i: UInt32, @interpolate(flat, center, sample) @location(1) c: Float32) {}",
        );

        assert!(
            messages.contains(&"Argument 1 of '@workgroup_size' must be greater than zero.".to_string()),
            "{messages:#?}"
        );
        assert!(messages.iter().any(|m| m.starts_with("'elsewhere' is not a valid argument for '@builtin'")));
        assert!(
            messages.contains(&"Attribute '@interpolate' takes 1 or 2 arguments, but 3 were given.".to_string())
        );
    }

    #[test]
    fn test_integer_arguments_need_their_fixed_state() {
        let messages = messages(
            "param count: UInt32 = 4u;
            @group(count) @binding(0) uniform a: Float32;
            @compute @workgroup_size(count)
            fn main() {}",
        );

        assert_eq!(
            messages,
            vec![
                "Argument 1 of '@group' must be Constant, but it is only PipelineCreationFixed."
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_string_enum_values_are_unwrapped() {
        let messages = messages(
            r#"enum Stage { Vertex = "vertex_index", Bad = "nonsense" }
            @vertex
            fn main(@builtin(Stage::Vertex) a: UInt32, @builtin(Stage::Bad) @location(0) b: UInt32) -> @builtin(position) Vector4<Float32> {
                return new Vector4<Float32>();
            }"#,
        );

        assert_eq!(messages.len(), 1, "{messages:#?}");
        assert!(messages[0].starts_with("'nonsense' is not a valid argument"));
    }
}
