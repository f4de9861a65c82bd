//! Signatures of the functions every shader can call without declaring them.
//!
//! Validation only ever talks to a [`FunctionCatalog`], so callers can
//! substitute their own table. [`BuiltinCatalog`] is the default one.

use hashbrown::HashMap;
use itertools::Itertools;

use crate::middle::{
    primitive::{AccessMode, NumericKind, SamplerKind, TextureDimension, TextureKind, VectorSize},
    ty::{ArrayLength, Type, TypeKind},
};

#[derive(Debug, Clone)]
pub struct FunctionHeader {
    pub name: String,
    pub parameters: Vec<Type>,
    pub return_type: Type,
    /// Whether the function can be evaluated at shader creation time when
    /// all of its arguments are constant
    pub is_constant: bool,
}

impl FunctionHeader {
    /// Arity matches and every argument implicitly converts into its
    /// parameter
    pub fn accepts(&self, arguments: &[Type]) -> bool {
        self.parameters.len() == arguments.len()
            && arguments
                .iter()
                .zip(&self.parameters)
                .all(|(argument, parameter)| argument.is_implicitly_castable_into(parameter))
    }
}

pub trait FunctionCatalog {
    /// Finds the first overload of `name` accepting `arguments`
    fn lookup(&self, name: &str, arguments: &[Type]) -> Option<FunctionHeader>;

    /// Whether any overload of `name` exists
    fn contains(&self, name: &str) -> bool;
}

const FLOATS: [NumericKind; 2] = [NumericKind::Float32, NumericKind::Float16];
const SIGNED: [NumericKind; 3] = [
    NumericKind::Float32,
    NumericKind::Float16,
    NumericKind::Int32,
];
const NUMERICS: [NumericKind; 4] = [
    NumericKind::Float32,
    NumericKind::Float16,
    NumericKind::Int32,
    NumericKind::UInt32,
];
const SIZES: [VectorSize; 3] = [VectorSize::Two, VectorSize::Three, VectorSize::Four];

const COMPONENT_WISE_FLOAT_FUNCTIONS: [&str; 23] = [
    "sin",
    "cos",
    "tan",
    "asin",
    "acos",
    "atan",
    "sinh",
    "cosh",
    "tanh",
    "exp",
    "exp2",
    "log",
    "log2",
    "sqrt",
    "inverseSqrt",
    "floor",
    "ceil",
    "round",
    "fract",
    "trunc",
    "saturate",
    "degrees",
    "radians",
];

const TEXTURE_FUNCTIONS: [&str; 5] = [
    "textureSample",
    "textureSampleLevel",
    "textureLoad",
    "textureStore",
    "textureDimensions",
];

/// The scalar followed by its vectors
fn shapes(scalar: Type) -> Vec<Type> {
    std::iter::once(scalar.clone())
        .chain(SIZES.iter().map(|size| Type::vector(*size, scalar.clone())))
        .collect()
}

fn vectors(scalar: Type) -> Vec<Type> {
    SIZES
        .iter()
        .map(|size| Type::vector(*size, scalar.clone()))
        .collect()
}

fn float32() -> Type {
    Type::numeric(NumericKind::Float32)
}

fn uint32() -> Type {
    Type::numeric(NumericKind::UInt32)
}

/// Coordinate type for a texture dimension, a scalar for 1D textures
fn coordinates(count: usize, component: Type) -> Type {
    match VectorSize::from_count(count) {
        Some(size) => Type::vector(size, component),
        None => component,
    }
}

/// Integer type an argument is already written in, defaulting to Int32
fn integer_like(argument: Option<&Type>) -> Type {
    match argument.and_then(Type::component_numeric_kind) {
        Some(NumericKind::UInt32) => uint32(),
        _ => Type::numeric(NumericKind::Int32),
    }
}

pub struct BuiltinCatalog {
    overloads: HashMap<&'static str, Vec<FunctionHeader>>,
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            overloads: HashMap::new(),
        };

        catalog.add_math();
        catalog.add_geometry();
        catalog.add_logic();
        catalog.add_matrix();
        catalog.add_synchronization();

        catalog
    }

    fn add(&mut self, name: &'static str, parameters: Vec<Type>, return_type: Type, is_constant: bool) {
        self.overloads.entry(name).or_default().push(FunctionHeader {
            name: name.to_string(),
            parameters,
            return_type,
            is_constant,
        });
    }

    fn add_component_wise(&mut self, name: &'static str, kinds: &[NumericKind], arity: usize) {
        for kind in kinds {
            for ty in shapes(Type::numeric(*kind)) {
                self.add(name, vec![ty.clone(); arity], ty, true);
            }
        }
    }

    fn add_math(&mut self) {
        for name in COMPONENT_WISE_FLOAT_FUNCTIONS {
            self.add_component_wise(name, &FLOATS, 1);
        }

        self.add_component_wise("sign", &SIGNED, 1);
        self.add_component_wise("abs", &NUMERICS, 1);

        for name in ["min", "max"] {
            self.add_component_wise(name, &NUMERICS, 2);
        }
        self.add_component_wise("clamp", &NUMERICS, 3);

        for name in ["pow", "atan2", "step"] {
            self.add_component_wise(name, &FLOATS, 2);
        }

        for name in ["mix", "smoothstep", "fma"] {
            self.add_component_wise(name, &FLOATS, 3);
        }

        for name in ["dpdx", "dpdy", "fwidth"] {
            for ty in shapes(float32()) {
                self.add(name, vec![ty.clone()], ty, false);
            }
        }
    }

    fn add_geometry(&mut self) {
        for kind in NUMERICS {
            let scalar = Type::numeric(kind);

            for vector in vectors(scalar.clone()) {
                self.add("dot", vec![vector.clone(), vector], scalar.clone(), true);
            }
        }

        for kind in FLOATS {
            let scalar = Type::numeric(kind);
            let vector3 = Type::vector(VectorSize::Three, scalar.clone());

            self.add("cross", vec![vector3.clone(), vector3.clone()], vector3, true);

            for ty in shapes(scalar.clone()) {
                self.add("length", vec![ty.clone()], scalar.clone(), true);
                self.add("distance", vec![ty.clone(), ty], scalar.clone(), true);
            }

            for vector in vectors(scalar) {
                self.add("normalize", vec![vector.clone()], vector.clone(), true);
                self.add("reflect", vec![vector.clone(), vector.clone()], vector, true);
            }
        }

        let vector4 = Type::vector(VectorSize::Four, float32());
        self.add("pack4x8unorm", vec![vector4.clone()], uint32(), true);
        self.add("unpack4x8unorm", vec![uint32()], vector4, true);
    }

    fn add_logic(&mut self) {
        let scalars = NUMERICS
            .iter()
            .map(|kind| Type::numeric(*kind))
            .chain(std::iter::once(Type::boolean()));

        for scalar in scalars {
            self.add(
                "select",
                vec![scalar.clone(), scalar.clone(), Type::boolean()],
                scalar.clone(),
                true,
            );

            for size in SIZES {
                let vector = Type::vector(size, scalar.clone());

                self.add(
                    "select",
                    vec![vector.clone(), vector.clone(), Type::vector(size, Type::boolean())],
                    vector.clone(),
                    true,
                );
                self.add(
                    "select",
                    vec![vector.clone(), vector.clone(), Type::boolean()],
                    vector,
                    true,
                );
            }
        }

        for name in ["all", "any"] {
            for ty in shapes(Type::boolean()) {
                self.add(name, vec![ty], Type::boolean(), true);
            }
        }
    }

    fn add_matrix(&mut self) {
        for kind in FLOATS {
            let scalar = Type::numeric(kind);

            for (columns, rows) in SIZES.iter().cartesian_product(SIZES.iter()) {
                self.add(
                    "transpose",
                    vec![Type::matrix(*columns, *rows, scalar.clone())],
                    Type::matrix(*rows, *columns, scalar.clone()),
                    true,
                );
            }

            for size in SIZES {
                self.add(
                    "determinant",
                    vec![Type::matrix(size, size, scalar.clone())],
                    scalar.clone(),
                    true,
                );
            }
        }
    }

    fn add_synchronization(&mut self) {
        for name in ["workgroupBarrier", "storageBarrier"] {
            self.add(name, Vec::new(), Type::void(), false);
        }
    }

    /// Texture functions are generic over the texture passed in, so their
    /// header is derived from the first argument
    fn texture_header(name: &str, arguments: &[Type]) -> Option<FunctionHeader> {
        let texture_type = arguments.first()?;

        let TypeKind::Texture(texture) = texture_type.resolved().kind() else {
            return None;
        };

        let dimension = texture.kind.dimension();
        let float_coordinates = coordinates(dimension.coordinate_count(), float32());
        let integer_component = integer_like(arguments.get(1));
        let integer_coordinates =
            coordinates(dimension.coordinate_count(), integer_component.clone());

        let texel = |channel: Type| Type::vector(VectorSize::Four, channel);
        let channel = match (&texture.sampled, texture.format) {
            (Some(sampled), _) => sampled.clone(),
            (None, Some(format)) => Type::numeric(format.channel_kind()),
            (None, None) => float32(),
        };
        let is_depth = matches!(
            texture.kind,
            TextureKind::Depth(_) | TextureKind::DepthMultisampled2D
        );

        let mut parameters = vec![texture_type.clone()];

        let return_type = match name {
            "textureSample" | "textureSampleLevel" => {
                let sampleable = matches!(texture.kind, TextureKind::Sampled(_) | TextureKind::Depth(_))
                    && channel.equals(&float32());

                if !sampleable {
                    return None;
                }

                parameters.push(Type::new(TypeKind::Sampler(SamplerKind::Sampler)));
                parameters.push(float_coordinates);

                if dimension.is_arrayed() {
                    parameters.push(integer_like(arguments.get(3)));
                }

                if name == "textureSampleLevel" {
                    parameters.push(if is_depth {
                        integer_like(arguments.get(parameters.len()))
                    } else {
                        float32()
                    });
                }

                if is_depth { float32() } else { texel(channel) }
            }
            "textureLoad" => {
                parameters.push(integer_coordinates);

                if dimension.is_arrayed() {
                    parameters.push(integer_like(arguments.get(2)));
                }

                if !texture.kind.is_storage() {
                    // Mip level, or sample index for multisampled textures
                    parameters.push(integer_like(arguments.get(parameters.len())));
                }

                if is_depth { float32() } else { texel(channel) }
            }
            "textureStore" => {
                let writable = matches!(
                    texture.access,
                    Some(AccessMode::Write | AccessMode::ReadWrite)
                );

                if !texture.kind.is_storage() || !writable {
                    return None;
                }

                parameters.push(integer_coordinates);

                if dimension.is_arrayed() {
                    parameters.push(integer_like(arguments.get(2)));
                }

                parameters.push(texel(channel));

                Type::void()
            }
            "textureDimensions" => {
                let takes_level = matches!(texture.kind, TextureKind::Sampled(_) | TextureKind::Depth(_));

                if takes_level && arguments.len() == 2 {
                    parameters.push(integer_like(arguments.get(1)));
                }

                match dimension {
                    TextureDimension::D1 => uint32(),
                    TextureDimension::D3 => Type::vector(VectorSize::Three, uint32()),
                    _ => Type::vector(VectorSize::Two, uint32()),
                }
            }
            _ => return None,
        };

        Some(FunctionHeader {
            name: name.to_string(),
            parameters,
            return_type,
            is_constant: false,
        })
    }

    /// `arrayLength` takes a pointer to a runtime-sized array
    fn array_length_header(arguments: &[Type]) -> Option<FunctionHeader> {
        let pointer = arguments.first()?;
        let is_runtime_array = pointer
            .pointee()
            .is_some_and(|pointee| matches!(pointee.resolved().kind(), TypeKind::Array { length: ArrayLength::Runtime, .. }));

        is_runtime_array.then(|| FunctionHeader {
            name: "arrayLength".to_string(),
            parameters: vec![pointer.clone()],
            return_type: uint32(),
            is_constant: false,
        })
    }
}

impl FunctionCatalog for BuiltinCatalog {
    fn lookup(&self, name: &str, arguments: &[Type]) -> Option<FunctionHeader> {
        let header = if TEXTURE_FUNCTIONS.contains(&name) {
            Self::texture_header(name, arguments)
        } else if name == "arrayLength" {
            Self::array_length_header(arguments)
        } else {
            self.overloads
                .get(name)?
                .iter()
                .find(|header| header.accepts(arguments))
                .cloned()
        };

        header.filter(|header| header.accepts(arguments))
    }

    fn contains(&self, name: &str) -> bool {
        self.overloads.contains_key(name) || TEXTURE_FUNCTIONS.contains(&name) || name == "arrayLength"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::{primitive::TexelFormat, ty::TextureType};

    fn numeric(kind: NumericKind) -> Type {
        Type::numeric(kind)
    }

    #[test]
    fn test_abstract_arguments_pick_the_first_family_overload() {
        let catalog = BuiltinCatalog::new();

        let sin = catalog
            .lookup("sin", &[numeric(NumericKind::AbstractFloat)])
            .unwrap();
        assert!(sin.return_type.equals(&numeric(NumericKind::Float32)));

        let min = catalog
            .lookup(
                "min",
                &[numeric(NumericKind::AbstractInt), numeric(NumericKind::AbstractInt)],
            )
            .unwrap();
        assert!(min.return_type.equals(&numeric(NumericKind::Int32)));

        let half = catalog
            .lookup("sqrt", &[numeric(NumericKind::Float16)])
            .unwrap();
        assert!(half.return_type.equals(&numeric(NumericKind::Float16)));
    }

    #[test]
    fn test_mixed_concrete_arguments_do_not_match() {
        let catalog = BuiltinCatalog::new();

        assert!(
            catalog
                .lookup(
                    "min",
                    &[numeric(NumericKind::Int32), numeric(NumericKind::UInt32)]
                )
                .is_none()
        );
        assert!(catalog.contains("min"));
        assert!(!catalog.contains("launchMissiles"));
    }

    #[test]
    fn test_geometry_functions() {
        let catalog = BuiltinCatalog::new();
        let vector3 = Type::vector(VectorSize::Three, float32());

        let dot = catalog
            .lookup("dot", &[vector3.clone(), vector3.clone()])
            .unwrap();
        assert!(dot.return_type.equals(&float32()));

        let cross = catalog
            .lookup("cross", &[vector3.clone(), vector3.clone()])
            .unwrap();
        assert!(cross.return_type.equals(&vector3));
        assert!(cross.is_constant);
    }

    #[test]
    fn test_texture_sample_is_derived_from_the_texture() {
        let catalog = BuiltinCatalog::new();
        let texture = Type::new(TypeKind::Texture(TextureType {
            kind: TextureKind::Sampled(TextureDimension::D2),
            sampled: Some(float32()),
            format: None,
            access: None,
        }));
        let sampler = Type::new(TypeKind::Sampler(SamplerKind::Sampler));
        let uv = Type::vector(VectorSize::Two, float32());

        let header = catalog
            .lookup("textureSample", &[texture.clone(), sampler, uv])
            .unwrap();

        assert!(
            header
                .return_type
                .equals(&Type::vector(VectorSize::Four, float32()))
        );
        assert!(!header.is_constant);

        let dimensions = catalog.lookup("textureDimensions", &[texture]).unwrap();
        assert!(
            dimensions
                .return_type
                .equals(&Type::vector(VectorSize::Two, uint32()))
        );
    }

    #[test]
    fn test_texture_store_requires_write_access() {
        let catalog = BuiltinCatalog::new();
        let storage = |access| {
            Type::new(TypeKind::Texture(TextureType {
                kind: TextureKind::Storage(TextureDimension::D2),
                sampled: None,
                format: Some(TexelFormat::Rgba8Unorm),
                access: Some(access),
            }))
        };
        let coordinates = Type::vector(VectorSize::Two, uint32());
        let value = Type::vector(VectorSize::Four, float32());

        assert!(
            catalog
                .lookup(
                    "textureStore",
                    &[storage(AccessMode::Write), coordinates.clone(), value.clone()]
                )
                .is_some()
        );
        assert!(
            catalog
                .lookup("textureStore", &[storage(AccessMode::Read), coordinates, value])
                .is_none()
        );
    }
}
