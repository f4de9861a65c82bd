use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::middle::{
    ast::NodeId,
    primitive::{
        AccessMode, AddressSpace, NumericKind, SamplerKind, TexelFormat, TextureKind, VectorSize,
    },
};

/// Cheap handle to an immutable type. Capabilities are computed once when the
/// type is created and travel with it.
#[derive(Clone)]
pub struct Type(Rc<TypeData>);

struct TypeData {
    kind: TypeKind,
    capabilities: Capabilities,
}

#[derive(Debug)]
pub enum TypeKind {
    /// Boolean
    Boolean,
    /// Int32, Float16, or the abstract type of an unsuffixed literal
    Numeric(NumericKind),
    /// Vector3<Float32>
    Vector(VectorSize, Type),
    /// Matrix4x3<Float32>
    ///
    /// `column` is the vector type produced by indexing the matrix
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        inner: Type,
        column: Type,
    },
    /// Array<Float32, 4> or the runtime-sized Array<Float32>
    Array { inner: Type, length: ArrayLength },
    Struct(StructType),
    Enum(EnumType),
    Alias(AliasType),
    /// *Float32
    Pointer(PointerType),
    Sampler(SamplerKind),
    Texture(TextureType),
    /// String, only usable as enum values and attribute arguments
    String,
    /// Return type of functions without a value
    Void,
    /// The type of something which already failed validation. Nothing is
    /// reported against it again.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLength {
    /// No length, only legal as the last member of a storage buffer struct
    Runtime,
    Constant(u64),
    /// Sized by a pipeline-overridable `param` declaration
    Override { declaration: NodeId, name: String },
}

#[derive(Debug)]
pub struct StructType {
    pub name: String,
    pub declaration: NodeId,
    pub members: Vec<StructMember>,
}

#[derive(Debug)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug)]
pub struct EnumType {
    pub name: String,
    pub declaration: NodeId,
    /// `UInt32` for numeric enums, `String` for string enums
    pub underlying: Type,
}

#[derive(Debug)]
pub struct AliasType {
    pub name: String,
    pub declaration: NodeId,
    pub target: Type,
}

#[derive(Debug)]
pub struct PointerType {
    pub pointee: Type,
    space: OnceCell<AddressSpace>,
}

#[derive(Debug)]
pub struct TextureType {
    pub kind: TextureKind,
    /// Channel type of sampled and multisampled textures
    pub sampled: Option<Type>,
    pub format: Option<TexelFormat>,
    pub access: Option<AccessMode>,
}

/// Properties every legality check is phrased in terms of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub storable: bool,
    pub host_shareable: bool,
    pub composite: bool,
    pub constructible: bool,
    pub fixed_footprint: bool,
    pub indexable: bool,
    pub concrete: bool,
    pub scalar: bool,
    pub plain: bool,
}

impl Capabilities {
    const SCALAR: Self = Self {
        storable: true,
        host_shareable: true,
        composite: false,
        constructible: true,
        fixed_footprint: true,
        indexable: false,
        concrete: true,
        scalar: true,
        plain: true,
    };

    const OPAQUE: Self = Self {
        storable: false,
        host_shareable: false,
        composite: false,
        constructible: false,
        fixed_footprint: true,
        indexable: false,
        concrete: true,
        scalar: false,
        plain: false,
    };

    fn of(kind: &TypeKind) -> Self {
        match kind {
            TypeKind::Boolean => Self {
                host_shareable: false,
                ..Self::SCALAR
            },
            TypeKind::Numeric(numeric) => Self {
                host_shareable: !numeric.is_abstract(),
                concrete: !numeric.is_abstract(),
                ..Self::SCALAR
            },
            TypeKind::Vector(_, inner) | TypeKind::Matrix { inner, .. } => {
                let inner = inner.capabilities();

                Self {
                    storable: true,
                    host_shareable: inner.host_shareable,
                    composite: true,
                    constructible: true,
                    fixed_footprint: true,
                    indexable: true,
                    concrete: inner.concrete,
                    scalar: false,
                    plain: true,
                }
            }
            TypeKind::Array { inner, length } => {
                let inner = inner.capabilities();

                let (constructible, fixed_footprint) = match length {
                    ArrayLength::Constant(_) => (inner.constructible, inner.fixed_footprint),
                    ArrayLength::Override { .. } => (false, true),
                    ArrayLength::Runtime => (false, false),
                };

                Self {
                    storable: inner.storable,
                    host_shareable: inner.host_shareable,
                    composite: true,
                    constructible,
                    fixed_footprint,
                    indexable: true,
                    concrete: inner.concrete,
                    scalar: false,
                    plain: true,
                }
            }
            TypeKind::Struct(structure) => {
                let all = |capability: fn(&Capabilities) -> bool| {
                    structure
                        .members
                        .iter()
                        .all(|member| capability(&member.ty.capabilities()))
                };

                Self {
                    storable: all(|c| c.storable),
                    host_shareable: all(|c| c.host_shareable),
                    composite: true,
                    constructible: all(|c| c.constructible),
                    fixed_footprint: all(|c| c.fixed_footprint),
                    indexable: false,
                    concrete: all(|c| c.concrete),
                    scalar: false,
                    plain: true,
                }
            }
            TypeKind::Enum(enumeration) => enumeration.underlying.capabilities(),
            TypeKind::Alias(alias) => alias.target.capabilities(),
            TypeKind::Pointer(_) | TypeKind::Sampler(_) | TypeKind::Texture(_) => Self::OPAQUE,
            TypeKind::String => Self {
                fixed_footprint: false,
                ..Self::OPAQUE
            },
            TypeKind::Void => Self::default(),
            TypeKind::Invalid => Self {
                concrete: true,
                ..Self::default()
            },
        }
    }
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        let capabilities = Capabilities::of(&kind);

        Self(Rc::new(TypeData { kind, capabilities }))
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean)
    }

    pub fn numeric(kind: NumericKind) -> Self {
        Self::new(TypeKind::Numeric(kind))
    }

    pub fn vector(size: VectorSize, inner: Type) -> Self {
        Self::new(TypeKind::Vector(size, inner))
    }

    pub fn matrix(columns: VectorSize, rows: VectorSize, inner: Type) -> Self {
        let column = Self::vector(rows, inner.clone());

        Self::new(TypeKind::Matrix {
            columns,
            rows,
            inner,
            column,
        })
    }

    pub fn array(inner: Type, length: ArrayLength) -> Self {
        Self::new(TypeKind::Array { inner, length })
    }

    /// Creates a pointer whose address space may still be bound later
    pub fn pointer(pointee: Type, space: Option<AddressSpace>) -> Self {
        let cell = OnceCell::new();

        if let Some(space) = space {
            let _ = cell.set(space);
        }

        Self::new(TypeKind::Pointer(PointerType {
            pointee,
            space: cell,
        }))
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void)
    }

    pub fn invalid() -> Self {
        Self::new(TypeKind::Invalid)
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.0.capabilities
    }

    /// Strips aliases and enums down to the type that gives them meaning
    pub fn resolved(&self) -> &Type {
        let mut ty = self;

        loop {
            match ty.kind() {
                TypeKind::Alias(alias) => ty = &alias.target,
                TypeKind::Enum(enumeration) => ty = &enumeration.underlying,
                _ => return ty,
            }
        }
    }

    /// Structural equality after alias and enum resolution. Structs are only
    /// equal to themselves.
    pub fn equals(&self, other: &Type) -> bool {
        let (this, other) = (self.resolved(), other.resolved());

        if Rc::ptr_eq(&this.0, &other.0) {
            return true;
        }

        match (this.kind(), other.kind()) {
            (TypeKind::Boolean, TypeKind::Boolean)
            | (TypeKind::String, TypeKind::String)
            | (TypeKind::Void, TypeKind::Void)
            | (TypeKind::Invalid, TypeKind::Invalid) => true,
            (TypeKind::Numeric(a), TypeKind::Numeric(b)) => a == b,
            (TypeKind::Vector(size_a, inner_a), TypeKind::Vector(size_b, inner_b)) => {
                size_a == size_b && inner_a.equals(inner_b)
            }
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
            ) => columns_a == columns_b && rows_a == rows_b && inner_a.equals(inner_b),
            (
                TypeKind::Array {
                    inner: inner_a,
                    length: length_a,
                },
                TypeKind::Array {
                    inner: inner_b,
                    length: length_b,
                },
            ) => length_a == length_b && inner_a.equals(inner_b),
            (TypeKind::Struct(a), TypeKind::Struct(b)) => a.declaration == b.declaration,
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => {
                let spaces_compatible = match (a.space(), b.space()) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                };

                spaces_compatible && a.pointee.equals(&b.pointee)
            }
            (TypeKind::Sampler(a), TypeKind::Sampler(b)) => a == b,
            (TypeKind::Texture(a), TypeKind::Texture(b)) => {
                let sampled_equal = match (&a.sampled, &b.sampled) {
                    (Some(a), Some(b)) => a.equals(b),
                    (None, None) => true,
                    _ => false,
                };

                a.kind == b.kind && a.format == b.format && a.access == b.access && sampled_equal
            }
            _ => false,
        }
    }

    /// Whether a `new Target(value)` style conversion is allowed
    pub fn is_explicitly_castable_into(&self, target: &Type) -> bool {
        if self.equals(target) {
            return true;
        }

        let (from, to) = (self.resolved(), target.resolved());

        if from.is_invalid() || to.is_invalid() {
            return true;
        }

        match (from.kind(), to.kind()) {
            (TypeKind::Numeric(_), TypeKind::Numeric(_)) => true,
            (TypeKind::Vector(size_a, inner_a), TypeKind::Vector(size_b, inner_b)) => {
                size_a == size_b && inner_a.is_explicitly_castable_into(inner_b)
            }
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
            ) => {
                columns_a == columns_b
                    && rows_a == rows_b
                    && inner_a.is_explicitly_castable_into(inner_b)
            }
            (
                TypeKind::Array {
                    inner: inner_a,
                    length: length_a,
                },
                TypeKind::Array {
                    inner: inner_b,
                    length: length_b,
                },
            ) => length_a == length_b && inner_a.is_explicitly_castable_into(inner_b),
            _ => false,
        }
    }

    /// Whether a value of this type may be used where `target` is expected
    /// without writing a conversion. Only abstract numerics promote.
    pub fn is_implicitly_castable_into(&self, target: &Type) -> bool {
        if !self.is_explicitly_castable_into(target) {
            return false;
        }

        if self.equals(target) {
            return true;
        }

        let (from, to) = (self.resolved(), target.resolved());

        if from.is_invalid() || to.is_invalid() {
            return true;
        }

        match (from.kind(), to.kind()) {
            (TypeKind::Numeric(a), TypeKind::Numeric(b)) => a.is_implicitly_castable_into(*b),
            (TypeKind::Vector(_, inner_a), TypeKind::Vector(_, inner_b))
            | (TypeKind::Matrix { inner: inner_a, .. }, TypeKind::Matrix { inner: inner_b, .. })
            | (TypeKind::Array { inner: inner_a, .. }, TypeKind::Array { inner: inner_b, .. }) => {
                inner_a.is_implicitly_castable_into(inner_b)
            }
            _ => false,
        }
    }

    /// Replaces abstract numerics with the concrete kinds they default to
    pub fn concretize(&self) -> Type {
        match self.kind() {
            TypeKind::Numeric(kind) if kind.is_abstract() => Type::numeric(kind.concretize()),
            TypeKind::Vector(size, inner) if !inner.capabilities().concrete => {
                Type::vector(*size, inner.concretize())
            }
            TypeKind::Matrix {
                columns,
                rows,
                inner,
                ..
            } if !inner.capabilities().concrete => Type::matrix(*columns, *rows, inner.concretize()),
            TypeKind::Array { inner, length } if !inner.capabilities().concrete => {
                Type::array(inner.concretize(), length.clone())
            }
            _ => self.clone(),
        }
    }

    /// Binds the address space of a pointer. Fails with the space already
    /// bound when it differs. Non-pointer types ignore the request.
    pub fn bind_address_space(&self, space: AddressSpace) -> Result<(), AddressSpace> {
        let TypeKind::Pointer(pointer) = self.resolved().kind() else {
            return Ok(());
        };

        match pointer.space.get() {
            Some(bound) if *bound != space => Err(*bound),
            Some(_) => Ok(()),
            None => {
                let _ = pointer.space.set(space);
                Ok(())
            }
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.resolved().kind(), TypeKind::Invalid)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.resolved().kind(), TypeKind::Void)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.resolved().kind(), TypeKind::Boolean)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.resolved().kind(), TypeKind::String)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.resolved().kind(), TypeKind::Pointer(_))
    }

    /// Samplers and textures, which are bound as resources rather than buffers
    pub fn is_handle(&self) -> bool {
        matches!(
            self.resolved().kind(),
            TypeKind::Sampler(_) | TypeKind::Texture(_)
        )
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self.resolved().kind() {
            TypeKind::Pointer(pointer) => Some(&pointer.pointee),
            _ => None,
        }
    }

    pub fn address_space(&self) -> Option<AddressSpace> {
        match self.resolved().kind() {
            TypeKind::Pointer(pointer) => pointer.space(),
            _ => None,
        }
    }

    /// Numeric kind of a scalar
    pub fn numeric_kind(&self) -> Option<NumericKind> {
        match self.resolved().kind() {
            TypeKind::Numeric(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn vector_size(&self) -> Option<VectorSize> {
        match self.resolved().kind() {
            TypeKind::Vector(size, _) => Some(*size),
            _ => None,
        }
    }

    /// The scalar itself, or the component type of a vector
    pub fn scalar_component(&self) -> Option<&Type> {
        let ty = self.resolved();

        match ty.kind() {
            TypeKind::Boolean | TypeKind::Numeric(_) => Some(ty),
            TypeKind::Vector(_, inner) => Some(inner.resolved()),
            _ => None,
        }
    }

    /// Numeric kind of a numeric scalar or of a numeric vector's components
    pub fn component_numeric_kind(&self) -> Option<NumericKind> {
        self.scalar_component().and_then(Type::numeric_kind)
    }

    /// Same shape as `self` (scalar or vector of the same size) but with
    /// `component` as the scalar type
    pub fn with_component(&self, component: Type) -> Type {
        match self.vector_size() {
            Some(size) => Type::vector(size, component),
            None => component,
        }
    }

    /// Result of indexing into a value of this type
    pub fn indexed_element(&self) -> Option<&Type> {
        match self.resolved().kind() {
            TypeKind::Vector(_, inner) | TypeKind::Array { inner, .. } => Some(inner),
            TypeKind::Matrix { column, .. } => Some(column),
            _ => None,
        }
    }

    /// Number of elements when it is known at compile time
    pub fn element_count(&self) -> Option<u64> {
        match self.resolved().kind() {
            TypeKind::Vector(size, _) => Some(size.count() as u64),
            TypeKind::Matrix { columns, .. } => Some(columns.count() as u64),
            TypeKind::Array {
                length: ArrayLength::Constant(length),
                ..
            } => Some(*length),
            _ => None,
        }
    }

    pub fn struct_type(&self) -> Option<&StructType> {
        match self.resolved().kind() {
            TypeKind::Struct(structure) => Some(structure),
            _ => None,
        }
    }

    pub fn is_runtime_sized_array(&self) -> bool {
        matches!(
            self.resolved().kind(),
            TypeKind::Array {
                length: ArrayLength::Runtime,
                ..
            }
        )
    }
}

impl PointerType {
    pub fn space(&self) -> Option<AddressSpace> {
        self.space.get().copied()
    }
}

impl StructType {
    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|member| member.name == name)
    }
}

impl core::ops::Deref for Type {
    type Target = TypeKind;

    fn deref(&self) -> &Self::Target {
        &self.0.kind
    }
}

impl core::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Type").field(&self.0.kind).finish()
    }
}

impl core::fmt::Display for ArrayLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArrayLength::Runtime => Ok(()),
            ArrayLength::Constant(length) => write!(f, "{length}"),
            ArrayLength::Override { name, .. } => write!(f, "{name}"),
        }
    }
}

impl core::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Numeric(kind) => write!(f, "{kind}"),
            Self::Vector(size, inner) => write!(f, "Vector{size}<{inner}>"),
            Self::Matrix {
                columns,
                rows,
                inner,
                ..
            } => write!(f, "Matrix{columns}x{rows}<{inner}>"),
            Self::Array {
                inner,
                length: ArrayLength::Runtime,
            } => write!(f, "Array<{inner}>"),
            Self::Array { inner, length } => write!(f, "Array<{inner}, {length}>"),
            Self::Struct(structure) => write!(f, "{}", structure.name),
            Self::Enum(enumeration) => write!(f, "{}", enumeration.name),
            Self::Alias(alias) => write!(f, "{}", alias.name),
            Self::Pointer(pointer) => write!(f, "*{}", pointer.pointee),
            Self::Sampler(kind) => write!(f, "{kind}"),
            Self::Texture(texture) => {
                write!(f, "{}", texture.kind)?;

                if let Some(sampled) = &texture.sampled {
                    write!(f, "<{sampled}>")?;
                } else if let (Some(format), Some(access)) = (texture.format, texture.access) {
                    write!(f, "<{format}, {access}>")?;
                }

                Ok(())
            }
            Self::String => write!(f, "String"),
            Self::Void => write!(f, "Void"),
            Self::Invalid => write!(f, "{{invalid}}"),
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.kind)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{index::Index, middle::primitive::TextureDimension};

    fn float32() -> Type {
        Type::numeric(NumericKind::Float32)
    }

    fn sample_types() -> Vec<Type> {
        let mut types = NumericKind::iter().map(Type::numeric).collect::<Vec<_>>();

        types.extend([
            Type::boolean(),
            Type::string(),
            Type::void(),
            Type::invalid(),
            Type::vector(VectorSize::Three, float32()),
            Type::matrix(VectorSize::Four, VectorSize::Two, float32()),
            Type::array(float32(), ArrayLength::Constant(4)),
            Type::array(float32(), ArrayLength::Runtime),
            Type::pointer(float32(), None),
            Type::new(TypeKind::Sampler(SamplerKind::Sampler)),
            Type::new(TypeKind::Texture(TextureType {
                kind: TextureKind::Sampled(TextureDimension::D2),
                sampled: Some(float32()),
                format: None,
                access: None,
            })),
        ]);

        types
    }

    #[test]
    fn test_cast_reflexivity() {
        for ty in sample_types() {
            assert!(ty.equals(&ty), "{ty}");
            assert!(ty.is_implicitly_castable_into(&ty), "{ty}");
            assert!(ty.is_explicitly_castable_into(&ty), "{ty}");
        }
    }

    #[test]
    fn test_different_variants_are_never_equal() {
        let types = sample_types();

        for (i, a) in types.iter().enumerate() {
            for (j, b) in types.iter().enumerate() {
                if i != j {
                    assert!(!a.equals(b), "{a} == {b}");
                }
            }
        }
    }

    #[test]
    fn test_numeric_casts_are_explicit_only() {
        let int = Type::numeric(NumericKind::Int32);
        let uint = Type::numeric(NumericKind::UInt32);

        assert!(int.is_explicitly_castable_into(&uint));
        assert!(!int.is_implicitly_castable_into(&uint));
        assert!(Type::numeric(NumericKind::AbstractInt).is_implicitly_castable_into(&uint));
        assert!(!Type::numeric(NumericKind::AbstractFloat).is_implicitly_castable_into(&int));
        assert!(!Type::boolean().is_explicitly_castable_into(&int));
    }

    #[test]
    fn test_vector_casts_require_matching_size() {
        let abstract_vector = Type::vector(
            VectorSize::Three,
            Type::numeric(NumericKind::AbstractFloat),
        );

        assert!(abstract_vector.is_implicitly_castable_into(&Type::vector(
            VectorSize::Three,
            float32()
        )));
        assert!(!abstract_vector.is_explicitly_castable_into(&Type::vector(
            VectorSize::Two,
            float32()
        )));
    }

    #[test]
    fn test_alias_and_enum_delegate_to_resolved_type() {
        let alias = Type::new(TypeKind::Alias(AliasType {
            name: "Color".into(),
            declaration: NodeId::new(0),
            target: Type::vector(VectorSize::Four, float32()),
        }));
        let enumeration = Type::new(TypeKind::Enum(EnumType {
            name: "Mode".into(),
            declaration: NodeId::new(1),
            underlying: Type::numeric(NumericKind::UInt32),
        }));

        assert!(alias.equals(&Type::vector(VectorSize::Four, float32())));
        assert!(enumeration.equals(&Type::numeric(NumericKind::UInt32)));
        assert_eq!(alias.capabilities(), alias.resolved().capabilities());
        assert_eq!(alias.to_string(), "Color");
    }

    #[test]
    fn test_structs_compare_by_declaration() {
        let make = |declaration| {
            Type::new(TypeKind::Struct(StructType {
                name: "Light".into(),
                declaration: NodeId::new(declaration),
                members: vec![StructMember {
                    name: "intensity".into(),
                    ty: float32(),
                }],
            }))
        };

        assert!(make(3).equals(&make(3)));
        assert!(!make(3).equals(&make(4)));
    }

    #[test]
    fn test_pointer_address_space_binds_once() {
        let pointer = Type::pointer(float32(), None);
        let shared = pointer.clone();

        assert!(pointer.equals(&Type::pointer(float32(), Some(AddressSpace::Storage))));
        assert_eq!(pointer.bind_address_space(AddressSpace::Function), Ok(()));
        assert_eq!(shared.address_space(), Some(AddressSpace::Function));
        assert_eq!(pointer.bind_address_space(AddressSpace::Function), Ok(()));
        assert_eq!(
            pointer.bind_address_space(AddressSpace::Private),
            Err(AddressSpace::Function)
        );
        assert!(!pointer.equals(&Type::pointer(float32(), Some(AddressSpace::Private))));
    }

    #[test]
    fn test_invalid_silences_casts() {
        let invalid = Type::invalid();

        assert!(invalid.is_implicitly_castable_into(&float32()));
        assert!(float32().is_implicitly_castable_into(&invalid));
        assert!(!invalid.equals(&float32()));
    }

    #[test]
    fn test_capabilities() {
        let runtime = Type::array(float32(), ArrayLength::Runtime);
        let sized = Type::array(float32(), ArrayLength::Constant(8));
        let abstract_int = Type::numeric(NumericKind::AbstractInt);

        assert!(!runtime.capabilities().fixed_footprint);
        assert!(!runtime.capabilities().constructible);
        assert!(runtime.capabilities().host_shareable);
        assert!(sized.capabilities().constructible);
        assert!(!abstract_int.capabilities().concrete);
        assert!(!Type::boolean().capabilities().host_shareable);
        assert!(!Type::pointer(float32(), None).capabilities().storable);
        assert!(Type::vector(VectorSize::Two, float32()).capabilities().indexable);
    }

    #[test]
    fn test_concretize() {
        let abstract_vector = Type::vector(
            VectorSize::Two,
            Type::numeric(NumericKind::AbstractInt),
        );

        assert!(
            abstract_vector
                .concretize()
                .equals(&Type::vector(VectorSize::Two, Type::numeric(NumericKind::Int32)))
        );
        assert!(float32().concretize().equals(&float32()));
    }

    #[test]
    fn test_display_uses_source_names() {
        assert_eq!(
            Type::matrix(VectorSize::Four, VectorSize::Three, float32()).to_string(),
            "Matrix4x3<Float32>"
        );
        assert_eq!(
            Type::pointer(Type::array(float32(), ArrayLength::Constant(2)), None).to_string(),
            "*Array<Float32, 2>"
        );
        assert_eq!(
            Type::array(float32(), ArrayLength::Runtime).to_string(),
            "Array<Float32>"
        );
    }
}
