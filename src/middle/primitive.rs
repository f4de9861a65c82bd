use strum::{Display, EnumIter, EnumString};

/// Scalar numeric kinds. The abstract kinds only exist at compile time and are
/// the type of unsuffixed literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum NumericKind {
    AbstractInt,
    AbstractFloat,
    Int32,
    UInt32,
    Float32,
    Float16,
}

impl NumericKind {
    /// Parses the name of a concrete numeric type as written in source
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "Int32" => Some(Self::Int32),
            "UInt32" => Some(Self::UInt32),
            "Float32" => Some(Self::Float32),
            "Float16" => Some(Self::Float16),
            _ => None,
        }
    }

    pub fn is_abstract(self) -> bool {
        matches!(self, Self::AbstractInt | Self::AbstractFloat)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::AbstractInt | Self::Int32 | Self::UInt32)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::AbstractFloat | Self::Float32 | Self::Float16)
    }

    pub fn is_signed(self) -> bool {
        !matches!(self, Self::UInt32)
    }

    /// The concrete kind an abstract value settles on when nothing else
    /// constrains it
    pub fn concretize(self) -> Self {
        match self {
            Self::AbstractInt => Self::Int32,
            Self::AbstractFloat => Self::Float32,
            kind => kind,
        }
    }

    /// Abstract kinds promote to the concrete kinds of their family, every
    /// other pair requires an explicit conversion
    pub fn is_implicitly_castable_into(self, target: Self) -> bool {
        if self == target {
            return true;
        }

        match self {
            Self::AbstractInt => matches!(target, Self::Int32 | Self::UInt32),
            Self::AbstractFloat => matches!(target, Self::Float32 | Self::Float16),
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::Float16 => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VectorSize {
    Two = 2,
    Three = 3,
    Four = 4,
}

impl VectorSize {
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    pub fn count(self) -> usize {
        self as usize
    }
}

impl core::fmt::Display for VectorSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Memory region a variable or pointer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

/// Texel formats usable with storage textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum TexelFormat {
    Rgba8Unorm,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Float,
    R32Uint,
    R32Sint,
    R32Float,
    Rg32Uint,
    Rg32Sint,
    Rg32Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
    Bgra8Unorm,
}

impl TexelFormat {
    /// Scalar kind of the channels as seen by a shader
    pub fn channel_kind(self) -> NumericKind {
        match self {
            Self::Rgba8Uint
            | Self::Rgba16Uint
            | Self::R32Uint
            | Self::Rg32Uint
            | Self::Rgba32Uint => NumericKind::UInt32,
            Self::Rgba8Sint
            | Self::Rgba16Sint
            | Self::R32Sint
            | Self::Rg32Sint
            | Self::Rgba32Sint => NumericKind::Int32,
            Self::Rgba8Unorm
            | Self::Rgba8Snorm
            | Self::Rgba16Float
            | Self::R32Float
            | Self::Rg32Float
            | Self::Rgba32Float
            | Self::Bgra8Unorm => NumericKind::Float32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Sampler,
    ComparisonSampler,
}

impl SamplerKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "Sampler" => Some(Self::Sampler),
            "ComparisonSampler" => Some(Self::ComparisonSampler),
            _ => None,
        }
    }
}

impl core::fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerKind::Sampler => write!(f, "Sampler"),
            SamplerKind::ComparisonSampler => write!(f, "ComparisonSampler"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

impl TextureDimension {
    /// Suffix used by both the source and target spelling (`2D`, `Cube`, ...)
    pub fn suffix(self) -> &'static str {
        match self {
            TextureDimension::D1 => "1D",
            TextureDimension::D2 => "2D",
            TextureDimension::D2Array => "2DArray",
            TextureDimension::D3 => "3D",
            TextureDimension::Cube => "Cube",
            TextureDimension::CubeArray => "CubeArray",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "1D" => Some(Self::D1),
            "2D" => Some(Self::D2),
            "2DArray" => Some(Self::D2Array),
            "3D" => Some(Self::D3),
            "Cube" => Some(Self::Cube),
            "CubeArray" => Some(Self::CubeArray),
            _ => None,
        }
    }

    /// Number of components in a texel coordinate, not counting array layers
    pub fn coordinate_count(self) -> usize {
        match self {
            TextureDimension::D1 => 1,
            TextureDimension::D2 | TextureDimension::D2Array => 2,
            TextureDimension::D3 | TextureDimension::Cube | TextureDimension::CubeArray => 3,
        }
    }

    pub fn is_arrayed(self) -> bool {
        matches!(self, TextureDimension::D2Array | TextureDimension::CubeArray)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// `Texture2D<Float32>`
    Sampled(TextureDimension),
    /// `TextureMultisampled2D<Float32>`
    Multisampled2D,
    /// `DepthTexture2D`
    Depth(TextureDimension),
    /// `DepthTextureMultisampled2D`
    DepthMultisampled2D,
    /// `StorageTexture2D<rgba8unorm, write>`
    Storage(TextureDimension),
}

impl TextureKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        if name == "TextureMultisampled2D" {
            return Some(Self::Multisampled2D);
        }

        if name == "DepthTextureMultisampled2D" {
            return Some(Self::DepthMultisampled2D);
        }

        if let Some(suffix) = name.strip_prefix("StorageTexture") {
            return TextureDimension::from_suffix(suffix)
                .filter(|d| !matches!(d, TextureDimension::Cube | TextureDimension::CubeArray))
                .map(Self::Storage);
        }

        if let Some(suffix) = name.strip_prefix("DepthTexture") {
            return TextureDimension::from_suffix(suffix)
                .filter(|d| !matches!(d, TextureDimension::D1 | TextureDimension::D3))
                .map(Self::Depth);
        }

        name.strip_prefix("Texture")
            .and_then(TextureDimension::from_suffix)
            .map(Self::Sampled)
    }

    /// Sampled and multisampled textures are templated on their channel type
    pub fn takes_sampled_type(self) -> bool {
        matches!(self, Self::Sampled(_) | Self::Multisampled2D)
    }

    pub fn is_storage(self) -> bool {
        matches!(self, Self::Storage(_))
    }

    pub fn dimension(self) -> TextureDimension {
        match self {
            Self::Sampled(dimension) | Self::Depth(dimension) | Self::Storage(dimension) => {
                dimension
            }
            Self::Multisampled2D | Self::DepthMultisampled2D => TextureDimension::D2,
        }
    }
}

impl core::fmt::Display for TextureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureKind::Sampled(dimension) => write!(f, "Texture{}", dimension.suffix()),
            TextureKind::Multisampled2D => write!(f, "TextureMultisampled2D"),
            TextureKind::Depth(dimension) => write!(f, "DepthTexture{}", dimension.suffix()),
            TextureKind::DepthMultisampled2D => write!(f, "DepthTextureMultisampled2D"),
            TextureKind::Storage(dimension) => write!(f, "StorageTexture{}", dimension.suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_abstract_promotion_is_family_bound() {
        let int_targets = NumericKind::iter()
            .filter(|kind| NumericKind::AbstractInt.is_implicitly_castable_into(*kind))
            .collect::<Vec<_>>();
        let float_targets = NumericKind::iter()
            .filter(|kind| NumericKind::AbstractFloat.is_implicitly_castable_into(*kind))
            .collect::<Vec<_>>();

        assert_eq!(
            int_targets,
            vec![NumericKind::AbstractInt, NumericKind::Int32, NumericKind::UInt32]
        );
        assert_eq!(
            float_targets,
            vec![NumericKind::AbstractFloat, NumericKind::Float32, NumericKind::Float16]
        );
    }

    #[test]
    fn test_concrete_kinds_never_promote() {
        for from in NumericKind::iter().filter(|kind| !kind.is_abstract()) {
            for to in NumericKind::iter().filter(|to| *to != from) {
                assert!(!from.is_implicitly_castable_into(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_texture_names() {
        assert_eq!(
            TextureKind::from_type_name("Texture2DArray"),
            Some(TextureKind::Sampled(TextureDimension::D2Array))
        );
        assert_eq!(
            TextureKind::from_type_name("StorageTexture3D"),
            Some(TextureKind::Storage(TextureDimension::D3))
        );
        assert_eq!(TextureKind::from_type_name("StorageTextureCube"), None);
        assert_eq!(TextureKind::from_type_name("DepthTexture3D"), None);
        assert_eq!(
            TextureKind::Depth(TextureDimension::Cube).to_string(),
            "DepthTextureCube"
        );
    }

    #[test]
    fn test_texel_formats_parse_lowercase() {
        assert_eq!("rgba8unorm".parse::<TexelFormat>().ok(), Some(TexelFormat::Rgba8Unorm));
        assert_eq!(TexelFormat::R32Uint.channel_kind(), NumericKind::UInt32);
        assert_eq!("read_write".parse::<AccessMode>().ok(), Some(AccessMode::ReadWrite));
    }
}
