use std::fmt;

// ElementType - Tensor element types understood by the engine
//
// Every tensor buffer reports one ElementType, read from its storage. The
// enumeration mirrors the engine's element table so that metadata coming
// from a model can always be represented, even for types that projection
// itself refuses:
//
//   supported    f32 f64 i8 i16 i32 i64 u8 u16 u32 u64 bool f16 bf16 string
//   unsupported  complex64 complex128, the float8 family, int4/uint4
//
// Unsupported types surface as `Error::UnsupportedElementType` before any
// native resource is created.

/// Element data type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    F16,
    BF16,
    String,
    Complex64,
    Complex128,
    F8E4M3FN,
    F8E4M3FNUZ,
    F8E5M2,
    F8E5M2FNUZ,
    U4,
    I4,
}

impl ElementType {
    /// Size of one element in bytes, or `None` for variable-size strings
    /// and sub-byte packed types.
    pub fn size_in_bytes(&self) -> Option<usize> {
        match self {
            ElementType::I8
            | ElementType::U8
            | ElementType::Bool
            | ElementType::F8E4M3FN
            | ElementType::F8E4M3FNUZ
            | ElementType::F8E5M2
            | ElementType::F8E5M2FNUZ => Some(1),
            ElementType::I16 | ElementType::U16 | ElementType::F16 | ElementType::BF16 => Some(2),
            ElementType::F32 | ElementType::I32 | ElementType::U32 => Some(4),
            ElementType::F64 | ElementType::I64 | ElementType::U64 | ElementType::Complex64 => {
                Some(8)
            }
            ElementType::Complex128 => Some(16),
            ElementType::String | ElementType::U4 | ElementType::I4 => None,
        }
    }

    /// Whether tensors of this type can be projected into native values.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            ElementType::F32
                | ElementType::F64
                | ElementType::I8
                | ElementType::I16
                | ElementType::I32
                | ElementType::I64
                | ElementType::U8
                | ElementType::U16
                | ElementType::U32
                | ElementType::U64
                | ElementType::Bool
                | ElementType::F16
                | ElementType::BF16
                | ElementType::String
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::F32 => "float32",
            ElementType::F64 => "float64",
            ElementType::I8 => "int8",
            ElementType::I16 => "int16",
            ElementType::I32 => "int32",
            ElementType::I64 => "int64",
            ElementType::U8 => "uint8",
            ElementType::U16 => "uint16",
            ElementType::U32 => "uint32",
            ElementType::U64 => "uint64",
            ElementType::Bool => "bool",
            ElementType::F16 => "float16",
            ElementType::BF16 => "bfloat16",
            ElementType::String => "string",
            ElementType::Complex64 => "complex64",
            ElementType::Complex128 => "complex128",
            ElementType::F8E4M3FN => "float8e4m3fn",
            ElementType::F8E4M3FNUZ => "float8e4m3fnuz",
            ElementType::F8E5M2 => "float8e5m2",
            ElementType::F8E5M2FNUZ => "float8e5m2fnuz",
            ElementType::U4 => "uint4",
            ElementType::I4 => "int4",
        };
        write!(f, "{}", s)
    }
}

// HostElement - Binds Rust element types to ElementType
//
// Implemented for every fixed-size supported type so buffers can be built
// generically: `TensorBuffer::from_vec(vec![1.0f32, 2.0], (2,))`.
// Strings go through `TensorData::String` directly since they are not Copy.

/// Trait implemented by Rust types that can back a tensor buffer.
pub trait HostElement: Copy + Send + Sync + 'static + fmt::Debug {
    /// The corresponding ElementType variant.
    const ELEMENT_TYPE: ElementType;

    /// Wrap a vector of this type in the matching `TensorData` variant.
    fn into_data(data: Vec<Self>) -> crate::buffer::TensorData;
}

macro_rules! host_element {
    ($ty:ty, $variant:ident) => {
        impl HostElement for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn into_data(data: Vec<Self>) -> crate::buffer::TensorData {
                crate::buffer::TensorData::$variant(data)
            }
        }
    };
}

host_element!(f32, F32);
host_element!(f64, F64);
host_element!(i8, I8);
host_element!(i16, I16);
host_element!(i32, I32);
host_element!(i64, I64);
host_element!(u8, U8);
host_element!(u16, U16);
host_element!(u32, U32);
host_element!(u64, U64);
host_element!(bool, Bool);
host_element!(half::f16, F16);
host_element!(half::bf16, BF16);
