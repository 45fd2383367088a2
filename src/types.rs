//! Core type definitions for schemas and filter values

use std::fmt;

/// Declared type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// i8
    I8,
    /// i16
    I16,
    /// i32
    I32,
    /// i64
    I64,
    /// u8
    U8,
    /// u16
    U16,
    /// u32
    U32,
    /// u64
    U64,
    /// f32
    F32,
    /// f64
    F64,
    /// bool
    Bool,
    /// UTF-8 string
    String,
    /// Any type that cannot be indexed (lists, nested structs, blobs)
    Opaque,
}

impl FieldType {
    /// Get the type name as a string
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::I8 => "i8",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::U8 => "u8",
            FieldType::U16 => "u16",
            FieldType::U32 => "u32",
            FieldType::U64 => "u64",
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Opaque => "opaque",
        }
    }

    /// Whether values of this type are stored as sorted-set scores
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldType::Bool | FieldType::String | FieldType::Opaque)
    }

    /// Index kind used when a field of this type is indexed
    pub fn index_kind(&self) -> IndexKind {
        match self {
            FieldType::Bool => IndexKind::Boolean,
            FieldType::String => IndexKind::Alpha,
            FieldType::Opaque => IndexKind::None,
            _ => IndexKind::Numeric,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a field's values are encoded in its sorted-set index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Member is the id, score is the numeric value
    Numeric,
    /// Member is the id, score is 0 (false) or 1 (true)
    Boolean,
    /// Member is `"<value> <id>"`, score is always 0
    Alpha,
    /// Field cannot be filtered or ordered on
    None,
}

impl IndexKind {
    /// Whether the field has a usable index
    pub fn is_indexed(&self) -> bool {
        !matches!(self, IndexKind::None)
    }
}

/// A typed filter argument
///
/// The variant must match the declared [`FieldType`] of the filtered field
/// exactly. Optional values are unwrapped on conversion; `None` becomes
/// [`Value::Nil`], which is rejected when the filter is added.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// i8
    I8(i8),
    /// i16
    I16(i16),
    /// i32
    I32(i32),
    /// i64
    I64(i64),
    /// u8
    U8(u8),
    /// u16
    U16(u16),
    /// u32
    U32(u32),
    /// u64
    U64(u64),
    /// f32
    F32(f32),
    /// f64
    F64(f64),
    /// bool
    Bool(bool),
    /// string
    String(String),
    /// An empty optional
    Nil,
}

impl Value {
    /// Declared type this value matches, `None` for [`Value::Nil`]
    pub fn field_type(&self) -> Option<FieldType> {
        Some(match self {
            Value::I8(_) => FieldType::I8,
            Value::I16(_) => FieldType::I16,
            Value::I32(_) => FieldType::I32,
            Value::I64(_) => FieldType::I64,
            Value::U8(_) => FieldType::U8,
            Value::U16(_) => FieldType::U16,
            Value::U32(_) => FieldType::U32,
            Value::U64(_) => FieldType::U64,
            Value::F32(_) => FieldType::F32,
            Value::F64(_) => FieldType::F64,
            Value::Bool(_) => FieldType::Bool,
            Value::String(_) => FieldType::String,
            Value::Nil => return None,
        })
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        self.field_type().map(|t| t.name()).unwrap_or("nil")
    }

    /// Sorted-set score for numeric and boolean values
    pub fn score(&self) -> Option<f64> {
        match self {
            Value::I8(v) => Some(*v as f64),
            Value::I16(v) => Some(*v as f64),
            Value::I32(v) => Some(*v as f64),
            Value::I64(v) => Some(*v as f64),
            Value::U8(v) => Some(*v as f64),
            Value::U16(v) => Some(*v as f64),
            Value::U32(v) => Some(*v as f64),
            Value::U64(v) => Some(*v as f64),
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(_) | Value::Nil => None,
        }
    }

    /// String payload for alpha and identifier filters
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Nil => f.write_str("nil"),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value> + Clone> From<&T> for Value {
    fn from(v: &T) -> Self {
        v.clone().into()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

impl<T: Into<Value>> From<Box<T>> for Value {
    fn from(v: Box<T>) -> Self {
        (*v).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_kind_from_type() {
        assert_eq!(FieldType::I32.index_kind(), IndexKind::Numeric);
        assert_eq!(FieldType::F64.index_kind(), IndexKind::Numeric);
        assert_eq!(FieldType::Bool.index_kind(), IndexKind::Boolean);
        assert_eq!(FieldType::String.index_kind(), IndexKind::Alpha);
        assert_eq!(FieldType::Opaque.index_kind(), IndexKind::None);
    }

    #[test]
    fn test_value_conversions_dereference() {
        let n = 7i64;
        assert_eq!(Value::from(&n), Value::I64(7));
        assert_eq!(Value::from(Some(3u8)), Value::U8(3));
        assert_eq!(Value::from(Option::<i32>::None), Value::Nil);
        assert_eq!(Value::from(Box::new(1.5f32)), Value::F32(1.5));
        assert_eq!(Value::from(&String::from("x")), Value::String("x".into()));
    }

    #[test]
    fn test_value_scores() {
        assert_eq!(Value::Bool(true).score(), Some(1.0));
        assert_eq!(Value::Bool(false).score(), Some(0.0));
        assert_eq!(Value::I32(-4).score(), Some(-4.0));
        assert_eq!(Value::from("a").score(), None);
    }

    #[test]
    fn test_value_types_are_exact() {
        assert_eq!(Value::I32(1).field_type(), Some(FieldType::I32));
        assert_ne!(Value::I64(1).field_type(), Some(FieldType::I32));
        assert_eq!(Value::Nil.type_name(), "nil");
    }
}
