//! Attribute value types.

/// Scalar types a metamodel attribute can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

impl ScalarType {
    /// Every scalar type.
    pub const ALL: [ScalarType; 9] = [
        ScalarType::Bool,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::String,
        ScalarType::Bytes,
        ScalarType::Timestamp,
        ScalarType::Uuid,
    ];

    /// Name of the scalar on the query surface.
    pub fn surface_name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "Boolean",
            ScalarType::Int32 => "Int",
            ScalarType::Int64 => "Long",
            ScalarType::Float32 => "Float",
            ScalarType::Float64 => "Double",
            ScalarType::String => "String",
            ScalarType::Bytes => "Bytes",
            ScalarType::Timestamp => "Timestamp",
            ScalarType::Uuid => "UUID",
        }
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int32 | ScalarType::Int64 | ScalarType::Float32 | ScalarType::Float64
        )
    }

    /// Check if values of this type have a meaningful total order.
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, ScalarType::Timestamp)
    }
}

/// Target type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// A scalar value.
    Scalar(ScalarType),
    /// An enumeration, identified by name.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
    /// An embeddable type, by name.
    Embedded(String),
    /// An entity type, by name.
    Entity(String),
    /// A type with no surface mapping.
    Custom(String),
}

impl AttributeType {
    /// Create an enum type.
    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        AttributeType::Enum {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Human-readable type name, used in compile errors.
    pub fn type_name(&self) -> String {
        match self {
            AttributeType::Scalar(s) => s.surface_name().to_string(),
            AttributeType::Enum { name, .. }
            | AttributeType::Embedded(name)
            | AttributeType::Entity(name)
            | AttributeType::Custom(name) => name.clone(),
        }
    }

    /// Get the inner scalar type if this is a scalar.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            AttributeType::Scalar(s) => Some(*s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_checks() {
        assert!(ScalarType::Int32.is_numeric());
        assert!(ScalarType::Float64.is_numeric());
        assert!(!ScalarType::String.is_numeric());
        assert!(ScalarType::Timestamp.is_ordered());
        assert!(!ScalarType::Uuid.is_ordered());
        assert!(!ScalarType::Bool.is_ordered());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(AttributeType::Scalar(ScalarType::Int64).type_name(), "Long");
        assert_eq!(
            AttributeType::enumeration("Genre", &["NOVEL", "POETRY"]).type_name(),
            "Genre"
        );
        assert_eq!(AttributeType::Custom("Point".into()).type_name(), "Point");
    }
}
