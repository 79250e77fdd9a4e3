//! Operators valid per attribute type.

use relgraph_proto::Operator;

use crate::metamodel::ScalarType;

const EQUALITY: &[Operator] = &[
    Operator::EQ,
    Operator::NE,
    Operator::IN,
    Operator::NIN,
    Operator::IS_NULL,
    Operator::NOT_NULL,
];

const STRING: &[Operator] = &[
    Operator::EQ,
    Operator::EQ_,
    Operator::NE,
    Operator::NE_,
    Operator::LT,
    Operator::LE,
    Operator::GT,
    Operator::GE,
    Operator::LIKE,
    Operator::LIKE_,
    Operator::CASE,
    Operator::LOWER,
    Operator::STARTS,
    Operator::STARTS_,
    Operator::ENDS,
    Operator::ENDS_,
    Operator::LOCATE,
    Operator::IN,
    Operator::NIN,
    Operator::IS_NULL,
    Operator::NOT_NULL,
];

const ORDERED: &[Operator] = &[
    Operator::EQ,
    Operator::NE,
    Operator::LT,
    Operator::LE,
    Operator::GT,
    Operator::GE,
    Operator::BETWEEN,
    Operator::NOT_BETWEEN,
    Operator::IN,
    Operator::NIN,
    Operator::IS_NULL,
    Operator::NOT_NULL,
];

const BINARY: &[Operator] = &[
    Operator::EQ,
    Operator::NE,
    Operator::IS_NULL,
    Operator::NOT_NULL,
];

/// Operators a scalar filter type carries, in declaration order.
pub fn scalar_operators(scalar: ScalarType) -> &'static [Operator] {
    match scalar {
        ScalarType::String => STRING,
        ScalarType::Int32
        | ScalarType::Int64
        | ScalarType::Float32
        | ScalarType::Float64
        | ScalarType::Timestamp => ORDERED,
        ScalarType::Uuid => EQUALITY,
        ScalarType::Bool | ScalarType::Bytes => BINARY,
    }
}

/// Operators an enum filter type carries.
pub fn enum_operators() -> &'static [Operator] {
    EQUALITY
}
