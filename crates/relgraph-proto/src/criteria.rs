//! Criteria tree: the parsed form of a client filter expression.
//!
//! A criteria tree is built per query from the `where` argument of a field
//! and is immutable once parsed. Field names are attribute names of the entity
//! (or embeddable) the node is scoped to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// All children must hold.
    And,
    /// At least one child must hold.
    Or,
    /// The conjunction of the children must not hold.
    Not,
    /// A correlated row of the enclosing entity matches the children.
    Exists,
    /// No correlated row of the enclosing entity matches the children.
    NotExists,
}

impl LogicalOp {
    /// All combinators, in the order they appear on criteria types.
    pub const ALL: [LogicalOp; 5] = [
        LogicalOp::And,
        LogicalOp::Or,
        LogicalOp::Not,
        LogicalOp::Exists,
        LogicalOp::NotExists,
    ];

    /// Surface name of the combinator.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
            LogicalOp::Exists => "EXISTS",
            LogicalOp::NotExists => "NOT_EXISTS",
        }
    }

    /// Whether this combinator opens a correlated subquery.
    pub fn is_subquery(&self) -> bool {
        matches!(self, LogicalOp::Exists | LogicalOp::NotExists)
    }
}

/// Per-attribute filter operators.
///
/// Operators with a trailing underscore fold case on both sides before
/// comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Operator {
    EQ,
    EQ_,
    NE,
    NE_,
    LT,
    LE,
    GT,
    GE,
    LIKE,
    LIKE_,
    CASE,
    LOWER,
    STARTS,
    STARTS_,
    ENDS,
    ENDS_,
    LOCATE,
    IS_NULL,
    NOT_NULL,
    IN,
    NIN,
    BETWEEN,
    NOT_BETWEEN,
}

impl Operator {
    /// Every operator, in surface declaration order.
    pub const ALL: [Operator; 23] = [
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
        Operator::IS_NULL,
        Operator::NOT_NULL,
        Operator::IN,
        Operator::NIN,
        Operator::BETWEEN,
        Operator::NOT_BETWEEN,
    ];

    /// Surface name of the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::EQ => "EQ",
            Operator::EQ_ => "EQ_",
            Operator::NE => "NE",
            Operator::NE_ => "NE_",
            Operator::LT => "LT",
            Operator::LE => "LE",
            Operator::GT => "GT",
            Operator::GE => "GE",
            Operator::LIKE => "LIKE",
            Operator::LIKE_ => "LIKE_",
            Operator::CASE => "CASE",
            Operator::LOWER => "LOWER",
            Operator::STARTS => "STARTS",
            Operator::STARTS_ => "STARTS_",
            Operator::ENDS => "ENDS",
            Operator::ENDS_ => "ENDS_",
            Operator::LOCATE => "LOCATE",
            Operator::IS_NULL => "IS_NULL",
            Operator::NOT_NULL => "NOT_NULL",
            Operator::IN => "IN",
            Operator::NIN => "NIN",
            Operator::BETWEEN => "BETWEEN",
            Operator::NOT_BETWEEN => "NOT_BETWEEN",
        }
    }

    /// Operators that only make sense on strings.
    pub fn is_string_only(&self) -> bool {
        matches!(
            self,
            Operator::EQ_
                | Operator::NE_
                | Operator::LIKE
                | Operator::LIKE_
                | Operator::CASE
                | Operator::LOWER
                | Operator::STARTS
                | Operator::STARTS_
                | Operator::ENDS
                | Operator::ENDS_
                | Operator::LOCATE
        )
    }

    /// Operators that fold case on both sides.
    pub fn folds_case(&self) -> bool {
        matches!(
            self,
            Operator::EQ_ | Operator::NE_ | Operator::LIKE_ | Operator::STARTS_ | Operator::ENDS_
        )
    }

    /// Operators that rely on a total order of the attribute's values.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Operator::LT
                | Operator::LE
                | Operator::GT
                | Operator::GE
                | Operator::BETWEEN
                | Operator::NOT_BETWEEN
        )
    }

    /// Operators whose operand is a list.
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            Operator::IN | Operator::NIN | Operator::BETWEEN | Operator::NOT_BETWEEN
        )
    }

    /// Operators whose operand is a boolean switch rather than a value.
    pub fn takes_switch(&self) -> bool {
        matches!(self, Operator::IS_NULL | Operator::NOT_NULL)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown operator `{s}`"))
    }
}

/// A node of the criteria tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriteriaNode {
    /// A logical combinator over ordered children.
    Logical {
        op: LogicalOp,
        children: Vec<CriteriaNode>,
    },
    /// An operator applied to one attribute.
    Field {
        attribute: String,
        operator: Operator,
        operand: Value,
    },
    /// Criteria on the entity reached through an association attribute.
    Association {
        attribute: String,
        criteria: Box<CriteriaNode>,
    },
    /// Criteria on the members of an embedded attribute of the same row.
    Embedded {
        attribute: String,
        criteria: Box<CriteriaNode>,
    },
}

impl CriteriaNode {
    /// Create a field node.
    pub fn field(attribute: impl Into<String>, operator: Operator, operand: impl Into<Value>) -> Self {
        CriteriaNode::Field {
            attribute: attribute.into(),
            operator,
            operand: operand.into(),
        }
    }

    /// Create a conjunction.
    pub fn and(children: Vec<CriteriaNode>) -> Self {
        CriteriaNode::Logical {
            op: LogicalOp::And,
            children,
        }
    }

    /// Create a disjunction.
    pub fn or(children: Vec<CriteriaNode>) -> Self {
        CriteriaNode::Logical {
            op: LogicalOp::Or,
            children,
        }
    }

    /// Create a negation of the conjunction of `children`.
    pub fn not(children: Vec<CriteriaNode>) -> Self {
        CriteriaNode::Logical {
            op: LogicalOp::Not,
            children,
        }
    }

    /// Create an existence check at the current entity level.
    pub fn exists(children: Vec<CriteriaNode>) -> Self {
        CriteriaNode::Logical {
            op: LogicalOp::Exists,
            children,
        }
    }

    /// Create a negated existence check at the current entity level.
    pub fn not_exists(children: Vec<CriteriaNode>) -> Self {
        CriteriaNode::Logical {
            op: LogicalOp::NotExists,
            children,
        }
    }

    /// Create an association node.
    pub fn association(attribute: impl Into<String>, criteria: CriteriaNode) -> Self {
        CriteriaNode::Association {
            attribute: attribute.into(),
            criteria: Box::new(criteria),
        }
    }

    /// Create an embedded node.
    pub fn embedded(attribute: impl Into<String>, criteria: CriteriaNode) -> Self {
        CriteriaNode::Embedded {
            attribute: attribute.into(),
            criteria: Box::new(criteria),
        }
    }

    /// Combine nodes with AND, collapsing a single node to itself.
    pub fn all_of(mut nodes: Vec<CriteriaNode>) -> Self {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            CriteriaNode::and(nodes)
        }
    }

    /// Depth of the tree (a single field node has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            CriteriaNode::Field { .. } => 1,
            CriteriaNode::Logical { children, .. } => {
                1 + children.iter().map(CriteriaNode::depth).max().unwrap_or(0)
            }
            CriteriaNode::Association { criteria, .. } | CriteriaNode::Embedded { criteria, .. } => {
                1 + criteria.depth()
            }
        }
    }
}
