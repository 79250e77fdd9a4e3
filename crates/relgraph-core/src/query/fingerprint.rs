//! Fingerprints of association arguments.
//!
//! Two association fetches can share one batch only when they apply the
//! same criteria and ordering to the target. The fingerprint captures both,
//! including literal values: unlike a plan shape, a batch shares rows, so
//! `title = 'Dune'` and `title = 'Emma'` must not collide.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use relgraph_proto::{CriteriaNode, ValueKey};

use super::bound::OrderRequest;

/// Canonical identity of an association's effective arguments.
#[derive(Clone)]
pub struct ArgumentFingerprint {
    hash: u64,
    canonical: String,
}

impl ArgumentFingerprint {
    /// Fingerprint a fetch with optional criteria and an ordering.
    pub fn new(criteria: Option<&CriteriaNode>, order: &[OrderRequest]) -> Self {
        let mut hasher = DefaultHasher::new();
        let mut canonical = String::new();

        match criteria {
            Some(node) => {
                Self::hash_criteria(node, &mut hasher);
                canonical.push_str(&serde_json::to_string(node).unwrap_or_default());
            }
            None => canonical.push('-'),
        }

        for request in order {
            let text = request.canonical();
            text.hash(&mut hasher);
            canonical.push('|');
            canonical.push_str(&text);
        }

        Self {
            hash: hasher.finish(),
            canonical,
        }
    }

    /// Structural hash, values included.
    fn hash_criteria<H: Hasher>(node: &CriteriaNode, hasher: &mut H) {
        std::mem::discriminant(node).hash(hasher);
        match node {
            CriteriaNode::Logical { op, children } => {
                op.hash(hasher);
                children.len().hash(hasher);
                for child in children {
                    Self::hash_criteria(child, hasher);
                }
            }
            CriteriaNode::Field {
                attribute,
                operator,
                operand,
            } => {
                attribute.hash(hasher);
                operator.hash(hasher);
                ValueKey(operand.clone()).hash(hasher);
            }
            CriteriaNode::Association { attribute, criteria }
            | CriteriaNode::Embedded { attribute, criteria } => {
                attribute.hash(hasher);
                Self::hash_criteria(criteria, hasher);
            }
        }
    }

    /// Precomputed hash.
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Canonical text compared for equality.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for ArgumentFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.canonical == other.canonical
    }
}

impl Eq for ArgumentFingerprint {}

impl Hash for ArgumentFingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for ArgumentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgumentFingerprint({:016x}, {})", self.hash, self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::{Column, Direction};
    use relgraph_proto::Operator;

    fn title(value: &str) -> CriteriaNode {
        CriteriaNode::field("title", Operator::EQ, value)
    }

    #[test]
    fn test_same_arguments_match() {
        let a = ArgumentFingerprint::new(Some(&title("Dune")), &[]);
        let b = ArgumentFingerprint::new(Some(&title("Dune")), &[]);
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_values_distinguish() {
        let a = ArgumentFingerprint::new(Some(&title("Dune")), &[]);
        let b = ArgumentFingerprint::new(Some(&title("Emma")), &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_absent_criteria_and_order() {
        let order = OrderRequest {
            associations: vec![],
            column: Column::new("title"),
            direction: Direction::Desc,
        };
        let plain = ArgumentFingerprint::new(None, &[]);
        let ordered = ArgumentFingerprint::new(None, &[order]);
        assert_ne!(plain, ordered);
        assert_eq!(ordered.canonical(), "-|title DESC");
        assert_ne!(plain, ArgumentFingerprint::new(Some(&CriteriaNode::and(vec![])), &[]));
    }
}
