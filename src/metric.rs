//! Metric records produced by a traversal of the parser tree

use std::cmp::Ordering;
use std::fmt;

/// A single named statistic
///
/// `order` is the stable sort key used when a catalog is displayed. It is assigned when the tree is built and every
/// metric in a catalog carries a distinct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub order: usize,
    pub description: &'static str,
    pub value: u64,
}

impl Metric {
    #[must_use]
    pub fn new(order: usize, description: &'static str, value: u64) -> Self {
        Self {
            order,
            description,
            value,
        }
    }
}

impl PartialOrd for Metric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Metric {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.description.cmp(other.description))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.description, self.value)
    }
}
