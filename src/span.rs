//! Character spans and containment predicates.

use serde::{Deserialize, Serialize};

/// A half-open character span `[begin, end)` over a document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start position (character offset in the document text)
    pub begin: usize,
    /// End position (character offset, exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span. `end` must not precede `begin`.
    #[must_use]
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end, "span end before begin");
        Self { begin, end }
    }

    /// Span length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the span covers no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Check if this span overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.begin || other.end <= self.begin)
    }

    /// Check if this span covers `other` entirely (borders included).
    #[must_use]
    pub fn covers(&self, other: &Span) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// Check if this span strictly contains `other`: covered, and at
    /// least one border lies inside.
    #[must_use]
    pub fn strictly_contains(&self, other: &Span) -> bool {
        self.covers(other) && (self.begin < other.begin || other.end < self.end)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn overlap_is_symmetric(
            b1 in 0usize..100, l1 in 1usize..50,
            b2 in 0usize..100, l2 in 1usize..50,
        ) {
            let a = Span::new(b1, b1 + l1);
            let b = Span::new(b2, b2 + l2);
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn strict_containment_is_asymmetric(
            b1 in 0usize..100, l1 in 1usize..50,
            b2 in 0usize..100, l2 in 1usize..50,
        ) {
            let a = Span::new(b1, b1 + l1);
            let b = Span::new(b2, b2 + l2);
            prop_assert!(!(a.strictly_contains(&b) && b.strictly_contains(&a)));
        }

        #[test]
        fn covers_implies_overlap(
            b1 in 0usize..100, l1 in 1usize..50,
            b2 in 0usize..100, l2 in 1usize..50,
        ) {
            let a = Span::new(b1, b1 + l1);
            let b = Span::new(b2, b2 + l2);
            if a.covers(&b) {
                prop_assert!(a.overlaps(&b));
            }
        }
    }
}
