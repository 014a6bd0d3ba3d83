//! Token indexing and span resolution.
//!
//! Agreement studies are computed over a continuum of *atomic* tokens: a
//! token that covers two or more other tokens is a compound and is not
//! part of the continuum. The remaining tokens are indexed densely in
//! document order; annotation spans resolve to inclusive intervals over
//! those indices.

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// An inclusive interval of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenInterval {
    /// First token index covered by the annotation.
    pub begin: usize,
    /// Last token index covered by the annotation (inclusive).
    pub end: usize,
}

impl TokenInterval {
    /// Number of tokens in the interval, always ≥ 1.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.begin + 1
    }

    /// Inclusive intervals are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Dense index over the atomic tokens of one view.
///
/// Token spans map to indices `0..len()` in document order. Compounds
/// (tokens covering ≥ 2 other tokens) are excluded from the domain.
#[derive(Debug, Clone)]
pub struct TokenIndex {
    spans: Vec<Span>,
}

impl TokenIndex {
    /// Build the index from a view's ordered token spans.
    #[must_use]
    pub fn build(tokens: &[Span]) -> Self {
        let spans = tokens
            .iter()
            .filter(|token| covered_count(token, tokens) < 2)
            .copied()
            .collect();
        Self { spans }
    }

    /// Number of atomic tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether the index holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The atomic token spans in index order.
    #[must_use]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The token span at `index`.
    #[must_use]
    pub fn span(&self, index: usize) -> Option<Span> {
        self.spans.get(index).copied()
    }

    /// Resolve an annotation span to an inclusive token-index interval.
    ///
    /// Candidate tokens are those textually inside the annotation plus
    /// those covering it (the latter catches sub-token annotations).
    /// Returns `None` when no candidate lies in the index domain — the
    /// annotation is unresolvable and must be skipped.
    #[must_use]
    pub fn resolve(&self, annotation: Span) -> Option<TokenInterval> {
        let mut begin = usize::MAX;
        let mut end = 0usize;
        let mut found = false;
        for (index, token) in self.spans.iter().enumerate() {
            if annotation.covers(token) || token.covers(&annotation) {
                if index < begin {
                    begin = index;
                }
                if index > end {
                    end = index;
                }
                found = true;
            }
        }
        if found {
            Some(TokenInterval { begin, end })
        } else {
            None
        }
    }
}

/// How many *other* tokens `token` covers.
fn covered_count(token: &Span, tokens: &[Span]) -> usize {
    tokens
        .iter()
        .filter(|other| *other != token && token.covers(other))
        .count()
}
