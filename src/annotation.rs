//! Annotation kinds, instances and category derivation.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::span::Span;

/// Span annotation kinds eligible for agreement computation.
///
/// A closed enumeration: configuration selects a subset of these, there is
/// no runtime type-name resolution. `from_name` accepts both the plain
/// variant name and a dotted qualified name (only the last segment is
/// matched), so inclusion-rule files written against qualified names keep
/// working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// A concrete named entity mention (persons, places, taxa, ...).
    NamedEntity,
    /// An abstract or conceptual entity mention.
    AbstractNamedEntity,
    /// A semantic-role span (predicate arguments and the like).
    SemanticRole,
    /// A temporal expression.
    TimeExpression,
}

impl AnnotationKind {
    /// All supported kinds, in canonical order.
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::NamedEntity,
        AnnotationKind::AbstractNamedEntity,
        AnnotationKind::SemanticRole,
        AnnotationKind::TimeExpression,
    ];

    /// The kind's type name, used as the undecorated category label.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            AnnotationKind::NamedEntity => "NamedEntity",
            AnnotationKind::AbstractNamedEntity => "AbstractNamedEntity",
            AnnotationKind::SemanticRole => "SemanticRole",
            AnnotationKind::TimeExpression => "TimeExpression",
        }
    }

    /// Parse a kind from a plain or dotted qualified name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let simple = name.rsplit('.').next().unwrap_or(name);
        AnnotationKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_name() == simple)
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl FromStr for AnnotationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationKind::from_name(s)
            .ok_or_else(|| Error::parse(format!("unknown annotation kind: {s}")))
    }
}

/// A single span annotation inside one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Caller-assigned identity, referenced by fingerprint sets.
    pub id: u64,
    /// The annotation's kind.
    pub kind: AnnotationKind,
    /// Character span in the document text.
    pub span: Span,
    /// Feature flags set on this instance (e.g. "Metaphor").
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

impl Annotation {
    /// Create an annotation without feature flags.
    #[must_use]
    pub fn new(id: u64, kind: AnnotationKind, begin: usize, end: usize) -> Self {
        Self {
            id,
            kind,
            span: Span::new(begin, end),
            flags: BTreeSet::new(),
        }
    }

    /// Attach a feature flag.
    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }
}

/// Derives category labels from annotations.
///
/// The category is the kind's type name, minus an optional prune prefix,
/// plus a `-{flag}` suffix for every configured include-flag present on
/// the instance. Flags append in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLabeler {
    /// Prefix stripped off the front of the type name, if it matches.
    pub prune_prefix: String,
    /// Feature flags that participate in the category label.
    pub include_flags: BTreeSet<String>,
}

impl CategoryLabeler {
    /// A labeler that passes type names through unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prune prefix.
    #[must_use]
    pub fn with_prune_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prune_prefix = prefix.into();
        self
    }

    /// Add an include-flag.
    #[must_use]
    pub fn with_include_flag(mut self, flag: impl Into<String>) -> Self {
        self.include_flags.insert(flag.into());
        self
    }

    /// The category label for an annotation instance.
    #[must_use]
    pub fn category(&self, annotation: &Annotation) -> String {
        let mut label = self.kind_category(annotation.kind);
        for flag in &self.include_flags {
            if annotation.flags.contains(flag) {
                label.push('-');
                label.push_str(flag);
            }
        }
        label
    }

    /// The flag-free category label for a kind. Used for units synthesized
    /// by inclusion rules, which have no instance to read flags from.
    #[must_use]
    pub fn kind_category(&self, kind: AnnotationKind) -> String {
        let name = kind.type_name();
        if !self.prune_prefix.is_empty() {
            if let Some(stripped) = name.strip_prefix(&self.prune_prefix) {
                return stripped.to_string();
            }
        }
        name.to_string()
    }
}
