//! # concord
//!
//! Inter-annotator agreement (IAA) for multi-view annotated corpora.
//!
//! Documents carry multiple independent, parallel annotation layers
//! ("views"), one per human annotator. concord reconciles each
//! annotator's raw span annotations into a well-formed statistical study
//! and computes document- and corpus-level reliability metrics:
//!
//! - **Coding studies**: each atomic token position is a unit, each rater
//!   contributes one category label per unit. Multi-label conflicts are
//!   reduced by a configurable set-selection strategy (ALL / MAX / MATCH).
//! - **Unitizing studies**: raters mark variable-length spans; agreement
//!   accounts for partial overlap (Krippendorff's uα).
//!
//! ## Pipeline
//!
//! ```text
//! Token Index Builder → Span Resolver → {Coding | Unitizing} Study
//!     Builder → Aggregation Controller → Agreement Reporter
//! ```
//!
//! Per view, a stable index over the *atomic* tokens is derived (compound
//! tokens are excluded), annotations are filtered (configured kinds,
//! fingerprints, maximal spans) and resolved to token intervals, and the
//! per-document study is built. Documents aggregate under a configurable
//! policy: `Separate` reports each document on its own, `Combined` folds
//! everything into one corpus-level study, `Both` does both. Item
//! ordering is deterministic throughout — agreement values are exactly
//! reproducible.
//!
//! ## Quick start
//!
//! ```rust
//! use concord::prelude::*;
//!
//! // Two annotators, both labelling the first token as an entity.
//! let text = "Ada went to Berlin today";
//! let tokens = Document::whitespace_tokens(text);
//! let layer = |name: &str| {
//!     View::new(name, tokens.clone())
//!         .with_annotation(Annotation::new(1, AnnotationKind::NamedEntity, 0, 3))
//! };
//! let doc = Document::new("doc-1", text, tokens.clone())
//!     .with_view(layer("anno/alice"))
//!     .with_view(layer("anno/bob"));
//!
//! let config = CodingConfig::default()
//!     .with_base(
//!         EngineConfig::default()
//!             .with_min_annotations(0)
//!             .with_fingerprint_filter(false)
//!             .with_policy(AggregationPolicy::Both),
//!     )
//!     .with_measure(CodingMeasure::Percentage);
//!
//! let mut engine = CodingEngine::new(config)?;
//! if let DocumentOutcome::Processed(Some(report)) = engine.process_document(&doc)? {
//!     assert_eq!(report.overall, 1.0);
//!     assert_eq!(report.annotators, vec!["alice", "bob"]);
//! }
//! let corpus = engine.finish()?;
//! assert!(corpus.is_some());
//! # Ok::<(), concord::Error>(())
//! ```
//!
//! ## Error model
//!
//! Malformed documents (token-count mismatches, unresolvable spans,
//! missing text, too few views) are *skipped*: the engine logs the
//! reason, returns it as a [`SkipReason`](engine::SkipReason) and leaves
//! the aggregate state untouched. Configuration problems (unknown
//! measure or strategy names, Cohen's kappa over ≠ 2 raters, malformed
//! inclusion rules) are fatal [`Error`]s raised before or instead of any
//! further processing.

pub mod annotation;
pub mod collections;
pub mod document;
pub mod engine;
mod error;
pub mod inclusion;
pub mod measures;
pub mod report;
pub mod select;
pub mod span;
pub mod study;
pub mod token;

pub use annotation::{Annotation, AnnotationKind, CategoryLabeler};
pub use document::{Document, View};
pub use engine::coding::{CodingConfig, CodingEngine};
pub use engine::unitizing::{UnitizingConfig, UnitizingEngine};
pub use engine::{
    AggregationPolicy, AnnotatorFilter, AnnotatorRelation, DocumentOutcome, EngineConfig,
    SkipReason,
};
pub use error::{Error, Result};
pub use inclusion::{InclusionRules, RuleSource};
pub use measures::CodingMeasure;
pub use report::{AgreementReport, CollectingSink, ReportSink};
pub use span::Span;
pub use study::coding::SetSelectionStrategy;

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::annotation::{Annotation, AnnotationKind, CategoryLabeler};
    pub use crate::document::{Document, View};
    pub use crate::engine::coding::{CodingConfig, CodingEngine};
    pub use crate::engine::unitizing::{UnitizingConfig, UnitizingEngine};
    pub use crate::engine::{
        AggregationPolicy, AnnotatorFilter, AnnotatorRelation, DocumentOutcome, EngineConfig,
        SkipReason,
    };
    pub use crate::error::{Error, Result};
    pub use crate::inclusion::RuleSource;
    pub use crate::measures::CodingMeasure;
    pub use crate::report::{AgreementReport, CollectingSink, ReportSink};
    pub use crate::span::Span;
    pub use crate::study::coding::SetSelectionStrategy;
}
