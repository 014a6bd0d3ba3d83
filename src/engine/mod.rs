//! Agreement engines: per-document processing and corpus aggregation.
//!
//! A run owns one engine — [`coding::CodingEngine`] or
//! [`unitizing::UnitizingEngine`] — feeds it documents one at a time and
//! calls `finish` once. The engine threads all aggregation state
//! (running document offset, global study, counters, annotator index)
//! through itself; there is exactly one writer. Malformed documents are
//! skipped and logged, and leave the aggregate state untouched.

pub mod coding;
pub mod unitizing;

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationKind, CategoryLabeler};
use crate::document::Document;
use crate::error::Error;
use crate::report::AgreementReport;
use crate::select::eligible_annotations;
use crate::token::TokenIndex;

/// How per-document studies aggregate across a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationPolicy {
    /// Report each document on its own; keep nothing.
    Separate,
    /// Fold every document into one corpus-level study, reported once.
    Combined,
    /// Both of the above.
    Both,
}

impl AggregationPolicy {
    /// Whether per-document reports are produced.
    #[must_use]
    pub fn do_separate(&self) -> bool {
        matches!(self, AggregationPolicy::Separate | AggregationPolicy::Both)
    }

    /// Whether the corpus-level study is maintained.
    #[must_use]
    pub fn do_combined(&self) -> bool {
        matches!(self, AggregationPolicy::Combined | AggregationPolicy::Both)
    }
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        AggregationPolicy::Combined
    }
}

impl FromStr for AggregationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SEPARATE" => Ok(AggregationPolicy::Separate),
            "COMBINED" => Ok(AggregationPolicy::Combined),
            "BOTH" => Ok(AggregationPolicy::Both),
            other => Err(Error::parse(format!("unknown aggregation policy: {other}"))),
        }
    }
}

/// Whether the annotator list is an allow- or a deny-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotatorRelation {
    /// Only listed annotators participate.
    Allow,
    /// Listed annotators are excluded.
    Deny,
}

/// Annotator selection: a name list plus its relation.
///
/// An empty list admits everyone under either relation; a non-empty list
/// admits exactly the listed names (`Allow`) or everyone else (`Deny`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatorFilter {
    /// The listed annotator ids.
    pub list: BTreeSet<String>,
    /// How the list is interpreted.
    pub relation: AnnotatorRelation,
}

impl Default for AnnotatorFilter {
    fn default() -> Self {
        Self {
            list: BTreeSet::new(),
            relation: AnnotatorRelation::Allow,
        }
    }
}

impl AnnotatorFilter {
    /// An allow-list over the given names.
    #[must_use]
    pub fn allow<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list: names.into_iter().map(Into::into).collect(),
            relation: AnnotatorRelation::Allow,
        }
    }

    /// A deny-list over the given names.
    #[must_use]
    pub fn deny<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list: names.into_iter().map(Into::into).collect(),
            relation: AnnotatorRelation::Deny,
        }
    }

    /// Whether the annotator id passes the filter.
    #[must_use]
    pub fn admits(&self, id: &str) -> bool {
        if self.list.is_empty() {
            return true;
        }
        (self.relation == AnnotatorRelation::Allow) == self.list.contains(id)
    }
}

/// Options shared by both engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum number of valid views a document needs; below it the
    /// document is skipped.
    pub min_views: usize,
    /// Minimum number of eligible annotations a view needs; below it the
    /// view is dropped from the document. Zero disables the constraint.
    pub min_annotations: usize,
    /// Only consider fingerprinted annotations.
    pub filter_fingerprinted: bool,
    /// Annotator allow/deny-list.
    pub annotators: AnnotatorFilter,
    /// Annotation kinds participating in the computation.
    pub kinds: BTreeSet<AnnotationKind>,
    /// Corpus aggregation policy.
    pub policy: AggregationPolicy,
    /// Category derivation (prune prefix, include flags).
    pub labeler: CategoryLabeler,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_views: 2,
            min_annotations: 10,
            filter_fingerprinted: true,
            annotators: AnnotatorFilter::default(),
            kinds: AnnotationKind::ALL.into_iter().collect(),
            policy: AggregationPolicy::default(),
            labeler: CategoryLabeler::default(),
        }
    }
}

impl EngineConfig {
    /// Set the minimum view count.
    #[must_use]
    pub fn with_min_views(mut self, min_views: usize) -> Self {
        self.min_views = min_views;
        self
    }

    /// Set the minimum per-view annotation count.
    #[must_use]
    pub fn with_min_annotations(mut self, min_annotations: usize) -> Self {
        self.min_annotations = min_annotations;
        self
    }

    /// Enable or disable the fingerprint filter.
    #[must_use]
    pub fn with_fingerprint_filter(mut self, enabled: bool) -> Self {
        self.filter_fingerprinted = enabled;
        self
    }

    /// Set the annotator filter.
    #[must_use]
    pub fn with_annotators(mut self, filter: AnnotatorFilter) -> Self {
        self.annotators = filter;
        self
    }

    /// Restrict the annotation kinds.
    #[must_use]
    pub fn with_kinds<I: IntoIterator<Item = AnnotationKind>>(mut self, kinds: I) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Set the aggregation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the category labeler.
    #[must_use]
    pub fn with_labeler(mut self, labeler: CategoryLabeler) -> Self {
        self.labeler = labeler;
        self
    }
}

/// Why a document was skipped. Skips are recoverable: the run continues
/// with the next document and no statistics row is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The document has no text.
    EmptyText,
    /// A view's atomic-token count differs from the default layer's.
    TokenCountMismatch {
        /// The offending view's name.
        view: String,
        /// The default layer's atomic-token count.
        expected: usize,
        /// The view's atomic-token count.
        actual: usize,
    },
    /// An annotation span could not be resolved to any indexed token.
    UnresolvableSpan {
        /// The offending view's name.
        view: String,
        /// The offending annotation's id.
        annotation: u64,
    },
    /// Fewer valid views than the configured minimum.
    TooFewViews {
        /// Number of valid views after filtering and pruning.
        valid: usize,
        /// The configured minimum.
        required: usize,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyText => write!(f, "document has no text"),
            SkipReason::TokenCountMismatch {
                view,
                expected,
                actual,
            } => write!(
                f,
                "view {view} has {actual} atomic tokens, expected {expected}"
            ),
            SkipReason::UnresolvableSpan { view, annotation } => {
                write!(f, "annotation {annotation} in view {view} resolves to no token")
            }
            SkipReason::TooFewViews { valid, required } => {
                write!(f, "only {valid} valid views, {required} required")
            }
        }
    }
}

/// The result of processing one document.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// The document entered the aggregate; a report is attached when the
    /// policy produces per-document reports.
    Processed(Option<AgreementReport>),
    /// The document was skipped.
    Skipped(SkipReason),
}

/// A view that survived filtering, with its token index and eligible
/// annotations.
#[derive(Debug)]
pub(crate) struct PreparedView<'a> {
    pub annotator: String,
    pub view_name: String,
    pub index: TokenIndex,
    pub annotations: Vec<&'a Annotation>,
}

/// A validated document ready for study construction.
#[derive(Debug)]
pub(crate) struct PreparedDocument<'a> {
    /// Atomic-token count of the default layer.
    pub token_count: usize,
    /// The default layer's token index (used to map positions back to
    /// character spans).
    pub default_index: TokenIndex,
    pub views: Vec<PreparedView<'a>>,
}

/// Validate a document and select its views per the configuration.
pub(crate) fn prepare_document<'a>(
    document: &'a Document,
    config: &EngineConfig,
) -> Result<PreparedDocument<'a>, SkipReason> {
    if document.text.is_empty() {
        return Err(SkipReason::EmptyText);
    }

    let default_index = TokenIndex::build(&document.tokens);
    let token_count = default_index.len();

    let mut views = Vec::new();
    for view in &document.views {
        let Some(annotator) = view.annotator_id() else {
            log::debug!("Skipping view {:?}: empty annotator id", view.name);
            continue;
        };
        if !config.annotators.admits(annotator) {
            log::debug!("Skipping view {:?}: annotator {annotator} filtered", view.name);
            continue;
        }

        let annotations =
            eligible_annotations(view, &config.kinds, config.filter_fingerprinted);
        if config.min_annotations > 0 && annotations.len() < config.min_annotations {
            log::debug!(
                "Removing view {:?}: insufficient annotations: {} < {}",
                view.name,
                annotations.len(),
                config.min_annotations
            );
            continue;
        }

        views.push(PreparedView {
            annotator: annotator.to_string(),
            view_name: view.name.clone(),
            index: TokenIndex::build(&view.tokens),
            annotations,
        });
    }

    for prepared in &views {
        if prepared.index.len() != token_count {
            return Err(SkipReason::TokenCountMismatch {
                view: prepared.view_name.clone(),
                expected: token_count,
                actual: prepared.index.len(),
            });
        }
    }

    if views.len() < config.min_views {
        return Err(SkipReason::TooFewViews {
            valid: views.len(),
            required: config.min_views,
        });
    }

    Ok(PreparedDocument {
        token_count,
        default_index,
        views,
    })
}
