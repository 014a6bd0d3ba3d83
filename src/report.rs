//! Agreement reports: bookkeeping and record shapes.
//!
//! The reporter owns no statistics of its own — coefficients come from the
//! measures module, counts from the engines. Serialization of these
//! records (CSV, columns, ...) is the caller's concern.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::collections::CountMap;
use crate::measures::CategorySpecificAgreement;
use crate::span::Span;

/// What a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportScope {
    /// One document, identified by its id.
    Document(String),
    /// The whole corpus (combined aggregation).
    Corpus,
}

/// Agreement and count for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAgreement {
    /// Category label.
    pub category: String,
    /// Number of times any rater assigned the category.
    pub count: u64,
    /// Category-specific agreement; NaN values are normalized to 0.0.
    pub agreement: f64,
}

/// One row of the category × annotator count matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAnnotatorCounts {
    /// Category label.
    pub category: String,
    /// Per-annotator counts, index-aligned with the report's annotators.
    pub counts: Vec<u64>,
}

/// Agreement for a single coding position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAgreement {
    /// Token position in the document.
    pub position: usize,
    /// Character span of the token, when known.
    pub span: Option<Span>,
    /// Agreement value at this position.
    pub agreement: f64,
}

/// A completed document- or corpus-level agreement report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    /// Report scope.
    pub scope: ReportScope,
    /// Display name of the agreement measure.
    pub measure: String,
    /// Annotator names in rater-index order.
    pub annotators: Vec<String>,
    /// Number of items (coding) or units (unitizing) in the study.
    pub item_count: usize,
    /// Overall agreement.
    pub overall: f64,
    /// Per-category breakdown, in category order.
    pub categories: Vec<CategoryAgreement>,
    /// Total annotation count per annotator, index-aligned with
    /// `annotators`.
    pub annotator_totals: Vec<u64>,
    /// Category × annotator count matrix.
    pub matrix: Vec<CategoryAnnotatorCounts>,
    /// Per category, the number of positions where more than one rater
    /// voted for it. Coding studies only; empty otherwise.
    pub category_overlap: Vec<(String, u64)>,
    /// Per-position agreement values, when item annotation is enabled.
    pub items: Vec<ItemAgreement>,
}

impl AgreementReport {
    /// Human-readable interpretation of the overall value.
    #[must_use]
    pub fn interpretation(&self) -> &'static str {
        crate::measures::agreement_interpretation(self.overall)
    }
}

/// Receives finished reports. Implementations serialize or forward them;
/// the engines only ever call these hooks.
pub trait ReportSink {
    /// A Separate-mode document report.
    fn on_document(&mut self, report: &AgreementReport);
    /// The final Combined-mode corpus report.
    fn on_corpus(&mut self, report: &AgreementReport);
}

/// A sink that stores every report it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Document reports in processing order.
    pub documents: Vec<AgreementReport>,
    /// Corpus reports (at most one per run).
    pub corpus: Vec<AgreementReport>,
}

impl ReportSink for CollectingSink {
    fn on_document(&mut self, report: &AgreementReport) {
        self.documents.push(report.clone());
    }

    fn on_corpus(&mut self, report: &AgreementReport) {
        self.corpus.push(report.clone());
    }
}

/// Assemble a report from a computed coefficient and the engines'
/// counters.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_report<M: CategorySpecificAgreement>(
    scope: ReportScope,
    measure_name: &str,
    coefficient: &M,
    item_count: usize,
    categories: &BTreeSet<String>,
    category_count: &CountMap<String>,
    annotators: &[String],
    annotator_category_count: &[CountMap<String>],
    category_overlap: &CountMap<String>,
    items: Vec<ItemAgreement>,
) -> AgreementReport {
    use crate::measures::AgreementMeasure;

    let category_rows: Vec<CategoryAgreement> = categories
        .iter()
        .map(|category| {
            let value = coefficient.calculate_category_agreement(category);
            CategoryAgreement {
                category: category.clone(),
                count: category_count.get(category),
                agreement: if value.is_nan() { 0.0 } else { value },
            }
        })
        .collect();

    let matrix: Vec<CategoryAnnotatorCounts> = categories
        .iter()
        .map(|category| CategoryAnnotatorCounts {
            category: category.clone(),
            counts: annotator_category_count
                .iter()
                .map(|counts| counts.get(category))
                .collect(),
        })
        .collect();

    let annotator_totals: Vec<u64> = annotator_category_count
        .iter()
        .map(CountMap::total)
        .collect();

    let overlap: Vec<(String, u64)> = category_overlap
        .iter()
        .map(|(category, count)| (category.clone(), count))
        .collect();

    AgreementReport {
        scope,
        measure: measure_name.to_string(),
        annotators: annotators.to_vec(),
        item_count,
        overall: coefficient.calculate_agreement(),
        categories: category_rows,
        annotator_totals,
        matrix,
        category_overlap: overlap,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measures::PercentageAgreement;
    use crate::study::coding::{CodingStudy, SetSelectionStrategy};

    #[test]
    fn test_nan_category_agreement_reported_as_zero() {
        let mut study = CodingStudy::new(2);
        let sets: Vec<std::collections::BTreeSet<String>> = vec![
            ["PER".to_string()].into_iter().collect(),
            ["PER".to_string()].into_iter().collect(),
        ];
        study.add_item_sets(&sets, SetSelectionStrategy::Max);

        let coefficient = PercentageAgreement::new(&study);
        let mut categories = BTreeSet::new();
        categories.insert("PER".to_string());
        // "GHOST" was never rated; its agreement is NaN and must come out
        // as 0.0.
        categories.insert("GHOST".to_string());

        let mut category_count = CountMap::new();
        category_count.add("PER".to_string(), 2);

        let report = build_report(
            ReportScope::Document("doc".into()),
            "PercentageAgreement",
            &coefficient,
            study.len(),
            &categories,
            &category_count,
            &["a".to_string(), "b".to_string()],
            &[CountMap::new(), CountMap::new()],
            &CountMap::new(),
            Vec::new(),
        );

        let ghost = report
            .categories
            .iter()
            .find(|c| c.category == "GHOST")
            .unwrap();
        assert_eq!(ghost.agreement, 0.0);
        let per = report.categories.iter().find(|c| c.category == "PER").unwrap();
        assert!((per.agreement - 1.0).abs() < 1e-12);
        assert_eq!(per.count, 2);
    }
}
