//! The coding agreement engine.

use std::collections::BTreeSet;
use std::ops::Range;

use crate::collections::{CountMap, IndexingMap};
use crate::document::Document;
use crate::engine::{
    prepare_document, AnnotatorRelation, DocumentOutcome, EngineConfig, SkipReason,
};
use crate::error::{Error, Result};
use crate::measures::CodingMeasure;
use crate::report::{build_report, AgreementReport, ItemAgreement, ReportScope, ReportSink};
use crate::study::coding::{CodingStudy, SetSelectionStrategy};

/// Configuration of a [`CodingEngine`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodingConfig {
    /// Options shared with the unitizing engine.
    pub base: EngineConfig,
    /// The agreement measure to compute.
    pub measure: CodingMeasure,
    /// The set-selection strategy reducing multi-label positions.
    pub strategy: SetSelectionStrategy,
    /// Produce per-position agreement values in Separate-mode reports.
    /// Requires a measure with per-item agreement.
    pub annotate_items: bool,
}

impl CodingConfig {
    /// Set the base options.
    #[must_use]
    pub fn with_base(mut self, base: EngineConfig) -> Self {
        self.base = base;
        self
    }

    /// Set the agreement measure.
    #[must_use]
    pub fn with_measure(mut self, measure: CodingMeasure) -> Self {
        self.measure = measure;
        self
    }

    /// Set the set-selection strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SetSelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable per-position agreement values.
    #[must_use]
    pub fn with_item_annotation(mut self, enabled: bool) -> Self {
        self.annotate_items = enabled;
        self
    }
}

/// Computes coding agreement over a document stream.
///
/// Single-writer: one engine instance per run, documents fed in order.
pub struct CodingEngine {
    config: CodingConfig,
    annotators: IndexingMap<String>,
    global: CodingStudy,
    categories: BTreeSet<String>,
    category_count: CountMap<String>,
    annotator_category_count: Vec<CountMap<String>>,
    category_overlap: CountMap<String>,
    sink: Option<Box<dyn ReportSink>>,
}

impl CodingEngine {
    /// Create an engine, validating the configuration.
    pub fn new(config: CodingConfig) -> Result<Self> {
        if config.annotate_items && !config.measure.supports_item_agreement() {
            return Err(Error::config(format!(
                "item annotation requires a measure with per-item agreement, \
                 but {} does not define one",
                config.measure
            )));
        }
        if config.measure == CodingMeasure::CohenKappa {
            let filter = &config.base.annotators;
            let pinned = filter.relation == AnnotatorRelation::Allow && !filter.list.is_empty();
            if pinned && filter.list.len() != 2 {
                return Err(Error::config(format!(
                    "CohenKappaAgreement supports exactly 2 raters, \
                     but the allow-list names {}",
                    filter.list.len()
                )));
            }
        }
        log::info!(
            "Computing coding agreement ({}, {}) for kinds {:?}",
            config.measure,
            config.strategy,
            config.base.kinds
        );
        Ok(Self {
            config,
            annotators: IndexingMap::new(),
            global: CodingStudy::new(0),
            categories: BTreeSet::new(),
            category_count: CountMap::new(),
            annotator_category_count: Vec::new(),
            category_overlap: CountMap::new(),
            sink: None,
        })
    }

    /// Attach a report sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &CodingConfig {
        &self.config
    }

    /// Annotator names in rater-index order.
    #[must_use]
    pub fn annotators(&self) -> &[String] {
        self.annotators.keys()
    }

    /// Process one document. Validation failures skip the document and
    /// leave the aggregate untouched; configuration failures (Cohen's
    /// kappa over ≠ 2 raters) abort the run.
    pub fn process_document(&mut self, document: &Document) -> Result<DocumentOutcome> {
        let prepared = match prepare_document(document, &self.config.base) {
            Ok(prepared) => prepared,
            Err(reason) => {
                log::warn!("Skipping document {}: {reason}", document.id);
                return Ok(DocumentOutcome::Skipped(reason));
            }
        };

        // Resolve every annotation before touching any aggregate state so
        // a malformed document cannot leave a partial update behind.
        let mut resolved_views = Vec::with_capacity(prepared.views.len());
        for view in &prepared.views {
            let mut resolved = Vec::with_capacity(view.annotations.len());
            for annotation in &view.annotations {
                match view.index.resolve(annotation.span) {
                    Some(interval) => {
                        resolved.push((interval, self.config.base.labeler.category(annotation)));
                    }
                    None => {
                        let reason = SkipReason::UnresolvableSpan {
                            view: view.view_name.clone(),
                            annotation: annotation.id,
                        };
                        log::warn!("Skipping document {}: {reason}", document.id);
                        return Ok(DocumentOutcome::Skipped(reason));
                    }
                }
            }
            resolved_views.push(resolved);
        }

        let rater_indices: Vec<usize> = prepared
            .views
            .iter()
            .map(|view| self.annotators.add(view.annotator.clone()))
            .collect();
        let rater_count = self.annotators.len();
        let positions = prepared.token_count;

        // Per-rater candidate label sets over all positions.
        let mut grid: Vec<Vec<BTreeSet<String>>> =
            vec![vec![BTreeSet::new(); positions]; rater_count];
        for (rater, resolved) in rater_indices.iter().zip(&resolved_views) {
            for (interval, category) in resolved {
                for position in interval.begin..=interval.end {
                    grid[*rater][position].insert(category.clone());
                }
            }
        }

        let mut local = CodingStudy::new(rater_count);
        let mut item_positions: Vec<(usize, Range<usize>)> = Vec::new();
        let mut doc_categories = BTreeSet::new();
        let mut doc_category_count = CountMap::new();
        let mut doc_annotator_count: Vec<CountMap<String>> =
            vec![CountMap::new(); rater_count];
        let mut doc_overlap = CountMap::new();

        for position in 0..positions {
            let column: Vec<BTreeSet<String>> = (0..rater_count)
                .map(|rater| std::mem::take(&mut grid[rater][position]))
                .collect();
            if column.iter().all(BTreeSet::is_empty) {
                continue;
            }

            let mut votes = CountMap::new();
            for (rater, set) in column.iter().enumerate() {
                if set.is_empty() {
                    continue;
                }
                doc_categories.extend(set.iter().cloned());
                doc_category_count.inc_all(set.iter().cloned());
                doc_annotator_count[rater].inc_all(set.iter().cloned());
                votes.inc_all(set.iter().cloned());
            }
            for (category, count) in votes.iter() {
                if count > 1 {
                    doc_overlap.inc(category.clone());
                }
            }

            let range = local.add_item_sets(&column, self.config.strategy);
            if !range.is_empty() {
                item_positions.push((position, range));
            }
        }

        let report = if self.config.base.policy.do_separate() {
            let coefficient = self.config.measure.build(&local)?;
            let items = if self.config.annotate_items {
                item_positions
                    .iter()
                    .filter_map(|(position, range)| {
                        let values: Vec<f64> = local.items()[range.clone()]
                            .iter()
                            .filter_map(|item| coefficient.item_agreement(item))
                            .collect();
                        if values.is_empty() {
                            return None;
                        }
                        Some(ItemAgreement {
                            position: *position,
                            span: prepared.default_index.span(*position),
                            agreement: values.iter().sum::<f64>() / values.len() as f64,
                        })
                    })
                    .collect()
            } else {
                Vec::new()
            };
            let report = build_report(
                ReportScope::Document(document.id.clone()),
                self.config.measure.name(),
                &coefficient,
                local.len(),
                &doc_categories,
                &doc_category_count,
                self.annotators.keys(),
                &doc_annotator_count,
                &doc_overlap,
                items,
            );
            if let Some(sink) = self.sink.as_mut() {
                sink.on_document(&report);
            }
            Some(report)
        } else {
            None
        };

        if self.config.base.policy.do_combined() {
            self.global.merge(local);
            self.categories.extend(doc_categories);
            self.category_count.merge(&doc_category_count);
            self.annotator_category_count
                .resize_with(rater_count, CountMap::new);
            for (rater, counts) in doc_annotator_count.iter().enumerate() {
                self.annotator_category_count[rater].merge(counts);
            }
            self.category_overlap.merge(&doc_overlap);
        }

        Ok(DocumentOutcome::Processed(report))
    }

    /// Compute the corpus-level report, exactly once, after the final
    /// document.
    pub fn finish(mut self) -> Result<Option<AgreementReport>> {
        if !self.config.base.policy.do_combined() || self.annotators.len() < 2 {
            return Ok(None);
        }
        if self.global.is_empty() {
            log::info!("No items collected; skipping combined agreement");
            return Ok(None);
        }
        self.annotator_category_count
            .resize_with(self.annotators.len(), CountMap::new);

        let coefficient = self.config.measure.build(&self.global)?;
        let report = build_report(
            ReportScope::Corpus,
            self.config.measure.name(),
            &coefficient,
            self.global.len(),
            &self.categories,
            &self.category_count,
            self.annotators.keys(),
            &self.annotator_category_count,
            &self.category_overlap,
            Vec::new(),
        );
        if let Some(sink) = self.sink.as_mut() {
            sink.on_corpus(&report);
        }
        Ok(Some(report))
    }
}
