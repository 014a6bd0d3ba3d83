//! The unitizing agreement engine.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::annotation::AnnotationKind;
use crate::collections::{CountMap, IndexingMap};
use crate::document::Document;
use crate::engine::{prepare_document, DocumentOutcome, EngineConfig, SkipReason};
use crate::error::Result;
use crate::inclusion::{InclusionRules, RuleSource};
use crate::measures::KrippendorffAlphaUnitizingAgreement;
use crate::report::{build_report, AgreementReport, ReportScope, ReportSink};
use crate::study::unitizing::{UnitizingStudy, UnitizingUnit};

/// Display name of the unitizing coefficient, used in reports.
const MEASURE_NAME: &str = "KrippendorffAlphaUnitizingAgreement";

/// Configuration of a [`UnitizingEngine`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitizingConfig {
    /// Options shared with the coding engine.
    pub base: EngineConfig,
    /// Inclusion-rule source; `None` disables synthesis.
    pub rules: Option<RuleSource>,
}

impl UnitizingConfig {
    /// Set the base options.
    #[must_use]
    pub fn with_base(mut self, base: EngineConfig) -> Self {
        self.base = base;
        self
    }

    /// Set the inclusion-rule source.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSource) -> Self {
        self.rules = Some(rules);
        self
    }
}

/// Computes unitizing agreement (Krippendorff's uα) over a document
/// stream.
///
/// Single-writer: one engine instance per run, documents fed in order.
/// The running document offset is advanced once per successfully
/// processed document; combined-mode unit offsets therefore occupy
/// strictly increasing, non-overlapping ranges.
pub struct UnitizingEngine {
    config: UnitizingConfig,
    rules: Option<InclusionRules>,
    annotators: IndexingMap<String>,
    document_offset: usize,
    global_units: Vec<UnitizingUnit>,
    categories: BTreeSet<String>,
    category_count: CountMap<String>,
    annotator_category_count: Vec<CountMap<String>>,
    sink: Option<Box<dyn ReportSink>>,
}

impl UnitizingEngine {
    /// Create an engine, resolving the inclusion-rule source. A malformed
    /// source fails here, before any document is processed.
    pub fn new(config: UnitizingConfig) -> Result<Self> {
        let rules = match &config.rules {
            Some(source) => {
                let rules = source.resolve()?;
                if rules.is_empty() {
                    None
                } else {
                    Some(rules)
                }
            }
            None => None,
        };
        log::info!(
            "Computing unitizing agreement for kinds {:?}",
            config.base.kinds
        );
        Ok(Self {
            config,
            rules,
            annotators: IndexingMap::new(),
            document_offset: 0,
            global_units: Vec::new(),
            categories: BTreeSet::new(),
            category_count: CountMap::new(),
            annotator_category_count: Vec::new(),
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
    pub fn config(&self) -> &UnitizingConfig {
        &self.config
    }

    /// Annotator names in rater-index order.
    #[must_use]
    pub fn annotators(&self) -> &[String] {
        self.annotators.keys()
    }

    /// The cumulative length of all successfully processed documents.
    #[must_use]
    pub fn document_offset(&self) -> usize {
        self.document_offset
    }

    /// Process one document. Validation failures skip the document and
    /// leave the aggregate — including the running offset — untouched.
    pub fn process_document(&mut self, document: &Document) -> Result<DocumentOutcome> {
        let prepared = match prepare_document(document, &self.config.base) {
            Ok(prepared) => prepared,
            Err(reason) => {
                log::warn!("Skipping document {}: {reason}", document.id);
                return Ok(DocumentOutcome::Skipped(reason));
            }
        };

        // Resolve everything before mutating any aggregate state.
        let mut resolved_views = Vec::with_capacity(prepared.views.len());
        for view in &prepared.views {
            let mut resolved = Vec::with_capacity(view.annotations.len());
            for annotation in &view.annotations {
                match view.index.resolve(annotation.span) {
                    Some(interval) => resolved.push((interval, *annotation)),
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
        let labeler = &self.config.base.labeler;

        let mut local = UnitizingStudy::new(rater_count, prepared.token_count);
        let mut doc_categories = BTreeSet::new();
        let mut doc_category_count = CountMap::new();
        let mut doc_annotator_count: Vec<CountMap<String>> =
            vec![CountMap::new(); rater_count];

        for (&rater, resolved) in rater_indices.iter().zip(&resolved_views) {
            // Recorded spans per kind, keyed by begin index; the last
            // annotation wins on identical begins. Feeds rule synthesis.
            let mut recorded: BTreeMap<AnnotationKind, BTreeMap<usize, usize>> = BTreeMap::new();

            for (interval, annotation) in resolved {
                let category = labeler.category(annotation);
                doc_categories.insert(category.clone());
                doc_category_count.inc(category.clone());
                doc_annotator_count[rater].inc(category.clone());
                local.add_unit(interval.begin, interval.len(), rater, category);

                if self.rules.is_some() {
                    recorded
                        .entry(annotation.kind)
                        .or_default()
                        .insert(interval.begin, interval.end);
                }
            }

            if let Some(rules) = &self.rules {
                for (source, targets) in rules.iter() {
                    let Some(source_spans) = recorded.get(&source) else {
                        continue;
                    };
                    for &target in targets {
                        let target_spans = recorded.get(&target);
                        for (&begin, &end) in source_spans {
                            // The last target span beginning at or before
                            // the source's end; if it ends before the
                            // source begins there is no overlap and the
                            // implied annotation is credited.
                            let satisfied = target_spans
                                .and_then(|spans| spans.range(..=end).next_back())
                                .is_some_and(|(_, &target_end)| target_end >= begin);
                            if satisfied {
                                continue;
                            }
                            let category = labeler.kind_category(target);
                            log::debug!(
                                "Adding included annotation: {target} < {source} ({begin}, {end})"
                            );
                            doc_categories.insert(category.clone());
                            doc_category_count.inc(category.clone());
                            doc_annotator_count[rater].inc(category.clone());
                            local.add_unit(begin, end - begin + 1, rater, category);
                        }
                    }
                }
            }
        }

        let report = if self.config.base.policy.do_separate() {
            let coefficient = KrippendorffAlphaUnitizingAgreement::new(&local);
            let report = build_report(
                ReportScope::Document(document.id.clone()),
                MEASURE_NAME,
                &coefficient,
                local.len(),
                &doc_categories,
                &doc_category_count,
                self.annotators.keys(),
                &doc_annotator_count,
                &CountMap::new(),
                Vec::new(),
            );
            if let Some(sink) = self.sink.as_mut() {
                sink.on_document(&report);
            }
            Some(report)
        } else {
            None
        };

        if self.config.base.policy.do_combined() {
            // Shift by the cumulative length of the documents before this
            // one, then advance the offset.
            let offset = self.document_offset;
            for unit in local.units() {
                self.global_units.push(UnitizingUnit {
                    offset: unit.offset + offset,
                    ..unit.clone()
                });
            }
            self.document_offset += prepared.token_count;
            self.categories.extend(doc_categories);
            self.category_count.merge(&doc_category_count);
            self.annotator_category_count
                .resize_with(rater_count, CountMap::new);
            for (rater, counts) in doc_annotator_count.iter().enumerate() {
                self.annotator_category_count[rater].merge(counts);
            }
        }

        Ok(DocumentOutcome::Processed(report))
    }

    /// Compute the corpus-level report, exactly once, after the final
    /// document.
    pub fn finish(mut self) -> Result<Option<AgreementReport>> {
        if !self.config.base.policy.do_combined() || self.annotators.len() < 2 {
            return Ok(None);
        }
        if self.global_units.is_empty() {
            log::info!("No units collected; skipping combined agreement");
            return Ok(None);
        }
        self.annotator_category_count
            .resize_with(self.annotators.len(), CountMap::new);

        let mut study = UnitizingStudy::new(self.annotators.len(), self.document_offset);
        for unit in &self.global_units {
            study.add_unit(unit.offset, unit.length, unit.rater, unit.category.clone());
        }

        let coefficient = KrippendorffAlphaUnitizingAgreement::new(&study);
        let report = build_report(
            ReportScope::Corpus,
            MEASURE_NAME,
            &coefficient,
            study.len(),
            &self.categories,
            &self.category_count,
            self.annotators.keys(),
            &self.annotator_category_count,
            &CountMap::new(),
            Vec::new(),
        );
        if let Some(sink) = self.sink.as_mut() {
            sink.on_corpus(&report);
        }
        Ok(Some(report))
    }
}
