//! End-to-end tests for the unitizing agreement engine.

use concord::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

const TEXT: &str = "t0 t1 t2 t3 t4";

fn tokens() -> Vec<Span> {
    Document::whitespace_tokens(TEXT)
}

fn lenient_base() -> EngineConfig {
    EngineConfig::default()
        .with_min_annotations(0)
        .with_fingerprint_filter(false)
}

fn view(name: &str) -> View {
    View::new(name, tokens())
}

fn processed(outcome: DocumentOutcome) -> Option<AgreementReport> {
    match outcome {
        DocumentOutcome::Processed(report) => report,
        DocumentOutcome::Skipped(reason) => panic!("unexpected skip: {reason}"),
    }
}

/// A one-token document where the given annotators mark the single token.
fn one_token_document(id: &str, markers: &[(&str, bool)]) -> Document {
    let text = "tok";
    let tokens = Document::whitespace_tokens(text);
    let mut doc = Document::new(id, text, tokens.clone());
    for (i, (annotator, marks)) in markers.iter().enumerate() {
        let mut v = View::new(format!("anno/{annotator}"), tokens.clone());
        if *marks {
            v = v.with_annotation(Annotation::new(
                i as u64 + 1,
                AnnotationKind::NamedEntity,
                0,
                3,
            ));
        }
        doc = doc.with_view(v);
    }
    doc
}

// =============================================================================
// Agreement scenarios
// =============================================================================

#[test]
fn identical_spans_agree_perfectly() {
    let doc = Document::new("doc-1", TEXT, tokens())
        .with_view(
            view("anno/a").with_annotation(Annotation::new(1, AnnotationKind::NamedEntity, 0, 8)),
        )
        .with_view(
            view("anno/b").with_annotation(Annotation::new(2, AnnotationKind::NamedEntity, 0, 8)),
        );

    let config = UnitizingConfig::default()
        .with_base(lenient_base().with_policy(AggregationPolicy::Separate));
    let mut engine = UnitizingEngine::new(config).unwrap();
    let report = processed(engine.process_document(&doc).unwrap()).unwrap();

    assert_eq!(report.measure, "KrippendorffAlphaUnitizingAgreement");
    assert_eq!(report.item_count, 2);
    assert!((report.overall - 1.0).abs() < 1e-12);
    let ne = &report.categories[0];
    assert_eq!(ne.category, "NamedEntity");
    assert!((ne.agreement - 1.0).abs() < 1e-12);
}

#[test]
fn differing_boundaries_lower_agreement() {
    let doc = Document::new("doc-1", TEXT, tokens())
        .with_view(
            view("anno/a").with_annotation(Annotation::new(1, AnnotationKind::NamedEntity, 0, 8)),
        )
        .with_view(
            view("anno/b").with_annotation(Annotation::new(2, AnnotationKind::NamedEntity, 3, 11)),
        );

    let config = UnitizingConfig::default()
        .with_base(lenient_base().with_policy(AggregationPolicy::Separate));
    let mut engine = UnitizingEngine::new(config).unwrap();
    let report = processed(engine.process_document(&doc).unwrap()).unwrap();
    assert!(report.overall < 1.0);
}

// =============================================================================
// Combined aggregation and document offsets
// =============================================================================

#[test]
fn combined_offsets_shift_by_prior_document_length() {
    let config = UnitizingConfig::default()
        .with_base(lenient_base().with_policy(AggregationPolicy::Combined));
    let mut engine = UnitizingEngine::new(config).unwrap();

    // Two one-token documents; each annotator marks a different one.
    // With correct offsets the units land on different continuum
    // positions (disagreement); collapsed offsets would fake perfect
    // agreement.
    engine
        .process_document(&one_token_document("doc-1", &[("a", true), ("b", false)]))
        .unwrap();
    assert_eq!(engine.document_offset(), 1);
    engine
        .process_document(&one_token_document("doc-2", &[("a", false), ("b", true)]))
        .unwrap();
    assert_eq!(engine.document_offset(), 2);

    let corpus = engine.finish().unwrap().unwrap();
    assert_eq!(corpus.item_count, 2);
    assert!(corpus.overall < 1.0);
}

#[test]
fn combined_perfect_agreement_across_documents() {
    let config = UnitizingConfig::default()
        .with_base(lenient_base().with_policy(AggregationPolicy::Both));
    let mut engine = UnitizingEngine::new(config).unwrap();

    for id in ["doc-1", "doc-2"] {
        let report = processed(
            engine
                .process_document(&one_token_document(id, &[("a", true), ("b", true)]))
                .unwrap(),
        )
        .unwrap();
        // Per-document report exists in Both mode.
        assert_eq!(report.annotators, vec!["a", "b"]);
    }

    let corpus = engine.finish().unwrap().unwrap();
    assert_eq!(corpus.item_count, 4);
    assert!((corpus.overall - 1.0).abs() < 1e-12);
    assert_eq!(corpus.annotator_totals, vec![2, 2]);
}

#[test]
fn skipped_document_leaves_offset_untouched() {
    let config = UnitizingConfig::default()
        .with_base(lenient_base().with_policy(AggregationPolicy::Combined));
    let mut engine = UnitizingEngine::new(config).unwrap();

    engine
        .process_document(&one_token_document("doc-1", &[("a", true), ("b", true)]))
        .unwrap();
    assert_eq!(engine.document_offset(), 1);

    // A document with mismatched token counts is abandoned whole.
    let mut bad = one_token_document("doc-2", &[("a", true), ("b", true)]);
    bad.views[0].tokens.push(Span::new(4, 6));
    match engine.process_document(&bad).unwrap() {
        DocumentOutcome::Skipped(SkipReason::TokenCountMismatch { .. }) => {}
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(engine.document_offset(), 1);

    // An unresolvable span also abandons the document atomically.
    let mut unresolvable = one_token_document("doc-3", &[("a", true), ("b", true)]);
    unresolvable.views[0].annotations[0].span = Span::new(20, 25);
    match engine.process_document(&unresolvable).unwrap() {
        DocumentOutcome::Skipped(SkipReason::UnresolvableSpan { annotation, .. }) => {
            assert_eq!(annotation, 1);
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert_eq!(engine.document_offset(), 1);
}

// =============================================================================
// Inclusion rules
// =============================================================================

fn rules_config() -> UnitizingConfig {
    UnitizingConfig::default()
        .with_base(lenient_base().with_policy(AggregationPolicy::Separate))
        .with_rules(RuleSource::Literal(
            r#"{"SemanticRole": ["NamedEntity"]}"#.into(),
        ))
}

#[test]
fn inclusion_rule_synthesizes_missing_target() {
    // Rater a: a semantic role over tokens 0-2 plus an entity inside it.
    // Rater b: the semantic role only — the entity is implied.
    let doc = Document::new("doc-1", TEXT, tokens())
        .with_view(
            view("anno/a")
                .with_annotation(Annotation::new(1, AnnotationKind::SemanticRole, 0, 8))
                .with_annotation(Annotation::new(2, AnnotationKind::NamedEntity, 3, 5)),
        )
        .with_view(
            view("anno/b")
                .with_annotation(Annotation::new(3, AnnotationKind::SemanticRole, 0, 8)),
        );

    let mut engine = UnitizingEngine::new(rules_config()).unwrap();
    let report = processed(engine.process_document(&doc).unwrap()).unwrap();

    // a: role + real entity; b: role + synthesized entity.
    assert_eq!(report.item_count, 4);
    let ne_row = report
        .matrix
        .iter()
        .find(|row| row.category == "NamedEntity")
        .unwrap();
    assert_eq!(ne_row.counts, vec![1, 1]);

    // The synthesized unit spans the whole source span, the real one a
    // single token, so entity agreement stays below 1.
    let ne = report
        .categories
        .iter()
        .find(|c| c.category == "NamedEntity")
        .unwrap();
    assert!(ne.agreement < 1.0);
}

#[test]
fn inclusion_rule_never_duplicates_real_target() {
    // Both raters annotate the entity explicitly: nothing is synthesized.
    let doc = Document::new("doc-1", TEXT, tokens())
        .with_view(
            view("anno/a")
                .with_annotation(Annotation::new(1, AnnotationKind::SemanticRole, 0, 8))
                .with_annotation(Annotation::new(2, AnnotationKind::NamedEntity, 0, 8)),
        )
        .with_view(
            view("anno/b")
                .with_annotation(Annotation::new(3, AnnotationKind::SemanticRole, 0, 8))
                .with_annotation(Annotation::new(4, AnnotationKind::NamedEntity, 0, 8)),
        );

    let mut engine = UnitizingEngine::new(rules_config()).unwrap();
    let report = processed(engine.process_document(&doc).unwrap()).unwrap();

    // Two real units per rater and no synthesized third.
    assert_eq!(report.item_count, 4);
    let ne_row = report
        .matrix
        .iter()
        .find(|row| row.category == "NamedEntity")
        .unwrap();
    assert_eq!(ne_row.counts, vec![1, 1]);
    assert!((report.overall - 1.0).abs() < 1e-12);
}

#[test]
fn disjoint_target_does_not_satisfy_rule() {
    // The entity ends before the semantic role begins, so the rule still
    // fires for the role's span.
    let doc = Document::new("doc-1", TEXT, tokens())
        .with_view(
            view("anno/a")
                .with_annotation(Annotation::new(1, AnnotationKind::NamedEntity, 0, 2))
                .with_annotation(Annotation::new(2, AnnotationKind::SemanticRole, 6, 11)),
        )
        .with_view(
            view("anno/b")
                .with_annotation(Annotation::new(3, AnnotationKind::NamedEntity, 0, 2))
                .with_annotation(Annotation::new(4, AnnotationKind::SemanticRole, 6, 11)),
        );

    let mut engine = UnitizingEngine::new(rules_config()).unwrap();
    let report = processed(engine.process_document(&doc).unwrap()).unwrap();

    // Each rater: real entity + role + synthesized entity over the role.
    assert_eq!(report.item_count, 6);
    let ne_row = report
        .matrix
        .iter()
        .find(|row| row.category == "NamedEntity")
        .unwrap();
    assert_eq!(ne_row.counts, vec![2, 2]);
    // Both raters synthesized the same implied span.
    assert!((report.overall - 1.0).abs() < 1e-12);
}

#[test]
fn malformed_rule_source_is_fatal_at_setup() {
    let config = UnitizingConfig::default()
        .with_base(lenient_base())
        .with_rules(RuleSource::Literal("{broken".into()));
    assert!(UnitizingEngine::new(config).is_err());
}

#[test]
fn embedded_rules_resolve_at_setup() {
    let config = UnitizingConfig::default()
        .with_base(lenient_base())
        .with_rules(RuleSource::embedded_default());
    assert!(UnitizingEngine::new(config).is_ok());
}

// =============================================================================
// Category decoration
// =============================================================================

#[test]
fn include_flags_split_categories() {
    let labeler = CategoryLabeler::new().with_include_flag("Metaphor");
    let doc = Document::new("doc-1", TEXT, tokens())
        .with_view(view("anno/a").with_annotation(
            Annotation::new(1, AnnotationKind::NamedEntity, 0, 2).with_flag("Metaphor"),
        ))
        .with_view(
            view("anno/b").with_annotation(Annotation::new(2, AnnotationKind::NamedEntity, 0, 2)),
        );

    let config = UnitizingConfig::default().with_base(
        lenient_base()
            .with_policy(AggregationPolicy::Separate)
            .with_labeler(labeler),
    );
    let mut engine = UnitizingEngine::new(config).unwrap();
    let report = processed(engine.process_document(&doc).unwrap()).unwrap();

    let names: Vec<&str> = report
        .categories
        .iter()
        .map(|c| c.category.as_str())
        .collect();
    assert_eq!(names, vec!["NamedEntity", "NamedEntity-Metaphor"]);
    // Decorated and plain mentions no longer count as the same category.
    assert!(report.overall < 1.0);
}
