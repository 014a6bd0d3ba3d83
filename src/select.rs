//! Annotation selection: kind filter, fingerprint filter, maximal-span
//! rule.

use std::collections::BTreeSet;

use crate::annotation::{Annotation, AnnotationKind};
use crate::document::View;

/// Select the in-scope annotations of a view.
///
/// Pipeline: instances of the configured kinds → (optionally) only
/// fingerprinted instances → maximal-span rule. The result is sorted by
/// (begin, end, kind, id) so downstream item ordering is reproducible.
#[must_use]
pub fn eligible_annotations<'a>(
    view: &'a View,
    kinds: &BTreeSet<AnnotationKind>,
    filter_fingerprinted: bool,
) -> Vec<&'a Annotation> {
    let selected: Vec<&Annotation> = view
        .annotations
        .iter()
        .filter(|a| kinds.contains(&a.kind))
        .filter(|a| !filter_fingerprinted || view.fingerprinted.contains(&a.id))
        .collect();

    let mut retained = drop_strictly_contained(&selected);
    retained.sort_by_key(|a| (a.span.begin, a.span.end, a.kind, a.id));
    retained
}

/// Drop every annotation strictly contained in another annotation of the
/// same kind. Equal spans survive; the rule is idempotent.
fn drop_strictly_contained<'a>(annotations: &[&'a Annotation]) -> Vec<&'a Annotation> {
    annotations
        .iter()
        .filter(|a| {
            !annotations.iter().any(|other| {
                other.id != a.id
                    && other.kind == a.kind
                    && other.span.strictly_contains(&a.span)
            })
        })
        .copied()
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::span::Span;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn overlap_filter_idempotent(
            spans in proptest::collection::vec((0usize..40, 1usize..15), 1..12)
        ) {
            let view = spans.iter().enumerate().fold(
                View::new("doc/a", vec![Span::new(0, 1)]),
                |v, (i, &(b, l))| {
                    v.with_annotation(Annotation::new(
                        i as u64,
                        AnnotationKind::NamedEntity,
                        b,
                        b + l,
                    ))
                },
            );
            let kinds: BTreeSet<AnnotationKind> = AnnotationKind::ALL.into_iter().collect();
            let once = eligible_annotations(&view, &kinds, false);
            let again = super::drop_strictly_contained(&once);
            prop_assert_eq!(once, again);
        }
    }
}
