//! Statistical annotation studies.
//!
//! A run produces either a [`coding::CodingStudy`] (one category label per
//! rater per token position) or a [`unitizing::UnitizingStudy`]
//! (variable-length categorized spans over a token continuum), never both.

pub mod coding;
pub mod unitizing;

/// The sentinel label a silent rater contributes at a position.
///
/// Sentinels embed the rater index so two silent raters never spuriously
/// agree with each other.
#[must_use]
pub fn null_sentinel(rater: usize) -> String {
    format!("{rater}<null>")
}

/// Whether a label is a silent-rater sentinel.
#[must_use]
pub fn is_null_sentinel(label: &str) -> bool {
    label
        .strip_suffix("<null>")
        .is_some_and(|prefix| !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_roundtrip() {
        assert_eq!(null_sentinel(0), "0<null>");
        assert!(is_null_sentinel(&null_sentinel(7)));
        assert!(!is_null_sentinel("PER"));
        assert!(!is_null_sentinel("<null>"));
        assert!(!is_null_sentinel("x<null>"));
    }
}
