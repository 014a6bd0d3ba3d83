//! Krippendorff's alpha for unitizing studies.
//!
//! Follows the structure of Krippendorff's uα: per category, observed
//! disagreement sums the interval distance over ordered rater pairs —
//! `(Δbegin)² + (Δend)²` for overlapping units of the category, `length²`
//! for a unit falling wholly inside the other rater's gap — normalized by
//! `m(m−1)L²`. Expected disagreement applies the same distance with each
//! unit relocated uniformly over the continuum against the opposing
//! rater's fixed sections, evaluated in closed form (no sampling). Perfect
//! agreement yields 1.0; chance-level annotation yields ≈ 0.

use std::collections::BTreeSet;

use crate::measures::{AgreementMeasure, CategorySpecificAgreement};
use crate::study::unitizing::{UnitizingStudy, UnitizingUnit};

/// Krippendorff's alpha over a unitizing study (interval distance).
pub struct KrippendorffAlphaUnitizingAgreement<'a> {
    study: &'a UnitizingStudy,
}

/// A contiguous stretch of one rater's continuum: either a unit of the
/// category under analysis or a gap between such units.
#[derive(Debug, Clone, Copy)]
struct Section {
    begin: i64,
    length: i64,
}

impl Section {
    fn end(&self) -> i64 {
        self.begin + self.length
    }
}

impl<'a> KrippendorffAlphaUnitizingAgreement<'a> {
    /// Wrap a study.
    #[must_use]
    pub fn new(study: &'a UnitizingStudy) -> Self {
        Self { study }
    }

    /// The category's observed disagreement, normalized by `m(m−1)L²`.
    pub fn observed_category_disagreement(&self, category: &str) -> f64 {
        self.normalize(self.raw_observed(category))
    }

    /// The category's expected disagreement under uniform relocation,
    /// normalized by `m(m−1)L²`.
    pub fn expected_category_disagreement(&self, category: &str) -> f64 {
        self.normalize(self.raw_expected(category))
    }

    fn normalize(&self, raw: f64) -> f64 {
        let m = self.study.rater_count() as f64;
        let length = self.study.continuum_length() as f64;
        let denominator = m * (m - 1.0) * length * length;
        if denominator <= 0.0 {
            f64::NAN
        } else {
            raw / denominator
        }
    }

    fn units_of(&self, rater: usize, category: &str) -> Vec<Section> {
        self.study
            .units_of(rater, category)
            .map(|unit: &UnitizingUnit| Section {
                begin: unit.offset as i64,
                length: unit.length as i64,
            })
            .collect()
    }

    /// The complement of the rater's category coverage: maximal stretches
    /// of the continuum without any unit of the category.
    fn gaps_of(&self, rater: usize, category: &str) -> Vec<Section> {
        let length = self.study.continuum_length() as i64;
        let mut covered: Vec<(i64, i64)> = self
            .units_of(rater, category)
            .iter()
            .map(|section| (section.begin, section.end()))
            .collect();
        covered.sort_unstable();

        let mut gaps = Vec::new();
        let mut cursor = 0i64;
        for (begin, end) in covered {
            if begin > cursor {
                gaps.push(Section {
                    begin: cursor,
                    length: begin - cursor,
                });
            }
            cursor = cursor.max(end);
        }
        if cursor < length {
            gaps.push(Section {
                begin: cursor,
                length: length - cursor,
            });
        }
        gaps
    }

    fn raw_observed(&self, category: &str) -> f64 {
        let raters = self.study.rater_count();
        let mut total = 0i128;
        for rater1 in 0..raters {
            let units1 = self.units_of(rater1, category);
            if units1.is_empty() {
                continue;
            }
            for rater2 in 0..raters {
                if rater1 == rater2 {
                    continue;
                }
                let units2 = self.units_of(rater2, category);
                let gaps2 = self.gaps_of(rater2, category);
                for unit in &units1 {
                    for other in &units2 {
                        if unit.begin < other.end() && other.begin < unit.end() {
                            let db = unit.begin - other.begin;
                            let de = unit.end() - other.end();
                            total += (db * db + de * de) as i128;
                        }
                    }
                    for gap in &gaps2 {
                        if gap.begin <= unit.begin && unit.end() <= gap.end() {
                            total += (unit.length * unit.length) as i128;
                        }
                    }
                }
            }
        }
        total as f64
    }

    fn raw_expected(&self, category: &str) -> f64 {
        let raters = self.study.rater_count();
        let length = self.study.continuum_length() as i64;
        let mut total = 0.0f64;
        for rater1 in 0..raters {
            let units1 = self.units_of(rater1, category);
            if units1.is_empty() {
                continue;
            }
            for rater2 in 0..raters {
                if rater1 == rater2 {
                    continue;
                }
                let units2 = self.units_of(rater2, category);
                let gaps2 = self.gaps_of(rater2, category);
                for unit in &units1 {
                    let placements = length - unit.length + 1;
                    if placements <= 0 {
                        continue;
                    }
                    let mut sum = 0i128;
                    for other in &units2 {
                        sum += relocated_unit_distance(unit.length, other, length);
                    }
                    for gap in &gaps2 {
                        sum += relocated_gap_distance(unit.length, gap, length);
                    }
                    total += sum as f64 / placements as f64;
                }
            }
        }
        total
    }
}

impl AgreementMeasure for KrippendorffAlphaUnitizingAgreement<'_> {
    fn calculate_agreement(&self) -> f64 {
        if self.study.rater_count() < 2 || self.study.continuum_length() == 0 {
            return f64::NAN;
        }
        let categories: BTreeSet<&str> = self.study.categories();
        let mut observed = 0.0;
        let mut expected = 0.0;
        for category in categories {
            observed += self.raw_observed(category);
            expected += self.raw_expected(category);
        }
        if expected > 0.0 {
            1.0 - observed / expected
        } else {
            f64::NAN
        }
    }
}

impl CategorySpecificAgreement for KrippendorffAlphaUnitizingAgreement<'_> {
    fn calculate_category_agreement(&self, category: &str) -> f64 {
        if self.study.rater_count() < 2 || self.study.continuum_length() == 0 {
            return f64::NAN;
        }
        let observed = self.raw_observed(category);
        let expected = self.raw_expected(category);
        if expected > 0.0 {
            1.0 - observed / expected
        } else {
            f64::NAN
        }
    }
}

/// Sum of `(Δbegin)² + (Δend)²` over every placement of a unit of length
/// `a` that overlaps the fixed unit `other`, on a continuum of `length`
/// tokens.
fn relocated_unit_distance(a: i64, other: &Section, length: i64) -> i128 {
    let y = other.begin;
    let b = other.length;
    let x_lo = (y - a + 1).max(0);
    let x_hi = (y + b - 1).min(length - a);
    if x_lo > x_hi {
        return 0;
    }
    // Σ (x − y)² + Σ ((x + a) − (y + b))² over x in [x_lo, x_hi].
    sum_of_squares(x_lo - y, x_hi - y) + sum_of_squares(x_lo + a - y - b, x_hi + a - y - b)
}

/// Sum of `a²` over every placement of a unit of length `a` that falls
/// wholly inside the fixed gap `gap`.
fn relocated_gap_distance(a: i64, gap: &Section, length: i64) -> i128 {
    let x_lo = gap.begin.max(0);
    let x_hi = (gap.end() - a).min(length - a);
    if x_lo > x_hi {
        return 0;
    }
    (x_hi - x_lo + 1) as i128 * (a * a) as i128
}

/// Σ k² for k in `[lo, hi]`, zero when the range is empty.
fn sum_of_squares(lo: i64, hi: i64) -> i128 {
    if lo > hi {
        return 0;
    }
    // Σ_{k=0..n} k² for n ≥ 0.
    fn cumulative(n: i64) -> i128 {
        if n < 0 {
            return 0;
        }
        let n = n as i128;
        n * (n + 1) * (2 * n + 1) / 6
    }
    let positive = cumulative(hi) - cumulative(lo.max(0) - 1);
    let negative = if lo < 0 {
        // Σ k² for k in [lo, min(hi, -1)] mirrored onto the positive
        // range.
        cumulative(-lo) - cumulative(-(hi.min(-1)) - 1)
    } else {
        0
    };
    positive + negative
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_squares() {
        assert_eq!(sum_of_squares(0, 3), 14);
        assert_eq!(sum_of_squares(1, 3), 14);
        assert_eq!(sum_of_squares(-2, 2), 10);
        assert_eq!(sum_of_squares(-3, -1), 14);
        assert_eq!(sum_of_squares(2, 1), 0);
    }

    #[test]
    fn test_perfect_agreement_is_one() {
        let mut study = UnitizingStudy::new(2, 10);
        study.add_unit(2, 3, 0, "PER");
        study.add_unit(2, 3, 1, "PER");
        let alpha = KrippendorffAlphaUnitizingAgreement::new(&study);
        assert!((alpha.calculate_agreement() - 1.0).abs() < 1e-12);
        assert!((alpha.calculate_category_agreement("PER") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_disagreement_lowers_alpha() {
        let mut agree = UnitizingStudy::new(2, 10);
        agree.add_unit(2, 3, 0, "PER");
        agree.add_unit(2, 3, 1, "PER");

        let mut off_by_one = UnitizingStudy::new(2, 10);
        off_by_one.add_unit(2, 3, 0, "PER");
        off_by_one.add_unit(3, 3, 1, "PER");

        let full = KrippendorffAlphaUnitizingAgreement::new(&agree).calculate_agreement();
        let partial =
            KrippendorffAlphaUnitizingAgreement::new(&off_by_one).calculate_agreement();
        assert!(partial < full);
    }

    #[test]
    fn test_disjoint_units_score_low() {
        // Rater 1 marks a span rater 0 left blank and vice versa.
        let mut study = UnitizingStudy::new(2, 20);
        study.add_unit(0, 3, 0, "PER");
        study.add_unit(10, 3, 1, "PER");
        let alpha = KrippendorffAlphaUnitizingAgreement::new(&study).calculate_agreement();
        assert!(alpha < 0.5);
    }

    #[test]
    fn test_missing_category_for_one_rater() {
        // Only rater 0 uses LOC; observed disagreement comes from the
        // unit-in-gap term, so LOC agreement is below PER agreement.
        let mut study = UnitizingStudy::new(2, 10);
        study.add_unit(0, 2, 0, "PER");
        study.add_unit(0, 2, 1, "PER");
        study.add_unit(5, 2, 0, "LOC");
        let alpha = KrippendorffAlphaUnitizingAgreement::new(&study);
        let per = alpha.calculate_category_agreement("PER");
        let loc = alpha.calculate_category_agreement("LOC");
        assert!((per - 1.0).abs() < 1e-12);
        assert!(loc < per);
    }

    #[test]
    fn test_single_rater_is_undefined() {
        let mut study = UnitizingStudy::new(1, 10);
        study.add_unit(0, 2, 0, "PER");
        let alpha = KrippendorffAlphaUnitizingAgreement::new(&study);
        assert!(alpha.calculate_agreement().is_nan());
    }

    #[test]
    fn test_observed_hand_computed() {
        // Two raters, L = 2; identical single-token units at offset 0.
        // Unit-unit distance is 0 and neither unit sits inside the
        // other's gap, so observed disagreement is exactly 0 while the
        // relocation model leaves room for chance disagreement.
        let mut study = UnitizingStudy::new(2, 2);
        study.add_unit(0, 1, 0, "PER");
        study.add_unit(0, 1, 1, "PER");
        let alpha = KrippendorffAlphaUnitizingAgreement::new(&study);
        assert_eq!(alpha.raw_observed("PER"), 0.0);
        // Per ordered pair: gap [1,2) admits one in-gap placement of a
        // 1-token unit out of two placements -> 1²·1/2 = 0.5; both
        // ordered pairs together give 1.0.
        assert!((alpha.raw_expected("PER") - 1.0).abs() < 1e-12);
        assert!((alpha.calculate_agreement() - 1.0).abs() < 1e-12);
    }
}
