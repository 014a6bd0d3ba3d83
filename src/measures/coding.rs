//! Coefficients for coding studies.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::measures::{AgreementMeasure, CategorySpecificAgreement, ItemSpecificAgreement};
use crate::study::coding::{CodingItem, CodingStudy};

/// Raw percentage agreement: the average fraction of rater pairs that
/// assigned the same label.
pub struct PercentageAgreement<'a> {
    study: &'a CodingStudy,
}

impl<'a> PercentageAgreement<'a> {
    /// Wrap a study.
    #[must_use]
    pub fn new(study: &'a CodingStudy) -> Self {
        Self { study }
    }
}

impl AgreementMeasure for PercentageAgreement<'_> {
    fn calculate_agreement(&self) -> f64 {
        let items = self.study.items();
        if items.is_empty() {
            return f64::NAN;
        }
        let sum: f64 = items.iter().map(CodingItem::pairwise_agreement).sum();
        sum / items.len() as f64
    }
}

impl CategorySpecificAgreement for PercentageAgreement<'_> {
    fn calculate_category_agreement(&self, category: &str) -> f64 {
        let mut agree = 0u64;
        let mut total = 0u64;
        for item in self.study.items() {
            let labels = item.labels();
            for i in 0..labels.len() {
                for j in (i + 1)..labels.len() {
                    if labels[i] == category || labels[j] == category {
                        total += 1;
                        if labels[i] == labels[j] {
                            agree += 1;
                        }
                    }
                }
            }
        }
        if total == 0 {
            f64::NAN
        } else {
            agree as f64 / total as f64
        }
    }
}

impl ItemSpecificAgreement for PercentageAgreement<'_> {
    fn calculate_item_agreement(&self, item: &CodingItem) -> f64 {
        item.pairwise_agreement()
    }
}

/// Cohen's kappa for exactly two raters.
pub struct CohenKappaAgreement<'a> {
    study: &'a CodingStudy,
}

impl<'a> CohenKappaAgreement<'a> {
    /// Wrap a study; fails unless the study has exactly two raters.
    pub fn new(study: &'a CodingStudy) -> Result<Self> {
        if study.rater_count() != 2 {
            return Err(Error::config(format!(
                "CohenKappaAgreement supports exactly 2 raters, not {}",
                study.rater_count()
            )));
        }
        Ok(Self { study })
    }

    /// Kappa over per-item label pairs mapped through `project`, which
    /// lets the category-specific variant collapse to a binary coding.
    fn kappa_with<F>(&self, project: F) -> f64
    where
        F: Fn(&str) -> &str,
    {
        let items = self.study.items();
        if items.is_empty() {
            return f64::NAN;
        }
        let n = items.len() as f64;
        let mut observed = 0u64;
        let mut left: BTreeMap<&str, u64> = BTreeMap::new();
        let mut right: BTreeMap<&str, u64> = BTreeMap::new();
        for item in items {
            let a = project(&item.labels()[0]);
            let b = project(&item.labels()[1]);
            if a == b {
                observed += 1;
            }
            *left.entry(a).or_insert(0) += 1;
            *right.entry(b).or_insert(0) += 1;
        }
        let p_observed = observed as f64 / n;
        let p_expected: f64 = left
            .iter()
            .map(|(label, &count)| {
                let other = right.get(label).copied().unwrap_or(0);
                (count as f64 / n) * (other as f64 / n)
            })
            .sum();
        if (1.0 - p_expected).abs() < f64::EPSILON {
            f64::NAN
        } else {
            (p_observed - p_expected) / (1.0 - p_expected)
        }
    }
}

impl AgreementMeasure for CohenKappaAgreement<'_> {
    fn calculate_agreement(&self) -> f64 {
        self.kappa_with(|label| label)
    }
}

impl CategorySpecificAgreement for CohenKappaAgreement<'_> {
    fn calculate_category_agreement(&self, category: &str) -> f64 {
        self.kappa_with(|label| if label == category { label } else { "" })
    }
}

/// Fleiss' kappa for any fixed number of raters.
pub struct FleissKappaAgreement<'a> {
    study: &'a CodingStudy,
}

impl<'a> FleissKappaAgreement<'a> {
    /// Wrap a study.
    #[must_use]
    pub fn new(study: &'a CodingStudy) -> Self {
        Self { study }
    }

    fn category_counts<'i>(item: &'i CodingItem) -> BTreeMap<&'i str, u64> {
        let mut counts = BTreeMap::new();
        for label in item.labels() {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl AgreementMeasure for FleissKappaAgreement<'_> {
    fn calculate_agreement(&self) -> f64 {
        let items = self.study.items();
        let m = self.study.rater_count();
        if items.is_empty() || m < 2 {
            return f64::NAN;
        }
        let n = items.len() as f64;
        let m_f = m as f64;

        let mut p_bar = 0.0;
        let mut rating_totals: BTreeMap<&str, u64> = BTreeMap::new();
        for item in items {
            let counts = Self::category_counts(item);
            let sum_sq: f64 = counts.values().map(|&c| (c * c) as f64).sum();
            p_bar += (sum_sq - m_f) / (m_f * (m_f - 1.0));
            for (label, count) in counts {
                *rating_totals.entry(label).or_insert(0) += count;
            }
        }
        p_bar /= n;

        let total_ratings = n * m_f;
        let p_expected: f64 = rating_totals
            .values()
            .map(|&count| {
                let p = count as f64 / total_ratings;
                p * p
            })
            .sum();

        if (1.0 - p_expected).abs() < f64::EPSILON {
            f64::NAN
        } else {
            (p_bar - p_expected) / (1.0 - p_expected)
        }
    }
}

impl CategorySpecificAgreement for FleissKappaAgreement<'_> {
    fn calculate_category_agreement(&self, category: &str) -> f64 {
        let items = self.study.items();
        let m = self.study.rater_count();
        if items.is_empty() || m < 2 {
            return f64::NAN;
        }
        let n = items.len() as f64;
        let m_f = m as f64;

        let mut in_category = 0u64;
        let mut cross = 0.0;
        for item in items {
            let count = item
                .labels()
                .iter()
                .filter(|label| label.as_str() == category)
                .count() as f64;
            in_category += count as u64;
            cross += count * (m_f - count);
        }
        let p = in_category as f64 / (n * m_f);
        let denominator = n * m_f * (m_f - 1.0) * p * (1.0 - p);
        if denominator.abs() < f64::EPSILON {
            f64::NAN
        } else {
            1.0 - cross / denominator
        }
    }
}

/// Krippendorff's alpha for coding studies with the nominal distance
/// function, computed from the coincidence matrix.
pub struct KrippendorffAlphaAgreement<'a> {
    study: &'a CodingStudy,
}

/// Observed and expected disagreement derived from a coincidence matrix.
struct Disagreement {
    observed: f64,
    expected: f64,
}

impl<'a> KrippendorffAlphaAgreement<'a> {
    /// Wrap a study.
    #[must_use]
    pub fn new(study: &'a CodingStudy) -> Self {
        Self { study }
    }

    /// Build observed/expected disagreement with item labels mapped
    /// through `project` (identity for the overall value, a binary
    /// collapse for category-specific values).
    fn disagreement<F>(&self, project: F) -> Option<Disagreement>
    where
        F: Fn(&str) -> &str,
    {
        let items = self.study.items();
        let m = self.study.rater_count();
        if items.is_empty() || m < 2 {
            return None;
        }
        let weight = 1.0 / (m as f64 - 1.0);

        // Coincidence counts: matched and mismatched ordered pairs per
        // label, plus per-label marginals.
        let mut marginals: BTreeMap<&str, f64> = BTreeMap::new();
        let mut observed = 0.0;
        for item in items {
            let labels: Vec<&str> = item.labels().iter().map(|l| project(l)).collect();
            for i in 0..labels.len() {
                for j in 0..labels.len() {
                    if i == j {
                        continue;
                    }
                    *marginals.entry(labels[i]).or_insert(0.0) += weight;
                    if labels[i] != labels[j] {
                        observed += weight;
                    }
                }
            }
        }

        let n: f64 = marginals.values().sum();
        if n <= 1.0 {
            return None;
        }
        let sum_sq: f64 = marginals.values().map(|&c| c * c).sum();
        let expected = (n * n - sum_sq) / (n - 1.0);
        Some(Disagreement { observed, expected })
    }

    /// Expected probability that two randomly drawn ratings disagree.
    /// Shared with the per-item value.
    fn expected_pairwise_disagreement(&self) -> Option<f64> {
        let d = self.disagreement(|label| label)?;
        let items = self.study.items();
        let m = self.study.rater_count() as f64;
        let n = items.len() as f64 * m;
        if n <= 1.0 {
            return None;
        }
        Some(d.expected / n)
    }
}

impl AgreementMeasure for KrippendorffAlphaAgreement<'_> {
    fn calculate_agreement(&self) -> f64 {
        match self.disagreement(|label| label) {
            Some(d) if d.expected > 0.0 => 1.0 - d.observed / d.expected,
            _ => f64::NAN,
        }
    }
}

impl CategorySpecificAgreement for KrippendorffAlphaAgreement<'_> {
    fn calculate_category_agreement(&self, category: &str) -> f64 {
        let collapsed = self.disagreement(|label| if label == category { label } else { "" });
        match collapsed {
            Some(d) if d.expected > 0.0 => 1.0 - d.observed / d.expected,
            _ => f64::NAN,
        }
    }
}

impl ItemSpecificAgreement for KrippendorffAlphaAgreement<'_> {
    fn calculate_item_agreement(&self, item: &CodingItem) -> f64 {
        let observed = 1.0 - item.pairwise_agreement();
        match self.expected_pairwise_disagreement() {
            Some(expected) if expected > 0.0 => 1.0 - observed / expected,
            _ => f64::NAN,
        }
    }
}
