//! Agreement coefficients.
//!
//! The engines talk to this module exclusively through the measure
//! traits: overall agreement, per-category agreement and — where a
//! coefficient defines it — per-item agreement. Swapping a coefficient
//! implementation touches nothing outside this module.

mod coding;
mod unitizing;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::study::coding::{CodingItem, CodingStudy};

pub use coding::{
    CohenKappaAgreement, FleissKappaAgreement, KrippendorffAlphaAgreement, PercentageAgreement,
};
pub use unitizing::KrippendorffAlphaUnitizingAgreement;

/// A coefficient over a completed study.
pub trait AgreementMeasure {
    /// The overall agreement value. May be NaN when the study is
    /// degenerate (no items, no chance variation).
    fn calculate_agreement(&self) -> f64;
}

/// A coefficient that can be restricted to a single category.
pub trait CategorySpecificAgreement: AgreementMeasure {
    /// The agreement value for one category. May be NaN; the reporter
    /// normalizes NaN to 0.0.
    fn calculate_category_agreement(&self, category: &str) -> f64;
}

/// A coding coefficient that assigns a value to a single item.
pub trait ItemSpecificAgreement {
    /// The agreement value for one item.
    fn calculate_item_agreement(&self, item: &CodingItem) -> f64;
}

/// The coding agreement measures a run can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodingMeasure {
    /// Raw percentage agreement.
    Percentage,
    /// Cohen's kappa; exactly two raters.
    CohenKappa,
    /// Fleiss' kappa.
    FleissKappa,
    /// Krippendorff's alpha with the nominal distance function.
    KrippendorffAlpha,
}

impl Default for CodingMeasure {
    fn default() -> Self {
        CodingMeasure::KrippendorffAlpha
    }
}

impl CodingMeasure {
    /// Stable display name, used in reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CodingMeasure::Percentage => "PercentageAgreement",
            CodingMeasure::CohenKappa => "CohenKappaAgreement",
            CodingMeasure::FleissKappa => "FleissKappaAgreement",
            CodingMeasure::KrippendorffAlpha => "KrippendorffAlphaAgreement",
        }
    }

    /// Whether the measure defines per-item agreement values.
    #[must_use]
    pub fn supports_item_agreement(&self) -> bool {
        matches!(
            self,
            CodingMeasure::Percentage | CodingMeasure::KrippendorffAlpha
        )
    }

    /// Build the coefficient for a study.
    ///
    /// Fails with [`Error::Config`] when Cohen's kappa is requested for a
    /// study that does not have exactly two raters.
    pub fn build<'a>(&self, study: &'a CodingStudy) -> Result<CodingCoefficient<'a>> {
        Ok(match self {
            CodingMeasure::Percentage => {
                CodingCoefficient::Percentage(PercentageAgreement::new(study))
            }
            CodingMeasure::CohenKappa => {
                CodingCoefficient::Cohen(CohenKappaAgreement::new(study)?)
            }
            CodingMeasure::FleissKappa => {
                CodingCoefficient::Fleiss(FleissKappaAgreement::new(study))
            }
            CodingMeasure::KrippendorffAlpha => {
                CodingCoefficient::Alpha(KrippendorffAlphaAgreement::new(study))
            }
        })
    }
}

impl std::fmt::Display for CodingMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CodingMeasure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PercentageAgreement" => Ok(CodingMeasure::Percentage),
            "CohenKappaAgreement" => Ok(CodingMeasure::CohenKappa),
            "FleissKappaAgreement" => Ok(CodingMeasure::FleissKappa),
            "KrippendorffAlphaAgreement" => Ok(CodingMeasure::KrippendorffAlpha),
            other => Err(Error::parse(format!("unknown agreement measure: {other}"))),
        }
    }
}

/// A built coding coefficient, dispatching over the closed measure set.
pub enum CodingCoefficient<'a> {
    /// Percentage agreement.
    Percentage(PercentageAgreement<'a>),
    /// Cohen's kappa.
    Cohen(CohenKappaAgreement<'a>),
    /// Fleiss' kappa.
    Fleiss(FleissKappaAgreement<'a>),
    /// Krippendorff's nominal alpha.
    Alpha(KrippendorffAlphaAgreement<'a>),
}

impl CodingCoefficient<'_> {
    /// Per-item agreement, for the measures that define it.
    #[must_use]
    pub fn item_agreement(&self, item: &CodingItem) -> Option<f64> {
        match self {
            CodingCoefficient::Percentage(m) => Some(m.calculate_item_agreement(item)),
            CodingCoefficient::Alpha(m) => Some(m.calculate_item_agreement(item)),
            _ => None,
        }
    }
}

impl AgreementMeasure for CodingCoefficient<'_> {
    fn calculate_agreement(&self) -> f64 {
        match self {
            CodingCoefficient::Percentage(m) => m.calculate_agreement(),
            CodingCoefficient::Cohen(m) => m.calculate_agreement(),
            CodingCoefficient::Fleiss(m) => m.calculate_agreement(),
            CodingCoefficient::Alpha(m) => m.calculate_agreement(),
        }
    }
}

impl CategorySpecificAgreement for CodingCoefficient<'_> {
    fn calculate_category_agreement(&self, category: &str) -> f64 {
        match self {
            CodingCoefficient::Percentage(m) => m.calculate_category_agreement(category),
            CodingCoefficient::Cohen(m) => m.calculate_category_agreement(category),
            CodingCoefficient::Fleiss(m) => m.calculate_category_agreement(category),
            CodingCoefficient::Alpha(m) => m.calculate_category_agreement(category),
        }
    }
}

/// Interpret an agreement coefficient on the customary Landis-Koch-style
/// scale.
#[must_use]
pub fn agreement_interpretation(value: f64) -> &'static str {
    if value.is_nan() {
        "Undefined agreement"
    } else if value < 0.0 {
        "Less than chance agreement"
    } else if value < 0.20 {
        "Slight agreement"
    } else if value < 0.40 {
        "Fair agreement"
    } else if value < 0.60 {
        "Moderate agreement"
    } else if value < 0.80 {
        "Substantial agreement"
    } else {
        "Almost perfect agreement"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_parsing() {
        assert_eq!(
            "KrippendorffAlphaAgreement".parse::<CodingMeasure>().unwrap(),
            CodingMeasure::KrippendorffAlpha
        );
        assert!("MagicAgreement".parse::<CodingMeasure>().is_err());
    }

    #[test]
    fn test_item_agreement_support() {
        assert!(CodingMeasure::Percentage.supports_item_agreement());
        assert!(CodingMeasure::KrippendorffAlpha.supports_item_agreement());
        assert!(!CodingMeasure::CohenKappa.supports_item_agreement());
        assert!(!CodingMeasure::FleissKappa.supports_item_agreement());
    }

    #[test]
    fn test_interpretation() {
        assert_eq!(agreement_interpretation(-0.1), "Less than chance agreement");
        assert_eq!(agreement_interpretation(0.35), "Fair agreement");
        assert_eq!(agreement_interpretation(0.90), "Almost perfect agreement");
        assert_eq!(agreement_interpretation(f64::NAN), "Undefined agreement");
    }
}
