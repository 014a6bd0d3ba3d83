//! Unitizing studies: categorized variable-length spans over a token
//! continuum.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One categorized span marked by one rater.
///
/// Offsets and lengths are token indices over the study's continuum —
/// document-local for per-document studies, shifted by the running
/// document offset for corpus-level studies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitizingUnit {
    /// First token index of the span.
    pub offset: usize,
    /// Number of tokens covered, always ≥ 1.
    pub length: usize,
    /// Rater index, stable within a run.
    pub rater: usize,
    /// Category label.
    pub category: String,
}

impl UnitizingUnit {
    /// Token index one past the last covered token.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// An interval study: a bag of [`UnitizingUnit`]s over a continuum of
/// fixed length, with a fixed rater count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitizingStudy {
    rater_count: usize,
    continuum_length: usize,
    units: Vec<UnitizingUnit>,
}

impl UnitizingStudy {
    /// Create an empty study over a continuum of `continuum_length`
    /// tokens.
    #[must_use]
    pub fn new(rater_count: usize, continuum_length: usize) -> Self {
        Self {
            rater_count,
            continuum_length,
            units: Vec::new(),
        }
    }

    /// Number of raters.
    #[must_use]
    pub fn rater_count(&self) -> usize {
        self.rater_count
    }

    /// Continuum length in tokens.
    #[must_use]
    pub fn continuum_length(&self) -> usize {
        self.continuum_length
    }

    /// Add a unit. `length` must be ≥ 1 and the span must lie on the
    /// continuum.
    pub fn add_unit(
        &mut self,
        offset: usize,
        length: usize,
        rater: usize,
        category: impl Into<String>,
    ) {
        debug_assert!(length >= 1, "unit length must be >= 1");
        debug_assert!(rater < self.rater_count, "rater index out of range");
        debug_assert!(
            offset + length <= self.continuum_length,
            "unit exceeds continuum"
        );
        self.units.push(UnitizingUnit {
            offset,
            length,
            rater,
            category: category.into(),
        });
    }

    /// The study's units in insertion order.
    #[must_use]
    pub fn units(&self) -> &[UnitizingUnit] {
        &self.units
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the study holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All categories occurring in the study, sorted.
    #[must_use]
    pub fn categories(&self) -> BTreeSet<&str> {
        self.units
            .iter()
            .map(|unit| unit.category.as_str())
            .collect()
    }

    /// The units of one rater with the given category, in insertion
    /// order.
    pub fn units_of<'a>(
        &'a self,
        rater: usize,
        category: &'a str,
    ) -> impl Iterator<Item = &'a UnitizingUnit> {
        self.units
            .iter()
            .filter(move |unit| unit.rater == rater && unit.category == category)
    }
}
