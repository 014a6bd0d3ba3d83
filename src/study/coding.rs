//! Coding studies: fixed token positions, one label per rater.

use std::collections::BTreeSet;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::study::null_sentinel;

/// Policy for reducing simultaneous multi-label sets at one position into
/// comparable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetSelectionStrategy {
    /// One item per Cartesian-product tuple of the raters' candidate sets.
    All,
    /// Only the tuple with the highest pairwise-averaged nominal
    /// agreement; ties go to the lexicographically smallest tuple.
    Max,
    /// One item per distinct label across all raters' sets; raters holding
    /// the label contribute it, the rest contribute their sentinel.
    Match,
}

impl Default for SetSelectionStrategy {
    fn default() -> Self {
        SetSelectionStrategy::Max
    }
}

impl std::fmt::Display for SetSelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SetSelectionStrategy::All => "ALL",
            SetSelectionStrategy::Max => "MAX",
            SetSelectionStrategy::Match => "MATCH",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SetSelectionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(SetSelectionStrategy::All),
            "MAX" => Ok(SetSelectionStrategy::Max),
            "MATCH" => Ok(SetSelectionStrategy::Match),
            other => Err(Error::parse(format!(
                "unknown set-selection strategy: {other}"
            ))),
        }
    }
}

/// One comparable unit: the ordered per-rater category labels at a
/// position. Silent raters hold their [`null_sentinel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodingItem {
    labels: Vec<String>,
}

impl CodingItem {
    /// Build an item from per-rater labels.
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// The per-rater labels, index-aligned with the study's rater order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of rater slots.
    #[must_use]
    pub fn rater_count(&self) -> usize {
        self.labels.len()
    }

    /// Fraction of rater pairs that assigned the same label, in `[0, 1]`.
    #[must_use]
    pub fn pairwise_agreement(&self) -> f64 {
        pairwise_nominal_agreement(&self.labels)
    }
}

/// Average nominal agreement over all unordered label pairs.
pub(crate) fn pairwise_nominal_agreement<S: AsRef<str>>(labels: &[S]) -> f64 {
    let n = labels.len();
    if n < 2 {
        return 1.0;
    }
    let mut agree = 0usize;
    let mut total = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            total += 1;
            if labels[i].as_ref() == labels[j].as_ref() {
                agree += 1;
            }
        }
    }
    agree as f64 / total as f64
}

/// A categorical study: a bag of [`CodingItem`]s with a fixed rater count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodingStudy {
    rater_count: usize,
    items: Vec<CodingItem>,
}

impl CodingStudy {
    /// Create an empty study for `rater_count` raters.
    #[must_use]
    pub fn new(rater_count: usize) -> Self {
        Self {
            rater_count,
            items: Vec::new(),
        }
    }

    /// Number of raters.
    #[must_use]
    pub fn rater_count(&self) -> usize {
        self.rater_count
    }

    /// The study's items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CodingItem] {
        &self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the study holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All labels occurring in the study, sentinels included, sorted.
    #[must_use]
    pub fn labels(&self) -> BTreeSet<&str> {
        self.items
            .iter()
            .flat_map(|item| item.labels.iter().map(String::as_str))
            .collect()
    }

    /// Reduce one position's per-rater candidate sets into items.
    ///
    /// `sets` must be index-aligned with the rater order; an empty set
    /// marks a silent rater. A position where every rater is silent adds
    /// nothing. Returns the index range of the items just added.
    pub fn add_item_sets(
        &mut self,
        sets: &[BTreeSet<String>],
        strategy: SetSelectionStrategy,
    ) -> Range<usize> {
        debug_assert_eq!(sets.len(), self.rater_count);
        let start = self.items.len();
        if sets.iter().all(BTreeSet::is_empty) {
            return start..start;
        }

        match strategy {
            SetSelectionStrategy::All => {
                for tuple in CartesianTuples::new(sets) {
                    self.items.push(CodingItem::new(tuple));
                }
            }
            SetSelectionStrategy::Max => {
                let mut best: Option<(Vec<String>, f64)> = None;
                for tuple in CartesianTuples::new(sets) {
                    let score = pairwise_nominal_agreement(&tuple);
                    // Strict comparison keeps the first (lexicographically
                    // smallest) tuple on ties.
                    if best.as_ref().map_or(true, |(_, b)| score > *b) {
                        best = Some((tuple, score));
                    }
                }
                if let Some((tuple, _)) = best {
                    self.items.push(CodingItem::new(tuple));
                }
            }
            SetSelectionStrategy::Match => {
                let union: BTreeSet<&String> = sets.iter().flatten().collect();
                for label in union {
                    let tuple: Vec<String> = sets
                        .iter()
                        .enumerate()
                        .map(|(rater, set)| {
                            if set.contains(label) {
                                label.clone()
                            } else {
                                null_sentinel(rater)
                            }
                        })
                        .collect();
                    self.items.push(CodingItem::new(tuple));
                }
            }
        }
        start..self.items.len()
    }

    /// Grow the rater count to `rater_count`, filling the new trailing
    /// slots of every existing item with that rater's sentinel.
    ///
    /// Equivalent to having rebuilt the items with the silent raters
    /// present: a sentinel candidate set is a singleton that never matches
    /// another label, so ALL and MATCH outputs gain the same columns and
    /// every MAX tuple's score shifts equally.
    pub fn pad_to(&mut self, rater_count: usize) {
        if rater_count <= self.rater_count {
            return;
        }
        for item in &mut self.items {
            for rater in self.rater_count..rater_count {
                item.labels.push(null_sentinel(rater));
            }
        }
        self.rater_count = rater_count;
    }

    /// Append another study's items, padding both sides to the larger
    /// rater count first.
    pub fn merge(&mut self, mut other: CodingStudy) {
        let target = self.rater_count.max(other.rater_count);
        self.pad_to(target);
        other.pad_to(target);
        self.items.extend(other.items);
    }
}

/// Lexicographic Cartesian-product iterator over per-rater candidate
/// sets. Empty sets stand in for silent raters and yield the sentinel.
struct CartesianTuples {
    choices: Vec<Vec<String>>,
    cursor: Vec<usize>,
    done: bool,
}

impl CartesianTuples {
    fn new(sets: &[BTreeSet<String>]) -> Self {
        let choices: Vec<Vec<String>> = sets
            .iter()
            .enumerate()
            .map(|(rater, set)| {
                if set.is_empty() {
                    vec![null_sentinel(rater)]
                } else {
                    set.iter().cloned().collect()
                }
            })
            .collect();
        let cursor = vec![0; choices.len()];
        let done = choices.is_empty();
        Self {
            choices,
            cursor,
            done,
        }
    }
}

impl Iterator for CartesianTuples {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        if self.done {
            return None;
        }
        let tuple: Vec<String> = self
            .cursor
            .iter()
            .zip(&self.choices)
            .map(|(&i, choices)| choices[i].clone())
            .collect();

        // Odometer increment, least-significant slot last.
        self.done = true;
        for slot in (0..self.cursor.len()).rev() {
            self.cursor[slot] += 1;
            if self.cursor[slot] < self.choices[slot].len() {
                self.done = false;
                break;
            }
            self.cursor[slot] = 0;
        }
        Some(tuple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn labels(item: &CodingItem) -> Vec<&str> {
        item.labels().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "max".parse::<SetSelectionStrategy>().unwrap(),
            SetSelectionStrategy::Max
        );
        assert!("FIRST".parse::<SetSelectionStrategy>().is_err());
    }

    #[test]
    fn test_all_emits_cartesian_product() {
        let mut study = CodingStudy::new(3);
        let range = study.add_item_sets(
            &[set(&["A", "B"]), set(&["A"]), set(&["A", "C"])],
            SetSelectionStrategy::All,
        );
        assert_eq!(range.len(), 4);
        assert_eq!(labels(&study.items()[0]), vec!["A", "A", "A"]);
        assert_eq!(labels(&study.items()[1]), vec!["A", "A", "C"]);
        assert_eq!(labels(&study.items()[2]), vec!["B", "A", "A"]);
        assert_eq!(labels(&study.items()[3]), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_max_prefers_agreeing_tuple() {
        let mut study = CodingStudy::new(3);
        let range = study.add_item_sets(
            &[set(&["A"]), set(&["A", "B"]), set(&["A"])],
            SetSelectionStrategy::Max,
        );
        assert_eq!(range.len(), 1);
        assert_eq!(labels(&study.items()[0]), vec!["A", "A", "A"]);
    }

    #[test]
    fn test_max_tie_break_is_lexicographic() {
        let mut study = CodingStudy::new(2);
        // Every tuple scores 0; the lexicographically smallest wins.
        study.add_item_sets(
            &[set(&["B", "A"]), set(&["D", "C"])],
            SetSelectionStrategy::Max,
        );
        assert_eq!(labels(&study.items()[0]), vec!["A", "C"]);
    }

    #[test]
    fn test_match_pairs_and_leftovers() {
        let mut study = CodingStudy::new(2);
        let range = study.add_item_sets(
            &[set(&["A", "B"]), set(&["A"])],
            SetSelectionStrategy::Match,
        );
        assert_eq!(range.len(), 2);
        assert_eq!(labels(&study.items()[0]), vec!["A", "A"]);
        assert_eq!(labels(&study.items()[1]), vec!["B", "1<null>"]);
    }

    #[test]
    fn test_match_on_full_agreement() {
        let mut study = CodingStudy::new(3);
        let range = study.add_item_sets(
            &[set(&["A", "B"]), set(&["A", "B"]), set(&["A", "B"])],
            SetSelectionStrategy::Match,
        );
        // max(|sets|) items when all raters agree.
        assert_eq!(range.len(), 2);
        assert_eq!(labels(&study.items()[0]), vec!["A", "A", "A"]);
        assert_eq!(labels(&study.items()[1]), vec!["B", "B", "B"]);
    }

    #[test]
    fn test_silent_rater_gets_sentinel() {
        let mut study = CodingStudy::new(2);
        study.add_item_sets(&[set(&["A"]), set(&[])], SetSelectionStrategy::All);
        assert_eq!(labels(&study.items()[0]), vec!["A", "1<null>"]);
    }

    #[test]
    fn test_all_silent_position_is_skipped() {
        let mut study = CodingStudy::new(2);
        let range = study.add_item_sets(&[set(&[]), set(&[])], SetSelectionStrategy::All);
        assert!(range.is_empty());
        assert!(study.is_empty());
    }

    #[test]
    fn test_pad_and_merge() {
        let mut a = CodingStudy::new(2);
        a.add_item_sets(&[set(&["A"]), set(&["A"])], SetSelectionStrategy::Max);

        let mut b = CodingStudy::new(3);
        b.add_item_sets(
            &[set(&["B"]), set(&["B"]), set(&["B"])],
            SetSelectionStrategy::Max,
        );

        a.merge(b);
        assert_eq!(a.rater_count(), 3);
        assert_eq!(a.len(), 2);
        assert_eq!(labels(&a.items()[0]), vec!["A", "A", "2<null>"]);
        assert_eq!(labels(&a.items()[1]), vec!["B", "B", "B"]);
    }
}
