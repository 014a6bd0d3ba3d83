//! Inclusion rules: synthesizing implied annotations.
//!
//! A rule `source → [target, ...]` credits each target kind wherever a
//! source-kind span was annotated but the target kind itself was omitted.
//! Rule sources (inline JSON, a file, or the embedded default) resolve
//! once at setup into a plain mapping; the per-document hot path only ever
//! sees [`InclusionRules`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationKind;
use crate::error::{Error, Result};

const EMBEDDED_JSON: &str = include_str!("../resources/inclusion_mapping.json");

/// The compiled-in default mapping: semantic roles imply the entity
/// mention they are anchored on. Parsed once; the asset is validated by
/// the test suite, so a parse failure here is a build defect.
static EMBEDDED_RULES: Lazy<InclusionRules> =
    Lazy::new(|| InclusionRules::parse(EMBEDDED_JSON).expect("embedded inclusion mapping parses"));

/// Where inclusion rules come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSource {
    /// A JSON object literal: `{"SourceKind": ["TargetKind", ...]}`.
    Literal(String),
    /// A file containing such a JSON object.
    Path(PathBuf),
    /// The mapping embedded in the crate.
    Embedded,
}

impl RuleSource {
    /// The embedded default mapping.
    #[must_use]
    pub fn embedded_default() -> Self {
        RuleSource::Embedded
    }

    /// Resolve the source into rules. Any read or parse failure is a
    /// setup-time error.
    pub fn resolve(&self) -> Result<InclusionRules> {
        match self {
            RuleSource::Literal(json) => InclusionRules::parse(json),
            RuleSource::Path(path) => {
                log::info!("Reading inclusion mapping from {}", path.display());
                let json = std::fs::read_to_string(path)?;
                InclusionRules::parse(&json)
            }
            RuleSource::Embedded => {
                log::info!("Using the embedded inclusion mapping");
                Ok(EMBEDDED_RULES.clone())
            }
        }
    }
}

/// A resolved `source kind → target kinds` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionRules {
    rules: BTreeMap<AnnotationKind, Vec<AnnotationKind>>,
}

impl InclusionRules {
    /// Parse rules from a JSON object of kind names. Unknown kind names
    /// are a setup-time error — the kind set is closed.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut rules = BTreeMap::new();
        for (source_name, target_names) in raw {
            let source = parse_kind(&source_name)?;
            let mut targets = Vec::with_capacity(target_names.len());
            for name in &target_names {
                targets.push(parse_kind(name)?);
            }
            rules.insert(source, targets);
        }
        log::info!("Parsed inclusion rules: {rules:?}");
        Ok(Self { rules })
    }

    /// Iterate over `(source, targets)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationKind, &[AnnotationKind])> {
        self.rules
            .iter()
            .map(|(source, targets)| (*source, targets.as_slice()))
    }

    /// Whether no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_kind(name: &str) -> Result<AnnotationKind> {
    AnnotationKind::from_name(name)
        .ok_or_else(|| Error::inclusion_rules(format!("unknown annotation kind: {name}")))
}
