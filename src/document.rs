//! Documents and annotator views.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;
use crate::span::Span;

/// One annotator's layer over a document.
///
/// Token sequences are positionally aligned across all views of the same
/// document: after compound exclusion, token `i` of one view denotes the
/// same text position as token `i` of any other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct View {
    /// Raw view name; the annotator id is the segment after the last `/`.
    pub name: String,
    /// Ordered token spans of this layer.
    pub tokens: Vec<Span>,
    /// This annotator's span annotations.
    pub annotations: Vec<Annotation>,
    /// Identities of annotations confirmed by review ("fingerprinted").
    #[serde(default)]
    pub fingerprinted: HashSet<u64>,
}

impl View {
    /// Create a view with the given name and tokens.
    #[must_use]
    pub fn new(name: impl Into<String>, tokens: Vec<Span>) -> Self {
        Self {
            name: name.into(),
            tokens,
            annotations: Vec::new(),
            fingerprinted: HashSet::new(),
        }
    }

    /// Append an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Mark an annotation id as fingerprinted.
    #[must_use]
    pub fn with_fingerprint(mut self, id: u64) -> Self {
        self.fingerprinted.insert(id);
        self
    }

    /// The annotator id derived from the raw view name: trimmed, with
    /// everything up to and including the last `/` removed. `None` when
    /// the result is empty — such views never participate.
    #[must_use]
    pub fn annotator_id(&self) -> Option<&str> {
        annotator_id(&self.name)
    }
}

/// Extract the annotator id from a raw view name.
#[must_use]
pub fn annotator_id(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let id = match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// One text with its default token layer and parallel annotator views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier, used in reports and logs.
    pub id: String,
    /// The document text.
    pub text: String,
    /// The default layer's token spans; defines the document length.
    pub tokens: Vec<Span>,
    /// Annotator views.
    pub views: Vec<View>,
}

impl Document {
    /// Create a document with the given id, text and default tokens.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, tokens: Vec<Span>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tokens,
            views: Vec::new(),
        }
    }

    /// Append a view.
    #[must_use]
    pub fn with_view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// Tokenize `text` on ASCII whitespace into token spans. Convenience
    /// for tests and small corpora; real pipelines bring their own
    /// segmentation.
    #[must_use]
    pub fn whitespace_tokens(text: &str) -> Vec<Span> {
        let mut tokens = Vec::new();
        let mut start = None;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    tokens.push(Span::new(s, i));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            tokens.push(Span::new(s, text.len()));
        }
        tokens
    }
}
