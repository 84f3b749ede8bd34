use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// The 56 adjectives of the classic Johari exercise, in presentation order.
const STANDARD_TERMS: [&str; 56] = [
    "Able",
    "Accepting",
    "Adaptable",
    "Bold",
    "Brave",
    "Calm",
    "Caring",
    "Cheerful",
    "Clever",
    "Complex",
    "Confident",
    "Dependable",
    "Dignified",
    "Empathetic",
    "Energetic",
    "Extroverted",
    "Friendly",
    "Giving",
    "Happy",
    "Helpful",
    "Idealistic",
    "Independent",
    "Ingenious",
    "Intelligent",
    "Introverted",
    "Kind",
    "Knowledgeable",
    "Logical",
    "Loving",
    "Mature",
    "Modest",
    "Nervous",
    "Observant",
    "Organized",
    "Patient",
    "Powerful",
    "Proud",
    "Quiet",
    "Reflective",
    "Relaxed",
    "Religious",
    "Responsive",
    "Searching",
    "Self-assertive",
    "Self-conscious",
    "Sensible",
    "Sentimental",
    "Shy",
    "Silly",
    "Spontaneous",
    "Sympathetic",
    "Tense",
    "Trustworthy",
    "Warm",
    "Wise",
    "Witty",
];

/// The fixed, ordered list of descriptors offered to every participant.
///
/// A vocabulary is built once (standard list, custom list, or a file) and
/// never mutated afterwards; it defines both the selectable options and the
/// universe the Unknown quadrant is computed against. Descriptors are
/// case-sensitive and compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    /// The standard 56-adjective list.
    pub fn standard() -> Self {
        Self::from_terms(STANDARD_TERMS.iter().map(|t| t.to_string()))
    }

    /// Build a vocabulary from an ordered list of descriptors.
    ///
    /// Duplicates keep their first position and are dropped afterwards, so
    /// the result is a proper ordered set.
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = std::collections::HashSet::new();
        let terms = terms
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .collect();
        Self { terms }
    }

    /// Read a vocabulary from a file with one descriptor per line.
    /// Blank lines are skipped; surrounding whitespace is trimmed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read vocabulary file {}", path.display()))?;
        let vocabulary = Self::from_terms(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
        if vocabulary.is_empty() {
            anyhow::bail!("vocabulary file {} contains no descriptors", path.display());
        }
        Ok(vocabulary)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    /// All descriptors in their fixed presentation order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
