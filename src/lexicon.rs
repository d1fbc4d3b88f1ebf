//! Pluggable proper-noun lexicon used by the text normalizer (C6).

use std::collections::HashMap;

/// Canonicalizes known proper nouns and acronyms a plain capitalization pass
/// would otherwise get wrong ("usa" -> "USA", "paris" -> "Paris").
pub trait ProperNounLexicon: Send + Sync {
    fn canonicalize(&self, word: &str) -> Option<&str>;
}

/// Built-in lexicon backed by a small bundled word list, with room for
/// caller-supplied overrides layered on top.
pub struct StaticLexicon {
    entries: HashMap<String, String>,
}

impl Default for StaticLexicon {
    fn default() -> Self {
        let mut entries = HashMap::new();
        for word in DEFAULT_ENTRIES {
            entries.insert(word.to_lowercase(), (*word).to_owned());
        }
        Self { entries }
    }
}

impl StaticLexicon {
    pub fn with_overrides(overrides: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut lexicon = Self::default();
        for (k, v) in overrides {
            lexicon.entries.insert(k.to_lowercase(), v);
        }
        lexicon
    }
}

impl ProperNounLexicon for StaticLexicon {
    fn canonicalize(&self, word: &str) -> Option<&str> {
        self.entries.get(&word.to_lowercase()).map(|s| s.as_str())
    }
}

const DEFAULT_ENTRIES: &[&str] = &[
    // Acronyms.
    "USA", "API", "CEO", "CPU", "GPU", "FBI", "CIA", "NASA", "UK", "EU", "UN",
    // Countries.
    "France", "Germany", "Japan", "China", "Canada", "Mexico", "Brazil", "Spain", "Italy",
    // Cities.
    "Paris", "London", "Tokyo", "Berlin", "Madrid", "Rome", "Chicago", "Boston", "Seattle",
];
