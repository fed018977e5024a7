//! Word-list provider backing the demo executable.

use async_trait::async_trait;
use nlp_plugin_core::{
    EditorContent, NlpProvider, SpellingProvider, SpellingResult, Subtype, SuggestionCandidate,
    SuggestionProvider, SuggestionRequestFlags,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Environment variable naming a word list file, one word per line.
pub const WORDS_ENV: &str = "NLP_PLUGIN_DEMO_WORDS";

const BUILTIN_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "and", "are", "because", "been", "before",
    "being", "between", "both", "but", "can", "come", "could", "day", "different", "do", "down",
    "each", "even", "every", "first", "for", "from", "get", "give", "go", "good", "great", "have",
    "hello", "help", "here", "home", "house", "how", "into", "just", "keyboard", "know", "language",
    "later", "letter", "like", "little", "long", "look", "make", "many", "more", "most", "much",
    "must", "name", "never", "new", "night", "now", "number", "only", "other", "over", "people",
    "place", "plugin", "right", "said", "same", "say", "see", "should", "small", "some", "sound",
    "spell", "spelling", "still", "such", "suggest", "suggestion", "take", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "thing", "think", "this", "through", "time",
    "to", "under", "very", "want", "water", "way", "well", "were", "what", "when", "where", "which",
    "while", "with", "word", "work", "world", "would", "write", "year", "you", "your",
];

/// Dictionary provider with edit-distance corrections and prefix completion.
///
/// Accepted candidates rank higher in later suggestions; removed
/// candidates are never offered again.
#[derive(Debug)]
pub struct WordListProvider {
    words: BTreeSet<String>,
    removed: Mutex<HashSet<String>>,
    accepted: Mutex<HashMap<String, u32>>,
}

impl WordListProvider {
    /// Creates a provider over `words`. Words are lowercased; blanks are skipped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            words,
            removed: Mutex::new(HashSet::new()),
            accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Provider over the built-in English word list.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_WORDS)
    }

    /// Loads a word list file. Lines starting with `#` are comments.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(
            content.lines().filter(|line| !line.trim_start().starts_with('#')),
        ))
    }

    /// Loads the file named by [`WORDS_ENV`], or the built-in list if unset.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the named file cannot be read.
    pub fn from_env() -> std::io::Result<Self> {
        match std::env::var_os(WORDS_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::builtin()),
        }
    }

    /// Number of known words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns `true` if `word` is in the dictionary, ignoring case.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    fn is_removed(&self, word: &str) -> bool {
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(word)
    }

    fn accepted_count(&self, word: &str) -> u32 {
        self.accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(word)
            .copied()
            .unwrap_or(0)
    }

    fn corrections(&self, word: &str, limit: usize) -> Vec<String> {
        let mut found: Vec<_> = self
            .words
            .iter()
            .filter(|candidate| within_one_edit(word, candidate) && !self.is_removed(candidate))
            .cloned()
            .collect();
        found.sort_by_key(|w| std::cmp::Reverse(self.accepted_count(w)));
        found.truncate(limit);
        found
    }

    fn completions(&self, prefix: &str) -> Vec<(String, u32)> {
        let mut found: Vec<_> = self
            .words
            .range(prefix.to_string()..)
            .take_while(|w| w.starts_with(prefix))
            .filter(|w| !self.is_removed(w))
            .map(|w| (w.clone(), self.accepted_count(w)))
            .collect();
        found.sort_by(|(a, a_count), (b, b_count)| {
            b_count.cmp(a_count).then(a.len().cmp(&b.len())).then(a.cmp(b))
        });
        found
    }
}

/// Returns `true` if `a` and `b` differ by exactly one insertion, deletion or substitution.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if long.len() - short.len() > 1 || a == b {
        return false;
    }

    let prefix = short.iter().zip(long.iter()).take_while(|(x, y)| x == y).count();
    if short.len() == long.len() {
        short[prefix + 1..] == long[prefix + 1..]
    } else {
        short[prefix..] == long[prefix + 1..]
    }
}

fn confidence(prefix_len: usize, word_len: usize, accepted: u32) -> f64 {
    let missing = word_len.saturating_sub(prefix_len);
    let base = 1.0 / (1.0 + f64::from(u32::try_from(missing).unwrap_or(u32::MAX)));
    base + f64::from(accepted.min(5)) * 0.1
}

#[async_trait]
impl NlpProvider for WordListProvider {
    async fn create(&self) {
        tracing::info!(words = self.words.len(), "word list loaded");
    }

    async fn preload(&self, subtype: &Subtype) {
        tracing::debug!(subtype = subtype.id, locale = %subtype.primary_locale, "preload requested");
    }

    async fn destroy(&self) {
        tracing::info!("word list provider destroyed");
    }
}

#[async_trait]
impl SpellingProvider for WordListProvider {
    async fn spell(
        &self,
        _subtype_id: i64,
        word: &str,
        _preceding_words: &[String],
        _following_words: &[String],
        flags: SuggestionRequestFlags,
    ) -> SpellingResult {
        let word = word.trim().to_lowercase();
        if word.is_empty() || !word.chars().any(char::is_alphabetic) {
            return SpellingResult::unspecified();
        }
        if self.words.contains(&word) {
            return SpellingResult::valid_word();
        }
        let corrections = self.corrections(&word, usize::from(flags.max_suggestion_count));
        let recommended = corrections.len() == 1;
        SpellingResult::typo(corrections, recommended)
    }
}

#[async_trait]
impl SuggestionProvider for WordListProvider {
    async fn suggest(
        &self,
        _subtype_id: i64,
        content: &EditorContent,
        flags: SuggestionRequestFlags,
    ) -> Vec<SuggestionCandidate> {
        let prefix = content.current_word.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        let limit = usize::from(flags.max_suggestion_count);

        let completions = self.completions(&prefix);
        if completions.is_empty() {
            let corrections = self.corrections(&prefix, limit);
            let single = corrections.len() == 1;
            return corrections
                .into_iter()
                .map(|word| SuggestionCandidate {
                    is_eligible_for_auto_commit: single,
                    ..SuggestionCandidate::word(word, 0.5)
                })
                .collect();
        }

        completions
            .into_iter()
            .take(limit)
            .map(|(word, accepted)| {
                let score = confidence(prefix.chars().count(), word.chars().count(), accepted);
                SuggestionCandidate::word(word, score)
            })
            .collect()
    }

    async fn notify_suggestion_accepted(&self, _subtype_id: i64, candidate: &SuggestionCandidate) {
        let word = candidate.text.to_lowercase();
        if self.words.contains(&word) {
            *self
                .accepted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(word)
                .or_default() += 1;
        }
    }

    async fn notify_suggestion_reverted(&self, _subtype_id: i64, candidate: &SuggestionCandidate) {
        let word = candidate.text.to_lowercase();
        let mut accepted = self.accepted.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = accepted.get_mut(&word) {
            *count = count.saturating_sub(1);
        }
    }

    async fn remove_suggestion(&self, _subtype_id: i64, candidate: &SuggestionCandidate) -> bool {
        let word = candidate.text.to_lowercase();
        self.words.contains(&word)
            && self
                .removed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(word)
    }
}
