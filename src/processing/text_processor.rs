//! Text normalization: lowercase, strip punctuation, tokenize, drop stopwords

use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// NLTK's English stopword list. Apostrophe forms never survive punctuation
/// stripping but are kept so the set matches the published list.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
    "you've", "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he",
    "him", "his", "himself", "she", "she's", "her", "hers", "herself", "it", "it's",
    "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "that'll", "these", "those", "am", "is", "are",
    "was", "were", "be", "been", "being", "have", "has", "had", "having", "do",
    "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because",
    "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below",
    "to", "from", "up", "down", "in", "out", "on", "off", "over", "under", "again",
    "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t",
    "can", "will", "just", "don", "don't", "should", "should've", "now", "d", "ll",
    "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't",
    "didn", "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't",
    "haven", "haven't", "isn", "isn't", "ma", "mightn", "mightn't", "mustn",
    "mustn't", "needn", "needn't", "shan", "shan't", "shouldn", "shouldn't", "wasn",
    "wasn't", "weren", "weren't", "won", "won't", "wouldn", "wouldn't",
];

pub struct TextNormalizer {
    stop_words: HashSet<&'static str>,
    non_word_regex: Regex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    /// Lowercased text with every non-word, non-space character removed.
    /// This is what gets embedded.
    pub cleaned: String,
    pub tokens: Vec<String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
            non_word_regex: Regex::new(r"[^\w\s]").expect("Invalid punctuation regex"),
        }
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        let cleaned = self.clean_text(text);
        let tokens = self.tokenize(&cleaned);
        NormalizedText { cleaned, tokens }
    }

    /// Lowercase and strip punctuation. Diacritics stored as combining marks
    /// count as word characters and stay.
    pub fn clean_text(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        self.non_word_regex.replace_all(&lowered, "").into_owned()
    }

    /// Split on Unicode word boundaries, dropping stopwords
    pub fn tokenize(&self, cleaned: &str) -> Vec<String> {
        cleaned
            .unicode_words()
            .filter(|word| !self.stop_words.contains(word))
            .map(|word| word.to_string())
            .collect()
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}
