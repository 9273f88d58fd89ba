//! Title normalization.
//!
//! Titles are reduced to lowercase word tokens: inline markup tags are
//! dropped, punctuation other than hyphens is deleted, tokens are split on
//! whitespace and trimmed of outer hyphens, then numeric, short, and stopword
//! tokens are filtered out.

use crate::config::AppConfig;
use std::collections::HashSet;

pub const DEFAULT_MIN_TOKEN_LEN: usize = 3;

/// English stopwords, apostrophes already removed so contractions match
/// after punctuation stripping.
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "youre", "youve",
    "youll", "youd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "shes", "her", "hers", "herself", "it", "its", "itself", "they", "them", "their",
    "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "thatll", "these",
    "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "dont", "should", "shouldve", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "arent", "couldn", "couldnt", "didn",
    "didnt", "doesn", "doesnt", "hadn", "hadnt", "hasn", "hasnt", "haven", "havent", "isn",
    "isnt", "ma", "mightn", "mightnt", "mustn", "mustnt", "needn", "neednt", "shan", "shant",
    "shouldn", "shouldnt", "wasn", "wasnt", "weren", "werent", "won", "wont", "wouldn",
    "wouldnt",
];

/// Filler words that show up in almost every paper title.
const ACADEMIC_STOPWORDS: &[&str] = &[
    "using", "based", "study", "effect", "effects", "analysis", "new", "two", "via", "high",
];

#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: HashSet<String>,
    min_len: usize,
}

impl Tokenizer {
    pub fn new(min_len: usize) -> Self {
        let stopwords = ENGLISH_STOPWORDS
            .iter()
            .chain(ACADEMIC_STOPWORDS)
            .map(|w| w.to_string())
            .collect();

        Self { stopwords, min_len }
    }

    pub fn with_extra_stopwords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords
            .extend(extra.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.min_token_len).with_extra_stopwords(&config.extra_stopwords)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn tokenize(&self, title: &str) -> Vec<String> {
        let cleaned: String = strip_markup(title)
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-')
            .collect::<String>()
            .to_lowercase();

        cleaned
            .split_whitespace()
            .map(|token| token.trim_matches('-'))
            .filter(|token| !is_numeric(token))
            .filter(|token| token.chars().count() >= self.min_len)
            .filter(|token| !self.is_stopword(token))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TOKEN_LEN)
    }
}

/// Empty tokens count as numeric so they get dropped too.
fn is_numeric(token: &str) -> bool {
    token.chars().all(|c| c.is_numeric() || c == '-')
}

/// Drops `<...>` tags (Crossref titles carry `<i>`, `<sub>` and friends).
/// A `<` with no closing `>` is left for the punctuation pass.
fn strip_markup(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut rest = title;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
