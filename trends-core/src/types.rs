use chrono::{Duration, NaiveDate};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet};
use std::fmt;

/// A fetched work that passed title/identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    /// DOI of the work, used for deduplication.
    pub identifier: String,
}

impl Paper {
    pub fn new(title: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            identifier: identifier.into(),
        }
    }
}

/// Per-run word occurrence counts.
pub type WordCounts = BTreeMap<String, u64>;

/// All-time word totals, persisted across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CumulativeCounts(BTreeMap<String, u64>);

impl CumulativeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, word: &str) -> u64 {
        self.0.get(word).copied().unwrap_or(0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains_key(word)
    }

    pub fn add(&mut self, word: &str, count: u64) {
        *self.0.entry(word.to_string()).or_insert(0) += count;
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, u64>> for CumulativeCounts {
    fn from(counts: BTreeMap<String, u64>) -> Self {
        Self(counts)
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CumulativeCounts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(w, c)| (w.into(), c)).collect())
    }
}

/// Identifiers already counted. Only ever grows; serialized sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenIdentifiers(BTreeSet<String>);

impl SeenIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains(identifier)
    }

    /// Returns `false` if the identifier was already present.
    pub fn insert(&mut self, identifier: impl Into<String>) -> bool {
        self.0.insert(identifier.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenIdentifiers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWordEntry {
    pub count: u64,
    /// Identifiers whose title produced the word, in first-seen order.
    #[serde(rename = "dois")]
    pub identifiers: Vec<String>,
}

pub type NewWordsReport = BTreeMap<String, NewWordEntry>;

/// Words with counts in rank order. Serialized as a JSON object whose key
/// order is the rank order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedWords(pub Vec<(String, u64)>);

impl RankedWords {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(w, _)| w.as_str())
    }
}

impl Serialize for RankedWords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(word, count)| (word, count)))
    }
}

impl<'de> Deserialize<'de> for RankedWords {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankedWordsVisitor;

        impl<'de> Visitor<'de> for RankedWordsVisitor {
            type Value = RankedWords;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of word to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RankedWords, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((word, count)) = map.next_entry::<String, u64>()? {
                    entries.push((word, count));
                }
                Ok(RankedWords(entries))
            }
        }

        deserializer.deserialize_map(RankedWordsVisitor)
    }
}

/// Payload read by the dashboard front end. Overwritten every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub last_updated: String,
    pub cumulative: RankedWords,
    pub new_words: NewWordsReport,
}

/// Inclusive creation-date range passed to the works filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: NaiveDate,
    pub until: NaiveDate,
}

impl FetchWindow {
    /// The `days` full days before `today`. `days == 1` is yesterday only.
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let days = i64::from(days.max(1));
        Self {
            from: today - Duration::days(days),
            until: today - Duration::days(1),
        }
    }

    pub fn filter_param(&self) -> String {
        format!(
            "from-created-date:{},until-created-date:{}",
            self.from.format("%Y-%m-%d"),
            self.until.format("%Y-%m-%d")
        )
    }
}
