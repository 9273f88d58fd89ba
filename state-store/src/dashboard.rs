use chrono::{DateTime, Utc};
use trends_core::{CumulativeCounts, DashboardSnapshot, NewWordsReport, RankedWords};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// The `n` most frequent words, highest count first; equal counts are
/// ordered by word.
pub fn top_words(cumulative: &CumulativeCounts, n: usize) -> RankedWords {
    let mut ranked: Vec<(String, u64)> = cumulative
        .iter()
        .map(|(word, count)| (word.clone(), *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    RankedWords(ranked)
}

pub fn build_dashboard_snapshot(
    cumulative: &CumulativeCounts,
    new_words: NewWordsReport,
    top_n: usize,
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    DashboardSnapshot {
        last_updated: now.format(TIMESTAMP_FORMAT).to_string(),
        cumulative: top_words(cumulative, top_n),
        new_words,
    }
}
