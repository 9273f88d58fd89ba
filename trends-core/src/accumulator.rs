use crate::tokenizer::Tokenizer;
use crate::types::{CumulativeCounts, NewWordEntry, NewWordsReport, Paper, WordCounts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulation {
    pub cumulative: CumulativeCounts,
    pub new_words: NewWordsReport,
    pub run_counts: WordCounts,
}

/// Sums word occurrences over every title.
pub fn count_words(papers: &[Paper], tokenizer: &Tokenizer) -> WordCounts {
    let mut counts = WordCounts::new();
    for paper in papers {
        for word in tokenizer.tokenize(&paper.title) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    counts
}

/// Merges this run's words into `prior` and reports the words `prior` did
/// not contain before the merge.
pub fn accumulate(prior: CumulativeCounts, papers: &[Paper], tokenizer: &Tokenizer) -> Accumulation {
    let mut run_counts = WordCounts::new();
    let mut new_words = NewWordsReport::new();

    for paper in papers {
        for word in tokenizer.tokenize(&paper.title) {
            if !prior.contains(&word) {
                let entry = new_words
                    .entry(word.clone())
                    .or_insert_with(NewWordEntry::default);
                entry.count += 1;
                if !entry.identifiers.contains(&paper.identifier) {
                    entry.identifiers.push(paper.identifier.clone());
                }
            }
            *run_counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut cumulative = prior;
    for (word, count) in &run_counts {
        cumulative.add(word, *count);
    }

    Accumulation {
        cumulative,
        new_words,
        run_counts,
    }
}
