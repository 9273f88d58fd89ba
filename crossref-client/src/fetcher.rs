//! Polls every configured journal and keeps only works not seen before.
//!
//! Sources are fetched one after another. A source that fails is logged and
//! skipped; whatever it yielded before failing is kept. Every admitted DOI is
//! added to the seen set immediately, so a work listed by two journals (or
//! twice in one listing) is counted once, for the first source that returned
//! it.

use crate::api::{CrossrefWork, WorksSource};
use tracing::{debug, info};
use trends_core::{AppConfig, ErrorExt, ErrorReporter, FetchWindow, Paper, SeenIdentifiers};

const INITIAL_CURSOR: &str = "*";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub rows_per_page: u32,
    pub max_pages_per_source: u32,
}

impl FetchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rows_per_page: config.rows_per_page,
            max_pages_per_source: config.max_pages_per_source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source_id: String,
    pub pages: u32,
    pub items_received: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub incomplete: usize,
    pub error: Option<String>,
}

impl SourceOutcome {
    fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            ..Self::default()
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub papers: Vec<Paper>,
    pub sources: Vec<SourceOutcome>,
}

impl FetchReport {
    pub fn failed_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.failed())
            .map(|s| s.source_id.clone())
            .collect()
    }

    pub fn duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicates).sum()
    }
}

/// Turns raw works into new papers, recording each admitted DOI in `seen`.
pub fn admit_works(
    works: Vec<CrossrefWork>,
    seen: &mut SeenIdentifiers,
    outcome: &mut SourceOutcome,
) -> Vec<Paper> {
    let mut papers = Vec::new();
    for work in works {
        match work.into_paper() {
            None => outcome.incomplete += 1,
            Some(paper) => {
                if seen.insert(paper.identifier.clone()) {
                    outcome.admitted += 1;
                    papers.push(paper);
                } else {
                    outcome.duplicates += 1;
                }
            }
        }
    }
    papers
}

pub struct PaperFetcher<S: WorksSource> {
    source: S,
    sources: Vec<String>,
    settings: FetchSettings,
    reporter: ErrorReporter,
}

impl<S: WorksSource> PaperFetcher<S> {
    pub fn new(source: S, sources: Vec<String>, settings: FetchSettings) -> Self {
        Self {
            source,
            sources,
            settings,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn works_source(&self) -> &S {
        &self.source
    }

    pub async fn fetch_new_papers(
        &self,
        window: &FetchWindow,
        seen: &mut SeenIdentifiers,
    ) -> FetchReport {
        let mut report = FetchReport::default();

        for source_id in &self.sources {
            let (papers, outcome) = self.fetch_source(source_id, window, seen).await;
            info!(
                "ISSN {}: {} new, {} duplicate, {} incomplete over {} page(s){}",
                source_id,
                outcome.admitted,
                outcome.duplicates,
                outcome.incomplete,
                outcome.pages,
                if outcome.failed() { " (skipped after error)" } else { "" }
            );
            report.papers.extend(papers);
            report.sources.push(outcome);
        }

        report
    }

    async fn fetch_source(
        &self,
        source_id: &str,
        window: &FetchWindow,
        seen: &mut SeenIdentifiers,
    ) -> (Vec<Paper>, SourceOutcome) {
        let mut outcome = SourceOutcome::new(source_id);
        let mut papers = Vec::new();
        let mut cursor = INITIAL_CURSOR.to_string();
        let rows = self.settings.rows_per_page;

        loop {
            if outcome.pages >= self.settings.max_pages_per_source {
                debug!(
                    "Stopping ISSN {} at the {} page limit",
                    source_id, self.settings.max_pages_per_source
                );
                break;
            }

            let page = match self
                .source
                .fetch_works_page(source_id, window, &cursor, rows)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    if e.is_source_local() {
                        self.reporter.report_warning(&e);
                    } else {
                        self.reporter.report_error(&e);
                    }
                    outcome.error = Some(e.to_string());
                    break;
                }
            };

            outcome.pages += 1;
            let received = page.items.len();
            outcome.items_received += received;
            papers.extend(admit_works(page.items, seen, &mut outcome));

            match page.next_cursor {
                Some(next) if received > 0 && received as u64 >= u64::from(rows) => {
                    cursor = next;
                }
                _ => break,
            }
        }

        (papers, outcome)
    }
}
