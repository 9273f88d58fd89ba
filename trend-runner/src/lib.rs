use chrono::{DateTime, Utc};
use crossref_client::{ClientSettings, CrossrefApiClient, FetchSettings, PaperFetcher, WorksSource};
use state_store::{build_dashboard_snapshot, PersistedState, StateStore};
use tracing::{debug, info};
use trends_core::{accumulate, AppConfig, CoreError, FetchWindow, Tokenizer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// True when nothing new was fetched and no file was written.
    pub skipped: bool,
    pub papers: usize,
    pub duplicates: usize,
    pub distinct_words: usize,
    pub new_words: usize,
    pub vocabulary: usize,
    pub failed_sources: Vec<String>,
}

/// One invocation: load state, fetch, accumulate, persist.
pub struct DailyRun<S: WorksSource> {
    config: AppConfig,
    store: StateStore,
    fetcher: PaperFetcher<S>,
    tokenizer: Tokenizer,
}

impl DailyRun<CrossrefApiClient> {
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = CrossrefApiClient::new(ClientSettings::from_config(&config))?;
        debug!("Crossref client identifies as {}", client.user_agent());
        Ok(Self::with_source(config, client))
    }

    pub async fn log_request_metrics(&self) {
        let client = self.fetcher.works_source();
        let metrics = client.get_metrics().await;
        info!(
            "Crossref requests: {} total, {} ok, {} failed, {} rate limited, avg {:?}, paced {:?}",
            metrics.total_requests,
            metrics.successful_requests,
            metrics.failed_requests,
            metrics.rate_limited_requests,
            metrics.average_response_time(),
            client.total_pacing_wait().await
        );
        for (issn, source) in &metrics.by_source {
            debug!(
                "ISSN {}: {} request(s), {} failed, slowest {:?}, last status {:?}",
                issn, source.requests, source.failures, source.slowest, source.last_status_code
            );
        }
    }
}

impl<S: WorksSource> DailyRun<S> {
    pub fn with_source(config: AppConfig, source: S) -> Self {
        let fetcher = PaperFetcher::new(
            source,
            config.sources.clone(),
            FetchSettings::from_config(&config),
        );
        Self {
            store: StateStore::new(config.state.clone()),
            tokenizer: Tokenizer::from_config(&config),
            fetcher,
            config,
        }
    }

    pub async fn execute(&self, now: DateTime<Utc>) -> Result<RunSummary, CoreError> {
        let PersistedState {
            cumulative,
            mut seen,
        } = self.store.load()?;

        let window = FetchWindow::trailing_days(now.date_naive(), self.config.lookback_days);
        info!(
            "Fetching works created {} to {} from {} source(s)",
            window.from,
            window.until,
            self.config.sources.len()
        );

        let report = self.fetcher.fetch_new_papers(&window, &mut seen).await;
        let failed_sources = report.failed_sources();

        if report.papers.is_empty() {
            info!("No new papers found. Nothing to update.");
            return Ok(RunSummary {
                skipped: true,
                duplicates: report.duplicates(),
                vocabulary: cumulative.len(),
                failed_sources,
                ..RunSummary::default()
            });
        }

        let accumulation = accumulate(cumulative, &report.papers, &self.tokenizer);
        let summary = RunSummary {
            skipped: false,
            papers: report.papers.len(),
            duplicates: report.duplicates(),
            distinct_words: accumulation.run_counts.len(),
            new_words: accumulation.new_words.len(),
            vocabulary: accumulation.cumulative.len(),
            failed_sources,
        };

        let snapshot = build_dashboard_snapshot(
            &accumulation.cumulative,
            accumulation.new_words,
            self.config.dashboard_top_n,
            now,
        );
        let state = PersistedState {
            cumulative: accumulation.cumulative,
            seen,
        };
        self.store.save(&state, &snapshot)?;

        info!(
            "Processed {} papers: {} distinct words, {} new, vocabulary now {}",
            summary.papers, summary.distinct_words, summary.new_words, summary.vocabulary
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use crossref_client::{CrossrefWork, WorksMessage};
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use trends_core::{
        CrossrefApiError, CumulativeCounts, DashboardSnapshot, SeenIdentifiers, StatePaths,
    };

    /// First page only; a missing ISSN fails like an unreachable journal.
    struct StubSource {
        works: HashMap<String, Vec<CrossrefWork>>,
    }

    #[async_trait]
    impl WorksSource for StubSource {
        async fn fetch_works_page(
            &self,
            issn: &str,
            _window: &FetchWindow,
            _cursor: &str,
            _rows: u32,
        ) -> Result<WorksMessage, CoreError> {
            match self.works.get(issn) {
                Some(works) => Ok(WorksMessage {
                    items: works.clone(),
                    next_cursor: None,
                    total_results: Some(works.len() as u64),
                }),
                None => Err(CoreError::Crossref(CrossrefApiError::ServerError {
                    status_code: 500,
                })),
            }
        }
    }

    fn stub(entries: &[(&str, Vec<CrossrefWork>)]) -> StubSource {
        StubSource {
            works: entries
                .iter()
                .map(|(issn, works)| (issn.to_string(), works.clone()))
                .collect(),
        }
    }

    fn test_config(dir: &Path, sources: &[&str]) -> AppConfig {
        AppConfig {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            state: StatePaths {
                cumulative_path: dir.join("word_state.json"),
                seen_path: dir.join("seen_dois.json"),
                dashboard_path: dir.join("dashboard_data.json"),
            },
            ..AppConfig::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap()
    }

    fn seed_cumulative(dir: &TempDir, counts: &CumulativeCounts) {
        fs::write(
            dir.path().join("word_state.json"),
            serde_json::to_string(counts).unwrap(),
        )
        .unwrap();
    }

    fn read_json<T: serde::de::DeserializeOwned>(dir: &TempDir, name: &str) -> T {
        serde_json::from_slice(&fs::read(dir.path().join(name)).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_solar_battery_run() {
        let dir = tempfile::tempdir().unwrap();
        seed_cumulative(&dir, &[("solar", 5)].into_iter().collect());

        let source = stub(&[(
            "1476-4687",
            vec![CrossrefWork::new("New Solar Battery Battery", "10.1/abc")],
        )]);
        let run = DailyRun::with_source(test_config(dir.path(), &["1476-4687"]), source);

        let summary = run.execute(now()).await.unwrap();

        assert!(!summary.skipped);
        assert_eq!(summary.papers, 1);
        assert_eq!(summary.new_words, 1);
        assert_eq!(summary.vocabulary, 2);

        let cumulative: CumulativeCounts = read_json(&dir, "word_state.json");
        let expected: CumulativeCounts = [("solar", 6), ("battery", 2)].into_iter().collect();
        assert_eq!(cumulative, expected);

        let seen: SeenIdentifiers = read_json(&dir, "seen_dois.json");
        assert!(seen.contains("10.1/abc"));

        let dashboard: DashboardSnapshot = read_json(&dir, "dashboard_data.json");
        assert_eq!(dashboard.last_updated, "2024-05-02 06:00:00 UTC");
        assert_eq!(dashboard.cumulative.words().collect::<Vec<_>>(), vec!["solar", "battery"]);
        assert_eq!(dashboard.new_words.len(), 1);
        assert_eq!(dashboard.new_words["battery"].count, 2);
        assert_eq!(dashboard.new_words["battery"].identifiers, vec!["10.1/abc"]);
    }

    #[tokio::test]
    async fn test_second_run_does_not_double_count() {
        let dir = tempfile::tempdir().unwrap();
        let works = vec![
            CrossrefWork::new("Solar battery chemistry", "10.1/abc"),
            CrossrefWork::new("Battery recycling", "10.1/def"),
        ];
        let config = test_config(dir.path(), &["1476-4687"]);

        let first = DailyRun::with_source(config.clone(), stub(&[("1476-4687", works.clone())]));
        first.execute(now()).await.unwrap();
        let after_first: CumulativeCounts = read_json(&dir, "word_state.json");

        let mut repeated = works;
        repeated.push(CrossrefWork::new("Battery longevity", "10.1/ghi"));
        let second = DailyRun::with_source(config, stub(&[("1476-4687", repeated)]));
        let summary = second.execute(now()).await.unwrap();

        assert_eq!(summary.papers, 1);
        assert_eq!(summary.duplicates, 2);

        let after_second: CumulativeCounts = read_json(&dir, "word_state.json");
        assert_eq!(after_second.get("battery"), after_first.get("battery") + 1);
        assert_eq!(after_second.get("solar"), after_first.get("solar"));

        // "battery" was known after the first run, "longevity" was not
        let dashboard: DashboardSnapshot = read_json(&dir, "dashboard_data.json");
        assert!(!dashboard.new_words.contains_key("battery"));
        assert!(dashboard.new_words.contains_key("longevity"));
    }

    #[tokio::test]
    async fn test_seen_identifier_never_recounted() {
        let dir = tempfile::tempdir().unwrap();
        let seen: SeenIdentifiers = ["10.1038/ABC"].into_iter().collect();
        fs::write(
            dir.path().join("seen_dois.json"),
            serde_json::to_string(&seen).unwrap(),
        )
        .unwrap();
        seed_cumulative(&dir, &[("solar", 1), ("battery", 1)].into_iter().collect());

        let run = DailyRun::with_source(
            test_config(dir.path(), &["1476-4687"]),
            stub(&[(
                "1476-4687",
                vec![CrossrefWork::new("Solar battery", "10.1038/ABC")],
            )]),
        );

        let summary = run.execute(now()).await.unwrap();

        assert!(summary.skipped);
        assert_eq!(summary.duplicates, 1);
        let cumulative: CumulativeCounts = read_json(&dir, "word_state.json");
        assert_eq!(cumulative.get("solar"), 1);
        let after: SeenIdentifiers = read_json(&dir, "seen_dois.json");
        assert_eq!(after, seen);
    }

    #[tokio::test]
    async fn test_cross_source_duplicate_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let shared = CrossrefWork::new("Graphene membranes", "10.1/shared");
        let source = stub(&[
            ("1476-4687", vec![shared.clone()]),
            ("1095-9203", vec![shared]),
        ]);
        let run = DailyRun::with_source(
            test_config(dir.path(), &["1476-4687", "1095-9203"]),
            source,
        );

        let summary = run.execute(now()).await.unwrap();

        assert_eq!(summary.papers, 1);
        let cumulative: CumulativeCounts = read_json(&dir, "word_state.json");
        assert_eq!(cumulative.get("graphene"), 1);
        assert_eq!(cumulative.get("membranes"), 1);
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = stub(&[(
            "1095-9203",
            vec![CrossrefWork::new("Ocean warming trends", "10.1/sci")],
        )]);
        let run = DailyRun::with_source(
            test_config(dir.path(), &["1476-4687", "1095-9203"]),
            source,
        );

        let summary = run.execute(now()).await.unwrap();

        assert_eq!(summary.failed_sources, vec!["1476-4687".to_string()]);
        assert_eq!(summary.papers, 1);
        assert!(dir.path().join("dashboard_data.json").exists());
    }

    #[tokio::test]
    async fn test_no_new_papers_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let run = DailyRun::with_source(
            test_config(dir.path(), &["1476-4687"]),
            stub(&[("1476-4687", Vec::new())]),
        );

        let summary = run.execute(now()).await.unwrap();

        assert!(summary.skipped);
        assert!(!dir.path().join("word_state.json").exists());
        assert!(!dir.path().join("seen_dois.json").exists());
        assert!(!dir.path().join("dashboard_data.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_state_aborts_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("seen_dois.json"), "not json").unwrap();
        let run = DailyRun::with_source(
            test_config(dir.path(), &["1476-4687"]),
            stub(&[(
                "1476-4687",
                vec![CrossrefWork::new("Solar battery", "10.1/abc")],
            )]),
        );

        let result = run.execute(now()).await;

        assert!(matches!(result, Err(CoreError::State(_))));
        assert!(!dir.path().join("word_state.json").exists());
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = AppConfig {
            sources: Vec::new(),
            ..AppConfig::default()
        };
        assert!(matches!(
            DailyRun::from_config(config),
            Err(CoreError::Config(_))
        ));
    }
}
