pub mod api;
pub mod fetcher;
pub mod metrics;
pub mod rate_limiter;


pub use api::{ClientSettings, CrossrefApiClient, CrossrefWork, WorksMessage, WorksSource};
pub use fetcher::{FetchReport, FetchSettings, PaperFetcher, SourceOutcome};
