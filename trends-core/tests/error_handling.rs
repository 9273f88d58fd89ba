use std::path::PathBuf;
use trends_core::{
    ConfigError, CoreError, CrossrefApiError, ErrorExt, ErrorReporter, StateError,
};

fn corrupt_state_error() -> CoreError {
    let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    CoreError::State(StateError::Corrupt {
        path: PathBuf::from("word_state.json"),
        source,
    })
}

#[test]
fn test_error_codes() {
    let crossref_error = CoreError::Crossref(CrossrefApiError::ServerError { status_code: 503 });
    assert_eq!(crossref_error.error_code(), "CROSSREF_SERVER_ERROR");

    assert_eq!(corrupt_state_error().error_code(), "STATE_CORRUPT");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "sources".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG_MISSING_FIELD");

    let not_found = CrossrefApiError::JournalNotFound {
        issn: "0000-0000".to_string(),
    };
    assert_eq!(not_found.error_code(), "CROSSREF_JOURNAL_NOT_FOUND");
}

#[test]
fn test_source_local_errors() {
    let server_error = CoreError::Crossref(CrossrefApiError::ServerError { status_code: 500 });
    assert!(server_error.is_source_local());

    let timeout = CoreError::Crossref(CrossrefApiError::RequestTimeout {
        endpoint: "/journals/1476-4687/works".to_string(),
    });
    assert!(timeout.is_source_local());

    let bad_url = CoreError::Crossref(CrossrefApiError::InvalidUrl {
        details: "relative URL without a base".to_string(),
    });
    assert!(!bad_url.is_source_local());

    assert!(!corrupt_state_error().is_source_local());
}

#[test]
fn test_user_friendly_messages() {
    let not_found = CoreError::Crossref(CrossrefApiError::JournalNotFound {
        issn: "1234-5678".to_string(),
    });
    assert!(not_found.user_friendly_message().contains("1234-5678"));

    let message = corrupt_state_error().user_friendly_message();
    assert!(message.contains("word_state.json"));
    assert!(message.contains("not valid JSON"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "sources".to_string(),
    });
    assert!(config_error.user_friendly_message().contains("sources"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new();
    let error = CoreError::Crossref(CrossrefApiError::RateLimitExceeded { retry_after: 60 });

    // Logging only; nothing to assert beyond not panicking
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
