//! Error types for deckbench operations.
//!
//! Defines error types for each subsystem:
//! - Benchmark service calls
//! - Counterparty exchanges
//! - LLM API interactions
//! - Configuration loading
//! - Run-level (fatal) and case-level failures

use thiserror::Error;

/// Errors that can occur while talking to the benchmark service.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("HTTP request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("No scenario ids returned")]
    NoScenarios,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during one request/response exchange with the
/// counterparty.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Request to counterparty failed: {0}")]
    Transport(String),

    #[error("Counterparty returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Counterparty error ({code}): {message}")]
    Remote { code: i64, message: String },

    #[error("Malformed counterparty response: {0}")]
    MalformedResponse(String),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Response contained no choices")]
    EmptyResponse,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures that abort an evaluation run before any case is dispatched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Missing <white_agent_url> tag and no counterparty URL configured")]
    MissingCounterparty,

    #[error("Failed to restart benchmark: {0}")]
    Reset(#[source] BenchmarkError),

    #[error("Failed to fetch scenarios: {0}")]
    Listing(#[source] BenchmarkError),
}

/// Failures while handling a single case on the responding side.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("Missing <case_id>.")]
    MissingCaseId,

    #[error("Failed to fetch case data: {0}")]
    FetchCase(#[source] BenchmarkError),

    #[error("LLM failed ({model}): {reason}")]
    Generation { model: String, reason: String },

    #[error("Failed to submit changeset (case_id={case_id}): {source}")]
    Submit {
        case_id: String,
        #[source]
        source: BenchmarkError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_messages() {
        let err = RunError::Listing(BenchmarkError::NoScenarios);
        assert_eq!(err.to_string(), "Failed to fetch scenarios: No scenario ids returned");

        let err = RunError::Reset(BenchmarkError::RequestFailed {
            endpoint: "/scenarios/restart".to_string(),
            reason: "connection refused".to_string(),
        });
        assert!(err.to_string().starts_with("Failed to restart benchmark:"));
    }

    #[test]
    fn test_case_error_messages() {
        let err = CaseError::Submit {
            case_id: "c-1".to_string(),
            source: BenchmarkError::Status {
                endpoint: "/scenarios/submit-changeset".to_string(),
                status: 500,
                body: "boom".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to submit changeset (case_id=c-1): /scenarios/submit-changeset returned status 500: boom"
        );
        assert_eq!(CaseError::MissingCaseId.to_string(), "Missing <case_id>.");
    }
}
