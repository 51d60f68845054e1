use rusqlite::ErrorCode;
use thiserror::Error;

use crate::model::Provider;

/// Failures reported by [`crate::fetcher::RateLimitedFetcher`]. None of these
/// are retried by the fetcher except throttling, which surfaces as
/// `Throttled` once its retries are spent.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{provider} credentials are not configured")]
    MissingCredentials { provider: Provider },

    #[error("{provider} request to {endpoint} failed: {message}")]
    Transport {
        provider: Provider,
        endpoint: String,
        message: String,
    },

    #[error("{provider} returned http {status} for {endpoint}")]
    Status {
        provider: Provider,
        endpoint: String,
        status: u16,
    },

    #[error("{provider} still rate limited after {attempts} attempts on {endpoint}")]
    Throttled {
        provider: Provider,
        endpoint: String,
        attempts: u32,
    },

    #[error("{provider} sent an unreadable body for {endpoint}: {source}")]
    Decode {
        provider: Provider,
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a single raw item could not become a canonical record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}` value {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// True when the store itself is gone or refuses writes, as opposed to one
/// write failing.
pub fn is_store_unavailable(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        let Some(sql) = cause.downcast_ref::<rusqlite::Error>() else {
            return false;
        };
        matches!(
            sql.sqlite_error_code(),
            Some(
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::PermissionDenied
                    | ErrorCode::ReadOnly
            )
        )
    })
}
