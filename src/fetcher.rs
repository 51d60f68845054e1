//! Rate-limited access to one upstream provider.
//!
//! Every outbound call waits until `min_interval` has passed since the start
//! of the previous call on the same fetcher. A throttling response (HTTP 429)
//! sleeps for the cooldown and retries the same call, at most `max_retries`
//! times. Every other failure goes straight back to the caller.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::FetchError;
use crate::model::Provider;

const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// The wire underneath a fetcher. Production uses
/// [`crate::http_client::HttpTransport`].
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<RawResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<RawResponse> {
        (**self).get(url, query, headers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub min_interval: Duration,
    pub cooldown: Duration,
    pub max_retries: u32,
}

impl From<&ProviderConfig> for RateLimitPolicy {
    fn from(cfg: &ProviderConfig) -> Self {
        Self {
            min_interval: cfg.min_interval,
            cooldown: cfg.throttle_cooldown,
            max_retries: cfg.max_retries,
        }
    }
}

pub struct RateLimitedFetcher<T> {
    provider: Provider,
    base_url: String,
    headers: Vec<(String, String)>,
    transport: T,
    policy: RateLimitPolicy,
    last_call: Option<Instant>,
}

impl<T: Transport> RateLimitedFetcher<T> {
    pub fn new(
        provider: Provider,
        base_url: impl Into<String>,
        transport: T,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: Vec::new(),
            transport,
            policy,
            last_call: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Issues `GET {base_url}{endpoint}` and returns the body of a 2xx reply.
    pub fn fetch(&mut self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let query = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>();

        let mut throttled = 0u32;
        loop {
            self.wait_turn();
            debug!(provider = %self.provider, endpoint, "fetch");
            let resp = self
                .transport
                .get(&url, &query, &self.headers)
                .map_err(|err| FetchError::Transport {
                    provider: self.provider,
                    endpoint: endpoint.to_string(),
                    message: format!("{err:#}"),
                })?;

            if resp.status == TOO_MANY_REQUESTS {
                throttled += 1;
                if throttled > self.policy.max_retries {
                    return Err(FetchError::Throttled {
                        provider: self.provider,
                        endpoint: endpoint.to_string(),
                        attempts: throttled,
                    });
                }
                warn!(
                    provider = %self.provider,
                    endpoint,
                    cooldown_secs = self.policy.cooldown.as_secs_f64(),
                    "rate limited, cooling down before retry"
                );
                thread::sleep(self.policy.cooldown);
                continue;
            }

            if !(200..300).contains(&resp.status) {
                return Err(FetchError::Status {
                    provider: self.provider,
                    endpoint: endpoint.to_string(),
                    status: resp.status,
                });
            }
            return Ok(resp.body);
        }
    }

    /// Like [`fetch`](Self::fetch) but decodes JSON. An empty or `null` body
    /// becomes `Value::Null`.
    pub fn fetch_json(&mut self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        let body = self.fetch(endpoint, params)?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|source| FetchError::Decode {
            provider: self.provider,
            endpoint: endpoint.to_string(),
            source,
        })
    }

    fn wait_turn(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.policy.min_interval {
                thread::sleep(self.policy.min_interval - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}
