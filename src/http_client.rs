use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::fetcher::{RawResponse, Transport};

pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

/// Blocking HTTP transport; one instance per provider connection.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            user_agent: user_agent.into(),
        })
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<RawResponse> {
        let mut req = self
            .client
            .get(url)
            .query(query)
            .header(USER_AGENT, self.user_agent.as_str());
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let resp = req.send().context("request failed")?;
        let status = resp.status().as_u16();
        let body = resp.text().context("failed reading body")?;
        Ok(RawResponse { status, body })
    }
}
