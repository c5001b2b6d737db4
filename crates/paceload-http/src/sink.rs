use crate::{classify_error, classify_status, Error, Result};
use async_trait::async_trait;
use paceload_core::{Record, RecordSink, Row, WriteOutcome};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    /// Collection URL; each record is PUT to `{endpoint}/{key}`.
    pub endpoint: String,
    /// Per-request timeout. Expiry counts as a transient failure.
    pub timeout: Duration,
    pub bearer_token: Option<String>,
}

impl HttpSinkConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
            bearer_token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// Writes each row as a JSON document with an idempotent `PUT`.
pub struct HttpSink {
    client: Client,
    endpoint: Url,
    bearer_token: Option<String>,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;

        if endpoint.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(config.endpoint));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            bearer_token: config.bearer_token,
        })
    }

    /// URL for a record, with the key percent-encoded as one path segment.
    pub fn record_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        url
    }
}

#[async_trait]
impl RecordSink<Row> for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn write(&mut self, record: &Row) -> WriteOutcome {
        let url = self.record_url(record.natural_key());

        let mut request = self.client.put(url).json(&record.to_json());
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body = if status.is_success() {
                    String::new()
                } else {
                    response.text().await.unwrap_or_default()
                };
                classify_status(status, &body)
            }
            Err(e) => classify_error(&e),
        }
    }
}
