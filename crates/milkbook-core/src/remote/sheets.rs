//! HTTP gateway for the spreadsheet web app

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::decode::decode_snapshot;
use super::wire::push_payload;
use super::{RemoteError, RemoteGateway};
use crate::store::{PendingOperation, RecordSet};
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Clone)]
pub struct SheetsGateway {
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for SheetsGateway {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SheetsGateway")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SheetsGateway {
    /// Gateway for `endpoint`; every request gives up after `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api(parse_api_error(status, &body)))
    }
}

impl RemoteGateway for SheetsGateway {
    async fn pull(&self) -> Result<RecordSet, RemoteError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;
        let response = Self::check(response).await?;

        let body = response.text().await.map_err(classify)?;
        let payload: serde_json::Value = serde_json::from_str(&body).map_err(|error| {
            RemoteError::InvalidPayload(format!("{error}: {}", compact_text(&body)))
        })?;
        decode_snapshot(&payload)
    }

    async fn push(&self, operations: &[PendingOperation]) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&push_payload(operations))
            .send()
            .await
            .map_err(classify)?;
        Self::check(response).await?;
        Ok(())
    }
}

fn classify(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Http(error)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String, RemoteError> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("endpoint must not be empty".to_string())
    })?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
