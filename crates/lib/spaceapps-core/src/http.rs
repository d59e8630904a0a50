//! Shared HTTP plumbing for the service adapters.

use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use crate::error::{AdapterError, AdapterResult, Service};

/// Builds the outbound client shared by both adapters.
///
/// # Errors
/// Returns `AdapterError::Configuration` if the TLS backend cannot be initialised.
pub fn build_client(timeout: Option<Duration>) -> AdapterResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().pool_max_idle_per_host(10);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| AdapterError::Configuration(format!("failed to build HTTP client: {err}")))
}

/// Parses a configured service base URL.
///
/// # Errors
/// Returns `AdapterError::Configuration` if the URL is malformed or cannot carry a path.
pub fn parse_base_url(service: Service, raw: &str) -> AdapterResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| AdapterError::Configuration(format!("invalid {service} URL {raw:?}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(AdapterError::Configuration(format!(
            "{service} URL {raw:?} cannot carry a path"
        )));
    }
    Ok(url)
}

/// Appends percent-encoded path segments to a base URL.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> AdapterResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AdapterError::Configuration(format!("URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Reads a response body as JSON, turning non-success statuses into remote errors.
///
/// An empty success body reads as `Value::Null`.
pub(crate) async fn read_json(service: Service, response: reqwest::Response) -> AdapterResult<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| AdapterError::transport(service, source))?;

    if !status.is_success() {
        return Err(AdapterError::status(service, status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|source| AdapterError::Decode { service, source })
}
