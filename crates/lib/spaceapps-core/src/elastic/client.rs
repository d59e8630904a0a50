use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder, Url};
use serde_json::Value;
use spaceapps_types::schema::{ELASTIC_ALIAS, ELASTIC_BULK, ELASTIC_DOC, ELASTIC_SEARCH};
use spaceapps_types::{Document, bulk_body};
use tracing::{debug, info};

use crate::error::{AdapterError, AdapterResult, Service, require};
use crate::http::{build_client, endpoint, parse_base_url, read_json};

use super::ElasticConfig;

/// Thin client over the Elasticsearch REST API.
#[derive(Clone)]
pub struct ElasticClient {
    http: reqwest::Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for ElasticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticClient")
            .field("base", &self.base.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl ElasticClient {
    /// Builds a client with its own HTTP connection pool.
    ///
    /// # Errors
    /// Returns `AdapterError::Configuration` if the URL is invalid.
    pub fn new(config: ElasticConfig) -> AdapterResult<Self> {
        Self::with_http(config, build_client(None)?)
    }

    /// Builds a client on a shared HTTP connection pool.
    ///
    /// # Errors
    /// Returns `AdapterError::Configuration` if the URL is invalid.
    pub fn with_http(config: ElasticConfig, http: reqwest::Client) -> AdapterResult<Self> {
        Ok(Self {
            http,
            base: parse_base_url(Service::Elasticsearch, &config.url)?,
            username: config.username,
            password: config.password,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Lists index names, sorted.
    ///
    /// # Errors
    /// Returns `AdapterError` if the cluster is unreachable or rejects the request.
    pub async fn list_indices(&self) -> AdapterResult<Vec<String>> {
        info!("listing Elasticsearch indices");
        let value = self.send(Method::GET, &[ELASTIC_ALIAS], |request| request).await?;
        let mut names: Vec<String> = value
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    /// Runs a query DSL body against an index and returns the raw response.
    ///
    /// # Errors
    /// Returns `AdapterError` if the input is invalid or the cluster rejects the query.
    pub async fn search(&self, index: &str, query: &Value) -> AdapterResult<Value> {
        let index = require("index", index)?;
        require_object("query", query)?;
        info!(index, "searching Elasticsearch index");
        debug!(%query, "search body");
        self.send(Method::POST, &[index, ELASTIC_SEARCH], |request| request.json(query))
            .await
    }

    /// Indexes a single document with a cluster-assigned id.
    ///
    /// # Errors
    /// Returns `AdapterError` if the input is invalid or the cluster rejects the document.
    pub async fn ingest_document(&self, index: &str, document: &Value) -> AdapterResult<Value> {
        let index = require("index", index)?;
        require_object("document", document)?;
        info!(index, "indexing Elasticsearch document");
        self.send(Method::POST, &[index, ELASTIC_DOC], |request| request.json(document))
            .await
    }

    /// Indexes many documents through the `_bulk` endpoint.
    ///
    /// Per-item failures are reported inside the returned response, not as an error.
    ///
    /// # Errors
    /// Returns `AdapterError` if the input is invalid or the bulk request fails as a whole.
    pub async fn bulk_ingest(&self, index: &str, documents: &[Value]) -> AdapterResult<Value> {
        let index = require("index", index)?;
        if documents.is_empty() {
            return Err(AdapterError::invalid("documents must not be empty"));
        }
        let documents = documents
            .iter()
            .enumerate()
            .map(|(position, source)| {
                require_object(&format!("documents[{position}]"), source)?;
                Ok(Document::new(index, source.clone()))
            })
            .collect::<AdapterResult<Vec<_>>>()?;
        let body = bulk_body(&documents).map_err(|source| AdapterError::Decode {
            service: Service::Elasticsearch,
            source,
        })?;

        info!(index, count = documents.len(), "bulk indexing Elasticsearch documents");
        self.send(Method::POST, &[ELASTIC_BULK], |request| {
            request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"))
                .body(body)
        })
        .await
    }

    async fn send<F>(&self, method: Method, segments: &[&str], build: F) -> AdapterResult<Value>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = endpoint(&self.base, segments)?;
        let mut request = self.http.request(method, url);
        if let Some(username) = self.username.as_deref() {
            request = request.basic_auth(username, self.password.as_deref());
        }
        let response = build(request)
            .send()
            .await
            .map_err(|source| AdapterError::transport(Service::Elasticsearch, source))?;
        read_json(Service::Elasticsearch, response).await
    }
}

fn require_object(field: &str, value: &Value) -> AdapterResult<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(AdapterError::invalid(format!("{field} must be a JSON object")))
    }
}
