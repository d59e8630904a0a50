use std::sync::Arc;

use chrono::Utc;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::Value;
use spaceapps_types::schema::{APPEEARS_BUNDLE, APPEEARS_LOGIN, APPEEARS_PRODUCT, APPEEARS_TASK};
use spaceapps_types::{
    BundleFile,
    PointRequest,
    ProductLayers,
    TaskRecord,
    layer_descriptions,
    parse_bundle_listing,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{AdapterError, AdapterResult, Service, require};
use crate::http::{build_client, endpoint, parse_base_url, read_json};

use super::AppeearsConfig;
use super::session::{AuthToken, LoginResponse};

/// Client for the `AppEEARS` REST API.
///
/// Clones share one token cell. The token is fetched lazily and refreshed
/// when it nears expiry or the service answers `401`.
#[derive(Clone)]
pub struct AppeearsClient {
    http: reqwest::Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
    token: Arc<RwLock<Option<AuthToken>>>,
}

impl std::fmt::Debug for AppeearsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppeearsClient")
            .field("base", &self.base.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AppeearsClient {
    /// Builds a client with its own HTTP connection pool.
    ///
    /// # Errors
    /// Returns `AdapterError::Configuration` if the base URL is invalid.
    pub fn new(config: AppeearsConfig) -> AdapterResult<Self> {
        Self::with_http(config, build_client(None)?)
    }

    /// Builds a client on a shared HTTP connection pool.
    ///
    /// # Errors
    /// Returns `AdapterError::Configuration` if the base URL is invalid.
    pub fn with_http(config: AppeearsConfig, http: reqwest::Client) -> AdapterResult<Self> {
        Ok(Self {
            http,
            base: parse_base_url(Service::Appeears, &config.base_url)?,
            username: config.username,
            password: config.password,
            token: Arc::new(RwLock::new(None)),
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Lists every product in the `AppEEARS` catalog.
    ///
    /// # Errors
    /// Returns `AdapterError` on authentication, transport, or service failures.
    pub async fn list_products(&self) -> AdapterResult<Value> {
        info!("listing AppEEARS products");
        let url = endpoint(&self.base, &[APPEEARS_PRODUCT])?;
        self.get_json(url, &[]).await
    }

    /// Lists the layers of a product, keyed by layer name.
    ///
    /// # Errors
    /// Returns `AdapterError` if the product has no layers or the request fails.
    pub async fn product_layers(&self, product_and_version: &str) -> AdapterResult<ProductLayers> {
        let product = require("product_and_version", product_and_version)?;
        info!(product, "listing AppEEARS product layers");
        let url = endpoint(&self.base, &[APPEEARS_PRODUCT, product])?;
        let layers = layer_descriptions(&self.get_json(url, &[]).await?);
        if layers.is_empty() {
            return Err(AdapterError::remote(
                Service::Appeears,
                "No layers found for this product.",
            ));
        }
        Ok(layers)
    }

    /// Submits a point-sample task and returns its id without waiting for it.
    ///
    /// # Errors
    /// Returns `AdapterError::InvalidInput` for an empty or inverted request,
    /// otherwise any authentication, transport, or service failure.
    pub async fn submit_point_request(&self, request: &PointRequest) -> AdapterResult<String> {
        require("task_name", &request.task_name)?;
        if request.layers.is_empty() {
            return Err(AdapterError::invalid("at least one layer is required"));
        }
        if request.coordinates.is_empty() {
            return Err(AdapterError::invalid("at least one location is required"));
        }
        if request.start_date > request.end_date {
            return Err(AdapterError::invalid("start_date must not be after end_date"));
        }

        let payload = request.to_task_payload();
        info!(
            task_name = %request.task_name,
            layers = request.layers.len(),
            locations = request.coordinates.len(),
            "submitting AppEEARS point request"
        );
        debug!(%payload, "task payload");

        let url = endpoint(&self.base, &[APPEEARS_TASK])?;
        let response = self
            .authorized(|token| self.http.post(url.clone()).bearer_auth(token).json(&payload))
            .await?;
        let value = read_json(Service::Appeears, response).await?;
        let task_id = value
            .get("task_id")
            .and_then(Value::as_str)
            .filter(|task_id| !task_id.is_empty())
            .ok_or_else(|| {
                AdapterError::remote(Service::Appeears, "task submission response did not include a task_id")
            })?;
        info!(task_id, "AppEEARS task submitted");
        Ok(task_id.to_string())
    }

    /// Reads the current state of a task. Safe to repeat.
    ///
    /// # Errors
    /// Returns `AdapterError` on authentication, transport, or service failures.
    pub async fn task_status(&self, task_id: &str) -> AdapterResult<TaskRecord> {
        let task_id = require("task_id", task_id)?;
        info!(task_id, "fetching AppEEARS task status");
        let url = endpoint(&self.base, &[APPEEARS_TASK, task_id])?;
        let record = TaskRecord::from_value(self.get_json(url, &[]).await?);
        debug!(task_id, status = %record.status, api_status = %record.api_status, "task status");
        Ok(record)
    }

    /// Lists the account's tasks, newest first as ordered by the service.
    ///
    /// # Errors
    /// Returns `AdapterError` on authentication, transport, or service failures.
    pub async fn list_tasks(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> AdapterResult<Vec<TaskRecord>> {
        info!(?limit, ?offset, "listing AppEEARS tasks");
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let url = endpoint(&self.base, &[APPEEARS_TASK])?;
        match self.get_json(url, &query).await? {
            Value::Array(tasks) => Ok(tasks.into_iter().map(TaskRecord::from_value).collect()),
            Value::Null => Ok(Vec::new()),
            _ => Err(AdapterError::remote(
                Service::Appeears,
                "unexpected task listing format",
            )),
        }
    }

    /// Lists the output files of a task's bundle.
    ///
    /// # Errors
    /// Returns `AdapterError` if the listing cannot be fetched or has an unknown shape.
    pub async fn bundle_files(&self, task_id: &str) -> AdapterResult<Vec<BundleFile>> {
        let task_id = require("task_id", task_id)?;
        info!(task_id, "listing AppEEARS bundle files");
        let url = endpoint(&self.base, &[APPEEARS_BUNDLE, task_id])?;
        let listing = self.get_json(url, &[]).await?;
        parse_bundle_listing(&listing).ok_or_else(|| {
            AdapterError::remote(Service::Appeears, "unexpected bundle listing format")
        })
    }

    /// Deletes a task on the service.
    ///
    /// # Errors
    /// Returns `AdapterError` on authentication, transport, or service failures;
    /// a service that does not support cancellation answers `405`.
    pub async fn cancel_task(&self, task_id: &str) -> AdapterResult<Value> {
        let task_id = require("task_id", task_id)?;
        info!(task_id, "cancelling AppEEARS task");
        let url = endpoint(&self.base, &[APPEEARS_TASK, task_id])?;
        let response = self
            .authorized(|token| self.http.delete(url.clone()).bearer_auth(token))
            .await?;
        read_json(Service::Appeears, response).await
    }

    /// Opens a streaming download of one bundle file.
    pub(super) async fn open_bundle_file(
        &self,
        task_id: &str,
        file_id: &str,
    ) -> AdapterResult<reqwest::Response> {
        let url = endpoint(&self.base, &[APPEEARS_BUNDLE, task_id, file_id])?;
        let response = self
            .authorized(|token| self.http.get(url.clone()).bearer_auth(token))
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AdapterError::status(Service::Appeears, status.as_u16(), &body))
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> AdapterResult<Value> {
        let response = self
            .authorized(|token| self.http.get(url.clone()).bearer_auth(token).query(query))
            .await?;
        read_json(Service::Appeears, response).await
    }

    /// Sends a bearer-authenticated request, replaying it once after a `401`.
    async fn authorized<F>(&self, build: F) -> AdapterResult<reqwest::Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.token().await?;
        let response = build(&token).send().await.map_err(transport)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("AppEEARS rejected the session token; logging in again");
        self.token.write().await.take();
        let token = self.login().await?;
        build(&token).send().await.map_err(transport)
    }

    async fn token(&self) -> AdapterResult<String> {
        let cached = self
            .token
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(Utc::now()))
            .map(|token| token.value.clone());
        match cached {
            Some(value) => Ok(value),
            None => self.login().await,
        }
    }

    async fn login(&self) -> AdapterResult<String> {
        let (Some(username), Some(password)) = (self.username.as_deref(), self.password.as_deref())
        else {
            return Err(AdapterError::Authentication {
                service: Service::Appeears,
                message: "AppEEARS credentials are not configured".to_string(),
            });
        };

        info!("logging in to AppEEARS");
        let url = endpoint(&self.base, &[APPEEARS_LOGIN])?;
        let response = self
            .http
            .post(url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AdapterError::Authentication {
                service: Service::Appeears,
                message: "Invalid AppEEARS credentials".to_string(),
            });
        }

        let value = read_json(Service::Appeears, response).await?;
        let login: LoginResponse = serde_json::from_value(value).map_err(|source| {
            AdapterError::Decode {
                service: Service::Appeears,
                source,
            }
        })?;
        let token = AuthToken::from_login(login);
        let value = token.value.clone();
        *self.token.write().await = Some(token);
        Ok(value)
    }
}

const fn transport(source: reqwest::Error) -> AdapterError {
    AdapterError::transport(Service::Appeears, source)
}
