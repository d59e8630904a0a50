use std::path::PathBuf;

use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use spaceapps_types::schema::DEFAULT_POINT_TASK_NAME;
use spaceapps_types::{Coordinate, LayerSelection, PointRequest, parse_input_date};
use tracing::info;

use crate::{SpaceAppsMcp, helpers};

/// A product layer to sample.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LayerParams {
    /// Layer name, e.g. `LST_Day_1km`.
    pub layer: String,
    /// Product and version, e.g. `MOD11A1.061`.
    pub product: String,
}

/// Caller-supplied location id; numbers are accepted and sent on as text.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum LocationId {
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(number) => write!(f, "{number}"),
            Self::Decimal(number) => write!(f, "{number}"),
        }
    }
}

/// A location to sample.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LocationParams {
    pub id: Option<LocationId>,
    pub category: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Parameters for a point-sample request.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PointRequestParams {
    pub layers: Vec<LayerParams>,
    pub locations: Vec<LocationParams>,
    /// Start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// End date, `YYYY-MM-DD`.
    pub end_date: String,
    pub task_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductLayersParams {
    /// Product and version, e.g. `MOD11A1.061`.
    pub product_and_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TaskIdParams {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DownloadTaskParams {
    pub task_id: String,
    /// Directory (or file path whose directory) receives the `task_{id}` folder.
    /// Defaults to the server's download directory.
    pub output_path: Option<String>,
}

impl PointRequestParams {
    /// Validates caller input into a [`PointRequest`].
    pub fn into_request(self, default_task_name: &str) -> Result<PointRequest, ErrorData> {
        if self.layers.is_empty() {
            return Err(helpers::invalid_params("at least one layer is required"));
        }
        if self.locations.is_empty() {
            return Err(helpers::invalid_params("at least one location is required"));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        for (position, layer) in self.layers.into_iter().enumerate() {
            let name = helpers::require(&format!("layers[{position}].layer"), &layer.layer)?;
            let product = helpers::require(&format!("layers[{position}].product"), &layer.product)?;
            layers.push(LayerSelection {
                layer: name.to_string(),
                product: product.to_string(),
            });
        }

        let mut coordinates = Vec::with_capacity(self.locations.len());
        for (position, location) in self.locations.into_iter().enumerate() {
            if !(-90.0..=90.0).contains(&location.latitude) || !(-180.0..=180.0).contains(&location.longitude) {
                return Err(helpers::invalid_params(format!(
                    "locations[{position}] is outside valid latitude/longitude ranges"
                )));
            }
            coordinates.push(Coordinate {
                id: location.id.map(|id| id.to_string()),
                category: location.category,
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }

        let start_date = parse_date("start_date", &self.start_date)?;
        let end_date = parse_date("end_date", &self.end_date)?;
        if start_date > end_date {
            return Err(helpers::invalid_params("start_date must not be after end_date"));
        }

        let task_name = self
            .task_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(default_task_name)
            .to_string();

        Ok(PointRequest {
            task_name,
            layers,
            coordinates,
            start_date,
            end_date,
        })
    }
}

fn parse_date(field: &str, value: &str) -> Result<chrono::NaiveDate, ErrorData> {
    parse_input_date(value)
        .map_err(|_| helpers::invalid_params(format!("{field} must be a YYYY-MM-DD date, got {value:?}")))
}

pub fn output_path(raw: Option<&str>) -> Option<PathBuf> {
    raw.map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[tool_router(router = tool_router_appeears, vis = "pub")]
impl SpaceAppsMcp {
    #[tool(description = "List all AppEEARS products.")]
    async fn list_appears_products(&self) -> Result<CallToolResult, ErrorData> {
        info!(tool = "list_appears_products", "tool invoked");
        let result = self.control().appeears().list_products().await;
        helpers::respond("list_appears_products", result.map(|products| json!({ "products": products })))
    }

    #[tool(description = "List the layers of an AppEEARS product, mapping layer names to descriptions.")]
    async fn get_appears_layers(
        &self,
        Parameters(params): Parameters<ProductLayersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let product = helpers::require("product_and_version", &params.product_and_version)?;
        info!(tool = "get_appears_layers", product, "tool invoked");
        let result = self.control().appeears().product_layers(product).await;
        helpers::respond("get_appears_layers", result.map(|layers| json!({ "layers": layers })))
    }

    #[tool(description = "Submit an AppEEARS point-sample request for layers at locations over a YYYY-MM-DD date range. Returns the task id immediately.")]
    async fn submit_appears_point_request(
        &self,
        Parameters(params): Parameters<PointRequestParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = params.into_request(DEFAULT_POINT_TASK_NAME)?;
        info!(tool = "submit_appears_point_request", task_name = %request.task_name, "tool invoked");
        let result = self.control().appeears().submit_point_request(&request).await;
        helpers::respond(
            "submit_appears_point_request",
            result.map(|task_id| {
                json!({
                    "task_id": task_id,
                    "message": format!("Task submitted! Task ID: {task_id}"),
                })
            }),
        )
    }

    #[tool(description = "Get the current status of an AppEEARS task. Safe to call repeatedly.")]
    async fn get_appears_task_status(
        &self,
        Parameters(params): Parameters<TaskIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let task_id = helpers::require("task_id", &params.task_id)?;
        info!(tool = "get_appears_task_status", task_id, "tool invoked");
        let result = self.control().appeears().task_status(task_id).await;
        helpers::respond(
            "get_appears_task_status",
            result.map(|record| json!({ "task_status": record.raw })),
        )
    }

    #[tool(description = "Download every bundle file of a completed AppEEARS task into a task_{task_id} folder.")]
    async fn download_appears_task(
        &self,
        Parameters(params): Parameters<DownloadTaskParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let task_id = helpers::require("task_id", &params.task_id)?;
        let target = output_path(params.output_path.as_deref());
        info!(tool = "download_appears_task", task_id, ?target, "tool invoked");
        let result = self.control().download_task(task_id, target.as_deref()).await;
        helpers::respond(
            "download_appears_task",
            result.map(|report| {
                let message = format!(
                    "Downloaded {} files to {}",
                    report.file_count, report.download_folder
                );
                let mut body = json!(report);
                body["message"] = json!(message);
                body
            }),
        )
    }
}
