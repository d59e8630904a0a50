use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::{SpaceAppsMcp, helpers};

/// Parameters for searching an index with a query DSL object.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchIndexParams {
    pub index: String,
    /// Elasticsearch query DSL body, e.g. `{"query": {"match_all": {}}}`.
    pub query: Map<String, Value>,
}

/// Parameters for indexing a single document.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct IngestDocumentParams {
    pub index: String,
    pub document: Map<String, Value>,
}

/// Parameters for indexing many documents at once.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BulkIngestParams {
    pub index: String,
    pub documents: Vec<Map<String, Value>>,
}

#[tool_router(router = tool_router_elastic, vis = "pub")]
impl SpaceAppsMcp {
    #[tool(description = "List all Elasticsearch indices.")]
    async fn list_elastic_indices(&self) -> Result<CallToolResult, ErrorData> {
        info!(tool = "list_elastic_indices", "tool invoked");
        let result = self.control().elastic().list_indices().await;
        helpers::respond("list_elastic_indices", result.map(|indices| json!({ "indices": indices })))
    }

    #[tool(description = "Search an Elasticsearch index with a query DSL object. Returns the raw search response.")]
    async fn search_elastic_index(
        &self,
        Parameters(params): Parameters<SearchIndexParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let index = helpers::require("index", &params.index)?;
        info!(tool = "search_elastic_index", index, "tool invoked");
        let result = self
            .control()
            .elastic()
            .search(index, &Value::Object(params.query))
            .await;
        helpers::respond("search_elastic_index", result.map(|results| json!({ "results": results })))
    }

    #[tool(description = "Index a single JSON document into an Elasticsearch index.")]
    async fn ingest_elastic_document(
        &self,
        Parameters(params): Parameters<IngestDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let index = helpers::require("index", &params.index)?;
        info!(tool = "ingest_elastic_document", index, "tool invoked");
        let result = self
            .control()
            .elastic()
            .ingest_document(index, &Value::Object(params.document))
            .await;
        helpers::respond("ingest_elastic_document", result.map(|result| json!({ "result": result })))
    }

    #[tool(description = "Index many JSON documents into an Elasticsearch index with one bulk request.")]
    async fn bulk_ingest_elastic(
        &self,
        Parameters(params): Parameters<BulkIngestParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let index = helpers::require("index", &params.index)?;
        if params.documents.is_empty() {
            return Err(helpers::invalid_params("documents must not be empty"));
        }
        info!(tool = "bulk_ingest_elastic", index, count = params.documents.len(), "tool invoked");
        let documents: Vec<Value> = params.documents.into_iter().map(Value::Object).collect();
        let result = self.control().elastic().bulk_ingest(index, &documents).await;
        helpers::respond("bulk_ingest_elastic", result.map(|result| json!({ "result": result })))
    }
}
