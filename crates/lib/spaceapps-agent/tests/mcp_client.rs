use std::sync::Arc;

use serde_json::{Value, json};
use spaceapps_agent::{McpToolClient, ToolExecutor};
use spaceapps_core::appeears::{AppeearsClient, AppeearsConfig};
use spaceapps_core::control::SpaceAppsControlPlane;
use spaceapps_core::elastic::{ElasticClient, ElasticConfig};
use spaceapps_mcp::server::{McpHttpServerConfig, serve_streamable_http_on};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start_dispatch(backend: &MockServer, download_dir: &std::path::Path) -> String {
    let elastic = ElasticClient::new(ElasticConfig::new(format!("{}/es", backend.uri()))).expect("elastic config");
    let appeears = AppeearsClient::new(
        AppeearsConfig::new("explorer", "secret").with_base_url(format!("{}/api", backend.uri())),
    )
    .expect("appeears config");
    let control = Arc::new(SpaceAppsControlPlane::new(elastic, appeears, download_dir));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let config = McpHttpServerConfig::new(addr);
    tokio::spawn(async move {
        let _ = serve_streamable_http_on(listener, control, config).await;
    });
    format!("http://{addr}/mcp")
}

#[tokio::test]
async fn client_lists_and_calls_dispatch_tools() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/es/_alias"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"readings": {}, "alerts": {}})))
        .mount(&backend)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let url = start_dispatch(&backend, dir.path()).await;

    let client = McpToolClient::connect(&url).await.expect("connect");
    let tools = client.list_tools().await.expect("tools");
    assert_eq!(tools.len(), 19);
    assert!(tools.iter().any(|tool| tool.name == "submit_appears_job_tool"));

    let outcome = client
        .call_tool("list_elastic_indices", Value::Null)
        .await
        .expect("call");
    assert!(!outcome.is_error);
    let body: Value = serde_json::from_str(&outcome.content).expect("json");
    assert_eq!(body["indices"], json!(["alerts", "readings"]));

    client.close().await.expect("close");
}

#[tokio::test]
async fn invalid_arguments_come_back_as_error_outcomes() {
    let backend = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let url = start_dispatch(&backend, dir.path()).await;
    let client = McpToolClient::connect(&url).await.expect("connect");

    let outcome = client
        .call_tool("search_elastic_index", json!({"index": "readings"}))
        .await
        .expect("protocol errors are outcomes");
    assert!(outcome.is_error);
    assert!(outcome.content.starts_with("Error: MCP error"));

    let outcome = client
        .call_tool("search_elastic_index", json!([1, 2, 3]))
        .await
        .expect("bad shape is an outcome");
    assert!(outcome.is_error);

    assert!(backend.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn unreachable_servers_fail_to_connect() {
    let err = McpToolClient::connect("http://127.0.0.1:9/mcp").await.expect_err("no server");
    assert!(err.to_string().starts_with("MCP error"));
}
