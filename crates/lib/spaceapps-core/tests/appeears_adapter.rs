use serde_json::json;
use spaceapps_core::appeears::{AppeearsClient, AppeearsConfig};
use spaceapps_core::{AdapterError, ErrorOrigin};
use spaceapps_types::{Coordinate, LayerSelection, PointRequest, TaskStatus, parse_input_date};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_login(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "token": "tok-1",
            "expiration": "2999-01-01T00:00:00Z"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> AppeearsClient {
    let config = AppeearsConfig::new("explorer", "secret").with_base_url(format!("{}/api", server.uri()));
    AppeearsClient::new(config).expect("valid appeears config")
}

fn point_request() -> PointRequest {
    PointRequest {
        task_name: "chicago-lst".to_string(),
        layers: vec![LayerSelection {
            layer: "LST_Day_1km".to_string(),
            product: "MOD11A1.061".to_string(),
        }],
        coordinates: vec![Coordinate {
            id: Some("loop".to_string()),
            category: Some("city".to_string()),
            latitude: 41.88,
            longitude: -87.63,
        }],
        start_date: parse_input_date("2023-06-01").expect("valid date"),
        end_date: parse_input_date("2023-06-30").expect("valid date"),
    }
}

#[tokio::test]
async fn token_is_fetched_once_and_reused() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/product"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"ProductAndVersion": "MOD11A1.061"}
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let products = client.list_products().await.expect("products");
    assert_eq!(products[0]["ProductAndVersion"], "MOD11A1.061");
    client.clone().list_products().await.expect("products again");
}

#[tokio::test]
async fn invalid_credentials_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).list_products().await.expect_err("login rejected");
    assert!(matches!(err, AdapterError::Authentication { .. }));
    assert_eq!(err.to_string(), "Invalid AppEEARS credentials");
}

#[tokio::test]
async fn expired_token_triggers_one_relogin() {
    let server = MockServer::start().await;
    mount_login(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/task/abc"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/task/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "abc",
            "status": "processing"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server).task_status("abc").await.expect("status after relogin");
    assert_eq!(record.status, TaskStatus::Processing);
}

#[tokio::test]
async fn product_layers_map_names_to_descriptions() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/product/MOD11A1.061"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "LST_Day_1km": {"Description": "Land Surface Temperature (day)", "Units": "Kelvin"},
            "LST_Night_1km": {"Description": "Land Surface Temperature (night)"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/product/EMPTY.001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client(&server);
    let layers = client.product_layers("MOD11A1.061").await.expect("layers");
    assert_eq!(layers.len(), 2);
    assert_eq!(layers["LST_Day_1km"], "Land Surface Temperature (day)");

    let err = client.product_layers("EMPTY.001").await.expect_err("no layers");
    assert_eq!(err.to_string(), "AppEEARS error: No layers found for this product.");
}

#[tokio::test]
async fn point_request_is_submitted_with_appeears_dates() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/task"))
        .and(body_partial_json(json!({
            "task_type": "point",
            "task_name": "chicago-lst",
            "params": {"dates": [{"startDate": "06-01-2023", "endDate": "06-30-2023"}]}
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "task_id": "task-123",
            "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/task/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "task-123",
            "status": "pending"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let task_id = client.submit_point_request(&point_request()).await.expect("submitted");
    assert_eq!(task_id, "task-123");

    let first = client.task_status(&task_id).await.expect("status");
    let second = client.task_status(&task_id).await.expect("status again");
    assert!(first.status.progress_rank() <= second.status.progress_rank());
}

async fn mount_task_phase(server: &MockServer, status: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/api/task/task-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "task-9",
            "status": status
        })));
    match times {
        Some(times) => mock.up_to_n_times(times).mount(server).await,
        None => mock.mount(server).await,
    }
}

#[tokio::test]
async fn repeated_status_polls_only_read_and_never_regress() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    mount_task_phase(&server, "pending", Some(1)).await;
    mount_task_phase(&server, "processing", Some(2)).await;
    mount_task_phase(&server, "done", None).await;

    let client = client(&server);
    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(client.task_status("task-9").await.expect("status").status);
    }

    assert_eq!(
        statuses,
        vec![
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Processing,
            TaskStatus::Done,
            TaskStatus::Done,
        ]
    );
    assert!(
        statuses
            .windows(2)
            .all(|pair| pair[0].progress_rank() <= pair[1].progress_rank())
    );

    let requests = server.received_requests().await.expect("request recording");
    let writes: Vec<String> = requests
        .iter()
        .filter(|request| request.method.as_str() != "GET")
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect();
    assert_eq!(writes, vec!["POST /api/login".to_string()]);
}

#[tokio::test]
async fn inverted_date_ranges_are_rejected_locally() {
    let server = MockServer::start().await;
    let mut request = point_request();
    std::mem::swap(&mut request.start_date, &mut request.end_date);

    let err = client(&server).submit_point_request(&request).await.expect_err("inverted");
    assert_eq!(err.origin(), ErrorOrigin::Validation);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn task_listing_forwards_paging() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/task"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"task_id": "a", "status": "done"},
            {"task_id": "b", "status": "queued"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client(&server).list_tasks(Some(2), Some(4)).await.expect("tasks");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].status, TaskStatus::Pending);
}

#[tokio::test]
async fn download_streams_bundle_files_and_skips_failures() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/task/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "abc", "status": "done"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bundle/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "abc",
            "files": [
                {"file_id": "f1", "file_name": "MOD11A1-061-results.csv", "file_size": 11},
                {"file_id": "f2", "file_name": "nested/README.md"},
                {"file_id": "f3", "file_name": "broken.tif"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bundle/abc/f1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"lat,lon,lst".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bundle/abc/f2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"# readme".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bundle/abc/f3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let report = client(&server).download_task("abc", dir.path()).await.expect("download");

    let folder = dir.path().join("task_abc");
    assert_eq!(report.download_folder, folder.display().to_string());
    assert_eq!(report.file_count, 2);
    assert_eq!(report.total_size, 19);
    let csv = std::fs::read_to_string(folder.join("MOD11A1-061-results.csv")).expect("csv written");
    assert_eq!(csv, "lat,lon,lst");
    assert!(folder.join("nested").join("README.md").exists());
}

#[tokio::test]
async fn download_requires_a_finished_task() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/task/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "abc", "status": "processing"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let err = client(&server).download_task("abc", dir.path()).await.expect_err("not done");
    assert!(err.to_string().contains("Task is not complete. Current status: processing"));
    assert!(!dir.path().join("task_abc").exists());
}

#[tokio::test]
async fn download_fails_when_every_file_fails() {
    let server = MockServer::start().await;
    mount_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/task/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "abc", "status": "done"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bundle/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["f1"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bundle/abc/f1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let err = client(&server).download_task("abc", dir.path()).await.expect_err("nothing downloaded");
    assert!(err.to_string().contains("Failed to download any files"));
}
