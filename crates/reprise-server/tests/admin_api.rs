//! Integration tests for the admin API
//!
//! Each test starts an in-process server on a free port and drives it over HTTP.

use reprise_server::admin_api::{AdminApiServer, AdminState};
use reprise_server::repository::RecordingRepository;
use reprise_server::status::{Mode, ServerStatus};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

struct TestServer {
    base: String,
    client: Client,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(RecordingRepository::new(), None).await
    }

    async fn start_with(repository: RecordingRepository, config_path: Option<PathBuf>) -> Self {
        let status = Arc::new(ServerStatus::new(Mode::Playback, 60));
        let state = Arc::new(AdminState::new(Arc::new(repository), status, config_path));
        let server = AdminApiServer::bind("127.0.0.1:0".parse().unwrap(), state)
            .await
            .expect("bind admin API");
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn put_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let resp = self.client.put(self.url(path)).json(body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post_json(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let resp = self.client.post(self.url(path)).json(body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post_text(&self, path: &str, body: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn put_text(&self, path: &str, body: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }
}

fn order_recording() -> Value {
    json!({
        "comment": "order lookup",
        "responseStrategy": "SEQUENTIAL",
        "requestPattern": {
            "protocol": "^.*$",
            "host": "^.*$",
            "port": "^.*$",
            "path": "^/orders/(?<id>\\d+)$",
            "query": "^.*$",
            "method": "^GET$",
            "header": "^.*$",
            "content": "^.*$"
        },
        "responseTemplates": [
            {"code": "200", "header": "Content-Type: text/plain", "content": "order $path:id$"},
            {"code": "503", "content": "busy"}
        ],
        "originalRequest": {
            "protocol": "http",
            "host": "shop.local",
            "port": "80",
            "path": "/orders/7",
            "query": "",
            "method": "GET",
            "header": "",
            "content": ""
        }
    })
}

fn order_request(id: u32) -> Value {
    json!({
        "protocol": "http",
        "host": "shop.local",
        "port": "80",
        "path": format!("/orders/{id}"),
        "query": "",
        "method": "GET",
        "header": "",
        "content": ""
    })
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = server.get("/imposters").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"][0]["code"], "404");
}

#[tokio::test]
async fn test_recording_lifecycle() {
    let server = TestServer::start().await;

    let (status, body) = server.post_json("/recordings/orders/get", &json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["path"], "orders/get");

    let (status, _) = server.post_json("/recordings/orders/get", &json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, outcome) = server.put_json("/recordings/orders/get", &order_recording()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["match_status"], 0);
    assert!(outcome["path"].as_i64().unwrap() >= 0);
    assert!(outcome["method"].as_i64().unwrap() >= 0);

    let (status, stored) = server.get("/recordings/orders/get").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["activated"], false);
    assert_eq!(stored["requestPattern"]["path"], "^/orders/(?<id>\\d+)$");
    assert_eq!(stored["responseTemplates"].as_array().unwrap().len(), 2);

    let (_, listing) = server.get("/recordings").await;
    assert_eq!(listing["orders/get"], false);
    assert_eq!(listing["orders/"], false);

    let (status, body) = server.delete("/recordings/orders/get").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (status, _) = server.get("/recordings/orders/get").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_without_original_reports_no_original() {
    let server = TestServer::start().await;
    let mut recording = order_recording();
    recording.as_object_mut().unwrap().remove("originalRequest");

    let (status, outcome) = server.put_json("/recordings/plain", &recording).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["match_status"], -1);
    assert_eq!(outcome["path"], Value::Null);
}

#[tokio::test]
async fn test_invalid_save_keeps_previous_document() {
    let server = TestServer::start().await;
    server.put_json("/recordings/orders/get", &order_recording()).await;

    let mut broken = order_recording();
    broken["requestPattern"]["query"] = json!("^a=($");
    let (status, body) = server.put_json("/recordings/orders/get", &broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("query"));

    let mut no_templates = order_recording();
    no_templates["responseTemplates"] = json!([]);
    let (status, _) = server.put_json("/recordings/orders/get", &no_templates).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stored) = server.get("/recordings/orders/get").await;
    assert_eq!(stored["requestPattern"]["query"], "^.*$");
}

#[tokio::test]
async fn test_activation_and_sequential_simulation() {
    let server = TestServer::start().await;
    server.put_json("/recordings/orders/get", &order_recording()).await;

    let (status, _) = server.post_json("/simulate", &order_request(42)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, summary) = server
        .put_json("/recordings", &json!({"orders/": true, "missing": true}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary, json!({"loaded": 1, "skipped": 1}));

    let (status, first) = server.post_json("/simulate", &order_request(42)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["recording"], "orders/get");
    assert_eq!(first["templateIndex"], 0);
    assert_eq!(first["code"], "200");
    assert_eq!(first["content"], "order 42");

    let (_, second) = server.post_json("/simulate", &order_request(42)).await;
    assert_eq!(second["templateIndex"], 1);
    assert_eq!(second["code"], "503");

    let (_, third) = server.post_json("/simulate", &order_request(9)).await;
    assert_eq!(third["templateIndex"], 0);
    assert_eq!(third["content"], "order 9");

    let (_, stats) = server.get("/statistics/current?reset=true").await;
    assert_eq!(stats["recordings"][0]["recording"], "orders/get");
    assert_eq!(stats["recordings"][0]["current"], 3);

    let (_, stats) = server.get("/statistics/current").await;
    assert_eq!(stats["recordings"][0]["current"], 0);
    assert_eq!(stats["recordings"][0]["total"], 3);
}

#[tokio::test]
async fn test_save_restarts_sequential_cycle() {
    let server = TestServer::start().await;
    server.put_json("/recordings/orders/get", &order_recording()).await;
    server.put_json("/recordings", &json!({"orders/get": true})).await;

    let (_, first) = server.post_json("/simulate", &order_request(1)).await;
    assert_eq!(first["templateIndex"], 0);

    server.put_json("/recordings/orders/get", &order_recording()).await;
    let (_, after_save) = server.post_json("/simulate", &order_request(1)).await;
    assert_eq!(after_save["templateIndex"], 0);
}

#[tokio::test]
async fn test_move_and_copy() {
    let server = TestServer::start().await;
    server.put_json("/recordings/orders/get", &order_recording()).await;
    server.put_json("/recordings", &json!({"orders/get": true})).await;

    let (status, body) = server.post_text("/recordings_copy/orders/get", "archive/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "archive/get");

    let (status, _) = server.post_text("/recordings_copy/orders/get", "archive/").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server
        .post_text("/recordings_move/orders/get", "\"orders/lookup\"")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "orders/lookup");

    let (_, listing) = server.get("/recordings").await;
    assert_eq!(listing["orders/lookup"], true);
    assert_eq!(listing["archive/get"], false);
    assert!(listing.get("orders/get").is_none());

    let (status, _) = server.post_text("/recordings_move/orders/", "orders/inner/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post_text("/recordings_move/nothing", "elsewhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_tree_and_variables() {
    let server = TestServer::start().await;
    let upload = json!({
        "directory": "shop",
        "recordings": {
            "orders": order_recording(),
            "health": {"responseTemplates": [{"code": "200"}]}
        }
    });
    let (status, body) = server.post_json("/upload", &upload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["imported"], json!(["shop/health", "shop/orders"]));

    let (status, _) = server.post_json("/upload", &upload).await;
    assert_eq!(status, StatusCode::CONFLICT);

    server.put_json("/recordings", &json!({"shop/orders": true})).await;

    let (status, tree) = server.get("/recordings_tree").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["changed"], true);
    assert_eq!(tree["tree"]["root"]["text"], "root (1/2)");
    assert_eq!(tree["tree"]["aggregates"]["shop/"]["files"], 2);
    assert_eq!(tree["tree"]["root"]["children"][0]["id"], "shop/");

    let (_, unchanged) = server.get("/recordings_tree").await;
    assert_eq!(unchanged["changed"], false);
    let (_, forced) = server.get("/recordings_tree?force=true").await;
    assert_eq!(forced["changed"], true);

    let (status, variables) = server.get("/recordings_variables/shop/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        variables,
        json!([{"field": "path", "group": "id", "token": "$path:id$"}])
    );
}

#[tokio::test]
async fn test_percent_encoded_paths() {
    let server = TestServer::start().await;
    let (status, body) = server.post_json("/recordings/my%20orders/get%20one", &json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["path"], "my orders/get one");

    let (status, _) = server.get("/recordings/my%20orders/get%20one").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_snippets() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/snippets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);
    assert_eq!(body["snippets"][0]["pattern"], "\\d+");
    assert!(body["completions"]
        .as_array()
        .unwrap()
        .contains(&json!("(?<name>\\d+)")));
}

#[tokio::test]
async fn test_status_mode_and_interval() {
    let server = TestServer::start().await;
    let (_, status) = server.get("/status").await;
    assert_eq!(status["mode"], "PLAYBACK");
    assert_eq!(status["statisticsInterval"], 60);

    let (code, status) = server.put_text("/status/mode", "playback_or_record").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(status["mode"], "PLAYBACK_OR_RECORD");

    let (code, _) = server.put_text("/status/mode", "REPLAY").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    let (code, status) = server.put_text("/status/statisticsInterval", "15").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(status["statisticsInterval"], 15);

    let (code, _) = server.put_text("/status/statisticsInterval", "0").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_configuration_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reprise.yaml");
    std::fs::write(&path, "logging:\n  level: info\n").unwrap();
    let server = TestServer::start_with(RecordingRepository::new(), Some(path.clone())).await;

    let resp = server.client.get(server.url("/configuration")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "logging:\n  level: info\n");

    let (code, _) = server.put_text("/configuration", "logging:\n  level: loud\n").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "logging:\n  level: info\n"
    );

    let (code, _) = server.put_text("/configuration", "logging:\n  level: debug\n").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "logging:\n  level: debug\n"
    );
}

#[tokio::test]
async fn test_configuration_without_file() {
    let server = TestServer::start().await;
    let (status, _) = server.get("/configuration").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("recordings.json");

    {
        let server =
            TestServer::start_with(RecordingRepository::with_snapshot(&snapshot).unwrap(), None)
                .await;
        let (status, outcome) = server.put_json("/recordings/orders/get", &order_recording()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["match_status"], 0);
        server.put_json("/recordings", &json!({"orders/get": true})).await;
    }

    let server =
        TestServer::start_with(RecordingRepository::with_snapshot(&snapshot).unwrap(), None).await;
    let (_, listing) = server.get("/recordings").await;
    assert_eq!(listing["orders/get"], true);
    let (status, response) = server.post_json("/simulate", &order_request(5)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["content"], "order 5");
}
