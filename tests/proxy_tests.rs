use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Multipart;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use segmentation_relay::api::{self, AppState};
use segmentation_relay::config::{Config, RemoteConfig, StorageConfig};
use segmentation_relay::dispatch::CommandDispatch;
use segmentation_relay::error::RelayError;
use segmentation_relay::storage::ObjectStore;

struct NoopStore;

#[async_trait]
impl ObjectStore for NoopStore {
    async fn presigned_put_url(
        &self,
        key: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> Result<String, RelayError> {
        Ok(key.to_string())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        _expires_in: Duration,
    ) -> Result<String, RelayError> {
        Ok(key.to_string())
    }

    async fn list_keys(&self, _prefix: &str) -> Result<Vec<String>, RelayError> {
        Ok(vec![])
    }

    async fn delete_key(&self, _key: &str) -> Result<(), RelayError> {
        Ok(())
    }
}

struct NoopDispatch;

#[async_trait]
impl CommandDispatch for NoopDispatch {
    async fn dispatch(
        &self,
        _commands: Vec<String>,
        _execution_timeout: Duration,
    ) -> Result<String, RelayError> {
        Ok("noop".to_string())
    }
}

/// Stand-in for the bare EC2 upload endpoint the proxy forwards to.
async fn upstream_upload(mut multipart: Multipart) -> Json<Value> {
    let mut filename = String::new();
    let mut bytes = 0;

    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("").to_string();
            bytes = field.bytes().await.unwrap().len();
        }
    }

    Json(json!({ "status": "Uploaded", "filename": filename, "bytes": bytes }))
}

async fn spawn_upstream() -> String {
    let app = Router::new().route("/upload", post(upstream_upload));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/upload", addr)
}

fn app_with_forward_url(forward_url: &str) -> Router {
    let config = Config {
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        storage_config: StorageConfig {
            bucket: "segmentation-demo-s3".to_string(),
            region: "us-east-1".to_string(),
        },
        remote_config: RemoteConfig {
            instance_id: "i-08b7f1d2c9e4a3f50".to_string(),
            input_dir: "/home/ubuntu/inputs".to_string(),
            output_dir: "/home/ubuntu/outputs".to_string(),
            inference_image: "segmentation-demo/inference:latest".to_string(),
        },
        frontend_dir: "frontend/build".to_string(),
        upload_forward_url: Some(forward_url.to_string()),
    };

    api::router(AppState {
        config: Arc::new(config),
        store: Arc::new(NoopStore),
        dispatch: Arc::new(NoopDispatch),
        http: reqwest::Client::new(),
    })
}

fn multipart_request(field_name: &str) -> Request<Body> {
    let boundary = "test-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"{f}\"; filename=\"scan.tar.gz\"\r\n\
         Content-Type: application/gzip\r\n\
         \r\n\
         fake-volume-bytes\r\n\
         --{b}--\r\n",
        b = boundary,
        f = field_name
    );

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_forwards_file_and_relays_response() {
    let forward_url = spawn_upstream().await;
    let app = app_with_forward_url(&forward_url);

    let response = app.oneshot(multipart_request("file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ec2_response"]["status"], "Uploaded");
    assert_eq!(body["ec2_response"]["filename"], "scan.tar.gz");
    assert_eq!(body["ec2_response"]["bytes"], "fake-volume-bytes".len());
}

#[tokio::test]
async fn upload_without_file_part_is_rejected() {
    let forward_url = spawn_upstream().await;
    let app = app_with_forward_url(&forward_url);

    let response = app.oneshot(multipart_request("attachment")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "file is required");
}

#[tokio::test]
async fn upload_reports_unreachable_upstream() {
    // Discard port; nothing listens there.
    let app = app_with_forward_url("http://127.0.0.1:9/upload");

    let response = app.oneshot(multipart_request("file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Upload forwarding error"));
}
