use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Expiry for presigned upload URLs (seconds).
pub const UPLOAD_URL_TTL_SECS: u64 = 300;
/// Expiry for presigned download URLs (seconds).
pub const DOWNLOAD_URL_TTL_SECS: u64 = 3600;
/// Server-side ceiling on remote command execution (seconds). The API never
/// waits this long; it returns once the dispatch is accepted.
pub const EXECUTION_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub storage_config: StorageConfig,
    pub remote_config: RemoteConfig,
    pub frontend_dir: String,
    pub upload_forward_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub instance_id: String,
    pub input_dir: String,
    pub output_dir: String,
    pub inference_image: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000);

        let bucket = env::var("S3_BUCKET").unwrap_or_else(|_| "segmentation-demo-s3".to_string());

        let region = env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let instance_id =
            env::var("GPU_INSTANCE_ID").unwrap_or_else(|_| "i-08b7f1d2c9e4a3f50".to_string());

        let input_dir =
            env::var("REMOTE_INPUT_DIR").unwrap_or_else(|_| "/home/ubuntu/inputs".to_string());

        let output_dir =
            env::var("REMOTE_OUTPUT_DIR").unwrap_or_else(|_| "/home/ubuntu/outputs".to_string());

        let inference_image = env::var("INFERENCE_IMAGE")
            .unwrap_or_else(|_| "segmentation-demo/inference:latest".to_string());

        let frontend_dir =
            env::var("FRONTEND_DIR").unwrap_or_else(|_| "frontend/build".to_string());

        // Only set in the bare-proxy deployment; the /upload route stays off
        // without it.
        let upload_forward_url = env::var("UPLOAD_FORWARD_URL").ok().filter(|s| !s.is_empty());

        Ok(Self {
            api_host,
            api_port,
            storage_config: StorageConfig { bucket, region },
            remote_config: RemoteConfig {
                instance_id,
                input_dir,
                output_dir,
                inference_image,
            },
            frontend_dir,
            upload_forward_url,
        })
    }
}
