use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::api::AppState;
use crate::error::RelayError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ec2_response: Value,
}

/// Forward a browser multipart upload to the configured EC2 upload endpoint
/// and relay its JSON response verbatim.
///
/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, RelayError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::Forward(e.to_string()))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| RelayError::Forward(e.to_string()))?;
            file = Some((name, data.to_vec()));
            break;
        }
    }

    let (name, data) = file.ok_or(RelayError::MissingField("file"))?;

    let forward_url = state
        .config
        .upload_forward_url
        .as_deref()
        .ok_or_else(|| RelayError::Forward("no upload forward URL configured".to_string()))?;

    let part = reqwest::multipart::Part::bytes(data).file_name(name.clone());
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = state
        .http
        .post(forward_url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| RelayError::Forward(e.to_string()))?;

    let body: Value = response
        .json()
        .await
        .map_err(|e| RelayError::Forward(e.to_string()))?;

    info!("Forwarded upload {} to {}", name, forward_url);
    Ok(Json(UploadResponse { ec2_response: body }))
}
