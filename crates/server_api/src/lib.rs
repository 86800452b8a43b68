use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use shared::{
    domain::Condition,
    error::{ApiError, ErrorCode},
    protocol::{SaveDataRequest, SaveDataResponse},
};
use tracing::{error, info};

#[derive(Clone)]
pub struct ApiContext {
    pub data_dir: PathBuf,
}

/// `participant_<ISO timestamp with ':' and '.' as '-'>_<condition>.json`
pub fn participant_filename(received_at: DateTime<Utc>, condition: Condition) -> String {
    let timestamp = received_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("participant_{timestamp}_{condition}.json")
}

pub fn parse_save_request(body: &[u8]) -> Result<SaveDataRequest, ApiError> {
    if body.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "request body cannot be empty",
        ));
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            ErrorCode::Validation,
            format!("invalid experiment payload: {e}"),
        )
    })
}

pub async fn save_experiment_data(
    ctx: &ApiContext,
    req: &SaveDataRequest,
    received_at: DateTime<Utc>,
) -> Result<SaveDataResponse, ApiError> {
    let filename = participant_filename(received_at, req.condition);
    let path = ctx.data_dir.join(&filename);

    let contents = serde_json::to_string_pretty(req).map_err(|e| {
        error!(error = %e, "failed to encode experiment payload");
        save_failed()
    })?;
    tokio::fs::create_dir_all(&ctx.data_dir)
        .await
        .map_err(|e| {
            error!(data_dir = %ctx.data_dir.display(), error = %e, "failed to create data directory");
            save_failed()
        })?;
    tokio::fs::write(&path, contents).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to write experiment data");
        save_failed()
    })?;

    info!(%filename, condition = %req.condition, "experiment data saved");
    Ok(SaveDataResponse {
        success: true,
        filename,
    })
}

fn save_failed() -> ApiError {
    ApiError::new(ErrorCode::Internal, "failed to save data")
}
