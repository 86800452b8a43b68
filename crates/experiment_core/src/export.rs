use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use shared::{
    domain::SessionRecord,
    protocol::{SaveDataRequest, SaveDataResponse, SAVE_DATA_ROUTE},
};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::error::ExportError;

/// `halo-effect-data-<participant>-<epoch millis>.json`
pub fn artifact_filename(participant_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "halo-effect-data-{}-{}.json",
        filename_safe(participant_id),
        at.timestamp_millis()
    )
}

/// `halo-effect-all-data-<epoch millis>.json`
pub fn bulk_artifact_filename(at: DateTime<Utc>) -> String {
    format!("halo-effect-all-data-{}.json", at.timestamp_millis())
}

fn filename_safe(participant_id: &str) -> String {
    participant_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn render_artifact<T: Serialize + ?Sized>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_artifact(
    dir: &Path,
    filename: &str,
    contents: &str,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(filename);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExportError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

pub async fn write_session_artifact(
    dir: &Path,
    record: &SessionRecord,
    at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let contents = render_artifact(record)?;
    write_artifact(dir, &artifact_filename(&record.participant_id, at), &contents).await
}

pub async fn write_bulk_artifact(
    dir: &Path,
    records: &[SessionRecord],
    at: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let contents = render_artifact(records)?;
    write_artifact(dir, &bulk_artifact_filename(at), &contents).await
}

/// HTTP client for the local persistence service.
#[derive(Clone)]
pub struct PersistenceClient {
    http: Client,
    endpoint: Url,
}

impl PersistenceClient {
    pub fn new(server_url: &str) -> Result<Self, ExportError> {
        let endpoint = Url::parse(server_url)?.join(SAVE_DATA_ROUTE)?;
        Ok(Self {
            http: Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn submit(&self, request: &SaveDataRequest) -> Result<SaveDataResponse, ExportError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.json().await?)
    }

    /// Sends the payload on a background task. The outcome is only logged;
    /// the handle exists so callers that care (tests, shutdown) can wait.
    pub fn submit_detached(&self, request: SaveDataRequest) -> JoinHandle<Option<SaveDataResponse>> {
        let client = self.clone();
        tokio::spawn(async move {
            match client.submit(&request).await {
                Ok(response) => {
                    info!(filename = %response.filename, "session persisted");
                    Some(response)
                }
                Err(error) => {
                    warn!(endpoint = %client.endpoint, %error, "failed to persist session");
                    None
                }
            }
        })
    }
}

/// Where a finished session goes: an artifact directory, the persistence
/// service, both, or neither.
#[derive(Clone, Default)]
pub struct ExportSink {
    artifact_dir: Option<PathBuf>,
    persistence: Option<PersistenceClient>,
}

impl ExportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub fn with_persistence(mut self, client: PersistenceClient) -> Self {
        self.persistence = Some(client);
        self
    }

    /// Writes the record's artifact if an artifact directory is configured.
    pub async fn download(&self, record: &SessionRecord) -> Result<Option<PathBuf>, ExportError> {
        match &self.artifact_dir {
            Some(dir) => write_session_artifact(dir, record, Utc::now())
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn transmit(
        &self,
        record: &SessionRecord,
    ) -> Option<JoinHandle<Option<SaveDataResponse>>> {
        self.persistence.as_ref().map(|client| {
            client.submit_detached(SaveDataRequest::from_record(record, Utc::now()))
        })
    }
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
