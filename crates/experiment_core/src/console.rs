use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use shared::domain::SessionRecord;
use storage::SessionStore;
use tracing::info;

use crate::{
    export::write_bulk_artifact,
    report::{aggregate_by_condition, AggregateReport},
};

/// Researcher-side utilities over the accumulated sessions.
pub struct ResearcherConsole {
    store: Arc<dyn SessionStore>,
}

impl ResearcherConsole {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn fetch_all(&self) -> Result<Vec<SessionRecord>> {
        let records = self.store.list_all().await?;
        info!(total = records.len(), "fetched stored sessions");
        Ok(records)
    }

    pub async fn export_all(&self, dir: &Path) -> Result<PathBuf> {
        let records = self.fetch_all().await?;
        let path = write_bulk_artifact(dir, &records, Utc::now())
            .await
            .context("failed to write bulk export")?;
        info!(path = %path.display(), total = records.len(), "exported all sessions");
        Ok(path)
    }

    pub async fn clear_all(&self) -> Result<u64> {
        let removed = self.store.clear().await?;
        info!(removed, "cleared stored sessions");
        Ok(removed)
    }

    /// Per-condition counts and means. `None` when nothing has been stored.
    pub async fn analyze(&self) -> Result<Option<AggregateReport>> {
        let records = self.fetch_all().await?;
        if records.is_empty() {
            return Ok(None);
        }
        let report = aggregate_by_condition(&records)?;
        Ok(Some(report))
    }
}
