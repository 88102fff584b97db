//! Report lifecycle orchestration: build, deliver, register, consume, expire.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::registry::{RegisteredArtifact, TokenIndex};
use crate::application::render::{self, RenderError};
use crate::domain::artifact::{ArtifactName, RetrievalToken};
use crate::domain::error::DomainError;
use crate::domain::report::ReportRequest;
use crate::infra::storage::{ArtifactStore, ArtifactStoreError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("report not found")]
    NotFound,
    #[error("failed to render report: {0}")]
    Render(#[from] RenderError),
    #[error("artifact storage failed: {0}")]
    Storage(ArtifactStoreError),
}

pub struct ReportService {
    index: Arc<dyn TokenIndex>,
    store: Arc<ArtifactStore>,
    retention: Duration,
}

impl ReportService {
    pub fn new(index: Arc<dyn TokenIndex>, store: Arc<ArtifactStore>, retention: Duration) -> Self {
        Self {
            index,
            store,
            retention,
        }
    }

    /// Validate and build one report artifact.
    ///
    /// An empty request is rejected before anything is allocated. A render
    /// or storage failure leaves no file behind: rendering happens fully in
    /// memory and the store persists atomically.
    pub async fn generate(&self, request: &ReportRequest) -> Result<ArtifactName, ReportError> {
        request.validate()?;

        let name = ArtifactName::generate();
        let bytes = render::render_report(request)?;
        self.store
            .store(&name, &bytes)
            .await
            .map_err(ReportError::Storage)?;

        counter!("resoconto_reports_generated_total").increment(1);
        info!(
            target = "resoconto::reports",
            artifact = %name,
            sections = request.section_count(),
            bytes = bytes.len(),
            "report generated"
        );
        Ok(name)
    }

    /// Register the artifact for later one-time retrieval and hand back the
    /// capability token callers will present.
    pub async fn issue_link(&self, name: &ArtifactName) -> RetrievalToken {
        let token = RetrievalToken::derive(name);
        self.index
            .register(
                token.clone(),
                RegisteredArtifact {
                    name: name.clone(),
                    registered_at: OffsetDateTime::now_utc(),
                },
            )
            .await;
        token
    }

    /// Take the artifact bytes for delivery. The backing file is removed
    /// whether or not the read succeeds.
    pub async fn take(&self, name: &ArtifactName) -> Result<Bytes, ReportError> {
        let outcome = self.store.read(name).await;
        if let Err(err) = self.store.remove(name).await {
            warn!(
                target = "resoconto::reports",
                artifact = %name,
                error = %err,
                "failed to remove delivered artifact"
            );
        }

        let bytes = outcome.map_err(read_error_to_report_error)?;
        counter!("resoconto_reports_delivered_total").increment(1);
        Ok(bytes)
    }

    /// Consume a retrieval token and take its artifact.
    ///
    /// The index entry is removed atomically with the lookup, so a second
    /// retrieval for the same token observes NotFound instead of racing the
    /// file deletion.
    pub async fn claim(&self, token: &RetrievalToken) -> Result<(ArtifactName, Bytes), ReportError> {
        let entry = self
            .index
            .resolve_and_consume(token)
            .await
            .ok_or(ReportError::NotFound)?;
        let bytes = self.take(&entry.name).await?;
        Ok((entry.name, bytes))
    }

    /// Remove artifacts whose retrieval link was never used within the
    /// retention window. Returns how many files were removed.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = OffsetDateTime::now_utc() - self.retention;
        let expired = self.index.drain_expired(cutoff).await;

        let mut swept = 0;
        for entry in expired {
            match self.store.remove(&entry.name).await {
                Ok(()) => swept += 1,
                Err(err) => warn!(
                    target = "resoconto::reports",
                    artifact = %entry.name,
                    error = %err,
                    "failed to remove expired artifact"
                ),
            }
        }

        if swept > 0 {
            counter!("resoconto_reports_expired_total").increment(swept as u64);
            info!(
                target = "resoconto::reports",
                swept, "expired report artifacts removed"
            );
        }
        swept
    }
}

fn read_error_to_report_error(err: ArtifactStoreError) -> ReportError {
    match err {
        ArtifactStoreError::Io(ref io) if io.kind() == ErrorKind::NotFound => ReportError::NotFound,
        other => ReportError::Storage(other),
    }
}
