//! Retrieval index: capability token to registered artifact.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::domain::artifact::{ArtifactName, RetrievalToken};

/// One registered, not-yet-retrieved artifact.
#[derive(Debug, Clone)]
pub struct RegisteredArtifact {
    pub name: ArtifactName,
    pub registered_at: OffsetDateTime,
}

/// Lookup from retrieval token to a transient artifact.
///
/// `resolve_and_consume` removes the entry in the same step as the lookup:
/// of two concurrent retrievals for the same token, exactly one observes the
/// artifact and the other sees nothing. Backends other than the in-memory
/// map only need to preserve that atomicity.
#[async_trait]
pub trait TokenIndex: Send + Sync {
    async fn register(&self, token: RetrievalToken, entry: RegisteredArtifact);

    async fn resolve_and_consume(&self, token: &RetrievalToken) -> Option<RegisteredArtifact>;

    /// Remove and return every entry registered strictly before `cutoff`.
    async fn drain_expired(&self, cutoff: OffsetDateTime) -> Vec<RegisteredArtifact>;
}

/// Process-local index; entries do not survive a restart.
#[derive(Default)]
pub struct InMemoryTokenIndex {
    entries: DashMap<RetrievalToken, RegisteredArtifact>,
}

impl InMemoryTokenIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenIndex for InMemoryTokenIndex {
    async fn register(&self, token: RetrievalToken, entry: RegisteredArtifact) {
        self.entries.insert(token, entry);
    }

    async fn resolve_and_consume(&self, token: &RetrievalToken) -> Option<RegisteredArtifact> {
        self.entries.remove(token).map(|(_token, entry)| entry)
    }

    async fn drain_expired(&self, cutoff: OffsetDateTime) -> Vec<RegisteredArtifact> {
        let expired: Vec<RetrievalToken> = self
            .entries
            .iter()
            .filter(|entry| entry.value().registered_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|token| self.entries.remove(&token).map(|(_token, entry)| entry))
            .collect()
    }
}
