//! Artifact identity: unique names and the retrieval tokens derived from them.

use std::fmt::{Display, Formatter};

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique, filesystem-safe name for one generated report artifact.
///
/// Shaped as `report_<uuid>_<YYYYMMDDhhmmss>.pdf`: uniqueness comes from the
/// random identifier, the timestamp keeps stray files attributable when
/// inspecting the artifact directory by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn generate() -> Self {
        let now = OffsetDateTime::now_utc();
        let (year, month, day) = now.to_calendar_date();
        let (hour, minute, second) = now.to_hms();
        Self(format!(
            "report_{}_{year:04}{:02}{day:02}{hour:02}{minute:02}{second:02}.pdf",
            Uuid::new_v4(),
            month as u8,
        ))
    }

    /// Wrap an already-formed name. Callers own the consequences; generated
    /// names should come from [`ArtifactName::generate`].
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArtifactName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public-facing capability for retrieving one registered artifact.
///
/// Deterministically derived from the artifact name by hashing, so equal
/// names always map to the same token and distinct names practically never
/// collide. Possession of the token is the only retrieval check; this is
/// obscurity against casual guessing, not cryptographic access control.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RetrievalToken(String);

impl RetrievalToken {
    pub fn derive(name: &ArtifactName) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Accept a token from the wire. Anything other than exactly 64
    /// lowercase hex characters can never have been issued and is rejected
    /// without touching the index.
    pub fn from_wire(raw: &str) -> Option<Self> {
        let well_formed =
            raw.len() == 64 && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        well_formed.then(|| Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RetrievalToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_unique() {
        let first = ArtifactName::generate();
        let second = ArtifactName::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn generated_names_carry_the_document_suffix() {
        let name = ArtifactName::generate();
        assert!(name.as_str().starts_with("report_"));
        assert!(name.as_str().ends_with(".pdf"));
    }

    #[test]
    fn token_derivation_is_deterministic() {
        let name = ArtifactName::generate();
        assert_eq!(RetrievalToken::derive(&name), RetrievalToken::derive(&name));
    }

    #[test]
    fn distinct_names_yield_distinct_tokens() {
        let first = RetrievalToken::derive(&ArtifactName::from_raw("report_a.pdf"));
        let second = RetrievalToken::derive(&ArtifactName::from_raw("report_b.pdf"));
        assert_ne!(first, second);
    }

    #[test]
    fn tokens_are_64_hex_characters() {
        let token = RetrievalToken::derive(&ArtifactName::generate());
        assert_eq!(token.as_str().len(), 64);
        assert!(token.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn wire_tokens_must_be_full_length_hex() {
        assert!(RetrievalToken::from_wire("deadbeef").is_none());
        assert!(RetrievalToken::from_wire(&"g".repeat(64)).is_none());
        assert!(RetrievalToken::from_wire(&"A".repeat(64)).is_none());

        let issued = RetrievalToken::derive(&ArtifactName::generate());
        assert_eq!(
            RetrievalToken::from_wire(issued.as_str()),
            Some(issued.clone())
        );
    }
}
