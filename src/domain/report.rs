//! Structured report input.

use indexmap::IndexMap;
use serde::Deserialize;

use super::error::DomainError;

/// One report request: section title mapped to its paragraphs, in order.
///
/// `IndexMap` keeps the order the sections arrived in, so the rendered
/// document reads the same way the caller wrote it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ReportRequest {
    sections: IndexMap<String, Vec<String>>,
}

impl ReportRequest {
    pub fn new(sections: IndexMap<String, Vec<String>>) -> Self {
        Self { sections }
    }

    /// A report must carry at least one section.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sections.is_empty() {
            return Err(DomainError::validation(
                "input data must contain at least one section",
            ));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Sections in the order they were received.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sections
            .iter()
            .map(|(title, paragraphs)| (title.as_str(), paragraphs.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_is_rejected() {
        let request = ReportRequest::default();
        assert!(request.validate().is_err());
        assert!(request.is_empty());
    }

    #[test]
    fn sections_keep_arrival_order() {
        let request: ReportRequest = serde_json::from_str(
            r#"{
                "Zulu": ["last letter"],
                "Alpha": ["first letter"],
                "Mike": ["middle letter"]
            }"#,
        )
        .expect("valid request body");

        let titles: Vec<&str> = request.sections().map(|(title, _)| title).collect();
        assert_eq!(titles, ["Zulu", "Alpha", "Mike"]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn paragraphs_keep_arrival_order() {
        let request: ReportRequest =
            serde_json::from_str(r#"{"Notes": ["one", "two", "three"]}"#).expect("valid body");

        let (_, paragraphs) = request.sections().next().expect("one section");
        assert_eq!(paragraphs, ["one", "two", "three"]);
    }
}
