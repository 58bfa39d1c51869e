//! Source domain model.
//!
//! # Responsibility
//! - Define the canonical record for a document provenance source.
//! - Provide the serializable API projection of a source.
//!
//! # Invariants
//! - `foreign_id` is unique across all sources and never empty.
//! - `users` is sorted and free of duplicates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Surrogate primary key of a source row.
pub type SourceId = i64;

/// Primary key of a user row. Users are owned by the account subsystem;
/// this crate only stores memberships against their ids.
pub type UserId = i64;

/// Primary key of a document row.
pub type DocumentId = i64;

/// A provenance entity that documents are attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Surrogate key, immutable once assigned.
    pub id: SourceId,
    /// Externally meaningful unique identifier. Supplied by the caller or
    /// generated as a random token on creation; never changed afterwards.
    pub foreign_id: String,
    /// Optional display string.
    pub label: Option<String>,
    /// Visibility flag, defaults to true.
    pub public: bool,
    /// Unix epoch milliseconds, set once on creation.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on every mutation.
    pub updated_at: i64,
    /// Ids of users associated with this source, sorted ascending.
    pub users: Vec<UserId>,
}

/// Generates a random token suitable as a `foreign_id`.
pub fn make_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Resolves API URLs for source records.
///
/// The web layer owns routing; core code only needs a way to ask it for
/// the canonical URL of a source.
pub trait SourceUrlResolver {
    fn source_url(&self, id: SourceId) -> String;
}

/// Serializable projection of a source for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceApiView {
    pub api_url: String,
    pub id: SourceId,
    pub foreign_id: String,
    pub label: Option<String>,
    pub public: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Source {
    /// Projects this source into its API representation.
    ///
    /// Pure projection, no side effects.
    pub fn api_view(&self, urls: &impl SourceUrlResolver) -> SourceApiView {
        SourceApiView {
            api_url: urls.source_url(self.id),
            id: self.id,
            foreign_id: self.foreign_id.clone(),
            label: self.label.clone(),
            public: self.public,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{make_token, Source, SourceId, SourceUrlResolver};
    use std::collections::HashSet;

    struct StubUrls;

    impl SourceUrlResolver for StubUrls {
        fn source_url(&self, id: SourceId) -> String {
            format!("/api/1/sources/{id}")
        }
    }

    #[test]
    fn make_token_is_non_empty_and_unique() {
        let tokens: HashSet<String> = (0..100).map(|_| make_token()).collect();
        assert_eq!(tokens.len(), 100);
        assert!(tokens.iter().all(|token| !token.is_empty()));
    }

    #[test]
    fn api_view_projects_all_fields() {
        let source = Source {
            id: 7,
            foreign_id: "acme".to_string(),
            label: Some("ACME Corp".to_string()),
            public: false,
            created_at: 1000,
            updated_at: 2000,
            users: vec![1, 2],
        };

        let view = source.api_view(&StubUrls);
        assert_eq!(view.api_url, "/api/1/sources/7");
        assert_eq!(view.id, 7);
        assert_eq!(view.foreign_id, "acme");
        assert_eq!(view.label.as_deref(), Some("ACME Corp"));
        assert!(!view.public);
        assert_eq!(view.created_at, 1000);
        assert_eq!(view.updated_at, 2000);
    }
}
