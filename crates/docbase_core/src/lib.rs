//! Persistence core for document provenance sources.
//! This crate is the single source of truth for source CRUD invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::forms::{
    FormError, SourceCreateData, SourceCreateForm, SourceData, SourceEditForm,
};
pub use model::source::{
    make_token, DocumentId, Source, SourceApiView, SourceId, SourceUrlResolver, UserId,
};
pub use repo::source_repo::{
    NewSource, RepoError, RepoResult, SourceRepository, SqliteSourceRepository,
};
pub use service::source_service::{SourceService, SourceServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
