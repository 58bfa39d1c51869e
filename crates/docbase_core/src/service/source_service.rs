//! Source use-case service.
//!
//! # Responsibility
//! - Provide source create/update/delete/lookup APIs over raw JSON input.
//! - Resolve foreign id assignment on creation.
//!
//! # Invariants
//! - Creation is idempotent on `foreign_id`: an existing record is returned
//!   unchanged, without validating the rest of the input.
//! - `foreign_id` is never changed by an update.

use crate::model::forms::{FormError, SourceCreateForm, SourceEditForm};
use crate::model::source::{make_token, Source, SourceId};
use crate::repo::source_repo::{NewSource, RepoError, RepoResult, SourceRepository};
use log::info;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for source use-cases.
#[derive(Debug)]
pub enum SourceServiceError {
    /// Input mapping failed schema validation.
    InvalidInput(FormError),
    /// Target source does not exist.
    SourceNotFound(SourceId),
    /// Persistence-layer failure, propagated unmodified.
    Repo(RepoError),
}

impl Display for SourceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::SourceNotFound(id) => write!(f, "source not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SourceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::SourceNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<FormError> for SourceServiceError {
    fn from(value: FormError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<RepoError> for SourceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::SourceNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Source service facade over repository implementations.
pub struct SourceService<R: SourceRepository> {
    repo: R,
}

impl<R: SourceRepository> SourceService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a source from a caller-supplied mapping.
    ///
    /// When a source with the supplied `foreign_id` already exists, it is
    /// returned unchanged and no validation or mutation happens. Otherwise
    /// the input is validated, a missing `foreign_id` is replaced by a
    /// generated token, and the new record is persisted.
    pub fn create_source(&mut self, data: &Value) -> Result<Source, SourceServiceError> {
        let supplied = data.get("foreign_id").and_then(Value::as_str);
        if let Some(existing) = self.repo.by_foreign_id(supplied)? {
            info!(
                "event=source_create module=service status=ok source_id={} outcome=existing",
                existing.id
            );
            return Ok(existing);
        }

        let parsed = SourceCreateForm::deserialize(data)?;
        let new = NewSource {
            foreign_id: parsed.foreign_id.unwrap_or_else(make_token),
            data: parsed.data,
        };
        let source = self.repo.insert(&new)?;
        info!(
            "event=source_create module=service status=ok source_id={} outcome=created",
            source.id
        );
        Ok(source)
    }

    /// Applies editable fields to an existing source.
    ///
    /// The user association set is replaced, not merged.
    pub fn update_source(
        &mut self,
        id: SourceId,
        data: &Value,
    ) -> Result<Source, SourceServiceError> {
        let parsed = SourceEditForm::deserialize(data)?;
        let source = self.repo.update_data(id, &parsed)?;
        Ok(source)
    }

    /// Removes a source and everything attributed to it.
    pub fn delete_source(&mut self, id: SourceId) -> Result<(), SourceServiceError> {
        self.repo.delete(id)?;
        Ok(())
    }

    /// Gets one source by surrogate key.
    pub fn get_source(&self, id: SourceId) -> RepoResult<Option<Source>> {
        self.repo.by_id(id)
    }

    /// Gets one source by foreign id. `None` yields no result.
    pub fn get_by_foreign_id(&self, foreign_id: Option<&str>) -> RepoResult<Option<Source>> {
        self.repo.by_foreign_id(foreign_id)
    }

    /// Lists sources, optionally restricted to an id set.
    pub fn list_sources(&self, ids: Option<&[SourceId]>) -> RepoResult<Vec<Source>> {
        self.repo.all(ids)
    }

    /// Maps source ids to labels, optionally restricted to an id set.
    pub fn source_labels(
        &self,
        ids: Option<&[SourceId]>,
    ) -> RepoResult<HashMap<SourceId, Option<String>>> {
        self.repo.all_labels(ids)
    }
}
