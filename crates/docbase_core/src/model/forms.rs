//! Validation schemas for caller-supplied source mappings.
//!
//! # Responsibility
//! - Deserialize and validate JSON mappings for source create/edit.
//! - Normalize editable fields before they reach persistence.
//!
//! # Invariants
//! - `users` is deduplicated and sorted after validation.
//! - `public` defaults to true when absent or null.
//! - The edit schema never yields a `foreign_id`.

use crate::model::source::UserId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static FOREIGN_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:-]*$").expect("valid foreign id regex"));

const FOREIGN_ID_MAX_CHARS: usize = 128;
const LABEL_MAX_CHARS: usize = 500;

/// Validation error naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The top-level input was not a JSON object.
    NotAnObject,
    /// A field failed its validation rule.
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "source input must be a JSON object"),
            Self::InvalidField { field, reason } => {
                write!(f, "invalid field `{field}`: {reason}")
            }
        }
    }
}

impl Error for FormError {}

/// Editable source fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceData {
    pub label: Option<String>,
    pub public: bool,
    pub users: Vec<UserId>,
}

impl Default for SourceData {
    fn default() -> Self {
        Self {
            label: None,
            public: true,
            users: Vec::new(),
        }
    }
}

/// Validated output of the create schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCreateData {
    /// Caller-supplied foreign id, if any. A missing value means the
    /// repository layer assigns a generated token.
    pub foreign_id: Option<String>,
    pub data: SourceData,
}

/// Schema for source creation input.
pub struct SourceCreateForm;

impl SourceCreateForm {
    pub fn deserialize(value: &Value) -> Result<SourceCreateData, FormError> {
        let map = object_of(value)?;
        Ok(SourceCreateData {
            foreign_id: parse_foreign_id(map)?,
            data: parse_source_data(map)?,
        })
    }
}

/// Schema for source edit input. Ignores `foreign_id` if present.
pub struct SourceEditForm;

impl SourceEditForm {
    pub fn deserialize(value: &Value) -> Result<SourceData, FormError> {
        let map = object_of(value)?;
        parse_source_data(map)
    }
}

fn object_of(value: &Value) -> Result<&Map<String, Value>, FormError> {
    value.as_object().ok_or(FormError::NotAnObject)
}

fn parse_source_data(map: &Map<String, Value>) -> Result<SourceData, FormError> {
    Ok(SourceData {
        label: parse_label(map)?,
        public: parse_public(map)?,
        users: parse_users(map)?,
    })
}

fn parse_foreign_id(map: &Map<String, Value>) -> Result<Option<String>, FormError> {
    let value = match map.get("foreign_id") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let text = value.as_str().ok_or_else(|| FormError::InvalidField {
        field: "foreign_id",
        reason: "expected a string".to_string(),
    })?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FormError::InvalidField {
            field: "foreign_id",
            reason: "must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > FOREIGN_ID_MAX_CHARS {
        return Err(FormError::InvalidField {
            field: "foreign_id",
            reason: format!("longer than {FOREIGN_ID_MAX_CHARS} characters"),
        });
    }
    if !FOREIGN_ID_RE.is_match(trimmed) {
        return Err(FormError::InvalidField {
            field: "foreign_id",
            reason: "contains characters outside [A-Za-z0-9._:-]".to_string(),
        });
    }

    Ok(Some(trimmed.to_string()))
}

fn parse_label(map: &Map<String, Value>) -> Result<Option<String>, FormError> {
    let value = match map.get("label") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let text = value.as_str().ok_or_else(|| FormError::InvalidField {
        field: "label",
        reason: "expected a string".to_string(),
    })?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > LABEL_MAX_CHARS {
        return Err(FormError::InvalidField {
            field: "label",
            reason: format!("longer than {LABEL_MAX_CHARS} characters"),
        });
    }

    Ok(Some(trimmed.to_string()))
}

fn parse_public(map: &Map<String, Value>) -> Result<bool, FormError> {
    match map.get("public") {
        None | Some(Value::Null) => Ok(true),
        Some(value) => value.as_bool().ok_or_else(|| FormError::InvalidField {
            field: "public",
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_users(map: &Map<String, Value>) -> Result<Vec<UserId>, FormError> {
    let value = match map.get("users") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(value) => value,
    };

    let items = value.as_array().ok_or_else(|| FormError::InvalidField {
        field: "users",
        reason: "expected an array of user ids".to_string(),
    })?;

    let mut unique = BTreeSet::new();
    for item in items {
        let user_id = item.as_i64().ok_or_else(|| FormError::InvalidField {
            field: "users",
            reason: format!("expected an integer user id, got `{item}`"),
        })?;
        unique.insert(user_id);
    }

    Ok(unique.into_iter().collect())
}
