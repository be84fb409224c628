// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Explicit Person validation
//!
//! [`validate`] turns loosely typed [`PersonAttrs`] into a [`NewPerson`] or reports
//! every failing field at once. Backends call it before each write; nothing is
//! persisted that did not pass through it.

use std::fmt;

use bson::oid::ObjectId;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    model::{NewPerson, PersonAttrs},
    year::{YearJoined, normalize_year_joined},
};

const YEAR_REQUIRES_MEMBERSHIP: &str = "year_joined can only be submitted if person is band_member";

/// Category of a field validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// A required value is missing
    Required,
    /// The value has a type that cannot be converted
    Cast,
    /// The value breaks a cross-field rule
    Invalid,
}

/// A single failing field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the failing field
    pub path: &'static str,
    /// Failure category
    pub kind: FieldErrorKind,
    /// Human-readable explanation
    pub message: String,
}

impl FieldError {
    fn required(path: &'static str) -> Self {
        Self {
            path,
            kind: FieldErrorKind::Required,
            message: format!("Path `{path}` is required."),
        }
    }

    fn cast(path: &'static str, target: &str, value: &dyn fmt::Display) -> Self {
        Self {
            path,
            kind: FieldErrorKind::Cast,
            message: format!("Cast to {target} failed for value \"{value}\" at path \"{path}\""),
        }
    }
}

/// All validation failures of one write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Person validation failed: {}", summarize(.errors))]
pub struct ValidationErrors {
    /// Failing fields in schema order
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Whether the given path is among the failures
    pub fn has(&self, path: &str) -> bool {
        self.errors.iter().any(|error| error.path == path)
    }

    /// The failure recorded for a path, if any
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.path == path)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.path, error.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate write input
///
/// Rules:
/// - `first_name` and `sur_name` are required and must not be empty
/// - `year_joined` must be castable to a date
/// - `year_joined` is required when `band_member` is true and rejected otherwise
/// - relationship identifiers must be 24 hex digit object ids
pub fn validate(attrs: &PersonAttrs) -> Result<NewPerson, ValidationErrors> {
    let mut errors = Vec::new();

    let first_name = required_string("first_name", attrs.first_name.as_deref(), &mut errors);
    let sur_name = required_string("sur_name", attrs.sur_name.as_deref(), &mut errors);
    let band_member = attrs.band_member.unwrap_or(false);

    let year_joined = match normalize_year_joined(attrs.year_joined.as_ref()) {
        YearJoined::Date(date) if !band_member => {
            errors.push(FieldError {
                path: "year_joined",
                kind: FieldErrorKind::Invalid,
                message: YEAR_REQUIRES_MEMBERSHIP.to_string(),
            });
            Some(date)
        }
        YearJoined::Date(date) => Some(date),
        YearJoined::Absent if band_member => {
            errors.push(FieldError::required("year_joined"));
            None
        }
        YearJoined::Absent => None,
        YearJoined::Uncastable(value) => {
            errors.push(FieldError::cast("year_joined", "date", &display_raw(&value)));
            None
        }
    };

    let instrument = object_ids("instrument", &attrs.instrument, &mut errors);
    let release_entity = object_ids("release_entity", &attrs.release_entity, &mut errors);

    if !errors.is_empty() {
        return Err(ValidationErrors { errors });
    }

    Ok(NewPerson {
        first_name,
        sur_name,
        alias: attrs.alias.clone(),
        band_member,
        year_joined,
        ipi_number: attrs.ipi_number.clone(),
        instrument,
        release_entity,
    })
}

fn required_string(
    path: &'static str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> String {
    match value {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => {
            errors.push(FieldError::required(path));
            String::new()
        }
    }
}

fn object_ids(path: &'static str, raw: &[String], errors: &mut Vec<FieldError>) -> Vec<ObjectId> {
    let mut ids = Vec::with_capacity(raw.len());
    for candidate in raw {
        match ObjectId::parse_str(candidate) {
            Ok(id) => ids.push(id),
            Err(_) => {
                errors.push(FieldError::cast(path, "ObjectId", candidate));
                return Vec::new();
            }
        }
    }
    ids
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
