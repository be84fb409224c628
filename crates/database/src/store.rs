// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Person persistence interface

use bson::{Bson, Document};
use person::{PERSON_PATHS, PersonAttrs, PersonUpdate, PersonView, ValidationErrors};
use thiserror::Error;
use tracing::debug;

use crate::driver::DriverError;

/// Errors raised by a person store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The write did not pass validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The write would break a unique index
    #[error("Duplicate key on index {index}")]
    Duplicate {
        /// Name of the violated index
        index: String,
    },

    /// The document changed between read and write
    #[error("Person {id} was modified concurrently")]
    Conflict {
        /// Hex identifier of the document
        id: String,
    },

    /// The filter uses an operator the store cannot evaluate
    #[error("Unsupported filter operator: {operator}")]
    UnsupportedFilter {
        /// The offending operator
        operator: String,
    },

    /// The store was used before the database connection was opened
    #[error("Database is not connected")]
    NotConnected,

    /// The underlying driver failed
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Result of an `update_one` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of documents matching the filter (0 or 1)
    pub matched: u64,
    /// Number of documents whose content changed (0 or 1)
    pub modified: u64,
}

/// Storage for Person documents
///
/// Implementations validate every write with [`person::validate`] and enforce the
/// two uniqueness rules: the collated `(first_name, sur_name)` pair, and
/// `ipi_number` among documents where it is a string.
pub trait PersonStore: Send + Sync {
    /// Validate and insert a new person
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] or [`StoreError::Duplicate`] when the
    /// write is rejected.
    fn create(
        &self,
        attrs: PersonAttrs,
    ) -> impl Future<Output = Result<PersonView, StoreError>> + Send;

    /// Find the first person matching `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be run.
    fn find_one(
        &self,
        filter: Document,
    ) -> impl Future<Output = Result<Option<PersonView>, StoreError>> + Send;

    /// Apply `update` to the first person matching `filter`
    ///
    /// Validators always run against the merged document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] or [`StoreError::Duplicate`] when the
    /// merged document is rejected, and [`StoreError::Conflict`] when another
    /// writer changed the document first.
    fn update_one(
        &self,
        filter: Document,
        update: PersonUpdate,
    ) -> impl Future<Output = Result<UpdateOutcome, StoreError>> + Send;
}

/// Drop filter keys that are not Person paths when `strict` is set
///
/// Operators (`$text`, ...) and dotted paths into known fields are kept. The
/// sub-filters of `$and`, `$or` and `$nor` are sanitized the same way.
pub fn sanitize_filter(filter: Document, strict: bool) -> Document {
    if !strict {
        return filter;
    }

    filter
        .into_iter()
        .filter_map(|(key, value)| {
            if LOGICAL_OPERATORS.iter().any(|operator| *operator == key) {
                return Some((key, sanitize_clauses(value)));
            }

            let root = key.split('.').next().unwrap_or_default();
            if key.starts_with('$') || PERSON_PATHS.iter().any(|path| *path == root) {
                Some((key, value))
            } else {
                debug!(path = %key, "dropping unknown path from strict query filter");
                None
            }
        })
        .collect()
}

const LOGICAL_OPERATORS: &[&str] = &["$and", "$or", "$nor"];

fn sanitize_clauses(value: Bson) -> Bson {
    match value {
        Bson::Array(clauses) => Bson::Array(
            clauses
                .into_iter()
                .map(|clause| match clause {
                    Bson::Document(clause) => Bson::Document(sanitize_filter(clause, true)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}
