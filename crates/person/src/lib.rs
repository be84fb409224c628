// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Person schema for the roster service
//!
//! This crate describes the `Person` entity (band members and other roles) without
//! performing any I/O. Persistence backends in the `database` crate rely on it for
//! everything a document mapper would normally do implicitly.
//!
//! # Module Structure
//!
//! - [`year`]: `year_joined` normalization from loosely typed input
//! - [`model`]: write input, validated, stored and public representations
//! - [`validation`]: explicit validation returning structured field errors
//! - [`schema`]: collection name, collation and index definitions

pub mod model;
pub mod schema;
pub mod validation;
pub mod year;

pub use model::{NewPerson, PersonAttrs, PersonDocument, PersonUpdate, PersonView};
pub use schema::{
    COLLECTION_NAME, Collation, IndexDirection, IndexSpec, PERSON_PATHS, collates_equal,
    person_indexes,
};
pub use validation::{FieldError, FieldErrorKind, ValidationErrors, validate};
pub use year::{YearJoined, normalize_year_joined};
