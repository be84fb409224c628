// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Person representations
//!
//! A person moves through four shapes:
//!
//! - [`PersonAttrs`]: loosely typed write input, exactly as a caller sent it
//! - [`NewPerson`]: the same data after [`validate`](crate::validate) accepted it
//! - [`PersonDocument`]: the stored document with identifier, timestamps and version
//! - [`PersonView`]: the public rendering (`id` instead of `_id`, bare `year_joined`)

use bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::year::year_of;

/// Write input for a person
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonAttrs {
    /// Given name (required)
    pub first_name: Option<String>,
    /// Family name (required)
    pub sur_name: Option<String>,
    /// Stage name or nickname
    pub alias: Option<String>,
    /// Whether the person is a member of the band (defaults to false)
    pub band_member: Option<bool>,
    /// Year the person joined, as a string, a number or a timestamp
    pub year_joined: Option<Value>,
    /// Interested Parties Information number
    pub ipi_number: Option<String>,
    /// Identifiers of the instruments the person plays
    #[serde(default)]
    pub instrument: Vec<String>,
    /// Identifiers of the release entities the person is credited on
    #[serde(default)]
    pub release_entity: Vec<String>,
}

/// A person that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    /// Given name
    pub first_name: String,
    /// Family name
    pub sur_name: String,
    /// Stage name or nickname
    pub alias: Option<String>,
    /// Band membership flag
    pub band_member: bool,
    /// Start of the year the person joined, only set for band members
    pub year_joined: Option<DateTime<Utc>>,
    /// Interested Parties Information number
    pub ipi_number: Option<String>,
    /// Referenced instruments
    pub instrument: Vec<ObjectId>,
    /// Referenced release entities
    pub release_entity: Vec<ObjectId>,
}

/// Stored form of a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDocument {
    /// Document identifier
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub sur_name: String,
    /// Stage name or nickname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Band membership flag
    #[serde(default)]
    pub band_member: bool,
    /// Start of the year the person joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_joined: Option<bson::DateTime>,
    /// Interested Parties Information number, stored as `null` when unknown
    #[serde(default)]
    pub ipi_number: Option<String>,
    /// Referenced instruments
    #[serde(default)]
    pub instrument: Vec<ObjectId>,
    /// Referenced release entities
    #[serde(default)]
    pub release_entity: Vec<ObjectId>,
    /// Creation timestamp
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    /// Last modification timestamp
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
    /// Internal version marker
    #[serde(rename = "__v", default)]
    pub version: i32,
}

impl PersonDocument {
    /// Build the document stored for a freshly validated person
    pub fn from_new(person: NewPerson, id: ObjectId, now: DateTime<Utc>) -> Self {
        let now = bson::DateTime::from_chrono(now);
        Self {
            id,
            first_name: person.first_name,
            sur_name: person.sur_name,
            alias: person.alias,
            band_member: person.band_member,
            year_joined: person.year_joined.map(bson::DateTime::from_chrono),
            ipi_number: person.ipi_number,
            instrument: person.instrument,
            release_entity: person.release_entity,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Express the stored document as write input again
    pub fn to_attrs(&self) -> PersonAttrs {
        PersonAttrs {
            first_name: Some(self.first_name.clone()),
            sur_name: Some(self.sur_name.clone()),
            alias: self.alias.clone(),
            band_member: Some(self.band_member),
            year_joined: self.year_joined.map(|date| {
                Value::String(date.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true))
            }),
            ipi_number: self.ipi_number.clone(),
            instrument: self.instrument.iter().map(|id| id.to_hex()).collect(),
            release_entity: self.release_entity.iter().map(|id| id.to_hex()).collect(),
        }
    }

    /// Merge a partial update into this document's write input
    ///
    /// The result still has to be validated as a whole.
    pub fn apply(&self, update: PersonUpdate) -> PersonAttrs {
        let mut attrs = self.to_attrs();
        if let Some(first_name) = update.first_name {
            attrs.first_name = Some(first_name);
        }
        if let Some(sur_name) = update.sur_name {
            attrs.sur_name = Some(sur_name);
        }
        if let Some(alias) = update.alias {
            attrs.alias = alias;
        }
        if let Some(band_member) = update.band_member {
            attrs.band_member = Some(band_member);
        }
        if let Some(year_joined) = update.year_joined {
            attrs.year_joined = year_joined;
        }
        if let Some(ipi_number) = update.ipi_number {
            attrs.ipi_number = ipi_number;
        }
        if let Some(instrument) = update.instrument {
            attrs.instrument = instrument;
        }
        if let Some(release_entity) = update.release_entity {
            attrs.release_entity = release_entity;
        }
        attrs
    }

    /// Replace the content of this document, keeping its identity
    ///
    /// `updatedAt` and the version only move when some field actually changed;
    /// writers guard on the version they read.
    pub fn replaced_by(&self, person: NewPerson, now: DateTime<Utc>) -> Self {
        let mut replaced = Self::from_new(person, self.id, now);
        replaced.created_at = self.created_at;
        if replaced.same_content(self) {
            replaced.updated_at = self.updated_at;
            replaced.version = self.version;
        } else {
            replaced.version = self.version + 1;
        }
        replaced
    }

    /// Whether both documents hold the same person data
    pub fn same_content(&self, other: &Self) -> bool {
        self.first_name == other.first_name
            && self.sur_name == other.sur_name
            && self.alias == other.alias
            && self.band_member == other.band_member
            && self.year_joined == other.year_joined
            && self.ipi_number == other.ipi_number
            && self.instrument == other.instrument
            && self.release_entity == other.release_entity
    }

    /// Public rendering of this document
    pub fn to_view(&self) -> PersonView {
        PersonView {
            id: self.id.to_hex(),
            first_name: self.first_name.clone(),
            sur_name: self.sur_name.clone(),
            alias: self.alias.clone(),
            band_member: self.band_member,
            year_joined: self.year_joined.map(|date| year_of(date.to_chrono())),
            ipi_number: self.ipi_number.clone(),
            instrument: self.instrument.iter().map(|id| id.to_hex()).collect(),
            release_entity: self.release_entity.iter().map(|id| id.to_hex()).collect(),
            created_at: render_timestamp(self.created_at),
            updated_at: render_timestamp(self.updated_at),
        }
    }
}

fn render_timestamp(date: bson::DateTime) -> String {
    date.to_chrono()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Partial update of a person
///
/// Fields left out are kept. `alias`, `year_joined` and `ipi_number` can be
/// cleared by sending an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonUpdate {
    /// New given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sur_name: Option<String>,
    /// New alias, `Some(None)` clears it
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub alias: Option<Option<String>>,
    /// New band membership flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_member: Option<bool>,
    /// New join year, `Some(None)` clears it
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub year_joined: Option<Option<Value>>,
    /// New IPI number, `Some(None)` clears it
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub ipi_number: Option<Option<String>>,
    /// New instrument references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<Vec<String>>,
    /// New release entity references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_entity: Option<Vec<String>>,
}

/// Public rendering of a person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonView {
    /// Hex encoded document identifier
    pub id: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub sur_name: String,
    /// Stage name or nickname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Band membership flag
    pub band_member: bool,
    /// Year the person joined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_joined: Option<i32>,
    /// Interested Parties Information number
    pub ipi_number: Option<String>,
    /// Hex encoded instrument identifiers
    pub instrument: Vec<String>,
    /// Hex encoded release entity identifiers
    pub release_entity: Vec<String>,
    /// Creation timestamp (RFC 3339)
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Last modification timestamp (RFC 3339)
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
