// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Collection, collation and index definitions for people

use std::{cmp::Ordering, sync::LazyLock};

use icu_collator::{
    Collator, CollatorBorrowed,
    options::{CollatorOptions, Strength},
};
use icu_locale_core::locale;

/// Name of the collection holding Person documents
pub const COLLECTION_NAME: &str = "people";

/// Every path a stored Person document can have
///
/// Used to drop unknown keys from query filters when strict query mode is on.
pub const PERSON_PATHS: &[&str] = &[
    "_id",
    "first_name",
    "sur_name",
    "alias",
    "band_member",
    "year_joined",
    "ipi_number",
    "instrument",
    "release_entity",
    "createdAt",
    "updatedAt",
    "__v",
];

/// Locale-aware string comparison rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collation {
    /// ICU locale identifier
    pub locale: &'static str,
    /// ICU comparison strength (1 = base letters, 2 = + accents, 3 = + case)
    pub strength: u32,
}

impl Collation {
    /// Swedish collation ignoring case but not accents
    pub const SWEDISH_CASE_INSENSITIVE: Self = Self {
        locale: "sv",
        strength: 2,
    };
}

static SWEDISH_COLLATOR: LazyLock<CollatorBorrowed<'static>> = LazyLock::new(|| {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Secondary);
    Collator::try_new(locale!("sv").into(), options).expect("sv collation data is compiled in")
});

/// Whether two strings are equal under [`Collation::SWEDISH_CASE_INSENSITIVE`]
///
/// Case and other tertiary differences (`ß`/`ss`) are ignored, canonically
/// equivalent forms compare equal, and `å`, `ä` and `ö` stay letters of their own.
pub fn collates_equal(left: &str, right: &str) -> bool {
    SWEDISH_COLLATOR.compare(left, right) == Ordering::Equal
}

/// Direction or kind of a single index key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    /// Ascending B-tree key
    Ascending,
    /// Full-text key
    Text,
}

/// Declarative description of a collection index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name as the server reports it
    pub name: &'static str,
    /// Ordered index keys
    pub keys: Vec<(&'static str, IndexDirection)>,
    /// Whether the index enforces uniqueness
    pub unique: bool,
    /// Collation the index compares with, if not the binary default
    pub collation: Option<Collation>,
    /// Restricts the index to documents where this field holds a string
    pub partial_string_field: Option<&'static str>,
    /// Stemming language of a text index
    pub default_language: Option<&'static str>,
}

impl IndexSpec {
    fn ascending(name: &'static str, fields: &[&'static str]) -> Self {
        Self {
            name,
            keys: fields
                .iter()
                .map(|field| (*field, IndexDirection::Ascending))
                .collect(),
            unique: false,
            collation: None,
            partial_string_field: None,
            default_language: None,
        }
    }
}

/// Indexes of the `people` collection
pub fn person_indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec::ascending("year_joined_1", &["year_joined"]),
        IndexSpec {
            unique: true,
            collation: Some(Collation::SWEDISH_CASE_INSENSITIVE),
            ..IndexSpec::ascending("first_name_1_sur_name_1", &["first_name", "sur_name"])
        },
        IndexSpec {
            name: "first_name_text_sur_name_text",
            keys: vec![
                ("first_name", IndexDirection::Text),
                ("sur_name", IndexDirection::Text),
            ],
            unique: false,
            collation: None,
            partial_string_field: None,
            default_language: Some("swedish"),
        },
        IndexSpec::ascending("band_member_1_year_joined_1", &["band_member", "year_joined"]),
        IndexSpec {
            unique: true,
            partial_string_field: Some("ipi_number"),
            ..IndexSpec::ascending("ipi_number_1", &["ipi_number"])
        },
    ]
}
