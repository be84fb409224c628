// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for person persistence rules
//!
//! These run against `InMemoryPersonStore`, which enforces the same validation and
//! uniqueness rules as the `people` collection.

use bson::doc;
use database::{InMemoryPersonStore, PersonStore, StoreError, UpdateOutcome};
use person::{FieldErrorKind, PersonAttrs, PersonUpdate};
use serde_json::{Value, json};

fn attrs(value: Value) -> PersonAttrs {
    serde_json::from_value(value).unwrap()
}

fn benny() -> PersonAttrs {
    attrs(json!({
        "first_name": "Benny",
        "sur_name": "Andersson",
        "band_member": true,
        "year_joined": "1969"
    }))
}

/// A band member's join year comes back as a bare integer
#[tokio::test]
async fn year_joined_round_trips_as_integer() {
    let store = InMemoryPersonStore::default();

    let created = store.create(benny()).await.unwrap();
    assert_eq!(created.year_joined, Some(1969));

    let found = store
        .find_one(doc! { "first_name": "Benny" })
        .await
        .unwrap()
        .unwrap();
    let rendered = serde_json::to_value(&found).unwrap();
    assert_eq!(rendered["year_joined"], json!(1969));
    assert_eq!(rendered["id"], json!(created.id));
}

/// A join year for someone outside the band fails validation
#[tokio::test]
async fn year_without_membership_fails_validation() {
    let store = InMemoryPersonStore::default();

    let result = store
        .create(attrs(json!({
            "first_name": "Stig",
            "sur_name": "Anderson",
            "band_member": false,
            "year_joined": "1969"
        })))
        .await;

    let Err(StoreError::Validation(errors)) = result else {
        panic!("expected validation failure, got {result:?}");
    };
    assert_eq!(
        errors.get("year_joined").unwrap().kind,
        FieldErrorKind::Invalid
    );
    assert!(store.is_empty().await);
}

/// Names collide under the case-insensitive collation
#[tokio::test]
async fn duplicate_name_pair_is_rejected() {
    let store = InMemoryPersonStore::default();
    store.create(benny()).await.unwrap();

    let result = store
        .create(attrs(json!({
            "first_name": "BENNY",
            "sur_name": "andersson",
            "alias": "Ninja"
        })))
        .await;

    assert_eq!(
        result.unwrap_err(),
        StoreError::Duplicate {
            index: "first_name_1_sur_name_1".to_string()
        }
    );
    assert_eq!(store.len().await, 1);
}

/// Accented letters are distinct under the Swedish collation
#[tokio::test]
async fn accented_names_do_not_collide() {
    let store = InMemoryPersonStore::default();
    store
        .create(attrs(json!({ "first_name": "Björn", "sur_name": "Ulvaeus" })))
        .await
        .unwrap();

    store
        .create(attrs(json!({ "first_name": "Bjorn", "sur_name": "Ulvaeus" })))
        .await
        .unwrap();

    assert_eq!(store.len().await, 2);
}

/// Canonically equivalent spellings are the same name
#[tokio::test]
async fn decomposed_name_collides_with_composed() {
    let store = InMemoryPersonStore::default();
    store
        .create(attrs(json!({ "first_name": "Bj\u{f6}rn", "sur_name": "Ulvaeus" })))
        .await
        .unwrap();

    let result = store
        .create(attrs(json!({ "first_name": "Bjo\u{308}rn", "sur_name": "ULVAEUS" })))
        .await;

    assert_eq!(
        result.unwrap_err(),
        StoreError::Duplicate {
            index: "first_name_1_sur_name_1".to_string()
        }
    );
}

/// Tertiary differences such as `ß` and `ss` do not make names distinct
#[tokio::test]
async fn sharp_s_collides_with_double_s() {
    let store = InMemoryPersonStore::default();
    store
        .create(attrs(json!({ "first_name": "Johann", "sur_name": "Strauß" })))
        .await
        .unwrap();

    let result = store
        .create(attrs(json!({ "first_name": "Johann", "sur_name": "Strauss" })))
        .await;

    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    assert_eq!(store.len().await, 1);
}

/// String filters compare under the collection collation
#[tokio::test]
async fn find_ignores_case() {
    let store = InMemoryPersonStore::default();
    store.create(benny()).await.unwrap();

    let found = store
        .find_one(doc! { "first_name": "BENNY", "sur_name": "andersson" })
        .await
        .unwrap();
    assert!(found.is_some());

    let missing = store
        .find_one(doc! { "first_name": "Bjorn" })
        .await
        .unwrap();
    assert!(missing.is_none());
}

/// Missing IPI numbers are exempt from uniqueness
#[tokio::test]
async fn null_ipi_numbers_do_not_collide() {
    let store = InMemoryPersonStore::default();

    store
        .create(attrs(json!({
            "first_name": "Agnetha",
            "sur_name": "Fältskog",
            "ipi_number": null
        })))
        .await
        .unwrap();
    store
        .create(attrs(json!({
            "first_name": "Anni-Frid",
            "sur_name": "Lyngstad",
            "ipi_number": null
        })))
        .await
        .unwrap();

    assert_eq!(store.len().await, 2);
}

/// String IPI numbers are unique
#[tokio::test]
async fn duplicate_ipi_number_is_rejected() {
    let store = InMemoryPersonStore::default();
    store
        .create(attrs(json!({
            "first_name": "Agnetha",
            "sur_name": "Fältskog",
            "ipi_number": "00012345678"
        })))
        .await
        .unwrap();

    let result = store
        .create(attrs(json!({
            "first_name": "Anni-Frid",
            "sur_name": "Lyngstad",
            "ipi_number": "00012345678"
        })))
        .await;

    assert_eq!(
        result.unwrap_err(),
        StoreError::Duplicate {
            index: "ipi_number_1".to_string()
        }
    );
}

/// Updates run validators against the merged document
#[tokio::test]
async fn update_runs_validators() {
    let store = InMemoryPersonStore::default();
    store.create(benny()).await.unwrap();

    let leave_band = PersonUpdate {
        band_member: Some(false),
        ..PersonUpdate::default()
    };
    let result = store
        .update_one(doc! { "sur_name": "Andersson" }, leave_band)
        .await;
    assert!(matches!(result, Err(StoreError::Validation(_))));

    let leave_band_and_clear_year = PersonUpdate {
        band_member: Some(false),
        year_joined: Some(None),
        ..PersonUpdate::default()
    };
    let outcome = store
        .update_one(doc! { "sur_name": "Andersson" }, leave_band_and_clear_year)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome {
            matched: 1,
            modified: 1
        }
    );

    let found = store
        .find_one(doc! { "sur_name": "Andersson" })
        .await
        .unwrap()
        .unwrap();
    assert!(!found.band_member);
    assert_eq!(found.year_joined, None);
}

/// An update that changes nothing reports no modification
#[tokio::test]
async fn noop_update_is_not_a_modification() {
    let store = InMemoryPersonStore::default();
    store.create(benny()).await.unwrap();

    let update = PersonUpdate {
        year_joined: Some(Some(json!(1969))),
        ..PersonUpdate::default()
    };
    let outcome = store
        .update_one(doc! { "first_name": "Benny" }, update)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome {
            matched: 1,
            modified: 0
        }
    );
}

/// Updates cannot introduce a collated name collision
#[tokio::test]
async fn update_into_existing_name_is_rejected() {
    let store = InMemoryPersonStore::default();
    store.create(benny()).await.unwrap();
    store
        .create(attrs(json!({ "first_name": "Benny", "sur_name": "Anderson" })))
        .await
        .unwrap();

    let update = PersonUpdate {
        sur_name: Some("ANDERSSON".to_string()),
        ..PersonUpdate::default()
    };
    let result = store
        .update_one(doc! { "sur_name": "Anderson" }, update)
        .await;

    assert!(matches!(result, Err(StoreError::Duplicate { .. })));
}

/// Strict query mode ignores paths outside the schema
#[tokio::test]
async fn strict_query_ignores_unknown_paths() {
    let strict = InMemoryPersonStore::new(true);
    strict.create(benny()).await.unwrap();
    let found = strict
        .find_one(doc! { "first_name": "Benny", "nickname": "B" })
        .await
        .unwrap();
    assert!(found.is_some());

    let lenient = InMemoryPersonStore::new(false);
    lenient.create(benny()).await.unwrap();
    let found = lenient
        .find_one(doc! { "first_name": "Benny", "nickname": "B" })
        .await
        .unwrap();
    assert!(found.is_none());
}

/// Unmatched updates report zero matches
#[tokio::test]
async fn update_without_match() {
    let store = InMemoryPersonStore::default();

    let outcome = store
        .update_one(doc! { "first_name": "Nobody" }, PersonUpdate::default())
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::default());
}
