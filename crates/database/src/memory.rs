// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-process person store
//!
//! Holds documents in memory and enforces the same validation and uniqueness
//! rules the `people` collection indexes enforce on the server. Filters support
//! top-level equality only; strings compare under the collection's collation.

use bson::{Bson, Document, oid::ObjectId};
use chrono::Utc;
use person::{PersonAttrs, PersonDocument, PersonUpdate, PersonView, collates_equal, validate};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    driver::DriverError,
    store::{PersonStore, StoreError, UpdateOutcome, sanitize_filter},
};

const NAME_PAIR_INDEX: &str = "first_name_1_sur_name_1";
const IPI_NUMBER_INDEX: &str = "ipi_number_1";

/// Person store backed by a vector
#[derive(Debug)]
pub struct InMemoryPersonStore {
    documents: RwLock<Vec<PersonDocument>>,
    strict_query: bool,
}

impl Default for InMemoryPersonStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl InMemoryPersonStore {
    /// Create an empty store
    pub fn new(strict_query: bool) -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            strict_query,
        }
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn position(
        documents: &[PersonDocument],
        filter: &Document,
    ) -> Result<Option<usize>, StoreError> {
        if let Some(operator) = filter.keys().find(|key| key.starts_with('$')) {
            return Err(StoreError::UnsupportedFilter {
                operator: operator.clone(),
            });
        }

        for (index, document) in documents.iter().enumerate() {
            let stored = bson::to_document(document)
                .map_err(|e| StoreError::Driver(DriverError::new(e.to_string())))?;
            if matches(&stored, filter) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

fn matches(stored: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match stored.get(key) {
        Some(Bson::String(actual)) => {
            matches!(expected, Bson::String(expected) if collates_equal(actual, expected))
        }
        Some(actual) => actual == expected,
        // `{ field: null }` also matches documents without the field
        None => *expected == Bson::Null,
    })
}

/// Name of the unique index `candidate` would violate against `existing`
fn conflict(existing: &[PersonDocument], candidate: &PersonDocument) -> Option<&'static str> {
    existing
        .iter()
        .filter(|document| document.id != candidate.id)
        .find_map(|document| {
            if collates_equal(&document.first_name, &candidate.first_name)
                && collates_equal(&document.sur_name, &candidate.sur_name)
            {
                return Some(NAME_PAIR_INDEX);
            }
            match (&document.ipi_number, &candidate.ipi_number) {
                (Some(stored), Some(new)) if stored == new => Some(IPI_NUMBER_INDEX),
                _ => None,
            }
        })
}

impl PersonStore for InMemoryPersonStore {
    async fn create(&self, attrs: PersonAttrs) -> Result<PersonView, StoreError> {
        let person = validate(&attrs)?;
        let document = PersonDocument::from_new(person, ObjectId::new(), Utc::now());

        let mut documents = self.documents.write().await;
        if let Some(violated) = conflict(&documents, &document) {
            return Err(StoreError::Duplicate {
                index: violated.to_string(),
            });
        }

        let view = document.to_view();
        documents.push(document);
        debug!(id = %view.id, "person created");
        Ok(view)
    }

    async fn find_one(&self, filter: Document) -> Result<Option<PersonView>, StoreError> {
        let filter = sanitize_filter(filter, self.strict_query);
        let documents = self.documents.read().await;
        let position = Self::position(&documents, &filter)?;
        Ok(position.map(|index| documents[index].to_view()))
    }

    async fn update_one(
        &self,
        filter: Document,
        update: PersonUpdate,
    ) -> Result<UpdateOutcome, StoreError> {
        let filter = sanitize_filter(filter, self.strict_query);
        let mut documents = self.documents.write().await;
        let Some(index) = Self::position(&documents, &filter)? else {
            return Ok(UpdateOutcome::default());
        };

        let current = &documents[index];
        let person = validate(&current.apply(update))?;
        let replaced = current.replaced_by(person, Utc::now());
        if replaced.same_content(current) {
            return Ok(UpdateOutcome {
                matched: 1,
                modified: 0,
            });
        }

        if let Some(violated) = conflict(&documents, &replaced) {
            return Err(StoreError::Duplicate {
                index: violated.to_string(),
            });
        }

        documents[index] = replaced;
        Ok(UpdateOutcome {
            matched: 1,
            modified: 1,
        })
    }
}
