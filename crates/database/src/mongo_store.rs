// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Person store on a MongoDB collection

use bson::{Document, doc, oid::ObjectId};
use chrono::Utc;
use mongodb::{
    Collection,
    error::{ErrorKind, WriteFailure},
};
use person::{PersonAttrs, PersonDocument, PersonUpdate, PersonView, validate};

use crate::store::{PersonStore, StoreError, UpdateOutcome, sanitize_filter};

const DUPLICATE_KEY: i32 = 11000;

/// Person store writing to the `people` collection
#[derive(Debug, Clone)]
pub struct MongoPersonStore {
    collection: Collection<PersonDocument>,
    strict_query: bool,
}

impl MongoPersonStore {
    /// Wrap a collection handle
    pub fn new(collection: Collection<PersonDocument>, strict_query: bool) -> Self {
        Self {
            collection,
            strict_query,
        }
    }
}

fn store_error(error: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = error.kind.as_ref()
        && write_error.code == DUPLICATE_KEY
    {
        return StoreError::Duplicate {
            index: duplicate_index(&write_error.message).to_string(),
        };
    }
    StoreError::Driver(error.into())
}

/// Index name from a server message such as
/// `E11000 duplicate key error collection: test.people index: ipi_number_1 dup key: ...`
fn duplicate_index(message: &str) -> &str {
    message
        .split_once(" index: ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .unwrap_or(message)
}

/// Match the document only while it still has the version that was read
fn replace_filter(current: &PersonDocument) -> Document {
    doc! { "_id": current.id, "__v": current.version }
}

impl PersonStore for MongoPersonStore {
    async fn create(&self, attrs: PersonAttrs) -> Result<PersonView, StoreError> {
        let person = validate(&attrs)?;
        let document = PersonDocument::from_new(person, ObjectId::new(), Utc::now());
        self.collection
            .insert_one(&document)
            .await
            .map_err(store_error)?;
        Ok(document.to_view())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<PersonView>, StoreError> {
        let filter = sanitize_filter(filter, self.strict_query);
        let found = self
            .collection
            .find_one(filter)
            .await
            .map_err(store_error)?;
        Ok(found.as_ref().map(PersonDocument::to_view))
    }

    async fn update_one(
        &self,
        filter: Document,
        update: PersonUpdate,
    ) -> Result<UpdateOutcome, StoreError> {
        let filter = sanitize_filter(filter, self.strict_query);
        let Some(current) = self
            .collection
            .find_one(filter)
            .await
            .map_err(store_error)?
        else {
            return Ok(UpdateOutcome::default());
        };

        let person = validate(&current.apply(update))?;
        let replaced = current.replaced_by(person, Utc::now());
        if replaced.same_content(&current) {
            return Ok(UpdateOutcome {
                matched: 1,
                modified: 0,
            });
        }

        let result = self
            .collection
            .replace_one(replace_filter(&current), &replaced)
            .await
            .map_err(store_error)?;
        if result.matched_count == 0 {
            return Err(StoreError::Conflict {
                id: current.id.to_hex(),
            });
        }
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_index_is_extracted_from_message() {
        let message = "E11000 duplicate key error collection: test.people index: \
                       first_name_1_sur_name_1 dup key: { first_name: \"benny\" }";
        assert_eq!(duplicate_index(message), "first_name_1_sur_name_1");
    }

    #[test]
    fn replace_is_guarded_by_version() {
        let person = validate(&PersonAttrs {
            first_name: Some("Frida".to_string()),
            sur_name: Some("Lyngstad".to_string()),
            ..PersonAttrs::default()
        })
        .unwrap();
        let id = ObjectId::new();
        let current = PersonDocument::from_new(person, id, Utc::now());

        assert_eq!(replace_filter(&current), doc! { "_id": id, "__v": 0 });

        let mut renamed = current.to_attrs();
        renamed.alias = Some("Frida".to_string());
        let next = current.replaced_by(validate(&renamed).unwrap(), Utc::now());
        assert_eq!(replace_filter(&next), doc! { "_id": id, "__v": 1 });
    }

    #[test]
    fn unexpected_message_is_kept_whole() {
        assert_eq!(duplicate_index("duplicate"), "duplicate");
    }
}
