// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! MongoDB driver
//!
//! Opens a client from a connection string, verifies it with a `ping`, and after
//! a successful connect brings the `people` collection and its indexes in line
//! with [`person::person_indexes`]. Schema sync is best effort: failures are
//! logged and do not fail the connection.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bson::{Document, doc};
use mongodb::{
    Client, Database, IndexModel,
    options::{ClientOptions, Collation as MongoCollation, CollationStrength, IndexOptions},
};
use person::{
    COLLECTION_NAME, Collation, IndexDirection, IndexSpec, PersonDocument, person_indexes,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    driver::{ConnectOptions, DatabaseDriver, DriverError, ReadyState},
    mongo_store::MongoPersonStore,
    store::StoreError,
};

const APP_NAME: &str = "roster-api";
const DEFAULT_DATABASE: &str = "test";

#[derive(Debug)]
struct Connection {
    client: Client,
    database: Database,
}

/// Production driver backed by the official MongoDB client
#[derive(Debug)]
pub struct MongoDriver {
    state: AtomicU8,
    strict_query: AtomicBool,
    connection: Mutex<Option<Connection>>,
}

impl Default for MongoDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MongoDriver {
    /// Create a disconnected driver
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ReadyState::Disconnected as u8),
            strict_query: AtomicBool::new(ConnectOptions::default().strict_query),
            connection: Mutex::new(None),
        }
    }

    fn set_state(&self, state: ReadyState) {
        debug!(%state, "driver state changed");
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Person store on the open connection
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotConnected`] before a successful connect.
    pub async fn person_store(&self) -> Result<MongoPersonStore, StoreError> {
        let connection = self.connection.lock().await;
        let connection = connection.as_ref().ok_or(StoreError::NotConnected)?;
        Ok(MongoPersonStore::new(
            connection
                .database
                .collection::<PersonDocument>(COLLECTION_NAME),
            self.strict_query.load(Ordering::SeqCst),
        ))
    }

    async fn open(uri: &str) -> mongodb::error::Result<Connection> {
        let mut options = ClientOptions::parse(uri).await?;
        options
            .app_name
            .get_or_insert_with(|| APP_NAME.to_string());
        let database_name = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&database_name);
        database.run_command(doc! { "ping": 1 }).await?;

        Ok(Connection { client, database })
    }
}

impl DatabaseDriver for MongoDriver {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::SeqCst))
    }

    async fn connect(&self, uri: &str, options: ConnectOptions) -> Result<(), DriverError> {
        let mut slot = self.connection.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        self.set_state(ReadyState::Connecting);
        let connection = match Self::open(uri).await {
            Ok(connection) => connection,
            Err(e) => {
                self.set_state(ReadyState::Disconnected);
                return Err(e.into());
            }
        };

        if let Err(e) = sync_person_schema(&connection.database).await {
            warn!(error = %e, collection = COLLECTION_NAME, "failed to sync collection indexes");
        }

        info!(database = %connection.database.name(), "mongodb client connected");
        self.strict_query
            .store(options.strict_query, Ordering::SeqCst);
        *slot = Some(connection);
        self.set_state(ReadyState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        let mut slot = self.connection.lock().await;
        let Some(connection) = slot.take() else {
            self.set_state(ReadyState::Disconnected);
            return Ok(());
        };

        self.set_state(ReadyState::Disconnecting);
        connection.client.shutdown().await;
        self.set_state(ReadyState::Disconnected);
        Ok(())
    }
}

async fn sync_person_schema(database: &Database) -> mongodb::error::Result<()> {
    let existing = database.list_collection_names().await?;
    if !existing.iter().any(|name| name == COLLECTION_NAME) {
        database
            .create_collection(COLLECTION_NAME)
            .collation(mongo_collation(Collation::SWEDISH_CASE_INSENSITIVE))
            .await?;
        info!(collection = COLLECTION_NAME, "collection created");
    }

    let collection = database.collection::<PersonDocument>(COLLECTION_NAME);
    let created = collection
        .create_indexes(person_indexes().into_iter().map(index_model))
        .await?;
    debug!(indexes = ?created.index_names, "collection indexes in place");
    Ok(())
}

fn mongo_collation(collation: Collation) -> MongoCollation {
    let strength = match collation.strength {
        1 => CollationStrength::Primary,
        2 => CollationStrength::Secondary,
        4 => CollationStrength::Quaternary,
        5 => CollationStrength::Identical,
        _ => CollationStrength::Tertiary,
    };
    MongoCollation::builder()
        .locale(collation.locale.to_string())
        .strength(strength)
        .build()
}

fn index_model(spec: IndexSpec) -> IndexModel {
    let mut keys = Document::new();
    for (field, direction) in &spec.keys {
        match direction {
            IndexDirection::Ascending => keys.insert(*field, 1),
            IndexDirection::Text => keys.insert(*field, "text"),
        };
    }

    let mut options = IndexOptions::default();
    options.name = Some(spec.name.to_string());
    options.unique = spec.unique.then_some(true);
    options.collation = spec.collation.map(mongo_collation);
    options.default_language = spec.default_language.map(str::to_string);
    options.partial_filter_expression = spec
        .partial_string_field
        .map(|field| doc! { field: { "$type": "string" } });

    IndexModel::builder().keys(keys).options(options).build()
}
