// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Database connectivity and Person persistence
//!
//! This crate owns the single process-wide database connection and everything that
//! reads or writes Person documents.
//!
//! # Architecture
//!
//! - **Driver Seam**: [`driver::DatabaseDriver`] - readiness state, connect and disconnect
//! - **MongoDB Driver**: [`mongo::MongoDriver`] - the production driver, also syncs the
//!   `people` collection and its indexes after connecting
//! - **Connection Manager**: [`manager::ConnectionManager`] - idempotent connect/disconnect
//!   driven by configuration
//! - **Person Stores**: [`store::PersonStore`] implemented by [`mongo_store::MongoPersonStore`]
//!   and [`memory::InMemoryPersonStore`]
//!
//! # Features
//!
//! - **Idempotent Lifecycle**: redundant connect/disconnect calls never reach the driver
//! - **Single Attempt**: connection failures are reported once, callers decide what to do
//! - **Explicit Validation**: every write is validated with [`person::validate`] first
//! - **Strict Queries**: unknown filter paths are dropped before a query runs

pub mod driver;
pub mod manager;
pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod store;

pub use driver::{ConnectOptions, DatabaseDriver, DriverError, ReadyState};
pub use manager::{ConnectionManager, DatabaseConfig, DatabaseError, MONGODB_URI};
pub use memory::InMemoryPersonStore;
pub use mongo::MongoDriver;
pub use mongo_store::MongoPersonStore;
pub use store::{PersonStore, StoreError, UpdateOutcome, sanitize_filter};
