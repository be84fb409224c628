// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared test fixtures

#![allow(dead_code)]

use std::{
    sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
    time::Duration,
};

use api::{Server, ServerConfig, ShutdownConfig};
use database::{ConnectOptions, DatabaseDriver, DriverError, ReadyState};

/// In-process driver recording every call
#[derive(Debug, Default)]
pub struct FakeDriver {
    state: AtomicU8,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
}

impl FakeDriver {
    pub fn failing_connect() -> Self {
        let driver = Self::default();
        driver.fail_connect.store(true, Ordering::SeqCst);
        driver
    }

    pub fn failing_disconnect() -> Self {
        let driver = Self::default();
        driver.fail_disconnect.store(true, Ordering::SeqCst);
        driver
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl DatabaseDriver for FakeDriver {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::SeqCst))
    }

    async fn connect(&self, _uri: &str, _options: ConnectOptions) -> Result<(), DriverError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(DriverError::new("connection refused"));
        }
        self.state
            .store(ReadyState::Connected as u8, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(DriverError::new("connection reset"));
        }
        self.state
            .store(ReadyState::Disconnected as u8, Ordering::SeqCst);
        Ok(())
    }
}

/// Testing configuration pointing at a database
pub fn config_with_uri() -> ServerConfig {
    ServerConfig {
        mongodb_uri: Some("mongodb://localhost:27017/roster".to_string()),
        ..ServerConfig::for_testing()
    }
}

/// Short timeouts so failing tests finish quickly
pub fn shutdown_config() -> ShutdownConfig {
    ShutdownConfig {
        graceful_timeout: Duration::from_secs(5),
        force_timeout: Duration::from_secs(1),
        exit_grace: Duration::from_millis(1),
    }
}

pub fn server(driver: FakeDriver) -> Server<FakeDriver> {
    Server::with_driver(config_with_uri(), shutdown_config(), driver)
}
