// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Startup and shutdown behavior of the server

mod fixtures;

use api::{
    ExitStatus, HealthResponse, LifecycleEvent, LifecyclePhase, Server, ServerConfig,
    ServerError, ShutdownTrigger,
};
use fixtures::{FakeDriver, server, shutdown_config};

fn position(events: &[LifecycleEvent], wanted: &LifecycleEvent) -> usize {
    events
        .iter()
        .position(|event| event == wanted)
        .expect("event missing from journal")
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let mut server = server(FakeDriver::default());
    let address = server.start().await.unwrap();

    let response = reqwest::get(format!("http://{address}/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body: HealthResponse = response.json().await.unwrap();
    assert_eq!(body, HealthResponse { ok: true });

    server.shutdown();
    assert_eq!(server.wait().await, ExitStatus::Success);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let mut server = server(FakeDriver::default());
    let address = server.start().await.unwrap();

    let response = reqwest::get(format!("http://{address}/people"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.shutdown();
    server.wait().await;
}

#[tokio::test]
async fn repeated_signals_shut_down_once() {
    let mut server = server(FakeDriver::default());
    server.start().await.unwrap();

    let handle = server.shutdown_handle();
    handle.trigger(ShutdownTrigger::Sigterm);
    handle.trigger(ShutdownTrigger::Sigint);

    assert_eq!(server.wait().await, ExitStatus::Success);

    let controller = server.controller();
    assert_eq!(controller.database().driver().disconnects(), 1);
    assert_eq!(controller.phase(), LifecyclePhase::Exited);

    let journal = controller.journal();
    let started = journal
        .iter()
        .filter(|event| matches!(event, LifecycleEvent::ShutdownStarted { .. }))
        .count();
    assert_eq!(started, 1);
    assert!(journal.contains(&LifecycleEvent::TriggerIgnored {
        trigger: ShutdownTrigger::Sigint
    }));
}

#[tokio::test]
async fn listener_closes_before_database_disconnects() {
    let mut server = server(FakeDriver::default());
    server.start().await.unwrap();

    server.shutdown_handle().trigger(ShutdownTrigger::Sigterm);
    server.wait().await;

    let journal = server.controller().journal();
    let closed = position(journal, &LifecycleEvent::ListenerClosed);
    let disconnected = position(journal, &LifecycleEvent::DatabaseDisconnected);
    let exited = position(
        journal,
        &LifecycleEvent::Exited {
            status: ExitStatus::Success,
        },
    );
    assert!(closed < disconnected);
    assert!(disconnected < exited);
}

#[tokio::test]
async fn listener_stops_accepting_after_shutdown() {
    let mut server = server(FakeDriver::default());
    let address = server.start().await.unwrap();

    server.shutdown();
    server.wait().await;

    assert!(
        reqwest::get(format!("http://{address}/health"))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn missing_uri_exits_before_listening() {
    let mut server = Server::with_driver(
        ServerConfig::for_testing(),
        shutdown_config(),
        FakeDriver::default(),
    );

    let error = server.start().await.unwrap_err();

    assert_eq!(error.to_string(), "Missing env var: MONGODB_URI");
    assert_eq!(server.controller().local_addr(), None);
    assert_eq!(server.controller().database().driver().connects(), 0);
    assert_eq!(server.wait().await, ExitStatus::Failure);
    assert_eq!(ExitStatus::Failure.code(), 1);
}

#[tokio::test]
async fn failed_connect_exits_before_listening() {
    let mut server = server(FakeDriver::failing_connect());

    let error = server.start().await.unwrap_err();

    assert!(matches!(error, ServerError::Database(_)));
    assert_eq!(error.to_string(), "connection refused");
    assert!(
        !server
            .controller()
            .journal()
            .iter()
            .any(|event| matches!(event, LifecycleEvent::ListenerStarted { .. }))
    );
    assert_eq!(server.wait().await, ExitStatus::Failure);
}

#[tokio::test]
async fn failed_disconnect_exits_with_failure() {
    let mut server = server(FakeDriver::failing_disconnect());
    server.start().await.unwrap();

    server.shutdown_handle().trigger(ShutdownTrigger::Sigint);
    let status = server.wait().await;

    assert_eq!(status, ExitStatus::Failure);
    let journal = server.controller().journal();
    assert!(journal.contains(&LifecycleEvent::ListenerClosed));
    assert!(!journal.contains(&LifecycleEvent::DatabaseDisconnected));
    assert!(journal.contains(&LifecycleEvent::ShutdownFailed {
        message: "connection reset".to_string()
    }));
    assert_eq!(
        journal.last(),
        Some(&LifecycleEvent::Exited {
            status: ExitStatus::Failure
        })
    );
}

#[tokio::test]
async fn task_failure_triggers_shutdown() {
    let mut server = server(FakeDriver::default());
    server.start().await.unwrap();

    server
        .shutdown_handle()
        .report_failure("background job failed");

    assert_eq!(server.wait().await, ExitStatus::Success);
    assert!(
        server
            .controller()
            .journal()
            .contains(&LifecycleEvent::ShutdownStarted {
                trigger: ShutdownTrigger::TaskFailure {
                    message: "background job failed".to_string()
                }
            })
    );
}
