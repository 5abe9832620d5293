//! Scripted in-memory transport standing in for a printer

#![allow(dead_code)]

use async_trait::async_trait;
use duetkit_communication::{Operation, Payload, PrinterSession, Transport};
use duetkit_core::TransportError;
use duetkit_settings::Config;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

pub type Reply = Result<Payload, TransportError>;

type Handler = Box<dyn Fn(Operation, &Payload) -> Reply + Send + Sync>;

/// Transport answering from a handler, with optional held-back replies
pub struct ScriptedTransport {
    calls: Mutex<Vec<(Operation, Payload)>>,
    deferred: Mutex<HashMap<Operation, VecDeque<oneshot::Receiver<Reply>>>>,
    handler: Handler,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(Operation, &Payload) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            deferred: Mutex::new(HashMap::new()),
            handler: Box::new(handler),
        })
    }

    /// Acknowledge everything; status polls report an idle printer
    pub fn idle() -> Arc<Self> {
        Self::new(|operation, _| match operation {
            Operation::GetStatus => Ok(payload(serde_json::json!({"status": "I"}))),
            _ => Ok(ack()),
        })
    }

    /// Hold back the reply to the next call of `operation`
    ///
    /// The call blocks until the returned sender is used (or dropped, which
    /// fails the call as unreachable).
    pub fn defer(&self, operation: Operation) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.deferred
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<(Operation, Payload)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<Payload> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls_of(operation).len()
    }

    /// Wait until at least `n` calls of `operation` were made
    pub async fn wait_for_calls(&self, operation: Operation, n: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(operation) < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {} x {}", n, operation);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, operation: Operation, payload: Payload) -> Reply {
        let held = {
            self.calls.lock().unwrap().push((operation, payload.clone()));
            self.deferred
                .lock()
                .unwrap()
                .get_mut(&operation)
                .and_then(VecDeque::pop_front)
        };

        match held {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(TransportError::Unreachable {
                    reason: "reply dropped".to_string(),
                })
            }),
            None => (self.handler)(operation, &payload),
        }
    }
}

/// Build a payload from a JSON object literal
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => Payload::from_fields(map),
        other => panic!("payload must be an object, got {}", other),
    }
}

/// Plain success acknowledgement
pub fn ack() -> Payload {
    payload(serde_json::json!({"err": 0}))
}

/// Status record with one hotend
pub fn status_with(letter: &str, bed: (f64, f64, i64), hotend: (f64, f64, i64)) -> Payload {
    payload(serde_json::json!({
        "status": letter,
        "temps": {
            "bed": {"current": bed.0, "active": bed.1, "standby": 0.0, "state": bed.2},
            "heads": {"current": [hotend.0], "active": [hotend.1], "standby": [0.0], "state": [hotend.2]}
        }
    }))
}

/// Test configuration: fast polling, no automatic refresh after commands
pub fn test_config(auto_update: bool) -> Config {
    let mut config = Config::for_endpoint("printer.test", 80, auto_update);
    config.connection.poll_interval_ms = 20;
    config.connection.timeout_ms = 1000;
    config.connection.refresh_after_command = false;
    config
}

/// Session without auto-update over `transport`
pub fn session(transport: Arc<ScriptedTransport>) -> PrinterSession {
    PrinterSession::with_config(test_config(false), transport).unwrap()
}
