//! In-memory transport for controller tests.

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::transport::{ApiRequest, ChatTransport, TransportError};

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    gate: Mutex<Option<Receiver<()>>>,
}

/// Releases one held request per `open()`. Dropping it releases everything.
pub struct Gate(Sender<()>);

impl Gate {
    pub fn open(&self) {
        let _ = self.0.send(());
    }
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every request blocks until the gate is opened once for it.
    pub fn gated() -> (Arc<Self>, Gate) {
        let (tx, rx) = channel();
        let transport = Self {
            gate: Mutex::new(Some(rx)),
            ..Self::default()
        };
        (Arc::new(transport), Gate(tx))
    }

    pub fn push_ok(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_err(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChatTransport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            let _ = gate.recv();
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
    }
}
