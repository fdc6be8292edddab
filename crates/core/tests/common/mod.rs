#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use konspekt_core::{Connector, Transport, TransportError};
use serde_json::{Value, json};
use url::Url;

pub const URL: &str = "https://www.youtube.com/watch?v=XYZ";

pub enum Step {
    Frame(String),
    Close,
    Hang,
    Break,
}

pub fn frame(value: Value) -> Step {
    Step::Frame(value.to_string())
}

pub enum Script {
    Refuse,
    Steps(Vec<Step>),
}

#[derive(Default)]
pub struct Log {
    pub urls: Vec<String>,
    pub sent: Vec<Value>,
    pub closed: usize,
}

/// Hands out one scripted connection per `connect`, in order.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    pub log: Arc<Mutex<Log>>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            log: Arc::new(Mutex::new(Log::default())),
        }
    }

    pub fn log(&self) -> Arc<Mutex<Log>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError> {
        self.log.lock().unwrap().urls.push(url.to_string());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Steps(steps)) => Ok(Box::new(ScriptedTransport {
                steps: steps.into(),
                log: Arc::clone(&self.log),
                closed: false,
            })),
            Some(Script::Refuse) | None => Err(TransportError::ConnectFailed {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
        }
    }
}

struct ScriptedTransport {
    steps: VecDeque<Step>,
    log: Arc<Mutex<Log>>,
    closed: bool,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let value = serde_json::from_str(&text).unwrap();
        self.log.lock().unwrap().sent.push(value);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>, TransportError> {
        match self.steps.pop_front() {
            Some(Step::Frame(text)) => Ok(Some(text)),
            Some(Step::Close) | None => Ok(None),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Break) => Err(TransportError::ReceiveFailed("reset by peer".into())),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.lock().unwrap().closed += 1;
        }
    }
}

pub fn concepts_output() -> Value {
    json!({"key_concepts": [{"term": "X", "definition": "Y", "relevance": "Z", "timestamp": "00:01:05"}], "video_id": "XYZ"})
}

pub fn phase_one_script() -> Script {
    Script::Steps(vec![
        frame(json!({"type": "started", "message": "Phase 1 initiated", "timestamp": "t"})),
        frame(json!({"type": "workflow_started", "timestamp": "t"})),
        frame(json!({"type": "step_started", "id": "caption_extractor", "timestamp": "t"})),
        frame(json!({"type": "step_completed", "id": "caption_extractor", "timestamp": "t"})),
        frame(json!({"type": "step_started", "id": "key_concepts_extractor", "timestamp": "t"})),
        frame(json!({"type": "phase_completed", "phase": 1, "output": concepts_output(), "timestamp": "t"})),
    ])
}

pub fn result_script(output: Value) -> Script {
    Script::Steps(vec![
        frame(json!({"type": "phase_started", "timestamp": "t"})),
        frame(json!({"type": "phase_completed", "output": output, "timestamp": "t"})),
    ])
}
