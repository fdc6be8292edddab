//! Drives the session machine over real connections.
//!
//! [`StudyClient`] owns the one live phase connection. Each phase run opens
//! it, sends the request, then consumes inbound frames strictly in arrival
//! order until the machine reports a terminal transition, the peer closes,
//! the phase times out or it is cancelled. The connection is always torn
//! down before the run returns.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    time::{Instant, timeout_at},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ClientConfig,
    error::{Result, SessionError, TransportError},
    notes::StudyNotes,
    phase::{KnowledgeLevel, Phase, PhaseRequest},
    session::{Session, SessionMachine, Transition},
    transport::{Connector, Transport, WsConnector},
};

/// How a phase run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed(Phase),
    Failed { phase: Phase, message: String },
    Closed(Phase),
    Cancelled(Phase),
}

impl PhaseOutcome {
    fn from_transition(transition: Transition, phase: Phase) -> Self {
        match transition {
            Transition::Completed(p) => PhaseOutcome::Completed(p),
            Transition::Failed { phase, message } => PhaseOutcome::Failed { phase, message },
            Transition::Cancelled(p) => PhaseOutcome::Cancelled(p),
            Transition::Closed(p) => PhaseOutcome::Closed(p),
            Transition::Progress { .. } | Transition::Ignored => PhaseOutcome::Closed(phase),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PhaseOutcome::Completed(_))
    }
}

/// Interrupts whatever phase the owning client is running.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

enum Inbound {
    Frame(String),
    Closed,
    Broken(TransportError),
    TimedOut,
    Cancelled,
}

pub struct StudyClient<C: Connector = WsConnector> {
    config: ClientConfig,
    connector: C,
    machine: SessionMachine,
    connection: Option<Box<dyn Transport>>,
    cancel: Arc<watch::Sender<bool>>,
    updates: Option<mpsc::UnboundedSender<Transition>>,
}

impl StudyClient<WsConnector> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, WsConnector)
    }
}

impl<C: Connector> StudyClient<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            config,
            connector,
            machine: SessionMachine::new(),
            connection: None,
            cancel: Arc::new(cancel),
            updates: None,
        }
    }

    /// Forward every non-ignored transition to `tx`.
    pub fn with_updates(mut self, tx: mpsc::UnboundedSender<Transition>) -> Self {
        self.updates = Some(tx);
        self
    }

    pub fn session(&self) -> &Session {
        self.machine.session()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn emit(&self, transition: &Transition) {
        if *transition == Transition::Ignored {
            return;
        }
        if let Some(tx) = &self.updates {
            let _ = tx.send(transition.clone());
        }
    }

    async fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            debug!("closing phase connection");
            connection.close().await;
        }
    }

    /// A previous run was dropped mid-flight: close its socket and settle
    /// the phase it left loading.
    async fn abandon_stale(&mut self) {
        if self.connection.is_some() {
            warn!("closing connection left open by an interrupted phase");
            self.teardown().await;
            let t = self.machine.cancel();
            self.emit(&t);
        }
    }

    /// Start a fresh session for `url` and run phase 1.
    pub async fn submit_url(&mut self, url: &str, level: KnowledgeLevel) -> Result<PhaseOutcome> {
        self.abandon_stale().await;
        let endpoint = self.config.endpoint(Phase::KeyConcepts)?;
        let request = self.machine.submit_url(url, level)?;
        self.run(endpoint, request).await
    }

    /// Continue from saved notes instead of running the phases they cover.
    pub async fn resume(&mut self, notes: StudyNotes) -> Result<()> {
        self.abandon_stale().await;
        self.machine.resume(notes)?;
        Ok(())
    }

    /// Run `phase` using results already in the session.
    pub async fn run_phase(&mut self, phase: Phase) -> Result<PhaseOutcome> {
        self.abandon_stale().await;
        let endpoint = self.config.endpoint(phase)?;
        let request = self.machine.start_phase(phase)?;
        self.run(endpoint, request).await
    }

    async fn run(&mut self, endpoint: Url, request: PhaseRequest) -> Result<PhaseOutcome> {
        let phase = request.phase();
        let body = request.to_json()?;
        let deadline = Instant::now() + self.config.phase_timeout;

        self.cancel.send_replace(false);
        let mut cancel_rx = self.cancel.subscribe();

        info!(%phase, %endpoint, "opening phase connection");
        let connected = tokio::select! {
            biased;
            _ = cancel_rx.wait_for(|c| *c) => None,
            r = timeout_at(deadline, self.connector.connect(&endpoint)) => Some(r),
        };

        let transition = match connected {
            None => Some(self.machine.cancel()),
            Some(Err(_elapsed)) => Some(self.machine.timed_out(self.config.phase_timeout)),
            Some(Ok(Err(e))) => Some(self.machine.connection_failed(&e.to_string())),
            Some(Ok(Ok(transport))) => {
                self.connection = Some(transport);
                None
            }
        };
        if let Some(t) = transition {
            self.emit(&t);
            return Ok(PhaseOutcome::from_transition(t, phase));
        }

        if let Some(connection) = self.connection.as_mut() {
            if let Err(e) = connection.send_text(body).await {
                let t = self.machine.connection_failed(&e.to_string());
                self.emit(&t);
                self.teardown().await;
                return Ok(PhaseOutcome::from_transition(t, phase));
            }
        }

        loop {
            let Some(connection) = self.connection.as_mut() else {
                let t = self.machine.connection_closed();
                self.emit(&t);
                return Ok(PhaseOutcome::from_transition(t, phase));
            };

            let inbound = tokio::select! {
                biased;
                _ = cancel_rx.wait_for(|c| *c) => Inbound::Cancelled,
                r = timeout_at(deadline, connection.recv_text()) => match r {
                    Err(_elapsed) => Inbound::TimedOut,
                    Ok(Ok(Some(text))) => Inbound::Frame(text),
                    Ok(Ok(None)) => Inbound::Closed,
                    Ok(Err(e)) => Inbound::Broken(e),
                },
            };

            let closed = !matches!(inbound, Inbound::Frame(_));
            let transition = match inbound {
                Inbound::Frame(text) => self.machine.handle_text(&text),
                Inbound::Closed => self.machine.connection_closed(),
                Inbound::Broken(e) => self.machine.connection_failed(&e.to_string()),
                Inbound::TimedOut => self.machine.timed_out(self.config.phase_timeout),
                Inbound::Cancelled => self.machine.cancel(),
            };
            self.emit(&transition);

            if transition.is_terminal() || closed {
                self.teardown().await;
                return Ok(PhaseOutcome::from_transition(transition, phase));
            }
        }
    }

    /// Close the live connection, if any, and stop the loading phase.
    pub async fn cancel(&mut self) -> Transition {
        self.teardown().await;
        let t = self.machine.cancel();
        self.emit(&t);
        t
    }

    pub fn answer_question(&mut self, question: usize, option: usize) -> bool {
        self.machine.answer_question(question, option)
    }

    pub fn submit_quiz(&mut self) -> std::result::Result<u8, SessionError> {
        self.machine.submit_quiz()
    }

    pub fn retake_quiz(&mut self) {
        self.machine.retake_quiz()
    }

    pub fn toggle_section(&mut self, phase: Phase) {
        self.machine.toggle_section(phase)
    }
}
