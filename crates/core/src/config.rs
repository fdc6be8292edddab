use std::time::Duration;

use url::Url;

use crate::{error::Result, phase::Phase};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, `http(s)://` or `ws(s)://`.
    pub backend_url: Url,
    /// Longest wait for a terminal message before the phase is failed.
    pub phase_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse(DEFAULT_BACKEND_URL).expect("default backend url is valid"),
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(backend_url: &str) -> Result<Self> {
        Ok(Self {
            backend_url: Url::parse(backend_url)?,
            ..Self::default()
        })
    }

    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    fn join(&self, path: &str) -> Result<Url> {
        let mut base = self.backend_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path)?)
    }

    /// Websocket endpoint for a phase, e.g. `ws://host/ws/phase3`.
    pub fn endpoint(&self, phase: Phase) -> Result<Url> {
        let mut url = self.join(&format!("ws/{}", phase.endpoint_name()))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // http <-> ws are both "special" schemes, so this cannot fail
        let _ = url.set_scheme(scheme);
        Ok(url)
    }

    pub fn health_url(&self) -> Result<Url> {
        let mut url = self.join("health")?;
        let scheme = match url.scheme() {
            "wss" | "https" => "https",
            _ => "http",
        };
        let _ = url.set_scheme(scheme);
        Ok(url)
    }
}
