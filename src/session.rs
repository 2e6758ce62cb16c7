// Session gate: demo credential check with delayed result delivery

use crate::error::{Error, Result};
use crate::storage::{Backend, SESSION_KEY};
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// The one accepted credential pair. A demo stub, not a security mechanism:
/// no hashing, no rate limiting, no expiry.
pub const DEMO_USERNAME: &str = "admin";
pub const DEMO_PASSWORD: &str = "GAS1234";

/// Delay before a login attempt resolves, mimicking a round trip.
const LOGIN_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
}

/// An in-flight login attempt. The outcome is decided up front; delivery is
/// delayed so callers treat login as asynchronous and block re-entrant
/// submission while one is pending.
pub struct PendingLogin {
    rx: mpsc::Receiver<Result<Session>>,
}

impl PendingLogin {
    /// Block until the attempt resolves.
    pub fn wait(self) -> Result<Session> {
        self.rx.recv().expect("login worker sends exactly one result")
    }
}

/// Gates access behind the hardcoded pair and keeps the session marker in
/// the persistent store.
pub struct SessionGate {
    backend: Box<dyn Backend>,
}

impl SessionGate {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Check the credentials and hand back a delayed result. On success the
    /// session marker is persisted before the handle resolves; marker
    /// persistence is best-effort like the record snapshots.
    pub fn login(&mut self, username: &str, password: &str) -> PendingLogin {
        let outcome = if username == DEMO_USERNAME && password == DEMO_PASSWORD {
            let session = Session {
                username: username.to_string(),
            };
            if let Err(e) = self.persist_marker(&session) {
                warn!(error = %e, "failed to persist session marker");
            }
            info!(username, "login accepted");
            Ok(session)
        } else {
            info!(username, "login rejected");
            Err(Error::InvalidCredentials)
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            thread::sleep(LOGIN_DELAY);
            let _ = tx.send(outcome);
        });
        PendingLogin { rx }
    }

    fn persist_marker(&mut self, session: &Session) -> Result<()> {
        let marker = serde_json::to_string(session)?;
        self.backend.write(SESSION_KEY, &marker)
    }

    /// Clear the persisted marker.
    pub fn logout(&mut self) -> Result<()> {
        self.backend.remove(SESSION_KEY)?;
        info!("session cleared");
        Ok(())
    }

    /// The session persisted by the last successful login, if any.
    pub fn current(&self) -> Option<Session> {
        let raw = match self.backend.read(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read session marker");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "session marker unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use std::time::Instant;

    fn gate() -> SessionGate {
        SessionGate::new(Box::new(MemoryBackend::default()))
    }

    #[test]
    fn test_login_accepts_demo_pair() {
        let mut gate = gate();
        let session = gate.login(DEMO_USERNAME, DEMO_PASSWORD).wait().unwrap();
        assert_eq!(session.username, DEMO_USERNAME);
        assert_eq!(gate.current(), Some(session));
    }

    #[test]
    fn test_demo_pair_literals() {
        // The accepted pair is fixed; spelled out so the constants cannot
        // drift without a test noticing.
        let mut gate = gate();
        let session = gate.login("admin", "GAS1234").wait().unwrap();
        assert_eq!(session.username, "admin");
    }

    #[test]
    fn test_login_rejects_wrong_pair() {
        let mut gate = gate();
        let err = gate.login("admin", "wrong").wait().unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert_eq!(gate.current(), None);

        let err = gate.login("root", DEMO_PASSWORD).wait().unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }

    #[test]
    fn test_login_result_is_delayed() {
        let mut gate = gate();
        let started = Instant::now();
        let pending = gate.login(DEMO_USERNAME, DEMO_PASSWORD);
        // Returns immediately; only wait() observes the delay
        assert!(started.elapsed() < LOGIN_DELAY);
        pending.wait().unwrap();
        assert!(started.elapsed() >= LOGIN_DELAY);
    }

    #[test]
    fn test_logout_clears_marker() {
        let mut gate = gate();
        gate.login(DEMO_USERNAME, DEMO_PASSWORD).wait().unwrap();
        assert!(gate.current().is_some());

        gate.logout().unwrap();
        assert_eq!(gate.current(), None);

        // Logging out twice is harmless
        gate.logout().unwrap();
    }

    #[test]
    fn test_corrupt_marker_reads_as_logged_out() {
        let mut backend = MemoryBackend::default();
        backend.write(SESSION_KEY, "{not json").unwrap();
        let gate = SessionGate::new(Box::new(backend));
        assert_eq!(gate.current(), None);
    }
}
