//! Registry of persistent named sessions, served to any number of remote
//! clients over WebSocket and/or a platform pipe.

use std::sync::Arc;

use termalive_protocol::SessionRecord;
use termalive_session::{ManagedSession, OutputStream, SessionOptions};

use crate::config::HostConfig;
use crate::error::HostError;
use crate::registry::SessionRegistry;

pub struct SessionHost {
    config: HostConfig,
    sessions: SessionRegistry,
}

impl SessionHost {
    /// Construct a host and start its idle-session sweep. Must be called
    /// from within a Tokio runtime, since the sweep is a spawned task.
    #[must_use]
    pub fn new(config: HostConfig) -> Arc<Self> {
        let host = Arc::new(Self { config, sessions: SessionRegistry::new() });
        spawn_idle_sweep(Arc::clone(&host));
        host
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionRecord> {
        self.sessions.list().iter().map(|session| SessionRecord::from(&session.info())).collect()
    }

    /// Spawn a new session: rejects a duplicate id or a registry already at
    /// `max_sessions` before paying for the spawn.
    pub async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<SessionRecord, HostError> {
        if self.sessions.contains(&options.id) {
            return Err(HostError::AlreadyExists(options.id));
        }
        if self.sessions.len() >= self.config.max_sessions {
            return Err(HostError::Capacity(self.config.max_sessions));
        }

        let session = tokio::task::spawn_blocking(move || ManagedSession::spawn(options))
            .await
            .expect("session spawn task panicked")?;
        let record = SessionRecord::from(&session.info());
        self.sessions.insert(session);
        Ok(record)
    }

    /// Look up a session and register a new subscriber, pairing the ring
    /// snapshot with subscription registration atomically.
    pub fn attach(&self, id: &str) -> Result<(SessionRecord, Vec<u8>, OutputStream), HostError> {
        let session = self.sessions.get(id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
        let (snapshot, stream) = session.subscribe();
        Ok((SessionRecord::from(&session.info()), snapshot, stream))
    }

    pub async fn send_input(&self, id: &str, bytes: Vec<u8>) -> Result<(), HostError> {
        let session = self.sessions.get(id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
        tokio::task::spawn_blocking(move || session.send_input(&bytes))
            .await
            .expect("send_input task panicked")?;
        Ok(())
    }

    pub async fn resize(&self, id: &str, columns: u16, rows: u16) -> Result<(), HostError> {
        let session = self.sessions.get(id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
        tokio::task::spawn_blocking(move || session.resize(columns, rows))
            .await
            .expect("resize task panicked")?;
        Ok(())
    }

    /// Remove and kill a session. Removal happens before the (possibly
    /// slow) kill call so a concurrent Attach never races a session that is
    /// in the process of going away.
    pub async fn kill_session(&self, id: &str, force: bool) -> Result<(), HostError> {
        let session = self.sessions.remove(id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
        tokio::task::spawn_blocking(move || session.kill(force))
            .await
            .expect("kill task panicked")?;
        Ok(())
    }

    /// One idle-sweep pass: the same registry removal path as
    /// `kill_session`, so user-initiated and sweep-initiated removal can
    /// never race each other.
    fn sweep_idle(&self) {
        for session in self.sessions.list() {
            if session.is_idle_expired() {
                log::warn!("session {} idle past its timeout, killing it", session.id());
                let _ = session.kill(true);
                self.sessions.remove(session.id());
            }
        }
    }
}

fn spawn_idle_sweep(host: Arc<SessionHost>) {
    let interval = host.config.idle_sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            host.sweep_idle();
        }
    });
}
