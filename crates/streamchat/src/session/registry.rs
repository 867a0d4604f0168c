//! Registry mapping session keys to live sessions.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;

use super::{Session, SessionDeps, SessionError, SessionKey, SessionSummary, SourceChannels};

/// Process-wide map of live sessions.
///
/// Lookup-and-create happens under the map's entry lock, so concurrent first
/// requests for the same key still produce a single session.
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionKey, Arc<Session>>>,
    deps: SessionDeps,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            deps,
        }
    }

    /// Find or start the session for a channel set.
    pub fn resolve(&self, channels: &SourceChannels) -> Result<Arc<Session>, SessionError> {
        let channels = channels.clone().normalized();
        let key = SessionKey::from_channels(&channels).ok_or(SessionError::EmptyKey)?;
        Ok(self.get_or_create(&key, &channels))
    }

    /// Return the live session for `key`, starting one if there is none.
    ///
    /// A registered session that has already closed is replaced.
    pub fn get_or_create(&self, key: &SessionKey, channels: &SourceChannels) -> Arc<Session> {
        match self.sessions.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_closed() {
                    return entry.get().clone();
                }
                debug!("[{}] Replacing closed session", key);
                let session = self.start(key, channels);
                entry.insert(session.clone());
                session
            }
            Entry::Vacant(entry) => {
                let session = self.start(key, channels);
                entry.insert(session.clone());
                session
            }
        }
    }

    fn start(&self, key: &SessionKey, channels: &SourceChannels) -> Arc<Session> {
        let sessions = Arc::downgrade(&self.sessions);
        let exit_key = key.clone();
        Session::start(key.clone(), channels.clone(), &self.deps, move |id| {
            let Some(sessions) = sessions.upgrade() else {
                return;
            };
            if sessions
                .remove_if(&exit_key, |_, session| session.id() == id)
                .is_some()
            {
                debug!("[{}] Session removed from registry", exit_key);
            }
        })
    }

    pub fn get(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Summaries of all registered sessions, sorted by key.
    pub async fn snapshot(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            summaries.push(session.summary().await);
        }
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        summaries
    }

    /// Close every session.
    pub fn shutdown(&self) {
        for entry in self.sessions.iter() {
            entry.value().close();
        }
    }
}
