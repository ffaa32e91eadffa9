use std::collections::HashMap;

use log::{debug, info, warn};

use crate::errors::GridReplayError;

use super::{FileCache, Session, SessionKey};

/// A source of complete, historical session datasets.
///
/// The data provider is treated as a black box: an implementation either returns the
/// whole session for a key or fails. Nothing is streamed and nothing is queried again
/// after loading, so a replay never blocks on I/O once it has been built.
///
/// # Errors
///
/// Implementations return [`GridReplayError::SessionNotFound`] for sessions they do not
/// know about, and a load or parse error when the data exists but cannot be read.
pub trait SessionSource {
    /// Load the full dataset for `key`.
    fn load(&mut self, key: &SessionKey) -> Result<Session, GridReplayError>;

    /// Sessions this source can serve without further lookups, if it can tell.
    fn available_sessions(&self) -> Result<Vec<SessionKey>, GridReplayError> {
        Ok(Vec::new())
    }
}

/// Sessions held in memory, for tests and tooling.
#[derive(Default)]
pub struct InMemorySource {
    sessions: HashMap<SessionKey, Session>,
    load_count: usize,
}

impl InMemorySource {
    pub fn from_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        Self {
            sessions: sessions
                .into_iter()
                .map(|session| (session.key.clone(), session))
                .collect(),
            load_count: 0,
        }
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.key.clone(), session);
    }

    /// Number of successful loads served so far
    pub fn load_count(&self) -> usize {
        self.load_count
    }
}

impl SessionSource for InMemorySource {
    fn load(&mut self, key: &SessionKey) -> Result<Session, GridReplayError> {
        let session = self
            .sessions
            .get(key)
            .cloned()
            .ok_or_else(|| GridReplayError::SessionNotFound {
                session: key.to_string(),
            })?;
        self.load_count += 1;
        Ok(session)
    }

    fn available_sessions(&self) -> Result<Vec<SessionKey>, GridReplayError> {
        let mut keys = self.sessions.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}

/// Serves sessions from a [`FileCache`], falling back to an upstream source on a miss
/// and persisting what the upstream returns.
pub struct CachedSource<S: SessionSource> {
    upstream: S,
    cache: FileCache,
}

impl<S: SessionSource> CachedSource<S> {
    pub fn new(upstream: S, cache: FileCache) -> Self {
        Self { upstream, cache }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn upstream(&self) -> &S {
        &self.upstream
    }
}

impl<S: SessionSource> SessionSource for CachedSource<S> {
    fn load(&mut self, key: &SessionKey) -> Result<Session, GridReplayError> {
        if self.cache.contains(key) {
            match self.cache.load(key) {
                Ok(session) => {
                    debug!("Cache hit for {}", key);
                    return Ok(session);
                }
                Err(e) => warn!("Cached dataset for {} is unusable, refetching: {}", key, e),
            }
        }

        info!("Fetching {} from upstream source", key);
        let session = self.upstream.load(key)?;
        if let Err(e) = self.cache.save(&session) {
            warn!("Could not cache {}: {}", key, e);
        }
        Ok(session)
    }

    fn available_sessions(&self) -> Result<Vec<SessionKey>, GridReplayError> {
        let mut keys = self.cache.list_available_sessions()?;
        keys.extend(self.upstream.available_sessions()?);
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
