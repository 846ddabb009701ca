//! Crawl session registry
//!
//! Maps session keys to independent crawl engines so several crawls can be
//! driven from one process. Removing a session disposes its engine.

use crate::crawler::CrawlEngine;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Engines keyed by session id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<CrawlEngine>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session's engine, creating an idle one if needed
    pub fn get_or_create(&self, key: &str) -> Arc<CrawlEngine> {
        let mut sessions = self.sessions.lock();
        let engine = sessions.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!("Creating crawl session {}", key);
            Arc::new(CrawlEngine::new())
        });
        Arc::clone(engine)
    }

    pub fn get(&self, key: &str) -> Option<Arc<CrawlEngine>> {
        self.sessions.lock().get(key).cloned()
    }

    /// Removes a session and disposes its engine
    ///
    /// Returns false if no such session existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.lock().remove(key);
        match removed {
            Some(engine) => {
                engine.dispose();
                tracing::debug!("Disposed crawl session {}", key);
                true
            }
            None => false,
        }
    }

    /// Disposes every session
    pub fn dispose_all(&self) {
        let sessions: Vec<_> = self.sessions.lock().drain().collect();
        for (key, engine) in sessions {
            engine.dispose();
            tracing::debug!("Disposed crawl session {}", key);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
