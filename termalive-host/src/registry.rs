//! Concurrent session map.
//!
//! A `RwLock<HashMap<..>>` is the closest `std` gets to "lock-free reads,
//! synchronized insertions/removals" without pulling in a concurrent map
//! crate; reads (list/get) take the shared side, insert/remove take the
//! exclusive side.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use termalive_session::ManagedSession;

#[derive(Default)]
pub(crate) struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ManagedSession>>>,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.read().expect("registry poisoned").len()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.sessions.read().expect("registry poisoned").contains_key(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<ManagedSession>> {
        self.sessions.read().expect("registry poisoned").get(id).cloned()
    }

    pub(crate) fn insert(&self, session: Arc<ManagedSession>) {
        self.sessions
            .write()
            .expect("registry poisoned")
            .insert(session.id().to_string(), session);
    }

    pub(crate) fn remove(&self, id: &str) -> Option<Arc<ManagedSession>> {
        self.sessions.write().expect("registry poisoned").remove(id)
    }

    pub(crate) fn list(&self) -> Vec<Arc<ManagedSession>> {
        self.sessions.read().expect("registry poisoned").values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termalive_session::SessionOptions;

    #[cfg(unix)]
    #[test]
    fn insert_then_remove_round_trips() {
        let registry = SessionRegistry::new();
        let session =
            ManagedSession::spawn(SessionOptions::new("s1", "/bin/cat")).expect("spawn cat");
        registry.insert(Arc::clone(&session));
        assert!(registry.contains("s1"));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove("s1").expect("present");
        assert_eq!(removed.id(), "s1");
        assert!(!registry.contains("s1"));
        let _ = session.kill(true);
    }
}
