//! Per-name replacement guard
//!
//! Two replacements of the same container would fight over its name. The
//! guard registry admits one in-flight replacement per name and rejects the
//! rest; replacements of different names never wait on each other.

use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ReplaceGuards {
    in_flight: Arc<DashMap<String, ()>>,
}

impl ReplaceGuards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`; `None` if a replacement of it is already running
    ///
    /// Uses the entry API so check-and-insert is atomic.
    pub fn try_acquire(&self, name: &str) -> Option<ReplaceGuard> {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(name.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(());
                Some(ReplaceGuard {
                    name: name.to_string(),
                    in_flight: self.in_flight.clone(),
                })
            }
        }
    }

    #[inline]
    pub fn is_busy(&self, name: &str) -> bool {
        self.in_flight.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Releases the name when dropped
#[derive(Debug)]
pub struct ReplaceGuard {
    name: String,
    in_flight: Arc<DashMap<String, ()>>,
}

impl Drop for ReplaceGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.name);
    }
}
