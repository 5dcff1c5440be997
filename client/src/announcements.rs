//! Faculty announcements and their client-side "seen" state.
//!
//! The contract owns creation and deactivation. Whether the viewer has seen
//! an announcement is tracked only locally, under [`SEEN_KEY`].

use crate::error::Result;
use crate::source::AnnouncementRecord;
use crate::storage::KeyValueStore;
use crate::types::Announcement;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Store key holding the seen announcement ids as a JSON array
pub const SEEN_KEY: &str = "seenAnnouncements";

/// Convert the contract's active-announcement list.
///
/// Ids are composite (`first6(announcer)-timestamp-index`) because list
/// positions alone are not stable across deactivations.
pub fn from_active_list(records: Vec<AnnouncementRecord>) -> Vec<Announcement> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let prefix: String = record.announcer.chars().take(6).collect();
            Announcement {
                id: format!("{}-{}-{}", prefix, record.timestamp, index),
                content: record.content,
                announcer: record.announcer,
                timestamp: i64::try_from(record.timestamp).unwrap_or(i64::MAX),
                is_active: record.is_active,
            }
        })
        .collect()
}

fn dedup_key(announcement: &Announcement) -> (String, i64, String) {
    (
        announcement.id.clone(),
        announcement.timestamp,
        announcement.announcer.clone(),
    )
}

/// Current announcements plus the viewer's seen list
#[derive(Debug, Clone)]
pub struct AnnouncementFeed<S> {
    announcements: Vec<Announcement>,
    store: S,
}

impl<S: KeyValueStore> AnnouncementFeed<S> {
    /// Create an empty feed over `store`
    pub fn new(store: S) -> Self {
        Self {
            announcements: Vec::new(),
            store,
        }
    }

    /// Replace the feed with a fresh fetch.
    ///
    /// Duplicates by `(id, timestamp, announcer)` collapse into the first
    /// position, keeping the last occurrence's content.
    pub fn replace(&mut self, fetched: Vec<Announcement>) {
        let mut positions: HashMap<(String, i64, String), usize> = HashMap::new();
        let mut unique: Vec<Announcement> = Vec::with_capacity(fetched.len());

        for announcement in fetched {
            let key = dedup_key(&announcement);
            match positions.get(&key) {
                Some(&index) => unique[index] = announcement,
                None => {
                    positions.insert(key, unique.len());
                    unique.push(announcement);
                }
            }
        }

        debug!("Announcement feed holds {} entries", unique.len());
        self.announcements = unique;
    }

    /// Apply a creation event; returns false if it was already present
    pub fn on_created(&mut self, announcement: Announcement) -> bool {
        let key = dedup_key(&announcement);
        if self.announcements.iter().any(|a| dedup_key(a) == key) {
            return false;
        }
        self.announcements.push(announcement);
        true
    }

    /// Apply a deactivation event; returns the number of entries removed
    pub fn on_deactivated(&mut self, id: &str) -> usize {
        let before = self.announcements.len();
        self.announcements.retain(|a| a.id != id);
        before - self.announcements.len()
    }

    /// All current announcements in feed order
    pub fn announcements(&self) -> &[Announcement] {
        &self.announcements
    }

    /// Announcements the viewer has not marked as seen
    pub fn unseen(&self) -> Vec<&Announcement> {
        let seen = self.seen_ids();
        self.announcements
            .iter()
            .filter(|a| !seen.contains(&a.id))
            .collect()
    }

    /// Mark an announcement as seen; returns false if it already was
    pub fn mark_seen(&mut self, id: &str) -> Result<bool> {
        let mut seen = self.seen_ids();
        if seen.iter().any(|s| s == id) {
            return Ok(false);
        }
        seen.push(id.to_string());
        self.store.set(SEEN_KEY, serde_json::to_string(&seen)?)?;
        Ok(true)
    }

    /// Persisted seen ids; unreadable state is logged and treated as empty
    pub fn seen_ids(&self) -> Vec<String> {
        match self.store.get(SEEN_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring corrupt seen-announcement list: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read seen announcements: {}", e);
                Vec::new()
            }
        }
    }
}
