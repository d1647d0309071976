//! Per-tab record of the latest field detection
//!
//! Entries are created when a page reports fields and are dropped as soon
//! as the tab navigates or closes, so stale counts never outlive the page
//! they describe.

use crate::field_detection::FieldCounts;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Browser tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TabId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionState {
    pub counts: FieldCounts,
    pub first_seen: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TabDetectionStore {
    tabs: HashMap<TabId, DetectionState>,
}

impl TabDetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest counts for a tab
    pub fn record(&mut self, tab: TabId, counts: FieldCounts) -> &DetectionState {
        let now = Utc::now();
        let state = self.tabs.entry(tab).or_insert_with(|| DetectionState {
            counts,
            first_seen: now,
            updated: now,
        });
        state.counts = counts;
        state.updated = now;
        state
    }

    pub fn get(&self, tab: TabId) -> Option<&DetectionState> {
        self.tabs.get(&tab)
    }

    /// The tab started loading a new page
    pub fn navigation_started(&mut self, tab: TabId) -> bool {
        let cleared = self.tabs.remove(&tab).is_some();
        if cleared {
            debug!("Cleared detection state for tab {:?} on navigation", tab);
        }
        cleared
    }

    pub fn tab_closed(&mut self, tab: TabId) -> bool {
        self.tabs.remove(&tab).is_some()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
