//! Debounced re-detection after DOM mutations
//!
//! Single-page apps render forms in bursts. Each qualifying mutation
//! pushes the deadline out by the debounce interval; when it finally
//! passes, the page is reclassified once and a change notice is produced
//! only if the field counts moved.

use crate::field_detection::{FieldCounts, FieldDetector};
use crate::page::{Mutation, PageDom};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct FieldWatcher {
    debounce: Duration,
    deadline: Option<Instant>,
    last_counts: FieldCounts,
}

impl FieldWatcher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
            last_counts: FieldCounts::default(),
        }
    }

    /// Record the counts of a classification done outside the watcher
    pub fn prime(&mut self, counts: FieldCounts) {
        self.last_counts = counts;
    }

    /// Returns true when the mutation (re)armed the timer
    pub fn on_mutation(&mut self, mutation: &Mutation, now: Instant) -> bool {
        if !mutation.adds_candidate_input() {
            return false;
        }
        self.deadline = Some(now + self.debounce);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.map(|d| now >= d).unwrap_or(false)
    }

    /// Reclassify; `Some(counts)` only when they differ from last time
    pub fn fire<P: PageDom + ?Sized>(
        &mut self,
        detector: &mut FieldDetector,
        page: &P,
    ) -> Option<FieldCounts> {
        self.deadline = None;
        let before = self.last_counts;
        let after = detector.refresh(page);
        self.last_counts = after;

        if after == before {
            debug!("Re-detection found no change in field counts");
            None
        } else {
            Some(after)
        }
    }
}

impl Default for FieldWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{InputKind, InputSpec, MemoryPage};

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_mutations_fires_once_after_quiet_period() {
        let mut page = MemoryPage::new();
        let mut detector = FieldDetector::new();
        let mut watcher = FieldWatcher::default();

        let (_, m1) = page.add_input(InputSpec::new(InputKind::Text).name("username"));
        assert!(watcher.on_mutation(&m1, Instant::now()));

        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(!watcher.is_due(Instant::now()));

        let (_, m2) = page.add_input(InputSpec::new(InputKind::Password));
        assert!(watcher.on_mutation(&m2, Instant::now()));

        // 300ms after the second mutation: the first deadline has passed
        // but the timer was pushed out
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(!watcher.is_due(Instant::now()));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(watcher.is_due(Instant::now()));

        let counts = watcher.fire(&mut detector, &page);
        assert_eq!(
            counts,
            Some(FieldCounts {
                password_fields: 1,
                username_fields: 1
            })
        );
        assert!(watcher.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_mutations_do_not_arm_the_timer() {
        let mut watcher = FieldWatcher::default();
        assert!(!watcher.on_mutation(&Mutation::Removed(2), Instant::now()));
        assert!(!watcher.on_mutation(&Mutation::Added(vec![InputKind::Checkbox]), Instant::now()));
        assert!(watcher.deadline().is_none());
    }

    #[test]
    fn test_unchanged_counts_produce_no_notice() {
        let mut page = MemoryPage::new();
        page.add_input(InputSpec::new(InputKind::Password));
        let mut detector = FieldDetector::new();
        let mut watcher = FieldWatcher::default();
        watcher.prime(detector.refresh(&page));

        // Swapping one password field for another leaves the counts alone
        let pw = page.inputs()[0].id;
        page.replace(pw, InputSpec::new(InputKind::Password));
        assert_eq!(watcher.fire(&mut detector, &page), None);
    }
}
