//! Options for query atoms.

use cynos_collection::LiveQueryConfig;
use std::time::Duration;

/// Options for [`query_atom`](crate::query_atom) and its variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long the atom's live query collection survives its last
    /// subscriber. Zero cleans it up immediately.
    pub gc_time: Duration,
    /// Start the live query's sync as soon as it is created.
    pub start_sync: bool,
    /// Hint for hosts that suspend while a result is `Initial`. Stored and
    /// exposed, never interpreted here.
    pub suspend_on_waiting: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            gc_time: Duration::ZERO,
            start_sync: true,
            suspend_on_waiting: false,
        }
    }
}

impl QueryOptions {
    /// Creates the default options: no GC delay, sync started, no suspension.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    #[must_use]
    pub fn with_start_sync(mut self, start_sync: bool) -> Self {
        self.start_sync = start_sync;
        self
    }

    #[must_use]
    pub fn with_suspend_on_waiting(mut self, suspend_on_waiting: bool) -> Self {
        self.suspend_on_waiting = suspend_on_waiting;
        self
    }

    pub(crate) fn live_config(&self) -> LiveQueryConfig {
        LiveQueryConfig::default()
            .with_gc_time(Some(self.gc_time))
            .with_start_sync(self.start_sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = QueryOptions::default();
        assert_eq!(options, QueryOptions::new());
        assert_eq!(options.gc_time, Duration::ZERO);
        assert!(options.start_sync);
        assert!(!options.suspend_on_waiting);
    }

    #[test]
    fn test_live_config() {
        let config = QueryOptions::new()
            .with_gc_time(Duration::from_secs(30))
            .with_start_sync(false)
            .live_config();
        assert_eq!(config.gc_time, Some(Duration::from_secs(30)));
        assert!(!config.start_sync);
    }
}
