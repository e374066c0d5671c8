//! Collection configuration.

use crate::sync::SyncSource;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// How long an unobserved collection lingers before GC cleans it up.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// Derives an entity's key from its value.
pub type KeyFn<K, V> = Rc<dyn Fn(&V) -> K>;

/// Options for [`Collection::new`](crate::Collection::new).
///
/// # Example
///
/// ```ignore
/// let todos = Collection::new(
///     CollectionConfig::new()
///         .with_id("todos")
///         .with_get_key(|todo: &Todo| todo.id)
///         .with_sync(source)
///         .with_start_sync(true),
/// );
/// ```
pub struct CollectionConfig<K, V> {
    pub(crate) id: Option<String>,
    pub(crate) get_key: Option<KeyFn<K, V>>,
    pub(crate) sync: Option<Rc<dyn SyncSource<K, V>>>,
    pub(crate) gc_time: Option<Duration>,
    pub(crate) start_sync: bool,
}

impl<K, V> Default for CollectionConfig<K, V> {
    fn default() -> Self {
        Self {
            id: None,
            get_key: None,
            sync: None,
            gc_time: Some(DEFAULT_GC_TIME),
            start_sync: false,
        }
    }
}

impl<K, V> CollectionConfig<K, V> {
    /// Creates a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collection ID used in logs and error messages.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the key extractor used by local `insert`/`update`.
    #[must_use]
    pub fn with_get_key<F>(mut self, get_key: F) -> Self
    where
        F: Fn(&V) -> K + 'static,
    {
        self.get_key = Some(Rc::new(get_key));
        self
    }

    /// Sets the sync source. Without one the collection is local-only and
    /// becomes ready as soon as sync starts.
    #[must_use]
    pub fn with_sync<S>(mut self, source: S) -> Self
    where
        S: SyncSource<K, V> + 'static,
    {
        self.sync = Some(Rc::new(source));
        self
    }

    /// Sets the GC delay. `None` disables automatic cleanup and
    /// `Some(Duration::ZERO)` cleans up as soon as the last subscriber leaves.
    #[must_use]
    pub fn with_gc_time(mut self, gc_time: Option<Duration>) -> Self {
        self.gc_time = gc_time;
        self
    }

    /// Starts sync on construction instead of on first demand.
    #[must_use]
    pub fn with_start_sync(mut self, start_sync: bool) -> Self {
        self.start_sync = start_sync;
        self
    }
}

impl<K, V> fmt::Debug for CollectionConfig<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionConfig")
            .field("id", &self.id)
            .field("has_get_key", &self.get_key.is_some())
            .field("has_sync", &self.sync.is_some())
            .field("gc_time", &self.gc_time)
            .field("start_sync", &self.start_sync)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: CollectionConfig<u32, String> = CollectionConfig::new();
        assert!(config.id.is_none());
        assert!(config.sync.is_none());
        assert_eq!(config.gc_time, Some(DEFAULT_GC_TIME));
        assert!(!config.start_sync);
    }

    #[test]
    fn test_config_builders() {
        let config: CollectionConfig<u32, (u32, &str)> = CollectionConfig::new()
            .with_id("todos")
            .with_get_key(|v: &(u32, &str)| v.0)
            .with_gc_time(None)
            .with_start_sync(true);

        assert_eq!(config.id.as_deref(), Some("todos"));
        assert_eq!(config.get_key.as_ref().map(|k| k(&(7, "x"))), Some(7));
        assert_eq!(config.gc_time, None);
        assert!(config.start_sync);
    }
}
