use std::sync::{Mutex, Weak};

/// Compact once the live set grows past this many entries.
const COMPACTION_THRESHOLD: usize = 50;

/// A registry of weak references to a Connection's live children (prepared statements,
/// or — for the cursor driver — result sets).
///
/// Guarded by its own short-lived, non-recursive mutex, deliberately never the
/// connection's mutex: a child unregistering itself during its own `Drop` must not
/// re-enter a lock the connection might already be holding.
pub struct Registry<T> {
    entries: Mutex<Vec<Weak<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new child, compacting dead entries first if the set has grown large.
    pub fn register(&self, child: Weak<T>) {
        let mut entries = self.entries.lock().expect("registry mutex poisoned");
        if entries.len() >= COMPACTION_THRESHOLD {
            entries.retain(|weak| weak.strong_count() > 0);
        }
        entries.push(child);
    }

    /// Returns every currently-live child, upgraded to a strong reference.
    ///
    /// Collects into a `Vec` while the registry lock is held, then returns without it —
    /// callers that need to act on each child (e.g. closing it) must release the
    /// registry lock before calling into the child, since the child's own teardown may
    /// re-enter this registry to unregister itself.
    pub fn live_children(&self) -> Vec<std::sync::Arc<T>> {
        let entries = self.entries.lock().expect("registry mutex poisoned");
        entries.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every dead entry immediately, regardless of size.
    pub fn compact(&self) {
        let mut entries = self.entries.lock().expect("registry mutex poisoned");
        entries.retain(|weak| weak.strong_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn compacts_past_threshold() {
        let registry: Registry<u32> = Registry::new();
        // Fill with entries that immediately die.
        for i in 0..COMPACTION_THRESHOLD {
            let arc = Arc::new(i as u32);
            registry.register(Arc::downgrade(&arc));
            // arc dropped here, entry becomes dead
        }
        assert_eq!(registry.len(), COMPACTION_THRESHOLD);

        let kept = Arc::new(999u32);
        registry.register(Arc::downgrade(&kept));
        // Past-threshold registration should have compacted the dead entries first.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn live_children_filters_dead_weak_refs() {
        let registry: Registry<u32> = Registry::new();
        let kept = Arc::new(1u32);
        registry.register(Arc::downgrade(&kept));
        {
            let temp = Arc::new(2u32);
            registry.register(Arc::downgrade(&temp));
        }
        let live = registry.live_children();
        assert_eq!(live.len(), 1);
        assert_eq!(*live[0], 1);
    }
}
