use lancedb::Table;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

/// Per-namespace state: the writer lock and the lazily opened table handle.
#[derive(Default)]
pub struct NamespaceHandle {
    /// Held across the whole exists-check / create-or-add / cache sequence.
    pub(crate) write_lock: AsyncMutex<()>,
    pub(crate) table: RwLock<Option<Table>>,
}

impl NamespaceHandle {
    pub(crate) async fn cached_table(&self) -> Option<Table> {
        self.table.read().await.clone()
    }

    pub(crate) async fn cache(&self, table: Table) {
        *self.table.write().await = Some(table);
    }
}

/// Explicit namespace -> handle map owned by one index instance.
#[derive(Default)]
pub struct NamespaceRegistry {
    handles: Mutex<HashMap<String, Arc<NamespaceHandle>>>,
}

impl NamespaceRegistry {
    pub fn handle(&self, namespace: &str) -> Arc<NamespaceHandle> {
        let mut handles = self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(handles.entry(namespace.to_string()).or_default())
    }

    pub fn known(&self) -> Vec<String> {
        let handles = self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = handles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_namespace_shares_one_handle() {
        let registry = NamespaceRegistry::default();
        let a = registry.handle("news");
        let b = registry.handle("news");
        let c = registry.handle("earnings");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.known(), vec!["earnings", "news"]);
    }

    #[tokio::test]
    async fn writers_on_one_namespace_are_serialized() {
        let registry = Arc::new(NamespaceRegistry::default());
        let active = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let active = Arc::clone(&active);
            tasks.push(tokio::spawn(async move {
                let handle = registry.handle("news");
                let _guard = handle.write_lock.lock().await;
                let now = active.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(now, 0, "another writer was inside the critical section");
                tokio::task::yield_now().await;
                active.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.expect("task");
        }
    }
}
