use std::sync::Arc;

use tokio::sync::Mutex;

use atrium_store::Store;

/// Shared handler state. The store serializes behind an async mutex; the
/// SQLite busy timeout bounds how long a statement may block beneath it.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn store(&self) -> tokio::sync::MutexGuard<'_, Store> {
        self.store.lock().await
    }
}
