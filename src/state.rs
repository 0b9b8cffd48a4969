use crate::auth::Sessions;
use crate::config::Config;
use crate::storage::Store;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub sessions: Sessions,
    /// Serializes every read-check-write against the store.
    pub writes: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            sessions: Sessions::with_ttl(config.session_ttl),
            config: Arc::new(config),
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }
}
