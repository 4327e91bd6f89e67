use crate::config::KeepaliveConfig;
use crate::db::DbPool;
use crate::delivery::{Dispatcher, ReadReceipts};
use crate::ws::SessionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Live sessions, one per user
    pub sessions: SessionRegistry,
    /// Push path into `sessions`
    pub dispatcher: Dispatcher,
    pub receipts: ReadReceipts,
    pub keepalive: KeepaliveConfig,
}

impl AppState {
    /// Wire a fresh registry to its dispatcher and read-receipt synchronizer.
    pub fn new(db: DbPool, jwt_secret: Vec<u8>, keepalive: KeepaliveConfig) -> Self {
        let sessions = SessionRegistry::new();
        let dispatcher = Dispatcher::new(sessions.clone());
        let receipts = ReadReceipts::new(dispatcher.clone());
        Self {
            db,
            jwt_secret,
            sessions,
            dispatcher,
            receipts,
            keepalive,
        }
    }
}
