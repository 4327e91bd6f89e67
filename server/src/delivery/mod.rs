//! Best-effort push of delivery events to live sessions.
//!
//! Nothing here queues or retries. A recipient without a session simply
//! misses the push and picks the change up on its next fetch from the store.

pub mod dispatcher;
pub mod receipts;

pub use dispatcher::Dispatcher;
pub use receipts::ReadReceipts;
