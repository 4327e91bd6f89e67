//! Message store and the REST request layer that sits in front of delivery.
//!
//! Every mutating handler persists first and pushes second. If persistence
//! fails the dispatcher is never called.

pub mod handlers;
pub mod store;
