pub mod authenticator;
pub mod jwt;
pub mod middleware;

pub use authenticator::{authenticate, AuthError, ConnectionAttempt, Identity};
