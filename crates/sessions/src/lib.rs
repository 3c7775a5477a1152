//! Transport session manager for the Birdcall tool server.
//!
//! One [`Session`] per MCP client connection, keyed by an opaque UUID that
//! travels in the `mcp-session-id` header. Sessions are created by
//! `initialize` requests, reused on every later request, and removed when
//! closed explicitly or swept for idleness.

pub mod error;
pub mod lifecycle;
pub mod store;

pub use error::SessionError;
pub use lifecycle::IdlePolicy;
pub use store::{NotificationStream, Session, SessionStore};
