//! Group sessions: creation, lookup by code, join, leave and close.
//!
//! A session is reachable through a 4-digit code that is unique among
//! active sessions. The creator is the leader for the session's whole
//! life; nothing transfers leadership.

mod registry;
mod types;

pub use registry::SessionRegistry;
pub use types::{CreatedSession, JoinedSession, Session, SessionSnapshot};
