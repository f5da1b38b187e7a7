//! Leader state propagation.
//!
//! [`StateBroadcaster`] is the write side: it authorizes a leader or
//! co-leader, overwrites the session record, and publishes the new
//! snapshot on the session topic. [`Follower`] is the read side a
//! participant's client runs.

mod broadcaster;
mod follower;
mod types;

pub use broadcaster::StateBroadcaster;
pub use follower::{Follower, FollowerEvent};
pub use types::{StateDelta, StateSnapshot};
