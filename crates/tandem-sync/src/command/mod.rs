//! Point-to-point commands from a remote control to a presentation client.
//!
//! Commands are persisted, then published on `remote-<code>`. Delivery is
//! fire-and-forget: the sender gets the command id back but never learns
//! whether it ran. The presentation side runs a [`CommandReceiver`] that
//! executes each command once and flips its executed flag.

mod receiver;
mod relay;
mod types;

pub use receiver::{CommandHandler, CommandReceiver};
pub use relay::CommandRelay;
pub use types::{Command, CommandMessage, RemoteCommand};
