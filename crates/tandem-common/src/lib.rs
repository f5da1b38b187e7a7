pub mod errors;
pub mod id;
pub mod topic;

pub use errors::{ConfigError, SyncError, TandemError};
pub use id::{new_correlation_id, new_id, ParticipantId, SessionId};
pub use topic::{TopicKey, TopicKind};

pub type Result<T> = std::result::Result<T, TandemError>;
