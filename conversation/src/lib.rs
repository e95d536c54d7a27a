//! Conversation handling for the jailpool pipeline.
//!
//! Owns the transcript and the two loops that write to it: the stream
//! consumer appending an in-flight assistant reply, and the background
//! poller refreshing challenge state. Their only synchronization point is
//! the [`StreamingFlag`]: while a reply streams, the poller leaves the
//! transcript alone.

pub mod error;
pub mod poller;
pub mod sanitize;
pub mod state;
pub mod stream;
pub mod submitter;
pub mod transcript;

pub use error::ConversationError;
pub use poller::{ChallengePoller, DEFAULT_POLL_INTERVAL};
pub use sanitize::sanitize_prompt;
pub use state::{ActiveIdentity, ChallengeState};
pub use stream::{StreamConsumer, StreamingFlag};
pub use submitter::ConversationSubmitter;
pub use transcript::Transcript;
