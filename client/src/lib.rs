//! Outer surface of the jailpool client: HTTP transport, configuration,
//! logging, and the [`ChallengeSession`] facade that ties the pipeline
//! together.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpTransport;
pub use logging::{init_logging, LogFormat};
pub use session::{ChallengeSession, MessageLifecycle};
