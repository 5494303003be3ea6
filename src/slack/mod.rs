//! Slack workspace adapter.
//!
//! - `api`: Web API calls over HTTPS
//! - `directory`: channel/user id caches and the owner's identity
//! - `markup`: Slack markup -> plain text
//! - `outbox`: ordered outbound post queue
//! - `socket`: Socket Mode event stream

pub mod api;
pub mod directory;
pub mod markup;
pub mod outbox;
pub mod socket;

pub use api::SlackApi;
pub use directory::SlackDirectory;
pub use markup::MarkupTranslator;
pub use outbox::{new_outbox, run_sender};
pub use socket::SocketModeClient;
