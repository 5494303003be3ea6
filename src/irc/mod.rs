//! IRC network adapter.
//!
//! - `message`: IRC line parsing and serialization
//! - `codec`: tokio-util line codec
//! - `roster`: live channel membership
//! - `session`: protocol handling, inbound messages to relay events
//! - `client`: connection task and the cloneable send handle

pub mod client;
pub mod codec;
pub mod message;
pub mod roster;
pub mod session;

pub use client::new_irc_client;
