//! Outbound send capabilities of each network.
//!
//! The relay loops talk to the networks only through these traits. Sends
//! are fire-and-forget: implementations enqueue and return, and a
//! returned error is logged by the caller and dropped.

use crate::common::error::SendResult;
use crate::common::types::{IrcChannel, SlackChannel};

/// Sending to IRC.
pub trait IrcSender {
    fn send_message(&self, channel: &IrcChannel, text: &str) -> SendResult<()>;

    /// Send a CTCP ACTION (`/me`).
    fn send_action(&self, channel: &IrcChannel, text: &str) -> SendResult<()>;

    fn join(&self, channel: &IrcChannel, key: Option<&str>) -> SendResult<()>;
}

/// Posting to Slack.
pub trait SlackSender {
    /// Post under the display name of an IRC user, with an avatar derived
    /// from the name.
    fn send_as(&self, display_name: &str, channel: &SlackChannel, text: &str) -> SendResult<()>;

    /// Post a bridge notice with Slack mention parsing enabled.
    fn send_as_bot(&self, channel: &SlackChannel, text: &str) -> SendResult<()>;

    /// Direct-message the owner.
    fn send_to_owner(&self, text: &str) -> SendResult<()>;
}
