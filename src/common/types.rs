//! Shared types used across the application.

use std::collections::HashSet;
use std::fmt;

/// Name of an IRC channel as configured, e.g. `#caa`.
///
/// IRC channel names compare case-insensitively, so lookups go through
/// [`IrcChannel::key`] while the configured spelling is kept for display
/// and for outbound commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrcChannel(String);

impl IrcChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded lookup key.
    pub fn key(&self) -> String {
        channel_key(&self.0)
    }

    /// Whether `name` is a channel target rather than a nickname.
    pub fn is_channel_name(name: &str) -> bool {
        name.starts_with(|c: char| matches!(c, '#' | '&' | '+' | '!'))
    }
}

impl fmt::Display for IrcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IrcChannel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Case-folded form of an IRC channel name.
pub fn channel_key(name: &str) -> String {
    name.to_lowercase()
}

/// Name of a Slack channel including the leading `#`, e.g. `#caa-on-slack`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlackChannel(String);

impl SlackChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlackChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlackChannel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Nicknames present in one IRC channel.
pub type NickSet = HashSet<String>;
