//! Inbound events delivered by the network adapters to the relay loops.

/// An event observed on the IRC connection.
///
/// `mask` is the full message prefix (`nick!user@host`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Registration finished (numeric 001).
    Connected,
    /// The connection ended.
    Disconnected,
    /// A PRIVMSG to a channel or to the bridge itself.
    Message {
        nick: String,
        target: String,
        text: String,
    },
    /// A CTCP ACTION (`/me`).
    Action {
        nick: String,
        target: String,
        text: String,
    },
    Join {
        nick: String,
        mask: String,
        channel: String,
    },
    Part {
        nick: String,
        mask: String,
        channel: String,
        reason: String,
    },
    Kick {
        kicker: String,
        channel: String,
        kickee: String,
        reason: String,
    },
    /// `channels` lists where the connection saw the user just before
    /// dropping them from its rosters.
    Quit {
        nick: String,
        mask: String,
        reason: String,
        channels: Vec<String>,
    },
    /// `channels` lists where the connection saw `old_nick` just before
    /// renaming it in its rosters.
    NickChange {
        old_nick: String,
        new_nick: String,
        channels: Vec<String>,
    },
    /// A mode change on a channel or on a user.
    Mode {
        nick: String,
        target: String,
        mode: String,
        args: Vec<String>,
    },
    Topic {
        nick: String,
        channel: String,
        topic: String,
    },
    Invite {
        nick: String,
        mask: String,
        channel: String,
    },
    /// Anything the relay has no handler for.
    Unrecognized { command: String, raw: String },
}

impl IrcEvent {
    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Message { .. } => "message",
            Self::Action { .. } => "action",
            Self::Join { .. } => "join",
            Self::Part { .. } => "part",
            Self::Kick { .. } => "kick",
            Self::Quit { .. } => "quit",
            Self::NickChange { .. } => "nick",
            Self::Mode { .. } => "mode",
            Self::Topic { .. } => "topic",
            Self::Invite { .. } => "invite",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }

    /// Whether this event changes who is present in a channel.
    pub fn changes_membership(&self) -> bool {
        matches!(
            self,
            Self::Join { .. }
                | Self::Part { .. }
                | Self::Kick { .. }
                | Self::Quit { .. }
                | Self::NickChange { .. }
        )
    }
}

/// A message posted in a Slack conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlackMessage {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub text: String,
    pub subtype: Option<String>,
    pub bot_id: Option<String>,
}

/// An event observed on the Slack event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackEvent {
    /// The event stream said hello.
    Connected,
    Message(SlackMessage),
    /// The event stream closed and could not be reopened.
    Disconnected,
    Unrecognized { kind: String },
}
