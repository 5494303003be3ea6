//! Configuration type definitions.

use serde::Deserialize;

/// Default realname/ident when `irc.name` is not set.
pub const DEFAULT_IRC_NAME: &str = "Backchannel";

/// Default display name for notices posted by the bridge itself.
pub const DEFAULT_BOT_USERNAME: &str = "IRC";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub irc: IrcConfig,
    pub slack: SlackConfig,
    pub channel_mapping: Vec<ChannelMappingConfig>,
    pub bridge: Option<BridgeConfig>,
}

impl Config {
    /// Whether Slack `:shortcode:` emoji are expanded before posting to IRC.
    pub fn expand_emoji(&self) -> bool {
        self.bridge
            .as_ref()
            .and_then(|b| b.expand_emoji)
            .unwrap_or(true)
    }

    /// Display name used for bridge notices on Slack.
    pub fn bot_username(&self) -> &str {
        self.bridge
            .as_ref()
            .and_then(|b| b.bot_username.as_deref())
            .unwrap_or(DEFAULT_BOT_USERNAME)
    }
}

/// IRC server connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub nickname: String,
    /// Realname and ident sent with USER.
    pub name: Option<String>,
    pub server: String,
    pub port: Option<u16>,
    /// Server password (PASS), typically for a bouncer.
    pub password: Option<String>,
    pub use_tls: bool,
    pub verify_tls: Option<bool>,
    pub channels: Vec<IrcChannelConfig>,
    pub highlight_rules: Option<Vec<HighlightRuleConfig>>,
}

impl IrcConfig {
    /// Configured port, or the conventional one for the transport.
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.use_tls { 6697 } else { 6667 })
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_IRC_NAME)
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls.unwrap_or(true)
    }

    pub fn highlight_rules(&self) -> &[HighlightRuleConfig] {
        self.highlight_rules.as_deref().unwrap_or_default()
    }

    /// `host:port` label used in logs and owner notices.
    pub fn server_label(&self) -> String {
        format!("{}:{}", self.server, self.port())
    }
}

/// An IRC channel to join, with an optional key.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcChannelConfig {
    pub name: String,
    pub key: Option<String>,
}

/// One highlight rule. Rules are evaluated in order; the first one whose
/// patterns all match decides.
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightRuleConfig {
    /// Pattern tested against the sender's nickname
    pub nick_pattern: Option<String>,
    /// Pattern tested against the message text
    pub message_pattern: Option<String>,
    /// Outcome when the rule fires
    pub should_highlight: bool,
}

/// Slack workspace configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    /// Bot token used for the Web API.
    pub token: String,
    /// App-level token used to open Socket Mode connections.
    pub app_token: String,
    /// Slack user name of the person who receives direct notices.
    pub owner: String,
    /// Channel names, each with a leading `#`.
    pub channels: Vec<String>,
}

/// Pairs one IRC channel with one Slack channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMappingConfig {
    pub irc: String,
    pub slack: String,
}

/// Relay behavior settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub expand_emoji: Option<bool>,
    pub bot_username: Option<String>,
}
