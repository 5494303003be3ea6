//! Static channel mapping between IRC and Slack.
//!
//! Every IRC channel maps to at most one Slack channel and vice versa.
//! The table is built once from configuration and shared read-only by
//! both relay loops.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::common::error::ConfigError;
use crate::common::types::{channel_key, IrcChannel, SlackChannel};
use crate::config::types::Config;

/// Shared reference to the mapping table.
pub type SharedMapping = Arc<ChannelMapping>;

/// Bidirectional IRC <-> Slack channel table.
#[derive(Debug, Clone, Default)]
pub struct ChannelMapping {
    /// Mapped pairs in configuration order.
    rows: Vec<(IrcChannel, SlackChannel)>,
    /// Case-folded IRC channel -> row index.
    irc_index: HashMap<String, usize>,
    /// Slack channel name -> row index.
    slack_index: HashMap<String, usize>,
}

impl ChannelMapping {
    /// Build the table, rejecting dangling references and channels mapped twice.
    pub fn build(
        pairs: &[(IrcChannel, SlackChannel)],
        irc_channels: &[IrcChannel],
        slack_channels: &[SlackChannel],
    ) -> Result<Self, ConfigError> {
        if let Some(problem) = mapping_problems(pairs, irc_channels, slack_channels)
            .into_iter()
            .next()
        {
            return Err(problem);
        }

        let mut mapping = Self::default();
        for (irc, slack) in pairs {
            let row = mapping.rows.len();
            mapping.irc_index.insert(irc.key(), row);
            mapping.slack_index.insert(slack.as_str().to_string(), row);
            mapping.rows.push((irc.clone(), slack.clone()));
        }

        Ok(mapping)
    }

    /// Build the table from the `channel_mapping`, `irc.channels` and
    /// `slack.channels` sections.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let irc_channels: Vec<IrcChannel> = config
            .irc
            .channels
            .iter()
            .map(|c| IrcChannel::new(c.name.as_str()))
            .collect();
        let slack_channels: Vec<SlackChannel> = config
            .slack
            .channels
            .iter()
            .map(|c| SlackChannel::new(c.as_str()))
            .collect();

        Self::build(&configured_pairs(config), &irc_channels, &slack_channels)
    }

    /// Slack counterpart of an IRC channel. Case-insensitive.
    pub fn lookup_from_irc(&self, channel: &str) -> Option<&SlackChannel> {
        self.irc_index
            .get(&channel_key(channel))
            .map(|&row| &self.rows[row].1)
    }

    /// IRC counterpart of a Slack channel name (with leading `#`).
    pub fn lookup_from_slack(&self, channel: &str) -> Option<&IrcChannel> {
        self.slack_index
            .get(channel)
            .map(|&row| &self.rows[row].0)
    }

    /// Mapped IRC channels, in configuration order.
    pub fn irc_channels(&self) -> impl Iterator<Item = &IrcChannel> {
        self.rows.iter().map(|(irc, _)| irc)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Mapping pairs as written in the configuration.
pub fn configured_pairs(config: &Config) -> Vec<(IrcChannel, SlackChannel)> {
    config
        .channel_mapping
        .iter()
        .map(|m| (IrcChannel::new(m.irc.as_str()), SlackChannel::new(m.slack.as_str())))
        .collect()
}

/// Every dangling reference and duplicate in a set of mapping pairs.
pub fn mapping_problems(
    pairs: &[(IrcChannel, SlackChannel)],
    irc_channels: &[IrcChannel],
    slack_channels: &[SlackChannel],
) -> Vec<ConfigError> {
    let irc_declared: HashSet<String> = irc_channels.iter().map(IrcChannel::key).collect();
    let slack_declared: HashSet<&str> = slack_channels.iter().map(SlackChannel::as_str).collect();

    let mut problems = Vec::new();
    let mut irc_seen = HashSet::new();
    let mut slack_seen = HashSet::new();

    for (irc, slack) in pairs {
        if !irc_declared.contains(&irc.key()) {
            problems.push(ConfigError::DanglingChannel {
                network: "irc",
                channel: irc.to_string(),
            });
        }
        if !slack_declared.contains(slack.as_str()) {
            problems.push(ConfigError::DanglingChannel {
                network: "slack",
                channel: slack.to_string(),
            });
        }
        if !irc_seen.insert(irc.key()) {
            problems.push(ConfigError::DuplicateMapping {
                network: "irc",
                channel: irc.to_string(),
            });
        }
        if !slack_seen.insert(slack.as_str()) {
            problems.push(ConfigError::DuplicateMapping {
                network: "slack",
                channel: slack.to_string(),
            });
        }
    }

    problems
}
