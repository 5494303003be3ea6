//! Owner highlight rules.
//!
//! Decides whether a channel message should ping the owner on Slack.
//! Rules are evaluated in order and the first rule whose patterns all
//! match decides the outcome.

use fancy_regex::Regex;
use tracing::warn;

use crate::common::error::ConfigError;
use crate::config::types::HighlightRuleConfig;

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            original: pattern.to_string(),
            regex,
        })
    }

    /// Unanchored search. A runtime match error counts as no match.
    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text).unwrap_or_else(|e| {
            warn!("Regex match error for pattern '{}': {}", self.original, e);
            false
        })
    }
}

/// One compiled rule. An absent pattern matches anything.
#[derive(Debug, Clone)]
struct HighlightRule {
    nick: Option<CompiledPattern>,
    message: Option<CompiledPattern>,
    should_highlight: bool,
}

impl HighlightRule {
    fn fires(&self, nick: &str, message: &str) -> bool {
        self.nick.as_ref().map_or(true, |p| p.is_match(nick))
            && self.message.as_ref().map_or(true, |p| p.is_match(message))
    }
}

/// Ordered list of highlight rules.
#[derive(Debug, Clone, Default)]
pub struct HighlightMatcher {
    rules: Vec<HighlightRule>,
}

impl HighlightMatcher {
    /// Compile rules from configuration. Any malformed pattern is an error.
    pub fn new(configs: &[HighlightRuleConfig]) -> Result<Self, ConfigError> {
        let rules = configs
            .iter()
            .map(|config| {
                Ok(HighlightRule {
                    nick: config
                        .nick_pattern
                        .as_deref()
                        .map(CompiledPattern::compile)
                        .transpose()?,
                    message: config
                        .message_pattern
                        .as_deref()
                        .map(CompiledPattern::compile)
                        .transpose()?,
                    should_highlight: config.should_highlight,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules })
    }

    /// Create a matcher with no rules, which never highlights.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Outcome of the first firing rule, or `false` if none fires.
    pub fn matches(&self, nick: &str, message: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| rule.fires(nick, message))
            .map_or(false, |rule| rule.should_highlight)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
