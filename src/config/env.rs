//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `BACKCHANNEL_SLACK_TOKEN` - Slack bot token
//! - `BACKCHANNEL_SLACK_APP_TOKEN` - Slack app-level token
//! - `BACKCHANNEL_IRC_PASSWORD` - IRC server password
//! - `BACKCHANNEL_IRC_SERVER` - IRC server host
//! - `BACKCHANNEL_IRC_NICKNAME` - IRC nickname

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "BACKCHANNEL";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens and passwords to be
/// provided via environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    // Slack tokens
    if let Ok(token) = env::var(format!("{}_SLACK_TOKEN", ENV_PREFIX)) {
        config.slack.token = token;
    }
    if let Ok(token) = env::var(format!("{}_SLACK_APP_TOKEN", ENV_PREFIX)) {
        config.slack.app_token = token;
    }

    // IRC connection
    if let Ok(password) = env::var(format!("{}_IRC_PASSWORD", ENV_PREFIX)) {
        config.irc.password = Some(password);
    }
    if let Ok(server) = env::var(format!("{}_IRC_SERVER", ENV_PREFIX)) {
        config.irc.server = server;
    }
    if let Ok(nickname) = env::var(format!("{}_IRC_NICKNAME", ENV_PREFIX)) {
        config.irc.nickname = nickname;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `BACKCHANNEL_CONFIG` environment variable, otherwise returns "backchannel.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "backchannel.conf".to_string())
}
