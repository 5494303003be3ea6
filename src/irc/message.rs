//! IRC message parsing and serialization.

use crate::common::error::ProtocolError;

/// CTCP delimiter.
const CTCP_DELIM: char = '\u{1}';

/// One IRC protocol message: `[:prefix] COMMAND [params...] [:trailing]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.to_string(),
            params,
        }
    }

    /// Parse a line without its line terminator. IRCv3 message tags are
    /// skipped.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut rest = line.trim_end_matches(&['\r', '\n'][..]);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, r)| r);
        }
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(ProtocolError::EmptyLine);
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = remainder.trim_start_matches(' ');
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(ProtocolError::MissingCommand {
                line: line.to_string(),
            });
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, remainder) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = remainder;
        }

        Ok(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Serialize to wire form without the line terminator.
    ///
    /// CR, LF and NUL are replaced with spaces so that a parameter can
    /// never smuggle in a second command.
    pub fn to_wire(&self) -> String {
        let mut line = String::new();
        if let Some(prefix) = &self.prefix {
            line.push(':');
            line.push_str(prefix);
            line.push(' ');
        }
        line.push_str(&self.command);

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let param = sanitize(param);
            line.push(' ');
            if i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                line.push(':');
            }
            line.push_str(&param);
        }

        line
    }

    /// Nickname part of the prefix (`nick` in `nick!user@host`).
    pub fn nick(&self) -> &str {
        self.prefix
            .as_deref()
            .map(|p| p.split_once('!').map_or(p, |(nick, _)| nick))
            .unwrap_or_default()
    }

    /// Full prefix, or an empty string for prefix-less messages.
    pub fn mask(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }

    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map(String::as_str).unwrap_or_default()
    }

    /// Body of a CTCP ACTION carried by this PRIVMSG, if any.
    pub fn ctcp_action(&self) -> Option<&str> {
        let body = self
            .param(1)
            .strip_prefix(CTCP_DELIM)?
            .trim_end_matches(CTCP_DELIM);
        match body.split_once(' ') {
            Some(("ACTION", text)) => Some(text),
            None if body == "ACTION" => Some(""),
            _ => None,
        }
    }

    /// Whether this PRIVMSG carries any CTCP request.
    pub fn is_ctcp(&self) -> bool {
        self.param(1).starts_with(CTCP_DELIM)
    }

    pub fn pass(password: &str) -> Self {
        Self::new("PASS", vec![password.to_string()])
    }

    pub fn nick_change(nickname: &str) -> Self {
        Self::new("NICK", vec![nickname.to_string()])
    }

    pub fn user(username: &str, realname: &str) -> Self {
        Self::new(
            "USER",
            vec![
                username.to_string(),
                "0".to_string(),
                "*".to_string(),
                realname.to_string(),
            ],
        )
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", vec![token.to_string()])
    }

    pub fn join(channel: &str, key: Option<&str>) -> Self {
        let mut params = vec![channel.to_string()];
        if let Some(key) = key {
            params.push(key.to_string());
        }
        Self::new("JOIN", params)
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", vec![target.to_string(), text.to_string()])
    }

    pub fn action(target: &str, text: &str) -> Self {
        Self::privmsg(
            target,
            &format!("{}ACTION {}{}", CTCP_DELIM, text, CTCP_DELIM),
        )
    }

    pub fn quit(reason: &str) -> Self {
        Self::new("QUIT", vec![reason.to_string()])
    }
}

fn sanitize(param: &str) -> String {
    param.replace(&['\r', '\n', '\0'][..], " ")
}
