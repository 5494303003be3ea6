//! IRC session protocol handling.
//!
//! Turns inbound IRC messages into relay events, keeps the roster in
//! step, and produces the protocol replies the connection must send
//! (PONG, nickname retries). Owns no I/O.

use tracing::{debug, info, warn};

use crate::common::messages::IrcEvent;
use crate::config::types::IrcConfig;

use super::message::IrcMessage;
use super::roster::SharedRoster;

const RPL_WELCOME: &str = "001";
const RPL_NAMREPLY: &str = "353";
const RPL_ENDOFNAMES: &str = "366";
const ERR_NICKNAMEINUSE: &str = "433";

/// What the connection should do in response to one inbound message.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionOutput {
    /// Messages to write back to the server.
    pub replies: Vec<IrcMessage>,
    /// Event for the relay loop.
    pub event: Option<IrcEvent>,
}

impl SessionOutput {
    fn event(event: IrcEvent) -> Self {
        Self {
            replies: Vec::new(),
            event: Some(event),
        }
    }

    fn reply(reply: IrcMessage) -> Self {
        Self {
            replies: vec![reply],
            event: None,
        }
    }
}

/// Protocol state of one IRC connection.
#[derive(Debug)]
pub struct IrcSession {
    /// Our current nickname.
    nickname: String,
    registered: bool,
    roster: SharedRoster,
}

impl IrcSession {
    pub fn new(nickname: impl Into<String>, roster: SharedRoster) -> Self {
        Self {
            nickname: nickname.into(),
            registered: false,
            roster,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Registration burst: PASS (if configured), NICK, USER.
    pub fn registration(&self, config: &IrcConfig) -> Vec<IrcMessage> {
        let mut messages = Vec::new();
        if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
            messages.push(IrcMessage::pass(password));
        }
        messages.push(IrcMessage::nick_change(&self.nickname));
        messages.push(IrcMessage::user(&username(config.name()), config.name()));
        messages
    }

    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.nickname)
    }

    /// Handle one inbound message.
    pub fn handle(&mut self, msg: &IrcMessage) -> SessionOutput {
        match msg.command.as_str() {
            "PING" => SessionOutput::reply(IrcMessage::pong(msg.param(0))),
            RPL_WELCOME => {
                self.registered = true;
                if !msg.param(0).is_empty() {
                    self.nickname = msg.param(0).to_string();
                }
                info!("Registered with IRC server as {}", self.nickname);
                SessionOutput::event(IrcEvent::Connected)
            }
            ERR_NICKNAMEINUSE if !self.registered => {
                self.nickname.push('_');
                warn!("Nickname in use, trying {}", self.nickname);
                SessionOutput::reply(IrcMessage::nick_change(&self.nickname))
            }
            RPL_NAMREPLY => {
                // <me> <symbol> <channel> :<names>
                self.roster.write().add_names(msg.param(2), msg.param(3));
                SessionOutput::default()
            }
            RPL_ENDOFNAMES => {
                // <me> <channel> :End of /NAMES list.
                self.roster.write().end_names(msg.param(1));
                SessionOutput::default()
            }
            "PRIVMSG" => SessionOutput::event(self.on_privmsg(msg)),
            "JOIN" => SessionOutput::event(self.on_join(msg)),
            "PART" => SessionOutput::event(self.on_part(msg)),
            "KICK" => SessionOutput::event(self.on_kick(msg)),
            "QUIT" => {
                let channels = self.roster.write().remove_everywhere(msg.nick());
                SessionOutput::event(IrcEvent::Quit {
                    nick: msg.nick().to_string(),
                    mask: msg.mask().to_string(),
                    reason: msg.param(0).to_string(),
                    channels,
                })
            }
            "NICK" => SessionOutput::event(self.on_nick(msg)),
            "MODE" => SessionOutput::event(IrcEvent::Mode {
                nick: msg.nick().to_string(),
                target: msg.param(0).to_string(),
                mode: msg.param(1).to_string(),
                args: msg.params.iter().skip(2).cloned().collect(),
            }),
            "TOPIC" => SessionOutput::event(IrcEvent::Topic {
                nick: msg.nick().to_string(),
                channel: msg.param(0).to_string(),
                topic: msg.param(1).to_string(),
            }),
            "INVITE" => SessionOutput::event(IrcEvent::Invite {
                nick: msg.nick().to_string(),
                mask: msg.mask().to_string(),
                channel: msg.param(1).to_string(),
            }),
            "ERROR" => {
                warn!("IRC server error: {}", msg.param(0));
                SessionOutput::event(unrecognized(msg))
            }
            _ => SessionOutput::event(unrecognized(msg)),
        }
    }

    fn on_privmsg(&self, msg: &IrcMessage) -> IrcEvent {
        let nick = msg.nick().to_string();
        let target = msg.param(0).to_string();

        if let Some(text) = msg.ctcp_action() {
            return IrcEvent::Action {
                nick,
                target,
                text: text.to_string(),
            };
        }
        if msg.is_ctcp() {
            debug!("Ignoring CTCP request from {}", nick);
            return unrecognized(msg);
        }

        IrcEvent::Message {
            nick,
            target,
            text: msg.param(1).to_string(),
        }
    }

    fn on_join(&self, msg: &IrcMessage) -> IrcEvent {
        let channel = msg.param(0);
        if self.is_me(msg.nick()) {
            // Our own roster arrives in the NAMES reply that follows
            self.roster.write().forget(channel);
        } else {
            self.roster.write().add(channel, msg.nick());
        }

        IrcEvent::Join {
            nick: msg.nick().to_string(),
            mask: msg.mask().to_string(),
            channel: channel.to_string(),
        }
    }

    fn on_part(&self, msg: &IrcMessage) -> IrcEvent {
        let channel = msg.param(0);
        if self.is_me(msg.nick()) {
            self.roster.write().forget(channel);
        } else {
            self.roster.write().remove(channel, msg.nick());
        }

        IrcEvent::Part {
            nick: msg.nick().to_string(),
            mask: msg.mask().to_string(),
            channel: channel.to_string(),
            reason: msg.param(1).to_string(),
        }
    }

    fn on_kick(&self, msg: &IrcMessage) -> IrcEvent {
        let channel = msg.param(0);
        let kickee = msg.param(1);
        if self.is_me(kickee) {
            warn!("Kicked from {} by {}: {}", channel, msg.nick(), msg.param(2));
            self.roster.write().forget(channel);
        } else {
            self.roster.write().remove(channel, kickee);
        }

        IrcEvent::Kick {
            kicker: msg.nick().to_string(),
            channel: channel.to_string(),
            kickee: kickee.to_string(),
            reason: msg.param(2).to_string(),
        }
    }

    fn on_nick(&mut self, msg: &IrcMessage) -> IrcEvent {
        let old_nick = msg.nick().to_string();
        let new_nick = msg.param(0).to_string();

        if self.is_me(&old_nick) {
            info!("Our nickname changed to {}", new_nick);
            self.nickname = new_nick.clone();
        }
        let channels = self.roster.write().rename(&old_nick, &new_nick);

        IrcEvent::NickChange {
            old_nick,
            new_nick,
            channels,
        }
    }
}

fn unrecognized(msg: &IrcMessage) -> IrcEvent {
    IrcEvent::Unrecognized {
        command: msg.command.clone(),
        raw: msg.to_wire(),
    }
}

/// Ident derived from the configured name: lowercase alphanumerics.
fn username(name: &str) -> String {
    let ident: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ident.is_empty() {
        "backchannel".to_string()
    } else {
        ident
    }
}
