//! IRC -> Slack relay loop.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::common::error::SendResult;
use crate::common::messages::IrcEvent;
use crate::common::types::{channel_key, IrcChannel, SlackChannel};

use super::capabilities::{IrcSender, SlackSender};
use super::highlight::HighlightMatcher;
use super::mapping::SharedMapping;
use super::membership::{MembershipSnapshot, MembershipTracker, RosterSource};
use super::notices;
use super::playback::PlaybackState;
use super::LoopControl;

/// State carried from one IRC event to the next.
#[derive(Debug, Clone, Default)]
pub struct IrcLoopState {
    pub playback: PlaybackState,
    /// Rosters as of the last membership change.
    pub membership: MembershipSnapshot,
}

/// Consumes IRC events and posts their Slack rendition.
pub struct IrcRelay<I, S> {
    irc: I,
    slack: S,
    mapping: SharedMapping,
    tracker: MembershipTracker,
    highlights: HighlightMatcher,
    /// Slack user name of the owner, for highlight pings.
    owner: String,
    /// Server label for owner notices.
    server: String,
    /// Case-folded channel -> join key.
    channel_keys: HashMap<String, String>,
}

impl<I, S> IrcRelay<I, S>
where
    I: IrcSender + RosterSource,
    S: SlackSender,
{
    pub fn new(
        irc: I,
        slack: S,
        mapping: SharedMapping,
        highlights: HighlightMatcher,
        owner: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            irc,
            slack,
            tracker: MembershipTracker::new(mapping.clone()),
            mapping,
            highlights,
            owner: owner.into(),
            server: server.into(),
            channel_keys: HashMap::new(),
        }
    }

    /// Key to send when joining `channel`.
    pub fn with_channel_key(mut self, channel: &str, key: impl Into<String>) -> Self {
        self.channel_keys.insert(channel_key(channel), key.into());
        self
    }

    pub fn initial_state(&self) -> IrcLoopState {
        IrcLoopState {
            playback: PlaybackState::new(),
            membership: self.tracker.snapshot(&self.irc),
        }
    }

    /// Consume events until the connection reports it is gone.
    pub async fn run(self, mut events_rx: mpsc::UnboundedReceiver<IrcEvent>) {
        let mut state = self.initial_state();

        while let Some(event) = events_rx.recv().await {
            if self.handle_event(&mut state, event) == LoopControl::Stop {
                break;
            }
        }

        info!("IRC relay loop ended");
    }

    pub fn handle_event(&self, state: &mut IrcLoopState, event: IrcEvent) -> LoopControl {
        trace!("IRC event: {}", event.kind());
        let forwardable = match &event {
            IrcEvent::Message { .. } | IrcEvent::Action { .. } => state.playback.observe(&event),
            _ => true,
        };
        let refresh = event.changes_membership();

        match event {
            IrcEvent::Connected => self.on_connected(),
            IrcEvent::Disconnected => {
                info!("Disconnected from IRC");
                self.log_failure(self.slack.send_to_owner(&notices::disconnected(&self.server)));
                return LoopControl::Stop;
            }
            IrcEvent::Message { nick, target, text } => {
                debug!("PRIVMSG: ({}) <{}> {}", target, nick, text);
                if !forwardable {
                    debug!("Suppressing playback line from {}", nick);
                } else if let Some(slack) = self.counterpart(&target) {
                    if self.highlights.matches(&nick, &text) {
                        info!("Highlighting owner for message from {}", nick);
                        self.log_failure(
                            self.slack
                                .send_as_bot(slack, &notices::highlight(&self.owner, &nick)),
                        );
                    }
                    self.log_failure(self.slack.send_as(&nick, slack, &text));
                }
            }
            IrcEvent::Action { nick, target, text } => {
                debug!("ACTION: ({}) {} {}", target, nick, text);
                if !forwardable {
                    debug!("Suppressing playback action from {}", nick);
                } else if let Some(slack) = self.counterpart(&target) {
                    self.log_failure(self.slack.send_as(&nick, slack, &notices::action(&nick, &text)));
                }
            }
            IrcEvent::Join { nick, mask, channel } => {
                debug!("JOIN: {}({}) has joined {}", nick, mask, channel);
                self.notify(&channel, &notices::join(&nick, &mask));
            }
            IrcEvent::Part {
                nick,
                mask,
                channel,
                reason,
            } => {
                debug!("PART: ({}) {}({}) has left ({})", channel, nick, mask, reason);
                self.notify(&channel, &notices::part(&nick, &mask));
            }
            IrcEvent::Kick {
                kicker,
                channel,
                kickee,
                reason,
            } => {
                debug!("KICK: ({}) {} has kicked {} ({})", channel, kicker, kickee, reason);
                self.notify(&channel, &notices::kick(&kicker, &kickee, &reason));
            }
            IrcEvent::Quit {
                nick,
                mask,
                reason,
                channels,
            } => {
                debug!("QUIT: {}({}) has quit ({})", nick, mask, reason);
                self.fan_out(state, &nick, &channels, &notices::quit(&nick, &mask, &reason));
            }
            IrcEvent::NickChange {
                old_nick,
                new_nick,
                channels,
            } => {
                debug!("NICK: {} is now known as {}", old_nick, new_nick);
                let text = notices::nick_change(&old_nick, &new_nick);
                self.fan_out(state, &old_nick, &channels, &text);
            }
            IrcEvent::Mode {
                nick,
                target,
                mode,
                args,
            } => {
                if IrcChannel::is_channel_name(&target) {
                    debug!("MODE: ({}) {} sets {} {:?}", target, nick, mode, args);
                    self.notify(&target, &notices::mode(&nick, &mode, &args));
                } else {
                    debug!("MODE: {} has set mode {} on {}", nick, mode, target);
                }
            }
            IrcEvent::Topic {
                nick,
                channel,
                topic,
            } => {
                debug!("TOPIC: ({}) {} has changed the topic to \"{}\"", channel, nick, topic);
                self.notify(&channel, &notices::topic(&nick, &topic));
            }
            IrcEvent::Invite { nick, mask, channel } => {
                info!("INVITE: {}({}) invited us to {}", nick, mask, channel);
            }
            IrcEvent::Unrecognized { command, raw } => {
                debug!(command = %command, "Unrecognized IRC line: {}", raw);
            }
        }

        // Rosters only become known once NAMES completes, which raises no
        // event, so keep refreshing until every mapped channel is known.
        if refresh || self.mapping.irc_channels().any(|c| !state.membership.is_known(c)) {
            state.membership = self.tracker.snapshot(&self.irc);
            trace!("Membership snapshot covers {} channels", state.membership.len());
        }

        LoopControl::Continue
    }

    fn on_connected(&self) {
        info!("Connected to IRC");
        for channel in self.mapping.irc_channels() {
            info!("Joining IRC channel {}", channel);
            let key = self.channel_keys.get(&channel.key()).map(String::as_str);
            self.log_failure(self.irc.join(channel, key));
        }
        self.log_failure(self.slack.send_to_owner(&notices::connected(&self.server)));
    }

    fn counterpart(&self, irc_channel: &str) -> Option<&SlackChannel> {
        let slack = self.mapping.lookup_from_irc(irc_channel);
        if slack.is_none() {
            debug!("No Slack channel mapped to {}", irc_channel);
        }
        slack
    }

    /// Post a bridge notice to the counterpart of one IRC channel.
    fn notify(&self, irc_channel: &str, text: &str) {
        if let Some(slack) = self.counterpart(irc_channel) {
            self.log_failure(self.slack.send_as_bot(slack, text));
        }
    }

    /// Post a notice to every mapped channel `nick` was in before the event.
    fn fan_out(&self, state: &mut IrcLoopState, nick: &str, seen_in: &[String], text: &str) {
        let seen_in: Vec<IrcChannel> = self
            .mapping
            .irc_channels()
            .filter(|channel| seen_in.iter().any(|name| channel_key(name) == channel.key()))
            .cloned()
            .collect();
        state.membership.record_presence(nick, &seen_in);

        for channel in state.membership.channels_containing(nick) {
            self.notify(channel.as_str(), text);
        }
    }

    fn log_failure(&self, result: SendResult<()>) {
        if let Err(e) = result {
            warn!("Send failed: {}", e);
        }
    }
}
