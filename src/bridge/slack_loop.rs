//! Slack -> IRC relay loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::common::messages::{SlackEvent, SlackMessage};
use crate::slack::directory::{DirectoryLookup, SlackDirectory};
use crate::slack::markup::MarkupTranslator;

use super::capabilities::IrcSender;
use super::mapping::SharedMapping;
use super::LoopControl;

/// Subtype Slack gives `/me` messages.
const ME_MESSAGE: &str = "me_message";

/// Consumes Slack events and relays channel messages to IRC.
pub struct SlackRelay<I> {
    irc: I,
    mapping: SharedMapping,
    directory: Arc<SlackDirectory>,
    translator: MarkupTranslator,
}

impl<I: IrcSender> SlackRelay<I> {
    pub fn new(
        irc: I,
        mapping: SharedMapping,
        directory: Arc<SlackDirectory>,
        translator: MarkupTranslator,
    ) -> Self {
        Self {
            irc,
            mapping,
            directory,
            translator,
        }
    }

    /// Consume events until the event stream closes.
    pub async fn run(self, mut events_rx: mpsc::UnboundedReceiver<SlackEvent>) {
        while let Some(event) = events_rx.recv().await {
            if self.handle_event(event) == LoopControl::Stop {
                break;
            }
        }

        info!("Slack relay loop ended");
    }

    pub fn handle_event(&self, event: SlackEvent) -> LoopControl {
        match event {
            SlackEvent::Connected => info!("Connected to Slack"),
            SlackEvent::Message(msg) => self.on_message(&msg),
            SlackEvent::Disconnected => {
                info!("Disconnected from Slack");
                return LoopControl::Stop;
            }
            SlackEvent::Unrecognized { kind } => {
                debug!("Received unrecognized Slack event: {}", kind);
            }
        }

        LoopControl::Continue
    }

    fn on_message(&self, msg: &SlackMessage) {
        // Relaying our own posts back would echo IRC into itself
        if msg.bot_id.is_some()
            || self
                .directory
                .is_self(msg.user_id.as_deref(), msg.bot_id.as_deref())
        {
            return;
        }

        let is_action = match msg.subtype.as_deref() {
            None | Some("") => false,
            Some(ME_MESSAGE) => true,
            Some(other) => {
                debug!("Ignoring Slack message with subtype {}", other);
                return;
            }
        };

        let Some(slack_channel) = self.directory.channel_name(&msg.channel_id) else {
            debug!("Message from unknown Slack channel {}", msg.channel_id);
            return;
        };
        let Some(irc_channel) = self.mapping.lookup_from_slack(slack_channel) else {
            debug!("No IRC channel mapped to {}", slack_channel);
            return;
        };

        let text = self
            .translator
            .translate_for_irc(&msg.text, self.directory.as_ref());
        debug!("Slack -> IRC ({}): {}", irc_channel, text);

        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let result = if is_action {
                self.irc.send_action(irc_channel, line)
            } else {
                self.irc.send_message(irc_channel, line)
            };
            if let Err(e) = result {
                warn!("Send to {} failed: {}", irc_channel, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::fakes::{FakeIrc, IrcSent};
    use crate::bridge::mapping::ChannelMapping;
    use crate::common::types::{IrcChannel, SlackChannel};
    use crate::slack::directory::tests::test_directory;

    fn relay(irc: &FakeIrc) -> SlackRelay<FakeIrc> {
        let irc_channels = vec![IrcChannel::new("#caa")];
        let slack_channels = vec![SlackChannel::new("#caa-on-slack")];
        let pairs = vec![(irc_channels[0].clone(), slack_channels[0].clone())];
        let mapping = ChannelMapping::build(&pairs, &irc_channels, &slack_channels).unwrap();

        SlackRelay::new(
            irc.clone(),
            Arc::new(mapping),
            Arc::new(test_directory()),
            MarkupTranslator::new(true),
        )
    }

    fn message(channel_id: &str, user_id: &str, text: &str) -> SlackMessage {
        SlackMessage {
            channel_id: channel_id.to_string(),
            user_id: Some(user_id.to_string()),
            text: text.to_string(),
            ..SlackMessage::default()
        }
    }

    fn irc_message(text: &str) -> IrcSent {
        IrcSent::Message("#caa".to_string(), text.to_string())
    }

    #[test]
    fn test_plain_message_translated() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);

        relay.handle_event(SlackEvent::Message(message(
            "C1",
            "U1",
            "<@U2> see <https://example.com|the docs> &amp; :tada:",
        )));

        assert_eq!(irc.sent(), vec![irc_message("@alice see the docs & 🎉")]);
    }

    #[test]
    fn test_me_message_sent_as_action() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);

        let mut msg = message("C1", "U1", "waves");
        msg.subtype = Some("me_message".to_string());
        relay.handle_event(SlackEvent::Message(msg));

        assert_eq!(
            irc.sent(),
            vec![IrcSent::Action("#caa".to_string(), "waves".to_string())]
        );
    }

    #[test]
    fn test_multiline_message_split() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);

        relay.handle_event(SlackEvent::Message(message("C1", "U1", "first\n\nsecond")));

        assert_eq!(irc.sent(), vec![irc_message("first"), irc_message("second")]);
    }

    #[test]
    fn test_own_and_bot_messages_dropped() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);

        let mut from_bot = message("C1", "U2", "beep");
        from_bot.bot_id = Some("B7".to_string());
        relay.handle_event(SlackEvent::Message(from_bot));
        relay.handle_event(SlackEvent::Message(message("C1", "UBRIDGE", "echo")));

        assert!(irc.sent().is_empty());
    }

    #[test]
    fn test_unsupported_subtype_and_unmapped_channel_dropped() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);

        let mut edited = message("C1", "U1", "edited");
        edited.subtype = Some("message_changed".to_string());
        relay.handle_event(SlackEvent::Message(edited));
        relay.handle_event(SlackEvent::Message(message("C2", "U1", "in #random")));
        relay.handle_event(SlackEvent::Message(message("C9", "U1", "unknown channel")));

        assert!(irc.sent().is_empty());
    }

    #[test]
    fn test_lifecycle_events() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);

        assert_eq!(relay.handle_event(SlackEvent::Connected), LoopControl::Continue);
        assert_eq!(
            relay.handle_event(SlackEvent::Unrecognized {
                kind: "reaction_added".to_string()
            }),
            LoopControl::Continue
        );
        assert_eq!(relay.handle_event(SlackEvent::Disconnected), LoopControl::Stop);
    }

    #[tokio::test]
    async fn test_run_ends_when_stream_closes() {
        let irc = FakeIrc::default();
        let relay = relay(&irc);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        events_tx
            .send(SlackEvent::Message(message("C1", "U2", "hello")))
            .unwrap();
        drop(events_tx);
        relay.run(events_rx).await;

        assert_eq!(irc.sent(), vec![irc_message("hello")]);
    }
}
