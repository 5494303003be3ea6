//! Bouncer buffer-playback suppression.
//!
//! A bouncer replays its backlog on reconnect, bracketed by two notices
//! from the pseudo-user `***`. Everything from the start notice through
//! the end notice, inclusive, is history that Slack has already seen.

use crate::common::messages::IrcEvent;

/// Sender nickname the bouncer uses for its notices.
pub const PLAYBACK_SENDER: &str = "***";

/// Text of the notice opening a replay.
pub const PLAYBACK_START: &str = "Buffer Playback...";

/// Text of the notice closing a replay.
pub const PLAYBACK_END: &str = "Playback Complete.";

/// Two-flag playback state, owned by the IRC relay loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    was_in_playback: bool,
    is_in_playback: bool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_playback(&self) -> bool {
        self.is_in_playback
    }

    /// Feed one event through the filter and report whether it may be
    /// forwarded.
    ///
    /// Only channel messages move the state. Other events are checked
    /// against the current state without changing it.
    pub fn observe(&mut self, event: &IrcEvent) -> bool {
        match event {
            IrcEvent::Message { nick, text, .. } => self.observe_message(nick, text),
            _ => !self.is_in_playback,
        }
    }

    fn observe_message(&mut self, nick: &str, text: &str) -> bool {
        if self.is_in_playback {
            if is_sentinel(nick, text, PLAYBACK_END) {
                self.is_in_playback = false;
            }
        } else if is_sentinel(nick, text, PLAYBACK_START) {
            self.is_in_playback = true;
        }

        let forwardable = !self.was_in_playback && !self.is_in_playback;
        self.was_in_playback = self.is_in_playback;
        forwardable
    }
}

fn is_sentinel(nick: &str, text: &str, sentinel: &str) -> bool {
    nick == PLAYBACK_SENDER && text == sentinel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(nick: &str, text: &str) -> IrcEvent {
        IrcEvent::Message {
            nick: nick.to_string(),
            target: "#caa".to_string(),
            text: text.to_string(),
        }
    }

    fn action(text: &str) -> IrcEvent {
        IrcEvent::Action {
            nick: "alice".to_string(),
            target: "#caa".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_ordinary_messages_forward() {
        let mut state = PlaybackState::new();
        assert!(state.observe(&message("alice", "hello")));
        assert!(state.observe(&message("bob", "hi")));
    }

    #[test]
    fn test_replay_is_suppressed_inclusive() {
        let mut state = PlaybackState::new();
        let lines = [
            message("alice", "before"),
            message(PLAYBACK_SENDER, PLAYBACK_START),
            message("alice", "old 1"),
            message("bob", "old 2"),
            message(PLAYBACK_SENDER, PLAYBACK_END),
            message("alice", "after"),
        ];

        let forwarded: Vec<bool> = lines.iter().map(|l| state.observe(l)).collect();
        assert_eq!(forwarded, vec![true, false, false, false, false, true]);
        assert!(!state.is_in_playback());
    }

    #[test]
    fn test_end_sentinel_outside_playback_is_forwarded() {
        let mut state = PlaybackState::new();
        assert!(state.observe(&message(PLAYBACK_SENDER, PLAYBACK_END)));
        assert!(!state.is_in_playback());
    }

    #[test]
    fn test_sentinel_from_other_sender_is_ignored() {
        let mut state = PlaybackState::new();
        assert!(state.observe(&message("alice", PLAYBACK_START)));
        assert!(!state.is_in_playback());
    }

    #[test]
    fn test_nested_start_does_not_reset() {
        let mut state = PlaybackState::new();
        state.observe(&message(PLAYBACK_SENDER, PLAYBACK_START));
        assert!(!state.observe(&message(PLAYBACK_SENDER, PLAYBACK_START)));
        assert!(!state.observe(&message(PLAYBACK_SENDER, PLAYBACK_END)));
        assert!(state.observe(&message("alice", "live")));
    }

    #[test]
    fn test_actions_suppressed_without_transition() {
        let mut state = PlaybackState::new();
        assert!(state.observe(&action("waves")));

        state.observe(&message(PLAYBACK_SENDER, PLAYBACK_START));
        assert!(!state.observe(&action("waves")));
        assert!(state.is_in_playback());

        state.observe(&message(PLAYBACK_SENDER, PLAYBACK_END));
        assert!(state.observe(&action("waves")));
    }
}
