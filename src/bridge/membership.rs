//! Channel membership snapshots.
//!
//! The IRC event stream does not say which channels a user was in when
//! they quit or changed nick, so the relay keeps a snapshot of every
//! mapped channel's roster taken after the last membership change.

use std::collections::BTreeMap;

use crate::common::types::{IrcChannel, NickSet};

use super::mapping::SharedMapping;

/// Read access to the IRC client's live channel rosters.
pub trait RosterSource {
    /// Nicknames in `channel`, or `None` if the roster is not yet known.
    fn current_roster(&self, channel: &IrcChannel) -> Option<NickSet>;
}

/// Who was present in each mapped channel at one point in time.
///
/// A channel missing from the snapshot means its roster was not known,
/// which is different from a known but empty channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipSnapshot {
    channels: BTreeMap<IrcChannel, NickSet>,
}

impl MembershipSnapshot {
    pub fn get(&self, channel: &IrcChannel) -> Option<&NickSet> {
        self.channels.get(channel)
    }

    pub fn is_known(&self, channel: &IrcChannel) -> bool {
        self.get(channel).is_some()
    }

    /// Channels in which `nick` was present.
    pub fn channels_containing<'a>(&'a self, nick: &'a str) -> impl Iterator<Item = &'a IrcChannel> {
        self.channels
            .iter()
            .filter(move |(_, nicks)| nicks.contains(nick))
            .map(|(channel, _)| channel)
    }

    /// Place `nick` in exactly the `seen_in` channels, as the connection
    /// saw it when applying a quit or rename.
    ///
    /// The live roster may already reflect later events, so the
    /// connection's view at the time of the event wins.
    pub fn record_presence(&mut self, nick: &str, seen_in: &[IrcChannel]) {
        for (channel, nicks) in self.channels.iter_mut() {
            if !seen_in.contains(channel) {
                nicks.remove(nick);
            }
        }
        for channel in seen_in {
            self.channels
                .entry(channel.clone())
                .or_default()
                .insert(nick.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

impl FromIterator<(IrcChannel, NickSet)> for MembershipSnapshot {
    fn from_iter<T: IntoIterator<Item = (IrcChannel, NickSet)>>(iter: T) -> Self {
        Self {
            channels: iter.into_iter().collect(),
        }
    }
}

/// Takes membership snapshots of every mapped channel.
#[derive(Debug, Clone)]
pub struct MembershipTracker {
    mapping: SharedMapping,
}

impl MembershipTracker {
    pub fn new(mapping: SharedMapping) -> Self {
        Self { mapping }
    }

    /// Query the roster of every mapped IRC channel.
    pub fn snapshot<R: RosterSource + ?Sized>(&self, roster: &R) -> MembershipSnapshot {
        self.mapping
            .irc_channels()
            .filter_map(|channel| {
                roster
                    .current_roster(channel)
                    .map(|nicks| (channel.clone(), nicks))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::bridge::mapping::ChannelMapping;
    use crate::common::types::SlackChannel;

    struct FixedRoster(HashMap<String, NickSet>);

    impl RosterSource for FixedRoster {
        fn current_roster(&self, channel: &IrcChannel) -> Option<NickSet> {
            self.0.get(channel.as_str()).cloned()
        }
    }

    fn nicks(names: &[&str]) -> NickSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn mapping() -> SharedMapping {
        let irc = vec![IrcChannel::new("#a"), IrcChannel::new("#b")];
        let slack = vec![SlackChannel::new("#sa"), SlackChannel::new("#sb")];
        let pairs = vec![
            (irc[0].clone(), slack[0].clone()),
            (irc[1].clone(), slack[1].clone()),
        ];
        Arc::new(ChannelMapping::build(&pairs, &irc, &slack).unwrap())
    }

    #[test]
    fn test_unknown_roster_is_omitted() {
        let roster = FixedRoster(HashMap::from([("#a".to_string(), nicks(&["alice"]))]));
        let snapshot = MembershipTracker::new(mapping()).snapshot(&roster);

        assert!(snapshot.is_known(&IrcChannel::new("#a")));
        assert!(!snapshot.is_known(&IrcChannel::new("#b")));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_empty_roster_is_known() {
        let roster = FixedRoster(HashMap::from([("#b".to_string(), NickSet::new())]));
        let snapshot = MembershipTracker::new(mapping()).snapshot(&roster);

        assert_eq!(snapshot.get(&IrcChannel::new("#b")), Some(&NickSet::new()));
    }

    #[test]
    fn test_unmapped_channels_are_not_queried() {
        let roster = FixedRoster(HashMap::from([("#other".to_string(), nicks(&["alice"]))]));
        let snapshot = MembershipTracker::new(mapping()).snapshot(&roster);

        assert_eq!(snapshot.len(), 0);
    }

    #[test]
    fn test_channels_containing() {
        let snapshot: MembershipSnapshot = [
            (IrcChannel::new("#a"), nicks(&["alice", "bob"])),
            (IrcChannel::new("#b"), nicks(&["bob"])),
        ]
        .into_iter()
        .collect();

        let bob: Vec<&str> = snapshot.channels_containing("bob").map(IrcChannel::as_str).collect();
        let alice: Vec<&str> = snapshot.channels_containing("alice").map(IrcChannel::as_str).collect();
        assert_eq!(bob, vec!["#a", "#b"]);
        assert_eq!(alice, vec!["#a"]);
        assert_eq!(snapshot.channels_containing("carol").count(), 0);
    }

    #[test]
    fn test_record_presence_overrides_newer_roster() {
        // Refreshed after alice's quit was applied but before it was handled
        let mut snapshot: MembershipSnapshot = [
            (IrcChannel::new("#a"), nicks(&["bob"])),
            (IrcChannel::new("#b"), nicks(&["alice"])),
        ]
        .into_iter()
        .collect();

        snapshot.record_presence("alice", &[IrcChannel::new("#a")]);

        let alice: Vec<&str> = snapshot.channels_containing("alice").map(IrcChannel::as_str).collect();
        assert_eq!(alice, vec!["#a"]);
        assert!(snapshot.get(&IrcChannel::new("#a")).unwrap().contains("bob"));
    }
}
