//! Live channel rosters for the IRC connection.
//!
//! Updated by the connection task as JOIN, PART, KICK, QUIT, NICK and
//! NAMES replies arrive. A channel has no roster until its NAMES list
//! has been received in full.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::types::{channel_key, NickSet};

/// Channel membership prefixes that may precede a nick in a NAMES reply.
const MEMBERSHIP_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// Roster shared between the connection task and the relay.
pub type SharedRoster = Arc<RwLock<Roster>>;

#[derive(Debug, Default)]
pub struct Roster {
    /// Complete rosters, keyed by case-folded channel name.
    channels: HashMap<String, NickSet>,
    /// NAMES replies still being received.
    pending: HashMap<String, NickSet>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRoster {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Nicknames in `channel`, or `None` while the roster is unknown.
    pub fn members(&self, channel: &str) -> Option<&NickSet> {
        self.channels.get(&channel_key(channel))
    }

    /// Accumulate one RPL_NAMREPLY line.
    pub fn add_names(&mut self, channel: &str, names: &str) {
        let pending = self.pending.entry(channel_key(channel)).or_default();
        for entry in names.split_whitespace() {
            let nick = entry.trim_start_matches(MEMBERSHIP_PREFIXES);
            // userhost-in-names sends nick!user@host
            let nick = nick.split_once('!').map_or(nick, |(nick, _)| nick);
            if !nick.is_empty() {
                pending.insert(nick.to_string());
            }
        }
    }

    /// Commit the accumulated NAMES list on RPL_ENDOFNAMES.
    pub fn end_names(&mut self, channel: &str) {
        let key = channel_key(channel);
        let names = self.pending.remove(&key).unwrap_or_default();
        self.channels.insert(key, names);
    }

    /// Someone else joined a channel we are in.
    pub fn add(&mut self, channel: &str, nick: &str) {
        if let Some(nicks) = self.channels.get_mut(&channel_key(channel)) {
            nicks.insert(nick.to_string());
        }
    }

    /// Someone left a channel.
    pub fn remove(&mut self, channel: &str, nick: &str) {
        if let Some(nicks) = self.channels.get_mut(&channel_key(channel)) {
            nicks.remove(nick);
        }
    }

    /// We joined or left a channel: forget what we knew about it.
    pub fn forget(&mut self, channel: &str) {
        let key = channel_key(channel);
        self.channels.remove(&key);
        self.pending.remove(&key);
    }

    /// Someone quit the network. Returns the channels they were in.
    pub fn remove_everywhere(&mut self, nick: &str) -> Vec<String> {
        let mut left = Vec::new();
        for (channel, nicks) in self.channels.iter_mut() {
            if nicks.remove(nick) {
                left.push(channel.clone());
            }
        }
        left.sort();
        left
    }

    /// Someone changed nick. Returns the channels they were in.
    pub fn rename(&mut self, old: &str, new: &str) -> Vec<String> {
        let mut renamed = Vec::new();
        for (channel, nicks) in self.channels.iter_mut() {
            if nicks.remove(old) {
                nicks.insert(new.to_string());
                renamed.push(channel.clone());
            }
        }
        renamed.sort();
        renamed
    }

    /// The connection ended.
    pub fn clear(&mut self) {
        self.channels.clear();
        self.pending.clear();
    }
}
