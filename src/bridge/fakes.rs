//! In-memory network doubles for relay loop tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::error::{SendError, SendResult};
use crate::common::types::{IrcChannel, NickSet, SlackChannel};

use super::capabilities::{IrcSender, SlackSender};
use super::membership::RosterSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcSent {
    Message(String, String),
    Action(String, String),
    Join(String, Option<String>),
}

/// Records IRC sends and serves rosters set by the test.
#[derive(Debug, Clone, Default)]
pub struct FakeIrc {
    sent: Arc<Mutex<Vec<IrcSent>>>,
    rosters: Arc<Mutex<HashMap<String, NickSet>>>,
}

impl FakeIrc {
    pub fn sent(&self) -> Vec<IrcSent> {
        self.sent.lock().clone()
    }

    pub fn set_roster(&self, channel: &str, nicks: &[&str]) {
        self.rosters.lock().insert(
            channel.to_string(),
            nicks.iter().map(|n| n.to_string()).collect(),
        );
    }
}

impl IrcSender for FakeIrc {
    fn send_message(&self, channel: &IrcChannel, text: &str) -> SendResult<()> {
        self.sent
            .lock()
            .push(IrcSent::Message(channel.to_string(), text.to_string()));
        Ok(())
    }

    fn send_action(&self, channel: &IrcChannel, text: &str) -> SendResult<()> {
        self.sent
            .lock()
            .push(IrcSent::Action(channel.to_string(), text.to_string()));
        Ok(())
    }

    fn join(&self, channel: &IrcChannel, key: Option<&str>) -> SendResult<()> {
        self.sent
            .lock()
            .push(IrcSent::Join(channel.to_string(), key.map(str::to_string)));
        Ok(())
    }
}

impl RosterSource for FakeIrc {
    fn current_roster(&self, channel: &IrcChannel) -> Option<NickSet> {
        self.rosters.lock().get(channel.as_str()).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackSent {
    As(String, String, String),
    Bot(String, String),
    Owner(String),
}

/// Records Slack posts. Can be told to fail every send.
#[derive(Debug, Clone, Default)]
pub struct FakeSlack {
    sent: Arc<Mutex<Vec<SlackSent>>>,
    failing: bool,
}

impl FakeSlack {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SlackSent> {
        self.sent.lock().clone()
    }

    fn record(&self, post: SlackSent) -> SendResult<()> {
        if self.failing {
            return Err(SendError::QueueClosed { network: "Slack" });
        }
        self.sent.lock().push(post);
        Ok(())
    }
}

impl SlackSender for FakeSlack {
    fn send_as(&self, display_name: &str, channel: &SlackChannel, text: &str) -> SendResult<()> {
        self.record(SlackSent::As(
            display_name.to_string(),
            channel.to_string(),
            text.to_string(),
        ))
    }

    fn send_as_bot(&self, channel: &SlackChannel, text: &str) -> SendResult<()> {
        self.record(SlackSent::Bot(channel.to_string(), text.to_string()))
    }

    fn send_to_owner(&self, text: &str) -> SendResult<()> {
        self.record(SlackSent::Owner(text.to_string()))
    }
}
