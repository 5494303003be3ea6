//! Ordered outbound posting to Slack.
//!
//! Every post goes through one queue drained by a single task, so posts
//! reach Slack in the order the relay issued them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bridge::capabilities::SlackSender;
use crate::common::error::{SendError, SendResult};
use crate::common::types::SlackChannel;

use super::api::{PostMessage, SlackApi};
use super::directory::SlackDirectory;
use super::markup::icon_url;

/// Create a send handle and the receiver its sender task drains.
pub fn new_outbox(
    directory: Arc<SlackDirectory>,
    bot_username: impl Into<String>,
) -> (SlackHandle, mpsc::UnboundedReceiver<PostMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SlackHandle {
        tx,
        directory,
        bot_username: bot_username.into(),
    };
    (handle, rx)
}

/// Post queued messages one at a time until every handle is dropped.
///
/// Failed posts are logged and dropped.
pub async fn run_sender(api: SlackApi, mut rx: mpsc::UnboundedReceiver<PostMessage>) {
    while let Some(post) = rx.recv().await {
        if let Err(source) = api.post_message(&post).await {
            let e = SendError::Slack {
                method: "chat.postMessage",
                source,
            };
            warn!(channel = %post.channel_id, "Failed to post to Slack: {}", e);
        }
    }
    info!("Slack sender task ended");
}

/// Cloneable handle implementing [`SlackSender`].
#[derive(Debug, Clone)]
pub struct SlackHandle {
    tx: mpsc::UnboundedSender<PostMessage>,
    directory: Arc<SlackDirectory>,
    /// Display name for bridge notices.
    bot_username: String,
}

impl SlackHandle {
    fn channel_id(&self, channel: &SlackChannel) -> SendResult<String> {
        self.directory
            .channel_id(channel.as_str())
            .map(str::to_string)
            .ok_or_else(|| SendError::UnknownChannel {
                channel: channel.to_string(),
            })
    }

    fn enqueue(&self, post: PostMessage) -> SendResult<()> {
        self.tx
            .send(post)
            .map_err(|_| SendError::QueueClosed { network: "Slack" })
    }

    fn bot_post(&self, channel_id: String, text: &str) -> PostMessage {
        PostMessage {
            channel_id,
            text: text.to_string(),
            username: Some(self.bot_username.clone()),
            icon_url: None,
            link_names: true,
        }
    }
}

impl SlackSender for SlackHandle {
    fn send_as(&self, display_name: &str, channel: &SlackChannel, text: &str) -> SendResult<()> {
        let post = PostMessage {
            channel_id: self.channel_id(channel)?,
            text: text.to_string(),
            username: Some(display_name.to_string()),
            icon_url: Some(icon_url(display_name)),
            link_names: false,
        };
        self.enqueue(post)
    }

    fn send_as_bot(&self, channel: &SlackChannel, text: &str) -> SendResult<()> {
        let post = self.bot_post(self.channel_id(channel)?, text);
        self.enqueue(post)
    }

    fn send_to_owner(&self, text: &str) -> SendResult<()> {
        let post = self.bot_post(self.directory.owner_dm().to_string(), text);
        self.enqueue(post)
    }
}
