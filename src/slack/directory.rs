//! Slack identity caches.
//!
//! Channel and user names are resolved once after connecting and are
//! read-only afterwards, so the directory is shared behind an `Arc`
//! without locking.

use std::collections::HashMap;

use tracing::info;

use crate::common::error::{ConnectionError, ConnectionResult, SlackApiError};

use super::api::{AuthIdentity, ChannelInfo, SlackApi, UserInfo};

/// Id -> display name lookups used when rendering Slack markup.
pub trait DirectoryLookup {
    /// Channel name, with its leading `#`.
    fn channel_name(&self, id: &str) -> Option<&str>;

    fn user_name(&self, id: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct SlackDirectory {
    /// Channel id -> `#name`.
    channel_names: HashMap<String, String>,
    /// `#name` -> channel id.
    channel_ids: HashMap<String, String>,
    /// User id -> user name.
    user_names: HashMap<String, String>,
    /// The bridge's own identity.
    identity: Option<AuthIdentity>,
    owner_id: String,
    /// Direct message channel with the owner.
    owner_dm: String,
}

impl SlackDirectory {
    /// Build the caches from the API listings and locate the owner.
    pub fn from_listings(
        identity: AuthIdentity,
        channels: Vec<ChannelInfo>,
        users: Vec<UserInfo>,
        owner: &str,
    ) -> ConnectionResult<Self> {
        let owner_id = users
            .iter()
            .find(|u| !u.deleted && u.name == owner)
            .map(|u| u.id.clone())
            .ok_or_else(|| ConnectionError::OwnerNotFound {
                owner: owner.to_string(),
            })?;

        let mut directory = Self {
            identity: Some(identity),
            owner_id,
            ..Self::default()
        };
        for channel in channels {
            let name = format!("#{}", channel.name);
            directory.channel_ids.insert(name.clone(), channel.id.clone());
            directory.channel_names.insert(channel.id, name);
        }
        for user in users {
            directory.user_names.insert(user.id, user.name);
        }

        Ok(directory)
    }

    /// Fetch everything from the Web API, including the owner's DM channel.
    pub async fn load(api: &SlackApi, owner: &str) -> ConnectionResult<Self> {
        let api_error = |method: &'static str| {
            move |source: SlackApiError| ConnectionError::SlackApi { method, source }
        };

        let identity = api.auth_test().await.map_err(api_error("auth.test"))?;
        info!("Authenticated with Slack as user {}", identity.user_id);

        let channels = api
            .list_channels()
            .await
            .map_err(api_error("conversations.list"))?;
        let users = api.list_users().await.map_err(api_error("users.list"))?;
        info!(
            "Loaded {} Slack channels and {} users",
            channels.len(),
            users.len()
        );

        let mut directory = Self::from_listings(identity, channels, users, owner)?;
        directory.owner_dm = api
            .open_direct_message(&directory.owner_id)
            .await
            .map_err(api_error("conversations.open"))?;

        Ok(directory)
    }

    /// Id of a channel given its `#name`.
    pub fn channel_id(&self, name: &str) -> Option<&str> {
        self.channel_ids.get(name).map(String::as_str)
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn owner_dm(&self) -> &str {
        &self.owner_dm
    }

    /// Whether a message author is the bridge itself.
    pub fn is_self(&self, user_id: Option<&str>, bot_id: Option<&str>) -> bool {
        let Some(identity) = &self.identity else {
            return false;
        };
        user_id.is_some_and(|id| id == identity.user_id)
            || (bot_id.is_some() && bot_id == identity.bot_id.as_deref())
    }
}

impl DirectoryLookup for SlackDirectory {
    fn channel_name(&self, id: &str) -> Option<&str> {
        self.channel_names.get(id).map(String::as_str)
    }

    fn user_name(&self, id: &str) -> Option<&str> {
        self.user_names.get(id).map(String::as_str)
    }
}
