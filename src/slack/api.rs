//! Slack Web API client.
//!
//! Only the handful of methods the bridge needs: identity, channel and
//! user listings, opening a DM, posting, and opening a Socket Mode URL.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::common::error::SlackApiError;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Page size for list methods.
const PAGE_LIMIT: &str = "200";

/// The bridge's own identity, from `auth.test`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthIdentity {
    pub user_id: String,
    pub bot_id: Option<String>,
}

/// A conversation from `conversations.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

/// A user from `users.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

/// One `chat.postMessage` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMessage {
    pub channel_id: String,
    pub text: String,
    pub username: Option<String>,
    pub icon_url: Option<String>,
    /// Let Slack turn `@name` into mentions.
    pub link_names: bool,
}

/// Thin async wrapper over the Web API.
#[derive(Debug, Clone)]
pub struct SlackApi {
    http: reqwest::Client,
    /// Bot token
    token: String,
}

impl SlackApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }

    /// POST a form-encoded call and return the body of a successful response.
    async fn call(
        &self,
        method: &str,
        token: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, SlackApiError> {
        debug!(method, "Calling Slack API");
        let body: Value = self
            .http
            .post(format!("{}/{}", SLACK_API_BASE, method))
            .bearer_auth(token)
            .form(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        check_response(body)
    }

    /// Collect every page of a cursor-paginated list method.
    async fn paginate<T: DeserializeOwned>(
        &self,
        method: &str,
        key: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, SlackApiError> {
        let mut items = Vec::new();
        let mut cursor = String::new();

        loop {
            let body = {
                let mut form = params.to_vec();
                form.push(("limit", PAGE_LIMIT));
                if !cursor.is_empty() {
                    form.push(("cursor", cursor.as_str()));
                }
                self.call(method, &self.token, &form).await?
            };

            items.extend(list_page::<T>(&body, key)?);
            cursor = next_cursor(&body);
            if cursor.is_empty() {
                break;
            }
        }

        Ok(items)
    }

    pub async fn auth_test(&self) -> Result<AuthIdentity, SlackApiError> {
        let body = self.call("auth.test", &self.token, &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Every non-archived public and private channel the bot can see.
    pub async fn list_channels(&self) -> Result<Vec<ChannelInfo>, SlackApiError> {
        self.paginate(
            "conversations.list",
            "channels",
            &[
                ("types", "public_channel,private_channel"),
                ("exclude_archived", "true"),
            ],
        )
        .await
    }

    pub async fn list_users(&self) -> Result<Vec<UserInfo>, SlackApiError> {
        self.paginate("users.list", "members", &[]).await
    }

    /// Open (or reuse) a direct message channel with a user; returns its id.
    pub async fn open_direct_message(&self, user_id: &str) -> Result<String, SlackApiError> {
        let body = self
            .call("conversations.open", &self.token, &[("users", user_id)])
            .await?;
        string_at(&body, "/channel/id")
    }

    pub async fn post_message(&self, post: &PostMessage) -> Result<(), SlackApiError> {
        let mut form = vec![
            ("channel", post.channel_id.as_str()),
            ("text", post.text.as_str()),
            ("link_names", if post.link_names { "true" } else { "false" }),
        ];
        if let Some(username) = &post.username {
            form.push(("username", username.as_str()));
        }
        if let Some(icon_url) = &post.icon_url {
            form.push(("icon_url", icon_url.as_str()));
        }

        self.call("chat.postMessage", &self.token, &form).await?;
        Ok(())
    }

    /// Ask for a fresh Socket Mode WebSocket URL using the app-level token.
    pub async fn open_socket_url(&self, app_token: &str) -> Result<String, SlackApiError> {
        let body = self.call("apps.connections.open", app_token, &[]).await?;
        string_at(&body, "/url")
    }
}

/// Turn `{"ok": false, "error": ...}` into an error.
fn check_response(body: Value) -> Result<Value, SlackApiError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }

    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(SlackApiError::Api(error.to_string()))
}

fn list_page<T: DeserializeOwned>(body: &Value, key: &str) -> Result<Vec<T>, SlackApiError> {
    match body.get(key) {
        Some(items) => Ok(serde_json::from_value(items.clone())?),
        None => Ok(Vec::new()),
    }
}

fn next_cursor(body: &Value) -> String {
    body.pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_at(body: &Value, pointer: &str) -> Result<String, SlackApiError> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SlackApiError::Api(format!("response is missing {}", pointer)))
}
