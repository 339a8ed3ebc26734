//! Gmail REST API v1 implementation of [`MailboxApi`]

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::mailbox::MailboxApi;
use super::types::{MessageId, MessageList, Profile, RawMessage};
use crate::error::MailboxError;
use crate::session::Session;

#[derive(Clone)]
pub struct GmailClient {
    client: Client,
    base_url: String,
}

impl GmailClient {
    /// `base_url` is the API root, e.g. `https://gmail.googleapis.com/gmail/v1`.
    pub fn new(base_url: &str) -> Result<Self, MailboxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MailboxError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: &Session,
    ) -> Result<T, MailboxError> {
        let response = request.bearer_auth(session.access_token()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MailboxError::Unauthorized {
                    status: status.as_u16(),
                    body,
                },
                _ => MailboxError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        Ok(response.json().await?)
    }

    /// Address and size of the signed-in mailbox
    pub async fn profile(&self, session: &Session) -> Result<Profile, MailboxError> {
        self.send_json(self.client.get(self.url("profile")), session)
            .await
    }
}

impl MailboxApi for GmailClient {
    async fn list_messages(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<MessageId>, MailboxError> {
        let request = self
            .client
            .get(self.url("messages"))
            .query(&[("maxResults", limit.to_string().as_str()), ("labelIds", "INBOX")]);

        let list: MessageList = self.send_json(request, session).await?;
        let ids: Vec<MessageId> = list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .take(limit)
            .collect();

        tracing::debug!("Listed {} message ids (limit {})", ids.len(), limit);
        Ok(ids)
    }

    async fn get_message(
        &self,
        session: &Session,
        id: &MessageId,
    ) -> Result<RawMessage, MailboxError> {
        // Ids are opaque but end up in the path
        if id.as_str().is_empty() || id.as_str().contains(['/', '\\', '?', '#']) {
            return Err(MailboxError::Payload(format!("invalid message id {:?}", id.as_str())));
        }

        let request = self
            .client
            .get(self.url(&format!("messages/{}", id)))
            .query(&[("format", "full")]);

        self.send_json(request, session).await
    }
}
