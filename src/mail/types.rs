use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{NO_CONTENT, NO_SUBJECT, UNKNOWN_SENDER};
use crate::error::FailureKind;

/// Opaque mailbox identifier for one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical normalized message. Fields are always populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    from: String,
    subject: String,
    body: String,
}

impl Email {
    /// Build from optional parts, substituting the documented sentinel for each
    /// missing field.
    pub fn from_parts(from: Option<String>, subject: Option<String>, body: Option<String>) -> Self {
        Self {
            from: from.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            subject: subject.unwrap_or_else(|| NO_SUBJECT.to_string()),
            body: body.unwrap_or_else(|| NO_CONTENT.to_string()),
        }
    }

    /// All-sentinel email standing in for a message that could not be retrieved.
    pub fn placeholder() -> Self {
        Self::from_parts(None, None, None)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn has_body(&self) -> bool {
        self.body != NO_CONTENT
    }
}

/// Why an entry carries placeholder content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryIssue {
    /// The message itself could not be retrieved; every field is a sentinel.
    Retrieval(String),
    /// Headers are real but the text body could not be decoded.
    Decode(String),
}

impl EntryIssue {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Retrieval(_) => FailureKind::Retrieval,
            Self::Decode(_) => FailureKind::Decode,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Retrieval(reason) | Self::Decode(reason) => reason,
        }
    }
}

/// One slot of a fetch result, in mailbox order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub id: MessageId,
    pub email: Email,
    /// `Some` when the entry was degraded. Lets callers tell a failed item
    /// apart from a genuinely empty message.
    pub issue: Option<EntryIssue>,
}

impl InboxEntry {
    pub fn is_degraded(&self) -> bool {
        self.issue.is_some()
    }
}

// Wire shapes of the mailbox read API (Gmail `users.messages` resource).

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Absent when the mailbox is empty.
    #[serde(default)]
    pub messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: MessageId,
}

/// Full message as returned by `GetMessage`: headers plus MIME structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
    /// `Some` (even when empty) marks multipart content.
    #[serde(default)]
    pub parts: Option<Vec<MessagePart>>,
    #[serde(default)]
    pub body: Option<PartBody>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// Mailbox profile, used to name the signed-in identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
}
