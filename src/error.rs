//! Failure taxonomy shared by the fetcher, the dispatcher and the session gate
//!
//! Every failure that crosses a component boundary is one of these tagged
//! values. Binary glue (CLI, terminal setup) wraps them in `anyhow`.

use thiserror::Error;

/// Errors raised by the mailbox read API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailboxError {
    /// The server rejected the access token (HTTP 401/403).
    #[error("mailbox rejected credentials ({status}): {body}")]
    Unauthorized { status: u16, body: String },
    /// Any other non-2xx answer.
    #[error("mailbox API error ({status}): {body}")]
    Status { status: u16, body: String },
    /// Connection, TLS or timeout failure.
    #[error("mailbox request failed: {0}")]
    Request(String),
    /// The answer was not the JSON shape the API documents.
    #[error("unexpected mailbox payload: {0}")]
    Payload(String),
}

impl MailboxError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for MailboxError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Payload(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// A body part that was present but could not be turned into text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64 body: {0}")]
    Base64(String),
}

/// Failure of a whole fetch cycle. Per-message problems never end up here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("session rejected: {0}")]
    Auth(String),
    #[error("could not list messages: {0}")]
    Retrieval(MailboxError),
}

/// Errors talking to the completion backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("completion API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("completion response is not JSON: {0}")]
    Json(String),
}

/// Failure of one AI action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// An action was requested with nothing selected. No request is issued.
    #[error("select an email first")]
    Usage,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DispatchError {
    /// Only transport failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Session gate failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not signed in; run `mailmate login` first")]
    NotSignedIn,
    #[error("OAuth client id missing; set gmail.client_id or MAILMATE_OAUTH_CLIENT_ID")]
    MissingClientId,
    #[error("session expired or revoked: {0}")]
    Expired(String),
    #[error("sign-in failed: {0}")]
    Flow(#[from] anyhow::Error),
    #[error("credential storage failed: {0}")]
    Storage(String),
}

/// Coarse classification surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Retrieval,
    Decode,
    Transport,
    Usage,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Auth => "Auth",
            Self::Retrieval => "Retrieval",
            Self::Decode => "Decode",
            Self::Transport => "Transport",
            Self::Usage => "Usage",
        }
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Auth(_) => FailureKind::Auth,
            Self::Retrieval(_) => FailureKind::Retrieval,
        }
    }
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Usage => FailureKind::Usage,
            Self::Transport(_) => FailureKind::Transport,
        }
    }
}

impl From<AuthError> for FetchError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e.to_string())
    }
}

/// Any failure the UI may have to show, tagged by where it came from.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl AssistantError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Auth(_) => FailureKind::Auth,
            Self::Fetch(e) => e.kind(),
            Self::Dispatch(e) => e.kind(),
        }
    }
}
