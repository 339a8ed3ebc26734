//! Application-wide constants and the default table for normalized mail
//!
//! Sentinels are fixed strings so callers and tests can tell substituted
//! placeholders apart from real content.

/// `Email::from` when the message carries no usable `From` header.
pub const UNKNOWN_SENDER: &str = "Unknown Sender";

/// `Email::subject` when the message carries no usable `Subject` header.
pub const NO_SUBJECT: &str = "No Subject";

/// `Email::body` when no decodable plain-text part exists.
pub const NO_CONTENT: &str = "No content available";

/// Response text when the completion backend answered but produced nothing usable.
pub const NO_RESPONSE: &str = "No response available.";

/// Number of messages fetched per call unless configured otherwise.
pub const DEFAULT_FETCH_LIMIT: usize = 5;

/// Upper clamp for the fetch limit. The batch is a latency/quota ceiling, not a page.
pub const MAX_FETCH_LIMIT: usize = 50;

/// Token ceiling for a single completion.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Error message display duration in seconds before auto-dismiss.
pub const ERROR_TTL_SECS: u64 = 5;

/// Spinner animation frame duration in milliseconds.
pub const SPINNER_FRAME_MS: u128 = 80;

/// How long the OAuth loopback listener waits for the browser redirect.
pub const OAUTH_CALLBACK_TIMEOUT_SECS: u64 = 120;
