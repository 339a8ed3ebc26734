//! Normalization of raw API messages into [`Email`] values.
//!
//! Default table applied here:
//!
//! | field     | source                                   | when absent or empty     |
//! |-----------|------------------------------------------|--------------------------|
//! | `from`    | first header named exactly `From`        | `"Unknown Sender"`       |
//! | `subject` | first header named exactly `Subject`     | `"No Subject"`           |
//! | `body`    | first top-level `text/plain` part, else the inline body | `"No content available"` |

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine, alphabet};

use super::types::{Email, EntryIssue, Header, MessagePart, RawMessage};
use crate::error::DecodeError;

const PLAIN_TEXT: &str = "text/plain";

/// Standard alphabet, padding optional. Gmail strips the trailing `=`.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Case-sensitive header lookup. Only the first header with this name counts.
pub fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
        .filter(|v| !v.is_empty())
}

/// Decode a URL-safe base64 body: map `-`/`_` back to `+`/`/`, then decode
/// with the standard alphabet. Invalid UTF-8 sequences are replaced rather
/// than rejected.
pub fn decode_body_data(data: &str) -> Result<String, DecodeError> {
    let standard: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    let bytes = STANDARD_LENIENT
        .decode(standard.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Inline body data of a part, if it carries any.
fn part_data(part: &MessagePart) -> Option<&str> {
    part.body
        .as_ref()?
        .data
        .as_deref()
        .filter(|data| !data.is_empty())
}

/// Select and decode the plain-text body.
///
/// Multipart messages only look at their top-level parts; a multipart
/// message without a `text/plain` part has no body even if the envelope
/// carries inline data.
pub fn extract_body(payload: &MessagePart) -> Result<Option<String>, DecodeError> {
    let data = match payload.parts {
        Some(ref parts) => parts
            .iter()
            .find(|p| p.mime_type.as_deref() == Some(PLAIN_TEXT))
            .and_then(part_data),
        None => part_data(payload),
    };

    match data {
        Some(data) => Ok(Some(decode_body_data(data)?).filter(|text| !text.is_empty())),
        None => Ok(None),
    }
}

/// Normalize one retrieved message. Never fails: problems are reported as an
/// [`EntryIssue`] next to an email that uses the sentinel defaults.
pub fn normalize(raw: &RawMessage) -> (Email, Option<EntryIssue>) {
    let Some(payload) = raw.payload.as_ref() else {
        return (
            Email::placeholder(),
            Some(EntryIssue::Decode("message has no payload".to_string())),
        );
    };

    let from = header_value(&payload.headers, "From").map(str::to_string);
    let subject = header_value(&payload.headers, "Subject").map(str::to_string);

    let (body, issue) = match extract_body(payload) {
        Ok(body) => (body, None),
        Err(e) => {
            tracing::warn!(
                "Undecodable body in message {}: {}",
                raw.id.as_deref().unwrap_or("?"),
                e
            );
            (None, Some(EntryIssue::Decode(e.to_string())))
        }
    };

    (Email::from_parts(from, subject, body), issue)
}
