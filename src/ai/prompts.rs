//! Action kinds and the instruction templates sent to the completion backend

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mail::Email;

/// Target tone for [`ActionKind::AdjustTone`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    /// Any other tone word, used verbatim in the instruction
    Custom(String),
}

impl Tone {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Professional => "Professional",
            Self::Friendly => "Friendly",
            Self::Custom(tone) => tone,
        }
    }

    /// Next preset; a custom tone goes back to the first preset
    pub fn next(&self) -> Self {
        match self {
            Self::Professional => Self::Friendly,
            Self::Friendly | Self::Custom(_) => Self::Professional,
        }
    }
}

impl From<String> for Tone {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Self::default()
        } else if trimmed.eq_ignore_ascii_case("professional") {
            Self::Professional
        } else if trimmed.eq_ignore_ascii_case("friendly") {
            Self::Friendly
        } else {
            Self::Custom(trimmed.to_string())
        }
    }
}

impl From<&str> for Tone {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Tone> for String {
    fn from(tone: Tone) -> Self {
        tone.as_str().to_string()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to ask the model to do with the selected email
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Summarize,
    Reply,
    Draft,
    AdjustTone(Tone),
}

impl ActionKind {
    /// Short label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Summarize => "Summary",
            Self::Reply => "Reply",
            Self::Draft => "Draft",
            Self::AdjustTone(_) => "Tone rewrite",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdjustTone(tone) => write!(f, "adjust tone ({})", tone),
            other => f.write_str(&other.label().to_lowercase()),
        }
    }
}

/// Build the single user-role instruction for `action` on `email`.
///
/// The body is interpolated as-is between double quotes.
pub fn build_instruction(email: &Email, action: &ActionKind) -> String {
    let body = email.body();
    match action {
        ActionKind::Summarize => format!("Summarize this email: \"{}\"", body),
        ActionKind::Reply => format!("Write a professional reply to this email: \"{}\"", body),
        ActionKind::Draft => format!("Draft a new email with the following intent: \"{}\"", body),
        ActionKind::AdjustTone(tone) => {
            format!("Rewrite this email in a more {} tone: \"{}\"", tone, body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(body: &str) -> Email {
        Email::from_parts(
            Some("a@example.com".into()),
            Some("s".into()),
            Some(body.into()),
        )
    }

    #[test]
    fn test_templates_match_exactly() {
        let email = email("Can we move the call to 3pm?");

        assert_eq!(
            build_instruction(&email, &ActionKind::Summarize),
            "Summarize this email: \"Can we move the call to 3pm?\""
        );
        assert_eq!(
            build_instruction(&email, &ActionKind::Reply),
            "Write a professional reply to this email: \"Can we move the call to 3pm?\""
        );
        assert_eq!(
            build_instruction(&email, &ActionKind::Draft),
            "Draft a new email with the following intent: \"Can we move the call to 3pm?\""
        );
        assert_eq!(
            build_instruction(&email, &ActionKind::AdjustTone(Tone::Professional)),
            "Rewrite this email in a more Professional tone: \"Can we move the call to 3pm?\""
        );
        assert_eq!(
            build_instruction(&email, &ActionKind::AdjustTone(Tone::Friendly)),
            "Rewrite this email in a more Friendly tone: \"Can we move the call to 3pm?\""
        );
    }

    #[test]
    fn test_custom_tone_is_verbatim() {
        let email = email("ok");
        assert_eq!(
            build_instruction(&email, &ActionKind::AdjustTone(Tone::from("apologetic"))),
            "Rewrite this email in a more apologetic tone: \"ok\""
        );
    }

    #[test]
    fn test_blank_tone_falls_back_to_default() {
        assert_eq!(Tone::from("  "), Tone::Professional);
        assert_eq!(
            build_instruction(&Email::placeholder(), &ActionKind::AdjustTone(Tone::from(""))),
            "Rewrite this email in a more Professional tone: \"No content available\""
        );
    }

    #[test]
    fn test_body_is_not_escaped() {
        let email = email("He said \"no\".\nThanks");
        assert_eq!(
            build_instruction(&email, &ActionKind::Summarize),
            "Summarize this email: \"He said \"no\".\nThanks\""
        );
    }

    #[test]
    fn test_sentinel_body_is_used_as_is() {
        let email = Email::placeholder();
        assert_eq!(
            build_instruction(&email, &ActionKind::Summarize),
            "Summarize this email: \"No content available\""
        );
    }

    #[test]
    fn test_tone_parsing_and_cycle() {
        assert_eq!(Tone::from("FRIENDLY"), Tone::Friendly);
        assert_eq!(Tone::from(" professional "), Tone::Professional);
        assert_eq!(Tone::from("curt"), Tone::Custom("curt".into()));
        assert_eq!(Tone::Professional.next(), Tone::Friendly);
        assert_eq!(Tone::Friendly.next(), Tone::Professional);
        assert_eq!(Tone::Custom("curt".into()).next(), Tone::Professional);
    }
}
