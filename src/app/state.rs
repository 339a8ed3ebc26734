//! Application state types
//!
//! The UI layer reads from here; nothing in this module talks to the network.

use super::FetchOutcome;
use crate::ai::{ActionKind, AiEvent, Tone};
use crate::constants::ERROR_TTL_SECS;
use crate::error::{AssistantError, DispatchError, FailureKind};
use crate::mail::InboxEntry;
use crate::selection::{Selection, Ticket};

/// Error, status message and fetch indicator
#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub fetching: bool,
    pub error: Option<String>,
    pub error_time: Option<std::time::Instant>,
    pub message: String,
}

impl StatusState {
    pub fn set_error(&mut self, error: impl ToString) {
        self.error = Some(error.to_string());
        self.error_time = Some(std::time::Instant::now());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.error_time = None;
    }

    /// Clear error if TTL expired. Returns true if error was cleared.
    pub fn clear_error_if_expired(&mut self) -> bool {
        if let Some(time) = self.error_time
            && time.elapsed().as_secs() >= ERROR_TTL_SECS
        {
            self.clear_error();
            true
        } else {
            false
        }
    }

    pub fn set_message(&mut self, msg: impl ToString) {
        self.message = msg.to_string();
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Last fetched batch, newest first
    pub entries: Vec<InboxEntry>,
    /// Highlighted row in the list. Distinct from the selection.
    pub cursor: usize,
    /// Opened email and the AI action state that belongs to it
    pub selection: Selection,
    /// Tone used by "adjust tone"
    pub tone: Tone,
    pub status: StatusState,
    pub signed_in: bool,
    pub ai_enabled: bool,
}

impl AppState {
    pub fn highlighted(&self) -> Option<&InboxEntry> {
        self.entries.get(self.cursor)
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Open the highlighted entry. Returns false when the list is empty.
    pub fn select_highlighted(&mut self) -> bool {
        let Some(email) = self.highlighted().map(|entry| entry.email.clone()) else {
            return false;
        };
        self.selection.select(self.cursor, email);
        true
    }

    /// Replace the list with a new batch. The old selection goes with it.
    pub fn set_entries(&mut self, entries: Vec<InboxEntry>) {
        self.entries = entries;
        self.cursor = 0;
        self.selection.clear();
    }

    pub fn degraded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_degraded()).count()
    }

    pub fn is_busy(&self) -> bool {
        self.status.fetching || self.selection.is_busy()
    }

    pub fn cycle_tone(&mut self) {
        self.tone = self.tone.next();
    }

    // Delegate methods to StatusState
    pub fn set_error(&mut self, error: impl ToString) {
        self.status.set_error(error);
    }

    /// Show a tagged failure in the error bar
    pub fn set_failure(&mut self, error: &AssistantError) {
        self.status
            .set_error(format!("{}: {}", error.kind().label(), error));
    }

    pub fn clear_error(&mut self) {
        self.status.clear_error();
    }

    pub fn clear_error_if_expired(&mut self) -> bool {
        self.status.clear_error_if_expired()
    }

    pub fn set_status(&mut self, msg: impl ToString) {
        self.status.set_message(msg);
    }

    /// Start `kind` on the opened email and hand back the ticket to dispatch.
    ///
    /// With nothing opened this is a usage error, whether or not a backend
    /// is configured.
    pub fn begin_action(&mut self, kind: ActionKind) -> Option<Ticket> {
        if self.selection.email().is_none() {
            self.set_failure(&AssistantError::from(DispatchError::Usage));
            return None;
        }
        if !self.ai_enabled {
            self.set_error("AI backend not configured; set ai.api_key or MAILMATE_API_KEY");
            return None;
        }

        match self.selection.begin(kind) {
            Ok(ticket) => Some(ticket),
            Err(e) => {
                self.set_failure(&AssistantError::from(e));
                None
            }
        }
    }

    /// Apply a finished fetch
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) {
        self.status.fetching = false;

        match outcome {
            Ok(entries) => {
                let count = entries.len();
                self.set_entries(entries);
                self.signed_in = true;

                let degraded = self.degraded_count();
                let message = match (count, degraded) {
                    (0, _) => "Inbox is empty".to_string(),
                    (n, 0) => format!("{} messages", n),
                    (n, d) => format!("{} messages, {} could not be loaded", n, d),
                };
                self.set_status(message);
            }
            Err(e) => {
                tracing::warn!("Fetch failed: {}", e);
                if e.kind() == FailureKind::Auth {
                    self.signed_in = false;
                }
                self.set_status("Fetch failed");
                self.set_failure(&e);
            }
        }
    }

    /// Apply an AI result. Returns false when the selection dropped it as stale.
    pub fn apply_ai_event(&mut self, event: AiEvent) -> bool {
        match event {
            AiEvent::Finished { ticket, result } => {
                let failure = result.as_ref().err().cloned();
                if !self.selection.resolve(&ticket, result) {
                    return false;
                }
                if let Some(e) = failure {
                    self.set_failure(&AssistantError::from(e));
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Response;
    use crate::error::{FetchError, TransportError};
    use crate::selection::ActionState;
    use crate::mail::types::MessageId;
    use crate::mail::{Email, EntryIssue};

    fn entry(id: &str, subject: &str) -> InboxEntry {
        InboxEntry {
            id: MessageId::new(id),
            email: Email::from_parts(None, Some(subject.to_string()), None),
            issue: None,
        }
    }

    fn state_with(n: usize) -> AppState {
        let mut state = AppState::default();
        state.set_entries((0..n).map(|i| entry(&i.to_string(), &format!("s{}", i))).collect());
        state
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut state = state_with(2);
        state.move_up();
        assert_eq!(state.cursor, 0);
        state.move_down();
        state.move_down();
        assert_eq!(state.cursor, 1);

        let mut empty = AppState::default();
        empty.move_down();
        assert_eq!(empty.cursor, 0);
        assert!(!empty.select_highlighted());
    }

    #[test]
    fn test_moving_cursor_keeps_selection() {
        let mut state = state_with(3);
        state.move_down();
        assert!(state.select_highlighted());
        state.move_down();

        assert_eq!(state.selection.index(), Some(1));
        assert_eq!(state.selection.email().unwrap().subject(), "s1");
    }

    #[test]
    fn test_new_batch_drops_selection_and_pending_action() {
        let mut state = state_with(3);
        state.select_highlighted();
        let ticket = state.selection.begin(ActionKind::Summarize).unwrap();

        state.set_entries(vec![entry("new", "fresh")]);
        assert!(state.selection.email().is_none());
        assert!(!state.selection.resolve(
            &ticket,
            Ok(crate::ai::Response {
                text: "late".into()
            })
        ));
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_degraded_count() {
        let mut state = state_with(2);
        state.entries[1].issue = Some(EntryIssue::Retrieval("500".into()));
        assert_eq!(state.degraded_count(), 1);
    }

    #[test]
    fn test_failure_message_is_tagged() {
        let mut state = AppState::default();
        state.set_failure(&AssistantError::from(DispatchError::Usage));
        assert_eq!(
            state.status.error.as_deref(),
            Some("Usage: select an email first")
        );

        state.set_failure(&AssistantError::from(FetchError::Auth("expired".into())));
        assert!(state.status.error.as_deref().unwrap().starts_with("Auth: "));
    }

    #[test]
    fn test_cycle_tone() {
        let mut state = AppState::default();
        assert_eq!(state.tone, Tone::Professional);
        state.cycle_tone();
        assert_eq!(state.tone, Tone::Friendly);
        state.cycle_tone();
        assert_eq!(state.tone, Tone::Professional);
    }

    fn transport_failure() -> Result<Response, DispatchError> {
        Err(DispatchError::Transport(TransportError::Request(
            "connection reset".into(),
        )))
    }

    #[test]
    fn test_action_without_selection_is_usage_error() {
        // No backend configured either; the missing selection wins
        let mut state = state_with(2);
        assert!(state.begin_action(ActionKind::Summarize).is_none());
        assert!(state.status.error.as_deref().unwrap().starts_with("Usage: "));
        assert_eq!(*state.selection.state(), ActionState::Idle);
    }

    #[test]
    fn test_action_without_backend() {
        let mut state = state_with(2);
        state.select_highlighted();
        assert!(state.begin_action(ActionKind::Reply).is_none());
        assert!(state.status.error.as_deref().unwrap().contains("not configured"));
        assert_eq!(*state.selection.state(), ActionState::Idle);

        state.ai_enabled = true;
        state.clear_error();
        let ticket = state.begin_action(ActionKind::Reply).unwrap();
        assert_eq!(ticket.email.subject(), "s0");
        assert!(state.selection.is_busy());
        assert!(state.status.error.is_none());
    }

    #[test]
    fn test_stale_ai_failure_sets_no_error() {
        let mut state = state_with(2);
        state.ai_enabled = true;
        state.select_highlighted();
        let first = state.begin_action(ActionKind::Summarize).unwrap();
        let second = state.begin_action(ActionKind::Draft).unwrap();

        let applied = state.apply_ai_event(AiEvent::Finished {
            ticket: first,
            result: transport_failure(),
        });
        assert!(!applied);
        assert!(state.status.error.is_none());
        assert!(state.selection.is_busy());

        assert!(state.apply_ai_event(AiEvent::Finished {
            ticket: second,
            result: transport_failure(),
        }));
        assert!(state.status.error.as_deref().unwrap().starts_with("Transport: "));
    }

    #[test]
    fn test_stale_ai_result_after_switching_email() {
        let mut state = state_with(2);
        state.ai_enabled = true;
        state.select_highlighted();
        let ticket = state.begin_action(ActionKind::Summarize).unwrap();
        state.move_down();
        state.select_highlighted();

        assert!(!state.apply_ai_event(AiEvent::Finished {
            ticket,
            result: Ok(Response {
                text: "summary of s0".into(),
            }),
        }));
        assert_eq!(*state.selection.state(), ActionState::Idle);
    }

    #[test]
    fn test_rejected_fetch_signs_out() {
        let mut state = state_with(1);
        state.signed_in = true;
        state.status.fetching = true;

        state.apply_fetch(Err(AssistantError::from(FetchError::Auth("401".into()))));
        assert!(!state.signed_in);
        assert!(!state.status.fetching);
        assert_eq!(state.status.message, "Fetch failed");
        assert!(state.status.error.as_deref().unwrap().starts_with("Auth: "));
        assert_eq!(state.entries.len(), 1);
    }

    #[test]
    fn test_successful_fetch_reports_degraded_entries() {
        let mut state = AppState::default();
        state.status.fetching = true;
        let mut batch = vec![entry("a", "one"), entry("b", "two")];
        batch[1].issue = Some(EntryIssue::Retrieval("HTTP 500".into()));

        state.apply_fetch(Ok(batch));
        assert!(state.signed_in);
        assert!(!state.status.fetching);
        assert_eq!(state.status.message, "2 messages, 1 could not be loaded");

        state.apply_fetch(Ok(Vec::new()));
        assert_eq!(state.status.message, "Inbox is empty");
    }
}
