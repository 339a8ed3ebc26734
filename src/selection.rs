//! The selected email and the state of the AI action running against it
//!
//! Selection and response live in one value so they can only change together:
//! a response is only ever stored for the selection that requested it.
//!
//! Every `select` and every `begin` bumps a generation counter. A [`Ticket`]
//! remembers the generation it was issued under, and `resolve` drops results
//! whose ticket is no longer current. A second `begin` while a request is
//! outstanding therefore replaces it; the first result is ignored on arrival.

use crate::ai::{ActionKind, Response};
use crate::error::DispatchError;
use crate::mail::Email;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActionState {
    #[default]
    Idle,
    Requesting(ActionKind),
    Completed(Response),
    Failed(DispatchError),
}

/// Proof of an issued request. Carries a snapshot of the email it was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    pub email: Email,
    pub action: ActionKind,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selected {
    index: usize,
    email: Email,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    current: Option<Selected>,
    generation: u64,
    state: ActionState,
}

impl Selection {
    /// Select the email at `index`. Any outstanding request becomes stale.
    pub fn select(&mut self, index: usize, email: Email) {
        self.generation += 1;
        self.current = Some(Selected { index, email });
        self.state = ActionState::Idle;
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.current = None;
        self.state = ActionState::Idle;
    }

    pub fn index(&self) -> Option<usize> {
        self.current.as_ref().map(|s| s.index)
    }

    pub fn email(&self) -> Option<&Email> {
        self.current.as_ref().map(|s| &s.email)
    }

    pub fn state(&self) -> &ActionState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ActionState::Requesting(_))
    }

    #[cfg(test)]
    pub fn response(&self) -> Option<&Response> {
        match self.state {
            ActionState::Completed(ref response) => Some(response),
            _ => None,
        }
    }

    /// Move to `Requesting` and issue a ticket for `action`.
    ///
    /// Fails with [`DispatchError::Usage`] when nothing is selected, leaving
    /// the state untouched.
    pub fn begin(&mut self, action: ActionKind) -> Result<Ticket, DispatchError> {
        let Some(email) = self.email().cloned() else {
            return Err(DispatchError::Usage);
        };

        if self.is_busy() {
            tracing::debug!("Superseding outstanding request (generation {})", self.generation);
        }

        self.generation += 1;
        let ticket = Ticket {
            generation: self.generation,
            email,
            action: action.clone(),
        };
        self.state = ActionState::Requesting(action);
        Ok(ticket)
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && self.is_busy()
    }

    /// Store the outcome of `ticket`. Returns false, changing nothing, when
    /// the ticket has been superseded by a newer selection or action.
    pub fn resolve(
        &mut self,
        ticket: &Ticket,
        result: Result<Response, DispatchError>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Dropping stale {} result (generation {}, current {})",
                ticket.action,
                ticket.generation,
                self.generation
            );
            return false;
        }

        self.state = match result {
            Ok(response) => ActionState::Completed(response),
            Err(e) => ActionState::Failed(e),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::{ChatRequest, CompletionBackend};
    use crate::ai::{Dispatcher, Tone};
    use crate::error::TransportError;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn email(body: &str) -> Email {
        Email::from_parts(Some("x@example.com".into()), Some(body.into()), Some(body.into()))
    }

    fn text(t: &str) -> Result<Response, DispatchError> {
        Ok(Response {
            text: t.to_string(),
        })
    }

    #[test]
    fn test_idle_until_action() {
        let mut selection = Selection::default();
        assert_eq!(selection.state(), &ActionState::Idle);
        assert!(selection.email().is_none());

        selection.select(2, email("a"));
        assert_eq!(selection.index(), Some(2));
        assert_eq!(selection.state(), &ActionState::Idle);
    }

    #[test]
    fn test_begin_without_selection_is_usage_error() {
        let mut selection = Selection::default();
        assert_eq!(
            selection.begin(ActionKind::Summarize),
            Err(DispatchError::Usage)
        );
        assert_eq!(selection.state(), &ActionState::Idle);
    }

    #[test]
    fn test_request_lifecycle() {
        let mut selection = Selection::default();
        selection.select(0, email("a"));

        let ticket = selection.begin(ActionKind::Summarize).unwrap();
        assert!(selection.is_busy());
        assert_eq!(ticket.email, email("a"));

        assert!(selection.resolve(&ticket, text("summary of a")));
        assert!(!selection.is_busy());
        assert_eq!(selection.response().unwrap().text, "summary of a");

        // A resolved ticket cannot resolve twice
        assert!(!selection.resolve(&ticket, text("again")));
    }

    #[test]
    fn test_failure_is_recorded() {
        let mut selection = Selection::default();
        selection.select(0, email("a"));
        let ticket = selection.begin(ActionKind::Reply).unwrap();

        let failure = DispatchError::Transport(TransportError::Request("timeout".into()));
        assert!(selection.resolve(&ticket, Err(failure.clone())));
        assert_eq!(selection.state(), &ActionState::Failed(failure));
    }

    #[test]
    fn test_second_action_supersedes_first() {
        let mut selection = Selection::default();
        selection.select(0, email("a"));

        let first = selection.begin(ActionKind::Summarize).unwrap();
        let second = selection.begin(ActionKind::Reply).unwrap();
        assert_eq!(selection.state(), &ActionState::Requesting(ActionKind::Reply));

        assert!(!selection.resolve(&first, text("late summary")));
        assert!(selection.is_busy());
        assert!(selection.resolve(&second, text("reply")));
        assert_eq!(selection.response().unwrap().text, "reply");

        // First arriving after second changes nothing
        assert!(!selection.resolve(&first, text("late summary")));
        assert_eq!(selection.response().unwrap().text, "reply");
    }

    #[test]
    fn test_switching_selection_drops_stale_result() {
        let mut selection = Selection::default();
        selection.select(0, email("a"));
        let for_a = selection.begin(ActionKind::Summarize).unwrap();

        selection.select(1, email("b"));
        assert!(!selection.resolve(&for_a, text("summary of a")));
        assert_eq!(selection.state(), &ActionState::Idle);
        assert!(selection.response().is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut selection = Selection::default();
        selection.select(0, email("a"));
        let ticket = selection.begin(ActionKind::Draft).unwrap();
        selection.clear();

        assert!(selection.email().is_none());
        assert!(!selection.resolve(&ticket, text("draft")));
        assert_eq!(selection.begin(ActionKind::Draft), Err(DispatchError::Usage));
    }

    /// Slow for instructions mentioning "slow", fast otherwise.
    struct SkewedBackend;

    impl CompletionBackend for SkewedBackend {
        async fn complete(
            &self,
            request: &ChatRequest,
        ) -> Result<serde_json::Value, TransportError> {
            let content = request.messages[0].content.clone();
            let delay = if content.contains("slow") { 80 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(serde_json::json!({
                "choices": [{"message": {"content": format!("re: {}", content)}}]
            }))
        }
    }

    #[tokio::test]
    async fn test_stale_dispatch_resolving_last_does_not_overwrite() {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(SkewedBackend), "m".into(), 10));
        let (tx, mut rx) = mpsc::channel(4);
        let mut selection = Selection::default();

        // A is dispatched, then B is selected and dispatched before A resolves
        selection.select(0, email("slow a"));
        let ticket_a = selection.begin(ActionKind::Summarize).unwrap();
        selection.select(1, email("fast b"));
        let ticket_b = selection
            .begin(ActionKind::AdjustTone(Tone::Friendly))
            .unwrap();

        for ticket in [ticket_a, ticket_b] {
            let dispatcher = Arc::clone(&dispatcher);
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = dispatcher.dispatch(Some(&ticket.email), &ticket.action).await;
                let _ = tx.send((ticket, result)).await;
            });
        }
        drop(tx);

        let mut applied = Vec::new();
        while let Some((ticket, result)) = rx.recv().await {
            applied.push(selection.resolve(&ticket, result));
        }

        // B lands first and is applied; A lands later and is dropped
        assert_eq!(applied, vec![true, false]);
        assert_eq!(selection.index(), Some(1));
        assert_eq!(
            selection.response().unwrap().text,
            "re: Rewrite this email in a more Friendly tone: \"fast b\""
        );
    }

    #[tokio::test]
    async fn test_stale_dispatch_with_no_new_action_leaves_nothing() {
        let dispatcher = Dispatcher::new(Arc::new(SkewedBackend), "m".into(), 10);
        let mut selection = Selection::default();

        selection.select(0, email("slow a"));
        let ticket = selection.begin(ActionKind::Summarize).unwrap();
        selection.select(1, email("b"));

        let result = dispatcher.dispatch(Some(&ticket.email), &ticket.action).await;
        assert!(!selection.resolve(&ticket, result));
        assert!(selection.response().is_none());
        assert_eq!(selection.state(), &ActionState::Idle);
    }
}
