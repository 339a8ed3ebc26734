//! Inbox fetch cycle: list the newest ids, resolve every message concurrently,
//! normalize, and return the batch in mailbox order.

use std::sync::Arc;
use tokio::task::JoinSet;

use super::mailbox::MailboxApi;
use super::parser::normalize;
use super::types::{Email, EntryIssue, InboxEntry, MessageId};
use crate::constants::MAX_FETCH_LIMIT;
use crate::error::FetchError;
use crate::session::Session;

/// Outcome of one per-message task, tagged with its slot in the id list
struct MessageResult {
    index: usize,
    email: Email,
    issue: Option<EntryIssue>,
}

pub struct InboxFetcher<M> {
    api: Arc<M>,
}

impl<M: MailboxApi> InboxFetcher<M> {
    pub fn new(api: Arc<M>) -> Self {
        Self { api }
    }

    /// Fetch up to `limit` of the newest messages.
    ///
    /// Fails only when the id listing fails. A message that cannot be
    /// retrieved becomes a placeholder entry flagged with
    /// [`EntryIssue::Retrieval`]; the rest of the batch is unaffected.
    pub async fn fetch(
        &self,
        session: &Session,
        limit: usize,
    ) -> Result<Vec<InboxEntry>, FetchError> {
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);

        let mut ids = self
            .api
            .list_messages(session, limit)
            .await
            .map_err(|e| {
                tracing::warn!("Listing messages failed: {}", e);
                if e.is_unauthorized() {
                    FetchError::Auth(e.to_string())
                } else {
                    FetchError::Retrieval(e)
                }
            })?;
        ids.truncate(limit);

        if ids.is_empty() {
            tracing::info!("Inbox is empty");
            return Ok(Vec::new());
        }

        let mut join_set = JoinSet::new();
        for (index, id) in ids.iter().cloned().enumerate() {
            let api = Arc::clone(&self.api);
            let session = session.clone();
            join_set.spawn(async move {
                let (email, issue) = match api.get_message(&session, &id).await {
                    Ok(raw) => normalize(&raw),
                    Err(e) => {
                        tracing::warn!("Message {} could not be retrieved: {}", id, e);
                        (Email::placeholder(), Some(EntryIssue::Retrieval(e.to_string())))
                    }
                };
                MessageResult {
                    index,
                    email,
                    issue,
                }
            });
        }

        // Completion order is arbitrary; slots restore the listing order
        let mut slots: Vec<Option<MessageResult>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    let index = result.index;
                    slots[index] = Some(result);
                }
                Err(e) => tracing::error!("Message task failed: {}", e),
            }
        }

        let entries: Vec<InboxEntry> = ids
            .into_iter()
            .zip(slots)
            .map(|(id, slot)| assemble(id, slot))
            .collect();

        let degraded = entries.iter().filter(|e| e.is_degraded()).count();
        tracing::info!(
            "Fetched {} messages ({} degraded)",
            entries.len(),
            degraded
        );
        Ok(entries)
    }
}

fn assemble(id: MessageId, slot: Option<MessageResult>) -> InboxEntry {
    match slot {
        Some(result) => InboxEntry {
            id,
            email: result.email,
            issue: result.issue,
        },
        // The task panicked or was cancelled
        None => InboxEntry {
            id,
            email: Email::placeholder(),
            issue: Some(EntryIssue::Retrieval("message task did not complete".to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailboxError;
    use crate::mail::types::{Header, MessagePart, PartBody, RawMessage};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory mailbox. Each message can carry a delay so later ids finish first.
    #[derive(Default)]
    struct FakeMailbox {
        ids: Vec<&'static str>,
        messages: HashMap<&'static str, (u64, Result<RawMessage, MailboxError>)>,
        list_error: Option<MailboxError>,
        gets: AtomicUsize,
        limits_seen: std::sync::Mutex<Vec<usize>>,
    }

    impl FakeMailbox {
        fn with_message(mut self, id: &'static str, delay_ms: u64, subject: &str) -> Self {
            self.ids.push(id);
            self.messages.insert(id, (delay_ms, Ok(message(subject, subject))));
            self
        }

        fn with_failure(mut self, id: &'static str, error: MailboxError) -> Self {
            self.ids.push(id);
            self.messages.insert(id, (0, Err(error)));
            self
        }
    }

    impl MailboxApi for FakeMailbox {
        async fn list_messages(
            &self,
            _session: &Session,
            limit: usize,
        ) -> Result<Vec<MessageId>, MailboxError> {
            self.limits_seen.lock().unwrap().push(limit);
            if let Some(ref e) = self.list_error {
                return Err(e.clone());
            }
            Ok(self.ids.iter().map(|id| MessageId::new(*id)).collect())
        }

        async fn get_message(
            &self,
            _session: &Session,
            id: &MessageId,
        ) -> Result<RawMessage, MailboxError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            let (delay, result) = self
                .messages
                .get(id.as_str())
                .cloned()
                .unwrap_or((0, Err(MailboxError::Status { status: 404, body: String::new() })));
            tokio::time::sleep(Duration::from_millis(delay)).await;
            result
        }
    }

    fn message(subject: &str, body: &str) -> RawMessage {
        RawMessage {
            id: None,
            payload: Some(MessagePart {
                mime_type: Some("text/plain".to_string()),
                headers: vec![
                    Header {
                        name: "From".to_string(),
                        value: "sender@example.com".to_string(),
                    },
                    Header {
                        name: "Subject".to_string(),
                        value: subject.to_string(),
                    },
                ],
                parts: None,
                body: Some(PartBody {
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                }),
            }),
        }
    }

    fn subjects(entries: &[InboxEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.email.subject()).collect()
    }

    fn session() -> Session {
        Session::new("token")
    }

    #[tokio::test]
    async fn test_order_follows_listing_not_completion() {
        // Newest message is the slowest to resolve
        let mailbox = FakeMailbox::default()
            .with_message("m5", 60, "fifth")
            .with_message("m4", 5, "fourth")
            .with_message("m3", 40, "third")
            .with_message("m2", 0, "second")
            .with_message("m1", 20, "first");

        let fetcher = InboxFetcher::new(Arc::new(mailbox));
        let entries = fetcher.fetch(&session(), 5).await.unwrap();

        assert_eq!(
            subjects(&entries),
            vec!["fifth", "fourth", "third", "second", "first"]
        );
        assert_eq!(entries[0].id, MessageId::new("m5"));
        assert_eq!(entries[0].email.body(), "fifth");
        assert!(entries.iter().all(|e| !e.is_degraded()));
    }

    #[tokio::test]
    async fn test_batch_sizes_up_to_limit() {
        for n in 0..=5usize {
            let mut mailbox = FakeMailbox::default();
            let names = ["a", "b", "c", "d", "e"];
            for (i, name) in names.iter().take(n).enumerate() {
                mailbox = mailbox.with_message(name, ((n - i) * 3) as u64, name);
            }

            let entries = InboxFetcher::new(Arc::new(mailbox))
                .fetch(&session(), 5)
                .await
                .unwrap();
            assert_eq!(entries.len(), n);
            assert_eq!(subjects(&entries), names[..n].to_vec());
        }
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_a_failure() {
        let mailbox = Arc::new(FakeMailbox::default());
        let entries = InboxFetcher::new(Arc::clone(&mailbox))
            .fetch(&session(), 5)
            .await
            .unwrap();
        assert!(entries.is_empty());
        assert_eq!(mailbox.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extra_ids_beyond_limit_are_dropped() {
        let mailbox = FakeMailbox::default()
            .with_message("a", 0, "a")
            .with_message("b", 0, "b")
            .with_message("c", 0, "c");
        let mailbox = Arc::new(mailbox);

        let entries = InboxFetcher::new(Arc::clone(&mailbox))
            .fetch(&session(), 2)
            .await
            .unwrap();
        assert_eq!(subjects(&entries), vec!["a", "b"]);
        assert_eq!(mailbox.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let mailbox = Arc::new(FakeMailbox::default());
        let fetcher = InboxFetcher::new(Arc::clone(&mailbox));
        fetcher.fetch(&session(), 0).await.unwrap();
        fetcher.fetch(&session(), 10_000).await.unwrap();
        assert_eq!(*mailbox.limits_seen.lock().unwrap(), vec![1, 50]);
    }

    #[tokio::test]
    async fn test_failed_message_degrades_to_flagged_placeholder() {
        let mailbox = FakeMailbox::default()
            .with_message("a", 10, "kept")
            .with_failure(
                "b",
                MailboxError::Status {
                    status: 500,
                    body: "backend".into(),
                },
            )
            .with_message("c", 0, "also kept");

        let entries = InboxFetcher::new(Arc::new(mailbox))
            .fetch(&session(), 5)
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(subjects(&entries), vec!["kept", "No Subject", "also kept"]);
        assert_eq!(entries[1].email, Email::placeholder());
        assert!(matches!(entries[1].issue, Some(EntryIssue::Retrieval(_))));
        assert!(!entries[0].is_degraded());
        assert!(!entries[2].is_degraded());
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_fetch() {
        let mailbox = FakeMailbox {
            list_error: Some(MailboxError::Request("connection reset".into())),
            ..Default::default()
        };

        let err = InboxFetcher::new(Arc::new(mailbox))
            .fetch(&session(), 5)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Retrieval(MailboxError::Request("connection reset".into()))
        );
    }

    #[tokio::test]
    async fn test_rejected_session_is_auth_failure() {
        let mailbox = FakeMailbox {
            list_error: Some(MailboxError::Unauthorized {
                status: 401,
                body: "expired".into(),
            }),
            ..Default::default()
        };

        let err = InboxFetcher::new(Arc::new(mailbox))
            .fetch(&session(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Auth(_)));
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        use crate::mail::GmailClient;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "new"}, {"id": "old"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(50))
                    .set_body_json(serde_json::json!({
                        "id": "new",
                        "payload": {
                            "mimeType": "multipart/alternative",
                            "headers": [
                                {"name": "From", "value": "Ana <ana@example.com>"},
                                {"name": "Subject", "value": "Dinner?"}
                            ],
                            "parts": [
                                {"mimeType": "text/plain", "body": {"data": URL_SAFE_NO_PAD.encode("Free tonight?")}},
                                {"mimeType": "text/html", "body": {"data": URL_SAFE_NO_PAD.encode("<p>Free tonight?</p>")}}
                            ]
                        }
                    })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "old",
                "payload": {"mimeType": "text/plain", "headers": [], "body": {"size": 0}}
            })))
            .mount(&server)
            .await;

        let client = GmailClient::new(&server.uri()).unwrap();
        let entries = InboxFetcher::new(Arc::new(client))
            .fetch(&session(), 5)
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].email.from(), "Ana <ana@example.com>");
        assert_eq!(entries[0].email.subject(), "Dinner?");
        assert_eq!(entries[0].email.body(), "Free tonight?");
        assert_eq!(entries[1].email, Email::placeholder());
        assert!(entries[1].issue.is_none());
    }
}
