use std::future::Future;

use super::types::{MessageId, RawMessage};
use crate::error::MailboxError;
use crate::session::Session;

/// Read access to one authenticated mailbox.
///
/// Implementations must be shareable across tasks: the fetcher resolves
/// messages concurrently from one instance.
pub trait MailboxApi: Send + Sync + 'static {
    /// Identifiers of the newest inbox messages, newest first, at most `limit`.
    fn list_messages(
        &self,
        session: &Session,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<MessageId>, MailboxError>> + Send;

    /// Headers and MIME structure of one message.
    fn get_message(
        &self,
        session: &Session,
        id: &MessageId,
    ) -> impl Future<Output = Result<RawMessage, MailboxError>> + Send;
}
