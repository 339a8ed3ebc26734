pub mod fetcher;
pub mod gmail;
pub mod mailbox;
pub mod parser;
pub mod types;

pub use fetcher::InboxFetcher;
pub use gmail::GmailClient;
pub use types::{Email, EntryIssue, InboxEntry};
