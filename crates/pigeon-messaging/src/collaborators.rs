use anyhow::Result;
use pigeon_types::models::{Friendship, Message};

/// Answers whether a username belongs to a registered user.
pub trait UserDirectory: Send + Sync {
    fn exists(&self, username: &str) -> Result<bool>;
}

/// Looks up the friendship between two users. `None` means not friends.
pub trait FriendshipRegistry: Send + Sync {
    fn status(&self, a: &str, b: &str) -> Result<Option<Friendship>>;
}

/// Persistent message storage.
///
/// Mutations return the number of rows that matched both the id and the
/// username column they are scoped by.
pub trait MessageStore: Send + Sync {
    fn insert(&self, sender: &str, recipient: &str, subject: &str, body: &str) -> Result<i64>;

    fn get(&self, id: i64) -> Result<Option<Message>>;

    fn sent_by(&self, sender: &str) -> Result<Vec<Message>>;

    fn received_by(&self, recipient: &str) -> Result<Vec<Message>>;

    /// Received messages containing `term` in subject or body, newest first.
    fn search_received(&self, recipient: &str, term: &str) -> Result<Vec<Message>>;

    fn mark_read(&self, id: i64, recipient: &str) -> Result<usize>;

    fn mark_deleted_for_sender(&self, id: i64, sender: &str) -> Result<usize>;

    fn mark_deleted_for_recipient(&self, id: i64, recipient: &str) -> Result<usize>;
}
