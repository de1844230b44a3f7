use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An established friendship between two users. The pair is unordered:
/// `user_a` is always the lexicographically smaller username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub user_a: String,
    pub user_b: String,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// Order two usernames the way friendships are keyed.
    pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// A direct message between two friends.
///
/// The deletion flags are soft: each hides the message from one party only and
/// the row itself is never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub deleted_for_sender: bool,
    pub deleted_for_recipient: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Whether `username` can still see this message in their own listings.
    pub fn is_visible_to(&self, username: &str) -> bool {
        (self.sender == username && !self.deleted_for_sender)
            || (self.recipient == username && !self.deleted_for_recipient)
    }
}
