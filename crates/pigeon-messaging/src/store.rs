use anyhow::Result;
use chrono::DateTime;
use tracing::warn;

use pigeon_db::Database;
use pigeon_db::models::{FriendshipRow, MessageRow, parse_timestamp};
use pigeon_types::models::{Friendship, Message};

use crate::collaborators::{FriendshipRegistry, MessageStore, UserDirectory};

impl UserDirectory for Database {
    fn exists(&self, username: &str) -> Result<bool> {
        self.user_exists(username)
    }
}

impl FriendshipRegistry for Database {
    fn status(&self, a: &str, b: &str) -> Result<Option<Friendship>> {
        Ok(self.get_friendship(a, b)?.map(friendship_from_row))
    }
}

impl MessageStore for Database {
    fn insert(&self, sender: &str, recipient: &str, subject: &str, body: &str) -> Result<i64> {
        self.insert_message(sender, recipient, subject, body)
    }

    fn get(&self, id: i64) -> Result<Option<Message>> {
        Ok(self.get_message(id)?.map(message_from_row))
    }

    fn sent_by(&self, sender: &str) -> Result<Vec<Message>> {
        Ok(self.get_sent_messages(sender)?.into_iter().map(message_from_row).collect())
    }

    fn received_by(&self, recipient: &str) -> Result<Vec<Message>> {
        Ok(self.get_received_messages(recipient)?.into_iter().map(message_from_row).collect())
    }

    fn search_received(&self, recipient: &str, term: &str) -> Result<Vec<Message>> {
        Ok(self
            .search_received_messages(recipient, term)?
            .into_iter()
            .map(message_from_row)
            .collect())
    }

    fn mark_read(&self, id: i64, recipient: &str) -> Result<usize> {
        self.mark_message_read(id, recipient)
    }

    fn mark_deleted_for_sender(&self, id: i64, sender: &str) -> Result<usize> {
        Database::mark_deleted_for_sender(self, id, sender)
    }

    fn mark_deleted_for_recipient(&self, id: i64, recipient: &str) -> Result<usize> {
        Database::mark_deleted_for_recipient(self, id, recipient)
    }
}

fn message_from_row(row: MessageRow) -> Message {
    let sent_at = parse_timestamp(&row.date_sent).unwrap_or_else(|e| {
        warn!("Corrupt date_sent on message {}: {}", row.id, e);
        DateTime::default()
    });

    Message {
        id: row.id,
        sender: row.sender,
        recipient: row.recipient,
        subject: row.subject,
        body: row.body,
        read: row.read_status,
        deleted_for_sender: row.deleted_for_sender,
        deleted_for_recipient: row.deleted_for_recipient,
        sent_at,
    }
}

fn friendship_from_row(row: FriendshipRow) -> Friendship {
    let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|e| {
        warn!("Corrupt created_at on friendship {}/{}: {}", row.user_a, row.user_b, e);
        DateTime::default()
    });

    Friendship {
        user_a: row.user_a,
        user_b: row.user_b,
        created_at,
    }
}
