use std::sync::Arc;

use tracing::{debug, error, warn};

use pigeon_db::Database;
use pigeon_types::models::Message;

use crate::collaborators::{FriendshipRegistry, MessageStore, UserDirectory};
use crate::error::SendError;

/// Storage faults never escape this type: they are logged and turned into the
/// safe default for the operation (empty list, `None`, `false`, or
/// [`SendError::SendFailed`]).
#[derive(Clone)]
pub struct MessagingService {
    store: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
    friendships: Arc<dyn FriendshipRegistry>,
}

impl MessagingService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        friendships: Arc<dyn FriendshipRegistry>,
    ) -> Self {
        Self { store, users, friendships }
    }

    /// Service backed by a single database for all three collaborators.
    pub fn from_database(db: Arc<Database>) -> Self {
        Self::new(db.clone(), db.clone(), db)
    }

    /// Send a message from `sender` to `recipient`.
    ///
    /// Checks run in order: both users must exist, then they must be friends.
    /// On success returns the new message id, which is always positive.
    pub fn send(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<i64, SendError> {
        if !self.both_exist(sender, recipient)? {
            warn!(sender, recipient, "Send rejected: unknown user");
            return Err(SendError::UsersNotFound);
        }

        let friendship = self.friendships.status(sender, recipient).map_err(|e| {
            error!("Friendship lookup failed for {}/{}: {:#}", sender, recipient, e);
            SendError::SendFailed
        })?;
        if friendship.is_none() {
            warn!(sender, recipient, "Send rejected: not friends");
            return Err(SendError::NoFriendship);
        }

        match self.store.insert(sender, recipient, subject, body) {
            Ok(id) if id > 0 => {
                debug!(id, sender, recipient, "Message stored");
                Ok(id)
            }
            Ok(id) => {
                error!("Store returned invalid message id {}", id);
                Err(SendError::SendFailed)
            }
            Err(e) => {
                error!("Failed to store message from {} to {}: {:#}", sender, recipient, e);
                Err(SendError::SendFailed)
            }
        }
    }

    /// Messages `sender` has sent and not deleted.
    pub fn list_sent(&self, sender: &str) -> Vec<Message> {
        self.store.sent_by(sender).unwrap_or_else(|e| {
            error!("Failed to list sent messages for {}: {:#}", sender, e);
            Vec::new()
        })
    }

    /// Messages `recipient` has received and not deleted.
    pub fn list_received(&self, recipient: &str) -> Vec<Message> {
        self.store.received_by(recipient).unwrap_or_else(|e| {
            error!("Failed to list received messages for {}: {:#}", recipient, e);
            Vec::new()
        })
    }

    /// Received messages whose subject or body contains `term`, newest first.
    /// Unknown users get an empty result.
    pub fn search(&self, username: &str, term: &str) -> Vec<Message> {
        match self.users.exists(username) {
            Ok(true) => {}
            Ok(false) => return Vec::new(),
            Err(e) => {
                error!("User lookup failed for {}: {:#}", username, e);
                return Vec::new();
            }
        }

        self.store.search_received(username, term).unwrap_or_else(|e| {
            error!("Failed to search messages for {}: {:#}", username, e);
            Vec::new()
        })
    }

    /// Raw lookup by id. No ownership or deletion filtering is applied.
    pub fn get_by_id(&self, id: i64) -> Option<Message> {
        self.store.get(id).unwrap_or_else(|e| {
            error!("Failed to fetch message {}: {:#}", id, e);
            None
        })
    }

    pub fn mark_as_read(&self, id: i64, recipient: &str) -> bool {
        let updated = self.store.mark_read(id, recipient);
        self.single_row("mark_as_read", id, updated)
    }

    pub fn delete_for_sender(&self, id: i64, sender: &str) -> bool {
        let updated = self.store.mark_deleted_for_sender(id, sender);
        self.single_row("delete_for_sender", id, updated)
    }

    pub fn delete_for_recipient(&self, id: i64, recipient: &str) -> bool {
        let updated = self.store.mark_deleted_for_recipient(id, recipient);
        self.single_row("delete_for_recipient", id, updated)
    }

    fn both_exist(&self, sender: &str, recipient: &str) -> Result<bool, SendError> {
        let exists = |username: &str| {
            self.users.exists(username).map_err(|e| {
                error!("User lookup failed for {}: {:#}", username, e);
                SendError::SendFailed
            })
        };
        Ok(exists(sender)? && exists(recipient)?)
    }

    fn single_row(&self, op: &str, id: i64, updated: anyhow::Result<usize>) -> bool {
        match updated {
            Ok(1) => {
                debug!(op, id, "Message updated");
                true
            }
            Ok(_) => false,
            Err(e) => {
                error!("{} failed for message {}: {:#}", op, id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use chrono::Utc;
    use pigeon_types::models::Friendship;
    use std::sync::Mutex;

    struct Users(&'static [&'static str]);

    impl UserDirectory for Users {
        fn exists(&self, username: &str) -> Result<bool> {
            Ok(self.0.iter().any(|u| *u == username))
        }
    }

    struct Friends(bool);

    impl FriendshipRegistry for Friends {
        fn status(&self, a: &str, b: &str) -> Result<Option<Friendship>> {
            let (a, b) = Friendship::canonical_pair(a, b);
            Ok(self.0.then(|| Friendship {
                user_a: a.to_string(),
                user_b: b.to_string(),
                created_at: Utc::now(),
            }))
        }
    }

    struct Broken;

    impl UserDirectory for Broken {
        fn exists(&self, _: &str) -> Result<bool> {
            Err(anyhow!("connection refused"))
        }
    }

    impl FriendshipRegistry for Broken {
        fn status(&self, _: &str, _: &str) -> Result<Option<Friendship>> {
            Err(anyhow!("connection refused"))
        }
    }

    impl MessageStore for Broken {
        fn insert(&self, _: &str, _: &str, _: &str, _: &str) -> Result<i64> {
            Err(anyhow!("disk full"))
        }
        fn get(&self, _: i64) -> Result<Option<Message>> {
            Err(anyhow!("connection refused"))
        }
        fn sent_by(&self, _: &str) -> Result<Vec<Message>> {
            Err(anyhow!("connection refused"))
        }
        fn received_by(&self, _: &str) -> Result<Vec<Message>> {
            Err(anyhow!("connection refused"))
        }
        fn search_received(&self, _: &str, _: &str) -> Result<Vec<Message>> {
            Err(anyhow!("connection refused"))
        }
        fn mark_read(&self, _: i64, _: &str) -> Result<usize> {
            Err(anyhow!("connection refused"))
        }
        fn mark_deleted_for_sender(&self, _: i64, _: &str) -> Result<usize> {
            Err(anyhow!("connection refused"))
        }
        fn mark_deleted_for_recipient(&self, _: i64, _: &str) -> Result<usize> {
            Err(anyhow!("connection refused"))
        }
    }

    /// Records inserts so tests can assert nothing was written.
    #[derive(Default)]
    struct Recording {
        inserted: Mutex<Vec<(String, String)>>,
    }

    impl MessageStore for Recording {
        fn insert(&self, sender: &str, recipient: &str, _: &str, _: &str) -> Result<i64> {
            let mut inserted = self.inserted.lock().unwrap();
            inserted.push((sender.to_string(), recipient.to_string()));
            Ok(inserted.len() as i64)
        }
        fn get(&self, _: i64) -> Result<Option<Message>> {
            Ok(None)
        }
        fn sent_by(&self, _: &str) -> Result<Vec<Message>> {
            Ok(vec![])
        }
        fn received_by(&self, _: &str) -> Result<Vec<Message>> {
            Ok(vec![])
        }
        fn search_received(&self, _: &str, _: &str) -> Result<Vec<Message>> {
            Ok(vec![])
        }
        fn mark_read(&self, _: i64, _: &str) -> Result<usize> {
            Ok(0)
        }
        fn mark_deleted_for_sender(&self, _: i64, _: &str) -> Result<usize> {
            Ok(0)
        }
        fn mark_deleted_for_recipient(&self, _: i64, _: &str) -> Result<usize> {
            Ok(0)
        }
    }

    fn service(store: Arc<Recording>, users: &'static [&'static str], friends: bool) -> MessagingService {
        MessagingService::new(store, Arc::new(Users(users)), Arc::new(Friends(friends)))
    }

    #[test]
    fn unknown_user_checked_before_friendship() {
        let store = Arc::new(Recording::default());
        let svc = service(store.clone(), &["charles"], false);

        assert_eq!(svc.send("charles", "james", "s", "b"), Err(SendError::UsersNotFound));
        assert_eq!(svc.send("james", "charles", "s", "b"), Err(SendError::UsersNotFound));
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[test]
    fn strangers_cannot_message() {
        let store = Arc::new(Recording::default());
        let svc = service(store.clone(), &["charles", "michelle"], false);

        assert_eq!(svc.send("charles", "michelle", "s", "b"), Err(SendError::NoFriendship));
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[test]
    fn friends_can_message() {
        let store = Arc::new(Recording::default());
        let svc = service(store.clone(), &["charles", "rick"], true);

        assert_eq!(svc.send("charles", "rick", "Hi", "Test"), Ok(1));
        assert_eq!(
            store.inserted.lock().unwrap().as_slice(),
            &[("charles".to_string(), "rick".to_string())]
        );
    }

    #[test]
    fn search_for_unknown_user_skips_store() {
        let svc = MessagingService::new(Arc::new(Broken), Arc::new(Users(&[])), Arc::new(Friends(true)));
        assert!(svc.search("james", "anything").is_empty());
    }

    #[test]
    fn storage_faults_become_safe_defaults() {
        let broken = Arc::new(Broken);
        let svc = MessagingService::new(broken, Arc::new(Users(&["charles", "rick"])), Arc::new(Friends(true)));

        assert_eq!(svc.send("charles", "rick", "s", "b"), Err(SendError::SendFailed));
        assert!(svc.list_sent("charles").is_empty());
        assert!(svc.list_received("rick").is_empty());
        assert!(svc.search("rick", "s").is_empty());
        assert!(svc.get_by_id(1).is_none());
        assert!(!svc.mark_as_read(1, "rick"));
        assert!(!svc.delete_for_sender(1, "charles"));
        assert!(!svc.delete_for_recipient(1, "rick"));
    }

    #[test]
    fn lookup_faults_fail_the_send() {
        let store = Arc::new(Recording::default());

        let svc = MessagingService::new(store.clone(), Arc::new(Broken), Arc::new(Friends(true)));
        assert_eq!(svc.send("charles", "rick", "s", "b"), Err(SendError::SendFailed));

        let svc = MessagingService::new(store.clone(), Arc::new(Users(&["charles", "rick"])), Arc::new(Broken));
        assert_eq!(svc.send("charles", "rick", "s", "b"), Err(SendError::SendFailed));

        assert!(store.inserted.lock().unwrap().is_empty());
    }
}
