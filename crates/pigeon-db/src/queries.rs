use crate::models::{FriendshipRow, MessageRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

const MESSAGE_COLUMNS: &str = "id, sender, recipient, subject, body, read_status, \
     deleted_for_sender, deleted_for_recipient, date_sent";

impl Database {
    // -- Users --

    /// Returns false if the username is already taken.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, first_name, last_name, email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(username) DO NOTHING",
                rusqlite::params![id, username, password_hash, first_name, last_name, email],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Friendships --

    /// Record a friendship between two usernames.
    /// Returns false if the pair were already friends.
    pub fn create_friendship(&self, a: &str, b: &str) -> Result<bool> {
        let (user_a, user_b) = canonical(a, b);
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO friendships (user_a, user_b) VALUES (?1, ?2)",
                (user_a, user_b),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_friendship(&self, a: &str, b: &str) -> Result<Option<FriendshipRow>> {
        let (user_a, user_b) = canonical(a, b);
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_a, user_b, created_at FROM friendships
                     WHERE user_a = ?1 AND user_b = ?2",
                    (user_a, user_b),
                    |row| {
                        Ok(FriendshipRow {
                            user_a: row.get(0)?,
                            user_b: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Usernames of everyone `username` is friends with, alphabetically.
    pub fn list_friends(&self, username: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END AS friend
                 FROM friendships
                 WHERE user_a = ?1 OR user_b = ?1
                 ORDER BY friend",
            )?;
            let friends = stmt
                .query_map([username], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(friends)
        })
    }

    // -- Messages --

    /// Insert a message stamped with the store's current time.
    /// Returns the id assigned by SQLite.
    pub fn insert_message(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender, recipient, subject, body) VALUES (?1, ?2, ?3, ?4)",
                (sender, recipient, subject, body),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                    [id],
                    map_message,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_sent_messages(&self, sender: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE sender = ?1 AND deleted_for_sender = 0
                     ORDER BY id"
                ),
                rusqlite::params![sender],
            )
        })
    }

    pub fn get_received_messages(&self, recipient: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE recipient = ?1 AND deleted_for_recipient = 0
                     ORDER BY id"
                ),
                rusqlite::params![recipient],
            )
        })
    }

    /// Received messages whose subject or body contains `term`, newest first.
    /// The term is matched literally; LIKE wildcards in it are escaped.
    /// Deletion flags are not consulted.
    pub fn search_received_messages(&self, recipient: &str, term: &str) -> Result<Vec<MessageRow>> {
        let pattern = format!("%{}%", escape_like(term));
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE recipient = ?1
                       AND (subject LIKE ?2 ESCAPE '\\' OR body LIKE ?2 ESCAPE '\\')
                     ORDER BY date_sent DESC, id DESC"
                ),
                rusqlite::params![recipient, pattern],
            )
        })
    }

    /// Returns the number of rows matched (0 or 1).
    pub fn mark_message_read(&self, id: i64, recipient: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE messages SET read_status = 1 WHERE id = ?1 AND recipient = ?2",
                rusqlite::params![id, recipient],
            )?;
            Ok(n)
        })
    }

    /// Returns the number of rows matched (0 or 1).
    pub fn mark_deleted_for_sender(&self, id: i64, sender: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE messages SET deleted_for_sender = 1 WHERE id = ?1 AND sender = ?2",
                rusqlite::params![id, sender],
            )?;
            Ok(n)
        })
    }

    /// Returns the number of rows matched (0 or 1).
    pub fn mark_deleted_for_recipient(&self, id: i64, recipient: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE messages SET deleted_for_recipient = 1 WHERE id = ?1 AND recipient = ?2",
                rusqlite::params![id, recipient],
            )?;
            Ok(n)
        })
    }
}

fn canonical<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, first_name, last_name, email, created_at
         FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
                email: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_messages(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        read_status: row.get(5)?,
        deleted_for_sender: row.get(6)?,
        deleted_for_recipient: row.get(7)?,
        date_sent: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users(names: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (i, name) in names.iter().enumerate() {
            db.create_user(&format!("id-{i}"), name, "hash", None, None, &format!("{name}@example.com"))
                .unwrap();
        }
        db
    }

    #[test]
    fn user_lookup() {
        let db = db_with_users(&["charles"]);
        assert!(db.user_exists("charles").unwrap());
        assert!(!db.user_exists("james").unwrap());

        let user = db.get_user_by_username("charles").unwrap().unwrap();
        assert_eq!(user.email, "charles@example.com");
        assert!(user.first_name.is_none());
    }

    #[test]
    fn duplicate_username_not_inserted() {
        let db = db_with_users(&["charles"]);
        let created = db.create_user("other", "charles", "hash2", None, None, "x@example.com").unwrap();
        assert!(!created);

        let user = db.get_user_by_username("charles").unwrap().unwrap();
        assert_eq!(user.id, "id-0");
        assert_eq!(user.password, "hash");
    }

    #[test]
    fn friendship_is_symmetric() {
        let db = db_with_users(&["rick", "charles", "steph"]);
        assert!(db.create_friendship("rick", "charles").unwrap());
        assert!(!db.create_friendship("charles", "rick").unwrap());

        let row = db.get_friendship("charles", "rick").unwrap().unwrap();
        assert_eq!((row.user_a.as_str(), row.user_b.as_str()), ("charles", "rick"));
        assert!(db.get_friendship("rick", "charles").unwrap().is_some());
        assert!(db.get_friendship("rick", "steph").unwrap().is_none());

        db.create_friendship("steph", "charles").unwrap();
        assert_eq!(db.list_friends("charles").unwrap(), vec!["rick", "steph"]);
        assert_eq!(db.list_friends("rick").unwrap(), vec!["charles"]);
    }

    #[test]
    fn friendship_with_self_ignored() {
        let db = db_with_users(&["rick"]);
        assert!(!db.create_friendship("rick", "rick").unwrap());
        assert!(db.get_friendship("rick", "rick").unwrap().is_none());
    }

    #[test]
    fn insert_requires_known_users() {
        let db = db_with_users(&["charles"]);
        assert!(db.insert_message("charles", "nobody", "s", "b").is_err());
    }

    #[test]
    fn insert_and_fetch_message() {
        let db = db_with_users(&["charles", "rick"]);
        let id = db.insert_message("charles", "rick", "Hi", "Test").unwrap();
        assert!(id > 0);

        let row = db.get_message(id).unwrap().unwrap();
        assert_eq!(row.sender, "charles");
        assert_eq!(row.recipient, "rick");
        assert_eq!(row.subject, "Hi");
        assert_eq!(row.body, "Test");
        assert!(!row.read_status);
        assert!(!row.deleted_for_sender);
        assert!(!row.deleted_for_recipient);
        assert!(crate::models::parse_timestamp(&row.date_sent).is_ok());

        assert!(db.get_message(id + 1).unwrap().is_none());
    }

    #[test]
    fn ids_increase() {
        let db = db_with_users(&["charles", "rick"]);
        let first = db.insert_message("charles", "rick", "", "").unwrap();
        let second = db.insert_message("charles", "rick", "", "").unwrap();
        assert!(second > first);
    }

    #[test]
    fn mutations_scoped_by_owner() {
        let db = db_with_users(&["charles", "rick"]);
        let id = db.insert_message("charles", "rick", "Hi", "Test").unwrap();

        assert_eq!(db.mark_message_read(id, "charles").unwrap(), 0);
        assert_eq!(db.mark_deleted_for_sender(id, "rick").unwrap(), 0);
        assert_eq!(db.mark_deleted_for_recipient(id, "charles").unwrap(), 0);

        assert_eq!(db.mark_message_read(id, "rick").unwrap(), 1);
        assert_eq!(db.mark_deleted_for_recipient(id, "rick").unwrap(), 1);

        let row = db.get_message(id).unwrap().unwrap();
        assert!(row.read_status);
        assert!(row.deleted_for_recipient);
        assert!(!row.deleted_for_sender);
    }

    #[test]
    fn listings_skip_own_deletions() {
        let db = db_with_users(&["charles", "rick"]);
        let a = db.insert_message("charles", "rick", "a", "").unwrap();
        let b = db.insert_message("charles", "rick", "b", "").unwrap();

        db.mark_deleted_for_sender(a, "charles").unwrap();

        let sent: Vec<i64> = db.get_sent_messages("charles").unwrap().iter().map(|m| m.id).collect();
        assert_eq!(sent, vec![b]);
        let received: Vec<i64> = db.get_received_messages("rick").unwrap().iter().map(|m| m.id).collect();
        assert_eq!(received, vec![a, b]);
    }

    #[test]
    fn search_matches_subject_or_body_newest_first() {
        let db = db_with_users(&["charles", "rick"]);
        let a = db.insert_message("charles", "rick", "lunch plans", "").unwrap();
        let _ = db.insert_message("charles", "rick", "other", "nothing here").unwrap();
        let c = db.insert_message("charles", "rick", "re", "about lunch").unwrap();

        let found: Vec<i64> = db
            .search_received_messages("rick", "lunch")
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(found, vec![c, a]);

        assert!(db.search_received_messages("charles", "lunch").unwrap().is_empty());
    }

    #[test]
    fn search_ignores_ascii_case() {
        let db = db_with_users(&["charles", "rick"]);
        let a = db.insert_message("charles", "rick", "Friday", "").unwrap();
        let b = db.insert_message("charles", "rick", "", "see you FRIDAY").unwrap();

        let found: Vec<i64> = db
            .search_received_messages("rick", "friday")
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(found, vec![b, a]);
    }

    #[test]
    fn search_includes_recipient_deleted() {
        let db = db_with_users(&["charles", "rick"]);
        let id = db.insert_message("charles", "rick", "Dinner?", "").unwrap();
        db.mark_deleted_for_recipient(id, "rick").unwrap();

        let found: Vec<i64> = db
            .search_received_messages("rick", "Dinner")
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(found, vec![id]);
    }

    #[test]
    fn search_wildcards_are_literal() {
        let db = db_with_users(&["charles", "rick"]);
        db.insert_message("charles", "rick", "plain", "nothing special").unwrap();
        let pct = db.insert_message("charles", "rick", "50% off", "").unwrap();

        let found: Vec<i64> = db
            .search_received_messages("rick", "%")
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(found, vec![pct]);
        assert!(db.search_received_messages("rick", "_").unwrap().is_empty());
    }

    #[test]
    fn reopening_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pigeon.db");

        {
            let db = Database::open(&path).unwrap();
            db.create_user("id-0", "charles", "hash", None, None, "c@example.com").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.user_exists("charles").unwrap());
    }
}
