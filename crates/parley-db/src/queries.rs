use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{ChannelRow, ChannelSummaryRow, MessageRow, ProfileRow};

/// Outcome of a channel insert. A unique-index conflict on the participant
/// pair is an expected outcome (simultaneous first contact from both sides),
/// not an error — the caller re-queries for the winning row.
pub enum ChannelInsert {
    Created(ChannelRow),
    Conflict,
}

impl Database {
    // -- Profiles --

    pub fn upsert_profile(
        &self,
        id: &str,
        display_name: &str,
        avatar_url: Option<&str>,
        is_paid: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, display_name, avatar_url, is_paid)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    avatar_url = excluded.avatar_url,
                    is_paid = excluded.is_paid",
                rusqlite::params![id, display_name, avatar_url, is_paid],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    // -- Channels --

    /// Exact-match lookup on the canonical participant pair.
    pub fn find_channel(&self, low: &str, high: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, participant_low, participant_high, created_at, updated_at
                 FROM channels
                 WHERE participant_low = ?1 AND participant_high = ?2",
            )?;

            let row = stmt.query_row([low, high], channel_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, participant_low, participant_high, created_at, updated_at
                 FROM channels
                 WHERE id = ?1",
            )?;

            let row = stmt.query_row([id], channel_from_row).optional()?;
            Ok(row)
        })
    }

    /// Insert a channel for a canonical pair, returning the stored row with
    /// its server-assigned timestamps. Reports `Conflict` when another
    /// insert won the race for the same pair.
    pub fn insert_channel(&self, id: &str, low: &str, high: &str) -> Result<ChannelInsert> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "INSERT INTO channels (id, participant_low, participant_high)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, participant_low, participant_high, created_at, updated_at",
                [id, low, high],
                channel_from_row,
            );

            match result {
                Ok(row) => Ok(ChannelInsert::Created(row)),
                // Only a unique-index hit on the participant pair is the
                // expected race; other constraint failures (e.g. a foreign
                // key on a missing profile) are real errors.
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(ChannelInsert::Conflict)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Channels the user participates in, most recently active first, each
    /// joined with the other participant's profile.
    pub fn list_channels_for_user(&self, user_id: &str) -> Result<Vec<ChannelSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, p.id, p.display_name, p.avatar_url, c.created_at, c.updated_at
                 FROM channels c
                 JOIN profiles p ON p.id = CASE
                    WHEN c.participant_low = ?1 THEN c.participant_high
                    ELSE c.participant_low
                 END
                 WHERE c.participant_low = ?1 OR c.participant_high = ?1
                 ORDER BY c.updated_at DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChannelSummaryRow {
                        id: row.get(0)?,
                        other_id: row.get(1)?,
                        other_display_name: row.get(2)?,
                        other_avatar_url: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    /// Insert a message and bump the owning channel's `updated_at`. Returns
    /// the stored row including the server-assigned timestamp.
    pub fn insert_message(
        &self,
        id: &str,
        channel_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO messages (id, channel_id, sender_id, content)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, channel_id, sender_id, content, created_at",
                [id, channel_id, sender_id, content],
                message_from_row,
            )?;

            conn.execute(
                "UPDATE channels
                 SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?1",
                [channel_id],
            )?;

            Ok(row)
        })
    }

    /// All messages in a channel, ascending. Ties on `created_at` fall back
    /// to rowid, which reflects insertion order.
    pub fn list_messages(&self, channel_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, sender_id, content, created_at
                 FROM messages
                 WHERE channel_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([channel_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_profile(conn: &Connection, id: &str) -> Result<Option<ProfileRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, avatar_url, is_paid, created_at
         FROM profiles
         WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                display_name: row.get(1)?,
                avatar_url: row.get(2)?,
                is_paid: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn channel_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        participant_low: row.get(1)?,
        participant_high: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
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

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_profile("alice", "Alice", None, true).unwrap();
        db.upsert_profile("bob", "Bob", Some("https://cdn.example/bob.png"), false)
            .unwrap();
        db
    }

    #[test]
    fn test_insert_channel_conflict() {
        let db = test_db();

        let first = db.insert_channel("c1", "alice", "bob").unwrap();
        assert!(matches!(first, ChannelInsert::Created(_)));

        // Same pair, different id: the unique index rejects it.
        let second = db.insert_channel("c2", "alice", "bob").unwrap();
        assert!(matches!(second, ChannelInsert::Conflict));

        let found = db.find_channel("alice", "bob").unwrap().unwrap();
        assert_eq!(found.id, "c1");
    }

    #[test]
    fn test_insert_channel_missing_profile_is_an_error() {
        let db = test_db();

        // Foreign-key failure, not a pair conflict: must surface as an
        // error instead of sending the caller down the retry path.
        let result = db.insert_channel("c1", "ghost", "nobody");
        assert!(result.is_err());
        assert!(db.find_channel("ghost", "nobody").unwrap().is_none());
    }

    #[test]
    fn test_insert_message_bumps_channel() {
        let db = test_db();
        db.insert_channel("c1", "alice", "bob").unwrap();

        let before = db.get_channel("c1").unwrap().unwrap().updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        db.insert_message("m1", "c1", "alice", "hello").unwrap();
        let after = db.get_channel("c1").unwrap().unwrap().updated_at;

        assert!(after > before, "updated_at should advance on new messages");
    }

    #[test]
    fn test_list_channels_for_user_joins_other_profile() {
        let db = test_db();
        db.insert_channel("c1", "alice", "bob").unwrap();

        let for_alice = db.list_channels_for_user("alice").unwrap();
        assert_eq!(for_alice.len(), 1);
        assert_eq!(for_alice[0].other_id, "bob");
        assert_eq!(for_alice[0].other_display_name, "Bob");

        let for_bob = db.list_channels_for_user("bob").unwrap();
        assert_eq!(for_bob[0].other_id, "alice");

        assert!(db.list_channels_for_user("carol").unwrap().is_empty());
    }
}
