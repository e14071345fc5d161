use anyhow::anyhow;
use tracing::debug;
use uuid::Uuid;

use parley_db::Database;
use parley_db::queries::ChannelInsert;
use parley_types::models::Channel;

use crate::convert;
use crate::error::ChatError;
use crate::pair::CanonicalPair;

/// Outcome of channel resolution. `created` is true only on the call that
/// actually inserted the row — clients use it to show the one-time
/// ephemeral-conversation disclosure.
#[derive(Debug)]
pub struct Resolution {
    pub channel: Channel,
    pub created: bool,
}

/// Idempotently map a canonical pair to its channel, creating it on first
/// contact. Exactly one channel row may ever exist per pair; when two
/// participants open the conversation simultaneously, the losing insert is
/// recovered by [`resolve_or_retry`].
pub fn resolve(db: &Database, pair: &CanonicalPair) -> Result<Resolution, ChatError> {
    if let Some(row) = db
        .find_channel(pair.low(), pair.high())
        .map_err(ChatError::store)?
    {
        // Steady-state path for returning conversations: no side effect.
        return Ok(Resolution {
            channel: convert::channel_from_row(row),
            created: false,
        });
    }

    let id = Uuid::new_v4();
    match db
        .insert_channel(&id.to_string(), pair.low(), pair.high())
        .map_err(ChatError::store)?
    {
        ChannelInsert::Created(row) => {
            debug!(
                "Created channel {} for pair ({}, {})",
                row.id,
                pair.low(),
                pair.high()
            );
            Ok(Resolution {
                channel: convert::channel_from_row(row),
                created: true,
            })
        }
        ChannelInsert::Conflict => resolve_or_retry(db, pair),
    }
}

/// The losing side of a simultaneous first-contact race lands here: our
/// insert hit the unique index, so the winner's row must now be visible.
/// A miss at this point means the store dropped the row under us.
fn resolve_or_retry(db: &Database, pair: &CanonicalPair) -> Result<Resolution, ChatError> {
    debug!(
        "Channel insert conflicted for pair ({}, {}), re-reading",
        pair.low(),
        pair.high()
    );

    let row = db
        .find_channel(pair.low(), pair.high())
        .map_err(ChatError::store)?
        .ok_or_else(|| {
            ChatError::store(anyhow!(
                "channel insert conflicted but no row found for pair ({}, {})",
                pair.low(),
                pair.high()
            ))
        })?;

    Ok(Resolution {
        channel: convert::channel_from_row(row),
        created: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_profile("alice", "Alice", None, true).unwrap();
        db.upsert_profile("bob", "Bob", None, true).unwrap();
        db
    }

    #[test]
    fn test_resolve_creates_once_then_reuses() {
        let db = test_db();
        let pair = CanonicalPair::normalize("alice", "bob").unwrap();

        let first = resolve(&db, &pair).unwrap();
        assert!(first.created);

        let second = resolve(&db, &pair).unwrap();
        assert!(!second.created);
        assert_eq!(first.channel.id, second.channel.id);
    }

    #[test]
    fn test_resolve_is_order_independent() {
        let db = test_db();
        let ab = CanonicalPair::normalize("alice", "bob").unwrap();
        let ba = CanonicalPair::normalize("bob", "alice").unwrap();

        let first = resolve(&db, &ab).unwrap();
        let second = resolve(&db, &ba).unwrap();
        assert_eq!(first.channel.id, second.channel.id);
    }

    #[test]
    fn test_resolve_recovers_from_lost_race() {
        let db = test_db();
        let pair = CanonicalPair::normalize("alice", "bob").unwrap();

        // Simulate the other participant winning the insert race.
        let winner = Uuid::new_v4();
        db.insert_channel(&winner.to_string(), "alice", "bob")
            .unwrap();

        let resolution = resolve(&db, &pair).unwrap();
        assert!(!resolution.created);
        assert_eq!(resolution.channel.id, winner);
    }

    #[test]
    fn test_resolve_or_retry_returns_winner() {
        let db = test_db();
        let pair = CanonicalPair::normalize("alice", "bob").unwrap();

        // The winner's row is already in place; the retry path must return
        // it rather than surfacing the conflict.
        let winner = Uuid::new_v4();
        db.insert_channel(&winner.to_string(), "alice", "bob")
            .unwrap();

        let resolution = resolve_or_retry(&db, &pair).unwrap();
        assert!(!resolution.created);
        assert_eq!(resolution.channel.id, winner);
    }

    #[test]
    fn test_concurrent_resolves_leave_one_row() {
        let db = test_db();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let db = &db;
                    s.spawn(move || {
                        let (a, b) = if i % 2 == 0 {
                            ("alice", "bob")
                        } else {
                            ("bob", "alice")
                        };
                        let pair = CanonicalPair::normalize(a, b).unwrap();
                        resolve(db, &pair).unwrap().channel.id
                    })
                })
                .collect();

            let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert!(ids.windows(2).all(|w| w[0] == w[1]));
        });

        let created: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM channels", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(created, 1);
    }
}
