//! Group and participant operations.

use rusqlite::{params, Connection, OptionalExtension};

use freon_crypto::ids::unique_id;
use freon_types::{PartyId, MAX_PARTY_SIZE, MIN_PARTY_SIZE};

use crate::{DbError, Result};

/// A group row.
#[derive(Debug, Clone)]
pub struct GroupRow {
    pub row_id: i64,
    pub uid: String,
    pub participants: u16,
    pub threshold: u16,
    pub public_key: Option<String>,
}

/// A participant row.
#[derive(Debug, Clone)]
pub struct ParticipantRow {
    pub row_id: i64,
    pub group_row_id: i64,
    pub uid: String,
    pub party_id: PartyId,
}

/// Create a group with the declared party size and threshold.
///
/// Returns the new `g_`-prefixed group id.
pub fn create(conn: &Connection, participants: u16, threshold: u16) -> Result<String> {
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&participants)
        || threshold < 1
        || threshold > participants
    {
        return Err(DbError::InvalidThreshold);
    }

    let uid = format!("g_{}", unique_id());
    conn.execute(
        "INSERT INTO groups (uid, participants, threshold) VALUES (?1, ?2, ?3)",
        params![uid, participants, threshold],
    )?;
    Ok(uid)
}

/// Fetch a group by uid.
pub fn get(conn: &Connection, group_uid: &str) -> Result<GroupRow> {
    conn.query_row(
        "SELECT id, uid, participants, threshold, public_key FROM groups WHERE uid = ?1",
        params![group_uid],
        |row| {
            Ok(GroupRow {
                row_id: row.get(0)?,
                uid: row.get(1)?,
                participants: row.get(2)?,
                threshold: row.get(3)?,
                public_key: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or(DbError::UnknownGroup)
}

/// Add a participant to a group, assigning the next dense party id.
///
/// Returns `(party_id, participant_uid)`. The whole read-count-assign-insert
/// sequence runs in one transaction so two racing joins cannot share a seat.
pub fn add_participant(conn: &mut Connection, group_uid: &str) -> Result<(PartyId, String)> {
    let tx = conn.transaction()?;

    let group = get(&tx, group_uid)?;
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM participants WHERE group_id = ?1",
        params![group.row_id],
        |row| row.get(0),
    )?;
    if count >= i64::from(group.participants) {
        return Err(DbError::GroupFull);
    }

    let max: Option<u16> = tx.query_row(
        "SELECT MAX(party_id) FROM participants WHERE group_id = ?1",
        params![group.row_id],
        |row| row.get(0),
    )?;
    let max = max.unwrap_or(0);
    if max == u16::MAX {
        return Err(DbError::GroupFull);
    }
    let party_id = max + 1;

    let uid = format!("p_{}", unique_id());
    tx.execute(
        "INSERT INTO participants (group_id, uid, party_id) VALUES (?1, ?2, ?3)",
        params![group.row_id, uid, party_id],
    )?;
    tx.commit()?;

    Ok((party_id, uid))
}

/// All participants of a group.
pub fn list_participants(conn: &Connection, group_uid: &str) -> Result<Vec<ParticipantRow>> {
    let group = get(conn, group_uid)?;
    let mut stmt = conn.prepare(
        "SELECT id, group_id, uid, party_id FROM participants
         WHERE group_id = ?1 ORDER BY party_id",
    )?;
    let rows = stmt
        .query_map(params![group.row_id], |row| {
            Ok(ParticipantRow {
                row_id: row.get(0)?,
                group_row_id: row.get(1)?,
                uid: row.get(2)?,
                party_id: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The participant row id for `(group, party_id)`.
pub fn participant_row_id(conn: &Connection, group_row_id: i64, party_id: PartyId) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM participants WHERE group_id = ?1 AND party_id = ?2",
        params![group_row_id, party_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(DbError::UnknownParty)
}

/// Record the group verification key, exactly once.
pub fn finalize_keygen(conn: &Connection, group_uid: &str, public_key_hex: &str) -> Result<()> {
    let group = get(conn, group_uid)?;
    if group.public_key.is_some() {
        return Err(DbError::AlreadyFinalized);
    }
    conn.execute(
        "UPDATE groups SET public_key = ?1 WHERE id = ?2 AND public_key IS NULL",
        params![public_key_hex, group.row_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn create_and_get() {
        let conn = test_db();
        let uid = create(&conn, 3, 2).expect("create group");
        assert!(uid.starts_with("g_"));
        assert_eq!(uid.len(), 50);

        let group = get(&conn, &uid).expect("get group");
        assert_eq!(group.participants, 3);
        assert_eq!(group.threshold, 2);
        assert!(group.public_key.is_none());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let conn = test_db();
        assert!(matches!(create(&conn, 3, 4), Err(DbError::InvalidThreshold)));
        assert!(matches!(create(&conn, 1, 1), Err(DbError::InvalidThreshold)));
        assert!(matches!(create(&conn, 3, 0), Err(DbError::InvalidThreshold)));
        assert!(create(&conn, 2, 1).is_ok());
        assert!(create(&conn, 255, 255).is_ok());
    }

    #[test]
    fn unknown_group_errors() {
        let conn = test_db();
        assert!(matches!(get(&conn, "g_missing"), Err(DbError::UnknownGroup)));
    }

    #[test]
    fn party_ids_are_dense_from_one() {
        let mut conn = test_db();
        let uid = create(&conn, 3, 2).expect("create group");

        let (first, p_uid) = add_participant(&mut conn, &uid).expect("first join");
        let (second, _) = add_participant(&mut conn, &uid).expect("second join");
        let (third, _) = add_participant(&mut conn, &uid).expect("third join");

        assert_eq!((first, second, third), (1, 2, 3));
        assert!(p_uid.starts_with("p_"));

        let listed: Vec<u16> = list_participants(&conn, &uid)
            .expect("list")
            .into_iter()
            .map(|p| p.party_id)
            .collect();
        assert_eq!(listed, vec![1, 2, 3]);
    }

    #[test]
    fn group_full_after_n_joins() {
        let mut conn = test_db();
        let uid = create(&conn, 2, 2).expect("create group");
        add_participant(&mut conn, &uid).expect("join 1");
        add_participant(&mut conn, &uid).expect("join 2");
        assert!(matches!(
            add_participant(&mut conn, &uid),
            Err(DbError::GroupFull)
        ));
    }

    #[test]
    fn finalize_is_once_only() {
        let conn = test_db();
        let uid = create(&conn, 2, 2).expect("create group");
        finalize_keygen(&conn, &uid, "aabb").expect("first finalize");
        assert_eq!(get(&conn, &uid).unwrap().public_key.as_deref(), Some("aabb"));
        assert!(matches!(
            finalize_keygen(&conn, &uid, "ccdd"),
            Err(DbError::AlreadyFinalized)
        ));
        // The stored key is untouched by the rejected second call.
        assert_eq!(get(&conn, &uid).unwrap().public_key.as_deref(), Some("aabb"));
    }
}
