//! The two append-only relay logs.
//!
//! Payloads are opaque to the store; they are hex-encoded on insert and
//! decoded on read, never inspected. Row ids are the ordering contract: a
//! `since` query returns exactly the rows with `id > last_seen`, ascending,
//! and every poller observes that same order.

use rusqlite::{params, Connection};

use freon_types::PartyId;

use crate::queries::{ceremonies, groups};
use crate::{DbError, Result};

/// One relay log row.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub row_id: i64,
    pub payload: Vec<u8>,
}

/// Append a payload to a group's keygen log. Returns the new row id.
pub fn append_keygen(
    conn: &Connection,
    group_uid: &str,
    sender_party_id: PartyId,
    payload: &[u8],
) -> Result<i64> {
    let group = groups::get(conn, group_uid)?;
    let sender = groups::participant_row_id(conn, group.row_id, sender_party_id)?;
    conn.execute(
        "INSERT INTO keygen_messages (group_id, sender, message) VALUES (?1, ?2, ?3)",
        params![group.row_id, sender, hex::encode(payload)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Keygen log rows with `id > last_seen`, in ascending id order.
pub fn keygen_since(conn: &Connection, group_uid: &str, last_seen: i64) -> Result<Vec<LogRow>> {
    let group = groups::get(conn, group_uid)?;
    let mut stmt = conn.prepare(
        "SELECT id, message FROM keygen_messages
         WHERE group_id = ?1 AND id > ?2 ORDER BY id",
    )?;
    collect_rows(&mut stmt, group.row_id, last_seen)
}

/// Append a payload to a ceremony's sign log. Returns the new row id.
///
/// Appending to a closed ceremony is rejected so a terminated ceremony goes
/// quiet instead of accumulating unusable traffic.
pub fn append_sign(
    conn: &Connection,
    ceremony_uid: &str,
    sender_party_id: PartyId,
    payload: &[u8],
) -> Result<i64> {
    let ceremony = ceremonies::get(conn, ceremony_uid)?;
    if !ceremony.active {
        return Err(DbError::CeremonyClosed);
    }
    let sender = groups::participant_row_id(conn, ceremony.group_row_id, sender_party_id)?;
    conn.execute(
        "INSERT INTO sign_messages (ceremony_id, sender, message) VALUES (?1, ?2, ?3)",
        params![ceremony.row_id, sender, hex::encode(payload)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Sign log rows with `id > last_seen`, in ascending id order.
pub fn sign_since(conn: &Connection, ceremony_uid: &str, last_seen: i64) -> Result<Vec<LogRow>> {
    let ceremony = ceremonies::get(conn, ceremony_uid)?;
    let mut stmt = conn.prepare(
        "SELECT id, message FROM sign_messages
         WHERE ceremony_id = ?1 AND id > ?2 ORDER BY id",
    )?;
    collect_rows(&mut stmt, ceremony.row_id, last_seen)
}

fn collect_rows(
    stmt: &mut rusqlite::Statement<'_>,
    parent_row_id: i64,
    last_seen: i64,
) -> Result<Vec<LogRow>> {
    let rows = stmt
        .query_map(params![parent_row_id, last_seen], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(row_id, message_hex)| {
            let payload = hex::decode(message_hex).map_err(|_| DbError::Corrupt)?;
            Ok(LogRow { row_id, payload })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn group_with_parties(conn: &mut Connection, n: u16) -> String {
        let uid = groups::create(conn, n, n).expect("create group");
        for _ in 0..n {
            groups::add_participant(conn, &uid).expect("add participant");
        }
        uid
    }

    #[test]
    fn keygen_log_orders_and_filters_by_id() {
        let mut conn = test_db();
        let group_uid = group_with_parties(&mut conn, 2);

        let id1 = append_keygen(&conn, &group_uid, 1, b"one").expect("append");
        let id2 = append_keygen(&conn, &group_uid, 2, b"two").expect("append");
        let id3 = append_keygen(&conn, &group_uid, 1, b"three").expect("append");
        assert!(id1 < id2 && id2 < id3);

        let all = keygen_since(&conn, &group_uid, 0).expect("since 0");
        let payloads: Vec<&[u8]> = all.iter().map(|r| r.payload.as_slice()).collect();
        assert_eq!(payloads, vec![b"one".as_slice(), b"two", b"three"]);

        let tail = keygen_since(&conn, &group_uid, id1).expect("since id1");
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].row_id, id2);

        assert!(keygen_since(&conn, &group_uid, id3).expect("since id3").is_empty());
    }

    #[test]
    fn keygen_append_rejects_unknown_sender() {
        let mut conn = test_db();
        let group_uid = group_with_parties(&mut conn, 2);
        assert!(matches!(
            append_keygen(&conn, &group_uid, 7, b"payload"),
            Err(DbError::UnknownParty)
        ));
        assert!(matches!(
            append_keygen(&conn, "g_missing", 1, b"payload"),
            Err(DbError::UnknownGroup)
        ));
    }

    #[test]
    fn sign_log_respects_ceremony_lifecycle() {
        let mut conn = test_db();
        let group_uid = group_with_parties(&mut conn, 2);
        let ceremony_uid =
            ceremonies::create(&conn, &group_uid, "cafe", false, "").expect("create ceremony");

        let id1 = append_sign(&conn, &ceremony_uid, 1, b"commit").expect("append");
        let rows = sign_since(&conn, &ceremony_uid, 0).expect("since");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_id, id1);
        assert_eq!(rows[0].payload, b"commit");

        ceremonies::terminate(&conn, &ceremony_uid).expect("terminate");
        assert!(matches!(
            append_sign(&conn, &ceremony_uid, 1, b"late"),
            Err(DbError::CeremonyClosed)
        ));
        // Reads still work after close.
        assert_eq!(sign_since(&conn, &ceremony_uid, 0).expect("since").len(), 1);
    }

    #[test]
    fn logs_are_scoped_to_their_parent() {
        let mut conn = test_db();
        let group_a = group_with_parties(&mut conn, 2);
        let group_b = group_with_parties(&mut conn, 2);

        append_keygen(&conn, &group_a, 1, b"for-a").expect("append");
        append_keygen(&conn, &group_b, 1, b"for-b").expect("append");

        let a = keygen_since(&conn, &group_a, 0).expect("since a");
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].payload, b"for-a");
    }
}
