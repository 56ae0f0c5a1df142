//! Ceremony and player operations.

use rusqlite::{params, Connection, OptionalExtension};
use subtle::ConstantTimeEq;

use freon_crypto::ids::unique_id;
use freon_types::wire::CeremonySummary;
use freon_types::PartyId;

use crate::queries::groups;
use crate::{DbError, Result};

/// Default page size for ceremony listings.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// A ceremony row.
#[derive(Debug, Clone)]
pub struct CeremonyRow {
    pub row_id: i64,
    pub group_row_id: i64,
    pub uid: String,
    pub active: bool,
    pub openssh: bool,
    pub openssh_namespace: Option<String>,
    pub hash: String,
    pub signature: Option<String>,
}

/// Create a signing ceremony over a group.
///
/// Returns the new `c_`-prefixed ceremony id.
pub fn create(
    conn: &Connection,
    group_uid: &str,
    hash: &str,
    openssh: bool,
    namespace: &str,
) -> Result<String> {
    let group = groups::get(conn, group_uid)?;
    let uid = format!("c_{}", unique_id());
    conn.execute(
        "INSERT INTO ceremonies (group_id, uid, active, openssh, openssh_namespace, hash)
         VALUES (?1, ?2, 1, ?3, ?4, ?5)",
        params![group.row_id, uid, openssh, namespace, hash],
    )?;
    Ok(uid)
}

/// Fetch a ceremony by uid.
pub fn get(conn: &Connection, ceremony_uid: &str) -> Result<CeremonyRow> {
    conn.query_row(
        "SELECT id, group_id, uid, active, openssh, openssh_namespace, hash, signature
         FROM ceremonies WHERE uid = ?1",
        params![ceremony_uid],
        |row| {
            Ok(CeremonyRow {
                row_id: row.get(0)?,
                group_row_id: row.get(1)?,
                uid: row.get(2)?,
                active: row.get(3)?,
                openssh: row.get(4)?,
                openssh_namespace: row.get(5)?,
                hash: row.get(6)?,
                signature: row.get(7)?,
            })
        },
    )
    .optional()?
    .ok_or(DbError::UnknownCeremony)
}

/// Enroll `(party_id)` in a ceremony after verifying the submitted sanity
/// hash against the stored one in constant time.
///
/// Enrollment is idempotent: a repeat join with a matching hash succeeds
/// without inserting a second player row, so a client retrying a dropped
/// response does not wedge itself.
pub fn join(
    conn: &Connection,
    ceremony_uid: &str,
    hash: &str,
    party_id: PartyId,
) -> Result<CeremonyRow> {
    let ceremony = get(conn, ceremony_uid)?;
    if !ceremony.active {
        return Err(DbError::CeremonyClosed);
    }
    if ceremony.hash.as_bytes().ct_eq(hash.as_bytes()).unwrap_u8() != 1 {
        return Err(DbError::HashMismatch);
    }

    let participant_row_id =
        groups::participant_row_id(conn, ceremony.group_row_id, party_id)?;
    conn.execute(
        "INSERT OR IGNORE INTO players (ceremony_id, participant_id) VALUES (?1, ?2)",
        params![ceremony.row_id, participant_row_id],
    )?;
    Ok(ceremony)
}

/// The ceremony's group id, threshold, and the party ids of enrolled players
/// other than `my_party_id`.
pub fn poll(
    conn: &Connection,
    ceremony_uid: &str,
    my_party_id: Option<PartyId>,
) -> Result<(String, u16, Vec<PartyId>)> {
    let ceremony = get(conn, ceremony_uid)?;
    let (group_uid, threshold): (String, u16) = conn.query_row(
        "SELECT uid, threshold FROM groups WHERE id = ?1",
        params![ceremony.group_row_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT p.party_id
         FROM players x
         JOIN participants p ON x.participant_id = p.id
         WHERE x.ceremony_id = ?1
         ORDER BY p.party_id",
    )?;
    let mut parties = stmt
        .query_map(params![ceremony.row_id], |row| row.get::<_, PartyId>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if let Some(me) = my_party_id {
        parties.retain(|p| *p != me);
    }

    Ok((group_uid, threshold, parties))
}

/// Record the final signature and close the ceremony, atomically and
/// exactly once.
pub fn finalize_sign(conn: &Connection, ceremony_uid: &str, signature: &str) -> Result<()> {
    let ceremony = get(conn, ceremony_uid)?;
    if !ceremony.active || ceremony.signature.is_some() {
        return Err(DbError::CeremonyClosed);
    }
    conn.execute(
        "UPDATE ceremonies SET signature = ?1, active = 0 WHERE id = ?2 AND active = 1",
        params![signature, ceremony.row_id],
    )?;
    Ok(())
}

/// The stored signature for a ceremony.
pub fn get_signature(conn: &Connection, ceremony_uid: &str) -> Result<String> {
    get(conn, ceremony_uid)?.signature.ok_or(DbError::NotYetSigned)
}

/// Close a ceremony without a signature.
///
/// Deliberately unauthenticated: any caller may terminate any ceremony they
/// can name. Ceremony ids carry 192 bits of entropy, which is the only
/// gate; tightening this is a known hardening opportunity.
pub fn terminate(conn: &Connection, ceremony_uid: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE ceremonies SET active = 0 WHERE uid = ?1",
        params![ceremony_uid],
    )?;
    if changed == 0 {
        return Err(DbError::UnknownCeremony);
    }
    Ok(())
}

/// Active ceremonies for a group, newest first, paginated.
pub fn list_active(
    conn: &Connection,
    group_uid: &str,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Vec<CeremonySummary>> {
    let group = groups::get(conn, group_uid)?;
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0);
    let offset = offset.unwrap_or(0).max(0);

    let mut stmt = conn.prepare(
        "SELECT uid, active, hash, signature, openssh, openssh_namespace
         FROM ceremonies
         WHERE group_id = ?1 AND active = 1
         ORDER BY id DESC
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt
        .query_map(params![group.row_id, limit, offset], |row| {
            Ok(CeremonySummary {
                uid: row.get(0)?,
                active: row.get(1)?,
                hash: row.get(2)?,
                signature: row.get(3)?,
                openssh: row.get(4)?,
                openssh_namespace: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
