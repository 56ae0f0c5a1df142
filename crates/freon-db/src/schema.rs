//! SQL schema definitions.

/// Complete schema for the coordinator database, v1.
pub const SCHEMA_V1: &str = r#"
-- DKG output containers. public_key stays NULL until the elected party
-- reports the group verification key, exactly once.
CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    participants INTEGER NOT NULL,
    threshold INTEGER NOT NULL,
    public_key TEXT
);

-- Seats in a group. Party ids are dense from 1 and never reused.
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES groups(id),
    uid TEXT NOT NULL UNIQUE,
    party_id INTEGER NOT NULL,
    UNIQUE (group_id, party_id)
);

-- Signing attempts. active flips to 0 exactly once, on finalize or
-- terminate, and never flips back.
CREATE TABLE IF NOT EXISTS ceremonies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES groups(id),
    uid TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    openssh INTEGER NOT NULL DEFAULT 0,
    openssh_namespace TEXT,
    hash TEXT NOT NULL,
    signature TEXT
);

-- A participant's enrollment in a ceremony.
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ceremony_id INTEGER NOT NULL REFERENCES ceremonies(id),
    participant_id INTEGER NOT NULL REFERENCES participants(id),
    UNIQUE (ceremony_id, participant_id)
);

-- Append-only keygen relay log; payloads are opaque hex.
CREATE TABLE IF NOT EXISTS keygen_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL REFERENCES groups(id),
    sender INTEGER NOT NULL REFERENCES participants(id),
    message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_keygen_messages_group
    ON keygen_messages(group_id, id);

-- Append-only sign relay log.
CREATE TABLE IF NOT EXISTS sign_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ceremony_id INTEGER NOT NULL REFERENCES ceremonies(id),
    sender INTEGER NOT NULL REFERENCES participants(id),
    message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sign_messages_ceremony
    ON sign_messages(ceremony_id, id);
"#;
