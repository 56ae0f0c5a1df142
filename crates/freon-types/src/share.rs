//! The per-group share record a participant persists after DKG.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PartyId;

/// Everything a participant needs to sign later for one group: where the
/// coordinator lives, who the participant is within the group, the group
/// verification key, the age-encrypted secret share, and every party's
/// public share keyed by the 4-char big-endian hex party id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub host: String,
    #[serde(rename = "group-id")]
    pub group_id: String,
    /// Group verification key, hex.
    #[serde(rename = "public-key")]
    pub public_key: String,
    #[serde(rename = "my-party-id")]
    pub my_party_id: PartyId,
    /// age envelope over the secret share, hex.
    #[serde(rename = "encrypted-share")]
    pub encrypted_share: String,
    /// Party id (hex, big-endian u16) to public-share element (hex).
    #[serde(rename = "public-shares")]
    pub public_shares: BTreeMap<String, String>,
}

/// On-disk layout of the share store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareFile {
    pub shares: Vec<ShareRecord>,
}
