//! Request and response bodies for the coordinator's HTTP API.
//!
//! Every endpoint is POST-only JSON. Field names are the kebab-case strings
//! the wire has always used; the structs here are the single source of truth
//! for both the coordinator handlers and the client.

use serde::{Deserialize, Serialize};

use crate::PartyId;

// ---- keygen ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeygenRequest {
    /// Declared party size.
    pub n: u16,
    /// Declared threshold.
    pub t: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeygenResponse {
    #[serde(rename = "group-id")]
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinKeygenRequest {
    #[serde(rename = "group-id")]
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinKeygenResponse {
    pub status: bool,
    #[serde(rename = "my-party-id")]
    pub my_party_id: PartyId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollKeygenRequest {
    #[serde(rename = "group-id")]
    pub group_id: String,
    #[serde(rename = "party-id", skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollKeygenResponse {
    #[serde(rename = "group-id")]
    pub group_id: String,
    /// Echo of the requester's party id, when one was supplied.
    #[serde(rename = "party-id")]
    pub party_id: Option<PartyId>,
    /// Party ids of everyone else in the group.
    pub parties: Vec<PartyId>,
    pub t: u16,
    pub n: u16,
}

/// Shared by `/keygen/send` and `/keygen/get-messages`; the latter simply
/// posts an empty `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeygenMessageRequest {
    #[serde(rename = "group-id")]
    pub group_id: String,
    #[serde(rename = "party-id")]
    pub party_id: PartyId,
    /// Hex-encoded protocol payload; empty for a pure fetch.
    #[serde(default)]
    pub message: String,
    #[serde(rename = "last-seen", default)]
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Highest log row id covered by `messages`, or the request's own
    /// `last-seen` when nothing new arrived.
    #[serde(rename = "last-seen")]
    pub last_seen: i64,
    /// Hex-encoded payloads in ascending log-id order.
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeKeygenRequest {
    #[serde(rename = "group-id")]
    pub group_id: String,
    #[serde(rename = "party-id")]
    pub party_id: PartyId,
    #[serde(rename = "public-key")]
    pub public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: bool,
}

// ---- sign ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSignRequest {
    #[serde(rename = "group-id")]
    pub group_id: String,
    /// Sanity hash binding the candidate message to the group.
    pub hash: String,
    #[serde(default)]
    pub openssh: bool,
    #[serde(rename = "openssh-namespace", default)]
    pub openssh_namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSignResponse {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSignRequest {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
    pub hash: String,
    #[serde(rename = "party-id")]
    pub party_id: PartyId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSignResponse {
    pub status: bool,
    pub openssh: bool,
    #[serde(rename = "openssh-namespace")]
    pub openssh_namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSignRequest {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
    #[serde(rename = "party-id", skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSignResponse {
    #[serde(rename = "group-id")]
    pub group_id: String,
    #[serde(rename = "party-id")]
    pub party_id: Option<PartyId>,
    pub t: u16,
    /// Party ids of enrolled players other than the requester.
    pub parties: Vec<PartyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignMessageRequest {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
    #[serde(rename = "party-id")]
    pub party_id: PartyId,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "last-seen", default)]
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeSignRequest {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
    #[serde(rename = "party-id")]
    pub party_id: PartyId,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSignatureRequest {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSignatureResponse {
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSignRequest {
    #[serde(rename = "group-id")]
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeremonySummary {
    pub uid: String,
    pub active: bool,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub openssh: bool,
    #[serde(rename = "openssh-namespace")]
    pub openssh_namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSignResponse {
    pub ceremonies: Vec<CeremonySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateRequest {
    #[serde(rename = "ceremony-id")]
    pub ceremony_id: String,
}
