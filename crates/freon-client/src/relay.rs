//! Typed HTTP client for the coordinator.
//!
//! One method per endpoint, each a single POST with a JSON body. Non-OK
//! responses carry a tagged error kind which is surfaced as
//! [`ClientError::Api`]; anything that never produced a parseable response
//! is [`ClientError::Network`] and treated as retryable upstream.
//!
//! The message-exchange endpoints for keygen and sign have the same shape,
//! so the ceremony driver talks to either log through the
//! [`CeremonyChannel`] trait; the two thin adapters at the bottom of this
//! module pin a channel to a group or a ceremony.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use freon_types::error::ErrorBody;
use freon_types::wire::*;
use freon_types::{ErrorKind, PartyId};

use crate::{ClientError, Result};

/// HTTP client bound to one coordinator host.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base: String,
}

impl RelayClient {
    /// Build a client for `host` (scheme optional, `http://` assumed).
    ///
    /// The client carries a cookie jar: the coordinator is allowed, though
    /// not required, to track a session.
    pub fn new(host: &str) -> Result<Self> {
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", host.trim_end_matches('/'))
        };
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(RelayClient { http, base })
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return match response.json::<ErrorBody>().await {
                Ok(body) => Err(ClientError::Api(ErrorKind::from_wire_token(&body.message))),
                Err(_) => Err(ClientError::Network(format!(
                    "{path} failed with status {status}"
                ))),
            };
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))
    }

    // ---- keygen ----

    pub async fn create_keygen(&self, n: u16, t: u16) -> Result<CreateKeygenResponse> {
        self.post("/keygen/create", &CreateKeygenRequest { n, t }).await
    }

    pub async fn join_keygen(&self, group_id: &str) -> Result<JoinKeygenResponse> {
        self.post(
            "/keygen/join",
            &JoinKeygenRequest {
                group_id: group_id.to_string(),
            },
        )
        .await
    }

    pub async fn poll_keygen(
        &self,
        group_id: &str,
        party_id: Option<PartyId>,
    ) -> Result<PollKeygenResponse> {
        self.post(
            "/keygen/poll",
            &PollKeygenRequest {
                group_id: group_id.to_string(),
                party_id,
            },
        )
        .await
    }

    pub async fn keygen_exchange(
        &self,
        group_id: &str,
        party_id: PartyId,
        message: Option<&[u8]>,
        last_seen: i64,
    ) -> Result<MessageResponse> {
        let path = if message.is_some() {
            "/keygen/send"
        } else {
            "/keygen/get-messages"
        };
        self.post(
            path,
            &KeygenMessageRequest {
                group_id: group_id.to_string(),
                party_id,
                message: message.map(hex::encode).unwrap_or_default(),
                last_seen,
            },
        )
        .await
    }

    pub async fn finalize_keygen(
        &self,
        group_id: &str,
        party_id: PartyId,
        public_key_hex: &str,
    ) -> Result<StatusResponse> {
        self.post(
            "/keygen/finalize",
            &FinalizeKeygenRequest {
                group_id: group_id.to_string(),
                party_id,
                public_key: public_key_hex.to_string(),
            },
        )
        .await
    }

    // ---- sign ----

    pub async fn create_sign(
        &self,
        group_id: &str,
        hash: &str,
        openssh: bool,
        namespace: &str,
    ) -> Result<CreateSignResponse> {
        self.post(
            "/sign/create",
            &CreateSignRequest {
                group_id: group_id.to_string(),
                hash: hash.to_string(),
                openssh,
                openssh_namespace: namespace.to_string(),
            },
        )
        .await
    }

    pub async fn join_sign(
        &self,
        ceremony_id: &str,
        hash: &str,
        party_id: PartyId,
    ) -> Result<JoinSignResponse> {
        self.post(
            "/sign/join",
            &JoinSignRequest {
                ceremony_id: ceremony_id.to_string(),
                hash: hash.to_string(),
                party_id,
            },
        )
        .await
    }

    pub async fn poll_sign(
        &self,
        ceremony_id: &str,
        party_id: Option<PartyId>,
    ) -> Result<PollSignResponse> {
        self.post(
            "/sign/poll",
            &PollSignRequest {
                ceremony_id: ceremony_id.to_string(),
                party_id,
            },
        )
        .await
    }

    pub async fn sign_exchange(
        &self,
        ceremony_id: &str,
        party_id: PartyId,
        message: Option<&[u8]>,
        last_seen: i64,
    ) -> Result<MessageResponse> {
        let path = if message.is_some() {
            "/sign/send"
        } else {
            "/sign/get-messages"
        };
        self.post(
            path,
            &SignMessageRequest {
                ceremony_id: ceremony_id.to_string(),
                party_id,
                message: message.map(hex::encode).unwrap_or_default(),
                last_seen,
            },
        )
        .await
    }

    pub async fn finalize_sign(
        &self,
        ceremony_id: &str,
        party_id: PartyId,
        signature: &str,
    ) -> Result<StatusResponse> {
        self.post(
            "/sign/finalize",
            &FinalizeSignRequest {
                ceremony_id: ceremony_id.to_string(),
                party_id,
                signature: signature.to_string(),
            },
        )
        .await
    }

    pub async fn get_signature(&self, ceremony_id: &str) -> Result<GetSignatureResponse> {
        self.post(
            "/sign/get",
            &GetSignatureRequest {
                ceremony_id: ceremony_id.to_string(),
            },
        )
        .await
    }

    pub async fn list_sign(
        &self,
        group_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<ListSignResponse> {
        self.post(
            "/sign/list",
            &ListSignRequest {
                group_id: group_id.to_string(),
                limit,
                offset,
            },
        )
        .await
    }

    pub async fn terminate(&self, ceremony_id: &str) -> Result<StatusResponse> {
        self.post(
            "/terminate",
            &TerminateRequest {
                ceremony_id: ceremony_id.to_string(),
            },
        )
        .await
    }
}

/// One ceremony's message log, as the driver sees it: post an optional
/// payload, get back the tail past `last_seen`.
#[async_trait]
pub trait CeremonyChannel: Send + Sync {
    async fn exchange(
        &self,
        party_id: PartyId,
        message: Option<Vec<u8>>,
        last_seen: i64,
    ) -> Result<MessageResponse>;
}

/// The keygen log of one group.
pub struct KeygenChannel {
    pub relay: RelayClient,
    pub group_id: String,
}

#[async_trait]
impl CeremonyChannel for KeygenChannel {
    async fn exchange(
        &self,
        party_id: PartyId,
        message: Option<Vec<u8>>,
        last_seen: i64,
    ) -> Result<MessageResponse> {
        self.relay
            .keygen_exchange(&self.group_id, party_id, message.as_deref(), last_seen)
            .await
    }
}

/// The sign log of one ceremony.
pub struct SignChannel {
    pub relay: RelayClient,
    pub ceremony_id: String,
}

#[async_trait]
impl CeremonyChannel for SignChannel {
    async fn exchange(
        &self,
        party_id: PartyId,
        message: Option<Vec<u8>>,
        last_seen: i64,
    ) -> Result<MessageResponse> {
        self.relay
            .sign_exchange(&self.ceremony_id, party_id, message.as_deref(), last_seen)
            .await
    }
}
