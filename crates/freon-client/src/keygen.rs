//! The DKG ceremony, start to finish.
//!
//! Five steps: enroll, wait for quorum, initialize the engine, run the
//! rounds, persist the share. The elected party additionally reports the
//! group key upstream. Each step is small enough to test against a mock
//! coordinator API.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};
use zeroize::Zeroizing;

use freon_ceremony::dkg::DkgParty;
use freon_crypto::election::{am_i_elected, Transcript};
use freon_crypto::ids::uint16_to_hex_be;
use freon_crypto::envelope;
use freon_types::share::ShareRecord;
use freon_types::wire::{JoinKeygenResponse, PollKeygenResponse, StatusResponse};
use freon_types::PartyId;

use crate::driver::{run_ceremony, POLL_INTERVAL};
use crate::relay::{CeremonyChannel, KeygenChannel, RelayClient};
use crate::store::ShareStore;
use crate::{ClientError, Result};

/// The keygen-side coordinator API the driver needs; mockable in tests.
#[async_trait]
pub trait KeygenApi: Send + Sync {
    async fn poll(&self, group_id: &str, me: Option<PartyId>) -> Result<PollKeygenResponse>;
    async fn join(&self, group_id: &str) -> Result<JoinKeygenResponse>;
    async fn finalize(
        &self,
        group_id: &str,
        me: PartyId,
        public_key_hex: &str,
    ) -> Result<StatusResponse>;
    fn channel(&self, group_id: &str) -> Arc<dyn CeremonyChannel>;
}

#[async_trait]
impl KeygenApi for RelayClient {
    async fn poll(&self, group_id: &str, me: Option<PartyId>) -> Result<PollKeygenResponse> {
        self.poll_keygen(group_id, me).await
    }

    async fn join(&self, group_id: &str) -> Result<JoinKeygenResponse> {
        self.join_keygen(group_id).await
    }

    async fn finalize(
        &self,
        group_id: &str,
        me: PartyId,
        public_key_hex: &str,
    ) -> Result<StatusResponse> {
        self.finalize_keygen(group_id, me, public_key_hex).await
    }

    fn channel(&self, group_id: &str) -> Arc<dyn CeremonyChannel> {
        Arc::new(KeygenChannel {
            relay: self.clone(),
            group_id: group_id.to_string(),
        })
    }
}

/// What a completed DKG leaves behind.
#[derive(Debug)]
pub struct KeygenOutcome {
    pub group_id: String,
    pub my_party_id: PartyId,
    /// Group verification key, hex.
    pub group_public_key: String,
    /// Whether this party was elected to report the key upstream.
    pub elected: bool,
}

/// Join a group's DKG ceremony and persist the resulting share record.
///
/// `recipient` is the participant's own age public key; the secret share is
/// encrypted to it before it touches disk.
pub async fn join_ceremony<A: KeygenApi>(
    api: &A,
    store: &ShareStore,
    host: &str,
    group_id: &str,
    recipient: &str,
) -> Result<KeygenOutcome> {
    // Enrollment. The anonymous poll confirms the group exists before we
    // claim a seat.
    let meta = api.poll(group_id, None).await?;
    if meta.t > meta.n {
        return Err(ClientError::Config(format!(
            "threshold {} exceeds party size {}",
            meta.t, meta.n
        )));
    }
    let joined = api.join(group_id).await?;
    let me = joined.my_party_id;
    info!(group_id, my_party_id = me, n = meta.n, t = meta.t, "joined keygen ceremony");

    // Quorum wait: DKG needs every seat filled.
    let others = wait_for_full_group(api, group_id, me, meta.n).await?;
    let mut party_set = others;
    party_set.push(me);
    party_set.sort_unstable();

    // Rounds.
    let engine = DkgParty::new(me, &party_set, meta.t)?;
    let outcome = run_ceremony(
        engine,
        api.channel(group_id),
        me,
        Transcript::for_keygen(),
    )
    .await?;

    // Persist the share record.
    let output = outcome.engine.finish()?;
    let group_public_key = hex::encode(output.verifying_key_bytes()?);
    let plaintext = Zeroizing::new(output.key_package_bytes()?);
    let encrypted_share = envelope::encrypt_share(recipient, &plaintext)?;
    let public_shares: BTreeMap<String, String> = output
        .public_share_bytes()?
        .iter()
        .map(|(id, bytes)| (uint16_to_hex_be(*id), hex::encode(bytes)))
        .collect();

    store.append_share(ShareRecord {
        host: host.to_string(),
        group_id: group_id.to_string(),
        public_key: group_public_key.clone(),
        my_party_id: me,
        encrypted_share,
        public_shares,
    })?;

    // Leader report. A failure here is logged, never fatal: the share is
    // already saved and usable.
    let elected = am_i_elected(&outcome.transcript_hash, me, &party_set);
    if elected {
        if let Err(err) = api.finalize(group_id, me, &group_public_key).await {
            warn!(error = %err, "reporting the group key failed");
        }
    }

    Ok(KeygenOutcome {
        group_id: group_id.to_string(),
        my_party_id: me,
        group_public_key,
        elected,
    })
}

/// Poll once per second until every seat in the group is filled.
///
/// The declared party size must stay stable across responses; a group whose
/// `n` changes mid-wait is misconfigured.
async fn wait_for_full_group<A: KeygenApi>(
    api: &A,
    group_id: &str,
    me: PartyId,
    n: u16,
) -> Result<Vec<PartyId>> {
    loop {
        match api.poll(group_id, Some(me)).await {
            Ok(poll) => {
                if poll.n != n {
                    return Err(ClientError::Config(format!(
                        "party size changed from {n} to {} mid-ceremony",
                        poll.n
                    )));
                }
                if poll.parties.len() + 1 == usize::from(n) {
                    return Ok(poll.parties);
                }
            }
            Err(err) if err.is_transient() => {
                warn!(error = %err, "quorum poll failed; will retry");
            }
            Err(err) => return Err(err),
        }
        sleep(POLL_INTERVAL).await;
    }
}
