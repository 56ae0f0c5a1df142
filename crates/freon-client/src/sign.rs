//! The signing ceremony, start to finish.
//!
//! Five steps mirroring the DKG driver: discover the group, resolve the
//! local share, enroll (which verifies the sanity hash server-side), wait
//! for a quorum, then run the two FROST rounds and encode the signature.
//! The elected party additionally reports the signature upstream.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};
use zeroize::Zeroizing;

use freon_ceremony::sign::SignParty;
use freon_crypto::election::{am_i_elected, Transcript};
use freon_crypto::ids::uint16_to_hex_be;
use freon_crypto::{envelope, sanity, sshsig, CryptoError};
use freon_types::wire::{JoinSignResponse, PollSignResponse, StatusResponse};
use freon_types::PartyId;

use crate::driver::{run_ceremony, POLL_INTERVAL};
use crate::relay::{CeremonyChannel, RelayClient, SignChannel};
use crate::store::ShareStore;
use crate::{ClientError, Result};

/// The sign-side coordinator API the driver needs; mockable in tests.
#[async_trait]
pub trait SignApi: Send + Sync {
    async fn poll(&self, ceremony_id: &str, me: Option<PartyId>) -> Result<PollSignResponse>;
    async fn join(&self, ceremony_id: &str, hash: &str, me: PartyId) -> Result<JoinSignResponse>;
    async fn finalize(
        &self,
        ceremony_id: &str,
        me: PartyId,
        signature: &str,
    ) -> Result<StatusResponse>;
    fn channel(&self, ceremony_id: &str) -> Arc<dyn CeremonyChannel>;
}

#[async_trait]
impl SignApi for RelayClient {
    async fn poll(&self, ceremony_id: &str, me: Option<PartyId>) -> Result<PollSignResponse> {
        self.poll_sign(ceremony_id, me).await
    }

    async fn join(&self, ceremony_id: &str, hash: &str, me: PartyId) -> Result<JoinSignResponse> {
        self.join_sign(ceremony_id, hash, me).await
    }

    async fn finalize(
        &self,
        ceremony_id: &str,
        me: PartyId,
        signature: &str,
    ) -> Result<StatusResponse> {
        self.finalize_sign(ceremony_id, me, signature).await
    }

    fn channel(&self, ceremony_id: &str) -> Arc<dyn CeremonyChannel> {
        Arc::new(SignChannel {
            relay: self.clone(),
            ceremony_id: ceremony_id.to_string(),
        })
    }
}

/// What a completed signing ceremony leaves behind.
#[derive(Debug)]
pub struct SignOutcome {
    pub ceremony_id: String,
    pub group_id: String,
    /// The encoded signature: hex, or an SSHSIG block when the ceremony was
    /// created with the openssh flag.
    pub signature: String,
    pub elected: bool,
}

/// Join a signing ceremony over `message` and produce the group signature.
pub async fn join_ceremony<A: SignApi>(
    api: &A,
    store: &ShareStore,
    ceremony_id: &str,
    identity_file: &Path,
    message: &[u8],
) -> Result<SignOutcome> {
    // Discover the group behind the ceremony.
    let meta = api.poll(ceremony_id, None).await?;
    let group_id = meta.group_id;
    let threshold = meta.t;

    // Resolve the local share.
    let record = store
        .lookup_share(&group_id)?
        .ok_or_else(|| ClientError::NoLocalShare(group_id.clone()))?;
    let me = record.my_party_id;

    // Enroll. The coordinator compares our locally computed sanity hash
    // against the one the creator pinned; a mismatch means we are looking
    // at a different candidate message.
    let hash = sanity::sanity_hash(message, &group_id);
    let joined = api.join(ceremony_id, &hash, me).await?;
    info!(ceremony_id, group_id, my_party_id = me, threshold, "joined signing ceremony");

    // Quorum wait: any t-of-n subset may sign.
    let others = wait_for_quorum(api, ceremony_id, me, threshold).await?;
    let mut party_set = others;
    party_set.push(me);
    party_set.sort_unstable();
    party_set.dedup();

    // Decrypt the share and rebuild the signer.
    let plaintext = Zeroizing::new(envelope::decrypt_share(
        &record.encrypted_share,
        identity_file,
    )?);
    let verifying_key =
        hex::decode(&record.public_key).map_err(|_| CryptoError::BadEncoding)?;

    let mut public_shares = BTreeMap::new();
    for &party_id in &party_set {
        let stored = record
            .public_shares
            .get(&uint16_to_hex_be(party_id))
            .ok_or(ClientError::MissingPublicShare(party_id))?;
        let bytes = hex::decode(stored).map_err(|_| CryptoError::BadEncoding)?;
        public_shares.insert(party_id, bytes);
    }

    let engine = SignParty::from_share_record(
        me,
        &party_set,
        &plaintext,
        &verifying_key,
        &public_shares,
        message.to_vec(),
    )?;

    // Rounds.
    let outcome = run_ceremony(
        engine,
        api.channel(ceremony_id),
        me,
        Transcript::for_sign(),
    )
    .await?;

    // Encode.
    let raw_signature = outcome.engine.finish()?;
    let signature = if joined.openssh {
        sshsig::encode(&verifying_key, &raw_signature, &joined.openssh_namespace)
    } else {
        hex::encode(&raw_signature)
    };

    // Leader report; non-fatal on failure, the signature is already ours.
    let elected = am_i_elected(&outcome.transcript_hash, me, &party_set);
    if elected {
        if let Err(err) = api.finalize(ceremony_id, me, &signature).await {
            warn!(error = %err, "reporting the signature failed");
        }
    }

    Ok(SignOutcome {
        ceremony_id: ceremony_id.to_string(),
        group_id,
        signature,
        elected,
    })
}

/// Poll once per second until at least `t` players are enrolled.
async fn wait_for_quorum<A: SignApi>(
    api: &A,
    ceremony_id: &str,
    me: PartyId,
    threshold: u16,
) -> Result<Vec<PartyId>> {
    loop {
        match api.poll(ceremony_id, Some(me)).await {
            Ok(poll) => {
                if poll.parties.len() + 1 >= usize::from(threshold) {
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
