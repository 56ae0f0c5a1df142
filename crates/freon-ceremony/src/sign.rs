//! The threshold signing engine.
//!
//! Drives one quorum member through FROST's two signing rounds: broadcast a
//! nonce commitment, collect the quorum's commitments into a signing
//! package, broadcast a signature share, and aggregate every share into the
//! final Ed25519 signature. Every member aggregates locally, so the finished
//! signature is available to the whole quorum without a designated
//! aggregator.

use std::collections::BTreeMap;

use frost_ed25519 as frost;
use rand::rngs::OsRng;

use crate::envelope::{Envelope, PayloadKind};
use crate::{identifier, CeremonyError, Engine, Result};

/// One quorum member's view of a running signing ceremony.
pub struct SignParty {
    me: u16,
    parties: Vec<u16>,
    key_package: frost::keys::KeyPackage,
    public_key_package: frost::keys::PublicKeyPackage,
    message: Vec<u8>,
    nonces: Option<frost::round1::SigningNonces>,
    commitments: BTreeMap<u16, frost::round1::SigningCommitments>,
    signing_package: Option<frost::SigningPackage>,
    shares: BTreeMap<u16, frost::round2::SignatureShare>,
    signature: Option<frost::Signature>,
}

impl SignParty {
    /// Set up a signing party over the quorum `parties` (including `me`).
    ///
    /// `public_key_package` must carry a verifying share for every quorum
    /// member; the driver assembles it from the share record.
    pub fn new(
        me: u16,
        parties: &[u16],
        key_package: frost::keys::KeyPackage,
        public_key_package: frost::keys::PublicKeyPackage,
        message: Vec<u8>,
    ) -> Result<Self> {
        let mut parties = parties.to_vec();
        parties.sort_unstable();
        parties.dedup();
        if !parties.contains(&me) {
            return Err(CeremonyError::InvalidParty(me));
        }
        Ok(SignParty {
            me,
            parties,
            key_package,
            public_key_package,
            message,
            nonces: None,
            commitments: BTreeMap::new(),
            signing_package: None,
            shares: BTreeMap::new(),
            signature: None,
        })
    }

    /// Rebuild a signing party from the serialized pieces of a share
    /// record: the decrypted key package, the group verification key, and
    /// the verifying share of every quorum member.
    pub fn from_share_record(
        me: u16,
        parties: &[u16],
        key_package_bytes: &[u8],
        verifying_key_bytes: &[u8],
        public_shares: &BTreeMap<u16, Vec<u8>>,
        message: Vec<u8>,
    ) -> Result<Self> {
        let key_package = frost::keys::KeyPackage::deserialize(key_package_bytes)
            .map_err(|e| CeremonyError::Encoding(format!("key package: {e}")))?;
        let verifying_key = frost::VerifyingKey::deserialize(verifying_key_bytes)
            .map_err(|e| CeremonyError::Encoding(format!("verifying key: {e}")))?;

        let mut verifying_shares = BTreeMap::new();
        for (party_id, bytes) in public_shares {
            let share = frost::keys::VerifyingShare::deserialize(bytes)
                .map_err(|e| CeremonyError::Encoding(format!("verifying share: {e}")))?;
            verifying_shares.insert(identifier(*party_id)?, share);
        }
        let public_key_package =
            frost::keys::PublicKeyPackage::new(verifying_shares, verifying_key);

        SignParty::new(me, parties, key_package, public_key_package, message)
    }

    /// The sorted quorum party ids.
    pub fn parties(&self) -> &[u16] {
        &self.parties
    }

    /// Produce our signature share once every commitment is in, then
    /// aggregate once every share is in.
    fn try_advance(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut outbound = Vec::new();

        if self.commitments.len() == self.parties.len() && self.signing_package.is_none() {
            let commitments = self
                .commitments
                .iter()
                .map(|(party, c)| Ok((identifier(*party)?, c.clone())))
                .collect::<Result<BTreeMap<_, _>>>()?;
            let signing_package = frost::SigningPackage::new(commitments, &self.message);

            let nonces = self
                .nonces
                .take()
                .ok_or_else(|| CeremonyError::Aborted("signing nonces consumed twice".into()))?;
            let share = frost::round2::sign(&signing_package, &nonces, &self.key_package)
                .map_err(|e| CeremonyError::Aborted(e.to_string()))?;

            let body = share.serialize();
            self.signing_package = Some(signing_package);
            self.shares.insert(self.me, share);
            outbound.push(Envelope::broadcast(PayloadKind::SignShare, self.me, body).to_bytes()?);
            tracing::debug!(quorum = self.parties.len(), "signing advanced to round 2");
        }

        if self.shares.len() == self.parties.len() && self.signature.is_none() {
            if let Some(signing_package) = &self.signing_package {
                let shares = self
                    .shares
                    .iter()
                    .map(|(party, s)| Ok((identifier(*party)?, s.clone())))
                    .collect::<Result<BTreeMap<_, _>>>()?;
                let signature =
                    frost::aggregate(signing_package, &shares, &self.public_key_package)
                        .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
                self.signature = Some(signature);
                tracing::debug!("signature aggregated");
            }
        }

        Ok(outbound)
    }

    /// Take the finished 64-byte Ed25519 signature.
    pub fn finish(self) -> Result<Vec<u8>> {
        let signature = self
            .signature
            .ok_or_else(|| CeremonyError::Aborted("signing is not complete".into()))?;
        signature
            .serialize()
            .map_err(|e| CeremonyError::Encoding(e.to_string()))
    }
}

impl Engine for SignParty {
    fn start(&mut self) -> Result<Vec<Vec<u8>>> {
        let (nonces, commitments) =
            frost::round1::commit(self.key_package.signing_share(), &mut OsRng);
        self.nonces = Some(nonces);

        let body = commitments
            .serialize()
            .map_err(|e| CeremonyError::Encoding(e.to_string()))?;
        self.commitments.insert(self.me, commitments);
        Ok(vec![
            Envelope::broadcast(PayloadKind::SignCommit, self.me, body).to_bytes()?,
        ])
    }

    fn handle(&mut self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        let envelope = Envelope::from_bytes(payload)?;
        if !envelope.is_for(self.me) {
            return Ok(Vec::new());
        }
        if !self.parties.contains(&envelope.from) {
            tracing::debug!(from = envelope.from, "ignoring envelope from outside the quorum");
            return Ok(Vec::new());
        }

        match envelope.kind {
            PayloadKind::SignCommit => {
                if self.commitments.contains_key(&envelope.from) {
                    return Ok(Vec::new());
                }
                let commitments =
                    frost::round1::SigningCommitments::deserialize(&envelope.body)
                        .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
                self.commitments.insert(envelope.from, commitments);
            }
            PayloadKind::SignShare => {
                if self.shares.contains_key(&envelope.from) {
                    return Ok(Vec::new());
                }
                let share = frost::round2::SignatureShare::deserialize(&envelope.body)
                    .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
                self.shares.insert(envelope.from, share);
            }
            PayloadKind::DkgRound1 | PayloadKind::DkgRound2 => {
                tracing::debug!("ignoring keygen payload during signing");
                return Ok(Vec::new());
            }
        }

        self.try_advance()
    }

    fn is_complete(&self) -> bool {
        self.signature.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dkg::tests::run_dkg;

    fn run_sign(quorum: &[u16], outputs: &[crate::dkg::DkgOutput], message: &[u8]) -> Vec<Vec<u8>> {
        // DKG outputs are indexed by party id minus one.
        let mut parties: Vec<SignParty> = quorum
            .iter()
            .map(|id| {
                let output = &outputs[usize::from(*id) - 1];
                SignParty::new(
                    *id,
                    quorum,
                    output.key_package.clone(),
                    output.public_key_package.clone(),
                    message.to_vec(),
                )
                .expect("new sign party")
            })
            .collect();

        let mut log: Vec<Vec<u8>> = Vec::new();
        let mut cursors = vec![0usize; parties.len()];

        for party in parties.iter_mut() {
            log.extend(party.start().expect("start"));
        }

        while parties.iter().any(|p| !p.is_complete()) {
            let mut progressed = false;
            for (i, party) in parties.iter_mut().enumerate() {
                while cursors[i] < log.len() {
                    let payload = log[cursors[i]].clone();
                    cursors[i] += 1;
                    let outbound = party.handle(&payload).expect("handle");
                    if !outbound.is_empty() {
                        progressed = true;
                    }
                    log.extend(outbound);
                }
            }
            assert!(
                progressed || parties.iter().all(|p| p.is_complete()),
                "signing stalled"
            );
        }

        parties
            .into_iter()
            .map(|p| p.finish().expect("finish"))
            .collect()
    }

    #[test]
    fn quorum_produces_one_valid_signature() {
        let outputs = run_dkg(3, 2);
        let message = b"threshold signing test";
        let signatures = run_sign(&[1, 2], &outputs, message);

        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].len(), 64);
        assert_eq!(signatures[0], signatures[1], "all members aggregate the same signature");

        let signature =
            frost_ed25519::Signature::deserialize(&signatures[0]).expect("parse signature");
        outputs[0]
            .public_key_package
            .verifying_key()
            .verify(message, &signature)
            .expect("signature verifies under the group key");
    }

    #[test]
    fn full_group_can_sign_too() {
        let outputs = run_dkg(3, 3);
        let signatures = run_sign(&[1, 2, 3], &outputs, b"all three");
        assert_eq!(signatures.len(), 3);
        assert_eq!(signatures[0], signatures[2]);
    }

    #[test]
    fn corrupt_share_aborts() {
        let outputs = run_dkg(2, 2);
        let mut party = SignParty::new(
            1,
            &[1, 2],
            outputs[0].key_package.clone(),
            outputs[0].public_key_package.clone(),
            b"message".to_vec(),
        )
        .expect("new sign party");
        party.start().expect("start");

        let bogus = Envelope::broadcast(PayloadKind::SignCommit, 2, vec![0xaa; 8])
            .to_bytes()
            .expect("envelope");
        assert!(matches!(party.handle(&bogus), Err(CeremonyError::Aborted(_))));
    }
}
