//! The distributed key generation engine.
//!
//! Drives one party through frost-ed25519's three-part DKG:
//!
//! 1. `part1` produces a commitment package, broadcast to everyone.
//! 2. Once all peer round-1 packages are in, `part2` produces one share
//!    package per peer, each addressed to its recipient.
//! 3. Once all round-2 packages addressed to this party are in, `part3`
//!    yields the key package and the group's public key package.
//!
//! The engine tolerates the relay's at-least-once delivery: duplicate
//! packages from a sender are ignored, and a round-2 package arriving before
//! the local round-1 set is complete is stashed until the engine catches up.

use std::collections::BTreeMap;

use frost_ed25519 as frost;
use frost_ed25519::keys::dkg::{part1, part2, part3, round1, round2};
use rand::rngs::OsRng;

use crate::envelope::{Envelope, PayloadKind};
use crate::{identifier, CeremonyError, Engine, Result};

/// What a completed DKG hands back to the driver.
pub struct DkgOutput {
    /// This party's long-lived key material (identifier, signing share,
    /// verifying share, group key, threshold).
    pub key_package: frost::keys::KeyPackage,
    /// The group verification key plus every party's verifying share.
    pub public_key_package: frost::keys::PublicKeyPackage,
    /// The sorted party ids that took part.
    pub parties: Vec<u16>,
}

impl DkgOutput {
    /// The 32-byte group verification key.
    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>> {
        self.public_key_package
            .verifying_key()
            .serialize()
            .map_err(|e| CeremonyError::Encoding(e.to_string()))
    }

    /// Serialized verifying share per party id, for the share record.
    pub fn public_share_bytes(&self) -> Result<BTreeMap<u16, Vec<u8>>> {
        let shares = self.public_key_package.verifying_shares();
        let mut out = BTreeMap::new();
        for &party_id in &self.parties {
            let id = identifier(party_id)?;
            let share = shares.get(&id).ok_or_else(|| {
                CeremonyError::Aborted(format!("no verifying share for party {party_id}"))
            })?;
            let bytes = share
                .serialize()
                .map_err(|e| CeremonyError::Encoding(e.to_string()))?;
            out.insert(party_id, bytes);
        }
        Ok(out)
    }

    /// This party's serialized key package, the plaintext of the share
    /// envelope.
    pub fn key_package_bytes(&self) -> Result<Vec<u8>> {
        self.key_package
            .serialize()
            .map_err(|e| CeremonyError::Encoding(e.to_string()))
    }
}

/// One party's view of a running DKG ceremony.
pub struct DkgParty {
    me: u16,
    parties: Vec<u16>,
    threshold: u16,
    round1_secret: Option<round1::SecretPackage>,
    round2_secret: Option<round2::SecretPackage>,
    round1_received: BTreeMap<u16, round1::Package>,
    round2_received: BTreeMap<u16, round2::Package>,
    output: Option<(frost::keys::KeyPackage, frost::keys::PublicKeyPackage)>,
}

impl DkgParty {
    /// Set up a DKG party.
    ///
    /// `parties` is the full party-id set including `me`; it is sorted and
    /// deduplicated here so callers can pass the poll response directly.
    pub fn new(me: u16, parties: &[u16], threshold: u16) -> Result<Self> {
        let mut parties = parties.to_vec();
        parties.sort_unstable();
        parties.dedup();
        if !parties.contains(&me) {
            return Err(CeremonyError::InvalidParty(me));
        }
        identifier(me)?;
        Ok(DkgParty {
            me,
            parties,
            threshold,
            round1_secret: None,
            round2_secret: None,
            round1_received: BTreeMap::new(),
            round2_received: BTreeMap::new(),
            output: None,
        })
    }

    fn peer_count(&self) -> usize {
        self.parties.len() - 1
    }

    /// Run part2 / part3 whenever their inputs are complete.
    fn try_advance(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut outbound = Vec::new();

        if self.round1_secret.is_some() && self.round1_received.len() == self.peer_count() {
            let secret = self
                .round1_secret
                .take()
                .ok_or_else(|| CeremonyError::Aborted("round-1 secret consumed twice".into()))?;
            let round1_packages = self.round1_packages_by_identifier()?;
            let (round2_secret, round2_packages) = part2(secret, &round1_packages)
                .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
            self.round2_secret = Some(round2_secret);

            for &peer in self.parties.iter().filter(|p| **p != self.me) {
                let id = identifier(peer)?;
                let package = round2_packages.get(&id).ok_or_else(|| {
                    CeremonyError::Aborted(format!("part2 produced no package for party {peer}"))
                })?;
                let body = package
                    .serialize()
                    .map_err(|e| CeremonyError::Encoding(e.to_string()))?;
                outbound.push(
                    Envelope::addressed(PayloadKind::DkgRound2, self.me, peer, body).to_bytes()?,
                );
            }
            tracing::debug!(parties = self.parties.len(), "DKG advanced to round 2");
        }

        if self.round2_secret.is_some()
            && self.round2_received.len() == self.peer_count()
            && self.output.is_none()
        {
            let round2_secret = self
                .round2_secret
                .as_ref()
                .ok_or_else(|| CeremonyError::Aborted("round-2 secret missing".into()))?;
            let round1_packages = self.round1_packages_by_identifier()?;
            let round2_packages = self.round2_packages_by_identifier()?;
            let (key_package, public_key_package) =
                part3(round2_secret, &round1_packages, &round2_packages)
                    .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
            self.output = Some((key_package, public_key_package));
            tracing::debug!("DKG complete");
        }

        Ok(outbound)
    }

    fn round1_packages_by_identifier(
        &self,
    ) -> Result<BTreeMap<frost::Identifier, round1::Package>> {
        self.round1_received
            .iter()
            .map(|(party, package)| Ok((identifier(*party)?, package.clone())))
            .collect()
    }

    fn round2_packages_by_identifier(
        &self,
    ) -> Result<BTreeMap<frost::Identifier, round2::Package>> {
        self.round2_received
            .iter()
            .map(|(party, package)| Ok((identifier(*party)?, package.clone())))
            .collect()
    }

    /// Take the finished output.
    pub fn finish(self) -> Result<DkgOutput> {
        let (key_package, public_key_package) = self
            .output
            .ok_or_else(|| CeremonyError::Aborted("DKG is not complete".into()))?;
        Ok(DkgOutput {
            key_package,
            public_key_package,
            parties: self.parties,
        })
    }
}

impl Engine for DkgParty {
    fn start(&mut self) -> Result<Vec<Vec<u8>>> {
        let (secret, package) = part1(
            identifier(self.me)?,
            self.parties.len() as u16,
            self.threshold,
            OsRng,
        )
        .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
        self.round1_secret = Some(secret);

        let body = package
            .serialize()
            .map_err(|e| CeremonyError::Encoding(e.to_string()))?;
        Ok(vec![
            Envelope::broadcast(PayloadKind::DkgRound1, self.me, body).to_bytes()?,
        ])
    }

    fn handle(&mut self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        let envelope = Envelope::from_bytes(payload)?;
        if !envelope.is_for(self.me) {
            return Ok(Vec::new());
        }
        if !self.parties.contains(&envelope.from) {
            // A stray sender is not part of this ceremony; the log carries it
            // but the engine has nothing to do with it.
            tracing::debug!(from = envelope.from, "ignoring envelope from non-member");
            return Ok(Vec::new());
        }

        match envelope.kind {
            PayloadKind::DkgRound1 => {
                if self.round1_received.contains_key(&envelope.from) {
                    return Ok(Vec::new());
                }
                let package = round1::Package::deserialize(&envelope.body)
                    .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
                self.round1_received.insert(envelope.from, package);
            }
            PayloadKind::DkgRound2 => {
                if self.round2_received.contains_key(&envelope.from) {
                    return Ok(Vec::new());
                }
                let package = round2::Package::deserialize(&envelope.body)
                    .map_err(|e| CeremonyError::Aborted(e.to_string()))?;
                self.round2_received.insert(envelope.from, package);
            }
            PayloadKind::SignCommit | PayloadKind::SignShare => {
                tracing::debug!("ignoring signing payload during keygen");
                return Ok(Vec::new());
            }
        }

        self.try_advance()
    }

    fn is_complete(&self) -> bool {
        self.output.is_some()
    }
}
