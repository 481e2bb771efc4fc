// Copyright 2025 Chainflip Labs GmbH
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Concurrent signing sessions run against one completed keygen. Each
//! session shares read-only access to the DKG's joint public key and
//! commitment vectors; none of it mutates or depends on another session.

use std::collections::{BTreeMap, BTreeSet};

use super::{state_error, Coordinator};
use crate::{
	crypto::{self, Point, Scalar, Signature},
	error::{Result, ThresholdError},
	types::{CommitOpen, EphShareBundle, LocalSigReport},
	PartyIndex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigningSessionId(u64);

enum SigningPhase {
	Opened,
	RegistrationsCollected { r_of: BTreeMap<PartyIndex, Point> },
	CommitmentsCollected { r_of: BTreeMap<PartyIndex, Point>, opens: BTreeMap<PartyIndex, CommitOpen> },
	Ready { r_of: BTreeMap<PartyIndex, Point>, joint_nonce: Point, eph_commitment_vectors: BTreeMap<PartyIndex, Vec<Point>> },
	Done { signature: Signature },
}

impl SigningPhase {
	fn name(&self) -> &'static str {
		match self {
			SigningPhase::Opened => "Opened",
			SigningPhase::RegistrationsCollected { .. } => "RegistrationsCollected",
			SigningPhase::CommitmentsCollected { .. } => "CommitmentsCollected",
			SigningPhase::Ready { .. } => "Ready",
			SigningPhase::Done { .. } => "Done",
		}
	}
}

pub(super) struct SigningSession {
	threshold: u32,
	message: Vec<u8>,
	subset: BTreeSet<PartyIndex>,
	joint_public_key: Point,
	dkg_commitment_vectors: BTreeMap<PartyIndex, Vec<Point>>,
	phase: SigningPhase,
}

impl Coordinator {
	fn session(&self, id: SigningSessionId) -> Result<&SigningSession> {
		self.signing_sessions
			.get(&id)
			.ok_or_else(|| ThresholdError::StateError(format!("unknown signing session {id:?}")))
	}

	fn session_mut(&mut self, id: SigningSessionId) -> Result<&mut SigningSession> {
		self.signing_sessions
			.get_mut(&id)
			.ok_or_else(|| ThresholdError::StateError(format!("unknown signing session {id:?}")))
	}

	/// The threshold this signing session was opened with.
	pub fn signing_threshold(&self, id: SigningSessionId) -> Result<u32> {
		Ok(self.session(id)?.threshold)
	}

	/// The 0-based protocol indices of the parties participating in this
	/// signing session, ascending.
	pub fn signing_subset(&self, id: SigningSessionId) -> Result<BTreeSet<PartyIndex>> {
		Ok(self.session(id)?.subset.clone())
	}

	/// Opens a signing session over `message` with the named parties, who
	/// must already have an assigned index and number at least `threshold`.
	pub fn start_signing<S: AsRef<str>>(
		&mut self,
		message: impl Into<Vec<u8>>,
		signing_party_ids: &[S],
	) -> Result<SigningSessionId> {
		let (threshold, joint_public_key, dkg_commitment_vectors) = self.ready_snapshot()?;

		if signing_party_ids.len() < threshold as usize {
			return Err(ThresholdError::InsufficientSigners {
				got: signing_party_ids.len(),
				needed: threshold as usize,
			});
		}

		let mut subset = BTreeSet::new();
		for id in signing_party_ids {
			let idx = self
				.index_of
				.get(id.as_ref())
				.copied()
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{}`", id.as_ref())))?;
			subset.insert(idx);
		}
		if subset.len() != signing_party_ids.len() {
			return Err(ThresholdError::InvalidInput("duplicate party id in signing set".into()));
		}

		let session = SigningSession {
			threshold,
			message: message.into(),
			subset,
			joint_public_key,
			dkg_commitment_vectors,
			phase: SigningPhase::Opened,
		};

		let id = SigningSessionId(self.next_signing_session);
		self.next_signing_session += 1;
		tracing::info!(?id, threshold, "signing session opened");
		self.signing_sessions.insert(id, session);
		Ok(id)
	}

	/// Collects each signer's ephemeral nonce commitment point `R_i`
	/// (the output of `PartyAgent::open_signing`).
	pub fn collect_eph_registrations(&mut self, id: SigningSessionId, r_points: BTreeMap<String, Point>) -> Result<()> {
		let subset = {
			let session = self.session(id)?;
			match &session.phase {
				SigningPhase::Opened => {},
				other => return Err(state_error("collect_eph_registrations", other.name())),
			}
			session.subset.clone()
		};

		if r_points.len() != subset.len() {
			return Err(ThresholdError::InvalidInput(format!(
				"expected {} ephemeral registrations, got {}",
				subset.len(),
				r_points.len()
			)));
		}

		let mut r_of = BTreeMap::new();
		for (party_id, r_i) in r_points {
			let idx = *self
				.index_of
				.get(&party_id)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{party_id}`")))?;
			if !subset.contains(&idx) {
				return Err(ThresholdError::InvalidInput(format!("party {idx} is not part of this signing session")));
			}
			r_of.insert(idx, r_i);
		}

		self.session_mut(id)?.phase = SigningPhase::RegistrationsCollected { r_of };
		Ok(())
	}

	/// Collects each signer's `(R_i, blind)` commitment opening and returns
	/// the packet each needs for `PartyAgent::eph_distribute`.
	pub fn collect_eph_commitments(
		&mut self,
		id: SigningSessionId,
		opens: BTreeMap<String, CommitOpen>,
	) -> Result<BTreeMap<PartyIndex, (Point, CommitOpen)>> {
		let r_of = {
			let session = self.session(id)?;
			match &session.phase {
				SigningPhase::RegistrationsCollected { r_of } => r_of.clone(),
				other => return Err(state_error("collect_eph_commitments", other.name())),
			}
		};

		if opens.len() != r_of.len() {
			return Err(ThresholdError::InvalidInput(format!(
				"expected {} commitment openings, got {}",
				r_of.len(),
				opens.len()
			)));
		}

		let mut opens_by_index = BTreeMap::new();
		for (party_id, open) in &opens {
			let idx = *self
				.index_of
				.get(party_id)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{party_id}`")))?;
			opens_by_index.insert(idx, *open);
		}

		let packet: BTreeMap<PartyIndex, (Point, CommitOpen)> =
			r_of.iter().map(|(&idx, &r)| (idx, (r, opens_by_index[&idx]))).collect();

		self.session_mut(id)?.phase = SigningPhase::CommitmentsCollected { r_of, opens: opens_by_index };
		Ok(packet)
	}

	/// Collects each signer's ephemeral VSS commitment vector and outgoing
	/// shares, returns each recipient's `construct_eph` input, and derives
	/// the joint nonce `R = Σ R_j`.
	pub fn collect_eph_shares(
		&mut self,
		id: SigningSessionId,
		bundles: BTreeMap<String, EphShareBundle>,
	) -> Result<BTreeMap<PartyIndex, (BTreeMap<PartyIndex, Point>, BTreeMap<PartyIndex, Scalar>, BTreeMap<PartyIndex, Vec<Point>>)>>
	{
		let (subset, r_of) = {
			let session = self.session(id)?;
			let r_of = match &session.phase {
				SigningPhase::CommitmentsCollected { r_of, .. } => r_of.clone(),
				other => return Err(state_error("collect_eph_shares", other.name())),
			};
			(session.subset.clone(), r_of)
		};

		if bundles.len() != subset.len() {
			return Err(ThresholdError::InvalidInput(format!(
				"expected {} ephemeral share bundles, got {}",
				subset.len(),
				bundles.len()
			)));
		}

		let mut eph_commitment_vectors = BTreeMap::new();
		let mut shares_by_sender: BTreeMap<PartyIndex, BTreeMap<PartyIndex, Scalar>> = BTreeMap::new();
		for (party_id, bundle) in bundles {
			let idx = *self
				.index_of
				.get(&party_id)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{party_id}`")))?;
			eph_commitment_vectors.insert(idx, bundle.commitment_vector);
			shares_by_sender.insert(idx, bundle.shares);
		}

		let mut packets = BTreeMap::new();
		for &recipient in &subset {
			let shares_received: BTreeMap<PartyIndex, Scalar> = shares_by_sender
				.iter()
				.map(|(&sender, shares)| {
					shares.get(&recipient).copied().map(|s| (sender, s)).ok_or_else(|| {
						ThresholdError::InvalidInput(format!(
							"party {sender} sent no ephemeral share for recipient {recipient}"
						))
					})
				})
				.collect::<Result<_>>()?;
			packets.insert(recipient, (r_of.clone(), shares_received, eph_commitment_vectors.clone()));
		}

		let joint_nonce: Point = r_of.values().copied().sum();
		self.session_mut(id)?.phase = SigningPhase::Ready { r_of, joint_nonce, eph_commitment_vectors };
		Ok(packets)
	}

	/// Collects each signer's `(gamma_i, k_i)` local signature report,
	/// checks challenge agreement, publicly verifies each share against the
	/// DKG commitment vectors, aggregates, and verifies the final signature.
	pub fn collect_local_sigs(
		&mut self,
		id: SigningSessionId,
		reports: BTreeMap<String, LocalSigReport>,
	) -> Result<Signature> {
		let message = self.session(id)?.message.clone();
		let subset = self.session(id)?.subset.clone();
		let joint_public_key = self.session(id)?.joint_public_key;
		let dkg_commitment_vectors = self.session(id)?.dkg_commitment_vectors.clone();

		let (r_of, joint_nonce) = {
			let session = self.session(id)?;
			match &session.phase {
				SigningPhase::Ready { r_of, joint_nonce, .. } => (r_of.clone(), *joint_nonce),
				other => return Err(state_error("collect_local_sigs", other.name())),
			}
		};

		if reports.len() != subset.len() {
			return Err(ThresholdError::InvalidInput(format!(
				"expected {} local signature reports, got {}",
				subset.len(),
				reports.len()
			)));
		}

		let mut gamma_of = BTreeMap::new();
		let mut k_of = BTreeMap::new();
		for (party_id, report) in reports {
			let idx = *self
				.index_of
				.get(&party_id)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{party_id}`")))?;
			gamma_of.insert(idx, report.gamma_i);
			k_of.insert(idx, report.k);
		}

		let distinct_ks: BTreeSet<[u8; 32]> = k_of.values().map(|k| k.to_bytes()).collect();
		if distinct_ks.len() != 1 {
			return Err(ThresholdError::InconsistentInput("signers do not agree on the challenge k".into()));
		}
		let k = *k_of.values().next().expect("k_of is non-empty: checked against the signing subset above");

		let subset_1based: BTreeSet<u32> = subset.iter().map(|idx| idx + 1).collect();
		for &idx in &subset {
			let lambda_i = crypto::lagrange_coefficient(idx + 1, &subset_1based);
			let x_i_point = crypto::public_share_point(&dkg_commitment_vectors, idx);
			let r_i = r_of[&idx];
			let gamma_i = gamma_of[&idx];
			if !crypto::verify_local_sig(&gamma_i, &r_i, &k, &lambda_i, &x_i_point) {
				tracing::warn!(offender = idx, "local signature share failed public verification");
				return Err(ThresholdError::ProtocolFailure {
					party_index: idx,
					reason: "local signature share does not satisfy the public verification equation".into(),
				});
			}
		}

		let s = crypto::aggregate(gamma_of.values().copied());
		let signature = Signature { r: joint_nonce, s };

		if !crypto::verify_ed25519(&signature, &message, &joint_public_key) {
			return Err(ThresholdError::InternalInvariantFailure(
				"aggregated signature failed Ed25519 verification despite all local checks passing".into(),
			));
		}
		crypto::verify_with_reference_impl(&signature, &message, &joint_public_key).map_err(|_| {
			ThresholdError::InternalInvariantFailure(
				"aggregated signature was rejected by the independent Ed25519 reference verifier".into(),
			)
		})?;

		tracing::info!(?id, "signing session complete");
		self.session_mut(id)?.phase = SigningPhase::Done { signature };
		Ok(signature)
	}
}
