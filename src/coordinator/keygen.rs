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

//! The coordinator's keygen session: registration, commitment collection,
//! share collection and final joint-key agreement.

use std::collections::{BTreeMap, BTreeSet};

use super::{state_error, Coordinator};
use crate::{
	crypto::{Point, Scalar},
	error::{Result, ThresholdError},
	types::{CommitOpen, ShareBundle, SharedKeyReport},
	PartyIndex,
};

pub(super) enum KeygenState {
	Idle,
	Registering { threshold: u32, n: u32, y_of: BTreeMap<String, Point> },
	Registered { threshold: u32, n: u32, y_of: BTreeMap<PartyIndex, Point> },
	CommitmentsCollected { threshold: u32, n: u32, y_of: BTreeMap<PartyIndex, Point>, opens: BTreeMap<PartyIndex, CommitOpen> },
	SharesCollected {
		threshold: u32,
		n: u32,
		y_of: BTreeMap<PartyIndex, Point>,
		commitment_vectors: BTreeMap<PartyIndex, Vec<Point>>,
	},
	Ready {
		threshold: u32,
		joint_public_key: Point,
		commitment_vectors: BTreeMap<PartyIndex, Vec<Point>>,
	},
}

impl KeygenState {
	fn name(&self) -> &'static str {
		match self {
			KeygenState::Idle => "Idle",
			KeygenState::Registering { .. } => "Registering",
			KeygenState::Registered { .. } => "Registered",
			KeygenState::CommitmentsCollected { .. } => "CommitmentsCollected",
			KeygenState::SharesCollected { .. } => "SharesCollected",
			KeygenState::Ready { .. } => "Ready",
		}
	}
}

impl Coordinator {
	/// Opens a new keygen session, discarding any prior keygen and signing
	/// state. Fails unless `2 <= threshold <= n`.
	pub fn start_keygen(&mut self, threshold: u32, n: u32) -> Result<()> {
		if threshold < 2 || threshold > n {
			return Err(ThresholdError::InvalidInput(format!(
				"threshold must satisfy 2 <= t <= n (got t={threshold}, n={n})"
			)));
		}
		tracing::info!(threshold, n, "keygen session opened");
		self.index_of.clear();
		self.signing_sessions.clear();
		self.keygen = KeygenState::Registering { threshold, n, y_of: BTreeMap::new() };
		Ok(())
	}

	/// Records `party_id`'s public key `y_i`. Once all `n` parties have
	/// registered, assigns protocol indices by a stable lexicographic sort
	/// of the registered ids — the coordinator never trusts a caller-chosen
	/// index.
	pub fn register_party(&mut self, party_id: impl Into<String>, y_i: Point) -> Result<()> {
		let party_id = party_id.into();
		let (threshold, n, mut y_of) = match &self.keygen {
			KeygenState::Registering { threshold, n, y_of } => (*threshold, *n, y_of.clone()),
			other => return Err(state_error("register_party", other.name())),
		};

		if y_of.contains_key(&party_id) {
			return Err(ThresholdError::InvalidInput(format!("duplicate party id `{party_id}`")));
		}
		if y_of.len() as u32 >= n {
			return Err(ThresholdError::InvalidInput("registration is already closed".into()));
		}
		y_of.insert(party_id, y_i);

		if y_of.len() as u32 == n {
			// BTreeMap<String, _> already iterates in lexicographic order.
			let index_of: BTreeMap<String, PartyIndex> =
				y_of.keys().cloned().enumerate().map(|(idx, id)| (id, idx as PartyIndex)).collect();
			let y_by_index: BTreeMap<PartyIndex, Point> =
				y_of.iter().map(|(id, &y)| (index_of[id], y)).collect();
			tracing::debug!(n, "registration complete, protocol indices assigned");
			self.index_of = index_of;
			self.keygen = KeygenState::Registered { threshold, n, y_of: y_by_index };
		} else {
			self.keygen = KeygenState::Registering { threshold, n, y_of };
		}
		Ok(())
	}

	/// Collects every party's `(y_i, blind)` commitment opening and returns
	/// the packet each party needs for `PartyAgent::distribute_shares`.
	pub fn collect_commitments(
		&mut self,
		opens: BTreeMap<String, CommitOpen>,
	) -> Result<BTreeMap<PartyIndex, (Point, CommitOpen)>> {
		let (threshold, n, y_of) = match &self.keygen {
			KeygenState::Registered { threshold, n, y_of } => (*threshold, *n, y_of.clone()),
			other => return Err(state_error("collect_commitments", other.name())),
		};

		if opens.len() as u32 != n {
			return Err(ThresholdError::InvalidInput(format!(
				"expected {n} commitment openings, got {}",
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
			y_of.iter().map(|(&idx, &y)| (idx, (y, opens_by_index[&idx]))).collect();

		self.keygen = KeygenState::CommitmentsCollected { threshold, n, y_of, opens: opens_by_index };
		Ok(packet)
	}

	/// Collects every party's VSS commitment vector and outgoing shares,
	/// returning each recipient's `construct_shared` input: `(y_js,
	/// shares_received, commitment_vectors)`.
	pub fn collect_shares(
		&mut self,
		bundles: BTreeMap<String, ShareBundle>,
	) -> Result<BTreeMap<PartyIndex, (BTreeMap<PartyIndex, Point>, BTreeMap<PartyIndex, Scalar>, BTreeMap<PartyIndex, Vec<Point>>)>>
	{
		let (threshold, n, y_of) = match &self.keygen {
			KeygenState::CommitmentsCollected { threshold, n, y_of, .. } => (*threshold, *n, y_of.clone()),
			other => return Err(state_error("collect_shares", other.name())),
		};

		if bundles.len() as u32 != n {
			return Err(ThresholdError::InvalidInput(format!("expected {n} share bundles, got {}", bundles.len())));
		}

		let mut commitment_vectors = BTreeMap::new();
		let mut shares_by_sender: BTreeMap<PartyIndex, BTreeMap<PartyIndex, Scalar>> = BTreeMap::new();
		for (party_id, bundle) in bundles {
			let idx = *self
				.index_of
				.get(&party_id)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{party_id}`")))?;
			commitment_vectors.insert(idx, bundle.commitment_vector);
			shares_by_sender.insert(idx, bundle.shares);
		}

		let mut packets = BTreeMap::new();
		for &recipient in y_of.keys() {
			let shares_received: BTreeMap<PartyIndex, Scalar> = shares_by_sender
				.iter()
				.map(|(&sender, shares)| {
					shares.get(&recipient).copied().map(|s| (sender, s)).ok_or_else(|| {
						ThresholdError::InvalidInput(format!("party {sender} sent no share for recipient {recipient}"))
					})
				})
				.collect::<Result<_>>()?;
			packets.insert(recipient, (y_of.clone(), shares_received, commitment_vectors.clone()));
		}

		self.keygen = KeygenState::SharesCollected { threshold, n, y_of, commitment_vectors };
		Ok(packets)
	}

	/// Collects each party's reported view of the joint key, checks they
	/// all agree both on `Y` and on their own `y_i` (catching a party that
	/// silently summed the wrong set of public keys), then closes the
	/// keygen session.
	pub fn collect_shared_keys(&mut self, reports: BTreeMap<String, SharedKeyReport>) -> Result<Point> {
		let (threshold, y_of, commitment_vectors) = match &self.keygen {
			KeygenState::SharesCollected { threshold, y_of, commitment_vectors, .. } =>
				(*threshold, y_of.clone(), commitment_vectors.clone()),
			other => return Err(state_error("collect_shared_keys", other.name())),
		};

		if reports.len() != y_of.len() {
			return Err(ThresholdError::InvalidInput(format!(
				"expected {} joint-key reports, got {}",
				y_of.len(),
				reports.len()
			)));
		}

		for (party_id, report) in &reports {
			let idx = *self
				.index_of
				.get(party_id)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("unknown party id `{party_id}`")))?;
			if y_of[&idx] != report.y_i {
				return Err(ThresholdError::InconsistentInput(format!(
					"party {idx} reported a y_i inconsistent with its registration"
				)));
			}
		}

		let distinct: BTreeSet<[u8; 32]> = reports.values().map(|r| r.joint_public_key.to_bytes()).collect();
		if distinct.len() != 1 {
			return Err(ThresholdError::InconsistentInput("parties do not agree on the joint public key Y".into()));
		}
		let joint_public_key = reports
			.values()
			.next()
			.expect("reports is non-empty: checked against y_of.len() >= 2 above")
			.joint_public_key;

		tracing::info!(joint_public_key = ?joint_public_key, "keygen session complete");
		self.keygen = KeygenState::Ready { threshold, joint_public_key, commitment_vectors };
		Ok(joint_public_key)
	}

	pub fn threshold(&self) -> Option<u32> {
		match &self.keygen {
			KeygenState::Idle => None,
			KeygenState::Registering { threshold, .. }
			| KeygenState::Registered { threshold, .. }
			| KeygenState::CommitmentsCollected { threshold, .. }
			| KeygenState::SharesCollected { threshold, .. }
			| KeygenState::Ready { threshold, .. } => Some(*threshold),
		}
	}

	pub fn joint_public_key(&self) -> Option<Point> {
		match &self.keygen {
			KeygenState::Ready { joint_public_key, .. } => Some(*joint_public_key),
			_ => None,
		}
	}

	/// Everything a new signing session needs from a completed keygen.
	pub(super) fn ready_snapshot(&self) -> Result<(u32, Point, BTreeMap<PartyIndex, Vec<Point>>)> {
		match &self.keygen {
			KeygenState::Ready { threshold, joint_public_key, commitment_vectors } =>
				Ok((*threshold, *joint_public_key, commitment_vectors.clone())),
			other => Err(state_error("start_signing", other.name())),
		}
	}
}
