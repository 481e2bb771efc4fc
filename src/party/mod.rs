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

//! The per-party state machine. A [`PartyAgent`] holds one
//! party's long-lived key material across the DKG, plus zero or more
//! concurrent ephemeral signing sessions, each addressed by an opaque
//! [`SigningHandle`]. At most one operation runs on an agent at a time;
//! callers (typically a [`crate::coordinator::Coordinator`]) are expected
//! to serialize calls into a given agent, e.g. behind a per-agent lock.

use std::collections::{BTreeMap, BTreeSet};

use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::{
	crypto::{
		self, commit, random_blind, verify_commitment, verify_share, Blind, EphemeralKey, LongLivedKey, Point,
		Scalar, VssOutput,
	},
	error::{Result, ThresholdError},
	types::CommitOpen,
	PartyIndex,
};

/// An opaque handle identifying one signing session on a given agent,
/// returned by [`PartyAgent::open_signing`]. Not exchanged on the wire;
/// callers (the coordinator) use it purely to address subsequent calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigningHandle(u64);

/// This party's share of the joint private key, plus the data needed to
/// derive ephemeral signing nonces. `x_i` and `prefix` are zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SharedKey {
	#[zeroize(skip)]
	pub party_index: PartyIndex,
	pub x_i: Scalar,
	#[zeroize(skip)]
	pub joint_public_key: Point,
	pub prefix: [u8; 32],
}

impl std::fmt::Debug for SharedKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SharedKey")
			.field("party_index", &self.party_index)
			.field("joint_public_key", &self.joint_public_key)
			.finish_non_exhaustive()
	}
}

/// This party's share of the joint per-message nonce scalar, plus the
/// aggregate nonce point `R` (identical across all signing participants).
#[derive(Clone, ZeroizeOnDrop)]
pub struct EphemeralSharedKey {
	pub rho_i: Scalar,
	#[zeroize(skip)]
	pub joint_nonce: Point,
}

impl std::fmt::Debug for EphemeralSharedKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EphemeralSharedKey").field("joint_nonce", &self.joint_nonce).finish_non_exhaustive()
	}
}

enum LongLivedState {
	Init,
	Registered(LongLivedKey),
	Committed { key: LongLivedKey, blind: Blind },
	Distributed { key: LongLivedKey, commitment_vector: Vec<Point>, outgoing_shares: BTreeMap<PartyIndex, Scalar> },
	Ready(SharedKey),
}

impl LongLivedState {
	fn name(&self) -> &'static str {
		match self {
			LongLivedState::Init => "Init",
			LongLivedState::Registered(_) => "Registered",
			LongLivedState::Committed { .. } => "Committed",
			LongLivedState::Distributed { .. } => "Distributed",
			LongLivedState::Ready(_) => "Ready",
		}
	}
}

enum EphemeralPhase {
	Registered(EphemeralKey),
	Committed { key: EphemeralKey, blind: Blind },
	Distributed { key: EphemeralKey, commitment_vector: Vec<Point>, outgoing_shares: BTreeMap<PartyIndex, Scalar> },
	Ready(EphemeralSharedKey),
	Signed,
}

impl EphemeralPhase {
	fn name(&self) -> &'static str {
		match self {
			EphemeralPhase::Registered(_) => "EphRegistered",
			EphemeralPhase::Committed { .. } => "EphCommitted",
			EphemeralPhase::Distributed { .. } => "EphDistributed",
			EphemeralPhase::Ready(_) => "EphReady",
			EphemeralPhase::Signed => "Signed",
		}
	}
}

struct EphemeralSession {
	phase: EphemeralPhase,
	/// The signing subset `S` (0-based party indices), fixed once at
	/// `eph_distribute` and consulted again at `local_sig` to compute `λ_i`.
	signer_subset: Option<BTreeSet<PartyIndex>>,
}

fn state_error(op: &str, state: &str) -> ThresholdError {
	ThresholdError::StateError(format!("`{op}` invoked while party is in state `{state}`"))
}

pub struct PartyAgent {
	party_index: PartyIndex,
	state: LongLivedState,
	sessions: BTreeMap<SigningHandle, EphemeralSession>,
	next_handle: u64,
}

impl PartyAgent {
	pub fn new(party_index: PartyIndex) -> Self {
		PartyAgent { party_index, state: LongLivedState::Init, sessions: BTreeMap::new(), next_handle: 0 }
	}

	pub fn party_index(&self) -> PartyIndex {
		self.party_index
	}

	/// The joint key, once keygen has completed (`Ready`).
	pub fn shared_key(&self) -> Option<&SharedKey> {
		match &self.state {
			LongLivedState::Ready(shared) => Some(shared),
			_ => None,
		}
	}

	/// Creates the party's `LongLivedKey` and returns its public point `y_i`.
	pub fn register(&mut self, rng: &mut impl RngCore) -> Result<Point> {
		if !matches!(self.state, LongLivedState::Init) {
			return Err(state_error("register", self.state.name()));
		}
		let key = LongLivedKey::create(self.party_index, rng);
		let y_i = key.y;
		tracing::debug!(party_index = self.party_index, "long-lived key registered");
		self.state = LongLivedState::Registered(key);
		Ok(y_i)
	}

	/// Commits to `y_i` with a fresh blind: `c_i = H256(y_i ‖ b_i)`.
	pub fn commit(&mut self, rng: &mut impl RngCore) -> Result<CommitOpen> {
		let key = match std::mem::replace(&mut self.state, LongLivedState::Init) {
			LongLivedState::Registered(key) => key,
			other => {
				let name = other.name();
				self.state = other;
				return Err(state_error("commit", name));
			},
		};
		let blind = random_blind(rng);
		let commitment = commit(&key.y, &blind);
		self.state = LongLivedState::Committed { key, blind };
		Ok(CommitOpen { commitment, blind })
	}

	/// Verifies every peer's opened commitment, then shares this party's
	/// secret `a_i` via Feldman VSS across all `n` parties with threshold `t`.
	pub fn distribute_shares(
		&mut self,
		rng: &mut impl RngCore,
		threshold: u32,
		n: u32,
		peer_opens: &BTreeMap<PartyIndex, (Point, CommitOpen)>,
	) -> Result<(Vec<Point>, BTreeMap<PartyIndex, Scalar>)> {
		let key = match std::mem::replace(&mut self.state, LongLivedState::Init) {
			LongLivedState::Committed { key, .. } => key,
			other => {
				let name = other.name();
				self.state = other;
				return Err(state_error("distribute_shares", name));
			},
		};

		for (&j, (y_j, open)) in peer_opens {
			if j == self.party_index {
				continue;
			}
			if !verify_commitment(y_j, &open.blind, &open.commitment) {
				tracing::warn!(offender = j, "commitment opening failed during distribute_shares");
				return Err(ThresholdError::ProtocolFailure {
					party_index: j,
					reason: "commitment to y_j does not match the opened (y_j, blind)".into(),
				});
			}
		}

		let recipients: Vec<PartyIndex> = (0..n).collect();
		let VssOutput { commitments, shares } = crypto::share(rng, &key.a, threshold, &recipients);

		tracing::debug!(party_index = self.party_index, "VSS shares generated for {} recipients", n);
		self.state = LongLivedState::Distributed {
			key,
			commitment_vector: commitments.clone(),
			outgoing_shares: shares.clone(),
		};
		Ok((commitments, shares))
	}

	/// Verifies every received share against its distributor's commitment
	/// vector, then folds them into this party's secret share `x_i`.
	pub fn construct_shared(
		&mut self,
		y_js: &BTreeMap<PartyIndex, Point>,
		shares_received: &BTreeMap<PartyIndex, Scalar>,
		commitment_vectors: &BTreeMap<PartyIndex, Vec<Point>>,
	) -> Result<SharedKey> {
		let key = match std::mem::replace(&mut self.state, LongLivedState::Init) {
			LongLivedState::Distributed { key, .. } => key,
			other => {
				let name = other.name();
				self.state = other;
				return Err(state_error("construct_shared", name));
			},
		};

		for (&j, commitment_vector) in commitment_vectors {
			let share = shares_received.get(&j).ok_or_else(|| {
				ThresholdError::InvalidInput(format!("missing share from party {j}"))
			})?;
			if !verify_share(commitment_vector, self.party_index, share) {
				tracing::warn!(offender = j, "VSS share failed verification during construct_shared");
				return Err(ThresholdError::ProtocolFailure {
					party_index: j,
					reason: "received share does not match the distributor's commitment vector".into(),
				});
			}
		}

		let x_i: Scalar = shares_received.values().copied().sum();
		let joint_public_key: Point = y_js.values().copied().sum();

		let shared = SharedKey { party_index: self.party_index, x_i, joint_public_key, prefix: key.prefix };
		tracing::debug!(party_index = self.party_index, "keygen complete, joint key constructed");
		self.state = LongLivedState::Ready(shared.clone());
		Ok(shared)
	}

	/// Derives this party's ephemeral nonce key for `message` and opens a new
	/// signing session, returning its public commitment `R_i` and a handle
	/// for subsequent calls.
	pub fn open_signing(&mut self, message: &[u8]) -> Result<(SigningHandle, Point)> {
		let shared = match &self.state {
			LongLivedState::Ready(shared) => shared,
			other => return Err(state_error("open_signing", other.name())),
		};

		let eph_key = EphemeralKey::derive(self.party_index, &shared.prefix, message);
		let r_i = eph_key.r_point;

		let handle = SigningHandle(self.next_handle);
		self.next_handle += 1;
		self.sessions.insert(handle, EphemeralSession { phase: EphemeralPhase::Registered(eph_key), signer_subset: None });

		tracing::debug!(party_index = self.party_index, ?handle, "ephemeral signing session opened");
		Ok((handle, r_i))
	}

	fn session_mut(&mut self, handle: SigningHandle) -> Result<&mut EphemeralSession> {
		self.sessions
			.get_mut(&handle)
			.ok_or_else(|| ThresholdError::StateError(format!("unknown signing session {handle:?}")))
	}

	/// Commits to `R_i` with a fresh blind.
	pub fn eph_commit(&mut self, rng: &mut impl RngCore, handle: SigningHandle) -> Result<CommitOpen> {
		let session = self.session_mut(handle)?;
		let key = match std::mem::replace(&mut session.phase, EphemeralPhase::Signed) {
			EphemeralPhase::Registered(key) => key,
			other => {
				let name = other.name();
				session.phase = other;
				return Err(state_error("eph_commit", name));
			},
		};
		let blind = random_blind(rng);
		let commitment = commit(&key.r_point, &blind);
		session.phase = EphemeralPhase::Committed { key, blind };
		Ok(CommitOpen { commitment, blind })
	}

	/// Verifies peer commitment openings for `R_j`, then VSS-shares this
	/// party's ephemeral scalar `r_i` across the signing subset `S`.
	pub fn eph_distribute(
		&mut self,
		rng: &mut impl RngCore,
		handle: SigningHandle,
		threshold: u32,
		signer_subset: &BTreeSet<PartyIndex>,
		peer_opens: &BTreeMap<PartyIndex, (Point, CommitOpen)>,
	) -> Result<(Vec<Point>, BTreeMap<PartyIndex, Scalar>)> {
		let party_index = self.party_index;
		let session = self.session_mut(handle)?;
		let key = match std::mem::replace(&mut session.phase, EphemeralPhase::Signed) {
			EphemeralPhase::Committed { key, .. } => key,
			other => {
				let name = other.name();
				session.phase = other;
				return Err(state_error("eph_distribute", name));
			},
		};

		for (&j, (r_j, open)) in peer_opens {
			if j == party_index {
				continue;
			}
			if !verify_commitment(r_j, &open.blind, &open.commitment) {
				tracing::warn!(offender = j, "ephemeral commitment opening failed during eph_distribute");
				return Err(ThresholdError::ProtocolFailure {
					party_index: j,
					reason: "commitment to R_j does not match the opened (R_j, blind)".into(),
				});
			}
		}

		let recipients: Vec<PartyIndex> = signer_subset.iter().copied().collect();
		let VssOutput { commitments, shares } = crypto::share(rng, &key.r, threshold, &recipients);

		session.signer_subset = Some(signer_subset.clone());
		session.phase = EphemeralPhase::Distributed {
			key,
			commitment_vector: commitments.clone(),
			outgoing_shares: shares.clone(),
		};
		Ok((commitments, shares))
	}

	/// Verifies received ephemeral shares, then folds them into this
	/// party's nonce share `rho_i` and the aggregate nonce `R`.
	pub fn construct_eph(
		&mut self,
		handle: SigningHandle,
		r_js: &BTreeMap<PartyIndex, Point>,
		shares_received: &BTreeMap<PartyIndex, Scalar>,
		commitment_vectors: &BTreeMap<PartyIndex, Vec<Point>>,
	) -> Result<EphemeralSharedKey> {
		let party_index = self.party_index;
		let session = self.session_mut(handle)?;
		match std::mem::replace(&mut session.phase, EphemeralPhase::Signed) {
			EphemeralPhase::Distributed { .. } => {},
			other => {
				let name = other.name();
				session.phase = other;
				return Err(state_error("construct_eph", name));
			},
		};

		for (&j, commitment_vector) in commitment_vectors {
			let share = shares_received
				.get(&j)
				.ok_or_else(|| ThresholdError::InvalidInput(format!("missing ephemeral share from party {j}")))?;
			if !verify_share(commitment_vector, party_index, share) {
				tracing::warn!(offender = j, "ephemeral VSS share failed verification");
				return Err(ThresholdError::ProtocolFailure {
					party_index: j,
					reason: "received ephemeral share does not match the distributor's commitment vector".into(),
				});
			}
		}

		let rho_i: Scalar = shares_received.values().copied().sum();
		let joint_nonce: Point = r_js.values().copied().sum();
		let eph_shared = EphemeralSharedKey { rho_i, joint_nonce };

		session.phase = EphemeralPhase::Ready(eph_shared.clone());
		Ok(eph_shared)
	}

	/// Emits this party's contribution to the final signature, along with
	/// the challenge `k` it computed (so the coordinator can check all
	/// participants agree on it before aggregating).
	pub fn local_sig(&mut self, handle: SigningHandle, message: &[u8]) -> Result<(Scalar, Scalar)> {
		let party_index = self.party_index;
		let shared = match &self.state {
			LongLivedState::Ready(shared) => shared.clone(),
			other => return Err(state_error("local_sig", other.name())),
		};

		let session = self.session_mut(handle)?;
		let eph = match &session.phase {
			EphemeralPhase::Ready(eph) => eph.clone(),
			other => return Err(state_error("local_sig", other.name())),
		};
		let subset = session
			.signer_subset
			.clone()
			.ok_or_else(|| ThresholdError::StateError("signing subset was never established".into()))?;

		let subset_1based: BTreeSet<u32> = subset.iter().map(|idx| idx + 1).collect();
		let lambda_i = crypto::lagrange_coefficient(party_index + 1, &subset_1based);
		let k = crypto::compute_challenge(&eph.joint_nonce, &shared.joint_public_key, message);
		let gamma_i = crypto::local_sig(&eph.rho_i, &k, &lambda_i, &shared.x_i);

		session.phase = EphemeralPhase::Signed;
		tracing::debug!(party_index, ?handle, "local signature share emitted");
		Ok((gamma_i, k))
	}

	/// Erases this session's ephemeral material. Idempotent (re-closing an
	/// already-closed or never-opened handle is not an error).
	pub fn close_signing(&mut self, handle: SigningHandle) {
		self.sessions.remove(&handle);
	}
}
