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

//! Full-lifecycle scenarios driving [`Coordinator`] and [`PartyAgent`]
//! together, the way a transport layer would: every message the parties
//! exchange passes through the coordinator's collect/distribute calls.

use std::collections::BTreeMap;

use rand::{rngs::StdRng, SeedableRng};
use threshold_eddsa::{
	coordinator::Coordinator,
	crypto::{self, Signature},
	party::PartyAgent,
	types::{EphShareBundle, LocalSigReport, ShareBundle, SharedKeyReport},
	ThresholdError,
};

/// Runs a full DKG for `ids` (assigns indices by lexicographic sort of
/// `ids`, matching the coordinator's own rule) and returns the coordinator,
/// one `PartyAgent` per id in protocol-index order, and the joint key.
fn run_keygen(ids: &[&str], threshold: u32, rng: &mut StdRng) -> (Coordinator, Vec<PartyAgent>, threshold_eddsa::crypto::Point) {
	let n = ids.len() as u32;
	let mut coordinator = Coordinator::new();
	coordinator.start_keygen(threshold, n).unwrap();

	// Registration order is irrelevant; indices are assigned by sorting ids.
	let mut sorted_ids = ids.to_vec();
	sorted_ids.sort_unstable();

	// A throwaway registration pass: the coordinator only assigns protocol
	// indices once every party has registered a key, but constructing a real
	// `PartyAgent` requires knowing that index up front (it feeds the VSS
	// share's x-coordinate). So register once with disposable keys purely to
	// learn the assignment, then register again with the real ones below.
	for &id in ids {
		let mut agent = PartyAgent::new(0);
		let y_i = agent.register(rng).unwrap();
		coordinator.register_party(id, y_i).unwrap();
	}

	// Re-create each agent with its coordinator-assigned index (the agent
	// itself never claims an index; the coordinator hands it out).
	let mut agents: Vec<PartyAgent> = Vec::with_capacity(n as usize);
	let mut opens = BTreeMap::new();
	let mut y_by_id = BTreeMap::new();
	for &id in &sorted_ids {
		let idx = coordinator.assigned_index(id).unwrap();
		let mut agent = PartyAgent::new(idx);
		let y_i = agent.register(rng).unwrap();
		y_by_id.insert(id.to_string(), y_i);
		let open = agent.commit(rng).unwrap();
		opens.insert(id.to_string(), open);
		agents.push(agent);
	}
	// Re-register with the freshly created agents' keys (the throwaway
	// registration above only served to let the coordinator assign indices).
	coordinator.start_keygen(threshold, n).unwrap();
	for &id in &sorted_ids {
		coordinator.register_party(id, y_by_id[id]).unwrap();
	}

	let peer_opens = coordinator.collect_commitments(opens).unwrap();

	let mut commit_vecs = BTreeMap::new();
	let mut share_bundles = BTreeMap::new();
	for (i, &id) in sorted_ids.iter().enumerate() {
		let (cv, shares) = agents[i].distribute_shares(rng, threshold, n, &peer_opens).unwrap();
		commit_vecs.insert(id.to_string(), cv.clone());
		share_bundles.insert(id.to_string(), ShareBundle { commitment_vector: cv, shares });
	}

	let construct_packets = coordinator.collect_shares(share_bundles).unwrap();

	let mut reports = BTreeMap::new();
	for (i, &id) in sorted_ids.iter().enumerate() {
		let idx = coordinator.assigned_index(id).unwrap();
		let (y_js, shares_received, commitment_vectors) = &construct_packets[&idx];
		let shared = agents[i].construct_shared(y_js, shares_received, commitment_vectors).unwrap();
		reports.insert(id.to_string(), SharedKeyReport { y_i: y_by_id[id], joint_public_key: shared.joint_public_key });
	}

	let joint_public_key = coordinator.collect_shared_keys(reports).unwrap();
	(coordinator, agents, joint_public_key)
}

/// Runs one signing round with the given signer ids (a subset of the ids
/// `run_keygen` was called with) and returns the final signature.
fn run_signing(
	coordinator: &mut Coordinator,
	agents: &mut [PartyAgent],
	signer_ids: &[&str],
	message: &[u8],
	rng: &mut StdRng,
) -> Signature {
	let id = coordinator.start_signing(message, signer_ids).unwrap();

	let mut sorted_signers = signer_ids.to_vec();
	sorted_signers.sort_unstable();

	let agent_for = |party_id: &str| -> usize {
		let idx = coordinator.assigned_index(party_id).unwrap();
		agents.iter().position(|a| a.party_index() == idx).unwrap()
	};

	let mut handles = BTreeMap::new();
	let mut r_points = BTreeMap::new();
	for &sid in &sorted_signers {
		let a = agent_for(sid);
		let (handle, r_i) = agents[a].open_signing(message).unwrap();
		handles.insert(sid.to_string(), handle);
		r_points.insert(sid.to_string(), r_i);
	}
	coordinator.collect_eph_registrations(id, r_points).unwrap();

	let mut eph_opens = BTreeMap::new();
	for &sid in &sorted_signers {
		let a = agent_for(sid);
		let open = agents[a].eph_commit(rng, handles[sid]).unwrap();
		eph_opens.insert(sid.to_string(), open);
	}
	let peer_opens = coordinator.collect_eph_commitments(id, eph_opens).unwrap();

	let threshold = coordinator.signing_threshold(id).unwrap();
	let subset = coordinator.signing_subset(id).unwrap();

	let mut eph_bundles = BTreeMap::new();
	for &sid in &sorted_signers {
		let a = agent_for(sid);
		let (cv, shares) =
			agents[a].eph_distribute(rng, handles[sid], threshold, &subset, &peer_opens).unwrap();
		eph_bundles.insert(sid.to_string(), EphShareBundle { commitment_vector: cv, shares });
	}
	let construct_packets = coordinator.collect_eph_shares(id, eph_bundles).unwrap();

	let mut sig_reports = BTreeMap::new();
	for &sid in &sorted_signers {
		let a = agent_for(sid);
		let idx = coordinator.assigned_index(sid).unwrap();
		let (r_js, shares_received, eph_commitment_vectors) = &construct_packets[&idx];
		agents[a].construct_eph(handles[sid], r_js, shares_received, eph_commitment_vectors).unwrap();
		let (gamma_i, k) = agents[a].local_sig(handles[sid], message).unwrap();
		sig_reports.insert(sid.to_string(), LocalSigReport { gamma_i, k });
	}

	for &sid in &sorted_signers {
		let a = agent_for(sid);
		agents[a].close_signing(handles[sid]);
	}

	coordinator.collect_local_sigs(id, sig_reports).unwrap()
}

#[test]
fn three_of_three_basic_lifecycle() {
	let mut rng = StdRng::from_seed([100u8; 32]);
	let ids = ["alice", "bob", "carol"];
	let (mut coordinator, mut agents, y) = run_keygen(&ids, 3, &mut rng);

	let message = b"threshold eddsa: three of three";
	let signature = run_signing(&mut coordinator, &mut agents, &ids, message, &mut rng);

	assert!(crypto::verify_ed25519(&signature, message, &y));
}

#[test]
fn minimal_two_of_two_lifecycle() {
	let mut rng = StdRng::from_seed([105u8; 32]);
	let ids = ["alice", "bob"];
	let (mut coordinator, mut agents, y) = run_keygen(&ids, 2, &mut rng);

	let message = b"minimal quorum";
	let signature = run_signing(&mut coordinator, &mut agents, &ids, message, &mut rng);

	assert!(crypto::verify_ed25519(&signature, message, &y));
}

#[test]
fn empty_message_signs_and_verifies() {
	let mut rng = StdRng::from_seed([106u8; 32]);
	let ids = ["alice", "bob", "carol"];
	let (mut coordinator, mut agents, y) = run_keygen(&ids, 2, &mut rng);

	let message: &[u8] = b"";
	let signature = run_signing(&mut coordinator, &mut agents, &["alice", "bob"], message, &mut rng);

	assert!(crypto::verify_ed25519(&signature, message, &y));
}

#[test]
fn single_byte_message_signs_and_verifies() {
	let mut rng = StdRng::from_seed([107u8; 32]);
	let ids = ["alice", "bob", "carol"];
	let (mut coordinator, mut agents, y) = run_keygen(&ids, 2, &mut rng);

	let message: &[u8] = b"m";
	let signature = run_signing(&mut coordinator, &mut agents, &["bob", "carol"], message, &mut rng);

	assert!(crypto::verify_ed25519(&signature, message, &y));
}

#[test]
fn five_party_non_contiguous_subset_matches_any_other_subset() {
	let mut rng = StdRng::from_seed([101u8; 32]);
	let ids = ["p0", "p1", "p2", "p3", "p4"];
	let (mut coordinator, mut agents, y) = run_keygen(&ids, 3, &mut rng);

	let message = b"subset invariance";

	// Two different non-contiguous subsets of size 3 must both produce a
	// valid signature under the same joint key.
	let sig_a = run_signing(&mut coordinator, &mut agents, &["p0", "p2", "p4"], message, &mut rng);
	let sig_b = run_signing(&mut coordinator, &mut agents, &["p1", "p2", "p3"], message, &mut rng);

	assert!(crypto::verify_ed25519(&sig_a, message, &y));
	assert!(crypto::verify_ed25519(&sig_b, message, &y));
}

#[test]
fn two_independent_signing_sessions_on_the_same_keygen_result() {
	let mut rng = StdRng::from_seed([102u8; 32]);
	let ids = ["alice", "bob", "carol", "dave"];
	let (mut coordinator, mut agents, y) = run_keygen(&ids, 3, &mut rng);

	let id_first = coordinator.start_signing(b"message one" as &[u8], &["alice", "bob", "carol"]).unwrap();
	let id_second = coordinator.start_signing(b"message two" as &[u8], &["bob", "carol", "dave"]).unwrap();
	assert_ne!(id_first, id_second);

	let sig_one = run_signing(&mut coordinator, &mut agents, &["alice", "bob", "carol"], b"message one", &mut rng);
	let sig_two = run_signing(&mut coordinator, &mut agents, &["bob", "carol", "dave"], b"message two", &mut rng);

	assert!(crypto::verify_ed25519(&sig_one, b"message one", &y));
	assert!(crypto::verify_ed25519(&sig_two, b"message two", &y));
}

#[test]
fn insufficient_signers_is_rejected() {
	let mut rng = StdRng::from_seed([103u8; 32]);
	let ids = ["alice", "bob", "carol"];
	let (mut coordinator, _agents, _y) = run_keygen(&ids, 3, &mut rng);

	let err = coordinator.start_signing(b"too few" as &[u8], &["alice", "bob"]).unwrap_err();
	assert_eq!(err, ThresholdError::InsufficientSigners { got: 2, needed: 3 });
}

#[test]
fn mismatched_threshold_is_rejected_at_keygen_start() {
	let mut coordinator = Coordinator::new();
	assert!(coordinator.start_keygen(1, 3).is_err());
	assert!(coordinator.start_keygen(4, 3).is_err());
	assert!(coordinator.start_keygen(2, 3).is_ok());
}

#[test]
fn tampered_share_aborts_the_keygen_round() {
	let mut rng = StdRng::from_seed([104u8; 32]);
	let ids = ["alice", "bob", "carol"];
	let n = 3u32;
	let threshold = 2u32;

	let mut coordinator = Coordinator::new();
	coordinator.start_keygen(threshold, n).unwrap();

	let mut sorted_ids = ids.to_vec();
	sorted_ids.sort_unstable();

	// First pass just to learn assigned indices (mirrors run_keygen).
	for &id in &ids {
		let mut dummy = PartyAgent::new(0);
		let y_i = dummy.register(&mut rng).unwrap();
		coordinator.register_party(id, y_i).unwrap();
	}
	coordinator.start_keygen(threshold, n).unwrap();

	let mut agents = Vec::new();
	let mut opens = BTreeMap::new();
	for &id in &sorted_ids {
		let idx = coordinator.assigned_index(id).unwrap();
		let mut agent = PartyAgent::new(idx);
		let y_i = agent.register(&mut rng).unwrap();
		coordinator.register_party(id, y_i).unwrap();
		let open = agent.commit(&mut rng).unwrap();
		opens.insert(id.to_string(), open);
		agents.push(agent);
	}

	let peer_opens = coordinator.collect_commitments(opens).unwrap();

	let mut share_bundles = BTreeMap::new();
	for (i, &id) in sorted_ids.iter().enumerate() {
		let (cv, mut shares) = agents[i].distribute_shares(&mut rng, threshold, n, &peer_opens).unwrap();
		if id == sorted_ids[0] {
			// Corrupt the share this party sends to the next recipient.
			let victim = coordinator.assigned_index(sorted_ids[1]).unwrap();
			let tampered = shares[&victim] + crypto::Scalar::from_u32(1);
			shares.insert(victim, tampered);
		}
		share_bundles.insert(id.to_string(), ShareBundle { commitment_vector: cv, shares });
	}

	let construct_packets = coordinator.collect_shares(share_bundles).unwrap();
	let victim_idx = coordinator.assigned_index(sorted_ids[1]).unwrap();
	let victim_agent = agents.iter_mut().find(|a| a.party_index() == victim_idx).unwrap();
	let (y_js, shares_received, commitment_vectors) = &construct_packets[&victim_idx];

	let err = victim_agent.construct_shared(y_js, shares_received, commitment_vectors).unwrap_err();
	match err {
		ThresholdError::ProtocolFailure { .. } => {},
		other => panic!("expected ProtocolFailure, got {other:?}"),
	}
}
