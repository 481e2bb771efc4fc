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

//! Abstract payload schemas exchanged between party agents and the
//! coordinator. These are plain data; how they actually travel between
//! processes is a transport concern out of scope for this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
	crypto::{Blind, Commitment, Point, Scalar},
	PartyIndex,
};

/// Sent by a party to the coordinator once it has generated its long-lived
/// (or ephemeral) key and wants to join the round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
	pub party_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
	pub party_id: String,
	pub y_i: Point,
}

/// The reveal half of the commit/open scheme, for either the long-lived
/// public key (keygen) or the ephemeral nonce commitment (signing).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommitOpen {
	pub commitment: Commitment,
	pub blind: Blind,
}

/// A distributing party's VSS commitment vector plus the shares it is
/// handing out to each recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareBundle {
	pub commitment_vector: Vec<Point>,
	pub shares: BTreeMap<PartyIndex, Scalar>,
}

/// What a party reports back after `construct_shared`/`construct_eph`: its
/// view of the joint public data. Private material (`x_i`, `rho_i`) is
/// never put on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SharedKeyReport {
	pub y_i: Point,
	pub joint_public_key: Point,
}

/// The ephemeral-round analogue of `CommitOpen`, additionally carrying the
/// nonce-commitment point `R_i` itself (which is not secret).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EphOpen {
	pub r_i: Point,
	pub commitment: Commitment,
	pub blind: Blind,
}

/// Same shape as [`ShareBundle`], restricted to the signing subset.
pub type EphShareBundle = ShareBundle;

/// A party's contribution to the final signature, plus the challenge it
/// computed, so the coordinator can check all signers agree before
/// aggregating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocalSigReport {
	pub gamma_i: Scalar,
	pub k: Scalar,
}
