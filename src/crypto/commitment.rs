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

//! The hiding/binding commitment scheme used to commit to a public point
//! before it is opened: `commit(p, b) = SHA-256(encode(p) ‖ b)`.

use rand::RngCore;
use sha2::{Digest, Sha256};

use super::point::Point;

pub type Blind = [u8; 32];
pub type Commitment = [u8; 32];

pub fn random_blind(rng: &mut impl RngCore) -> Blind {
	let mut blind = [0u8; 32];
	rng.fill_bytes(&mut blind);
	blind
}

pub fn commit(point: &Point, blind: &Blind) -> Commitment {
	let mut hasher = Sha256::new();
	hasher.update(point.to_bytes());
	hasher.update(blind);
	let mut out = [0u8; 32];
	out.copy_from_slice(&hasher.finalize());
	out
}

/// Verification is byte-equal re-derivation; there is no separate "opening"
/// proof beyond the revealed `(point, blind)` pair.
pub fn verify(point: &Point, blind: &Blind, commitment: &Commitment) -> bool {
	commit(point, blind) == *commitment
}
