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

//! Long-lived and ephemeral Ed25519 keys, expanded per RFC 8032 §5.1.5.

use rand::RngCore;
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{point::Point, scalar::Scalar};
use crate::PartyIndex;

/// `SHA-512(sk_seed) = (h0 ‖ h1)`; `h0` clamped becomes the secret scalar `a`,
/// `h1` becomes the nonce-derivation `prefix`.
fn expand_seed(sk_seed: &[u8; 32]) -> (Scalar, [u8; 32]) {
	let hash = Sha512::digest(sk_seed);
	let mut h0 = [0u8; 32];
	let mut h1 = [0u8; 32];
	h0.copy_from_slice(&hash[..32]);
	h1.copy_from_slice(&hash[32..]);
	(Scalar::from_clamped_bytes(h0), h1)
}

/// A party's long-lived key material, created once at keygen and held for
/// the lifetime of the share. `sk_seed` and `a` are zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct LongLivedKey {
	#[zeroize(skip)]
	pub party_index: PartyIndex,
	sk_seed: [u8; 32],
	pub a: Scalar,
	pub prefix: [u8; 32],
	#[zeroize(skip)]
	pub y: Point,
}

impl std::fmt::Debug for LongLivedKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LongLivedKey")
			.field("party_index", &self.party_index)
			.field("y", &self.y)
			.finish_non_exhaustive()
	}
}

impl LongLivedKey {
	/// Draw fresh randomness for `sk_seed` and expand it per RFC 8032 §5.1.5.
	pub fn create(party_index: PartyIndex, rng: &mut impl RngCore) -> Self {
		let mut sk_seed = [0u8; 32];
		rng.fill_bytes(&mut sk_seed);
		Self::create_from_private(party_index, sk_seed)
	}

	/// Same expansion, but `sk_seed` is supplied rather than drawn at random.
	pub fn create_from_private(party_index: PartyIndex, sk_seed: [u8; 32]) -> Self {
		let (a, prefix) = expand_seed(&sk_seed);
		let y = Point::from_scalar(&a);
		LongLivedKey { party_index, sk_seed, a, prefix, y }
	}
}

/// A per-message, single-use key whose scalar is the Ed25519 nonce `r`.
/// Deterministic given `(prefix, message)`, per RFC 8032 §5.1.6.
#[derive(ZeroizeOnDrop)]
pub struct EphemeralKey {
	#[zeroize(skip)]
	pub party_index: PartyIndex,
	pub r: Scalar,
	#[zeroize(skip)]
	pub r_point: Point,
}

impl std::fmt::Debug for EphemeralKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EphemeralKey")
			.field("party_index", &self.party_index)
			.field("r_point", &self.r_point)
			.finish_non_exhaustive()
	}
}

impl EphemeralKey {
	pub fn derive(party_index: PartyIndex, prefix: &[u8; 32], message: &[u8]) -> Self {
		let r = super::signing::compute_nonce_share(prefix, message);
		let r_point = Point::from_scalar(&r);
		EphemeralKey { party_index, r, r_point }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, SeedableRng};

	#[test]
	fn create_from_private_is_deterministic() {
		let seed = [42u8; 32];
		let k1 = LongLivedKey::create_from_private(0, seed);
		let k2 = LongLivedKey::create_from_private(0, seed);
		assert_eq!(k1.y, k2.y);
		assert_eq!(k1.prefix, k2.prefix);
	}

	#[test]
	fn ephemeral_key_is_deterministic_given_prefix_and_message() {
		let mut rng = StdRng::from_seed([3u8; 32]);
		let key = LongLivedKey::create(1, &mut rng);
		let e1 = EphemeralKey::derive(1, &key.prefix, b"hello");
		let e2 = EphemeralKey::derive(1, &key.prefix, b"hello");
		assert_eq!(e1.r_point, e2.r_point);

		let e3 = EphemeralKey::derive(1, &key.prefix, b"different message");
		assert_ne!(e1.r_point, e3.r_point);
	}
}
