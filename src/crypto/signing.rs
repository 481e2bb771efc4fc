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

//! Ed25519-preserving threshold signing primitives: nonce derivation,
//! challenge hashing, local signature shares, aggregation and verification.

use sha2::{Digest, Sha512};

use super::{point::Point, scalar::Scalar};
use crate::error::ThresholdError;

/// A standard 64-byte Ed25519 signature, `R ‖ s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
	pub r: Point,
	pub s: Scalar,
}

impl Signature {
	pub fn to_bytes(self) -> [u8; 64] {
		let mut bytes = [0u8; 64];
		bytes[..32].copy_from_slice(&self.r.to_bytes());
		bytes[32..].copy_from_slice(&self.s.to_bytes());
		bytes
	}

	/// Per RFC 8032 §5.1.7, `s` must be the canonical little-endian encoding
	/// of an element of `[0, ℓ)` — rejects any `s` that would silently
	/// reduce mod `ℓ` to a different byte string (e.g. `s' = s + ℓ`).
	pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self, ThresholdError> {
		let mut r_bytes = [0u8; 32];
		let mut s_bytes = [0u8; 32];
		r_bytes.copy_from_slice(&bytes[..32]);
		s_bytes.copy_from_slice(&bytes[32..]);

		let s = Scalar::from_bytes_mod_order(&s_bytes);
		if s.to_bytes() != s_bytes {
			return Err(ThresholdError::InvalidInput(
				"signature scalar s is not a canonical encoding in [0, ℓ)".into(),
			));
		}

		Ok(Signature { r: Point::from_bytes(&r_bytes)?, s })
	}
}

/// `r_i = SHA-512(prefix_i ‖ message) mod ℓ` — the ephemeral nonce scalar
/// seeding a party's contribution to the joint nonce `R`. Deterministic in
/// `(prefix_i, message)`, so retries of the same `(party, message)` agree.
pub fn compute_nonce_share(prefix: &[u8; 32], message: &[u8]) -> Scalar {
	let mut hasher = Sha512::new();
	hasher.update(prefix);
	hasher.update(message);
	let mut out = [0u8; 64];
	out.copy_from_slice(&hasher.finalize());
	Scalar::from_bytes_mod_order_wide(&out)
}

/// The Ed25519 challenge `k = SHA-512(encode(R) ‖ encode(Y) ‖ m) mod ℓ`.
pub fn compute_challenge(r: &Point, y: &Point, message: &[u8]) -> Scalar {
	let mut hasher = Sha512::new();
	hasher.update(r.to_bytes());
	hasher.update(y.to_bytes());
	hasher.update(message);
	let mut out = [0u8; 64];
	out.copy_from_slice(&hasher.finalize());
	Scalar::from_bytes_mod_order_wide(&out)
}

/// A party's contribution to the final signature:
/// `gamma_i = rho_i + k * lambda_i * x_i mod ℓ`.
pub fn local_sig(rho_i: &Scalar, k: &Scalar, lambda_i: &Scalar, x_i: &Scalar) -> Scalar {
	*rho_i + (*k * *lambda_i * *x_i)
}

/// Publicly verify a party's local signature share against their public key
/// share (recomputed in the exponent from the VSS commitment vectors, never
/// from a private `x_i`): `gamma_i * G == R_i + k * lambda_i * (x_i * G)`.
pub fn verify_local_sig(gamma_i: &Scalar, r_i: &Point, k: &Scalar, lambda_i: &Scalar, x_i_point: &Point) -> bool {
	Point::from_scalar(gamma_i) == *r_i + (*x_i_point * (*k * *lambda_i))
}

/// Combine local signature shares into the final scalar: `s = Σ gamma_i`.
pub fn aggregate(shares: impl IntoIterator<Item = Scalar>) -> Scalar {
	shares.into_iter().sum()
}

/// Standard Ed25519 verification equation: `s*G == R + H512(R‖Y‖m)*Y`.
pub fn verify_ed25519(signature: &Signature, message: &[u8], y: &Point) -> bool {
	let k = compute_challenge(&signature.r, y, message);
	Point::from_scalar(&signature.s) == signature.r + (*y * k)
}

/// Verify the aggregated signature against an independent implementation
/// (`ed25519-dalek`): the output must be usable by any compliant Ed25519
/// verifier, not just the arithmetic in this crate.
pub fn verify_with_reference_impl(
	signature: &Signature,
	message: &[u8],
	y: &Point,
) -> Result<(), ThresholdError> {
	use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

	let verifying_key = VerifyingKey::from_bytes(&y.to_bytes())
		.map_err(|e| ThresholdError::InvalidInput(format!("invalid Ed25519 public key: {e}")))?;
	let dalek_sig = DalekSignature::from_bytes(&signature.to_bytes());

	verifying_key
		.verify(message, &dalek_sig)
		.map_err(|e| ThresholdError::InternalInvariantFailure(format!("reference verifier rejected signature: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, SeedableRng};

	#[test]
	fn single_party_signature_round_trips() {
		let mut rng = StdRng::from_seed([10u8; 32]);
		let x = Scalar::random(&mut rng);
		let y = Point::from_scalar(&x);

		let rho = Scalar::random(&mut rng);
		let r = Point::from_scalar(&rho);
		let message = b"hello";

		let k = compute_challenge(&r, &y, message);
		// A single signer has lambda = 1.
		let gamma = local_sig(&rho, &k, &Scalar::from_u32(1), &x);

		let sig = Signature { r, s: gamma };
		assert!(verify_ed25519(&sig, message, &y));
		assert!(verify_with_reference_impl(&sig, message, &y).is_ok());
	}

	#[test]
	fn tampered_message_fails_verification() {
		let mut rng = StdRng::from_seed([11u8; 32]);
		let x = Scalar::random(&mut rng);
		let y = Point::from_scalar(&x);
		let rho = Scalar::random(&mut rng);
		let r = Point::from_scalar(&rho);

		let k = compute_challenge(&r, &y, b"original");
		let gamma = local_sig(&rho, &k, &Scalar::from_u32(1), &x);
		let sig = Signature { r, s: gamma };

		assert!(!verify_ed25519(&sig, b"tampered", &y));
	}

	#[test]
	fn from_bytes_accepts_a_canonical_signature() {
		let mut rng = StdRng::from_seed([12u8; 32]);
		let x = Scalar::random(&mut rng);
		let y = Point::from_scalar(&x);
		let rho = Scalar::random(&mut rng);
		let r = Point::from_scalar(&rho);
		let message = b"roundtrip";

		let k = compute_challenge(&r, &y, message);
		let gamma = local_sig(&rho, &k, &Scalar::from_u32(1), &x);
		let sig = Signature { r, s: gamma };

		let decoded = Signature::from_bytes(&sig.to_bytes()).unwrap();
		assert_eq!(decoded, sig);
	}

	#[test]
	fn from_bytes_rejects_non_canonical_s() {
		let r_bytes = Point::from_scalar(&Scalar::from_u32(1)).to_bytes();
		// The little-endian encoding of the group order ℓ itself: reduces to
		// 0 mod ℓ, but is not the canonical (all-zero) encoding of 0.
		let l_bytes: [u8; 32] = [
			0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58, 0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9, 0xde, 0x14, 0x00, 0x00,
			0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
		];

		let mut bytes = [0u8; 64];
		bytes[..32].copy_from_slice(&r_bytes);
		bytes[32..].copy_from_slice(&l_bytes);

		assert_eq!(
			Signature::from_bytes(&bytes).unwrap_err(),
			ThresholdError::InvalidInput("signature scalar s is not a canonical encoding in [0, ℓ)".into())
		);
	}
}
