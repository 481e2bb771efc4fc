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

//! Feldman Verifiable Secret Sharing over the Ed25519 base-point subgroup.

use std::collections::{BTreeMap, BTreeSet};

use rand::RngCore;

use super::{point::Point, scalar::Scalar};
use crate::PartyIndex;

/// Evaluate `f(x) = c0 + c1*x + c2*x^2 + ...` at `x`, given coefficients in
/// ascending order, via Horner's method.
fn evaluate_polynomial(coefficients: &[Scalar], x: u32) -> Scalar {
	let x = Scalar::from_u32(x);
	coefficients
		.iter()
		.rev()
		.copied()
		.reduce(|acc, coeff| acc * x + coeff)
		.expect("polynomial always has at least a constant term")
}

/// Evaluate the same polynomial "in the exponent", i.e. given
/// `[c0*G, c1*G, ...]`, compute `f(x)*G` without knowing any `ck`.
fn evaluate_polynomial_in_exponent(commitments: &[Point], x: u32) -> Point {
	let x = Scalar::from_u32(x);
	commitments
		.iter()
		.rev()
		.copied()
		.reduce(|acc, comm| acc * x + comm)
		.expect("commitment vector always has at least one entry")
}

/// The output of sharing a secret: the public commitment vector (the first
/// entry is `secret * G`) and the per-recipient shares.
pub struct VssOutput {
	pub commitments: Vec<Point>,
	pub shares: BTreeMap<PartyIndex, Scalar>,
}

/// Share `secret` via a random degree-`(threshold - 1)` polynomial, handing
/// out an evaluation to each of `recipient_indices` (0-based party indices;
/// evaluated at `index + 1`, per the 1-based convention used throughout the
/// signing math).
pub fn share(
	rng: &mut impl RngCore,
	secret: &Scalar,
	threshold: u32,
	recipient_indices: &[PartyIndex],
) -> VssOutput {
	let degree = threshold - 1;

	let mut coefficients = Vec::with_capacity(threshold as usize);
	coefficients.push(*secret);
	for _ in 0..degree {
		coefficients.push(Scalar::random(rng));
	}

	let commitments = coefficients.iter().map(Point::from_scalar).collect();

	let shares = recipient_indices
		.iter()
		.map(|&idx| (idx, evaluate_polynomial(&coefficients, idx + 1)))
		.collect();

	VssOutput { commitments, shares }
}

/// Check a received share against the distributing party's commitment
/// vector: `share * G == Σ_k (index+1)^k * commitments[k]`.
pub fn verify_share(commitments: &[Point], recipient_index: PartyIndex, share: &Scalar) -> bool {
	Point::from_scalar(share) == evaluate_polynomial_in_exponent(commitments, recipient_index + 1)
}

/// Publicly recompute `x_i * G` from the distributing parties' commitment
/// vectors, without learning `x_i` itself. Used by the coordinator to verify
/// local signatures.
pub fn public_share_point(
	commitment_vectors: &BTreeMap<PartyIndex, Vec<Point>>,
	recipient_index: PartyIndex,
) -> Point {
	commitment_vectors
		.values()
		.map(|commitments| evaluate_polynomial_in_exponent(commitments, recipient_index + 1))
		.sum()
}

/// The Lagrange coefficient `λ_i(0) = Π_{j≠i} j/(j−i) mod ℓ` for 1-based
/// party index `i` within the 1-based subset `all_indices`.
pub fn lagrange_coefficient(index: u32, all_indices: &BTreeSet<u32>) -> Scalar {
	let mut num = Scalar::from_u32(1);
	let mut den = Scalar::from_u32(1);

	let i = Scalar::from_u32(index);
	for &j in all_indices {
		if j == index {
			continue;
		}
		let j = Scalar::from_u32(j);
		num = num * j;
		den = den * (j - i);
	}

	num * den.invert().expect("all indices in the subset are distinct, so the denominator is never zero")
}

/// Reconstruct the shared secret `Σ λ_i(0) * s_i` from shares given at
/// 1-based indices.
pub fn reconstruct_secret(shares: &BTreeMap<u32, Scalar>) -> Scalar {
	let all_indices: BTreeSet<u32> = shares.keys().copied().collect();
	shares
		.iter()
		.map(|(&idx, share)| lagrange_coefficient(idx, &all_indices) * *share)
		.sum()
}
