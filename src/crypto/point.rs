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

//! Points in the prime-order subgroup of Ed25519.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::traits::Identity;
use serde::{Deserialize, Serialize};

use super::scalar::Scalar;
use crate::error::ThresholdError;

/// A 32-byte compressed-Edwards encoded point.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point(EdwardsPoint);

impl std::fmt::Debug for Point {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Point({})", hex::encode(self.to_bytes()))
	}
}

impl Default for Point {
	fn default() -> Self {
		Self::identity()
	}
}

impl Point {
	pub fn from_scalar(scalar: &Scalar) -> Self {
		Point(curve25519_dalek::constants::ED25519_BASEPOINT_POINT * scalar.inner())
	}

	pub fn identity() -> Self {
		Point(EdwardsPoint::identity())
	}

	pub fn is_identity(&self) -> bool {
		*self == Self::identity()
	}

	pub fn to_bytes(self) -> [u8; 32] {
		self.0.compress().to_bytes()
	}

	/// Decode a canonical compressed-Edwards point. Rejects encodings that
	/// do not decompress to a valid curve point.
	pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, ThresholdError> {
		CompressedEdwardsY(*bytes)
			.decompress()
			.map(Point)
			.ok_or_else(|| ThresholdError::InvalidInput("malformed Ed25519 point encoding".into()))
	}
}

impl std::ops::Add for Point {
	type Output = Point;
	fn add(self, rhs: Self) -> Self::Output {
		Point(self.0 + rhs.0)
	}
}

impl std::ops::Sub for Point {
	type Output = Point;
	fn sub(self, rhs: Self) -> Self::Output {
		Point(self.0 - rhs.0)
	}
}

impl std::ops::Mul<&Scalar> for Point {
	type Output = Point;
	fn mul(self, rhs: &Scalar) -> Self::Output {
		Point(self.0 * rhs.inner())
	}
}

impl std::ops::Mul<Scalar> for Point {
	type Output = Point;
	fn mul(self, rhs: Scalar) -> Self::Output {
		self * &rhs
	}
}

impl std::iter::Sum for Point {
	fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
		iter.fold(Self::identity(), |a, b| a + b)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_corresponds_to_scalar_zero() {
		assert_eq!(Point::identity(), Point::from_scalar(&Scalar::zero()));
	}

	#[test]
	fn round_trips_through_bytes() {
		let p = Point::from_scalar(&Scalar::from_u32(5));
		let bytes = p.to_bytes();
		assert_eq!(Point::from_bytes(&bytes).unwrap(), p);
	}

	#[test]
	fn rejects_malformed_encoding() {
		// The all-ones encoding does not decompress to a valid point.
		let bytes = [0xffu8; 32];
		assert!(Point::from_bytes(&bytes).is_err());
	}
}
