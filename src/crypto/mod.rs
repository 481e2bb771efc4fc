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

//! Pure cryptographic core: curve arithmetic, the commitment scheme,
//! Feldman VSS and Ed25519-compatible signing. No I/O, no hidden state.

mod commitment;
mod keys;
mod point;
mod scalar;
mod signing;
mod vss;

pub use commitment::{commit, random_blind, verify as verify_commitment, Blind, Commitment};
pub use keys::{EphemeralKey, LongLivedKey};
pub use point::Point;
pub use scalar::Scalar;
pub use signing::{
	aggregate, compute_challenge, compute_nonce_share, local_sig, verify_ed25519, verify_local_sig,
	verify_with_reference_impl, Signature,
};
pub use vss::{lagrange_coefficient, public_share_point, reconstruct_secret, share, verify_share, VssOutput};
