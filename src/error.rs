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

use thiserror::Error;

use crate::PartyIndex;

/// The error taxonomy shared by the crypto core, the party agent and the
/// coordinator. Every failure is fatal to the current round: there is no
/// retry at the protocol layer (a fresh session must be initiated by the
/// caller).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
	/// Out-of-range threshold, malformed point/scalar encoding, wrong array length.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// Operation invoked in an incompatible state, e.g. `distribute` before `register`.
	#[error("operation invoked in an incompatible state: {0}")]
	StateError(String),

	/// Cross-party mismatch observed by the coordinator, e.g. parties report
	/// different joint public keys, or disagree on the signing challenge.
	#[error("inconsistent input across parties: {0}")]
	InconsistentInput(String),

	/// A specific party failed a cryptographic check (commitment open, VSS
	/// share, local signature). Terminates the session; not merely informational.
	#[error("party {party_index} failed a cryptographic check: {reason}")]
	ProtocolFailure { party_index: PartyIndex, reason: String },

	/// Fewer than `t` parties were supplied to `start_signing`.
	#[error("insufficient signers: got {got}, need at least {needed}")]
	InsufficientSigners { got: usize, needed: usize },

	/// All local checks passed but the aggregated signature did not verify.
	/// Must never occur on honest execution; if it does, something upstream
	/// of this crate violated an invariant we rely on.
	#[error("internal invariant violated: {0}")]
	InternalInvariantFailure(String),
}

pub type Result<T> = std::result::Result<T, ThresholdError>;
