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

//! The orchestrator: a single keygen session plus zero or more
//! concurrent signing sessions keyed by [`SigningSessionId`]. The
//! coordinator holds only public data — commitments, public points,
//! signature shares — and fans requests out to party agents over whatever
//! transport the caller provides; it never touches a private scalar.

use std::collections::BTreeMap;

use crate::{error::ThresholdError, PartyIndex};

mod keygen;
mod signing;

use keygen::KeygenState;
use signing::SigningSession;
pub use signing::SigningSessionId;

fn state_error(op: &str, state: &str) -> ThresholdError {
	ThresholdError::StateError(format!("`{op}` invoked while coordinator session is in state `{state}`"))
}

/// Orchestrates one keygen session and a set of concurrent signing sessions
/// against its result. See [`crate::party::PartyAgent`] for the per-party
/// counterpart this type exchanges data with.
pub struct Coordinator {
	keygen: KeygenState,
	/// Assigned once registration closes: the stable-sorted lexicographic
	/// index of each registered party id.
	index_of: BTreeMap<String, PartyIndex>,
	next_signing_session: u64,
	signing_sessions: BTreeMap<SigningSessionId, SigningSession>,
}

impl Default for Coordinator {
	fn default() -> Self {
		Self::new()
	}
}

impl Coordinator {
	pub fn new() -> Self {
		Coordinator {
			keygen: KeygenState::Idle,
			index_of: BTreeMap::new(),
			next_signing_session: 0,
			signing_sessions: BTreeMap::new(),
		}
	}

	/// The 0-based protocol index assigned to `party_id`, once registration
	/// has closed (i.e. `n` parties have called `register_party`).
	pub fn assigned_index(&self, party_id: &str) -> Option<PartyIndex> {
		self.index_of.get(party_id).copied()
	}
}
