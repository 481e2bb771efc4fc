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

//! Threshold Ed25519 (EdDSA) distributed key generation and signing.
//!
//! `n` parties run [`party`] agents through a [`coordinator`] to jointly
//! produce an Ed25519 key (`crypto::Point`) and, per message, a 64-byte
//! Ed25519 signature that verifies under any compliant Ed25519 verifier.
//! Transport, wire encoding, and the caller's retry/restart policy are out
//! of scope: every operation here is synchronous and fails loudly instead
//! of retrying.

pub mod coordinator;
pub mod crypto;
mod error;
pub mod party;
pub mod types;

pub use error::{Result, ThresholdError};

/// A party's position in the protocol (0-based), assigned deterministically
/// by the coordinator from a lexicographic sort of party identifiers.
pub type PartyIndex = u32;
