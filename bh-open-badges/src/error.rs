// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

/// Error type of the Open Badges credential lifecycle operations.
///
/// Verification outcomes (bad signature, revoked, expired, malformed
/// credential) are not errors; they are reported in the
/// [`VerificationReport`](crate::VerificationReport).
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum BadgeError {
    /// The input does not have the expected shape.
    #[strum(to_string = "Invalid input: {0}")]
    Validation(String),
    /// The key source failed to produce a new key.
    #[strum(to_string = "Key generation failed")]
    KeyGeneration,
    /// No key, or no issuer, is known under the given identifier.
    #[strum(to_string = "Key not found: {0}")]
    KeyNotFound(String),
    /// Encrypting a private key failed.
    #[strum(to_string = "Private key encryption failed")]
    Encryption,
    /// The encrypted private key is malformed, was tampered with, or the
    /// master secret is wrong.
    #[strum(to_string = "Private key decryption failed")]
    Decryption,
    /// A proof or compact JWS could not be produced.
    #[strum(to_string = "Signing failed")]
    Signing,
    /// The proof type or cryptosuite is not supported.
    #[strum(to_string = "Unsupported proof type: {0}")]
    UnsupportedProofType(String),
    /// A status list index is outside of the allocated part of the list.
    #[strum(to_string = "Status list index {0} was never allocated")]
    IndexAllocation(usize),
    /// The persistence layer failed.
    #[strum(to_string = "Persistence error")]
    Persistence,
    /// The configuration is invalid or incomplete.
    #[strum(to_string = "Invalid configuration: {0}")]
    Configuration(String),
    /// A document could not be brought into its canonical form.
    #[strum(to_string = "Canonicalization failed")]
    Canonicalization,
    /// A status list could not be encoded or decoded.
    #[strum(to_string = "Status list error")]
    StatusList,
}

impl bherror::BhError for BadgeError {}

/// Result type used throughout the crate.
pub type Result<T> = bherror::Result<T, BadgeError>;
