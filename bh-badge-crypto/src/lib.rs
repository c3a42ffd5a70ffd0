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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides the signing primitives used to secure Open Badges
//! credentials.
//!
//! # Details
//!
//! The primary way to use this library is via the [`Signer`] and
//! [`SignatureVerifier`] traits, which provide functionality for producing
//! and checking raw signatures. A default [`openssl`] backed implementation of
//! these traits is available by using the [`Ed25519Signer`], [`Es256Signer`]
//! (or [`KeyPair`] wrapping either) and the [`Ed25519Verifier`] and
//! [`Es256Verifier`] structs. These implementations are available under the
//! default feature `openssl` which can be disabled and replaced by a custom
//! implementation.
//!
//! Public keys are represented by [`PublicKey`] and identified with
//! [`did:key`][1] identifiers, whose verification method ids end up in the
//! `verificationMethod` member of credential proofs.
//!
//! For consumers which only understand signed tokens, [`sign_compact`] and
//! [`CompactJws`] implement the compact JWS envelope.
//!
//! [1]: https://w3c-ccg.github.io/did-method-key/
//!
//! # Examples
//!
//! ## Sign and verify bytes with a `did:key`
//!
//! ```
//! use bh_badge_crypto::{signature_verifier, KeyPair, PublicKey, Signer, SigningAlgorithm};
//!
//! // Generate a new Ed25519 key
//! let key = KeyPair::generate(SigningAlgorithm::EdDsa).unwrap();
//!
//! // The verification method identifies the key
//! let verification_method = key.public_key().unwrap().verification_method();
//!
//! // Sign some bytes
//! let signature = key.sign(b"canonical credential bytes").unwrap();
//!
//! // Resolve the key from its identifier and verify
//! let public_key = PublicKey::from_did_key(&verification_method).unwrap();
//! assert!(signature_verifier(public_key.algorithm())
//!     .verify(b"canonical credential bytes", &signature, &public_key)
//!     .unwrap());
//! ```

#[cfg(feature = "openssl")]
mod openssl_impl;

mod did_key;
mod error;
mod jws;
mod traits;
mod utils;

pub use did_key::*;
pub use error::*;
pub use jws::*;
#[cfg(feature = "openssl")]
pub use openssl_impl::*;
pub use traits::*;
pub use utils::*;

/// Helper macro with the same syntax as [`serde_json::json`] specialized for
/// constructing JSON objects.
///
/// It will construct a more specific type ([`serde_json::Map<String,Value>`])
/// than just [`serde_json::Value`] when constructing an object, and panic if
/// the syntax is valid JSON but not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}
