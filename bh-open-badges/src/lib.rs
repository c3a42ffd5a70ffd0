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

//! A `crate` for the lifecycle of [Open Badges][1] credentials: issuing,
//! verifying and revoking badges in both the Open Badges 2.0 (JSON-LD
//! assertion) and the Open Badges 3.0 (W3C Verifiable Credential) formats.
//!
//! # Details
//!
//! Every issuer owns one or more signing keys, identified by `did:key`
//! verification methods.  Private keys are stored encrypted with a master
//! secret, and are decrypted only for the duration of a single signing
//! operation.  See [`KeyManager`].
//!
//! Credentials are signed with Data Integrity proofs over the JSON
//! Canonicalization Scheme (see [`signer`] and [`canonical`]), or wrapped in
//! a compact JWS.  Revocation is tracked per issuer in a StatusList2021
//! bitstring ([`StatusListManager`]), which is published as a signed
//! `StatusList2021Credential`.  [`CredentialVerifier`] checks the structure,
//! signature, revocation and expiration of a credential and reports each of
//! them.
//!
//! The [`BadgeEngine`] ties all of the above together over a single
//! [`BadgeStore`].  The crate ships the [`InMemoryStore`]; persistent stores
//! implement the [`BadgeStore`] trait.
//!
//! All time-dependent operations take the current time as an argument.
//!
//! # Example
//!
//! ```
//! use bh_open_badges::{
//!     models::{ob2::Criteria, ob3::Achievement},
//!     BadgeEngine, Config, InMemoryStore, IssueRequest, IssuerProfile, MasterSecret, Recipient,
//! };
//! use chrono::Utc;
//!
//! let engine = BadgeEngine::new(
//!     Config::default(),
//!     InMemoryStore::new(),
//!     MasterSecret::new(b"a long and random master secret".to_vec()),
//! );
//!
//! let issuer = "https://example.org/issuer";
//! engine
//!     .provision_issuer(
//!         issuer,
//!         IssuerProfile {
//!             name: "Example Issuer".to_owned(),
//!             ..Default::default()
//!         },
//!         Utc::now(),
//!     )
//!     .unwrap();
//!
//! let achievement = Achievement::new(
//!     "https://example.org/achievements/1",
//!     "First Steps",
//!     "Completed the first steps.",
//!     Criteria {
//!         id: None,
//!         narrative: Some("Complete the tutorial.".to_owned()),
//!     },
//! );
//! let record = engine
//!     .issue(
//!         IssueRequest {
//!             issuer_id: issuer.to_owned(),
//!             achievement,
//!             recipient: Recipient::email("learner@example.org"),
//!             credential_id: None,
//!             expiration: None,
//!             evidence: Vec::new(),
//!         },
//!         Utc::now(),
//!     )
//!     .unwrap();
//!
//! let credential = serde_json::to_string(&record.document).unwrap();
//! assert!(engine.verify(&credential, Utc::now()).unwrap().valid);
//!
//! engine.revoke(&record.id, "issued by mistake", Utc::now()).unwrap();
//! assert!(!engine.verify(&credential, Utc::now()).unwrap().valid);
//! ```
//!
//! [1]: https://www.imsglobal.org/spec/ob/v3p0/

pub mod canonical;
mod config;
pub mod converter;
mod engine;
mod error;
pub mod keys;
pub mod models;
pub mod recipient;
pub mod signer;
mod status;
mod store;
pub mod verifier;

pub use config::{Config, MasterSecret, DEFAULT_MASTER_SECRET_ENV, DEFAULT_STATUS_LIST_BASE_URL};
pub use engine::{BadgeEngine, IssueRequest, Recipient};
pub use error::{BadgeError, Result};
pub use keys::{IssuerSigningKey, KeyManager};
pub use models::{
    BadgeVersion, Credential, CredentialRecord, IssuerProfile, IssuerRecord, KeyRecord,
    Revocation, RevocationEntry, StatusListRecord,
};
pub use status::{PublishedStatusList, StatusListManager};
pub use store::{BadgeStore, InMemoryStore, InMemoryStoreError};
pub use verifier::{CredentialVerifier, VerificationChecks, VerificationReport};
