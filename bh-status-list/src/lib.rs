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

//! A `crate` dedicated to dealing with revocation Status Lists for Verifiable
//! Credentials.
//!
//! The implementation is based on [this specification][1]. Status Lists are
//! used to keep track of the revocation status of specific Verifiable
//! Credentials: each credential carries the URL of a status list credential
//! and the index of its bit in that list.
//!
//! The Status Lists are created, updated and **signed** by issuers of
//! Verifiable Credentials, and are publicly available. Signing is left to the
//! caller; this crate only deals with the bitstring and its JSON
//! representations.
//!
//! # Details
//!
//! The main data structures available in the crate are the [`StatusList`],
//! [`StatusListInternal`], [`StatusList2021Entry`] and
//! [`StatusList2021Subject`]. The [`StatusListInternal`] struct is used by the
//! issuer to allocate and revoke entries, while [`StatusList`] is the
//! read-only bitstring a verifier obtains by decoding a published list. The
//! [`StatusList2021Entry`] is the `credentialStatus` of an issued credential,
//! and [`StatusList2021Subject`] is the `credentialSubject` of the published
//! status list credential.
//!
//! # Example
//!
//! Allocate entries, revoke one of them, publish the list and check the
//! status from the published form.
//! ```
//! use bh_status_list::{
//!     StatusList2021Entry, StatusList2021Subject, StatusListInternal, UriBuf,
//!     MIN_STATUS_LIST_BITS,
//! };
//!
//! let list_url = UriBuf::new(b"https://example.com/status/issuer-1".to_vec()).unwrap();
//!
//! // Allocate entries for three issued credentials.
//! let mut list = StatusListInternal::new();
//! let entries: Vec<StatusList2021Entry> = (0..3)
//!     .map(|_| StatusList2021Entry::new(list_url.clone(), list.push() as u64))
//!     .collect();
//!
//! // Revoke the second credential.
//! list.revoke(entries[1].index() as usize).unwrap();
//!
//! // Publish the list, padded to the recommended minimum size.
//! let subject = StatusList2021Subject::new(&list_url, &list, MIN_STATUS_LIST_BITS).unwrap();
//!
//! // A verifier decodes the published list and reads the bits.
//! let published = subject.status_list().unwrap();
//! assert_eq!(published.get(entries[0].index() as usize), Some(false));
//! assert_eq!(published.get(entries[1].index() as usize), Some(true));
//! ```
//!
//! [1]: https://www.w3.org/TR/2023/WD-vc-status-list-20230427/

mod entry;
mod error;
mod status_list;
mod utils;

pub use entry::{
    StatusList2021Entry, StatusList2021Subject, StatusPurpose, STATUS_LIST_2021_CONTEXT,
    STATUS_LIST_2021_CREDENTIAL_TYPE, STATUS_LIST_2021_ENTRY_TYPE, STATUS_LIST_2021_TYPE,
};
pub use error::{Error, Result};
pub use iref::{InvalidUri, UriBuf};
pub use status_list::{StatusList, StatusListInternal, MIN_STATUS_LIST_BITS};
