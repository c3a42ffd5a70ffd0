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

//! Revocation of credentials through per-issuer StatusList2021 bitstrings.

use bh_badge_crypto::JsonObject;
use bh_status_list::{
    StatusList, StatusList2021Entry, StatusList2021Subject, StatusListInternal, StatusPurpose,
    UriBuf, STATUS_LIST_2021_CONTEXT, STATUS_LIST_2021_CREDENTIAL_TYPE,
};
use bherror::{
    traits::{ForeignError as _, PropagateError as _},
    Error,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::{
    models::{format_timestamp, ob3::VERIFIABLE_CREDENTIAL_TYPE, string_items, VC_V1_CONTEXT},
    signer, BadgeError, BadgeStore, Config, IssuerSigningKey, Result, RevocationEntry,
    StatusListRecord,
};

/// Maintains the status lists of issuers kept in a [`BadgeStore`].
///
/// Every allocation and revocation is a single atomic update of the issuer's
/// list through [`BadgeStore::update_status_list`], so concurrent calls for
/// the same issuer never lose each other's changes.
#[derive(Debug)]
pub struct StatusListManager<'a, S> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: BadgeStore> StatusListManager<'a, S> {
    /// Creates a status list manager on top of the given store.
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Allocates the next index of the issuer's list.
    ///
    /// Indexes are sequential, starting from `0`, and never reused.
    pub fn allocate_index(&self, issuer_id: &str) -> Result<usize> {
        let index = self
            .store
            .update_status_list(issuer_id, |record| record.list.push())
            .with_err(|| BadgeError::Persistence)?;

        tracing::debug!(issuer_id, index, "allocated status list index");

        Ok(index)
    }

    /// Revokes the credential at the given index, effective immediately.
    ///
    /// Returns `false` if the index was already revoked, in which case the
    /// first revocation is kept.
    ///
    /// # Errors
    ///
    /// [`BadgeError::IndexAllocation`] if the index was never allocated.
    pub fn revoke(
        &self,
        issuer_id: &str,
        index: usize,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.revoke_at(issuer_id, index, reason, now)
    }

    /// Revokes the credential at the given index, effective from
    /// `effective_at`, which may be in the future.
    ///
    /// The bit is set right away; until `effective_at` the revocation is
    /// reported as pending and the published list does not include it.
    pub fn revoke_at(
        &self,
        issuer_id: &str,
        index: usize,
        reason: &str,
        effective_at: DateTime<Utc>,
    ) -> Result<bool> {
        let newly_revoked = self
            .store
            .update_status_list(issuer_id, |record| -> Result<bool> {
                let newly_revoked = record
                    .list
                    .revoke(index)
                    .with_err(|| BadgeError::IndexAllocation(index))?;

                record
                    .revocations
                    .entry(index)
                    .or_insert_with(|| RevocationEntry {
                        reason: reason.to_owned(),
                        effective_at,
                    });

                Ok(newly_revoked)
            })
            .with_err(|| BadgeError::Persistence)??;

        if newly_revoked {
            tracing::info!(issuer_id, index, reason, %effective_at, "revoked status list entry");
        } else {
            tracing::debug!(issuer_id, index, "status list entry already revoked");
        }

        Ok(newly_revoked)
    }

    fn record(&self, issuer_id: &str, index: usize) -> Result<StatusListRecord> {
        let record = self
            .store
            .get_status_list(issuer_id)
            .with_err(|| BadgeError::Persistence)?
            .ok_or_else(|| {
                Error::root(BadgeError::IndexAllocation(index)).ctx("issuer has no status list")
            })?;

        if index >= record.list.size() {
            return Err(Error::root(BadgeError::IndexAllocation(index))
                .ctx(format!("the list has {} entries", record.list.size())));
        }

        Ok(record)
    }

    /// Returns whether the bit of the given index is set, regardless of when
    /// the revocation takes effect.
    pub fn is_revoked(&self, issuer_id: &str, index: usize) -> Result<bool> {
        self.record(issuer_id, index)?
            .list
            .is_revoked(index)
            .with_err(|| BadgeError::IndexAllocation(index))
    }

    /// Returns the revocation recorded for the given index, if any.
    pub fn revocation(&self, issuer_id: &str, index: usize) -> Result<Option<RevocationEntry>> {
        let mut record = self.record(issuer_id, index)?;
        Ok(record.revocations.remove(&index))
    }

    /// The URL the issuer's list is published at.
    pub fn list_url(&self, issuer_id: &str) -> Result<UriBuf> {
        self.config.status_list_url(issuer_id)
    }

    /// The `credentialStatus` of the credential at the given index.
    pub fn status_entry(&self, issuer_id: &str, index: usize) -> Result<StatusList2021Entry> {
        Ok(StatusList2021Entry::new(
            self.list_url(issuer_id)?,
            index as u64,
        ))
    }

    /// Builds the signed `StatusList2021Credential` of the issuer.
    ///
    /// The bitstring is zero-padded to the configured minimum size.
    /// Revocations which are not effective yet at `now` are left out.
    pub fn encode(
        &self,
        issuer_id: &str,
        key: &IssuerSigningKey,
        now: DateTime<Utc>,
    ) -> Result<JsonObject> {
        if key.issuer_id() != issuer_id {
            return Err(Error::root(BadgeError::Signing).ctx(format!(
                "key of {} cannot sign the status list of {}",
                key.issuer_id(),
                issuer_id
            )));
        }

        let record = self
            .store
            .get_status_list(issuer_id)
            .with_err(|| BadgeError::Persistence)?
            .unwrap_or_else(|| StatusListRecord::new(issuer_id));

        let list = effective_list(&record, now)?;
        let list_url = self.list_url(issuer_id)?;
        let subject = StatusList2021Subject::new(&list_url, &list, self.config.min_status_list_bits)
            .with_err(|| BadgeError::StatusList)?;

        let document = json!({
            "@context": [VC_V1_CONTEXT, STATUS_LIST_2021_CONTEXT],
            "id": list_url.as_str(),
            "type": [VERIFIABLE_CREDENTIAL_TYPE, STATUS_LIST_2021_CREDENTIAL_TYPE],
            "issuer": issuer_id,
            "issuanceDate": format_timestamp(&now),
            "credentialSubject": subject,
        });
        let Value::Object(document) = document else {
            return Err(Error::root(BadgeError::StatusList).ctx("status list is not an object"));
        };

        let signed = signer::sign(&document, key, now)?;

        tracing::info!(
            issuer_id,
            entries = record.list.size(),
            revoked = record.revocations.len(),
            "encoded status list credential"
        );

        Ok(signed)
    }

    /// Decodes a published `StatusList2021Credential`.
    ///
    /// See [`PublishedStatusList::decode`].
    pub fn decode(&self, credential: &JsonObject) -> Result<PublishedStatusList> {
        PublishedStatusList::decode(credential)
    }
}

/// The list as it should be published at `now`: pending revocations are
/// masked out.
fn effective_list(record: &StatusListRecord, now: DateTime<Utc>) -> Result<StatusListInternal> {
    let pending = record
        .revocations
        .values()
        .any(|revocation| revocation.effective_at > now);
    if !pending {
        return Ok(record.list.clone());
    }

    let mut list = StatusListInternal::new();
    for index in 0..record.list.size() {
        list.push();

        let revoked = record
            .list
            .is_revoked(index)
            .with_err(|| BadgeError::StatusList)?;
        let effective = record
            .revocations
            .get(&index)
            .map_or(true, |revocation| revocation.effective_at <= now);

        if revoked && effective {
            list.revoke(index).with_err(|| BadgeError::StatusList)?;
        }
    }

    Ok(list)
}

/// A decoded `StatusList2021Credential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedStatusList {
    /// The issuer of the list.
    pub issuer_id: String,
    /// The URL the list is published at.
    pub list_url: UriBuf,
    /// What a set bit means.
    pub status_purpose: StatusPurpose,
    /// The bitstring.
    pub status_list: StatusList,
}

impl PublishedStatusList {
    /// Decodes a published `StatusList2021Credential`.
    ///
    /// Only the shape of the credential is checked; its proof is verified by
    /// the [`CredentialVerifier`](crate::CredentialVerifier).
    pub fn decode(credential: &JsonObject) -> Result<Self> {
        let invalid = |message: &str| {
            Error::root(BadgeError::Validation(format!(
                "invalid status list credential: {}",
                message
            )))
        };

        if !string_items(credential, "type").contains(&STATUS_LIST_2021_CREDENTIAL_TYPE) {
            return Err(invalid("missing StatusList2021Credential type"));
        }

        let issuer_id = match credential.get("issuer") {
            Some(Value::String(issuer)) => issuer.clone(),
            Some(Value::Object(issuer)) => issuer
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("issuer without id"))?
                .to_owned(),
            _ => return Err(invalid("missing issuer")),
        };

        let list_url: UriBuf = credential
            .get("id")
            .cloned()
            .ok_or_else(|| invalid("missing id"))
            .and_then(|id| {
                serde_json::from_value(id)
                    .foreign_err(|| BadgeError::Validation("invalid status list URL".to_owned()))
            })?;

        let subject: StatusList2021Subject = credential
            .get("credentialSubject")
            .cloned()
            .ok_or_else(|| invalid("missing credentialSubject"))
            .and_then(|subject| {
                serde_json::from_value(subject).foreign_err(|| {
                    BadgeError::Validation("invalid status list subject".to_owned())
                })
            })?;

        let status_list = subject
            .status_list()
            .with_err(|| BadgeError::StatusList)?;

        Ok(Self {
            issuer_id,
            list_url,
            status_purpose: subject.status_purpose,
            status_list,
        })
    }

    /// Whether the given index is revoked; `None` if the index is outside of
    /// the list.
    pub fn is_revoked(&self, index: usize) -> Option<bool> {
        self.status_list.get(index)
    }
}
