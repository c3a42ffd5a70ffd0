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

use std::collections::BTreeMap;

use bh_badge_crypto::{JsonObject, PublicKey, SigningAlgorithm};
use bh_status_list::StatusListInternal;
use bherror::traits::PropagateError as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BadgeVersion;
use crate::{BadgeError, Result};

/// Display metadata of an issuer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssuerProfile {
    /// Name of the issuer.
    pub name: String,
    /// Homepage of the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact address of the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Description of the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL of the issuer's image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A badge issuing entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerRecord {
    /// The issuer identifier, a URI or a DID.
    pub id: String,
    /// Display metadata.
    pub profile: IssuerProfile,
    /// Identifier of the key new credentials are signed with.
    pub current_key_id: String,
    /// When the issuer was provisioned.
    pub created: DateTime<Utc>,
}

/// A signing key of an issuer.
///
/// Keys are never deleted: after a rotation the previous key is only marked
/// as retired, so the credentials it signed can still be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// The verification method identifier, `did:key:<mb>#<mb>`.
    pub id: String,
    /// The DID controlling the key.
    pub controller: String,
    /// The issuer owning the key.
    pub issuer_id: String,
    /// The algorithm the key is used with.
    pub algorithm: SigningAlgorithm,
    /// The multicodec-prefixed public key, multibase encoded.
    pub public_key_multibase: String,
    /// The PKCS#8 private key, encrypted with the master secret as
    /// `salt:iv:tag:ciphertext`.
    pub encrypted_private_key: String,
    /// When the key was generated.
    pub created: DateTime<Utc>,
    /// When the key was rotated out, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retired: Option<DateTime<Utc>>,
}

impl KeyRecord {
    /// Decodes the public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_multibase(&self.public_key_multibase)
            .with_err(|| BadgeError::KeyNotFound(self.id.clone()))
    }

    /// Returns `true` if the key was rotated out.
    pub fn is_retired(&self) -> bool {
        self.retired.is_some()
    }
}

/// Revocation metadata of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    /// Why the credential was revoked.
    pub reason: String,
    /// When the revocation takes effect.
    pub revoked_at: DateTime<Utc>,
}

/// An issued credential.
///
/// The signed document never changes; only the revocation metadata can be
/// set, once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// The credential identifier.
    pub id: String,
    /// The issuer of the credential.
    pub issuer_id: String,
    /// The version of the credential document.
    pub version: BadgeVersion,
    /// The signed credential document.
    pub document: JsonObject,
    /// The index of the credential in the issuer's status list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_index: Option<usize>,
    /// Set when the credential is revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation: Option<Revocation>,
}

impl CredentialRecord {
    /// Returns `true` if the credential was revoked, regardless of when the
    /// revocation takes effect.
    pub fn is_revoked(&self) -> bool {
        self.revocation.is_some()
    }

    /// Marks the credential as revoked.
    ///
    /// Returns `false`, leaving the first revocation untouched, if the
    /// credential was already revoked.
    pub fn revoke(&mut self, reason: impl Into<String>, revoked_at: DateTime<Utc>) -> bool {
        if self.revocation.is_some() {
            return false;
        }

        self.revocation = Some(Revocation {
            reason: reason.into(),
            revoked_at,
        });
        true
    }
}

/// A revocation recorded in a status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// Why the credential was revoked.
    pub reason: String,
    /// When the revocation takes effect.
    pub effective_at: DateTime<Utc>,
}

/// The status list of an issuer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusListRecord {
    /// The issuer owning the list.
    pub issuer_id: String,
    /// The revocation bitstring.
    pub list: StatusListInternal,
    /// The revocations, by status list index.
    #[serde(default)]
    pub revocations: BTreeMap<usize, RevocationEntry>,
}

impl StatusListRecord {
    /// Creates an empty status list of the given issuer.
    pub fn new(issuer_id: impl Into<String>) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            list: StatusListInternal::new(),
            revocations: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use serde_json::json;

    use super::*;

    #[test]
    fn first_revocation_wins() {
        let mut record = CredentialRecord {
            id: "urn:uuid:1".to_owned(),
            issuer_id: "https://example.org/issuer".to_owned(),
            version: BadgeVersion::Ob3,
            document: JsonObject::new(),
            status_index: Some(0),
            revocation: None,
        };
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        assert!(!record.is_revoked());
        assert!(record.revoke("fraud", first));
        assert!(!record.revoke("mistake", second));

        let revocation = record.revocation.unwrap();
        assert_eq!("fraud", revocation.reason);
        assert_eq!(first, revocation.revoked_at);
    }

    #[test]
    fn status_list_record_serde_round_trip() {
        let mut record = StatusListRecord::new("issuer");
        for _ in 0..10 {
            record.list.push();
        }
        record.list.revoke(3).unwrap();
        record.revocations.insert(
            3,
            RevocationEntry {
                reason: "lost".to_owned(),
                effective_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(json!(10), value["list"]["size"]);

        let decoded: StatusListRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record, decoded);
    }
}
