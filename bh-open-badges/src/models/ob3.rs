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

//! Open Badges 3.0 documents: the [`OpenBadgeCredential`] Verifiable
//! Credential and its parts.
//!
//! See [here][1] for the full data model.
//!
//! [1]: https://www.imsglobal.org/spec/ob/v3p0/

use bh_status_list::{StatusList2021Entry, STATUS_LIST_2021_CONTEXT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ob2::Criteria, Evidence, OneOrMany, JSON_SCHEMA_VALIDATOR_TYPE,
    OB3_ACHIEVEMENT_CREDENTIAL_SCHEMA, OB3_CONTEXT, VC_V1_CONTEXT,
};

/// The base type of every Verifiable Credential.
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";
/// The type of Open Badges 3.0 credentials.
pub const OPEN_BADGE_CREDENTIAL_TYPE: &str = "OpenBadgeCredential";
/// Alias of [`OPEN_BADGE_CREDENTIAL_TYPE`] allowed by Open Badges 3.0.
pub const ACHIEVEMENT_CREDENTIAL_TYPE: &str = "AchievementCredential";
/// The type of an issuer profile.
pub const PROFILE_TYPE: &str = "Profile";
/// The type of an achievement.
pub const ACHIEVEMENT_TYPE: &str = "Achievement";
/// The type of the credential subject.
pub const ACHIEVEMENT_SUBJECT_TYPE: &str = "AchievementSubject";
/// The type of a recipient identifier.
pub const IDENTITY_OBJECT_TYPE: &str = "IdentityObject";
/// The type of an image.
pub const IMAGE_TYPE: &str = "Image";
/// The type of evidence.
pub const EVIDENCE_TYPE: &str = "Evidence";

fn profile_type() -> OneOrMany<String> {
    OneOrMany::Many(vec![PROFILE_TYPE.to_owned()])
}

fn achievement_type() -> OneOrMany<String> {
    OneOrMany::Many(vec![ACHIEVEMENT_TYPE.to_owned()])
}

fn achievement_subject_type() -> OneOrMany<String> {
    OneOrMany::Many(vec![ACHIEVEMENT_SUBJECT_TYPE.to_owned()])
}

fn identity_object_type() -> String {
    IDENTITY_OBJECT_TYPE.to_owned()
}

fn image_type() -> String {
    IMAGE_TYPE.to_owned()
}

/// An Open Badges 3.0 credential, i.e. a Verifiable Credential asserting
/// that the subject achieved an [`Achievement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBadgeCredential {
    /// The JSON-LD contexts; the first one is the W3C credentials context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Unique IRI of the credential.
    pub id: String,
    /// `VerifiableCredential` and `OpenBadgeCredential`.
    #[serde(rename = "type")]
    pub credential_type: OneOrMany<String>,
    /// The issuer.
    pub issuer: Profile,
    /// Name of the credential, usually the achievement name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the credential was issued (VC Data Model v1.1).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::timestamp::option"
    )]
    pub issuance_date: Option<DateTime<Utc>>,
    /// When the credential becomes valid (VC Data Model v2.0).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::timestamp::option"
    )]
    pub valid_from: Option<DateTime<Utc>>,
    /// When the credential expires (VC Data Model v1.1).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::timestamp::option"
    )]
    pub expiration_date: Option<DateTime<Utc>>,
    /// When the credential stops being valid (VC Data Model v2.0).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::timestamp::option"
    )]
    pub valid_until: Option<DateTime<Utc>>,
    /// The recipient and their achievement.
    pub credential_subject: AchievementSubject,
    /// The schemas the credential conforms to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_schema: Option<OneOrMany<CredentialSchema>>,
    /// Where the revocation status of the credential is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<Value>,
    /// Evidence of the achievement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// The proof, or proofs, of the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Value>,
}

impl OpenBadgeCredential {
    /// Creates a new unsigned credential with the standard contexts, types and
    /// schema.
    pub fn new(
        id: impl Into<String>,
        issuer: Profile,
        credential_subject: AchievementSubject,
        issuance_date: DateTime<Utc>,
    ) -> Self {
        Self {
            context: vec![
                VC_V1_CONTEXT.to_owned(),
                STATUS_LIST_2021_CONTEXT.to_owned(),
                OB3_CONTEXT.to_owned(),
            ],
            id: id.into(),
            credential_type: OneOrMany::Many(vec![
                VERIFIABLE_CREDENTIAL_TYPE.to_owned(),
                OPEN_BADGE_CREDENTIAL_TYPE.to_owned(),
            ]),
            name: Some(credential_subject.achievement.name.clone()),
            issuer,
            issuance_date: Some(issuance_date),
            valid_from: None,
            expiration_date: None,
            valid_until: None,
            credential_subject,
            credential_schema: Some(OneOrMany::Many(vec![CredentialSchema::achievement_credential()])),
            credential_status: None,
            evidence: Vec::new(),
            proof: None,
        }
    }

    /// When the credential was issued, or became valid.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issuance_date.or(self.valid_from)
    }

    /// When the credential expires, if ever.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_date.or(self.valid_until)
    }

    /// The `StatusList2021Entry` credential status, if the credential has
    /// one.
    ///
    /// Returns `None` for credentials without a status and for other kinds
    /// of credential status.
    pub fn status_list_entry(&self) -> Option<StatusList2021Entry> {
        self.credential_status
            .as_ref()
            .and_then(|status| serde_json::from_value::<StatusList2021Entry>(status.clone()).ok())
            .filter(StatusList2021Entry::is_status_list_2021)
    }
}

/// The issuer profile of an Open Badges 3.0 credential.
///
/// An issuer given only by its IRI is read as a profile without a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProfileRepr")]
pub struct Profile {
    /// Unique IRI of the issuer.
    pub id: String,
    /// `Profile`.
    #[serde(rename = "type")]
    pub profile_type: OneOrMany<String>,
    /// Name of the issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Homepage of the issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact address of the issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Description of the issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The issuer's image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
}

impl Profile {
    /// Creates a new profile with only the mandatory members.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_type: profile_type(),
            name: Some(name.into()),
            url: None,
            email: None,
            description: None,
            image: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileRepr {
    Iri(String),
    Object {
        id: String,
        #[serde(rename = "type", default = "profile_type")]
        profile_type: OneOrMany<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        image: Option<Image>,
    },
}

impl From<ProfileRepr> for Profile {
    fn from(repr: ProfileRepr) -> Self {
        match repr {
            ProfileRepr::Iri(id) => Self {
                id,
                profile_type: profile_type(),
                name: None,
                url: None,
                email: None,
                description: None,
                image: None,
            },
            ProfileRepr::Object {
                id,
                profile_type,
                name,
                url,
                email,
                description,
                image,
            } => Self {
                id,
                profile_type,
                name,
                url,
                email,
                description,
                image,
            },
        }
    }
}

/// An image, referenced by its IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// IRI or data URI of the image.
    pub id: String,
    /// `Image`.
    #[serde(rename = "type", default = "image_type")]
    pub image_type: String,
    /// Alternative text of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Image {
    /// Creates a new image without a caption.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_type: image_type(),
            caption: None,
        }
    }
}

/// The subject of an Open Badges 3.0 credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementSubject {
    /// Identifier of the recipient, when it has one (e.g. a DID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `AchievementSubject`.
    #[serde(rename = "type", default = "achievement_subject_type")]
    pub subject_type: OneOrMany<String>,
    /// Other identifiers of the recipient, possibly hashed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<IdentityObject>,
    /// The achievement.
    pub achievement: Achievement,
}

impl AchievementSubject {
    /// Creates a subject identified by the given identity object.
    pub fn new(identifier: IdentityObject, achievement: Achievement) -> Self {
        Self {
            id: None,
            subject_type: achievement_subject_type(),
            identifier: vec![identifier],
            achievement,
        }
    }
}

/// An identifier of the recipient, in plain text or salted and hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityObject {
    /// `IdentityObject`.
    #[serde(rename = "type", default = "identity_object_type")]
    pub identity_object_type: String,
    /// The identifier, or its hash of the form `sha256$<hex>`.
    pub identity_hash: String,
    /// The kind of identifier, e.g. `emailAddress`.
    pub identity_type: String,
    /// Whether `identity_hash` is hashed.
    pub hashed: bool,
    /// The salt the identity was hashed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl IdentityObject {
    /// Creates a new identity object.
    pub fn new(
        identity_hash: impl Into<String>,
        identity_type: impl Into<String>,
        hashed: bool,
        salt: Option<String>,
    ) -> Self {
        Self {
            identity_object_type: identity_object_type(),
            identity_hash: identity_hash.into(),
            identity_type: identity_type.into(),
            hashed,
            salt,
        }
    }
}

/// An achievement, the Open Badges 3.0 counterpart of a badge class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Unique IRI of the achievement.
    pub id: String,
    /// `Achievement`.
    #[serde(rename = "type", default = "achievement_type")]
    pub achievement_type: OneOrMany<String>,
    /// Name of the achievement.
    pub name: String,
    /// Short description of the achievement.
    pub description: String,
    /// What the recipient had to do to earn the achievement.
    pub criteria: Criteria,
    /// The badge image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    /// Tags describing the achievement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
}

impl Achievement {
    /// Creates a new achievement.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        criteria: Criteria,
    ) -> Self {
        Self {
            id: id.into(),
            achievement_type: achievement_type(),
            name: name.into(),
            description: description.into(),
            criteria,
            image: None,
            tag: Vec::new(),
        }
    }
}

/// A reference to a JSON schema the credential conforms to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    /// IRI of the schema.
    pub id: String,
    /// The validator type, e.g. `1EdTechJsonSchemaValidator2019`.
    #[serde(rename = "type")]
    pub schema_type: String,
}

impl CredentialSchema {
    /// The Open Badges 3.0 achievement credential schema.
    pub fn achievement_credential() -> Self {
        Self {
            id: OB3_ACHIEVEMENT_CREDENTIAL_SCHEMA.to_owned(),
            schema_type: JSON_SCHEMA_VALIDATOR_TYPE.to_owned(),
        }
    }
}
