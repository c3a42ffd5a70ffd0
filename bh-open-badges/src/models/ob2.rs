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

//! Open Badges 2.0 documents: the [`Assertion`], the [`BadgeClass`] it
//! awards and the issuer [`Profile`].
//!
//! See [here][1] for the full data model; only the members the credential
//! lifecycle needs are modelled, unknown members are ignored.
//!
//! [1]: https://www.imsglobal.org/sites/default/files/Badges/OBv2p0Final/index.html

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Evidence, OneOrMany, OB2_CONTEXT};

/// The `type` of an Open Badges 2.0 assertion.
pub const ASSERTION_TYPE: &str = "Assertion";
/// The `type` of an Open Badges 2.0 badge class.
pub const BADGE_CLASS_TYPE: &str = "BadgeClass";
/// The `type` of an Open Badges 2.0 issuer profile.
pub const ISSUER_TYPE: &str = "Issuer";

/// Verification type of assertions hosted at their `id`.
pub const HOSTED_VERIFICATION: &str = "hosted";
/// Verification type of assertions distributed as a signed compact JWS.
pub const SIGNED_VERIFICATION: &str = "signed";

fn ob2_context() -> OneOrMany<String> {
    OneOrMany::One(OB2_CONTEXT.to_owned())
}

/// An Open Badges 2.0 assertion, i.e. the award of a badge to a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// The JSON-LD context, `https://w3id.org/openbadges/v2`.
    #[serde(rename = "@context", default = "ob2_context")]
    pub context: OneOrMany<String>,
    /// Unique IRI of the assertion.
    pub id: String,
    /// `Assertion`.
    #[serde(rename = "type")]
    pub assertion_type: OneOrMany<String>,
    /// The recipient of the badge.
    pub recipient: IdentityObject,
    /// The awarded badge, embedded or referenced by its URL.
    pub badge: BadgeRef,
    /// How the assertion can be verified.
    pub verification: Verification,
    /// When the badge was awarded.
    #[serde(with = "crate::models::timestamp")]
    pub issued_on: DateTime<Utc>,
    /// When the assertion stops being valid.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::timestamp::option"
    )]
    pub expires: Option<DateTime<Utc>>,
    /// URL of the baked image of the assertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Evidence of the achievement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<OneOrMany<Evidence>>,
    /// Narrative of how the recipient met the criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Whether the assertion was revoked by its issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked: Option<bool>,
    /// Why the assertion was revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

impl Assertion {
    /// Creates a new hosted assertion of the given badge.
    pub fn new(
        id: impl Into<String>,
        recipient: IdentityObject,
        badge: BadgeRef,
        issued_on: DateTime<Utc>,
    ) -> Self {
        Self {
            context: ob2_context(),
            id: id.into(),
            assertion_type: OneOrMany::One(ASSERTION_TYPE.to_owned()),
            recipient,
            badge,
            verification: Verification::hosted(),
            issued_on,
            expires: None,
            image: None,
            evidence: None,
            narrative: None,
            revoked: None,
            revocation_reason: None,
        }
    }

    /// The embedded badge class, if the badge is not just a URL.
    pub fn badge_class(&self) -> Option<&BadgeClass> {
        match &self.badge {
            BadgeRef::Embedded(badge_class) => Some(badge_class),
            BadgeRef::Url(_) => None,
        }
    }

    /// The identifier of the issuer, if the badge class is embedded.
    pub fn issuer_id(&self) -> Option<&str> {
        self.badge_class().map(|badge_class| badge_class.issuer.id())
    }
}

/// The recipient of an Open Badges 2.0 assertion.
///
/// The `identity` is either the plaintext identifier, or a salted hash of it
/// of the form `sha256$<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityObject {
    /// The identifier, or its hash.
    pub identity: String,
    /// The kind of identifier: `email`, `url`, `telephone` or `id`.
    #[serde(rename = "type")]
    pub identity_type: String,
    /// Whether `identity` is hashed.
    pub hashed: bool,
    /// The salt the identity was hashed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// An awarded badge, either embedded or referenced by its URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BadgeRef {
    /// The URL of the badge class.
    Url(String),
    /// The badge class itself.
    Embedded(Box<BadgeClass>),
}

impl BadgeRef {
    /// The identifier of the badge class.
    pub fn id(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Embedded(badge_class) => &badge_class.id,
        }
    }
}

/// How an assertion can be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// `hosted` or `signed`.
    #[serde(rename = "type")]
    pub verification_type: String,
    /// For signed assertions, the key that signed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

impl Verification {
    /// Verification by retrieving the assertion from its `id`.
    pub fn hosted() -> Self {
        Self {
            verification_type: HOSTED_VERIFICATION.to_owned(),
            creator: None,
        }
    }

    /// Verification of the compact JWS signature made by `creator`.
    pub fn signed(creator: impl Into<String>) -> Self {
        Self {
            verification_type: SIGNED_VERIFICATION.to_owned(),
            creator: Some(creator.into()),
        }
    }
}

/// An Open Badges 2.0 badge class, i.e. the description of an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeClass {
    /// The JSON-LD context, present when the badge class is published on
    /// its own.
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<OneOrMany<String>>,
    /// Unique IRI of the badge class.
    pub id: String,
    /// `BadgeClass`.
    #[serde(rename = "type")]
    pub badge_class_type: OneOrMany<String>,
    /// Name of the achievement.
    pub name: String,
    /// Short description of the achievement.
    pub description: String,
    /// URL of the badge image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// What the recipient had to do to earn the badge.
    pub criteria: Criteria,
    /// The issuer, embedded or referenced by its URL.
    pub issuer: IssuerRef,
    /// Tags describing the achievement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl BadgeClass {
    /// Creates a new badge class issued by the given issuer.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        criteria: Criteria,
        issuer: IssuerRef,
    ) -> Self {
        Self {
            context: None,
            id: id.into(),
            badge_class_type: OneOrMany::One(BADGE_CLASS_TYPE.to_owned()),
            name: name.into(),
            description: description.into(),
            image: None,
            criteria,
            issuer,
            tags: Vec::new(),
        }
    }
}

/// The criteria of a badge, given as a URL, a narrative, or both.
///
/// A plain string is read as the URL of the criteria.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "CriteriaRepr")]
pub struct Criteria {
    /// URL of the criteria.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Markdown narrative of the criteria.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CriteriaRepr {
    Url(String),
    Object {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        narrative: Option<String>,
    },
}

impl From<CriteriaRepr> for Criteria {
    fn from(repr: CriteriaRepr) -> Self {
        match repr {
            CriteriaRepr::Url(id) => Self {
                id: Some(id),
                narrative: None,
            },
            CriteriaRepr::Object { id, narrative } => Self { id, narrative },
        }
    }
}

/// The issuer of a badge class, either embedded or referenced by its URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssuerRef {
    /// The URL of the issuer profile.
    Url(String),
    /// The issuer profile itself.
    Embedded(Profile),
}

impl IssuerRef {
    /// The identifier of the issuer.
    pub fn id(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Embedded(profile) => &profile.id,
        }
    }
}

/// An Open Badges 2.0 issuer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The JSON-LD context, present when the profile is published on its
    /// own.
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<OneOrMany<String>>,
    /// Unique IRI of the issuer.
    pub id: String,
    /// `Issuer` or `Profile`.
    #[serde(rename = "type")]
    pub profile_type: OneOrMany<String>,
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

impl Profile {
    /// Creates a new issuer profile.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            context: None,
            id: id.into(),
            profile_type: OneOrMany::One(ISSUER_TYPE.to_owned()),
            name: name.into(),
            url: None,
            email: None,
            description: None,
            image: None,
        }
    }
}
