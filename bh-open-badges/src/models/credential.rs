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

use bh_badge_crypto::JsonObject;
use bherror::{traits::ForeignError as _, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ob2::{self, Assertion},
    ob3::{self, OpenBadgeCredential},
    OB2_CONTEXT, OB3_CONTEXT_PREFIX,
};
use crate::{BadgeError, Result};

/// The Open Badges version of a credential document.
#[derive(
    strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum BadgeVersion {
    /// Open Badges 2.0.
    #[serde(rename = "2.0")]
    #[strum(to_string = "Open Badges 2.0")]
    Ob2,
    /// Open Badges 3.0.
    #[serde(rename = "3.0")]
    #[strum(to_string = "Open Badges 3.0")]
    Ob3,
}

/// Returns the string items of a member which is either a string or an array.
pub(crate) fn string_items<'a>(document: &'a JsonObject, member: &str) -> Vec<&'a str> {
    match document.get(member) {
        Some(Value::String(item)) => vec![item.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

impl BadgeVersion {
    /// Detects the version of a document from its `@context` and `type`.
    ///
    /// A document is Open Badges 3.0 if it has the Open Badges 3.0 context or
    /// is typed as a Verifiable Credential, and Open Badges 2.0 if it has the
    /// Open Badges 2.0 context or is typed as an `Assertion`.
    pub fn detect(document: &JsonObject) -> Option<Self> {
        let contexts = string_items(document, "@context");
        let types = string_items(document, "type");

        let ob3 = contexts
            .iter()
            .any(|context| context.starts_with(OB3_CONTEXT_PREFIX))
            || types.iter().any(|t| {
                [
                    ob3::VERIFIABLE_CREDENTIAL_TYPE,
                    ob3::OPEN_BADGE_CREDENTIAL_TYPE,
                    ob3::ACHIEVEMENT_CREDENTIAL_TYPE,
                ]
                .contains(t)
            });
        if ob3 {
            return Some(Self::Ob3);
        }

        let ob2 = contexts.contains(&OB2_CONTEXT) || types.contains(&ob2::ASSERTION_TYPE);
        ob2.then_some(Self::Ob2)
    }
}

/// A credential document of either Open Badges version.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    /// An Open Badges 2.0 assertion.
    Ob2(Box<Assertion>),
    /// An Open Badges 3.0 credential.
    Ob3(Box<OpenBadgeCredential>),
}

impl Credential {
    /// Detects the version of the document and deserializes it into the
    /// matching model.
    ///
    /// # Errors
    ///
    /// [`BadgeError::Validation`] if the version can not be detected or the
    /// document does not match the model of its version.
    pub fn from_json(document: &JsonObject) -> Result<Self> {
        let version = BadgeVersion::detect(document).ok_or_else(|| {
            Error::root(BadgeError::Validation(
                "unrecognized credential version".to_owned(),
            ))
        })?;

        let value = Value::Object(document.clone());
        let credential = match version {
            BadgeVersion::Ob2 => Self::Ob2(Box::new(serde_json::from_value(value).foreign_err(
                || BadgeError::Validation(format!("document is not a valid {}", version)),
            )?)),
            BadgeVersion::Ob3 => Self::Ob3(Box::new(serde_json::from_value(value).foreign_err(
                || BadgeError::Validation(format!("document is not a valid {}", version)),
            )?)),
        };

        Ok(credential)
    }

    /// Serializes the credential into a JSON object.
    pub fn to_json(&self) -> Result<JsonObject> {
        let value = match self {
            Self::Ob2(assertion) => serde_json::to_value(assertion),
            Self::Ob3(credential) => serde_json::to_value(credential),
        }
        .foreign_err(|| BadgeError::Validation("unserializable credential".to_owned()))?;

        match value {
            Value::Object(object) => Ok(object),
            _ => Err(Error::root(BadgeError::Validation(
                "credential is not a JSON object".to_owned(),
            ))),
        }
    }

    /// The version of the credential.
    pub fn version(&self) -> BadgeVersion {
        match self {
            Self::Ob2(_) => BadgeVersion::Ob2,
            Self::Ob3(_) => BadgeVersion::Ob3,
        }
    }

    /// The identifier of the credential.
    pub fn id(&self) -> &str {
        match self {
            Self::Ob2(assertion) => &assertion.id,
            Self::Ob3(credential) => &credential.id,
        }
    }

    /// The identifier of the issuer, if the document names it.
    ///
    /// Open Badges 2.0 assertions only name it when the badge class is
    /// embedded.
    pub fn issuer_id(&self) -> Option<&str> {
        match self {
            Self::Ob2(assertion) => assertion.issuer_id(),
            Self::Ob3(credential) => Some(&credential.issuer.id),
        }
    }
}

impl From<Assertion> for Credential {
    fn from(assertion: Assertion) -> Self {
        Self::Ob2(Box::new(assertion))
    }
}

impl From<OpenBadgeCredential> for Credential {
    fn from(credential: OpenBadgeCredential) -> Self {
        Self::Ob3(Box::new(credential))
    }
}
