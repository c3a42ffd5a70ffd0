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

//! Data model of Open Badges 2.0 and 3.0 credentials, and of the persisted
//! records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

mod credential;
pub mod ob2;
pub mod ob3;
mod records;

pub(crate) use credential::string_items;
pub use credential::{BadgeVersion, Credential};
pub use records::{
    CredentialRecord, IssuerProfile, IssuerRecord, KeyRecord, Revocation, RevocationEntry,
    StatusListRecord,
};

/// The JSON-LD context of Open Badges 2.0 documents.
pub const OB2_CONTEXT: &str = "https://w3id.org/openbadges/v2";

/// The JSON-LD context of W3C Verifiable Credentials Data Model v1.1.
pub const VC_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// The JSON-LD context of W3C Verifiable Credentials Data Model v2.0.
pub const VC_V2_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";

/// The JSON-LD context of Open Badges 3.0 documents.
pub const OB3_CONTEXT: &str = "https://purl.imsglobal.org/spec/ob/v3p0/context-3.0.3.json";

/// Every published revision of the Open Badges 3.0 context starts with this.
pub const OB3_CONTEXT_PREFIX: &str = "https://purl.imsglobal.org/spec/ob/v3p0/context";

/// The JSON schema an Open Badges 3.0 achievement credential conforms to.
pub const OB3_ACHIEVEMENT_CREDENTIAL_SCHEMA: &str =
    "https://purl.imsglobal.org/spec/ob/v3p0/schema/json/ob_v3p0_achievementcredential_schema.json";

/// The type of the `credentialSchema` validator of Open Badges 3.0.
pub const JSON_SCHEMA_VALIDATOR_TYPE: &str = "1EdTechJsonSchemaValidator2019";

/// A JSON value which is either a single item or an array of items, as used
/// for `@context` and `type` members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single item.
    One(T),
    /// An array of items.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Iterates over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }

    /// The first item, if any.
    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
}

impl<T: PartialEq> OneOrMany<T> {
    /// Returns `true` if any of the items equals `item`.
    pub fn contains(&self, item: &T) -> bool {
        self.iter().any(|candidate| candidate == item)
    }
}

impl OneOrMany<String> {
    /// Returns `true` if any of the items equals `item`.
    pub fn contains_str(&self, item: &str) -> bool {
        self.iter().any(|candidate| candidate == item)
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(item: T) -> Self {
        Self::One(item)
    }
}

/// Evidence supporting the award of a badge.
///
/// The shape is shared by both versions; Open Badges 3.0 additionally
/// requires the `type`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// URL of the evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Type of the evidence, `Evidence`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<OneOrMany<String>>,
    /// Narrative describing the evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Name of the evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description of the evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The kind of evidence, e.g. `Poetry` or `Prose`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// The intended audience of the evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

/// Formats a timestamp as RFC 3339 with second precision and the `Z` suffix.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

/// (De)serialization of the credential timestamps.
pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(timestamp))
    }

    pub(crate) fn deserialize<'de, D>(d: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(d)?;
        super::parse_timestamp(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid RFC 3339 timestamp \"{}\"", value)))
    }

    pub(crate) mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub(crate) fn serialize<S: Serializer>(
            timestamp: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match timestamp {
                Some(timestamp) => super::serialize(timestamp, s),
                None => s.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(deserialize_with = "super::deserialize")] DateTime<Utc>);

            Ok(Option::<Wrapper>::deserialize(d)?.map(|Wrapper(timestamp)| timestamp))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn one_or_many_accepts_both_shapes() {
        let one: OneOrMany<String> = serde_json::from_value(json!("Assertion")).unwrap();
        let many: OneOrMany<String> =
            serde_json::from_value(json!(["VerifiableCredential", "OpenBadgeCredential"]))
                .unwrap();

        assert!(one.contains_str("Assertion"));
        assert_eq!(Some(&"VerifiableCredential".to_owned()), many.first());
        assert!(many.contains_str("OpenBadgeCredential"));
        assert!(!many.contains_str("Assertion"));
        assert_eq!(json!("Assertion"), serde_json::to_value(&one).unwrap());
    }

    #[test]
    fn timestamps_have_second_precision() {
        let timestamp = parse_timestamp("2024-03-01T10:20:30.123456+02:00").unwrap();

        assert_eq!("2024-03-01T08:20:30Z", format_timestamp(&timestamp));
        assert!(parse_timestamp("2024-03-01").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
