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

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Result, StatusList, StatusListInternal, UriBuf};

/// The JSON-LD context defining the StatusList2021 vocabulary.
pub const STATUS_LIST_2021_CONTEXT: &str = "https://w3id.org/vc/status-list/2021/v1";

/// The `type` of a `credentialStatus` entry pointing into a StatusList2021.
pub const STATUS_LIST_2021_ENTRY_TYPE: &str = "StatusList2021Entry";

/// The `type` of the `credentialSubject` of a status list credential.
pub const STATUS_LIST_2021_TYPE: &str = "StatusList2021";

/// The additional `type` of a status list credential.
pub const STATUS_LIST_2021_CREDENTIAL_TYPE: &str = "StatusList2021Credential";

/// The purpose of a status list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusPurpose {
    /// A set bit permanently revokes the credential.
    Revocation,
    /// A set bit temporarily suspends the credential.
    Suspension,
}

/// The contents of the `credentialStatus` member of a credential.
///
/// It consists of the URL (`statusListCredential`) where the status list
/// credential can be fetched and the index (`statusListIndex`) of the current
/// credential within that list.
///
/// More can be read [here][1].
///
/// [1]: https://www.w3.org/TR/2023/WD-vc-status-list-20230427/#statuslist2021entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusList2021Entry {
    /// Identifier of the entry, `<statusListCredential>#<statusListIndex>`.
    ///
    /// Optional in the VC 2.0 data model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    /// Always [`STATUS_LIST_2021_ENTRY_TYPE`] for entries created here.
    #[serde(rename = "type")]
    entry_type: String,

    /// What a set bit means.
    status_purpose: StatusPurpose,

    /// The index of the status of the current credential in the list.
    ///
    /// Serialized as a string, as the vocabulary requires; numbers are
    /// accepted when deserializing.
    #[serde(
        serialize_with = "serialize_index",
        deserialize_with = "deserialize_index"
    )]
    status_list_index: u64,

    /// The URL of the status list credential.
    status_list_credential: UriBuf,
}

fn serialize_index<S: Serializer>(index: &u64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&index.to_string())
}

fn deserialize_index<'de, D>(d: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(u64),
        String(String),
    }

    match Index::deserialize(d)? {
        Index::Number(index) => Ok(index),
        Index::String(index) => index
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid statusListIndex \"{}\"", index))),
    }
}

impl StatusList2021Entry {
    /// Creates a new revocation entry for the given list and index.
    pub fn new(status_list_credential: UriBuf, index: u64) -> Self {
        Self {
            id: Some(format!("{}#{}", status_list_credential, index)),
            entry_type: STATUS_LIST_2021_ENTRY_TYPE.to_owned(),
            status_purpose: StatusPurpose::Revocation,
            status_list_index: index,
            status_list_credential,
        }
    }

    /// Gets the identifier of the entry, if it has one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Gets the `type` of the entry.
    pub fn entry_type(&self) -> &str {
        &self.entry_type
    }

    /// Returns `true` if the entry is a StatusList2021 entry.
    pub fn is_status_list_2021(&self) -> bool {
        self.entry_type == STATUS_LIST_2021_ENTRY_TYPE
    }

    /// Gets the purpose of the referenced list.
    pub fn status_purpose(&self) -> StatusPurpose {
        self.status_purpose
    }

    /// Gets the index of the status in the referenced list.
    pub fn index(&self) -> u64 {
        self.status_list_index
    }

    /// Gets the URL of the status list credential.
    pub fn status_list_credential(&self) -> &UriBuf {
        &self.status_list_credential
    }
}

/// The `credentialSubject` of a status list credential, carrying the
/// compressed and encoded bitstring.
///
/// More can be read [here][1].
///
/// [1]: https://www.w3.org/TR/2023/WD-vc-status-list-20230427/#statuslist2021credential
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusList2021Subject {
    /// Identifier of the subject, `<list url>#list`.
    pub id: String,

    /// Always [`STATUS_LIST_2021_TYPE`].
    #[serde(rename = "type")]
    pub subject_type: String,

    /// What a set bit means.
    pub status_purpose: StatusPurpose,

    /// The `GZIP`-compressed, `base64url`-encoded bitstring.
    pub encoded_list: String,
}

impl StatusList2021Subject {
    /// Encodes the given list into a revocation subject for the list
    /// published at `list_url`, padding the bitstring to at least `min_bits`
    /// entries.
    pub fn new(list_url: &UriBuf, list: &StatusListInternal, min_bits: usize) -> Result<Self> {
        Ok(Self {
            id: format!("{}#list", list_url),
            subject_type: STATUS_LIST_2021_TYPE.to_owned(),
            status_purpose: StatusPurpose::Revocation,
            encoded_list: list.encode(min_bits)?,
        })
    }

    /// Decodes the bitstring carried by this subject.
    pub fn status_list(&self) -> Result<StatusList> {
        StatusList::decode(&self.encoded_list)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::MIN_STATUS_LIST_BITS;

    fn list_url() -> UriBuf {
        UriBuf::new(b"https://example.com/status/3".to_vec()).unwrap()
    }

    #[test]
    fn test_entry_serialization() {
        let entry = StatusList2021Entry::new(list_url(), 94567);

        assert_eq!(
            json!({
                "id": "https://example.com/status/3#94567",
                "type": "StatusList2021Entry",
                "statusPurpose": "revocation",
                "statusListIndex": "94567",
                "statusListCredential": "https://example.com/status/3"
            }),
            serde_json::to_value(&entry).unwrap()
        );
    }

    #[test]
    fn test_entry_deserialize_numeric_index() {
        let entry: StatusList2021Entry = serde_json::from_value(json!({
            "id": "https://example.com/status/3#7",
            "type": "StatusList2021Entry",
            "statusPurpose": "revocation",
            "statusListIndex": 7,
            "statusListCredential": "https://example.com/status/3"
        }))
        .unwrap();

        assert_eq!(7, entry.index());
        assert!(entry.is_status_list_2021());
        assert_eq!(&list_url(), entry.status_list_credential());
    }

    #[test]
    fn test_entry_without_id() {
        let entry: StatusList2021Entry = serde_json::from_value(json!({
            "type": "StatusList2021Entry",
            "statusPurpose": "revocation",
            "statusListIndex": "12",
            "statusListCredential": "https://example.com/status/3"
        }))
        .unwrap();

        assert_eq!(None, entry.id());
        assert_eq!(12, entry.index());
        assert!(serde_json::to_value(&entry).unwrap().get("id").is_none());
    }

    #[test]
    fn test_entry_deserialize_invalid_index_fails() {
        let result = serde_json::from_value::<StatusList2021Entry>(json!({
            "id": "https://example.com/status/3#x",
            "type": "StatusList2021Entry",
            "statusPurpose": "revocation",
            "statusListIndex": "seven",
            "statusListCredential": "https://example.com/status/3"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_subject_round_trip() {
        let mut list = StatusListInternal::new();
        for _ in 0..5 {
            list.push();
        }
        list.revoke(2).unwrap();

        let subject = StatusList2021Subject::new(&list_url(), &list, MIN_STATUS_LIST_BITS).unwrap();

        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["type"], "StatusList2021");
        assert_eq!(json["id"], "https://example.com/status/3#list");

        let decoded: StatusList2021Subject = serde_json::from_value(json).unwrap();
        let bits = decoded.status_list().unwrap();

        assert_eq!(Some(true), bits.get(2));
        assert_eq!(Some(false), bits.get(3));
        assert_eq!(MIN_STATUS_LIST_BITS, bits.capacity());
    }
}
