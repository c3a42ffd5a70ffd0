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

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    utils::{byte_and_mask, compress_and_encode, decode_and_decompress, pad_to_bits},
    Error, Result,
};

/// The minimum length, in bits, of a published status list.
///
/// A bitstring of at least 16KB (131,072 entries) provides group privacy
/// for the holders when no status list is smaller than that, as recommended
/// [here][1].
///
/// [1]: https://www.w3.org/TR/2023/WD-vc-status-list-20230427/#bitstring-generation-algorithm
pub const MIN_STATUS_LIST_BITS: usize = 131_072;

/// A revocation Status List intended to be used by the Status List Owners to
/// manipulate the list.
///
/// It consists of a [`StatusList`] and its `size`, which is needed to
/// successfully manipulate the list.
///
/// This provides functionalities to create a new empty list, load an existing
/// list, allocate new entries and revoke existing ones. Allocated entries are
/// never removed and a revoked entry is never un-revoked; the list can only
/// grow and bits can only go from `0` to `1`.
///
/// # Note
///
/// This is only intended to be used by the Status List Owners, as they are the
/// ones that are changing the list. All other parties should use the
/// [`StatusList`], which will enable them to read the list at a specific index.
/// It is also what they will receive after decoding a published list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusListInternal {
    /// The actual [`StatusList`].
    status_list: StatusList,

    /// The number of allocated entries of the Status List.
    ///
    /// This field is needed because the size can not be determined from the
    /// `lst` itself, since the last `byte` can still have some space available.
    size: usize,
}

/// A bitstring of revocation statuses of the referenced credentials.
///
/// The status of the credential at index `i` is the bit `i % 8` (counting
/// from the most significant bit) of the byte `i / 8`; `1` means revoked.
///
/// More about the StatusList2021 bitstring can be read [here][1].
///
/// [1]: https://www.w3.org/TR/2023/WD-vc-status-list-20230427/#bitstring-encoding
///
/// The list is serialized by compressing the bits using `GZIP` and
/// `base64url`-encoding the result, resulting in a `String` value. It is
/// deserialized from `String` by reversing the serialization operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusList {
    /// Status bits for all the credentials contained in the Status List.
    lst: Vec<u8>,
}

impl Serialize for StatusList {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let lst_encoded = compress_and_encode(&self.lst)
            .map_err(|e| serde::ser::Error::custom(format!("{:?}", e)))?;

        s.serialize_str(&lst_encoded)
    }
}

impl<'de> Deserialize<'de> for StatusList {
    fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let lst_encoded = String::deserialize(d)?;

        let lst = decode_and_decompress(lst_encoded)
            .map_err(|e| serde::de::Error::custom(format!("{:?}", e)))?;

        Ok(Self { lst })
    }
}

impl StatusListInternal {
    /// Initializes a new empty [`StatusList`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of allocated entries in the Status List.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns a reference to the underlying [`StatusList`].
    pub fn status_list(&self) -> &StatusList {
        &self.status_list
    }

    /// Creates a new [`StatusListInternal`] from its exact parts.
    ///
    /// This function exists as a convenience for Status List Owners to be able
    /// to store the Status List field by field and load it later to utilize the
    /// implemented functionalities.
    ///
    /// # Errors
    ///
    /// The `lst` must be exactly as long as needed to hold `size` entries and
    /// all the bits after the `size`-th one must be `0`, otherwise, the
    /// [`Error::InconsistentSize`] is returned.
    pub fn new_from_parts(lst: Vec<u8>, size: usize) -> Result<Self> {
        if lst.len() != size.div_ceil(8) {
            return Err(bherror::Error::root(Error::InconsistentSize).ctx(format!(
                "{} entries need {} bytes, got {}",
                size,
                size.div_ceil(8),
                lst.len()
            )));
        }

        // The unused low bits of a partially filled last `byte` must be
        // clear, otherwise the `size` is less than the actual size.
        let used_bits = size % 8;
        if let (Some(last_byte), true) = (lst.last(), used_bits != 0) {
            if last_byte & (0xff >> used_bits) != 0 {
                return Err(bherror::Error::root(Error::InconsistentSize)
                    .ctx("last `byte` is not empty after `size` elements"));
            }
        }

        Ok(Self {
            status_list: StatusList { lst },
            size,
        })
    }

    /// Allocates a new, not revoked, entry at the end of the Status List and
    /// returns its index.
    ///
    /// Indexes are handed out sequentially starting from `0`.
    pub fn push(&mut self) -> usize {
        if self.size % 8 == 0 {
            self.status_list.lst.push(0);
        }

        self.size += 1;

        self.size - 1
    }

    /// Sets the entry at the given `index` to revoked.
    ///
    /// Returns `true` if the entry was not revoked before; revoking an already
    /// revoked entry leaves the list untouched and returns `false`.
    ///
    /// # Errors
    ///
    /// The method results in the [`Error::IndexOutOfBounds`] error if the
    /// `index` has not been allocated.
    pub fn revoke(&mut self, index: usize) -> Result<bool> {
        if index >= self.size {
            return Err(bherror::Error::root(Error::IndexOutOfBounds(
                self.size, index,
            )));
        }

        let (byte_idx, mask) = byte_and_mask(index);

        let byte = self
            .status_list
            .lst
            .get_mut(byte_idx)
            // This should never happen because of the earlier `index` check.
            .ok_or_else(|| bherror::Error::root(Error::IndexOutOfBounds(self.size, index)))?;

        let newly_revoked = *byte & mask == 0;
        *byte |= mask;

        Ok(newly_revoked)
    }

    /// Returns whether the entry at the given `index` is revoked.
    ///
    /// # Errors
    ///
    /// The method results in the [`Error::IndexOutOfBounds`] error if the
    /// `index` has not been allocated.
    pub fn is_revoked(&self, index: usize) -> Result<bool> {
        if index >= self.size {
            return Err(bherror::Error::root(Error::IndexOutOfBounds(
                self.size, index,
            )));
        }

        self.status_list
            .get(index)
            .ok_or_else(|| bherror::Error::root(Error::IndexOutOfBounds(self.size, index)))
    }

    /// Compresses and encodes the list for publication, zero-padding it to at
    /// least `min_bits` entries.
    pub fn encode(&self, min_bits: usize) -> Result<String> {
        compress_and_encode(pad_to_bits(self.status_list.lst(), min_bits))
    }
}

impl StatusList {
    /// Decodes a published, `GZIP`-compressed and `base64url`-encoded list.
    pub fn decode(encoded: &str) -> Result<Self> {
        Ok(Self {
            lst: decode_and_decompress(encoded)?,
        })
    }

    /// Gets the reference to the raw Status List data.
    pub fn lst(&self) -> &[u8] {
        &self.lst
    }

    /// The number of entries the list can hold, i.e. its length in bits.
    pub fn capacity(&self) -> usize {
        self.lst.len() * 8
    }

    /// Returns whether the entry at the given `index` is revoked.
    ///
    /// If the `index` is out of bounds for the current [`StatusList`], `None`
    /// is returned.
    pub fn get(&self, index: usize) -> Option<bool> {
        let (byte_idx, mask) = byte_and_mask(index);

        let byte = self.lst.get(byte_idx)?;

        Some(byte & mask != 0)
    }
}

impl From<StatusListInternal> for StatusList {
    fn from(list: StatusListInternal) -> Self {
        list.status_list
    }
}

/// Persisted form of a [`StatusListInternal`].
#[derive(Serialize, Deserialize)]
struct StatusListParts {
    size: usize,
    lst: StatusList,
}

impl Serialize for StatusListInternal {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        StatusListParts {
            size: self.size,
            lst: self.status_list.clone(),
        }
        .serialize(s)
    }
}

impl<'de> Deserialize<'de> for StatusListInternal {
    fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = StatusListParts::deserialize(d)?;

        Self::new_from_parts(parts.lst.lst, parts.size)
            .map_err(|e| serde::de::Error::custom(format!("{:?}", e)))
    }
}
