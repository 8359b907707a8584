/*
 * Copyright © 2020-present Peter M. Stahl pemistahl@gmail.com
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either expressed or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::error::LinguaError;
use itertools::Itertools;
use std::collections::HashMap;
use std::io::{self, Read, Write};

/// 0 is the sentinel for "no frequency recorded"; every real encoded
/// frequency is clamped away from it during model generation.
pub(crate) const ABSENT_FREQUENCY: u32 = 0;

/// Either a `u32` per key ("direct"), or a `u16` index per key into a
/// deduplicated table of the distinct `u32` frequencies actually present
/// ("indirect"). Many languages repeat the same handful of relative
/// frequencies across thousands of rare n-grams, so indirection often more
/// than halves a map's footprint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ValueStore {
    Direct(Vec<u32>),
    Indirect {
        indices: Vec<u16>,
        table: Vec<u32>,
    },
}

impl ValueStore {
    fn build(raw_values: &[u32]) -> ValueStore {
        let distinct: Vec<u32> = raw_values.iter().copied().unique().collect();
        let indirect_is_smaller = distinct.len() < raw_values.len() / 2 && distinct.len() <= u16::MAX as usize;

        if !indirect_is_smaller {
            return ValueStore::Direct(raw_values.to_vec());
        }

        let index_of: HashMap<u32, u16> = distinct
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i as u16))
            .collect();
        let indices = raw_values.iter().map(|v| index_of[v]).collect();
        ValueStore::Indirect {
            indices,
            table: distinct,
        }
    }

    fn get(&self, position: usize) -> u32 {
        match self {
            ValueStore::Direct(values) => values[position],
            ValueStore::Indirect { indices, table } => table[indices[position] as usize],
        }
    }

    fn len(&self) -> usize {
        match self {
            ValueStore::Direct(values) => values.len(),
            ValueStore::Indirect { indices, .. } => indices.len(),
        }
    }

    /// Writes the value store (§4.5's "length of indirection array … length
    /// of values" pair). `narrow` selects the width of both length fields:
    /// `u16` for a unigram map, `u32` for everything larger, per §4.5 item
    /// 3's "u16 for unigrams, u32 for larger".
    fn write(&self, w: &mut impl Write, narrow: bool) -> io::Result<()> {
        match self {
            ValueStore::Direct(values) => {
                w.write_all(&[0u8])?;
                write_len(w, values.len(), narrow)?;
                for &v in values {
                    w.write_all(&v.to_be_bytes())?;
                }
            }
            ValueStore::Indirect { indices, table } => {
                w.write_all(&[1u8])?;
                write_len(w, indices.len(), narrow)?;
                write_len(w, table.len(), narrow)?;
                for &v in table {
                    w.write_all(&v.to_be_bytes())?;
                }
                for &i in indices {
                    w.write_all(&i.to_be_bytes())?;
                }
            }
        }
        Ok(())
    }

    fn read(r: &mut impl Read, narrow: bool) -> Result<Self, LinguaError> {
        let mode = read_u8(r)?;
        match mode {
            0 => {
                let count = read_len(r, narrow)?;
                let values = (0..count).map(|_| read_u32(r)).collect::<Result<_, _>>()?;
                Ok(ValueStore::Direct(values))
            }
            1 => {
                let count = read_len(r, narrow)?;
                let distinct = read_len(r, narrow)?;
                let table = (0..distinct).map(|_| read_u32(r)).collect::<Result<_, _>>()?;
                let indices = (0..count).map(|_| read_u16(r)).collect::<Result<_, _>>()?;
                Ok(ValueStore::Indirect { indices, table })
            }
            other => Err(LinguaError::ModelCorrupt(format!(
                "unknown value store mode tag {other}"
            ))),
        }
    }
}

/// Writes a length field at the width §4.5 item 3 specifies: `u16` for a
/// unigram map's indirection/value counts, `u32` otherwise.
fn write_len(w: &mut impl Write, len: usize, narrow: bool) -> io::Result<()> {
    if narrow {
        let len = u16::try_from(len).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unigram map length {len} does not fit the u16 length field"),
            )
        })?;
        w.write_all(&len.to_be_bytes())
    } else {
        w.write_all(&(len as u32).to_be_bytes())
    }
}

fn read_len(r: &mut impl Read, narrow: bool) -> Result<usize, LinguaError> {
    if narrow {
        Ok(read_u16(r)? as usize)
    } else {
        Ok(read_u32(r)? as usize)
    }
}

fn read_u8(r: &mut impl Read) -> Result<u8, LinguaError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)
        .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
    Ok(buf[0])
}

fn read_u16(r: &mut impl Read) -> Result<u16, LinguaError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)
        .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(r: &mut impl Read) -> Result<u32, LinguaError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> Result<u64, LinguaError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)
        .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
    Ok(u64::from_be_bytes(buf))
}

/// A key type an [`SortedKeyMap`] can be read from / written to a binary
/// model file in big-endian form (§4.5).
pub(crate) trait BinaryKey: Ord + Copy {
    fn read_be(r: &mut impl Read) -> Result<Self, LinguaError>;
    fn write_be(&self, w: &mut impl Write) -> io::Result<()>;
}

impl BinaryKey for u8 {
    fn read_be(r: &mut impl Read) -> Result<Self, LinguaError> {
        read_u8(r)
    }
    fn write_be(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&[*self])
    }
}

impl BinaryKey for u16 {
    fn read_be(r: &mut impl Read) -> Result<Self, LinguaError> {
        read_u16(r)
    }
    fn write_be(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.to_be_bytes())
    }
}

impl BinaryKey for u32 {
    fn read_be(r: &mut impl Read) -> Result<Self, LinguaError> {
        read_u32(r)
    }
    fn write_be(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.to_be_bytes())
    }
}

impl BinaryKey for u64 {
    fn read_be(r: &mut impl Read) -> Result<Self, LinguaError> {
        read_u64(r)
    }
    fn write_be(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.to_be_bytes())
    }
}

/// A read-only, binary-searchable map from a sorted key array of type `K`
/// to an encoded `u32` frequency, used for every key type except the
/// `u32`-trie variant (see [`U32TrieMap`]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SortedKeyMap<K> {
    keys: Vec<K>,
    values: ValueStore,
}

impl<K: Ord + Copy> SortedKeyMap<K> {
    /// `entries` need not be pre-sorted; duplicate keys are rejected since a
    /// well-formed model never assigns a frequency twice to the same n-gram.
    pub(crate) fn build(mut entries: Vec<(K, u32)>) -> Result<Self, LinguaError> {
        entries.sort_by_key(|&(k, _)| k);
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(LinguaError::ModelCorrupt(
                    "duplicate key inserted while building an encoded n-gram map".to_string(),
                ));
            }
        }
        let keys = entries.iter().map(|&(k, _)| k).collect();
        let raw_values: Vec<u32> = entries.iter().map(|&(_, v)| v).collect();
        let values = ValueStore::build(&raw_values);
        Ok(Self { keys, values })
    }

    pub(crate) fn get(&self, key: K) -> u32 {
        match self.keys.binary_search(&key) {
            Ok(position) => self.values.get(position),
            Err(_) => ABSENT_FREQUENCY,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn is_indirect(&self) -> bool {
        matches!(self.values, ValueStore::Indirect { .. })
    }
}

impl<K: BinaryKey> SortedKeyMap<K> {
    /// `is_unigram` selects the width of the value store's length fields
    /// per §4.5 item 3 ("u16 for unigrams, u32 for larger"); the map's own
    /// key count is always a `u32`, matching "u32 size" in that same item.
    pub(crate) fn write(&self, w: &mut impl Write, is_unigram: bool) -> io::Result<()> {
        w.write_all(&(self.keys.len() as u32).to_be_bytes())?;
        for key in &self.keys {
            key.write_be(w)?;
        }
        self.values.write(w, is_unigram)
    }

    pub(crate) fn read(r: &mut impl Read, is_unigram: bool) -> Result<Self, LinguaError> {
        let count = read_u32(r)? as usize;
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(K::read_be(r)?);
        }
        let values = ValueStore::read(r, is_unigram)?;
        if values.len() != keys.len() {
            return Err(LinguaError::ModelCorrupt(format!(
                "key count {} does not match value count {}",
                keys.len(),
                values.len()
            )));
        }
        Ok(Self { keys, values })
    }
}

/// An 18-bit signed offset and 14-bit unsigned size packed into one `u32`,
/// addressing a slice of a shared second-level array from a first-byte
/// lookup table entry. A size of 0 means "no second-level entries for this
/// first byte".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct PackedRange(u32);

const SIZE_BITS: u32 = 14;
const SIZE_MASK: u32 = (1 << SIZE_BITS) - 1;
const OFFSET_BITS: u32 = 18;
const OFFSET_SIGN_BIT: i32 = 1 << (OFFSET_BITS - 1);

/// §4.3's estimate for where a first byte's second-level entries begin,
/// assuming keys spread uniformly across the 256 possible first bytes.
/// [`PackedRange`] stores the *delta* from this estimate rather than an
/// absolute start, so the stored offset stays within the 18-bit signed
/// field no matter how many entries the map holds in total; [`U32TrieMap::build`]
/// and [`U32TrieMap::get`] must apply this formula identically.
fn estimate_start(first_byte: u8, total_entries: usize) -> i64 {
    (first_byte as i64 * total_entries as i64) / 256
}

impl PackedRange {
    fn pack(offset: i32, size: u32) -> Result<Self, LinguaError> {
        if size > SIZE_MASK {
            return Err(LinguaError::ModelCorrupt(format!(
                "trie second-level range of size {size} does not fit in {SIZE_BITS} bits"
            )));
        }
        if !(-OFFSET_SIGN_BIT..OFFSET_SIGN_BIT).contains(&offset) {
            return Err(LinguaError::ModelCorrupt(format!(
                "trie second-level offset {offset} does not fit in {OFFSET_BITS} signed bits"
            )));
        }
        let unsigned_offset = (offset + OFFSET_SIGN_BIT) as u32;
        Ok(Self((unsigned_offset << SIZE_BITS) | size))
    }

    fn offset(&self) -> i32 {
        ((self.0 >> SIZE_BITS) as i32) - OFFSET_SIGN_BIT
    }

    fn size(&self) -> u32 {
        self.0 & SIZE_MASK
    }

    pub(crate) fn raw(&self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// A two-level trie over `u32` keys: the first byte selects a range of the
/// shared `second_bytes`/`remainders` arrays (via [`PackedRange`]), and
/// within that range the second byte is binary-searched; a match is
/// confirmed by comparing the remaining 16 bits against `remainders`.
///
/// Each first byte's range start is packed as a delta from
/// [`estimate_start`] rather than as an absolute index (§4.3), so a large
/// map's later first-byte groups don't overflow the 18-bit signed offset
/// field the way an absolute start eventually would.
///
/// Used for quadrigram and fivegram keys, whose first bytes repeat heavily
/// (most quadrigrams sharing a language share a handful of common leading
/// characters), making the flat `SortedKeyMap<u32>` comparatively wasteful.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct U32TrieMap {
    first_byte_index: Vec<PackedRange>,
    second_bytes: Vec<u8>,
    remainders: Vec<u16>,
    values: ValueStore,
}

impl U32TrieMap {
    pub(crate) fn build(mut entries: Vec<(u32, u32)>) -> Result<Self, LinguaError> {
        entries.sort_by_key(|&(k, _)| k);
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(LinguaError::ModelCorrupt(
                    "duplicate key inserted while building a trie n-gram map".to_string(),
                ));
            }
        }

        let total = entries.len();
        let mut first_byte_index = vec![PackedRange::pack(0, 0)?; 256];
        let mut second_bytes = Vec::with_capacity(entries.len());
        let mut remainders = Vec::with_capacity(entries.len());
        let raw_values: Vec<u32> = entries.iter().map(|&(_, v)| v).collect();

        for (first_byte, group) in &entries.iter().group_by(|&&(k, _)| (k >> 24) as u8) {
            let start = second_bytes.len();
            for &(key, _) in group {
                second_bytes.push(((key >> 16) & 0xFF) as u8);
                remainders.push((key & 0xFFFF) as u16);
            }
            let size = second_bytes.len() - start;
            let delta = start as i64 - estimate_start(first_byte, total);
            let delta = i32::try_from(delta).map_err(|_| {
                LinguaError::ModelCorrupt(format!(
                    "trie second-level start {start} for first byte {first_byte} is too far from its estimate to encode"
                ))
            })?;
            first_byte_index[first_byte as usize] = PackedRange::pack(delta, size as u32)?;
        }

        let values = ValueStore::build(&raw_values);
        Ok(Self {
            first_byte_index,
            second_bytes,
            remainders,
            values,
        })
    }

    pub(crate) fn get(&self, key: u32) -> u32 {
        let first_byte = (key >> 24) as u8;
        let range = self.first_byte_index[first_byte as usize];
        let size = range.size() as usize;
        if size == 0 {
            return ABSENT_FREQUENCY;
        }
        let estimate = estimate_start(first_byte, self.second_bytes.len());
        let start = (estimate + range.offset() as i64) as usize;
        let second_byte = ((key >> 16) & 0xFF) as u8;
        let remainder = (key & 0xFFFF) as u16;

        let slice = &self.second_bytes[start..start + size];
        match slice.binary_search(&second_byte) {
            Ok(_) => {
                // second bytes need not be unique within the range (several
                // distinct remainders can share a first+second byte pair),
                // so scan the matching run for the exact remainder.
                let mut i = slice.partition_point(|&b| b < second_byte);
                while i < slice.len() && slice[i] == second_byte {
                    if self.remainders[start + i] == remainder {
                        return self.values.get(start + i);
                    }
                    i += 1;
                }
                ABSENT_FREQUENCY
            }
            Err(_) => ABSENT_FREQUENCY,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn write(&self, w: &mut impl Write) -> io::Result<()> {
        for range in &self.first_byte_index {
            w.write_all(&range.raw().to_be_bytes())?;
        }
        w.write_all(&(self.second_bytes.len() as u32).to_be_bytes())?;
        w.write_all(&self.second_bytes)?;
        for &r in &self.remainders {
            w.write_all(&r.to_be_bytes())?;
        }
        self.values.write(w, false)
    }

    pub(crate) fn read(r: &mut impl Read) -> Result<Self, LinguaError> {
        let mut first_byte_index = Vec::with_capacity(256);
        for _ in 0..256 {
            first_byte_index.push(PackedRange::from_raw(read_u32(r)?));
        }
        let second_count = read_u32(r)? as usize;
        let mut second_bytes = vec![0u8; second_count];
        r.read_exact(&mut second_bytes)
            .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
        let remainders = (0..second_count)
            .map(|_| read_u16(r))
            .collect::<Result<Vec<_>, _>>()?;
        let values = ValueStore::read(r, false)?;
        if values.len() != second_count {
            return Err(LinguaError::ModelCorrupt(format!(
                "trie second-level count {} does not match value count {}",
                second_count,
                values.len()
            )));
        }
        Ok(Self {
            first_byte_index,
            second_bytes,
            remainders,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn sorted_key_map_round_trips_through_bytes() {
        let map = SortedKeyMap::build(vec![(3u16, 100), (1u16, 200), (2u16, 300)]).unwrap();
        let mut buffer = Vec::new();
        map.write(&mut buffer, false).unwrap();
        let restored: SortedKeyMap<u16> =
            SortedKeyMap::read(&mut Cursor::new(buffer), false).unwrap();
        assert_eq!(restored.get(1), 200);
        assert_eq!(restored.get(2), 300);
        assert_eq!(restored.get(3), 100);
    }

    #[test]
    fn sorted_key_map_round_trips_through_bytes_in_unigram_mode() {
        let map = SortedKeyMap::build(vec![(3u16, 100), (1u16, 200), (2u16, 300)]).unwrap();
        let mut buffer = Vec::new();
        map.write(&mut buffer, true).unwrap();
        let restored: SortedKeyMap<u16> =
            SortedKeyMap::read(&mut Cursor::new(buffer), true).unwrap();
        assert_eq!(restored.get(1), 200);
        assert_eq!(restored.get(2), 300);
        assert_eq!(restored.get(3), 100);
    }

    #[test]
    fn trie_map_round_trips_through_bytes() {
        let entries = vec![(0x0100_0001u32, 10u32), (0x02FF_0003, 12)];
        let map = U32TrieMap::build(entries).unwrap();
        let mut buffer = Vec::new();
        map.write(&mut buffer).unwrap();
        let restored = U32TrieMap::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(restored.get(0x0100_0001), 10);
        assert_eq!(restored.get(0x02FF_0003), 12);
    }

    #[test]
    fn sorted_key_map_round_trips_lookups() {
        let map = SortedKeyMap::build(vec![(3u16, 100), (1u16, 200), (2u16, 300)]).unwrap();
        assert_eq!(map.get(1), 200);
        assert_eq!(map.get(2), 300);
        assert_eq!(map.get(3), 100);
        assert_eq!(map.get(9), ABSENT_FREQUENCY);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = SortedKeyMap::build(vec![(1u8, 1), (1u8, 2)]);
        assert!(matches!(result, Err(LinguaError::ModelCorrupt(_))));
    }

    #[test]
    fn indirect_storage_is_chosen_when_values_repeat_heavily() {
        let entries: Vec<(u16, u32)> = (0..100u16).map(|k| (k, (k % 3) as u32 + 1)).collect();
        let map = SortedKeyMap::build(entries).unwrap();
        assert!(map.is_indirect());
        assert_eq!(map.get(7), 2);
    }

    #[test]
    fn trie_map_round_trips_lookups_across_first_byte_boundaries() {
        let keys = [0x0100_0001u32, 0x0100_0002, 0x02FF_0003, 0xFF00_0004];
        let entries: Vec<(u32, u32)> = keys.iter().enumerate().map(|(i, &k)| (k, i as u32 + 10)).collect();
        let map = U32TrieMap::build(entries).unwrap();
        assert_eq!(map.get(0x0100_0001), 10);
        assert_eq!(map.get(0x0100_0002), 11);
        assert_eq!(map.get(0x02FF_0003), 12);
        assert_eq!(map.get(0xFF00_0004), 13);
        assert_eq!(map.get(0x0100_0099), ABSENT_FREQUENCY);
        assert_eq!(map.get(0x0300_0000), ABSENT_FREQUENCY);
    }

    #[test]
    fn packed_range_round_trips_negative_offsets() {
        let range = PackedRange::pack(-5, 12).unwrap();
        assert_eq!(range.offset(), -5);
        assert_eq!(range.size(), 12);
    }

    #[test]
    fn trie_map_handles_first_byte_groups_starting_past_the_old_absolute_offset_limit() {
        // First byte 0 alone holds 131072 entries, so first byte 1's second-level
        // range starts at absolute index 131072 - one past what an 18-bit signed
        // *absolute* offset could address. Storing the start as a delta from the
        // §4.3 estimate keeps it representable regardless.
        let mut entries: Vec<(u32, u32)> = (0..131072u32)
            .map(|i| {
                let second_byte = i % 256;
                let remainder = i / 256;
                ((second_byte << 16) | remainder, i)
            })
            .collect();
        entries.push((0x0100_0000, 999));

        let map = U32TrieMap::build(entries).unwrap();
        assert_eq!(map.get(0x0100_0000), 999);
        assert_eq!(map.get(0), 0);
        assert_eq!(map.get(0x0200_0000), ABSENT_FREQUENCY);

        let mut buffer = Vec::new();
        map.write(&mut buffer).unwrap();
        let restored = U32TrieMap::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(restored.get(0x0100_0000), 999);
        assert_eq!(restored.get(0), 0);
    }
}
