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
use std::collections::HashMap;
use std::io::{Read, Write};

/// Maps the characters a language's n-gram models were trained on to small,
/// densely packed offsets, so that short n-grams can be packed into a
/// single machine word instead of stored as strings.
///
/// Offsets are assigned in descending frequency order: the character that
/// occurs in the most n-grams gets offset 0. This keeps offsets for common
/// characters small, which in turn keeps the packed encodings of common
/// n-grams small and improves the odds of a narrow map key being usable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CharOffsets {
    chars: Vec<char>,
    offsets: Vec<u16>,
}

impl CharOffsets {
    /// Builds the table from per-character occurrence counts gathered while
    /// extracting n-grams of every length for one language.
    pub fn build(char_counts: &HashMap<char, u64>) -> Result<Self, LinguaError> {
        // §4.1's guarantee (character count ≤ 65535) is also what lets the
        // table's character count round-trip through the §4.5 binary
        // format's `u16` count field without wrapping.
        if char_counts.len() > u16::MAX as usize {
            return Err(LinguaError::ModelCorrupt(format!(
                "char-offset table has {} characters, more than the {} an offset table can address",
                char_counts.len(),
                u16::MAX
            )));
        }

        let mut by_frequency: Vec<(char, u64)> =
            char_counts.iter().map(|(&c, &count)| (c, count)).collect();
        by_frequency.sort_by(|(c1, count1), (c2, count2)| count2.cmp(count1).then(c1.cmp(c2)));

        let mut pairs: Vec<(char, u16)> = by_frequency
            .into_iter()
            .enumerate()
            .map(|(offset, (c, _))| (c, offset as u16))
            .collect();
        pairs.sort_by_key(|&(c, _)| c);

        let (chars, offsets) = pairs.into_iter().unzip();
        Ok(Self { chars, offsets })
    }

    /// Looks up the offset assigned to `c`, if the table was built from text
    /// containing it.
    pub fn offset(&self, c: char) -> Option<u16> {
        self.chars.binary_search(&c).ok().map(|i| self.offsets[i])
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Writes the char-offsets table in the layout §4.5 items 1-2 mandate:
    /// a `u16` character count (the same 65535 ceiling [`build`] enforces),
    /// that many `u16` characters, then that many `u16` offsets. Characters
    /// are stored narrow because every alphabet this table is built from is
    /// within the Basic Multilingual Plane (§4.2's BMP assumption, shared by
    /// [`crate::ngram::NgramRef::new`]).
    pub(crate) fn write(&self, w: &mut impl Write) -> std::io::Result<()> {
        w.write_all(&(self.chars.len() as u16).to_be_bytes())?;
        for &c in &self.chars {
            let scalar = u16::try_from(c as u32).map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("char {c:?} does not fit the table's u16 encoding"),
                )
            })?;
            w.write_all(&scalar.to_be_bytes())?;
        }
        for &offset in &self.offsets {
            w.write_all(&offset.to_be_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn read(r: &mut impl Read) -> Result<Self, LinguaError> {
        let mut count_bytes = [0u8; 2];
        r.read_exact(&mut count_bytes)
            .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
        let count = u16::from_be_bytes(count_bytes) as usize;

        let mut chars = Vec::with_capacity(count);
        for _ in 0..count {
            let mut buf = [0u8; 2];
            r.read_exact(&mut buf)
                .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
            let scalar = u16::from_be_bytes(buf) as u32;
            chars.push(char::from_u32(scalar).ok_or_else(|| {
                LinguaError::ModelCorrupt(format!("{scalar:#x} is not a valid char scalar value"))
            })?);
        }

        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            let mut buf = [0u8; 2];
            r.read_exact(&mut buf)
                .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
            offsets.push(u16::from_be_bytes(buf));
        }

        Ok(Self { chars, offsets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_bytes() {
        let table = CharOffsets::build(&hashmap!('a' => 10, 'b' => 30, 'c' => 20)).unwrap();
        let mut buffer = Vec::new();
        table.write(&mut buffer).unwrap();
        let restored = CharOffsets::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn offsets_are_assigned_by_descending_frequency() {
        let counts = hashmap!('a' => 10, 'b' => 30, 'c' => 20);
        let table = CharOffsets::build(&counts).unwrap();
        assert_eq!(table.offset('b'), Some(0));
        assert_eq!(table.offset('c'), Some(1));
        assert_eq!(table.offset('a'), Some(2));
    }

    #[test]
    fn unseen_characters_have_no_offset() {
        let counts = hashmap!('a' => 1);
        let table = CharOffsets::build(&counts).unwrap();
        assert_eq!(table.offset('z'), None);
    }

    #[test]
    fn ties_are_broken_deterministically_by_char_order() {
        let counts = hashmap!('b' => 5, 'a' => 5);
        let table = CharOffsets::build(&counts).unwrap();
        assert_eq!(table.offset('a'), Some(0));
        assert_eq!(table.offset('b'), Some(1));
    }
}
