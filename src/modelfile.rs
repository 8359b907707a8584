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

//! Reads and writes the two per-language binary files described in §4.5:
//! `uni-bi-trigrams` and `quadri-fivegrams`. Both share one layout: the
//! language's [`CharOffsets`] table, then one tagged [`NgramMap`] per
//! n-gram length, then a single trailing marker byte that every reader
//! checks for so truncated or over-long files are rejected rather than
//! silently misread.

use crate::charoffsets::CharOffsets;
use crate::encoded_map::{SortedKeyMap, U32TrieMap};
use crate::error::LinguaError;
use crate::lookup::{NgramMap, QuadriFivegram, UniBiTrigram};
use compact_str::CompactString;
use std::collections::HashMap;
use std::io::{Read, Write};

const END_OF_FILE_MARKER: u8 = 0xA5;

const TAG_U8: u8 = 0;
const TAG_U16: u8 = 1;
const TAG_U32: u8 = 2;
const TAG_U32_TRIE: u8 = 3;
const TAG_U64: u8 = 4;
const TAG_STR: u8 = 5;

/// `is_unigram` is only meaningful for the `SortedKeyMap` variants: it picks
/// the §4.5 item 3 value-store length-field width (`u16` for the unigram
/// map, `u32` for every larger n-gram length). The trie and string variants
/// have their own fixed layouts and ignore it.
fn write_ngram_map(map: &NgramMap, w: &mut impl Write, is_unigram: bool) -> std::io::Result<()> {
    match map {
        NgramMap::U8(m) => {
            w.write_all(&[TAG_U8])?;
            m.write(w, is_unigram)
        }
        NgramMap::U16(m) => {
            w.write_all(&[TAG_U16])?;
            m.write(w, is_unigram)
        }
        NgramMap::U32(m) => {
            w.write_all(&[TAG_U32])?;
            m.write(w, is_unigram)
        }
        NgramMap::U32Trie(m) => {
            w.write_all(&[TAG_U32_TRIE])?;
            m.write(w)
        }
        NgramMap::U64(m) => {
            w.write_all(&[TAG_U64])?;
            m.write(w, is_unigram)
        }
        NgramMap::Str(m) => {
            w.write_all(&[TAG_STR])?;
            w.write_all(&(m.len() as u32).to_be_bytes())?;
            for (key, value) in m {
                let bytes = key.as_bytes();
                w.write_all(&(bytes.len() as u8).to_be_bytes())?;
                w.write_all(bytes)?;
                w.write_all(&value.to_be_bytes())?;
            }
            Ok(())
        }
    }
}

fn read_ngram_map(r: &mut impl Read, is_unigram: bool) -> Result<NgramMap, LinguaError> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)
        .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
    match tag[0] {
        TAG_U8 => Ok(NgramMap::U8(SortedKeyMap::read(r, is_unigram)?)),
        TAG_U16 => Ok(NgramMap::U16(SortedKeyMap::read(r, is_unigram)?)),
        TAG_U32 => Ok(NgramMap::U32(SortedKeyMap::read(r, is_unigram)?)),
        TAG_U32_TRIE => Ok(NgramMap::U32Trie(U32TrieMap::read(r)?)),
        TAG_U64 => Ok(NgramMap::U64(SortedKeyMap::read(r, is_unigram)?)),
        TAG_STR => {
            let mut count_bytes = [0u8; 4];
            r.read_exact(&mut count_bytes)
                .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
            let count = u32::from_be_bytes(count_bytes) as usize;
            let mut map = HashMap::with_capacity(count);
            for _ in 0..count {
                let mut len_byte = [0u8; 1];
                r.read_exact(&mut len_byte)
                    .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
                let mut key_bytes = vec![0u8; len_byte[0] as usize];
                r.read_exact(&mut key_bytes)
                    .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
                let key = String::from_utf8(key_bytes)
                    .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
                let mut value_bytes = [0u8; 4];
                r.read_exact(&mut value_bytes)
                    .map_err(|e| LinguaError::ModelCorrupt(e.to_string()))?;
                map.insert(CompactString::from(key), u32::from_be_bytes(value_bytes));
            }
            Ok(NgramMap::Str(map))
        }
        other => Err(LinguaError::ModelCorrupt(format!(
            "unknown ngram map tag {other}"
        ))),
    }
}

fn read_end_marker(r: &mut impl Read) -> Result<(), LinguaError> {
    let mut marker = [0u8; 1];
    match r.read(&mut marker) {
        Ok(0) => Err(LinguaError::ModelCorrupt(
            "model file ended before the trailing marker byte".to_string(),
        )),
        Ok(_) if marker[0] != END_OF_FILE_MARKER => Err(LinguaError::ModelCorrupt(format!(
            "expected trailing marker byte {END_OF_FILE_MARKER:#x}, found {:#x}",
            marker[0]
        ))),
        Ok(_) => {
            let mut rest = [0u8; 1];
            if r.read(&mut rest).map_err(|e| LinguaError::ModelCorrupt(e.to_string()))? != 0 {
                return Err(LinguaError::ModelCorrupt(
                    "trailing bytes found after the model file's end marker".to_string(),
                ));
            }
            Ok(())
        }
        Err(e) => Err(LinguaError::ModelCorrupt(e.to_string())),
    }
}

pub(crate) fn write_uni_bi_trigram(
    lookup: &UniBiTrigram,
    w: &mut impl Write,
) -> std::io::Result<()> {
    lookup.offsets().write(w)?;
    let (unigrams, bigrams, trigrams) = lookup.maps();
    write_ngram_map(unigrams, w, true)?;
    write_ngram_map(bigrams, w, false)?;
    write_ngram_map(trigrams, w, false)?;
    w.write_all(&[END_OF_FILE_MARKER])
}

pub(crate) fn read_uni_bi_trigram(r: &mut impl Read) -> Result<UniBiTrigram, LinguaError> {
    let offsets = CharOffsets::read(r)?;
    let unigrams = read_ngram_map(r, true)?;
    let bigrams = read_ngram_map(r, false)?;
    let trigrams = read_ngram_map(r, false)?;
    read_end_marker(r)?;
    Ok(UniBiTrigram::new(offsets, unigrams, bigrams, trigrams))
}

pub(crate) fn write_quadri_fivegram(
    lookup: &QuadriFivegram,
    w: &mut impl Write,
) -> std::io::Result<()> {
    lookup.offsets().write(w)?;
    let (quadrigrams, fivegrams) = lookup.maps();
    write_ngram_map(quadrigrams, w, false)?;
    write_ngram_map(fivegrams, w, false)?;
    w.write_all(&[END_OF_FILE_MARKER])
}

pub(crate) fn read_quadri_fivegram(r: &mut impl Read) -> Result<QuadriFivegram, LinguaError> {
    let offsets = CharOffsets::read(r)?;
    let quadrigrams = read_ngram_map(r, false)?;
    let fivegrams = read_ngram_map(r, false)?;
    read_end_marker(r)?;
    Ok(QuadriFivegram::new(offsets, quadrigrams, fivegrams))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoded_map::SortedKeyMap;
    use std::io::Cursor;

    fn sample_uni_bi_trigram() -> UniBiTrigram {
        let offsets = CharOffsets::build(&hashmap!('a' => 3, 'b' => 2, 'c' => 1)).unwrap();
        let a = offsets.offset('a').unwrap();
        let unigrams = NgramMap::U8(SortedKeyMap::build(vec![(a as u8, u32::MAX / 2)]).unwrap());
        let bigrams = NgramMap::U16(SortedKeyMap::build(vec![]).unwrap());
        let trigrams = NgramMap::U32(SortedKeyMap::build(vec![]).unwrap());
        UniBiTrigram::new(offsets, unigrams, bigrams, trigrams)
    }

    #[test]
    fn uni_bi_trigram_file_round_trips() {
        let lookup = sample_uni_bi_trigram();
        let mut buffer = Vec::new();
        write_uni_bi_trigram(&lookup, &mut buffer).unwrap();

        let restored = read_uni_bi_trigram(&mut Cursor::new(buffer)).unwrap();
        assert!((restored.frequency("a") - lookup.frequency("a")).abs() < 1e-9);
    }

    #[test]
    fn truncated_file_is_rejected_as_corrupt() {
        let lookup = sample_uni_bi_trigram();
        let mut buffer = Vec::new();
        write_uni_bi_trigram(&lookup, &mut buffer).unwrap();
        buffer.truncate(buffer.len() - 2);

        let result = read_uni_bi_trigram(&mut Cursor::new(buffer));
        assert!(matches!(result, Err(LinguaError::ModelCorrupt(_))));
    }

    #[test]
    fn trailing_bytes_are_rejected_as_corrupt() {
        let lookup = sample_uni_bi_trigram();
        let mut buffer = Vec::new();
        write_uni_bi_trigram(&lookup, &mut buffer).unwrap();
        buffer.push(0);

        let result = read_uni_bi_trigram(&mut Cursor::new(buffer));
        assert!(matches!(result, Err(LinguaError::ModelCorrupt(_))));
    }
}
