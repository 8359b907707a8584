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

use crate::charoffsets::CharOffsets;
use crate::encoded_map::{SortedKeyMap, U32TrieMap, ABSENT_FREQUENCY};
use crate::ngram::NgramRef;
use compact_str::CompactString;
use std::collections::HashMap;

/// One concrete encoding for the n-grams of a single length, chosen at
/// model-generation time by whichever key type packs that language's
/// alphabet most tightly (§4.2/§4.3). `Str` backs both object n-grams that
/// could not be packed and, for fivegrams only, the §4.2 fallback case where
/// a language's offsets overflow even the widest `u64` tier (e.g. a
/// large-alphabet script like Hangul), so the model generator stored the
/// key as a literal 5-char string instead.
pub(crate) enum NgramMap {
    U8(SortedKeyMap<u8>),
    U16(SortedKeyMap<u16>),
    U32(SortedKeyMap<u32>),
    U32Trie(U32TrieMap),
    U64(SortedKeyMap<u64>),
    Str(HashMap<CompactString, u32>),
}

impl NgramMap {
    /// Each variant's key was built by the model generator for the exact
    /// bit layout it stores (§4.2): the narrow offset tiers for `U8`/part
    /// of `U16`/`U32`, the raw-codepoint fallback tiers for the rest. A
    /// query ngram that cannot be packed that way (e.g. a character
    /// outside this language's offset table) simply is not in the map.
    fn get(&self, ngram: &NgramRef) -> u32 {
        match (self, ngram) {
            (NgramMap::U8(map), NgramRef::Primitive(p)) => {
                p.key_u8().map(|k| map.get(k)).unwrap_or(ABSENT_FREQUENCY)
            }
            (NgramMap::U16(map), NgramRef::Primitive(p)) => {
                p.key_u16().map(|k| map.get(k)).unwrap_or(ABSENT_FREQUENCY)
            }
            (NgramMap::U32(map), NgramRef::Primitive(p)) => {
                p.key_u32().map(|k| map.get(k)).unwrap_or(ABSENT_FREQUENCY)
            }
            (NgramMap::U32Trie(map), NgramRef::Primitive(p)) => {
                p.key_u32().map(|k| map.get(k)).unwrap_or(ABSENT_FREQUENCY)
            }
            (NgramMap::U64(map), NgramRef::Primitive(p)) => {
                p.key_u64().map(|k| map.get(k)).unwrap_or(ABSENT_FREQUENCY)
            }
            (NgramMap::Str(map), NgramRef::Object(o)) => {
                map.get(o.as_str()).copied().unwrap_or(ABSENT_FREQUENCY)
            }
            // A fivegram that is still a Primitive (every character fit in
            // the BMP) but whose offsets overflowed the u32/u64 tiers is
            // looked up by its raw characters, matching how the model
            // generator fell back to a string key for it (§4.2).
            (NgramMap::Str(map), NgramRef::Primitive(p)) => map
                .get(p.as_raw_string().as_str())
                .copied()
                .unwrap_or(ABSENT_FREQUENCY),
            // A map built for one of the remaining representations never
            // sees ngrams of another: TestDataModel windows are a fixed
            // length per call, and NgramRef::new picks its representation
            // deterministically from that length and the target language's
            // offsets.
            _ => ABSENT_FREQUENCY,
        }
    }
}

fn decode(encoded: u32) -> f64 {
    if encoded == ABSENT_FREQUENCY {
        0.0
    } else {
        encoded as f64 / (u32::MAX as f64 + 1.0)
    }
}

/// Owns the unigram, bigram and trigram maps for one language.
pub(crate) struct UniBiTrigram {
    offsets: CharOffsets,
    unigrams: NgramMap,
    bigrams: NgramMap,
    trigrams: NgramMap,
}

impl UniBiTrigram {
    pub(crate) fn new(
        offsets: CharOffsets,
        unigrams: NgramMap,
        bigrams: NgramMap,
        trigrams: NgramMap,
    ) -> Self {
        Self {
            offsets,
            unigrams,
            bigrams,
            trigrams,
        }
    }

    /// Relative frequency of `ngram_text` (length 1 to 3), or `0.0` if it
    /// was never observed while training this language's model.
    pub(crate) fn frequency(&self, ngram_text: &str) -> f64 {
        let length = ngram_text.chars().count();
        let ngram = NgramRef::new(ngram_text, &self.offsets);
        let map = match length {
            1 => &self.unigrams,
            2 => &self.bigrams,
            3 => &self.trigrams,
            other => panic!("UniBiTrigram only answers lengths 1..=3, got {other}"),
        };
        decode(map.get(&ngram))
    }

    pub(crate) fn offsets(&self) -> &CharOffsets {
        &self.offsets
    }

    pub(crate) fn maps(&self) -> (&NgramMap, &NgramMap, &NgramMap) {
        (&self.unigrams, &self.bigrams, &self.trigrams)
    }

    pub(crate) fn unigram_count(&self) -> usize {
        match &self.unigrams {
            NgramMap::U8(m) => m.len(),
            NgramMap::U16(m) => m.len(),
            NgramMap::U32(m) => m.len(),
            NgramMap::U32Trie(m) => m.len(),
            NgramMap::U64(m) => m.len(),
            NgramMap::Str(m) => m.len(),
        }
    }
}

/// Owns the quadrigram and fivegram maps for one language.
pub(crate) struct QuadriFivegram {
    offsets: CharOffsets,
    quadrigrams: NgramMap,
    fivegrams: NgramMap,
}

impl QuadriFivegram {
    pub(crate) fn new(offsets: CharOffsets, quadrigrams: NgramMap, fivegrams: NgramMap) -> Self {
        Self {
            offsets,
            quadrigrams,
            fivegrams,
        }
    }

    /// Relative frequency of `ngram_text` (length 4 or 5), or `0.0` if it
    /// was never observed while training this language's model.
    pub(crate) fn frequency(&self, ngram_text: &str) -> f64 {
        let length = ngram_text.chars().count();
        let ngram = NgramRef::new(ngram_text, &self.offsets);
        let map = match length {
            4 => &self.quadrigrams,
            5 => &self.fivegrams,
            other => panic!("QuadriFivegram only answers lengths 4..=5, got {other}"),
        };
        decode(map.get(&ngram))
    }

    pub(crate) fn offsets(&self) -> &CharOffsets {
        &self.offsets
    }

    pub(crate) fn maps(&self) -> (&NgramMap, &NgramMap) {
        (&self.quadrigrams, &self.fivegrams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoded_map::SortedKeyMap;

    fn offsets() -> CharOffsets {
        CharOffsets::build(&hashmap!('a' => 3, 'b' => 2, 'c' => 1)).unwrap()
    }

    #[test]
    fn uni_bi_trigram_decodes_stored_frequencies() {
        let table = offsets();
        let a_offset = table.offset('a').unwrap();
        let unigrams = NgramMap::U8(SortedKeyMap::build(vec![(a_offset as u8, u32::MAX)]).unwrap());
        let bigrams = NgramMap::U16(SortedKeyMap::build(vec![]).unwrap());
        let trigrams = NgramMap::U32(SortedKeyMap::build(vec![]).unwrap());
        let lookup = UniBiTrigram::new(table, unigrams, bigrams, trigrams);

        assert!((lookup.frequency("a") - 1.0).abs() < 1e-9);
        assert_eq!(lookup.frequency("b"), 0.0);
    }

    #[test]
    fn quadri_fivegram_falls_back_to_the_string_map_for_overflowing_fivegrams() {
        let table = offsets();
        let mut fivegram_frequencies = HashMap::new();
        fivegram_frequencies.insert(CompactString::from("abcab"), u32::MAX);
        let quadrigrams = NgramMap::U16(SortedKeyMap::build(vec![]).unwrap());
        let fivegrams = NgramMap::Str(fivegram_frequencies);
        let lookup = QuadriFivegram::new(table, quadrigrams, fivegrams);

        assert!((lookup.frequency("abcab") - 1.0).abs() < 1e-9);
        assert_eq!(lookup.frequency("bcabc"), 0.0);
    }
}
