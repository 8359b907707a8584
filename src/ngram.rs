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
use compact_str::CompactString;
use std::collections::HashSet;
use std::fmt;

/// Per-character offset (when the language's [`CharOffsets`] table has one)
/// and raw code point of one n-gram, up to five characters, built fresh for
/// a (query n-gram, candidate language) pair (§4.2/§4.4). The offsets drive
/// the narrow integer encodings; the raw code points back the wider
/// fallback encodings that skip the offset table entirely when a language's
/// alphabet is too large for the narrow tiers to apply.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct PrimitiveNgram {
    length: u8,
    offsets: [Option<u16>; 5],
    chars: [u32; 5],
}

impl PrimitiveNgram {
    pub(crate) fn length(&self) -> u8 {
        self.length
    }

    fn offsets(&self) -> &[Option<u16>] {
        &self.offsets[..self.length as usize]
    }

    fn all_offsets(&self) -> Option<[u16; 5]> {
        let mut out = [0u16; 5];
        for (i, o) in self.offsets().iter().enumerate() {
            out[i] = (*o)?;
        }
        Some(out)
    }

    /// The narrowest `u8` key (§4.2 length 1): the lone offset, if it fits.
    pub(crate) fn key_u8(&self) -> Option<u8> {
        if self.length != 1 {
            return None;
        }
        let o = self.all_offsets()?;
        u8::try_from(o[0]).ok()
    }

    /// The `u16` key for whichever length this is narrow enough for
    /// (§4.2): the lone raw char for length 1 (offset didn't fit `u8`), an
    /// 8+8 bit offset pair for length 2, 6+5+5 for length 3, 4×4 for length
    /// 4. Length 5 has no `u16` tier.
    pub(crate) fn key_u16(&self) -> Option<u16> {
        match self.length {
            1 => u16::try_from(self.chars[0]).ok(),
            2 => {
                let o = self.all_offsets()?;
                (o[0] <= 0xFF && o[1] <= 0xFF).then(|| (o[0] << 8) | o[1])
            }
            3 => {
                let o = self.all_offsets()?;
                (o[0] < 64 && o[1] < 32 && o[2] < 32)
                    .then(|| (o[0] << 10) | (o[1] << 5) | o[2])
            }
            4 => {
                let o = self.all_offsets()?;
                (o.iter().all(|&x| x < 16))
                    .then(|| (o[0] << 12) | (o[1] << 8) | (o[2] << 4) | o[3])
            }
            _ => None,
        }
    }

    /// The `u32` key (§4.2): raw chars 16+16 for length 2 (offset-narrow
    /// tier didn't fit), 11+11+10 offsets for length 3, 8×4 offsets for
    /// length 4, 7+7+6+6+6 offsets for length 5.
    pub(crate) fn key_u32(&self) -> Option<u32> {
        match self.length {
            2 => {
                let c0 = self.chars[0];
                let c1 = self.chars[1];
                (c0 <= 0xFFFF && c1 <= 0xFFFF).then(|| (c0 << 16) | c1)
            }
            3 => {
                let o = self.all_offsets()?;
                let o = o.map(|v| v as u32);
                (o[0] < 2048 && o[1] < 2048 && o[2] < 1024)
                    .then(|| (o[0] << 21) | (o[1] << 10) | o[2])
            }
            4 => {
                let o = self.all_offsets()?;
                let o = o.map(|v| v as u32);
                (o.iter().all(|&x| x <= 255))
                    .then(|| (o[0] << 24) | (o[1] << 16) | (o[2] << 8) | o[3])
            }
            5 => {
                let o = self.all_offsets()?;
                let o = o.map(|v| v as u32);
                (o[0] < 128 && o[1] < 128 && o[2] < 64 && o[3] < 64 && o[4] < 64)
                    .then(|| (o[0] << 25) | (o[1] << 18) | (o[2] << 12) | (o[3] << 6) | o[4])
            }
            _ => None,
        }
    }

    /// The `u64` key (§4.2): raw chars 16×3/16×4 for lengths 3 and 4 once
    /// even the `u32` tier does not fit, and 13×4+12 offsets for length 5.
    pub(crate) fn key_u64(&self) -> Option<u64> {
        match self.length {
            3 => {
                let c: Vec<u64> = self.chars[..3].iter().map(|&c| c as u64).collect();
                Some((c[0] << 32) | (c[1] << 16) | c[2])
            }
            4 => {
                let c: Vec<u64> = self.chars[..4].iter().map(|&c| c as u64).collect();
                Some((c[0] << 48) | (c[1] << 32) | (c[2] << 16) | c[3])
            }
            5 => {
                let o = self.all_offsets()?;
                let o = o.map(|v| v as u64);
                (o.iter().take(4).all(|&x| x < 8192) && o[4] < 4096).then(|| {
                    (o[0] << 51) | (o[1] << 38) | (o[2] << 25) | (o[3] << 12) | o[4]
                })
            }
            _ => None,
        }
    }

    /// The raw characters of this n-gram, offset table notwithstanding
    /// (§4.2 length-5 fallback): when neither `key_u32` nor `key_u64` fits
    /// the offsets this language assigned, the model generator stores the
    /// fivegram as a literal 5-char string instead, so this is what a
    /// `NgramMap::Str` lookup needs.
    pub(crate) fn as_raw_string(&self) -> CompactString {
        self.chars[..self.length as usize]
            .iter()
            .map(|&c| char::from_u32(c).expect("chars lane holds a valid scalar value"))
            .collect()
    }

    /// Drops the trailing character, producing the next-lower-order
    /// n-gram, or `None` once the unigram has been reached.
    pub(crate) fn lower_order(&self) -> Option<PrimitiveNgram> {
        if self.length <= 1 {
            return None;
        }
        let mut offsets = [None; 5];
        let mut chars = [0u32; 5];
        let new_len = self.length as usize - 1;
        offsets[..new_len].copy_from_slice(&self.offsets[..new_len]);
        chars[..new_len].copy_from_slice(&self.chars[..new_len]);
        Some(PrimitiveNgram {
            length: new_len as u8,
            offsets,
            chars,
        })
    }
}

/// A quadrigram or fivegram, or any shorter n-gram containing a character
/// absent from the language's [`CharOffsets`] table, represented as a
/// compact inline string rather than a packed integer.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct ObjectNgram(CompactString);

impl ObjectNgram {
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub(crate) fn lower_order(&self) -> Option<ObjectNgram> {
        let char_count = self.0.chars().count();
        if char_count <= 1 {
            return None;
        }
        let truncated: String = self.0.chars().take(char_count - 1).collect();
        Some(ObjectNgram(CompactString::from(truncated)))
    }
}

impl fmt::Display for ObjectNgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tagged union of the two n-gram representations, built fresh for a
/// given (query n-gram, candidate language) pair at scoring time (§4.7).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum NgramRef {
    Primitive(PrimitiveNgram),
    Object(ObjectNgram),
}

impl NgramRef {
    /// Builds the representation of `text` (1 to 5 letters) relative to
    /// `offsets`. Lengths 1 to 5 all attempt the primitive form; only a
    /// length whose every character is outside the table's BMP assumption
    /// falls all the way back to a string n-gram, since the widest integer
    /// tiers (§4.2) carry raw code points rather than offsets for lengths
    /// 2 to 4.
    pub(crate) fn new(text: &str, offsets: &CharOffsets) -> NgramRef {
        let chars: Vec<char> = text.chars().collect();
        debug_assert!(
            (1..=5).contains(&chars.len()),
            "ngram '{text}' has length outside 1..=5"
        );

        if chars.iter().all(|&c| (c as u32) <= 0xFFFF) {
            let mut offset_lanes = [None; 5];
            let mut char_lanes = [0u32; 5];
            for (i, &c) in chars.iter().enumerate() {
                offset_lanes[i] = offsets.offset(c);
                char_lanes[i] = c as u32;
            }
            return NgramRef::Primitive(PrimitiveNgram {
                length: chars.len() as u8,
                offsets: offset_lanes,
                chars: char_lanes,
            });
        }

        NgramRef::Object(ObjectNgram(CompactString::from(text)))
    }

    pub(crate) fn lower_order(&self) -> Option<NgramRef> {
        match self {
            NgramRef::Primitive(p) => p.lower_order().map(NgramRef::Primitive),
            NgramRef::Object(o) => o.lower_order().map(NgramRef::Object),
        }
    }
}

/// An n-gram iterator that peels one trailing character off at a time,
/// down to the unigram, used by the scorer's back-off chain (§4.11 step 3).
pub(crate) struct LowerOrderNgrams {
    current: Option<NgramRef>,
}

impl Iterator for LowerOrderNgrams {
    type Item = NgramRef;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current.clone();
        self.current = result.as_ref().and_then(NgramRef::lower_order);
        result
    }
}

pub(crate) fn range_of_lower_order_ngrams(ngram: NgramRef) -> LowerOrderNgrams {
    LowerOrderNgrams {
        current: Some(ngram),
    }
}

/// All n-grams of one fixed length extracted from a cleaned query text
/// (§4.6), kept as plain strings since the packed/object choice made by
/// [`NgramRef::new`] depends on which candidate language's char offsets it
/// will be scored against. Each n-gram is 1 to 5 characters, so the
/// [`CompactString`] backing never spills to the heap, which keeps
/// extraction itself allocation-free per n-gram (§9).
///
/// Built fresh for every [`detect`](crate::LanguageDetector::detect) call
/// and dropped once scoring for that length has completed.
#[derive(Default)]
pub(crate) struct TestDataModel {
    ngrams: Vec<CompactString>,
}

impl TestDataModel {
    /// Scans `text` left to right; any window containing a non-letter is
    /// skipped and scanning restarts just past that character (§4.6).
    pub(crate) fn from_text(text: &str, ngram_length: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut seen = HashSet::new();
        let mut ngrams = Vec::new();

        if chars.len() >= ngram_length {
            for window in chars.windows(ngram_length) {
                if window.iter().all(|c| c.is_alphabetic()) {
                    let candidate: CompactString = window.iter().collect();
                    if seen.insert(candidate.clone()) {
                        ngrams.push(candidate);
                    }
                }
            }
        }

        Self { ngrams }
    }

    pub(crate) fn ngrams(&self) -> &[CompactString] {
        &self.ngrams
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets() -> CharOffsets {
        CharOffsets::build(&hashmap!('a' => 5, 'b' => 4, 'c' => 3)).unwrap()
    }

    #[test]
    fn primitive_ngram_round_trips_length() {
        let table = offsets();
        let ngram = NgramRef::new("ab", &table);
        match ngram {
            NgramRef::Primitive(p) => assert_eq!(p.length(), 2),
            NgramRef::Object(_) => panic!("expected a primitive ngram"),
        }
    }

    #[test]
    fn bigram_u16_keys_stay_distinct_across_first_characters() {
        let table = CharOffsets::build(&hashmap!('a' => 3, 'b' => 2, 'h' => 1)).unwrap();
        let ah = match NgramRef::new("ah", &table) {
            NgramRef::Primitive(p) => p.key_u16().unwrap(),
            _ => panic!("expected primitive"),
        };
        let bh = match NgramRef::new("bh", &table) {
            NgramRef::Primitive(p) => p.key_u16().unwrap(),
            _ => panic!("expected primitive"),
        };
        assert_ne!(ah, bh, "bigrams sharing a second letter must not collide");
    }

    #[test]
    fn unknown_character_still_yields_a_primitive_with_no_offset() {
        let table = offsets();
        let ngram = NgramRef::new("az", &table);
        match ngram {
            NgramRef::Primitive(p) => assert_eq!(p.key_u16(), None),
            NgramRef::Object(_) => panic!("expected a primitive ngram carrying a missing offset"),
        }
    }

    #[test]
    fn as_raw_string_recovers_the_original_characters() {
        let table = offsets();
        match NgramRef::new("abcab", &table) {
            NgramRef::Primitive(p) => assert_eq!(p.as_raw_string().as_str(), "abcab"),
            NgramRef::Object(_) => panic!("expected a primitive ngram"),
        }
    }

    #[test]
    fn four_and_five_character_ngrams_stay_primitive_when_in_the_bmp() {
        let table = offsets();
        assert!(matches!(NgramRef::new("abca", &table), NgramRef::Primitive(_)));
        assert!(matches!(NgramRef::new("abcab", &table), NgramRef::Primitive(_)));
    }

    #[test]
    fn lower_order_chain_reaches_the_unigram() {
        let table = offsets();
        let trigram = NgramRef::new("abc", &table);
        let chain: Vec<_> = range_of_lower_order_ngrams(trigram).collect();
        assert_eq!(chain.len(), 3);
        match &chain[2] {
            NgramRef::Primitive(p) => assert_eq!(p.length(), 1),
            NgramRef::Object(_) => panic!("expected a primitive ngram"),
        }
    }

    #[test]
    fn test_data_model_deduplicates_and_filters_non_letters() {
        let model = TestDataModel::from_text("ababab", 2);
        assert_eq!(model.ngrams().len(), 2);
    }

    #[test]
    fn test_data_model_skips_windows_touching_non_letters() {
        let model = TestDataModel::from_text("ab cd", 3);
        assert!(model.is_empty());
    }
}
