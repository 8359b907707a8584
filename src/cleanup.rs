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

//! Input cleanup (§4.8) and word splitting (§4.9). The cleaned text is the
//! only string allocation per `detect` call (§9); everything downstream
//! (n-gram extraction, word views) borrows from it.

use crate::alphabet::Alphabet;
use crate::constant::charclass::{MULTIPLE_WHITESPACE, NUMBERS, PUNCTUATION};

/// Lowercases, strips punctuation and digits, and collapses whitespace runs
/// to single spaces, trimming both ends.
pub(crate) fn clean_up_input_text(text: &str) -> String {
    let lowercased = text.trim().to_lowercase();
    let without_punctuation = PUNCTUATION.replace_all(&lowercased, "");
    let without_numbers = NUMBERS.replace_all(&without_punctuation, "");
    let normalized = MULTIPLE_WHITESPACE.replace_all(&without_numbers, " ");
    normalized.trim().to_string()
}

fn is_logogram(c: char) -> bool {
    let mut buffer = [0u8; 4];
    let s = c.encode_utf8(&mut buffer);
    Alphabet::Han.matches(s) || Alphabet::Hiragana.matches(s) || Alphabet::Katakana.matches(s)
}

/// Splits `text` on spaces, additionally carving out every logogram
/// character (Han, Hiragana, Katakana) as its own one-character word, since
/// those scripts have no whitespace between words.
pub(crate) fn split_text_into_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for segment in text.split(' ') {
        if segment.is_empty() {
            continue;
        }
        let mut start = 0;
        for (byte_index, c) in segment.char_indices() {
            if is_logogram(c) {
                if byte_index > start {
                    words.push(&segment[start..byte_index]);
                }
                words.push(&segment[byte_index..byte_index + c.len_utf8()]);
                start = byte_index + c.len_utf8();
            }
        }
        if start < segment.len() {
            words.push(&segment[start..]);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_lowercases_and_strips_punctuation_and_digits() {
        assert_eq!(clean_up_input_text("Hello, World! 123"), "hello world");
    }

    #[test]
    fn cleanup_collapses_whitespace_runs() {
        assert_eq!(clean_up_input_text("a   b\t\tc"), "a b c");
    }

    #[test]
    fn word_splitter_keeps_plain_words_intact() {
        assert_eq!(split_text_into_words("hello world"), vec!["hello", "world"]);
    }

    #[test]
    fn word_splitter_carves_out_each_logogram_as_its_own_word() {
        assert_eq!(
            split_text_into_words("上海大学"),
            vec!["上", "海", "大", "学"]
        );
    }

    #[test]
    fn word_splitter_handles_mixed_logogram_and_latin_segments() {
        assert_eq!(split_text_into_words("abc上def"), vec!["abc", "上", "def"]);
    }
}
