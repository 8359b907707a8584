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

//! The rule-based filter (§4.10): cheap script- and character-level
//! heuristics that either settle on a language outright or narrow the
//! candidate set handed to the n-gram scorer.

use crate::alphabet::Alphabet;
use crate::constant::charmapping::CHARS_TO_LANGUAGES_MAPPING;
use crate::language::Language;
use crate::language::Language::{Chinese, Japanese};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use strum::IntoEnumIterator;

const LOGOGRAM_WORD_WEIGHT: f64 = 0.7;
const FULL_WORD_WEIGHT: f64 = 1.0;

fn increment<T: Eq + Hash>(counts: &mut HashMap<T, u32>, key: T) {
    *counts.entry(key).or_insert(0) += 1;
}

/// Alphabets that identify exactly one language within `languages`, used by
/// step 3 to credit a word's script to its single owning candidate.
pub(crate) fn single_language_alphabets(languages: &HashSet<Language>) -> HashMap<Alphabet, Language> {
    let mut result = HashMap::new();
    for alphabet in Alphabet::iter() {
        let supporting: Vec<Language> = languages
            .iter()
            .copied()
            .filter(|language| language.alphabets().contains(&alphabet))
            .collect();
        if supporting.len() == 1 {
            result.insert(alphabet, supporting[0]);
        }
    }
    result
}

/// Languages carrying a non-empty unique-character string, restricted to
/// `languages`, for step 3's Latin/Cyrillic/Devanagari disambiguation.
fn languages_with_unique_characters(languages: &HashSet<Language>) -> Vec<Language> {
    languages
        .iter()
        .copied()
        .filter(|language| language.unique_characters().is_some())
        .collect()
}

/// Steps 3 to 5: per-word unique-character and script accounting that can
/// settle on a single language (or `Unknown`) outright, without consulting
/// any n-gram model. Returns `None` when the words carry no signal at all,
/// in which case the caller falls through to [`narrow_by_script`] and the
/// scorer.
pub(crate) fn decide_by_unique_characters(
    languages: &HashSet<Language>,
    single_language_alphabets: &HashMap<Alphabet, Language>,
    words: &[&str],
) -> Option<Language> {
    let unique_char_languages = languages_with_unique_characters(languages);
    let mut total_counts = HashMap::<Option<Language>, u32>::new();

    for word in words {
        let mut word_counts = HashMap::<Language, u32>::new();

        for character in word.chars() {
            let mut buffer = [0u8; 4];
            let char_str = character.encode_utf8(&mut buffer);
            let mut matched = false;

            for (alphabet, language) in single_language_alphabets.iter() {
                if alphabet.matches(char_str) {
                    increment(&mut word_counts, *language);
                    matched = true;
                }
            }

            if !matched {
                if Alphabet::Han.matches(char_str) {
                    increment(&mut word_counts, Chinese);
                } else if crate::constant::charclass::JAPANESE_CHARACTER_SET.is_match(char_str) {
                    increment(&mut word_counts, Japanese);
                } else if Alphabet::Latin.matches(char_str)
                    || Alphabet::Cyrillic.matches(char_str)
                    || Alphabet::Devanagari.matches(char_str)
                {
                    for &language in unique_char_languages.iter() {
                        if language.unique_characters().unwrap().contains(character) {
                            increment(&mut word_counts, language);
                        }
                    }
                }
            }
        }

        if word_counts.is_empty() {
            increment(&mut total_counts, None);
        } else if word_counts.len() == 1 {
            let (&language, _) = word_counts.iter().next().unwrap();
            if languages.contains(&language) {
                increment(&mut total_counts, Some(language));
            } else {
                increment(&mut total_counts, None);
            }
        } else if word_counts.contains_key(&Chinese) && word_counts.contains_key(&Japanese) {
            increment(&mut total_counts, Some(Japanese));
        } else {
            let ranked = word_counts
                .into_iter()
                .sorted_by(|(_, a), (_, b)| b.cmp(a))
                .collect_vec();
            let (top_language, top_count) = ranked[0];
            let (_, second_count) = ranked[1];
            if top_count > second_count && languages.contains(&top_language) {
                increment(&mut total_counts, Some(top_language));
            } else {
                increment(&mut total_counts, None);
            }
        }
    }

    let unknown_count = *total_counts.get(&None).unwrap_or(&0) as f64;
    if unknown_count < 0.4 * words.len() as f64 {
        total_counts.remove(&None);
    }

    // An empty, or `None`-only, survivor set means the words carried no
    // unique-character or logogram signal at all: this is inconclusive, not
    // a decisive "Unknown", so the caller falls through to script narrowing
    // and n-gram scoring instead of short-circuiting on it.
    if total_counts.is_empty() {
        return None;
    }

    if total_counts.len() == 1 {
        return total_counts.into_iter().next().unwrap().0;
    }

    let survivor_count = total_counts.len();
    let ranked = total_counts
        .into_iter()
        .sorted_by(|(_, a), (_, b)| b.cmp(a))
        .collect_vec();
    let (top, top_count) = ranked[0];
    let (second, second_count) = ranked[1];

    if survivor_count == 2
        && (top == Some(Chinese) && second == Some(Japanese)
            || top == Some(Japanese) && second == Some(Chinese))
    {
        return Some(Japanese);
    }

    if (second_count as f64) >= 0.8 * (top_count as f64) {
        return None;
    }

    top
}

const SCRIPT_CANDIDATES: [Alphabet; 5] = [
    Alphabet::Arabic,
    Alphabet::Cyrillic,
    Alphabet::Devanagari,
    Alphabet::Han,
    Alphabet::Latin,
];

fn word_weight(alphabet: Alphabet) -> f64 {
    if alphabet == Alphabet::Han {
        LOGOGRAM_WORD_WEIGHT
    } else {
        FULL_WORD_WEIGHT
    }
}

/// Steps 1, 2 and 6: narrows `languages` by dominant script and, when the
/// disambiguation table reaches a majority, by character-set membership.
/// Never returns an empty set unless `languages` itself was empty.
pub(crate) fn narrow_by_script(languages: &HashSet<Language>, words: &[&str]) -> HashSet<Language> {
    let mut script_credit = HashMap::<Alphabet, f64>::new();

    for word in words {
        for &alphabet in SCRIPT_CANDIDATES.iter() {
            if alphabet.matches(word) {
                *script_credit.entry(alphabet).or_insert(0.0) += word_weight(alphabet);
                break;
            }
        }
    }

    let after_script = if script_credit.is_empty() {
        languages.clone()
    } else {
        let top_credit = script_credit.values().cloned().fold(0.0_f64, f64::max);
        let dominant: HashSet<Alphabet> = script_credit
            .into_iter()
            .filter(|(_, credit)| *credit >= 0.8 * top_credit)
            .map(|(alphabet, _)| alphabet)
            .collect();

        languages
            .iter()
            .copied()
            .filter(|language| language.alphabets().iter().any(|a| dominant.contains(a)))
            .collect()
    };

    let mut disambiguation_counts = HashMap::<Language, u32>::new();
    for word in words {
        for (characters, candidate_languages) in CHARS_TO_LANGUAGES_MAPPING.iter() {
            if characters.chars().any(|c| word.contains(c)) {
                for &language in candidate_languages.iter() {
                    increment(&mut disambiguation_counts, language);
                }
            }
        }
    }

    let half_word_count = words.len() as f64 / 2.0;
    let disambiguated: HashSet<Language> = disambiguation_counts
        .into_iter()
        .filter(|(_, count)| (*count as f64) >= half_word_count)
        .map(|(language, _)| language)
        .collect();

    if disambiguated.is_empty() {
        after_script
    } else {
        let intersected: HashSet<Language> = after_script
            .intersection(&disambiguated)
            .copied()
            .collect();
        if intersected.is_empty() {
            after_script
        } else {
            intersected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language::*;

    fn languages(list: &[Language]) -> HashSet<Language> {
        list.iter().copied().collect()
    }

    #[test]
    fn unique_characters_identify_their_owning_language() {
        let all = Language::all();
        for language in Language::all() {
            let Some(chars) = language.unique_characters() else {
                continue;
            };
            let word = chars.chars().next().unwrap().to_string();
            let alphabets = single_language_alphabets(&all);
            let decided = decide_by_unique_characters(&all, &alphabets, &[word.as_str()]);
            assert_eq!(decided, Some(language), "failed for {language:?}");
        }
    }

    #[test]
    fn chinese_and_japanese_ambiguity_resolves_to_japanese() {
        let set = languages(&[Chinese, Japanese]);
        let alphabets = single_language_alphabets(&set);
        let decided = decide_by_unique_characters(&set, &alphabets, &["日本語"]);
        assert_eq!(decided, Some(Japanese));
    }

    #[test]
    fn narrow_by_script_keeps_only_latin_languages_for_a_latin_word() {
        let set = languages(&[English, German, Russian, Arabic]);
        let narrowed = narrow_by_script(&set, &["hello"]);
        assert!(narrowed.contains(&English));
        assert!(narrowed.contains(&German));
        assert!(!narrowed.contains(&Russian));
        assert!(!narrowed.contains(&Arabic));
    }

    #[test]
    fn plain_words_without_unique_characters_fall_through_to_none() {
        let set = languages(&[English, German]);
        let alphabets = single_language_alphabets(&set);
        let decided = decide_by_unique_characters(&set, &alphabets, &["alter"]);
        assert_eq!(decided, None);
    }

    #[test]
    fn narrow_by_script_never_empties_languages_without_script_signal() {
        let set = languages(&[English, German]);
        let narrowed = narrow_by_script(&set, &[]);
        assert_eq!(narrowed, set);
    }
}
