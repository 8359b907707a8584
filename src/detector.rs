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

//! The detector façade (§2.9): holds configuration and orchestrates cleanup,
//! the rule-based filter and the scorer into `detect`/`confidences` (§6).

use crate::cleanup::{clean_up_input_text, split_text_into_words};
use crate::constant::charclass::NO_LETTER;
use crate::error::LinguaResult;
use crate::executor::ExecutorChoice;
use crate::filter::{decide_by_unique_characters, narrow_by_script, single_language_alphabets};
use crate::language::Language;
use crate::modelstore::ModelStore;
use crate::scorer::{ngram_lengths_to_use, score_languages};
use log::trace;
use std::collections::HashSet;

/// A configured language detector (§2.9, §6). Built exclusively through
/// [`LanguageDetectorBuilder`](crate::LanguageDetectorBuilder); cheap to
/// clone-share via `Arc` since its model store caches lazily behind locks.
pub struct LanguageDetector {
    languages: HashSet<Language>,
    minimum_relative_distance: f64,
    low_accuracy_mode: bool,
    executor: ExecutorChoice,
    model_store: ModelStore,
}

impl LanguageDetector {
    pub(crate) fn new(
        languages: HashSet<Language>,
        minimum_relative_distance: f64,
        low_accuracy_mode: bool,
        executor: ExecutorChoice,
        preload_language_models: bool,
    ) -> LinguaResult<Self> {
        let model_store = ModelStore::new();
        let detector = Self {
            languages,
            minimum_relative_distance,
            low_accuracy_mode,
            executor,
            model_store,
        };
        if preload_language_models {
            detector.preload_models()?;
        }
        Ok(detector)
    }

    /// Eagerly loads every configured language's models (§5: "the end of
    /// model preloading" join barrier), so the first `detect` call pays no
    /// disk-I/O latency.
    fn preload_models(&self) -> LinguaResult<()> {
        use crate::executor::Executor;
        let languages: Vec<Language> = self.languages.iter().copied().collect();
        let results: Vec<LinguaResult<()>> = self.executor.map(languages, |language| {
            self.model_store.uni_bi_trigram(language)?;
            self.model_store.quadri_fivegram(language)?;
            Ok(())
        });
        results.into_iter().collect()
    }

    pub fn languages(&self) -> &HashSet<Language> {
        &self.languages
    }

    /// Releases every cached model, forcing the next access to reload from
    /// disk (§6).
    pub fn unload_models(&self) {
        self.model_store.unload_models();
    }

    /// Ranked relative-confidence map for `text` (§4.11 step 5, §6). Empty
    /// when the text carries no usable evidence against the configured
    /// language set.
    pub fn confidences(&self, text: &str) -> Vec<(Language, f64)> {
        let cleaned = clean_up_input_text(text);
        if cleaned.is_empty() || NO_LETTER.is_match(&cleaned) {
            return Vec::new();
        }

        let words = split_text_into_words(&cleaned);
        let alphabets = single_language_alphabets(&self.languages);

        if let Some(language) = decide_by_unique_characters(&self.languages, &alphabets, &words) {
            trace!("rule filter settled on a single language: {language:?}");
            return vec![(language, 1.0)];
        }

        let narrowed = narrow_by_script(&self.languages, &words);
        if narrowed.is_empty() {
            trace!("rule filter narrowed the candidate set to nothing");
            return Vec::new();
        }
        if narrowed.len() == 1 {
            let language = *narrowed.iter().next().unwrap();
            trace!("rule filter narrowed the candidate set to a single language: {language:?}");
            return vec![(language, 1.0)];
        }

        let lengths = ngram_lengths_to_use(cleaned.chars().count(), self.low_accuracy_mode);
        trace!(
            "rule filter narrowed to {} candidates, scoring n-gram lengths {:?}",
            narrowed.len(),
            lengths
        );

        match score_languages(
            &narrowed,
            &cleaned,
            &self.model_store,
            &self.executor,
            self.low_accuracy_mode,
        ) {
            Ok(confidences) => confidences,
            Err(_) => Vec::new(),
        }
    }

    /// `confidences(text)` collapsed to a single language (§4.11 last line,
    /// §6): `Unknown` if there is no evidence, the top two are tied, or they
    /// are closer than [`minimum_relative_distance`](crate::LanguageDetectorBuilder::minimum_relative_distance).
    pub fn detect(&self, text: &str) -> Language {
        let confidences = self.confidences(text);
        match confidences.as_slice() {
            [] => Language::Unknown,
            [(only, _)] => *only,
            [(top, top_score), (_, second_score), ..] => {
                if top_score == second_score || top_score - second_score < self.minimum_relative_distance {
                    Language::Unknown
                } else {
                    *top
                }
            }
        }
    }

    /// The confidence `detect`'s ranking assigned to `language`, or `0.0` if
    /// `language` is outside the configured set or carries no evidence.
    pub fn confidence_for_language(&self, text: &str, language: Language) -> f64 {
        if !self.languages.contains(&language) {
            return 0.0;
        }
        self.confidences(text)
            .into_iter()
            .find(|(candidate, _)| *candidate == language)
            .map(|(_, confidence)| confidence)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LanguageDetectorBuilder;
    use crate::executor::SameThreadExecutor;
    use crate::language::Language::*;
    use float_cmp::approx_eq;

    fn detector(languages: &[Language]) -> LanguageDetector {
        LanguageDetectorBuilder::from_languages(languages)
            .unwrap()
            .executor(ExecutorChoice::SameThread(SameThreadExecutor))
            .build()
            .unwrap()
    }

    #[test]
    fn empty_text_has_no_confidences() {
        let d = detector(&[English, German]);
        assert!(d.confidences("").is_empty());
        assert_eq!(d.detect(""), Unknown);
    }

    #[test]
    fn text_without_letters_has_no_confidences() {
        let d = detector(&[English, German]);
        assert!(d.confidences("1234 !?").is_empty());
    }

    #[test]
    fn unique_character_alone_settles_the_language_outright() {
        let d = detector(&[English, Azerbaijani]);
        assert_eq!(d.detect("məhərrəm"), Azerbaijani);
    }

    #[test]
    fn narrowing_to_a_single_script_candidate_settles_the_language() {
        let d = detector(&[English, Russian]);
        // "проарплап" has no unique-character signal but is pure Cyrillic,
        // which leaves exactly one candidate after script narrowing.
        assert_eq!(d.detect("проарплап"), Russian);
    }

    #[test]
    fn han_only_text_identifies_chinese() {
        let d = detector(&[Chinese, Japanese, English]);
        assert_eq!(d.detect("上海大学是一个好大学"), Chinese);
    }

    #[test]
    fn confidence_for_language_is_zero_outside_the_configured_set() {
        let d = detector(&[English, German]);
        assert!(approx_eq!(
            f64,
            d.confidence_for_language("hello", French),
            0.0
        ));
    }

    #[test]
    fn confidence_for_language_is_zero_without_evidence() {
        let d = detector(&[English, German]);
        assert!(approx_eq!(
            f64,
            d.confidence_for_language("", English),
            0.0
        ));
    }
}
