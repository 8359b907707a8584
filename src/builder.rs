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

//! Builds a [`LanguageDetector`] (§6). Every entry point validates eagerly
//! and returns [`LinguaResult`] rather than panicking: a misconfigured
//! detector is a `ConfigError`/`InvalidInput`, not a crash.

use crate::detector::LanguageDetector;
use crate::error::{LinguaError, LinguaResult};
use crate::executor::ExecutorChoice;
use crate::isocode::{IsoCode639_1, IsoCode639_3};
use crate::language::Language;
use std::collections::HashSet;

const MINIMUM_LANGUAGE_COUNT: usize = 2;

fn require_minimum_languages(languages: HashSet<Language>) -> LinguaResult<HashSet<Language>> {
    if languages.len() < MINIMUM_LANGUAGE_COUNT {
        return Err(LinguaError::InvalidInput(format!(
            "LanguageDetector needs at least {MINIMUM_LANGUAGE_COUNT} languages to choose from, got {}",
            languages.len()
        )));
    }
    Ok(languages)
}

/// Configuration surface for a [`LanguageDetector`] (§6, §9 builder
/// validation). Holds the language set plus every tunable option; `build`
/// is the only place where these are checked for consistency.
pub struct LanguageDetectorBuilder {
    languages: HashSet<Language>,
    minimum_relative_distance: f64,
    preload_language_models: bool,
    low_accuracy_mode: bool,
    executor: ExecutorChoice,
}

impl LanguageDetectorBuilder {
    fn new(languages: HashSet<Language>) -> Self {
        Self {
            languages,
            minimum_relative_distance: 0.0,
            preload_language_models: false,
            low_accuracy_mode: false,
            executor: ExecutorChoice::default(),
        }
    }

    /// The spec's generic entry point (§6): `Detector::builder(languages)`.
    pub fn builder(languages: HashSet<Language>) -> LinguaResult<Self> {
        Ok(Self::new(require_minimum_languages(languages)?))
    }

    pub fn from_languages(languages: &[Language]) -> LinguaResult<Self> {
        Self::builder(languages.iter().copied().collect())
    }

    pub fn from_all_languages() -> LinguaResult<Self> {
        Self::builder(Language::all())
    }

    pub fn from_all_spoken_languages() -> LinguaResult<Self> {
        Self::builder(Language::all_spoken_ones())
    }

    pub fn from_all_languages_without(languages: &[Language]) -> LinguaResult<Self> {
        let mut remaining = Language::all();
        remaining.retain(|it| !languages.contains(it));
        Self::builder(remaining)
    }

    pub fn from_all_languages_with_arabic_script() -> LinguaResult<Self> {
        Self::builder(Language::all_with_arabic_script())
    }

    pub fn from_all_languages_with_cyrillic_script() -> LinguaResult<Self> {
        Self::builder(Language::all_with_cyrillic_script())
    }

    pub fn from_all_languages_with_devanagari_script() -> LinguaResult<Self> {
        Self::builder(Language::all_with_devanagari_script())
    }

    pub fn from_all_languages_with_latin_script() -> LinguaResult<Self> {
        Self::builder(Language::all_with_latin_script())
    }

    pub fn from_iso_codes_639_1(iso_codes: &[IsoCode639_1]) -> LinguaResult<Self> {
        let languages = iso_codes
            .iter()
            .map(Language::from_iso_code_639_1)
            .collect();
        Self::builder(languages)
    }

    pub fn from_iso_codes_639_3(iso_codes: &[IsoCode639_3]) -> LinguaResult<Self> {
        let languages = iso_codes
            .iter()
            .map(Language::from_iso_code_639_3)
            .collect();
        Self::builder(languages)
    }

    /// Sets the minimum relative distance (§7) `detect` requires between the
    /// top and runner-up confidence before committing to a language, rather
    /// than answering [`Language::Unknown`]. Must lie in `[0, 1)`.
    pub fn minimum_relative_distance(&mut self, distance: f64) -> &mut Self {
        self.minimum_relative_distance = distance;
        self
    }

    /// Whether to eagerly load every configured language's models at `build`
    /// time instead of lazily on first use (§5's executor join barrier at
    /// "the end of model preloading").
    pub fn preload_language_models(&mut self, preload: bool) -> &mut Self {
        self.preload_language_models = preload;
        self
    }

    /// Restricts scoring to trigrams only, regardless of text length
    /// (§4.11 step 2), trading accuracy on short texts for speed.
    pub fn low_accuracy_mode(&mut self, low_accuracy: bool) -> &mut Self {
        self.low_accuracy_mode = low_accuracy;
        self
    }

    pub fn executor(&mut self, executor: ExecutorChoice) -> &mut Self {
        self.executor = executor;
        self
    }

    /// Validates the accumulated configuration and constructs the detector
    /// (§9: validated eagerly, `Result`-returning rather than panicking).
    pub fn build(&self) -> LinguaResult<LanguageDetector> {
        if !(0.0..1.0).contains(&self.minimum_relative_distance) {
            return Err(LinguaError::ConfigError(format!(
                "minimum relative distance must lie in [0, 1), got {}",
                self.minimum_relative_distance
            )));
        }
        require_minimum_languages(self.languages.clone())?;

        LanguageDetector::new(
            self.languages.clone(),
            self.minimum_relative_distance,
            self.low_accuracy_mode,
            self.executor,
            self.preload_language_models,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language::*;
    use rstest::rstest;

    #[test]
    fn fewer_than_two_languages_is_rejected() {
        let result = LanguageDetectorBuilder::from_languages(&[English]);
        assert!(matches!(result, Err(LinguaError::InvalidInput(_))));
    }

    #[test]
    fn two_languages_is_accepted() {
        let result = LanguageDetectorBuilder::from_languages(&[English, German]);
        assert!(result.is_ok());
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.0)]
    #[case(1.5)]
    fn out_of_range_minimum_relative_distance_is_rejected(#[case] distance: f64) {
        let mut builder = LanguageDetectorBuilder::from_languages(&[English, German]).unwrap();
        builder.minimum_relative_distance(distance);
        let result = builder.build();
        assert!(matches!(result, Err(LinguaError::ConfigError(_))));
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.5)]
    #[case(0.99)]
    fn in_range_minimum_relative_distance_is_accepted(#[case] distance: f64) {
        let mut builder = LanguageDetectorBuilder::from_languages(&[English, German]).unwrap();
        builder.minimum_relative_distance(distance);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn from_all_languages_without_excludes_the_given_languages() {
        let builder = LanguageDetectorBuilder::from_all_languages_without(&[German]).unwrap();
        let detector = builder.build().unwrap();
        assert!(!detector.languages().contains(&German));
        assert!(detector.languages().contains(&English));
    }

    #[test]
    fn excluding_too_many_languages_is_rejected() {
        let all_but_one: Vec<Language> = Language::all()
            .into_iter()
            .filter(|it| it != &English)
            .collect();
        let result = LanguageDetectorBuilder::from_all_languages_without(&all_but_one);
        assert!(matches!(result, Err(LinguaError::InvalidInput(_))));
    }
}
