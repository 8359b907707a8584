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

//! Per-language, lazily loaded model lookups (§3 `ModelHolder`, §9 "lazy
//! shared state"). Binary model files are embedded at compile time under the
//! resource path `language-models/<iso-639-1>/{uni-bi-trigrams,quadri-fivegrams}.bin`
//! (§6) and read into memory the first time a language is actually queried.

use crate::charoffsets::CharOffsets;
use crate::error::LinguaError;
use crate::language::Language;
use crate::lookup::{NgramMap, QuadriFivegram, UniBiTrigram};
use crate::modelfile::{read_quadri_fivegram, read_uni_bi_trigram};
use include_dir::{include_dir, Dir};
use log::{debug, trace};
use std::io::Cursor;
use std::sync::{Arc, RwLock};
use strum::IntoEnumIterator;

static EMBEDDED_MODELS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/language-models");

const UNI_BI_TRIGRAM_FILE_NAME: &str = "uni-bi-trigrams.bin";
const QUADRI_FIVEGRAM_FILE_NAME: &str = "quadri-fivegrams.bin";

fn resource_dir(language: Language) -> Option<&'static Dir<'static>> {
    let iso_code = language.iso_code_639_1()?;
    EMBEDDED_MODELS.get_dir(format!("{iso_code}"))
}

fn load_uni_bi_trigram(language: Language) -> Result<UniBiTrigram, LinguaError> {
    let directory = resource_dir(language).ok_or(LinguaError::ModelMissing(language))?;
    let file = directory
        .get_file(UNI_BI_TRIGRAM_FILE_NAME)
        .ok_or(LinguaError::ModelMissing(language))?;
    read_uni_bi_trigram(&mut Cursor::new(file.contents()))
}

fn load_quadri_fivegram(language: Language) -> Result<QuadriFivegram, LinguaError> {
    let directory = resource_dir(language).ok_or(LinguaError::ModelMissing(language))?;
    let file = directory
        .get_file(QUADRI_FIVEGRAM_FILE_NAME)
        .ok_or(LinguaError::ModelMissing(language))?;
    read_quadri_fivegram(&mut Cursor::new(file.contents()))
}

/// Holds the two lazily-loaded lookups for a single language (§3). Both
/// fields are single-shot, double-checked locks: the first caller to find
/// `None` performs the disk read and publishes the result; every other
/// reader, before or after, only ever takes the read lock.
pub(crate) struct ModelHolder {
    language: Language,
    uni_bi_trigram: RwLock<Option<Arc<UniBiTrigram>>>,
    quadri_fivegram: RwLock<Option<Arc<QuadriFivegram>>>,
}

impl ModelHolder {
    fn new(language: Language) -> Self {
        Self {
            language,
            uni_bi_trigram: RwLock::new(None),
            quadri_fivegram: RwLock::new(None),
        }
    }

    pub(crate) fn uni_bi_trigram(&self) -> Result<Arc<UniBiTrigram>, LinguaError> {
        if let Some(existing) = self.uni_bi_trigram.read().unwrap().as_ref() {
            trace!("uni-bi-trigram model for {:?} already loaded", self.language);
            return Ok(Arc::clone(existing));
        }

        let mut guard = self.uni_bi_trigram.write().unwrap();
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let loaded = Arc::new(load_uni_bi_trigram(self.language)?);
        debug!("loaded uni-bi-trigram model for {:?}", self.language);
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    pub(crate) fn quadri_fivegram(&self) -> Result<Arc<QuadriFivegram>, LinguaError> {
        if let Some(existing) = self.quadri_fivegram.read().unwrap().as_ref() {
            trace!("quadri-fivegram model for {:?} already loaded", self.language);
            return Ok(Arc::clone(existing));
        }

        let mut guard = self.quadri_fivegram.write().unwrap();
        if let Some(existing) = guard.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let loaded = Arc::new(load_quadri_fivegram(self.language)?);
        debug!("loaded quadri-fivegram model for {:?}", self.language);
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drops both cached lookups so the next access reloads from disk.
    /// Callers must guarantee no scorer is reading concurrently (§5).
    fn reset(&self) -> bool {
        let mut released = false;
        if self.uni_bi_trigram.write().unwrap().take().is_some() {
            released = true;
        }
        if self.quadri_fivegram.write().unwrap().take().is_some() {
            released = true;
        }
        released
    }
}

/// Dense, ordinal-indexed array of one [`ModelHolder`] per catalogued
/// language (§9 "cyclic / ordinal-keyed collections").
pub(crate) struct ModelStore {
    holders: Vec<ModelHolder>,
}

impl ModelStore {
    pub(crate) fn new() -> Self {
        let mut holders = Vec::with_capacity(Language::count());
        for language in Language::iter() {
            holders.push(ModelHolder::new(language));
        }
        Self { holders }
    }

    pub(crate) fn uni_bi_trigram(&self, language: Language) -> Result<Arc<UniBiTrigram>, LinguaError> {
        self.holders[language.ordinal()].uni_bi_trigram()
    }

    pub(crate) fn quadri_fivegram(
        &self,
        language: Language,
    ) -> Result<Arc<QuadriFivegram>, LinguaError> {
        self.holders[language.ordinal()].quadri_fivegram()
    }

    /// Resets every holder, releasing every cached model. Used by
    /// [`crate::Detector::unload_models`].
    pub(crate) fn unload_models(&self) {
        let count = self.holders.iter().filter(|holder| holder.reset()).count();
        debug!("unloaded models for {count} language holders");
    }
}

#[cfg(test)]
pub(crate) fn uni_bi_trigram_from_maps(
    offsets: CharOffsets,
    unigrams: NgramMap,
    bigrams: NgramMap,
    trigrams: NgramMap,
) -> UniBiTrigram {
    UniBiTrigram::new(offsets, unigrams, bigrams, trigrams)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_reports_whether_anything_was_released() {
        let holder = ModelHolder::new(Language::English);
        assert!(!holder.reset());
    }

    #[test]
    fn unknown_language_has_no_resource_directory() {
        assert!(resource_dir(Language::Unknown).is_none());
    }

    #[test]
    fn missing_model_file_is_reported_as_model_missing() {
        let result = load_uni_bi_trigram(Language::English);
        assert!(matches!(result, Err(LinguaError::ModelMissing(_))));
    }
}
