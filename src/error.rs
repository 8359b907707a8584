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

use std::fmt;

use crate::language::Language;

/// Errors raised by the builder and by lazy model loading.
///
/// `detect` itself never returns an error for well-formed text; it answers
/// [`Language::Unknown`](crate::Language::Unknown) when the evidence is
/// insufficient. Errors surface only from configuration mistakes and from
/// the model store failing to read its resource files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinguaError {
    /// The input was empty, or fewer than two languages were configured
    /// for a multi-language detector.
    InvalidInput(String),
    /// A language that was requested has no binary model file on its
    /// resource path.
    ModelMissing(Language),
    /// A model's binary file failed to parse: a size field overflowed,
    /// trailing bytes remained after the last map, or a duplicate key was
    /// inserted while building a map.
    ModelCorrupt(String),
    /// `minimum_relative_distance` was outside `[0, 1)`.
    ConfigError(String),
}

impl fmt::Display for LinguaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinguaError::InvalidInput(message) => write!(f, "invalid input: {message}"),
            LinguaError::ModelMissing(language) => {
                write!(f, "no language model is available for {language:?}")
            }
            LinguaError::ModelCorrupt(message) => write!(f, "language model is corrupt: {message}"),
            LinguaError::ConfigError(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl std::error::Error for LinguaError {}

pub type LinguaResult<T> = Result<T, LinguaError>;
