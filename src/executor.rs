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

//! The concurrency capability the detector schedules model preloading and
//! per-length scoring onto (§5, §9 "thread pool abstraction"). `map` always
//! returns results in the same order as `items`, so swapping executors
//! never changes a result, only how it was computed.

use rayon::prelude::*;

pub trait Executor: Send + Sync {
    /// Applies `f` to every item, returning results in input order. `f`
    /// must not block on any lock the executor itself might hold.
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync;
}

/// Schedules work across the process-wide rayon thread pool. This is the
/// default executor (§5: "N workers on available CPUs").
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonExecutor;

impl Executor for RayonExecutor {
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        items.into_par_iter().map(f).collect()
    }
}

/// Runs every item on the calling thread. Produces bit-identical results to
/// [`RayonExecutor`] (§5, §9) and is the executor tests rely on for
/// deterministic behaviour without spinning up a thread pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct SameThreadExecutor;

impl Executor for SameThreadExecutor {
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        items.into_iter().map(f).collect()
    }
}

/// Picks between the two executors at runtime without making every caller
/// generic over `Executor`. [`LanguageDetectorBuilder::executor`] stores one
/// of these, and [`LanguageDetector`] holds it as a plain field instead of a
/// type parameter, since `Executor::map`'s generic method keeps the trait
/// from being object-safe (`dyn Executor` does not exist).
///
/// [`LanguageDetectorBuilder::executor`]: crate::builder::LanguageDetectorBuilder::executor
/// [`LanguageDetector`]: crate::detector::LanguageDetector
#[derive(Clone, Copy, Debug)]
pub enum ExecutorChoice {
    Rayon(RayonExecutor),
    SameThread(SameThreadExecutor),
}

impl Default for ExecutorChoice {
    fn default() -> Self {
        ExecutorChoice::Rayon(RayonExecutor)
    }
}

impl Executor for ExecutorChoice {
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        match self {
            ExecutorChoice::Rayon(e) => e.map(items, f),
            ExecutorChoice::SameThread(e) => e.map(items, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_executors_preserve_input_order() {
        let items: Vec<i32> = (0..100).collect();
        let rayon_result = RayonExecutor.map(items.clone(), |x| x * 2);
        let same_thread_result = SameThreadExecutor.map(items, |x| x * 2);
        assert_eq!(rayon_result, same_thread_result);
    }

    #[test]
    fn executor_choice_delegates_to_the_wrapped_executor() {
        let items: Vec<i32> = (0..20).collect();
        let rayon_choice = ExecutorChoice::Rayon(RayonExecutor);
        let same_thread_choice = ExecutorChoice::SameThread(SameThreadExecutor);
        assert_eq!(
            rayon_choice.map(items.clone(), |x| x + 1),
            same_thread_choice.map(items, |x| x + 1)
        );
    }
}
