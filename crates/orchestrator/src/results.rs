//! Per-(fragment, transformer) stage results

use dashmap::DashMap;
use spark_types::{FragmentId, StageResult, TransformerName};
use std::sync::Arc;

type ResultKey = (FragmentId, TransformerName);

/// Concurrent result storage
///
/// Readers may look up results at any time; only the orchestrator writes,
/// and only while it holds the build lock.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Arc<DashMap<ResultKey, StageResult>>,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, fragment: &FragmentId, transformer: &TransformerName) -> Option<StageResult> {
        self.results
            .get(&(fragment.clone(), transformer.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Every stored result of a fragment, in no particular order
    #[must_use]
    pub fn for_fragment(&self, fragment: &FragmentId) -> Vec<StageResult> {
        self.results
            .iter()
            .filter(|entry| &entry.key().0 == fragment)
            .map(|entry| entry.value().clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub(crate) fn insert(&self, result: StageResult) {
        let key = (result.fragment.clone(), result.transformer.clone());
        self.results.insert(key, result);
    }

    /// Drop the fragment's results for the given transformers
    pub(crate) fn invalidate<'a>(
        &self,
        fragment: &FragmentId,
        transformers: impl IntoIterator<Item = &'a TransformerName>,
    ) {
        for transformer in transformers {
            self.results.remove(&(fragment.clone(), transformer.clone()));
        }
    }

    pub(crate) fn clear(&self) {
        self.results.clear();
    }
}
