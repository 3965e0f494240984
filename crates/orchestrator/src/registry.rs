//! Ordered transformer chain and per-transformer status

use crate::transform::NamedTransform;
use spark_errors::{Error, ProjectError};
use spark_events::{AppEvent, EventBus, EventEmitter, RegistryEvent};
use spark_types::{TransformerInfo, TransformerName, TransformerStatus};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Immutable snapshot of the chain a sequence runs against
pub(crate) type Chain = Arc<[NamedTransform]>;

#[derive(Default)]
struct RegistryInner {
    chain: Vec<NamedTransform>,
    statuses: HashMap<TransformerName, TransformerStatus>,
}

/// Supplies the ordered list of transformers
#[derive(Clone)]
pub struct TransformerRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    events: EventBus,
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerRegistry").finish_non_exhaustive()
    }
}

impl TransformerRegistry {
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner::default())),
            events,
        }
    }

    /// Replace the chain; every status starts idle
    pub(crate) async fn load(&self, transformers: Vec<NamedTransform>) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for entry in &transformers {
            if !seen.insert(&entry.name) {
                return Err(ProjectError::DuplicateTransformer {
                    name: entry.name.to_string(),
                }
                .into());
            }
        }

        let names: Vec<TransformerName> = transformers.iter().map(|t| t.name.clone()).collect();
        {
            let mut inner = self.inner.write().await;
            inner.statuses = names
                .iter()
                .map(|name| (name.clone(), TransformerStatus::Idle))
                .collect();
            inner.chain = transformers;
        }

        tracing::info!(count = names.len(), "transformers loaded");
        self.events
            .emit(AppEvent::Registry(RegistryEvent::TransformersLoaded {
                transformers: names,
            }));
        Ok(())
    }

    /// Chain snapshot with current statuses
    pub async fn transformers(&self) -> Vec<TransformerInfo> {
        let inner = self.inner.read().await;
        inner
            .chain
            .iter()
            .enumerate()
            .map(|(index, entry)| TransformerInfo {
                name: entry.name.clone(),
                index,
                status: inner
                    .statuses
                    .get(&entry.name)
                    .copied()
                    .unwrap_or_default(),
            })
            .collect()
    }

    pub async fn position(&self, name: &TransformerName) -> Option<usize> {
        self.inner
            .read()
            .await
            .chain
            .iter()
            .position(|entry| &entry.name == name)
    }

    pub async fn status(&self, name: &TransformerName) -> Option<TransformerStatus> {
        self.inner.read().await.statuses.get(name).copied()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.chain.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.chain.is_empty()
    }

    pub(crate) async fn chain(&self) -> Chain {
        self.inner.read().await.chain.clone().into()
    }

    /// Record the latest status; names no longer registered are ignored
    pub(crate) async fn set_status(&self, name: &TransformerName, status: TransformerStatus) {
        if let Some(current) = self.inner.write().await.statuses.get_mut(name) {
            *current = status;
        }
    }

    /// Return the given transformers to idle; yields the ones that changed
    pub(crate) async fn reset<'a>(
        &self,
        names: impl IntoIterator<Item = &'a TransformerName>,
    ) -> Vec<TransformerName> {
        let mut inner = self.inner.write().await;
        let mut changed = Vec::new();
        for name in names {
            if let Some(current) = inner.statuses.get_mut(name) {
                if *current != TransformerStatus::Idle {
                    *current = TransformerStatus::Idle;
                    changed.push(name.clone());
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::builtin;
    use spark_events::EventKind;

    fn entries(names: &[&str]) -> Vec<NamedTransform> {
        names.iter().map(|n| builtin(n).unwrap()).collect()
    }

    #[tokio::test]
    async fn load_orders_and_publishes() {
        let bus = EventBus::new();
        let mut loaded = bus.subscribe_to(&[EventKind::TransformersLoaded]);
        let registry = TransformerRegistry::new(bus);

        registry
            .load(entries(&["trim", "lines", "word-count"]))
            .await
            .unwrap();

        let infos = registry.transformers().await;
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[1].name.as_str(), "lines");
        assert_eq!(infos[1].index, 1);
        assert!(infos.iter().all(|i| i.status == TransformerStatus::Idle));
        assert_eq!(
            registry.position(&TransformerName::new("word-count")).await,
            Some(2)
        );
        assert!(loaded.try_recv().is_some());
    }

    #[tokio::test]
    async fn duplicate_names_leave_chain_untouched() {
        let registry = TransformerRegistry::new(EventBus::new());
        registry.load(entries(&["trim"])).await.unwrap();

        let err = registry
            .load(entries(&["uppercase", "uppercase"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Project(ProjectError::DuplicateTransformer { .. })
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn reload_resets_statuses() {
        let registry = TransformerRegistry::new(EventBus::new());
        let trim = TransformerName::new("trim");
        registry.load(entries(&["trim"])).await.unwrap();
        registry.set_status(&trim, TransformerStatus::Failed).await;
        assert_eq!(
            registry.status(&trim).await,
            Some(TransformerStatus::Failed)
        );

        registry.load(entries(&["trim"])).await.unwrap();
        assert_eq!(registry.status(&trim).await, Some(TransformerStatus::Idle));
    }

    #[tokio::test]
    async fn reset_reports_only_changed_statuses() {
        let registry = TransformerRegistry::new(EventBus::new());
        let trim = TransformerName::new("trim");
        let lines = TransformerName::new("lines");
        registry.load(entries(&["trim", "lines"])).await.unwrap();
        registry.set_status(&lines, TransformerStatus::Succeeded).await;

        let changed = registry.reset([&trim, &lines]).await;
        assert_eq!(changed, vec![lines.clone()]);
        assert_eq!(registry.status(&lines).await, Some(TransformerStatus::Idle));
        assert!(registry.reset([&trim, &lines]).await.is_empty());
    }

    #[tokio::test]
    async fn chain_snapshot_outlives_reload() {
        let registry = TransformerRegistry::new(EventBus::new());
        registry.load(entries(&["trim", "reverse"])).await.unwrap();
        let snapshot = registry.chain().await;

        registry.load(entries(&["fail"])).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].name.as_str(), "reverse");
    }
}
