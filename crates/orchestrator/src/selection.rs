//! Active fragment and transformer

use crate::registry::TransformerRegistry;
use spark_events::{AppEvent, EventBus, EventEmitter, SelectionEvent};
use spark_types::{FragmentId, Selection, TransformerName};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct SelectionTracker {
    selection: Arc<RwLock<Selection>>,
    events: EventBus,
}

impl SelectionTracker {
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            selection: Arc::new(RwLock::new(Selection::default())),
            events,
        }
    }

    pub async fn set_active_fragment(&self, fragment: Option<FragmentId>) {
        let mut selection = self.selection.write().await;
        if selection.active_fragment == fragment {
            return;
        }
        selection.active_fragment = fragment;
        let snapshot = selection.clone();
        drop(selection);
        self.publish(snapshot);
    }

    pub async fn set_active_transformer(&self, transformer: Option<TransformerName>) {
        let mut selection = self.selection.write().await;
        if selection.active_transformer == transformer {
            return;
        }
        selection.active_transformer = transformer;
        let snapshot = selection.clone();
        drop(selection);
        self.publish(snapshot);
    }

    pub async fn active_fragment(&self) -> Option<FragmentId> {
        self.selection.read().await.active_fragment.clone()
    }

    pub async fn active_transformer(&self) -> Option<TransformerName> {
        self.selection.read().await.active_transformer.clone()
    }

    pub async fn selection(&self) -> Selection {
        self.selection.read().await.clone()
    }

    /// Keep the active transformer pointing into the current chain
    ///
    /// When the selected transformer is missing (or none is selected) the
    /// first transformer of the chain becomes active.
    pub async fn follow_registry(&self, registry: &TransformerRegistry) {
        let active = self.active_transformer().await;
        if let Some(name) = &active {
            if registry.position(name).await.is_some() {
                return;
            }
        }
        let first = registry
            .transformers()
            .await
            .into_iter()
            .next()
            .map(|info| info.name);
        self.set_active_transformer(first).await;
    }

    fn publish(&self, selection: Selection) {
        self.events
            .emit(AppEvent::Selection(SelectionEvent::Changed { selection }));
    }
}
