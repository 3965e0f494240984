//! Fragment storage and staleness tracking

use spark_errors::{Error, ProjectError};
use spark_events::{AppEvent, EventBus, EventEmitter, ProjectEvent};
use spark_types::{Fragment, FragmentId, Payload};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered set of fragments owned by a project
///
/// Insertion order is the order `build_all` processes fragments in.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    fragments: Arc<RwLock<Vec<Fragment>>>,
    events: EventBus,
}

impl ProjectStore {
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            fragments: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    /// Add a fragment at the end of the project
    ///
    /// # Errors
    ///
    /// Returns `DuplicateFragment` if the id is already present.
    pub async fn add_fragment(&self, fragment: Fragment) -> Result<(), Error> {
        let mut fragments = self.fragments.write().await;
        if fragments.iter().any(|f| f.id == fragment.id) {
            return Err(ProjectError::DuplicateFragment {
                id: fragment.id.to_string(),
            }
            .into());
        }
        let id = fragment.id.clone();
        fragments.push(fragment);
        drop(fragments);

        tracing::debug!(fragment = %id, "fragment added");
        self.events
            .emit(AppEvent::Project(ProjectEvent::FragmentAdded { fragment: id }));
        Ok(())
    }

    /// Remove a fragment and return it
    ///
    /// # Errors
    ///
    /// Returns `UnknownFragment` if no fragment has this id.
    pub async fn remove_fragment(&self, id: &FragmentId) -> Result<Fragment, Error> {
        let mut fragments = self.fragments.write().await;
        let position = fragments
            .iter()
            .position(|f| &f.id == id)
            .ok_or_else(|| unknown(id))?;
        let removed = fragments.remove(position);
        drop(fragments);

        self.events
            .emit(AppEvent::Project(ProjectEvent::FragmentRemoved {
                fragment: id.clone(),
            }));
        Ok(removed)
    }

    /// Replace a fragment's content, marking it out of date
    ///
    /// # Errors
    ///
    /// Returns `UnknownFragment` if no fragment has this id.
    pub async fn update_content(&self, id: &FragmentId, content: Payload) -> Result<(), Error> {
        let mut fragments = self.fragments.write().await;
        let fragment = fragments
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| unknown(id))?;
        fragment.content = content;
        fragment.out_of_date = true;
        drop(fragments);

        self.emit_out_of_date(id);
        Ok(())
    }

    /// Flag a fragment's stored results as stale
    ///
    /// # Errors
    ///
    /// Returns `UnknownFragment` if no fragment has this id.
    pub async fn mark_out_of_date(&self, id: &FragmentId) -> Result<(), Error> {
        let mut fragments = self.fragments.write().await;
        let fragment = fragments
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| unknown(id))?;
        let changed = !fragment.out_of_date;
        fragment.out_of_date = true;
        drop(fragments);

        if changed {
            self.emit_out_of_date(id);
        }
        Ok(())
    }

    pub async fn fragment(&self, id: &FragmentId) -> Option<Fragment> {
        self.fragments
            .read()
            .await
            .iter()
            .find(|f| &f.id == id)
            .cloned()
    }

    pub async fn fragments(&self) -> Vec<Fragment> {
        self.fragments.read().await.clone()
    }

    /// Ids of stale fragments, in project order
    pub async fn out_of_date_fragments(&self) -> Vec<FragmentId> {
        self.fragments
            .read()
            .await
            .iter()
            .filter(|f| f.out_of_date)
            .map(|f| f.id.clone())
            .collect()
    }

    pub async fn is_any_fragment_out_of_date(&self) -> bool {
        self.fragments.read().await.iter().any(|f| f.out_of_date)
    }

    pub async fn len(&self) -> usize {
        self.fragments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.fragments.read().await.is_empty()
    }

    /// Clear the out-of-date flag after a successful full run
    ///
    /// Only clears when the content still equals `built_from`; content edited
    /// while the chain ran keeps the fragment stale.
    pub(crate) async fn clear_out_of_date(&self, id: &FragmentId, built_from: &Payload) -> bool {
        let mut fragments = self.fragments.write().await;
        match fragments.iter_mut().find(|f| &f.id == id) {
            Some(fragment) if fragment.content == *built_from => {
                fragment.out_of_date = false;
                true
            }
            _ => false,
        }
    }

    /// Mark every fragment stale
    pub(crate) async fn mark_all_out_of_date(&self) {
        let mut fragments = self.fragments.write().await;
        let changed: Vec<FragmentId> = fragments
            .iter_mut()
            .filter(|f| !f.out_of_date)
            .map(|f| {
                f.out_of_date = true;
                f.id.clone()
            })
            .collect();
        drop(fragments);

        for id in &changed {
            self.emit_out_of_date(id);
        }
    }

    fn emit_out_of_date(&self, id: &FragmentId) {
        tracing::debug!(fragment = %id, "fragment out of date");
        self.events
            .emit(AppEvent::Project(ProjectEvent::FragmentOutOfDate {
                fragment: id.clone(),
            }));
    }
}

fn unknown(id: &FragmentId) -> Error {
    ProjectError::UnknownFragment { id: id.to_string() }.into()
}
