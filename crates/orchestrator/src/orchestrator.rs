//! Public build operations and their preconditions

use crate::builtins::builtin;
use crate::project::ProjectStore;
use crate::registry::TransformerRegistry;
use crate::reporter::{ErrorReporter, TracingReporter};
use crate::results::ResultStore;
use crate::selection::SelectionTracker;
use crate::sequencer::{Sequence, Sequencer};
use crate::state::{shared_state, SharedBuildState};
use crate::transform::NamedTransform;
use spark_errors::{BuildError, Error, ProjectError, UserFacingError};
use spark_events::{BuildEvent, BuildScope, EventBus, EventEmitter};
use spark_types::{
    BuildReport, BuildState, ControlState, FragmentId, StageView, TransformerName,
    TransformerStatus,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Runs fragments through the transformer chain
///
/// One orchestrator owns one build lock (`BuildState::is_building`). Every
/// build operation checks and takes the lock under a single write guard, so
/// a concurrent caller gets [`BuildError::Busy`] instead of interleaving.
pub struct Orchestrator {
    sequencer: Sequencer,
    selection: SelectionTracker,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("project", &self.sequencer.project)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    #[must_use]
    pub fn project(&self) -> &ProjectStore {
        &self.sequencer.project
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    #[must_use]
    pub fn registry(&self) -> &TransformerRegistry {
        &self.sequencer.registry
    }

    #[must_use]
    pub fn results(&self) -> &ResultStore {
        &self.sequencer.results
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.sequencer.events
    }

    /// Build every out-of-date fragment in project order
    ///
    /// A failing fragment does not stop the others. With debug mode on the
    /// returned report may be paused; continue with [`Self::run_next`].
    ///
    /// # Errors
    ///
    /// Returns `Busy` while another build holds the lock, or `Precondition`
    /// when no transformers are loaded.
    pub async fn build_all(&self) -> Result<BuildReport, Error> {
        let result = self.build_all_inner().await;
        self.reported(result)
    }

    async fn build_all_inner(&self) -> Result<BuildReport, Error> {
        let mut state = self.sequencer.state.write().await;
        if state.is_building {
            return Err(BuildError::Busy.into());
        }
        let mut queue: VecDeque<FragmentId> =
            self.sequencer.project.out_of_date_fragments().await.into();
        let Some(first_id) = queue.pop_front() else {
            tracing::debug!("nothing out of date");
            return Ok(BuildReport::new(Uuid::new_v4()));
        };
        let chain = self.sequencer.registry.chain().await;
        if chain.is_empty() {
            return Err(no_transformers());
        }
        let first = self
            .sequencer
            .project
            .fragment(&first_id)
            .await
            .ok_or_else(|| unknown_fragment(&first_id))?;
        state.is_building = true;
        state.paused = false;
        drop(state);

        let stop = chain.len();
        let mut seq = Sequence::new(BuildScope::All, chain, queue);
        self.sequencer.begin_fragment(&mut seq, first, 0, stop).await;
        Ok(self.sequencer.drive(seq).await)
    }

    /// Build one out-of-date fragment through the whole chain
    ///
    /// # Errors
    ///
    /// Returns `Busy` while another build holds the lock, `UnknownFragment`
    /// for an unknown id, and `Precondition` when the fragment is up to date
    /// or no transformers are loaded.
    pub async fn build_fragment(&self, id: &FragmentId) -> Result<BuildReport, Error> {
        let result = self.build_fragment_inner(id).await;
        self.reported(result)
    }

    async fn build_fragment_inner(&self, id: &FragmentId) -> Result<BuildReport, Error> {
        let mut state = self.sequencer.state.write().await;
        if state.is_building {
            return Err(BuildError::Busy.into());
        }
        let fragment = self
            .sequencer
            .project
            .fragment(id)
            .await
            .ok_or_else(|| unknown_fragment(id))?;
        if !fragment.out_of_date {
            return Err(BuildError::precondition(format!("fragment {id} is up to date")).into());
        }
        let chain = self.sequencer.registry.chain().await;
        if chain.is_empty() {
            return Err(no_transformers());
        }
        state.is_building = true;
        state.paused = false;
        drop(state);

        let stop = chain.len();
        let mut seq = Sequence::new(BuildScope::Fragment, chain, VecDeque::new());
        self.sequencer.begin_fragment(&mut seq, fragment, 0, stop).await;
        Ok(self.sequencer.drive(seq).await)
    }

    /// Run exactly one stage of a fragment
    ///
    /// Every earlier stage must hold a successful result. Downstream results
    /// are invalidated; the out-of-date flag is left alone and debug mode
    /// never pauses a single-stage run.
    ///
    /// # Errors
    ///
    /// Returns `Busy`, `UnknownFragment`, `UnknownTransformer`, or
    /// `StaleUpstream` naming the first earlier stage without a successful
    /// result.
    pub async fn run_transformer(
        &self,
        id: &FragmentId,
        transformer: &TransformerName,
    ) -> Result<BuildReport, Error> {
        let result = self.run_transformer_inner(id, transformer).await;
        self.reported(result)
    }

    async fn run_transformer_inner(
        &self,
        id: &FragmentId,
        transformer: &TransformerName,
    ) -> Result<BuildReport, Error> {
        let mut state = self.sequencer.state.write().await;
        if state.is_building {
            return Err(BuildError::Busy.into());
        }
        let fragment = self
            .sequencer
            .project
            .fragment(id)
            .await
            .ok_or_else(|| unknown_fragment(id))?;
        let chain = self.sequencer.registry.chain().await;
        let index = chain
            .iter()
            .position(|entry| &entry.name == transformer)
            .ok_or_else(|| ProjectError::UnknownTransformer {
                name: transformer.to_string(),
            })?;
        for upstream in &chain[..index] {
            let valid = self
                .sequencer
                .results
                .get(id, &upstream.name)
                .is_some_and(|result| result.is_success());
            if !valid {
                return Err(BuildError::StaleUpstream {
                    fragment: id.to_string(),
                    transformer: transformer.to_string(),
                    upstream: upstream.name.to_string(),
                }
                .into());
            }
        }
        state.is_building = true;
        state.paused = false;
        drop(state);

        let mut seq = Sequence::new(BuildScope::Transformer, chain, VecDeque::new());
        self.sequencer
            .begin_fragment(&mut seq, fragment, index, index + 1)
            .await;
        Ok(self.sequencer.drive(seq).await)
    }

    /// Flip debug mode and return the new value
    ///
    /// Only later stage boundaries observe the change; a paused sequence
    /// stays paused until [`Self::run_next`].
    pub async fn toggle_debug(&self) -> bool {
        let enabled = {
            let mut state = self.sequencer.state.write().await;
            state.debug_enabled = !state.debug_enabled;
            state.debug_enabled
        };
        tracing::info!(enabled, "debug mode toggled");
        self.sequencer
            .events
            .emit_build(BuildEvent::DebugToggled { enabled });
        enabled
    }

    /// Resume a paused sequence at the stage after the pause
    ///
    /// A build that is running rather than paused is rejected with `Busy`,
    /// like every other caller that finds the build lock taken. If the
    /// paused fragment was removed, its results are dropped and the build
    /// continues with the queued fragments.
    ///
    /// # Errors
    ///
    /// Returns `Precondition` when no build is in flight and `Busy` when a
    /// build is running rather than paused.
    pub async fn run_next(&self) -> Result<BuildReport, Error> {
        let result = self.run_next_inner().await;
        self.reported(result)
    }

    async fn run_next_inner(&self) -> Result<BuildReport, Error> {
        {
            let mut state = self.sequencer.state.write().await;
            if !state.is_building {
                return Err(BuildError::precondition("no build is paused").into());
            }
            if !state.paused {
                return Err(BuildError::Busy.into());
            }
            state.paused = false;
        }

        let Some(seq) = self.sequencer.parked.lock().await.take() else {
            // Paused flag without a parked sequence; give the lock back
            crate::state::release(&mut *self.sequencer.state.write().await);
            return Err(Error::internal("paused build has no parked sequence"));
        };
        tracing::debug!(fragment = %seq.fragment(), index = seq.next_index(), "resuming");
        Ok(self.sequencer.resume(*seq).await)
    }

    /// Build the selection tracker's active fragment
    ///
    /// # Errors
    ///
    /// As [`Self::build_fragment`]; `Precondition` without an active fragment.
    pub async fn build_active_fragment(&self) -> Result<BuildReport, Error> {
        let Some(id) = self.selection.active_fragment().await else {
            return self.reported(Err(
                BuildError::precondition("no fragment is selected").into()
            ));
        };
        self.build_fragment(&id).await
    }

    /// Run the active transformer on the active fragment
    ///
    /// # Errors
    ///
    /// As [`Self::run_transformer`]; `Precondition` when the selection is
    /// incomplete.
    pub async fn run_active_transformer(&self) -> Result<BuildReport, Error> {
        let selection = self.selection.selection().await;
        let (Some(id), Some(transformer)) =
            (selection.active_fragment, selection.active_transformer)
        else {
            return self.reported(Err(BuildError::precondition(
                "select a fragment and a transformer first",
            )
            .into()));
        };
        self.run_transformer(&id, &transformer).await
    }

    /// Replace the transformer chain
    ///
    /// Stored results came from the old chain, so they are dropped and
    /// every fragment becomes out of date.
    ///
    /// # Errors
    ///
    /// Returns `Busy` while a build (paused or running) holds the lock and
    /// `DuplicateTransformer` when two entries share a name.
    pub async fn load_transformers(&self, transformers: Vec<NamedTransform>) -> Result<(), Error> {
        let result = self.load_transformers_inner(transformers).await;
        self.reported(result)
    }

    async fn load_transformers_inner(&self, transformers: Vec<NamedTransform>) -> Result<(), Error> {
        let state = self.sequencer.state.write().await;
        if state.is_building {
            return Err(BuildError::Busy.into());
        }
        self.sequencer.registry.load(transformers).await?;
        self.sequencer.results.clear();
        self.sequencer.project.mark_all_out_of_date().await;
        drop(state);

        self.selection.follow_registry(&self.sequencer.registry).await;
        Ok(())
    }

    /// Load built-in transformers by name, in the given order
    ///
    /// # Errors
    ///
    /// Returns `UnknownTransformer` for a name with no built-in, otherwise
    /// as [`Self::load_transformers`].
    pub async fn load_builtins<S: AsRef<str>>(&self, names: &[S]) -> Result<(), Error> {
        let mut transformers = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let Some(entry) = builtin(name) else {
                return self.reported(Err(ProjectError::UnknownTransformer {
                    name: name.to_string(),
                }
                .into()));
            };
            transformers.push(entry);
        }
        self.load_transformers(transformers).await
    }

    /// Snapshot of the shared build state
    pub async fn state(&self) -> BuildState {
        self.sequencer.state.read().await.clone()
    }

    /// Which controls the presentation layer should enable
    pub async fn controls(&self) -> ControlState {
        let state = self.state().await;
        let selection = self.selection.selection().await;
        let idle = !state.is_building;

        let active_fragment = match &selection.active_fragment {
            Some(id) => self.sequencer.project.fragment(id).await,
            None => None,
        };
        let active_transformer_known = match &selection.active_transformer {
            Some(name) => self.sequencer.registry.position(name).await.is_some(),
            None => false,
        };
        let has_chain = !self.sequencer.registry.is_empty().await;

        ControlState {
            build_all: idle
                && has_chain
                && self.sequencer.project.is_any_fragment_out_of_date().await,
            build_fragment: idle
                && has_chain
                && active_fragment.as_ref().is_some_and(|f| f.out_of_date),
            run_transformer: idle && active_fragment.is_some() && active_transformer_known,
            toggle_debug: true,
            debug_active: state.debug_enabled,
            run_next: state.is_paused(),
        }
    }

    /// Result tabs for a fragment, in chain order
    ///
    /// # Errors
    ///
    /// Returns `UnknownFragment` for an unknown id.
    pub async fn stage_views(&self, id: &FragmentId) -> Result<Vec<StageView>, Error> {
        if self.sequencer.project.fragment(id).await.is_none() {
            return Err(unknown_fragment(id));
        }
        let state = self.state().await;
        let running_index = (state.is_running() && state.current_fragment.as_ref() == Some(id))
            .then_some(state.current_transformer_index)
            .flatten();

        let views = self
            .sequencer
            .registry
            .transformers()
            .await
            .into_iter()
            .map(|info| {
                let result = self.sequencer.results.get(id, &info.name);
                let status = if running_index == Some(info.index) {
                    TransformerStatus::Running
                } else {
                    result
                        .as_ref()
                        .map_or(TransformerStatus::Idle, |result| result.status())
                };
                StageView {
                    transformer: info.name,
                    index: info.index,
                    status,
                    result,
                }
            })
            .collect();
        Ok(views)
    }

    /// Deliver a rejection to the error reporter and pass it on
    fn reported<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            tracing::debug!(code = err.user_code().unwrap_or("unknown"), "operation rejected: {err}");
            self.sequencer.reporter.report(&err.user_message());
        }
        result
    }
}

fn unknown_fragment(id: &FragmentId) -> Error {
    ProjectError::UnknownFragment { id: id.to_string() }.into()
}

fn no_transformers() -> Error {
    BuildError::precondition("no transformers are loaded").into()
}

/// Assembles an [`Orchestrator`] from shared components
///
/// Project store, registry and event bus are required; the rest default.
#[derive(Default)]
pub struct OrchestratorBuilder {
    project: Option<ProjectStore>,
    selection: Option<SelectionTracker>,
    registry: Option<TransformerRegistry>,
    state: Option<SharedBuildState>,
    events: Option<EventBus>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every component around one bus, with debug mode as given
    #[must_use]
    pub fn standalone(events: &EventBus, debug_enabled: bool) -> Self {
        Self::new()
            .with_events(events.clone())
            .with_project(ProjectStore::new(events.clone()))
            .with_registry(TransformerRegistry::new(events.clone()))
            .with_selection(SelectionTracker::new(events.clone()))
            .with_state(shared_state(debug_enabled))
    }

    #[must_use]
    pub fn with_project(mut self, project: ProjectStore) -> Self {
        self.project = Some(project);
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionTracker) -> Self {
        self.selection = Some(selection);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: TransformerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing build state handle
    #[must_use]
    pub fn with_state(mut self, state: SharedBuildState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns `MissingComponent` if the project store, registry or event
    /// bus was not supplied.
    pub fn build(self) -> Result<Orchestrator, Error> {
        let project = self.project.ok_or_else(|| missing("project"))?;
        let registry = self.registry.ok_or_else(|| missing("registry"))?;
        let events = self.events.ok_or_else(|| missing("events"))?;
        let selection = self
            .selection
            .unwrap_or_else(|| SelectionTracker::new(events.clone()));

        Ok(Orchestrator {
            sequencer: Sequencer {
                project,
                registry,
                results: ResultStore::new(),
                state: self.state.unwrap_or_else(|| shared_state(false)),
                events,
                reporter: self
                    .reporter
                    .unwrap_or_else(|| Arc::new(TracingReporter)),
                parked: Arc::new(Mutex::new(None)),
            },
            selection,
        })
    }
}

fn missing(component: &str) -> Error {
    BuildError::MissingComponent {
        component: component.to_string(),
    }
    .into()
}
