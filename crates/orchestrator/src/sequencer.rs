//! Stage-by-stage execution of a build sequence
//!
//! A [`Sequence`] is everything needed to continue a build: the chain
//! snapshot, the fragment in flight, the next stage, the fragments still
//! queued and the report so far. The [`Sequencer`] drives it until the
//! queue is exhausted or debug mode suspends it at a stage boundary.

use crate::project::ProjectStore;
use crate::registry::{Chain, TransformerRegistry};
use crate::reporter::ErrorReporter;
use crate::results::ResultStore;
use crate::state::{advance, release, SharedBuildState};
use spark_errors::{BuildError, UserFacingError};
use spark_events::{BuildEvent, BuildScope, EventBus, EventEmitter, FailureContext};
use spark_types::{
    BuildReport, Fragment, FragmentId, FragmentOutcome, Payload, SequencePhase, StageResult,
    TransformerName, TransformerStatus,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A build sequence between two calls into the orchestrator
pub(crate) struct Sequence {
    session_id: Uuid,
    scope: BuildScope,
    chain: Chain,
    fragment: FragmentId,
    /// Content the chain started from
    content: Payload,
    next: usize,
    /// Exclusive upper bound of stages to run for the current fragment
    stop: usize,
    fragment_stages: usize,
    queue: VecDeque<FragmentId>,
    report: BuildReport,
    elapsed: Duration,
}

impl Sequence {
    pub(crate) fn new(scope: BuildScope, chain: Chain, queue: VecDeque<FragmentId>) -> Self {
        let session_id = Uuid::new_v4();
        Self {
            session_id,
            scope,
            chain,
            fragment: FragmentId::new(""),
            content: Payload::Null,
            next: 0,
            stop: 0,
            fragment_stages: 0,
            queue,
            report: BuildReport::new(session_id),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn next_index(&self) -> usize {
        self.next
    }

    pub(crate) fn fragment(&self) -> &FragmentId {
        &self.fragment
    }

    fn names_from(&self, from: usize) -> impl Iterator<Item = &TransformerName> {
        self.chain.iter().skip(from).map(|entry| &entry.name)
    }
}

/// How a fragment's run over the chain ended
enum ChainEnd {
    Completed,
    Failed {
        transformer: TransformerName,
        message: String,
    },
    Paused {
        stage: usize,
    },
}

/// Slot holding the sequence suspended at a stage boundary
pub(crate) type Parked = Arc<Mutex<Option<Box<Sequence>>>>;

/// Components the sequencer reads and writes
#[derive(Clone)]
pub(crate) struct Sequencer {
    pub(crate) project: ProjectStore,
    pub(crate) registry: TransformerRegistry,
    pub(crate) results: ResultStore,
    pub(crate) state: SharedBuildState,
    pub(crate) events: EventBus,
    pub(crate) reporter: Arc<dyn ErrorReporter>,
    pub(crate) parked: Parked,
}

impl Sequencer {
    /// Prepare `fragment` to run stages `from..stop`
    ///
    /// Results at positions `>= from` are dropped and their transformers
    /// reset to idle so no stale downstream output survives.
    pub(crate) async fn begin_fragment(
        &self,
        seq: &mut Sequence,
        fragment: Fragment,
        from: usize,
        stop: usize,
    ) {
        seq.fragment = fragment.id;
        seq.content = fragment.content;
        seq.next = from;
        seq.stop = stop.min(seq.chain.len());
        seq.fragment_stages = 0;

        self.results.invalidate(&seq.fragment, seq.names_from(from));
        let reset = self.registry.reset(seq.names_from(from)).await;

        {
            let mut state = self.state.write().await;
            state.current_fragment = Some(seq.fragment.clone());
            state.current_transformer_index = Some(from);
            state.queued = seq.queue.iter().cloned().collect();
        }

        tracing::info!(
            session = %seq.session_id,
            fragment = %seq.fragment,
            from_index = from,
            "build started"
        );
        self.events.emit_build(BuildEvent::Started {
            session_id: seq.session_id,
            fragment: seq.fragment.clone(),
            from_index: from,
            scope: seq.scope,
        });
        for (index, entry) in seq.chain.iter().enumerate().skip(from) {
            if reset.contains(&entry.name) {
                self.emit_status(seq, &entry.name, index, TransformerStatus::Idle);
            }
        }
    }

    /// Run until the sequence finishes or pauses
    ///
    /// A paused sequence is parked before the paused flag becomes visible,
    /// so `run_next` never observes a pause without a sequence to resume.
    pub(crate) async fn drive(&self, mut seq: Sequence) -> BuildReport {
        let started = Instant::now();
        loop {
            match self.run_stages(&mut seq).await {
                ChainEnd::Paused { stage } => {
                    seq.elapsed += started.elapsed();
                    return self.park(seq, stage).await;
                }
                end => self.finish_fragment(&mut seq, end).await,
            }
            if !self.advance_queue(&mut seq).await {
                break;
            }
        }

        seq.elapsed += started.elapsed();
        self.conclude(seq).await
    }

    /// Continue a parked sequence
    ///
    /// When the paused fragment was removed in the meantime its results
    /// are dropped and the sequence moves on to the queue.
    pub(crate) async fn resume(&self, mut seq: Sequence) -> BuildReport {
        if self.project.fragment(&seq.fragment).await.is_some() {
            self.resumed(&seq);
            return self.drive(seq).await;
        }

        self.abandon_fragment(&mut seq).await;
        if self.advance_queue(&mut seq).await {
            self.drive(seq).await
        } else {
            self.conclude(seq).await
        }
    }

    async fn conclude(&self, mut seq: Sequence) -> BuildReport {
        release(&mut *self.state.write().await);
        seq.report.duration_ms = millis(seq.elapsed);
        tracing::debug!(session = %seq.session_id, stages = seq.report.stages_run, "sequence finished");
        seq.report
    }

    async fn abandon_fragment(&self, seq: &mut Sequence) {
        self.results.invalidate(&seq.fragment, seq.names_from(0));
        seq.report.discard(&seq.fragment);
        // The removed fragment's pause does not lead anywhere
        self.state.write().await.phase = SequencePhase::Idle;

        tracing::warn!(session = %seq.session_id, fragment = %seq.fragment, "paused fragment was removed; build abandoned");
        self.events.emit_warning_with_context(
            "paused fragment was removed before its build finished",
            seq.fragment.to_string(),
        );
    }

    /// Announce that a parked sequence continues
    fn resumed(&self, seq: &Sequence) {
        tracing::info!(session = %seq.session_id, fragment = %seq.fragment, index = seq.next, "build resumed");
        self.events.emit_build(BuildEvent::Resumed {
            session_id: seq.session_id,
            fragment: seq.fragment.clone(),
            index: seq.next,
        });
    }

    async fn run_stages(&self, seq: &mut Sequence) -> ChainEnd {
        let pausable = seq.scope != BuildScope::Transformer;

        for index in seq.next..seq.stop {
            let entry = seq.chain[index].clone();
            {
                let mut state = self.state.write().await;
                state.current_transformer_index = Some(index);
                advance(&mut state, SequencePhase::Running { stage: index });
            }

            let input = match self.stage_input(seq, index) {
                Ok(input) => input,
                Err(err) => return self.fail_stage(seq, index, &entry.name, &err).await,
            };

            self.set_status(seq, &entry.name, index, TransformerStatus::Running)
                .await;
            tracing::debug!(fragment = %seq.fragment, transformer = %entry.name, stage = index, "running stage");

            // The state lock is not held while stage logic runs
            let outcome = entry.transform.apply(&input).await;
            seq.report.stages_run += 1;
            seq.fragment_stages += 1;
            seq.next = index + 1;

            match outcome {
                Ok(payload) => {
                    self.results.insert(StageResult::success(
                        seq.fragment.clone(),
                        entry.name.clone(),
                        payload,
                    ));
                    self.set_status(seq, &entry.name, index, TransformerStatus::Succeeded)
                        .await;

                    let more = index + 1 < seq.stop;
                    if pausable && more && self.state.read().await.debug_enabled {
                        return ChainEnd::Paused { stage: index };
                    }
                }
                Err(failure) => {
                    let err = BuildError::Transform {
                        transformer: entry.name.to_string(),
                        message: failure.message,
                    };
                    return self.fail_stage(seq, index, &entry.name, &err).await;
                }
            }
        }

        advance(&mut *self.state.write().await, SequencePhase::Completed);
        ChainEnd::Completed
    }

    /// Input for `index`: raw content for stage 0, else the previous success
    fn stage_input(&self, seq: &Sequence, index: usize) -> Result<Payload, BuildError> {
        if index == 0 {
            return Ok(seq.content.clone());
        }
        let upstream = &seq.chain[index - 1].name;
        self.results
            .get(&seq.fragment, upstream)
            .and_then(|result| result.payload().cloned())
            .ok_or_else(|| BuildError::StaleUpstream {
                fragment: seq.fragment.to_string(),
                transformer: seq.chain[index].name.to_string(),
                upstream: upstream.to_string(),
            })
    }

    async fn fail_stage(
        &self,
        seq: &mut Sequence,
        index: usize,
        name: &TransformerName,
        err: &BuildError,
    ) -> ChainEnd {
        let message = match err {
            BuildError::Transform { message, .. } => message.clone(),
            other => other.to_string(),
        };
        // A stage without a valid upstream leaves no result behind
        if !matches!(err, BuildError::StaleUpstream { .. }) {
            self.results.insert(StageResult::failure(
                seq.fragment.clone(),
                name.clone(),
                message.clone(),
            ));
        }
        self.set_status(seq, name, index, TransformerStatus::Failed)
            .await;
        advance(
            &mut *self.state.write().await,
            SequencePhase::Failed { stage: index },
        );

        tracing::warn!(fragment = %seq.fragment, transformer = %name, stage = index, error = %message, "stage failed");
        self.events.emit_build(BuildEvent::Error {
            session_id: seq.session_id,
            fragment: seq.fragment.clone(),
            transformer: name.clone(),
            failure: FailureContext::from_error(err),
        });
        self.reporter.report(&err.user_message());

        ChainEnd::Failed {
            transformer: name.clone(),
            message,
        }
    }

    async fn set_status(
        &self,
        seq: &Sequence,
        name: &TransformerName,
        index: usize,
        status: TransformerStatus,
    ) {
        self.registry.set_status(name, status).await;
        self.emit_status(seq, name, index, status);
    }

    fn emit_status(
        &self,
        seq: &Sequence,
        name: &TransformerName,
        index: usize,
        status: TransformerStatus,
    ) {
        self.events.emit_build(BuildEvent::TransformerStatus {
            session_id: seq.session_id,
            fragment: seq.fragment.clone(),
            transformer: name.clone(),
            index,
            status,
        });
    }

    async fn park(&self, mut seq: Sequence, stage: usize) -> BuildReport {
        seq.report.record(
            seq.fragment.clone(),
            FragmentOutcome::Paused {
                next_index: stage + 1,
            },
        );
        seq.report.duration_ms = millis(seq.elapsed);
        let report = seq.report.clone();
        let event = BuildEvent::Paused {
            session_id: seq.session_id,
            fragment: seq.fragment.clone(),
            transformer: seq.chain[stage].name.clone(),
            index: stage,
        };
        tracing::info!(fragment = %seq.fragment, stage, "build paused");

        *self.parked.lock().await = Some(Box::new(seq));
        {
            let mut state = self.state.write().await;
            state.paused = true;
            state.current_transformer_index = Some(stage);
            advance(&mut state, SequencePhase::Paused { stage });
        }
        self.events.emit_build(event);
        report
    }

    async fn finish_fragment(&self, seq: &mut Sequence, end: ChainEnd) {
        let success = matches!(end, ChainEnd::Completed);
        let outcome = match end {
            ChainEnd::Failed {
                transformer,
                message,
            } => FragmentOutcome::Failed {
                transformer,
                message,
            },
            _ => FragmentOutcome::Succeeded,
        };

        if success && seq.scope != BuildScope::Transformer {
            let cleared = self
                .project
                .clear_out_of_date(&seq.fragment, &seq.content)
                .await;
            if !cleared {
                tracing::debug!(fragment = %seq.fragment, "content changed during build; fragment stays out of date");
            }
        }
        seq.report.record(seq.fragment.clone(), outcome);

        tracing::info!(
            session = %seq.session_id,
            fragment = %seq.fragment,
            success,
            stages = seq.fragment_stages,
            "build completed"
        );
        self.events.emit_build(BuildEvent::Completed {
            session_id: seq.session_id,
            fragment: seq.fragment.clone(),
            success,
            stages_run: seq.fragment_stages,
        });
    }

    /// Start the next queued fragment, skipping ones that vanished
    async fn advance_queue(&self, seq: &mut Sequence) -> bool {
        while let Some(id) = seq.queue.pop_front() {
            match self.project.fragment(&id).await {
                Some(fragment) if fragment.out_of_date => {
                    let stop = seq.chain.len();
                    self.begin_fragment(seq, fragment, 0, stop).await;
                    return true;
                }
                Some(_) => {
                    tracing::debug!(fragment = %id, "queued fragment already up to date");
                }
                None => {
                    self.events.emit_warning_with_context(
                        "queued fragment was removed before it could be built",
                        id.to_string(),
                    );
                }
            }
        }
        false
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
