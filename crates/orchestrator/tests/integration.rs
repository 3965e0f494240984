//! Integration tests for the build orchestrator

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use spark_errors::{BuildError, Error, ProjectError, TransformFailure};
    use spark_events::{AppEvent, BuildEvent, EventBus, EventKind, GeneralEvent, Subscription};
    use spark_orchestrator::*;
    use spark_types::{
        Fragment, FragmentId, FragmentOutcome, Payload, SequencePhase, TransformerName,
        TransformerStatus,
    };
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        reporter: Arc<CollectingReporter>,
        bus: EventBus,
    }

    async fn harness(debug: bool, chain: Vec<NamedTransform>, fragments: &[(&str, &str)]) -> Harness {
        let bus = EventBus::new();
        let reporter = Arc::new(CollectingReporter::new());
        let orchestrator = OrchestratorBuilder::standalone(&bus, debug)
            .with_reporter(reporter.clone())
            .build()
            .unwrap();
        orchestrator.load_transformers(chain).await.unwrap();
        for (id, content) in fragments {
            orchestrator
                .project()
                .add_fragment(Fragment::new(*id, json!(content)))
                .await
                .unwrap();
        }
        Harness {
            orchestrator: Arc::new(orchestrator),
            reporter,
            bus,
        }
    }

    /// Appends `tag` to text input
    fn append(name: &str, tag: &'static str) -> NamedTransform {
        NamedTransform::new(
            name,
            from_fn(move |input: &Payload| {
                let text = input
                    .as_str()
                    .ok_or_else(|| TransformFailure::new("expected text"))?;
                Ok(json!(format!("{text}{tag}")))
            }),
        )
    }

    fn failing(name: &str) -> NamedTransform {
        NamedTransform::new(name, from_fn(|_| Err(TransformFailure::new("boom"))))
    }

    /// Counts invocations and passes input through
    fn counted(name: &str, counter: Arc<AtomicUsize>) -> NamedTransform {
        NamedTransform::new(
            name,
            from_fn(move |input: &Payload| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(input.clone())
            }),
        )
    }

    /// Blocks inside `apply` until released
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Transform for Gate {
        async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(input.clone())
        }
    }

    fn id(value: &str) -> FragmentId {
        FragmentId::new(value)
    }

    fn name(value: &str) -> TransformerName {
        TransformerName::new(value)
    }

    #[tokio::test]
    async fn building_twice_requires_out_of_date() {
        let h = harness(false, vec![append("a", "-a")], &[("f", "x")]).await;

        let report = h.orchestrator.build_fragment(&id("f")).await.unwrap();
        assert_eq!(report.outcome(&id("f")), Some(&FragmentOutcome::Succeeded));
        assert!(!h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);

        let err = h.orchestrator.build_fragment(&id("f")).await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::Precondition { .. })));
        assert_eq!(h.reporter.messages().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_build_is_rejected_as_busy() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let h = harness(
            false,
            vec![NamedTransform::new("gate", gate.clone())],
            &[("f1", "x"), ("f2", "y")],
        )
        .await;

        let first = tokio::spawn({
            let orchestrator = h.orchestrator.clone();
            async move { orchestrator.build_fragment(&id("f1")).await }
        });
        gate.entered.notified().await;

        // State stays readable while a stage runs
        let state = h.orchestrator.state().await;
        assert!(state.is_running());
        assert_eq!(state.current_fragment, Some(id("f1")));
        assert_eq!(state.phase, SequencePhase::Running { stage: 0 });

        for err in [
            h.orchestrator.build_fragment(&id("f2")).await.unwrap_err(),
            h.orchestrator.build_all().await.unwrap_err(),
            h.orchestrator
                .run_transformer(&id("f2"), &name("gate"))
                .await
                .unwrap_err(),
            h.orchestrator.run_next().await.unwrap_err(),
        ] {
            assert!(matches!(err, Error::Build(BuildError::Busy)));
        }
        assert_eq!(h.reporter.messages().len(), 4);

        gate.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.succeeded(), vec![&id("f1")]);
        assert!(!h.orchestrator.state().await.is_building);
        assert!(h.orchestrator.project().fragment(&id("f2")).await.unwrap().out_of_date);
    }

    #[tokio::test]
    async fn many_simultaneous_builds_admit_exactly_one() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let h = harness(false, vec![NamedTransform::new("gate", gate.clone())], &[("f", "x")]).await;

        let winner = tokio::spawn({
            let orchestrator = h.orchestrator.clone();
            async move { orchestrator.build_all().await }
        });
        gate.entered.notified().await;

        let losers = futures::future::join_all((0..8).map(|_| h.orchestrator.build_all())).await;
        assert!(losers
            .iter()
            .all(|r| matches!(r, Err(Error::Build(BuildError::Busy)))));

        gate.release.notify_one();
        assert!(winner.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn failing_stage_halts_the_chain() {
        let h = harness(
            false,
            vec![failing("a"), append("b", "-b"), append("c", "-c")],
            &[("f", "x")],
        )
        .await;
        let mut errors = h.bus.subscribe_to(&[EventKind::BuildError]);

        let report = h.orchestrator.build_fragment(&id("f")).await.unwrap();
        assert!(matches!(
            report.outcome(&id("f")),
            Some(FragmentOutcome::Failed { transformer, message })
                if transformer.as_str() == "a" && message == "boom"
        ));
        assert_eq!(report.stages_run, 1);

        let views = h.orchestrator.stage_views(&id("f")).await.unwrap();
        assert_eq!(views[0].status, TransformerStatus::Failed);
        assert!(views[0].result.as_ref().is_some_and(|r| !r.is_success()));
        for view in &views[1..] {
            assert_eq!(view.status, TransformerStatus::Idle);
            assert!(view.result.is_none());
        }

        let registry = h.orchestrator.registry();
        assert_eq!(registry.status(&name("a")).await, Some(TransformerStatus::Failed));
        assert_eq!(registry.status(&name("b")).await, Some(TransformerStatus::Idle));

        assert!(h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);
        assert!(errors.try_recv().is_some());
        assert_eq!(h.reporter.messages(), vec!["transformer a failed: boom"]);
        assert!(!h.orchestrator.state().await.is_building);
    }

    #[tokio::test]
    async fn debug_mode_steps_one_stage_at_a_time() {
        let h = harness(
            true,
            vec![append("a", "-a"), append("b", "-b"), append("c", "-c")],
            &[("f", "x")],
        )
        .await;
        let mut pauses = h.bus.subscribe_to(&[EventKind::BuildPaused]);

        let report = h.orchestrator.build_fragment(&id("f")).await.unwrap();
        assert!(report.is_paused());
        assert_eq!(
            report.outcome(&id("f")),
            Some(&FragmentOutcome::Paused { next_index: 1 })
        );
        let state = h.orchestrator.state().await;
        assert!(state.is_paused());
        assert_eq!(state.current_transformer_index, Some(0));
        assert_eq!(state.phase, SequencePhase::Paused { stage: 0 });
        assert!(h.orchestrator.controls().await.run_next);

        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(
            report.outcome(&id("f")),
            Some(&FragmentOutcome::Paused { next_index: 2 })
        );
        assert!(h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);

        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(report.outcome(&id("f")), Some(&FragmentOutcome::Succeeded));
        assert_eq!(report.stages_run, 3);
        assert!(!h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);
        assert_eq!(
            h.orchestrator
                .results()
                .get(&id("f"), &name("c"))
                .unwrap()
                .payload(),
            Some(&json!("x-a-b-c"))
        );
        assert_eq!(pauses.drain().len(), 2);

        let err = h.orchestrator.run_next().await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::Precondition { .. })));
    }

    #[tokio::test]
    async fn toggling_debug_off_lets_a_paused_chain_finish() {
        let h = harness(
            true,
            vec![append("a", "-a"), append("b", "-b"), append("c", "-c")],
            &[("f", "x")],
        )
        .await;

        assert!(h.orchestrator.build_fragment(&id("f")).await.unwrap().is_paused());
        assert!(!h.orchestrator.toggle_debug().await);
        // Still paused until explicitly resumed
        assert!(h.orchestrator.state().await.is_paused());

        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(report.outcome(&id("f")), Some(&FragmentOutcome::Succeeded));
    }

    #[tokio::test]
    async fn paused_build_all_continues_into_queued_fragments() {
        let h = harness(
            true,
            vec![append("a", "-a"), append("b", "-b")],
            &[("f1", "x"), ("f2", "y")],
        )
        .await;

        let report = h.orchestrator.build_all().await.unwrap();
        assert!(report.is_paused());
        assert_eq!(h.orchestrator.state().await.queued, vec![id("f2")]);

        let report = h.orchestrator.run_next().await.unwrap();
        // f1 finished, f2 paused after its first stage
        assert_eq!(report.outcome(&id("f1")), Some(&FragmentOutcome::Succeeded));
        assert_eq!(
            report.outcome(&id("f2")),
            Some(&FragmentOutcome::Paused { next_index: 1 })
        );

        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(report.succeeded().len(), 2);
        assert!(!h.orchestrator.project().is_any_fragment_out_of_date().await);
    }

    /// Contexts of the warnings received so far
    fn warning_contexts(sub: &mut Subscription) -> Vec<String> {
        sub.drain()
            .into_iter()
            .filter_map(|m| match m.event {
                AppEvent::General(GeneralEvent::Warning { context, .. }) => context,
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn content_edited_while_paused_stays_out_of_date() {
        let h = harness(true, vec![append("a", "-a"), append("b", "-b")], &[("f", "x")]).await;

        assert!(h.orchestrator.build_fragment(&id("f")).await.unwrap().is_paused());
        h.orchestrator
            .project()
            .update_content(&id("f"), json!("edited"))
            .await
            .unwrap();

        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(report.outcome(&id("f")), Some(&FragmentOutcome::Succeeded));
        // The finished chain was built from the old content
        assert!(h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);
        assert!(!h.orchestrator.state().await.is_building);
    }

    #[tokio::test]
    async fn queued_fragment_removed_while_paused_is_skipped() {
        let h = harness(
            true,
            vec![append("a", "-a"), append("b", "-b")],
            &[("f1", "x"), ("f2", "y")],
        )
        .await;
        let mut warnings = h.bus.subscribe_to(&[EventKind::Warning]);

        assert!(h.orchestrator.build_all().await.unwrap().is_paused());
        h.orchestrator.project().remove_fragment(&id("f2")).await.unwrap();

        let report = h.orchestrator.run_next().await.unwrap();
        assert!(!report.is_paused());
        assert_eq!(report.outcome(&id("f1")), Some(&FragmentOutcome::Succeeded));
        assert_eq!(report.outcome(&id("f2")), None);
        assert_eq!(warning_contexts(&mut warnings), vec!["f2".to_string()]);
        assert!(!h.orchestrator.state().await.is_building);
    }

    #[tokio::test]
    async fn paused_fragment_removed_is_abandoned_on_resume() {
        let h = harness(
            true,
            vec![append("a", "-a"), append("b", "-b")],
            &[("f1", "x"), ("f2", "y")],
        )
        .await;
        let mut warnings = h.bus.subscribe_to(&[EventKind::Warning]);

        assert!(h.orchestrator.build_all().await.unwrap().is_paused());
        h.orchestrator.project().remove_fragment(&id("f1")).await.unwrap();

        // The queue moves on to f2, which pauses after its first stage
        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(report.outcome(&id("f1")), None);
        assert_eq!(
            report.outcome(&id("f2")),
            Some(&FragmentOutcome::Paused { next_index: 1 })
        );
        assert!(h.orchestrator.results().for_fragment(&id("f1")).is_empty());
        assert_eq!(warning_contexts(&mut warnings), vec!["f1".to_string()]);
        assert_eq!(
            h.orchestrator.state().await.current_fragment,
            Some(id("f2"))
        );

        let report = h.orchestrator.run_next().await.unwrap();
        assert_eq!(report.succeeded(), vec![&id("f2")]);
        assert!(h.orchestrator.results().for_fragment(&id("f1")).is_empty());
    }

    #[tokio::test]
    async fn removing_the_only_paused_fragment_ends_the_build() {
        let h = harness(true, vec![append("a", "-a"), append("b", "-b")], &[("f", "x")]).await;

        assert!(h.orchestrator.build_fragment(&id("f")).await.unwrap().is_paused());
        h.orchestrator.project().remove_fragment(&id("f")).await.unwrap();

        let report = h.orchestrator.run_next().await.unwrap();
        assert!(report.fragments.is_empty());
        assert_eq!(report.stages_run, 1);
        assert!(h.orchestrator.results().is_empty());
        let state = h.orchestrator.state().await;
        assert!(!state.is_building);
        assert_eq!(state.phase, SequencePhase::Idle);
    }

    #[tokio::test]
    async fn restarting_a_chain_publishes_idle_statuses() {
        let h = harness(
            false,
            vec![append("a", "-a"), append("b", "-b")],
            &[("f1", "x"), ("f2", "y")],
        )
        .await;
        h.orchestrator.build_fragment(&id("f1")).await.unwrap();
        assert!(h.orchestrator.toggle_debug().await);
        let mut statuses = h.bus.subscribe_to(&[EventKind::TransformerStatus]);

        assert!(h.orchestrator.build_fragment(&id("f2")).await.unwrap().is_paused());
        assert_eq!(
            h.orchestrator.registry().status(&name("b")).await,
            Some(TransformerStatus::Idle)
        );

        let seen: Vec<(String, TransformerStatus)> = statuses
            .drain()
            .into_iter()
            .filter_map(|m| match m.event {
                AppEvent::Build(BuildEvent::TransformerStatus {
                    transformer,
                    status,
                    ..
                }) => Some((transformer.to_string(), status)),
                _ => None,
            })
            .collect();
        assert_eq!(
            seen,
            [
                ("a".to_string(), TransformerStatus::Idle),
                ("b".to_string(), TransformerStatus::Idle),
                ("a".to_string(), TransformerStatus::Running),
                ("a".to_string(), TransformerStatus::Succeeded),
            ]
        );
    }

    #[tokio::test]
    async fn run_transformer_needs_successful_upstream() {
        let counts: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let h = harness(
            false,
            vec![
                counted("a", counts[0].clone()),
                counted("b", counts[1].clone()),
                counted("c", counts[2].clone()),
            ],
            &[("f", "x")],
        )
        .await;

        let err = h
            .orchestrator
            .run_transformer(&id("f"), &name("c"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::StaleUpstream { ref upstream, .. }) if upstream == "a"
        ));

        for stage in ["a", "b", "c"] {
            h.orchestrator
                .run_transformer(&id("f"), &name(stage))
                .await
                .unwrap();
        }
        h.orchestrator
            .run_transformer(&id("f"), &name("c"))
            .await
            .unwrap();

        let runs: Vec<usize> = counts.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(runs, [1, 1, 2]);
        // A single stage never marks the fragment up to date
        assert!(h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);

        // Re-running an upstream stage drops downstream results
        h.orchestrator
            .run_transformer(&id("f"), &name("a"))
            .await
            .unwrap();
        assert!(h.orchestrator.results().get(&id("f"), &name("b")).is_none());
        assert!(h.orchestrator.results().get(&id("f"), &name("c")).is_none());
    }

    #[tokio::test]
    async fn run_transformer_never_pauses() {
        let h = harness(true, vec![append("a", "-a"), append("b", "-b")], &[("f", "x")]).await;
        let report = h
            .orchestrator
            .run_transformer(&id("f"), &name("a"))
            .await
            .unwrap();
        assert!(!report.is_paused());
        assert!(!h.orchestrator.state().await.is_building);
    }

    #[tokio::test]
    async fn build_all_isolates_failures() {
        let picky = NamedTransform::new(
            "a",
            from_fn(|input: &Payload| {
                if input == &json!("bad") {
                    Err(TransformFailure::new("rejected"))
                } else {
                    Ok(input.clone())
                }
            }),
        );
        let h = harness(false, vec![picky, append("b", "-b")], &[("f1", "bad"), ("f2", "good")]).await;

        let report = h.orchestrator.build_all().await.unwrap();
        assert_eq!(report.failed(), vec![&id("f1")]);
        assert_eq!(report.succeeded(), vec![&id("f2")]);
        assert_eq!(
            h.orchestrator.project().out_of_date_fragments().await,
            vec![id("f1")]
        );
        assert_eq!(h.orchestrator.state().await.phase, SequencePhase::Idle);
    }

    #[tokio::test]
    async fn build_all_with_nothing_stale_is_empty() {
        let h = harness(false, vec![append("a", "-a")], &[("f", "x")]).await;
        h.orchestrator.build_all().await.unwrap();

        let report = h.orchestrator.build_all().await.unwrap();
        assert!(report.fragments.is_empty());
        assert_eq!(report.stages_run, 0);
    }

    #[tokio::test]
    async fn build_events_follow_stage_order() {
        let h = harness(false, vec![append("a", "-a"), append("b", "-b")], &[("f", "x")]).await;
        let mut sub = h.bus.subscribe();

        let report = h.orchestrator.build_fragment(&id("f")).await.unwrap();
        let messages = sub.drain();
        let build: Vec<_> = messages
            .iter()
            .filter_map(|m| match &m.event {
                AppEvent::Build(event) => Some((m, event)),
                _ => None,
            })
            .collect();

        let kinds: Vec<EventKind> = build.iter().map(|(m, _)| m.kind()).collect();
        assert_eq!(
            kinds,
            [
                EventKind::BuildStarted,
                EventKind::TransformerStatus,
                EventKind::TransformerStatus,
                EventKind::TransformerStatus,
                EventKind::TransformerStatus,
                EventKind::BuildCompleted,
            ]
        );
        let statuses: Vec<(String, TransformerStatus)> = build
            .iter()
            .filter_map(|(_, e)| match e {
                BuildEvent::TransformerStatus {
                    transformer, status, ..
                } => Some((transformer.to_string(), *status)),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            [
                ("a".to_string(), TransformerStatus::Running),
                ("a".to_string(), TransformerStatus::Succeeded),
                ("b".to_string(), TransformerStatus::Running),
                ("b".to_string(), TransformerStatus::Succeeded),
            ]
        );
        let session = report.session_id.to_string();
        assert!(build
            .iter()
            .all(|(m, _)| m.meta.correlation_id.as_deref() == Some(session.as_str())));
    }

    #[tokio::test]
    async fn reload_is_rejected_while_paused_and_resets_results_after() {
        let h = harness(true, vec![append("a", "-a"), append("b", "-b")], &[("f", "x")]).await;
        h.orchestrator.build_fragment(&id("f")).await.unwrap();

        let err = h
            .orchestrator
            .load_builtins(&["trim"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::Busy)));

        h.orchestrator.run_next().await.unwrap();
        assert!(!h.orchestrator.results().is_empty());

        h.orchestrator.load_builtins(&["trim", "reverse"]).await.unwrap();
        assert!(h.orchestrator.results().is_empty());
        assert!(h.orchestrator.project().fragment(&id("f")).await.unwrap().out_of_date);
        assert_eq!(
            h.orchestrator.selection().active_transformer().await,
            Some(name("trim"))
        );

        let err = h.orchestrator.load_builtins(&["compile"]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Project(ProjectError::UnknownTransformer { .. })
        ));
    }

    #[tokio::test]
    async fn controls_track_selection_and_lock() {
        let h = harness(true, vec![append("a", "-a"), append("b", "-b")], &[("f", "x")]).await;
        let controls = h.orchestrator.controls().await;
        assert!(controls.build_all);
        assert!(!controls.build_fragment);
        assert!(!controls.run_transformer);
        assert!(controls.toggle_debug);
        assert!(controls.debug_active);
        assert!(!controls.run_next);

        h.orchestrator
            .selection()
            .set_active_fragment(Some(id("f")))
            .await;
        let controls = h.orchestrator.controls().await;
        assert!(controls.build_fragment);
        assert!(controls.run_transformer);

        h.orchestrator.build_active_fragment().await.unwrap();
        let controls = h.orchestrator.controls().await;
        assert!(!controls.build_all);
        assert!(!controls.build_fragment);
        assert!(!controls.run_transformer);
        assert!(controls.run_next);
    }

    #[tokio::test]
    async fn selection_driven_operations_need_a_selection() {
        let h = harness(false, vec![append("a", "-a")], &[("f", "x")]).await;
        let err = h.orchestrator.build_active_fragment().await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::Precondition { .. })));

        h.orchestrator
            .selection()
            .set_active_fragment(Some(id("f")))
            .await;
        h.orchestrator
            .selection()
            .set_active_transformer(None)
            .await;
        let err = h.orchestrator.run_active_transformer().await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::Precondition { .. })));

        h.orchestrator
            .selection()
            .set_active_transformer(Some(name("a")))
            .await;
        h.orchestrator.run_active_transformer().await.unwrap();
        assert!(h.orchestrator.results().get(&id("f"), &name("a")).is_some());
        assert_eq!(h.reporter.take().len(), 2);
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let h = harness(false, vec![append("a", "-a")], &[("f", "x")]).await;
        assert!(matches!(
            h.orchestrator.build_fragment(&id("nope")).await,
            Err(Error::Project(ProjectError::UnknownFragment { .. }))
        ));
        assert!(matches!(
            h.orchestrator.run_transformer(&id("f"), &name("zzz")).await,
            Err(Error::Project(ProjectError::UnknownTransformer { .. }))
        ));
        assert!(h.orchestrator.stage_views(&id("nope")).await.is_err());
        assert_eq!(h.reporter.messages().len(), 2);
    }

    #[tokio::test]
    async fn builder_requires_core_components() {
        let err = Orchestrator::builder()
            .with_events(EventBus::new())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::MissingComponent { ref component }) if component == "project"
        ));
    }

    #[tokio::test]
    async fn shared_state_handle_is_visible_to_owner() {
        let bus = EventBus::new();
        let state = shared_state(false);
        let orchestrator = OrchestratorBuilder::standalone(&bus, false)
            .with_state(state.clone())
            .build()
            .unwrap();
        orchestrator.toggle_debug().await;
        assert!(state.read().await.debug_enabled);
    }

    #[tokio::test]
    async fn manifest_file_drives_a_full_build() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pipeline]
transformers = ["trim", "uppercase", "word-count"]

[[fragments]]
id = "intro"
content = "  hello big world  "
"#
        )
        .unwrap();

        let bus = EventBus::new();
        let orchestrator = OrchestratorBuilder::standalone(&bus, false).build().unwrap();
        let manifest = ProjectManifest::load(file.path()).await.unwrap();
        manifest.apply(&orchestrator).await.unwrap();
        assert_eq!(
            orchestrator.selection().active_fragment().await,
            Some(id("intro"))
        );

        orchestrator.build_all().await.unwrap();
        let views = orchestrator.stage_views(&id("intro")).await.unwrap();
        assert_eq!(
            views[1].result.as_ref().and_then(|r| r.payload()),
            Some(&json!("HELLO BIG WORLD"))
        );
        assert_eq!(
            views[2].result.as_ref().and_then(|r| r.payload()),
            Some(&json!(3))
        );
    }

    mod invariants {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Build,
            Run(usize),
            Edit(bool),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Build),
                (0usize..8).prop_map(Op::Run),
                any::<bool>().prop_map(Op::Edit),
            ]
        }

        /// Passes input through, failing on "bad" when `fails` is set
        fn stage(index: usize, fails: bool) -> NamedTransform {
            NamedTransform::new(
                format!("t{index}"),
                from_fn(move |input: &Payload| {
                    if fails && input == &json!("bad") {
                        Err(TransformFailure::new("bad input"))
                    } else {
                        Ok(input.clone())
                    }
                }),
            )
        }

        proptest! {
            #[test]
            fn results_never_outlive_their_upstream(
                len in 1usize..6,
                fail_at in proptest::option::of(0usize..6),
                ops in proptest::collection::vec(op(), 1..12),
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let chain = (0..len).map(|i| stage(i, fail_at == Some(i))).collect();
                    let h = harness(false, chain, &[("f", "good")]).await;
                    let f = id("f");

                    for op in ops {
                        match op {
                            Op::Build => {
                                if let Ok(report) = h.orchestrator.build_fragment(&f).await {
                                    let done = report.outcome(&f) == Some(&FragmentOutcome::Succeeded);
                                    let stale = h.orchestrator.project().fragment(&f).await.unwrap().out_of_date;
                                    prop_assert_eq!(done, !stale);
                                }
                            }
                            Op::Run(i) => {
                                let _ = h
                                    .orchestrator
                                    .run_transformer(&f, &TransformerName::new(format!("t{}", i % len)))
                                    .await;
                            }
                            Op::Edit(bad) => {
                                let content = if bad { json!("bad") } else { json!("good") };
                                h.orchestrator.project().update_content(&f, content).await.unwrap();
                            }
                        }

                        let views = h.orchestrator.stage_views(&f).await.unwrap();
                        for (i, view) in views.iter().enumerate() {
                            if view.result.is_some() {
                                prop_assert!(views[..i]
                                    .iter()
                                    .all(|v| v.result.as_ref().is_some_and(|r| r.is_success())));
                            }
                        }
                        prop_assert!(!h.orchestrator.state().await.is_building);
                    }
                    Ok(())
                })?;
            }
        }
    }
}
