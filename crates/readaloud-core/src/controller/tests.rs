use super::*;
use crate::document::PagedDocument;
use crate::engines::Credentials;
use crate::presentation::{ChannelPresenter, FailureKind, PresentationEvent};
use crate::synthesis::SynthesisClient;
use crate::testing::{FakeSynth, OutputCall, RecordingOutput, ScriptedTransport};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

struct Harness {
    handle: ControllerHandle,
    output: RecordingOutput,
    events: mpsc::UnboundedReceiver<PresentationEvent>,
    seen: Vec<PresentationEvent>,
}

impl Harness {
    fn spawn(
        document: PagedDocument,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: PlaybackSettings,
        selection: VoiceSelection,
    ) -> Self {
        let output = RecordingOutput::new();
        let (presenter, events) = ChannelPresenter::new();
        let (controller, handle) = PlaybackController::new(
            settings,
            selection,
            synthesizer,
            Box::new(output.clone()),
            Box::new(presenter),
            Box::new(document),
        );
        tokio::spawn(controller.run());
        Self {
            handle,
            output,
            events,
            seen: Vec::new(),
        }
    }

    fn with_text(text: &str, synth: &Arc<FakeSynth>, settings: PlaybackSettings) -> Self {
        Self::spawn(
            PagedDocument::new(text, 4000),
            synth.clone(),
            settings,
            piper(),
        )
    }

    fn send(&self, command: Command) {
        self.handle
            .send(command)
            .expect("controller should be running");
    }

    fn events(&mut self) -> &[PresentationEvent] {
        while let Ok(event) = self.events.try_recv() {
            self.seen.push(event);
        }
        &self.seen
    }

    fn states(&mut self) -> Vec<PlaybackState> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::StateChange { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn started(&mut self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::ChunkStart { unit } => Some(unit.text.clone()),
                _ => None,
            })
            .collect()
    }

    fn failures(&mut self) -> Vec<(FailureKind, String)> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::Failure { kind, message } => Some((*kind, message.clone())),
                _ => None,
            })
            .collect()
    }

    fn state(&self) -> PlaybackState {
        self.handle.snapshot().state
    }

    fn current_index(&self) -> usize {
        self.handle.snapshot().current_index
    }
}

fn piper() -> VoiceSelection {
    VoiceSelection::new("piper", "amy")
}

fn one_word_units(window_size: usize) -> PlaybackSettings {
    PlaybackSettings {
        window_size,
        max_unit_words: 1,
        ..PlaybackSettings::default()
    }
}

fn audio_url(unit_id: &str) -> String {
    FakeSynth::audio_for(unit_id).url().to_string()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("readaloud-ctl-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("book.txt");
    std::fs::write(&path, contents).expect("seed file");
    path
}

#[tokio::test(start_paused = true)]
async fn start_requests_the_initial_window() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(100)));
    let mut harness = Harness::with_text("a b c d e", &synth, one_word_units(3));

    harness.send(Command::Start);
    settle().await;

    let mut requested = synth.requested();
    requested.sort();
    assert_eq!(requested, vec!["chunk-0", "chunk-1", "chunk-2"]);
    assert_eq!(harness.state(), PlaybackState::Buffering);

    advance(150).await;
    assert_eq!(harness.state(), PlaybackState::Playing);
    assert_eq!(harness.output.attached_urls(), vec![audio_url("chunk-0")]);
    assert_eq!(harness.started(), vec!["a"]);
    assert_eq!(
        harness.states(),
        vec![PlaybackState::Buffering, PlaybackState::Playing]
    );
}

#[tokio::test(start_paused = true)]
async fn playback_follows_index_order_when_results_arrive_reversed() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    synth.delay("chunk-0", Duration::from_millis(300));
    synth.delay("chunk-1", Duration::from_millis(200));
    synth.delay("chunk-2", Duration::from_millis(100));
    let mut harness = Harness::with_text("alpha beta gamma", &synth, one_word_units(3));

    harness.send(Command::Start);
    advance(250).await;
    assert_eq!(harness.state(), PlaybackState::Buffering);
    assert!(harness.output.attached_urls().is_empty());

    advance(100).await;
    assert_eq!(harness.output.attached_index(), Some(0));
    for _ in 0..3 {
        assert!(harness.output.finish_current());
        settle().await;
    }

    assert_eq!(
        harness.output.attached_urls(),
        vec![audio_url("chunk-0"), audio_url("chunk-1"), audio_url("chunk-2")]
    );
    assert_eq!(harness.started(), vec!["alpha", "beta", "gamma"]);
    assert_eq!(harness.state(), PlaybackState::Idle);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_prefetches() {
    let synth = Arc::new(FakeSynth::new(Duration::from_secs(10)));
    let mut harness = Harness::with_text("a b c d", &synth, one_word_units(3));

    harness.send(Command::Start);
    settle().await;
    assert_eq!(synth.in_flight.load(Ordering::SeqCst), 3);

    harness.send(Command::Stop);
    settle().await;
    assert_eq!(synth.in_flight.load(Ordering::SeqCst), 0);
    assert_eq!(harness.state(), PlaybackState::Idle);
    assert_eq!(
        harness.states(),
        vec![PlaybackState::Buffering, PlaybackState::Idle]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_late_results_are_ignored() {
    let synth = Arc::new(FakeSynth::ignoring_cancel(Duration::from_millis(100)));
    let mut harness = Harness::with_text("a b c", &synth, one_word_units(3));

    harness.send(Command::Start);
    settle().await;
    harness.send(Command::Stop);
    harness.send(Command::Stop);
    settle().await;

    advance(200).await;
    assert_eq!(harness.state(), PlaybackState::Idle);
    assert!(harness.output.attached_urls().is_empty());
    assert!(harness.started().is_empty());
    assert_eq!(
        harness.states(),
        vec![PlaybackState::Buffering, PlaybackState::Idle]
    );

    // A fresh session is unaffected by the abandoned one.
    harness.send(Command::Start);
    advance(150).await;
    assert_eq!(harness.state(), PlaybackState::Playing);
    assert_eq!(harness.output.attached_urls(), vec![audio_url("chunk-0")]);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_keep_position_without_refetching() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let mut harness = Harness::with_text("one two three", &synth, one_word_units(2));

    harness.send(Command::Start);
    advance(50).await;
    let calls = synth.calls.load(Ordering::SeqCst);

    harness.send(Command::TogglePlayPause);
    settle().await;
    assert_eq!(harness.state(), PlaybackState::Paused);

    harness.send(Command::TogglePlayPause);
    settle().await;
    assert_eq!(harness.state(), PlaybackState::Playing);

    assert_eq!(synth.calls.load(Ordering::SeqCst), calls);
    assert_eq!(harness.output.attached_urls(), vec![audio_url("chunk-0")]);
    assert_eq!(harness.output.attached_index(), Some(0));
    let calls = harness.output.calls();
    let tail = &calls[calls.len() - 2..];
    assert_eq!(tail, &[OutputCall::Pause, OutputCall::Play]);
    assert_eq!(harness.started(), vec!["one"]);
}

#[tokio::test(start_paused = true)]
async fn in_flight_requests_never_exceed_the_window() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(50)));
    let words = (0..20).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let mut harness = Harness::with_text(&words, &synth, one_word_units(3));

    harness.send(Command::Start);
    for _ in 0..20 {
        advance(60).await;
        assert!(harness.output.finish_current());
    }
    settle().await;

    assert!(synth.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 20);
    let expected: Vec<String> = (0..20).map(|i| format!("w{i}")).collect();
    assert_eq!(harness.started(), expected);
    assert_eq!(harness.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn missing_credential_fails_before_any_request() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = SynthesisClient::new(
        transport.clone(),
        Credentials::new(),
        Duration::from_millis(500),
    );
    let mut harness = Harness::spawn(
        PagedDocument::new("some text to read", 4000),
        Arc::new(client),
        PlaybackSettings::default(),
        VoiceSelection::new("gemini", "en-US-A"),
    );

    harness.send(Command::Start);
    settle().await;

    assert_eq!(harness.state(), PlaybackState::Idle);
    assert!(harness.states().is_empty());
    let failures = harness.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, FailureKind::MissingCredential);
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_prefetch_failures_are_retried() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    synth.fail("chunk-0", SynthesisError::Network("reset".into()));
    synth.fail("chunk-0", SynthesisError::Network("reset".into()));
    let mut harness = Harness::with_text("a b", &synth, one_word_units(2));

    harness.send(Command::Start);
    advance(100).await;

    assert_eq!(harness.state(), PlaybackState::Playing);
    assert_eq!(harness.output.attached_urls(), vec![audio_url("chunk-0")]);
    let attempts = synth.requested().iter().filter(|id| *id == "chunk-0").count();
    assert_eq!(attempts, 3);
    assert!(harness.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_prefetch_attempts_surface_and_stop() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    for _ in 0..3 {
        synth.fail(
            "chunk-0",
            SynthesisError::RequestFailed {
                status: Some(500),
                detail: "Failed to generate audio.".into(),
            },
        );
    }
    let mut harness = Harness::with_text("a b c", &synth, one_word_units(3));

    harness.send(Command::Start);
    advance(100).await;

    assert_eq!(harness.state(), PlaybackState::Idle);
    let failures = harness.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, FailureKind::RequestFailed);
    let attempts = synth.requested().iter().filter(|id| *id == "chunk-0").count();
    assert_eq!(attempts, 3);
    assert!(harness.output.attached_urls().is_empty());
    assert_eq!(
        harness.states(),
        vec![PlaybackState::Buffering, PlaybackState::Idle]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_credential_from_a_prefetch_is_not_retried() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    synth.fail(
        "chunk-0",
        SynthesisError::MissingCredential {
            engine: "piper".into(),
        },
    );
    let mut harness = Harness::with_text("a b", &synth, one_word_units(2));

    harness.send(Command::Start);
    advance(100).await;

    assert_eq!(harness.state(), PlaybackState::Idle);
    let attempts = synth.requested().iter().filter(|id| *id == "chunk-0").count();
    assert_eq!(attempts, 1);
    assert_eq!(harness.failures()[0].0, FailureKind::MissingCredential);
}

#[tokio::test(start_paused = true)]
async fn failed_playback_is_retried_then_skipped() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let mut harness = Harness::with_text("first second", &synth, one_word_units(2));
    harness.output.fail_next_attaches(4);

    harness.send(Command::Start);
    advance(50).await;
    assert_eq!(harness.output.attached_urls().len(), 1);

    advance(2_000).await;
    assert_eq!(harness.output.attached_urls().len(), 2);

    advance(5_000).await;
    let first = audio_url("chunk-0");
    assert_eq!(
        harness.output.attached_urls(),
        vec![
            first.clone(),
            first.clone(),
            first.clone(),
            first,
            audio_url("chunk-1")
        ]
    );
    let failures = harness.failures();
    assert_eq!(
        failures,
        vec![(
            FailureKind::PlaybackFailed,
            "Failed to play audio for chunk 0. Skipping.".to_string()
        )]
    );
    assert_eq!(harness.state(), PlaybackState::Playing);
    assert_eq!(harness.current_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_continue_moves_through_pages() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        auto_continue: true,
        ..one_word_units(3)
    };
    let mut harness = Harness::spawn(
        PagedDocument::new("aaaa bbbb cccc dddd", 10),
        synth.clone(),
        settings,
        piper(),
    );

    harness.send(Command::Start);
    for _ in 0..4 {
        advance(50).await;
        assert!(harness.output.finish_current());
    }
    settle().await;

    assert_eq!(harness.started(), vec!["aaaa", "bbbb", "cccc", "dddd"]);
    assert_eq!(harness.handle.snapshot().page, 1);
    assert_eq!(harness.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn auto_continue_skips_blank_pages() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        auto_continue: true,
        ..one_word_units(3)
    };
    let text = format!("aaaa{}bbbb", " ".repeat(6));
    let mut harness = Harness::spawn(PagedDocument::new(&text, 5), synth.clone(), settings, piper());

    harness.send(Command::Start);
    advance(50).await;
    assert!(harness.output.finish_current());
    advance(50).await;
    assert!(harness.output.finish_current());
    settle().await;

    assert_eq!(harness.started(), vec!["aaaa", "bbbb"]);
    assert_eq!(harness.handle.snapshot().page, 2);
}

#[tokio::test(start_paused = true)]
async fn end_of_page_without_auto_continue_goes_idle() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let mut harness = Harness::spawn(
        PagedDocument::new("aaaa bbbb cccc dddd", 10),
        synth.clone(),
        one_word_units(3),
        piper(),
    );

    harness.send(Command::Start);
    for _ in 0..2 {
        advance(50).await;
        assert!(harness.output.finish_current());
    }
    settle().await;

    assert_eq!(harness.state(), PlaybackState::Idle);
    assert_eq!(harness.handle.snapshot().page, 0);
    assert_eq!(harness.started(), vec!["aaaa", "bbbb"]);
}

#[tokio::test(start_paused = true)]
async fn stop_discards_played_text_when_enabled() {
    let path = temp_file("discard", "alpha beta gamma delta");
    let document = PagedDocument::load(&path, 4000)
        .expect("document should load")
        .with_backing_file(&path);
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        auto_delete_consumed: true,
        ..one_word_units(3)
    };
    let mut harness = Harness::spawn(document, synth.clone(), settings, piper());

    harness.send(Command::Start);
    advance(50).await;
    assert!(harness.output.finish_current());
    settle().await;
    assert_eq!(harness.current_index(), 1);

    harness.send(Command::Stop);
    settle().await;

    let remaining = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(remaining, "beta gamma delta");
    assert_eq!(harness.state(), PlaybackState::Idle);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(start_paused = true)]
async fn discarding_a_fully_played_page_keeps_the_next_page_intact() {
    let path = temp_file("full-page", "aaaaaaaa bbb cc dddd");
    let mut document = PagedDocument::load(&path, 8)
        .expect("document should load")
        .with_backing_file(&path);
    document.set_page(1);
    assert_eq!(document.current_text(), " bbb cc ");
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        auto_delete_consumed: true,
        ..one_word_units(3)
    };
    let mut harness = Harness::spawn(document, synth.clone(), settings, piper());

    harness.send(Command::Start);
    advance(50).await;
    assert!(harness.output.finish_current());
    settle().await;
    assert!(harness.output.finish_current());
    settle().await;
    assert_eq!(harness.started(), vec!["bbb", "cc"]);
    assert_eq!(harness.state(), PlaybackState::Idle);

    harness.send(Command::Stop);
    settle().await;

    assert_eq!(std::fs::read_to_string(&path).expect("read back"), "dddd");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(start_paused = true)]
async fn stop_keeps_text_when_nothing_was_played_or_policy_is_off() {
    let path = temp_file("keep", "alpha beta gamma");
    let document = PagedDocument::load(&path, 4000)
        .expect("document should load")
        .with_backing_file(&path);
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        auto_delete_consumed: true,
        ..one_word_units(3)
    };
    let harness = Harness::spawn(document, synth.clone(), settings, piper());

    harness.send(Command::Start);
    advance(50).await;
    harness.send(Command::Stop);
    settle().await;
    assert_eq!(
        std::fs::read_to_string(&path).expect("read back"),
        "alpha beta gamma"
    );

    harness.send(Command::SetAutoDelete(false));
    harness.send(Command::Start);
    advance(50).await;
    assert!(harness.output.finish_current());
    settle().await;
    harness.send(Command::Stop);
    settle().await;
    assert_eq!(
        std::fs::read_to_string(&path).expect("read back"),
        "alpha beta gamma"
    );
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(start_paused = true)]
async fn source_change_never_discards_text() {
    let path = temp_file("source-change", "alpha beta gamma");
    let document = PagedDocument::load(&path, 4000)
        .expect("document should load")
        .with_backing_file(&path);
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        auto_delete_consumed: true,
        ..one_word_units(3)
    };
    let harness = Harness::spawn(document, synth.clone(), settings, piper());

    harness.send(Command::Start);
    advance(50).await;
    assert!(harness.output.finish_current());
    settle().await;
    harness.send(Command::SourceChanged);
    settle().await;

    assert_eq!(harness.state(), PlaybackState::Idle);
    assert_eq!(
        std::fs::read_to_string(&path).expect("read back"),
        "alpha beta gamma"
    );
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(start_paused = true)]
async fn skip_detaches_and_plays_the_next_unit() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let mut harness = Harness::with_text("one two three", &synth, one_word_units(3));

    harness.send(Command::Start);
    advance(50).await;
    harness.send(Command::Skip);
    settle().await;

    assert_eq!(harness.output.attached_index(), Some(1));
    assert_eq!(harness.current_index(), 1);
    assert!(harness.output.calls().contains(&OutputCall::Detach));
    assert_eq!(harness.started(), vec!["one", "two"]);
}

#[tokio::test(start_paused = true)]
async fn end_of_a_detached_unit_is_ignored() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let harness = Harness::with_text("one two three", &synth, one_word_units(3));

    harness.send(Command::Start);
    advance(50).await;
    let stale = harness
        .output
        .take_signal()
        .expect("first unit should be attached");
    // Put a fresh attachment in place by skipping.
    harness.send(Command::Skip);
    settle().await;
    assert_eq!(harness.current_index(), 1);

    stale.finished();
    settle().await;
    assert_eq!(harness.current_index(), 1);
    assert_eq!(harness.output.attached_index(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn unit_ending_while_paused_advances_on_resume() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let harness = Harness::with_text("one two", &synth, one_word_units(2));

    harness.send(Command::Start);
    advance(50).await;
    harness.send(Command::Pause);
    settle().await;
    assert!(harness.output.finish_current());
    settle().await;
    assert_eq!(harness.state(), PlaybackState::Paused);
    assert_eq!(harness.current_index(), 0);

    harness.send(Command::Resume);
    settle().await;
    assert_eq!(harness.state(), PlaybackState::Playing);
    assert_eq!(harness.current_index(), 1);
    assert_eq!(harness.output.attached_index(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn empty_page_notifies_and_stays_idle() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let mut harness = Harness::with_text("   \n  ", &synth, one_word_units(3));

    harness.send(Command::Start);
    settle().await;

    assert_eq!(harness.state(), PlaybackState::Idle);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    assert!(
        harness
            .events()
            .iter()
            .any(|event| matches!(event, PresentationEvent::Notify { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn rate_and_volume_are_clamped_before_reaching_the_output() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let settings = PlaybackSettings {
        playback_rate: 1.5,
        volume: 0.8,
        ..PlaybackSettings::default()
    };
    let harness = Harness::with_text("hello", &synth, settings);

    harness.send(Command::SetRate(10.0));
    harness.send(Command::SetVolume(-1.0));
    settle().await;

    assert_eq!(
        harness.output.calls(),
        vec![
            OutputCall::SetRate(1.5),
            OutputCall::SetVolume(0.8),
            OutputCall::SetRate(MAX_PLAYBACK_RATE),
            OutputCall::SetVolume(0.0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_the_run_loop() {
    let synth = Arc::new(FakeSynth::new(Duration::from_millis(10)));
    let mut harness = Harness::with_text("one two", &synth, one_word_units(2));

    harness.send(Command::Start);
    advance(50).await;
    harness.send(Command::Shutdown);
    settle().await;

    assert!(harness.handle.send(Command::Start).is_err());
    let states = harness.states();
    assert_eq!(states.last(), Some(&PlaybackState::Idle));
}

#[tokio::test]
async fn results_from_a_reset_generation_never_reach_the_queue() {
    let synth = Arc::new(FakeSynth::new(Duration::from_secs(60)));
    let (presenter, _events) = ChannelPresenter::new();
    let (mut controller, _handle) = PlaybackController::new(
        one_word_units(3),
        piper(),
        synth,
        Box::new(RecordingOutput::new()),
        Box::new(presenter),
        Box::new(PagedDocument::new("a b c", 4000)),
    );

    controller.dispatch(ControllerEvent::Command(Command::Start));
    let abandoned = controller.session.generation();
    controller.dispatch(ControllerEvent::Command(Command::Stop));
    controller.dispatch(ControllerEvent::Command(Command::Stop));

    controller.dispatch(ControllerEvent::PrefetchResolved {
        generation: abandoned,
        index: 0,
        outcome: Ok(SynthesisResult {
            unit_id: "chunk-0".into(),
            audio: FakeSynth::audio_for("chunk-0"),
        }),
    });

    assert!(controller.session.queue.is_empty());
    assert_eq!(controller.state(), PlaybackState::Idle);
    assert_ne!(controller.session.generation(), abandoned);
    assert_eq!(controller.snapshot().unit_count, 0);
}
