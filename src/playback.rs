//! Single-clip and play-all playback.
//!
//! The orchestrator is advanced from the UI frame loop: `poll` collects the
//! result of the clip fetch running on a worker thread, starts the audio, and
//! notices when the audio resource has drained. A play-all session never
//! starts clip N+1 before clip N ended or failed.

use std::sync::Arc;

use crate::audio::AudioOutput;
use crate::catalog::ClipFetcher;
use crate::error::AppError;
use crate::model::{ClipRef, MediaKind};
use crate::task::BackgroundTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Single,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    Stopped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The clip became the highlighted item; the view scrolls it into sight.
    ClipStarted { index: usize, clip: ClipRef },
    ClipFinished { index: usize, clip: ClipRef },
    /// Emitted exactly once per session, whatever the exit path.
    SessionEnded { mode: PlayMode, reason: EndReason },
}

enum Stage {
    Loading(BackgroundTask<Vec<u8>>),
    Playing,
}

struct Session {
    mode: PlayMode,
    clips: Vec<ClipRef>,
    index: usize,
    stage: Stage,
    fetcher: Arc<dyn ClipFetcher>,
}

impl Session {
    fn current(&self) -> &ClipRef {
        &self.clips[self.index]
    }
}

pub struct PlaybackOrchestrator<O: AudioOutput> {
    output: O,
    session: Option<Session>,
    events: Vec<PlaybackEvent>,
}

impl<O: AudioOutput> PlaybackOrchestrator<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            session: None,
            events: Vec::new(),
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// Drives the label of the play-all trigger.
    pub fn is_playing_all(&self) -> bool {
        self.mode() == Some(PlayMode::All)
    }

    pub fn mode(&self) -> Option<PlayMode> {
        self.session.as_ref().map(|s| s.mode)
    }

    /// The highlighted clip, if any.
    pub fn current_clip(&self) -> Option<&ClipRef> {
        self.session.as_ref().map(Session::current)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.index)
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.session.as_ref().map(|s| &s.stage),
            Some(Stage::Loading(_))
        )
    }

    /// Toggles a single clip. A running session is stopped first.
    pub fn play_single(&mut self, fetcher: Arc<dyn ClipFetcher>, clip: ClipRef) {
        // Pressing the highlighted clip only stops, in either mode.
        let same = self.current_clip() == Some(&clip);
        if self.session.is_some() {
            self.end_session(EndReason::Stopped);
            if same {
                return;
            }
        }
        log::debug!("Playing {}", clip.title);
        self.begin(Session {
            mode: PlayMode::Single,
            clips: vec![clip],
            index: 0,
            stage: Stage::Playing,
            fetcher,
        });
    }

    /// Toggles the play-all session over `clips`, in order.
    pub fn play_all(&mut self, fetcher: Arc<dyn ClipFetcher>, clips: Vec<ClipRef>) {
        if self.is_playing_all() {
            self.end_session(EndReason::Stopped);
            return;
        }
        if self.session.is_some() {
            self.end_session(EndReason::Stopped);
        }
        if clips.is_empty() {
            log::debug!("Nothing to play");
            return;
        }
        log::info!("Playing {} clips in sequence", clips.len());
        self.begin(Session {
            mode: PlayMode::All,
            clips,
            index: 0,
            stage: Stage::Playing,
            fetcher,
        });
    }

    /// Stops immediately; no further clip of the session is started.
    pub fn stop(&mut self) {
        self.end_session(EndReason::Stopped);
    }

    /// Advances the session and drains the pending events.
    pub fn poll(&mut self) -> Vec<PlaybackEvent> {
        let step = match self.session.as_mut() {
            None => Step::Nothing,
            Some(session) => match &mut session.stage {
                Stage::Loading(task) => match task.try_take() {
                    Some(Ok(bytes)) => Step::Loaded(bytes),
                    Some(Err(err)) => Step::Fail(err),
                    None => Step::Nothing,
                },
                Stage::Playing => {
                    if self.output.is_active() {
                        Step::Nothing
                    } else {
                        Step::Ended
                    }
                }
            },
        };

        match step {
            Step::Nothing => {}
            Step::Loaded(bytes) => match self.output.start(bytes) {
                Ok(()) => {
                    if let Some(session) = self.session.as_mut() {
                        session.stage = Stage::Playing;
                    }
                }
                Err(err) => self.fail(err),
            },
            Step::Fail(err) => self.fail(err),
            Step::Ended => self.advance(),
        }

        std::mem::take(&mut self.events)
    }

    fn begin(&mut self, session: Session) {
        self.session = Some(session);
        self.load_current();
    }

    fn load_current(&mut self) {
        // One audio resource at a time: release the previous clip first.
        self.output.stop();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let clip = session.current().clone();
        let fetcher = session.fetcher.clone();
        let fetch_clip = clip.clone();
        session.stage = Stage::Loading(BackgroundTask::spawn(move || {
            fetcher.fetch(&fetch_clip, MediaKind::Compressed)
        }));
        self.events.push(PlaybackEvent::ClipStarted {
            index: session.index,
            clip,
        });
    }

    fn advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.events.push(PlaybackEvent::ClipFinished {
            index: session.index,
            clip: session.current().clone(),
        });
        let has_next = session.mode == PlayMode::All && session.index + 1 < session.clips.len();
        if has_next {
            session.index += 1;
            self.load_current();
        } else {
            self.end_session(EndReason::Completed);
        }
    }

    fn fail(&mut self, err: AppError) {
        if let Some(clip) = self.current_clip() {
            log::error!("Playback of {} failed: {err}", clip.title);
        }
        self.end_session(EndReason::Failed(err.to_string()));
    }

    fn end_session(&mut self, reason: EndReason) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.output.stop();
        log::debug!("{:?} playback ended: {reason:?}", session.mode);
        self.events.push(PlaybackEvent::SessionEnded {
            mode: session.mode,
            reason,
        });
    }
}

enum Step {
    Nothing,
    Loaded(Vec<u8>),
    Fail(AppError),
    Ended,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct MockOutput {
        played: Vec<String>,
        active: bool,
        reject: HashSet<String>,
    }

    impl MockOutput {
        fn finish(&mut self) {
            self.active = false;
        }
    }

    impl AudioOutput for MockOutput {
        fn start(&mut self, bytes: Vec<u8>) -> Result<(), AppError> {
            self.stop();
            let name = String::from_utf8(bytes).unwrap();
            if self.reject.contains(&name) {
                return Err(AppError::Playback(format!("cannot decode {name}")));
            }
            self.played.push(name);
            self.active = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct EchoFetcher {
        missing: HashSet<String>,
    }

    impl ClipFetcher for EchoFetcher {
        fn fetch(&self, clip: &ClipRef, kind: MediaKind) -> Result<Vec<u8>, AppError> {
            assert_eq!(kind, MediaKind::Compressed);
            if self.missing.contains(&clip.file_name) {
                return Err(AppError::Network(format!("404 {}", clip.file_name)));
            }
            Ok(clip.file_name.clone().into_bytes())
        }
    }

    fn fetcher() -> Arc<dyn ClipFetcher> {
        Arc::new(EchoFetcher {
            missing: HashSet::new(),
        })
    }

    fn clips(names: &[&str]) -> Vec<ClipRef> {
        names
            .iter()
            .map(|n| ClipRef::new(*n, format!("Title {n}")))
            .collect()
    }

    /// Polls until the pending fetch resolved, collecting every event.
    fn settle(orch: &mut PlaybackOrchestrator<MockOutput>) -> Vec<PlaybackEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        loop {
            events.extend(orch.poll());
            if !orch.is_loading() || Instant::now() > deadline {
                return events;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ended(events: &[PlaybackEvent]) -> Vec<&EndReason> {
        events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::SessionEnded { reason, .. } => Some(reason),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_all_visits_clips_in_order_one_at_a_time() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher(), clips(&["a", "b", "c"]));
        assert!(orch.is_playing_all());

        let mut events = settle(&mut orch);
        for expected in 1..=3 {
            assert_eq!(orch.output().played.len(), expected);
            // Polling while the clip is still audible never starts the next one.
            for _ in 0..5 {
                events.extend(orch.poll());
            }
            assert_eq!(orch.output().played.len(), expected);
            orch.output.finish();
            events.extend(settle(&mut orch));
        }

        assert_eq!(orch.output().played, ["a", "b", "c"]);
        assert!(orch.is_idle());
        assert!(!orch.is_playing_all());
        assert_eq!(ended(&events), [&EndReason::Completed]);
        let started: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::ClipStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(started, [0, 1, 2]);
    }

    #[test]
    fn stopping_play_all_releases_audio_and_resets_trigger() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher(), clips(&["a", "b", "c"]));
        settle(&mut orch);
        orch.output.finish();
        settle(&mut orch);
        assert_eq!(orch.current_index(), Some(1));
        assert!(orch.output().is_active());

        orch.stop();
        let events = orch.poll();
        assert!(!orch.output().is_active());
        assert!(!orch.is_playing_all());
        assert_eq!(orch.current_clip(), None);
        assert_eq!(ended(&events), [&EndReason::Stopped]);

        // Nothing resumes afterwards.
        for _ in 0..5 {
            assert!(orch.poll().is_empty());
        }
        assert_eq!(orch.output().played, ["a", "b"]);
    }

    #[test]
    fn play_all_trigger_toggles_off() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher(), clips(&["a", "b"]));
        settle(&mut orch);
        orch.play_all(fetcher(), clips(&["a", "b"]));
        assert!(orch.is_idle());
        assert!(!orch.output().is_active());
        assert_eq!(ended(&orch.poll()), [&EndReason::Stopped]);
    }

    #[test]
    fn playback_error_ends_the_whole_session() {
        let mut output = MockOutput::default();
        output.reject.insert("b".to_string());
        let mut orch = PlaybackOrchestrator::new(output);
        orch.play_all(fetcher(), clips(&["a", "b", "c"]));
        let mut events = settle(&mut orch);
        orch.output.finish();
        events.extend(settle(&mut orch));

        assert!(orch.is_idle());
        assert_eq!(orch.output().played, ["a"]);
        let reasons = ended(&events);
        assert_eq!(reasons.len(), 1);
        assert!(matches!(reasons[0], EndReason::Failed(_)));
    }

    #[test]
    fn fetch_error_ends_the_whole_session() {
        let fetcher: Arc<dyn ClipFetcher> = Arc::new(EchoFetcher {
            missing: ["a".to_string()].into_iter().collect(),
        });
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher, clips(&["a", "b"]));
        let events = settle(&mut orch);
        assert!(orch.is_idle());
        assert!(orch.output().played.is_empty());
        assert_eq!(ended(&events).len(), 1);
    }

    #[test]
    fn single_clip_toggles_and_replaces() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        let list = clips(&["a", "b"]);

        orch.play_single(fetcher(), list[0].clone());
        settle(&mut orch);
        assert_eq!(orch.current_clip(), Some(&list[0]));
        assert_eq!(orch.mode(), Some(PlayMode::Single));

        orch.play_single(fetcher(), list[1].clone());
        settle(&mut orch);
        assert_eq!(orch.current_clip(), Some(&list[1]));
        assert_eq!(orch.output().played, ["a", "b"]);

        orch.play_single(fetcher(), list[1].clone());
        assert!(orch.is_idle());
        assert!(!orch.output().is_active());
    }

    #[test]
    fn single_clip_returns_to_idle_when_it_ends() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_single(fetcher(), ClipRef::new("a", "A"));
        settle(&mut orch);
        orch.output.finish();
        let events = orch.poll();
        assert!(orch.is_idle());
        assert_eq!(ended(&events), [&EndReason::Completed]);
    }

    #[test]
    fn single_clip_stops_a_running_play_all_first() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher(), clips(&["a", "b"]));
        settle(&mut orch);

        orch.play_single(fetcher(), ClipRef::new("z", "Z"));
        let events = settle(&mut orch);
        assert_eq!(orch.mode(), Some(PlayMode::Single));
        assert_eq!(orch.output().played, ["a", "z"]);
        assert!(events.contains(&PlaybackEvent::SessionEnded {
            mode: PlayMode::All,
            reason: EndReason::Stopped,
        }));
    }

    #[test]
    fn highlighted_clip_during_play_all_only_stops() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        let list = clips(&["a", "b"]);
        orch.play_all(fetcher(), list.clone());
        settle(&mut orch);
        assert_eq!(orch.current_clip(), Some(&list[0]));

        orch.play_single(fetcher(), list[0].clone());
        let events = settle(&mut orch);
        assert!(orch.is_idle());
        assert!(!orch.output().is_active());
        assert_eq!(orch.output().played, ["a"]);
        assert_eq!(
            events,
            [PlaybackEvent::SessionEnded {
                mode: PlayMode::All,
                reason: EndReason::Stopped,
            }]
        );
    }

    #[test]
    fn empty_play_all_stays_idle() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher(), Vec::new());
        assert!(orch.is_idle());
        assert!(orch.poll().is_empty());
    }

    #[test]
    fn stop_while_loading_discards_the_fetch() {
        let mut orch = PlaybackOrchestrator::new(MockOutput::default());
        orch.play_all(fetcher(), clips(&["a"]));
        orch.stop();
        std::thread::sleep(Duration::from_millis(20));
        let events = orch.poll();
        assert_eq!(ended(&events), [&EndReason::Stopped]);
        assert!(orch.output().played.is_empty());
    }
}
