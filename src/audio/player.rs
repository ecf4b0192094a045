use std::io::Cursor;
use std::time::{Duration, Instant};

use crate::error::AppError;

/// The single audio resource the playback orchestrator drives.
pub trait AudioOutput {
    /// Releases whatever is playing, then starts `bytes`.
    fn start(&mut self, bytes: Vec<u8>) -> Result<(), AppError>;
    fn stop(&mut self);
    /// False once playback ended naturally or was stopped.
    fn is_active(&self) -> bool;
}

pub struct AudioPlayer {
    _stream: rodio::OutputStream,
    handle: rodio::OutputStreamHandle,
    current: Option<PlaybackHandle>,
}

pub struct PlaybackHandle {
    sink: rodio::Sink,
    started: Instant,
    duration: Option<Duration>,
}

impl AudioPlayer {
    pub fn new() -> Result<Self, AppError> {
        let (stream, handle) = rodio::OutputStream::try_default()
            .map_err(|err| AppError::Audio(format!("Output device error: {err}")))?;
        Ok(Self {
            _stream: stream,
            handle,
            current: None,
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.current
            .as_ref()
            .map(|handle| handle.started.elapsed())
            .unwrap_or_default()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.current.as_ref().and_then(|handle| handle.duration)
    }
}

impl AudioOutput for AudioPlayer {
    fn start(&mut self, bytes: Vec<u8>) -> Result<(), AppError> {
        self.stop();
        let decoder = rodio::Decoder::new(Cursor::new(bytes))
            .map_err(|err| AppError::Playback(format!("Decode error: {err}")))?;
        let duration = rodio::Source::total_duration(&decoder);
        let sink = rodio::Sink::try_new(&self.handle)
            .map_err(|err| AppError::Audio(format!("Audio sink error: {err}")))?;
        sink.append(decoder);
        sink.play();
        self.current = Some(PlaybackHandle {
            sink,
            started: Instant::now(),
            duration,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(playback) = self.current.take() {
            playback.sink.stop();
        }
    }

    fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .map(|handle| !handle.sink.empty())
            .unwrap_or(false)
    }
}
