use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::engine::{BackendEvent, PlaybackError};

use super::sink::{OpenedSink, clamp_start, create_sink_at};
use super::types::{AudioCmd, PlaybackHandle};

/// How often the thread republishes the device position when idle.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Everything the thread knows about the current file.
struct Current {
    generation: u64,
    path: PathBuf,
    sink: Sink,
    duration: Option<Duration>,
    /// Offset the sink was built at; `get_pos` counts from here.
    seek_base: Duration,
    paused: bool,
    finished: bool,
}

impl Current {
    fn position(&self) -> Duration {
        clamp_start(self.seek_base + self.sink.get_pos(), self.duration)
    }
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    events: Sender<BackendEvent>,
    playback_info: PlaybackHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when OutputStream is dropped. That's useful in
                // debugging, but noisy for a TUI app.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                log::error!("audio: no output device: {e}");
                None
            }
        };

        let mut current: Option<Current> = None;
        let mut volume = 1.0f32;
        let mut epoch = 0u64;

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(cmd) => match cmd {
                    AudioCmd::Load {
                        epoch: e,
                        generation,
                        path,
                        volume: v,
                    } => {
                        epoch = e;
                        volume = v;
                        if let Some(old) = current.take() {
                            old.sink.stop();
                        }
                        match open(stream.as_ref(), &path, Duration::ZERO, volume) {
                            Ok(opened) => {
                                log::debug!("audio: loaded {}", path.display());
                                let duration = opened.duration;
                                current = Some(Current {
                                    generation,
                                    path,
                                    sink: opened.sink,
                                    duration,
                                    seek_base: Duration::ZERO,
                                    paused: true,
                                    finished: false,
                                });
                                let _ = events.send(BackendEvent::Loaded {
                                    generation,
                                    duration: duration.map(|d| d.as_secs_f64()),
                                });
                            }
                            Err(error) => {
                                let _ = events.send(BackendEvent::LoadFailed { generation, error });
                            }
                        }
                    }

                    AudioCmd::Play => {
                        if let Some(c) = current.as_mut() {
                            c.sink.play();
                            c.paused = false;
                        }
                    }

                    AudioCmd::Pause => {
                        if let Some(c) = current.as_mut() {
                            c.sink.pause();
                            c.paused = true;
                        }
                    }

                    AudioCmd::Seek { epoch: e, position } => {
                        epoch = e;
                        let Some(c) = current.as_mut() else {
                            continue;
                        };

                        // Scrubbing: rebuild the current sink and skip into the file.
                        c.sink.stop();
                        match open(stream.as_ref(), &c.path, position, volume) {
                            Ok(opened) => {
                                if !c.paused {
                                    opened.sink.play();
                                }
                                c.sink = opened.sink;
                                c.seek_base = clamp_start(position, c.duration);
                                c.finished = false;
                            }
                            Err(error) => {
                                let generation = c.generation;
                                current = None;
                                let _ = events.send(BackendEvent::PlayFailed { generation, error });
                            }
                        }
                    }

                    AudioCmd::SetVolume(v) => {
                        volume = v;
                        if let Some(c) = current.as_ref() {
                            c.sink.set_volume(v);
                        }
                    }

                    AudioCmd::Release { epoch: e } => {
                        epoch = e;
                        if let Some(old) = current.take() {
                            old.sink.stop();
                        }
                    }

                    AudioCmd::Quit { fade_out_ms } => {
                        if let Some(c) = current.as_ref() {
                            // Fade out gently before stopping.
                            fade_out_sink(&c.sink, volume, fade_out_ms);
                            c.sink.stop();
                        }
                        publish(&playback_info, epoch, None);
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(c) = current.as_mut() {
                        if !c.paused && !c.finished && c.sink.empty() {
                            c.finished = true;
                            let _ = events.send(BackendEvent::Finished {
                                generation: c.generation,
                            });
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }

            publish(&playback_info, epoch, current.as_ref());
        }
    })
}

fn open(
    stream: Option<&OutputStream>,
    path: &std::path::Path,
    start_at: Duration,
    volume: f32,
) -> Result<OpenedSink, PlaybackError> {
    let stream =
        stream.ok_or_else(|| PlaybackError::NoDevice("default output unavailable".into()))?;
    create_sink_at(stream, path, start_at, volume)
}

fn publish(playback_info: &PlaybackHandle, epoch: u64, current: Option<&Current>) {
    if let Ok(mut info) = playback_info.lock() {
        info.epoch = epoch;
        info.loaded = current.is_some();
        info.playing = current.is_some_and(|c| !c.paused && !c.finished);
        info.position = current.map_or(Duration::ZERO, Current::position);
    }
}

fn fade_out_sink(sink: &Sink, from: f32, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(from * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
