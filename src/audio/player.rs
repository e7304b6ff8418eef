use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::engine::{BackendEvent, PlayableSource, PlaybackBackend, PlaybackError};

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, PlaybackHandle, PlaybackInfo};

/// rodio-backed playback on a dedicated audio thread.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    events: Receiver<BackendEvent>,
    playback: PlaybackHandle,
    /// Epoch of the last cursor-moving command sent.
    epoch: u64,
    generation: u64,
    /// Failures detected on this side of the channel.
    local: Vec<BackendEvent>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (events_tx, events) = mpsc::channel::<BackendEvent>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let audio_handle = spawn_audio_thread(rx, events_tx, playback_info.clone());

        Self {
            tx,
            events,
            playback: playback_info,
            epoch: 0,
            generation: 0,
            local: Vec::new(),
            join: Mutex::new(Some(audio_handle)),
        }
    }

    fn send(&mut self, cmd: AudioCmd) {
        if self.tx.send(cmd).is_err() {
            log::error!("audio: thread is gone");
            self.local.push(BackendEvent::PlayFailed {
                generation: self.generation,
                error: PlaybackError::Disconnected,
            });
        }
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.tx.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl PlaybackBackend for AudioPlayer {
    fn load(&mut self, generation: u64, source: &PlayableSource, volume: f32) {
        self.generation = generation;
        let epoch = self.next_epoch();
        self.send(AudioCmd::Load {
            epoch,
            generation,
            path: source.path.clone(),
            volume,
        });
    }

    fn play(&mut self) {
        self.send(AudioCmd::Play);
    }

    fn pause(&mut self) {
        self.send(AudioCmd::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        let epoch = self.next_epoch();
        self.send(AudioCmd::Seek {
            epoch,
            position: Duration::from_secs_f64(seconds.max(0.0)),
        });
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCmd::SetVolume(volume));
    }

    fn release(&mut self) {
        let epoch = self.next_epoch();
        self.send(AudioCmd::Release { epoch });
    }

    fn position(&self) -> Option<f64> {
        self.playback
            .lock()
            .ok()
            .and_then(|info| info.position_for(self.epoch))
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        let mut events = std::mem::take(&mut self.local);
        events.extend(self.events.try_iter());
        events
    }
}
