use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use super::commands::{FrameState, PlayerCmd, PlayerFeedback};
use crate::session::Session;
use crate::sound::SoundTrigger;

pub(super) struct PlayerThread {
    session: Session,
    sound: Box<dyn SoundTrigger + Send>,
    cmd_rx: Receiver<PlayerCmd>,
    feedback_tx: Sender<PlayerFeedback>,
    frame_interval: Duration,
    last_frame: Instant,
    last_sent: Option<FrameState>,
}

impl PlayerThread {
    pub(super) fn new(
        session: Session,
        sound: Box<dyn SoundTrigger + Send>,
        cmd_rx: Receiver<PlayerCmd>,
        feedback_tx: Sender<PlayerFeedback>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            session,
            sound,
            cmd_rx,
            feedback_tx,
            frame_interval,
            last_frame: Instant::now(),
            last_sent: None,
        }
    }

    pub(super) fn run(mut self) {
        log::debug!(target: "player", "player thread running, frame {:?}", self.frame_interval);
        loop {
            // Sleep until the next frame or arpeggiator step, whichever is first.
            let mut deadline = self.last_frame + self.frame_interval;
            if let Some(wake) = self.session.next_wake() {
                deadline = deadline.min(wake);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());

            crossbeam_channel::select! {
                recv(self.cmd_rx) -> result => {
                    match result {
                        Ok(cmd) => {
                            if self.handle_cmd(cmd) {
                                break;
                            }
                        }
                        Err(_) => break, // Disconnected
                    }
                }
                default(remaining) => {}
            }

            if self.drain_commands() {
                break;
            }

            let now = Instant::now();
            let was_playing = self.session.transport().is_playing();
            self.session.tick(now, self.sound.as_mut());
            if was_playing && !self.session.transport().is_playing() {
                let _ = self.feedback_tx.send(PlayerFeedback::PlaybackFinished);
            }

            if now.duration_since(self.last_frame) >= self.frame_interval {
                self.last_frame = now;
                self.publish_frame();
            }
        }
        log::debug!(target: "player", "player thread exiting");
    }

    /// Returns true when the thread should exit.
    fn drain_commands(&mut self) -> bool {
        const MAX_COUNT: usize = 64;

        for _ in 0..MAX_COUNT {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    fn handle_cmd(&mut self, cmd: PlayerCmd) -> bool {
        let now = Instant::now();
        let sound = self.sound.as_mut();
        match cmd {
            PlayerCmd::Press(pitch) => {
                self.session.press(pitch, sound);
            }
            PlayerCmd::Release(pitch) => {
                self.session.release(pitch);
            }
            PlayerCmd::NoteOn { midi, velocity } => {
                self.session.note_on(midi, velocity, sound);
            }
            PlayerCmd::NoteOff { midi } => {
                self.session.note_off(midi);
            }
            PlayerCmd::LoadMelody(melody) => self.session.load_melody(melody),
            PlayerCmd::Play => {
                self.session.play(now);
            }
            PlayerCmd::Pause => self.session.pause(),
            PlayerCmd::Stop => self.session.stop(),
            PlayerCmd::Seek(t) => self.session.seek(t),
            PlayerCmd::SetTempo(multiplier) => self.session.set_tempo(multiplier),
            PlayerCmd::SetTranspose(semitones) => self.session.set_transpose(semitones),
            PlayerCmd::SetArpConfig(config) => self.session.set_arp_config(config, now),
            PlayerCmd::PreviewArpeggio { pitches, duration } => {
                self.session.preview_arpeggio(&pitches, duration, now)
            }
            PlayerCmd::SetVoice(voice) => self.session.set_voice(voice),
            PlayerCmd::SetTheory(theory) => self.session.set_theory(theory),
            PlayerCmd::ApplyConfig(config) => self.session.apply_config(config, now),
            PlayerCmd::GetConfig { reply } => {
                let _ = reply.send(self.session.config());
            }
            PlayerCmd::Shutdown => return true,
        }
        false
    }

    fn publish_frame(&mut self) {
        let transport = self.session.transport();
        let frame = FrameState {
            position: transport.position(),
            duration: transport.duration(),
            playing: transport.is_playing(),
            arp_running: self.session.arpeggiator().is_running(),
            highlights: self.session.highlights(),
        };
        if self.last_sent.as_ref() == Some(&frame) {
            return;
        }
        if self.feedback_tx.send(PlayerFeedback::Frame(frame.clone())).is_ok() {
            self.last_sent = Some(frame);
        }
    }
}
