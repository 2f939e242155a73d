use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender as CrossbeamSender;

use keyglow_types::{ArpeggiatorConfig, PitchIndex, PlayerConfig, TheorySettings, Voice};

use super::commands::{FrameState, PlayerCmd, PlayerFeedback};
use super::player_thread::PlayerThread;
use crate::melody::MelodyStore;
use crate::session::Session;
use crate::sound::SoundTrigger;

/// Caller-side handle to the player thread.
pub struct PlayerHandle {
    cmd_tx: CrossbeamSender<PlayerCmd>,
    feedback_rx: Receiver<PlayerFeedback>,
    last_frame: Option<FrameState>,
    join_handle: Option<JoinHandle<()>>,
}

impl PlayerHandle {
    /// Move `session` and `sound` onto a new player thread.
    pub fn spawn(
        session: Session,
        sound: Box<dyn SoundTrigger + Send>,
        frame_interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();

        let join_handle = thread::spawn(move || {
            PlayerThread::new(session, sound, cmd_rx, feedback_tx, frame_interval).run();
        });

        Self {
            cmd_tx,
            feedback_rx,
            last_frame: None,
            join_handle: Some(join_handle),
        }
    }

    pub fn send_cmd(&self, cmd: PlayerCmd) -> Result<(), String> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| "Player thread disconnected".to_string())
    }

    /// Fire-and-forget: send a command and log if the player thread is gone.
    fn send(&self, cmd: PlayerCmd) {
        if let Err(e) = self.send_cmd(cmd) {
            log::warn!(target: "player", "command dropped: {}", e);
        }
    }

    pub fn press(&self, pitch: PitchIndex) {
        self.send(PlayerCmd::Press(pitch));
    }

    pub fn release(&self, pitch: PitchIndex) {
        self.send(PlayerCmd::Release(pitch));
    }

    pub fn note_on(&self, midi: u8, velocity: u8) {
        self.send(PlayerCmd::NoteOn { midi, velocity });
    }

    pub fn note_off(&self, midi: u8) {
        self.send(PlayerCmd::NoteOff { midi });
    }

    pub fn load_melody(&self, melody: MelodyStore) {
        self.send(PlayerCmd::LoadMelody(melody));
    }

    pub fn play(&self) {
        self.send(PlayerCmd::Play);
    }

    pub fn pause(&self) {
        self.send(PlayerCmd::Pause);
    }

    pub fn stop(&self) {
        self.send(PlayerCmd::Stop);
    }

    pub fn seek(&self, t: f64) {
        self.send(PlayerCmd::Seek(t));
    }

    pub fn set_tempo(&self, multiplier: f64) {
        self.send(PlayerCmd::SetTempo(multiplier));
    }

    pub fn set_transpose(&self, semitones: i32) {
        self.send(PlayerCmd::SetTranspose(semitones));
    }

    pub fn set_arp_config(&self, config: ArpeggiatorConfig) {
        self.send(PlayerCmd::SetArpConfig(config));
    }

    pub fn preview_arpeggio(&self, pitches: Vec<PitchIndex>, duration: Duration) {
        self.send(PlayerCmd::PreviewArpeggio { pitches, duration });
    }

    pub fn set_voice(&self, voice: Voice) {
        self.send(PlayerCmd::SetVoice(voice));
    }

    pub fn set_theory(&self, theory: TheorySettings) {
        self.send(PlayerCmd::SetTheory(theory));
    }

    pub fn apply_config(&self, config: PlayerConfig) {
        self.send(PlayerCmd::ApplyConfig(config));
    }

    /// Ask the player thread for its current settings record.
    pub fn config(&self, timeout: Duration) -> Result<PlayerConfig, String> {
        let (reply, rx) = mpsc::channel();
        self.send_cmd(PlayerCmd::GetConfig { reply })?;
        rx.recv_timeout(timeout)
            .map_err(|e| format!("No config reply from player thread: {}", e))
    }

    pub fn drain_feedback(&mut self) -> Vec<PlayerFeedback> {
        let mut out = Vec::new();
        while let Ok(msg) = self.feedback_rx.try_recv() {
            if let PlayerFeedback::Frame(frame) = &msg {
                self.last_frame = Some(frame.clone());
            }
            out.push(msg);
        }
        out
    }

    /// Most recent frame seen by [`drain_feedback`](Self::drain_feedback).
    pub fn last_frame(&self) -> Option<&FrameState> {
        self.last_frame.as_ref()
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        let _ = self.send_cmd(PlayerCmd::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::RecordingTrigger;
    use keyglow_types::{ArpPattern, Instrument, Key, PitchRange, Scale};
    use std::time::Instant;

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn plays_a_melody_to_the_end() {
        let recorder = RecordingTrigger::new();
        let session = Session::new(PitchRange::default());
        let mut player = PlayerHandle::spawn(session, Box::new(recorder.clone()), Duration::from_millis(2));

        let melody = MelodyStore::sequential(&[(0, 0.02), (4, 0.02), (7, 0.02)]).unwrap();
        player.load_melody(melody);
        player.set_tempo(2.0);
        player.play();

        assert!(wait_for(|| recorder.pitches().len() == 3));
        assert_eq!(recorder.pitches(), vec![0, 4, 7]);
        assert!(wait_for(|| player
            .drain_feedback()
            .contains(&PlayerFeedback::PlaybackFinished)));
    }

    #[test]
    fn config_requests_are_answered() {
        let session = Session::new(PitchRange::default());
        let player = PlayerHandle::spawn(session, Box::new(RecordingTrigger::new()), Duration::from_millis(5));
        let arp = ArpeggiatorConfig {
            enabled: true,
            step_period_ms: 50,
            pattern: ArpPattern::Random,
            octave_span: 2,
        };
        player.set_arp_config(arp);
        player.set_transpose(5);
        let config = player.config(Duration::from_secs(1)).unwrap();
        assert_eq!(config.arpeggiator, arp);
        assert_eq!(config.transpose, 5);
    }

    #[test]
    fn voice_and_theory_reach_the_session() {
        let recorder = RecordingTrigger::new();
        let session = Session::new(PitchRange::default());
        let player = PlayerHandle::spawn(session, Box::new(recorder.clone()), Duration::from_millis(5));
        let voice = Voice {
            instrument: Instrument::Organ,
            vibrato: true,
            vibrato_depth: 0.8,
        };
        let theory = TheorySettings {
            root: Key::G,
            scale: Scale::Blues,
            show_root: false,
            show_scale: true,
        };
        player.set_voice(voice);
        player.set_theory(theory);
        player.press(0);

        let config = player.config(Duration::from_secs(1)).unwrap();
        assert_eq!(config.voice, voice);
        assert_eq!(config.theory, theory);
        // Commands are handled in order, so the press already sounded with the new voice.
        assert_eq!(recorder.records().last().map(|r| r.voice), Some(voice));
    }

    #[test]
    fn frames_report_direct_presses() {
        let session = Session::new(PitchRange::default());
        let mut player = PlayerHandle::spawn(session, Box::new(RecordingTrigger::new()), Duration::from_millis(2));
        player.press(3);
        assert!(wait_for(|| {
            player.drain_feedback();
            player
                .last_frame()
                .is_some_and(|f| f.highlights.get(3).is_some_and(|h| h.is_active()))
        }));
    }
}
