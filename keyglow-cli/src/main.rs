mod console;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use keyglow_core::config::Config;
use keyglow_core::melody::MelodyStore;
use keyglow_core::midi::{MidiEventKind, MidiInputManager};
use keyglow_core::player::{PlayerFeedback, PlayerHandle};
use keyglow_core::session::Session;
use keyglow_types::{ArpPattern, ArpeggiatorConfig, PitchIndex};

use console::{render_keys, ConsoleTrigger};

const USAGE: &str = "\
usage: keyglow [-v] <command> [options]

commands:
  play <melody.json> [--tempo X] [--transpose N] [--from SECS]
  arp <C4,E4,G4> [--pattern up|down|up-down|random] [--octaves N] [--period MS] [--seconds S]
  midi [--port N] [--arp PATTERN]";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyglow")
        .join("keyglow.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/keyglow.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("logging disabled: {}", e);
            return;
        }
    };

    if WriteLogger::init(log_level, simplelog::Config::default(), log_file).is_err() {
        eprintln!("logging disabled: logger already set");
        return;
    }

    log::info!("keyglow starting (log level: {:?})", log_level);
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>, String> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid value for {}: {}", flag, raw)),
        None => Ok(None),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let args: Vec<String> = args
        .into_iter()
        .filter(|a| a != "--verbose" && a != "-v")
        .collect();

    let result = match args.first().map(String::as_str) {
        Some("play") => run_play(&args[1..]),
        Some("arp") => run_arp(&args[1..]),
        Some("midi") => run_midi(&args[1..]),
        _ => Err(USAGE.to_string()),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn spawn_player(config: &Config) -> PlayerHandle {
    let session = Session::from_config(config, Instant::now());
    let sound = ConsoleTrigger::new(config.pitch_range());
    PlayerHandle::spawn(session, Box::new(sound), config.frame_interval())
}

/// Prints a keyboard row whenever the visible state changes.
#[derive(Default)]
struct FramePrinter {
    last_row: String,
}

impl FramePrinter {
    /// Print changed rows and hand the drained feedback back to the caller.
    fn pump(&mut self, player: &mut PlayerHandle) -> Vec<PlayerFeedback> {
        let feedback = player.drain_feedback();
        for msg in &feedback {
            if let PlayerFeedback::Frame(frame) = msg {
                let row = render_keys(&frame.highlights);
                if row != self.last_row {
                    println!("{:>7.2}s {}", frame.position, row);
                    self.last_row = row;
                }
            }
        }
        feedback
    }
}

fn run_play(args: &[String]) -> Result<(), String> {
    let path = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| USAGE.to_string())?;
    let config = Config::load();
    let melody = MelodyStore::load_file(Path::new(path), config.pitch_range())
        .map_err(|e| format!("{}: {}", path, e))?;
    println!(
        "{}: {} notes, {:.2}s",
        path,
        melody.len(),
        melody.total_duration()
    );

    let mut player = spawn_player(&config);
    player.load_melody(melody);
    if let Some(tempo) = parse_flag::<f64>(args, "--tempo")? {
        player.set_tempo(tempo);
    }
    if let Some(semitones) = parse_flag::<i32>(args, "--transpose")? {
        player.set_transpose(semitones);
    }
    if let Some(from) = parse_flag::<f64>(args, "--from")? {
        player.seek(from);
    }
    player.play();

    let mut printer = FramePrinter::default();
    while !printer
        .pump(&mut player)
        .contains(&PlayerFeedback::PlaybackFinished)
    {
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

fn run_arp(args: &[String]) -> Result<(), String> {
    let config = Config::load();
    let range = config.pitch_range();
    let names = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| USAGE.to_string())?;
    let pitches: Vec<PitchIndex> = names
        .split(',')
        .map(|name| {
            range
                .pitch_for_name(name)
                .ok_or_else(|| format!("unknown note name: {}", name))
        })
        .collect::<Result<_, _>>()?;

    let defaults = config.player_defaults().arpeggiator;
    let pattern = match flag_value(args, "--pattern") {
        Some(name) => ArpPattern::from_name(name).ok_or_else(|| format!("unknown pattern: {}", name))?,
        None => defaults.pattern,
    };
    let arp = ArpeggiatorConfig {
        enabled: false,
        step_period_ms: parse_flag(args, "--period")?.unwrap_or(defaults.step_period_ms),
        pattern,
        octave_span: parse_flag(args, "--octaves")?.unwrap_or(defaults.octave_span),
    };
    let seconds: f64 = parse_flag(args, "--seconds")?.unwrap_or(3.0);
    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("invalid value for --seconds: {}", seconds))?;

    let mut player = spawn_player(&config);
    player.set_arp_config(arp);
    player.preview_arpeggio(pitches, duration);

    let ends_at = Instant::now() + duration;
    let mut printer = FramePrinter::default();
    while Instant::now() < ends_at {
        printer.pump(&mut player);
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

fn run_midi(args: &[String]) -> Result<(), String> {
    let mut midi = MidiInputManager::new();
    midi.refresh_ports();

    let Some(port) = parse_flag::<usize>(args, "--port")? else {
        if midi.list_ports().is_empty() {
            println!("no MIDI input ports found");
        }
        for port in midi.list_ports() {
            println!("{:>3}  {}", port.index, port.name);
        }
        return Ok(());
    };
    midi.connect(port)?;
    println!(
        "listening on {} (Ctrl-C to quit)",
        midi.connected_port_name().unwrap_or("?")
    );

    let config = Config::load();
    let mut player = spawn_player(&config);
    if let Some(name) = flag_value(args, "--arp") {
        let pattern = ArpPattern::from_name(name).ok_or_else(|| format!("unknown pattern: {}", name))?;
        player.set_arp_config(ArpeggiatorConfig {
            enabled: true,
            pattern,
            ..config.player_defaults().arpeggiator
        });
    }

    let mut printer = FramePrinter::default();
    loop {
        for event in midi.poll_events() {
            match event.kind {
                MidiEventKind::NoteOn { note, velocity, .. } => player.note_on(note, velocity),
                MidiEventKind::NoteOff { note, .. } => player.note_off(note),
            }
        }
        printer.pump(&mut player);
        thread::sleep(Duration::from_millis(1));
    }
}
