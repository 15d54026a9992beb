//! cadenza: run a live-coding music program.
//!
//! Plays the loops a program defines until interrupted. With `--watch` the
//! file is re-evaluated whenever it changes on disk; loops keep playing when
//! the new version fails.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use clap::{ArgAction, Parser};
use tracing::{error, info, warn, Level};

use cadenza::config::EngineConfig;
use cadenza::event::{is_valid_bpm, SystemClock};
use cadenza::instrument::{Instrument, InstrumentRegistry, LogInstrument};
use cadenza::log::TracingLogger;
use cadenza::midi::{MidiBackend, MidirBackend};
use cadenza::Interpreter;

#[derive(Parser)]
#[command(name = "cadenza", version)]
#[command(about = "A live-coding music language", long_about = None)]
struct Cli {
    /// Program to run
    file: Option<PathBuf>,

    /// Initial tempo in beats per minute
    #[arg(long, value_parser = parse_bpm)]
    bpm: Option<f64>,

    /// MIDI output for the default instrument (id or part of its name)
    #[arg(long)]
    midi_device: Option<String>,

    /// MIDI channel for the default instrument (0-15)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=15))]
    channel: Option<u8>,

    /// List MIDI outputs and exit
    #[arg(long)]
    list_midi: bool,

    /// Re-evaluate the file when it changes
    #[arg(short, long)]
    watch: bool,

    /// Seed for rand()
    #[arg(long)]
    seed: Option<u64>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = EngineConfig::load().unwrap_or_default();
    if let Some(bpm) = cli.bpm {
        config.tempo = bpm;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(device) = cli.midi_device.clone() {
        config.midi.device_name = Some(device);
    }
    if let Some(channel) = cli.channel {
        config.midi.channel = channel;
    }

    let clock = SystemClock::new();
    let midi = MidirBackend::new(clock);

    if cli.list_midi {
        match midi.outputs() {
            Ok(outputs) if outputs.is_empty() => println!("no MIDI outputs available"),
            Ok(outputs) => {
                for output in outputs {
                    println!("{}: {}", output.id, output.name);
                }
            }
            Err(e) => {
                eprintln!("cannot list MIDI outputs: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let Some(path) = cli.file else {
        eprintln!("no program given (try --help)");
        std::process::exit(2);
    };
    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    let instruments = Rc::new(InstrumentRegistry::new());
    let default: Rc<dyn Instrument> = match &config.midi.device_name {
        Some(device) => match midi.connect(device, config.midi.channel) {
            Ok(instrument) => instrument,
            Err(e) => {
                eprintln!("failed to open MIDI output: {e}");
                std::process::exit(1);
            }
        },
        None => Rc::new(LogInstrument::new(config.default_instrument.as_str())),
    };
    instruments.register(config.default_instrument.as_str(), default);

    let mut interpreter = Interpreter::new(
        Rc::new(clock),
        instruments,
        Rc::new(TracingLogger),
        Some(Rc::new(midi)),
        &config,
    );

    if interpreter.execute(&source).is_err() && !cli.watch {
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("cannot install Ctrl-C handler: {e}");
        }
    }

    info!(
        "playing {} at {} BPM (Ctrl-C to stop)",
        path.display(),
        config.tempo
    );

    if cli.watch {
        watch(&mut interpreter, &path, &config, &running);
    } else {
        interpreter.scheduler_mut().run(&running);
    }

    interpreter.scheduler_mut().stop();
    info!("stopped");
}

fn parse_bpm(s: &str) -> Result<f64, String> {
    let bpm: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if is_valid_bpm(bpm) {
        Ok(bpm)
    } else {
        Err(format!("tempo must be a positive number, got {bpm}"))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Tick the scheduler, re-running the program whenever its file changes.
fn watch(interpreter: &mut Interpreter, path: &Path, config: &EngineConfig, running: &AtomicBool) {
    let mut last_modified = modified(path);
    while running.load(Ordering::SeqCst) {
        interpreter.tick();

        let current = modified(path);
        if current.is_some() && current != last_modified {
            last_modified = current;
            match std::fs::read_to_string(path) {
                Ok(source) => {
                    info!("reloading {}", path.display());
                    // Failures are already logged; the previous loops keep playing.
                    let _ = interpreter.execute(&source);
                }
                Err(e) => error!("cannot read {}: {e}", path.display()),
            }
        }

        thread::sleep(config.scheduler_interval());
    }
}
