//! overdub - A terminal virtual instrument with a four-track MIDI recorder.
//!
//! Play notes on the computer keyboard, switch instruments per track, and
//! record takes while the other tracks play back. The result is exported as
//! a Standard MIDI File.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --soundfont FluidR3_GM.sf2
//! cargo run -- --silent --output takes/   # no audio device
//! ```

use overdub::app::App;
use overdub::audio::{AudioEngine, MemorySynth, MemoryTransport, SynthSink, Transport};
use overdub::config::EngineConfig;
use overdub::midi::Instrument;
use overdub::ui;

use anyhow::{bail, Context, Result};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::fs::File;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Command-line options for the application.
#[derive(Debug, Default)]
struct CliOptions {
    /// JSON configuration file.
    config: Option<PathBuf>,
    /// Path to a SoundFont file.
    soundfont: Option<PathBuf>,
    /// Directory exports are written to.
    output: Option<PathBuf>,
    /// Run without an audio device.
    silent: bool,
    /// File to write logs to instead of stderr.
    log: Option<PathBuf>,
}

fn print_help(program: &str) {
    eprintln!("overdub - Terminal MIDI overdub recorder");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] [SOUNDFONT.sf2]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config PATH      Load engine settings from a JSON file");
    eprintln!("  -sf, --soundfont PATH  Load a specific SoundFont file (.sf2)");
    eprintln!("  -o, --output DIR       Directory MIDI exports are written to");
    eprintln!("      --silent           Run without audio output");
    eprintln!("      --log PATH         Write logs to a file (filter with RUST_LOG)");
    eprintln!("  -h, --help             Print this help message");
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--config <path>` or `-c <path>`: JSON engine configuration
    /// - `--soundfont <path>` or `-sf <path>`: SoundFont file, also accepted
    ///   as a positional `.sf2` argument
    /// - `--output <dir>` or `-o <dir>`: export directory
    /// - `--silent`: use in-memory devices instead of audio output
    /// - `--log <path>`: log to a file
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let program = args.first().map(String::as_str).unwrap_or("overdub");
        let mut options = Self::default();
        let mut i = 1;

        let value = |i: usize, flag: &str| -> Result<PathBuf> {
            match args.get(i) {
                Some(v) => Ok(PathBuf::from(v)),
                None => bail!("{} requires a path argument", flag),
            }
        };

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    options.config = Some(value(i, "--config")?);
                }
                "--soundfont" | "-sf" => {
                    i += 1;
                    options.soundfont = Some(value(i, "--soundfont")?);
                }
                "--output" | "-o" => {
                    i += 1;
                    options.output = Some(value(i, "--output")?);
                }
                "--log" => {
                    i += 1;
                    options.log = Some(value(i, "--log")?);
                }
                "--silent" => options.silent = true,
                "--help" | "-h" => {
                    print_help(program);
                    std::process::exit(0);
                }
                other => {
                    if other.ends_with(".sf2") {
                        options.soundfont = Some(PathBuf::from(other));
                    } else {
                        bail!("Unknown option: {} (use --help for usage)", other);
                    }
                }
            }
            i += 1;
        }

        Ok(options)
    }
}

/// Installs the tracing subscriber. Logs go to `log_path` when given,
/// otherwise to stderr.
fn init_logging(log_path: Option<&PathBuf>) -> Result<()> {
    match log_path {
        Some(path) => {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Builds the synthesizer and transport. Device failures abort startup.
fn open_devices(
    config: &EngineConfig,
    silent: bool,
) -> Result<(Box<dyn SynthSink>, Box<dyn Transport>, Vec<String>)> {
    if silent {
        tracing::info!("Running without audio output");
        return Ok((
            Box::new(MemorySynth::new()),
            Box::new(MemoryTransport::new()),
            Vec::new(),
        ));
    }

    let Some(soundfont) = config.soundfont.as_ref() else {
        bail!("No SoundFont given; pass --soundfont PATH or run with --silent");
    };
    let engine = AudioEngine::new(soundfont).context("Failed to initialize audio")?;
    let names = engine.instrument_names().to_vec();
    let synth = engine.synth_sink();
    Ok((Box::new(synth), Box::new(engine), names))
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;
    init_logging(cli.log.as_ref())?;

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(soundfont) = cli.soundfont {
        config.soundfont = Some(soundfont);
    }
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    config.validate().context("Invalid configuration")?;

    let ticks_per_second = config.division()?.ticks_per_second();
    let frame_duration = Duration::from_secs_f64(1.0 / ticks_per_second as f64);

    let (synth, transport, names) = open_devices(&config, cli.silent)?;
    let mut app = App::new(&config, synth, transport, names)
        .context("Failed to initialize application")?;

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    app.key_release_supported = enable_key_release_events(&mut terminal);
    tracing::info!(
        key_release = app.key_release_supported,
        tracks = config.track_count,
        "Recorder ready"
    );

    let result = run_app(&mut terminal, &mut app, frame_duration);

    restore_terminal(&mut terminal, app.key_release_supported)
        .context("Failed to restore terminal")?;

    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Asks the terminal to report key releases. Returns true if it will.
fn enable_key_release_events(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> bool {
    if !matches!(supports_keyboard_enhancement(), Ok(true)) {
        return false;
    }
    execute!(
        terminal.backend_mut(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

/// Restores the terminal to its original state.
fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    key_release_enabled: bool,
) -> Result<()> {
    if key_release_enabled {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("Failed to reset keyboard mode")?;
    }
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
///
/// Input is drained until the next frame is due, then the frame is
/// advanced. Frames missed while drawing are caught up so the recording
/// cursor keeps pace with the wall clock.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    frame_duration: Duration,
) -> Result<()> {
    let mut next_frame = Instant::now() + frame_duration;

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        loop {
            let timeout = next_frame.saturating_duration_since(Instant::now());
            if timeout.is_zero() || !event::poll(timeout)? {
                break;
            }
            if let Event::Key(key) = event::read()? {
                handle_key(app, key);
            }
            if app.should_quit {
                return Ok(());
            }
        }

        let now = Instant::now();
        while next_frame <= now {
            app.on_frame();
            next_frame += frame_duration;
        }
    }
}

/// Dispatches a key event.
fn handle_key(app: &mut App, key: KeyEvent) {
    match key.kind {
        KeyEventKind::Release => {
            if let KeyCode::Char(c) = key.code {
                app.handle_note_key_release(c);
            }
            return;
        }
        KeyEventKind::Repeat => return,
        KeyEventKind::Press => {}
    }

    if app.save_dialog.open {
        match key.code {
            KeyCode::Enter => {
                app.save_dialog_confirm();
            }
            KeyCode::Esc => app.save_dialog_cancel(),
            KeyCode::Backspace => app.save_dialog_backspace(),
            KeyCode::Char(c) => app.save_dialog_input(c),
            _ => {}
        }
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('s') => app.open_save_dialog(),
            KeyCode::Char('c') => app.quit(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char(' ') => app.toggle_playback(),
        KeyCode::Char('b') | KeyCode::Home => app.seek_to_start(),
        KeyCode::Char('r') => app.start_recording(),
        KeyCode::Char('x') => app.stop_recording(),
        KeyCode::Char('c') => app.clear_active_track(),
        KeyCode::Char(c @ '1'..='9') => app.select_track(c as usize - '1' as usize),
        KeyCode::F(n @ 1..=4) => app.select_instrument(Instrument::ALL[n as usize - 1]),
        KeyCode::Up => app.octave_up(),
        KeyCode::Down => app.octave_down(),
        KeyCode::Char(c) => {
            app.handle_note_key_press(c);
        }
        _ => {}
    }
}
