use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use simple_eq::engine::display::{Display, DisplayTimer};
use simple_eq::{AppConfig, AudioEngine, ParameterStore};

/// Plays an audio file through a low-cut / peak / high-cut equalizer.
///
/// While playing, parameter changes can be typed on stdin as
/// `<name>=<value>` (e.g. `Peak Gain=6`); `q` quits.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Audio file to play.
    file: PathBuf,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial parameter value, `<name>=<value>`. May be repeated.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Skip spectrum analysis.
    #[arg(long)]
    no_spectrum: bool,
}

enum Command {
    Assign(String),
    Quit,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if cli.no_spectrum {
        config.show_spectrum = false;
    }

    let params = Arc::new(ParameterStore::default());
    config
        .apply_parameters(&params)
        .context("invalid parameter in config")?;
    for assignment in &cli.set {
        params
            .apply_assignment(assignment)
            .with_context(|| format!("invalid --set {assignment}"))?;
    }

    let mut engine = AudioEngine::new(config.engine_options(), params.clone())
        .context("failed to start audio engine")?;
    let analyzers = engine.take_analyzers(config.analyzer_settings());
    let display = Display::new(
        config.display_bounds(),
        params.clone(),
        analyzers,
        config.show_spectrum,
    );
    let timer = DisplayTimer::start(display, config.refresh_hz, engine.clock());

    engine
        .load(&cli.file)
        .with_context(|| format!("failed to open {}", cli.file.display()))?;
    engine.play().context("failed to start playback")?;
    let settings = params.snapshot();
    info!(
        file = %cli.file.display(),
        duration_secs = engine.duration().unwrap_or(0.0),
        low_cut_slope = settings.low_cut_slope.label(),
        high_cut_slope = settings.high_cut_slope.label(),
        ?settings,
        "playing"
    );

    let commands = spawn_stdin_reader();
    let mut last_report = Instant::now();
    let mut last_sequence = 0;

    loop {
        engine.tick();

        match commands.try_recv() {
            Ok(Command::Assign(line)) => match params.apply_assignment(&line) {
                Ok(id) => {
                    let settings = params.snapshot();
                    info!(
                        parameter = id.name(),
                        value = params.value(id),
                        low_cut_slope = settings.low_cut_slope.label(),
                        high_cut_slope = settings.high_cut_slope.label(),
                        "parameter changed"
                    );
                }
                Err(err) => warn!(%err, "ignored input"),
            },
            Ok(Command::Quit) => break,
            Err(_) => {}
        }

        if engine.is_finished() {
            info!("playback finished");
            break;
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            let frame = timer.latest();
            if frame.sequence != last_sequence {
                last_sequence = frame.sequence;
                let spectra: Vec<_> = frame
                    .spectrum_paths
                    .iter()
                    .map(|path| (path.channel, path.points.len()))
                    .collect();
                info!(
                    time_secs = engine.get_time_secs(),
                    frame = frame.sequence,
                    response_points = frame.response_path.len(),
                    ?spectra,
                    "display"
                );
            } else {
                info!(time_secs = engine.get_time_secs(), state = ?engine.state(), "playing");
            }
        }

        thread::sleep(Duration::from_millis(20));
    }

    drop(timer);
    engine.stop();
    Ok(())
}

fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command = if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
                Command::Quit
            } else {
                Command::Assign(line.to_string())
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
