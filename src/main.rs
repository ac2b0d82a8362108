use anyhow::{Context, Result, bail};
use clap::Parser;
use spectra::audio::source::{self, RawSource, ToneSource};
use spectra::audio::spectrum_tap::{self, DisplayGate, SpectrumFrame, SpectrumTap, TapConfig};
use spectra::display::{DisplayRange, SpectrumView};
use spectra::settings::{self, SettingsManager};
use spectra::util::audio::DEFAULT_SAMPLE_RATE;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_QUEUE: usize = 4;
const PACKET_QUEUE: usize = 64;

/// Streaming spectrum analyzer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to $XDG_CONFIG_HOME/spectra/settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Raw little-endian f32 mono samples; `-` reads stdin
    #[arg(short, long, conflicts_with = "tone")]
    file: Option<PathBuf>,

    /// Analyze a generated sine at this frequency (Hz)
    #[arg(short, long)]
    tone: Option<f64>,

    /// Sample rate of the input (Hz)
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
    rate: f64,

    /// Analysis window size, rounded to a power of two in [1024, 16384]
    #[arg(short, long)]
    window: Option<usize>,

    /// Spectrum refreshes per second
    #[arg(long)]
    fps: Option<f64>,

    /// Stop after this many spectra
    #[arg(long)]
    frames: Option<u64>,

    /// Persist the effective settings
    #[arg(long)]
    save: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if !args.rate.is_finite() || args.rate <= 0.0 {
        bail!("sample rate must be positive, got {}", args.rate);
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(settings::default_settings_path);
    let mut manager = SettingsManager::load_or_default(config_path);
    manager.update(|s| {
        if args.window.is_some() {
            s.window_size = args.window;
        }
        if let Some(fps) = args.fps {
            s.target_fps = fps;
        }
    });
    if args.save {
        manager
            .save()
            .with_context(|| format!("saving settings to {:?}", manager.path()))?;
        info!("[settings] saved to {:?}", manager.path());
    }

    let config = TapConfig {
        window_size: manager.settings().window_size,
        target_fps: manager.settings().target_fps,
    };
    let tap = SpectrumTap::new(config, args.rate).context("configuring analyzer")?;
    info!(
        "[tap] window {} samples, {} bins, refresh every {:.0} samples",
        tap.analyzer().window_size(),
        tap.analyzer().bin_count(),
        tap.analyzer().threshold()
    );

    let (packet_tx, packet_rx) = async_channel::bounded(PACKET_QUEUE);
    let (frame_tx, frame_rx) = async_channel::bounded(FRAME_QUEUE);
    let analysis = spectrum_tap::spawn(tap, packet_rx, frame_tx, DisplayGate::new(true))?;
    let producer = match (&args.file, args.tone) {
        (Some(path), _) if path.as_os_str() == "-" => {
            source::spawn(RawSource::new(std::io::stdin(), args.rate), packet_tx, false)?
        }
        (Some(path), _) => {
            let file = std::fs::File::open(path).with_context(|| format!("opening {path:?}"))?;
            source::spawn(RawSource::new(file, args.rate), packet_tx, false)?
        }
        (None, tone) => {
            let freq = tone.unwrap_or(1_000.0);
            info!("[source] generating {freq} Hz tone");
            source::spawn(ToneSource::new(freq, args.rate), packet_tx, true)?
        }
    };

    let mut view = SpectrumView::new(DisplayRange::from(manager.settings()));
    let mut shown = 0u64;
    let mut stream_ended = true;
    while let Ok(frame) = frame_rx.recv_blocking() {
        report(&mut view, &frame);
        shown += 1;
        if args.frames.is_some_and(|limit| shown >= limit) {
            stream_ended = false;
            break;
        }
    }
    info!("[display] {shown} spectra shown");

    // Stopping early leaves the workers to exit with the process; a source
    // blocked on stdin would never notice the closed queue.
    if stream_ended {
        if analysis.join().is_err() {
            warn!("[tap] analysis thread panicked");
        }
        if producer.join().is_err() {
            warn!("[source] source thread panicked");
        }
    }
    Ok(())
}

fn report(view: &mut SpectrumView, frame: &SpectrumFrame) {
    view.apply_frame(frame);
    match view.peak() {
        Some(peak) => info!(
            "[display] #{} peak {} at x={:.3} y={:.3}",
            frame.sequence, peak.text, peak.x, peak.y
        ),
        None => info!("[display] #{} silence", frame.sequence),
    }
}
