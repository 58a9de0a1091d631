//! quietstretch - denoise and time-stretch a WAV file.

use clap::{ArgGroup, Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use quietstretch::io::{read_wav_file, write_wav_file, WavFormat};
use quietstretch::{
    AudioBuffer, Calibration, PhaseLocking, Preset, StagedPipeline, StreamProcessor,
    StretchError, StretchOutcome, VocoderConfig, WindowType,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Hann,
    BlackmanHarris,
}

impl From<WindowArg> for WindowType {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Hann => WindowType::Hann,
            WindowArg::BlackmanHarris => WindowType::BlackmanHarris,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Speech,
    Music,
    LowLatency,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Speech => Preset::Speech,
            PresetArg::Music => Preset::Music,
            PresetArg::LowLatency => Preset::LowLatency,
        }
    }
}

/// Remove stationary background noise and change duration without changing pitch.
///
/// The start of the input must contain only the noise to remove; it is used
/// for calibration and is not part of the output.
#[derive(Parser, Debug)]
#[command(name = "quietstretch")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("calibration").args(["calibration_secs", "calibration_frames"])))]
struct Cli {
    /// Input WAV file (the first channel is processed)
    input: PathBuf,

    /// Output WAV file
    output: PathBuf,

    /// Stretch factor: >1 slows down, <1 speeds up
    #[arg(short, long)]
    stretch: Option<f64>,

    /// Frame size in samples
    #[arg(long)]
    frame_size: Option<usize>,

    /// Hop size in samples (default: frame size / 4)
    #[arg(long)]
    hop_size: Option<usize>,

    /// Seconds of leading noise used for calibration
    #[arg(long)]
    calibration_secs: Option<f64>,

    /// Number of leading frames used for calibration
    #[arg(long)]
    calibration_frames: Option<usize>,

    /// Peak level of the normalized output
    #[arg(long)]
    target: Option<f32>,

    /// Analysis/synthesis window
    #[arg(short, long, value_enum)]
    window: Option<WindowArg>,

    /// Lock non-peak bins to the phase of their nearest spectral peak
    #[arg(long)]
    phase_locking: bool,

    /// Frame/hop/calibration preset, applied before explicit options
    #[arg(short, long, value_enum)]
    preset: Option<PresetArg>,

    /// JSON configuration file, applied before the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run each stage on its own thread
    #[arg(long)]
    staged: bool,

    /// Write 32-bit float samples instead of 16-bit PCM
    #[arg(long)]
    float: bool,

    /// Print progress and statistics
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn build_config(&self, sample_rate: u32) -> Result<VocoderConfig, StretchError> {
        let mut config = match &self.config {
            Some(path) => VocoderConfig::from_json_file(path)?,
            None => VocoderConfig::default(),
        };
        if let Some(preset) = self.preset {
            config = config.with_preset(preset.into());
        }
        if let Some(stretch) = self.stretch {
            config.stretch_factor = stretch;
        }
        if let Some(frame_size) = self.frame_size {
            config = config.with_frame_size(frame_size);
        }
        if let Some(hop_size) = self.hop_size {
            config = config.with_hop_size(hop_size);
        }
        if let Some(secs) = self.calibration_secs {
            config = config.with_calibration(Calibration::Duration(secs));
        }
        if let Some(frames) = self.calibration_frames {
            config = config.with_calibration(Calibration::Frames(frames));
        }
        if let Some(target) = self.target {
            config = config.with_normalization_target(target);
        }
        if let Some(window) = self.window {
            config = config.with_window(window.into());
        }
        if self.phase_locking {
            config = config.with_phase_locking(PhaseLocking::Identity);
        }
        config = config.with_sample_rate(sample_rate);
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<(), StretchError> {
    let input = read_wav_file(&cli.input)?;
    if input.channels > 1 {
        warn!(
            "{} has {} channels; processing channel 0 only",
            cli.input.display(),
            input.channels
        );
    }
    let samples = input.channel_data(0);
    let config = cli.build_config(input.sample_rate)?;
    info!(
        "{}: {} samples at {} Hz ({:.2}s), stretch {}",
        cli.input.display(),
        samples.len(),
        input.sample_rate,
        input.duration_secs(),
        config.stretch_factor
    );

    let start = Instant::now();
    let outcome: StretchOutcome = if cli.staged {
        StagedPipeline::new(&config)?.run(&samples)?
    } else {
        let mut processor = StreamProcessor::new(&config)?;
        processor.push(&samples)?;
        processor.finish()?
    };
    let elapsed = start.elapsed();

    if let Some(profile) = &outcome.noise_profile {
        info!(
            "noise profile: {} frames, mean magnitude {:.6}",
            profile.frames_used(),
            profile.mean_level()
        );
    }
    let output = AudioBuffer::mono(outcome.output, input.sample_rate)?;
    info!(
        "{} samples out ({:.2}s) in {:.1} ms",
        output.data.len(),
        output.duration_secs(),
        elapsed.as_secs_f64() * 1000.0
    );

    let format = if cli.float {
        WavFormat::Float32
    } else {
        WavFormat::Pcm16
    };
    write_wav_file(&cli.output, &output, format)?;
    info!("wrote {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
